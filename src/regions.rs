//! Static partition of the letter keys into lighting regions

/// A fixed named group of keys lit as one unit through a single shared
/// engine event.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Region {
    pub name: &'static str,
    /// Key characters, each also the engine zone name for that key.
    pub keys: &'static str,
}

impl Region {
    /// Engine event shared by every key in this region.
    pub(crate) fn event_name(&self) -> String {
        format!("{}_EVENT", self.name.to_uppercase())
    }
}

/// The keyboard partition. A key belongs to at most one region.
pub(crate) static REGIONS: [Region; 3] = [
    Region {
        name: "region1",
        keys: "qweasdzxc",
    },
    Region {
        name: "region2",
        keys: "rtyfghvbn",
    },
    Region {
        name: "region3",
        keys: "ujmikolp",
    },
];

/// Look up the region containing `key`, if any.
pub(crate) fn region_of(key: char) -> Option<&'static Region> {
    REGIONS.iter().find(|region| region.keys.contains(key))
}
