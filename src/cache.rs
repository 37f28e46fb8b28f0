//! Cache of per-event engine registrations and color bindings
//!
//! Binding is a full-zone color push that briefly resets the affected LEDs,
//! so the cache skips it whenever the requested color is unchanged. That is
//! what keeps the keep-alive refresh loop flicker-free.

use std::collections::HashMap;

use log::debug;

use crate::color::Rgb;
use crate::engine::Engine;
use crate::errors::EngineError;

#[derive(Debug, Default)]
struct Binding {
    registered: bool,
    /// Last color successfully bound, if any.
    color: Option<Rgb>,
}

/// What [`BindingCache::ensure_bound`] actually did on the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindOutcome {
    /// The event had never been bound; a bind was issued.
    FirstBind,
    /// The cached color differed; a bind was issued.
    Rebound,
    /// The cached color already matched; no network call.
    Unchanged,
}

#[derive(Debug, Default)]
pub(crate) struct BindingCache {
    entries: HashMap<String, Binding>,
}

impl BindingCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register `event` with the engine at most once per process. An engine
    /// rejection (duplicate registration) counts as registered; transport
    /// failures propagate.
    pub(crate) async fn ensure_registered<E: Engine>(
        &mut self,
        engine: &E,
        event: &str,
    ) -> Result<(), EngineError> {
        if self.entries.get(event).is_some_and(|b| b.registered) {
            return Ok(());
        }
        match engine.register_event(event).await {
            Ok(()) => {}
            Err(err) if err.is_rejection() => {
                debug!("event {event} already registered with the engine");
            }
            Err(err) => return Err(err),
        }
        self.entries.entry(event.to_string()).or_default().registered = true;
        Ok(())
    }

    /// Bind `event` to `color` across `zones`, unless the cached color
    /// already matches.
    pub(crate) async fn ensure_bound<E: Engine>(
        &mut self,
        engine: &E,
        event: &str,
        zones: &[String],
        color: Rgb,
    ) -> Result<BindOutcome, EngineError> {
        let previous = self.entries.get(event).and_then(|b| b.color);
        if previous == Some(color) {
            return Ok(BindOutcome::Unchanged);
        }
        engine.bind_color(event, zones, color).await?;
        self.mark_bound(event, color);
        Ok(if previous.is_none() {
            BindOutcome::FirstBind
        } else {
            BindOutcome::Rebound
        })
    }

    fn mark_bound(&mut self, event: &str, color: Rgb) {
        self.entries.entry(event.to_string()).or_default().color = Some(color);
    }

    /// Color currently bound to `event`, if any.
    pub(crate) fn bound_color(&self, event: &str) -> Option<Rgb> {
        self.entries.get(event).and_then(|b| b.color)
    }

    /// Every event name seen so far. Used by the defensive all-off sweep.
    pub(crate) fn known_events(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
