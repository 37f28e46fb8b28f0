//! RGB colors as the engine's bind payloads expect them

use std::str::FromStr;

use serde::Serialize;

use crate::errors::Error;

/// A color in the `{"red": r, "green": g, "blue": b}` shape the engine's
/// bind operation takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub(crate) const BLACK: Rgb = Rgb {
        red: 0,
        green: 0,
        blue: 0,
    };
}

impl FromStr for Rgb {
    type Err = Error;

    /// Parse a `#RRGGBB` hex string. The leading `#` is optional.
    fn from_str(s: &str) -> Result<Self, Error> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(Error::InvalidColor(s.to_string()));
        }
        let channel = |range| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| Error::InvalidColor(s.to_string()))
        };
        Ok(Rgb {
            red: channel(0..2)?,
            green: channel(2..4)?,
            blue: channel(4..6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_with_and_without_hash() {
        let green: Rgb = "#00FF00".parse().unwrap();
        assert_eq!(
            green,
            Rgb {
                red: 0,
                green: 255,
                blue: 0
            }
        );
        assert_eq!("00ff00".parse::<Rgb>().unwrap(), green);
    }

    #[test]
    fn rejects_malformed_colors() {
        assert!("#00FF0".parse::<Rgb>().is_err());
        assert!("#00FF000".parse::<Rgb>().is_err());
        assert!("#00GG00".parse::<Rgb>().is_err());
        assert!("".parse::<Rgb>().is_err());
        assert!("#ÖÖFF00".parse::<Rgb>().is_err());
    }

    #[test]
    fn serializes_to_engine_shape() {
        let value = serde_json::to_value(Rgb {
            red: 1,
            green: 2,
            blue: 3,
        })
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!({"red": 1, "green": 2, "blue": 3})
        );
    }
}
