use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Heritable color trait of a creature.
///
/// Predation is only possible between creatures of different colors, so two
/// `Rgb` values with identical channels are the same color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreatureColor {
    Red,
    Blue,
    Yellow,
    Green,
    Rgb(u8, u8, u8),
}

impl CreatureColor {
    /// Colors a freshly seeded population is drawn from.
    pub const FOUNDERS: [CreatureColor; 4] = [
        CreatureColor::Red,
        CreatureColor::Blue,
        CreatureColor::Yellow,
        CreatureColor::Green,
    ];

    #[must_use]
    pub fn is_founder(&self) -> bool {
        !matches!(self, CreatureColor::Rgb(..))
    }
}

impl fmt::Display for CreatureColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreatureColor::Red => f.write_str("red"),
            CreatureColor::Blue => f.write_str("blue"),
            CreatureColor::Yellow => f.write_str("yellow"),
            CreatureColor::Green => f.write_str("green"),
            CreatureColor::Rgb(r, g, b) => write!(f, "rgb({r}, {g}, {b})"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognised color: {0}")]
pub struct ColorParseError(pub String);

impl FromStr for CreatureColor {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "red" => Ok(CreatureColor::Red),
            "blue" => Ok(CreatureColor::Blue),
            "yellow" => Ok(CreatureColor::Yellow),
            "green" => Ok(CreatureColor::Green),
            other => {
                let inner = other
                    .strip_prefix("rgb(")
                    .and_then(|rest| rest.strip_suffix(')'))
                    .ok_or_else(|| ColorParseError(other.to_string()))?;
                let channels: Vec<u8> = inner
                    .split(',')
                    .map(|c| c.trim().parse::<u8>())
                    .collect::<Result<_, _>>()
                    .map_err(|_| ColorParseError(other.to_string()))?;
                match channels.as_slice() {
                    [r, g, b] => Ok(CreatureColor::Rgb(*r, *g, *b)),
                    _ => Err(ColorParseError(other.to_string())),
                }
            }
        }
    }
}

impl Serialize for CreatureColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CreatureColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
