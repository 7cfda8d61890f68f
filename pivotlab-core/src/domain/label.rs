//! Ternary trading label.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trading label attached to a feature row: sell (-1), neutral (0), buy (+1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Label {
    Sell,
    Neutral,
    Buy,
}

impl Label {
    /// Class order used by classifiers and reports: sell, neutral, buy.
    pub const ALL: [Label; 3] = [Label::Sell, Label::Neutral, Label::Buy];

    pub fn value(&self) -> i8 {
        match self {
            Label::Sell => -1,
            Label::Neutral => 0,
            Label::Buy => 1,
        }
    }

    pub fn from_value(value: i8) -> Option<Label> {
        match value {
            -1 => Some(Label::Sell),
            0 => Some(Label::Neutral),
            1 => Some(Label::Buy),
            _ => None,
        }
    }

    /// Position of this label in `Label::ALL`.
    pub fn index(&self) -> usize {
        match self {
            Label::Sell => 0,
            Label::Neutral => 1,
            Label::Buy => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Label> {
        Label::ALL.get(index).copied()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Label::Sell => "sell",
            Label::Neutral => "neutral",
            Label::Buy => "buy",
        };
        f.write_str(name)
    }
}

impl TryFrom<i8> for Label {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        Label::from_value(value).ok_or_else(|| format!("invalid label value {value}"))
    }
}

impl From<Label> for i8 {
    fn from(label: Label) -> Self {
        label.value()
    }
}
