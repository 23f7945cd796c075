use serde::{Deserialize, Serialize};
use std::fmt;

/// The semantic label assigned to every ingested webhook.
///
/// Serialized with the variant name (e.g. `"PriceUpdate"`), which is what the
/// dashboard renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Carries a directive such as `"action": "BUY"`.
    Alert,
    /// Names a trading instrument.
    SymbolData,
    PriceUpdate,
    Signal,
    Strategy,
    /// The body was not structured data at all.
    Text,
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Alert => "Alert",
            Category::SymbolData => "SymbolData",
            Category::PriceUpdate => "PriceUpdate",
            Category::Signal => "Signal",
            Category::Strategy => "Strategy",
            Category::Text => "Text",
            Category::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
