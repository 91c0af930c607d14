//! Domain vocabulary shared by the scraper, persistence, and CLI crates.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Currency stored on an item before any check has detected one.
pub const DEFAULT_CURRENCY: &str = "$";

/// How a user-supplied locator should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocatorKind {
    /// CSS selector, optionally ending in `::text` or `::attr(name)`.
    #[default]
    Css,
    /// XPath-style path query.
    #[serde(rename = "xpath")]
    Path,
}

impl LocatorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LocatorKind::Css => "css",
            LocatorKind::Path => "xpath",
        }
    }
}

impl fmt::Display for LocatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocatorKind {
    type Err = CoreError;

    /// Parses a stored kind. Blank input means CSS, matching the column default.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "css" => Ok(LocatorKind::Css),
            "xpath" | "path" => Ok(LocatorKind::Path),
            _ => Err(CoreError::InvalidLocatorKind(s.to_owned())),
        }
    }
}

/// Direction of a price movement between two successful checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceDirection {
    Higher,
    Lower,
}

impl PriceDirection {
    /// Smallest difference treated as a real price change.
    #[must_use]
    pub fn epsilon() -> Decimal {
        Decimal::new(1, 9)
    }

    /// Returns the direction from `previous` to `current`, or `None` when the
    /// two differ by no more than [`Self::epsilon`].
    #[must_use]
    pub fn between(previous: Decimal, current: Decimal) -> Option<Self> {
        // An overflowing difference is far above the threshold.
        match current.checked_sub(previous) {
            Some(delta) if delta.abs() <= Self::epsilon() => None,
            _ if current > previous => Some(PriceDirection::Higher),
            _ => Some(PriceDirection::Lower),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PriceDirection::Higher => "higher",
            PriceDirection::Lower => "lower",
        }
    }
}

impl fmt::Display for PriceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_kind_parses_case_insensitively() {
        assert_eq!("CSS".parse::<LocatorKind>().unwrap(), LocatorKind::Css);
        assert_eq!(" xpath ".parse::<LocatorKind>().unwrap(), LocatorKind::Path);
        assert_eq!("path".parse::<LocatorKind>().unwrap(), LocatorKind::Path);
    }

    #[test]
    fn locator_kind_blank_defaults_to_css() {
        assert_eq!("".parse::<LocatorKind>().unwrap(), LocatorKind::Css);
    }

    #[test]
    fn locator_kind_rejects_unknown_values() {
        let err = "regex".parse::<LocatorKind>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidLocatorKind(ref v) if v == "regex"));
    }

    #[test]
    fn locator_kind_serializes_as_stored_value() {
        let json = serde_json::to_string(&LocatorKind::Path).unwrap();
        assert_eq!(json, "\"xpath\"");
        assert_eq!(LocatorKind::Path.to_string(), "xpath");
    }

    #[test]
    fn price_direction_detects_increase_and_decrease() {
        let low = Decimal::new(1999, 2);
        let high = Decimal::new(2499, 2);
        assert_eq!(PriceDirection::between(low, high), Some(PriceDirection::Higher));
        assert_eq!(PriceDirection::between(high, low), Some(PriceDirection::Lower));
    }

    #[test]
    fn price_direction_ignores_negligible_difference() {
        let a = Decimal::new(1999, 2);
        let b = a + Decimal::new(1, 10);
        assert_eq!(PriceDirection::between(a, b), None);
        assert_eq!(PriceDirection::between(a, a), None);
    }

    #[test]
    fn price_direction_survives_overflowing_difference() {
        let low = Decimal::MIN;
        let high = Decimal::MAX;
        assert_eq!(PriceDirection::between(low, high), Some(PriceDirection::Higher));
        assert_eq!(PriceDirection::between(high, low), Some(PriceDirection::Lower));
    }
}
