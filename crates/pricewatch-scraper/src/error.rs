use serde::ser::{Serialize, SerializeStruct, Serializer};
use thiserror::Error;

/// Failures of the page client itself (transport, status, bad URL).
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Why a single price check did not produce a price.
///
/// The `Display` text of each variant is the message shown to the user and
/// stored in the check history. Serializes as `{"kind", "message"}`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The page could not be fetched; no extraction tier ran.
    #[error("{0}")]
    Fetch(String),

    /// The configured locator or its kind is invalid.
    #[error("{0}")]
    Selector(String),

    /// The configured locator is valid but produced no text.
    #[error("Selector did not match any content on the page.")]
    LocatorNoMatch,

    /// No locator is configured and every automatic tier came up empty.
    #[error("Could not automatically detect a price. Add a selector for better accuracy.")]
    NoPriceFound,

    /// Text was found but does not contain a number.
    #[error("Could not parse numeric price from matched content.")]
    UnparsablePrice,
}

impl ExtractError {
    /// Stable `snake_case` name of the variant.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::Fetch(_) => "fetch",
            ExtractError::Selector(_) => "selector",
            ExtractError::LocatorNoMatch => "locator_no_match",
            ExtractError::NoPriceFound => "no_price_found",
            ExtractError::UnparsablePrice => "unparsable_price",
        }
    }

    /// `true` for mistakes the user must fix in the item's locator settings.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, ExtractError::Selector(_))
    }
}

impl Serialize for ExtractError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ExtractError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl From<ScraperError> for ExtractError {
    fn from(err: ScraperError) -> Self {
        match err {
            ScraperError::Http(_) => ExtractError::Fetch(err.to_string()),
            other => ExtractError::Fetch(format!("HTTP error: {other}")),
        }
    }
}
