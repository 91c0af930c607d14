pub mod client;
pub mod currency;
pub mod error;
pub mod extract;
pub mod name;

pub use client::PageClient;
pub use currency::CurrencyTables;
pub use error::{ExtractError, ScraperError};
pub use extract::{normalize_price, ExtractionResult, Extractor, Locator};
pub use name::detect_name_in_html;
