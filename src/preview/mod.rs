//! Source-page helpers: display names for hosts and preview-image scraping.

pub mod domain;
pub mod extract;

pub use domain::{domain_name, UNKNOWN_DOMAIN};
pub use extract::{PreviewError, PreviewExtractor, PreviewOptions};
