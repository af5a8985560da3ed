//! Trait seams for the external collaborators: the page source and the
//! structured-extraction service.

pub mod extractor;
pub mod fetcher;

pub use extractor::StructuredExtractor;
pub use fetcher::PageFetcher;
