pub mod crawler;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod render;
pub mod result;
pub mod robots;
pub mod scope;

pub use crawler::{CrawlOutput, Crawler};
pub use error::CrawlError;
pub use fetcher::Fetcher;
pub use render::{RenderMode, Renderer};
pub use result::{ExtractedData, LinkEdge, PageRecord, RenderedData};
pub use robots::RobotsGate;
pub use scope::ScopeFilter;
