pub mod eval;
pub mod imageask;
pub mod scrape;
pub mod search;

pub use eval::LuauEvalTool;
pub use imageask::ImageAskTool;
pub use scrape::ScrapeTool;
pub use search::SearchTool;
