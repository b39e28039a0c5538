pub mod broadcaster;
pub mod droid;
pub mod exporter;
pub mod orchestrator;
pub mod page_scraper;
pub mod session_pool;

pub use broadcaster::*;
pub use droid::*;
pub use exporter::*;
pub use orchestrator::*;
pub use page_scraper::*;
pub use session_pool::*;
