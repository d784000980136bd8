pub mod config;
pub mod crawler;
pub mod error;
pub mod logging;
pub mod models;
pub mod naming;
pub mod selection;
pub mod utils;

pub use config::{FetchConfig, RequestHeaders};
pub use crawler::{PageDownloader, WeebCentralCrawler, resolve_id};
pub use error::{ConfigError, FetchError, SelectionError, TransferError};
pub use models::{ChapterListing, ChapterRef, DownloadReport, PageUrl, RunSummary, SeriesInfo};
pub use naming::{normalize_title, sanitize};
pub use selection::{parse_selection, select_chapters};
