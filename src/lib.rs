//! URL classification and media resolution for social platforms.
//!
//! The pipeline takes a raw user-submitted string, classifies it against the
//! five supported platforms (Instagram, YouTube, TikTok, VK, X), normalizes
//! platform-specific URL variants, and drives the matching extraction
//! strategy (generic video, audio transcode, or gallery-plus-HTTP) through a
//! retrying executor. Heterogeneous extractor output is assembled into one
//! uniform [`DownloadResult`] with metadata and per-content-type size
//! ceilings; a background [`RetentionSweeper`] reclaims old artifacts.
//!
//! ```no_run
//! use soc_downloader::{DownloaderConfig, MediaResolver, ResolveOptions, UrlClassifier};
//!
//! # async fn run() {
//! let classifier = UrlClassifier::new();
//! let resolver = MediaResolver::new(DownloaderConfig::from_env());
//!
//! let info = classifier.classify("https://youtu.be/dQw4w9WgXcQ");
//! let result = resolver.resolve(&info, &ResolveOptions::default()).await;
//! if result.success {
//!     println!("saved to {:?}", result.file_path);
//! }
//! # }
//! ```

pub mod assembler;
pub mod classifier;
pub mod config;
pub mod errors;
pub mod models;
pub mod retry;
pub mod strategies;
pub mod sweeper;
pub mod tools;
pub mod utils;

pub use classifier::{extract_urls, UrlClassifier};
pub use config::DownloaderConfig;
pub use errors::DownloadError;
pub use models::{
    ContentType, DeliveryKind, DownloadResult, Platform, PostMetadata, UrlInfo,
};
pub use strategies::{ExtractionStrategy, MediaResolver, ResolveOptions};
pub use sweeper::RetentionSweeper;
