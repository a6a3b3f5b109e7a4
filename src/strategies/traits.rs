// Extraction strategy interface

use async_trait::async_trait;

use crate::errors::DownloadError;
use crate::models::{DownloadResult, UrlInfo};

/// Per-request options supplied by the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Privileged requesters skip the YouTube 720p cap
    pub privileged: bool,
}

impl ResolveOptions {
    pub fn privileged() -> Self {
        Self { privileged: true }
    }
}

/// One way of turning a classified URL into files on disk.
///
/// Implementations differ structurally (an in-arena generic extractor run
/// vs. a metadata subprocess plus direct HTTP fetches) but share this seam
/// and the uniform result type.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Name of the strategy (for logging)
    fn name(&self) -> &'static str;

    async fn extract(
        &self,
        url_info: &UrlInfo,
        options: &ResolveOptions,
    ) -> Result<DownloadResult, DownloadError>;
}
