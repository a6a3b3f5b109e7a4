// Strategy selection and the resolution boundary.
//
// `MediaResolver::resolve` is the entry point of the pipeline: it picks a
// strategy from (platform, content type), runs it, applies the structural
// video->photo fallback, and converts every anticipated failure into a
// non-success result with a short user-facing message. Errors never cross
// this boundary in the steady-state path.

pub mod audio;
pub mod gallery;
pub mod traits;
pub mod video;

pub use traits::{ExtractionStrategy, ResolveOptions};

use crate::config::DownloaderConfig;
use crate::errors::{DownloadError, ERROR_MESSAGE_BUDGET};
use crate::models::{ContentType, DownloadResult, Platform, UrlInfo};
use crate::utils::truncate_chars;

use audio::AudioStrategy;
use gallery::GalleryStrategy;
use video::VideoStrategy;

pub struct MediaResolver {
    video: VideoStrategy,
    audio: AudioStrategy,
    gallery: GalleryStrategy,
}

impl MediaResolver {
    pub fn new(config: DownloaderConfig) -> Self {
        if let Err(e) = config.ensure_directories() {
            log::warn!("could not create output directories: {}", e);
        }
        Self {
            video: VideoStrategy::new(config.clone()),
            audio: AudioStrategy::new(config.clone()),
            gallery: GalleryStrategy::new(config),
        }
    }

    /// Strategy table keyed on (platform, content type).
    fn select(&self, platform: Platform, content_type: ContentType) -> &dyn ExtractionStrategy {
        match (platform, content_type) {
            (_, ContentType::Audio) => &self.audio,
            // Instagram posts are frequently multi-image; always take the
            // gallery route for them
            (Platform::Instagram, ContentType::Photo | ContentType::Post) => &self.gallery,
            _ => &self.video,
        }
    }

    /// Resolve one classified URL to files on disk.
    pub async fn resolve(&self, url_info: &UrlInfo, options: &ResolveOptions) -> DownloadResult {
        if !url_info.is_valid {
            let message = url_info
                .error_message
                .clone()
                .unwrap_or_else(|| "Invalid URL".to_string());
            return DownloadResult::failure(url_info.platform, message);
        }

        let content_type = url_info.content_type.unwrap_or(ContentType::Video);
        let strategy = self.select(url_info.platform, content_type);
        log::info!(
            "resolving {} via {} strategy",
            url_info.url,
            strategy.name()
        );

        let mut outcome = strategy.extract(url_info, options).await;

        // A video-less post is not a dead end on platforms with a photo
        // path: re-run through the gallery flow
        if let Err(ref error) = outcome {
            if error.is_no_media() && url_info.platform == Platform::X {
                log::info!("no video in {}, trying the photo fallback", url_info.url);
                outcome = self.gallery.extract(url_info, options).await;
            }
        }

        match outcome {
            Ok(result) => result,
            Err(error) => {
                log::warn!("resolution failed for {}: {}", url_info.url, error);
                DownloadResult::failure(url_info.platform, user_message(&error, url_info.platform))
            }
        }
    }
}

/// Map a pipeline error to the short, platform-attributed message shown to
/// the end user. Raw tool output never passes through unbounded.
pub(crate) fn user_message(error: &DownloadError, platform: Platform) -> String {
    match error {
        DownloadError::RateLimited(_) => format!(
            "{} is temporarily blocking downloads. Please try again in a few minutes.",
            platform.display_name()
        ),
        DownloadError::Oversized { .. } => error.to_string(),
        DownloadError::EmptyPlaylist => match platform {
            Platform::Vk => "This VK post contains no downloadable media".to_string(),
            _ => format!(
                "No downloadable content was found in this {} post",
                platform.display_name()
            ),
        },
        DownloadError::NoMedia(_) => format!(
            "No video was found in this {} post",
            platform.display_name()
        ),
        DownloadError::ToolNotFound(_) => error.to_string(),
        other => format!(
            "Download failed: {}",
            truncate_chars(&other.to_string(), ERROR_MESSAGE_BUDGET)
        ),
    }
}
