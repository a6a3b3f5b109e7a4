// Common data models for the resolution pipeline

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-content-type size ceilings, enforced after download.
pub const MAX_VIDEO_BYTES: u64 = 100 * 1024 * 1024;
pub const MAX_AUDIO_BYTES: u64 = 50 * 1024 * 1024;
pub const MAX_PHOTO_BYTES: u64 = 10 * 1024 * 1024;

/// Supported source platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Youtube,
    Tiktok,
    Vk,
    X,
    Unknown,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Youtube => "youtube",
            Self::Tiktok => "tiktok",
            Self::Vk => "vk",
            Self::X => "x",
            Self::Unknown => "unknown",
        }
    }

    /// Human form used in user-facing messages
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Instagram => "Instagram",
            Self::Youtube => "YouTube",
            Self::Tiktok => "TikTok",
            Self::Vk => "VK",
            Self::X => "X",
            Self::Unknown => "Unknown",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Coarse content classification derived from the URL shape.
///
/// A hint for strategy selection, not a guarantee of the actual media kind
/// until extraction completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Video,
    Photo,
    Audio,
    Story,
    Reel,
    Shorts,
    Tweet,
    Post,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Photo => "photo",
            Self::Audio => "audio",
            Self::Story => "story",
            Self::Reel => "reel",
            Self::Shorts => "shorts",
            Self::Tweet => "tweet",
            Self::Post => "post",
        }
    }

    /// How the delivery layer should hand the artifact to the user.
    pub fn delivery_kind(&self) -> DeliveryKind {
        match self {
            Self::Video | Self::Reel | Self::Shorts => DeliveryKind::Video,
            Self::Audio => DeliveryKind::Audio,
            Self::Photo | Self::Story | Self::Tweet | Self::Post => DeliveryKind::Document,
        }
    }

    /// Size-policy bucket label ("video", "audio", "photo")
    pub fn ceiling_kind(&self) -> &'static str {
        match self {
            Self::Video | Self::Reel | Self::Shorts | Self::Story | Self::Tweet => "video",
            Self::Audio => "audio",
            Self::Photo | Self::Post => "photo",
        }
    }

    /// Maximum permitted artifact size in bytes for this content type
    pub fn size_ceiling(&self) -> u64 {
        match self.ceiling_kind() {
            "audio" => MAX_AUDIO_BYTES,
            "photo" => MAX_PHOTO_BYTES,
            _ => MAX_VIDEO_BYTES,
        }
    }
}

/// Delivery channel for a finished artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryKind {
    Video,
    Audio,
    Document,
}

/// Classification product for one submitted URL. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlInfo {
    pub platform: Platform,
    /// Possibly rewritten to the canonical form the extractor understands
    pub url: String,
    pub post_id: Option<String>,
    pub content_type: Option<ContentType>,
    pub is_valid: bool,
    pub error_message: Option<String>,
}

impl UrlInfo {
    pub fn valid(
        platform: Platform,
        url: impl Into<String>,
        post_id: impl Into<String>,
        content_type: ContentType,
    ) -> Self {
        Self {
            platform,
            url: url.into(),
            post_id: Some(post_id.into()),
            content_type: Some(content_type),
            is_valid: true,
            error_message: None,
        }
    }

    pub fn invalid(platform: Platform, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            platform,
            url: url.into(),
            post_id: None,
            content_type: None,
            is_valid: false,
            error_message: Some(message.into()),
        }
    }
}

/// Normalized post metadata shared by every extraction strategy
#[derive(Debug, Clone, Default)]
pub struct PostMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Account identifier (handle)
    pub author: Option<String>,
    /// Display name
    pub author_name: Option<String>,
    pub likes: Option<i64>,
    pub comments: Option<i64>,
    pub views: Option<i64>,
    /// Seconds, video/audio only
    pub duration: Option<f64>,
    /// Canonical post URL for attribution
    pub url: Option<String>,
}

/// Result record returned to the delivery collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadResult {
    pub success: bool,
    /// Primary artifact; for carousels, the first element of `file_paths`
    pub file_path: Option<PathBuf>,
    /// Set only when `is_carousel` is true
    pub file_paths: Option<Vec<PathBuf>>,
    /// Bytes, summed across all artifacts for carousels
    pub file_size: u64,
    pub duration: Option<f64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub author_name: Option<String>,
    pub likes: Option<i64>,
    pub comments: Option<i64>,
    pub views: Option<i64>,
    pub url: Option<String>,
    /// Display name of the source platform
    pub platform: String,
    pub is_carousel: bool,
    pub error_message: Option<String>,
}

impl DownloadResult {
    pub fn failure(platform: Platform, message: impl Into<String>) -> Self {
        Self {
            success: false,
            file_path: None,
            file_paths: None,
            file_size: 0,
            duration: None,
            title: None,
            description: None,
            author: None,
            author_name: None,
            likes: None,
            comments: None,
            views: None,
            url: None,
            platform: platform.display_name().to_string(),
            is_carousel: false,
            error_message: Some(message.into()),
        }
    }

    /// Success record for a single artifact
    pub fn single_file(
        platform: Platform,
        path: PathBuf,
        size: u64,
        metadata: PostMetadata,
    ) -> Self {
        Self {
            success: true,
            file_path: Some(path),
            file_paths: None,
            file_size: size,
            duration: metadata.duration,
            title: metadata.title,
            description: metadata.description,
            author: metadata.author,
            author_name: metadata.author_name,
            likes: metadata.likes,
            comments: metadata.comments,
            views: metadata.views,
            url: metadata.url,
            platform: platform.display_name().to_string(),
            is_carousel: false,
            error_message: None,
        }
    }

    /// Success record for a multi-item post. Collapses to `single_file`
    /// when only one artifact survived.
    pub fn batch(
        platform: Platform,
        mut paths: Vec<PathBuf>,
        total_size: u64,
        metadata: PostMetadata,
    ) -> Self {
        if paths.len() == 1 {
            return Self::single_file(platform, paths.remove(0), total_size, metadata);
        }
        Self {
            success: true,
            file_path: paths.first().cloned(),
            file_paths: Some(paths),
            file_size: total_size,
            duration: metadata.duration,
            title: metadata.title,
            description: metadata.description,
            author: metadata.author,
            author_name: metadata.author_name,
            likes: metadata.likes,
            comments: metadata.comments,
            views: metadata.views,
            url: metadata.url,
            platform: platform.display_name().to_string(),
            is_carousel: true,
            error_message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_kind_mapping_is_exhaustive() {
        assert_eq!(ContentType::Video.delivery_kind(), DeliveryKind::Video);
        assert_eq!(ContentType::Reel.delivery_kind(), DeliveryKind::Video);
        assert_eq!(ContentType::Shorts.delivery_kind(), DeliveryKind::Video);
        assert_eq!(ContentType::Audio.delivery_kind(), DeliveryKind::Audio);
        assert_eq!(ContentType::Photo.delivery_kind(), DeliveryKind::Document);
        assert_eq!(ContentType::Story.delivery_kind(), DeliveryKind::Document);
        assert_eq!(ContentType::Tweet.delivery_kind(), DeliveryKind::Document);
        assert_eq!(ContentType::Post.delivery_kind(), DeliveryKind::Document);
    }

    #[test]
    fn test_size_ceilings() {
        assert_eq!(ContentType::Video.size_ceiling(), MAX_VIDEO_BYTES);
        assert_eq!(ContentType::Audio.size_ceiling(), MAX_AUDIO_BYTES);
        assert_eq!(ContentType::Photo.size_ceiling(), MAX_PHOTO_BYTES);
        assert_eq!(ContentType::Tweet.size_ceiling(), MAX_VIDEO_BYTES);
    }

    #[test]
    fn test_batch_of_one_is_not_a_carousel() {
        let result = DownloadResult::batch(
            Platform::X,
            vec![PathBuf::from("/tmp/a.mp4")],
            10,
            PostMetadata::default(),
        );
        assert!(result.success);
        assert!(!result.is_carousel);
        assert!(result.file_paths.is_none());
        assert_eq!(result.file_path, Some(PathBuf::from("/tmp/a.mp4")));
    }

    #[test]
    fn test_batch_sets_primary_path() {
        let result = DownloadResult::batch(
            Platform::X,
            vec![PathBuf::from("/tmp/a.mp4"), PathBuf::from("/tmp/b.mp4")],
            20,
            PostMetadata::default(),
        );
        assert!(result.is_carousel);
        assert_eq!(result.file_path, Some(PathBuf::from("/tmp/a.mp4")));
        assert_eq!(result.file_paths.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_failure_invariant() {
        let result = DownloadResult::failure(Platform::Vk, "nope");
        assert!(!result.success);
        assert!(result.file_path.is_none());
        assert!(result.error_message.is_some());
        assert_eq!(result.platform, "VK");
    }
}
