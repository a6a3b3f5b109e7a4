// URL classification: platform detection, post-id extraction, canonical
// URL rewriting.
//
// Platform detection is an ordered substring match over host fragments;
// id extraction walks an ordered regex list per platform, first match wins.
// The only URLs the classifier rewrites are VK's embedded-player form
// (video_ext.php) and the vkvideo.ru domain variant, which the downstream
// extractor does not understand.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::models::{ContentType, Platform, UrlInfo};

lazy_static! {
    static ref INSTAGRAM_PATTERNS: Vec<Regex> = vec![
        // post / reel
        Regex::new(r"https?://(?:www\.)?instagram\.com/(?:p|reel)/([a-zA-Z0-9_-]+)").unwrap(),
        // stories
        Regex::new(r"https?://(?:www\.)?instagram\.com/stories/([^/?]+)/(\d+)").unwrap(),
    ];

    static ref YOUTUBE_PATTERNS: Vec<Regex> = vec![
        // long URL
        Regex::new(r"https?://(?:www\.)?youtube\.com/watch\?v=([a-zA-Z0-9_-]+)").unwrap(),
        // short URL
        Regex::new(r"https?://youtu\.be/([a-zA-Z0-9_-]+)").unwrap(),
        // shorts
        Regex::new(r"https?://(?:www\.)?youtube\.com/shorts/([a-zA-Z0-9_-]+)").unwrap(),
    ];

    static ref TIKTOK_PATTERNS: Vec<Regex> = vec![
        // full URL: the id is the second capture
        Regex::new(r"https?://(?:www\.)?tiktok\.com/@([^/]+)/video/(\d+)").unwrap(),
        // short-link forms
        Regex::new(r"https?://vm\.tiktok\.com/([a-zA-Z0-9]+)").unwrap(),
        Regex::new(r"https?://vt\.tiktok\.com/([a-zA-Z0-9]+)").unwrap(),
    ];

    static ref VK_PATTERNS: Vec<Regex> = vec![
        // wall/video/audio/photo posts
        Regex::new(r"https?://(?:www\.)?vk\.com/(?:wall|video|audio|photo)(-?\d+_\d+)").unwrap(),
        Regex::new(r"https?://(?:www\.)?vk\.com/video(-?\d+_\d+)").unwrap(),
        // wall post addressed by owner only
        Regex::new(r"https?://(?:www\.)?vk\.com/wall(-?\d+)\?").unwrap(),
        Regex::new(r"https?://vk\.com/(?:wall|video)(-?\d+_\d+)").unwrap(),
        // vkvideo.ru domain variant
        Regex::new(r"https?://(?:www\.)?vkvideo\.ru/.*video(-?\d+_\d+)").unwrap(),
    ];

    static ref X_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"https?://(?:www\.)?(?:twitter|x)\.com/\w+/status/(\d+)").unwrap(),
        Regex::new(r"https?://(?:www\.)?x\.com/\w+/(?:status|web)/?(\d+)").unwrap(),
        Regex::new(r"https?://(?:twitter\.com)/\w+/status/(\d+)").unwrap(),
    ];

    static ref URL_IN_TEXT: Regex = Regex::new(r"https?://[^\s]+").unwrap();
}

pub struct UrlClassifier;

impl UrlClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Detect the platform by host fragment. First match wins.
    pub fn detect_platform(url: &str) -> Platform {
        if url.is_empty() {
            return Platform::Unknown;
        }

        let lower = url.to_lowercase();

        if lower.contains("instagram.com") {
            Platform::Instagram
        } else if lower.contains("youtube.com") || lower.contains("youtu.be") {
            Platform::Youtube
        } else if lower.contains("tiktok.com") {
            Platform::Tiktok
        } else if lower.contains("vk.com")
            || lower.contains("vkontakte.com")
            || lower.contains("vkvideo.ru")
        {
            Platform::Vk
        } else if lower.contains("twitter.com") || lower.contains("x.com") {
            Platform::X
        } else {
            Platform::Unknown
        }
    }

    fn extract_instagram(url: &str) -> Option<(String, ContentType)> {
        for pattern in INSTAGRAM_PATTERNS.iter() {
            if let Some(caps) = pattern.captures(url) {
                let content_type = if url.contains("/stories/") {
                    ContentType::Story
                } else if url.contains("/reel/") {
                    ContentType::Reel
                } else {
                    // Generic post; the actual media kind is resolved by the
                    // downloader, not here
                    ContentType::Photo
                };
                let post_id = caps.get(1)?.as_str().to_string();
                return Some((post_id, content_type));
            }
        }
        None
    }

    fn extract_youtube(url: &str) -> Option<(String, ContentType)> {
        for pattern in YOUTUBE_PATTERNS.iter() {
            if let Some(caps) = pattern.captures(url) {
                let content_type = if url.contains("/shorts/") {
                    ContentType::Shorts
                } else {
                    ContentType::Video
                };
                let video_id = caps.get(1)?.as_str().to_string();
                return Some((video_id, content_type));
            }
        }
        None
    }

    fn extract_tiktok(url: &str) -> Option<(String, ContentType)> {
        // Full form carries (username, id); the id is the last capture.
        // Short links carry only the id.
        for pattern in TIKTOK_PATTERNS.iter() {
            if let Some(caps) = pattern.captures(url) {
                let id = caps
                    .get(caps.len() - 1)
                    .map(|m| m.as_str().to_string())?;
                return Some((id, ContentType::Video));
            }
        }
        None
    }

    fn extract_vk(url: &str) -> Option<(String, ContentType)> {
        // Embedded-player form: compose oid_id from the query string
        if url.contains("video_ext.php") {
            if let Ok(parsed) = Url::parse(url) {
                let mut oid = None;
                let mut vid = None;
                for (key, value) in parsed.query_pairs() {
                    match key.as_ref() {
                        "oid" => oid = Some(value.to_string()),
                        "id" => vid = Some(value.to_string()),
                        _ => {}
                    }
                }
                if let (Some(oid), Some(vid)) = (oid, vid) {
                    return Some((format!("{}_{}", oid, vid), ContentType::Video));
                }
            }
        }

        for pattern in VK_PATTERNS.iter() {
            if let Some(caps) = pattern.captures(url) {
                let post_id = match caps.get(1) {
                    Some(m) => m.as_str().to_string(),
                    None => continue,
                };

                let content_type = if url.contains("/video") {
                    ContentType::Video
                } else if url.contains("/audio") {
                    ContentType::Audio
                } else if url.contains("/photo") {
                    ContentType::Photo
                } else {
                    ContentType::Post
                };

                return Some((post_id, content_type));
            }
        }
        None
    }

    fn extract_x(url: &str) -> Option<(String, ContentType)> {
        for pattern in X_PATTERNS.iter() {
            if let Some(caps) = pattern.captures(url) {
                let tweet_id = caps.get(1)?.as_str().to_string();
                return Some((tweet_id, ContentType::Tweet));
            }
        }
        None
    }

    /// Classify one raw user-submitted string into a `UrlInfo`.
    pub fn classify(&self, raw: &str) -> UrlInfo {
        if raw.trim().is_empty() {
            return UrlInfo::invalid(Platform::Unknown, raw, "URL must not be empty");
        }

        let url = raw.trim();

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return UrlInfo::invalid(
                Platform::Unknown,
                url,
                "URL must start with http:// or https://",
            );
        }

        let platform = Self::detect_platform(url);

        match platform {
            Platform::Instagram => match Self::extract_instagram(url) {
                Some((post_id, content_type)) => {
                    UrlInfo::valid(platform, url, post_id, content_type)
                }
                None => UrlInfo::invalid(
                    platform,
                    url,
                    "Could not extract the post id from the Instagram link",
                ),
            },

            Platform::Youtube => match Self::extract_youtube(url) {
                Some((video_id, content_type)) => {
                    UrlInfo::valid(platform, url, video_id, content_type)
                }
                None => UrlInfo::invalid(
                    platform,
                    url,
                    "Could not extract the video id from the YouTube link",
                ),
            },

            Platform::Tiktok => match Self::extract_tiktok(url) {
                Some((video_id, content_type)) => {
                    UrlInfo::valid(platform, url, video_id, content_type)
                }
                None => UrlInfo::invalid(
                    platform,
                    url,
                    "Could not extract the video id from the TikTok link",
                ),
            },

            Platform::Vk => match Self::extract_vk(url) {
                Some((post_id, content_type)) => {
                    // The embedded-player and vkvideo.ru forms are rewritten
                    // to the canonical watch URL the extractor understands
                    let canonical = if content_type == ContentType::Video
                        && (url.contains("video_ext.php") || url.contains("vkvideo.ru"))
                    {
                        format!("https://vk.com/video{}", post_id)
                    } else {
                        url.to_string()
                    };
                    UrlInfo::valid(platform, canonical, post_id, content_type)
                }
                None => UrlInfo::invalid(platform, url, "Could not extract the VK post id"),
            },

            Platform::X => match Self::extract_x(url) {
                Some((tweet_id, content_type)) => {
                    UrlInfo::valid(platform, url, tweet_id, content_type)
                }
                None => UrlInfo::invalid(platform, url, "Could not extract the tweet id"),
            },

            Platform::Unknown => UrlInfo::invalid(
                platform,
                url,
                "Unsupported platform. Supported platforms: Instagram, YouTube, TikTok, VK, X",
            ),
        }
    }
}

impl Default for UrlClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Find every http(s) URL in arbitrary message text.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_IN_TEXT
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(url: &str) -> UrlInfo {
        UrlClassifier::new().classify(url)
    }

    // ----- platform detection -----

    #[test]
    fn test_detect_instagram_platform() {
        for url in [
            "https://www.instagram.com/p/ABC123/",
            "https://instagram.com/reel/XYZ789/",
            "https://www.instagram.com/stories/username/123456/",
        ] {
            assert_eq!(UrlClassifier::detect_platform(url), Platform::Instagram);
        }
    }

    #[test]
    fn test_detect_youtube_platform() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/abc123",
        ] {
            assert_eq!(UrlClassifier::detect_platform(url), Platform::Youtube);
        }
    }

    #[test]
    fn test_detect_tiktok_platform() {
        for url in [
            "https://www.tiktok.com/@username/video/1234567890",
            "https://vm.tiktok.com/ZMhxxx/",
            "https://vt.tiktok.com/abc123/",
        ] {
            assert_eq!(UrlClassifier::detect_platform(url), Platform::Tiktok);
        }
    }

    #[test]
    fn test_detect_vk_platform() {
        for url in [
            "https://vk.com/wall-123_456",
            "https://www.vk.com/video-123_456",
            "https://vk.com/audio123_456",
            "https://vkvideo.ru/video-123_456",
        ] {
            assert_eq!(UrlClassifier::detect_platform(url), Platform::Vk);
        }
    }

    #[test]
    fn test_detect_x_platform() {
        for url in [
            "https://twitter.com/username/status/1234567890",
            "https://x.com/username/status/1234567890",
            "https://www.x.com/user/status/9876543210",
        ] {
            assert_eq!(UrlClassifier::detect_platform(url), Platform::X);
        }
    }

    #[test]
    fn test_detect_unknown_platform() {
        assert_eq!(
            UrlClassifier::detect_platform("https://google.com"),
            Platform::Unknown
        );
        assert_eq!(UrlClassifier::detect_platform(""), Platform::Unknown);
    }

    // ----- per-platform extraction -----

    #[test]
    fn test_instagram_post() {
        let info = classify("https://www.instagram.com/p/ABC123/");
        assert!(info.is_valid);
        assert_eq!(info.platform, Platform::Instagram);
        assert_eq!(info.post_id.as_deref(), Some("ABC123"));
        assert_eq!(info.content_type, Some(ContentType::Photo));
    }

    #[test]
    fn test_instagram_reel() {
        let info = classify("https://instagram.com/reel/XYZ789/");
        assert!(info.is_valid);
        assert_eq!(info.post_id.as_deref(), Some("XYZ789"));
        assert_eq!(info.content_type, Some(ContentType::Reel));
    }

    #[test]
    fn test_instagram_story() {
        let info = classify("https://www.instagram.com/stories/someuser/31415926/");
        assert!(info.is_valid);
        assert_eq!(info.post_id.as_deref(), Some("someuser"));
        assert_eq!(info.content_type, Some(ContentType::Story));
    }

    #[test]
    fn test_youtube_watch() {
        let info = classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert!(info.is_valid);
        assert_eq!(info.post_id.as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(info.content_type, Some(ContentType::Video));
    }

    #[test]
    fn test_youtube_short_link() {
        let info = classify("https://youtu.be/dQw4w9WgXcQ");
        assert!(info.is_valid);
        assert_eq!(info.platform, Platform::Youtube);
        assert_eq!(info.post_id.as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(info.content_type, Some(ContentType::Video));
    }

    #[test]
    fn test_youtube_shorts() {
        let info = classify("https://www.youtube.com/shorts/abc123");
        assert!(info.is_valid);
        assert_eq!(info.post_id.as_deref(), Some("abc123"));
        assert_eq!(info.content_type, Some(ContentType::Shorts));
    }

    #[test]
    fn test_tiktok_full_url() {
        let info = classify("https://www.tiktok.com/@username/video/1234567890");
        assert!(info.is_valid);
        assert_eq!(info.post_id.as_deref(), Some("1234567890"));
        assert_eq!(info.content_type, Some(ContentType::Video));
    }

    #[test]
    fn test_tiktok_short_links() {
        let info = classify("https://vm.tiktok.com/ZMhxxx/");
        assert!(info.is_valid);
        assert_eq!(info.platform, Platform::Tiktok);
        assert_eq!(info.post_id.as_deref(), Some("ZMhxxx"));
        assert_eq!(info.content_type, Some(ContentType::Video));

        let info = classify("https://vt.tiktok.com/abc123/");
        assert!(info.is_valid);
        assert_eq!(info.post_id.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_vk_wall_post() {
        let info = classify("https://vk.com/wall-123_456");
        assert!(info.is_valid);
        assert_eq!(info.platform, Platform::Vk);
        assert_eq!(info.post_id.as_deref(), Some("-123_456"));
        assert_eq!(info.content_type, Some(ContentType::Post));
    }

    #[test]
    fn test_vk_video() {
        let info = classify("https://vk.com/video-123_456");
        assert!(info.is_valid);
        assert_eq!(info.post_id.as_deref(), Some("-123_456"));
        assert_eq!(info.content_type, Some(ContentType::Video));
    }

    #[test]
    fn test_vk_audio() {
        let info = classify("https://vk.com/audio123_456");
        assert!(info.is_valid);
        assert_eq!(info.post_id.as_deref(), Some("123_456"));
        assert_eq!(info.content_type, Some(ContentType::Audio));
    }

    #[test]
    fn test_vk_wall_owner_only() {
        let info = classify("https://vk.com/wall-123?w=wall-123_456");
        assert!(info.is_valid);
        assert_eq!(info.post_id.as_deref(), Some("-123"));
        assert_eq!(info.content_type, Some(ContentType::Post));
    }

    #[test]
    fn test_vk_embedded_player_rewrite() {
        let info = classify("https://vk.com/video_ext.php?oid=-123&id=456&hash=abc");
        assert!(info.is_valid);
        assert_eq!(info.post_id.as_deref(), Some("-123_456"));
        assert_eq!(info.content_type, Some(ContentType::Video));
        assert_eq!(info.url, "https://vk.com/video-123_456");
    }

    #[test]
    fn test_vkvideo_ru_rewrite() {
        let info = classify("https://vkvideo.ru/video-123_456");
        assert!(info.is_valid);
        assert_eq!(info.post_id.as_deref(), Some("-123_456"));
        assert_eq!(info.url, "https://vk.com/video-123_456");
    }

    #[test]
    fn test_vk_plain_url_not_rewritten() {
        let info = classify("https://vk.com/video-123_456");
        assert_eq!(info.url, "https://vk.com/video-123_456");
    }

    #[test]
    fn test_x_status_variants() {
        let info = classify("https://twitter.com/username/status/1234567890");
        assert!(info.is_valid);
        assert_eq!(info.platform, Platform::X);
        assert_eq!(info.post_id.as_deref(), Some("1234567890"));
        assert_eq!(info.content_type, Some(ContentType::Tweet));

        let info = classify("https://x.com/username/status/1234567890");
        assert!(info.is_valid);
        assert_eq!(info.post_id.as_deref(), Some("1234567890"));

        let info = classify("https://www.x.com/user/status/9876543210");
        assert!(info.is_valid);
        assert_eq!(info.post_id.as_deref(), Some("9876543210"));
    }

    // ----- failure taxonomy -----

    #[test]
    fn test_empty_input() {
        let info = classify("");
        assert!(!info.is_valid);
        assert!(info.post_id.is_none());
        assert!(info.error_message.as_deref().unwrap().contains("empty"));
    }

    #[test]
    fn test_missing_scheme_is_invalid_for_every_platform() {
        for url in [
            "www.instagram.com/p/ABC123/",
            "youtube.com/watch?v=dQw4w9WgXcQ",
            "vm.tiktok.com/ZMhxxx/",
            "vk.com/wall-123_456",
            "x.com/user/status/123",
        ] {
            let info = classify(url);
            assert!(!info.is_valid, "{} should be invalid", url);
            assert!(info
                .error_message
                .as_deref()
                .unwrap()
                .contains("http:// or https://"));
        }
    }

    #[test]
    fn test_unknown_platform_lists_supported() {
        let info = classify("https://google.com");
        assert!(!info.is_valid);
        assert_eq!(info.platform, Platform::Unknown);
        assert!(info.post_id.is_none());
        let msg = info.error_message.unwrap();
        for name in ["Instagram", "YouTube", "TikTok", "VK", "X"] {
            assert!(msg.contains(name), "message should name {}", name);
        }
    }

    #[test]
    fn test_recognized_platform_without_id() {
        let info = classify("https://www.instagram.com/explore/");
        assert!(!info.is_valid);
        assert_eq!(info.platform, Platform::Instagram);
        assert!(info.post_id.is_none());
        assert!(info.error_message.as_deref().unwrap().contains("post id"));
    }

    #[test]
    fn test_invalid_implies_no_post_id() {
        for url in ["", "no-scheme.com", "https://google.com", "https://vk.com/feed"] {
            let info = classify(url);
            assert!(!info.is_valid);
            assert!(info.post_id.is_none());
            assert!(info.error_message.is_some());
        }
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let info = classify("  https://youtu.be/dQw4w9WgXcQ \n");
        assert!(info.is_valid);
        assert_eq!(info.post_id.as_deref(), Some("dQw4w9WgXcQ"));
    }

    // ----- URL harvesting -----

    #[test]
    fn test_extract_urls_from_text() {
        let text = "look at this https://youtu.be/abc and https://vk.com/wall-1_2 please";
        let urls = extract_urls(text);
        assert_eq!(urls, vec!["https://youtu.be/abc", "https://vk.com/wall-1_2"]);
    }

    #[test]
    fn test_extract_urls_none_found() {
        assert!(extract_urls("no links here").is_empty());
    }
}
