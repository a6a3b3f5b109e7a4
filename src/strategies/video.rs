// Generic video extraction through yt-dlp.
//
// Covers the default path for every platform plus the playlist-shaped
// multi-video case (X posts carrying several independent clips). The tool
// is asked for a single JSON payload alongside the download, which reports
// the exact output path of each entry; an in-arena newest-file scan covers
// tool versions that omit it.

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;

use crate::assembler::{assemble, Arena};
use crate::config::DownloaderConfig;
use crate::errors::DownloadError;
use crate::models::{ContentType, DownloadResult, Platform, PostMetadata, UrlInfo};
use crate::retry::{RetryPolicy, RetryingExecutor};
use crate::tools::{self, ExtractionTool};
use crate::utils::run_output_with_timeout;

use super::traits::{ExtractionStrategy, ResolveOptions};

pub struct VideoStrategy {
    config: DownloaderConfig,
    ytdlp: String,
    executor: RetryingExecutor,
}

impl VideoStrategy {
    pub fn new(config: DownloaderConfig) -> Self {
        let executor = RetryingExecutor::new(RetryPolicy::from_config(&config));
        Self {
            ytdlp: tools::locate(ExtractionTool::YtDlp),
            config,
            executor,
        }
    }

    /// Format selector per platform. YouTube is capped at 720p for
    /// non-privileged requests.
    fn format_selector(platform: Platform, privileged: bool) -> &'static str {
        match platform {
            Platform::Instagram => "best",
            Platform::Youtube if !privileged => {
                "best[height<=720][ext=mp4]/best[height<=720]/best"
            }
            Platform::Youtube => "best[ext=mp4]/best",
            Platform::Tiktok | Platform::Vk | Platform::X => "best[ext=mp4]/best",
            Platform::Unknown => "best[ext=mp4]/best",
        }
    }

    /// Platform-specific pacing hints handed to the tool
    fn tuning_args(platform: Platform) -> Vec<String> {
        match platform {
            Platform::Instagram => vec!["--sleep-requests".to_string(), "1".to_string()],
            Platform::Tiktok => vec!["--sleep-interval".to_string(), "1".to_string()],
            _ => Vec::new(),
        }
    }

    fn base_args(&self, url_info: &UrlInfo, options: &ResolveOptions, arena: &Arena) -> Vec<String> {
        let mut args = vec![
            "--no-simulate".to_string(),
            "--dump-single-json".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            "30".to_string(),
            "--retries".to_string(),
            "2".to_string(),
            "-f".to_string(),
            Self::format_selector(url_info.platform, options.privileged).to_string(),
            "-P".to_string(),
            arena.path().to_string_lossy().to_string(),
            "-o".to_string(),
            "%(title)s.%(ext)s".to_string(),
        ];

        if url_info.platform == Platform::Youtube {
            args.push("--no-playlist".to_string());
        }

        if let Some(cookies) = self.config.cookies_if_present() {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().to_string());
        }

        if let Some(proxy) = &self.config.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        args.extend(Self::tuning_args(url_info.platform));
        args
    }

    /// Run the tool through the retrying executor and hand back the JSON
    /// payload.
    async fn run_extractor(
        &self,
        url_info: &UrlInfo,
        options: &ResolveOptions,
        arena: &Arena,
    ) -> Result<Value, DownloadError> {
        let base_args = self.base_args(url_info, options, arena);
        let program = self.ytdlp.clone();
        let url = url_info.url.clone();
        let timeout = self.config.subprocess_timeout;

        let output = self
            .executor
            .run(|attempt| {
                let program = program.clone();
                let mut args = base_args.clone();
                args.push("--user-agent".to_string());
                args.push(attempt.user_agent.to_string());
                args.push(url.clone());
                async move {
                    let output = run_output_with_timeout(&program, args, timeout).await?;
                    if output.status.success() {
                        Ok(output.stdout)
                    } else {
                        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                        Err(DownloadError::from(stderr))
                    }
                }
            })
            .await?;

        serde_json::from_slice(&output)
            .map_err(|e| DownloadError::ParseError(format!("Invalid extractor JSON: {}", e)))
    }

    /// Exact output path reported by the payload, when present and real.
    fn reported_filepath(entry: &Value) -> Option<PathBuf> {
        let candidates = [
            entry["requested_downloads"][0]["filepath"].as_str(),
            entry["filepath"].as_str(),
            entry["_filename"].as_str(),
        ];
        for candidate in candidates.into_iter().flatten() {
            let path = PathBuf::from(candidate);
            if path.is_file() {
                return Some(path);
            }
        }
        None
    }

    fn metadata_from(payload: &Value, fallback_url: &str) -> PostMetadata {
        PostMetadata {
            title: payload["title"].as_str().map(|s| s.to_string()),
            description: payload["description"].as_str().map(|s| s.to_string()),
            author: payload["uploader_id"].as_str().map(|s| s.to_string()),
            author_name: payload["uploader"].as_str().map(|s| s.to_string()),
            likes: payload["like_count"].as_i64(),
            comments: payload["comment_count"].as_i64(),
            views: payload["view_count"].as_i64(),
            duration: payload["duration"].as_f64(),
            url: payload["webpage_url"]
                .as_str()
                .map(|s| s.to_string())
                .or_else(|| Some(fallback_url.to_string())),
        }
    }

    /// Multi-video post: one independent file per playlist entry. When the
    /// payload does not report every path, the arena scan collects as many
    /// recent files as there were entries.
    fn collect_batch(entries: &[Value], arena: &Arena) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = entries.iter().filter_map(Self::reported_filepath).collect();

        if paths.len() < entries.len() {
            log::debug!(
                "payload reported {} of {} paths, falling back to arena scan",
                paths.len(),
                entries.len()
            );
            paths = arena.recent_files(entries.len());
        }

        paths
    }
}

#[async_trait]
impl ExtractionStrategy for VideoStrategy {
    fn name(&self) -> &'static str {
        "video"
    }

    async fn extract(
        &self,
        url_info: &UrlInfo,
        options: &ResolveOptions,
    ) -> Result<DownloadResult, DownloadError> {
        let content_type = url_info.content_type.unwrap_or(ContentType::Video);
        let tag = url_info.post_id.as_deref().unwrap_or("media");
        let arena = Arena::create(&self.config.dir_for(content_type), tag)?;

        log::info!(
            "video extraction for {} ({})",
            url_info.url,
            url_info.platform.as_str()
        );

        let payload = match self.run_extractor(url_info, options, &arena).await {
            Ok(payload) => payload,
            Err(e) => {
                arena.discard();
                return Err(e);
            }
        };

        let outcome = if let Some(entries) = payload["entries"].as_array() {
            if entries.is_empty() {
                Err(DownloadError::EmptyPlaylist)
            } else {
                let paths = Self::collect_batch(entries, &arena);
                let mut metadata = Self::metadata_from(&payload, &url_info.url);
                if metadata.title.is_none() {
                    metadata = Self::metadata_from(&entries[0], &url_info.url);
                }
                assemble(url_info.platform, paths, metadata, content_type)
            }
        } else {
            let path = Self::reported_filepath(&payload)
                .or_else(|| arena.newest_file(self.config.recency_window));
            match path {
                Some(path) => {
                    let metadata = Self::metadata_from(&payload, &url_info.url);
                    assemble(url_info.platform, vec![path], metadata, content_type)
                }
                // The payload parsed but nothing landed on disk: the post
                // carries no media this extractor can fetch
                None => Err(DownloadError::EmptyPlaylist),
            }
        };

        if outcome.is_err() {
            arena.discard();
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_selector_caps_youtube_for_unprivileged() {
        let capped = VideoStrategy::format_selector(Platform::Youtube, false);
        assert!(capped.contains("height<=720"));

        let full = VideoStrategy::format_selector(Platform::Youtube, true);
        assert!(!full.contains("height<=720"));
    }

    #[test]
    fn test_format_selector_instagram_is_plain_best() {
        assert_eq!(VideoStrategy::format_selector(Platform::Instagram, false), "best");
    }

    #[test]
    fn test_format_selector_prefers_mp4_elsewhere() {
        for platform in [Platform::Tiktok, Platform::Vk, Platform::X] {
            assert!(VideoStrategy::format_selector(platform, false).contains("ext=mp4"));
        }
    }

    #[test]
    fn test_metadata_from_payload() {
        let payload: Value = serde_json::from_str(
            r#"{
                "title": "A Video",
                "description": "desc",
                "uploader_id": "user1",
                "uploader": "User One",
                "like_count": 10,
                "comment_count": 2,
                "view_count": 1000,
                "duration": 12.5,
                "webpage_url": "https://example.com/v/1"
            }"#,
        )
        .unwrap();

        let meta = VideoStrategy::metadata_from(&payload, "https://fallback");
        assert_eq!(meta.title.as_deref(), Some("A Video"));
        assert_eq!(meta.author.as_deref(), Some("user1"));
        assert_eq!(meta.author_name.as_deref(), Some("User One"));
        assert_eq!(meta.likes, Some(10));
        assert_eq!(meta.views, Some(1000));
        assert_eq!(meta.duration, Some(12.5));
        assert_eq!(meta.url.as_deref(), Some("https://example.com/v/1"));
    }

    #[test]
    fn test_metadata_falls_back_to_request_url() {
        let payload: Value = serde_json::from_str(r#"{"title": "t"}"#).unwrap();
        let meta = VideoStrategy::metadata_from(&payload, "https://fallback");
        assert_eq!(meta.url.as_deref(), Some("https://fallback"));
    }

    #[test]
    fn test_reported_filepath_requires_existing_file() {
        let payload: Value = serde_json::from_str(
            r#"{"requested_downloads": [{"filepath": "/nonexistent/file.mp4"}]}"#,
        )
        .unwrap();
        assert!(VideoStrategy::reported_filepath(&payload).is_none());
    }

    #[test]
    fn test_reported_filepath_reads_payload() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("out.mp4");
        std::fs::write(&file, b"x").unwrap();

        let payload: Value = serde_json::from_str(&format!(
            r#"{{"requested_downloads": [{{"filepath": "{}"}}]}}"#,
            file.display()
        ))
        .unwrap();
        assert_eq!(VideoStrategy::reported_filepath(&payload), Some(file));
    }
}
