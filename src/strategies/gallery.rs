// Gallery extraction: one metadata-JSON run of gallery-dl, then direct
// HTTP fetches of every post image.
//
// Instagram posts are frequently multi-image, so they are always routed
// through here rather than the generic single-media extractor. The same
// flow backs the photo fallback for X posts that carry no video.

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;

use crate::assembler::{assemble, Arena};
use crate::config::DownloaderConfig;
use crate::errors::DownloadError;
use crate::models::{ContentType, DownloadResult, Platform, PostMetadata, UrlInfo};
use crate::retry::random_user_agent;
use crate::tools::{self, ExtractionTool};
use crate::utils::run_output_with_timeout;

use super::traits::{ExtractionStrategy, ResolveOptions};

pub struct GalleryStrategy {
    config: DownloaderConfig,
    gallery_dl: String,
    http: reqwest::Client,
}

impl GalleryStrategy {
    pub fn new(config: DownloaderConfig) -> Self {
        let mut builder = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .connect_timeout(std::time::Duration::from_secs(15));

        if let Some(proxy_url) = &config.proxy {
            match reqwest::Proxy::all(proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => log::warn!("invalid proxy {}: {}", proxy_url, e),
            }
        }

        let http = builder
            .build()
            .expect("gallery HTTP client build should succeed");

        Self {
            gallery_dl: tools::locate(ExtractionTool::GalleryDl),
            config,
            http,
        }
    }

    /// CDN path-segment marker of post-body images. Keeps profile pictures
    /// and avatars out of the batch.
    fn post_image_marker(platform: Platform) -> Option<&'static str> {
        match platform {
            // Post media lands under the `-15/` CDN path, avatars under `-19/`
            Platform::Instagram => Some("-15/"),
            Platform::X => Some("/media/"),
            _ => None,
        }
    }

    /// Walk the tool's JSON event stream: every event whose second element
    /// is an http URL is a downloadable item, its third element the
    /// metadata object. The first metadata object describes the post.
    fn parse_events(stdout: &[u8]) -> Result<(Vec<String>, Option<Value>), DownloadError> {
        let value: Value = serde_json::from_slice(stdout)
            .map_err(|e| DownloadError::ParseError(format!("Invalid gallery JSON: {}", e)))?;

        let events = value
            .as_array()
            .ok_or_else(|| DownloadError::ParseError("gallery output is not a JSON array".to_string()))?;

        let mut urls = Vec::new();
        let mut metadata = None;

        for event in events {
            let Some(items) = event.as_array() else {
                continue;
            };
            if items.len() < 2 {
                continue;
            }
            if let Some(url) = items[1].as_str() {
                if url.starts_with("http") {
                    if metadata.is_none() {
                        metadata = items.get(2).cloned();
                    }
                    urls.push(url.to_string());
                }
            }
        }

        Ok((urls, metadata))
    }

    fn metadata_from(meta: Option<&Value>, fallback_url: &str) -> PostMetadata {
        let empty = Value::Null;
        let meta = meta.unwrap_or(&empty);
        PostMetadata {
            title: None,
            description: meta["description"].as_str().map(|s| s.to_string()),
            author: meta["username"].as_str().map(|s| s.to_string()),
            author_name: meta["fullname"].as_str().map(|s| s.to_string()),
            likes: meta["likes"].as_i64(),
            comments: meta["comments"].as_i64(),
            views: None,
            duration: None,
            url: meta["post_url"]
                .as_str()
                .map(|s| s.to_string())
                .or_else(|| Some(fallback_url.to_string())),
        }
    }

    /// File extension guessed from the image URL path
    fn extension_of(raw_url: &str) -> String {
        if let Ok(parsed) = url::Url::parse(raw_url) {
            if let Some(ext) = parsed.path().rsplit('.').next() {
                if ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return ext.to_lowercase();
                }
            }
        }
        "jpg".to_string()
    }

    /// Fetch one image into the arena. Failures are reported, not fatal to
    /// the batch.
    async fn fetch_image(&self, arena: &Arena, raw_url: &str, index: usize, tag: &str) -> Option<PathBuf> {
        let response = match self
            .http
            .get(raw_url)
            .header(reqwest::header::USER_AGENT, random_user_agent())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                log::warn!("image fetch failed for {}: {}", raw_url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            log::warn!("image fetch for {} returned {}", raw_url, response.status());
            return None;
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("image body read failed for {}: {}", raw_url, e);
                return None;
            }
        };

        let name = format!("{}_{:02}.{}", tag, index + 1, Self::extension_of(raw_url));
        let path = arena.join(&name);
        match tokio::fs::write(&path, &bytes).await {
            Ok(()) => Some(path),
            Err(e) => {
                log::warn!("failed to write {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[async_trait]
impl ExtractionStrategy for GalleryStrategy {
    fn name(&self) -> &'static str {
        "gallery"
    }

    async fn extract(
        &self,
        url_info: &UrlInfo,
        _options: &ResolveOptions,
    ) -> Result<DownloadResult, DownloadError> {
        let tag = url_info.post_id.as_deref().unwrap_or("post");
        let arena = Arena::create(&self.config.dir_for(ContentType::Photo), tag)?;

        log::info!(
            "gallery extraction for {} ({})",
            url_info.url,
            url_info.platform.as_str()
        );

        // Single bounded attempt; the tool does its own pagination and a
        // retry here would re-crawl the whole post
        let mut args = vec!["--dump-json".to_string()];
        if let Some(cookies) = self.config.cookies_if_present() {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().to_string());
        }
        args.push(url_info.url.clone());

        let output =
            match run_output_with_timeout(&self.gallery_dl, args, self.config.gallery_timeout).await
            {
                Ok(output) => output,
                Err(e) => {
                    arena.discard();
                    return Err(e);
                }
            };

        if !output.status.success() {
            arena.discard();
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(DownloadError::from(stderr));
        }

        let (mut urls, meta) = match Self::parse_events(&output.stdout) {
            Ok(parsed) => parsed,
            Err(e) => {
                arena.discard();
                return Err(e);
            }
        };

        if let Some(marker) = Self::post_image_marker(url_info.platform) {
            urls.retain(|u| u.contains(marker));
        }

        if urls.is_empty() {
            arena.discard();
            return Err(DownloadError::EmptyPlaylist);
        }

        let mut paths = Vec::new();
        for (index, image_url) in urls.iter().enumerate() {
            if let Some(path) = self.fetch_image(&arena, image_url, index, tag).await {
                paths.push(path);
            }
        }

        if paths.is_empty() {
            arena.discard();
            return Err(DownloadError::ExecutionError(
                "Could not download any image from the post".to_string(),
            ));
        }

        let metadata = Self::metadata_from(meta.as_ref(), &url_info.url);
        let outcome = assemble(url_info.platform, paths, metadata, ContentType::Photo);
        if outcome.is_err() {
            arena.discard();
        }
        outcome
    }
}
