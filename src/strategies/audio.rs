// Audio extraction: best-audio selected and transcoded to a fixed codec.

use async_trait::async_trait;
use serde_json::Value;

use crate::assembler::{assemble, Arena};
use crate::config::DownloaderConfig;
use crate::errors::DownloadError;
use crate::models::{ContentType, DownloadResult, PostMetadata, UrlInfo};
use crate::retry::{RetryPolicy, RetryingExecutor};
use crate::tools::{self, ExtractionTool};
use crate::utils::run_output_with_timeout;

use super::traits::{ExtractionStrategy, ResolveOptions};

const AUDIO_CODEC: &str = "mp3";
const AUDIO_QUALITY: &str = "192K";

pub struct AudioStrategy {
    config: DownloaderConfig,
    ytdlp: String,
    executor: RetryingExecutor,
}

impl AudioStrategy {
    pub fn new(config: DownloaderConfig) -> Self {
        let executor = RetryingExecutor::new(RetryPolicy::from_config(&config));
        Self {
            ytdlp: tools::locate(ExtractionTool::YtDlp),
            config,
            executor,
        }
    }

    fn base_args(&self, arena: &Arena) -> Vec<String> {
        let mut args = vec![
            "--no-simulate".to_string(),
            "--dump-single-json".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            "30".to_string(),
            "-f".to_string(),
            "bestaudio".to_string(),
            "-x".to_string(),
            "--audio-format".to_string(),
            AUDIO_CODEC.to_string(),
            "--audio-quality".to_string(),
            AUDIO_QUALITY.to_string(),
            "-P".to_string(),
            arena.path().to_string_lossy().to_string(),
            "-o".to_string(),
            "%(title)s.%(ext)s".to_string(),
        ];

        if let Some(cookies) = self.config.cookies_if_present() {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().to_string());
        }

        if let Some(proxy) = &self.config.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        args
    }
}

#[async_trait]
impl ExtractionStrategy for AudioStrategy {
    fn name(&self) -> &'static str {
        "audio"
    }

    async fn extract(
        &self,
        url_info: &UrlInfo,
        _options: &ResolveOptions,
    ) -> Result<DownloadResult, DownloadError> {
        let tag = url_info.post_id.as_deref().unwrap_or("audio");
        let arena = Arena::create(&self.config.dir_for(ContentType::Audio), tag)?;

        log::info!(
            "audio extraction for {} ({})",
            url_info.url,
            url_info.platform.as_str()
        );

        let base_args = self.base_args(&arena);
        let program = self.ytdlp.clone();
        let url = url_info.url.clone();
        let timeout = self.config.subprocess_timeout;

        let stdout = self
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
            .await;

        let stdout = match stdout {
            Ok(stdout) => stdout,
            Err(e) => {
                arena.discard();
                return Err(e);
            }
        };

        let payload: Value = match serde_json::from_slice(&stdout) {
            Ok(payload) => payload,
            Err(e) => {
                arena.discard();
                return Err(DownloadError::ParseError(format!(
                    "Invalid extractor JSON: {}",
                    e
                )));
            }
        };

        // Transcoding renames the output, so the freshest file in the arena
        // is the authoritative artifact; the payload path is the fallback.
        let path = arena
            .newest_file(self.config.recency_window)
            .or_else(|| {
                payload["requested_downloads"][0]["filepath"]
                    .as_str()
                    .map(std::path::PathBuf::from)
                    .filter(|p| p.is_file())
            });

        let outcome = match path {
            Some(path) => {
                let metadata = PostMetadata {
                    title: payload["title"].as_str().map(|s| s.to_string()),
                    author: payload["uploader_id"].as_str().map(|s| s.to_string()),
                    author_name: payload["uploader"].as_str().map(|s| s.to_string()),
                    duration: payload["duration"].as_f64(),
                    url: payload["webpage_url"]
                        .as_str()
                        .map(|s| s.to_string())
                        .or_else(|| Some(url_info.url.clone())),
                    ..PostMetadata::default()
                };
                assemble(url_info.platform, vec![path], metadata, ContentType::Audio)
            }
            None => Err(DownloadError::EmptyPlaylist),
        };

        if outcome.is_err() {
            arena.discard();
        }
        outcome
    }
}
