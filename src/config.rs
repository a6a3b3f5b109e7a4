// Pipeline configuration: directory layout, credentials, timeouts, retry
// and retention knobs.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::ContentType;

/// Environment override for the data directory
pub const ENV_DATA_DIR: &str = "SOC_DOWNLOADER_DATA_DIR";
/// Environment override for the Netscape-format cookie file
pub const ENV_COOKIES: &str = "SOC_DOWNLOADER_COOKIES";
/// Environment override for the proxy URL (http:// or socks5h://)
pub const ENV_PROXY: &str = "SOC_DOWNLOADER_PROXY";

#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Root of the artifact tree; content-type subdirectories live below it
    pub data_dir: PathBuf,
    /// Netscape cookie file used for authenticated extraction. May be absent
    /// or stale at any call; it is rewritten out-of-band.
    pub cookies_file: Option<PathBuf>,
    /// Optional proxy handed to the extraction tools and the HTTP client
    pub proxy: Option<String>,

    // Retry policy
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub rate_limit_delay: Duration,
    pub max_jitter: Duration,

    // Subprocess limits
    pub subprocess_timeout: Duration,
    pub gallery_timeout: Duration,

    /// Window for the in-arena newest-file fallback lookup
    pub recency_window: Duration,

    // Retention policy
    pub sweep_interval: Duration,
    pub retention_age: Duration,
    pub startup_retention_age: Duration,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("soc-downloader");
        let cookies_file = data_dir.join("cookies.txt");

        Self {
            data_dir,
            cookies_file: Some(cookies_file),
            proxy: None,
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            rate_limit_delay: Duration::from_secs(10),
            max_jitter: Duration::from_secs(3),
            subprocess_timeout: Duration::from_secs(300),
            gallery_timeout: Duration::from_secs(60),
            recency_window: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(60 * 60),
            retention_age: Duration::from_secs(7 * 24 * 60 * 60),
            startup_retention_age: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl DownloaderConfig {
    /// Default configuration with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
            config.cookies_file = Some(config.data_dir.join("cookies.txt"));
        }
        if let Ok(path) = std::env::var(ENV_COOKIES) {
            config.cookies_file = Some(PathBuf::from(path));
        }
        if let Ok(proxy) = std::env::var(ENV_PROXY) {
            if !proxy.is_empty() {
                config.proxy = Some(proxy);
            }
        }
        config
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_cookies_file(mut self, path: Option<PathBuf>) -> Self {
        self.cookies_file = path;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_subprocess_timeout(mut self, timeout: Duration) -> Self {
        self.subprocess_timeout = timeout;
        self
    }

    /// Output directory for one content type
    pub fn dir_for(&self, content_type: ContentType) -> PathBuf {
        let sub = match content_type.ceiling_kind() {
            "audio" => "audio",
            "photo" => "photos",
            _ => "videos",
        };
        self.data_dir.join(sub)
    }

    /// Every directory the retention sweeper watches
    pub fn output_dirs(&self) -> Vec<PathBuf> {
        ["videos", "audio", "photos", "other"]
            .iter()
            .map(|sub| self.data_dir.join(sub))
            .collect()
    }

    pub fn ensure_directories(&self) -> io::Result<()> {
        for dir in self.output_dirs() {
            std::fs::create_dir_all(&dir)?;
            log::debug!("directory ensured: {}", dir.display());
        }
        Ok(())
    }

    /// Cookie file path, only when the file actually exists right now.
    pub fn cookies_if_present(&self) -> Option<&Path> {
        self.cookies_file
            .as_deref()
            .filter(|path| path.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_for_maps_ceiling_kinds() {
        let config = DownloaderConfig::default().with_data_dir("/tmp/sd");
        assert_eq!(config.dir_for(ContentType::Video), PathBuf::from("/tmp/sd/videos"));
        assert_eq!(config.dir_for(ContentType::Reel), PathBuf::from("/tmp/sd/videos"));
        assert_eq!(config.dir_for(ContentType::Audio), PathBuf::from("/tmp/sd/audio"));
        assert_eq!(config.dir_for(ContentType::Photo), PathBuf::from("/tmp/sd/photos"));
        assert_eq!(config.dir_for(ContentType::Post), PathBuf::from("/tmp/sd/photos"));
    }

    #[test]
    fn test_cookies_if_present_requires_existing_file() {
        let config =
            DownloaderConfig::default().with_cookies_file(Some(PathBuf::from("/nonexistent/c.txt")));
        assert!(config.cookies_if_present().is_none());

        let config = DownloaderConfig::default().with_cookies_file(None);
        assert!(config.cookies_if_present().is_none());
    }

    #[test]
    fn test_max_attempts_floor() {
        let config = DownloaderConfig::default().with_max_attempts(0);
        assert_eq!(config.max_attempts, 1);
    }
}
