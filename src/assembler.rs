// Artifact assembly: per-request output arenas, size-ceiling enforcement,
// batch survival policy.
//
// Every resolution writes into its own arena subdirectory, so concurrent
// requests for the same platform can never pick up each other's files. The
// exact artifact path comes from the extractor payload when available; the
// newest-file lookup below is the in-arena fallback for tools that do not
// report one.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::errors::DownloadError;
use crate::models::{ContentType, DownloadResult, Platform, PostMetadata};
use crate::utils::format_mb;

static ARENA_SEQ: AtomicU64 = AtomicU64::new(0);

/// Per-request isolated output directory.
#[derive(Debug)]
pub struct Arena {
    root: PathBuf,
}

impl Arena {
    /// Create a fresh arena under `base_dir`, named after the post `tag`
    /// plus a process-unique suffix.
    pub fn create(base_dir: &Path, tag: &str) -> Result<Self, DownloadError> {
        let seq = ARENA_SEQ.fetch_add(1, Ordering::Relaxed);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let root = base_dir.join(format!("{}-{}-{}", sanitize_tag(tag), nanos, seq));
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Most recently modified regular file, if it was written within
    /// `window` of now.
    pub fn newest_file(&self, window: Duration) -> Option<PathBuf> {
        let cutoff = SystemTime::now().checked_sub(window).unwrap_or(UNIX_EPOCH);
        self.files_by_mtime()
            .into_iter()
            .filter(|(_, mtime)| *mtime >= cutoff)
            .next_back()
            .map(|(path, _)| path)
    }

    /// Up to `limit` most recently written files, oldest first (write order).
    pub fn recent_files(&self, limit: usize) -> Vec<PathBuf> {
        let files = self.files_by_mtime();
        let skip = files.len().saturating_sub(limit);
        files.into_iter().skip(skip).map(|(path, _)| path).collect()
    }

    /// Best-effort removal; partial artifacts of a failed request are
    /// otherwise left to the retention sweeper.
    pub fn discard(&self) {
        if let Err(e) = fs::remove_dir_all(&self.root) {
            log::warn!("failed to discard arena {}: {}", self.root.display(), e);
        }
    }

    fn files_by_mtime(&self) -> Vec<(PathBuf, SystemTime)> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut files: Vec<(PathBuf, SystemTime)> = entries
            .flatten()
            .filter_map(|entry| {
                let meta = entry.metadata().ok()?;
                if !meta.is_file() {
                    return None;
                }
                let mtime = meta.modified().ok()?;
                Some((entry.path(), mtime))
            })
            .collect();

        files.sort_by_key(|(_, mtime)| *mtime);
        files
    }
}

fn sanitize_tag(tag: &str) -> String {
    let cleaned: String = tag
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "media".to_string()
    } else {
        cleaned
    }
}

/// Check one artifact against an explicit byte limit, deleting it when
/// oversized.
pub fn enforce_limit(path: &Path, limit: u64, kind: &'static str) -> Result<u64, DownloadError> {
    let size = fs::metadata(path)?.len();
    if size > limit {
        log::warn!(
            "{} artifact {} exceeds {} ceiling, deleting",
            format_mb(size),
            path.display(),
            format_mb(limit)
        );
        if let Err(e) = fs::remove_file(path) {
            log::warn!("failed to delete oversized {}: {}", path.display(), e);
        }
        return Err(DownloadError::Oversized {
            kind,
            limit_mb: limit / (1024 * 1024),
        });
    }
    Ok(size)
}

/// Check one artifact against its content-type ceiling.
pub fn enforce_ceiling(path: &Path, content_type: ContentType) -> Result<u64, DownloadError> {
    enforce_limit(path, content_type.size_ceiling(), content_type.ceiling_kind())
}

/// Per-item ceiling pass over a batch: oversized items are deleted and
/// dropped individually. Returns survivors (original order), their total
/// size, and the drop count.
pub fn keep_within_limit(
    paths: Vec<PathBuf>,
    limit: u64,
    kind: &'static str,
) -> (Vec<PathBuf>, u64, usize) {
    let mut kept = Vec::new();
    let mut total = 0u64;
    let mut dropped = 0usize;

    for path in paths {
        match enforce_limit(&path, limit, kind) {
            Ok(size) => {
                total += size;
                kept.push(path);
            }
            Err(_) => dropped += 1,
        }
    }

    (kept, total, dropped)
}

/// Turn a set of downloaded artifacts into the final result record,
/// applying the size policy. A batch succeeds if at least one item
/// survives; a fully dropped batch fails with the ceiling error, an empty
/// input with the empty-playlist error.
pub fn assemble(
    platform: Platform,
    paths: Vec<PathBuf>,
    metadata: PostMetadata,
    content_type: ContentType,
) -> Result<DownloadResult, DownloadError> {
    if paths.is_empty() {
        return Err(DownloadError::EmptyPlaylist);
    }

    let limit = content_type.size_ceiling();
    let kind = content_type.ceiling_kind();
    let (kept, total, dropped) = keep_within_limit(paths, limit, kind);

    if kept.is_empty() {
        return Err(DownloadError::Oversized {
            kind,
            limit_mb: limit / (1024 * 1024),
        });
    }
    if dropped > 0 {
        log::info!("dropped {} oversized item(s), keeping {}", dropped, kept.len());
    }

    Ok(DownloadResult::batch(platform, kept, total, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, len: usize) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, vec![0u8; len]).unwrap();
        path
    }

    #[test]
    fn test_arena_isolation() {
        let base = TempDir::new().unwrap();
        let a = Arena::create(base.path(), "post1").unwrap();
        let b = Arena::create(base.path(), "post1").unwrap();
        assert_ne!(a.path(), b.path());

        write_file(a.path(), "a.mp4", 4);
        assert!(a.newest_file(Duration::from_secs(60)).is_some());
        assert!(b.newest_file(Duration::from_secs(60)).is_none());
        assert!(b.recent_files(10).is_empty());
    }

    #[test]
    fn test_newest_file_respects_window() {
        let base = TempDir::new().unwrap();
        let arena = Arena::create(base.path(), "p").unwrap();
        write_file(arena.path(), "out.mp4", 4);

        assert!(arena.newest_file(Duration::from_secs(60)).is_some());
        // A zero window excludes everything written before the call
        std::thread::sleep(Duration::from_millis(50));
        assert!(arena.newest_file(Duration::ZERO).is_none());
    }

    #[test]
    fn test_recent_files_keeps_write_order() {
        let base = TempDir::new().unwrap();
        let arena = Arena::create(base.path(), "p").unwrap();
        let first = write_file(arena.path(), "one.mp4", 1);
        std::thread::sleep(Duration::from_millis(20));
        let second = write_file(arena.path(), "two.mp4", 1);

        let files = arena.recent_files(2);
        assert_eq!(files, vec![first.clone(), second.clone()]);

        // Limit trims from the oldest end
        let files = arena.recent_files(1);
        assert_eq!(files, vec![second]);
    }

    #[test]
    fn test_oversized_artifact_is_deleted() {
        let base = TempDir::new().unwrap();
        let path = write_file(base.path(), "big.bin", 2048);

        let result = enforce_limit(&path, 1024, "video");
        assert!(matches!(result, Err(DownloadError::Oversized { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_within_limit_returns_size() {
        let base = TempDir::new().unwrap();
        let path = write_file(base.path(), "ok.bin", 100);
        assert_eq!(enforce_limit(&path, 1024, "video").unwrap(), 100);
        assert!(path.exists());
    }

    #[test]
    fn test_batch_drops_oversized_individually() {
        let base = TempDir::new().unwrap();
        let paths = vec![
            write_file(base.path(), "a.bin", 10),
            write_file(base.path(), "b.bin", 500),
            write_file(base.path(), "c.bin", 20),
            write_file(base.path(), "d.bin", 600),
            write_file(base.path(), "e.bin", 30),
        ];

        let (kept, total, dropped) = keep_within_limit(paths, 100, "video");
        assert_eq!(kept.len(), 3);
        assert_eq!(dropped, 2);
        assert_eq!(total, 60);
        assert!(!base.path().join("b.bin").exists());
        assert!(!base.path().join("d.bin").exists());
    }

    #[test]
    fn test_assemble_empty_input_is_empty_playlist() {
        let result = assemble(
            Platform::Vk,
            Vec::new(),
            PostMetadata::default(),
            ContentType::Video,
        );
        assert!(matches!(result, Err(DownloadError::EmptyPlaylist)));
    }

    #[test]
    fn test_assemble_multiple_survivors_is_carousel() {
        let base = TempDir::new().unwrap();
        let paths = vec![
            write_file(base.path(), "a.jpg", 10),
            write_file(base.path(), "b.jpg", 20),
        ];
        let result = assemble(
            Platform::Instagram,
            paths,
            PostMetadata::default(),
            ContentType::Photo,
        )
        .unwrap();
        assert!(result.success);
        assert!(result.is_carousel);
        assert_eq!(result.file_size, 30);
    }

    #[test]
    fn test_sanitize_tag() {
        assert_eq!(sanitize_tag("abc-123_X"), "abc-123_X");
        assert_eq!(sanitize_tag("a/b:c"), "a-b-c");
        assert_eq!(sanitize_tag(""), "media");
    }
}
