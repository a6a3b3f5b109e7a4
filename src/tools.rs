// Discovery of the external extraction tools

use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionTool {
    YtDlp,
    GalleryDl,
}

impl ExtractionTool {
    pub fn binary_name(&self) -> &'static str {
        match self {
            Self::YtDlp => "yt-dlp",
            Self::GalleryDl => "gallery-dl",
        }
    }
}

/// Locate a tool binary: common install paths first, then PATH via `which`,
/// finally the bare name and hope for the best.
pub fn locate(tool: ExtractionTool) -> String {
    let binary = tool.binary_name();

    let common_paths = [
        format!("/opt/homebrew/bin/{}", binary),
        format!("/usr/local/bin/{}", binary),
        format!("/usr/bin/{}", binary),
    ];

    for path in common_paths {
        if std::path::Path::new(&path).exists() {
            return path;
        }
    }

    if let Ok(output) = Command::new("which").arg(binary).output() {
        if output.status.success() {
            let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !path.is_empty() {
                return path;
            }
        }
    }

    binary.to_string()
}

/// Probe a located binary with `--version`.
pub fn is_available(tool: ExtractionTool) -> bool {
    let path = locate(tool);
    match Command::new(&path).arg("--version").output() {
        Ok(out) => out.status.success(),
        Err(_) => false,
    }
}
