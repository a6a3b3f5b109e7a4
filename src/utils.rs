// Helper functions shared by the strategies

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

use crate::errors::DownloadError;

/// Run a subprocess with piped output and a hard timeout. The child is
/// killed when the timeout elapses.
pub async fn run_output_with_timeout(
    program: &str,
    args: Vec<String>,
    limit: Duration,
) -> Result<std::process::Output, DownloadError> {
    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| DownloadError::ExecutionError(format!("Failed to start {}: {}", program, e)))?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| DownloadError::ExecutionError(format!("Failed to capture stdout from {}", program)))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| DownloadError::ExecutionError(format!("Failed to capture stderr from {}", program)))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe
            .read_to_end(&mut buf)
            .await
            .map_err(|e| format!("Failed to read stdout: {}", e))?;
        Ok::<Vec<u8>, String>(buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe
            .read_to_end(&mut buf)
            .await
            .map_err(|e| format!("Failed to read stderr: {}", e))?;
        Ok::<Vec<u8>, String>(buf)
    });

    let waited = timeout(limit, child.wait()).await;
    match waited {
        Ok(status_res) => {
            let status = status_res
                .map_err(|e| DownloadError::ExecutionError(format!("Failed to wait for {}: {}", program, e)))?;
            let stdout = stdout_task
                .await
                .map_err(|e| DownloadError::ExecutionError(format!("stdout task failed: {}", e)))?
                .map_err(DownloadError::ExecutionError)?;
            let stderr = stderr_task
                .await
                .map_err(|e| DownloadError::ExecutionError(format!("stderr task failed: {}", e)))?
                .map_err(DownloadError::ExecutionError)?;
            Ok(std::process::Output {
                status,
                stdout,
                stderr,
            })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::Timeout(limit.as_secs()))
        }
    }
}

/// Truncate a message to a character budget (char-boundary safe).
pub fn truncate_chars(s: &str, budget: usize) -> String {
    if s.chars().count() <= budget {
        return s.to_string();
    }
    s.chars().take(budget).collect()
}

/// "12.3 MB" style size formatting for log and error messages
pub fn format_mb(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / 1_048_576.0)
}
