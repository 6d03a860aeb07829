//! Spreadsheet to PDF conversion via a headless LibreOffice subprocess.
//!
//! The converter is treated as an opaque external tool: we hand it a file
//! and an output directory, bound the wait with a timeout, and verify the
//! expected PDF actually appeared (some soffice builds exit 0 while silently
//! skipping the document).

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

/// Errors from the external conversion step.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to launch converter: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("converter exited with status {status}: {stderr}")]
    Failed { status: i32, stderr: String },
    #[error("converter timed out after {0} seconds")]
    TimedOut(u64),
    #[error("converter exited successfully but produced no output file")]
    NoOutput,
}

/// Handle on the configured LibreOffice binary.
#[derive(Debug, Clone)]
pub struct PdfConverter {
    binary: PathBuf,
    timeout: Duration,
}

impl PdfConverter {
    pub fn new(binary: PathBuf, timeout: Duration) -> Self {
        Self { binary, timeout }
    }

    /// Default binary location: the desktop bundle path on macOS, otherwise
    /// `soffice` from PATH (the server Dockerfile puts it there).
    pub fn resolve_binary() -> PathBuf {
        if cfg!(target_os = "macos") {
            PathBuf::from("/Applications/LibreOffice.app/Contents/MacOS/soffice")
        } else {
            PathBuf::from("soffice")
        }
    }

    /// Convert one spreadsheet to PDF, writing into `out_dir`.
    ///
    /// Returns the path of the generated PDF. The child process is killed if
    /// it outlives the configured timeout.
    pub async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError> {
        let output = Command::new(&self.binary)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg(input)
            .arg("--outdir")
            .arg(out_dir)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| ConvertError::TimedOut(self.timeout.as_secs()))?
            .map_err(ConvertError::Spawn)?;

        if !output.status.success() {
            return Err(ConvertError::Failed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let pdf_path = out_dir.join(format!("{stem}.pdf"));
        if !pdf_path.exists() {
            return Err(ConvertError::NoOutput);
        }
        Ok(pdf_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converter(binary: &str) -> PdfConverter {
        PdfConverter::new(PathBuf::from(binary), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = converter("/nonexistent/soffice")
            .convert(&dir.path().join("in.xlsx"), dir.path())
            .await;
        assert!(matches!(err, Err(ConvertError::Spawn(_))));
    }

    #[tokio::test]
    async fn test_nonzero_exit_carries_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let err = converter("false")
            .convert(&dir.path().join("in.xlsx"), dir.path())
            .await;
        match err {
            Err(ConvertError::Failed { status, .. }) => assert_ne!(status, 0),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_silent_success_without_output_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let err = converter("true")
            .convert(&dir.path().join("in.xlsx"), dir.path())
            .await;
        assert!(matches!(err, Err(ConvertError::NoOutput)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_converter_is_killed_on_timeout() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow.sh");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let slow = PdfConverter::new(script, Duration::from_millis(100));
        let err = slow.convert(&dir.path().join("in.xlsx"), dir.path()).await;
        assert!(matches!(err, Err(ConvertError::TimedOut(_))));
    }
}
