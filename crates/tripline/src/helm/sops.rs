//! sops decryption of encrypted values files.

use std::io::Write;
use std::path::Path;
use std::process::Stdio;

use tempfile::TempPath;
use tokio::process::Command;

use crate::runner::RunError;

const SOPS_PROGRAM: &str = "sops";
const TEMP_PREFIX: &str = "tripline-helm-sops-";

/// Decrypts `path` into a temporary YAML file.
///
/// The file is deleted when the returned [`TempPath`] is dropped.
pub async fn decrypt_to_temp(path: &Path) -> Result<TempPath, RunError> {
    decrypt_with(SOPS_PROGRAM, path).await
}

pub(crate) async fn decrypt_with(program: &str, path: &Path) -> Result<TempPath, RunError> {
    let output = Command::new(program)
        .arg("--decrypt")
        .args(["--input-type", "yaml", "--output-type", "yaml"])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| RunError::Spawn {
            program: program.to_string(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(RunError::Decrypt {
            path: path.display().to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let mut file = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".yaml")
        .tempfile()
        .map_err(RunError::TempFile)?;
    file.write_all(&output.stdout).map_err(RunError::TempFile)?;
    file.flush().map_err(RunError::TempFile)?;

    log::debug!("Decrypted {:?} to {:?}", path, file.path());
    Ok(file.into_temp_path())
}
