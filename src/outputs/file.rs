//! Write the rendered document to disk.

use crate::error::DeliveryError;
use crate::utils::ensure_parent_dir;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `document` to `path`, creating parent directories as needed.
#[instrument(level = "info", skip_all, fields(path = %path.display(), bytes = document.len()))]
pub async fn write_document(path: &Path, document: &str) -> Result<(), DeliveryError> {
    let io_err = |source| DeliveryError::Io {
        path: path.to_path_buf(),
        source,
    };

    ensure_parent_dir(path).await.map_err(io_err)?;
    if let Err(e) = fs::write(path, document).await {
        error!(error = %e, "Failed writing document");
        return Err(io_err(e));
    }
    info!("Wrote document");
    Ok(())
}
