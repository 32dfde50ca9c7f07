//! Common utility functions used across the application

use std::path::Path;

/// Sanitize a batch entry name so it can be used as a file name.
/// Converts the name to lowercase and replaces special characters with underscores.
pub fn sanitize_filename(input: &str) -> String {
    let invalid_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|', ' ', '\t'];
    let mut result = input.trim().to_lowercase();
    for c in invalid_chars {
        result = result.replace(c, "_");
    }
    if result.is_empty() {
        result.push_str("untitled");
    }
    result
}

/// Check if a file exists and has valid content (non-zero size)
pub async fn check_file_exists_and_valid(path: &Path) -> bool {
    if let Ok(metadata) = tokio::fs::metadata(path).await {
        if metadata.is_file() && metadata.len() > 0 {
            return true;
        }
    }
    false
}

/// Best-effort removal; a missing file is not an error
pub async fn remove_file_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}
