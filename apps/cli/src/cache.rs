use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use kinoscope_core::AnalysisRecord;
use tokio::fs;

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("kinoscope")
}

/// Get the path for the cached latest analysis
pub fn get_record_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("latest_analysis.json")
}

/// Replace the cached record with `record`
pub async fn save_record(record: &AnalysisRecord, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let pretty_json = serde_json::to_string_pretty(record)?;
    fs::write(path, &pretty_json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Load the cached record, if one was saved
pub async fn load_record(path: &Path) -> Result<Option<AnalysisRecord>> {
    if !fs::try_exists(path).await? {
        return Ok(None);
    }
    let json_content = fs::read_to_string(path).await?;
    let record = serde_json::from_str(&json_content)
        .with_context(|| format!("Corrupt cached analysis at {}", path.display()))?;
    Ok(Some(record))
}
