//! Feed serialization for downstream consumers.
//!
//! Each run writes the [`RunPayload`] in two equivalent encodings:
//!
//! ```text
//! output_dir/
//! ├── notices.json   # pretty-printed JSON document
//! └── notices.js     # window.GOV_DATA = {...};
//! ```
//!
//! Both files are written to a temporary sibling first and renamed into
//! place, so a prior feed is replaced whole and never appended to.

use crate::config::OutputConfig;
use crate::models::RunPayload;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Render the browser encoding: the compact document assigned to a global.
pub fn to_js(payload: &RunPayload, global: &str) -> Result<String, serde_json::Error> {
    Ok(format!("window.{global} = {};\n", serde_json::to_string(payload)?))
}

async fn replace_file(path: &Path, contents: String) -> Result<(), Box<dyn Error>> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, contents).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        error!(path = %path.display(), error = %e, "Failed to move feed into place");
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Write both encodings of `payload` into `output_dir`.
///
/// # Errors
///
/// Serialization or file-system failures; these are the only errors that
/// fail a run.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn write_feed(
    payload: &RunPayload,
    output_dir: &Path,
    output: &OutputConfig,
) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(output_dir).await?;

    let json_path = output_dir.join(&output.json_file);
    let json = serde_json::to_string_pretty(payload)?;
    replace_file(&json_path, json).await?;
    info!(path = %json_path.display(), count = payload.count, "Wrote JSON feed");

    let js_path = output_dir.join(&output.js_file);
    replace_file(&js_path, to_js(payload, &output.js_global)?).await?;
    info!(path = %js_path.display(), "Wrote JS feed");

    Ok(())
}
