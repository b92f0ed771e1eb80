use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::asset::NodeAsset;
use crate::error::Result;
use crate::options::AssetOptions;
use crate::record::AssetFile;
use crate::registry::Registry;

/// Load an asset saved with [`save_asset_to`]. A missing file yields
/// `Ok(None)`.
pub fn load_asset_from(
    path: &Path,
    registry: Arc<Registry>,
    options: AssetOptions,
) -> Result<Option<NodeAsset>> {
    let data = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(None);
        },
        Err(err) => return Err(err.into()),
    };

    let file: AssetFile = serde_json::from_str(&data)?;
    let asset = NodeAsset::builder(registry).options(options).restore(file)?;
    Ok(Some(asset))
}

/// Persist the asset's snapshot, creating parent directories as needed.
pub fn save_asset_to(path: &Path, asset: &NodeAsset) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let payload = asset.options().json_style.render(&asset.snapshot()?)?;
    write_atomic(path, payload.as_bytes())?;

    Ok(())
}

fn write_atomic(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, payload)?;
    fs::rename(tmp_path, path)?;
    Ok(())
}
