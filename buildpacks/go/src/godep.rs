use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The parts of `Godeps/Godeps.json` a build cares about.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct Godep {
    #[serde(default)]
    pub(crate) import_path: String,
    #[serde(default)]
    pub(crate) go_version: String,
    #[serde(default)]
    pub(crate) packages: Vec<String>,
    /// Derived from the presence of `Godeps/_workspace/src`, never read from
    /// `Godeps.json` itself.
    #[serde(default)]
    pub(crate) workspace_exists: bool,
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum ReadGodepsError {
    #[error("Unable to read Godeps/Godeps.json: {0}")]
    Io(#[from] std::io::Error),
    #[error("Bad Godeps/Godeps.json file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load godep metadata for the app at `app_dir`.
///
/// # Errors
///
/// Fails when `Godeps/Godeps.json` can't be read or isn't valid JSON.
pub(crate) fn read_godeps(app_dir: &Path) -> Result<Godep, ReadGodepsError> {
    let contents = fs::read_to_string(app_dir.join("Godeps").join("Godeps.json"))?;
    let mut godep: Godep = serde_json::from_str(&contents)?;
    godep.workspace_exists = app_dir
        .join("Godeps")
        .join("_workspace")
        .join("src")
        .try_exists()?;
    Ok(godep)
}
