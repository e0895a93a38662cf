use crate::godep::Godep;
use crate::gomod::{self, ReadGoModError};
use crate::vendor_tool::VendorTool;
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What the supply phase hands to the finalize phase.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct SupplyConfig {
    #[serde(rename = "GoVersion")]
    pub(crate) go_version: String,
    #[serde(rename = "VendorTool")]
    pub(crate) vendor_tool: String,
    /// `Godeps.json` metadata as JSON, for godep apps only.
    #[serde(rename = "Godep", default, skip_serializing_if = "Option::is_none")]
    pub(crate) godep: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum ConfigError {
    #[error("Unable to write config.toml: {0}")]
    Write(std::io::Error),
    #[error("Unable to read config.toml: {0}")]
    Read(std::io::Error),
    #[error("Unable to serialize config.toml: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Unable to parse config.toml: {0}")]
    Deserialize(#[from] toml::de::Error),
    #[error("Unable to load config Godep json: {0}")]
    GodepJson(#[from] serde_json::Error),
    #[error("invalid vendor tool: {0}")]
    InvalidVendorTool(String),
    #[error("{0}")]
    GoMod(#[from] ReadGoModError),
}

impl SupplyConfig {
    /// # Errors
    ///
    /// Fails only if godep metadata can't be encoded.
    pub(crate) fn new(go_version: &str, tool: &VendorTool) -> Result<Self, ConfigError> {
        Ok(SupplyConfig {
            go_version: go_version.to_string(),
            vendor_tool: tool.name().to_string(),
            godep: match tool {
                VendorTool::Godep(godep) => Some(serde_json::to_string(godep)?),
                _ => None,
            },
        })
    }

    /// # Errors
    ///
    /// Serialization or filesystem failures.
    pub(crate) fn write(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, toml::to_string(self)?).map_err(ConfigError::Write)
    }

    /// # Errors
    ///
    /// Filesystem or parse failures.
    pub(crate) fn read(path: &Path) -> Result<Self, ConfigError> {
        Ok(toml::from_str(
            &fs::read_to_string(path).map_err(ConfigError::Read)?,
        )?)
    }

    /// Rebuild the vendor tool this config was written for. Module apps
    /// re-read `go.mod` from `app_dir`.
    ///
    /// # Errors
    ///
    /// Unknown tool names, bad godep JSON and unreadable `go.mod` files.
    pub(crate) fn vendor_tool(&self, app_dir: &Path) -> Result<VendorTool, ConfigError> {
        match self.vendor_tool.as_str() {
            "godep" => {
                let godep: Godep = serde_json::from_str(self.godep.as_deref().unwrap_or_default())?;
                Ok(VendorTool::Godep(godep))
            }
            "glide" => Ok(VendorTool::Glide),
            "dep" => Ok(VendorTool::Dep),
            "gomod" => Ok(VendorTool::GoMod(gomod::read_gomod(app_dir.join("go.mod"))?)),
            "go_nativevendoring" => Ok(VendorTool::Native),
            other => Err(ConfigError::InvalidVendorTool(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gomod::GoMod;

    #[test]
    fn godep_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let tool = VendorTool::Godep(Godep {
            import_path: "go-online".to_string(),
            go_version: "go1.6".to_string(),
            packages: vec!["./...".to_string()],
            workspace_exists: true,
        });

        SupplyConfig::new("1.6.4", &tool).unwrap().write(&path).unwrap();
        let config = SupplyConfig::read(&path).unwrap();

        assert_eq!("1.6.4", config.go_version);
        assert_eq!("godep", config.vendor_tool);
        assert_eq!(tool, config.vendor_tool(dir.path()).unwrap());
    }

    #[test]
    fn document_format() {
        let config = SupplyConfig::new("1.22.7", &VendorTool::Glide).unwrap();
        assert_eq!(
            "GoVersion = \"1.22.7\"\nVendorTool = \"glide\"\n",
            toml::to_string(&config).unwrap()
        );
    }

    #[test]
    fn gomod_rereads_go_mod() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("go.mod"), "module example.com/app\ngo 1.22\n").unwrap();

        let config = SupplyConfig::new("1.22.7", &VendorTool::GoMod(GoMod::default())).unwrap();
        assert_eq!(
            VendorTool::GoMod(GoMod {
                go_version: Some("1.22".to_string()),
                module_path: Some("example.com/app".to_string()),
            }),
            config.vendor_tool(dir.path()).unwrap()
        );
    }

    #[test]
    fn invalid_vendor_tool() {
        let config = SupplyConfig {
            go_version: "1.22.7".to_string(),
            vendor_tool: "gb".to_string(),
            godep: None,
        };
        let err = config.vendor_tool(Path::new("/nonexistent")).unwrap_err();
        assert_eq!("invalid vendor tool: gb", err.to_string());
    }

    #[test]
    fn bad_godep_json() {
        let config = SupplyConfig {
            go_version: "1.6.4".to_string(),
            vendor_tool: "godep".to_string(),
            godep: Some("{".to_string()),
        };
        assert!(matches!(
            config.vendor_tool(Path::new("/nonexistent")),
            Err(ConfigError::GodepJson(_))
        ));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "GoVersion = \"1.22.7\"\nVendorTool = \"dep\"\nGOPATH = \"/tmp\"\n",
        )
        .unwrap();
        assert!(matches!(
            SupplyConfig::read(&path),
            Err(ConfigError::Deserialize(_))
        ));
    }
}
