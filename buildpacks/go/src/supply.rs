use crate::cfg::BuildpackConfig;
use crate::config::SupplyConfig;
use crate::vendor_tool::{self, VendorTool};
use crate::version;
use crate::GoBuildpackError;
use bullet_stream::global::print;
use bullet_stream::style;
use go_vendor_utils::manifest::{BuildpackManifest, Dependency};
use std::path::Path;

/// Everything the supply phase decided: the vendor tool, and the manifest
/// entries for the toolchain and the tool's executable.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Supply {
    pub(crate) tool: VendorTool,
    pub(crate) go: Dependency,
    pub(crate) vendor_tool: Option<Dependency>,
}

impl Supply {
    /// The document handed to the finalize phase.
    ///
    /// # Errors
    ///
    /// Fails when godep metadata can't be encoded.
    pub(crate) fn config(&self) -> Result<SupplyConfig, GoBuildpackError> {
        SupplyConfig::new(&self.go.version, &self.tool).map_err(GoBuildpackError::Config)
    }
}

/// Detect the vendor tool and resolve what has to be installed for it.
///
/// # Errors
///
/// Detection failures, a go version that doesn't resolve against the
/// manifest, and manifest entries that are missing.
pub(crate) fn plan(
    app_dir: &Path,
    config: &BuildpackConfig,
    manifest: &BuildpackManifest,
) -> Result<Supply, GoBuildpackError> {
    print::bullet("Detecting vendor tool");
    let tool = vendor_tool::detect(app_dir).map_err(GoBuildpackError::Detect)?;
    log_detection(&tool);

    let selection = version::select_go_version(
        &tool,
        config.go_version_override.as_deref(),
        manifest,
    )
    .map_err(GoBuildpackError::Version)?;
    if let Some(warning) = &selection.warning {
        print::warning(warning);
    }

    let go = manifest
        .dependency("go", &selection.version)
        .map_err(GoBuildpackError::Manifest)?
        .clone();
    let vendor_tool = tool
        .installable()
        .map(|name| manifest.only_version(name).cloned())
        .transpose()
        .map_err(GoBuildpackError::Manifest)?;

    Ok(Supply {
        tool,
        go,
        vendor_tool,
    })
}

fn log_detection(tool: &VendorTool) {
    match tool {
        VendorTool::GoMod(gomod) => {
            print::sub_bullet(format!("Detected {}", style::value("go.mod")));
            match &gomod.go_version {
                Some(version) => print::sub_bullet(format!(
                    "Detected go modules via go.mod, go version {}",
                    style::value(version)
                )),
                None => print::sub_bullet("Detected go modules via go.mod, no go version declared"),
            }
        }
        VendorTool::Godep(godep) => {
            print::sub_bullet(format!(
                "Detected {} with ImportPath {}",
                style::value("Godeps/Godeps.json"),
                style::value(&godep.import_path)
            ));
            if godep.workspace_exists {
                print::sub_bullet("Godeps/_workspace/src found");
            }
        }
        VendorTool::Glide => print::sub_bullet(format!("Detected {}", style::value("glide.yaml"))),
        VendorTool::Dep => print::sub_bullet(format!("Detected {}", style::value("Gopkg.toml"))),
        VendorTool::Native => {
            print::sub_bullet("No vendor tool metadata found, using go native vendoring");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fs_err as fs;
    use indoc::indoc;

    fn manifest() -> BuildpackManifest {
        indoc! {r#"
            [[default_versions]]
            name = "go"
            version = "1.22.x"

            [[dependencies]]
            name = "go"
            version = "1.22.7"
            uri = "https://go.dev/dl/go1.22.7.linux-amd64.tar.gz"

            [[dependencies]]
            name = "go"
            version = "1.6.4"
            uri = "https://go.dev/dl/go1.6.4.linux-amd64.tar.gz"

            [[dependencies]]
            name = "go"
            version = "1.12"
            uri = "https://go.dev/dl/go1.12.linux-amd64.tar.gz"

            [[dependencies]]
            name = "godep"
            version = "80"
            uri = "https://github.com/tools/godep/releases/download/v80/godep_linux_amd64"
            executable = "bin/godep"

            [[dependencies]]
            name = "glide"
            version = "0.13.3"
            uri = "https://github.com/Masterminds/glide/releases/download/v0.13.3/glide-v0.13.3-linux-amd64.tar.gz"
            executable = "linux-amd64/glide"
        "#}
        .parse()
        .unwrap()
    }

    fn app(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (path, contents) in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
        dir
    }

    #[test]
    fn godep_installs_declared_go_and_godep() {
        let app = app(&[(
            "Godeps/Godeps.json",
            r#"{"ImportPath": "go-online", "GoVersion": "go1.6"}"#,
        )]);

        let supply = plan(app.path(), &BuildpackConfig::default(), &manifest()).unwrap();

        assert_eq!("godep", supply.tool.name());
        assert_eq!("1.6.4", supply.go.version);
        assert_eq!(Some("godep"), supply.vendor_tool.as_ref().map(|d| d.name.as_str()));

        let config = supply.config().unwrap();
        assert_eq!("1.6.4", config.go_version);
        assert!(config.godep.unwrap().contains("go-online"));
    }

    #[test]
    fn native_uses_manifest_default() {
        let app = app(&[("main.go", "package main\n")]);

        let supply = plan(app.path(), &BuildpackConfig::default(), &manifest()).unwrap();

        assert_eq!(VendorTool::Native, supply.tool);
        assert_eq!("1.22.7", supply.go.version);
        assert_eq!(None, supply.vendor_tool);
    }

    #[test]
    fn override_wins() {
        let app = app(&[("glide.yaml", "package: github.com/example/app\n")]);
        let config = BuildpackConfig {
            go_version_override: Some("go1.12".to_string()),
            ..BuildpackConfig::default()
        };

        let supply = plan(app.path(), &config, &manifest()).unwrap();
        assert_eq!("1.12", supply.go.version);
        assert_eq!(
            Some("linux-amd64/glide"),
            supply.vendor_tool.unwrap().executable.as_deref()
        );
    }

    #[test]
    fn unmatched_override_is_a_resolution_error() {
        let app = app(&[("main.go", "package main\n")]);
        let config = BuildpackConfig {
            go_version_override: Some("go99.99.99".to_string()),
            ..BuildpackConfig::default()
        };

        let err = plan(app.path(), &config, &manifest()).unwrap_err();
        assert_eq!(crate::BuildPhase::Resolution, err.phase());
        assert!(err.to_string().contains("no match found for 99.99.99"));
    }

    #[test]
    fn dep_missing_from_manifest() {
        let app = app(&[("Gopkg.toml", "")]);

        let err = plan(app.path(), &BuildpackConfig::default(), &manifest()).unwrap_err();
        assert_eq!(crate::BuildPhase::Manifest, err.phase());
    }

    #[test]
    fn godir_is_a_detection_error() {
        let app = app(&[(".godir", "app\n")]);

        let err = plan(app.path(), &BuildpackConfig::default(), &manifest()).unwrap_err();
        assert_eq!(crate::BuildPhase::Detection, err.phase());
        assert!(err.to_string().contains("Deprecated, .godir file found!"));
    }

    #[test]
    fn modules_need_go_1_11() {
        let app = app(&[("go.mod", "module example.com/app\n\ngo 1.6\n")]);

        let err = plan(app.path(), &BuildpackConfig::default(), &manifest()).unwrap_err();
        assert_eq!(
            "go1.6.4 does not support go modules. Go 1.11 or later is required",
            err.to_string()
        );
    }
}
