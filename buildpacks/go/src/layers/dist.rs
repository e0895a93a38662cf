use crate::installer::Installer;
use crate::layers::{invalid_metadata_action, restored_layer_action};
use crate::{GoBuildpack, GoBuildpackError};
use bullet_stream::global::print;
use bullet_stream::style;
use cache_diff::CacheDiff;
use go_vendor_utils::manifest::Dependency;
use libcnb::build::BuildContext;
use libcnb::data::layer_name;
use libcnb::layer::{CachedLayerDefinition, EmptyLayerCause, LayerState};
use libcnb::layer_env::{LayerEnv, ModificationBehavior, Scope};
use magic_migrate::TryMigrate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const LAYER_VERSION: &str = "1";

/// The installed toolchain.
pub(crate) struct GoDist {
    pub(crate) goroot: PathBuf,
    pub(crate) env: LayerEnv,
}

/// Install the go toolchain into the `go_dist` layer, reusing a cached copy of
/// the same release. The layer is only part of the app image when `launch`
/// is set.
pub(crate) fn handle_dist_layer(
    context: &BuildContext<GoBuildpack>,
    dependency: &Dependency,
    installer: &impl Installer,
    launch: bool,
) -> libcnb::Result<GoDist, GoBuildpackError> {
    let metadata = Metadata::new(dependency);
    let layer_ref = context.cached_layer(
        layer_name!("go_dist"),
        CachedLayerDefinition {
            build: true,
            launch,
            invalid_metadata_action: &invalid_metadata_action::<Metadata>,
            restored_layer_action: &|old: &Metadata, _| {
                restored_layer_action(&metadata, old, "Go toolchain")
            },
        },
    )?;

    match &layer_ref.state {
        LayerState::Restored { cause } => {
            print::sub_bullet(cause);
        }
        LayerState::Empty { cause } => {
            match cause {
                EmptyLayerCause::NewlyCreated => {}
                EmptyLayerCause::InvalidMetadataAction { cause }
                | EmptyLayerCause::RestoredLayerAction { cause } => {
                    print::sub_bullet(cause);
                }
            }
            print::sub_bullet(format!(
                "Installing {} from {}",
                style::value(dependency.to_string()),
                style::url(&dependency.uri)
            ));
            installer
                .install_dependency(&dependency.name, &dependency.version, &layer_ref.path())
                .map_err(GoBuildpackError::Install)?;
            layer_ref.write_metadata(metadata.clone())?;
        }
    }

    // Go release archives unpack into a top level `go` directory.
    let goroot = layer_ref.path().join("go");
    let scope = if launch { Scope::All } else { Scope::Build };
    layer_ref.write_env(
        LayerEnv::new()
            .chainable_insert(scope.clone(), ModificationBehavior::Override, "GOROOT", &goroot)
            .chainable_insert(
                scope.clone(),
                ModificationBehavior::Prepend,
                "PATH",
                goroot.join("bin"),
            )
            .chainable_insert(scope, ModificationBehavior::Delimiter, "PATH", ":"),
    )?;

    Ok(GoDist {
        goroot,
        env: layer_ref.read_env()?,
    })
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, CacheDiff, TryMigrate)]
#[serde(deny_unknown_fields)]
#[try_migrate(from = None)]
pub(crate) struct MetadataV1 {
    #[cache_diff(rename = "Layer version")]
    layer_version: String,
    #[cache_diff(rename = "Go version")]
    go_version: String,
    #[cache_diff(rename = "Go download")]
    uri: String,
}
pub(crate) type Metadata = MetadataV1;

impl Metadata {
    pub(crate) fn new(dependency: &Dependency) -> Self {
        Metadata {
            layer_version: String::from(LAYER_VERSION),
            go_version: dependency.version.clone(),
            uri: dependency.uri.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dependency(version: &str) -> Dependency {
        Dependency {
            name: "go".to_string(),
            version: version.to_string(),
            uri: format!("https://go.dev/dl/go{version}.linux-amd64.tar.gz"),
            checksum: None,
            executable: None,
        }
    }

    fn diff(now: &Metadata, old: &Metadata) -> Vec<String> {
        now.diff(old).iter().map(bullet_stream::strip_ansi).collect()
    }

    #[test]
    fn same_release_is_reused() {
        let metadata = Metadata::new(&dependency("1.22.7"));
        assert!(metadata.diff(&metadata.clone()).is_empty());
    }

    #[test]
    fn go_version_change() {
        assert_eq!(
            vec![
                "Go version (`1.12` to `1.22.7`)".to_string(),
                "Go download (`https://go.dev/dl/go1.12.linux-amd64.tar.gz` to `https://go.dev/dl/go1.22.7.linux-amd64.tar.gz`)".to_string(),
            ],
            diff(
                &Metadata::new(&dependency("1.22.7")),
                &Metadata::new(&dependency("1.12"))
            )
        );
    }

    #[test]
    fn mirrored_download_is_not_reused() {
        let mut mirrored = dependency("1.22.7");
        mirrored.uri = String::from("https://mirror.example.com/go1.22.7.linux-amd64.tar.gz");

        let (_, cause) = restored_layer_action(
            &Metadata::new(&mirrored),
            &Metadata::new(&dependency("1.22.7")),
            "Go toolchain",
        );
        assert_eq!(
            "Clearing cached Go toolchain due to Go download (`https://go.dev/dl/go1.22.7.linux-amd64.tar.gz` to `https://mirror.example.com/go1.22.7.linux-amd64.tar.gz`)",
            bullet_stream::strip_ansi(cause)
        );
    }

    #[test]
    fn metadata_guard() {
        let metadata = MetadataV1::new(&dependency("1.22.7"));
        let toml = r#"
layer_version = "1"
go_version = "1.22.7"
uri = "https://go.dev/dl/go1.22.7.linux-amd64.tar.gz"
        "#
        .trim();
        assert_eq!(toml, toml::to_string(&metadata).unwrap().trim());
        assert_eq!(metadata, toml::from_str(toml).unwrap());
    }
}
