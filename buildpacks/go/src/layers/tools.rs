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
use std::path::Path;

const LAYER_VERSION: &str = "1";

/// Install a vendor tool (`godep`, `glide` or `dep`) into the `go_tools`
/// layer and put it on the build `PATH`.
pub(crate) fn handle_tools_layer(
    context: &BuildContext<GoBuildpack>,
    dependency: &Dependency,
    installer: &impl Installer,
) -> libcnb::Result<LayerEnv, GoBuildpackError> {
    let metadata = Metadata::new(dependency);
    let tool = style::value(dependency.to_string());
    let layer_ref = context.cached_layer(
        layer_name!("go_tools"),
        CachedLayerDefinition {
            build: true,
            launch: false,
            invalid_metadata_action: &invalid_metadata_action::<Metadata>,
            restored_layer_action: &|old: &Metadata, _| {
                restored_layer_action(&metadata, old, &tool)
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
            print::sub_bullet(format!("Installing {tool}"));
            installer
                .install_only_version(&dependency.name, &layer_ref.path())
                .map_err(GoBuildpackError::Install)?;
            layer_ref.write_metadata(metadata.clone())?;
        }
    }

    layer_ref.write_env(
        LayerEnv::new()
            .chainable_insert(
                Scope::Build,
                ModificationBehavior::Prepend,
                "PATH",
                layer_ref.path().join(bin_dir(dependency)),
            )
            .chainable_insert(Scope::Build, ModificationBehavior::Delimiter, "PATH", ":"),
    )?;
    layer_ref.read_env()
}

/// Directory, relative to the install location, holding the tool's executable.
fn bin_dir(dependency: &Dependency) -> &Path {
    dependency
        .executable
        .as_deref()
        .map(Path::new)
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new("bin"))
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, CacheDiff, TryMigrate)]
#[serde(deny_unknown_fields)]
#[try_migrate(from = None)]
pub(crate) struct MetadataV1 {
    #[cache_diff(rename = "Layer version")]
    layer_version: String,
    #[cache_diff(rename = "Vendor tool")]
    name: String,
    #[cache_diff(rename = "Vendor tool version")]
    version: String,
}
pub(crate) type Metadata = MetadataV1;

impl Metadata {
    pub(crate) fn new(dependency: &Dependency) -> Self {
        Metadata {
            layer_version: String::from(LAYER_VERSION),
            name: dependency.name.clone(),
            version: dependency.version.clone(),
        }
    }
}
