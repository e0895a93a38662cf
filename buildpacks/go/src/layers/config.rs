use crate::{GoBuildpack, GoBuildpackError};
use libcnb::build::BuildContext;
use libcnb::data::layer_name;
use libcnb::layer::UncachedLayerDefinition;
use std::path::PathBuf;

/// Create the layer holding the supply phase's `config.toml` and return the
/// document's path.
pub(crate) fn handle_config_layer(
    context: &BuildContext<GoBuildpack>,
) -> libcnb::Result<PathBuf, GoBuildpackError> {
    let layer_ref = context.uncached_layer(
        layer_name!("go_config"),
        UncachedLayerDefinition {
            build: true,
            launch: false,
        },
    )?;
    Ok(layer_ref.path().join("config.toml"))
}
