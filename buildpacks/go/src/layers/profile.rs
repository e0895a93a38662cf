use crate::startup::{self, StartupEnvironment};
use crate::{GoBuildpack, GoBuildpackError};
use libcnb::build::BuildContext;
use libcnb::data::layer_name;
use libcnb::layer::UncachedLayerDefinition;

// Create the launch layer carrying the app's profile.d scripts and runtime env
pub(crate) fn handle_profile_layer(
    context: &BuildContext<GoBuildpack>,
    startup: &StartupEnvironment,
) -> libcnb::Result<(), GoBuildpackError> {
    let layer_ref = context.uncached_layer(
        layer_name!("go_profile"),
        UncachedLayerDefinition {
            build: false,
            launch: true,
        },
    )?;
    let env = startup::write_startup_environment(&layer_ref.path(), startup)
        .map_err(GoBuildpackError::Startup)?;
    layer_ref.write_env(env)?;
    Ok(())
}
