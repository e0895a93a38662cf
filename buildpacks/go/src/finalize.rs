use crate::cfg::BuildpackConfig;
use crate::cmd::CommandRunner;
use crate::compile;
use crate::config::SupplyConfig;
use crate::fetch::{self, FetchOutcome};
use crate::packages::{self, PackageList};
use crate::vendor_tool::VendorTool;
use crate::workspace::{self, Workspace};
use crate::GoBuildpackError;
use bullet_stream::global::print;
use bullet_stream::style;
use libcnb::Env;
use std::path::Path;

/// The state a finalize run builds up, step by step.
#[derive(Debug)]
pub(crate) struct BuildConfiguration {
    pub(crate) vendor_tool: VendorTool,
    pub(crate) go_version: String,
    pub(crate) main_package_name: String,
    pub(crate) workspace: Workspace,
    pub(crate) vendor_experiment: bool,
    pub(crate) build_flags: Vec<String>,
    pub(crate) package_list: PackageList,
}

/// Compiles the app with what the supply phase installed.
pub(crate) struct Finalizer<'a> {
    pub(crate) app_dir: &'a Path,
    pub(crate) config: &'a BuildpackConfig,
    pub(crate) supply: SupplyConfig,
    /// Build environment with the toolchain and vendor tool on `PATH`.
    pub(crate) env: Env,
}

impl Finalizer<'_> {
    /// # Errors
    ///
    /// The first failing step aborts the run: an unreadable supply config,
    /// workspace layout, dependency fetch, package selection or compilation.
    pub(crate) fn run(
        &self,
        runner: &impl CommandRunner,
    ) -> Result<BuildConfiguration, GoBuildpackError> {
        let vendor_tool = self
            .supply
            .vendor_tool(self.app_dir)
            .map_err(GoBuildpackError::Config)?;
        let go_version = self.supply.go_version.clone();

        let mut env = self.env.clone();
        env.insert("GO111MODULE", vendor_tool.go111module());

        print::bullet("Setting up the Go workspace");
        let main_package_name =
            workspace::main_package_name(&vendor_tool, self.config, self.app_dir, runner, &env)
                .map_err(GoBuildpackError::Workspace)?;
        print::sub_bullet(format!(
            "Main package: {}",
            style::value(&main_package_name)
        ));
        let workspace = workspace::setup(
            self.app_dir,
            &vendor_tool,
            &main_package_name,
            self.config.gopath_in_image,
        )
        .map_err(GoBuildpackError::Workspace)?;
        let mut env = workspace.apply(&env);

        let vendor_experiment =
            packages::vendor_experiment(self.config.vendor_experiment.as_deref(), &go_version)
                .map_err(GoBuildpackError::Packages)?;

        if fetch::fetch_dependencies(&vendor_tool, &workspace.main_package_path, runner, &env)
            .map_err(GoBuildpackError::Fetch)?
            == FetchOutcome::VendoredModules
        {
            env.insert("GOFLAGS", "-mod=vendor");
        }

        let build_flags = compile::build_flags(self.config.linker.as_ref());
        let package_list = packages::resolve_packages(
            &vendor_tool,
            self.config.install_package_spec.as_deref(),
            vendor_experiment,
            &main_package_name,
            &workspace.main_package_path,
        )
        .map_err(GoBuildpackError::Packages)?;
        for warning in &package_list.warnings {
            print::warning(warning);
        }

        let command = compile::compile_command(
            &vendor_tool,
            vendor_experiment,
            &build_flags,
            &package_list.packages,
        );
        print::bullet(format!("Running: {}", style::command(command.to_string())));
        compile::compile(&command, &workspace.main_package_path, runner, &env)
            .map_err(GoBuildpackError::Compile)?;

        Ok(BuildConfiguration {
            vendor_tool,
            go_version,
            main_package_name,
            workspace,
            vendor_experiment,
            build_flags,
            package_list,
        })
    }
}
