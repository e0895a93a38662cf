// cargo-llvm-cov sets the coverage_nightly attribute when instrumenting our code. In that case,
// we enable https://doc.rust-lang.org/beta/unstable-book/language-features/coverage-attribute.html
// to be able selectively opt out of coverage for functions/lines/modules.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod cfg;
mod cmd;
mod compile;
mod config;
mod fetch;
mod finalize;
mod godep;
mod gomod;
mod installer;
mod layers;
mod packages;
mod startup;
mod supply;
mod tgz;
mod vendor_tool;
mod version;
mod workspace;

use bullet_stream::global::print;
use bullet_stream::style;
use cfg::BuildpackConfig;
use cmd::SystemCommandRunner;
use compile::CompileError;
use config::{ConfigError, SupplyConfig};
use fetch::FetchError;
use finalize::Finalizer;
use fs_err as fs;
use go_vendor_utils::manifest::{BuildpackManifest, ManifestError};
use installer::{InstallError, ManifestInstaller};
use layers::config::handle_config_layer;
use layers::dist::handle_dist_layer;
use layers::profile::handle_profile_layer;
use layers::tools::handle_tools_layer;
use libcnb::build::{BuildContext, BuildResult, BuildResultBuilder};
use libcnb::data::build_plan::BuildPlanBuilder;
use libcnb::detect::{DetectContext, DetectResult, DetectResultBuilder};
use libcnb::generic::{GenericMetadata, GenericPlatform};
use libcnb::layer_env::Scope;
use libcnb::{buildpack_main, Buildpack, Env, Platform};
use packages::PackagesError;
use startup::{StartupEnvironment, StartupError};
use std::path::Path;
use std::time::Instant;
use vendor_tool::DetectError;
use version::VersionError;
use walkdir::WalkDir;
use workspace::WorkspaceError;

#[cfg(test)]
use libcnb_test as _;

const MANIFEST: &str = include_str!("../manifest.toml");

/// Files that make an app a candidate for this buildpack. `.godir` is
/// included so the build can explain why it isn't supported.
const GO_MARKERS: [&str; 5] = [
    "go.mod",
    "Godeps/Godeps.json",
    "glide.yaml",
    "Gopkg.toml",
    ".godir",
];

/// Directories holding other ecosystems' third party code.
const IGNORED_DIRS: [&str; 2] = ["vendor", "node_modules"];

struct GoBuildpack;

impl Buildpack for GoBuildpack {
    type Platform = GenericPlatform;
    type Metadata = GenericMetadata;
    type Error = GoBuildpackError;

    fn detect(&self, context: DetectContext<Self>) -> libcnb::Result<DetectResult, Self::Error> {
        if is_go_app(&context.app_dir).map_err(|e| GoBuildpackError::Detect(e.into()))? {
            DetectResultBuilder::pass()
                .build_plan(BuildPlanBuilder::new().provides("go").requires("go").build())
                .build()
        } else {
            DetectResultBuilder::fail().build()
        }
    }

    fn build(&self, context: BuildContext<Self>) -> libcnb::Result<BuildResult, Self::Error> {
        print::h2("Go Vendor Buildpack");
        print::bullet("Reading build configuration");

        let started = Instant::now();
        let mut go_env = Env::from_current();
        for (key, value) in context.platform.env().iter() {
            go_env.insert(key, value);
        }
        let config = BuildpackConfig::from_env(&go_env);
        let manifest: BuildpackManifest = MANIFEST.parse().map_err(GoBuildpackError::Manifest)?;
        let installer = ManifestInstaller::new(&manifest);

        let supply = supply::plan(&context.app_dir, &config, &manifest)?;

        if let Some(dependency) = &supply.vendor_tool {
            print::bullet(format!("Installing {}", style::value(&dependency.name)));
            go_env =
                handle_tools_layer(&context, dependency, &installer)?.apply(Scope::Build, &go_env);
        }

        print::bullet(format!(
            "Installing Go toolchain {}",
            style::value(&supply.go.version)
        ));
        let dist = handle_dist_layer(&context, &supply.go, &installer, config.tools_in_image)?;
        go_env = dist.env.apply(Scope::Build, &go_env);

        let config_path = handle_config_layer(&context)?;
        supply
            .config()?
            .write(&config_path)
            .map_err(GoBuildpackError::Config)?;

        let build = Finalizer {
            app_dir: &context.app_dir,
            config: &config,
            supply: SupplyConfig::read(&config_path).map_err(GoBuildpackError::Config)?,
            env: go_env,
        }
        .run(&SystemCommandRunner)?;
        print::sub_bullet(format!(
            "Compiled {} with {} go {} ({} {})",
            style::value(build.package_list.packages.join(" ")),
            build.vendor_tool,
            style::value(&build.go_version),
            build.build_flags.join(" "),
            if build.vendor_experiment {
                "vendor/ enabled"
            } else {
                "vendor/ disabled"
            }
        ));

        print::bullet("Writing startup environment");
        handle_profile_layer(
            &context,
            &StartupEnvironment {
                app_dir: &context.app_dir,
                main_package_path: &build.workspace.main_package_path,
                go_path: &build.workspace.go_path,
                gopath_in_image: config.gopath_in_image,
                goroot: config.tools_in_image.then_some(dist.goroot.as_path()),
            },
        )?;

        let mut result = BuildResultBuilder::new();
        if Path::exists(&context.app_dir.join("Procfile")) {
            print::bullet("Skipping launch process registration (Procfile detected)");
        } else {
            print::bullet("Registering launch processes:");
            let launch = startup::launch(&build.main_package_name);
            for proc in &launch.processes {
                print::sub_bullet(format!(
                    "{}: {}",
                    proc.r#type,
                    style::command(proc.command.join(" "))
                ));
            }
            result = result.launch(launch);
        }

        print::all_done(&Some(started));
        result.build()
    }

    fn on_error(&self, error: libcnb::Error<Self::Error>) {
        let phase = match &error {
            libcnb::Error::BuildpackError(bp_err) => bp_err.phase(),
            _ => BuildPhase::Framework,
        };
        match error {
            libcnb::Error::BuildpackError(bp_err) => {
                print::error(format!(
                    "Go Vendor Buildpack {} error\n\n{bp_err}",
                    phase.context()
                ));
            }
            err => {
                print::error(format!("Go Vendor Buildpack internal error\n\n{err}"));
            }
        }
        std::process::exit(phase.exit_code());
    }
}

/// Whether `app_dir` carries a go marker file or a `.go` source anywhere
/// outside of vendored dependency directories.
fn is_go_app(app_dir: &Path) -> std::io::Result<bool> {
    for marker in GO_MARKERS {
        if app_dir.join(marker).try_exists()? {
            return Ok(true);
        }
    }
    let walker = WalkDir::new(app_dir).into_iter().filter_entry(|entry| {
        !(entry.depth() > 0
            && entry.file_type().is_dir()
            && IGNORED_DIRS.iter().any(|dir| entry.file_name() == *dir))
    });
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "go")
        {
            return Ok(true);
        }
    }
    Ok(false)
}

/// The pipeline step a build failed in. Each one exits with its own code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BuildPhase {
    Manifest,
    Detection,
    Resolution,
    Install,
    Config,
    Layout,
    Fetch,
    Packaging,
    Compile,
    Startup,
    Framework,
}

impl BuildPhase {
    pub(crate) fn exit_code(self) -> i32 {
        match self {
            BuildPhase::Manifest => 19,
            BuildPhase::Detection => 20,
            BuildPhase::Resolution => 21,
            BuildPhase::Install => 22,
            BuildPhase::Config => 23,
            BuildPhase::Layout => 24,
            BuildPhase::Fetch => 25,
            BuildPhase::Packaging => 26,
            BuildPhase::Compile => 27,
            BuildPhase::Startup => 28,
            BuildPhase::Framework => 100,
        }
    }

    fn context(self) -> &'static str {
        match self {
            BuildPhase::Manifest => "manifest",
            BuildPhase::Detection => "vendor tool detection",
            BuildPhase::Resolution => "go version resolution",
            BuildPhase::Install => "dependency install",
            BuildPhase::Config => "supply config",
            BuildPhase::Layout => "workspace",
            BuildPhase::Fetch => "dependency fetch",
            BuildPhase::Packaging => "package list",
            BuildPhase::Compile => "compile",
            BuildPhase::Startup => "startup environment",
            BuildPhase::Framework => "internal",
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum GoBuildpackError {
    #[error("{0}")]
    Manifest(ManifestError),
    #[error("{0}")]
    Detect(DetectError),
    #[error("{0}")]
    Version(VersionError),
    #[error("{0}")]
    Install(InstallError),
    #[error("{0}")]
    Config(ConfigError),
    #[error("{0}")]
    Workspace(WorkspaceError),
    #[error("{0}")]
    Fetch(FetchError),
    #[error("{0}")]
    Packages(PackagesError),
    #[error("{0}")]
    Compile(CompileError),
    #[error("{0}")]
    Startup(StartupError),
}

impl GoBuildpackError {
    pub(crate) fn phase(&self) -> BuildPhase {
        match self {
            GoBuildpackError::Manifest(_) => BuildPhase::Manifest,
            GoBuildpackError::Detect(_) => BuildPhase::Detection,
            GoBuildpackError::Version(_) => BuildPhase::Resolution,
            GoBuildpackError::Install(_) => BuildPhase::Install,
            GoBuildpackError::Config(_) => BuildPhase::Config,
            GoBuildpackError::Workspace(_) => BuildPhase::Layout,
            GoBuildpackError::Fetch(_) => BuildPhase::Fetch,
            GoBuildpackError::Packages(_) => BuildPhase::Packaging,
            GoBuildpackError::Compile(_) => BuildPhase::Compile,
            GoBuildpackError::Startup(_) => BuildPhase::Startup,
        }
    }
}

impl From<GoBuildpackError> for libcnb::Error<GoBuildpackError> {
    fn from(e: GoBuildpackError) -> Self {
        libcnb::Error::BuildpackError(e)
    }
}

buildpack_main!(GoBuildpack);
