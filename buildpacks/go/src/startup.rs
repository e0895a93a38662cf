use bullet_stream::global::print;
use bullet_stream::style;
use fs_err as fs;
use libcnb::data::launch::{Launch, LaunchBuilder, ProcessBuilder};
use libcnb::data::process_type;
use libcnb::layer_env::{LayerEnv, ModificationBehavior, Scope};
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use walkdir::WalkDir;

#[derive(thiserror::Error, Debug)]
#[error("Unable to create startup scripts: {0}")]
pub(crate) struct StartupError(#[from] std::io::Error);

/// Final build state the runtime environment is derived from.
#[derive(Debug)]
pub(crate) struct StartupEnvironment<'a> {
    pub(crate) app_dir: &'a Path,
    pub(crate) main_package_path: &'a Path,
    pub(crate) go_path: &'a Path,
    pub(crate) gopath_in_image: bool,
    /// The toolchain root, when the toolchain stays in the image.
    pub(crate) goroot: Option<&'a Path>,
}

/// Binary name `go install` produces for an import path.
pub(crate) fn binary_name(main_package_name: &str) -> &str {
    main_package_name
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(main_package_name)
}

/// A default `web` process running the app's compiled binary.
pub(crate) fn launch(main_package_name: &str) -> Launch {
    LaunchBuilder::new()
        .process(
            ProcessBuilder::new(
                process_type!("web"),
                [format!("./bin/{}", binary_name(main_package_name))],
            )
            .default(true)
            .build(),
        )
        .build()
}

/// Write `profile.d` scripts into `profile_dir` and return the equivalent
/// launch environment.
///
/// # Errors
///
/// Any filesystem failure writing the scripts or removing `$GOPATH/pkg`.
pub(crate) fn write_startup_environment(
    profile_dir: &Path,
    startup: &StartupEnvironment,
) -> Result<LayerEnv, StartupError> {
    let scripts_dir = profile_dir.join("profile.d");
    fs::create_dir_all(&scripts_dir)?;

    let app_bin = startup.app_dir.join("bin");
    let mut path = vec![app_bin.to_string_lossy().to_string()];
    let mut env = LayerEnv::new();

    if let Some(goroot) = startup.goroot {
        print::sub_bullet(format!(
            "Leaving go tool chain in $GOROOT={}",
            style::value(goroot.to_string_lossy())
        ));
        fs::write(scripts_dir.join("goroot.sh"), goroot_script(goroot))?;
        env = env.chainable_insert(Scope::Launch, ModificationBehavior::Override, "GOROOT", goroot);
        path.push(goroot.join("bin").to_string_lossy().to_string());
    }

    if startup.gopath_in_image {
        print::sub_bullet("Cleaning up $GOPATH/pkg");
        let pkg = startup.go_path.join("pkg");
        if pkg.try_exists()? {
            remove_pkg_dir(&pkg)?;
        }
        fs::write(
            scripts_dir.join("zzgopath.sh"),
            gopath_script(startup.go_path, startup.main_package_path),
        )?;
        env = env.chainable_insert(
            Scope::Launch,
            ModificationBehavior::Override,
            "GOPATH",
            startup.go_path,
        );
    }

    fs::write(scripts_dir.join("go.sh"), path_script(&app_bin))?;

    Ok(env
        .chainable_insert(Scope::Launch, ModificationBehavior::Append, "PATH", path.join(":"))
        .chainable_insert(Scope::Launch, ModificationBehavior::Delimiter, "PATH", ":"))
}

/// Remove `$GOPATH/pkg`. The module cache under `pkg/mod` is left read-only
/// by go, so owner write access is restored on every directory first.
fn remove_pkg_dir(pkg: &Path) -> io::Result<()> {
    for entry in WalkDir::new(pkg) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            let mut permissions = entry.metadata()?.permissions();
            permissions.set_mode(permissions.mode() | 0o700);
            fs::set_permissions(entry.path(), permissions)?;
        }
    }
    fs::remove_dir_all(pkg)
}

fn path_script(app_bin: &Path) -> String {
    format!("PATH=$PATH:{}\n", app_bin.display())
}

fn goroot_script(goroot: &Path) -> String {
    format!(
        "export GOROOT={}\nPATH=$PATH:$GOROOT/bin\n",
        goroot.display()
    )
}

fn gopath_script(go_path: &Path, main_package_path: &Path) -> String {
    format!(
        "export GOPATH={}\ncd {}\n",
        go_path.display(),
        main_package_path.display()
    )
}
