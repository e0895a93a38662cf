use crate::cfg::BuildpackConfig;
use crate::cmd::{self, CommandRunner};
use crate::vendor_tool::VendorTool;
use fs_err as fs;
use libcnb::Env;
use std::path::{Path, PathBuf, StripPrefixError};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Top level entries of the app that stay where they are when the app is
/// moved into an in-image `GOPATH`.
const KEEP_AT_ROOT: [&str; 5] = [".cloudfoundry", "Procfile", ".profile", "src", ".profile.d"];

#[derive(thiserror::Error, Debug)]
pub(crate) enum WorkspaceError {
    #[error("To use go native vendoring set the $GOPACKAGENAME\nenvironment variable to your app's package name")]
    MissingPackageName,
    #[error("go.mod doesn't declare a module path.\nAdd a `module` directive to go.mod or set $GOPACKAGENAME")]
    MissingModulePath,
    #[error("Unable to determine import path with `glide name`: {0}")]
    GlideName(cmd::Error),
    #[error("Unable to setup Go path: {0} exists but is not a directory")]
    BinNotDirectory(PathBuf),
    #[error("Unable to setup Go path: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unable to setup Go path: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Unable to setup Go path: {0}")]
    Prefix(#[from] StripPrefixError),
}

/// Work out the import path the app's sources live under.
///
/// # Errors
///
/// Tools that don't declare an import path need `$GOPACKAGENAME`; glide
/// apps fail when `glide name` fails.
pub(crate) fn main_package_name(
    tool: &VendorTool,
    config: &BuildpackConfig,
    app_dir: &Path,
    runner: &impl CommandRunner,
    env: &Env,
) -> Result<String, WorkspaceError> {
    match tool {
        VendorTool::Godep(godep) => Ok(godep.import_path.clone()),
        VendorTool::Glide => runner
            .capture_stdout(app_dir, "glide", &["name".to_string()], env)
            .map(|stdout| stdout.trim().to_string())
            .map_err(WorkspaceError::GlideName),
        VendorTool::Dep | VendorTool::Native => config
            .package_name
            .clone()
            .ok_or(WorkspaceError::MissingPackageName),
        VendorTool::GoMod(gomod) => gomod
            .module_path
            .clone()
            .or_else(|| config.package_name.clone())
            .ok_or(WorkspaceError::MissingModulePath),
    }
}

/// The on-disk layout the go toolchain compiles from.
#[derive(Debug)]
pub(crate) struct Workspace {
    pub(crate) go_path: PathBuf,
    pub(crate) main_package_path: PathBuf,
    /// Set only when binaries wouldn't otherwise land in `<app>/bin`.
    pub(crate) go_bin: Option<PathBuf>,
    // Holds the ephemeral GOPATH until the workspace is dropped.
    _tmp: Option<TempDir>,
}

impl Workspace {
    /// `env` with `GOPATH` and `GOBIN` pointing at this workspace and
    /// `GIT_DIR` removed, since it confuses `go install`.
    pub(crate) fn apply(&self, env: &Env) -> Env {
        let mut env = cmd::without_vars(env, &["GIT_DIR", "GOBIN"]);
        env.insert("GOPATH", &self.go_path);
        if let Some(go_bin) = &self.go_bin {
            env.insert("GOBIN", go_bin);
        }
        env
    }
}

/// Lay out the app for the toolchain.
///
/// Classic tools get `GOPATH/src/<main_package_name>`: a copy of the app in a
/// fresh temporary `GOPATH`, or, with `in_image`, the app itself moved below
/// `<app>/src/`. Module apps compile in place.
///
/// `<app>/bin` exists once this returns.
///
/// # Errors
///
/// Any filesystem failure, or a `<app>/bin` that isn't a directory.
pub(crate) fn setup(
    app_dir: &Path,
    tool: &VendorTool,
    main_package_name: &str,
    in_image: bool,
) -> Result<Workspace, WorkspaceError> {
    let bin_dir = ensure_bin_dir(app_dir)?;

    let (go_path, tmp) = if in_image {
        (app_dir.to_path_buf(), None)
    } else {
        let tmp = tempfile::Builder::new()
            .prefix("gobuildpack.gopath")
            .tempdir()?;
        (tmp.path().join(".go"), Some(tmp))
    };
    fs::create_dir_all(&go_path)?;

    if let VendorTool::GoMod(_) = tool {
        return Ok(Workspace {
            go_path,
            main_package_path: app_dir.to_path_buf(),
            go_bin: (!in_image).then_some(bin_dir),
            _tmp: tmp,
        });
    }

    let main_package_path = go_path.join("src").join(main_package_name);
    fs::create_dir_all(&main_package_path)?;

    if in_image {
        move_app(app_dir, &main_package_path)?;
        ensure_bin_dir(app_dir)?;
        Ok(Workspace {
            go_path,
            main_package_path,
            go_bin: None,
            _tmp: tmp,
        })
    } else {
        copy_dir(app_dir, &main_package_path)?;
        Ok(Workspace {
            go_path,
            main_package_path,
            go_bin: Some(bin_dir),
            _tmp: tmp,
        })
    }
}

fn ensure_bin_dir(app_dir: &Path) -> Result<PathBuf, WorkspaceError> {
    let bin_dir = app_dir.join("bin");
    if bin_dir.try_exists()? && !bin_dir.is_dir() {
        return Err(WorkspaceError::BinNotDirectory(bin_dir));
    }
    fs::create_dir_all(&bin_dir)?;
    Ok(bin_dir)
}

fn move_app(app_dir: &Path, main_package_path: &Path) -> Result<(), WorkspaceError> {
    for entry in fs::read_dir(app_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if KEEP_AT_ROOT.iter().any(|keep| name == *keep) {
            continue;
        }
        fs::rename(entry.path(), main_package_path.join(&name))?;
    }
    Ok(())
}

/// Recursive copy that recreates symlinks instead of following them.
fn copy_dir(src: &Path, dest: &Path) -> Result<(), WorkspaceError> {
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let target = dest.join(entry.path().strip_prefix(src)?);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            fs::os::unix::fs::symlink(fs::read_link(entry.path())?, &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
