use crate::godep::{self, Godep, ReadGodepsError};
use crate::gomod::{self, GoMod, ReadGoModError};
use fs_err as fs;
use std::fmt;
use std::path::Path;
use walkdir::WalkDir;

/// The dependency management convention an app follows. Selected once per
/// build and carries whatever metadata the convention declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum VendorTool {
    Godep(Godep),
    Glide,
    Dep,
    GoMod(GoMod),
    Native,
}

impl VendorTool {
    /// The stable name used in logs and in the supply/finalize config document.
    pub(crate) fn name(&self) -> &'static str {
        match self {
            VendorTool::Godep(_) => "godep",
            VendorTool::Glide => "glide",
            VendorTool::Dep => "dep",
            VendorTool::GoMod(_) => "gomod",
            VendorTool::Native => "go_nativevendoring",
        }
    }

    /// The manifest dependency that has to be installed for this tool to run.
    pub(crate) fn installable(&self) -> Option<&'static str> {
        match self {
            VendorTool::Godep(_) => Some("godep"),
            VendorTool::Glide => Some("glide"),
            VendorTool::Dep => Some("dep"),
            VendorTool::GoMod(_) | VendorTool::Native => None,
        }
    }

    /// Value of `GO111MODULE` for every go invocation of the build.
    pub(crate) fn go111module(&self) -> &'static str {
        match self {
            VendorTool::GoMod(_) => "on",
            _ => "off",
        }
    }
}

impl fmt::Display for VendorTool {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum DetectError {
    #[error(
        "Deprecated, .godir file found! Please update to supported Godep or Glide dependency managers.\nSee https://github.com/tools/godep or https://github.com/Masterminds/glide for usage information."
    )]
    Godir,
    #[error(
        "The GB package manager is not supported.\nOnly the Godep, Glide, dep and Go modules package managers are supported for go apps."
    )]
    GoPathLayout,
    #[error("{0}")]
    Godeps(#[from] ReadGodepsError),
    #[error("{0}")]
    GoMod(#[from] ReadGoModError),
    #[error("Unable to inspect app directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unable to inspect app directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Select the vendor tool governing the app at `app_dir`.
///
/// Markers are checked in a fixed order and the first match wins: `.godir`,
/// a gb style `src/` tree, `go.mod`, `Godeps/Godeps.json`, `glide.yaml`,
/// `Gopkg.toml`. Anything else is native vendoring.
///
/// # Errors
///
/// `.godir` and gb layouts are always errors, as are unreadable metadata
/// files.
pub(crate) fn detect(app_dir: &Path) -> Result<VendorTool, DetectError> {
    if app_dir.join(".godir").try_exists()? {
        return Err(DetectError::Godir);
    }

    if is_gopath_layout(app_dir)? {
        return Err(DetectError::GoPathLayout);
    }

    if app_dir.join("go.mod").try_exists()? {
        return Ok(VendorTool::GoMod(gomod::read_gomod(app_dir.join("go.mod"))?));
    }

    if app_dir.join("Godeps").join("Godeps.json").try_exists()? {
        return Ok(VendorTool::Godep(godep::read_godeps(app_dir)?));
    }

    if app_dir.join("glide.yaml").try_exists()? {
        return Ok(VendorTool::Glide);
    }

    if app_dir.join("Gopkg.toml").try_exists()? {
        return Ok(VendorTool::Dep);
    }

    Ok(VendorTool::Native)
}

/// A top level `src/` with at least one subdirectory holding go sources.
fn is_gopath_layout(app_dir: &Path) -> Result<bool, DetectError> {
    let src = app_dir.join("src");
    if !src.is_dir() {
        return Ok(false);
    }

    for entry in fs::read_dir(&src)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        for walked in WalkDir::new(entry.path()) {
            if walked?.file_name().to_string_lossy().ends_with(".go") {
                return Ok(true);
            }
        }
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_with(files: &[&str]) -> tempfile::TempDir {
        let app = tempfile::tempdir().unwrap();
        for file in files {
            let path = app.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            let contents = match *file {
                "Godeps/Godeps.json" => r#"{"ImportPath": "go-online", "GoVersion": "go1.6"}"#,
                "go.mod" => "module example.com/app\n\ngo 1.22\n",
                _ => "",
            };
            fs::write(path, contents).unwrap();
        }
        app
    }

    fn detected(files: &[&str]) -> &'static str {
        detect(app_with(files).path()).unwrap().name()
    }

    #[test]
    fn godir_is_rejected_before_anything_else() {
        let app = app_with(&[".godir", "go.mod", "Godeps/Godeps.json"]);
        let err = detect(app.path()).unwrap_err();
        assert!(matches!(err, DetectError::Godir));
        assert!(err.to_string().starts_with("Deprecated, .godir file found!"));
    }

    #[test]
    fn gb_layout_is_rejected() {
        let app = app_with(&["src/myapp/cmd/main.go", "go.mod"]);
        assert!(matches!(
            detect(app.path()),
            Err(DetectError::GoPathLayout)
        ));
    }

    #[test]
    fn src_without_go_sources_is_not_gb() {
        assert_eq!("go_nativevendoring", detected(&["src/assets/app.css", "src/README.md"]));
    }

    #[test]
    fn go_files_directly_in_src_are_not_gb() {
        assert_eq!("go_nativevendoring", detected(&["src/main.go"]));
    }

    #[test]
    fn priority_order() {
        assert_eq!(
            "gomod",
            detected(&["go.mod", "Godeps/Godeps.json", "glide.yaml", "Gopkg.toml"])
        );
        assert_eq!(
            "godep",
            detected(&["Godeps/Godeps.json", "glide.yaml", "Gopkg.toml"])
        );
        assert_eq!("glide", detected(&["glide.yaml", "Gopkg.toml"]));
        assert_eq!("dep", detected(&["Gopkg.toml"]));
        assert_eq!("go_nativevendoring", detected(&["main.go", "vendor/lib/lib.go"]));
    }

    #[test]
    fn godep_metadata_is_loaded() {
        let app = app_with(&["Godeps/Godeps.json"]);
        fs::create_dir_all(app.path().join("Godeps/_workspace/src")).unwrap();

        let VendorTool::Godep(godep) = detect(app.path()).unwrap() else {
            panic!("Expected godep");
        };
        assert_eq!("go-online", godep.import_path);
        assert_eq!("go1.6", godep.go_version);
        assert!(godep.workspace_exists);
    }

    #[test]
    fn gomod_metadata_is_loaded() {
        let app = app_with(&["go.mod"]);
        assert_eq!(
            VendorTool::GoMod(GoMod {
                go_version: Some("1.22".to_string()),
                module_path: Some("example.com/app".to_string()),
            }),
            detect(app.path()).unwrap()
        );
    }

    #[test]
    fn bad_godeps_json() {
        let app = app_with(&[]);
        fs::create_dir_all(app.path().join("Godeps")).unwrap();
        fs::write(app.path().join("Godeps/Godeps.json"), "not json").unwrap();

        assert!(matches!(detect(app.path()), Err(DetectError::Godeps(_))));
    }

    #[test]
    fn module_mode_marker() {
        assert_eq!("on", VendorTool::GoMod(GoMod::default()).go111module());
        assert_eq!("off", VendorTool::Glide.go111module());
        assert_eq!(None, VendorTool::Native.installable());
        assert_eq!(Some("dep"), VendorTool::Dep.installable());
    }
}
