use crate::gomod::GoMod;
use crate::vendor_tool::VendorTool;
use go_vendor_utils::manifest::{Manifest, ManifestError};
use go_vendor_utils::vrs::{
    find_matching_version, GoVersion, GoVersionParseError, VersionMatchError,
};
use indoc::formatdoc;

#[derive(thiserror::Error, Debug)]
pub(crate) enum VersionError {
    #[error("{0}")]
    NoMatch(#[from] VersionMatchError),
    #[error("{0}")]
    Manifest(#[from] ManifestError),
    #[error("Couldn't parse resolved go version: {0}")]
    Parse(#[from] GoVersionParseError),
    #[error("go{0} does not support go modules. Go 1.11 or later is required")]
    ModulesUnsupported(String),
}

/// A concrete go version from the manifest plus the warning, if any, that
/// selecting it should produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GoVersionSelection {
    pub(crate) version: String,
    pub(crate) warning: Option<String>,
}

/// Pick the concrete go version to install.
///
/// `GOVERSION` always wins. Without it godep apps use the version from
/// `Godeps.json` (even an empty one), module apps use their `go` directive
/// when present, and everything else uses the manifest default.
///
/// # Errors
///
/// Fails when the requested version matches nothing in the manifest, and for
/// module apps when the match predates go modules.
pub(crate) fn select_go_version(
    tool: &VendorTool,
    version_override: Option<&str>,
    manifest: &impl Manifest,
) -> Result<GoVersionSelection, VersionError> {
    let requested = match (version_override, tool) {
        (Some(version), _) => version.to_string(),
        (None, VendorTool::Godep(godep)) => godep.go_version.clone(),
        (
            None,
            VendorTool::GoMod(GoMod {
                go_version: Some(version),
                ..
            }),
        ) => version.clone(),
        (None, _) => format!("go{}", manifest.default_version("go")?.version),
    };

    let version = find_matching_version(&requested, &manifest.all_dependency_versions("go"))?;

    if let VendorTool::GoMod(_) = tool {
        if !GoVersion::parse(&version)?.supports_modules() {
            return Err(VersionError::ModulesUnsupported(version));
        }
    }

    Ok(GoVersionSelection {
        version,
        warning: override_warning(tool, version_override),
    })
}

/// `GOVERSION` is announced whenever it's set, except for module apps whose
/// `go.mod` declares no version: there's nothing for it to override.
pub(crate) fn override_warning(
    tool: &VendorTool,
    version_override: Option<&str>,
) -> Option<String> {
    let version = version_override?;
    match tool {
        VendorTool::GoMod(GoMod {
            go_version: None, ..
        }) => None,
        _ => Some(formatdoc! {"
            Using $GOVERSION override.
                $GOVERSION = {version}

            If this isn't what you want please unset GOVERSION from the build environment.
        "}),
    }
}
