use crate::vendor_tool::VendorTool;
use go_vendor_utils::vrs::{GoVersion, GoVersionParseError};
use indoc::formatdoc;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub(crate) enum PackagesError {
    #[error(
        "GO15VENDOREXPERIMENT is set, but is not supported by go1.7 and later.\nUnset GO15VENDOREXPERIMENT from the build environment before building again."
    )]
    UnsupportedVendorExperiment,
    #[error(
        "$GO15VENDOREXPERIMENT=0. To vendor your packages in vendor/\nwith go 1.6 this environment variable must unset or set to 1."
    )]
    MustUseVendor,
    #[error("Invalid vendor config: {0}")]
    GoVersion(#[from] GoVersionParseError),
    #[error("Unable to determine packages to install: {0}")]
    Io(#[from] std::io::Error),
}

/// Whether `vendor/` directories are honored. Always on, unless
/// `GO15VENDOREXPERIMENT=0` on go 1.6, the only release where the toggle did
/// anything.
///
/// # Errors
///
/// Setting `GO15VENDOREXPERIMENT` at all for any other go version is an error.
pub(crate) fn vendor_experiment(
    setting: Option<&str>,
    go_version: &str,
) -> Result<bool, PackagesError> {
    let Some(setting) = setting else {
        return Ok(true);
    };

    let version = GoVersion::parse(go_version)?;
    if (version.major(), version.minor()) != (1, 6) {
        return Err(PackagesError::UnsupportedVendorExperiment);
    }

    Ok(setting != "0")
}

/// Packages handed to `go install`, plus the warnings that choosing them
/// produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct PackageList {
    pub(crate) packages: Vec<String>,
    pub(crate) warnings: Vec<String>,
}

const DEFAULT_PACKAGE_WARNING: &str = "Installing package '.' (default)";

/// Work out which packages to install.
///
/// `GO_INSTALL_PACKAGE_SPEC` wins; godep apps otherwise use the packages
/// declared in `Godeps.json`; everything else installs `.`. Packages that
/// live under `vendor/` are then addressed through their vendored import
/// path, except for godep apps that still use `Godeps/_workspace` and for
/// go modules apps.
///
/// # Errors
///
/// Native vendoring with the vendor experiment disabled can't work, and the
/// vendor directory has to be inspectable.
pub(crate) fn resolve_packages(
    tool: &VendorTool,
    package_spec: Option<&[String]>,
    vendor_experiment: bool,
    main_package_name: &str,
    main_package_path: &Path,
) -> Result<PackageList, PackagesError> {
    let vendor_exists = main_package_path.join("vendor").try_exists()?;
    let mut warnings = Vec::new();

    let packages = match tool {
        VendorTool::Godep(godep) => {
            if godep.workspace_exists && vendor_exists {
                warnings.push(
                    "Godeps/_workspace/src and vendor/ exist\ncode may not compile. Please convert all deps to vendor/"
                        .to_string(),
                );
            }
            if !godep.workspace_exists && !vendor_exists {
                warnings.push("vendor/ directory does not exist.".to_string());
            }

            let packages = match package_spec {
                Some(spec) => {
                    if !godep.packages.is_empty() {
                        warnings.push(package_spec_warning(spec));
                    }
                    spec.to_vec()
                }
                None if !godep.packages.is_empty() => godep.packages.clone(),
                None => {
                    warnings.push(DEFAULT_PACKAGE_WARNING.to_string());
                    vec![String::from(".")]
                }
            };

            if vendor_experiment && !godep.workspace_exists {
                vendored(&packages, main_package_name, main_package_path)?
            } else {
                packages
            }
        }
        _ => {
            if !vendor_experiment && matches!(tool, VendorTool::Native) {
                return Err(PackagesError::MustUseVendor);
            }

            let packages = package_spec.map_or_else(
                || {
                    warnings.push(DEFAULT_PACKAGE_WARNING.to_string());
                    vec![String::from(".")]
                },
                <[String]>::to_vec,
            );

            if let VendorTool::GoMod(_) = tool {
                packages
            } else {
                vendored(&packages, main_package_name, main_package_path)?
            }
        }
    };

    Ok(PackageList { packages, warnings })
}

fn package_spec_warning(spec: &[String]) -> String {
    let spec = spec.join(" ");
    formatdoc! {"
        Using $GO_INSTALL_PACKAGE_SPEC override.
            $GO_INSTALL_PACKAGE_SPEC = {spec}

        If this isn't what you want please unset GO_INSTALL_PACKAGE_SPEC from the build environment.
    "}
}

/// Rewrite packages found under `vendor/` to `<main package>/vendor/<pkg>`.
fn vendored(
    packages: &[String],
    main_package_name: &str,
    main_package_path: &Path,
) -> Result<Vec<String>, std::io::Error> {
    packages
        .iter()
        .map(|package| -> Result<String, std::io::Error> {
            // Joined the way go joins paths, so `/x` looks under `vendor/x`.
            let relative = package.trim_start_matches('/');
            if package == "."
                || relative.is_empty()
                || !main_package_path.join("vendor").join(relative).try_exists()?
            {
                Ok(package.clone())
            } else {
                Ok(format!("{main_package_name}/vendor/{relative}"))
            }
        })
        .collect()
}
