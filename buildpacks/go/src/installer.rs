use crate::tgz;
use go_vendor_utils::manifest::{BuildpackManifest, Dependency, ManifestError};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub(crate) enum InstallError {
    #[error("{0}")]
    Manifest(#[from] ManifestError),
    #[error("Unable to install {0}: {1}")]
    Download(String, tgz::Error),
}

/// Installs manifest dependencies into a directory.
pub(crate) trait Installer {
    /// Install the exact `name` and `version` pair.
    ///
    /// # Errors
    ///
    /// Fails when the manifest doesn't list the dependency or it can't be
    /// downloaded and verified.
    fn install_dependency(
        &self,
        name: &str,
        version: &str,
        dest: &Path,
    ) -> Result<(), InstallError>;

    /// Install the only version of `name` the manifest lists.
    ///
    /// # Errors
    ///
    /// Fails when the manifest lists zero or several versions, or on download
    /// and verification failures.
    fn install_only_version(&self, name: &str, dest: &Path) -> Result<(), InstallError>;
}

pub(crate) struct ManifestInstaller<'a> {
    manifest: &'a BuildpackManifest,
}

impl<'a> ManifestInstaller<'a> {
    pub(crate) fn new(manifest: &'a BuildpackManifest) -> Self {
        ManifestInstaller { manifest }
    }

    fn install(dependency: &Dependency, dest: &Path) -> Result<(), InstallError> {
        tgz::fetch_verify_install(dependency, dest)
            .map_err(|error| InstallError::Download(dependency.to_string(), error))
    }
}

impl Installer for ManifestInstaller<'_> {
    fn install_dependency(
        &self,
        name: &str,
        version: &str,
        dest: &Path,
    ) -> Result<(), InstallError> {
        Self::install(self.manifest.dependency(name, version)?, dest)
    }

    fn install_only_version(&self, name: &str, dest: &Path) -> Result<(), InstallError> {
        Self::install(self.manifest.only_version(name)?, dest)
    }
}
