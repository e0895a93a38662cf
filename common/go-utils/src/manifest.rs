use crate::vrs::{find_matching_version, VersionMatchError};
use libherokubuildpack::inventory::checksum::Checksum;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;

/// Read-only catalog of installable dependencies.
pub trait Manifest {
    /// Every version of `name` listed in the catalog, in catalog order.
    fn all_dependency_versions(&self, name: &str) -> Vec<String>;

    /// The concrete dependency selected by the catalog's default version
    /// pattern for `name`.
    ///
    /// # Errors
    ///
    /// Fails when no default is declared for `name` or when the declared
    /// pattern matches none of the listed versions.
    fn default_version(&self, name: &str) -> Result<&Dependency, ManifestError>;
}

/// A single installable artifact.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Dependency {
    pub name: String,
    pub version: String,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Checksum<Sha256>>,
    /// Location of the dependency's main executable, relative to the
    /// directory it's installed into. Required for non-archive downloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
}

impl Dependency {
    /// Whether the `uri` points at a gzipped tarball rather than a bare file.
    #[must_use]
    pub fn is_archive(&self) -> bool {
        self.uri.ends_with(".tar.gz") || self.uri.ends_with(".tgz")
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DefaultVersion {
    pub name: String,
    pub version: String,
}

/// The buildpack's `manifest.toml`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BuildpackManifest {
    #[serde(default)]
    pub default_versions: Vec<DefaultVersion>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

#[derive(thiserror::Error, Debug)]
pub enum ManifestError {
    #[error("Couldn't parse buildpack manifest: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("No default version for {0} declared in the buildpack manifest")]
    NoDefault(String),
    #[error("Default version of {name} doesn't resolve: {source}")]
    DefaultVersion {
        name: String,
        source: VersionMatchError,
    },
    #[error("Dependency {0} {1} is not listed in the buildpack manifest")]
    MissingDependency(String, String),
    #[error("Expected exactly one version of {name} in the buildpack manifest but found {count}")]
    NotOnlyVersion { name: String, count: usize },
}

impl FromStr for BuildpackManifest {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

impl BuildpackManifest {
    /// Find the entry for an exact `name` and `version` pair.
    ///
    /// # Errors
    ///
    /// Fails when the catalog has no such entry.
    pub fn dependency(&self, name: &str, version: &str) -> Result<&Dependency, ManifestError> {
        self.dependencies
            .iter()
            .find(|dependency| dependency.name == name && dependency.version == version)
            .ok_or_else(|| ManifestError::MissingDependency(name.to_string(), version.to_string()))
    }

    /// Find the entry for a dependency the catalog only carries one version of.
    ///
    /// # Errors
    ///
    /// Fails when the catalog lists zero or several versions of `name`.
    pub fn only_version(&self, name: &str) -> Result<&Dependency, ManifestError> {
        let mut matching = self
            .dependencies
            .iter()
            .filter(|dependency| dependency.name == name);
        match (matching.next(), matching.count()) {
            (Some(dependency), 0) => Ok(dependency),
            (first, rest) => Err(ManifestError::NotOnlyVersion {
                name: name.to_string(),
                count: usize::from(first.is_some()) + rest,
            }),
        }
    }
}

impl Manifest for BuildpackManifest {
    fn all_dependency_versions(&self, name: &str) -> Vec<String> {
        self.dependencies
            .iter()
            .filter(|dependency| dependency.name == name)
            .map(|dependency| dependency.version.clone())
            .collect()
    }

    fn default_version(&self, name: &str) -> Result<&Dependency, ManifestError> {
        let default = self
            .default_versions
            .iter()
            .find(|default| default.name == name)
            .ok_or_else(|| ManifestError::NoDefault(name.to_string()))?;

        let version = find_matching_version(&default.version, &self.all_dependency_versions(name))
            .map_err(|source| ManifestError::DefaultVersion {
                name: name.to_string(),
                source,
            })?;

        self.dependency(name, &version)
    }
}
