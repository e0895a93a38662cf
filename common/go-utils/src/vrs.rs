use regex::Regex;
use semver::VersionReq;
use std::fmt;

/// `GoVersion` is a wrapper around `semver::Version` that adds
/// the ability to parse go-flavored versions like `go1.6` or `1.21rc2`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GoVersion(semver::Version);

#[derive(thiserror::Error, Debug)]
pub enum GoVersionParseError {
    #[error("Internal buildpack issue parsing go version regex: {0}")]
    Regex(#[from] regex::Error),
    #[error("Couldn't parse version. Unable to capture values from regex.")]
    Captures,
    #[error("Couldn't parse go version: {0}")]
    SemanticVersion(#[from] semver::Error),
}

impl GoVersion {
    /// Parses a go version `&str` as a `GoVersion`
    ///
    /// # Examples
    ///
    /// ```
    /// let version = go_vendor_utils::vrs::GoVersion::parse("go1.12").unwrap();
    /// assert_eq!("1.12.0", version.to_string());
    /// ```
    ///
    /// # Errors
    ///
    /// Invalid go version `&str`s like ".1", "1.*", "abc", etc. will return an error.
    pub fn parse(version: &str) -> Result<Self, GoVersionParseError> {
        let stripped_version = version.trim().strip_prefix("go").unwrap_or(version.trim());

        let caps = Regex::new(r"^(\d+)\.?(\d+)?\.?(\d+)?([a-z][a-z0-9]*)?$")?
            .captures(stripped_version)
            .ok_or(GoVersionParseError::Captures)?;

        let mut composed_version = [
            caps.get(1).map_or("0", |major| major.as_str()),
            caps.get(2).map_or("0", |minor| minor.as_str()),
            caps.get(3).map_or("0", |patch| patch.as_str()),
        ]
        .join(".");

        if let Some(pre) = caps.get(4) {
            composed_version.push('-');
            composed_version.push_str(pre.as_str());
        };

        Ok(GoVersion(semver::Version::parse(&composed_version)?))
    }

    #[must_use]
    pub fn major(&self) -> u64 {
        self.0.major
    }

    #[must_use]
    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    /// Whether this version of the go toolchain understands `go.mod` files.
    #[must_use]
    pub fn supports_modules(&self) -> bool {
        VersionReq::parse(">=1.11.0").is_ok_and(|req| req.matches(&self.0))
    }
}

impl fmt::Display for GoVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum VersionMatchError {
    #[error("no match found for {0}")]
    NoMatch(String),
}

/// Normalizes a partial go version into a matchable pattern: versions with
/// fewer than three components get a trailing `.x` wildcard, and the leading
/// `go` runtime prefix is trimmed.
///
/// ```
/// use go_vendor_utils::vrs::normalize_version_pattern;
/// assert_eq!("1.6.x", normalize_version_pattern("go1.6"));
/// assert_eq!("1.7.4", normalize_version_pattern("go1.7.4"));
/// ```
#[must_use]
pub fn normalize_version_pattern(partial: &str) -> String {
    let mut pattern = partial.trim().to_string();
    if pattern.split('.').count() < 3 {
        pattern.push_str(".x");
    }
    pattern.trim_start_matches(['g', 'o']).to_string()
}

/// Resolves a partial go version (`1.6`, `go1.6`, `go1.7.4`, `1.22.x`) to the
/// highest concrete version in `available` that matches it. The returned
/// string is the matching entry of `available`, unchanged.
///
/// # Errors
///
/// Returns `VersionMatchError::NoMatch` naming the normalized pattern when
/// the pattern is malformed or nothing in `available` matches.
pub fn find_matching_version<S: AsRef<str>>(
    partial: &str,
    available: &[S],
) -> Result<String, VersionMatchError> {
    let pattern = normalize_version_pattern(partial);
    let no_match = || VersionMatchError::NoMatch(pattern.clone());

    let fixed = pattern
        .split('.')
        .take_while(|part| !matches!(*part, "x" | "X" | "*"))
        .collect::<Vec<_>>();
    if fixed.is_empty() || fixed.iter().any(|part| part.is_empty()) {
        return Err(no_match());
    }
    let requirement = VersionReq::parse(&format!("={}", fixed.join("."))).map_err(|_| no_match())?;

    available
        .iter()
        .filter_map(|candidate| {
            GoVersion::parse(candidate.as_ref())
                .ok()
                .filter(|version| requirement.matches(&version.0))
                .map(|version| (version, candidate.as_ref()))
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, candidate)| candidate.to_string())
        .ok_or_else(no_match)
}
