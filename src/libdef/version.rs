//! Package-version parsing for libdef directory names.
//!
//! Libdef package directories are named `<pkgName>_v<major>.<minor>.<patch>`
//! with an optional `-<prerelease>` suffix. The minor and patch components
//! may be the wildcard `x` ("any value at this position"); the major must be
//! a concrete number — a wildcard major means the directory is malformed,
//! not that the libdef covers every major version.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use super::errors::{LibDefError, ValidationErrors, record_or_fail};

static PKG_NAMEVER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*)_v([0-9]+)\.([0-9]+|x)\.([0-9]+|x)(?:-(.+))?$")
        .expect("static regex must compile")
});

/// A single version component: a concrete number or the `x` wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionPart {
    Fixed(u64),
    Wildcard,
}

impl VersionPart {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, VersionPart::Wildcard)
    }

    /// Smallest concrete value this component admits.
    pub fn lower_bound(&self) -> u64 {
        match self {
            VersionPart::Fixed(n) => *n,
            VersionPart::Wildcard => 0,
        }
    }

    /// Whether a concrete value falls within this component.
    pub fn matches(&self, value: u64) -> bool {
        match self {
            VersionPart::Fixed(n) => *n == value,
            VersionPart::Wildcard => true,
        }
    }
}

impl fmt::Display for VersionPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionPart::Fixed(n) => write!(f, "{n}"),
            VersionPart::Wildcard => write!(f, "x"),
        }
    }
}

/// The version a libdef targets, as parsed from its directory name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkgVersion {
    pub major: u64,
    pub minor: VersionPart,
    pub patch: VersionPart,
    pub prerel: Option<String>,
}

impl fmt::Display for PkgVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(prerel) = &self.prerel {
            write!(f, "-{prerel}")?;
        }
        Ok(())
    }
}

/// Result of splitting a package directory name into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkgNameVer {
    pub name: String,
    pub version: PkgVersion,
}

/// Validate a version component that must be a concrete number.
///
/// Fail-fast mode returns the error; accumulate mode records it under
/// `context` and yields `None` so the caller skips the unit.
pub fn validate_version_num_part(
    token: &str,
    field: &str,
    context: &str,
    errors: Option<&mut ValidationErrors>,
) -> Result<Option<u64>, LibDefError> {
    match token.parse::<u64>() {
        Ok(num) => Ok(Some(num)),
        Err(_) => {
            record_or_fail(
                errors,
                LibDefError::invalid_version_number(context, field, token),
            )?;
            Ok(None)
        }
    }
}

/// Validate a version component that may also be the `x` wildcard.
pub fn validate_version_part(
    token: &str,
    field: &str,
    context: &str,
    errors: Option<&mut ValidationErrors>,
) -> Result<Option<VersionPart>, LibDefError> {
    if token == "x" {
        return Ok(Some(VersionPart::Wildcard));
    }
    Ok(validate_version_num_part(token, field, context, errors)?.map(VersionPart::Fixed))
}

/// Parse a `<pkgName>_v<major>.<minor>.<patch>[-<prerel>]` directory name.
///
/// A structural mismatch (including a wildcard major) is
/// `MalformedPackageName`, keyed by the directory name itself.
pub fn parse_pkg_name_ver(
    dir_name: &str,
    context: &str,
    mut errors: Option<&mut ValidationErrors>,
) -> Result<Option<PkgNameVer>, LibDefError> {
    let Some(caps) = PKG_NAMEVER_RE.captures(dir_name) else {
        record_or_fail(errors, LibDefError::malformed_package_name(dir_name))?;
        return Ok(None);
    };

    let Some(major) = validate_version_num_part(&caps[2], "major", context, errors.as_deref_mut())?
    else {
        return Ok(None);
    };
    let Some(minor) = validate_version_part(&caps[3], "minor", context, errors.as_deref_mut())?
    else {
        return Ok(None);
    };
    let Some(patch) = validate_version_part(&caps[4], "patch", context, errors.as_deref_mut())?
    else {
        return Ok(None);
    };

    Ok(Some(PkgNameVer {
        name: caps[1].to_string(),
        version: PkgVersion {
            major,
            minor,
            patch,
            prerel: caps.get(5).map(|m| m.as_str().to_string()),
        },
    }))
}
