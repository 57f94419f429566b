//! Matching installed libdefs against a dependency and a Flow version.
//!
//! Given the flat list the repository walker produced, pick the libdef that
//! best serves one `package@range` dependency: same package, Flow-compatible,
//! and the highest version whose range admits the dependency's lower bound.

use semver::{Version, VersionReq};

use super::extractor::LibDef;
use super::flow_version::FlowVer;

/// Split an npm package name into its scope (without `@`) and bare name.
pub fn split_scoped_name(pkg_name: &str) -> (Option<&str>, &str) {
    pkg_name
        .strip_prefix('@')
        .and_then(|rest| rest.split_once('/'))
        .map(|(scope, name)| (Some(scope), name))
        .unwrap_or((None, pkg_name))
}

/// The smallest concrete version a range string admits.
///
/// Wildcard components collapse to zero: `"v1.x.x"` → `1.0.0`, `"^1.2.3"` →
/// `1.2.3`, `"*"` → `0.0.0`. Returns `None` for strings that are not a
/// parseable range.
pub fn get_range_lower_bound(range_str: &str) -> Option<Version> {
    let trimmed = range_str.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let req = VersionReq::parse(trimmed).ok()?;
    let Some(comparator) = req.comparators.first() else {
        // The empty requirement ("*") admits everything
        return Some(Version::new(0, 0, 0));
    };
    let mut version = Version::new(
        comparator.major,
        comparator.minor.unwrap_or(0),
        comparator.patch.unwrap_or(0),
    );
    version.pre = comparator.pre.clone();
    Some(version)
}

/// Interpret a libdef version token as the range of package versions it
/// covers: wildcarded tokens span their wildcards (`v1.x.x` covers all of
/// 1.*), concrete tokens cover exactly themselves.
fn version_token_to_req(token: &str) -> Option<VersionReq> {
    let stripped = token.strip_prefix('v').unwrap_or(token);
    let normalized = if stripped.contains('x') || stripped.contains('*') {
        stripped.to_string()
    } else {
        format!("={stripped}")
    };
    VersionReq::parse(&normalized).ok()
}

/// Find the best installed libdef for `pkg_name@pkg_version_str` under the
/// given Flow version.
///
/// `None` means no compatible definition exists — the caller decides whether
/// that is fatal.
pub fn find_npm_libdef<'a>(
    libdefs: &'a [LibDef],
    pkg_name: &str,
    pkg_version_str: &str,
    flow_version: &FlowVer,
) -> Option<&'a LibDef> {
    let (scope, name) = split_scoped_name(pkg_name);
    let requested_lower = get_range_lower_bound(pkg_version_str)?;

    libdefs
        .iter()
        .filter(|def| def.name == name && def.scope.as_deref() == scope)
        .filter(|def| def.flow_version.contains(flow_version))
        .filter(|def| {
            version_token_to_req(&def.version)
                .is_some_and(|req| req.matches(&requested_lower))
        })
        .max_by_key(|def| get_range_lower_bound(&def.version))
}

/// Whether the libdef's version range starts below the dependency's
/// requested lower bound — the definition still satisfies the dependency,
/// but may not cover its newest minor/patch API surface. Advisory only.
pub fn libdef_needs_update(libdef: &LibDef, pkg_version_str: &str) -> bool {
    match (
        get_range_lower_bound(&libdef.version),
        get_range_lower_bound(pkg_version_str),
    ) {
        (Some(def_lower), Some(dep_lower)) => def_lower < dep_lower,
        _ => false,
    }
}
