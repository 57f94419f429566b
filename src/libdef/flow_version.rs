//! Flow compatibility ranges for libdefs.
//!
//! Each libdef is valid for a range of Flow versions, encoded in the name of
//! the sub-directory it lives in: `flow_v0.13.x-v0.37.x` is an inclusive
//! range, `flow_v0.38.x-` is "this version and everything after it",
//! `flow_v0.38.x` pins a single (possibly wildcarded) version, and
//! `flow_all` matches every Flow version.
//!
//! Comparisons here widen wildcards on purpose: for ordering and overlap
//! testing, an `x` component spans its entire numeric domain, so two bounds
//! that could coincide at some concrete version are never treated as
//! separable. The comparison is an explicit function rather than an `Ord`
//! impl to keep that widening from leaking into contexts that expect a total
//! order.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use super::errors::{LibDefError, ValidationErrors, record_or_fail};
use super::version::{VersionPart, validate_version_num_part, validate_version_part};

/// Directory prefix marking a Flow version range inside a package directory.
pub const FLOW_DIR_PREFIX: &str = "flow_";

static FLOW_VER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v([0-9]+)\.([0-9]+|x)\.([0-9]+|x)(?:-(.+))?$")
        .expect("static regex must compile")
});

/// One endpoint of a Flow compatibility range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowVer {
    pub major: u64,
    pub minor: VersionPart,
    pub patch: VersionPart,
    pub prerel: Option<String>,
}

impl fmt::Display for FlowVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(prerel) = &self.prerel {
            write!(f, "-{prerel}")?;
        }
        Ok(())
    }
}

/// The range of Flow versions a libdef is compatible with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowVersion {
    /// Compatible with every Flow version (a flat libdef, or `flow_all`).
    All,
    /// Compatible with exactly one (possibly wildcarded) version.
    Specific(FlowVer),
    /// Inclusive range; `upper: None` means unbounded above.
    Ranged {
        lower: FlowVer,
        upper: Option<FlowVer>,
    },
}

/// Wildcard-widened `a <= b` over bounds.
///
/// Components compare major, then minor, then patch; as soon as either side
/// of a component is a wildcard the bounds can coincide, so the comparison
/// answers `true`. Prereleases do not participate in range ordering.
fn bound_lte(a: &FlowVer, b: &FlowVer) -> bool {
    if a.major != b.major {
        return a.major < b.major;
    }
    match (a.minor, b.minor) {
        (VersionPart::Fixed(am), VersionPart::Fixed(bm)) if am != bm => am < bm,
        (VersionPart::Fixed(_), VersionPart::Fixed(_)) => match (a.patch, b.patch) {
            (VersionPart::Fixed(ap), VersionPart::Fixed(bp)) => ap <= bp,
            _ => true,
        },
        _ => true,
    }
}

/// Wildcard-widened component equality.
fn part_eq_widened(a: VersionPart, b: VersionPart) -> bool {
    match (a, b) {
        (VersionPart::Fixed(an), VersionPart::Fixed(bn)) => an == bn,
        _ => true,
    }
}

impl FlowVersion {
    /// Whether `ver` falls inside this range, widening wildcards on either
    /// side.
    pub fn contains(&self, ver: &FlowVer) -> bool {
        match self {
            FlowVersion::All => true,
            FlowVersion::Specific(s) => {
                s.major == ver.major
                    && part_eq_widened(s.minor, ver.minor)
                    && part_eq_widened(s.patch, ver.patch)
            }
            FlowVersion::Ranged { lower, upper } => {
                bound_lte(lower, ver) && upper.as_ref().is_none_or(|u| bound_lte(ver, u))
            }
        }
    }

    /// Whether two ranges admit at least one common Flow version.
    pub fn overlaps(&self, other: &FlowVersion) -> bool {
        match (self, other) {
            (FlowVersion::All, _) | (_, FlowVersion::All) => true,
            (FlowVersion::Specific(a), b) => b.contains(a),
            (a, FlowVersion::Specific(b)) => a.contains(b),
            (
                FlowVersion::Ranged {
                    lower: a_lower,
                    upper: a_upper,
                },
                FlowVersion::Ranged {
                    lower: b_lower,
                    upper: b_upper,
                },
            ) => {
                b_upper.as_ref().is_none_or(|u| bound_lte(a_lower, u))
                    && a_upper.as_ref().is_none_or(|u| bound_lte(b_lower, u))
            }
        }
    }

    /// Semver-style rendering for user-facing output.
    pub fn to_semver_string(&self) -> String {
        match self {
            FlowVersion::All => ">=0.0.0".to_string(),
            FlowVersion::Specific(ver) => ver.to_string(),
            FlowVersion::Ranged {
                lower,
                upper: Some(upper),
            } => format!(">={lower} <={upper}"),
            FlowVersion::Ranged { lower, upper: None } => format!(">={lower}"),
        }
    }
}

/// Parse a single `v<major>.<minor>.<patch>[-<prerel>]` Flow version token.
///
/// Minor and patch may be wildcards; the major must be concrete.
pub fn parse_flow_ver_string(
    ver_str: &str,
    context: &str,
    mut errors: Option<&mut ValidationErrors>,
) -> Result<Option<FlowVer>, LibDefError> {
    let Some(caps) = FLOW_VER_RE.captures(ver_str) else {
        record_or_fail(
            errors,
            LibDefError::invalid_range_dir_name(
                context,
                format!(
                    "Malformed Flow version: '{ver_str}'. Expected a version formatted \
                     as v<MAJOR>.<MINOR>.<PATCH>."
                ),
            ),
        )?;
        return Ok(None);
    };

    let Some(major) = validate_version_num_part(&caps[1], "major", context, errors.as_deref_mut())?
    else {
        return Ok(None);
    };
    let Some(minor) = validate_version_part(&caps[2], "minor", context, errors.as_deref_mut())?
    else {
        return Ok(None);
    };
    let Some(patch) = validate_version_part(&caps[3], "patch", context, errors.as_deref_mut())?
    else {
        return Ok(None);
    };

    Ok(Some(FlowVer {
        major,
        minor,
        patch,
        prerel: caps.get(4).map(|m| m.as_str().to_string()),
    }))
}

/// The error for a range directory whose name lacks the `flow_` tag. Shared
/// between the parser and the extractor's entry classifier.
pub(crate) fn bad_prefix_error(dir_name: &str) -> LibDefError {
    LibDefError::invalid_range_dir_name(
        dir_name,
        format!("Flow versions must start with `{FLOW_DIR_PREFIX}`"),
    )
}

/// Parse a Flow version directory name into the range it declares.
///
/// Errors are keyed by the directory name itself.
pub fn parse_flow_dir_string(
    dir_name: &str,
    mut errors: Option<&mut ValidationErrors>,
) -> Result<Option<FlowVersion>, LibDefError> {
    let Some(rest) = dir_name.strip_prefix(FLOW_DIR_PREFIX) else {
        record_or_fail(errors, bad_prefix_error(dir_name))?;
        return Ok(None);
    };

    if rest == "all" {
        return Ok(Some(FlowVersion::All));
    }

    if let Some(idx) = rest.find("-v") {
        let Some(lower) =
            parse_flow_ver_string(&rest[..idx], dir_name, errors.as_deref_mut())?
        else {
            return Ok(None);
        };
        let Some(upper) =
            parse_flow_ver_string(&rest[idx + 1..], dir_name, errors.as_deref_mut())?
        else {
            return Ok(None);
        };
        if !bound_lte(&lower, &upper) {
            record_or_fail(
                errors,
                LibDefError::invalid_range_dir_name(
                    dir_name,
                    format!("Lower bound `{lower}` is above upper bound `{upper}`."),
                ),
            )?;
            return Ok(None);
        }
        return Ok(Some(FlowVersion::Ranged {
            lower,
            upper: Some(upper),
        }));
    }

    if let Some(lower_str) = rest.strip_suffix('-') {
        let Some(lower) = parse_flow_ver_string(lower_str, dir_name, errors)? else {
            return Ok(None);
        };
        return Ok(Some(FlowVersion::Ranged { lower, upper: None }));
    }

    let Some(ver) = parse_flow_ver_string(rest, dir_name, errors)? else {
        return Ok(None);
    };
    Ok(Some(FlowVersion::Specific(ver)))
}

/// Verify that no two Flow version ranges of one package version intersect.
///
/// At most one `OverlappingRanges` error is produced per package-version
/// context, even when several pairs intersect.
pub fn validate_ranges_disjoint(
    pkg_context: &str,
    flow_versions: &[FlowVersion],
    errors: Option<&mut ValidationErrors>,
) -> Result<(), LibDefError> {
    for (i, a) in flow_versions.iter().enumerate() {
        for b in &flow_versions[i + 1..] {
            if a.overlaps(b) {
                return record_or_fail(errors, LibDefError::overlapping_ranges(pkg_context));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libdef::errors::ErrorKind;

    fn ver(major: u64, minor: VersionPart, patch: VersionPart) -> FlowVer {
        FlowVer {
            major,
            minor,
            patch,
            prerel: None,
        }
    }

    fn fixed(n: u64) -> VersionPart {
        VersionPart::Fixed(n)
    }

    const X: VersionPart = VersionPart::Wildcard;

    #[test]
    fn test_parse_bounded_range() {
        assert_eq!(
            parse_flow_dir_string("flow_v0.13.x-v0.37.x", None).unwrap(),
            Some(FlowVersion::Ranged {
                lower: ver(0, fixed(13), X),
                upper: Some(ver(0, fixed(37), X)),
            })
        );
    }

    #[test]
    fn test_parse_unbounded_range() {
        assert_eq!(
            parse_flow_dir_string("flow_v0.38.x-", None).unwrap(),
            Some(FlowVersion::Ranged {
                lower: ver(0, fixed(38), X),
                upper: None,
            })
        );
    }

    #[test]
    fn test_parse_specific_version() {
        assert_eq!(
            parse_flow_dir_string("flow_v0.38.0", None).unwrap(),
            Some(FlowVersion::Specific(ver(0, fixed(38), fixed(0))))
        );
    }

    #[test]
    fn test_parse_all() {
        assert_eq!(
            parse_flow_dir_string("flow_all", None).unwrap(),
            Some(FlowVersion::All)
        );
    }

    #[test]
    fn test_parse_prerelease_bound() {
        assert_eq!(
            parse_flow_dir_string("flow_v0.13.0-rc1-", None).unwrap(),
            Some(FlowVersion::Ranged {
                lower: FlowVer {
                    major: 0,
                    minor: fixed(13),
                    patch: fixed(0),
                    prerel: Some("rc1".to_string()),
                },
                upper: None,
            })
        );
    }

    #[test]
    fn test_parse_bad_prefix() {
        let err = parse_flow_dir_string("asdfdir", None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRangeDirName);
        assert_eq!(err.to_string(), "asdfdir: Flow versions must start with `flow_`");

        let mut errs = ValidationErrors::new();
        assert_eq!(
            parse_flow_dir_string("asdfdir", Some(&mut errs)).unwrap(),
            None
        );
        assert_eq!(
            errs.get("asdfdir"),
            Some(&["Flow versions must start with `flow_`".to_string()][..])
        );
    }

    #[test]
    fn test_parse_malformed_bound() {
        let err = parse_flow_dir_string("flow_v0.13-", None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRangeDirName);
        assert_eq!(err.context, "flow_v0.13-");

        let mut errs = ValidationErrors::new();
        assert_eq!(
            parse_flow_dir_string("flow_v0.13-", Some(&mut errs)).unwrap(),
            None
        );
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn test_parse_inverted_range() {
        let err = parse_flow_dir_string("flow_v0.38.0-v0.13.0", None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRangeDirName);

        // Wildcards widen: v0.13.x-v0.13.x could coincide, so it is accepted
        assert!(parse_flow_dir_string("flow_v0.13.x-v0.13.x", None)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_contains_range_boundaries() {
        let range = parse_flow_dir_string("flow_v0.13.x-v0.37.x", None)
            .unwrap()
            .unwrap();

        assert!(range.contains(&ver(0, fixed(13), fixed(0))));
        assert!(range.contains(&ver(0, fixed(25), fixed(3))));
        assert!(range.contains(&ver(0, fixed(37), fixed(5))));
        assert!(!range.contains(&ver(0, fixed(12), fixed(9))));
        assert!(!range.contains(&ver(0, fixed(38), fixed(0))));
        assert!(!range.contains(&ver(1, fixed(0), fixed(0))));
    }

    #[test]
    fn test_contains_unbounded_range() {
        let range = parse_flow_dir_string("flow_v0.38.x-", None).unwrap().unwrap();

        assert!(range.contains(&ver(0, fixed(38), fixed(0))));
        assert!(range.contains(&ver(12, fixed(0), fixed(0))));
        assert!(!range.contains(&ver(0, fixed(37), fixed(9))));
    }

    #[test]
    fn test_contains_specific_with_wildcards() {
        let specific = FlowVersion::Specific(ver(0, fixed(38), X));

        assert!(specific.contains(&ver(0, fixed(38), fixed(4))));
        assert!(!specific.contains(&ver(0, fixed(39), fixed(0))));
    }

    #[test]
    fn test_overlap_disjoint_siblings() {
        let a = parse_flow_dir_string("flow_v0.13.x-v0.37.x", None).unwrap().unwrap();
        let b = parse_flow_dir_string("flow_v0.38.x-", None).unwrap().unwrap();

        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_overlap_at_wildcard_boundary() {
        // Both ranges admit some v0.37.* version
        let a = parse_flow_dir_string("flow_v0.13.x-v0.37.x", None).unwrap().unwrap();
        let b = parse_flow_dir_string("flow_v0.37.x-", None).unwrap().unwrap();

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn test_overlap_all_and_specific() {
        let all = FlowVersion::All;
        let specific = FlowVersion::Specific(ver(0, fixed(1), fixed(2)));
        let range = parse_flow_dir_string("flow_v0.38.x-", None).unwrap().unwrap();

        assert!(all.overlaps(&specific));
        assert!(all.overlaps(&range));
        assert!(!range.overlaps(&specific));
        assert!(range.overlaps(&FlowVersion::Specific(ver(0, fixed(40), fixed(0)))));
    }

    #[test]
    fn test_validate_disjoint_passes() {
        let ranges = vec![
            parse_flow_dir_string("flow_v0.13.x-v0.37.x", None).unwrap().unwrap(),
            parse_flow_dir_string("flow_v0.38.x-", None).unwrap().unwrap(),
        ];
        let mut errs = ValidationErrors::new();
        validate_ranges_disjoint("npm/underscore_v1.x.x", &ranges, Some(&mut errs)).unwrap();
        assert!(errs.is_empty());
    }

    #[test]
    fn test_validate_disjoint_fails_once_per_context() {
        let ranges = vec![
            parse_flow_dir_string("flow_v0.13.x-", None).unwrap().unwrap(),
            parse_flow_dir_string("flow_v0.20.x-", None).unwrap().unwrap(),
            parse_flow_dir_string("flow_v0.30.x-", None).unwrap().unwrap(),
        ];

        let err = validate_ranges_disjoint("npm/underscore_v1.x.x", &ranges, None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OverlappingRanges);
        assert_eq!(
            err.to_string(),
            "npm/underscore_v1.x.x: Flow versions not disjoint!"
        );

        // Several overlapping pairs still record exactly one error
        let mut errs = ValidationErrors::new();
        validate_ranges_disjoint("npm/underscore_v1.x.x", &ranges, Some(&mut errs)).unwrap();
        assert_eq!(
            errs.get("npm/underscore_v1.x.x"),
            Some(&["Flow versions not disjoint!".to_string()][..])
        );
    }

    #[test]
    fn test_to_semver_string() {
        assert_eq!(FlowVersion::All.to_semver_string(), ">=0.0.0");
        assert_eq!(
            FlowVersion::Specific(ver(0, fixed(38), fixed(0))).to_semver_string(),
            "v0.38.0"
        );
        assert_eq!(
            parse_flow_dir_string("flow_v0.13.x-v0.37.x", None)
                .unwrap()
                .unwrap()
                .to_semver_string(),
            ">=v0.13.x <=v0.37.x"
        );
        assert_eq!(
            parse_flow_dir_string("flow_v0.38.x-", None)
                .unwrap()
                .unwrap()
                .to_semver_string(),
            ">=v0.38.x"
        );
    }
}
