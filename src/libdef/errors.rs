//! Validation errors for the libdef repository.
//!
//! Every validating operation in this module tree runs in one of two modes,
//! selected by whether the caller hands in a [`ValidationErrors`]
//! accumulator:
//!
//! - without one, the first failure is returned as a [`LibDefError`] and the
//!   enclosing traversal step aborts;
//! - with one, the failure is appended under its context key, the offending
//!   item is skipped, and traversal continues so the whole repository can be
//!   linted in a single pass.
//!
//! Both modes share the same validation code; the switch lives in
//! [`record_or_fail`].

use indexmap::IndexMap;
use std::fmt;
use thiserror::Error;

/// What went wrong, independent of the offending path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidVersionNumber,
    MalformedPackageName,
    InvalidRangeDirName,
    UnexpectedFile,
    UnexpectedDirectory,
    OverlappingRanges,
    NoLibDefsFound,
    AmbiguousLibDef,
}

/// A single validation failure, keyed by the offending path or name.
///
/// `context` identifies the unit being validated (a directory name, a
/// relative entry path, or a qualified `npm/<pkgdir>` name); `message` is the
/// human-readable description without that key. Displayed as
/// `"<context>: <message>"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{context}: {message}")]
pub struct LibDefError {
    pub kind: ErrorKind,
    pub context: String,
    pub message: String,
}

impl LibDefError {
    fn new(kind: ErrorKind, context: impl Into<String>, message: impl Into<String>) -> Self {
        LibDefError {
            kind,
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn invalid_version_number(context: &str, field: &str, token: &str) -> Self {
        Self::new(
            ErrorKind::InvalidVersionNumber,
            context,
            format!("Invalid {field} number: '{token}'. Expected a number."),
        )
    }

    pub fn malformed_package_name(dir_name: &str) -> Self {
        Self::new(
            ErrorKind::MalformedPackageName,
            dir_name,
            "Malformed npm package name! Expected the name to be formatted as \
             <PKGNAME>_v<MAJOR>.<MINOR>.<PATCH>",
        )
    }

    pub fn invalid_range_dir_name(context: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRangeDirName, context, message)
    }

    pub fn unexpected_file(context: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnexpectedFile, context, message)
    }

    pub fn unexpected_directory(context: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnexpectedDirectory, context, message)
    }

    pub fn overlapping_ranges(pkg_context: &str) -> Self {
        Self::new(
            ErrorKind::OverlappingRanges,
            pkg_context,
            "Flow versions not disjoint!",
        )
    }

    pub fn no_libdefs_found(pkg_context: &str) -> Self {
        Self::new(
            ErrorKind::NoLibDefsFound,
            pkg_context,
            "No libdef files found!",
        )
    }

    pub fn ambiguous_libdef(pkg_context: &str) -> Self {
        Self::new(
            ErrorKind::AmbiguousLibDef,
            pkg_context,
            "Package directory contains both a root libdef file and Flow-versioned \
             sub-directories. Move the root libdef into a Flow version directory.",
        )
    }
}

/// Accumulates validation failures keyed by their context, in discovery
/// order. Messages under one key are appended, never overwritten.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: IndexMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, error: &LibDefError) {
        self.errors
            .entry(error.context.clone())
            .or_default()
            .push(error.message.clone());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of distinct context keys with at least one error.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, context: &str) -> Option<&[String]> {
        self.errors.get(context).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (context, messages) in self.iter() {
            writeln!(f, "{context}:")?;
            for message in messages {
                writeln!(f, "  * {message}")?;
            }
        }
        Ok(())
    }
}

/// The dual-mode switch: record into the accumulator when one is present,
/// otherwise surface the error to the caller.
pub(crate) fn record_or_fail(
    errors: Option<&mut ValidationErrors>,
    error: LibDefError,
) -> Result<(), LibDefError> {
    match errors {
        Some(errs) => {
            errs.add(&error);
            Ok(())
        }
        None => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_context() {
        let err = LibDefError::malformed_package_name("underscore_v1");
        assert_eq!(
            err.to_string(),
            "underscore_v1: Malformed npm package name! Expected the name to be \
             formatted as <PKGNAME>_v<MAJOR>.<MINOR>.<PATCH>"
        );
        assert_eq!(err.kind, ErrorKind::MalformedPackageName);
        assert_eq!(err.context, "underscore_v1");
    }

    #[test]
    fn test_accumulator_appends_under_one_key() {
        let mut errs = ValidationErrors::new();
        errs.add(&LibDefError::unexpected_file("pkg/asdf", "first"));
        errs.add(&LibDefError::unexpected_file("pkg/asdf", "second"));

        assert_eq!(errs.len(), 1);
        assert_eq!(
            errs.get("pkg/asdf"),
            Some(&["first".to_string(), "second".to_string()][..])
        );
    }

    #[test]
    fn test_accumulator_preserves_discovery_order() {
        let mut errs = ValidationErrors::new();
        errs.add(&LibDefError::no_libdefs_found("npm/zzz_v1.0.0"));
        errs.add(&LibDefError::no_libdefs_found("npm/aaa_v1.0.0"));

        let keys: Vec<&str> = errs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["npm/zzz_v1.0.0", "npm/aaa_v1.0.0"]);
    }

    #[test]
    fn test_record_or_fail_modes() {
        let err = LibDefError::overlapping_ranges("npm/underscore_v1.x.x");

        // Fail-fast mode surfaces the error
        assert_eq!(record_or_fail(None, err.clone()), Err(err.clone()));

        // Accumulate mode records and continues
        let mut errs = ValidationErrors::new();
        assert_eq!(record_or_fail(Some(&mut errs), err), Ok(()));
        assert_eq!(
            errs.get("npm/underscore_v1.x.x"),
            Some(&["Flow versions not disjoint!".to_string()][..])
        );
    }
}
