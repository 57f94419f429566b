//! Repository walker for the libdef definitions tree.
//!
//! The definitions tree has one scope-root layer, `npm/`, holding
//! package-version directories directly plus optional `@scope/` directories
//! one level down:
//!
//! ```text
//! <defs_root>/npm/underscore_v1.x.x/...
//! <defs_root>/npm/@babel/core_v7.x.x/...
//! ```
//!
//! Only directories may appear at these layers; stray files are reported
//! with their absolute path.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

use super::errors::{LibDefError, ValidationErrors, record_or_fail};
use super::extractor::{LibDef, extract_libdefs_from_pkg_dir};

/// Read-only view over a libdef definitions tree.
pub struct LibDefRepository<'a, R: Runtime> {
    runtime: &'a R,
    defs_root: PathBuf,
}

impl<'a, R: Runtime> LibDefRepository<'a, R> {
    pub fn new(runtime: &'a R, defs_root: PathBuf) -> Self {
        Self { runtime, defs_root }
    }

    pub fn defs_root(&self) -> &Path {
        &self.defs_root
    }

    /// The npm scope-root layer: `<defs_root>/npm`.
    pub fn npm_dir(&self) -> PathBuf {
        self.defs_root.join("npm")
    }

    /// Collect every libdef in the tree, across all scopes.
    ///
    /// Error handling follows the usual dual mode: with an accumulator,
    /// invalid packages are skipped and all valid ones are returned.
    #[tracing::instrument(skip(self, errors))]
    pub fn get_libdefs(&self, mut errors: Option<&mut ValidationErrors>) -> Result<Vec<LibDef>> {
        let npm_dir = self.npm_dir();
        let entries = self
            .runtime
            .read_dir(&npm_dir)
            .with_context(|| format!("Failed to list the libdef repository at {npm_dir:?}"))?;

        let mut libdefs = Vec::new();
        for entry in entries {
            let Some(entry_name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !self.runtime.is_dir(&entry) {
                self.unexpected_file(&entry, errors.as_deref_mut())?;
                continue;
            }

            if let Some(scope) = entry_name.strip_prefix('@') {
                for pkg_entry in self.runtime.read_dir(&entry)? {
                    let Some(pkg_dir_name) = pkg_entry.file_name().and_then(|n| n.to_str())
                    else {
                        continue;
                    };
                    if !self.runtime.is_dir(&pkg_entry) {
                        self.unexpected_file(&pkg_entry, errors.as_deref_mut())?;
                        continue;
                    }
                    libdefs.extend(extract_libdefs_from_pkg_dir(
                        self.runtime,
                        &pkg_entry,
                        Some(scope),
                        pkg_dir_name,
                        errors.as_deref_mut(),
                    )?);
                }
            } else {
                libdefs.extend(extract_libdefs_from_pkg_dir(
                    self.runtime,
                    &entry,
                    None,
                    entry_name,
                    errors.as_deref_mut(),
                )?);
            }
        }

        Ok(libdefs)
    }

    fn unexpected_file(
        &self,
        path: &Path,
        errors: Option<&mut ValidationErrors>,
    ) -> Result<(), LibDefError> {
        record_or_fail(
            errors,
            LibDefError::unexpected_file(
                &path.display().to_string(),
                "Expected only directories to be present in this directory.",
            ),
        )
    }
}
