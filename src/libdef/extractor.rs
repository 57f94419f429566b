//! Extraction of libdef records from one package-version directory.
//!
//! A package-version directory (`underscore_v1.x.x/`) holds either a single
//! flat libdef file named after the directory, or one sub-directory per Flow
//! compatibility range, each holding its own copy of the libdef file. Test
//! files may sit at either level; parent-level test files apply to every
//! ranged libdef below them.

use log::warn;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::runtime::Runtime;

use super::errors::{LibDefError, ValidationErrors, record_or_fail};
use super::flow_version::{
    FLOW_DIR_PREFIX, FlowVersion, bad_prefix_error, parse_flow_dir_string,
    validate_ranges_disjoint,
};
use super::version::parse_pkg_name_ver;

static TEST_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^test_.*\.js$").expect("static regex must compile"));

/// A single installable library definition discovered in the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibDef {
    /// npm scope without the leading `@`, when the package is scoped.
    pub scope: Option<String>,
    pub name: String,
    /// Verbatim version token from the directory name, e.g. `v1.x.x`.
    pub version: String,
    pub flow_version: FlowVersion,
    /// Location of the definition file itself.
    pub path: PathBuf,
    /// Parent-level test files first, then the range directory's own.
    pub test_file_paths: Vec<PathBuf>,
}

/// Classification of one entry inside a package-version directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PkgDirEntry {
    LibDefFile,
    TestFile,
    FlowVersionDir,
    UnexpectedFile,
    UnexpectedDir,
}

fn classify_entry<R: Runtime>(
    runtime: &R,
    entry: &Path,
    entry_name: &str,
    libdef_file_name: &str,
) -> PkgDirEntry {
    if runtime.is_dir(entry) {
        if entry_name.starts_with(FLOW_DIR_PREFIX) {
            PkgDirEntry::FlowVersionDir
        } else {
            PkgDirEntry::UnexpectedDir
        }
    } else if entry_name == libdef_file_name {
        PkgDirEntry::LibDefFile
    } else if TEST_FILE_RE.is_match(entry_name) {
        PkgDirEntry::TestFile
    } else {
        PkgDirEntry::UnexpectedFile
    }
}

fn entry_file_name(entry: &Path) -> Option<String> {
    let name = entry.file_name().and_then(|n| n.to_str());
    if name.is_none() {
        warn!("Skipping directory entry with a non-UTF-8 name: {entry:?}");
    }
    name.map(str::to_owned)
}

/// Extract every libdef defined by one package-version directory.
///
/// With an error accumulator, invalid entries are recorded and skipped and
/// every valid libdef is still returned; without one, the first problem
/// aborts the extraction.
#[tracing::instrument(skip(runtime, pkg_dir_path, errors))]
pub fn extract_libdefs_from_pkg_dir<R: Runtime>(
    runtime: &R,
    pkg_dir_path: &Path,
    scope: Option<&str>,
    pkg_dir_name: &str,
    mut errors: Option<&mut ValidationErrors>,
) -> anyhow::Result<Vec<LibDef>> {
    let Some(pkg) = parse_pkg_name_ver(pkg_dir_name, pkg_dir_name, errors.as_deref_mut())? else {
        return Ok(Vec::new());
    };
    let version_str = pkg.version.to_string();
    let libdef_file_name = format!("{pkg_dir_name}.js");
    let pkg_context = match scope {
        Some(scope) => format!("npm/@{scope}/{pkg_dir_name}"),
        None => format!("npm/{pkg_dir_name}"),
    };

    let mut flat_libdef: Option<PathBuf> = None;
    let mut parent_tests: Vec<PathBuf> = Vec::new();
    let mut flow_dirs: Vec<(String, PathBuf, FlowVersion)> = Vec::new();

    for entry in runtime.read_dir(pkg_dir_path)? {
        let Some(entry_name) = entry_file_name(&entry) else {
            continue;
        };
        match classify_entry(runtime, &entry, &entry_name, &libdef_file_name) {
            PkgDirEntry::LibDefFile => flat_libdef = Some(entry),
            PkgDirEntry::TestFile => parent_tests.push(entry),
            PkgDirEntry::FlowVersionDir => {
                if let Some(flow_version) =
                    parse_flow_dir_string(&entry_name, errors.as_deref_mut())?
                {
                    flow_dirs.push((entry_name, entry, flow_version));
                }
            }
            PkgDirEntry::UnexpectedDir => {
                record_or_fail(errors.as_deref_mut(), bad_prefix_error(&entry_name))?;
            }
            PkgDirEntry::UnexpectedFile => {
                record_or_fail(
                    errors.as_deref_mut(),
                    LibDefError::unexpected_file(
                        &format!("{pkg_dir_name}/{entry_name}"),
                        format!(
                            "Unexpected file name. This directory can only contain test \
                             files or a libdef file named `{libdef_file_name}`."
                        ),
                    ),
                )?;
            }
        }
    }

    let mut libdefs = Vec::new();

    for (flow_dir_name, flow_dir_path, flow_version) in &flow_dirs {
        let mut ranged_libdef: Option<PathBuf> = None;
        let mut ranged_tests: Vec<PathBuf> = Vec::new();

        for entry in runtime.read_dir(flow_dir_path)? {
            let Some(entry_name) = entry_file_name(&entry) else {
                continue;
            };
            match classify_entry(runtime, &entry, &entry_name, &libdef_file_name) {
                PkgDirEntry::LibDefFile => ranged_libdef = Some(entry),
                PkgDirEntry::TestFile => ranged_tests.push(entry),
                PkgDirEntry::FlowVersionDir | PkgDirEntry::UnexpectedDir => {
                    record_or_fail(
                        errors.as_deref_mut(),
                        LibDefError::unexpected_directory(
                            &format!("{pkg_dir_name}/{flow_dir_name}/{entry_name}"),
                            format!(
                                "Unexpected sub-directory. This directory can only contain \
                                 test files or a libdef file named `{libdef_file_name}`."
                            ),
                        ),
                    )?;
                }
                PkgDirEntry::UnexpectedFile => {
                    record_or_fail(
                        errors.as_deref_mut(),
                        LibDefError::unexpected_file(
                            &format!("{pkg_dir_name}/{flow_dir_name}/{entry_name}"),
                            format!(
                                "Unexpected file. This directory can only contain test \
                                 files or a libdef file named `{libdef_file_name}`."
                            ),
                        ),
                    )?;
                }
            }
        }

        if let Some(def_path) = ranged_libdef {
            let mut test_file_paths = parent_tests.clone();
            test_file_paths.extend(ranged_tests);
            libdefs.push(LibDef {
                scope: scope.map(str::to_owned),
                name: pkg.name.clone(),
                version: version_str.clone(),
                flow_version: flow_version.clone(),
                path: def_path,
                test_file_paths,
            });
        }
    }

    match flat_libdef {
        // A flat libdef next to Flow version directories is ambiguous:
        // neither form wins.
        Some(_) if !flow_dirs.is_empty() => {
            record_or_fail(
                errors.as_deref_mut(),
                LibDefError::ambiguous_libdef(&pkg_context),
            )?;
        }
        Some(def_path) => {
            libdefs.push(LibDef {
                scope: scope.map(str::to_owned),
                name: pkg.name.clone(),
                version: version_str.clone(),
                flow_version: FlowVersion::All,
                path: def_path,
                test_file_paths: parent_tests.clone(),
            });
        }
        None if libdefs.is_empty() => {
            record_or_fail(
                errors.as_deref_mut(),
                LibDefError::no_libdefs_found(&pkg_context),
            )?;
        }
        None => {}
    }

    let ranges: Vec<FlowVersion> = flow_dirs.into_iter().map(|(_, _, fv)| fv).collect();
    validate_ranges_disjoint(&pkg_context, &ranges, errors.as_deref_mut())?;

    Ok(libdefs)
}
