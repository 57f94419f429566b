//! Flow project utilities.
//!
//! Locating the enclosing Flow project and reading its package.json — the
//! inputs the install workflow needs before it can match libdefs.

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::libdef::{FlowVer, VersionPart, get_range_lower_bound};
use crate::runtime::Runtime;

/// The slice of package.json the install workflow cares about.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageJson {
    pub name: Option<String>,
    pub dependencies: IndexMap<String, String>,
    pub dev_dependencies: IndexMap<String, String>,
}

/// Find the nearest ancestor of `start_dir` that contains a `.flowconfig`.
#[tracing::instrument(skip(runtime, start_dir))]
pub fn find_flow_root<R: Runtime>(runtime: &R, start_dir: &Path) -> Option<PathBuf> {
    let mut dir = start_dir;
    loop {
        if runtime.exists(&dir.join(".flowconfig")) {
            return Some(dir.to_path_buf());
        }
        dir = dir.parent()?;
    }
}

/// Read and parse `<dir>/package.json`.
pub fn get_package_json_data<R: Runtime>(runtime: &R, dir: &Path) -> Result<PackageJson> {
    let path = dir.join("package.json");
    let contents = runtime
        .read_to_string(&path)
        .with_context(|| format!("Failed to read {path:?}"))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {path:?}"))
}

/// Dependencies and devDependencies, in declaration order. A package listed
/// in both keeps its `dependencies` range.
pub fn get_package_json_dependencies(pkg_json: &PackageJson) -> IndexMap<String, String> {
    let mut deps = pkg_json.dependencies.clone();
    for (name, range) in &pkg_json.dev_dependencies {
        deps.entry(name.clone()).or_insert_with(|| range.clone());
    }
    deps
}

/// Determine the project's Flow version from its `flow-bin` dependency.
pub fn find_flow_specific_ver<R: Runtime>(runtime: &R, flow_root: &Path) -> Result<FlowVer> {
    let pkg_json = get_package_json_data(runtime, flow_root)?;
    let Some(range) = pkg_json
        .dev_dependencies
        .get("flow-bin")
        .or_else(|| pkg_json.dependencies.get("flow-bin"))
    else {
        bail!(
            "Unable to determine the Flow version: {:?} has no `flow-bin` dependency. \
             Pass --flow-version explicitly.",
            flow_root.join("package.json")
        );
    };

    let lower = get_range_lower_bound(range)
        .with_context(|| format!("Invalid `flow-bin` version range: '{range}'"))?;
    Ok(FlowVer {
        major: lower.major,
        minor: VersionPart::Fixed(lower.minor),
        patch: VersionPart::Fixed(lower.patch),
        prerel: (!lower.pre.is_empty()).then(|| lower.pre.to_string()),
    })
}
