//! Install workflow - finds and installs libdefs for a Flow project.
//!
//! The workflow gathers the dependencies to serve (explicit `name@range`
//! terms or the project's package.json), scans the libdef repository once,
//! matches each dependency against the extracted libdefs, and copies the
//! winners into `<flow_root>/flow-typed/npm`. Dependencies without a libdef
//! get an `any`-typed stub unless their package ships `@flow` sources.

use anyhow::{Context, Result, bail};
use log::warn;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::libdef::{
    FlowVer, LibDef, LibDefRepository, ValidationErrors, find_npm_libdef, libdef_needs_update,
    parse_flow_ver_string,
};
use crate::project::{
    find_flow_root, find_flow_specific_ver, get_package_json_data, get_package_json_dependencies,
};
use crate::runtime::Runtime;

mod stub;

pub use stub::{create_stub, pkg_has_flow_files};

/// Libdefs that ship with Flow itself and never need installing.
const FLOW_BUILT_IN_NPM_LIBS: &[&str] = &["react", "react-dom"];

static LIBDEF_TERM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(@[^@/]+/)?([^@]+)@(.+)$").expect("static regex must compile"));

static SHORT_VER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v[0-9]+\.[0-9]+$").expect("static regex must compile"));

#[derive(Debug, Default)]
pub struct InstallOptions {
    /// Explicit `name@range` terms; empty means "all package.json deps".
    pub explicit_libdefs: Vec<String>,
    /// Flow version override; otherwise taken from the project's `flow-bin`.
    pub flow_version: Option<String>,
    pub overwrite: bool,
    pub verbose: bool,
    pub defs_dir: Option<PathBuf>,
}

/// Install libdefs for the Flow project enclosing the current directory.
#[tracing::instrument(skip(runtime, opts))]
pub fn install<R: Runtime>(runtime: &R, opts: InstallOptions) -> Result<()> {
    let cwd = runtime.current_dir()?;
    let Some(flow_root) = find_flow_root(runtime, &cwd) else {
        bail!(
            "Unable to find a flow project in the current dir or any of its parent dirs!\n\
             Please run this command from within a Flow project."
        );
    };
    let flow_version = determine_flow_version(runtime, &flow_root, opts.flow_version.as_deref())?;
    let defs_dir = resolve_defs_dir(runtime, opts.defs_dir.clone())?;
    install_npm_libdefs(runtime, &flow_root, &defs_dir, &flow_version, &opts)
}

/// Lint the whole libdef repository and report every problem found.
#[tracing::instrument(skip(runtime, defs_dir))]
pub fn validate<R: Runtime>(runtime: &R, defs_dir: Option<PathBuf>) -> Result<()> {
    let defs_dir = resolve_defs_dir(runtime, defs_dir)?;
    let repo = LibDefRepository::new(runtime, defs_dir);

    let mut errors = ValidationErrors::new();
    let libdefs = repo.get_libdefs(Some(&mut errors))?;
    println!("• Scanned {} libdef(s) in {:?}", libdefs.len(), repo.defs_root());

    if errors.is_empty() {
        println!("• No problems found");
        return Ok(());
    }
    eprint!("{errors}");
    bail!(
        "Found problems under {} path(s) in the libdef repository",
        errors.len()
    );
}

/// The libdef repository to scan: `--defs-dir` when given, otherwise
/// `~/.flowdef/definitions`.
pub fn resolve_defs_dir<R: Runtime>(runtime: &R, defs_dir: Option<PathBuf>) -> Result<PathBuf> {
    let dir = match defs_dir {
        Some(dir) => dir,
        None => runtime
            .home_dir()
            .context("Unable to determine the home directory; pass --defs-dir explicitly")?
            .join(".flowdef")
            .join("definitions"),
    };
    if !runtime.is_dir(&dir) {
        bail!(
            "No libdef repository found at {dir:?}. Pass --defs-dir pointing at a checkout \
             of the flow-typed definitions."
        );
    }
    Ok(dir)
}

/// The Flow version libdefs must be compatible with: the explicit argument
/// when given, otherwise the project's `flow-bin` version.
pub fn determine_flow_version<R: Runtime>(
    runtime: &R,
    flow_root: &Path,
    flow_version_arg: Option<&str>,
) -> Result<FlowVer> {
    match flow_version_arg {
        Some(arg) => {
            // Be permissive if the prefix 'v' is left off
            let mut ver_str = if arg.starts_with('v') {
                arg.to_string()
            } else {
                format!("v{arg}")
            };
            if SHORT_VER_RE.is_match(&ver_str) {
                ver_str.push_str(".0");
            }
            let ver = parse_flow_ver_string(&ver_str, &ver_str, None)?
                .context("Failed to parse the Flow version")?;
            Ok(ver)
        }
        None => find_flow_specific_ver(runtime, flow_root),
    }
}

/// Split an explicit `name@range` term (scoped names allowed).
fn parse_libdef_term(term: &str) -> Result<(String, String)> {
    let Some(caps) = LIBDEF_TERM_RE.captures(term) else {
        bail!("Please specify npm package names in the format of `foo@1.2.3` (got `{term}`)");
    };
    let name = match caps.get(1) {
        Some(scope) => format!("{}{}", scope.as_str(), &caps[2]),
        None => caps[2].to_string(),
    };
    Ok((name, caps[3].to_string()))
}

fn install_npm_libdefs<R: Runtime>(
    runtime: &R,
    flow_root: &Path,
    defs_dir: &Path,
    flow_version: &FlowVer,
    opts: &InstallOptions,
) -> Result<()> {
    // Gather the dependencies to search libdefs for
    let mut deps: Vec<(String, String)> = Vec::new();
    if !opts.explicit_libdefs.is_empty() {
        for term in &opts.explicit_libdefs {
            deps.push(parse_libdef_term(term)?);
        }
        println!("• Searching for {} libdef(s)...", deps.len());
    } else {
        let pkg_json = get_package_json_data(runtime, flow_root)?;
        deps = get_package_json_dependencies(&pkg_json).into_iter().collect();
        if deps.is_empty() {
            bail!("No dependencies were found in this project's package.json!");
        }
        if opts.verbose {
            for (name, range) in &deps {
                println!("• Found package.json dependency: {name}@{range}");
            }
        } else {
            println!(
                "• Found {} dependencies in package.json to install libdefs for. Searching...",
                deps.len()
            );
        }
    }

    // One scan serves every dependency. A broken sibling package must not
    // block unrelated installs, so scan in accumulate mode and defer the
    // details to `flowdef validate`.
    let repo = LibDefRepository::new(runtime, defs_dir.to_path_buf());
    let mut repo_errors = ValidationErrors::new();
    let libdefs = repo.get_libdefs(Some(&mut repo_errors))?;
    if !repo_errors.is_empty() {
        warn!(
            "Found problems under {} path(s) in the libdef repository at {:?}; \
             run `flowdef validate` for details",
            repo_errors.len(),
            repo.defs_root()
        );
    }

    let mut to_install: Vec<&LibDef> = Vec::new();
    let mut needs_update: Vec<(&LibDef, &str, &str)> = Vec::new();
    let mut missing: Vec<(&str, &str)> = Vec::new();
    for (name, range) in &deps {
        if FLOW_BUILT_IN_NPM_LIBS.contains(&name.as_str()) {
            continue;
        }
        match find_npm_libdef(&libdefs, name, range, flow_version) {
            Some(def) => {
                if libdef_needs_update(def, range) {
                    needs_update.push((def, name.as_str(), range.as_str()));
                }
                to_install.push(def);
            }
            None => missing.push((name.as_str(), range.as_str())),
        }
    }

    if !to_install.is_empty() {
        println!("• Installing {} libdef(s)...", to_install.len());
        let npm_dir = flow_root.join("flow-typed").join("npm");
        runtime.create_dir_all(&npm_dir)?;
        let mut failures = 0;
        for def in &to_install {
            if !install_npm_libdef(runtime, def, &npm_dir, opts.overwrite)? {
                failures += 1;
            }
        }
        if failures > 0 {
            bail!("{failures} libdef(s) could not be installed");
        }
    }

    if !needs_update.is_empty() && (opts.verbose || missing.is_empty()) {
        println!(
            "• The following installed libdefs are compatible with your dependencies, \
             but may not include all minor and patch changes for your specific \
             dependency version:\n"
        );
        for (def, name, range) in &needs_update {
            println!(
                "  • libdef: {}_{} (satisfies {name}@{range})",
                def.name, def.version
            );
        }
        println!(
            "\n  Consider submitting versioned updates for these packages to\n  \
             https://github.com/flowtype/flow-typed/\n"
        );
    }

    if missing.is_empty() {
        return Ok(());
    }

    if !opts.explicit_libdefs.is_empty() && missing.len() == opts.explicit_libdefs.len() {
        // Explicitly requested libdefs that don't exist are an outright
        // failure; don't paper over them with stubs.
        bail!("No libdefs found in flow-typed for the explicitly requested libdefs.");
    }

    // Packages shipping their own @flow sources are typed already; stub the
    // rest as `any`.
    let mut untyped: Vec<&str> = Vec::new();
    for (name, _) in &missing {
        if !pkg_has_flow_files(runtime, flow_root, name)? {
            untyped.push(*name);
        }
    }
    if !untyped.is_empty() {
        println!("• Generating stubs for untyped dependencies...");
        for name in &untyped {
            create_stub(runtime, flow_root, name, opts.overwrite)?;
        }
        println!(
            "\n!! No flow@{flow_version}-compatible libdefs found in flow-typed for the \
             above untyped dependencies !!"
        );
        println!(
            "\nI've generated `any`-typed stubs for these packages, but consider \
             submitting libdefs for them to https://github.com/flowtype/flow-typed/\n"
        );
    }

    Ok(())
}

fn install_npm_libdef<R: Runtime>(
    runtime: &R,
    def: &LibDef,
    npm_dir: &Path,
    overwrite: bool,
) -> Result<bool> {
    let scoped_dir = match &def.scope {
        Some(scope) => npm_dir.join(format!("@{scope}")),
        None => npm_dir.to_path_buf(),
    };
    runtime.create_dir_all(&scoped_dir)?;

    let file_name = format!("{}_{}.js", def.name, def.version);
    let file_path = scoped_dir.join(&file_name);

    if runtime.exists(&file_path) && !overwrite {
        eprintln!(
            "  • {file_name} already exists!\n    └> Use --overwrite to overwrite the \
             existing libdef."
        );
        return Ok(false);
    }

    runtime
        .copy(&def.path, &file_path)
        .with_context(|| format!("Failed to install {} at {file_path:?}", def.name))?;
    println!("  • {file_name}\n    └> {}", file_path.display());
    Ok(true)
}
