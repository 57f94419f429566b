//! `any`-typed stub generation for dependencies that have no libdef.

use anyhow::Result;
use log::debug;
use std::path::Path;

use crate::libdef::split_scoped_name;
use crate::runtime::Runtime;

/// Whether the installed package ships its own `@flow`-annotated sources.
/// Such packages are typed already; generating a stub would shadow them.
pub fn pkg_has_flow_files<R: Runtime>(
    runtime: &R,
    flow_root: &Path,
    pkg_name: &str,
) -> Result<bool> {
    let pkg_dir = flow_root.join("node_modules").join(pkg_name);
    if !runtime.is_dir(&pkg_dir) {
        return Ok(false);
    }
    has_flow_annotated_js(runtime, &pkg_dir)
}

fn has_flow_annotated_js<R: Runtime>(runtime: &R, dir: &Path) -> Result<bool> {
    for entry in runtime.read_dir(dir)? {
        if runtime.is_dir(&entry) {
            // Nested node_modules belong to other packages
            if entry.file_name().is_some_and(|n| n == "node_modules") {
                continue;
            }
            if has_flow_annotated_js(runtime, &entry)? {
                return Ok(true);
            }
        } else if entry.extension().is_some_and(|ext| ext == "js") {
            let Ok(contents) = runtime.read_to_string(&entry) else {
                debug!("Skipping unreadable file while looking for @flow headers: {entry:?}");
                continue;
            };
            // The pragma must sit in the leading comment block
            if contents.lines().take(10).any(|line| line.contains("@flow")) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Write an `any`-typed stub libdef for `pkg_name` into
/// `<flow_root>/flow-typed/npm[/@scope]/<name>_vx.x.x.js`.
///
/// Returns `false` when a stub already exists and `overwrite` is off.
pub fn create_stub<R: Runtime>(
    runtime: &R,
    flow_root: &Path,
    pkg_name: &str,
    overwrite: bool,
) -> Result<bool> {
    let (scope, name) = split_scoped_name(pkg_name);
    let mut stub_dir = flow_root.join("flow-typed").join("npm");
    if let Some(scope) = scope {
        stub_dir = stub_dir.join(format!("@{scope}"));
    }
    let stub_path = stub_dir.join(format!("{name}_vx.x.x.js"));

    if runtime.exists(&stub_path) && !overwrite {
        eprintln!(
            "  • {} already exists!\n    └> Use --overwrite to replace the existing stub.",
            stub_path.display()
        );
        return Ok(false);
    }

    runtime.create_dir_all(&stub_dir)?;
    runtime.write(&stub_path, stub_template(pkg_name).as_bytes())?;
    println!("  • {name}_vx.x.x.js\n    └> {}", stub_path.display());
    Ok(true)
}

fn stub_template(pkg_name: &str) -> String {
    format!(
        "/**\n\
         \x20* This is an autogenerated libdef stub for:\n\
         \x20*\n\
         \x20*   '{pkg_name}'\n\
         \x20*\n\
         \x20* Fill this stub out by replacing all the `any` types.\n\
         \x20*/\n\
         \n\
         declare module '{pkg_name}' {{\n\
         \x20 declare module.exports: any;\n\
         }}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::{always, eq};
    use std::path::PathBuf;

    #[test]
    fn test_pkg_without_node_modules_dir_has_no_flow_files() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_is_dir()
            .with(eq(PathBuf::from("/project/node_modules/underscore")))
            .returning(|_| false);

        assert!(!pkg_has_flow_files(&runtime, Path::new("/project"), "underscore").unwrap());
    }

    #[test]
    fn test_detects_flow_pragma_in_package_sources() {
        let mut runtime = MockRuntime::new();
        let pkg_dir = PathBuf::from("/project/node_modules/typed-pkg");

        runtime
            .expect_is_dir()
            .with(eq(pkg_dir.clone()))
            .returning(|_| true);
        runtime
            .expect_read_dir()
            .with(eq(pkg_dir.clone()))
            .returning(|p| Ok(vec![p.join("index.js")]));
        runtime
            .expect_is_dir()
            .with(eq(pkg_dir.join("index.js")))
            .returning(|_| false);
        runtime
            .expect_read_to_string()
            .with(eq(pkg_dir.join("index.js")))
            .returning(|_| Ok("// @flow\nmodule.exports = {};\n".to_string()));

        assert!(pkg_has_flow_files(&runtime, Path::new("/project"), "typed-pkg").unwrap());
    }

    #[test]
    fn test_pragma_below_header_is_ignored() {
        let mut runtime = MockRuntime::new();
        let pkg_dir = PathBuf::from("/project/node_modules/untyped-pkg");

        runtime
            .expect_is_dir()
            .with(eq(pkg_dir.clone()))
            .returning(|_| true);
        runtime
            .expect_read_dir()
            .with(eq(pkg_dir.clone()))
            .returning(|p| Ok(vec![p.join("index.js")]));
        runtime
            .expect_is_dir()
            .with(eq(pkg_dir.join("index.js")))
            .returning(|_| false);
        runtime.expect_read_to_string().returning(|_| {
            let mut body = "// plain header\n".repeat(12);
            body.push_str("// @flow\n");
            Ok(body)
        });

        assert!(!pkg_has_flow_files(&runtime, Path::new("/project"), "untyped-pkg").unwrap());
    }

    #[test]
    fn test_create_stub_writes_declare_module() {
        let mut runtime = MockRuntime::new();
        let stub_path = PathBuf::from("/project/flow-typed/npm/underscore_vx.x.x.js");

        runtime
            .expect_exists()
            .with(eq(stub_path.clone()))
            .returning(|_| false);
        runtime
            .expect_create_dir_all()
            .with(eq(PathBuf::from("/project/flow-typed/npm")))
            .returning(|_| Ok(()));
        runtime
            .expect_write()
            .withf(move |path, contents| {
                let text = std::str::from_utf8(contents).unwrap();
                path == stub_path.as_path()
                    && text.contains("declare module 'underscore'")
                    && text.contains("declare module.exports: any;")
            })
            .returning(|_, _| Ok(()));

        assert!(create_stub(&runtime, Path::new("/project"), "underscore", false).unwrap());
    }

    #[test]
    fn test_create_stub_scoped_package() {
        let mut runtime = MockRuntime::new();
        let stub_path = PathBuf::from("/project/flow-typed/npm/@babel/core_vx.x.x.js");

        runtime
            .expect_exists()
            .with(eq(stub_path.clone()))
            .returning(|_| false);
        runtime
            .expect_create_dir_all()
            .with(eq(PathBuf::from("/project/flow-typed/npm/@babel")))
            .returning(|_| Ok(()));
        runtime
            .expect_write()
            .with(eq(stub_path), always())
            .returning(|_, _| Ok(()));

        assert!(create_stub(&runtime, Path::new("/project"), "@babel/core", false).unwrap());
    }

    #[test]
    fn test_create_stub_respects_existing_file() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);

        assert!(!create_stub(&runtime, Path::new("/project"), "underscore", false).unwrap());
    }
}
