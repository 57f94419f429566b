//! Libdef repository model.
//!
//! This module is the core of flowdef: it parses the versioned directory
//! names of a flow-typed definitions checkout, extracts [`LibDef`] records
//! from package-version directories, validates that sibling Flow version
//! ranges never overlap, and resolves the best libdef for a dependency.
//!
//! Every validating operation supports two error modes — fail on first
//! problem, or accumulate everything into a [`ValidationErrors`] — selected
//! by whether the caller passes an accumulator. See [`errors`](self) for the
//! mechanics.

mod errors;
mod extractor;
mod flow_version;
mod repository;
mod resolver;
mod version;

pub use errors::{ErrorKind, LibDefError, ValidationErrors};
pub use extractor::{LibDef, extract_libdefs_from_pkg_dir};
pub use flow_version::{
    FLOW_DIR_PREFIX, FlowVer, FlowVersion, parse_flow_dir_string, parse_flow_ver_string,
    validate_ranges_disjoint,
};
pub use repository::LibDefRepository;
pub use resolver::{
    find_npm_libdef, get_range_lower_bound, libdef_needs_update, split_scoped_name,
};
pub use version::{
    PkgNameVer, PkgVersion, VersionPart, parse_pkg_name_ver, validate_version_num_part,
    validate_version_part,
};
