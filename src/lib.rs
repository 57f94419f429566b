pub mod install;
pub mod libdef;
pub mod project;
pub mod runtime;
