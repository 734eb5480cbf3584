//! Scopes, the symbol table and the two declaration passes.
//!
//! Analysis walks the tree once in source order, declaring every name in the
//! scope arena and registering custom types in the compilation context. Names
//! used before their definition become placeholders which the rescan pass
//! replaces once the whole unit has been seen.

pub mod context;
pub mod scope;
pub mod type_checker;
