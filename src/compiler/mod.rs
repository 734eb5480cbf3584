//! C code generation.
//!
//! `CodeWriter` is the append-only output buffer used by every node's
//! `generate_*` methods; `compiler` drives the passes and lays out the file.

pub mod code_writer;
pub mod compiler;
