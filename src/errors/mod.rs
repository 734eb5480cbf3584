//! Error types and error handling for the compiler.
//!
//! This module defines the error types raised during analysis. It includes:
//!
//! - Error structures with source position information
//! - Specific error variants for declaration, lookup and type failures
//! - Error names and human readable tips for diagnostics

pub mod errors;
