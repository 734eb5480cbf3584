//! Utility macros for the compiler.
//!
//! This module defines helper macros used throughout the analysis code:
//!
//! - `MK_ERROR!` - Creates an `Err(Error)` for a given `ErrorImpl`
//! - `MK_TYPE_MISMATCH!` - Creates an `Err(Error)` for two incompatible types
//!
//! These macros reduce boilerplate when raising analysis errors.

/// Creates an `Err` holding an Error with the given kind and position.
///
/// # Arguments
///
/// * `$kind` - The ErrorImpl variant
/// * `$position` - The source position (cloned)
///
/// # Example
///
/// ```ignore
/// return MK_ERROR!(ErrorImpl::ReturnOutsideFunction, self.position);
/// ```
#[macro_export]
macro_rules! MK_ERROR {
    ($kind:expr, $position:expr) => {
        Err($crate::errors::errors::Error::new($kind, $position.clone()))
    };
}

/// Creates an `Err` holding a TypeMismatch between two types.
///
/// Both types are rendered with their `Display` implementation.
#[macro_export]
macro_rules! MK_TYPE_MISMATCH {
    ($expected:expr, $received:expr, $position:expr) => {
        $crate::MK_ERROR!(
            $crate::errors::errors::ErrorImpl::TypeMismatch {
                expected: $expected.to_string(),
                received: $received.to_string(),
            },
            $position
        )
    };
}
