use std::fmt::Display;

use thiserror::Error;

use crate::Position;

#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_internal_error(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::DuplicateDeclaration { .. } => "DuplicateDeclaration",
            ErrorImpl::UnknownIdentifier { .. } => "UnknownIdentifier",
            ErrorImpl::TypeMismatch { .. } => "TypeMismatch",
            ErrorImpl::UnresolvedForwardReference { .. } => "UnresolvedForwardReference",
            ErrorImpl::InvalidLoopOperators { .. } => "InvalidLoopOperators",
            ErrorImpl::ReturnOutsideFunction => "ReturnOutsideFunction",
            ErrorImpl::UnexpectedArguments { .. } => "UnexpectedArguments",
            ErrorImpl::MissingArguments { .. } => "MissingArguments",
            ErrorImpl::NonConstantDimension { .. } => "NonConstantDimension",
            ErrorImpl::NotCallable { .. } => "NotCallable",
            ErrorImpl::NotAssignable => "NotAssignable",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::DuplicateDeclaration { name } => ErrorTip::Suggestion(format!(
                "`{}` is already declared in this scope",
                name
            )),
            ErrorImpl::UnknownIdentifier { identifier } => ErrorTip::Suggestion(format!(
                "Identifier `{}` is not declared in any enclosing scope",
                identifier
            )),
            ErrorImpl::TypeMismatch { expected, received } => ErrorTip::Suggestion(format!(
                "Expected type `{}`, received `{}`",
                expected, received
            )),
            ErrorImpl::UnresolvedForwardReference { type_ } => ErrorTip::Suggestion(format!(
                "Type `{}` is referenced before its definition but never defined; check for a missing struct/union definition or a cyclic alias",
                type_
            )),
            ErrorImpl::InvalidLoopOperators { left, right } => ErrorTip::Suggestion(format!(
                "Loop bounds `{}` and `{}` must both be relational operators with the same direction",
                left, right
            )),
            ErrorImpl::ReturnOutsideFunction => {
                ErrorTip::Suggestion(String::from("`return` is only allowed inside a function"))
            }
            ErrorImpl::UnexpectedArguments { expected, received } => ErrorTip::Suggestion(format!(
                "Expected {} arguments, received {}",
                expected, received
            )),
            ErrorImpl::MissingArguments { expected, received } => ErrorTip::Suggestion(format!(
                "Expected {} arguments, received {}",
                expected, received
            )),
            ErrorImpl::NonConstantDimension { name } => ErrorTip::Suggestion(format!(
                "Array `{}` needs an integer literal as its dimension",
                name
            )),
            ErrorImpl::NotCallable { identifier } => {
                ErrorTip::Suggestion(format!("`{}` is not a function", identifier))
            }
            ErrorImpl::NotAssignable => ErrorTip::None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.internal_error, self.position)
    }
}

impl std::error::Error for Error {}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    #[error("{name:?} already declared in this scope")]
    DuplicateDeclaration { name: String },
    #[error("unknown identifier {identifier:?}")]
    UnknownIdentifier { identifier: String },
    #[error("types do not match: expected {expected:?}, received {received:?}")]
    TypeMismatch { expected: String, received: String },
    #[error("unresolved forward reference to type {type_:?}")]
    UnresolvedForwardReference { type_: String },
    #[error("invalid loop operators {left:?} and {right:?}")]
    InvalidLoopOperators { left: String, right: String },
    #[error("return statement outside of a function")]
    ReturnOutsideFunction,
    #[error("unexpected arguments: expected {expected:?}, received {received:?}")]
    UnexpectedArguments { expected: usize, received: usize },
    #[error("missing arguments: expected {expected:?}, received {received:?}")]
    MissingArguments { expected: usize, received: usize },
    #[error("array {name:?} has a non-constant dimension")]
    NonConstantDimension { name: String },
    #[error("{identifier:?} is not callable")]
    NotCallable { identifier: String },
    #[error("left hand side of assignment is not assignable")]
    NotAssignable,
}
