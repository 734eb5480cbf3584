/// AST (Abstract Syntax Tree) module
/// Contains all definitions related to the AST structure
///
/// Submodules:
/// - ast: Core statement and expression traits and wrappers
/// - types: The type system and box/unbox conversions
/// - expressions: Literals, references, operators and calls
/// - statements: Variable declarations, assignment, return and print
/// - declarations: Structs, unions, aliases, forward declarations and C prototypes
/// - control_flow: If chains and loops
/// - definitions: Functions, methods, classes and the compilation unit
pub mod ast;
pub mod control_flow;
pub mod declarations;
pub mod definitions;
pub mod expressions;
pub mod statements;
pub mod types;

#[cfg(test)]
mod tests;
