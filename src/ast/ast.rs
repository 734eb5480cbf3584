use std::{any::Any, fmt::Debug};

use crate::{
    compiler::code_writer::CodeWriter,
    errors::errors::{Error, ErrorImpl},
    type_checker::{scope::ScopeId, type_checker::TypeChecker},
    Position, MK_ERROR,
};

use super::types::{Conversion, Type};

static OBJECT_TYPE: Type = Type::Object;

/// Statement Types
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum StmtType {
    VarDecl,
    PtrDecl,
    ArrayDecl,
    StructOrUnionDecl,
    ForwardDecl,
    Alias,
    CFunctionDecl,
    Lib,
    Assign,
    Return,
    Print,
    If,
    For,
    While,
    Expression,
    CFunctionDef,
    RubyMethodDef,
    ClassDef,
}

impl StmtType {
    /// Statements that emit at file level instead of running where they appear.
    pub fn is_definition(&self) -> bool {
        matches!(
            self,
            StmtType::StructOrUnionDecl
                | StmtType::ForwardDecl
                | StmtType::Alias
                | StmtType::CFunctionDecl
                | StmtType::Lib
                | StmtType::CFunctionDef
                | StmtType::RubyMethodDef
                | StmtType::ClassDef
        )
    }
}

/// Sections of the emitted file that precede the function bodies, in order.
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum HeaderSection {
    Includes,
    /// `typedef struct S name;` for every non-extern struct/union
    TypeTags,
    TypeAliases,
    TypeDefinitions,
    Globals,
    Prototypes,
}

impl HeaderSection {
    pub const ALL: [HeaderSection; 6] = [
        HeaderSection::Includes,
        HeaderSection::TypeTags,
        HeaderSection::TypeAliases,
        HeaderSection::TypeDefinitions,
        HeaderSection::Globals,
        HeaderSection::Prototypes,
    ];
}

/// Statement Trait
///
/// Every statement goes through analysis, an optional rescan of its
/// declarations, and code generation.
pub trait Stmt: Debug {
    /// Returns the type of the statement.
    fn get_stmt_type(&self) -> StmtType;
    /// Type conversion purposes - used with `.downcast_ref<T>()`
    fn as_any(&self) -> &dyn Any;
    fn get_position(&self) -> &Position;
    /// Declares names and checks types in `scope`.
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error>;
    /// Replaces forward-reference placeholders once every type is registered.
    fn rescan_declarations(&mut self, _type_checker: &mut TypeChecker, _scope: ScopeId) -> Result<(), Error> {
        Ok(())
    }
    /// Emits the statement where it appears (function body or init function).
    fn generate_code(&self, code: &mut CodeWriter, type_checker: &TypeChecker);
    /// Emits file-level declarations belonging to `section`.
    fn generate_header_code(&self, _section: HeaderSection, _code: &mut CodeWriter, _type_checker: &TypeChecker) {}
    /// Emits registration code run by the extension's init function.
    fn generate_init_code(&self, _code: &mut CodeWriter, _type_checker: &TypeChecker) {}
    /// Marks a declaration as provided by an external header.
    fn set_extern(&mut self) {}
}

/// Statement Wrapper
///
/// A wrapper that allows for any statement kind to be stored with helper methods
#[derive(Debug)]
pub struct StmtWrapper(Box<dyn Stmt>);

impl StmtWrapper {
    pub fn new<T: Stmt + 'static>(stmt: T) -> Self {
        StmtWrapper(Box::new(stmt))
    }
}

impl Stmt for StmtWrapper {
    fn get_stmt_type(&self) -> StmtType {
        self.0.get_stmt_type()
    }
    fn as_any(&self) -> &dyn Any {
        self.0.as_any()
    }
    fn get_position(&self) -> &Position {
        self.0.get_position()
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        self.0.analyse_statement(type_checker, scope)
    }
    fn rescan_declarations(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        self.0.rescan_declarations(type_checker, scope)
    }
    fn generate_code(&self, code: &mut CodeWriter, type_checker: &TypeChecker) {
        self.0.generate_code(code, type_checker)
    }
    fn generate_header_code(&self, section: HeaderSection, code: &mut CodeWriter, type_checker: &TypeChecker) {
        self.0.generate_header_code(section, code, type_checker)
    }
    fn generate_init_code(&self, code: &mut CodeWriter, type_checker: &TypeChecker) {
        self.0.generate_init_code(code, type_checker)
    }
    fn set_extern(&mut self) {
        self.0.set_extern()
    }
}

/// Expression Types
///
/// Defines the various kinds of expressions in the AST.
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum ExprType {
    Literal,
    Name,
    ElementRef,
    Unary,
    Binary,
    Call,
}

/// Expression Trait
///
/// Expressions follow an evaluate / render / dispose protocol: statements call
/// `generate_evaluation_code` before using `c_code`, and
/// `generate_disposal_code` once the value is no longer needed. Only
/// expressions holding temporaries emit anything in the first and last step.
pub trait Expr: Debug {
    /// Returns the expression type of the expression.
    fn get_expr_type(&self) -> ExprType;
    /// Type conversion purposes - used with `.downcast_ref<T>()`
    fn as_any(&self) -> &dyn Any;
    fn get_position(&self) -> &Position;
    /// The type computed by analysis.
    fn get_type(&self) -> &Type;
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error>;
    /// Analyses with knowledge of the destination type, letting literals adapt to it.
    fn analyse_for_target_type(&mut self, _target: &Type, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        self.analyse_statement(type_checker, scope)
    }
    fn generate_evaluation_code(&self, _code: &mut CodeWriter) {}
    /// Renders the value as a C expression.
    fn c_code(&self) -> String;
    fn generate_disposal_code(&self, _code: &mut CodeWriter) {}
    /// Whether evaluation or disposal emits any code.
    fn needs_temp(&self) -> bool {
        false
    }
    fn is_assignable(&self) -> bool {
        false
    }
}

/// Expression Wrapper
///
/// A wrapper that allows for any expression kind to be stored with helper
/// methods, along with the box/unbox conversion its use site requires.
#[derive(Debug)]
pub struct ExprWrapper {
    inner: Box<dyn Expr>,
    conversion: Option<Conversion>,
}

impl ExprWrapper {
    pub fn new<T: Expr + 'static>(expression: T) -> Self {
        ExprWrapper {
            inner: Box::new(expression),
            conversion: None,
        }
    }

    /// Makes the value fit a slot of type `destination`.
    ///
    /// Attaches a boxing or unboxing conversion when exactly one side is an
    /// object, then requires the destination to hold the converted value.
    pub fn coerce_to(&mut self, destination: &Type, position: &Position) -> Result<(), Error> {
        let conversion = match Conversion::between(self.inner.get_type(), destination) {
            Ok(conversion) => conversion,
            Err(()) => {
                return MK_ERROR!(
                    ErrorImpl::TypeMismatch {
                        expected: destination.to_string(),
                        received: self.inner.get_type().to_string()
                    },
                    position
                )
            }
        };
        self.conversion = conversion;

        if !destination.can_hold(self.get_type()) {
            return MK_ERROR!(
                ErrorImpl::TypeMismatch {
                    expected: destination.to_string(),
                    received: self.get_type().to_string()
                },
                position
            );
        }

        Ok(())
    }

    pub fn conversion(&self) -> Option<&Conversion> {
        self.conversion.as_ref()
    }
}

impl Expr for ExprWrapper {
    fn get_expr_type(&self) -> ExprType {
        self.inner.get_expr_type()
    }
    fn as_any(&self) -> &dyn Any {
        self.inner.as_any()
    }
    fn get_position(&self) -> &Position {
        self.inner.get_position()
    }
    fn get_type(&self) -> &Type {
        match &self.conversion {
            Some(Conversion::ToObject { .. }) => &OBJECT_TYPE,
            Some(Conversion::FromObject { target, .. }) => target,
            None => self.inner.get_type(),
        }
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        self.inner.analyse_statement(type_checker, scope)
    }
    fn analyse_for_target_type(&mut self, target: &Type, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        self.inner.analyse_for_target_type(target, type_checker, scope)
    }
    fn generate_evaluation_code(&self, code: &mut CodeWriter) {
        self.inner.generate_evaluation_code(code)
    }
    fn c_code(&self) -> String {
        match &self.conversion {
            Some(conversion) => conversion.apply(&self.inner.c_code()),
            None => self.inner.c_code(),
        }
    }
    fn generate_disposal_code(&self, code: &mut CodeWriter) {
        self.inner.generate_disposal_code(code)
    }
    fn needs_temp(&self) -> bool {
        self.inner.needs_temp()
    }
    fn is_assignable(&self) -> bool {
        self.conversion.is_none() && self.inner.is_assignable()
    }
}

/// Runs pass 1 over a statement list, stopping at the first error.
pub fn analyse_body(statements: &mut [StmtWrapper], type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
    for statement in statements.iter_mut() {
        statement.analyse_statement(type_checker, scope)?;
    }

    Ok(())
}

pub fn rescan_body(statements: &mut [StmtWrapper], type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
    for statement in statements.iter_mut() {
        statement.rescan_declarations(type_checker, scope)?;
    }

    Ok(())
}

/// Renders an expression as a C truth value; objects are tested with `RTEST`.
pub fn condition_code(expression: &ExprWrapper) -> String {
    if expression.get_type().is_object() {
        format!("RTEST({})", expression.c_code())
    } else {
        expression.c_code()
    }
}
