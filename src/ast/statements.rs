use std::any::Any;

use log::debug;

use crate::{
    compiler::code_writer::CodeWriter,
    errors::errors::{Error, ErrorImpl},
    type_checker::{scope::ScopeId, type_checker::TypeChecker},
    Position, MK_ERROR, MK_TYPE_MISMATCH,
};

use super::{
    ast::{Expr, ExprType, ExprWrapper, Stmt, StmtType},
    expressions::{LiteralExpr, NameExpr},
    types::{PrimitiveKind, Type, TypeDescriptor},
};

/// Writes `target = value;` between the value's evaluation and disposal.
fn generate_assignment(code: &mut CodeWriter, target: &str, value: &ExprWrapper) {
    value.generate_evaluation_code(code);
    code.write_line(&format!("{} = {};", target, value.c_code()));
    value.generate_disposal_code(code);
}

/// Analyses an initializer against its declared type and attaches conversions.
fn analyse_initializer(
    value: &mut ExprWrapper,
    type_: &Type,
    type_checker: &mut TypeChecker,
    scope: ScopeId,
    position: &Position,
) -> Result<(), Error> {
    value.analyse_for_target_type(type_, type_checker, scope)?;
    value.coerce_to(type_, position)
}

/// Re-resolves a declaration's type and its scope entry after all types are known.
fn rescan_entry(type_: &mut Type, name: &str, type_checker: &mut TypeChecker, scope: ScopeId) {
    if type_.find_unresolved().is_some() {
        *type_ = type_.rescan(&type_checker.context);
        debug!("rescanned `{}` as `{}`", name, type_);
        type_checker.scope_mut(scope).set_type(name, type_.clone());
    }
}

/// Variable Declaration
/// `int x = 5`, `object o`
#[derive(Debug)]
pub struct VarDecl {
    pub descriptor: TypeDescriptor,
    pub name: String,
    pub value: Option<ExprWrapper>,
    pub is_extern: bool,
    pub type_: Type,
    pub c_name: String,
    pub position: Position,
}

impl VarDecl {
    pub fn new(descriptor: TypeDescriptor, name: &str, value: Option<ExprWrapper>, position: Position) -> Self {
        VarDecl {
            descriptor,
            name: name.to_string(),
            value,
            is_extern: false,
            type_: Type::Primitive(PrimitiveKind::Void),
            c_name: name.to_string(),
            position,
        }
    }
}

impl Stmt for VarDecl {
    fn get_stmt_type(&self) -> StmtType {
        StmtType::VarDecl
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        self.type_ = Type::resolve(&self.descriptor, 0, &type_checker.context);
        if let Some(value) = self.value.as_mut() {
            analyse_initializer(value, &self.type_, type_checker, scope, &self.position)?;
        }

        let entry = type_checker
            .scope_mut(scope)
            .declare_var(&self.name, self.type_.clone(), self.is_extern, &self.position)?;
        self.c_name = entry.c_name;

        Ok(())
    }
    fn rescan_declarations(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        rescan_entry(&mut self.type_, &self.name, type_checker, scope);
        Ok(())
    }
    fn generate_code(&self, code: &mut CodeWriter, _type_checker: &TypeChecker) {
        if let Some(value) = &self.value {
            code.write_location(&self.position);
            generate_assignment(code, &self.c_name, value);
        }
    }
    fn set_extern(&mut self) {
        self.is_extern = true;
    }
}

/// Pointer Declaration
/// `int* p`, `char** argv`, `int (*callback)(int, int)`
#[derive(Debug)]
pub struct PtrDecl {
    pub descriptor: TypeDescriptor,
    pub pointer_depth: usize,
    pub name: String,
    pub value: Option<ExprWrapper>,
    pub is_extern: bool,
    pub type_: Type,
    pub c_name: String,
    pub position: Position,
}

impl PtrDecl {
    pub fn new(
        descriptor: TypeDescriptor,
        pointer_depth: usize,
        name: &str,
        value: Option<ExprWrapper>,
        position: Position,
    ) -> Self {
        PtrDecl {
            descriptor,
            pointer_depth,
            name: name.to_string(),
            value,
            is_extern: false,
            type_: Type::Primitive(PrimitiveKind::Void),
            c_name: name.to_string(),
            position,
        }
    }
}

impl Stmt for PtrDecl {
    fn get_stmt_type(&self) -> StmtType {
        StmtType::PtrDecl
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        self.type_ = Type::resolve(&self.descriptor, self.pointer_depth, &type_checker.context);
        if let Some(value) = self.value.as_mut() {
            analyse_initializer(value, &self.type_, type_checker, scope, &self.position)?;
        }

        let entry = type_checker
            .scope_mut(scope)
            .declare_var(&self.name, self.type_.clone(), self.is_extern, &self.position)?;
        self.c_name = entry.c_name;

        Ok(())
    }
    fn rescan_declarations(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        rescan_entry(&mut self.type_, &self.name, type_checker, scope);
        Ok(())
    }
    fn generate_code(&self, code: &mut CodeWriter, _type_checker: &TypeChecker) {
        // Uninitialised pointers only exist as a declaration among the locals
        if let Some(value) = &self.value {
            code.write_location(&self.position);
            generate_assignment(code, &self.c_name, value);
        }
    }
    fn set_extern(&mut self) {
        self.is_extern = true;
    }
}

/// Array Declaration
/// `int a[3] = {1, 2, 3}`. Constant literal elements go into the declaration's
/// initializer; any other element list is assigned in place, element by element.
#[derive(Debug)]
pub struct ArrayDecl {
    pub descriptor: TypeDescriptor,
    pub name: String,
    pub dimension: ExprWrapper,
    pub elements: Option<Vec<ExprWrapper>>,
    pub is_extern: bool,
    pub type_: Type,
    pub c_name: String,
    pub assigns_elements: bool,
    pub position: Position,
}

impl ArrayDecl {
    pub fn new(
        descriptor: TypeDescriptor,
        name: &str,
        dimension: ExprWrapper,
        elements: Option<Vec<ExprWrapper>>,
        position: Position,
    ) -> Self {
        ArrayDecl {
            descriptor,
            name: name.to_string(),
            dimension,
            elements,
            is_extern: false,
            type_: Type::Primitive(PrimitiveKind::Void),
            c_name: name.to_string(),
            assigns_elements: false,
            position,
        }
    }

    fn constant_dimension(&self) -> Option<usize> {
        if self.dimension.get_expr_type() != ExprType::Literal {
            return None;
        }

        self.dimension
            .as_any()
            .downcast_ref::<LiteralExpr>()
            .and_then(|literal| literal.as_integer())
            .and_then(|dimension| usize::try_from(dimension).ok())
    }
}

impl Stmt for ArrayDecl {
    fn get_stmt_type(&self) -> StmtType {
        StmtType::ArrayDecl
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        self.dimension.analyse_statement(type_checker, scope)?;
        let dimension = match self.constant_dimension() {
            Some(dimension) => dimension,
            None => {
                return MK_ERROR!(
                    ErrorImpl::NonConstantDimension {
                        name: self.name.clone()
                    },
                    self.position
                )
            }
        };

        let base = Type::resolve(&self.descriptor, 0, &type_checker.context);
        self.type_ = Type::Array(Box::new(base.clone()), dimension);

        let mut initializer = None;
        self.assigns_elements = false;
        if let Some(elements) = self.elements.as_mut() {
            for element in elements.iter_mut() {
                analyse_initializer(element, &base, type_checker, scope, &self.position)?;
            }
            if elements.len() > dimension {
                return MK_TYPE_MISMATCH!(
                    self.type_,
                    format!("{} elements", elements.len()),
                    self.position
                );
            }

            // Only plain literals are constant in C
            let constant = elements
                .iter()
                .all(|element| element.get_expr_type() == ExprType::Literal && element.conversion().is_none());
            if constant {
                initializer = Some(format!(
                    "{{{}}}",
                    elements
                        .iter()
                        .map(|element| element.c_code())
                        .collect::<Vec<String>>()
                        .join(", ")
                ));
            } else {
                self.assigns_elements = true;
            }
        }

        let entry = type_checker.scope_mut(scope).declare_array(
            &self.name,
            self.type_.clone(),
            initializer,
            self.is_extern,
            &self.position,
        )?;
        self.c_name = entry.c_name;

        Ok(())
    }
    fn rescan_declarations(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        rescan_entry(&mut self.type_, &self.name, type_checker, scope);
        Ok(())
    }
    fn generate_code(&self, code: &mut CodeWriter, _type_checker: &TypeChecker) {
        let elements = match &self.elements {
            Some(elements) if self.assigns_elements => elements,
            _ => return,
        };

        code.write_location(&self.position);
        for (index, element) in elements.iter().enumerate() {
            generate_assignment(code, &format!("{}[{}]", self.c_name, index), element);
        }
    }
    fn set_extern(&mut self) {
        self.is_extern = true;
    }
}

/// Assignment
/// Assigning to an undeclared plain name declares it as an object.
#[derive(Debug)]
pub struct Assign {
    pub target: ExprWrapper,
    pub value: ExprWrapper,
    pub position: Position,
}

impl Assign {
    pub fn new(target: ExprWrapper, value: ExprWrapper, position: Position) -> Self {
        Assign { target, value, position }
    }
}

impl Stmt for Assign {
    fn get_stmt_type(&self) -> StmtType {
        StmtType::Assign
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        if self.target.get_expr_type() == ExprType::Name {
            if let Some(name) = self.target.as_any().downcast_ref::<NameExpr>() {
                if type_checker.find(scope, &name.name).is_none() {
                    debug!("implicitly declaring `{}` as object", name.name);
                    type_checker
                        .scope_mut(scope)
                        .declare_var(&name.name, Type::Object, false, &self.position)?;
                }
            }
        }

        self.target.analyse_statement(type_checker, scope)?;
        if !self.target.is_assignable() {
            return MK_ERROR!(ErrorImpl::NotAssignable, self.position);
        }

        let target_type = self.target.get_type().clone();
        analyse_initializer(&mut self.value, &target_type, type_checker, scope, &self.position)
    }
    fn generate_code(&self, code: &mut CodeWriter, _type_checker: &TypeChecker) {
        code.write_location(&self.position);
        self.value.generate_evaluation_code(code);
        self.target.generate_evaluation_code(code);
        code.write_line(&format!("{} = {};", self.target.c_code(), self.value.c_code()));
        self.value.generate_disposal_code(code);
        self.target.generate_disposal_code(code);
    }
}

/// Return Statement
#[derive(Debug)]
pub struct Return {
    pub value: Option<ExprWrapper>,
    pub return_type: Type,
    pub position: Position,
}

impl Return {
    pub fn new(value: Option<ExprWrapper>, position: Position) -> Self {
        Return {
            value,
            return_type: Type::Primitive(PrimitiveKind::Void),
            position,
        }
    }
}

impl Stmt for Return {
    fn get_stmt_type(&self) -> StmtType {
        StmtType::Return
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        let function = match type_checker.enclosing_function(scope) {
            Some(function) => function,
            None => return MK_ERROR!(ErrorImpl::ReturnOutsideFunction, self.position),
        };
        self.return_type = type_checker
            .scope(function)
            .return_type
            .as_ref()
            .map(|return_type| return_type.concrete())
            .unwrap_or(Type::Primitive(PrimitiveKind::Void));

        let void = matches!(self.return_type, Type::Primitive(PrimitiveKind::Void));
        match self.value.as_mut() {
            Some(value) => {
                if void {
                    value.analyse_statement(type_checker, scope)?;
                    return MK_TYPE_MISMATCH!(self.return_type, value.get_type(), self.position);
                }
                let return_type = self.return_type.clone();
                analyse_initializer(value, &return_type, type_checker, scope, &self.position)
            }
            // A bare return from a host method yields nil
            None if void || self.return_type.is_object() => Ok(()),
            None => MK_TYPE_MISMATCH!(self.return_type, "void", self.position),
        }
    }
    fn generate_code(&self, code: &mut CodeWriter, _type_checker: &TypeChecker) {
        code.write_location(&self.position);
        match &self.value {
            Some(value) => {
                value.generate_evaluation_code(code);
                code.write_line(&format!("return {};", value.c_code()));
            }
            None if self.return_type.is_object() => code.write_line("return Qnil;"),
            None => code.write_line("return;"),
        }
    }
}

/// Print Statement
/// One `printf` per argument; objects are printed through `inspect`.
#[derive(Debug)]
pub struct Print {
    pub values: Vec<ExprWrapper>,
    pub position: Position,
}

impl Print {
    pub fn new(values: Vec<ExprWrapper>, position: Position) -> Self {
        Print { values, position }
    }
}

impl Stmt for Print {
    fn get_stmt_type(&self) -> StmtType {
        StmtType::Print
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        for value in self.values.iter_mut() {
            value.analyse_statement(type_checker, scope)?;
            if matches!(value.get_type().concrete(), Type::Primitive(PrimitiveKind::Void) | Type::StructOrUnion { .. }) {
                return MK_TYPE_MISMATCH!("printable value", value.get_type(), self.position);
            }
        }

        Ok(())
    }
    fn generate_code(&self, code: &mut CodeWriter, _type_checker: &TypeChecker) {
        code.write_location(&self.position);
        for value in &self.values {
            value.generate_evaluation_code(code);
            let rendered = if value.get_type().is_object() {
                format!("RSTRING_PTR(rb_funcall({}, rb_intern(\"inspect\"), 0))", value.c_code())
            } else {
                value.c_code()
            };
            code.write_line(&format!(
                "printf(\"{}\", {});",
                value.get_type().format_specifier(),
                rendered
            ));
            value.generate_disposal_code(code);
        }
    }
}

/// Expression Statement
/// An expression evaluated for its side effects.
#[derive(Debug)]
pub struct ExpressionStmt {
    pub expression: ExprWrapper,
    pub position: Position,
}

impl ExpressionStmt {
    pub fn new(expression: ExprWrapper, position: Position) -> Self {
        ExpressionStmt { expression, position }
    }
}

impl Stmt for ExpressionStmt {
    fn get_stmt_type(&self) -> StmtType {
        StmtType::Expression
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        self.expression.analyse_statement(type_checker, scope)
    }
    fn generate_code(&self, code: &mut CodeWriter, _type_checker: &TypeChecker) {
        code.write_location(&self.position);
        self.expression.generate_evaluation_code(code);
        code.write_line(&format!("{};", self.expression.c_code()));
        self.expression.generate_disposal_code(code);
    }
}
