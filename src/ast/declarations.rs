use std::any::Any;

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::{
    compiler::code_writer::CodeWriter,
    errors::errors::Error,
    type_checker::{
        context::CompilationContext,
        scope::{EntryKind, ScopeId, ScopeKind},
        type_checker::TypeChecker,
    },
    Position,
};

use super::{
    ast::{HeaderSection, Stmt, StmtType, StmtWrapper},
    types::{AggregateKind, FunctionType, PrimitiveKind, Type, TypeDescriptor},
};

lazy_static! {
    static ref TAG_NAME: Regex = Regex::new(r"^(?:struct|union)\s+(?P<tag>\w+)$").unwrap();
}

/// Struct or Union Declaration
///
/// Registers its type in the compilation context before analysing members so
/// members can point back at the struct being defined.
#[derive(Debug)]
pub struct StructOrUnionDecl {
    pub kind: AggregateKind,
    pub name: String,
    pub declarations: Vec<StmtWrapper>,
    pub is_extern: bool,
    pub type_: Option<Type>,
    pub scope: Option<ScopeId>,
    pub member_scope: Option<ScopeId>,
    pub position: Position,
}

impl StructOrUnionDecl {
    pub fn new(kind: AggregateKind, name: &str, declarations: Vec<StmtWrapper>, position: Position) -> Self {
        StructOrUnionDecl {
            kind,
            name: name.to_string(),
            declarations,
            is_extern: false,
            type_: None,
            scope: None,
            member_scope: None,
            position,
        }
    }

    fn tag(&self) -> String {
        format!("{} {}", self.kind, self.name)
    }
}

impl Stmt for StructOrUnionDecl {
    fn get_stmt_type(&self) -> StmtType {
        StmtType::StructOrUnionDecl
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        let member_scope = type_checker.add_scope(&self.name, ScopeKind::StructOrUnion, scope);
        let c_name = if self.is_extern {
            self.tag()
        } else {
            match type_checker.find(scope, &self.tag()) {
                // Keep the typedef name of a visible forward declaration
                Some(forward) if forward.kind == EntryKind::Type => forward.c_name.clone(),
                _ => type_checker
                    .scope(scope)
                    .linkage_name(EntryKind::StructOrUnion, &self.name, false),
            }
        };
        let type_ = Type::StructOrUnion {
            kind: self.kind,
            name: self.name.clone(),
            c_name,
            scope: member_scope,
        };

        type_checker.context.register(&self.name, type_.clone(), self.position.clone());
        type_checker
            .scope_mut(scope)
            .declare_struct_or_union(&self.name, type_.clone(), self.is_extern, &self.position)?;

        for declaration in self.declarations.iter_mut() {
            declaration.analyse_statement(type_checker, member_scope)?;
        }

        self.type_ = Some(type_);
        self.scope = Some(scope);
        self.member_scope = Some(member_scope);
        Ok(())
    }
    fn rescan_declarations(&mut self, type_checker: &mut TypeChecker, _scope: ScopeId) -> Result<(), Error> {
        if let Some(member_scope) = self.member_scope {
            for declaration in self.declarations.iter_mut() {
                declaration.rescan_declarations(type_checker, member_scope)?;
            }
        }

        Ok(())
    }
    fn generate_code(&self, _code: &mut CodeWriter, _type_checker: &TypeChecker) {}
    fn generate_header_code(&self, section: HeaderSection, code: &mut CodeWriter, type_checker: &TypeChecker) {
        let (Some(Type::StructOrUnion { c_name, .. }), Some(scope), Some(member_scope)) =
            (&self.type_, self.scope, self.member_scope)
        else {
            return;
        };
        if self.is_extern {
            return;
        }

        match section {
            HeaderSection::TypeTags => {
                // A forward declaration already emitted this typedef
                let forwarded = type_checker
                    .find(scope, &self.tag())
                    .is_some_and(|forward| forward.c_name == *c_name);
                if !forwarded {
                    code.write_line(&format!("typedef {} {};", self.tag(), c_name));
                }
            }
            HeaderSection::TypeDefinitions => {
                code.write(&format!("{} ", self.tag()));
                code.block_ending(";", |code| {
                    for entry in type_checker.scope(member_scope).entries() {
                        if entry.kind.is_storage() {
                            code.declare_variable(entry, "");
                        }
                    }
                });
            }
            _ => {}
        }
    }
    fn set_extern(&mut self) {
        self.is_extern = true;
        for declaration in self.declarations.iter_mut() {
            declaration.set_extern();
        }
    }
}

/// Forward Declaration
/// `fwd struct node`. The tag may be used in pointer types before its definition.
#[derive(Debug)]
pub struct ForwardDecl {
    pub kind: AggregateKind,
    pub name: String,
    pub type_: Type,
    pub c_name: String,
    pub position: Position,
}

impl ForwardDecl {
    /// Marks `name` as pending in `context` as soon as the node exists.
    pub fn new(context: &mut CompilationContext, kind: AggregateKind, name: &str, position: Position) -> Self {
        context.declare_placeholder(name, position.clone());

        ForwardDecl {
            kind,
            name: name.to_string(),
            type_: Type::Unresolved(name.to_string()),
            c_name: name.to_string(),
            position,
        }
    }

    fn tag(&self) -> String {
        format!("{} {}", self.kind, self.name)
    }

    fn target(&self, context: &CompilationContext) -> Type {
        context
            .get(&self.name)
            .cloned()
            .unwrap_or_else(|| Type::Unresolved(self.name.clone()))
    }
}

impl Stmt for ForwardDecl {
    fn get_stmt_type(&self) -> StmtType {
        StmtType::ForwardDecl
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        self.c_name = type_checker
            .scope(scope)
            .linkage_name(EntryKind::Type, &self.name, false);
        self.type_ = Type::TypeDef {
            name: self.tag(),
            c_name: self.c_name.clone(),
            target: Box::new(self.target(&type_checker.context)),
        };

        type_checker
            .scope_mut(scope)
            .declare_type(&self.tag(), self.type_.clone(), false, &self.position)?;
        Ok(())
    }
    fn rescan_declarations(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        self.type_ = Type::TypeDef {
            name: self.tag(),
            c_name: self.c_name.clone(),
            target: Box::new(self.target(&type_checker.context)),
        };
        debug!("forward declaration `{}` resolved to `{}`", self.tag(), self.type_.unaliased());
        type_checker.scope_mut(scope).set_type(&self.tag(), self.type_.clone());

        Ok(())
    }
    fn generate_code(&self, _code: &mut CodeWriter, _type_checker: &TypeChecker) {}
    fn generate_header_code(&self, section: HeaderSection, code: &mut CodeWriter, _type_checker: &TypeChecker) {
        if section == HeaderSection::TypeTags {
            code.write_line(&format!("typedef {} {};", self.tag(), self.c_name));
        }
    }
}

/// Type Alias
/// `alias uint = unsigned int`, `alias callback = int (*)(int, int)`
#[derive(Debug)]
pub struct Alias {
    pub new_name: String,
    pub descriptor: TypeDescriptor,
    pub pointer_depth: usize,
    pub is_extern: bool,
    pub type_: Type,
    pub c_name: String,
    pub position: Position,
}

impl Alias {
    /// Marks `new_name` as pending in `context` as soon as the node exists.
    pub fn new(
        context: &mut CompilationContext,
        new_name: &str,
        descriptor: TypeDescriptor,
        pointer_depth: usize,
        position: Position,
    ) -> Self {
        context.declare_placeholder(new_name, position.clone());

        Alias {
            new_name: new_name.to_string(),
            descriptor,
            pointer_depth,
            is_extern: false,
            type_: Type::Unresolved(new_name.to_string()),
            c_name: new_name.to_string(),
            position,
        }
    }

    /// `alias node = struct node` only names the tag; no new type is introduced.
    fn is_tag_alias(&self) -> bool {
        match &self.descriptor {
            TypeDescriptor::Named(name) => TAG_NAME
                .captures(name.trim())
                .is_some_and(|captures| captures["tag"] == self.new_name),
            _ => false,
        }
    }
}

impl Stmt for Alias {
    fn get_stmt_type(&self) -> StmtType {
        StmtType::Alias
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        if self.is_tag_alias() {
            return Ok(());
        }

        let target = Type::resolve(&self.descriptor, self.pointer_depth, &type_checker.context);
        self.c_name = type_checker
            .scope(scope)
            .linkage_name(EntryKind::Type, &self.new_name, self.is_extern);
        self.type_ = Type::TypeDef {
            name: self.new_name.clone(),
            c_name: self.c_name.clone(),
            target: Box::new(target),
        };

        type_checker
            .context
            .register(&self.new_name, self.type_.clone(), self.position.clone());
        type_checker
            .scope_mut(scope)
            .declare_type(&self.new_name, self.type_.clone(), self.is_extern, &self.position)?;
        Ok(())
    }
    fn rescan_declarations(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        if self.is_tag_alias() || self.type_.find_unresolved().is_none() {
            return Ok(());
        }

        self.type_ = self.type_.rescan(&type_checker.context);
        debug!("alias `{}` resolved to `{}`", self.new_name, self.type_.unaliased());
        type_checker
            .context
            .register(&self.new_name, self.type_.clone(), self.position.clone());
        type_checker.scope_mut(scope).set_type(&self.new_name, self.type_.clone());

        Ok(())
    }
    fn generate_code(&self, _code: &mut CodeWriter, _type_checker: &TypeChecker) {}
    fn generate_header_code(&self, section: HeaderSection, code: &mut CodeWriter, _type_checker: &TypeChecker) {
        if section != HeaderSection::TypeAliases || self.is_extern || self.is_tag_alias() {
            return;
        }

        if let Type::TypeDef { target, .. } = &self.type_ {
            code.write_line(&format!("typedef {};", target.c_declaration(&self.c_name)));
        }
    }
    fn set_extern(&mut self) {
        self.is_extern = true;
    }
}

/// One parameter of a function signature.
#[derive(Debug)]
pub struct ArgDeclaration {
    pub descriptor: TypeDescriptor,
    pub pointer_depth: usize,
    pub name: Option<String>,
    pub type_: Type,
    pub c_name: String,
    pub position: Position,
}

impl ArgDeclaration {
    pub fn new(descriptor: TypeDescriptor, pointer_depth: usize, name: Option<&str>, position: Position) -> Self {
        ArgDeclaration {
            descriptor,
            pointer_depth,
            name: name.map(String::from),
            type_: Type::Primitive(PrimitiveKind::Void),
            c_name: String::new(),
            position,
        }
    }
}

/// Parameter list of a function declaration or definition.
#[derive(Debug, Default)]
pub struct ArgumentList {
    pub arguments: Vec<ArgDeclaration>,
}

impl ArgumentList {
    pub fn new(arguments: Vec<ArgDeclaration>) -> Self {
        ArgumentList { arguments }
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    /// Resolves every parameter type. With `declare` set, named parameters are
    /// also declared as variables of `scope`.
    pub fn analyse(&mut self, type_checker: &mut TypeChecker, scope: ScopeId, declare: bool) -> Result<Vec<Type>, Error> {
        let mut types = vec![];
        for argument in self.arguments.iter_mut() {
            argument.type_ = Type::resolve(&argument.descriptor, argument.pointer_depth, &type_checker.context);
            if let (true, Some(name)) = (declare, &argument.name) {
                let entry = type_checker
                    .scope_mut(scope)
                    .declare_var(name, argument.type_.clone(), false, &argument.position)?;
                argument.c_name = entry.c_name;
            }
            types.push(argument.type_.clone());
        }

        Ok(types)
    }

    /// Rescans parameter types; returns the updated list.
    pub fn rescan(&mut self, type_checker: &mut TypeChecker, scope: ScopeId, declared: bool) -> Vec<Type> {
        for argument in self.arguments.iter_mut() {
            if argument.type_.find_unresolved().is_some() {
                argument.type_ = argument.type_.rescan(&type_checker.context);
                if let (true, Some(name)) = (declared, &argument.name) {
                    type_checker.scope_mut(scope).set_type(name, argument.type_.clone());
                }
            }
        }

        self.types()
    }

    pub fn types(&self) -> Vec<Type> {
        self.arguments.iter().map(|argument| argument.type_.clone()).collect()
    }

    /// Parameter list of a definition, e.g. `int __extc_v_a, char* __extc_ptr_s`.
    pub fn c_parameters(&self) -> String {
        if self.arguments.is_empty() {
            return String::from("void");
        }

        self.arguments
            .iter()
            .map(|argument| argument.type_.c_declaration(&argument.c_name))
            .collect::<Vec<String>>()
            .join(", ")
    }

    /// Parameter list of a prototype, types only.
    pub fn c_parameter_types(&self) -> String {
        if self.arguments.is_empty() {
            return String::from("void");
        }

        self.arguments
            .iter()
            .map(|argument| argument.type_.c_type())
            .collect::<Vec<String>>()
            .join(", ")
    }
}

/// C Function Declaration
/// A prototype, or an external function when declared inside a `lib` block.
#[derive(Debug)]
pub struct CFunctionDecl {
    pub return_descriptor: TypeDescriptor,
    pub return_pointer_depth: usize,
    pub name: String,
    pub arguments: ArgumentList,
    pub is_extern: bool,
    pub type_: Option<FunctionType>,
    pub c_name: String,
    pub position: Position,
}

impl CFunctionDecl {
    pub fn new(
        return_descriptor: TypeDescriptor,
        return_pointer_depth: usize,
        name: &str,
        arguments: ArgumentList,
        position: Position,
    ) -> Self {
        CFunctionDecl {
            return_descriptor,
            return_pointer_depth,
            name: name.to_string(),
            arguments,
            is_extern: false,
            type_: None,
            c_name: name.to_string(),
            position,
        }
    }
}

impl Stmt for CFunctionDecl {
    fn get_stmt_type(&self) -> StmtType {
        StmtType::CFunctionDecl
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        let parameters = self.arguments.analyse(type_checker, scope, false)?;
        let return_type = Type::resolve(&self.return_descriptor, self.return_pointer_depth, &type_checker.context);

        let entry = type_checker.scope_mut(scope).declare_function(
            EntryKind::Function,
            &self.name,
            parameters,
            return_type,
            self.is_extern,
            &self.position,
        )?;
        self.c_name = entry.c_name;
        if let Type::Function(function) = entry.type_ {
            self.type_ = Some(function);
        }

        Ok(())
    }
    fn rescan_declarations(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        let parameters = self.arguments.rescan(type_checker, scope, false);
        if let Some(function) = self.type_.as_mut() {
            function.parameters = parameters;
            function.return_type = Box::new(function.return_type.rescan(&type_checker.context));
            type_checker
                .scope_mut(scope)
                .set_type(&self.name, Type::Function(function.clone()));
        }

        Ok(())
    }
    fn generate_code(&self, _code: &mut CodeWriter, _type_checker: &TypeChecker) {}
    fn generate_header_code(&self, section: HeaderSection, code: &mut CodeWriter, _type_checker: &TypeChecker) {
        if section != HeaderSection::Prototypes {
            return;
        }

        if self.is_extern {
            code.write_line(&format!("/* C function {} declared. */", self.c_name));
        } else if let Some(function) = &self.type_ {
            code.write_func_declaration(
                &function.return_type.c_type(),
                &self.c_name,
                &self.arguments.c_parameter_types(),
            );
        }
    }
    fn set_extern(&mut self) {
        self.is_extern = true;
    }
}

/// Library Block
/// `lib "math.h" ... end`: everything inside is extern and the header is included.
#[derive(Debug)]
pub struct Lib {
    pub header: String,
    pub declarations: Vec<StmtWrapper>,
    pub position: Position,
}

impl Lib {
    pub fn new(header: &str, mut declarations: Vec<StmtWrapper>, position: Position) -> Self {
        for declaration in declarations.iter_mut() {
            declaration.set_extern();
        }

        Lib {
            header: header.to_string(),
            declarations,
            position,
        }
    }

    fn include_line(&self) -> String {
        let header = self.header.trim();
        if header.starts_with('<') || header.starts_with('"') {
            format!("#include {}", header)
        } else {
            format!("#include <{}>", header)
        }
    }
}

impl Stmt for Lib {
    fn get_stmt_type(&self) -> StmtType {
        StmtType::Lib
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        for declaration in self.declarations.iter_mut() {
            declaration.analyse_statement(type_checker, scope)?;
        }

        Ok(())
    }
    fn rescan_declarations(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        for declaration in self.declarations.iter_mut() {
            declaration.rescan_declarations(type_checker, scope)?;
        }

        Ok(())
    }
    fn generate_code(&self, _code: &mut CodeWriter, _type_checker: &TypeChecker) {}
    fn generate_header_code(&self, section: HeaderSection, code: &mut CodeWriter, type_checker: &TypeChecker) {
        if section == HeaderSection::Includes {
            code.write_line(&self.include_line());
        }
        for declaration in &self.declarations {
            declaration.generate_header_code(section, code, type_checker);
        }
    }
}
