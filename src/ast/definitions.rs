use std::any::Any;

use log::debug;

use crate::{
    compiler::code_writer::CodeWriter,
    errors::errors::Error,
    type_checker::{
        scope::{EntryKind, ScopeId, ScopeKind, OBJECT_CLASS, OBJECT_CLASS_C_NAME},
        type_checker::TypeChecker,
    },
    Position, MK_TYPE_MISMATCH,
};

use super::{
    ast::{analyse_body, rescan_body, HeaderSection, Stmt, StmtType, StmtWrapper},
    declarations::ArgumentList,
    types::{Conversion, FunctionType, PrimitiveKind, Type, TypeDescriptor},
};

/// C Function Definition
/// `cfunc int add(int a, int b) ... end`, callable from native code only.
#[derive(Debug)]
pub struct CFunctionDef {
    pub return_descriptor: TypeDescriptor,
    pub return_pointer_depth: usize,
    pub name: String,
    pub arguments: ArgumentList,
    pub statements: Vec<StmtWrapper>,
    pub return_type: Type,
    pub function_scope: Option<ScopeId>,
    pub c_name: String,
    pub position: Position,
}

impl CFunctionDef {
    pub fn new(
        return_descriptor: TypeDescriptor,
        return_pointer_depth: usize,
        name: &str,
        arguments: ArgumentList,
        statements: Vec<StmtWrapper>,
        position: Position,
    ) -> Self {
        CFunctionDef {
            return_descriptor,
            return_pointer_depth,
            name: name.to_string(),
            arguments,
            statements,
            return_type: Type::Primitive(PrimitiveKind::Void),
            function_scope: None,
            c_name: name.to_string(),
            position,
        }
    }
}

impl Stmt for CFunctionDef {
    fn get_stmt_type(&self) -> StmtType {
        StmtType::CFunctionDef
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        let function_scope = type_checker.add_scope(&self.name, ScopeKind::Function, scope);
        let parameters = self.arguments.analyse(type_checker, function_scope, true)?;
        self.return_type = Type::resolve(&self.return_descriptor, self.return_pointer_depth, &type_checker.context);
        type_checker.scope_mut(function_scope).return_type = Some(self.return_type.clone());

        let signature = FunctionType {
            name: Some(self.name.clone()),
            c_name: None,
            parameters: parameters.clone(),
            return_type: Box::new(self.return_type.clone()),
        };
        let prototype = type_checker.scope(scope).get(&self.name).and_then(|entry| match &entry.type_ {
            Type::Function(function)
                if entry.kind == EntryKind::Function && !entry.is_extern && function.same_signature(&signature) =>
            {
                Some(entry.c_name.clone())
            }
            _ => None,
        });

        // Declared before the body so the function can call itself
        self.c_name = match prototype {
            Some(c_name) => {
                debug!("`{}` completes an earlier prototype", self.name);
                c_name
            }
            None => {
                type_checker
                    .scope_mut(scope)
                    .declare_function(
                        EntryKind::Function,
                        &self.name,
                        parameters,
                        self.return_type.clone(),
                        false,
                        &self.position,
                    )?
                    .c_name
            }
        };

        self.function_scope = Some(function_scope);
        analyse_body(&mut self.statements, type_checker, function_scope)
    }
    fn rescan_declarations(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        let Some(function_scope) = self.function_scope else {
            return Ok(());
        };

        let parameters = self.arguments.rescan(type_checker, function_scope, true);
        self.return_type = self.return_type.rescan(&type_checker.context);
        type_checker.scope_mut(function_scope).return_type = Some(self.return_type.clone());
        type_checker.scope_mut(scope).set_type(
            &self.name,
            Type::Function(FunctionType {
                name: Some(self.name.clone()),
                c_name: Some(self.c_name.clone()),
                parameters,
                return_type: Box::new(self.return_type.clone()),
            }),
        );

        rescan_body(&mut self.statements, type_checker, function_scope)
    }
    fn generate_code(&self, code: &mut CodeWriter, type_checker: &TypeChecker) {
        let Some(function_scope) = self.function_scope else {
            return;
        };
        let parameters: Vec<&str> = self
            .arguments
            .arguments
            .iter()
            .filter_map(|argument| argument.name.as_deref())
            .collect();

        code.write_location(&self.position);
        code.write_func_definition_header(&self.return_type.c_type(), &self.c_name, &self.arguments.c_parameters());
        code.block(|code| {
            code.declare_scope_variables(type_checker.scope(function_scope), &parameters, "");
            for statement in &self.statements {
                statement.generate_code(code, type_checker);
            }
        });
        code.new_line();
    }
    fn generate_header_code(&self, section: HeaderSection, code: &mut CodeWriter, type_checker: &TypeChecker) {
        if section == HeaderSection::Prototypes {
            code.write_func_declaration(&self.return_type.c_type(), &self.c_name, &self.arguments.c_parameter_types());
        }
        for statement in &self.statements {
            statement.generate_header_code(section, code, type_checker);
        }
    }
}

/// Method Definition
///
/// `def name(a, b) ... end`: a method exposed to the host runtime. Arguments
/// arrive boxed in `argv` and are unboxed into their declared types.
#[derive(Debug)]
pub struct RubyMethodDef {
    pub name: String,
    pub arguments: ArgumentList,
    pub statements: Vec<StmtWrapper>,
    pub function_scope: Option<ScopeId>,
    pub c_name: String,
    pub klass_c_name: String,
    pub position: Position,
}

impl RubyMethodDef {
    pub fn new(name: &str, arguments: ArgumentList, statements: Vec<StmtWrapper>, position: Position) -> Self {
        RubyMethodDef {
            name: name.to_string(),
            arguments,
            statements,
            function_scope: None,
            c_name: name.to_string(),
            klass_c_name: OBJECT_CLASS_C_NAME.to_string(),
            position,
        }
    }

    fn unboxed_argument(&self, index: usize, type_: &Type) -> String {
        let argument = format!("argv[{}]", index);
        match Conversion::between(&Type::Object, type_) {
            Ok(Some(conversion)) => conversion.apply(&argument),
            _ => argument,
        }
    }
}

impl Stmt for RubyMethodDef {
    fn get_stmt_type(&self) -> StmtType {
        StmtType::RubyMethodDef
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        let function_scope = type_checker.add_scope(&self.name, ScopeKind::Function, scope);
        type_checker.scope_mut(function_scope).return_type = Some(Type::Object);

        let parameters = self.arguments.analyse(type_checker, function_scope, true)?;
        for (parameter, argument) in parameters.iter().zip(self.arguments.arguments.iter()) {
            if Conversion::between(&Type::Object, parameter).is_err() {
                return MK_TYPE_MISMATCH!(parameter, Type::Object, argument.position);
            }
        }

        let entry = type_checker.scope_mut(scope).declare_function(
            EntryKind::Method,
            &self.name,
            parameters,
            Type::Object,
            false,
            &self.position,
        )?;
        self.c_name = entry.c_name;
        self.klass_c_name = type_checker.scope(scope).klass_c_name.clone();
        self.function_scope = Some(function_scope);

        analyse_body(&mut self.statements, type_checker, function_scope)
    }
    fn rescan_declarations(&mut self, type_checker: &mut TypeChecker, _scope: ScopeId) -> Result<(), Error> {
        let Some(function_scope) = self.function_scope else {
            return Ok(());
        };

        self.arguments.rescan(type_checker, function_scope, true);
        rescan_body(&mut self.statements, type_checker, function_scope)
    }
    fn generate_code(&self, code: &mut CodeWriter, type_checker: &TypeChecker) {
        let Some(function_scope) = self.function_scope else {
            return;
        };
        let expected = self.arguments.len();

        code.write_location(&self.position);
        code.write_func_definition_header("VALUE", &self.c_name, &CodeWriter::method_parameters());
        code.block(|code| {
            code.declare_scope_variables(type_checker.scope(function_scope), &[], "");

            code.write(&format!("if (argc != {}) ", expected));
            code.block(|code| {
                code.write_line(&format!(
                    "rb_raise(rb_eArgError, \"wrong number of arguments (given %d, expected {})\", argc);",
                    expected
                ));
            });
            for (index, argument) in self.arguments.arguments.iter().enumerate() {
                code.write_line(&format!(
                    "{} = {};",
                    argument.c_name,
                    self.unboxed_argument(index, &argument.type_)
                ));
            }

            for statement in &self.statements {
                statement.generate_code(code, type_checker);
            }
            code.write_line("return Qnil;");
        });
        code.new_line();
    }
    fn generate_header_code(&self, section: HeaderSection, code: &mut CodeWriter, type_checker: &TypeChecker) {
        if section == HeaderSection::Prototypes {
            code.write_func_declaration("VALUE", &self.c_name, &CodeWriter::method_parameters());
        }
        for statement in &self.statements {
            statement.generate_header_code(section, code, type_checker);
        }
    }
    fn generate_init_code(&self, code: &mut CodeWriter, _type_checker: &TypeChecker) {
        code.define_instance_method_under(&self.klass_c_name, &self.name, &self.c_name);
    }
}

/// Class Definition
/// `class Name < Ancestor ... end`
#[derive(Debug)]
pub struct ClassDef {
    pub name: String,
    pub ancestor: Option<String>,
    pub statements: Vec<StmtWrapper>,
    pub class_scope: Option<ScopeId>,
    pub c_name: String,
    pub ancestor_c_name: String,
    pub position: Position,
}

impl ClassDef {
    pub fn new(name: &str, ancestor: Option<&str>, statements: Vec<StmtWrapper>, position: Position) -> Self {
        ClassDef {
            name: name.to_string(),
            ancestor: ancestor.map(String::from),
            statements,
            class_scope: None,
            c_name: name.to_string(),
            ancestor_c_name: OBJECT_CLASS_C_NAME.to_string(),
            position,
        }
    }
}

impl Stmt for ClassDef {
    fn get_stmt_type(&self) -> StmtType {
        StmtType::ClassDef
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        self.ancestor_c_name = match self.ancestor.as_deref() {
            None | Some(OBJECT_CLASS) => OBJECT_CLASS_C_NAME.to_string(),
            Some(ancestor) => {
                let entry = type_checker.lookup(scope, ancestor, &self.position)?;
                if entry.kind != EntryKind::Class {
                    return MK_TYPE_MISMATCH!("class", entry.type_, self.position);
                }
                entry.c_name.clone()
            }
        };

        let entry = type_checker.scope_mut(scope).declare_class(&self.name, &self.position)?;
        self.c_name = entry.c_name;

        let class_scope = type_checker.add_class_scope(&self.name, &self.c_name, scope);
        self.class_scope = Some(class_scope);
        analyse_body(&mut self.statements, type_checker, class_scope)
    }
    fn rescan_declarations(&mut self, type_checker: &mut TypeChecker, _scope: ScopeId) -> Result<(), Error> {
        match self.class_scope {
            Some(class_scope) => rescan_body(&mut self.statements, type_checker, class_scope),
            None => Ok(()),
        }
    }
    fn generate_code(&self, code: &mut CodeWriter, type_checker: &TypeChecker) {
        for statement in &self.statements {
            if statement.get_stmt_type().is_definition() {
                statement.generate_code(code, type_checker);
            }
        }
    }
    fn generate_header_code(&self, section: HeaderSection, code: &mut CodeWriter, type_checker: &TypeChecker) {
        if section == HeaderSection::Globals {
            code.write_line(&format!("static VALUE {};", self.c_name));
            if let Some(class_scope) = self.class_scope {
                code.declare_scope_variables(type_checker.scope(class_scope), &[], "static ");
            }
        }
        for statement in &self.statements {
            statement.generate_header_code(section, code, type_checker);
        }
    }
    fn generate_init_code(&self, code: &mut CodeWriter, type_checker: &TypeChecker) {
        code.write_line(&format!(
            "{} = rb_define_class(\"{}\", {});",
            self.c_name, self.name, self.ancestor_c_name
        ));
        for statement in &self.statements {
            if statement.get_stmt_type().is_definition() {
                statement.generate_init_code(code, type_checker);
            } else {
                statement.generate_code(code, type_checker);
            }
        }
    }
}

/// The top-level statement list of one source file.
#[derive(Debug, Default)]
pub struct CompilationUnit {
    pub statements: Vec<StmtWrapper>,
}

impl CompilationUnit {
    pub fn new(statements: Vec<StmtWrapper>) -> Self {
        CompilationUnit { statements }
    }

    pub fn analyse(&mut self, type_checker: &mut TypeChecker) -> Result<(), Error> {
        analyse_body(&mut self.statements, type_checker, TypeChecker::GLOBAL)
    }

    pub fn rescan_declarations(&mut self, type_checker: &mut TypeChecker) -> Result<(), Error> {
        rescan_body(&mut self.statements, type_checker, TypeChecker::GLOBAL)
    }
}
