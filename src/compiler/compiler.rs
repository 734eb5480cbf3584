//! Compilation driver.
//!
//! Runs the declaration passes over a compilation unit and lays out the
//! emitted C file: header comment, includes, type section, globals,
//! prototypes, function definitions and the extension's init function.

use std::time::Instant;

use log::info;

use crate::{
    ast::{
        ast::{HeaderSection, Stmt},
        definitions::CompilationUnit,
    },
    errors::errors::Error,
    type_checker::{
        context::CompilationContext,
        type_checker::{type_check, TypeChecker},
    },
};

use super::code_writer::CodeWriter;

/// Headers every extension includes.
const STANDARD_INCLUDES: [&str; 3] = ["ruby.h", "stdint.h", "stdio.h"];

/// Settings for one compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Extension name; the init function is `Init_<target_name>`.
    pub target_name: String,
    pub indent_width: usize,
    /// Precede each emitted statement with a `/* file:line */` comment.
    pub emit_locations: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            target_name: String::from("extension"),
            indent_width: 2,
            emit_locations: false,
        }
    }
}

/// Result of a successful compilation.
#[derive(Debug)]
pub struct CompiledUnit {
    pub code: String,
    pub type_checker: TypeChecker,
}

/// Emits the C source for an analysed unit.
///
/// # Arguments
///
/// * `unit` - The compilation unit, after both declaration passes
/// * `type_checker` - The scopes and types produced by those passes
/// * `options` - Output settings
pub fn generate(unit: &CompilationUnit, type_checker: &TypeChecker, options: &CompileOptions) -> String {
    let mut code = CodeWriter::new(&options.target_name, options.indent_width, options.emit_locations);

    for header in STANDARD_INCLUDES {
        code.write_line(&format!("#include <{}>", header));
    }
    for section in HeaderSection::ALL {
        let written = code.as_str().len();
        if section == HeaderSection::Globals {
            code.declare_scope_variables(type_checker.scope(TypeChecker::GLOBAL), &[], "static ");
        }
        for statement in &unit.statements {
            statement.generate_header_code(section, &mut code, type_checker);
        }
        if code.as_str().len() > written || section == HeaderSection::Includes {
            code.new_line();
        }
    }

    for statement in &unit.statements {
        if statement.get_stmt_type().is_definition() {
            statement.generate_code(&mut code, type_checker);
        }
    }

    code.write_line(&format!("void Init_{}(void)", options.target_name));
    code.block(|code| {
        for statement in &unit.statements {
            if statement.get_stmt_type().is_definition() {
                statement.generate_init_code(code, type_checker);
            } else {
                statement.generate_code(code, type_checker);
            }
        }
    });

    code.into_code()
}

/// Type checks `unit` and generates its C source.
///
/// `context` must be the context the unit's forward declarations and
/// aliases were constructed against.
pub fn compile(
    mut unit: CompilationUnit,
    context: CompilationContext,
    options: &CompileOptions,
) -> Result<CompiledUnit, Error> {
    let start = Instant::now();

    let type_checker = type_check(&mut unit, context)?;
    info!("Type checked in {:?}", start.elapsed());

    let generate_start = Instant::now();
    let code = generate(&unit, &type_checker, options);
    info!("Generated C in {:?}", generate_start.elapsed());
    info!("Total time: {:?}", start.elapsed());

    Ok(CompiledUnit { code, type_checker })
}
