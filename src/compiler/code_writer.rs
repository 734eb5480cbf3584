//! Append-only buffer for the emitted C source.

use crate::{
    type_checker::scope::{Scope, SymbolEntry, ARG_PREFIX},
    Position,
};

/// Accumulates C source text with indentation tracking.
///
/// Nested constructs are written through `block`, which indents its body and
/// closes the brace itself so every path leaves the indentation balanced.
#[derive(Debug)]
pub struct CodeWriter {
    code: String,
    indent: usize,
    indent_width: usize,
    emit_locations: bool,
    line_start: bool,
}

impl CodeWriter {
    /// Creates a writer whose buffer starts with the generated-file header comment.
    ///
    /// # Arguments
    ///
    /// * `target_name` - Name of the extension being generated
    /// * `indent_width` - Spaces per indentation level
    /// * `emit_locations` - Whether statements are preceded by a `/* file:line */` comment
    pub fn new(target_name: &str, indent_width: usize, emit_locations: bool) -> Self {
        let mut writer = CodeWriter {
            code: String::new(),
            indent: 0,
            indent_width,
            emit_locations,
            line_start: true,
        };
        writer.write_line(&format!("/* C extension for {}.", target_name));
        writer.write_line("This file is generated by extc. Do not change!");
        writer.write_line("*/");

        writer
    }

    /// Appends `text`, indenting it if it starts a new line.
    pub fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.line_start {
            self.code.push_str(&" ".repeat(self.indent * self.indent_width));
            self.line_start = false;
        }
        self.code.push_str(text);
    }

    pub fn new_line(&mut self) {
        self.code.push('\n');
        self.line_start = true;
    }

    pub fn write_line(&mut self, text: &str) {
        self.write(text);
        self.new_line();
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        debug_assert!(self.indent > 0, "cannot dedent, already at column 0");
        self.indent = self.indent.saturating_sub(1);
    }

    pub fn indent_level(&self) -> usize {
        self.indent
    }

    /// Writes `{`, the body produced by `body` one level deeper, then `}`.
    pub fn block<F: FnOnce(&mut CodeWriter)>(&mut self, body: F) {
        self.block_ending("", body);
    }

    /// Like `block`, with `suffix` written after the closing brace (`;` for struct bodies).
    pub fn block_ending<F: FnOnce(&mut CodeWriter)>(&mut self, suffix: &str, body: F) {
        self.write("{");
        self.new_line();
        self.indent();
        body(self);
        self.dedent();
        self.write("}");
        self.write(suffix);
        self.new_line();
    }

    /// Parameter list shared by every host method entry point.
    pub fn method_parameters() -> String {
        format!("int argc, VALUE* argv, VALUE {}self", ARG_PREFIX)
    }

    /// Writes a `static` prototype.
    pub fn write_func_declaration(&mut self, return_type: &str, c_name: &str, parameters: &str) {
        self.write_line(&format!("static {} {}({});", return_type, c_name, parameters));
    }

    /// Writes the signature line of a definition; the body follows through `block`.
    pub fn write_func_definition_header(&mut self, return_type: &str, c_name: &str, parameters: &str) {
        self.write_line(&format!("static {} {}({})", return_type, c_name, parameters));
    }

    /// Declares a storage entry, with its initializer when it has one.
    pub fn declare_variable(&mut self, entry: &SymbolEntry, storage: &str) {
        let declaration = entry.type_.c_declaration(&entry.c_name);
        match &entry.initializer {
            Some(initializer) => self.write_line(&format!("{}{} = {};", storage, declaration, initializer)),
            None => self.write_line(&format!("{}{};", storage, declaration)),
        }
    }

    /// Declares every non-extern storage entry of `scope` except `skip`, then its temporaries.
    pub fn declare_scope_variables(&mut self, scope: &Scope, skip: &[&str], storage: &str) {
        for entry in scope.entries() {
            if entry.kind.is_storage() && !entry.is_extern && !skip.contains(&entry.name.as_str()) {
                self.declare_variable(entry, storage);
            }
        }
        for (c_name, type_) in scope.temps() {
            self.write_line(&format!("{}{};", storage, type_.c_declaration(c_name)));
        }
    }

    pub fn define_instance_method_under(&mut self, klass_c_name: &str, name: &str, c_name: &str) {
        self.write_line(&format!(
            "rb_define_method({}, \"{}\", {}, -1);",
            klass_c_name, name, c_name
        ));
    }

    pub fn write_location(&mut self, position: &Position) {
        if self.emit_locations {
            self.write_line(&format!("/* {} */", position));
        }
    }

    pub fn as_str(&self) -> &str {
        &self.code
    }

    pub fn into_code(self) -> String {
        self.code
    }
}
