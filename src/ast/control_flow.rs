use std::any::Any;

use crate::{
    compiler::code_writer::CodeWriter,
    errors::errors::{Error, ErrorImpl},
    type_checker::{scope::ScopeId, type_checker::TypeChecker},
    Position, MK_ERROR, MK_TYPE_MISMATCH,
};

use super::{
    ast::{analyse_body, condition_code, rescan_body, Expr, ExprWrapper, Stmt, StmtType, StmtWrapper},
    types::Type,
};

fn generate_body(statements: &[StmtWrapper], code: &mut CodeWriter, type_checker: &TypeChecker) {
    for statement in statements {
        statement.generate_code(code, type_checker);
    }
}

fn analyse_condition(condition: &mut ExprWrapper, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
    condition.analyse_statement(type_checker, scope)?;

    let type_ = condition.get_type();
    if type_.is_object() || type_.is_numeric() || type_.is_pointer() {
        Ok(())
    } else {
        MK_TYPE_MISMATCH!("condition", type_, condition.get_position())
    }
}

/// If Statement
///
/// `if`, `elsif` and `else` share this node: an optional condition, a body and
/// the next branch of the chain. A branch without a condition is an `else`.
#[derive(Debug)]
pub struct IfBlock {
    pub condition: Option<ExprWrapper>,
    pub statements: Vec<StmtWrapper>,
    pub if_tail: Option<Box<IfBlock>>,
    pub position: Position,
}

impl IfBlock {
    pub fn new(condition: ExprWrapper, statements: Vec<StmtWrapper>, if_tail: Option<IfBlock>, position: Position) -> Self {
        IfBlock {
            condition: Some(condition),
            statements,
            if_tail: if_tail.map(Box::new),
            position,
        }
    }

    pub fn otherwise(statements: Vec<StmtWrapper>, position: Position) -> Self {
        IfBlock {
            condition: None,
            statements,
            if_tail: None,
            position,
        }
    }

    fn condition_needs_temp(&self) -> bool {
        self.condition.as_ref().is_some_and(|condition| condition.needs_temp())
    }

    /// Emits this branch and the rest of the chain.
    ///
    /// The condition is disposed at the start of the taken body and again on
    /// the fall-through path. When that disposal or the next condition's
    /// evaluation emits code, the tail is nested in a plain `else` block.
    fn generate_branch(&self, code: &mut CodeWriter, type_checker: &TypeChecker) {
        let Some(condition) = &self.condition else {
            code.block(|code| generate_body(&self.statements, code, type_checker));
            return;
        };

        condition.generate_evaluation_code(code);
        code.write(&format!("if ({}) ", condition_code(condition)));
        code.block(|code| {
            condition.generate_disposal_code(code);
            generate_body(&self.statements, code, type_checker);
        });

        match &self.if_tail {
            Some(tail) if condition.needs_temp() || tail.condition_needs_temp() => {
                code.write("else ");
                code.block(|code| {
                    condition.generate_disposal_code(code);
                    tail.generate_branch(code, type_checker);
                });
            }
            Some(tail) => {
                code.write("else ");
                tail.generate_branch(code, type_checker);
            }
            None if condition.needs_temp() => {
                code.write("else ");
                code.block(|code| condition.generate_disposal_code(code));
            }
            None => {}
        }
    }
}

impl Stmt for IfBlock {
    fn get_stmt_type(&self) -> StmtType {
        StmtType::If
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        if let Some(condition) = self.condition.as_mut() {
            analyse_condition(condition, type_checker, scope)?;
        }
        analyse_body(&mut self.statements, type_checker, scope)?;

        match self.if_tail.as_mut() {
            Some(tail) => tail.analyse_statement(type_checker, scope),
            None => Ok(()),
        }
    }
    fn rescan_declarations(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        rescan_body(&mut self.statements, type_checker, scope)?;

        match self.if_tail.as_mut() {
            Some(tail) => tail.rescan_declarations(type_checker, scope),
            None => Ok(()),
        }
    }
    fn generate_code(&self, code: &mut CodeWriter, type_checker: &TypeChecker) {
        code.write_location(&self.position);
        self.generate_branch(code, type_checker);
    }
}

/// For Loop
/// `for left <op> counter <op> right do ... end`
#[derive(Debug)]
pub struct For {
    pub left: ExprWrapper,
    pub left_operator: String,
    pub counter: String,
    pub right_operator: String,
    pub right: ExprWrapper,
    pub statements: Vec<StmtWrapper>,
    pub counter_c_name: String,
    pub position: Position,
}

impl For {
    pub fn new(
        left: ExprWrapper,
        left_operator: &str,
        counter: &str,
        right_operator: &str,
        right: ExprWrapper,
        statements: Vec<StmtWrapper>,
        position: Position,
    ) -> Self {
        For {
            left,
            left_operator: left_operator.to_string(),
            counter: counter.to_string(),
            right_operator: right_operator.to_string(),
            right,
            statements,
            counter_c_name: counter.to_string(),
            position,
        }
    }

    fn ascending(operator: &str) -> Option<bool> {
        match operator {
            "<" | "<=" => Some(true),
            ">" | ">=" => Some(false),
            _ => None,
        }
    }

    fn start_code(&self) -> String {
        match self.left_operator.as_str() {
            "<" => format!("{} + 1", self.left.c_code()),
            ">" => format!("{} - 1", self.left.c_code()),
            _ => self.left.c_code(),
        }
    }

    fn step_code(&self) -> &'static str {
        match For::ascending(&self.right_operator) {
            Some(false) => "--",
            _ => "++",
        }
    }
}

impl Stmt for For {
    fn get_stmt_type(&self) -> StmtType {
        StmtType::For
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        match (For::ascending(&self.left_operator), For::ascending(&self.right_operator)) {
            (Some(left), Some(right)) if left == right => {}
            _ => {
                return MK_ERROR!(
                    ErrorImpl::InvalidLoopOperators {
                        left: self.left_operator.clone(),
                        right: self.right_operator.clone()
                    },
                    self.position
                )
            }
        }

        let counter = type_checker.lookup(scope, &self.counter, &self.position)?;
        if !counter.type_.is_integer() {
            return MK_TYPE_MISMATCH!("integer", counter.type_, self.position);
        }
        let counter_type: Type = counter.type_.clone();
        self.counter_c_name = counter.c_name.clone();

        for bound in [&mut self.left, &mut self.right] {
            bound.analyse_for_target_type(&counter_type, type_checker, scope)?;
            bound.coerce_to(&counter_type, &self.position)?;
        }

        analyse_body(&mut self.statements, type_checker, scope)
    }
    fn rescan_declarations(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        rescan_body(&mut self.statements, type_checker, scope)
    }
    fn generate_code(&self, code: &mut CodeWriter, type_checker: &TypeChecker) {
        code.write_location(&self.position);
        self.left.generate_evaluation_code(code);
        self.right.generate_evaluation_code(code);

        code.write(&format!(
            "for ({counter} = {start}; {counter} {operator} {end}; {counter}{step}) ",
            counter = self.counter_c_name,
            start = self.start_code(),
            operator = self.right_operator,
            end = self.right.c_code(),
            step = self.step_code(),
        ));
        code.block(|code| generate_body(&self.statements, code, type_checker));

        self.left.generate_disposal_code(code);
        self.right.generate_disposal_code(code);
    }
}

/// While Loop
#[derive(Debug)]
pub struct While {
    pub condition: ExprWrapper,
    pub statements: Vec<StmtWrapper>,
    pub position: Position,
}

impl While {
    pub fn new(condition: ExprWrapper, statements: Vec<StmtWrapper>, position: Position) -> Self {
        While {
            condition,
            statements,
            position,
        }
    }
}

impl Stmt for While {
    fn get_stmt_type(&self) -> StmtType {
        StmtType::While
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        analyse_condition(&mut self.condition, type_checker, scope)?;
        analyse_body(&mut self.statements, type_checker, scope)
    }
    fn rescan_declarations(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        rescan_body(&mut self.statements, type_checker, scope)
    }
    fn generate_code(&self, code: &mut CodeWriter, type_checker: &TypeChecker) {
        code.write_location(&self.position);

        if !self.condition.needs_temp() {
            code.write(&format!("while ({}) ", condition_code(&self.condition)));
            code.block(|code| generate_body(&self.statements, code, type_checker));
            return;
        }

        // The condition is re-evaluated at the top of every iteration
        code.write("while (1) ");
        code.block(|code| {
            self.condition.generate_evaluation_code(code);
            code.write(&format!("if (!({})) ", condition_code(&self.condition)));
            code.block(|code| {
                self.condition.generate_disposal_code(code);
                code.write_line("break;");
            });
            self.condition.generate_disposal_code(code);
            generate_body(&self.statements, code, type_checker);
        });
    }
}
