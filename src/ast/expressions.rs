use std::any::Any;

use crate::{
    compiler::code_writer::CodeWriter,
    errors::errors::{Error, ErrorImpl},
    type_checker::{
        scope::{EntryKind, ScopeId},
        type_checker::TypeChecker,
    },
    Position, MK_ERROR, MK_TYPE_MISMATCH,
};

use super::{
    ast::{Expr, ExprType, ExprWrapper},
    types::{PrimitiveKind, Type},
};

fn escape_c(text: &str, quote: char) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\r' => escaped.push_str("\\r"),
            '\0' => escaped.push_str("\\0"),
            c if c == quote => {
                escaped.push('\\');
                escaped.push(c);
            }
            c => escaped.push(c),
        }
    }

    escaped
}

// LITERALS

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
    True,
    False,
    Nil,
}

/// Literal Expression
/// Integer and float literals adapt to the numeric type they are assigned to.
#[derive(Debug)]
pub struct LiteralExpr {
    pub value: LiteralValue,
    pub type_: Type,
    pub position: Position,
}

impl LiteralExpr {
    pub fn new(value: LiteralValue, position: Position) -> Self {
        let type_ = LiteralExpr::natural_type(&value);
        LiteralExpr { value, type_, position }
    }

    fn natural_type(value: &LiteralValue) -> Type {
        match value {
            LiteralValue::Int(_) => Type::Primitive(PrimitiveKind::Int),
            LiteralValue::Float(_) => Type::Primitive(PrimitiveKind::Double),
            LiteralValue::Char(_) => Type::Primitive(PrimitiveKind::Char),
            LiteralValue::Str(_) => Type::pointer_to(Type::Primitive(PrimitiveKind::Char), 1),
            LiteralValue::True | LiteralValue::False | LiteralValue::Nil => Type::Object,
        }
    }

    /// The value of an integer literal, used for array dimensions.
    pub fn as_integer(&self) -> Option<i64> {
        match self.value {
            LiteralValue::Int(value) => Some(value),
            _ => None,
        }
    }
}

impl Expr for LiteralExpr {
    fn get_expr_type(&self) -> ExprType {
        ExprType::Literal
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn get_type(&self) -> &Type {
        &self.type_
    }
    fn analyse_statement(&mut self, _type_checker: &mut TypeChecker, _scope: ScopeId) -> Result<(), Error> {
        self.type_ = LiteralExpr::natural_type(&self.value);
        Ok(())
    }
    fn analyse_for_target_type(&mut self, target: &Type, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        self.analyse_statement(type_checker, scope)?;

        match (&self.value, target.unaliased()) {
            (LiteralValue::Int(_), Type::Primitive(kind)) if kind.is_integer() => {
                self.type_ = Type::Primitive(*kind);
            }
            (LiteralValue::Float(_), Type::Primitive(kind)) if kind.is_floating() => {
                self.type_ = Type::Primitive(*kind);
            }
            _ => {}
        }

        Ok(())
    }
    fn c_code(&self) -> String {
        match &self.value {
            LiteralValue::Int(value) => value.to_string(),
            LiteralValue::Float(value) => format!("{:?}", value),
            LiteralValue::Char(value) => format!("'{}'", escape_c(&value.to_string(), '\'')),
            LiteralValue::Str(value) => format!("\"{}\"", escape_c(value, '"')),
            LiteralValue::True => String::from("Qtrue"),
            LiteralValue::False => String::from("Qfalse"),
            LiteralValue::Nil => String::from("Qnil"),
        }
    }
}

// REFERENCES

/// Name Expression
/// A reference to a declared variable, function or class.
#[derive(Debug)]
pub struct NameExpr {
    pub name: String,
    pub c_name: String,
    pub type_: Type,
    pub assignable: bool,
    pub position: Position,
}

impl NameExpr {
    pub fn new(name: &str, position: Position) -> Self {
        NameExpr {
            name: name.to_string(),
            c_name: name.to_string(),
            type_: Type::Primitive(PrimitiveKind::Void),
            assignable: false,
            position,
        }
    }
}

impl Expr for NameExpr {
    fn get_expr_type(&self) -> ExprType {
        ExprType::Name
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn get_type(&self) -> &Type {
        &self.type_
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        let entry = type_checker.lookup(scope, &self.name, &self.position)?;

        self.type_ = match entry.kind {
            // Functions decay to function pointers
            EntryKind::Function | EntryKind::Method => Type::pointer_to(entry.type_.clone(), 1),
            EntryKind::Type | EntryKind::StructOrUnion => {
                return MK_TYPE_MISMATCH!("value", entry.type_, self.position);
            }
            _ => entry.type_.clone(),
        };
        self.c_name = entry.c_name.clone();
        self.assignable = matches!(entry.kind, EntryKind::Variable | EntryKind::Pointer);

        Ok(())
    }
    fn c_code(&self) -> String {
        self.c_name.clone()
    }
    fn is_assignable(&self) -> bool {
        self.assignable
    }
}

/// Element Reference Expression
/// `name[index]` on a native array or pointer.
#[derive(Debug)]
pub struct ElementRefExpr {
    pub name: String,
    pub index: ExprWrapper,
    pub c_name: String,
    pub type_: Type,
    pub position: Position,
}

impl ElementRefExpr {
    pub fn new(name: &str, index: ExprWrapper, position: Position) -> Self {
        ElementRefExpr {
            name: name.to_string(),
            index,
            c_name: name.to_string(),
            type_: Type::Primitive(PrimitiveKind::Void),
            position,
        }
    }
}

impl Expr for ElementRefExpr {
    fn get_expr_type(&self) -> ExprType {
        ExprType::ElementRef
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn get_type(&self) -> &Type {
        &self.type_
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        let entry = type_checker.lookup(scope, &self.name, &self.position)?;
        self.c_name = entry.c_name.clone();
        self.type_ = match entry.type_.unaliased() {
            Type::Array(base, _) => (**base).clone(),
            Type::Pointer(base, depth) => Type::pointer_to((**base).clone(), depth - 1),
            other => return MK_TYPE_MISMATCH!("array or pointer", other, self.position),
        };

        let index_type = Type::Primitive(PrimitiveKind::Long);
        self.index.analyse_for_target_type(&index_type, type_checker, scope)?;
        if self.index.get_type().is_object() {
            self.index.coerce_to(&index_type, &self.position)?;
        }
        if !self.index.get_type().is_integer() {
            return MK_TYPE_MISMATCH!("integer", self.index.get_type(), self.position);
        }

        Ok(())
    }
    fn generate_evaluation_code(&self, code: &mut CodeWriter) {
        self.index.generate_evaluation_code(code);
    }
    fn c_code(&self) -> String {
        format!("{}[{}]", self.c_name, self.index.c_code())
    }
    fn generate_disposal_code(&self, code: &mut CodeWriter) {
        self.index.generate_disposal_code(code);
    }
    fn needs_temp(&self) -> bool {
        self.index.needs_temp()
    }
    fn is_assignable(&self) -> bool {
        true
    }
}

// OPERATIONS

/// Unary Expression
/// `-`, `!`, `~`, `&` and `*`. Negation and complement of objects dispatch to
/// the host runtime through a temporary.
#[derive(Debug)]
pub struct UnaryExpr {
    pub operator: String,
    pub operand: ExprWrapper,
    pub type_: Type,
    pub temp: Option<String>,
    pub position: Position,
}

impl UnaryExpr {
    pub fn new(operator: &str, operand: ExprWrapper, position: Position) -> Self {
        UnaryExpr {
            operator: operator.to_string(),
            operand,
            type_: Type::Primitive(PrimitiveKind::Void),
            temp: None,
            position,
        }
    }

    fn host_method(&self) -> &str {
        match self.operator.as_str() {
            "-" => "-@",
            operator => operator,
        }
    }
}

impl Expr for UnaryExpr {
    fn get_expr_type(&self) -> ExprType {
        ExprType::Unary
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn get_type(&self) -> &Type {
        &self.type_
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        self.operand.analyse_statement(type_checker, scope)?;
        let operand = self.operand.get_type().clone();

        self.type_ = match self.operator.as_str() {
            "-" | "~" if operand.is_object() => {
                self.temp = Some(type_checker.allocate_temp(scope, Type::Object));
                Type::Object
            }
            "-" if operand.is_numeric() => operand.concrete(),
            "~" if operand.is_integer() => operand.concrete(),
            "!" if operand.is_object() => Type::Object,
            "!" if operand.is_numeric() || operand.is_pointer() => Type::Primitive(PrimitiveKind::Int),
            "&" if self.operand.is_assignable() || matches!(operand.unaliased(), Type::Array(..)) => {
                Type::pointer_to(operand.clone(), 1)
            }
            "*" => match operand.unaliased() {
                Type::Pointer(base, depth) => Type::pointer_to((**base).clone(), depth - 1),
                Type::Array(base, _) => (**base).clone(),
                _ => return MK_TYPE_MISMATCH!("pointer", operand, self.position),
            },
            _ => {
                return MK_TYPE_MISMATCH!(
                    format!("operand for unary `{}`", self.operator),
                    operand,
                    self.position
                )
            }
        };

        Ok(())
    }
    fn generate_evaluation_code(&self, code: &mut CodeWriter) {
        self.operand.generate_evaluation_code(code);
        if let Some(temp) = &self.temp {
            code.write_line(&format!(
                "{} = rb_funcall({}, rb_intern(\"{}\"), 0);",
                temp,
                self.operand.c_code(),
                self.host_method()
            ));
            self.operand.generate_disposal_code(code);
        }
    }
    fn c_code(&self) -> String {
        if let Some(temp) = &self.temp {
            return temp.clone();
        }

        if self.operator == "!" && self.type_.is_object() {
            format!("(RTEST({}) ? Qfalse : Qtrue)", self.operand.c_code())
        } else {
            format!("({}{})", self.operator, self.operand.c_code())
        }
    }
    fn generate_disposal_code(&self, code: &mut CodeWriter) {
        match &self.temp {
            Some(temp) => code.write_line(&format!("{} = Qnil;", temp)),
            None => self.operand.generate_disposal_code(code),
        }
    }
    fn needs_temp(&self) -> bool {
        self.temp.is_some() || self.operand.needs_temp()
    }
    fn is_assignable(&self) -> bool {
        self.operator == "*"
    }
}

const ARITHMETIC_OPERATORS: [&str; 5] = ["+", "-", "*", "/", "%"];
const BITWISE_OPERATORS: [&str; 5] = ["&", "|", "^", "<<", ">>"];
const COMPARISON_OPERATORS: [&str; 6] = ["<", "<=", ">", ">=", "==", "!="];
const LOGICAL_OPERATORS: [&str; 2] = ["&&", "||"];

/// Binary Expression
///
/// Native operands compile to the C operator. When either side is an object
/// the other side is boxed and the operation becomes a method call on the left
/// operand, stored in a temporary.
#[derive(Debug)]
pub struct BinaryExpr {
    pub left: ExprWrapper,
    pub operator: String,
    pub right: ExprWrapper,
    pub type_: Type,
    pub temp: Option<String>,
    pub position: Position,
}

impl BinaryExpr {
    pub fn new(left: ExprWrapper, operator: &str, right: ExprWrapper, position: Position) -> Self {
        BinaryExpr {
            left,
            operator: operator.to_string(),
            right,
            type_: Type::Primitive(PrimitiveKind::Void),
            temp: None,
            position,
        }
    }

    fn is_logical(&self) -> bool {
        LOGICAL_OPERATORS.contains(&self.operator.as_str())
    }

    fn analyse_native(&self, left: &Type, right: &Type) -> Result<Type, Error> {
        let operator = self.operator.as_str();
        let int = Type::Primitive(PrimitiveKind::Int);

        if LOGICAL_OPERATORS.contains(&operator) {
            let scalar = |t: &Type| t.is_numeric() || t.is_pointer();
            if scalar(left) && scalar(right) {
                return Ok(int);
            }
        } else if COMPARISON_OPERATORS.contains(&operator) {
            if (left.is_numeric() && right.is_numeric()) || (left.is_pointer() && right.is_pointer()) {
                return Ok(int);
            }
        } else if BITWISE_OPERATORS.contains(&operator) || operator == "%" {
            if left.is_integer() && right.is_integer() {
                return Ok(Type::wider(&left.concrete(), &right.concrete()));
            }
        } else if ARITHMETIC_OPERATORS.contains(&operator) {
            if left.is_numeric() && right.is_numeric() {
                return Ok(Type::wider(&left.concrete(), &right.concrete()));
            }
            if (operator == "+" || operator == "-") && left.is_pointer() && right.is_integer() {
                return Ok(left.concrete());
            }
        }

        MK_TYPE_MISMATCH!(left, right, self.position)
    }
}

impl Expr for BinaryExpr {
    fn get_expr_type(&self) -> ExprType {
        ExprType::Binary
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn get_type(&self) -> &Type {
        &self.type_
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        self.left.analyse_statement(type_checker, scope)?;
        self.right.analyse_statement(type_checker, scope)?;

        if self.left.get_type().is_object() || self.right.get_type().is_object() {
            self.left.coerce_to(&Type::Object, &self.position)?;
            self.right.coerce_to(&Type::Object, &self.position)?;
            if !self.is_logical() {
                self.temp = Some(type_checker.allocate_temp(scope, Type::Object));
            }
            self.type_ = Type::Object;
            return Ok(());
        }

        self.type_ = self.analyse_native(self.left.get_type(), self.right.get_type())?;
        Ok(())
    }
    fn generate_evaluation_code(&self, code: &mut CodeWriter) {
        self.left.generate_evaluation_code(code);
        self.right.generate_evaluation_code(code);

        if let Some(temp) = &self.temp {
            code.write_line(&format!(
                "{} = rb_funcall({}, rb_intern(\"{}\"), 1, {});",
                temp,
                self.left.c_code(),
                self.operator,
                self.right.c_code()
            ));
            self.left.generate_disposal_code(code);
            self.right.generate_disposal_code(code);
        }
    }
    fn c_code(&self) -> String {
        if let Some(temp) = &self.temp {
            return temp.clone();
        }

        if self.type_.is_object() {
            format!(
                "((RTEST({}) {} RTEST({})) ? Qtrue : Qfalse)",
                self.left.c_code(),
                self.operator,
                self.right.c_code()
            )
        } else {
            format!("({} {} {})", self.left.c_code(), self.operator, self.right.c_code())
        }
    }
    fn generate_disposal_code(&self, code: &mut CodeWriter) {
        match &self.temp {
            Some(temp) => code.write_line(&format!("{} = Qnil;", temp)),
            None => {
                self.left.generate_disposal_code(code);
                self.right.generate_disposal_code(code);
            }
        }
    }
    fn needs_temp(&self) -> bool {
        self.temp.is_some() || self.left.needs_temp() || self.right.needs_temp()
    }
}

/// Call Expression
/// A call to a C function or through a function pointer.
#[derive(Debug)]
pub struct CallExpr {
    pub name: String,
    pub arguments: Vec<ExprWrapper>,
    pub c_name: String,
    pub type_: Type,
    pub position: Position,
}

impl CallExpr {
    pub fn new(name: &str, arguments: Vec<ExprWrapper>, position: Position) -> Self {
        CallExpr {
            name: name.to_string(),
            arguments,
            c_name: name.to_string(),
            type_: Type::Primitive(PrimitiveKind::Void),
            position,
        }
    }
}

impl Expr for CallExpr {
    fn get_expr_type(&self) -> ExprType {
        ExprType::Call
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn get_position(&self) -> &Position {
        &self.position
    }
    fn get_type(&self) -> &Type {
        &self.type_
    }
    fn analyse_statement(&mut self, type_checker: &mut TypeChecker, scope: ScopeId) -> Result<(), Error> {
        let entry = type_checker.lookup(scope, &self.name, &self.position)?;
        let function = match (entry.kind, entry.type_.unaliased()) {
            (EntryKind::Function, Type::Function(function)) => function.clone(),
            (EntryKind::Variable | EntryKind::Pointer, Type::Pointer(base, 1)) => match base.unaliased() {
                Type::Function(function) => function.clone(),
                _ => {
                    return MK_ERROR!(
                        ErrorImpl::NotCallable {
                            identifier: self.name.clone()
                        },
                        self.position
                    )
                }
            },
            _ => {
                return MK_ERROR!(
                    ErrorImpl::NotCallable {
                        identifier: self.name.clone()
                    },
                    self.position
                )
            }
        };
        self.c_name = entry.c_name.clone();

        let expected = function.parameters.len();
        let received = self.arguments.len();
        if received > expected {
            return MK_ERROR!(ErrorImpl::UnexpectedArguments { expected, received }, self.position);
        }
        if received < expected {
            return MK_ERROR!(ErrorImpl::MissingArguments { expected, received }, self.position);
        }

        for (argument, parameter) in self.arguments.iter_mut().zip(function.parameters.iter()) {
            argument.analyse_for_target_type(parameter, type_checker, scope)?;
            argument.coerce_to(parameter, &self.position)?;
        }
        self.type_ = (*function.return_type).clone();

        Ok(())
    }
    fn generate_evaluation_code(&self, code: &mut CodeWriter) {
        for argument in &self.arguments {
            argument.generate_evaluation_code(code);
        }
    }
    fn c_code(&self) -> String {
        format!(
            "{}({})",
            self.c_name,
            self.arguments
                .iter()
                .map(|argument| argument.c_code())
                .collect::<Vec<String>>()
                .join(", ")
        )
    }
    fn generate_disposal_code(&self, code: &mut CodeWriter) {
        for argument in &self.arguments {
            argument.generate_disposal_code(code);
        }
    }
    fn needs_temp(&self) -> bool {
        self.arguments.iter().any(|argument| argument.needs_temp())
    }
}
