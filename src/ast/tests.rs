//! Unit tests for the type system and the AST nodes.
//!
//! Covers type resolution and `can_hold`, box/unbox conversions, literal
//! adaptation, per-node analysis errors and the code each node emits.

use std::rc::Rc;

use crate::{
    ast::{
        ast::{Expr, ExprWrapper, Stmt, StmtWrapper},
        control_flow::{For, IfBlock, While},
        declarations::{Alias, ArgDeclaration, ArgumentList, CFunctionDecl, StructOrUnionDecl},
        definitions::CFunctionDef,
        expressions::{BinaryExpr, CallExpr, ElementRefExpr, LiteralExpr, LiteralValue, NameExpr, UnaryExpr},
        statements::{ArrayDecl, Assign, ExpressionStmt, Print, PtrDecl, Return, VarDecl},
        types::{AggregateKind, Conversion, FunctionType, PrimitiveKind, Type, TypeDescriptor},
    },
    compiler::code_writer::CodeWriter,
    type_checker::{context::CompilationContext, scope::ScopeId, type_checker::TypeChecker},
    Position,
};

fn pos(line: u32) -> Position {
    Position(line, Rc::new("test.rbx".to_string()))
}

fn named(name: &str) -> TypeDescriptor {
    TypeDescriptor::named(name)
}

fn int() -> Type {
    Type::Primitive(PrimitiveKind::Int)
}

fn lit(value: LiteralValue) -> ExprWrapper {
    ExprWrapper::new(LiteralExpr::new(value, pos(1)))
}

fn int_lit(value: i64) -> ExprWrapper {
    lit(LiteralValue::Int(value))
}

fn name(identifier: &str) -> ExprWrapper {
    ExprWrapper::new(NameExpr::new(identifier, pos(1)))
}

fn checker() -> TypeChecker {
    TypeChecker::new(CompilationContext::new())
}

fn declare(checker: &mut TypeChecker, identifier: &str, type_: Type) {
    checker
        .scope_mut(TypeChecker::GLOBAL)
        .declare_var(identifier, type_, false, &pos(1))
        .unwrap();
}

fn emitted(statement: &dyn Stmt, checker: &TypeChecker) -> String {
    let mut code = CodeWriter::new("test", 2, false);
    let header = code.as_str().len();
    statement.generate_code(&mut code, checker);

    code.as_str()[header..].to_string()
}

const GLOBAL: ScopeId = TypeChecker::GLOBAL;

// TYPE SYSTEM

#[test]
fn test_resolve_primitives_and_object() {
    let context = CompilationContext::new();

    assert_eq!(Type::resolve(&named("int"), 0, &context), int());
    assert_eq!(
        Type::resolve(&named("unsigned   long int"), 0, &context),
        Type::Primitive(PrimitiveKind::ULong)
    );
    assert_eq!(Type::resolve(&named("f64"), 0, &context), Type::Primitive(PrimitiveKind::Double));
    assert_eq!(Type::resolve(&named("object"), 0, &context), Type::Object);
    assert_eq!(Type::resolve(&named("char"), 2, &context), Type::pointer_to(Type::Primitive(PrimitiveKind::Char), 2));
}

#[test]
fn test_resolve_unknown_names_are_unresolved() {
    let context = CompilationContext::new();

    assert_eq!(
        Type::resolve(&named("struct node"), 1, &context),
        Type::Pointer(Box::new(Type::Unresolved("node".to_string())), 1)
    );
}

#[test]
fn test_resolve_registered_name() {
    let mut context = CompilationContext::new();
    context.register("meters", Type::Primitive(PrimitiveKind::Double), pos(1));

    assert_eq!(
        Type::resolve(&named("meters"), 0, &context),
        Type::Primitive(PrimitiveKind::Double)
    );
}

#[test]
fn test_pointer_depths_merge() {
    let pointer = Type::pointer_to(Type::pointer_to(int(), 1), 2);
    assert_eq!(pointer, Type::Pointer(Box::new(int()), 3));
    assert_eq!(Type::pointer_to(int(), 0), int());
}

#[test]
fn test_resolve_function_pointer_signature() {
    let context = CompilationContext::new();
    let descriptor = TypeDescriptor::Signature {
        base: "int".to_string(),
        parameters: vec![(named("int"), 0), (named("char"), 1)],
        return_pointer_depth: 0,
    };

    let resolved = Type::resolve(&descriptor, 0, &context);
    match &resolved {
        Type::Pointer(base, 1) => match &**base {
            Type::Function(function) => {
                assert_eq!(function.parameters.len(), 2);
                assert_eq!(*function.return_type, int());
            }
            other => panic!("expected function, found {:?}", other),
        },
        other => panic!("expected function pointer, found {:?}", other),
    }
    assert_eq!(resolved.c_declaration("cb"), "int (*cb)(int, char*)");
}

#[test]
fn test_can_hold_numeric_ranks() {
    let char_ = Type::Primitive(PrimitiveKind::Char);
    let long = Type::Primitive(PrimitiveKind::Long);
    let double = Type::Primitive(PrimitiveKind::Double);
    let void = Type::Primitive(PrimitiveKind::Void);

    assert!(int().can_hold(&char_));
    assert!(int().can_hold(&Type::Primitive(PrimitiveKind::UInt8)));
    assert!(!int().can_hold(&long));
    assert!(!int().can_hold(&double));
    assert!(double.can_hold(&long));
    assert!(!void.can_hold(&void));
    assert!(!int().can_hold(&void));
}

#[test]
fn test_can_hold_pointers_and_arrays() {
    let int_ptr = Type::pointer_to(int(), 1);
    let void_ptr = Type::pointer_to(Type::Primitive(PrimitiveKind::Void), 1);

    assert!(void_ptr.can_hold(&int_ptr));
    assert!(!void_ptr.can_hold(&Type::pointer_to(int(), 2)));
    assert!(int_ptr.can_hold(&Type::Array(Box::new(int()), 3)));
    assert!(!Type::pointer_to(int(), 2).can_hold(&int_ptr));
    assert!(!int_ptr.can_hold(&Type::pointer_to(Type::Primitive(PrimitiveKind::Double), 1)));
    assert!(!Type::Array(Box::new(int()), 3).can_hold(&Type::Array(Box::new(int()), 4)));
}

#[test]
fn test_can_hold_unwraps_aliases() {
    let alias = Type::TypeDef {
        name: "number".to_string(),
        c_name: "__extc_t_Object_number".to_string(),
        target: Box::new(Type::Primitive(PrimitiveKind::Long)),
    };

    assert!(alias.can_hold(&int()));
    assert!(Type::Primitive(PrimitiveKind::LongLong).can_hold(&alias));
    assert!(alias.is_same_as(&Type::Primitive(PrimitiveKind::Long)));
}

#[test]
fn test_can_hold_structs_objects_and_placeholders() {
    let point = Type::StructOrUnion {
        kind: AggregateKind::Struct,
        name: "point".to_string(),
        c_name: "__extc_t_Object_point".to_string(),
        scope: ScopeId(1),
    };
    let pair = Type::StructOrUnion {
        kind: AggregateKind::Struct,
        name: "pair".to_string(),
        c_name: "__extc_t_Object_pair".to_string(),
        scope: ScopeId(2),
    };

    assert!(point.can_hold(&point.clone()));
    assert!(!point.can_hold(&pair));
    assert!(Type::Object.can_hold(&Type::Object));
    assert!(!Type::Object.can_hold(&int()));
    assert!(!int().can_hold(&Type::Object));

    let pending = Type::Unresolved("node".to_string());
    assert!(pending.can_hold(&pending.clone()));
    assert!(!pending.can_hold(&Type::Unresolved("leaf".to_string())));
    assert!(!pending.can_hold(&point));
    assert!(Type::pointer_to(pending.clone(), 1).can_hold(&Type::pointer_to(pending, 1)));
}

#[test]
fn test_can_hold_functions_by_signature() {
    let function = |parameter: Type| {
        Type::Function(FunctionType {
            name: None,
            c_name: None,
            parameters: vec![parameter],
            return_type: Box::new(int()),
        })
    };

    assert!(function(int()).can_hold(&function(int())));
    assert!(!function(int()).can_hold(&function(Type::Object)));
}

#[test]
fn test_rescan_replaces_nested_placeholders() {
    let mut context = CompilationContext::new();
    context.register("meters", Type::Primitive(PrimitiveKind::Double), pos(1));

    let pending = Type::Array(Box::new(Type::pointer_to(Type::Unresolved("meters".to_string()), 1)), 4);
    assert_eq!(pending.find_unresolved(), Some("meters"));

    let resolved = pending.rescan(&context);
    assert_eq!(resolved.find_unresolved(), None);
    assert_eq!(
        resolved,
        Type::Array(Box::new(Type::pointer_to(Type::Primitive(PrimitiveKind::Double), 1)), 4)
    );
}

#[test]
fn test_c_declarations() {
    assert_eq!(Type::Array(Box::new(int()), 3).c_declaration("a"), "int a[3]");
    assert_eq!(
        Type::pointer_to(Type::Primitive(PrimitiveKind::Char), 1).c_declaration("s"),
        "char *s"
    );
    assert_eq!(Type::Object.c_declaration("o"), "VALUE o");
    assert_eq!(Type::Primitive(PrimitiveKind::UInt64).c_type(), "uint64_t");
}

#[test]
fn test_conversions() {
    let c_string = Type::pointer_to(Type::Primitive(PrimitiveKind::Char), 1);

    assert_eq!(
        Conversion::between(&int(), &Type::Object),
        Ok(Some(Conversion::ToObject { function: "INT2NUM" }))
    );
    assert_eq!(
        Conversion::between(&Type::Object, &Type::Primitive(PrimitiveKind::Double)),
        Ok(Some(Conversion::FromObject {
            function: "NUM2DBL",
            target: Type::Primitive(PrimitiveKind::Double)
        }))
    );
    assert_eq!(
        Conversion::between(&c_string, &Type::Object),
        Ok(Some(Conversion::ToObject { function: "rb_str_new2" }))
    );
    assert_eq!(Conversion::between(&Type::Object, &Type::Object), Ok(None));
    assert_eq!(Conversion::between(&int(), &Type::Primitive(PrimitiveKind::Long)), Ok(None));
    assert!(Conversion::between(&Type::pointer_to(int(), 1), &Type::Object).is_err());

    let conversion = Conversion::ToObject { function: "LONG2NUM" };
    assert_eq!(conversion.apply("x"), "LONG2NUM(x)");
    assert_eq!(conversion.result_type(), Type::Object);
}

// LITERALS AND CONVERSIONS

#[test]
fn test_literal_rendering() {
    assert_eq!(lit(LiteralValue::Float(2.5)).c_code(), "2.5");
    assert_eq!(lit(LiteralValue::Float(3.0)).c_code(), "3.0");
    assert_eq!(lit(LiteralValue::Char('\'')).c_code(), "'\\''");
    assert_eq!(lit(LiteralValue::Str("say \"hi\"\n".to_string())).c_code(), "\"say \\\"hi\\\"\\n\"");
    assert_eq!(lit(LiteralValue::Nil).c_code(), "Qnil");
    assert!(lit(LiteralValue::True).get_type().is_object());
}

#[test]
fn test_integer_literal_adapts_to_target() {
    let mut checker = checker();
    let mut decl = VarDecl::new(named("unsigned long"), "n", Some(int_lit(7)), pos(1));
    decl.analyse_statement(&mut checker, GLOBAL).unwrap();

    let value = decl.value.as_ref().unwrap();
    assert_eq!(*value.get_type(), Type::Primitive(PrimitiveKind::ULong));
    assert!(value.conversion().is_none());
}

#[test]
fn test_float_literal_does_not_fit_integer() {
    let mut checker = checker();
    let mut decl = VarDecl::new(named("int"), "n", Some(lit(LiteralValue::Float(1.5))), pos(4));

    let error = decl.analyse_statement(&mut checker, GLOBAL).unwrap_err();
    assert_eq!(error.get_error_name(), "TypeMismatch");
    assert_eq!(error.get_position().0, 4);
}

#[test]
fn test_initializer_unboxes_object() {
    let mut checker = checker();
    declare(&mut checker, "o", Type::Object);

    let mut decl = VarDecl::new(named("int"), "x", Some(name("o")), pos(2));
    decl.analyse_statement(&mut checker, GLOBAL).unwrap();

    assert_eq!(decl.c_name, "__extc_v_x");
    assert_eq!(emitted(&decl, &checker), "__extc_v_x = NUM2INT(__extc_v_o);\n");
}

#[test]
fn test_initializer_boxes_native_value() {
    let mut checker = checker();
    let mut decl = VarDecl::new(named("object"), "o", Some(lit(LiteralValue::Float(2.5))), pos(1));
    decl.analyse_statement(&mut checker, GLOBAL).unwrap();

    assert_eq!(emitted(&decl, &checker), "__extc_v_o = DBL2NUM(2.5);\n");
}

#[test]
fn test_struct_cannot_be_boxed() {
    let mut checker = checker();
    let mut unit_struct = StructOrUnionDecl::new(AggregateKind::Struct, "point", vec![], pos(1));
    unit_struct.analyse_statement(&mut checker, GLOBAL).unwrap();
    let mut p = VarDecl::new(named("point"), "p", None, pos(2));
    p.analyse_statement(&mut checker, GLOBAL).unwrap();

    let mut decl = VarDecl::new(named("object"), "o", Some(name("p")), pos(3));
    let error = decl.analyse_statement(&mut checker, GLOBAL).unwrap_err();
    assert_eq!(error.get_error_name(), "TypeMismatch");
}

#[test]
fn test_variable_cannot_initialise_itself() {
    let mut checker = checker();
    let mut decl = VarDecl::new(named("int"), "x", Some(name("x")), pos(1));

    let error = decl.analyse_statement(&mut checker, GLOBAL).unwrap_err();
    assert_eq!(error.get_error_name(), "UnknownIdentifier");
}

// ARRAYS

#[test]
fn test_array_initializer_is_stored_on_entry() {
    let mut checker = checker();
    let mut decl = ArrayDecl::new(
        named("int"),
        "a",
        int_lit(3),
        Some(vec![int_lit(1), int_lit(2), int_lit(3)]),
        pos(1),
    );
    decl.analyse_statement(&mut checker, GLOBAL).unwrap();

    let entry = checker.scope(GLOBAL).get("a").unwrap();
    assert_eq!(entry.c_name, "__extc_arr_a");
    assert_eq!(entry.initializer.as_deref(), Some("{1, 2, 3}"));
    assert_eq!(emitted(&decl, &checker), "");
}

#[test]
fn test_array_with_variable_element_assigns_in_place() {
    let mut checker = checker();
    declare(&mut checker, "x", int());
    let mut decl = ArrayDecl::new(named("int"), "a", int_lit(2), Some(vec![name("x"), int_lit(4)]), pos(1));
    decl.analyse_statement(&mut checker, GLOBAL).unwrap();

    let entry = checker.scope(GLOBAL).get("a").unwrap();
    assert_eq!(entry.initializer, None);
    assert_eq!(
        emitted(&decl, &checker),
        "__extc_arr_a[0] = __extc_v_x;\n__extc_arr_a[1] = 4;\n"
    );
}

#[test]
fn test_object_array_boxes_its_elements() {
    let mut checker = checker();
    let mut decl = ArrayDecl::new(named("object"), "a", int_lit(2), Some(vec![int_lit(1), int_lit(2)]), pos(1));
    decl.analyse_statement(&mut checker, GLOBAL).unwrap();

    assert_eq!(checker.scope(GLOBAL).get("a").unwrap().initializer, None);
    assert_eq!(
        emitted(&decl, &checker),
        "__extc_arr_a[0] = INT2NUM(1);\n__extc_arr_a[1] = INT2NUM(2);\n"
    );
}

#[test]
fn test_array_dimension_must_be_literal() {
    let mut checker = checker();
    declare(&mut checker, "n", int());

    let mut decl = ArrayDecl::new(named("int"), "a", name("n"), None, pos(6));
    let error = decl.analyse_statement(&mut checker, GLOBAL).unwrap_err();
    assert_eq!(error.get_error_name(), "NonConstantDimension");
}

#[test]
fn test_array_rejects_too_many_elements() {
    let mut checker = checker();
    let mut decl = ArrayDecl::new(named("int"), "a", int_lit(2), Some(vec![int_lit(1), int_lit(2), int_lit(3)]), pos(1));

    let error = decl.analyse_statement(&mut checker, GLOBAL).unwrap_err();
    assert_eq!(error.get_error_name(), "TypeMismatch");
}

// EXPRESSIONS

#[test]
fn test_element_reference() {
    let mut checker = checker();
    let mut decl = ArrayDecl::new(named("double"), "values", int_lit(4), None, pos(1));
    decl.analyse_statement(&mut checker, GLOBAL).unwrap();

    let mut element = ElementRefExpr::new("values", int_lit(2), pos(2));
    element.analyse_statement(&mut checker, GLOBAL).unwrap();

    assert_eq!(*element.get_type(), Type::Primitive(PrimitiveKind::Double));
    assert_eq!(element.c_code(), "__extc_arr_values[2]");
    assert!(element.is_assignable());
}

#[test]
fn test_element_reference_needs_array_or_pointer() {
    let mut checker = checker();
    declare(&mut checker, "n", int());

    let mut element = ElementRefExpr::new("n", int_lit(0), pos(2));
    let error = element.analyse_statement(&mut checker, GLOBAL).unwrap_err();
    assert_eq!(error.get_error_name(), "TypeMismatch");
}

#[test]
fn test_native_binary_widens() {
    let mut checker = checker();
    declare(&mut checker, "i", int());
    declare(&mut checker, "d", Type::Primitive(PrimitiveKind::Double));

    let mut sum = BinaryExpr::new(name("i"), "+", name("d"), pos(1));
    sum.analyse_statement(&mut checker, GLOBAL).unwrap();
    assert_eq!(*sum.get_type(), Type::Primitive(PrimitiveKind::Double));
    assert_eq!(sum.c_code(), "(__extc_v_i + __extc_v_d)");
    assert!(!sum.needs_temp());

    let mut comparison = BinaryExpr::new(name("d"), "<", name("i"), pos(1));
    comparison.analyse_statement(&mut checker, GLOBAL).unwrap();
    assert_eq!(*comparison.get_type(), int());
}

#[test]
fn test_modulo_requires_integers() {
    let mut checker = checker();
    declare(&mut checker, "d", Type::Primitive(PrimitiveKind::Double));

    let mut expression = BinaryExpr::new(name("d"), "%", int_lit(2), pos(1));
    let error = expression.analyse_statement(&mut checker, GLOBAL).unwrap_err();
    assert_eq!(error.get_error_name(), "TypeMismatch");
}

#[test]
fn test_object_binary_uses_temporary() {
    let mut checker = checker();
    declare(&mut checker, "o", Type::Object);

    let mut expression = ExprWrapper::new(BinaryExpr::new(name("o"), "+", int_lit(1), pos(1)));
    expression.analyse_statement(&mut checker, GLOBAL).unwrap();

    assert!(expression.get_type().is_object());
    assert!(expression.needs_temp());
    assert_eq!(checker.scope(GLOBAL).temps().len(), 1);

    let statement = ExpressionStmt::new(expression, pos(1));
    assert_eq!(
        emitted(&statement, &checker),
        "__extc_tmp_0 = rb_funcall(__extc_v_o, rb_intern(\"+\"), 1, INT2NUM(1));\n\
         __extc_tmp_0;\n\
         __extc_tmp_0 = Qnil;\n"
    );
}

#[test]
fn test_object_logical_operators_test_truthiness() {
    let mut checker = checker();
    declare(&mut checker, "a", Type::Object);
    declare(&mut checker, "b", Type::Object);

    let mut expression = BinaryExpr::new(name("a"), "&&", name("b"), pos(1));
    expression.analyse_statement(&mut checker, GLOBAL).unwrap();

    assert!(!expression.needs_temp());
    assert_eq!(
        expression.c_code(),
        "((RTEST(__extc_v_a) && RTEST(__extc_v_b)) ? Qtrue : Qfalse)"
    );
}

#[test]
fn test_unary_operators() {
    let mut checker = checker();
    declare(&mut checker, "x", int());
    declare(&mut checker, "o", Type::Object);

    let mut address = UnaryExpr::new("&", name("x"), pos(1));
    address.analyse_statement(&mut checker, GLOBAL).unwrap();
    assert_eq!(*address.get_type(), Type::pointer_to(int(), 1));
    assert_eq!(address.c_code(), "(&__extc_v_x)");

    let mut negation = UnaryExpr::new("-", name("o"), pos(1));
    negation.analyse_statement(&mut checker, GLOBAL).unwrap();
    assert!(negation.needs_temp());

    let mut not = UnaryExpr::new("!", name("o"), pos(1));
    not.analyse_statement(&mut checker, GLOBAL).unwrap();
    assert_eq!(not.c_code(), "(RTEST(__extc_v_o) ? Qfalse : Qtrue)");

    let mut deref = UnaryExpr::new("*", name("x"), pos(1));
    let error = deref.analyse_statement(&mut checker, GLOBAL).unwrap_err();
    assert_eq!(error.get_error_name(), "TypeMismatch");
}

fn declare_add(checker: &mut TypeChecker) {
    let mut decl = CFunctionDecl::new(
        named("long"),
        0,
        "add",
        ArgumentList::new(vec![
            ArgDeclaration::new(named("int"), 0, None, pos(1)),
            ArgDeclaration::new(named("int"), 0, None, pos(1)),
        ]),
        pos(1),
    );
    decl.analyse_statement(checker, GLOBAL).unwrap();
}

#[test]
fn test_call_coerces_arguments() {
    let mut checker = checker();
    declare_add(&mut checker);
    declare(&mut checker, "o", Type::Object);

    let mut call = CallExpr::new("add", vec![int_lit(1), name("o")], pos(2));
    call.analyse_statement(&mut checker, GLOBAL).unwrap();

    assert_eq!(*call.get_type(), Type::Primitive(PrimitiveKind::Long));
    assert_eq!(call.c_code(), "__extc_c_f_add(1, NUM2INT(__extc_v_o))");
}

#[test]
fn test_call_argument_counts() {
    let mut checker = checker();
    declare_add(&mut checker);

    let mut call = CallExpr::new("add", vec![int_lit(1), int_lit(2), int_lit(3)], pos(2));
    let error = call.analyse_statement(&mut checker, GLOBAL).unwrap_err();
    assert_eq!(error.get_error_name(), "UnexpectedArguments");

    let mut call = CallExpr::new("add", vec![int_lit(1)], pos(2));
    let error = call.analyse_statement(&mut checker, GLOBAL).unwrap_err();
    assert_eq!(error.get_error_name(), "MissingArguments");
}

#[test]
fn test_call_through_variable_is_rejected_unless_function_pointer() {
    let mut checker = checker();
    declare(&mut checker, "x", int());

    let mut call = CallExpr::new("x", vec![], pos(2));
    let error = call.analyse_statement(&mut checker, GLOBAL).unwrap_err();
    assert_eq!(error.get_error_name(), "NotCallable");
}

#[test]
fn test_call_through_function_pointer() {
    let mut checker = checker();
    let signature = TypeDescriptor::Signature {
        base: "int".to_string(),
        parameters: vec![(named("int"), 0)],
        return_pointer_depth: 0,
    };
    let mut decl = PtrDecl::new(signature, 0, "callback", None, pos(1));
    decl.analyse_statement(&mut checker, GLOBAL).unwrap();

    let mut call = CallExpr::new("callback", vec![int_lit(4)], pos(2));
    call.analyse_statement(&mut checker, GLOBAL).unwrap();
    assert_eq!(call.c_code(), "__extc_ptr_callback(4)");
    assert_eq!(*call.get_type(), int());
}

// STATEMENTS

#[test]
fn test_assign_declares_unknown_name_as_object() {
    let mut checker = checker();
    let mut assign = Assign::new(name("a"), int_lit(5), pos(3));
    assign.analyse_statement(&mut checker, GLOBAL).unwrap();

    let entry = checker.scope(GLOBAL).get("a").unwrap();
    assert!(entry.type_.is_object());
    assert_eq!(emitted(&assign, &checker), "__extc_v_a = INT2NUM(5);\n");
}

#[test]
fn test_assign_to_literal_is_rejected() {
    let mut checker = checker();
    let mut assign = Assign::new(int_lit(1), int_lit(5), pos(3));

    let error = assign.analyse_statement(&mut checker, GLOBAL).unwrap_err();
    assert_eq!(error.get_error_name(), "NotAssignable");
}

#[test]
fn test_assign_to_element() {
    let mut checker = checker();
    let mut decl = ArrayDecl::new(named("int"), "a", int_lit(3), None, pos(1));
    decl.analyse_statement(&mut checker, GLOBAL).unwrap();

    let mut assign = Assign::new(ExprWrapper::new(ElementRefExpr::new("a", int_lit(0), pos(2))), int_lit(9), pos(2));
    assign.analyse_statement(&mut checker, GLOBAL).unwrap();
    assert_eq!(emitted(&assign, &checker), "__extc_arr_a[0] = 9;\n");
}

#[test]
fn test_return_outside_function() {
    let mut checker = checker();
    let mut statement = Return::new(Some(int_lit(1)), pos(8));

    let error = statement.analyse_statement(&mut checker, GLOBAL).unwrap_err();
    assert_eq!(error.get_error_name(), "ReturnOutsideFunction");
    assert_eq!(error.get_position().0, 8);
}

#[test]
fn test_return_boxes_into_object_function() {
    let mut checker = checker();
    let mut function = CFunctionDef::new(
        named("object"),
        0,
        "wrap",
        ArgumentList::new(vec![ArgDeclaration::new(named("int"), 0, Some("n"), pos(1))]),
        vec![StmtWrapper::new(Return::new(Some(name("n")), pos(2)))],
        pos(1),
    );
    function.analyse_statement(&mut checker, GLOBAL).unwrap();

    let mut code = CodeWriter::new("test", 2, false);
    let header = code.as_str().len();
    function.generate_code(&mut code, &checker);

    assert_eq!(
        &code.as_str()[header..],
        "static VALUE __extc_c_f_wrap(int __extc_v_n)\n{\n  return INT2NUM(__extc_v_n);\n}\n\n"
    );
}

#[test]
fn test_return_type_mismatch() {
    let mut checker = checker();
    let mut function = CFunctionDef::new(
        named("int"),
        0,
        "half",
        ArgumentList::default(),
        vec![StmtWrapper::new(Return::new(Some(lit(LiteralValue::Float(0.5))), pos(2)))],
        pos(1),
    );

    let error = function.analyse_statement(&mut checker, GLOBAL).unwrap_err();
    assert_eq!(error.get_error_name(), "TypeMismatch");
    assert_eq!(error.get_position().0, 2);
}

#[test]
fn test_print_uses_format_specifiers() {
    let mut checker = checker();
    declare(&mut checker, "x", int());
    declare(&mut checker, "o", Type::Object);

    let mut print = Print::new(vec![name("x"), name("o")], pos(1));
    print.analyse_statement(&mut checker, GLOBAL).unwrap();

    assert_eq!(
        emitted(&print, &checker),
        "printf(\"%d\", __extc_v_x);\n\
         printf(\"%s\", RSTRING_PTR(rb_funcall(__extc_v_o, rb_intern(\"inspect\"), 0)));\n"
    );
}

// CONTROL FLOW

#[test]
fn test_for_ascending() {
    let mut checker = checker();
    declare(&mut checker, "i", int());

    let mut statement = For::new(int_lit(0), "<=", "i", "<", int_lit(5), vec![], pos(1));
    statement.analyse_statement(&mut checker, GLOBAL).unwrap();

    assert_eq!(
        emitted(&statement, &checker),
        "for (__extc_v_i = 0; __extc_v_i < 5; __extc_v_i++) {\n}\n"
    );
}

#[test]
fn test_for_strict_descending_adjusts_start() {
    let mut checker = checker();
    declare(&mut checker, "i", int());

    let mut statement = For::new(int_lit(5), ">", "i", ">", int_lit(0), vec![], pos(1));
    statement.analyse_statement(&mut checker, GLOBAL).unwrap();

    assert_eq!(
        emitted(&statement, &checker),
        "for (__extc_v_i = 5 - 1; __extc_v_i > 0; __extc_v_i--) {\n}\n"
    );
}

#[test]
fn test_for_errors() {
    let mut checker = checker();
    declare(&mut checker, "d", Type::Primitive(PrimitiveKind::Double));
    declare(&mut checker, "i", int());

    let mut mixed = For::new(int_lit(0), "<", "i", ">", int_lit(5), vec![], pos(1));
    assert_eq!(
        mixed.analyse_statement(&mut checker, GLOBAL).unwrap_err().get_error_name(),
        "InvalidLoopOperators"
    );

    let mut equality = For::new(int_lit(0), "==", "i", "<", int_lit(5), vec![], pos(1));
    assert_eq!(
        equality.analyse_statement(&mut checker, GLOBAL).unwrap_err().get_error_name(),
        "InvalidLoopOperators"
    );

    let mut unknown = For::new(int_lit(0), "<", "j", "<", int_lit(5), vec![], pos(1));
    assert_eq!(
        unknown.analyse_statement(&mut checker, GLOBAL).unwrap_err().get_error_name(),
        "UnknownIdentifier"
    );

    let mut floating = For::new(int_lit(0), "<", "d", "<", int_lit(5), vec![], pos(1));
    assert_eq!(
        floating.analyse_statement(&mut checker, GLOBAL).unwrap_err().get_error_name(),
        "TypeMismatch"
    );
}

#[test]
fn test_if_chain_with_temporary_condition_nests_tail() {
    let mut checker = checker();
    declare(&mut checker, "o", Type::Object);
    declare(&mut checker, "x", int());

    let tail = IfBlock::new(
        name("x"),
        vec![StmtWrapper::new(Print::new(vec![int_lit(2)], pos(3)))],
        None,
        pos(3),
    );
    let mut statement = IfBlock::new(
        ExprWrapper::new(BinaryExpr::new(name("o"), "<", int_lit(1), pos(1))),
        vec![StmtWrapper::new(Print::new(vec![int_lit(1)], pos(2)))],
        Some(tail),
        pos(1),
    );
    statement.analyse_statement(&mut checker, GLOBAL).unwrap();

    assert_eq!(
        emitted(&statement, &checker),
        "__extc_tmp_0 = rb_funcall(__extc_v_o, rb_intern(\"<\"), 1, INT2NUM(1));\n\
         if (RTEST(__extc_tmp_0)) {\n\
         \x20 __extc_tmp_0 = Qnil;\n\
         \x20 printf(\"%d\", 1);\n\
         }\n\
         else {\n\
         \x20 __extc_tmp_0 = Qnil;\n\
         \x20 if (__extc_v_x) {\n\
         \x20   printf(\"%d\", 2);\n\
         \x20 }\n\
         }\n"
    );
}

#[test]
fn test_if_chain_without_temporaries_is_flat() {
    let mut checker = checker();
    declare(&mut checker, "x", int());

    let otherwise = IfBlock::otherwise(vec![StmtWrapper::new(Print::new(vec![int_lit(3)], pos(5)))], pos(5));
    let elsif = IfBlock::new(int_lit(0), vec![], Some(otherwise), pos(3));
    let mut statement = IfBlock::new(name("x"), vec![], Some(elsif), pos(1));
    statement.analyse_statement(&mut checker, GLOBAL).unwrap();

    assert_eq!(
        emitted(&statement, &checker),
        "if (__extc_v_x) {\n}\nelse if (0) {\n}\nelse {\n  printf(\"%d\", 3);\n}\n"
    );
}

#[test]
fn test_while_with_temporary_condition() {
    let mut checker = checker();
    declare(&mut checker, "o", Type::Object);

    let body = Assign::new(
        name("o"),
        ExprWrapper::new(BinaryExpr::new(name("o"), "+", int_lit(1), pos(2))),
        pos(2),
    );
    let mut statement = While::new(
        ExprWrapper::new(BinaryExpr::new(name("o"), "<", int_lit(10), pos(1))),
        vec![StmtWrapper::new(body)],
        pos(1),
    );
    statement.analyse_statement(&mut checker, GLOBAL).unwrap();

    assert_eq!(
        emitted(&statement, &checker),
        "while (1) {\n\
         \x20 __extc_tmp_0 = rb_funcall(__extc_v_o, rb_intern(\"<\"), 1, INT2NUM(10));\n\
         \x20 if (!(RTEST(__extc_tmp_0))) {\n\
         \x20   __extc_tmp_0 = Qnil;\n\
         \x20   break;\n\
         \x20 }\n\
         \x20 __extc_tmp_0 = Qnil;\n\
         \x20 __extc_tmp_1 = rb_funcall(__extc_v_o, rb_intern(\"+\"), 1, INT2NUM(1));\n\
         \x20 __extc_v_o = __extc_tmp_1;\n\
         \x20 __extc_tmp_1 = Qnil;\n\
         }\n"
    );
}

#[test]
fn test_plain_while() {
    let mut checker = checker();
    declare(&mut checker, "n", int());

    let mut statement = While::new(
        ExprWrapper::new(BinaryExpr::new(name("n"), ">", int_lit(0), pos(1))),
        vec![StmtWrapper::new(Assign::new(
            name("n"),
            ExprWrapper::new(BinaryExpr::new(name("n"), "-", int_lit(1), pos(2))),
            pos(2),
        ))],
        pos(1),
    );
    statement.analyse_statement(&mut checker, GLOBAL).unwrap();

    assert_eq!(
        emitted(&statement, &checker),
        "while ((__extc_v_n > 0)) {\n  __extc_v_n = (__extc_v_n - 1);\n}\n"
    );
}

// DECLARATIONS

#[test]
fn test_struct_member_points_to_itself() {
    let mut checker = checker();
    let mut decl = StructOrUnionDecl::new(
        AggregateKind::Struct,
        "node",
        vec![
            StmtWrapper::new(VarDecl::new(named("int"), "value", None, pos(2))),
            StmtWrapper::new(PtrDecl::new(named("struct node"), 1, "next", None, pos(3))),
        ],
        pos(1),
    );
    decl.analyse_statement(&mut checker, GLOBAL).unwrap();

    let node = checker.context.get("node").unwrap().clone();
    let member_scope = decl.member_scope.unwrap();
    assert_eq!(
        checker.scope(member_scope).get("next").unwrap().type_,
        Type::pointer_to(node, 1)
    );
    assert!(checker.scope(GLOBAL).get("node").is_some());
}

#[test]
fn test_alias_of_function_pointer() {
    let mut checker = checker();
    let descriptor = TypeDescriptor::Signature {
        base: "int".to_string(),
        parameters: vec![(named("int"), 0), (named("int"), 0)],
        return_pointer_depth: 0,
    };
    let mut alias = Alias::new(&mut checker.context, "binop", descriptor, 0, pos(1));
    assert!(checker.context.is_pending("binop"));

    alias.analyse_statement(&mut checker, GLOBAL).unwrap();
    assert!(!checker.context.is_pending("binop"));
    assert_eq!(alias.c_name, "__extc_t_Object_binop");

    let mut op = VarDecl::new(named("binop"), "op", None, pos(2));
    op.analyse_statement(&mut checker, GLOBAL).unwrap();
    assert!(matches!(op.type_.unaliased(), Type::Pointer(..)));
    assert_eq!(
        checker.scope(GLOBAL).get("op").unwrap().kind,
        crate::type_checker::scope::EntryKind::Pointer
    );
}

#[test]
fn test_extern_function_keeps_its_name() {
    let mut checker = checker();
    let mut decl = CFunctionDecl::new(
        named("double"),
        0,
        "sqrt",
        ArgumentList::new(vec![ArgDeclaration::new(named("double"), 0, None, pos(1))]),
        pos(1),
    );
    decl.set_extern();
    decl.analyse_statement(&mut checker, GLOBAL).unwrap();

    let mut call = CallExpr::new("sqrt", vec![int_lit(2)], pos(2));
    call.analyse_statement(&mut checker, GLOBAL).unwrap();
    assert_eq!(call.c_code(), "sqrt(2)");
}
