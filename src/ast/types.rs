//! Type system definitions for the AST.
//!
//! This module defines the closed set of types the compiler understands:
//!
//! - Primitive C types (integers, floating point, void)
//! - Composite types (pointers, arrays, structs/unions, functions)
//! - Aliases introduced with `alias`
//! - The boxed host object type
//! - The transient `Unresolved` placeholder used between the two passes
//!
//! Declarations carry a `TypeDescriptor` as produced by the parser, which is
//! resolved into a `Type` against the compilation context.

use std::{collections::HashMap, fmt::Display};

use lazy_static::lazy_static;
use regex::Regex;

use crate::type_checker::{context::CompilationContext, scope::ScopeId};

lazy_static! {
    pub static ref PRIMITIVE_LOOKUP: HashMap<&'static str, PrimitiveKind> = {
        let mut map = HashMap::new();
        map.insert("char", PrimitiveKind::Char);
        map.insert("unsigned char", PrimitiveKind::UChar);
        map.insert("i8", PrimitiveKind::Int8);
        map.insert("i16", PrimitiveKind::Int16);
        map.insert("i32", PrimitiveKind::Int32);
        map.insert("i64", PrimitiveKind::Int64);
        map.insert("u8", PrimitiveKind::UInt8);
        map.insert("u16", PrimitiveKind::UInt16);
        map.insert("u32", PrimitiveKind::UInt32);
        map.insert("u64", PrimitiveKind::UInt64);
        map.insert("short", PrimitiveKind::Short);
        map.insert("short int", PrimitiveKind::Short);
        map.insert("unsigned short", PrimitiveKind::UShort);
        map.insert("unsigned short int", PrimitiveKind::UShort);
        map.insert("int", PrimitiveKind::Int);
        map.insert("unsigned int", PrimitiveKind::UInt);
        map.insert("long", PrimitiveKind::Long);
        map.insert("long int", PrimitiveKind::Long);
        map.insert("unsigned long", PrimitiveKind::ULong);
        map.insert("unsigned long int", PrimitiveKind::ULong);
        map.insert("long long", PrimitiveKind::LongLong);
        map.insert("long long int", PrimitiveKind::LongLong);
        map.insert("unsigned long long", PrimitiveKind::ULongLong);
        map.insert("unsigned long long int", PrimitiveKind::ULongLong);
        map.insert("f32", PrimitiveKind::Float);
        map.insert("float", PrimitiveKind::Float);
        map.insert("f64", PrimitiveKind::Double);
        map.insert("double", PrimitiveKind::Double);
        map.insert("long double", PrimitiveKind::LongDouble);
        map.insert("void", PrimitiveKind::Void);
        map
    };
    static ref AGGREGATE_PREFIX: Regex = Regex::new(r"^(struct|union)\s+").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Keyword for the boxed host object type.
pub const OBJECT_KEYWORD: &str = "object";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Char,
    UChar,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    LongDouble,
    Void,
}

impl PrimitiveKind {
    pub fn c_name(&self) -> &'static str {
        match self {
            PrimitiveKind::Char => "char",
            PrimitiveKind::UChar => "unsigned char",
            PrimitiveKind::Int8 => "int8_t",
            PrimitiveKind::Int16 => "int16_t",
            PrimitiveKind::Int32 => "int32_t",
            PrimitiveKind::Int64 => "int64_t",
            PrimitiveKind::UInt8 => "uint8_t",
            PrimitiveKind::UInt16 => "uint16_t",
            PrimitiveKind::UInt32 => "uint32_t",
            PrimitiveKind::UInt64 => "uint64_t",
            PrimitiveKind::Short => "short",
            PrimitiveKind::UShort => "unsigned short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::UInt => "unsigned int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::ULong => "unsigned long",
            PrimitiveKind::LongLong => "long long",
            PrimitiveKind::ULongLong => "unsigned long long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::LongDouble => "long double",
            PrimitiveKind::Void => "void",
        }
    }

    /// Position in the numeric widening order, `None` for `void`.
    pub fn rank(&self) -> Option<u8> {
        match self {
            PrimitiveKind::Char | PrimitiveKind::UChar | PrimitiveKind::Int8 | PrimitiveKind::UInt8 => Some(1),
            PrimitiveKind::Int16 | PrimitiveKind::UInt16 | PrimitiveKind::Short | PrimitiveKind::UShort => Some(2),
            PrimitiveKind::Int32 | PrimitiveKind::UInt32 | PrimitiveKind::Int | PrimitiveKind::UInt => Some(3),
            PrimitiveKind::Long | PrimitiveKind::ULong => Some(4),
            PrimitiveKind::LongLong | PrimitiveKind::ULongLong | PrimitiveKind::Int64 | PrimitiveKind::UInt64 => Some(5),
            PrimitiveKind::Float => Some(6),
            PrimitiveKind::Double => Some(7),
            PrimitiveKind::LongDouble => Some(8),
            PrimitiveKind::Void => None,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.rank(), Some(rank) if rank <= 5)
    }

    pub fn is_floating(&self) -> bool {
        matches!(self.rank(), Some(rank) if rank > 5)
    }

    fn box_function(&self) -> Option<&'static str> {
        match self {
            PrimitiveKind::Char | PrimitiveKind::UChar => Some("CHR2FIX"),
            PrimitiveKind::Int8 | PrimitiveKind::Int16 | PrimitiveKind::Int32 | PrimitiveKind::Short | PrimitiveKind::Int => Some("INT2NUM"),
            PrimitiveKind::UInt8 | PrimitiveKind::UInt16 | PrimitiveKind::UInt32 | PrimitiveKind::UShort | PrimitiveKind::UInt => Some("UINT2NUM"),
            PrimitiveKind::Long | PrimitiveKind::Int64 => Some("LONG2NUM"),
            PrimitiveKind::ULong | PrimitiveKind::UInt64 => Some("ULONG2NUM"),
            PrimitiveKind::LongLong => Some("LL2NUM"),
            PrimitiveKind::ULongLong => Some("ULL2NUM"),
            PrimitiveKind::Float | PrimitiveKind::Double | PrimitiveKind::LongDouble => Some("DBL2NUM"),
            PrimitiveKind::Void => None,
        }
    }

    fn unbox_function(&self) -> Option<&'static str> {
        match self {
            PrimitiveKind::Char | PrimitiveKind::UChar => Some("NUM2CHR"),
            PrimitiveKind::Int8 | PrimitiveKind::Int16 | PrimitiveKind::Int32 | PrimitiveKind::Short | PrimitiveKind::Int => Some("NUM2INT"),
            PrimitiveKind::UInt8 | PrimitiveKind::UInt16 | PrimitiveKind::UInt32 | PrimitiveKind::UShort | PrimitiveKind::UInt => Some("NUM2UINT"),
            PrimitiveKind::Long | PrimitiveKind::Int64 => Some("NUM2LONG"),
            PrimitiveKind::ULong | PrimitiveKind::UInt64 => Some("NUM2ULONG"),
            PrimitiveKind::LongLong => Some("NUM2LL"),
            PrimitiveKind::ULongLong => Some("NUM2ULL"),
            PrimitiveKind::Float | PrimitiveKind::Double | PrimitiveKind::LongDouble => Some("NUM2DBL"),
            PrimitiveKind::Void => None,
        }
    }

    fn format_specifier(&self) -> &'static str {
        match self {
            PrimitiveKind::Char | PrimitiveKind::UChar => "%c",
            PrimitiveKind::Int8 | PrimitiveKind::Int16 | PrimitiveKind::Int32 | PrimitiveKind::Short | PrimitiveKind::Int => "%d",
            PrimitiveKind::UInt8 | PrimitiveKind::UInt16 | PrimitiveKind::UInt32 | PrimitiveKind::UShort | PrimitiveKind::UInt => "%u",
            PrimitiveKind::Long | PrimitiveKind::Int64 => "%ld",
            PrimitiveKind::ULong | PrimitiveKind::UInt64 => "%lu",
            PrimitiveKind::LongLong => "%lld",
            PrimitiveKind::ULongLong => "%llu",
            PrimitiveKind::Float | PrimitiveKind::Double => "%f",
            PrimitiveKind::LongDouble => "%Lf",
            PrimitiveKind::Void => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Struct,
    Union,
}

impl Display for AggregateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateKind::Struct => write!(f, "struct"),
            AggregateKind::Union => write!(f, "union"),
        }
    }
}

/// A type descriptor as written in the source, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    /// A primitive keyword, `object`, or a custom type name.
    Named(String),
    /// A function pointer signature: `base (*name)(parameters)`.
    Signature {
        base: String,
        parameters: Vec<(TypeDescriptor, usize)>,
        return_pointer_depth: usize,
    },
}

impl TypeDescriptor {
    pub fn named(name: &str) -> Self {
        TypeDescriptor::Named(String::from(name))
    }
}

/// Represents a function type
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub name: Option<String>,
    pub c_name: Option<String>,
    pub parameters: Vec<Type>,
    pub return_type: Box<Type>,
}

impl FunctionType {
    /// Two functions match when their parameter and return types match; names are ignored.
    pub fn same_signature(&self, other: &FunctionType) -> bool {
        self.parameters.len() == other.parameters.len()
            && self
                .parameters
                .iter()
                .zip(other.parameters.iter())
                .all(|(a, b)| a.is_same_as(b))
            && self.return_type.is_same_as(&other.return_type)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Primitive(PrimitiveKind),
    /// Base type (never itself a pointer) and indirection depth.
    Pointer(Box<Type>, usize),
    Array(Box<Type>, usize),
    StructOrUnion {
        kind: AggregateKind,
        name: String,
        c_name: String,
        scope: ScopeId,
    },
    TypeDef {
        name: String,
        c_name: String,
        target: Box<Type>,
    },
    Function(FunctionType),
    Object,
    Unresolved(String),
}

impl Type {
    /// Wraps `base` in `depth` levels of indirection, merging nested pointers.
    pub fn pointer_to(base: Type, depth: usize) -> Type {
        if depth == 0 {
            return base;
        }

        match base {
            Type::Pointer(inner, inner_depth) => Type::Pointer(inner, inner_depth + depth),
            base => Type::Pointer(Box::new(base), depth),
        }
    }

    /// Resolves a descriptor against the compilation context.
    ///
    /// Names missing from the context resolve to `Unresolved` and are fixed
    /// up by the rescan pass.
    pub fn resolve(descriptor: &TypeDescriptor, pointer_depth: usize, context: &CompilationContext) -> Type {
        match descriptor {
            TypeDescriptor::Named(name) => {
                let base = Type::resolve_name(name, context);
                Type::pointer_to(base, pointer_depth)
            }
            TypeDescriptor::Signature {
                base,
                parameters,
                return_pointer_depth,
            } => {
                let return_type = Type::pointer_to(Type::resolve_name(base, context), *return_pointer_depth);
                let function = Type::Function(FunctionType {
                    name: None,
                    c_name: None,
                    parameters: parameters
                        .iter()
                        .map(|(parameter, depth)| Type::resolve(parameter, *depth, context))
                        .collect(),
                    return_type: Box::new(return_type),
                });

                Type::pointer_to(function, pointer_depth.max(1))
            }
        }
    }

    fn resolve_name(name: &str, context: &CompilationContext) -> Type {
        let normalised = WHITESPACE.replace_all(name.trim(), " ");
        if let Some(kind) = PRIMITIVE_LOOKUP.get(normalised.as_ref()) {
            return Type::Primitive(*kind);
        }
        if normalised == OBJECT_KEYWORD {
            return Type::Object;
        }

        let name = AGGREGATE_PREFIX.replace(&normalised, "").to_string();
        match context.get(&name) {
            Some(ty) => ty.clone(),
            None => Type::Unresolved(name),
        }
    }

    /// Replaces every `Unresolved` leaf with the context's current value.
    ///
    /// One lookup per leaf; a value that is itself still unresolved stays so.
    pub fn rescan(&self, context: &CompilationContext) -> Type {
        match self {
            Type::Unresolved(name) => context.get(name).cloned().unwrap_or_else(|| self.clone()),
            Type::Pointer(base, depth) => Type::pointer_to(base.rescan(context), *depth),
            Type::Array(base, dimension) => Type::Array(Box::new(base.rescan(context)), *dimension),
            Type::TypeDef { name, c_name, target } => Type::TypeDef {
                name: name.clone(),
                c_name: c_name.clone(),
                target: Box::new(target.rescan(context)),
            },
            Type::Function(function) => Type::Function(FunctionType {
                name: function.name.clone(),
                c_name: function.c_name.clone(),
                parameters: function.parameters.iter().map(|p| p.rescan(context)).collect(),
                return_type: Box::new(function.return_type.rescan(context)),
            }),
            _ => self.clone(),
        }
    }

    /// Returns the name of the first placeholder still embedded in this type.
    pub fn find_unresolved(&self) -> Option<&str> {
        match self {
            Type::Unresolved(name) => Some(name),
            Type::Pointer(base, _) | Type::Array(base, _) => base.find_unresolved(),
            Type::TypeDef { target, .. } => target.find_unresolved(),
            Type::Function(function) => function
                .parameters
                .iter()
                .find_map(|p| p.find_unresolved())
                .or_else(|| function.return_type.find_unresolved()),
            _ => None,
        }
    }

    /// Strips aliases until a non-alias type is reached.
    pub fn unaliased(&self) -> &Type {
        match self {
            Type::TypeDef { target, .. } => target.unaliased(),
            _ => self,
        }
    }

    /// The concrete value type: aliases stripped, functions replaced by their return type.
    pub fn concrete(&self) -> Type {
        match self.unaliased() {
            Type::Function(function) => function.return_type.concrete(),
            ty => ty.clone(),
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self.unaliased(), Type::Object)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.unaliased(), Type::Primitive(kind) if kind.is_integer())
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.unaliased(), Type::Primitive(kind) if kind.rank().is_some())
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.unaliased(), Type::Pointer(..) | Type::Array(..))
    }

    fn is_c_string(&self) -> bool {
        matches!(self.unaliased(), Type::Pointer(base, 1) if matches!(base.unaliased(), Type::Primitive(PrimitiveKind::Char)))
    }

    /// Structural equality after alias removal; functions compare by signature.
    pub fn is_same_as(&self, other: &Type) -> bool {
        match (self.unaliased(), other.unaliased()) {
            (Type::Pointer(a, da), Type::Pointer(b, db)) => da == db && a.is_same_as(b),
            (Type::Array(a, na), Type::Array(b, nb)) => na == nb && a.is_same_as(b),
            (Type::Function(a), Type::Function(b)) => a.same_signature(b),
            (
                Type::StructOrUnion { kind: ka, name: na, .. },
                Type::StructOrUnion { kind: kb, name: nb, .. },
            ) => ka == kb && na == nb,
            // Two uses of one forward name agree before the rescan fills it in
            (Type::Unresolved(a), Type::Unresolved(b)) => a == b,
            (Type::Unresolved(_), _) | (_, Type::Unresolved(_)) => false,
            (a, b) => a == b,
        }
    }

    /// Whether a slot of this type can hold a value of type `element`.
    pub fn can_hold(&self, element: &Type) -> bool {
        match (self.unaliased(), element.unaliased()) {
            (Type::Unresolved(container), Type::Unresolved(element)) => container == element,
            (Type::Unresolved(_), _) | (_, Type::Unresolved(_)) => false,
            (Type::Primitive(container), Type::Primitive(element)) => {
                match (container.rank(), element.rank()) {
                    (Some(container), Some(element)) => element <= container,
                    _ => false,
                }
            }
            (Type::Pointer(base, depth), Type::Pointer(element_base, element_depth)) => {
                if *depth == 1 && matches!(base.unaliased(), Type::Primitive(PrimitiveKind::Void)) {
                    *element_depth == 1
                } else {
                    depth == element_depth && base.is_same_as(element_base)
                }
            }
            (Type::Pointer(base, 1), Type::Array(element_base, _)) => base.is_same_as(element_base),
            (Type::Array(..), Type::Array(..)) => self.is_same_as(element),
            (Type::StructOrUnion { .. }, Type::StructOrUnion { .. }) => self.is_same_as(element),
            (Type::Function(container), Type::Function(element)) => container.same_signature(element),
            (Type::Object, Type::Object) => true,
            _ => false,
        }
    }

    /// Higher ranked of two numeric types, used for arithmetic results.
    pub fn wider(a: &Type, b: &Type) -> Type {
        match (a.unaliased(), b.unaliased()) {
            (Type::Primitive(x), Type::Primitive(y)) => {
                if x.rank() >= y.rank() {
                    Type::Primitive(*x)
                } else {
                    Type::Primitive(*y)
                }
            }
            (Type::Pointer(..), _) => a.clone(),
            (_, Type::Pointer(..)) => b.clone(),
            _ => a.clone(),
        }
    }

    /// Host runtime call converting a native value of this type into an object.
    pub fn box_function(&self) -> Option<&'static str> {
        match self.unaliased() {
            Type::Primitive(kind) => kind.box_function(),
            _ if self.is_c_string() => Some("rb_str_new2"),
            _ => None,
        }
    }

    /// Host runtime call converting an object into a native value of this type.
    pub fn unbox_function(&self) -> Option<&'static str> {
        match self.unaliased() {
            Type::Primitive(kind) => kind.unbox_function(),
            _ if self.is_c_string() => Some("RSTRING_PTR"),
            _ => None,
        }
    }

    /// `printf` conversion used by `print`.
    pub fn format_specifier(&self) -> &'static str {
        match self.unaliased() {
            Type::Primitive(kind) => kind.format_specifier(),
            Type::Object => "%s",
            _ if self.is_c_string() => "%s",
            _ => "%p",
        }
    }

    /// The C spelling of this type as used in casts and plain declarations.
    pub fn c_type(&self) -> String {
        match self {
            Type::Primitive(kind) => kind.c_name().to_string(),
            Type::Pointer(base, _) if matches!(**base, Type::Function(_)) => self.c_declaration(""),
            Type::Pointer(base, depth) => format!("{}{}", base.c_type(), "*".repeat(*depth)),
            Type::Array(base, _) => format!("{}*", base.c_type()),
            Type::StructOrUnion { c_name, .. } => c_name.clone(),
            Type::TypeDef { c_name, .. } => c_name.clone(),
            Type::Function(function) => function.return_type.c_type(),
            Type::Object => String::from("VALUE"),
            Type::Unresolved(name) => name.clone(),
        }
    }

    /// A full C declarator for `identifier`, e.g. `int (*cb)(int)` or `int a[3]`.
    pub fn c_declaration(&self, identifier: &str) -> String {
        match self {
            Type::Pointer(base, depth) => match &**base {
                Type::Function(function) => format!(
                    "{} ({}{})({})",
                    function.return_type.c_type(),
                    "*".repeat(*depth),
                    identifier,
                    function
                        .parameters
                        .iter()
                        .map(|p| p.c_type())
                        .collect::<Vec<String>>()
                        .join(", ")
                ),
                base => format!("{} {}{}", base.c_type(), "*".repeat(*depth), identifier),
            },
            Type::Array(base, dimension) => base.c_declaration(&format!("{}[{}]", identifier, dimension)),
            ty => format!("{} {}", ty.c_type(), identifier),
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Primitive(kind) => write!(f, "{}", kind.c_name()),
            Type::Pointer(base, depth) => match &**base {
                Type::Function(function) => write!(
                    f,
                    "{} ({})({})",
                    function.return_type,
                    "*".repeat(*depth),
                    function
                        .parameters
                        .iter()
                        .map(|p| p.to_string())
                        .collect::<Vec<String>>()
                        .join(", ")
                ),
                base => write!(f, "{}{}", base, "*".repeat(*depth)),
            },
            Type::Array(base, dimension) => write!(f, "{}[{}]", base, dimension),
            Type::StructOrUnion { kind, name, .. } => write!(f, "{} {}", kind, name),
            Type::TypeDef { name, .. } => write!(f, "{}", name),
            Type::Function(function) => write!(
                f,
                "{} ({})",
                function.return_type,
                function
                    .parameters
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<String>>()
                    .join(", ")
            ),
            Type::Object => write!(f, "{}", OBJECT_KEYWORD),
            Type::Unresolved(name) => write!(f, "{}", name),
        }
    }
}

/// A conversion attached to an expression whose boxed-ness differs from its destination.
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    ToObject { function: &'static str },
    FromObject { function: &'static str, target: Type },
}

impl Conversion {
    /// Picks the conversion from `value` to `destination`.
    ///
    /// Returns `Ok(None)` when both sides agree on boxed-ness and `Err(())`
    /// when the native side has no host representation.
    #[allow(clippy::result_unit_err)]
    pub fn between(value: &Type, destination: &Type) -> Result<Option<Conversion>, ()> {
        match (value.is_object(), destination.is_object()) {
            (false, true) => value
                .box_function()
                .map(|function| Some(Conversion::ToObject { function }))
                .ok_or(()),
            (true, false) => destination
                .unbox_function()
                .map(|function| {
                    Some(Conversion::FromObject {
                        function,
                        target: destination.clone(),
                    })
                })
                .ok_or(()),
            _ => Ok(None),
        }
    }

    pub fn result_type(&self) -> Type {
        match self {
            Conversion::ToObject { .. } => Type::Object,
            Conversion::FromObject { target, .. } => target.clone(),
        }
    }

    pub fn apply(&self, c_code: &str) -> String {
        match self {
            Conversion::ToObject { function } | Conversion::FromObject { function, .. } => {
                format!("{}({})", function, c_code)
            }
        }
    }
}
