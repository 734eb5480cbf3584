use std::collections::HashMap;

use log::trace;

use crate::{ast::types::Type, Position};

/// Registry of every custom type name declared in one compilation unit.
///
/// Struct/union definitions, aliases and forward declarations write into it;
/// type resolution and the rescan pass read from it. Names that are known to
/// exist but are not yet defined map to `Type::Unresolved`.
#[derive(Debug, Default)]
pub struct CompilationContext {
    custom_types: HashMap<String, (Type, Position)>,
    order: Vec<String>,
}

impl CompilationContext {
    pub fn new() -> Self {
        CompilationContext::default()
    }

    /// Registers (or replaces) the type bound to `name`.
    pub fn register(&mut self, name: &str, type_: Type, position: Position) {
        trace!("registering custom type `{}` as `{}`", name, type_);
        if !self.custom_types.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.custom_types.insert(name.to_string(), (type_, position));
    }

    /// Marks `name` as a type that will be defined later in the unit.
    ///
    /// An existing definition is left untouched.
    pub fn declare_placeholder(&mut self, name: &str, position: Position) {
        if !self.custom_types.contains_key(name) {
            self.register(name, Type::Unresolved(name.to_string()), position);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.custom_types.get(name).map(|(type_, _)| type_)
    }

    pub fn is_pending(&self, name: &str) -> bool {
        matches!(self.get(name), Some(Type::Unresolved(_)))
    }

    /// Registered names in registration order with their types and positions.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Type, &Position)> {
        self.order.iter().filter_map(move |name| {
            self.custom_types
                .get(name)
                .map(|(type_, position)| (name, type_, position))
        })
    }
}
