use std::collections::HashMap;

use log::trace;

use crate::{
    ast::types::{FunctionType, Type},
    errors::errors::{Error, ErrorImpl},
    Position, MK_ERROR,
};

pub const VAR_PREFIX: &str = "__extc_v_";
pub const POINTER_PREFIX: &str = "__extc_ptr_";
pub const ARRAY_PREFIX: &str = "__extc_arr_";
pub const TYPE_PREFIX: &str = "__extc_t_";
pub const C_FUNC_PREFIX: &str = "__extc_c_f_";
pub const METHOD_PREFIX: &str = "__extc_f_";
pub const CLASS_PREFIX: &str = "__extc_cls_";
pub const ARG_PREFIX: &str = "__extc_arg_";
pub const TEMP_PREFIX: &str = "__extc_tmp_";

/// Host runtime handle of the root class.
pub const OBJECT_CLASS: &str = "Object";
pub const OBJECT_CLASS_C_NAME: &str = "rb_cObject";

/// Index of a scope inside the type checker's scope arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Class,
    Function,
    StructOrUnion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Variable,
    Pointer,
    Array,
    Type,
    StructOrUnion,
    /// A C function
    Function,
    /// A method exposed to the host runtime
    Method,
    Class,
}

impl EntryKind {
    fn prefix(&self) -> &'static str {
        match self {
            EntryKind::Variable => VAR_PREFIX,
            EntryKind::Pointer => POINTER_PREFIX,
            EntryKind::Array => ARRAY_PREFIX,
            EntryKind::Type | EntryKind::StructOrUnion => TYPE_PREFIX,
            EntryKind::Function => C_FUNC_PREFIX,
            EntryKind::Method => METHOD_PREFIX,
            EntryKind::Class => CLASS_PREFIX,
        }
    }

    /// Entries that occupy storage and need a C declaration.
    pub fn is_storage(&self) -> bool {
        matches!(self, EntryKind::Variable | EntryKind::Pointer | EntryKind::Array)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolEntry {
    pub name: String,
    pub c_name: String,
    pub kind: EntryKind,
    pub type_: Type,
    /// Constant initializer emitted with the declaration (literal-only arrays).
    pub initializer: Option<String>,
    pub is_extern: bool,
    pub position: Position,
}

#[derive(Debug)]
pub struct Scope {
    pub name: String,
    pub kind: ScopeKind,
    /// Lookup only, the arena owns every scope.
    pub parent: Option<ScopeId>,
    pub klass_name: String,
    pub klass_c_name: String,
    /// Declared return type, set on function scopes.
    pub return_type: Option<Type>,
    entries: Vec<SymbolEntry>,
    lookup: HashMap<String, usize>,
    temps: Vec<(String, Type)>,
}

impl Scope {
    pub fn new(name: &str, kind: ScopeKind, parent: Option<ScopeId>, klass_name: &str, klass_c_name: &str) -> Self {
        Scope {
            name: name.to_string(),
            kind,
            parent,
            klass_name: klass_name.to_string(),
            klass_c_name: klass_c_name.to_string(),
            return_type: None,
            entries: vec![],
            lookup: HashMap::new(),
            temps: vec![],
        }
    }

    pub fn get(&self, name: &str) -> Option<&SymbolEntry> {
        self.lookup.get(name).map(|index| &self.entries[*index])
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.entries.iter()
    }

    pub fn temps(&self) -> &[(String, Type)] {
        &self.temps
    }

    /// Generated name for a declaration of `kind`; extern names are kept literally.
    pub fn linkage_name(&self, kind: EntryKind, name: &str, is_extern: bool) -> String {
        if is_extern {
            return name.to_string();
        }

        match kind {
            EntryKind::Type | EntryKind::StructOrUnion => {
                format!("{}{}_{}", kind.prefix(), self.klass_name, name)
            }
            _ => format!("{}{}", kind.prefix(), name),
        }
    }

    fn insert(&mut self, entry: SymbolEntry) -> Result<SymbolEntry, Error> {
        if self.lookup.contains_key(&entry.name) {
            return MK_ERROR!(
                ErrorImpl::DuplicateDeclaration {
                    name: entry.name.clone()
                },
                entry.position
            );
        }

        trace!(
            "scope `{}`: declared {:?} `{}` as `{}` ({})",
            self.name,
            entry.kind,
            entry.name,
            entry.c_name,
            entry.type_
        );
        self.lookup.insert(entry.name.clone(), self.entries.len());
        self.entries.push(entry.clone());

        Ok(entry)
    }

    /// Declares a variable; pointer-typed variables get the pointer prefix.
    pub fn declare_var(&mut self, name: &str, type_: Type, is_extern: bool, position: &Position) -> Result<SymbolEntry, Error> {
        let kind = if matches!(type_.unaliased(), Type::Pointer(..)) {
            EntryKind::Pointer
        } else {
            EntryKind::Variable
        };

        self.insert(SymbolEntry {
            name: name.to_string(),
            c_name: self.linkage_name(kind, name, is_extern),
            kind,
            type_,
            initializer: None,
            is_extern,
            position: position.clone(),
        })
    }

    pub fn declare_array(
        &mut self,
        name: &str,
        type_: Type,
        initializer: Option<String>,
        is_extern: bool,
        position: &Position,
    ) -> Result<SymbolEntry, Error> {
        self.insert(SymbolEntry {
            name: name.to_string(),
            c_name: self.linkage_name(EntryKind::Array, name, is_extern),
            kind: EntryKind::Array,
            type_,
            initializer,
            is_extern,
            position: position.clone(),
        })
    }

    /// Declares a type name. A `TypeDef` keeps the linkage name it was built with.
    pub fn declare_type(&mut self, name: &str, type_: Type, is_extern: bool, position: &Position) -> Result<SymbolEntry, Error> {
        let c_name = match &type_ {
            Type::TypeDef { c_name, .. } => c_name.clone(),
            _ => self.linkage_name(EntryKind::Type, name, is_extern),
        };

        self.insert(SymbolEntry {
            name: name.to_string(),
            c_name,
            kind: EntryKind::Type,
            type_,
            initializer: None,
            is_extern,
            position: position.clone(),
        })
    }

    pub fn declare_struct_or_union(&mut self, name: &str, type_: Type, is_extern: bool, position: &Position) -> Result<SymbolEntry, Error> {
        let c_name = match &type_ {
            Type::StructOrUnion { c_name, .. } => c_name.clone(),
            _ => self.linkage_name(EntryKind::StructOrUnion, name, is_extern),
        };

        self.insert(SymbolEntry {
            name: name.to_string(),
            c_name,
            kind: EntryKind::StructOrUnion,
            type_,
            initializer: None,
            is_extern,
            position: position.clone(),
        })
    }

    /// Declares a C function (`EntryKind::Function`) or host method (`EntryKind::Method`).
    pub fn declare_function(
        &mut self,
        kind: EntryKind,
        name: &str,
        parameters: Vec<Type>,
        return_type: Type,
        is_extern: bool,
        position: &Position,
    ) -> Result<SymbolEntry, Error> {
        let c_name = self.linkage_name(kind, name, is_extern);
        let type_ = Type::Function(FunctionType {
            name: Some(name.to_string()),
            c_name: Some(c_name.clone()),
            parameters,
            return_type: Box::new(return_type),
        });

        self.insert(SymbolEntry {
            name: name.to_string(),
            c_name,
            kind,
            type_,
            initializer: None,
            is_extern,
            position: position.clone(),
        })
    }

    /// Declares a class; its value is the class handle object.
    pub fn declare_class(&mut self, name: &str, position: &Position) -> Result<SymbolEntry, Error> {
        self.insert(SymbolEntry {
            name: name.to_string(),
            c_name: self.linkage_name(EntryKind::Class, name, false),
            kind: EntryKind::Class,
            type_: Type::Object,
            initializer: None,
            is_extern: false,
            position: position.clone(),
        })
    }

    /// Replaces the type of an existing entry, used by the rescan pass.
    pub fn set_type(&mut self, name: &str, type_: Type) {
        if let Some(index) = self.lookup.get(name) {
            self.entries[*index].type_ = type_;
        }
    }

    pub(crate) fn add_temp(&mut self, c_name: String, type_: Type) {
        self.temps.push((c_name, type_));
    }
}
