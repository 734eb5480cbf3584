use log::debug;

use crate::{
    ast::{definitions::CompilationUnit, types::Type},
    errors::errors::{Error, ErrorImpl},
    Position, MK_ERROR,
};

use super::{
    context::CompilationContext,
    scope::{Scope, ScopeId, ScopeKind, SymbolEntry, OBJECT_CLASS, OBJECT_CLASS_C_NAME, TEMP_PREFIX},
};

/// Owns every scope of a compilation unit together with its type registry.
///
/// Scopes live in an arena and refer to their parent by `ScopeId`; nodes keep
/// the ids of the scopes they open so later passes can find them again.
#[derive(Debug)]
pub struct TypeChecker {
    pub context: CompilationContext,
    pub environments: Vec<Scope>,
    temp_counter: usize,
}

impl TypeChecker {
    pub const GLOBAL: ScopeId = ScopeId(0);

    pub fn new(context: CompilationContext) -> Self {
        TypeChecker {
            context,
            environments: vec![Scope::new(
                OBJECT_CLASS,
                ScopeKind::Global,
                None,
                OBJECT_CLASS,
                OBJECT_CLASS_C_NAME,
            )],
            temp_counter: 0,
        }
    }

    /// Opens a function or struct/union scope nested in `parent`.
    pub fn add_scope(&mut self, name: &str, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        let (klass_name, klass_c_name) = {
            let parent = self.scope(parent);
            (parent.klass_name.clone(), parent.klass_c_name.clone())
        };

        self.push_scope(Scope::new(name, kind, Some(parent), &klass_name, &klass_c_name))
    }

    /// Opens the body scope of a class whose handle is `klass_c_name`.
    pub fn add_class_scope(&mut self, klass_name: &str, klass_c_name: &str, parent: ScopeId) -> ScopeId {
        self.push_scope(Scope::new(klass_name, ScopeKind::Class, Some(parent), klass_name, klass_c_name))
    }

    fn push_scope(&mut self, scope: Scope) -> ScopeId {
        debug!("opening {:?} scope `{}`", scope.kind, scope.name);
        self.environments.push(scope);
        ScopeId(self.environments.len() - 1)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.environments[id.0]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.environments[id.0]
    }

    /// Finds `name` in `scope` or the nearest enclosing scope that declares it.
    pub fn find(&self, scope: ScopeId, name: &str) -> Option<&SymbolEntry> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scope(id);
            if let Some(entry) = scope.get(name) {
                return Some(entry);
            }
            current = scope.parent;
        }

        None
    }

    pub fn lookup(&self, scope: ScopeId, name: &str, position: &Position) -> Result<&SymbolEntry, Error> {
        match self.find(scope, name) {
            Some(entry) => Ok(entry),
            None => MK_ERROR!(
                ErrorImpl::UnknownIdentifier {
                    identifier: name.to_string()
                },
                position
            ),
        }
    }

    /// The innermost function scope enclosing `scope`, if any.
    pub fn enclosing_function(&self, scope: ScopeId) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scope(id);
            match scope.kind {
                ScopeKind::Function => return Some(id),
                ScopeKind::Class => return None,
                _ => current = scope.parent,
            }
        }

        None
    }

    /// Allocates a temporary of `type_` in `scope`. Names are unique per unit.
    pub fn allocate_temp(&mut self, scope: ScopeId, type_: Type) -> String {
        let c_name = format!("{}{}", TEMP_PREFIX, self.temp_counter);
        self.temp_counter += 1;
        self.scope_mut(scope).add_temp(c_name.clone(), type_);

        c_name
    }

    /// Fails on the first entry or registered type still holding a placeholder.
    pub fn check_resolved(&self) -> Result<(), Error> {
        for scope in &self.environments {
            for entry in scope.entries() {
                if let Some(name) = entry.type_.find_unresolved() {
                    return MK_ERROR!(
                        ErrorImpl::UnresolvedForwardReference {
                            type_: name.to_string()
                        },
                        entry.position
                    );
                }
            }
        }

        for (_, type_, position) in self.context.iter() {
            if let Some(name) = type_.find_unresolved() {
                return MK_ERROR!(
                    ErrorImpl::UnresolvedForwardReference {
                        type_: name.to_string()
                    },
                    position
                );
            }
        }

        Ok(())
    }
}

/// Runs both declaration passes over `unit`.
///
/// The first pass declares and checks everything in source order, leaving
/// forward references as placeholders. The second pass swaps those for the
/// now-registered definitions; whatever is left after it is an error.
pub fn type_check(unit: &mut CompilationUnit, context: CompilationContext) -> Result<TypeChecker, Error> {
    let mut type_checker = TypeChecker::new(context);

    unit.analyse(&mut type_checker)?;
    debug!("analysis pass declared {} scopes", type_checker.environments.len());

    unit.rescan_declarations(&mut type_checker)?;
    type_checker.check_resolved()?;
    debug!("all forward references resolved");

    Ok(type_checker)
}
