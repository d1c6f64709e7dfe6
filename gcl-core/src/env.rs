#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use gcl_ast::{Name, Type};
use serde::{Deserialize, Serialize};

use crate::subst::{FreeVars, Subst, Substitutable};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeInfo {
    TypeDefnCtor(Type),
    Const(Type),
    Var(Type),
}

impl TypeInfo {
    pub fn ty(&self) -> &Type {
        match self {
            TypeInfo::TypeDefnCtor(t) | TypeInfo::Const(t) | TypeInfo::Var(t) => t,
        }
    }

    pub fn is_mutable(&self) -> bool {
        matches!(self, TypeInfo::Var(_))
    }

    fn map(&self, f: impl FnOnce(&Type) -> Type) -> TypeInfo {
        match self {
            TypeInfo::TypeDefnCtor(t) => TypeInfo::TypeDefnCtor(f(t)),
            TypeInfo::Const(t) => TypeInfo::Const(f(t)),
            TypeInfo::Var(t) => TypeInfo::Var(f(t)),
        }
    }
}

/// Ordered typing environment; later entries shadow earlier ones.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeEnv {
    entries: Vec<(Name, TypeInfo)>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: Name, info: TypeInfo) {
        self.entries.push((name, info));
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeInfo> {
        self.entries
            .iter()
            .rfind(|(n, _)| n.text == name)
            .map(|(_, info)| info)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry pushed after the environment had `len` entries.
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    pub fn names(&self) -> impl Iterator<Item = &Name> {
        self.entries.iter().map(|(n, _)| n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &TypeInfo)> {
        self.entries.iter().map(|(n, i)| (n, i))
    }
}

impl FreeVars for TypeEnv {
    fn free_vars(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .flat_map(|(_, info)| info.ty().free_vars())
            .collect()
    }
}

impl Substitutable<Type> for TypeEnv {
    fn apply(&self, s: &Subst<Type>) -> Self {
        if s.is_empty() {
            return self.clone();
        }
        TypeEnv {
            entries: self
                .entries
                .iter()
                .map(|(n, info)| (n.clone(), info.map(|t| t.apply(s))))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_entries_shadow_earlier_ones() {
        let mut env = TypeEnv::new();
        env.insert(Name::synthetic("x"), TypeInfo::Const(Type::int()));
        let mark = env.len();
        env.insert(Name::synthetic("x"), TypeInfo::Var(Type::bool()));
        assert_eq!(env.lookup("x"), Some(&TypeInfo::Var(Type::bool())));
        env.truncate(mark);
        assert_eq!(env.lookup("x"), Some(&TypeInfo::Const(Type::int())));
        assert!(env.lookup("y").is_none());
    }

    #[test]
    fn substitution_reaches_every_entry() {
        let mut env = TypeEnv::new();
        env.insert(
            Name::synthetic("f"),
            TypeInfo::Const(Type::func(Type::Meta(Name::synthetic("m")), Type::int())),
        );
        assert!(env.free_vars().contains("m"));
        let env = env.apply(&Subst::singleton("m", Type::bool()));
        assert!(env.free_vars().is_empty());
        assert_eq!(
            env.lookup("f").map(TypeInfo::ty),
            Some(&Type::func(Type::bool(), Type::int()))
        );
    }
}
