#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use gcl_ast::{Name, Type};
use serde::{Deserialize, Serialize};

/// Finite map from variable names to replacement terms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subst<T> {
    map: BTreeMap<String, T>,
}

impl<T> Default for Subst<T> {
    fn default() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }
}

impl<T> Subst<T> {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn singleton(name: impl Into<String>, term: T) -> Self {
        let mut map = BTreeMap::new();
        map.insert(name.into(), term);
        Self { map }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.map.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn domain(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<T: Clone + Substitutable<T>> Subst<T> {
    /// `self ∘ other`: apply `other` first, then `self`.
    ///
    /// The result holds every binding of `self` plus the bindings of `other`
    /// with `self` applied to their right-hand sides; `self` wins when both
    /// bind the same name.
    pub fn compose(&self, other: &Subst<T>) -> Subst<T> {
        let mut map: BTreeMap<String, T> = other
            .map
            .iter()
            .map(|(k, v)| (k.clone(), v.apply(self)))
            .collect();
        for (k, v) in &self.map {
            map.insert(k.clone(), v.clone());
        }
        Subst { map }
    }
}

impl<T> FromIterator<(String, T)> for Subst<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

pub trait Substitutable<T> {
    fn apply(&self, s: &Subst<T>) -> Self;
}

pub trait FreeVars {
    fn free_vars(&self) -> BTreeSet<String>;
}

impl Substitutable<Type> for Type {
    fn apply(&self, s: &Subst<Type>) -> Self {
        if s.is_empty() {
            return self.clone();
        }
        match self {
            Type::Var(n) | Type::Meta(n) => match s.get(&n.text) {
                Some(t) => t.clone(),
                None => self.clone(),
            },
            Type::Array(interval, elem, loc) => {
                Type::Array(interval.clone(), Box::new(elem.apply(s)), *loc)
            }
            Type::App(f, a, loc) => Type::App(Box::new(f.apply(s)), Box::new(a.apply(s)), *loc),
            Type::Base(..) | Type::Tuple(..) | Type::Arrow(_) | Type::Data(_) => self.clone(),
        }
    }
}

impl<T: Substitutable<T>> Substitutable<T> for Vec<T> {
    fn apply(&self, s: &Subst<T>) -> Self {
        self.iter().map(|t| t.apply(s)).collect()
    }
}

impl FreeVars for Type {
    fn free_vars(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        collect_type_vars(self, &mut |n, _| {
            out.insert(n.text.clone());
        });
        out
    }
}

/// Free metavariables only.
pub fn free_metas(ty: &Type) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    collect_type_vars(ty, &mut |n, meta| {
        if meta {
            out.insert(n.text.clone());
        }
    });
    out
}

/// Free rigid type variables only.
pub fn free_rigid_vars(ty: &Type) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    collect_type_vars(ty, &mut |n, meta| {
        if !meta {
            out.insert(n.text.clone());
        }
    });
    out
}

fn collect_type_vars(ty: &Type, f: &mut impl FnMut(&Name, bool)) {
    match ty {
        Type::Var(n) => f(n, false),
        Type::Meta(n) => f(n, true),
        Type::Array(_, elem, _) => collect_type_vars(elem, f),
        Type::App(a, b, _) => {
            collect_type_vars(a, f);
            collect_type_vars(b, f);
        }
        Type::Base(..) | Type::Tuple(..) | Type::Arrow(_) | Type::Data(_) => {}
    }
}
