#![forbid(unsafe_code)]

//! Kind inference for datatypes.
//!
//! The context is an ordered arena of entries. A metavariable may only be
//! solved with a kind whose metavariables sit earlier in the arena; unifying
//! against a later one first promotes it by inserting a fresh metavariable in
//! front of the target and solving the later one to it.

use std::collections::BTreeSet;
use std::fmt;

use gcl_ast::{Loc, Name, Type, TypeDefnCtor};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::fresh::FreshSupply;
use crate::subst::{free_rigid_vars, FreeVars, Subst, Substitutable};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Star,
    Arrow(Box<Kind>, Box<Kind>),
    Meta(Name),
}

impl Kind {
    pub fn arrow(dom: Kind, cod: Kind) -> Self {
        Kind::Arrow(Box::new(dom), Box::new(cod))
    }

    /// `* → … → *` taking `n` arguments.
    pub fn star_arity(n: usize) -> Self {
        (0..n).fold(Kind::Star, |acc, _| Kind::arrow(Kind::Star, acc))
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Star => f.write_str("*"),
            Kind::Arrow(dom, cod) => match dom.as_ref() {
                Kind::Arrow(..) => write!(f, "({dom}) → {cod}"),
                _ => write!(f, "{dom} → {cod}"),
            },
            Kind::Meta(n) => f.write_str(&n.text),
        }
    }
}

impl Substitutable<Kind> for Kind {
    fn apply(&self, s: &Subst<Kind>) -> Self {
        match self {
            Kind::Star => Kind::Star,
            Kind::Arrow(a, b) => Kind::arrow(a.apply(s), b.apply(s)),
            Kind::Meta(n) => s.get(&n.text).cloned().unwrap_or_else(|| self.clone()),
        }
    }
}

impl FreeVars for Kind {
    fn free_vars(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        fn go(k: &Kind, out: &mut BTreeSet<String>) {
            match k {
                Kind::Star => {}
                Kind::Arrow(a, b) => {
                    go(a, out);
                    go(b, out);
                }
                Kind::Meta(n) => {
                    out.insert(n.text.clone());
                }
            }
        }
        go(self, &mut out);
        out
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KindEntry {
    /// A type name whose kind is fixed by its declaration.
    Annotated(Name, Kind),
    Unsolved(Name),
    Solved(Name, Kind),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct KindContext {
    entries: Vec<KindEntry>,
}

impl KindContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[KindEntry] {
        &self.entries
    }

    pub fn annotate(&mut self, name: Name, kind: Kind) -> Result<(), TypeError> {
        if self.annotation_index(&name.text).is_some() {
            return Err(TypeError::DuplicatedIdentifiers {
                names: vec![name.text.clone()],
                span: name.loc.span(),
            });
        }
        self.entries.push(KindEntry::Annotated(name, kind));
        Ok(())
    }

    pub fn remove_annotation(&mut self, name: &str) {
        if let Some(i) = self.annotation_index(name) {
            self.entries.remove(i);
        }
    }

    pub fn push_unsolved(&mut self, fresh: &mut FreshSupply) -> Name {
        let m = fresh.fresh("k");
        self.entries.push(KindEntry::Unsolved(m.clone()));
        m
    }

    /// Kind of a type name with solved metavariables substituted.
    pub fn lookup(&self, name: &str) -> Option<Kind> {
        let i = self.annotation_index(name)?;
        match &self.entries[i] {
            KindEntry::Annotated(_, k) => Some(self.zonk(k)),
            _ => None,
        }
    }

    pub fn zonk(&self, kind: &Kind) -> Kind {
        match kind {
            Kind::Star => Kind::Star,
            Kind::Arrow(a, b) => Kind::arrow(self.zonk(a), self.zonk(b)),
            Kind::Meta(n) => match self.solution(&n.text) {
                Some(k) => self.zonk(k),
                None => kind.clone(),
            },
        }
    }

    pub fn is_unsolved(&self, meta: &str) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(e, KindEntry::Unsolved(n) if n.text == meta))
    }

    /// Solves every remaining metavariable to `*`.
    pub fn default_unsolved(&mut self) {
        for entry in &mut self.entries {
            if let KindEntry::Unsolved(n) = entry {
                *entry = KindEntry::Solved(n.clone(), Kind::Star);
            }
        }
    }

    fn annotation_index(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| matches!(e, KindEntry::Annotated(n, _) if n.text == name))
    }

    fn position(&self, meta: &str) -> Option<usize> {
        self.entries.iter().position(|e| match e {
            KindEntry::Unsolved(n) | KindEntry::Solved(n, _) => n.text == meta,
            KindEntry::Annotated(..) => false,
        })
    }

    fn solution(&self, meta: &str) -> Option<&Kind> {
        self.entries.iter().find_map(|e| match e {
            KindEntry::Solved(n, k) if n.text == meta => Some(k),
            _ => None,
        })
    }

    fn insert_unsolved_at(&mut self, index: usize, fresh: &mut FreshSupply) -> Name {
        let m = fresh.fresh("k");
        self.entries.insert(index, KindEntry::Unsolved(m.clone()));
        m
    }

    fn solve(&mut self, meta: &str, kind: Kind) {
        if let Some(i) = self.position(meta) {
            let name = match &self.entries[i] {
                KindEntry::Unsolved(n) | KindEntry::Solved(n, _) => n.clone(),
                KindEntry::Annotated(n, _) => n.clone(),
            };
            self.entries[i] = KindEntry::Solved(name, kind);
        }
    }
}

fn kind_mismatch(expected: &Kind, found: &Kind, loc: Loc) -> TypeError {
    TypeError::KindUnifyFailed {
        expected: expected.clone(),
        found: found.clone(),
        span: loc.span(),
    }
}

pub fn unify_kind(
    ctx: &mut KindContext,
    fresh: &mut FreshSupply,
    k1: &Kind,
    k2: &Kind,
    loc: Loc,
) -> Result<(), TypeError> {
    let k1 = ctx.zonk(k1);
    let k2 = ctx.zonk(k2);
    match (&k1, &k2) {
        (Kind::Star, Kind::Star) => Ok(()),
        (Kind::Arrow(a1, b1), Kind::Arrow(a2, b2)) => {
            unify_kind(ctx, fresh, a1, a2, loc)?;
            unify_kind(ctx, fresh, b1, b2, loc)
        }
        (Kind::Meta(a), Kind::Meta(b)) if a == b => Ok(()),
        (Kind::Meta(a), other) => solve_meta(ctx, fresh, &a.text, other, &k1, &k2, loc),
        (other, Kind::Meta(b)) => solve_meta(ctx, fresh, &b.text, other, &k1, &k2, loc),
        _ => Err(kind_mismatch(&k1, &k2, loc)),
    }
}

fn solve_meta(
    ctx: &mut KindContext,
    fresh: &mut FreshSupply,
    target: &str,
    kind: &Kind,
    k1: &Kind,
    k2: &Kind,
    loc: Loc,
) -> Result<(), TypeError> {
    if kind.free_vars().contains(target) {
        return Err(kind_mismatch(k1, k2, loc));
    }
    let Some(mut target_pos) = ctx.position(target) else {
        return Err(kind_mismatch(k1, k2, loc));
    };

    let mut promotions: Subst<Kind> = Subst::empty();
    for other in kind.free_vars() {
        let Some(pos) = ctx.position(&other) else {
            continue;
        };
        if pos > target_pos {
            let earlier = ctx.insert_unsolved_at(target_pos, fresh);
            target_pos += 1;
            ctx.solve(&other, Kind::Meta(earlier.clone()));
            promotions = Subst::singleton(other.clone(), Kind::Meta(earlier)).compose(&promotions);
        }
    }

    let solved = ctx.zonk(&kind.apply(&promotions));
    tracing::trace!(meta = target, kind = %solved, "solved kind metavariable");
    ctx.solve(target, solved);
    Ok(())
}

/// Kind of `k1` applied to an argument of kind `k2`.
pub fn infer_kapp(
    ctx: &mut KindContext,
    fresh: &mut FreshSupply,
    k1: &Kind,
    k2: &Kind,
    loc: Loc,
) -> Result<Kind, TypeError> {
    match ctx.zonk(k1) {
        Kind::Arrow(dom, cod) => {
            unify_kind(ctx, fresh, &dom, k2, loc)?;
            Ok(ctx.zonk(&cod))
        }
        Kind::Meta(a) if ctx.is_unsolved(&a.text) => {
            let Some(pos) = ctx.position(&a.text) else {
                return Err(kind_mismatch(&Kind::arrow(k2.clone(), Kind::Star), k1, loc));
            };
            let a1 = ctx.insert_unsolved_at(pos, fresh);
            let a2 = ctx.insert_unsolved_at(pos + 1, fresh);
            ctx.solve(&a.text, Kind::arrow(Kind::Meta(a1.clone()), Kind::Meta(a2.clone())));
            unify_kind(ctx, fresh, &Kind::Meta(a1), k2, loc)?;
            Ok(ctx.zonk(&Kind::Meta(a2)))
        }
        other => Err(kind_mismatch(&Kind::arrow(k2.clone(), Kind::Star), &other, loc)),
    }
}

pub fn infer_kind(
    ctx: &mut KindContext,
    fresh: &mut FreshSupply,
    ty: &Type,
) -> Result<Kind, TypeError> {
    match ty {
        Type::Base(..) => Ok(Kind::Star),
        Type::Array(_, elem, loc) => {
            let k = infer_kind(ctx, fresh, elem)?;
            unify_kind(ctx, fresh, &k, &Kind::Star, *loc)?;
            Ok(Kind::Star)
        }
        Type::Tuple(n, _) => Ok(Kind::star_arity(*n)),
        Type::Arrow(_) => Ok(Kind::star_arity(2)),
        Type::Data(n) | Type::Var(n) | Type::Meta(n) => {
            ctx.lookup(&n.text).ok_or_else(|| TypeError::UndefinedType {
                name: n.text.clone(),
                span: n.loc.span(),
            })
        }
        Type::App(f, a, loc) => {
            let k1 = infer_kind(ctx, fresh, f)?;
            let k2 = infer_kind(ctx, fresh, a)?;
            infer_kapp(ctx, fresh, &k1, &k2, *loc)
        }
    }
}

/// One member of a datatype group, as seen by kind inference.
pub struct DataDecl<'a> {
    pub name: &'a Name,
    pub params: &'a [Name],
    pub ctors: &'a [TypeDefnCtor],
    pub loc: Loc,
}

/// Infers the kinds of a group of possibly mutually recursive datatypes.
///
/// Every member is annotated with a fresh metavariable before any constructor
/// is inspected, so constructors may mention any member of the group.
pub fn infer_data_types(
    ctx: &mut KindContext,
    fresh: &mut FreshSupply,
    group: &[DataDecl<'_>],
) -> Result<Vec<Kind>, TypeError> {
    let mut metas = Vec::with_capacity(group.len());
    for decl in group {
        let m = ctx.push_unsolved(fresh);
        ctx.annotate(decl.name.clone(), Kind::Meta(m.clone()))?;
        metas.push(m);
    }

    for (decl, meta) in group.iter().zip(&metas) {
        tracing::debug!(datatype = %decl.name, "inferring datatype kind");
        let mut param_kinds = Vec::with_capacity(decl.params.len());
        for p in decl.params {
            let pm = ctx.push_unsolved(fresh);
            ctx.annotate(p.clone(), Kind::Meta(pm.clone()))?;
            param_kinds.push(Kind::Meta(pm));
        }

        let params: BTreeSet<&str> = decl.params.iter().map(|p| p.text.as_str()).collect();
        for ctor in decl.ctors {
            let missing: Vec<String> = ctor
                .args
                .iter()
                .flat_map(free_rigid_vars)
                .filter(|v| !params.contains(v.as_str()))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            if !missing.is_empty() {
                return Err(TypeError::MissingArguments {
                    names: missing,
                    span: ctor.loc.span(),
                });
            }
            for arg in &ctor.args {
                let k = infer_kind(ctx, fresh, arg)?;
                unify_kind(ctx, fresh, &k, &Kind::Star, ctor.loc)?;
            }
        }

        let expected = param_kinds
            .into_iter()
            .rev()
            .fold(Kind::Star, |acc, k| Kind::arrow(k, acc));
        unify_kind(ctx, fresh, &Kind::Meta(meta.clone()), &expected, decl.loc)?;

        for p in decl.params {
            ctx.remove_annotation(&p.text);
        }
    }

    ctx.default_unsolved();
    Ok(metas.iter().map(|m| ctx.zonk(&Kind::Meta(m.clone()))).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_moves_later_metavariable_in_front_of_target() {
        let mut ctx = KindContext::new();
        let mut fresh = FreshSupply::new();
        let early = ctx.push_unsolved(&mut fresh);
        let late = ctx.push_unsolved(&mut fresh);

        unify_kind(
            &mut ctx,
            &mut fresh,
            &Kind::Meta(early.clone()),
            &Kind::arrow(Kind::Meta(late.clone()), Kind::Star),
            Loc::none(),
        )
        .expect("unify");

        // [promoted, early := promoted → *, late := promoted]
        let entries = ctx.entries();
        assert_eq!(entries.len(), 3);
        let KindEntry::Unsolved(promoted) = &entries[0] else {
            panic!("expected the promoted metavariable first, got {entries:?}");
        };
        assert_eq!(
            entries[1],
            KindEntry::Solved(early, Kind::arrow(Kind::Meta(promoted.clone()), Kind::Star))
        );
        assert_eq!(entries[2], KindEntry::Solved(late, Kind::Meta(promoted.clone())));
    }

    #[test]
    fn applying_an_unsolved_kind_splits_it() {
        let mut ctx = KindContext::new();
        let mut fresh = FreshSupply::new();
        let f = ctx.push_unsolved(&mut fresh);
        let result =
            infer_kapp(&mut ctx, &mut fresh, &Kind::Meta(f.clone()), &Kind::Star, Loc::none())
                .expect("kapp");
        assert!(matches!(result, Kind::Meta(_)));
        let solved = ctx.zonk(&Kind::Meta(f));
        assert!(matches!(solved, Kind::Arrow(ref dom, _) if **dom == Kind::Star));
    }

    #[test]
    fn star_cannot_be_applied() {
        let mut ctx = KindContext::new();
        let mut fresh = FreshSupply::new();
        let err = infer_kapp(&mut ctx, &mut fresh, &Kind::Star, &Kind::Star, Loc::none())
            .expect_err("star is not a constructor");
        assert!(matches!(err, TypeError::KindUnifyFailed { .. }));
    }

    #[test]
    fn tuple_and_arrow_kinds() {
        let mut ctx = KindContext::new();
        let mut fresh = FreshSupply::new();
        let k = infer_kind(&mut ctx, &mut fresh, &Type::Tuple(2, Loc::none())).expect("kind");
        assert_eq!(k.to_string(), "* → * → *");
        let k = infer_kind(&mut ctx, &mut fresh, &Type::func(Type::int(), Type::bool()))
            .expect("kind");
        assert_eq!(k, Kind::Star);
    }

    #[test]
    fn annotations_are_unique() {
        let mut ctx = KindContext::new();
        ctx.annotate(Name::synthetic("T"), Kind::Star).expect("first");
        assert!(ctx.annotate(Name::synthetic("T"), Kind::Star).is_err());
    }
}
