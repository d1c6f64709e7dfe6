#![forbid(unsafe_code)]

//! Capture-avoiding substitution of expressions for program names.

use std::collections::{BTreeMap, BTreeSet};

use gcl_ast::Name;

use crate::fresh::fresh_in_scope;
use crate::typed::{Binder, TypedChain, TypedChainLink, TypedExpr, TypedExprKind};

pub type ExprSubst = BTreeMap<String, TypedExpr>;

/// Names referenced but not bound inside `expr`, variables and constants alike.
pub fn free_vars(expr: &TypedExpr) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    collect_free(expr, &mut Vec::new(), &mut out);
    out
}

fn collect_free(expr: &TypedExpr, bound: &mut Vec<String>, out: &mut BTreeSet<String>) {
    match &expr.kind {
        TypedExprKind::Var(n) | TypedExprKind::Const(n) => {
            if !bound.contains(&n.text) {
                out.insert(n.text.clone());
            }
        }
        TypedExprKind::Lit(_) | TypedExprKind::Op(_) => {}
        TypedExprKind::Chain(chain) => {
            collect_free(&chain.head, bound, out);
            for link in &chain.links {
                collect_free(&link.rhs, bound, out);
            }
        }
        TypedExprKind::App(f, a) | TypedExprKind::ArrIdx(f, a) => {
            collect_free(f, bound, out);
            collect_free(a, bound, out);
        }
        TypedExprKind::Lam(b, body) => {
            bound.push(b.name.text.clone());
            collect_free(body, bound, out);
            bound.pop();
        }
        TypedExprKind::Quant {
            op,
            binders,
            range,
            body,
        } => {
            collect_free(op, bound, out);
            let mark = bound.len();
            bound.extend(binders.iter().map(|b| b.name.text.clone()));
            collect_free(range, bound, out);
            collect_free(body, bound, out);
            bound.truncate(mark);
        }
        TypedExprKind::ArrUpd {
            array,
            index,
            value,
        } => {
            collect_free(array, bound, out);
            collect_free(index, bound, out);
            collect_free(value, bound, out);
        }
    }
}

/// Simultaneously replaces every free occurrence of each key of `subst`.
///
/// A binder that would capture a free name of a replacement is renamed first.
/// Names absent from `expr` leave it untouched.
pub fn substitute(subst: &ExprSubst, expr: &TypedExpr) -> TypedExpr {
    if subst.is_empty() {
        return expr.clone();
    }
    let kind = match &expr.kind {
        TypedExprKind::Var(n) | TypedExprKind::Const(n) => match subst.get(&n.text) {
            Some(replacement) => return replacement.clone(),
            None => return expr.clone(),
        },
        TypedExprKind::Lit(_) | TypedExprKind::Op(_) => return expr.clone(),
        TypedExprKind::Chain(chain) => TypedExprKind::Chain(TypedChain {
            head: Box::new(substitute(subst, &chain.head)),
            links: chain
                .links
                .iter()
                .map(|l| TypedChainLink {
                    op: l.op,
                    op_ty: l.op_ty.clone(),
                    loc: l.loc,
                    rhs: substitute(subst, &l.rhs),
                })
                .collect(),
        }),
        TypedExprKind::App(f, a) => {
            TypedExprKind::App(Box::new(substitute(subst, f)), Box::new(substitute(subst, a)))
        }
        TypedExprKind::ArrIdx(a, i) => {
            TypedExprKind::ArrIdx(Box::new(substitute(subst, a)), Box::new(substitute(subst, i)))
        }
        TypedExprKind::ArrUpd {
            array,
            index,
            value,
        } => TypedExprKind::ArrUpd {
            array: Box::new(substitute(subst, array)),
            index: Box::new(substitute(subst, index)),
            value: Box::new(substitute(subst, value)),
        },
        TypedExprKind::Lam(binder, body) => {
            let (binders, inner) =
                under_binders(subst, std::slice::from_ref(binder), &[body.as_ref()]);
            let (Some(binder), Some(body)) = (binders.into_iter().next(), inner.into_iter().next())
            else {
                return expr.clone();
            };
            TypedExprKind::Lam(binder, Box::new(body))
        }
        TypedExprKind::Quant {
            op,
            binders,
            range,
            body,
        } => {
            let op = substitute(subst, op);
            let (binders, mut inner) =
                under_binders(subst, binders, &[range.as_ref(), body.as_ref()]);
            let (Some(body), Some(range)) = (inner.pop(), inner.pop()) else {
                return expr.clone();
            };
            TypedExprKind::Quant {
                op: Box::new(op),
                binders,
                range: Box::new(range),
                body: Box::new(body),
            }
        }
    };
    TypedExpr::new(kind, expr.ty.clone(), expr.loc)
}

/// Substitutes into the scope of `binders`, renaming those that would capture.
fn under_binders(
    subst: &ExprSubst,
    binders: &[Binder],
    scope: &[&TypedExpr],
) -> (Vec<Binder>, Vec<TypedExpr>) {
    let mut scope_free = BTreeSet::new();
    for e in scope {
        scope_free.extend(free_vars(e));
    }

    // Only the entries that can actually reach the scope matter.
    let mut inner: ExprSubst = subst
        .iter()
        .filter(|(k, _)| scope_free.contains(*k) && !binders.iter().any(|b| &b.name.text == *k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if inner.is_empty() {
        return (binders.to_vec(), scope.iter().map(|e| (*e).clone()).collect());
    }

    let mut replacement_free = BTreeSet::new();
    for v in inner.values() {
        replacement_free.extend(free_vars(v));
    }
    let mut avoid = scope_free.clone();
    avoid.extend(replacement_free.iter().cloned());
    avoid.extend(inner.keys().cloned());
    avoid.extend(binders.iter().map(|b| b.name.text.clone()));

    let mut renamed = Vec::with_capacity(binders.len());
    for b in binders {
        if replacement_free.contains(&b.name.text) {
            let fresh = fresh_in_scope(&b.name.text, std::slice::from_ref(&avoid));
            avoid.insert(fresh.text.clone());
            let fresh = Name::new(fresh.text, b.name.loc);
            tracing::trace!(from = %b.name, to = %fresh, "renaming binder");
            inner.insert(
                b.name.text.clone(),
                TypedExpr::var(fresh.clone(), b.ty.clone()),
            );
            renamed.push(Binder {
                name: fresh,
                ty: b.ty.clone(),
            });
        } else {
            renamed.push(b.clone());
        }
    }

    let scope = scope.iter().map(|e| substitute(&inner, e)).collect();
    (renamed, scope)
}

#[cfg(test)]
mod tests {
    use gcl_ast::{ArithOp, ChainOp, Type};

    use super::*;

    fn int_var(n: &str) -> TypedExpr {
        TypedExpr::var(Name::synthetic(n), Type::int())
    }

    fn binder(n: &str) -> Binder {
        Binder {
            name: Name::synthetic(n),
            ty: Type::int(),
        }
    }

    #[test]
    fn replaces_free_occurrences_only() {
        // ⟨∀ x : True : x = y⟩ [x := 1] leaves the bound x alone
        let e = TypedExpr::forall(
            vec![binder("x")],
            TypedExpr::bool(true),
            TypedExpr::chain(int_var("x"), ChainOp::Eq, int_var("y")),
        );
        let s: ExprSubst = [("x".to_string(), TypedExpr::num(1))].into();
        assert_eq!(substitute(&s, &e), e);

        let s: ExprSubst = [("y".to_string(), TypedExpr::num(1))].into();
        assert_eq!(substitute(&s, &e).to_string(), "⟨∀ x : True : x = 1⟩");
    }

    #[test]
    fn capturing_binder_is_renamed() {
        // ⟨∀ x : True : x < y⟩ [y := x + 1]
        let e = TypedExpr::forall(
            vec![binder("x")],
            TypedExpr::bool(true),
            TypedExpr::chain(int_var("x"), ChainOp::Lt, int_var("y")),
        );
        let s: ExprSubst = [(
            "y".to_string(),
            TypedExpr::binary(ArithOp::Add, int_var("x"), TypedExpr::num(1)),
        )]
        .into();
        assert_eq!(substitute(&s, &e).to_string(), "⟨∀ x0 : True : x0 < (x + 1)⟩");
    }

    #[test]
    fn substitution_is_simultaneous() {
        let e = TypedExpr::binary(ArithOp::Sub, int_var("x"), int_var("y"));
        let s: ExprSubst = [
            ("x".to_string(), int_var("y")),
            ("y".to_string(), int_var("x")),
        ]
        .into();
        assert_eq!(substitute(&s, &e).to_string(), "y - x");
    }

    #[test]
    fn lambda_binders_shadow_keys() {
        let lam = TypedExpr::new(
            TypedExprKind::Lam(binder("x"), Box::new(int_var("x"))),
            Type::func(Type::int(), Type::int()),
            gcl_ast::Loc::none(),
        );
        let s: ExprSubst = [("x".to_string(), TypedExpr::num(3))].into();
        assert_eq!(substitute(&s, &lam), lam);
        assert!(free_vars(&lam).is_empty());
    }
}
