#![forbid(unsafe_code)]

use gcl_ast::{Loc, Name, TBase, Type};

use crate::error::TypeError;
use crate::subst::{FreeVars, Subst, Substitutable};

/// Most general unifier of `t1` and `t2`.
///
/// Arrays unify with function types from `Int`, so `a[i]` and `a i` agree.
/// Interval bounds are not compared.
pub fn unify(t1: &Type, t2: &Type, loc: Loc) -> Result<Subst<Type>, TypeError> {
    tracing::trace!(left = %t1, right = %t2, "unify");
    match (t1, t2) {
        (Type::Base(a, _), Type::Base(b, _)) if a == b => Ok(Subst::empty()),

        (Type::Array(_, e1, _), Type::Array(_, e2, _)) => unify(e1, e2, loc),

        (Type::Array(_, elem, _), other) | (other, Type::Array(_, elem, _))
            if other.as_func().is_some() =>
        {
            let Some((dom, cod)) = other.as_func() else {
                return Err(mismatch(t1, t2, loc));
            };
            let s1 = unify(&Type::Base(TBase::Int, loc), dom, loc)?;
            let s2 = unify(&elem.apply(&s1), &cod.apply(&s1), loc)?;
            Ok(s2.compose(&s1))
        }

        (Type::Tuple(n, _), Type::Tuple(m, _)) if n == m => Ok(Subst::empty()),
        (Type::Arrow(_), Type::Arrow(_)) => Ok(Subst::empty()),
        (Type::Data(a), Type::Data(b)) if a == b => Ok(Subst::empty()),

        (Type::App(f1, a1, _), Type::App(f2, a2, _)) => {
            let s1 = unify(f1, f2, loc)?;
            let s2 = unify(&a1.apply(&s1), &a2.apply(&s1), loc)?;
            Ok(s2.compose(&s1))
        }

        (Type::Var(v), other) | (Type::Meta(v), other) => bind(v, other, loc),
        (other, Type::Var(v)) | (other, Type::Meta(v)) => bind(v, other, loc),

        _ => Err(mismatch(t1, t2, loc)),
    }
}

fn bind(var: &Name, ty: &Type, loc: Loc) -> Result<Subst<Type>, TypeError> {
    if let Type::Var(n) | Type::Meta(n) = ty {
        if n == var {
            return Ok(Subst::empty());
        }
    }
    if ty.free_vars().contains(&var.text) {
        return Err(TypeError::RecursiveType {
            var: var.text.clone(),
            ty: ty.clone(),
            span: loc.span(),
        });
    }
    Ok(Subst::singleton(var.text.clone(), ty.clone()))
}

fn mismatch(expected: &Type, found: &Type, loc: Loc) -> TypeError {
    TypeError::UnifyFailed {
        expected: expected.clone(),
        found: found.clone(),
        span: loc.span(),
    }
}

#[cfg(test)]
mod tests {
    use gcl_ast::{Endpoint, Expr, Interval};

    use super::*;

    fn meta(n: &str) -> Type {
        Type::Meta(Name::synthetic(n))
    }

    fn int_array(elem: Type) -> Type {
        Type::array(
            Interval {
                lo: Endpoint::Including(Expr::num(0)),
                hi: Endpoint::Excluding(Expr::var("N")),
                loc: Loc::none(),
            },
            elem,
        )
    }

    #[test]
    fn unifier_makes_both_sides_equal() {
        let t1 = Type::func(meta("a"), Type::bool());
        let t2 = Type::func(Type::int(), meta("b"));
        let s = unify(&t1, &t2, Loc::none()).expect("unify");
        assert_eq!(t1.apply(&s), t2.apply(&s));
        assert_eq!(t1.apply(&s), Type::func(Type::int(), Type::bool()));
    }

    #[test]
    fn arrays_unify_with_functions_from_int() {
        let array = int_array(Type::bool());
        let s = unify(&array, &Type::func(Type::int(), meta("r")), Loc::none()).expect("unify");
        assert_eq!(meta("r").apply(&s), Type::bool());

        let s = unify(&Type::func(meta("i"), meta("r")), &array, Loc::none()).expect("unify");
        assert_eq!(meta("i").apply(&s), Type::int());

        let err = unify(&array, &Type::func(Type::bool(), Type::bool()), Loc::none())
            .expect_err("index must be Int");
        assert!(matches!(err, TypeError::UnifyFailed { .. }));
    }

    #[test]
    fn array_bounds_are_not_compared() {
        let a = int_array(Type::int());
        let b = Type::array(
            Interval {
                lo: Endpoint::Including(Expr::num(1)),
                hi: Endpoint::Including(Expr::num(3)),
                loc: Loc::none(),
            },
            Type::int(),
        );
        assert!(unify(&a, &b, Loc::none()).expect("unify").is_empty());
    }

    #[test]
    fn occurs_check_reports_recursive_type() {
        let err = unify(&meta("a"), &Type::func(meta("a"), Type::int()), Loc::none())
            .expect_err("infinite type");
        assert!(matches!(err, TypeError::RecursiveType { ref var, .. } if var == "a"));
    }

    #[test]
    fn same_variable_unifies_trivially() {
        assert!(unify(&meta("a"), &meta("a"), Loc::none()).expect("unify").is_empty());
        assert!(unify(&Type::var("x"), &Type::var("x"), Loc::none())
            .expect("unify")
            .is_empty());
    }

    #[test]
    fn distinct_datatypes_do_not_unify() {
        let err = unify(&Type::data("List"), &Type::data("Tree"), Loc::none())
            .expect_err("different names");
        assert!(matches!(err, TypeError::UnifyFailed { .. }));
        assert!(unify(&Type::Tuple(2, Loc::none()), &Type::Tuple(3, Loc::none()), Loc::none())
            .is_err());
    }
}
