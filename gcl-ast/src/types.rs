#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::{Expr, Loc, Name};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TBase {
    Int,
    Bool,
    Char,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    Including(Expr),
    Excluding(Expr),
}

impl Endpoint {
    pub fn expr(&self) -> &Expr {
        match self {
            Endpoint::Including(e) | Endpoint::Excluding(e) => e,
        }
    }
}

/// Index range of an array type, e.g. `[0 .. N)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub lo: Endpoint,
    pub hi: Endpoint,
    pub loc: Loc,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Base(TBase, Loc),
    Array(Box<Interval>, Box<Type>, Loc),
    /// Tuple type constructor of the given arity.
    Tuple(usize, Loc),
    /// The `→` type operator; `a → b` is `App(App(Arrow, a), b)`.
    Arrow(Loc),
    App(Box<Type>, Box<Type>, Loc),
    /// Reference to a user datatype.
    Data(Name),
    /// Rigid type variable written in the source.
    Var(Name),
    /// Unification metavariable introduced by the checker.
    Meta(Name),
}

impl Type {
    pub fn int() -> Self {
        Type::Base(TBase::Int, Loc::none())
    }

    pub fn bool() -> Self {
        Type::Base(TBase::Bool, Loc::none())
    }

    pub fn char() -> Self {
        Type::Base(TBase::Char, Loc::none())
    }

    pub fn var(name: &str) -> Self {
        Type::Var(Name::synthetic(name))
    }

    pub fn data(name: &str) -> Self {
        Type::Data(Name::synthetic(name))
    }

    pub fn app(head: Type, arg: Type) -> Self {
        let loc = head.loc().merge(arg.loc());
        Type::App(Box::new(head), Box::new(arg), loc)
    }

    /// `dom → cod`
    pub fn func(dom: Type, cod: Type) -> Self {
        let loc = dom.loc().merge(cod.loc());
        Type::App(
            Box::new(Type::App(Box::new(Type::Arrow(loc)), Box::new(dom), loc)),
            Box::new(cod),
            loc,
        )
    }

    /// Right-nested function type `a1 → a2 → … → ret`.
    pub fn funcs(args: impl IntoIterator<Item = Type>, ret: Type) -> Self {
        let args: Vec<Type> = args.into_iter().collect();
        args.into_iter().rev().fold(ret, |acc, a| Type::func(a, acc))
    }

    pub fn array(interval: Interval, elem: Type) -> Self {
        let loc = interval.loc.merge(elem.loc());
        Type::Array(Box::new(interval), Box::new(elem), loc)
    }

    /// Splits `dom → cod` into its two sides.
    pub fn as_func(&self) -> Option<(&Type, &Type)> {
        match self {
            Type::App(head, cod, _) => match head.as_ref() {
                Type::App(op, dom, _) if matches!(op.as_ref(), Type::Arrow(_)) => {
                    Some((dom.as_ref(), cod.as_ref()))
                }
                _ => None,
            },
            _ => None,
        }
    }

    pub fn loc(&self) -> Loc {
        match self {
            Type::Base(_, loc)
            | Type::Array(_, _, loc)
            | Type::Tuple(_, loc)
            | Type::Arrow(loc)
            | Type::App(_, _, loc) => *loc,
            Type::Data(n) | Type::Var(n) | Type::Meta(n) => n.loc,
        }
    }
}
