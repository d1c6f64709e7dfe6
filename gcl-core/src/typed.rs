#![forbid(unsafe_code)]

//! Typed tree produced by elaboration.
//!
//! The shape mirrors `gcl_ast` node for node; every expression additionally
//! carries its resolved type. Tuples and `case` never elaborate, so they have
//! no typed counterpart.

use std::fmt;

use gcl_ast::{
    ArithOp, Chain, ChainLink, ChainOp, Expr, ExprKind, Lit, Loc, Name, Op, Type, TypeDefnCtor,
};
use serde::{Deserialize, Serialize};

use crate::builtin::arith_op_type;
use crate::env::TypeEnv;
use crate::kind::Kind;
use crate::subst::{Subst, Substitutable};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedExpr {
    pub kind: TypedExprKind,
    pub ty: Type,
    pub loc: Loc,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binder {
    pub name: Name,
    pub ty: Type,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypedExprKind {
    Lit(Lit),
    Var(Name),
    Const(Name),
    Op(Op),
    Chain(TypedChain),
    App(Box<TypedExpr>, Box<TypedExpr>),
    Lam(Binder, Box<TypedExpr>),
    Quant {
        op: Box<TypedExpr>,
        binders: Vec<Binder>,
        range: Box<TypedExpr>,
        body: Box<TypedExpr>,
    },
    ArrIdx(Box<TypedExpr>, Box<TypedExpr>),
    ArrUpd {
        array: Box<TypedExpr>,
        index: Box<TypedExpr>,
        value: Box<TypedExpr>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedChain {
    pub head: Box<TypedExpr>,
    pub links: Vec<TypedChainLink>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedChainLink {
    pub op: ChainOp,
    /// Instantiated type of the operator at this link.
    pub op_ty: Type,
    pub loc: Loc,
    pub rhs: TypedExpr,
}

impl TypedExpr {
    pub fn new(kind: TypedExprKind, ty: Type, loc: Loc) -> Self {
        Self { kind, ty, loc }
    }

    pub fn lit(lit: Lit) -> Self {
        let ty = crate::builtin::lit_type(&lit);
        Self::new(TypedExprKind::Lit(lit), ty, Loc::none())
    }

    pub fn bool(b: bool) -> Self {
        Self::lit(Lit::Bool(b))
    }

    pub fn num(n: i64) -> Self {
        Self::lit(Lit::Num(n))
    }

    pub fn var(name: Name, ty: Type) -> Self {
        let loc = name.loc;
        Self::new(TypedExprKind::Var(name), ty, loc)
    }

    pub fn constant(name: Name, ty: Type) -> Self {
        let loc = name.loc;
        Self::new(TypedExprKind::Const(name), ty, loc)
    }

    pub fn op(op: ArithOp) -> Self {
        Self::new(TypedExprKind::Op(Op::Arith(op)), arith_op_type(op), Loc::none())
    }

    /// `f a`, typed with the codomain of `f`.
    pub fn app(f: TypedExpr, arg: TypedExpr) -> Self {
        let ty = match f.ty.as_func() {
            Some((_, cod)) => cod.clone(),
            None => f.ty.clone(),
        };
        let loc = f.loc.merge(arg.loc);
        Self::new(TypedExprKind::App(Box::new(f), Box::new(arg)), ty, loc)
    }

    pub fn unary(op: ArithOp, e: TypedExpr) -> Self {
        Self::app(Self::op(op), e)
    }

    pub fn binary(op: ArithOp, l: TypedExpr, r: TypedExpr) -> Self {
        Self::app(Self::app(Self::op(op), l), r)
    }

    pub fn is_true(&self) -> bool {
        matches!(self.kind, TypedExprKind::Lit(Lit::Bool(true)))
    }

    pub fn conj(l: TypedExpr, r: TypedExpr) -> Self {
        Self::binary(ArithOp::Conj, l, r)
    }

    /// Left-nested conjunction; `True` when empty.
    pub fn conjunct(items: impl IntoIterator<Item = TypedExpr>) -> Self {
        let mut items = items.into_iter();
        match items.next() {
            Some(first) => items.fold(first, Self::conj),
            None => Self::bool(true),
        }
    }

    pub fn disj(l: TypedExpr, r: TypedExpr) -> Self {
        Self::binary(ArithOp::Disj, l, r)
    }

    /// Left-nested disjunction; `False` when empty.
    pub fn disjunct(items: impl IntoIterator<Item = TypedExpr>) -> Self {
        let mut items = items.into_iter();
        match items.next() {
            Some(first) => items.fold(first, Self::disj),
            None => Self::bool(false),
        }
    }

    pub fn implies(l: TypedExpr, r: TypedExpr) -> Self {
        Self::binary(ArithOp::Implies, l, r)
    }

    pub fn neg(e: TypedExpr) -> Self {
        Self::unary(ArithOp::Neg, e)
    }

    pub fn points_to(cell: TypedExpr, value: TypedExpr) -> Self {
        Self::binary(ArithOp::PointsTo, cell, value)
    }

    pub fn sconj(l: TypedExpr, r: TypedExpr) -> Self {
        Self::binary(ArithOp::SConj, l, r)
    }

    pub fn simp(l: TypedExpr, r: TypedExpr) -> Self {
        Self::binary(ArithOp::SImp, l, r)
    }

    /// Single-link comparison `l op r`.
    pub fn chain(l: TypedExpr, op: ChainOp, r: TypedExpr) -> Self {
        let op_ty = Type::funcs([l.ty.clone(), r.ty.clone()], Type::bool());
        let loc = l.loc.merge(r.loc);
        Self::new(
            TypedExprKind::Chain(TypedChain {
                head: Box::new(l),
                links: vec![TypedChainLink {
                    op,
                    op_ty,
                    loc: Loc::none(),
                    rhs: r,
                }],
            }),
            Type::bool(),
            loc,
        )
    }

    fn quant(op: ArithOp, binders: Vec<Binder>, range: TypedExpr, body: TypedExpr) -> Self {
        let ty = body.ty.clone();
        Self::new(
            TypedExprKind::Quant {
                op: Box::new(Self::op(op)),
                binders,
                range: Box::new(range),
                body: Box::new(body),
            },
            ty,
            Loc::none(),
        )
    }

    pub fn forall(binders: Vec<Binder>, range: TypedExpr, body: TypedExpr) -> Self {
        Self::quant(ArithOp::Conj, binders, range, body)
    }

    pub fn exists(binders: Vec<Binder>, range: TypedExpr, body: TypedExpr) -> Self {
        Self::quant(ArithOp::Disj, binders, range, body)
    }

    /// Forgets the types, giving back the surface expression.
    pub fn erase(&self) -> Expr {
        let kind = match &self.kind {
            TypedExprKind::Lit(l) => ExprKind::Lit(l.clone()),
            TypedExprKind::Var(n) => ExprKind::Var(n.clone()),
            TypedExprKind::Const(n) => ExprKind::Const(n.clone()),
            TypedExprKind::Op(op) => ExprKind::Op(*op),
            TypedExprKind::Chain(chain) => ExprKind::Chain(Chain {
                head: Box::new(chain.head.erase()),
                links: chain
                    .links
                    .iter()
                    .map(|l| ChainLink {
                        op: l.op,
                        loc: l.loc,
                        rhs: l.rhs.erase(),
                    })
                    .collect(),
            }),
            TypedExprKind::App(f, a) => ExprKind::App(Box::new(f.erase()), Box::new(a.erase())),
            TypedExprKind::Lam(b, body) => ExprKind::Lam(b.name.clone(), Box::new(body.erase())),
            TypedExprKind::Quant {
                op,
                binders,
                range,
                body,
            } => ExprKind::Quant {
                op: Box::new(op.erase()),
                binders: binders.iter().map(|b| b.name.clone()).collect(),
                range: Box::new(range.erase()),
                body: Box::new(body.erase()),
            },
            TypedExprKind::ArrIdx(a, i) => {
                ExprKind::ArrIdx(Box::new(a.erase()), Box::new(i.erase()))
            }
            TypedExprKind::ArrUpd {
                array,
                index,
                value,
            } => ExprKind::ArrUpd {
                array: Box::new(array.erase()),
                index: Box::new(index.erase()),
                value: Box::new(value.erase()),
            },
        };
        Expr::new(kind, self.loc)
    }

    pub fn apply_subst(&mut self, s: &Subst<Type>) {
        self.ty = self.ty.apply(s);
        match &mut self.kind {
            TypedExprKind::Lit(_)
            | TypedExprKind::Var(_)
            | TypedExprKind::Const(_)
            | TypedExprKind::Op(_) => {}
            TypedExprKind::Chain(chain) => {
                chain.head.apply_subst(s);
                for link in &mut chain.links {
                    link.op_ty = link.op_ty.apply(s);
                    link.rhs.apply_subst(s);
                }
            }
            TypedExprKind::App(f, a) | TypedExprKind::ArrIdx(f, a) => {
                f.apply_subst(s);
                a.apply_subst(s);
            }
            TypedExprKind::Lam(b, body) => {
                b.ty = b.ty.apply(s);
                body.apply_subst(s);
            }
            TypedExprKind::Quant {
                op,
                binders,
                range,
                body,
            } => {
                op.apply_subst(s);
                for b in binders {
                    b.ty = b.ty.apply(s);
                }
                range.apply_subst(s);
                body.apply_subst(s);
            }
            TypedExprKind::ArrUpd {
                array,
                index,
                value,
            } => {
                array.apply_subst(s);
                index.apply_subst(s);
                value.apply_subst(s);
            }
        }
    }
}

impl fmt::Display for TypedExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.erase().fmt(f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedGdCmd {
    pub guard: TypedExpr,
    pub body: Vec<TypedStmt>,
    pub loc: Loc,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypedStmt {
    Skip(Loc),
    Abort(Loc),
    Assign {
        names: Vec<Name>,
        exprs: Vec<TypedExpr>,
        loc: Loc,
    },
    AAssign {
        array: TypedExpr,
        index: TypedExpr,
        value: TypedExpr,
        loc: Loc,
    },
    Assert(TypedExpr, Loc),
    LoopInvariant {
        inv: TypedExpr,
        bound: Option<TypedExpr>,
        loc: Loc,
    },
    Do(Vec<TypedGdCmd>, Loc),
    If(Vec<TypedGdCmd>, Loc),
    /// Hole together with the environment visible at that point.
    Spec {
        text: String,
        env: TypeEnv,
        loc: Loc,
    },
    Alloc {
        var: Name,
        exprs: Vec<TypedExpr>,
        loc: Loc,
    },
    HLookup {
        var: Name,
        expr: TypedExpr,
        loc: Loc,
    },
    HMutate {
        cell: TypedExpr,
        value: TypedExpr,
        loc: Loc,
    },
    Dispose(TypedExpr, Loc),
    Block(Box<TypedProgram>, Loc),
}

impl TypedStmt {
    pub fn loc(&self) -> Loc {
        match self {
            TypedStmt::Skip(loc)
            | TypedStmt::Abort(loc)
            | TypedStmt::Assert(_, loc)
            | TypedStmt::Do(_, loc)
            | TypedStmt::If(_, loc)
            | TypedStmt::Dispose(_, loc)
            | TypedStmt::Block(_, loc) => *loc,
            TypedStmt::Assign { loc, .. }
            | TypedStmt::AAssign { loc, .. }
            | TypedStmt::LoopInvariant { loc, .. }
            | TypedStmt::Spec { loc, .. }
            | TypedStmt::Alloc { loc, .. }
            | TypedStmt::HLookup { loc, .. }
            | TypedStmt::HMutate { loc, .. } => *loc,
        }
    }

    pub fn apply_subst(&mut self, s: &Subst<Type>) {
        match self {
            TypedStmt::Skip(_) | TypedStmt::Abort(_) => {}
            TypedStmt::Assign { exprs, .. } | TypedStmt::Alloc { exprs, .. } => {
                for e in exprs {
                    e.apply_subst(s);
                }
            }
            TypedStmt::AAssign {
                array,
                index,
                value,
                ..
            } => {
                array.apply_subst(s);
                index.apply_subst(s);
                value.apply_subst(s);
            }
            TypedStmt::Assert(e, _) | TypedStmt::Dispose(e, _) => e.apply_subst(s),
            TypedStmt::HLookup { expr, .. } => expr.apply_subst(s),
            TypedStmt::LoopInvariant { inv, bound, .. } => {
                inv.apply_subst(s);
                if let Some(b) = bound {
                    b.apply_subst(s);
                }
            }
            TypedStmt::Do(cmds, _) | TypedStmt::If(cmds, _) => {
                for cmd in cmds {
                    cmd.guard.apply_subst(s);
                    for stmt in &mut cmd.body {
                        stmt.apply_subst(s);
                    }
                }
            }
            TypedStmt::Spec { env, .. } => *env = env.apply(s),
            TypedStmt::HMutate { cell, value, .. } => {
                cell.apply_subst(s);
                value.apply_subst(s);
            }
            TypedStmt::Block(program, _) => program.apply_subst(s),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypedDeclaration {
    Const {
        names: Vec<Name>,
        ty: Type,
        prop: Option<TypedExpr>,
        loc: Loc,
    },
    Var {
        names: Vec<Name>,
        ty: Type,
        prop: Option<TypedExpr>,
        loc: Loc,
    },
}

impl TypedDeclaration {
    pub fn names(&self) -> &[Name] {
        match self {
            TypedDeclaration::Const { names, .. } | TypedDeclaration::Var { names, .. } => names,
        }
    }

    pub fn ty(&self) -> &Type {
        match self {
            TypedDeclaration::Const { ty, .. } | TypedDeclaration::Var { ty, .. } => ty,
        }
    }

    fn prop_mut(&mut self) -> Option<&mut TypedExpr> {
        match self {
            TypedDeclaration::Const { prop, .. } | TypedDeclaration::Var { prop, .. } => {
                prop.as_mut()
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypedDefinition {
    TypeDefn {
        name: Name,
        params: Vec<Name>,
        ctors: Vec<TypeDefnCtor>,
        kind: Kind,
        loc: Loc,
    },
    FuncDefnSig {
        name: Name,
        ty: Type,
        prop: Option<TypedExpr>,
        loc: Loc,
    },
    /// A definition with its generalized type.
    FuncDefn {
        name: Name,
        ty: Type,
        body: TypedExpr,
        loc: Loc,
    },
}

impl TypedDefinition {
    pub fn name(&self) -> &Name {
        match self {
            TypedDefinition::TypeDefn { name, .. }
            | TypedDefinition::FuncDefnSig { name, .. }
            | TypedDefinition::FuncDefn { name, .. } => name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedProgram {
    pub defns: Vec<TypedDefinition>,
    pub decls: Vec<TypedDeclaration>,
    pub props: Vec<TypedExpr>,
    pub stmts: Vec<TypedStmt>,
    pub loc: Loc,
}

impl TypedProgram {
    /// Every name the program binds: declarations, constructors, functions.
    pub fn bound_names(&self) -> impl Iterator<Item = &Name> {
        let decls = self.decls.iter().flat_map(|d| d.names().iter());
        let defns = self.defns.iter().flat_map(|d| match d {
            TypedDefinition::TypeDefn { ctors, .. } => {
                ctors.iter().map(|c| &c.name).collect::<Vec<_>>()
            }
            other => vec![other.name()],
        });
        decls.chain(defns)
    }

    pub fn apply_subst(&mut self, s: &Subst<Type>) {
        for defn in &mut self.defns {
            match defn {
                TypedDefinition::TypeDefn { .. } => {}
                TypedDefinition::FuncDefnSig { ty, prop, .. } => {
                    *ty = ty.apply(s);
                    if let Some(p) = prop {
                        p.apply_subst(s);
                    }
                }
                TypedDefinition::FuncDefn { ty, body, .. } => {
                    *ty = ty.apply(s);
                    body.apply_subst(s);
                }
            }
        }
        for decl in &mut self.decls {
            if let Some(p) = decl.prop_mut() {
                p.apply_subst(s);
            }
        }
        for p in &mut self.props {
            p.apply_subst(s);
        }
        for stmt in &mut self.stmts {
            stmt.apply_subst(s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_var(n: &str) -> TypedExpr {
        TypedExpr::var(Name::synthetic(n), Type::int())
    }

    #[test]
    fn empty_conjunction_is_true() {
        assert!(TypedExpr::conjunct(Vec::new()).is_true());
        assert_eq!(TypedExpr::disjunct(Vec::new()).to_string(), "False");
    }

    #[test]
    fn formula_builders_print_canonically() {
        let e = TypedExpr::implies(
            TypedExpr::chain(int_var("x"), ChainOp::Gt, TypedExpr::num(0)),
            TypedExpr::points_to(int_var("p"), int_var("x")),
        );
        assert_eq!(e.to_string(), "(x > 0) ⇒ (p ↦ x)");
        assert_eq!(e.ty, Type::bool());
    }

    #[test]
    fn substitution_reaches_binders_and_chain_operators() {
        let m = Type::Meta(Name::synthetic("m"));
        let x = TypedExpr::var(Name::synthetic("x"), m.clone());
        let mut e = TypedExpr::forall(
            vec![Binder {
                name: Name::synthetic("x"),
                ty: m.clone(),
            }],
            TypedExpr::bool(true),
            TypedExpr::chain(x.clone(), ChainOp::Eq, x),
        );
        e.apply_subst(&Subst::singleton("m", Type::int()));
        let TypedExprKind::Quant { binders, body, .. } = &e.kind else {
            panic!("expected a quantifier");
        };
        assert_eq!(binders[0].ty, Type::int());
        let TypedExprKind::Chain(chain) = &body.kind else {
            panic!("expected a chain");
        };
        assert_eq!(
            chain.links[0].op_ty,
            Type::funcs([Type::int(), Type::int()], Type::bool())
        );
    }
}
