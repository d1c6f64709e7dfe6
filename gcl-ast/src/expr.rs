#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::{Loc, Name};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lit {
    Num(i64),
    Bool(bool),
    Chr(char),
    /// The empty heap.
    Emp,
}

/// Comparison operators; these may be chained (`a < b ≤ c`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Propositional equivalence `≡`.
    EqProp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithOp {
    Implies,
    Conj,
    Disj,
    Neg,
    NegNum,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Max,
    Min,
    Exp,
    /// Counting operator; also the combining operator of `#` quantifiers.
    Hash,
    PointsTo,
    SConj,
    SImp,
}

impl ArithOp {
    pub fn is_unary(self) -> bool {
        matches!(self, ArithOp::Neg | ArithOp::NegNum)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    Chain(ChainOp),
    Arith(ArithOp),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub loc: Loc,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExprKind {
    Lit(Lit),
    Var(Name),
    Const(Name),
    Op(Op),
    Chain(Chain),
    App(Box<Expr>, Box<Expr>),
    Lam(Name, Box<Expr>),
    /// `⟨ op binders : range : body ⟩`
    Quant {
        op: Box<Expr>,
        binders: Vec<Name>,
        range: Box<Expr>,
        body: Box<Expr>,
    },
    ArrIdx(Box<Expr>, Box<Expr>),
    /// `(array : index ↦ value)`
    ArrUpd {
        array: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
    },
    Tuple(Vec<Expr>),
    Case(Box<Expr>, Vec<CaseClause>),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chain {
    pub head: Box<Expr>,
    pub links: Vec<ChainLink>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainLink {
    pub op: ChainOp,
    pub loc: Loc,
    pub rhs: Expr,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseClause {
    pub pattern: Expr,
    pub body: Expr,
    pub loc: Loc,
}

impl Expr {
    pub fn new(kind: ExprKind, loc: Loc) -> Self {
        Self { kind, loc }
    }

    fn synth(kind: ExprKind) -> Self {
        Self::new(kind, Loc::none())
    }

    pub fn var(name: &str) -> Self {
        Self::synth(ExprKind::Var(Name::synthetic(name)))
    }

    pub fn constant(name: &str) -> Self {
        Self::synth(ExprKind::Const(Name::synthetic(name)))
    }

    pub fn num(n: i64) -> Self {
        Self::synth(ExprKind::Lit(Lit::Num(n)))
    }

    pub fn bool(b: bool) -> Self {
        Self::synth(ExprKind::Lit(Lit::Bool(b)))
    }

    pub fn op(op: ArithOp) -> Self {
        Self::synth(ExprKind::Op(Op::Arith(op)))
    }

    pub fn app(f: Expr, arg: Expr) -> Self {
        let loc = f.loc.merge(arg.loc);
        Self::new(ExprKind::App(Box::new(f), Box::new(arg)), loc)
    }

    pub fn unary(op: ArithOp, e: Expr) -> Self {
        Self::app(Self::op(op), e)
    }

    pub fn binary(op: ArithOp, l: Expr, r: Expr) -> Self {
        Self::app(Self::app(Self::op(op), l), r)
    }

    /// A single-link comparison `l op r`.
    pub fn chain(l: Expr, op: ChainOp, r: Expr) -> Self {
        let loc = l.loc.merge(r.loc);
        Self::new(
            ExprKind::Chain(Chain {
                head: Box::new(l),
                links: vec![ChainLink {
                    op,
                    loc: Loc::none(),
                    rhs: r,
                }],
            }),
            loc,
        )
    }

    pub fn lam(param: &str, body: Expr) -> Self {
        let loc = body.loc;
        Self::new(ExprKind::Lam(Name::synthetic(param), Box::new(body)), loc)
    }

    pub fn quant(op: Expr, binders: &[&str], range: Expr, body: Expr) -> Self {
        Self::synth(ExprKind::Quant {
            op: Box::new(op),
            binders: binders.iter().map(|b| Name::synthetic(*b)).collect(),
            range: Box::new(range),
            body: Box::new(body),
        })
    }

    pub fn index(array: Expr, index: Expr) -> Self {
        let loc = array.loc.merge(index.loc);
        Self::new(ExprKind::ArrIdx(Box::new(array), Box::new(index)), loc)
    }

    pub fn update(array: Expr, index: Expr, value: Expr) -> Self {
        Self::synth(ExprKind::ArrUpd {
            array: Box::new(array),
            index: Box::new(index),
            value: Box::new(value),
        })
    }

    pub fn with_loc(mut self, loc: Loc) -> Self {
        self.loc = loc;
        self
    }
}
