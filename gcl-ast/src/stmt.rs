#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::{Expr, Loc, Name, Type};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Program {
    pub defns: Vec<Definition>,
    pub decls: Vec<Declaration>,
    /// Global properties.
    pub props: Vec<Expr>,
    pub stmts: Vec<Stmt>,
    pub loc: Loc,
}

impl Program {
    pub fn from_stmts(stmts: Vec<Stmt>) -> Self {
        Self {
            defns: Vec::new(),
            decls: Vec::new(),
            props: Vec::new(),
            stmts,
            loc: Loc::none(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Declaration {
    Const {
        names: Vec<Name>,
        ty: Type,
        prop: Option<Expr>,
        loc: Loc,
    },
    Var {
        names: Vec<Name>,
        ty: Type,
        prop: Option<Expr>,
        loc: Loc,
    },
}

impl Declaration {
    pub fn constant(names: &[&str], ty: Type) -> Self {
        Declaration::Const {
            names: names.iter().map(|n| Name::synthetic(*n)).collect(),
            ty,
            prop: None,
            loc: Loc::none(),
        }
    }

    pub fn var(names: &[&str], ty: Type) -> Self {
        Declaration::Var {
            names: names.iter().map(|n| Name::synthetic(*n)).collect(),
            ty,
            prop: None,
            loc: Loc::none(),
        }
    }

    pub fn names(&self) -> &[Name] {
        match self {
            Declaration::Const { names, .. } | Declaration::Var { names, .. } => names,
        }
    }

    pub fn loc(&self) -> Loc {
        match self {
            Declaration::Const { loc, .. } | Declaration::Var { loc, .. } => *loc,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDefnCtor {
    pub name: Name,
    pub args: Vec<Type>,
    pub loc: Loc,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Definition {
    /// `data T a b = C1 t11 t12 | C2 …`
    TypeDefn {
        name: Name,
        params: Vec<Name>,
        ctors: Vec<TypeDefnCtor>,
        loc: Loc,
    },
    FuncDefnSig {
        name: Name,
        ty: Type,
        prop: Option<Expr>,
        loc: Loc,
    },
    /// One expression per defining clause.
    FuncDefn {
        name: Name,
        clauses: Vec<Expr>,
        loc: Loc,
    },
}

impl Definition {
    pub fn loc(&self) -> Loc {
        match self {
            Definition::TypeDefn { loc, .. }
            | Definition::FuncDefnSig { loc, .. }
            | Definition::FuncDefn { loc, .. } => *loc,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GdCmd {
    pub guard: Expr,
    pub body: Vec<Stmt>,
    pub loc: Loc,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stmt {
    Skip(Loc),
    Abort(Loc),
    /// `x, y := e1, e2`
    Assign {
        names: Vec<Name>,
        exprs: Vec<Expr>,
        loc: Loc,
    },
    /// `a[i] := e`
    AAssign {
        array: Expr,
        index: Expr,
        value: Expr,
        loc: Loc,
    },
    Assert(Expr, Loc),
    /// `{ inv, bnd: e }`
    LoopInvariant {
        inv: Expr,
        bound: Option<Expr>,
        loc: Loc,
    },
    Do(Vec<GdCmd>, Loc),
    If(Vec<GdCmd>, Loc),
    /// A specification hole `[! … !]`.
    Spec {
        text: String,
        loc: Loc,
    },
    /// `x := new(e1, …, en)`
    Alloc {
        var: Name,
        exprs: Vec<Expr>,
        loc: Loc,
    },
    /// `x := *e`
    HLookup {
        var: Name,
        expr: Expr,
        loc: Loc,
    },
    /// `*e1 := e2`
    HMutate {
        cell: Expr,
        value: Expr,
        loc: Loc,
    },
    Dispose(Expr, Loc),
    Block(Box<Program>, Loc),
}

impl Stmt {
    pub fn assign(names: &[&str], exprs: Vec<Expr>) -> Self {
        Stmt::Assign {
            names: names.iter().map(|n| Name::synthetic(*n)).collect(),
            exprs,
            loc: Loc::none(),
        }
    }

    pub fn assert(e: Expr) -> Self {
        Stmt::Assert(e, Loc::none())
    }

    pub fn invariant(inv: Expr, bound: Option<Expr>) -> Self {
        Stmt::LoopInvariant {
            inv,
            bound,
            loc: Loc::none(),
        }
    }

    pub fn spec() -> Self {
        Stmt::Spec {
            text: String::new(),
            loc: Loc::none(),
        }
    }

    pub fn guarded(guard: Expr, body: Vec<Stmt>) -> GdCmd {
        GdCmd {
            guard,
            body,
            loc: Loc::none(),
        }
    }

    pub fn loc(&self) -> Loc {
        match self {
            Stmt::Skip(loc)
            | Stmt::Abort(loc)
            | Stmt::Assert(_, loc)
            | Stmt::Do(_, loc)
            | Stmt::If(_, loc)
            | Stmt::Dispose(_, loc)
            | Stmt::Block(_, loc) => *loc,
            Stmt::Assign { loc, .. }
            | Stmt::AAssign { loc, .. }
            | Stmt::LoopInvariant { loc, .. }
            | Stmt::Spec { loc, .. }
            | Stmt::Alloc { loc, .. }
            | Stmt::HLookup { loc, .. }
            | Stmt::HMutate { loc, .. } => *loc,
        }
    }
}
