#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use gcl_ast::{Name, Type};
use gcl_core::expr_subst::{substitute, ExprSubst};
use gcl_core::{TypedDeclaration, TypedExpr, TypedExprKind, TypedGdCmd, TypedProgram, TypedStmt};

/// Consistent renaming of the names a block declares.
#[derive(Debug, Default)]
pub(crate) struct Renaming {
    exprs: ExprSubst,
    names: BTreeMap<String, Name>,
}

impl Renaming {
    pub(crate) fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub(crate) fn insert(&mut self, decl: &TypedDeclaration, old: &Name, new: Name) {
        let ty = decl.ty().clone();
        let replacement = match decl {
            TypedDeclaration::Const { .. } => TypedExpr::constant(new.clone(), ty),
            TypedDeclaration::Var { .. } => TypedExpr::var(new.clone(), ty),
        };
        self.exprs.insert(old.text.clone(), replacement);
        self.names.insert(old.text.clone(), new);
    }

    pub(crate) fn renamed(&self, name: &Name) -> Name {
        match self.names.get(&name.text) {
            Some(new) => Name::new(new.text.clone(), name.loc),
            None => name.clone(),
        }
    }

    fn expr(&self, e: &TypedExpr) -> TypedExpr {
        substitute(&self.exprs, e)
    }

    fn without(&self, shadowed: &BTreeSet<String>) -> Renaming {
        Renaming {
            exprs: self
                .exprs
                .iter()
                .filter(|(k, _)| !shadowed.contains(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            names: self
                .names
                .iter()
                .filter(|(k, _)| !shadowed.contains(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    pub(crate) fn stmts(&self, stmts: &[TypedStmt]) -> Vec<TypedStmt> {
        stmts.iter().map(|s| self.stmt(s)).collect()
    }

    fn gdcmds(&self, cmds: &[TypedGdCmd]) -> Vec<TypedGdCmd> {
        cmds.iter()
            .map(|c| TypedGdCmd {
                guard: self.expr(&c.guard),
                body: self.stmts(&c.body),
                loc: c.loc,
            })
            .collect()
    }

    fn stmt(&self, stmt: &TypedStmt) -> TypedStmt {
        match stmt {
            TypedStmt::Skip(_) | TypedStmt::Abort(_) | TypedStmt::Spec { .. } => stmt.clone(),
            TypedStmt::Assign { names, exprs, loc } => TypedStmt::Assign {
                names: names.iter().map(|n| self.renamed(n)).collect(),
                exprs: exprs.iter().map(|e| self.expr(e)).collect(),
                loc: *loc,
            },
            TypedStmt::AAssign {
                array,
                index,
                value,
                loc,
            } => TypedStmt::AAssign {
                array: self.expr(array),
                index: self.expr(index),
                value: self.expr(value),
                loc: *loc,
            },
            TypedStmt::Assert(e, loc) => TypedStmt::Assert(self.expr(e), *loc),
            TypedStmt::LoopInvariant { inv, bound, loc } => TypedStmt::LoopInvariant {
                inv: self.expr(inv),
                bound: bound.as_ref().map(|b| self.expr(b)),
                loc: *loc,
            },
            TypedStmt::Do(cmds, loc) => TypedStmt::Do(self.gdcmds(cmds), *loc),
            TypedStmt::If(cmds, loc) => TypedStmt::If(self.gdcmds(cmds), *loc),
            TypedStmt::Alloc { var, exprs, loc } => TypedStmt::Alloc {
                var: self.renamed(var),
                exprs: exprs.iter().map(|e| self.expr(e)).collect(),
                loc: *loc,
            },
            TypedStmt::HLookup { var, expr, loc } => TypedStmt::HLookup {
                var: self.renamed(var),
                expr: self.expr(expr),
                loc: *loc,
            },
            TypedStmt::HMutate { cell, value, loc } => TypedStmt::HMutate {
                cell: self.expr(cell),
                value: self.expr(value),
                loc: *loc,
            },
            TypedStmt::Dispose(e, loc) => TypedStmt::Dispose(self.expr(e), *loc),
            TypedStmt::Block(program, loc) => {
                let shadowed: BTreeSet<String> =
                    program.bound_names().map(|n| n.text.clone()).collect();
                let inner = self.without(&shadowed);
                let mut program = program.as_ref().clone();
                program.stmts = inner.stmts(&program.stmts);
                TypedStmt::Block(Box::new(program), *loc)
            }
        }
    }
}

/// Every name declared by `program` or any block nested in it.
pub(crate) fn declared_names(program: &TypedProgram) -> BTreeSet<String> {
    let mut out: BTreeSet<String> = program.bound_names().map(|n| n.text.clone()).collect();
    collect_in_stmts(&program.stmts, &mut out);
    out
}

fn collect_in_stmts(stmts: &[TypedStmt], out: &mut BTreeSet<String>) {
    for stmt in stmts {
        match stmt {
            TypedStmt::Block(inner, _) => out.extend(declared_names(inner)),
            TypedStmt::Do(cmds, _) | TypedStmt::If(cmds, _) => {
                for cmd in cmds {
                    collect_in_stmts(&cmd.body, out);
                }
            }
            _ => {}
        }
    }
}

/// Whether a loop occurs anywhere in `stmts`, including conditional branches
/// and nested blocks.
pub(crate) fn contains_loop(stmts: &[TypedStmt]) -> bool {
    stmts.iter().any(|stmt| match stmt {
        TypedStmt::Do(..) => true,
        TypedStmt::If(cmds, _) => cmds.iter().any(|c| contains_loop(&c.body)),
        TypedStmt::Block(inner, _) => contains_loop(&inner.stmts),
        _ => false,
    })
}

/// The variable an array assignment writes through, when it is a plain name.
pub(crate) fn array_name(array: &TypedExpr) -> Option<(&Name, &Type)> {
    match &array.kind {
        TypedExprKind::Var(n) | TypedExprKind::Const(n) => Some((n, &array.ty)),
        _ => None,
    }
}
