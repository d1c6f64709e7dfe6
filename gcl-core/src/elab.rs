#![forbid(unsafe_code)]

//! Algorithm W over expressions and statements.
//!
//! Every rule returns the typed node together with the substitution it
//! produced. Types stored in nodes are only final once the program-level
//! substitution is applied to the whole tree.

use std::collections::BTreeSet;

use gcl_ast::{ArithOp, Declaration, Expr, ExprKind, GdCmd, Name, Op, Program, Stmt, Type};

use crate::builtin::{arith_op_type, chain_op_type, lit_type};
use crate::env::{TypeEnv, TypeInfo};
use crate::error::{ElabError, TypeError};
use crate::fresh::FreshSupply;
use crate::kind::{infer_kind, unify_kind, Kind, KindContext};
use crate::subst::{free_metas, free_rigid_vars, FreeVars, Subst, Substitutable};
use crate::typed::{
    Binder, TypedChain, TypedChainLink, TypedDeclaration, TypedExpr, TypedExprKind, TypedGdCmd,
    TypedProgram, TypedStmt,
};
use crate::unify::unify;

/// Elaboration state for one program: fresh supply and kind context.
///
/// The typing environment is passed explicitly to each rule.
#[derive(Debug, Default)]
pub struct Elaborator {
    pub(crate) fresh: FreshSupply,
    pub(crate) kinds: KindContext,
    /// Definitions whose placeholder type must not be instantiated yet.
    pub(crate) in_progress: BTreeSet<String>,
}

impl Elaborator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(&self) -> &KindContext {
        &self.kinds
    }

    pub fn fresh_supply(&self) -> &FreshSupply {
        &self.fresh
    }

    pub(crate) fn fresh_meta(&mut self) -> Type {
        self.fresh.fresh_meta()
    }

    /// Replaces the rigid variables of a stored type with fresh metavariables.
    fn instantiate(&mut self, name: &str, ty: &Type) -> Type {
        if self.in_progress.contains(name) {
            return ty.clone();
        }
        let vars = free_rigid_vars(ty);
        if vars.is_empty() {
            return ty.clone();
        }
        let s: Subst<Type> = vars
            .into_iter()
            .map(|v| (v, self.fresh.fresh_meta()))
            .collect();
        ty.apply(&s)
    }

    /// Replaces the rigid variables of a signature with fresh metavariables,
    /// returning each variable with the metavariable standing for it.
    pub(crate) fn skolemize(&mut self, ty: &Type) -> (Type, Vec<(String, Type)>) {
        let rigid: Vec<(String, Type)> = free_rigid_vars(ty)
            .into_iter()
            .map(|v| (v, self.fresh.fresh_meta()))
            .collect();
        let s: Subst<Type> = rigid.iter().cloned().collect();
        (ty.apply(&s), rigid)
    }

    /// Generalizing substitution for `ty`: metavariables not free in `env`
    /// become fresh rigid variables.
    pub(crate) fn generalize(&mut self, env: &TypeEnv, ty: &Type) -> Subst<Type> {
        let env_free = env.free_vars();
        free_metas(ty)
            .into_iter()
            .filter(|m| !env_free.contains(m))
            .map(|m| (m, Type::Var(self.fresh.fresh("a"))))
            .collect()
    }

    /// Checks that `ty` has kind `*`.
    ///
    /// With `bind_vars`, rigid type variables are accepted and get a kind for
    /// the duration of the check; otherwise they must already be in scope.
    pub(crate) fn check_kind(&mut self, ty: &Type, bind_vars: bool) -> Result<(), TypeError> {
        let mut bound = Vec::new();
        if bind_vars {
            for v in free_rigid_vars(ty) {
                if self.kinds.lookup(&v).is_none() {
                    let m = self.kinds.push_unsolved(&mut self.fresh);
                    self.kinds.annotate(Name::synthetic(v.clone()), Kind::Meta(m))?;
                    bound.push(v);
                }
            }
        }
        let result = infer_kind(&mut self.kinds, &mut self.fresh, ty).and_then(|k| {
            unify_kind(&mut self.kinds, &mut self.fresh, &k, &Kind::Star, ty.loc())
        });
        for v in bound {
            self.kinds.remove_annotation(&v);
        }
        result
    }

    pub(crate) fn expr(
        &mut self,
        env: &TypeEnv,
        expr: &Expr,
    ) -> Result<(TypedExpr, Subst<Type>), ElabError> {
        let loc = expr.loc;
        match &expr.kind {
            ExprKind::Lit(lit) => Ok((
                TypedExpr::new(TypedExprKind::Lit(lit.clone()), lit_type(lit), loc),
                Subst::empty(),
            )),

            ExprKind::Var(n) | ExprKind::Const(n) => {
                let info = env.lookup(&n.text).ok_or_else(|| TypeError::NotInScope {
                    name: n.text.clone(),
                    span: n.loc.merge(loc).span(),
                })?;
                let ty = self.instantiate(&n.text, info.ty());
                let kind = match &expr.kind {
                    ExprKind::Var(_) => TypedExprKind::Var(n.clone()),
                    _ => TypedExprKind::Const(n.clone()),
                };
                Ok((TypedExpr::new(kind, ty, loc), Subst::empty()))
            }

            ExprKind::Op(op) => {
                let ty = match op {
                    Op::Arith(a) => arith_op_type(*a),
                    Op::Chain(c) => chain_op_type(*c, &mut self.fresh),
                };
                Ok((TypedExpr::new(TypedExprKind::Op(*op), ty, loc), Subst::empty()))
            }

            ExprKind::Chain(chain) => {
                let (head, mut s) = self.expr(env, &chain.head)?;
                let mut prev = head.ty.clone();
                let mut links = Vec::with_capacity(chain.links.len());
                for link in &chain.links {
                    let (rhs, s1) = self.expr(&env.apply(&s), &link.rhs)?;
                    s = s1.compose(&s);
                    let op_ty = chain_op_type(link.op, &mut self.fresh);
                    let result = self.fresh_meta();
                    let s2 = unify(
                        &op_ty,
                        &Type::funcs([prev.apply(&s), rhs.ty.clone()], result.clone()),
                        link.loc.merge(loc),
                    )?;
                    s = s2.compose(&s);
                    let s3 = unify(&result.apply(&s), &Type::bool(), link.loc.merge(loc))?;
                    s = s3.compose(&s);
                    prev = rhs.ty.apply(&s);
                    links.push(TypedChainLink {
                        op: link.op,
                        op_ty: op_ty.apply(&s),
                        loc: link.loc,
                        rhs,
                    });
                }
                let node = TypedExprKind::Chain(TypedChain {
                    head: Box::new(head),
                    links,
                });
                Ok((TypedExpr::new(node, Type::bool(), loc), s))
            }

            ExprKind::App(f, a) => {
                let (f, s1) = self.expr(env, f)?;
                let (a, s2) = self.expr(&env.apply(&s1), a)?;
                let result = self.fresh_meta();
                let s3 = unify(
                    &f.ty.apply(&s2),
                    &Type::func(a.ty.clone(), result.clone()),
                    loc,
                )?;
                let ty = result.apply(&s3);
                let s = s3.compose(&s2.compose(&s1));
                Ok((
                    TypedExpr::new(TypedExprKind::App(Box::new(f), Box::new(a)), ty, loc),
                    s,
                ))
            }

            ExprKind::Lam(x, body) => {
                let param = self.fresh_meta();
                let mut inner = env.clone();
                inner.insert(x.clone(), TypeInfo::Const(param.clone()));
                let (body, s) = self.expr(&inner, body)?;
                let param = param.apply(&s);
                let ty = Type::func(param.clone(), body.ty.clone());
                let binder = Binder {
                    name: x.clone(),
                    ty: param,
                };
                Ok((
                    TypedExpr::new(TypedExprKind::Lam(binder, Box::new(body)), ty, loc),
                    s,
                ))
            }

            ExprKind::Quant {
                op,
                binders,
                range,
                body,
            } => self.quant(env, op, binders, range, body, expr),

            ExprKind::ArrIdx(array, index) => {
                let (array, s1) = self.expr(env, array)?;
                let (index, s2) = self.expr(&env.apply(&s1), index)?;
                let result = self.fresh_meta();
                let s3 = unify(
                    &array.ty.apply(&s2),
                    &Type::func(index.ty.clone(), result.clone()),
                    loc,
                )?;
                let ty = result.apply(&s3);
                let s = s3.compose(&s2.compose(&s1));
                Ok((
                    TypedExpr::new(
                        TypedExprKind::ArrIdx(Box::new(array), Box::new(index)),
                        ty,
                        loc,
                    ),
                    s,
                ))
            }

            ExprKind::ArrUpd {
                array,
                index,
                value,
            } => {
                let (array, s1) = self.expr(env, array)?;
                let (index, s2) = self.expr(&env.apply(&s1), index)?;
                let s = s2.compose(&s1);
                let (value, s3) = self.expr(&env.apply(&s), value)?;
                let s = s3.compose(&s);
                let s4 = unify(
                    &array.ty.apply(&s),
                    &Type::func(index.ty.apply(&s), value.ty.clone()),
                    loc,
                )?;
                let s = s4.compose(&s);
                let ty = array.ty.apply(&s);
                Ok((
                    TypedExpr::new(
                        TypedExprKind::ArrUpd {
                            array: Box::new(array),
                            index: Box::new(index),
                            value: Box::new(value),
                        },
                        ty,
                        loc,
                    ),
                    s,
                ))
            }

            ExprKind::Tuple(_) => Err(ElabError::Unsupported {
                construct: "tuple expression",
                span: loc.span(),
            }),
            ExprKind::Case(..) => Err(ElabError::Unsupported {
                construct: "case expression",
                span: loc.span(),
            }),
        }
    }

    fn quant(
        &mut self,
        env: &TypeEnv,
        op: &Expr,
        binders: &[Name],
        range: &Expr,
        body: &Expr,
        whole: &Expr,
    ) -> Result<(TypedExpr, Subst<Type>), ElabError> {
        let loc = whole.loc;
        let mut inner = env.clone();
        let mut bound = Vec::with_capacity(binders.len());
        for b in binders {
            let ty = self.fresh_meta();
            inner.insert(b.clone(), TypeInfo::Const(ty.clone()));
            bound.push((b.clone(), ty));
        }

        let (range, s1) = self.expr(&inner, range)?;
        let s2 = unify(&range.ty, &Type::bool(), range.loc)?;
        let mut s = s2.compose(&s1);
        let (body, s3) = self.expr(&inner.apply(&s), body)?;
        s = s3.compose(&s);

        let (op, ty) = if matches!(op.kind, ExprKind::Op(Op::Arith(ArithOp::Hash))) {
            // ⟨# x : r : p⟩ counts the x satisfying r ∧ p.
            let (op, s4) = self.expr(&env.apply(&s), op)?;
            s = s4.compose(&s);
            let s5 = unify(&body.ty.apply(&s), &Type::bool(), body.loc)?;
            s = s5.compose(&s);
            (op, Type::int())
        } else {
            let (op, s4) = self.expr(&env.apply(&s), op)?;
            s = s4.compose(&s);
            let a = self.fresh_meta();
            let monoid = Type::funcs([a.clone(), a.clone()], a.clone());
            let s5 = unify(&op.ty.apply(&s), &monoid, op.loc.merge(loc))?;
            s = s5.compose(&s);
            let s6 = unify(&a.apply(&s), &body.ty.apply(&s), body.loc.merge(loc))?;
            s = s6.compose(&s);
            (op, a.apply(&s))
        };

        let binders = bound
            .into_iter()
            .map(|(name, ty)| Binder {
                name,
                ty: ty.apply(&s),
            })
            .collect();
        let node = TypedExprKind::Quant {
            op: Box::new(op),
            binders,
            range: Box::new(range),
            body: Box::new(body),
        };
        Ok((TypedExpr::new(node, ty, loc), s))
    }

    /// Elaborates `expr` and unifies its type with `expected`.
    fn expect(
        &mut self,
        env: &TypeEnv,
        expr: &Expr,
        expected: &Type,
    ) -> Result<(TypedExpr, Subst<Type>), ElabError> {
        let (typed, s1) = self.expr(env, expr)?;
        let s2 = unify(&expected.apply(&s1), &typed.ty, expr.loc)?;
        Ok((typed, s2.compose(&s1)))
    }

    fn mutable_var(&self, env: &TypeEnv, name: &Name) -> Result<Type, TypeError> {
        let info = env.lookup(&name.text).ok_or_else(|| TypeError::NotInScope {
            name: name.text.clone(),
            span: name.loc.span(),
        })?;
        if !info.is_mutable() {
            return Err(TypeError::AssignToConst {
                name: name.text.clone(),
                span: name.loc.span(),
            });
        }
        Ok(info.ty().clone())
    }

    pub(crate) fn stmts(
        &mut self,
        env: &TypeEnv,
        stmts: &[Stmt],
    ) -> Result<(Vec<TypedStmt>, Subst<Type>), ElabError> {
        let mut s = Subst::empty();
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            let (typed, s1) = self.stmt(&env.apply(&s), stmt)?;
            s = s1.compose(&s);
            out.push(typed);
        }
        Ok((out, s))
    }

    fn gdcmd(
        &mut self,
        env: &TypeEnv,
        cmd: &GdCmd,
    ) -> Result<(TypedGdCmd, Subst<Type>), ElabError> {
        let (guard, s1) = self.expect(env, &cmd.guard, &Type::bool())?;
        let (body, s2) = self.stmts(&env.apply(&s1), &cmd.body)?;
        Ok((
            TypedGdCmd {
                guard,
                body,
                loc: cmd.loc,
            },
            s2.compose(&s1),
        ))
    }

    fn gdcmds(
        &mut self,
        env: &TypeEnv,
        cmds: &[GdCmd],
    ) -> Result<(Vec<TypedGdCmd>, Subst<Type>), ElabError> {
        let mut s = Subst::empty();
        let mut out = Vec::with_capacity(cmds.len());
        for cmd in cmds {
            let (typed, s1) = self.gdcmd(&env.apply(&s), cmd)?;
            s = s1.compose(&s);
            out.push(typed);
        }
        Ok((out, s))
    }

    /// Elaborates each expression against the same expected type, in order.
    fn expect_all(
        &mut self,
        env: &TypeEnv,
        exprs: &[Expr],
        expected: &Type,
    ) -> Result<(Vec<TypedExpr>, Subst<Type>), ElabError> {
        let mut s = Subst::empty();
        let mut out = Vec::with_capacity(exprs.len());
        for e in exprs {
            let (typed, s1) = self.expect(&env.apply(&s), e, &expected.apply(&s))?;
            s = s1.compose(&s);
            out.push(typed);
        }
        Ok((out, s))
    }

    pub(crate) fn stmt(
        &mut self,
        env: &TypeEnv,
        stmt: &Stmt,
    ) -> Result<(TypedStmt, Subst<Type>), ElabError> {
        match stmt {
            Stmt::Skip(loc) => Ok((TypedStmt::Skip(*loc), Subst::empty())),
            Stmt::Abort(loc) => Ok((TypedStmt::Abort(*loc), Subst::empty())),

            Stmt::Assign { names, exprs, loc } => {
                let mut targets = Vec::with_capacity(names.len());
                for name in names {
                    targets.push(self.mutable_var(env, name)?);
                }
                if names.len() > exprs.len() {
                    return Err(TypeError::RedundantNames {
                        names: names[exprs.len()..].iter().map(|n| n.text.clone()).collect(),
                        span: loc.span(),
                    }
                    .into());
                }
                if exprs.len() > names.len() {
                    return Err(TypeError::RedundantExprs {
                        exprs: exprs[names.len()..].iter().map(|e| e.to_string()).collect(),
                        span: loc.span(),
                    }
                    .into());
                }
                let mut s = Subst::empty();
                let mut typed = Vec::with_capacity(exprs.len());
                for (target, e) in targets.iter().zip(exprs) {
                    let (te, s1) = self.expect(&env.apply(&s), e, &target.apply(&s))?;
                    s = s1.compose(&s);
                    typed.push(te);
                }
                Ok((
                    TypedStmt::Assign {
                        names: names.clone(),
                        exprs: typed,
                        loc: *loc,
                    },
                    s,
                ))
            }

            Stmt::AAssign {
                array,
                index,
                value,
                loc,
            } => {
                if let ExprKind::Var(n) | ExprKind::Const(n) = &array.kind {
                    self.mutable_var(env, n)?;
                }
                let (array, s1) = self.expr(env, array)?;
                let (index, s2) = self.expr(&env.apply(&s1), index)?;
                let s = s2.compose(&s1);
                let (value, s3) = self.expr(&env.apply(&s), value)?;
                let s = s3.compose(&s);
                let s4 = unify(
                    &array.ty.apply(&s),
                    &Type::func(index.ty.apply(&s), value.ty.clone()),
                    *loc,
                )?;
                Ok((
                    TypedStmt::AAssign {
                        array,
                        index,
                        value,
                        loc: *loc,
                    },
                    s4.compose(&s),
                ))
            }

            Stmt::Assert(e, loc) => {
                let (e, s) = self.expect(env, e, &Type::bool())?;
                Ok((TypedStmt::Assert(e, *loc), s))
            }

            Stmt::LoopInvariant { inv, bound, loc } => {
                let (inv, mut s) = self.expect(env, inv, &Type::bool())?;
                let bound = match bound {
                    Some(b) => {
                        let (b, s1) = self.expect(&env.apply(&s), b, &Type::int())?;
                        s = s1.compose(&s);
                        Some(b)
                    }
                    None => None,
                };
                Ok((
                    TypedStmt::LoopInvariant {
                        inv,
                        bound,
                        loc: *loc,
                    },
                    s,
                ))
            }

            Stmt::Do(cmds, loc) => {
                let (cmds, s) = self.gdcmds(env, cmds)?;
                Ok((TypedStmt::Do(cmds, *loc), s))
            }
            Stmt::If(cmds, loc) => {
                let (cmds, s) = self.gdcmds(env, cmds)?;
                Ok((TypedStmt::If(cmds, *loc), s))
            }

            Stmt::Spec { text, loc } => Ok((
                TypedStmt::Spec {
                    text: text.clone(),
                    env: env.clone(),
                    loc: *loc,
                },
                Subst::empty(),
            )),

            Stmt::Alloc { var, exprs, loc } => {
                let target = self.mutable_var(env, var)?;
                let s1 = unify(&target, &Type::int(), var.loc.merge(*loc))?;
                let (exprs, s2) = self.expect_all(&env.apply(&s1), exprs, &Type::int())?;
                Ok((
                    TypedStmt::Alloc {
                        var: var.clone(),
                        exprs,
                        loc: *loc,
                    },
                    s2.compose(&s1),
                ))
            }

            Stmt::HLookup { var, expr, loc } => {
                let target = self.mutable_var(env, var)?;
                let s1 = unify(&target, &Type::int(), var.loc.merge(*loc))?;
                let (expr, s2) = self.expect(&env.apply(&s1), expr, &Type::int())?;
                Ok((
                    TypedStmt::HLookup {
                        var: var.clone(),
                        expr,
                        loc: *loc,
                    },
                    s2.compose(&s1),
                ))
            }

            Stmt::HMutate { cell, value, loc } => {
                let (cell, s1) = self.expect(env, cell, &Type::int())?;
                let (value, s2) = self.expect(&env.apply(&s1), value, &Type::int())?;
                Ok((
                    TypedStmt::HMutate {
                        cell,
                        value,
                        loc: *loc,
                    },
                    s2.compose(&s1),
                ))
            }

            Stmt::Dispose(e, loc) => {
                let (e, s) = self.expect(env, e, &Type::int())?;
                Ok((TypedStmt::Dispose(e, *loc), s))
            }

            Stmt::Block(program, loc) => {
                let (program, s) = self.block(env, program)?;
                Ok((TypedStmt::Block(Box::new(program), *loc), s))
            }
        }
    }

    fn block(
        &mut self,
        env: &TypeEnv,
        program: &Program,
    ) -> Result<(TypedProgram, Subst<Type>), ElabError> {
        if let Some(defn) = program.defns.first() {
            return Err(ElabError::Unsupported {
                construct: "definition inside a block",
                span: defn.loc().span(),
            });
        }
        for name in program.decls.iter().flat_map(Declaration::names) {
            if env.contains(&name.text) {
                return Err(ElabError::Unsupported {
                    construct: "block declaration shadowing a visible name",
                    span: name.loc.span(),
                });
            }
        }
        crate::collect::check_duplicates(program)?;

        let mut local = env.clone();
        self.declare(&mut local, &program.decls)?;
        let (decls, mut s) = self.declaration_props(&local, &program.decls)?;
        let (props, s1) = self.expect_all(&local.apply(&s), &program.props, &Type::bool())?;
        s = s1.compose(&s);
        let (stmts, s2) = self.stmts(&local.apply(&s), &program.stmts)?;
        s = s2.compose(&s);
        Ok((
            TypedProgram {
                defns: Vec::new(),
                decls,
                props,
                stmts,
                loc: program.loc,
            },
            s,
        ))
    }

    /// Kind-checks declared types and brings the names into scope.
    pub(crate) fn declare(
        &mut self,
        env: &mut TypeEnv,
        decls: &[Declaration],
    ) -> Result<(), ElabError> {
        for decl in decls {
            let (names, ty, mutable) = match decl {
                Declaration::Const { names, ty, .. } => (names, ty, false),
                Declaration::Var { names, ty, .. } => (names, ty, true),
            };
            self.check_kind(ty, false)?;
            for name in names {
                let info = if mutable {
                    TypeInfo::Var(ty.clone())
                } else {
                    TypeInfo::Const(ty.clone())
                };
                env.insert(name.clone(), info);
            }
        }
        Ok(())
    }

    /// Elaborates declaration properties once every declared name is in scope.
    pub(crate) fn declaration_props(
        &mut self,
        env: &TypeEnv,
        decls: &[Declaration],
    ) -> Result<(Vec<TypedDeclaration>, Subst<Type>), ElabError> {
        let mut s = Subst::empty();
        let mut out = Vec::with_capacity(decls.len());
        for decl in decls {
            let (names, ty, prop, loc, mutable) = match decl {
                Declaration::Const {
                    names,
                    ty,
                    prop,
                    loc,
                } => (names, ty, prop, *loc, false),
                Declaration::Var {
                    names,
                    ty,
                    prop,
                    loc,
                } => (names, ty, prop, *loc, true),
            };
            let prop = match prop {
                Some(p) => {
                    let (p, s1) = self.expect(&env.apply(&s), p, &Type::bool())?;
                    s = s1.compose(&s);
                    Some(p)
                }
                None => None,
            };
            let names = names.clone();
            let ty = ty.clone();
            out.push(if mutable {
                TypedDeclaration::Var {
                    names,
                    ty,
                    prop,
                    loc,
                }
            } else {
                TypedDeclaration::Const {
                    names,
                    ty,
                    prop,
                    loc,
                }
            });
        }
        Ok((out, s))
    }

    pub(crate) fn props(
        &mut self,
        env: &TypeEnv,
        props: &[Expr],
    ) -> Result<(Vec<TypedExpr>, Subst<Type>), ElabError> {
        self.expect_all(env, props, &Type::bool())
    }
}
