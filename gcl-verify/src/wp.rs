#![forbid(unsafe_code)]

//! Weakest preconditions and the forward structuring pass.
//!
//! The pass walks a statement list cut into segments. Runs of ordinary
//! statements are pulled back through `wp` to the next assertion; each
//! assertion, loop and hole then contributes its own obligations or specs.

use std::collections::BTreeSet;

use gcl_ast::{ArithOp, ChainOp, Lit, Loc, Name, Type};
use gcl_core::expr_subst::{free_vars, substitute, ExprSubst};
use gcl_core::{
    fresh_in_scope, Binder, TypeEnv, TypedExpr, TypedExprKind, TypedGdCmd, TypedProgram, TypedStmt,
};

use crate::error::StructError;
use crate::options::VerifyOptions;
use crate::pred::{obligation_digest, Origin, Pred, ProofObligation, SpecHole, StructWarning};
use crate::rename::{array_name, contains_loop, declared_names, Renaming};
use crate::segment::{segments, Segment};
use crate::VerifyOutput;

/// What a piece of code must establish, and how to report it.
#[derive(Clone, Debug)]
struct Target {
    pred: Pred,
    origin: Origin,
    label: Option<String>,
}

impl Target {
    fn assertion(pred: &Pred) -> Self {
        Self {
            pred: pred.clone(),
            origin: Origin::Assertion(pred.loc()),
            label: None,
        }
    }

    fn with_pred(&self, expr: TypedExpr) -> Self {
        Self {
            pred: Pred::Constant(expr),
            origin: self.origin,
            label: self.label.clone(),
        }
    }
}

/// How statements that are not plain commands behave under `wp`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Assertions inside conditionals and blocks are structured in place.
    Structured,
    /// Assertions and holes are skipped.
    Transparent,
}

pub struct Verifier<'o> {
    options: &'o VerifyOptions,
    scopes: Vec<BTreeSet<String>>,
    obligations: Vec<ProofObligation>,
    seen: BTreeSet<String>,
    specs: Vec<SpecHole>,
    warnings: Vec<StructWarning>,
}

impl<'o> Verifier<'o> {
    pub fn new(options: &'o VerifyOptions) -> Self {
        Self {
            options,
            scopes: Vec::new(),
            obligations: Vec::new(),
            seen: BTreeSet::new(),
            specs: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Makes `names` visible to every later fresh-name choice.
    pub fn enter_scope(&mut self, names: impl IntoIterator<Item = String>) {
        self.scopes.push(names.into_iter().collect());
    }

    /// Structures a whole program. A leading assertion is its precondition
    /// (`True` otherwise) and a trailing one its postcondition.
    pub fn program(&mut self, program: &TypedProgram) -> Result<(), StructError> {
        self.enter_scope(program.bound_names().map(|n| n.text.clone()));
        let pre = match program.stmts.first() {
            Some(TypedStmt::Assert(e, loc)) => Pred::Assertion(e.clone(), *loc),
            _ => Pred::Constant(TypedExpr::bool(true)),
        };
        let post = match program.stmts.last() {
            Some(TypedStmt::Assert(e, loc)) => Pred::Assertion(e.clone(), *loc),
            _ => Pred::Constant(TypedExpr::bool(true)),
        };
        tracing::debug!(stmts = program.stmts.len(), "structuring program");
        let target = Target::assertion(&post);
        let result = self.struct_segs(&pre, &segments(&program.stmts), &target);
        self.scopes.pop();
        result
    }

    pub fn finish(mut self) -> VerifyOutput {
        self.specs.sort_by_key(|s| s.loc.offset);
        for (id, spec) in self.specs.iter_mut().enumerate() {
            spec.id = id;
        }
        tracing::debug!(
            obligations = self.obligations.len(),
            specs = self.specs.len(),
            warnings = self.warnings.len(),
            "structuring finished"
        );
        VerifyOutput {
            obligations: self.obligations,
            specs: self.specs,
            warnings: self.warnings,
        }
    }

    /// Weakest precondition of `stmts` for `post`. Assertions and holes are
    /// transparent; a loop is a structural error here.
    pub fn wp(&mut self, stmts: &[TypedStmt], post: &TypedExpr) -> Result<TypedExpr, StructError> {
        let target = Target::assertion(&Pred::Constant(post.clone()));
        let out = self.wp_list(stmts, &target, Mode::Transparent)?;
        Ok(out.pred.expr().clone())
    }

    fn fresh_name(&self, prefix: &str, avoid: BTreeSet<String>) -> Name {
        let mut scopes = self.scopes.clone();
        scopes.push(avoid);
        fresh_in_scope(prefix, &scopes)
    }

    fn is_visible(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s.contains(name))
    }

    fn obligate(&mut self, pre: &Pred, post: &Pred, origin: Origin, label: Option<String>) {
        if pre.expr() == post.expr() {
            return;
        }
        let digest = obligation_digest(pre.expr(), post.expr());
        let mut id = digest.clone();
        id.truncate(self.options.obligation_id_len);
        if !self.seen.insert(digest) && self.options.dedupe_obligations {
            tracing::trace!(%id, "duplicate obligation dropped");
            return;
        }
        tracing::debug!(%id, ?origin, "proof obligation");
        self.obligations.push(ProofObligation {
            pre: pre.clone(),
            post: post.clone(),
            id,
            label,
            origin,
        });
    }

    fn record_hole(&mut self, pre: Pred, post: Pred, env: &TypeEnv, loc: Loc) {
        let id = self.specs.len();
        tracing::debug!(id, "spec hole");
        self.specs.push(SpecHole {
            id,
            pre,
            post,
            env: env.clone(),
            loc,
        });
    }

    fn struct_segs(
        &mut self,
        pre: &Pred,
        segs: &[Segment<'_>],
        target: &Target,
    ) -> Result<(), StructError> {
        match segs.split_first() {
            Some((Segment::Assertion(a), rest)) => {
                self.obligate(pre, a, Origin::Assertion(a.loc()), None);
                self.struct_segs(a, rest, target)
            }
            Some((Segment::Spec { env, loc }, rest)) => {
                let next = self.wp_segs(rest, target)?;
                self.record_hole(pre.clone(), next.pred, env, *loc);
                Ok(())
            }
            _ => {
                let next = self.wp_segs(segs, target)?;
                self.obligate(pre, &next.pred, next.origin, next.label);
                Ok(())
            }
        }
    }

    /// What must hold at the start of `segs`. Everything from the first
    /// assertion on is structured on the way.
    fn wp_segs(&mut self, segs: &[Segment<'_>], target: &Target) -> Result<Target, StructError> {
        let Some((first, rest)) = segs.split_first() else {
            return Ok(target.clone());
        };
        match first {
            Segment::Block(stmts) => {
                let next = self.wp_segs(rest, target)?;
                self.wp_run(stmts, next, Mode::Structured)
            }
            Segment::Assertion(a) => {
                self.struct_segs(a, rest, target)?;
                Ok(Target::assertion(a))
            }
            Segment::Loop { inv, cmds, loc } => {
                let exit = self.wp_segs(rest, target)?;
                self.struct_loop(inv, cmds, *loc, &exit)?;
                Ok(Target::assertion(inv))
            }
            Segment::Spec { env, loc } => {
                let next = self.wp_segs(rest, target)?;
                self.record_hole(next.pred.clone(), next.pred.clone(), env, *loc);
                Ok(next)
            }
        }
    }

    fn wp_list(
        &mut self,
        stmts: &[TypedStmt],
        target: &Target,
        mode: Mode,
    ) -> Result<Target, StructError> {
        match mode {
            Mode::Structured => self.wp_segs(&segments(stmts), target),
            Mode::Transparent => self.wp_run(stmts, target.clone(), mode),
        }
    }

    fn wp_run(
        &mut self,
        stmts: &[TypedStmt],
        target: Target,
        mode: Mode,
    ) -> Result<Target, StructError> {
        let mut acc = target;
        for stmt in stmts.iter().rev() {
            let pre = self.wp_stmt(stmt, &acc, mode)?;
            acc = acc.with_pred(pre);
        }
        Ok(acc)
    }

    fn wp_stmt(
        &mut self,
        stmt: &TypedStmt,
        target: &Target,
        mode: Mode,
    ) -> Result<TypedExpr, StructError> {
        let post = target.pred.expr();
        match stmt {
            TypedStmt::Skip(_)
            | TypedStmt::Assert(..)
            | TypedStmt::LoopInvariant { .. }
            | TypedStmt::Spec { .. } => Ok(post.clone()),
            TypedStmt::Abort(_) => Ok(TypedExpr::bool(false)),
            TypedStmt::Assign { names, exprs, .. } => {
                let subst: ExprSubst = names
                    .iter()
                    .zip(exprs)
                    .map(|(n, e)| (n.text.clone(), e.clone()))
                    .collect();
                Ok(substitute(&subst, post))
            }
            TypedStmt::AAssign {
                array,
                index,
                value,
                loc,
            } => {
                let Some((name, ty)) = array_name(array) else {
                    return Err(StructError::MultiDimArrayAsgnNotImp { span: loc.span() });
                };
                let updated = TypedExpr::new(
                    TypedExprKind::ArrUpd {
                        array: Box::new(array.clone()),
                        index: Box::new(index.clone()),
                        value: Box::new(value.clone()),
                    },
                    ty.clone(),
                    *loc,
                );
                let subst: ExprSubst = [(name.text.clone(), updated)].into();
                Ok(substitute(&subst, post))
            }
            TypedStmt::Do(_, loc) => Err(StructError::MissingAssertion { span: loc.span() }),
            TypedStmt::If(cmds, _) => {
                let mut branches = Vec::with_capacity(cmds.len());
                for cmd in cmds {
                    let body = self.wp_list(&cmd.body, target, mode)?;
                    branches.push(TypedExpr::implies(cmd.guard.clone(), body.pred.expr().clone()));
                }
                Ok(TypedExpr::conjunct(branches))
            }
            TypedStmt::Alloc { var, exprs, .. } => {
                let mut avoid = free_vars(post);
                avoid.extend(exprs.iter().flat_map(free_vars));
                avoid.insert(var.text.clone());
                let v = self.heap_var(avoid);
                let base = TypedExpr::var(v.name.clone(), Type::int());
                let cells = exprs.iter().enumerate().map(|(i, e)| {
                    let addr = match i {
                        0 => base.clone(),
                        _ => {
                            let offset = TypedExpr::num(i as i64);
                            TypedExpr::binary(ArithOp::Add, base.clone(), offset)
                        }
                    };
                    TypedExpr::points_to(addr, e.clone())
                });
                let heap = cells
                    .reduce(TypedExpr::sconj)
                    .unwrap_or_else(|| TypedExpr::lit(Lit::Emp));
                let subst: ExprSubst = [(var.text.clone(), base)].into();
                let body = TypedExpr::implies(heap, substitute(&subst, post));
                Ok(TypedExpr::forall(vec![v], TypedExpr::bool(true), body))
            }
            TypedStmt::HLookup { var, expr, .. } => {
                let mut avoid = free_vars(post);
                avoid.extend(free_vars(expr));
                avoid.insert(var.text.clone());
                let v = self.heap_var(avoid);
                let value = TypedExpr::var(v.name.clone(), Type::int());
                let cell = TypedExpr::points_to(expr.clone(), value.clone());
                let subst: ExprSubst = [(var.text.clone(), value)].into();
                let body = TypedExpr::conj(
                    cell.clone(),
                    TypedExpr::simp(cell, substitute(&subst, post)),
                );
                Ok(TypedExpr::exists(vec![v], TypedExpr::bool(true), body))
            }
            TypedStmt::HMutate { cell, value, .. } => {
                let mut avoid = free_vars(post);
                avoid.extend(free_vars(cell));
                avoid.extend(free_vars(value));
                let owned = self.owned_cell(cell, avoid);
                let written = TypedExpr::points_to(cell.clone(), value.clone());
                Ok(TypedExpr::sconj(owned, TypedExpr::simp(written, post.clone())))
            }
            TypedStmt::Dispose(cell, _) => {
                let mut avoid = free_vars(post);
                avoid.extend(free_vars(cell));
                let owned = self.owned_cell(cell, avoid);
                Ok(TypedExpr::sconj(owned, post.clone()))
            }
            TypedStmt::Block(program, _) => self.wp_block(program, target, mode),
        }
    }

    fn heap_var(&self, avoid: BTreeSet<String>) -> Binder {
        Binder {
            name: self.fresh_name(&self.options.heap_prefix, avoid),
            ty: Type::int(),
        }
    }

    /// `⟨∃ v : True : cell ↦ v⟩`
    fn owned_cell(&self, cell: &TypedExpr, avoid: BTreeSet<String>) -> TypedExpr {
        let v = self.heap_var(avoid);
        let value = TypedExpr::var(v.name.clone(), Type::int());
        TypedExpr::exists(
            vec![v],
            TypedExpr::bool(true),
            TypedExpr::points_to(cell.clone(), value),
        )
    }

    /// Local declarations that shadow a visible name are renamed apart
    /// before the body is pulled back.
    fn wp_block(
        &mut self,
        program: &TypedProgram,
        target: &Target,
        mode: Mode,
    ) -> Result<TypedExpr, StructError> {
        let post = target.pred.expr();
        let mut avoid = declared_names(program);
        avoid.extend(free_vars(post));
        let post_free = free_vars(post);

        let mut renaming = Renaming::default();
        let mut local = BTreeSet::new();
        for decl in &program.decls {
            for name in decl.names() {
                if self.is_visible(&name.text) || post_free.contains(&name.text) {
                    let new = self.fresh_name(&name.text, avoid.clone());
                    tracing::trace!(from = %name, to = %new, "renaming block declaration");
                    avoid.insert(new.text.clone());
                    local.insert(new.text.clone());
                    renaming.insert(decl, name, new);
                } else {
                    local.insert(name.text.clone());
                }
            }
        }

        let stmts = if renaming.is_empty() {
            program.stmts.clone()
        } else {
            renaming.stmts(&program.stmts)
        };
        self.scopes.push(local);
        let result = self.wp_list(&stmts, target, mode);
        self.scopes.pop();
        Ok(result?.pred.expr().clone())
    }

    fn struct_loop(
        &mut self,
        inv: &Pred,
        cmds: &[TypedGdCmd],
        loc: Loc,
        exit: &Target,
    ) -> Result<(), StructError> {
        let inv_expr = inv.expr();
        let guards: Vec<TypedExpr> = cmds.iter().map(|c| c.guard.clone()).collect();

        for cmd in cmds {
            let pre = Pred::Constant(TypedExpr::conj(inv_expr.clone(), cmd.guard.clone()));
            let target = Target {
                pred: inv.clone(),
                origin: Origin::Preservation(loc),
                label: Some(cmd.guard.to_string()),
            };
            self.struct_segs(&pre, &segments(&cmd.body), &target)?;
        }

        let stuck = TypedExpr::conj(
            inv_expr.clone(),
            TypedExpr::neg(TypedExpr::disjunct(guards.clone())),
        );
        self.obligate(
            &Pred::Constant(stuck),
            &exit.pred,
            Origin::LoopExit(loc),
            exit.label.clone(),
        );

        let Some(bound) = inv.bound() else {
            tracing::warn!(offset = loc.offset, "loop has no bound; termination is not checked");
            self.warnings.push(StructWarning::MissingBound(loc));
            return Ok(());
        };

        let running = TypedExpr::conj(inv_expr.clone(), TypedExpr::disjunct(guards));
        let non_negative = TypedExpr::chain(bound.clone(), ChainOp::Gte, TypedExpr::num(0));
        self.obligate(
            &Pred::Constant(running),
            &Pred::Constant(non_negative),
            Origin::LoopTermination(loc),
            None,
        );

        for cmd in cmds {
            if contains_loop(&cmd.body) {
                tracing::warn!(offset = cmd.loc.offset, "nested loop; decrease is not checked");
                self.warnings.push(StructWarning::UncheckedBoundDecrease(cmd.loc));
                continue;
            }
            let mut avoid = free_vars(inv_expr);
            avoid.extend(free_vars(bound));
            avoid.extend(free_vars(&cmd.guard));
            let snapshot = self.fresh_name(&self.options.bound_prefix, avoid);
            let old = TypedExpr::constant(snapshot.clone(), Type::int());

            let pre = TypedExpr::conjunct([
                inv_expr.clone(),
                cmd.guard.clone(),
                TypedExpr::chain(bound.clone(), ChainOp::Eq, old.clone()),
            ]);
            let decreased = TypedExpr::chain(bound.clone(), ChainOp::Lt, old);

            self.scopes.push([snapshot.text.clone()].into());
            let result = self.wp(&cmd.body, &decreased);
            self.scopes.pop();
            self.obligate(
                &Pred::Constant(pre),
                &Pred::Constant(result?),
                Origin::BoundDecrease(loc),
                Some(cmd.guard.to_string()),
            );
        }
        Ok(())
    }
}
