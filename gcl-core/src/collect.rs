#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use gcl_ast::{Definition, Expr, Loc, Name, Program, Type};

use crate::env::{TypeEnv, TypeInfo};
use crate::error::{ElabError, TypeError};
use crate::kind::{infer_data_types, DataDecl};
use crate::subst::{Subst, Substitutable};
use crate::typed::{TypedDefinition, TypedExpr, TypedProgram};
use crate::unify::unify;
use crate::Elaborator;

/// Elaborates a whole program with fresh state.
pub fn elaborate_program(program: &Program) -> Result<TypedProgram, ElabError> {
    Elaborator::new().program(program)
}

/// Rejects a name bound twice among declarations, constructors and
/// functions, and a datatype name defined twice.
///
/// A function with both a signature and a definition counts once.
pub(crate) fn check_duplicates(program: &Program) -> Result<(), TypeError> {
    let signed: BTreeSet<&str> = program
        .defns
        .iter()
        .filter_map(|d| match d {
            Definition::FuncDefnSig { name, .. } => Some(name.text.as_str()),
            _ => None,
        })
        .collect();

    let mut values: Vec<&Name> = program.decls.iter().flat_map(|d| d.names().iter()).collect();
    let mut types: Vec<&Name> = Vec::new();
    for defn in &program.defns {
        match defn {
            Definition::TypeDefn { name, ctors, .. } => {
                types.push(name);
                values.extend(ctors.iter().map(|c| &c.name));
            }
            Definition::FuncDefnSig { name, .. } => values.push(name),
            Definition::FuncDefn { name, .. } if !signed.contains(name.text.as_str()) => {
                values.push(name)
            }
            Definition::FuncDefn { .. } => {}
        }
    }

    for group in [values, types] {
        let mut seen = BTreeSet::new();
        let mut dups: Vec<&Name> = Vec::new();
        for name in group {
            if !seen.insert(name.text.as_str()) && !dups.iter().any(|d| d.text == name.text) {
                dups.push(name);
            }
        }
        if let Some(first) = dups.first() {
            return Err(TypeError::DuplicatedIdentifiers {
                names: dups.iter().map(|n| n.text.clone()).collect(),
                span: first.loc.span(),
            });
        }
    }
    Ok(())
}

/// A signature's type variables must stay distinct unknowns: a body that
/// fixes one of them, or identifies two, is less general than its signature.
fn check_skolems(
    rigid: &[(String, Type)],
    s: &Subst<Type>,
    loc: Loc,
) -> Result<(), TypeError> {
    let mut images: BTreeSet<String> = BTreeSet::new();
    for (var, meta) in rigid {
        let found = meta.apply(s);
        match &found {
            Type::Meta(m) if images.insert(m.text.clone()) => {}
            _ => {
                return Err(TypeError::UnifyFailed {
                    expected: Type::Var(Name::synthetic(var.clone())),
                    found,
                    span: loc.span(),
                });
            }
        }
    }
    Ok(())
}

struct Pending<'a> {
    slot: usize,
    name: &'a Name,
    placeholder: Type,
    body: &'a Expr,
    loc: Loc,
}

impl Elaborator {
    pub fn program(&mut self, program: &Program) -> Result<TypedProgram, ElabError> {
        tracing::debug!(
            defns = program.defns.len(),
            decls = program.decls.len(),
            stmts = program.stmts.len(),
            "elaborating program"
        );
        for defn in &program.defns {
            if let Definition::FuncDefn { clauses, loc, .. } = defn {
                if clauses.len() != 1 {
                    return Err(ElabError::Unsupported {
                        construct: "multi-clause function definition",
                        span: loc.span(),
                    });
                }
            }
        }
        check_duplicates(program)?;

        let mut env = TypeEnv::new();
        let mut slots: Vec<Option<TypedDefinition>> = vec![None; program.defns.len()];

        self.datatypes(program, &mut env, &mut slots)?;
        self.declare(&mut env, &program.decls)?;

        let mut signatures: BTreeMap<&str, &Type> = BTreeMap::new();
        for defn in &program.defns {
            if let Definition::FuncDefnSig { name, ty, .. } = defn {
                self.check_kind(ty, true)?;
                signatures.insert(name.text.as_str(), ty);
            }
        }
        let defined: BTreeSet<&str> = program
            .defns
            .iter()
            .filter_map(|d| match d {
                Definition::FuncDefn { name, .. } => Some(name.text.as_str()),
                _ => None,
            })
            .collect();
        for defn in &program.defns {
            if let Definition::FuncDefnSig { name, ty, .. } = defn {
                if !defined.contains(name.text.as_str()) {
                    env.insert(name.clone(), TypeInfo::Const(ty.clone()));
                }
            }
        }

        let mut s = self.functions(program, &mut env, &signatures, &mut slots)?;

        let env_now = env.apply(&s);
        let (decls, s1) = self.declaration_props(&env_now, &program.decls)?;
        s = s1.compose(&s);
        let (props, s2) = self.props(&env.apply(&s), &program.props)?;
        s = s2.compose(&s);
        for (slot, defn) in program.defns.iter().enumerate() {
            if let Definition::FuncDefnSig { name, ty, prop, loc } = defn {
                let prop = match prop {
                    Some(p) => {
                        let (p, s3) = self.props(&env.apply(&s), std::slice::from_ref(p))?;
                        s = s3.compose(&s);
                        p.into_iter().next()
                    }
                    None => None,
                };
                slots[slot] = Some(TypedDefinition::FuncDefnSig {
                    name: name.clone(),
                    ty: ty.clone(),
                    prop,
                    loc: *loc,
                });
            }
        }

        let (stmts, s4) = self.stmts(&env.apply(&s), &program.stmts)?;
        s = s4.compose(&s);

        let mut typed = TypedProgram {
            defns: slots.into_iter().flatten().collect(),
            decls,
            props,
            stmts,
            loc: program.loc,
        };
        typed.apply_subst(&s);
        tracing::debug!(fresh_names = self.fresh.issued(), "elaboration finished");
        Ok(typed)
    }

    /// Kind-checks every datatype as one group and binds its constructors.
    fn datatypes(
        &mut self,
        program: &Program,
        env: &mut TypeEnv,
        slots: &mut [Option<TypedDefinition>],
    ) -> Result<(), ElabError> {
        let mut group = Vec::new();
        let mut positions = Vec::new();
        for (slot, defn) in program.defns.iter().enumerate() {
            if let Definition::TypeDefn {
                name,
                params,
                ctors,
                loc,
            } = defn
            {
                group.push(DataDecl {
                    name,
                    params,
                    ctors,
                    loc: *loc,
                });
                positions.push(slot);
            }
        }
        if group.is_empty() {
            return Ok(());
        }

        let kinds = infer_data_types(&mut self.kinds, &mut self.fresh, &group)?;
        for ((decl, kind), slot) in group.iter().zip(kinds).zip(positions) {
            let result = decl
                .params
                .iter()
                .fold(Type::Data(decl.name.clone()), |acc, p| {
                    Type::app(acc, Type::Var(p.clone()))
                });
            for ctor in decl.ctors {
                let ty = Type::funcs(ctor.args.iter().cloned(), result.clone());
                env.insert(ctor.name.clone(), TypeInfo::TypeDefnCtor(ty));
            }
            tracing::debug!(datatype = %decl.name, %kind, "datatype kind");
            slots[slot] = Some(TypedDefinition::TypeDefn {
                name: decl.name.clone(),
                params: decl.params.to_vec(),
                ctors: decl.ctors.to_vec(),
                kind,
                loc: decl.loc,
            });
        }
        Ok(())
    }

    /// Elaborates all function definitions as one recursive group.
    ///
    /// Each definition gets a placeholder metavariable before any body is
    /// inspected; bodies are then folded left to right, each unified with its
    /// placeholder and signature. Types are generalized once the fold is done.
    fn functions(
        &mut self,
        program: &Program,
        env: &mut TypeEnv,
        signatures: &BTreeMap<&str, &Type>,
        slots: &mut [Option<TypedDefinition>],
    ) -> Result<Subst<Type>, ElabError> {
        let mark = env.len();
        let mut pending = Vec::new();
        for (slot, defn) in program.defns.iter().enumerate() {
            if let Definition::FuncDefn { name, clauses, loc } = defn {
                let Some(body) = clauses.first() else {
                    continue;
                };
                let placeholder = self.fresh_meta();
                env.insert(name.clone(), TypeInfo::Const(placeholder.clone()));
                self.in_progress.insert(name.text.clone());
                pending.push(Pending {
                    slot,
                    name,
                    placeholder,
                    body,
                    loc: *loc,
                });
            }
        }
        if pending.is_empty() {
            return Ok(Subst::empty());
        }

        let mut s = Subst::empty();
        let mut bodies: Vec<TypedExpr> = Vec::with_capacity(pending.len());
        let mut skolems = Vec::new();
        for p in &pending {
            tracing::debug!(function = %p.name, "elaborating definition");
            let (body, s1) = self.expr(&env.apply(&s), p.body)?;
            s = s1.compose(&s);
            let s2 = unify(&p.placeholder.apply(&s), &body.ty.apply(&s), p.loc)?;
            s = s2.compose(&s);
            if let Some(sig) = signatures.get(p.name.text.as_str()) {
                let (sig, rigid) = self.skolemize(sig);
                let s3 = unify(&sig.apply(&s), &p.placeholder.apply(&s), p.loc)?;
                s = s3.compose(&s);
                skolems.push((rigid, p.loc));
            }
            bodies.push(body);
        }
        for (rigid, loc) in &skolems {
            check_skolems(rigid, &s, *loc)?;
        }
        for p in &pending {
            self.in_progress.remove(&p.name.text);
        }

        let mut ambient = env.apply(&s);
        ambient.truncate(mark);
        let mut schemes = Vec::with_capacity(pending.len());
        for p in &pending {
            let ty = p.placeholder.apply(&s);
            let g = self.generalize(&ambient, &ty);
            s = g.compose(&s);
            schemes.push(ty.apply(&g));
        }

        env.truncate(mark);
        for ((p, ty), body) in pending.iter().zip(schemes).zip(bodies) {
            env.insert(p.name.clone(), TypeInfo::Const(ty.clone()));
            slots[p.slot] = Some(TypedDefinition::FuncDefn {
                name: p.name.clone(),
                ty,
                body,
                loc: p.loc,
            });
        }
        Ok(s)
    }
}
