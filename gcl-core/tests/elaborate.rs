use gcl_ast::{
    ArithOp, ChainOp, Declaration, Definition, Endpoint, Expr, ExprKind, Interval, Loc, Name,
    Program, Stmt, Type, TypeDefnCtor,
};
use gcl_core::{
    elaborate_program, ElabError, TypeError, TypeInfo, TypedDefinition, TypedProgram, TypedStmt,
};

fn program(decls: Vec<Declaration>, stmts: Vec<Stmt>) -> Program {
    let mut p = Program::from_stmts(stmts);
    p.decls = decls;
    p
}

fn func_defn(name: &str, body: Expr) -> Definition {
    Definition::FuncDefn {
        name: Name::synthetic(name),
        clauses: vec![body],
        loc: Loc::none(),
    }
}

fn list_datatype() -> Definition {
    let list_a = Type::app(Type::data("List"), Type::var("a"));
    Definition::TypeDefn {
        name: Name::synthetic("List"),
        params: vec![Name::synthetic("a")],
        ctors: vec![
            TypeDefnCtor {
                name: Name::synthetic("Nil"),
                args: vec![],
                loc: Loc::none(),
            },
            TypeDefnCtor {
                name: Name::synthetic("Cons"),
                args: vec![Type::var("a"), list_a],
                loc: Loc::none(),
            },
        ],
        loc: Loc::none(),
    }
}

fn int_array() -> Type {
    Type::array(
        Interval {
            lo: Endpoint::Including(Expr::num(0)),
            hi: Endpoint::Excluding(Expr::constant("N")),
            loc: Loc::none(),
        },
        Type::int(),
    )
}

fn type_error(result: Result<TypedProgram, ElabError>) -> TypeError {
    match result.expect_err("expected an elaboration error") {
        ElabError::Type(e) => e,
        other => panic!("expected a type error, got {other:?}"),
    }
}

fn func_type<'a>(typed: &'a TypedProgram, name: &str) -> &'a Type {
    typed
        .defns
        .iter()
        .find_map(|d| match d {
            TypedDefinition::FuncDefn { name: n, ty, .. } if n.text == name => Some(ty),
            _ => None,
        })
        .expect("definition is present")
}

#[test]
fn assignment_to_constant_is_rejected_whatever_the_expression() {
    let rhs = [
        Expr::num(1),
        Expr::bool(true),
        Expr::binary(ArithOp::Add, Expr::var("y"), Expr::num(2)),
        Expr::var("y"),
    ];
    for e in rhs {
        let p = program(
            vec![
                Declaration::constant(&["C"], Type::bool()),
                Declaration::var(&["y"], Type::int()),
            ],
            vec![Stmt::assign(&["C"], vec![e.clone()])],
        );
        let err = type_error(elaborate_program(&p));
        assert!(
            matches!(&err, TypeError::AssignToConst { name, .. } if name == "C"),
            "unexpected error for `{e}`: {err}"
        );
    }
}

#[test]
fn assignment_reports_surplus_names_and_expressions() {
    let decls = || vec![Declaration::var(&["x", "y"], Type::int())];

    let p = program(decls(), vec![Stmt::assign(&["x", "y"], vec![Expr::num(1)])]);
    let err = type_error(elaborate_program(&p));
    assert!(matches!(&err, TypeError::RedundantNames { names, .. } if names == &["y"]));

    let p = program(
        decls(),
        vec![Stmt::assign(&["x"], vec![Expr::num(1), Expr::num(2)])],
    );
    let err = type_error(elaborate_program(&p));
    assert!(matches!(&err, TypeError::RedundantExprs { exprs, .. } if exprs == &["2"]));
}

#[test]
fn unknown_assignment_target_is_not_in_scope() {
    let p = program(vec![], vec![Stmt::assign(&["z"], vec![Expr::num(1)])]);
    let err = type_error(elaborate_program(&p));
    assert!(matches!(&err, TypeError::NotInScope { name, .. } if name == "z"));
}

#[test]
fn mismatched_assignment_fails_to_unify() {
    let p = program(
        vec![Declaration::var(&["x"], Type::int())],
        vec![Stmt::assign(&["x"], vec![Expr::bool(false)])],
    );
    let err = type_error(elaborate_program(&p));
    assert!(matches!(err, TypeError::UnifyFailed { .. }), "unexpected error: {err}");
}

#[test]
fn arrays_are_read_and_written_like_functions() {
    let p = program(
        vec![
            Declaration::constant(&["N"], Type::int()),
            Declaration::var(&["a"], int_array()),
            Declaration::var(&["x", "i"], Type::int()),
        ],
        vec![
            Stmt::assign(&["x"], vec![Expr::index(Expr::var("a"), Expr::var("i"))]),
            Stmt::AAssign {
                array: Expr::var("a"),
                index: Expr::var("i"),
                value: Expr::binary(ArithOp::Add, Expr::var("x"), Expr::num(1)),
                loc: Loc::none(),
            },
            Stmt::assert(Expr::chain(
                Expr::update(Expr::var("a"), Expr::num(0), Expr::var("x")),
                ChainOp::Eq,
                Expr::var("a"),
            )),
        ],
    );
    elaborate_program(&p).expect("array program elaborates");

    let bad = program(
        vec![
            Declaration::constant(&["N"], Type::int()),
            Declaration::var(&["a"], int_array()),
        ],
        vec![Stmt::assert(Expr::index(Expr::var("a"), Expr::bool(true)))],
    );
    let err = type_error(elaborate_program(&bad));
    assert!(matches!(err, TypeError::UnifyFailed { .. }));
}

#[test]
fn definitions_may_refer_forward() {
    let mut p = program(
        vec![Declaration::var(&["r"], Type::int())],
        vec![Stmt::assign(&["r"], vec![Expr::app(Expr::var("f"), Expr::num(3))])],
    );
    p.defns = vec![
        func_defn("f", Expr::lam("x", Expr::app(Expr::var("g"), Expr::var("x")))),
        func_defn(
            "g",
            Expr::lam("y", Expr::binary(ArithOp::Add, Expr::var("y"), Expr::num(1))),
        ),
    ];
    let typed = elaborate_program(&p).expect("elaborates");
    assert_eq!(func_type(&typed, "f"), &Type::func(Type::int(), Type::int()));
    assert_eq!(func_type(&typed, "g"), &Type::func(Type::int(), Type::int()));
}

#[test]
fn definitions_are_generalized() {
    let mut p = program(
        vec![
            Declaration::var(&["n"], Type::int()),
            Declaration::var(&["b"], Type::bool()),
        ],
        vec![
            Stmt::assign(&["n"], vec![Expr::app(Expr::var("id"), Expr::num(1))]),
            Stmt::assign(&["b"], vec![Expr::app(Expr::var("id"), Expr::bool(true))]),
        ],
    );
    p.defns = vec![func_defn("id", Expr::lam("x", Expr::var("x")))];
    let typed = elaborate_program(&p).expect("id is polymorphic");

    let ty = func_type(&typed, "id");
    let (dom, cod) = ty.as_func().expect("function type");
    assert_eq!(dom, cod);
    assert!(matches!(dom, Type::Var(_)), "expected a generalized variable, got {ty}");
}

#[test]
fn signature_constrains_its_definition() {
    let mut p = program(vec![], vec![]);
    p.defns = vec![
        Definition::FuncDefnSig {
            name: Name::synthetic("neg"),
            ty: Type::func(Type::int(), Type::int()),
            prop: None,
            loc: Loc::none(),
        },
        func_defn("neg", Expr::lam("x", Expr::unary(ArithOp::Neg, Expr::var("x")))),
    ];
    let err = type_error(elaborate_program(&p));
    assert!(matches!(err, TypeError::UnifyFailed { .. }), "unexpected error: {err}");
}

fn id_signature(body: Expr) -> Vec<Definition> {
    vec![
        Definition::FuncDefnSig {
            name: Name::synthetic("f"),
            ty: Type::func(Type::var("a"), Type::var("a")),
            prop: None,
            loc: Loc::none(),
        },
        func_defn("f", body),
    ]
}

#[test]
fn signature_variables_cannot_be_fixed_by_the_body() {
    let mut p = program(vec![], vec![]);
    p.defns = id_signature(Expr::lam(
        "x",
        Expr::binary(ArithOp::Add, Expr::var("x"), Expr::num(1)),
    ));
    let err = type_error(elaborate_program(&p));
    assert!(
        matches!(err, TypeError::UnifyFailed { expected: Type::Var(ref v), .. } if v.text == "a"),
        "unexpected error: {err}"
    );
}

#[test]
fn signature_variables_do_not_reach_constructors() {
    let cons_true_nil = Expr::app(
        Expr::app(Expr::constant("Cons"), Expr::bool(true)),
        Expr::constant("Nil"),
    );
    let mut p = program(
        vec![Declaration::var(&["n"], Type::int())],
        vec![
            Stmt::assign(&["n"], vec![Expr::app(Expr::var("f"), Expr::num(1))]),
            Stmt::assert(Expr::chain(cons_true_nil, ChainOp::Eq, Expr::constant("Nil"))),
        ],
    );
    p.defns = id_signature(Expr::lam("x", Expr::var("x")));
    p.defns.push(list_datatype());
    let typed = elaborate_program(&p).expect("f : a → a and List a are unrelated");

    let ty = func_type(&typed, "f");
    let (dom, cod) = ty.as_func().expect("function type");
    assert_eq!(dom, cod);
    assert!(matches!(dom, Type::Var(_)), "expected a generalized variable, got {ty}");
}

#[test]
fn constructors_are_polymorphic() {
    let xs = Type::app(Type::data("List"), Type::int());
    let mut p = program(
        vec![Declaration::var(&["xs"], xs)],
        vec![Stmt::assign(
            &["xs"],
            vec![Expr::app(
                Expr::app(Expr::constant("Cons"), Expr::num(1)),
                Expr::constant("Nil"),
            )],
        )],
    );
    p.defns = vec![list_datatype()];
    elaborate_program(&p).expect("Cons 1 Nil : List Int");

    let bad_xs = Type::app(Type::data("List"), Type::bool());
    p.decls = vec![Declaration::var(&["xs"], bad_xs)];
    let err = type_error(elaborate_program(&p));
    assert!(matches!(err, TypeError::UnifyFailed { .. }));
}

#[test]
fn duplicated_identifiers_are_rejected_eagerly() {
    let mut p = program(
        vec![
            Declaration::var(&["x"], Type::int()),
            Declaration::constant(&["Nil"], Type::bool()),
        ],
        vec![],
    );
    p.defns = vec![list_datatype()];
    let err = type_error(elaborate_program(&p));
    assert!(
        matches!(&err, TypeError::DuplicatedIdentifiers { names, .. } if names == &["Nil"]),
        "unexpected error: {err}"
    );
}

#[test]
fn undeclared_type_is_undefined() {
    let p = program(vec![Declaration::var(&["x"], Type::data("Foo"))], vec![]);
    let err = type_error(elaborate_program(&p));
    assert!(matches!(&err, TypeError::UndefinedType { name, .. } if name == "Foo"));
}

#[test]
fn multi_clause_definitions_are_unsupported() {
    let mut p = program(vec![], vec![]);
    p.defns = vec![Definition::FuncDefn {
        name: Name::synthetic("f"),
        clauses: vec![Expr::num(1), Expr::num(2)],
        loc: Loc::none(),
    }];
    let err = elaborate_program(&p).expect_err("unsupported");
    assert!(matches!(err, ElabError::Unsupported { .. }));
}

#[test]
fn case_expressions_are_unsupported() {
    let p = program(
        vec![Declaration::var(&["x"], Type::int())],
        vec![Stmt::assign(
            &["x"],
            vec![Expr::new(
                ExprKind::Case(Box::new(Expr::num(0)), vec![]),
                Loc::new(3, 4),
            )],
        )],
    );
    let err = elaborate_program(&p).expect_err("unsupported");
    assert!(matches!(err, ElabError::Unsupported { construct: "case expression", .. }));
    assert_eq!(err.span().offset(), 3);
}

#[test]
fn blocks_scope_their_declarations() {
    let inner = program(
        vec![Declaration::var(&["t"], Type::int())],
        vec![
            Stmt::assign(&["t"], vec![Expr::var("x")]),
            Stmt::assign(&["x"], vec![Expr::var("t")]),
        ],
    );
    let p = program(
        vec![Declaration::var(&["x"], Type::int())],
        vec![Stmt::Block(Box::new(inner), Loc::none())],
    );
    elaborate_program(&p).expect("block elaborates");

    let leaking = program(
        vec![Declaration::var(&["x"], Type::int())],
        vec![
            Stmt::Block(
                Box::new(program(vec![Declaration::var(&["t"], Type::int())], vec![])),
                Loc::none(),
            ),
            Stmt::assign(&["t"], vec![Expr::num(1)]),
        ],
    );
    let err = type_error(elaborate_program(&leaking));
    assert!(matches!(&err, TypeError::NotInScope { name, .. } if name == "t"));
}

#[test]
fn shadowing_blocks_are_unsupported() {
    let inner = program(vec![Declaration::var(&["x"], Type::bool())], vec![]);
    let p = program(
        vec![Declaration::var(&["x"], Type::int())],
        vec![Stmt::Block(Box::new(inner), Loc::none())],
    );
    let err = elaborate_program(&p).expect_err("shadowing");
    assert!(matches!(err, ElabError::Unsupported { .. }));
}

#[test]
fn spec_holes_capture_the_environment() {
    let p = program(
        vec![Declaration::var(&["x"], Type::int())],
        vec![Stmt::spec()],
    );
    let typed = elaborate_program(&p).expect("elaborates");
    let TypedStmt::Spec { env, .. } = &typed.stmts[0] else {
        panic!("expected a spec statement");
    };
    assert_eq!(env.lookup("x"), Some(&TypeInfo::Var(Type::int())));
}

#[test]
fn properties_must_be_boolean() {
    let mut p = program(vec![Declaration::constant(&["N"], Type::int())], vec![]);
    p.props = vec![Expr::chain(Expr::constant("N"), ChainOp::Gt, Expr::num(0))];
    elaborate_program(&p).expect("N > 0 is a proposition");

    p.props = vec![Expr::constant("N")];
    let err = type_error(elaborate_program(&p));
    assert!(matches!(err, TypeError::UnifyFailed { .. }));
}

#[test]
fn typed_program_serializes() {
    let p = program(
        vec![Declaration::var(&["x"], Type::int())],
        vec![
            Stmt::assert(Expr::chain(Expr::var("x"), ChainOp::Gte, Expr::num(0))),
            Stmt::assign(&["x"], vec![Expr::binary(ArithOp::Add, Expr::var("x"), Expr::num(1))]),
        ],
    );
    let typed = elaborate_program(&p).expect("elaborates");
    let json = serde_json::to_string(&typed).expect("serialize");
    assert!(json.contains("\"Assign\""), "variant tags are kept: {json}");
    let back: TypedProgram = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, typed);
}
