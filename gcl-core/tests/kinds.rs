use gcl_ast::{Declaration, Definition, Loc, Name, Program, Type, TypeDefnCtor};
use gcl_core::{elaborate_program, ElabError, Kind, TypeError, TypedDefinition, TypedProgram};

fn ctor(name: &str, args: Vec<Type>) -> TypeDefnCtor {
    TypeDefnCtor {
        name: Name::synthetic(name),
        args,
        loc: Loc::none(),
    }
}

fn datatype(name: &str, params: &[&str], ctors: Vec<TypeDefnCtor>) -> Definition {
    Definition::TypeDefn {
        name: Name::synthetic(name),
        params: params.iter().map(|p| Name::synthetic(*p)).collect(),
        ctors,
        loc: Loc::none(),
    }
}

fn with_defns(defns: Vec<Definition>) -> Program {
    let mut p = Program::from_stmts(vec![]);
    p.defns = defns;
    p
}

fn kind_of<'a>(typed: &'a TypedProgram, name: &str) -> &'a Kind {
    typed
        .defns
        .iter()
        .find_map(|d| match d {
            TypedDefinition::TypeDefn { name: n, kind, .. } if n.text == name => Some(kind),
            _ => None,
        })
        .expect("datatype is present")
}

fn app(head: &str, arg: Type) -> Type {
    Type::app(Type::data(head), arg)
}

#[test]
fn list_has_kind_star_to_star() {
    let p = with_defns(vec![datatype(
        "List",
        &["a"],
        vec![
            ctor("Nil", vec![]),
            ctor("Cons", vec![Type::var("a"), app("List", Type::var("a"))]),
        ],
    )]);
    let typed = elaborate_program(&p).expect("List elaborates");
    let kind = kind_of(&typed, "List");
    assert_eq!(kind, &Kind::arrow(Kind::Star, Kind::Star));
    assert_eq!(kind.to_string(), "* → *");
}

#[test]
fn mutually_recursive_datatypes_see_each_other() {
    let p = with_defns(vec![
        datatype(
            "Tree",
            &["a"],
            vec![ctor("Node", vec![Type::var("a"), app("Forest", Type::var("a"))])],
        ),
        datatype(
            "Forest",
            &["a"],
            vec![
                ctor("Leaf", vec![]),
                ctor(
                    "Grow",
                    vec![app("Tree", Type::var("a")), app("Forest", Type::var("a"))],
                ),
            ],
        ),
    ]);
    let typed = elaborate_program(&p).expect("forward references resolve");
    assert_eq!(kind_of(&typed, "Tree").to_string(), "* → *");
    assert_eq!(kind_of(&typed, "Forest").to_string(), "* → *");
}

#[test]
fn unused_parameters_default_to_star() {
    let p = with_defns(vec![datatype("Phantom", &["a", "b"], vec![ctor("P", vec![])])]);
    let typed = elaborate_program(&p).expect("elaborates");
    assert_eq!(kind_of(&typed, "Phantom").to_string(), "* → * → *");
}

#[test]
fn higher_kinded_parameter_is_inferred() {
    // data Wrap f = W (f Int)
    let p = with_defns(vec![datatype(
        "Wrap",
        &["f"],
        vec![ctor("W", vec![Type::app(Type::var("f"), Type::int())])],
    )]);
    let typed = elaborate_program(&p).expect("elaborates");
    assert_eq!(kind_of(&typed, "Wrap").to_string(), "(* → *) → *");
}

#[test]
fn applying_a_base_type_is_a_kind_error() {
    let p = with_defns(vec![datatype(
        "Bad",
        &[],
        vec![ctor("B", vec![Type::app(Type::int(), Type::int())])],
    )]);
    let err = elaborate_program(&p).expect_err("Int Int is ill-kinded");
    assert!(
        matches!(err, ElabError::Type(TypeError::KindUnifyFailed { .. })),
        "unexpected error: {err}"
    );
}

#[test]
fn constructor_variables_must_be_parameters() {
    let p = with_defns(vec![datatype("T", &[], vec![ctor("C", vec![Type::var("a")])])]);
    let err = elaborate_program(&p).expect_err("a is not a parameter");
    assert!(matches!(
        err.as_type_error(),
        Some(TypeError::MissingArguments { names, .. }) if names == &["a"]
    ));
}

#[test]
fn parameters_do_not_leak_into_declarations() {
    let mut p = with_defns(vec![datatype(
        "Box",
        &["a"],
        vec![ctor("MkBox", vec![Type::var("a")])],
    )]);
    p.decls = vec![Declaration::var(&["x"], Type::var("a"))];
    let err = elaborate_program(&p).expect_err("a is out of scope");
    assert!(matches!(
        err.as_type_error(),
        Some(TypeError::UndefinedType { name, .. }) if name == "a"
    ));
}

#[test]
fn partially_applied_datatype_is_not_a_value_type() {
    let mut p = with_defns(vec![datatype(
        "Box",
        &["a"],
        vec![ctor("MkBox", vec![Type::var("a")])],
    )]);
    p.decls = vec![Declaration::var(&["x"], Type::data("Box"))];
    let err = elaborate_program(&p).expect_err("Box alone has kind * → *");
    assert!(matches!(
        err.as_type_error(),
        Some(TypeError::KindUnifyFailed { .. })
    ));
}

#[test]
fn datatype_names_must_be_unique() {
    let p = with_defns(vec![
        datatype("T", &[], vec![ctor("A", vec![])]),
        datatype("T", &[], vec![ctor("B", vec![])]),
    ]);
    let err = elaborate_program(&p).expect_err("T twice");
    assert!(matches!(
        err.as_type_error(),
        Some(TypeError::DuplicatedIdentifiers { names, .. }) if names == &["T"]
    ));
}
