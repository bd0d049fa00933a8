//! Whole-pipeline checks over the semantic passes: lowering, the
//! extended-attribute rewrite, the adjuster, and diagnostic rendering.

use ridl_ast::{Decl, Document, Expr, ExtAttr, NodeArena, Param, Span, TypeExpr};
use ridl_sema::{resolve, Diagnostics, SemaError, SemaOptions};

fn builtin(name: &str) -> TypeExpr {
    TypeExpr::Builtin {
        name: name.to_string(),
        nullable: false,
    }
}

fn interface(name: &str, extends: Vec<String>, members: Vec<Decl>) -> Decl {
    Decl::Interface {
        name: name.to_string(),
        forward: false,
        extends,
        ext_attrs: vec![],
        members,
        span: Span::default(),
        doc: String::new(),
    }
}

fn module(name: &str, body: Vec<Decl>) -> Decl {
    Decl::Module {
        name: name.to_string(),
        ext_attrs: vec![],
        body,
        span: Span::default(),
        doc: String::new(),
    }
}

#[test]
fn nested_scopes_resolve_monotonically() {
    let doc = Document {
        source: "scopes.idl".to_string(),
        text: None,
        definitions: vec![
            module(
                "svg",
                vec![interface("Shape", vec![], vec![])],
            ),
            module(
                "dom",
                vec![
                    interface("Node", vec![], vec![]),
                    module(
                        "events",
                        vec![interface(
                            "Event",
                            vec![],
                            vec![Decl::Attribute {
                                name: "target".to_string(),
                                ty: TypeExpr::Named {
                                    name: "Node".to_string(),
                                    nullable: false,
                                },
                                readonly: true,
                                stringifier: false,
                                get_raises: vec![],
                                set_raises: vec![],
                                ext_attrs: vec![],
                                span: Span::default(),
                                doc: String::new(),
                            }],
                        )],
                    ),
                ],
            ),
        ],
    };
    let mut arena = NodeArena::new();
    doc.lower(&mut arena, 0, 1).unwrap();
    let mut diags = Diagnostics::new();
    ridl_sema::run_passes(&mut arena, &SemaOptions::default(), &mut diags).unwrap();

    let root = arena.root();
    let dom = arena.search_child(root, "dom").unwrap();
    let events = arena.search_child(dom, "events").unwrap();
    let event = arena.search_child(events, "Event").unwrap();

    // Everything resolvable at an outer scope stays resolvable inside.
    for name in ["dom::Node", "svg::Shape", "::dom::events::Event"] {
        let outer = resolve::resolve(&arena, root, name);
        assert!(outer.is_some(), "{name} must resolve at the root");
        assert_eq!(resolve::resolve(&arena, dom, name), outer);
        assert_eq!(resolve::resolve(&arena, events, name), outer);
        assert_eq!(resolve::resolve(&arena, event, name), outer);
    }
    // The unqualified sibling is only visible from inside dom.
    assert!(resolve::resolve(&arena, events, "Node").is_some());
    assert!(resolve::resolve(&arena, root, "Node").is_none());
}

#[test]
fn fatal_errors_render_with_source_location() {
    let doc = Document {
        source: "broken.idl".to_string(),
        text: None,
        definitions: vec![
            interface("Orphan", vec![], vec![]),
            Decl::Implements {
                target: "Orphan".to_string(),
                mixin: "Gone".to_string(),
                span: Span {
                    start: 0,
                    end: 4,
                    first_line: 12,
                    first_column: 1,
                    last_line: 12,
                    last_column: 22,
                },
            },
        ],
    };
    let mut arena = NodeArena::new();
    let mut diags = Diagnostics::new();
    let file = diags.add_file("broken.idl", "");
    doc.lower(&mut arena, file, 1).unwrap();
    let err = ridl_sema::run_passes(&mut arena, &SemaOptions::default(), &mut diags).unwrap_err();
    assert!(matches!(err, SemaError::Unresolved { .. }));
    assert_eq!(
        diags.render_error(&err),
        "broken.idl:12.1-12.22: could not resolve `Gone`"
    );
}

#[test]
fn deprecated_attributes_never_abort() {
    let doc = Document {
        source: "legacy.idl".to_string(),
        text: None,
        definitions: vec![Decl::Interface {
            name: "Legacy".to_string(),
            forward: false,
            extends: vec![],
            ext_attrs: vec![ExtAttr {
                name: "NoIndexingOperations".to_string(),
                value: None,
                params: vec![],
            }],
            members: vec![Decl::Operation {
                name: "item".to_string(),
                return_ty: builtin("any"),
                params: vec![Param {
                    name: "index".to_string(),
                    ty: builtin("unsigned long"),
                    optional: false,
                    variadic: false,
                    ext_attrs: vec![ExtAttr {
                        name: "Null".to_string(),
                        value: None,
                        params: vec![],
                    }],
                }],
                raises: vec![],
                specials: vec![],
                ext_attrs: vec![ExtAttr {
                    name: "IndexGetter".to_string(),
                    value: None,
                    params: vec![],
                }],
                span: Span::default(),
                doc: String::new(),
            }],
            span: Span::default(),
            doc: String::new(),
        }],
    };
    let mut arena = NodeArena::new();
    doc.lower(&mut arena, 0, 1).unwrap();
    let mut diags = Diagnostics::new();
    ridl_sema::run_passes(&mut arena, &SemaOptions::default(), &mut diags).unwrap();
    assert_eq!(diags.warnings().len(), 3);
    let json = diags.warnings_json().unwrap();
    assert!(json.contains("\"severity\""));
    assert!(json.contains("IndexGetter"));
}

#[test]
fn constructor_overloads_count_like_scenario_d() {
    let doc = Document {
        source: "widget.idl".to_string(),
        text: None,
        definitions: vec![Decl::Interface {
            name: "Widget".to_string(),
            forward: false,
            extends: vec![],
            ext_attrs: vec![
                ExtAttr {
                    name: "Constructor".to_string(),
                    value: None,
                    params: vec![],
                },
                ExtAttr {
                    name: "Constructor".to_string(),
                    value: None,
                    params: vec![Param {
                        name: "size".to_string(),
                        ty: builtin("long"),
                        optional: false,
                        variadic: false,
                        ext_attrs: vec![],
                    }],
                },
            ],
            members: vec![],
            span: Span::default(),
            doc: String::new(),
        }],
    };
    let mut arena = NodeArena::new();
    doc.lower(&mut arena, 0, 1).unwrap();
    let mut diags = Diagnostics::new();
    ridl_sema::run_passes(&mut arena, &SemaOptions::default(), &mut diags).unwrap();
    let widget = arena.search_child(arena.root(), "Widget").unwrap();
    let ctor = arena.interface(widget).unwrap().constructor.unwrap();
    assert_eq!(arena.interface(ctor).unwrap().method_count, 2);
    // The constructor extends the base object: one interface slot.
    assert_eq!(arena.interface(ctor).unwrap().interface_count, Some(1));
}

#[test]
fn constants_fold_across_references() {
    let doc = Document {
        source: "consts.idl".to_string(),
        text: None,
        definitions: vec![interface(
            "Limits",
            vec![],
            vec![
                Decl::Const {
                    name: "BASE".to_string(),
                    ty: builtin("long"),
                    value: Expr::Literal {
                        text: "0x10".to_string(),
                    },
                    span: Span::default(),
                    doc: String::new(),
                },
                Decl::Const {
                    name: "DERIVED".to_string(),
                    ty: builtin("long"),
                    value: Expr::Binary {
                        op: "|".to_string(),
                        left: Box::new(Expr::Ref {
                            name: "BASE".to_string(),
                        }),
                        right: Box::new(Expr::Literal {
                            text: "1".to_string(),
                        }),
                    },
                    span: Span::default(),
                    doc: String::new(),
                },
            ],
        )],
    };
    let mut arena = NodeArena::new();
    doc.lower(&mut arena, 0, 1).unwrap();
    let mut diags = Diagnostics::new();
    ridl_sema::run_passes(&mut arena, &SemaOptions::default(), &mut diags).unwrap();
    let limits = arena.search_child(arena.root(), "Limits").unwrap();
    let derived = arena.children(limits)[1];
    let expr = arena.constant(derived).unwrap().expr;
    assert_eq!(
        ridl_sema::eval::eval_integer(&arena, limits, expr).unwrap(),
        17
    );
}
