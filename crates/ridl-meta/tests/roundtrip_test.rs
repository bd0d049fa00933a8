//! Meta round-trip: decoding a synthesized interface string must
//! reproduce the names, links, and member shapes fed into the
//! synthesizer.

use ridl_ast::{Decl, Document, Expr, ExtAttr, NodeArena, Param, Span, TypeExpr};
use ridl_meta::{reflect, synthesize, MetaOptions, MetaTables};
use ridl_sema::{Diagnostics, SemaOptions};

fn builtin(name: &str) -> TypeExpr {
    TypeExpr::Builtin {
        name: name.to_string(),
        nullable: false,
    }
}

fn named(name: &str) -> TypeExpr {
    TypeExpr::Named {
        name: name.to_string(),
        nullable: false,
    }
}

fn param(name: &str, ty: TypeExpr) -> Param {
    Param {
        name: name.to_string(),
        ty,
        optional: false,
        variadic: false,
        ext_attrs: vec![],
    }
}

fn compile(definitions: Vec<Decl>) -> (NodeArena, MetaTables) {
    let doc = Document {
        source: "roundtrip.idl".to_string(),
        text: None,
        definitions,
    };
    let mut arena = NodeArena::new();
    doc.lower(&mut arena, 0, 1).unwrap();
    let mut diags = Diagnostics::new();
    ridl_sema::run_passes(&mut arena, &SemaOptions::default(), &mut diags).unwrap();
    let tables = synthesize(&arena, &MetaOptions::default()).unwrap();
    (arena, tables)
}

fn dom_fixture() -> Vec<Decl> {
    vec![
        Decl::Exception {
            name: "DOMException".to_string(),
            members: vec![Decl::Field {
                name: "code".to_string(),
                ty: builtin("unsigned short"),
                span: Span::default(),
                doc: String::new(),
            }],
            span: Span::default(),
            doc: String::new(),
        },
        Decl::Interface {
            name: "Node".to_string(),
            forward: false,
            extends: vec![],
            ext_attrs: vec![],
            members: vec![
                Decl::Const {
                    name: "ELEMENT_NODE".to_string(),
                    ty: builtin("unsigned short"),
                    value: Expr::Literal {
                        text: "1".to_string(),
                    },
                    span: Span::default(),
                    doc: String::new(),
                },
                Decl::Attribute {
                    name: "nodeName".to_string(),
                    ty: builtin("string"),
                    readonly: true,
                    stringifier: false,
                    get_raises: vec![],
                    set_raises: vec![],
                    ext_attrs: vec![],
                    span: Span::default(),
                    doc: String::new(),
                },
                Decl::Operation {
                    name: "appendChild".to_string(),
                    return_ty: named("Node"),
                    params: vec![param("newChild", named("Node"))],
                    raises: vec!["DOMException".to_string()],
                    specials: vec![],
                    ext_attrs: vec![],
                    span: Span::default(),
                    doc: String::new(),
                },
            ],
            span: Span::default(),
            doc: String::new(),
        },
        Decl::Interface {
            name: "EventTarget".to_string(),
            forward: false,
            extends: vec![],
            ext_attrs: vec![],
            members: vec![],
            span: Span::default(),
            doc: String::new(),
        },
        Decl::Interface {
            name: "Element".to_string(),
            forward: false,
            extends: vec!["Node".to_string()],
            ext_attrs: vec![],
            members: vec![Decl::Attribute {
                name: "tagName".to_string(),
                ty: builtin("string"),
                readonly: false,
                stringifier: false,
                get_raises: vec![],
                set_raises: vec![],
                ext_attrs: vec![],
                span: Span::default(),
                doc: String::new(),
            }],
            span: Span::default(),
            doc: String::new(),
        },
        Decl::Implements {
            target: "Element".to_string(),
            mixin: "EventTarget".to_string(),
            span: Span::default(),
        },
    ]
}

#[test]
fn roundtrip_reproduces_interface_shape() {
    let (arena, tables) = compile(dom_fixture());
    let node = arena.search_child(arena.root(), "Node").unwrap();
    let meta = &tables.assembled[&node];
    let decoded = reflect::Interface::parse(meta);

    assert_eq!(decoded.qualified_name(), "Node");
    assert!(decoded.extends().is_empty());
    assert_eq!(decoded.method_count(), 2);
    assert_eq!(decoded.constant_count(), 1);

    let getter = decoded.method(0).unwrap();
    assert!(getter.is_getter());
    assert_eq!(getter.name(), "nodeName");
    assert_eq!(getter.return_type().tag(), 'D');

    let op = decoded.method(1).unwrap();
    assert!(op.is_operation());
    assert_eq!(op.name(), "appendChild");
    assert_eq!(op.parameter_count(), 1);
    let params = op.parameters();
    assert_eq!(params[0].0.qualified_name(), "Node");
    assert_eq!(params[0].1, "newChild");
    assert_eq!(op.raises(), vec!["DOMException"]);

    let constant = decoded.constant(0).unwrap();
    assert_eq!(constant.name(), "ELEMENT_NODE");
    assert_eq!(constant.value(), 1.0);
}

#[test]
fn roundtrip_reproduces_links() {
    let (arena, tables) = compile(dom_fixture());
    let element = arena.search_child(arena.root(), "Element").unwrap();
    let decoded = reflect::Interface::parse(&tables.assembled[&element]);
    assert_eq!(decoded.qualified_name(), "Element");
    assert_eq!(decoded.extends(), vec!["Node"]);
    assert_eq!(decoded.implements(), vec!["EventTarget"]);
    // Writable attribute: getter and setter both decode.
    assert_eq!(decoded.method_count(), 2);
    assert!(decoded.method(0).unwrap().is_getter());
    assert!(decoded.method(1).unwrap().is_setter());
    assert_eq!(decoded.method(1).unwrap().name(), "tagName");
}

#[test]
fn selector_hashes_are_stable_across_runs() {
    let (arena_a, tables_a) = compile(dom_fixture());
    let (arena_b, tables_b) = compile(dom_fixture());
    let node_a = arena_a.search_child(arena_a.root(), "Node").unwrap();
    let node_b = arena_b.search_child(arena_b.root(), "Node").unwrap();
    for (member_a, member_b) in arena_a
        .children(node_a)
        .iter()
        .zip(arena_b.children(node_b))
    {
        assert_eq!(tables_a.hash_of(*member_a), tables_b.hash_of(*member_b));
    }
    assert!(tables_a.collisions.is_empty());
    assert_eq!(
        tables_a.hash_of(node_a),
        0,
        "interfaces themselves carry no selector hash"
    );
}

#[test]
fn optional_parameters_decode_per_stage() {
    let (arena, tables) = compile(vec![Decl::Interface {
        name: "Timer".to_string(),
        forward: false,
        extends: vec![],
        ext_attrs: vec![],
        members: vec![Decl::Operation {
            name: "start".to_string(),
            return_ty: builtin("void"),
            params: vec![
                Param {
                    name: "delay".to_string(),
                    ty: builtin("long"),
                    optional: true,
                    variadic: false,
                    ext_attrs: vec![],
                },
                Param {
                    name: "repeat".to_string(),
                    ty: builtin("boolean"),
                    optional: true,
                    variadic: false,
                    ext_attrs: vec![],
                },
            ],
            raises: vec![],
            specials: vec![],
            ext_attrs: vec![],
            span: Span::default(),
            doc: String::new(),
        }],
        span: Span::default(),
        doc: String::new(),
    }]);
    let timer = arena.search_child(arena.root(), "Timer").unwrap();
    let decoded = reflect::Interface::parse(&tables.assembled[&timer]);
    assert_eq!(decoded.method_count(), 3);
    let counts: Vec<u32> = (0..3)
        .map(|n| decoded.method(n).unwrap().parameter_count())
        .collect();
    assert_eq!(counts, vec![0, 1, 2]);
    for n in 0..3 {
        assert_eq!(decoded.method(n).unwrap().name(), "start");
    }
}

#[test]
fn supplemental_members_look_first_class() {
    let (arena, tables) = compile(vec![
        Decl::Interface {
            name: "Window".to_string(),
            forward: false,
            extends: vec![],
            ext_attrs: vec![],
            members: vec![],
            span: Span::default(),
            doc: String::new(),
        },
        Decl::Interface {
            name: "WindowTimers".to_string(),
            forward: false,
            extends: vec![],
            ext_attrs: vec![ExtAttr {
                name: "Supplemental".to_string(),
                value: None,
                params: vec![],
            }],
            members: vec![Decl::Operation {
                name: "setTimeout".to_string(),
                return_ty: builtin("long"),
                params: vec![param("handler", builtin("any"))],
                raises: vec![],
                specials: vec![],
                ext_attrs: vec![],
                span: Span::default(),
                doc: String::new(),
            }],
            span: Span::default(),
            doc: String::new(),
        },
        Decl::Implements {
            target: "Window".to_string(),
            mixin: "WindowTimers-1".to_string(),
            span: Span::default(),
        },
    ]);
    let window = arena.search_child(arena.root(), "Window").unwrap();
    let decoded = reflect::Interface::parse(&tables.assembled[&window]);
    // The supplemental operation decodes as a member of Window itself.
    assert_eq!(decoded.method_count(), 1);
    assert_eq!(decoded.method(0).unwrap().name(), "setTimeout");
    assert!(decoded.implements().is_empty());
}
