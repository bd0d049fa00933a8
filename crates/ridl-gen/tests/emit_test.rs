//! End-to-end emission over a small DOM-flavored fixture: every
//! back-end runs off the same frozen tree and the generated sources
//! agree on names, hashes, and interface numbering.

use ridl_ast::{Decl, Document, Expr, ExtAttr, NodeArena, Param, Span, TypeExpr};
use ridl_gen::{emit_all, Artifact, Backend, EmitConfig};
use ridl_meta::{one_at_a_time, synthesize, MetaTables};
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

fn fixture() -> Vec<Decl> {
    vec![
        Decl::Exception {
            name: "DOMException".to_string(),
            members: vec![
                Decl::Const {
                    name: "INDEX_SIZE_ERR".to_string(),
                    ty: builtin("unsigned short"),
                    value: Expr::Literal {
                        text: "1".to_string(),
                    },
                    span: Span::default(),
                    doc: String::new(),
                },
                Decl::Field {
                    name: "code".to_string(),
                    ty: builtin("unsigned short"),
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
            name: "Node".to_string(),
            forward: false,
            extends: vec![],
            ext_attrs: vec![],
            members: vec![
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
                    params: vec![Param {
                        name: "newChild".to_string(),
                        ty: named("Node"),
                        optional: false,
                        variadic: false,
                        ext_attrs: vec![],
                    }],
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
            name: "Widget".to_string(),
            forward: false,
            extends: vec!["Node".to_string()],
            ext_attrs: vec![ExtAttr {
                name: "Constructor".to_string(),
                value: None,
                params: vec![Param {
                    name: "size".to_string(),
                    ty: builtin("long"),
                    optional: false,
                    variadic: false,
                    ext_attrs: vec![],
                }],
            }],
            members: vec![
                Decl::Attribute {
                    name: "size".to_string(),
                    ty: builtin("long"),
                    readonly: false,
                    stringifier: false,
                    get_raises: vec![],
                    set_raises: vec![],
                    ext_attrs: vec![],
                    span: Span::default(),
                    doc: String::new(),
                },
                Decl::Operation {
                    name: "measure".to_string(),
                    return_ty: builtin("long"),
                    params: vec![Param {
                        name: "units".to_string(),
                        ty: builtin("string"),
                        optional: true,
                        variadic: false,
                        ext_attrs: vec![],
                    }],
                    raises: vec![],
                    specials: vec![],
                    ext_attrs: vec![],
                    span: Span::default(),
                    doc: String::new(),
                },
            ],
            span: Span::default(),
            doc: String::new(),
        },
        Decl::Implements {
            target: "Widget".to_string(),
            mixin: "EventTarget".to_string(),
            span: Span::default(),
        },
    ]
}

fn compile() -> (NodeArena, MetaTables) {
    let doc = Document {
        source: "widget.idl".to_string(),
        text: None,
        definitions: fixture(),
    };
    let mut arena = NodeArena::new();
    doc.lower(&mut arena, 0, 1).unwrap();
    let mut diags = Diagnostics::new();
    ridl_sema::run_passes(&mut arena, &SemaOptions::default(), &mut diags).unwrap();
    let tables = synthesize(&arena, &ridl_meta::MetaOptions::default()).unwrap();
    (arena, tables)
}

fn emit(backend: Backend) -> Vec<Artifact> {
    let (arena, tables) = compile();
    emit_all(
        &arena,
        &SemaOptions::default(),
        &tables,
        &EmitConfig::default(),
        &[backend],
    )
    .unwrap()
}

fn artifact<'a>(artifacts: &'a [Artifact], file: &str) -> &'a Artifact {
    artifacts
        .iter()
        .find(|a| a.path.to_string_lossy() == file)
        .unwrap_or_else(|| panic!("no artifact {file}"))
}

#[test]
fn header_emits_pure_interface() {
    let artifacts = emit(Backend::Header);
    let node = artifact(&artifacts, "Node.h");
    assert!(node.contents.contains("class Node : public Object {"));
    assert!(node
        .contents
        .contains("virtual std::string getNodeName() = 0;"));
    assert!(node
        .contents
        .contains("virtual Node* appendChild(Node* newChild) throw(DOMException) = 0;"));
    // Meta string embedded verbatim.
    assert!(node.contents.contains("\"I4Node"));
    assert!(node.contents.contains("static bool hasInstance(Object* object)"));
}

#[test]
fn header_expands_optional_overloads() {
    let artifacts = emit(Backend::Header);
    let widget = artifact(&artifacts, "Widget.h");
    assert!(widget.contents.contains("virtual int measure() = 0;"));
    assert!(widget
        .contents
        .contains("virtual int measure(const std::string& units) = 0;"));
    assert!(widget.contents.contains("class Widget : public Node {"));
}

#[test]
fn constructor_is_a_standalone_artifact() {
    let artifacts = emit(Backend::Header);
    let ctor = artifact(&artifacts, "Widget_Constructor.h");
    assert!(ctor
        .contents
        .contains("class Widget_Constructor : public Object {"));
    assert!(ctor
        .contents
        .contains("virtual Widget* createInstance(int size) = 0;"));
}

#[test]
fn exception_gets_its_own_header() {
    let artifacts = emit(Backend::Header);
    let exception = artifact(&artifacts, "DOMException.h");
    assert!(exception.contents.contains("struct DOMException {"));
    assert!(exception
        .contents
        .contains("static const unsigned short INDEX_SIZE_ERR = 1;"));
    assert!(exception.contents.contains("unsigned short code;"));
}

#[test]
fn messenger_embeds_selector_hashes() {
    let artifacts = emit(Backend::Messenger);
    let node = artifact(&artifacts, "Node.h");
    let name_hash = one_at_a_time(b"nodeName");
    let append_hash = one_at_a_time(b"appendChild");
    assert!(node.contents.contains(&format!("{name_hash:#x}u")));
    assert!(node.contents.contains(&format!("case {append_hash:#x}u:")));
    assert!(node.contents.contains("static Any dispatch(IMP* self"));
    assert!(node
        .contents
        .contains("return self->appendChild(arguments[0].toObject());"));
}

#[test]
fn messenger_dispatch_guards_overload_stages() {
    let artifacts = emit(Backend::Messenger);
    let widget = artifact(&artifacts, "Widget.h");
    assert!(widget.contents.contains("if (argumentCount == 0) {"));
    assert!(widget.contents.contains("if (argumentCount == 1) {"));
    // Inherited selectors fall through to the base dispatch.
    assert!(widget
        .contents
        .contains("return Node::dispatch(self, selector, id, argumentCount, arguments);"));
}

#[test]
fn bridge_numbers_interfaces_deterministically() {
    let artifacts = emit(Backend::Bridge);
    let widget = artifact(&artifacts, "WidgetBridge.h");
    // interface list: Widget, Node, EventTarget.
    assert!(widget.contents.contains("return Widget::getMetaData();"));
    assert!(widget.contents.contains("return Node::getMetaData();"));
    assert!(widget
        .contents
        .contains("return EventTarget::getMetaData();"));
    assert!(widget.contents.contains("class Widget_Mixin : public Widget, public EventTarget {"));
    assert!(widget.contents.contains("invoke(this, I, 0, GETTER_, 0)"));
}

#[test]
fn java_interface_shape() {
    let artifacts = emit(Backend::Java);
    let widget = artifact(&artifacts, "Widget.java");
    assert!(widget
        .contents
        .contains("public interface Widget extends Node, EventTarget {"));
    assert!(widget.contents.contains("public int getSize();"));
    assert!(widget.contents.contains("public void setSize(int size);"));
    assert!(widget.contents.contains("public int measure();"));
    assert!(widget.contents.contains("public int measure(String units);"));
    let node = artifact(&artifacts, "Node.java");
    assert!(node
        .contents
        .contains("public Node appendChild(Node newChild) throws DOMException;"));
    let exception = artifact(&artifacts, "DOMException.java");
    assert!(exception
        .contents
        .contains("public class DOMException extends RuntimeException {"));
}

#[test]
fn forward_declaration_sufficiency_in_emitted_header() {
    // Every interface name appearing in Node.h is satisfied by an
    // include, a forward declaration, or the class itself.
    let artifacts = emit(Backend::Header);
    let node = artifact(&artifacts, "Node.h");
    // DOMException is fully defined elsewhere: imported.
    assert!(node.contents.contains("#include <DOMException.h>"));
}
