//! Name resolution
//!
//! A scoped name resolves against a scope only when visited. Resolution
//! walks outward through the lexical nesting, and additionally through
//! the inherited base chain of any interface scope on the way, so a
//! member can refer to identifiers of a base interface without
//! qualification. A leading `::` anchors resolution at the
//! specification root instead.

use ridl_ast::{NodeArena, NodeId, NodeKind};

/// Resolve a `::`-separated path downward from `scope`, one child
/// lookup per segment.
pub fn search(arena: &NodeArena, scope: NodeId, path: &str) -> Option<NodeId> {
    let mut cur = scope;
    for segment in path.split("::").filter(|s| !s.is_empty()) {
        cur = search_segment(arena, cur, segment)?;
    }
    Some(cur)
}

fn search_segment(arena: &NodeArena, scope: NodeId, name: &str) -> Option<NodeId> {
    if let Some(found) = arena.search_child(scope, name) {
        return Some(found);
    }
    // An interface scope also exposes the members of its base chain.
    if let Some(data) = arena.interface(scope) {
        let outer = arena.node(scope).parent.unwrap_or_else(|| arena.root());
        for &base_ref in &data.extends {
            let Some(base) = resolve(arena, outer, arena.name(base_ref)) else {
                continue;
            };
            if base == scope {
                continue;
            }
            if let Some(found) = search_segment(arena, base, name) {
                return Some(found);
            }
        }
    }
    None
}

/// Resolve a possibly-qualified name from `scope`, walking outward to
/// the specification root.
pub fn resolve(arena: &NodeArena, scope: NodeId, name: &str) -> Option<NodeId> {
    if let Some(absolute) = name.strip_prefix("::") {
        return search(arena, arena.root(), absolute);
    }
    let mut cur = Some(scope);
    while let Some(s) = cur {
        if let Some(found) = search(arena, s, name) {
            return Some(found);
        }
        cur = arena.node(s).parent;
    }
    None
}

/// Resolve `name` looking only through the inherited base chain of
/// `interface`.
pub fn resolve_in_base(arena: &NodeArena, interface: NodeId, name: &str) -> Option<NodeId> {
    let data = arena.interface(interface)?;
    let outer = arena.node(interface).parent.unwrap_or_else(|| arena.root());
    for &base_ref in &data.extends {
        let Some(base) = resolve(arena, outer, arena.name(base_ref)) else {
            continue;
        };
        if let Some(found) = search_segment(arena, base, name) {
            return Some(found);
        }
    }
    None
}

/// Resolve a scoped-name node against the given lexical scope.
pub fn search_scoped(arena: &NodeArena, scope: NodeId, scoped: NodeId) -> Option<NodeId> {
    resolve(arena, scope, arena.name(scoped))
}

/// Follow scoped names and typedef aliases through to the underlying
/// declaration or type node. Typedefs are pure aliases with no run-time
/// identity, so value resolution never stops at one.
pub fn deref(arena: &NodeArena, scope: NodeId, id: NodeId) -> Option<NodeId> {
    match &arena.node(id).kind {
        NodeKind::ScopedName => {
            let resolved = search_scoped(arena, scope, id)?;
            let inner = arena.node(resolved).parent.unwrap_or_else(|| arena.root());
            deref(arena, inner, resolved)
        }
        NodeKind::Member(member) if member.is_typedef => {
            let spec = member.spec?;
            deref(arena, scope, spec)
        }
        _ => Some(id),
    }
}

/// Compare a type reference against a literal builtin type name,
/// looking through scoped names and typedefs. A reference that fails to
/// resolve compares unequal to everything.
pub fn type_name_is(arena: &NodeArena, scope: NodeId, id: NodeId, literal: &str) -> bool {
    match deref(arena, scope, id) {
        Some(ty) => {
            matches!(arena.node(ty).kind, NodeKind::Type | NodeKind::NativeType)
                && arena.name(ty) == literal
        }
        None => false,
    }
}

pub fn is_void(arena: &NodeArena, scope: NodeId, id: NodeId) -> bool {
    type_name_is(arena, scope, id, "void")
}

pub fn is_any(arena: &NodeArena, scope: NodeId, id: NodeId) -> bool {
    type_name_is(arena, scope, id, "any")
}

pub fn is_string(arena: &NodeArena, scope: NodeId, id: NodeId) -> bool {
    type_name_is(arena, scope, id, "string")
}

pub fn is_boolean(arena: &NodeArena, scope: NodeId, id: NodeId) -> bool {
    type_name_is(arena, scope, id, "boolean")
}

/// True if the reference lands on an interface declaration.
pub fn is_interface(arena: &NodeArena, scope: NodeId, id: NodeId) -> bool {
    matches!(
        deref(arena, scope, id).map(|ty| &arena.node(ty).kind),
        Some(NodeKind::Interface(_))
    )
}

/// True if the reference lands on an exception declaration.
pub fn is_exception(arena: &NodeArena, scope: NodeId, id: NodeId) -> bool {
    matches!(
        deref(arena, scope, id).map(|ty| &arena.node(ty).kind),
        Some(NodeKind::Exception(_))
    )
}

/// True if the reference names the universal base object.
pub fn is_object(arena: &NodeArena, scope: NodeId, id: NodeId, base_object: &str) -> bool {
    match deref(arena, scope, id) {
        Some(ty) => arena.is_base_object(ty, base_object),
        None => false,
    }
}

/// The sequence node a reference lands on, if any.
pub fn as_sequence(arena: &NodeArena, scope: NodeId, id: NodeId) -> Option<NodeId> {
    let ty = deref(arena, scope, id)?;
    matches!(arena.node(ty).kind, NodeKind::Sequence(_)).then_some(ty)
}

pub fn as_array(arena: &NodeArena, scope: NodeId, id: NodeId) -> Option<NodeId> {
    let ty = deref(arena, scope, id)?;
    matches!(arena.node(ty).kind, NodeKind::Array(_)).then_some(ty)
}

pub fn as_native(arena: &NodeArena, scope: NodeId, id: NodeId) -> Option<NodeId> {
    let ty = deref(arena, scope, id)?;
    matches!(arena.node(ty).kind, NodeKind::NativeType).then_some(ty)
}

/// The typedef member a reference lands on, without looking through it.
pub fn as_typedef(arena: &NodeArena, scope: NodeId, id: NodeId) -> Option<NodeId> {
    match &arena.node(id).kind {
        NodeKind::Member(member) if member.is_typedef => Some(id),
        NodeKind::ScopedName => {
            let resolved = search_scoped(arena, scope, id)?;
            match &arena.node(resolved).kind {
                NodeKind::Member(member) if member.is_typedef => Some(resolved),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridl_ast::{Decl, Document, Span, TypeExpr};

    fn iface(name: &str, extends: Vec<String>, members: Vec<Decl>) -> Decl {
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

    fn fixture() -> ridl_ast::NodeArena {
        let doc = Document {
            source: "test.idl".to_string(),
            text: None,
            definitions: vec![
                Decl::Module {
                    name: "dom".to_string(),
                    ext_attrs: vec![],
                    body: vec![
                        iface("Node", vec![], vec![]),
                        iface("Element", vec!["Node".to_string()], vec![]),
                        Decl::Const {
                            name: "ELEMENT_NODE".to_string(),
                            ty: TypeExpr::Builtin {
                                name: "unsigned short".to_string(),
                                nullable: false,
                            },
                            value: ridl_ast::Expr::Literal {
                                text: "1".to_string(),
                            },
                            span: Span::default(),
                            doc: String::new(),
                        },
                    ],
                    span: Span::default(),
                    doc: String::new(),
                },
                Decl::Typedef {
                    name: "NodeRef".to_string(),
                    ty: TypeExpr::Named {
                        name: "dom::Node".to_string(),
                        nullable: false,
                    },
                    span: Span::default(),
                    doc: String::new(),
                },
            ],
        };
        let mut arena = ridl_ast::NodeArena::new();
        doc.lower(&mut arena, 0, 1).unwrap();
        arena
    }

    #[test]
    fn test_resolve_from_nested_scope() {
        let arena = fixture();
        let dom = arena.search_child(arena.root(), "dom").unwrap();
        let element = arena.search_child(dom, "Element").unwrap();
        // Outward walk finds siblings and enclosing declarations.
        assert!(resolve(&arena, element, "Node").is_some());
        assert!(resolve(&arena, element, "dom").is_some());
        assert!(resolve(&arena, element, "NodeRef").is_some());
    }

    #[test]
    fn test_resolution_is_scope_monotonic() {
        let arena = fixture();
        let root = arena.root();
        let dom = arena.search_child(root, "dom").unwrap();
        let element = arena.search_child(dom, "Element").unwrap();
        for name in ["dom::Node", "NodeRef"] {
            let outer = resolve(&arena, root, name);
            assert!(outer.is_some());
            assert_eq!(resolve(&arena, dom, name), outer);
            assert_eq!(resolve(&arena, element, name), outer);
        }
    }

    #[test]
    fn test_root_anchored_resolution() {
        let arena = fixture();
        let dom = arena.search_child(arena.root(), "dom").unwrap();
        let node = arena.search_child(dom, "Node").unwrap();
        assert_eq!(resolve(&arena, node, "::dom::Node"), Some(node));
        assert_eq!(resolve(&arena, arena.root(), "::missing"), None);
    }

    #[test]
    fn test_base_chain_search() {
        let arena = fixture();
        let dom = arena.search_child(arena.root(), "dom").unwrap();
        let element = arena.search_child(dom, "Element").unwrap();
        // ELEMENT_NODE is declared in the module, reachable outward;
        // members of Node are reachable through Element's base chain.
        assert!(search(&arena, element, "ELEMENT_NODE").is_none());
        assert!(resolve(&arena, element, "ELEMENT_NODE").is_some());
    }

    #[test]
    fn test_typedef_transparency() {
        let arena = fixture();
        let root = arena.root();
        let alias = resolve(&arena, root, "NodeRef").unwrap();
        assert!(is_interface(&arena, root, alias));
        let dom = arena.search_child(root, "dom").unwrap();
        let node = arena.search_child(dom, "Node").unwrap();
        assert_eq!(deref(&arena, root, alias), Some(node));
    }

    #[test]
    fn test_primitive_short_circuit() {
        let mut arena = ridl_ast::NodeArena::new();
        let ty = arena.alloc(ridl_ast::Node::new("long", ridl_ast::NodeKind::Type));
        assert!(type_name_is(&arena, arena.root(), ty, "long"));
        assert!(!type_name_is(&arena, arena.root(), ty, "short"));
    }
}
