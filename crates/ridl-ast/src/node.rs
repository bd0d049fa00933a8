//! Arena node model
//!
//! One tagged node type covers every declaration and type expression the
//! front-end can hand over. A node owns its ordered child list; parents
//! are weak back-links. `rank` records the include depth at definition
//! time: rank 1 marks declarations native to the compiled unit, anything
//! deeper came in through an include and is never re-emitted.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::doc::ExtAttr;
use crate::{FileId, Span};

/// Stable arena index of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Structural and semantic flag bits carried on a node.
///
/// The special-operation bits (index getter/setter/creator/deleter,
/// caller, stringifier) are pre-encoded by the front-end; the extended
/// attribute processor sets the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attr(pub u32);

impl Attr {
    pub const NONE: Attr = Attr(0);
    pub const INDEX_CREATOR: Attr = Attr(1 << 2);
    pub const INDEX_DELETER: Attr = Attr(1 << 3);
    pub const INDEX_GETTER: Attr = Attr(1 << 4);
    pub const INDEX_SETTER: Attr = Attr(1 << 5);
    pub const INDEX_MASK: Attr =
        Attr(Self::INDEX_CREATOR.0 | Self::INDEX_DELETER.0 | Self::INDEX_GETTER.0 | Self::INDEX_SETTER.0);
    pub const CALLER: Attr = Attr(1 << 6);
    pub const STRINGIFIER: Attr = Attr(1 << 7);
    pub const OMITTABLE: Attr = Attr(1 << 8);
    pub const VARIADIC: Attr = Attr(1 << 9);
    pub const NULLABLE: Attr = Attr(1 << 10);
    pub const STATIC: Attr = Attr(1 << 11);
    pub const CALLBACK_FUNCTION_ONLY: Attr = Attr(1 << 12);
    pub const CALLBACK_PROPERTY_ONLY: Attr = Attr(1 << 13);
    pub const CALLBACK: Attr = Attr(Self::CALLBACK_FUNCTION_ONLY.0 | Self::CALLBACK_PROPERTY_ONLY.0);
    pub const NO_INTERFACE_OBJECT: Attr = Attr(1 << 14);
    pub const PROTOTYPE_ROOT: Attr = Attr(1 << 15);
    pub const NULL_IS_EMPTY: Attr = Attr(1 << 16);
    pub const UNDEFINED_IS_EMPTY: Attr = Attr(1 << 17);
    pub const UNDEFINED_IS_NULL: Attr = Attr(1 << 18);
    pub const ALLOW_ANY: Attr = Attr(1 << 19);
    pub const REPLACEABLE: Attr = Attr(1 << 20);
    pub const OPTIONAL: Attr = Attr(1 << 21);
    pub const IMPLEMENTED_ON: Attr = Attr(1 << 22);
    pub const SUPPLEMENTAL: Attr = Attr(1 << 23);
    pub const CONSTRUCTOR: Attr = Attr(1 << 24);
    pub const UNNAMED_PROPERTY: Attr = Attr(1 << 31);

    /// True if any bit of `other` is set.
    pub fn intersects(self, other: Attr) -> bool {
        self.0 & other.0 != 0
    }

    /// True if every bit of `other` is set.
    pub fn contains(self, other: Attr) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Attr) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Attr) {
        self.0 &= !other.0;
    }
}

impl BitOr for Attr {
    type Output = Attr;
    fn bitor(self, rhs: Attr) -> Attr {
        Attr(self.0 | rhs.0)
    }
}

impl BitOrAssign for Attr {
    fn bitor_assign(&mut self, rhs: Attr) {
        self.0 |= rhs.0;
    }
}

/// Module payload. The counts are restricted to direct rank-1 children,
/// the per-compilation-unit numbers the emitters size their output by.
#[derive(Debug, Clone, Default)]
pub struct ModuleData {
    pub interface_count: u32,
    pub const_count: u32,
    pub module_count: u32,
    /// Namespace rename from `[Prefix=...]`.
    pub prefix: String,
}

/// Interface payload.
///
/// `super_list`, `supplemental_list`, `implement_list`, the adjusted
/// `method_count`, and the memoized `interface_count` are only valid
/// after the adjuster pass has completed a full tree walk.
#[derive(Debug, Clone, Default)]
pub struct InterfaceData {
    /// Scoped-name nodes naming the base interface(s). The grammar
    /// allows a list; resolution enforces single inheritance.
    pub extends: Vec<NodeId>,
    /// Synthesized constructor pseudo-interface, owned through this
    /// field rather than the child list.
    pub constructor: Option<NodeId>,
    /// Resolved base chain, nearest first, including the base object.
    pub super_list: Vec<NodeId>,
    /// Interfaces whose members fold into this one's dispatch surface.
    pub supplemental_list: Vec<NodeId>,
    /// Mixins visible in this interface's interface-table enumeration.
    pub implement_list: Vec<NodeId>,
    pub const_count: u32,
    pub method_count: u32,
    pub static_method_count: u32,
    /// Memoized by the adjuster; total interface slots including self.
    pub interface_count: Option<u32>,
}

/// Exception payload (struct-like, members are fields and constants).
#[derive(Debug, Clone, Default)]
pub struct ExceptionData {
    pub member_count: u32,
}

/// `X implements Y` cross-link; both sides are scoped-name nodes.
#[derive(Debug, Clone)]
pub struct ImplementsData {
    pub first: NodeId,
    pub second: NodeId,
}

/// Plain member or typedef. A typedef is a pure alias: type predicates
/// and value resolution look straight through it to `spec`.
#[derive(Debug, Clone)]
pub struct MemberData {
    pub spec: Option<NodeId>,
    pub is_typedef: bool,
}

#[derive(Debug, Clone)]
pub struct AttributeData {
    pub spec: NodeId,
    pub readonly: bool,
    pub get_raises: Vec<NodeId>,
    pub set_raises: Vec<NodeId>,
    /// `[PutForwards=name]` target attribute on the referenced interface.
    pub put_forwards: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConstData {
    pub spec: NodeId,
    pub expr: NodeId,
}

#[derive(Debug, Clone)]
pub struct OpData {
    pub spec: NodeId,
    pub raises: Vec<NodeId>,
    pub param_count: u32,
    /// Number of overload stages; 1 until the adjuster expands
    /// trailing optional parameters.
    pub method_count: u32,
    /// Fixed parameter count per stage, filled when `method_count > 1`.
    pub param_counts: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct ParamData {
    pub spec: NodeId,
}

#[derive(Debug, Clone)]
pub struct SequenceData {
    pub spec: NodeId,
    pub max: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ArrayData {
    pub spec: NodeId,
    pub max: Option<NodeId>,
}

/// Node kind with per-kind payload.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Module(ModuleData),
    Interface(InterfaceData),
    Exception(ExceptionData),
    Implements(ImplementsData),
    /// Lazy reference to a declaration; resolved against a scope only
    /// when visited, never eagerly.
    ScopedName,
    /// Builtin type; the node name is the IDL spelling ("long", ...).
    Type,
    NativeType,
    Sequence(SequenceData),
    Array(ArrayData),
    Member(MemberData),
    Attribute(AttributeData),
    Const(ConstData),
    Op(OpData),
    Param(ParamData),
    /// Binary constant expression; the node name is the operator and the
    /// children are the two operands.
    BinaryExpr,
    UnaryExpr,
    Literal,
}

/// One node of the tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub attr: Attr,
    pub parent: Option<NodeId>,
    /// `None` marks a leaf (a forward declaration never gets a child
    /// list); `Some` holds the ordered owned children.
    pub children: Option<Vec<NodeId>>,
    pub rank: u32,
    pub source: FileId,
    pub span: Span,
    pub doc: String,
    pub ext_attrs: Vec<ExtAttr>,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Node {
            name: name.into(),
            attr: Attr::NONE,
            parent: None,
            children: None,
            rank: 1,
            source: 0,
            span: Span::default(),
            doc: String::new(),
            ext_attrs: Vec::new(),
            kind,
        }
    }

    pub fn with_children(mut self) -> Self {
        self.children = Some(Vec::new());
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// The arena owning every node of one compilation.
///
/// The root is an anonymous module standing for the global specification
/// scope; all documents lower into it.
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new() -> Self {
        let mut arena = NodeArena { nodes: Vec::new() };
        let root = Node::new("", NodeKind::Module(ModuleData::default())).with_children();
        arena.nodes.push(root);
        arena
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a node without linking it anywhere.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.node(id).name
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.node(id).is_leaf()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).children {
            Some(list) => list,
            None => &[],
        }
    }

    /// Append a child, updating the owner's declaration counts the way
    /// the owning kind tracks them.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.count_child(parent, child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent)
            .children
            .get_or_insert_with(Vec::new)
            .push(child);
    }

    /// Splice a child at the front of the list (forward declarations
    /// must textually precede their first use).
    pub fn add_child_front(&mut self, parent: NodeId, child: NodeId) {
        self.count_child(parent, child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent)
            .children
            .get_or_insert_with(Vec::new)
            .insert(0, child);
    }

    fn count_child(&mut self, parent: NodeId, child: NodeId) {
        let child_rank = self.node(child).rank;
        let child_is_interface_def =
            matches!(self.node(child).kind, NodeKind::Interface(_)) && !self.node(child).is_leaf();
        let (readonly, put_forwards, replaceable) = match &self.node(child).kind {
            NodeKind::Attribute(a) => (
                a.readonly,
                a.put_forwards.is_some(),
                self.node(child).attr.intersects(Attr::REPLACEABLE),
            ),
            _ => (false, false, false),
        };
        let child_kind = match &self.node(child).kind {
            NodeKind::Interface(_) => 'i',
            NodeKind::Module(_) => 'm',
            NodeKind::Const(_) => 'c',
            NodeKind::Op(_) => 'o',
            NodeKind::Attribute(_) => 'a',
            NodeKind::Param(_) => 'p',
            _ => ' ',
        };
        match &mut self.node_mut(parent).kind {
            NodeKind::Module(m) => {
                if child_rank == 1 {
                    match child_kind {
                        'i' if child_is_interface_def => m.interface_count += 1,
                        'c' => m.const_count += 1,
                        'm' => m.module_count += 1,
                        _ => {}
                    }
                }
            }
            NodeKind::Interface(i) => match child_kind {
                'c' => i.const_count += 1,
                'o' => i.method_count += 1,
                'a' => {
                    if readonly && !put_forwards && !replaceable {
                        i.method_count += 1;
                    } else {
                        i.method_count += 2;
                    }
                }
                _ => {}
            },
            NodeKind::Exception(e) => {
                e.member_count += 1;
            }
            NodeKind::Op(op) => {
                if child_kind == 'p' {
                    op.param_count += 1;
                }
            }
            _ => {}
        }
    }

    /// Look up a direct child by name. When a forward declaration and a
    /// full definition share the name, the definition wins; the forward
    /// declaration is still returned when it is all there is.
    pub fn search_child(&self, scope: NodeId, name: &str) -> Option<NodeId> {
        let mut fallback = None;
        for &child in self.children(scope) {
            let node = self.node(child);
            if node.name != name {
                continue;
            }
            if matches!(node.kind, NodeKind::Interface(_)) && node.is_leaf() {
                fallback.get_or_insert(child);
                continue;
            }
            return Some(child);
        }
        fallback
    }

    /// Fully qualified `::`-joined name (no leading separator; the
    /// anonymous root contributes nothing).
    pub fn qualified_name(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut cur = Some(id);
        while let Some(node_id) = cur {
            let node = self.node(node_id);
            if !node.name.is_empty() {
                segments.push(node.name.as_str());
            }
            cur = node.parent;
        }
        segments.reverse();
        segments.join("::")
    }

    /// Qualified name of the enclosing module chain (empty for
    /// top-level declarations).
    pub fn qualified_module_name(&self, id: NodeId) -> String {
        match self.node(id).parent {
            Some(parent) => self.qualified_name(parent),
            None => String::new(),
        }
    }

    /// Qualified name with module `[Prefix]` renames applied and the
    /// default prefix prepended; the name the generated artifacts use.
    pub fn prefixed_name(&self, id: NodeId, default_prefix: &str) -> String {
        let mut segments: Vec<String> = Vec::new();
        let mut cur = Some(id);
        let mut anchored = false;
        while let Some(node_id) = cur {
            let node = self.node(node_id);
            if let NodeKind::Module(m) = &node.kind {
                if !m.prefix.is_empty() {
                    if !node.name.is_empty() {
                        segments.push(node.name.clone());
                    }
                    if let Some(stripped) = m.prefix.strip_prefix("::") {
                        for seg in stripped.rsplit("::") {
                            segments.push(seg.to_string());
                        }
                        anchored = true;
                        break;
                    }
                    segments.push(m.prefix.clone());
                    cur = node.parent;
                    continue;
                }
            }
            if !node.name.is_empty() {
                segments.push(node.name.clone());
            }
            cur = node.parent;
        }
        if !anchored && !default_prefix.is_empty() && default_prefix != "::" {
            for seg in default_prefix.trim_start_matches("::").rsplit("::") {
                segments.push(seg.to_string());
            }
        }
        segments.reverse();
        segments.join("::")
    }

    /// True if `id` names the universal base object.
    pub fn is_base_object(&self, id: NodeId, base_object: &str) -> bool {
        self.qualified_name(id) == base_object
    }

    pub fn interface(&self, id: NodeId) -> Option<&InterfaceData> {
        match &self.node(id).kind {
            NodeKind::Interface(data) => Some(data),
            _ => None,
        }
    }

    pub fn interface_mut(&mut self, id: NodeId) -> Option<&mut InterfaceData> {
        match &mut self.node_mut(id).kind {
            NodeKind::Interface(data) => Some(data),
            _ => None,
        }
    }

    pub fn module(&self, id: NodeId) -> Option<&ModuleData> {
        match &self.node(id).kind {
            NodeKind::Module(data) => Some(data),
            _ => None,
        }
    }

    pub fn module_mut(&mut self, id: NodeId) -> Option<&mut ModuleData> {
        match &mut self.node_mut(id).kind {
            NodeKind::Module(data) => Some(data),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId) -> Option<&AttributeData> {
        match &self.node(id).kind {
            NodeKind::Attribute(data) => Some(data),
            _ => None,
        }
    }

    pub fn attribute_mut(&mut self, id: NodeId) -> Option<&mut AttributeData> {
        match &mut self.node_mut(id).kind {
            NodeKind::Attribute(data) => Some(data),
            _ => None,
        }
    }

    pub fn op(&self, id: NodeId) -> Option<&OpData> {
        match &self.node(id).kind {
            NodeKind::Op(data) => Some(data),
            _ => None,
        }
    }

    pub fn op_mut(&mut self, id: NodeId) -> Option<&mut OpData> {
        match &mut self.node_mut(id).kind {
            NodeKind::Op(data) => Some(data),
            _ => None,
        }
    }

    pub fn constant(&self, id: NodeId) -> Option<&ConstData> {
        match &self.node(id).kind {
            NodeKind::Const(data) => Some(data),
            _ => None,
        }
    }

    pub fn param(&self, id: NodeId) -> Option<&ParamData> {
        match &self.node(id).kind {
            NodeKind::Param(data) => Some(data),
            _ => None,
        }
    }

    pub fn member(&self, id: NodeId) -> Option<&MemberData> {
        match &self.node(id).kind {
            NodeKind::Member(data) => Some(data),
            _ => None,
        }
    }

    /// Effective parameter count for overload stage `i` of an operation.
    pub fn op_param_count(&self, id: NodeId, stage: usize) -> u32 {
        let op = self.op(id).expect("operation node");
        if op.method_count == 1 {
            op.param_count
        } else {
            op.param_counts[stage]
        }
    }

    /// True for a constructor pseudo-interface (its lexical parent is
    /// the interface it constructs).
    pub fn is_constructor_interface(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Interface(_))
            && self
                .node(id)
                .parent
                .is_some_and(|p| matches!(self.node(p).kind, NodeKind::Interface(_)))
    }
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_anonymous_module() {
        let arena = NodeArena::new();
        let root = arena.root();
        assert!(matches!(arena.node(root).kind, NodeKind::Module(_)));
        assert_eq!(arena.name(root), "");
        assert!(!arena.is_leaf(root));
    }

    #[test]
    fn test_add_child_counts_interfaces() {
        let mut arena = NodeArena::new();
        let root = arena.root();
        let iface = arena.alloc(
            Node::new("Foo", NodeKind::Interface(InterfaceData::default())).with_children(),
        );
        arena.add_child(root, iface);
        let forward = arena.alloc(Node::new("Bar", NodeKind::Interface(InterfaceData::default())));
        arena.add_child(root, forward);
        assert_eq!(arena.module(root).unwrap().interface_count, 1);
    }

    #[test]
    fn test_attribute_method_counting() {
        let mut arena = NodeArena::new();
        let root = arena.root();
        let iface = arena.alloc(
            Node::new("Foo", NodeKind::Interface(InterfaceData::default())).with_children(),
        );
        arena.add_child(root, iface);
        let ty = arena.alloc(Node::new("long", NodeKind::Type));
        let rw = arena.alloc(Node::new(
            "count",
            NodeKind::Attribute(AttributeData {
                spec: ty,
                readonly: false,
                get_raises: vec![],
                set_raises: vec![],
                put_forwards: None,
            }),
        ));
        arena.add_child(iface, rw);
        let ty2 = arena.alloc(Node::new("long", NodeKind::Type));
        let ro = arena.alloc(Node::new(
            "size",
            NodeKind::Attribute(AttributeData {
                spec: ty2,
                readonly: true,
                get_raises: vec![],
                set_raises: vec![],
                put_forwards: None,
            }),
        ));
        arena.add_child(iface, ro);
        assert_eq!(arena.interface(iface).unwrap().method_count, 3);
    }

    #[test]
    fn test_search_child_prefers_definition() {
        let mut arena = NodeArena::new();
        let root = arena.root();
        let forward = arena.alloc(Node::new("Foo", NodeKind::Interface(InterfaceData::default())));
        arena.add_child(root, forward);
        let def = arena.alloc(
            Node::new("Foo", NodeKind::Interface(InterfaceData::default())).with_children(),
        );
        arena.add_child(root, def);
        assert_eq!(arena.search_child(root, "Foo"), Some(def));
    }

    #[test]
    fn test_search_child_falls_back_to_forward_declaration() {
        let mut arena = NodeArena::new();
        let root = arena.root();
        let forward = arena.alloc(Node::new("Foo", NodeKind::Interface(InterfaceData::default())));
        arena.add_child(root, forward);
        assert_eq!(arena.search_child(root, "Foo"), Some(forward));
    }

    #[test]
    fn test_qualified_name() {
        let mut arena = NodeArena::new();
        let root = arena.root();
        let module = arena.alloc(Node::new("dom", NodeKind::Module(ModuleData::default())).with_children());
        arena.add_child(root, module);
        let iface = arena.alloc(
            Node::new("Node", NodeKind::Interface(InterfaceData::default())).with_children(),
        );
        arena.add_child(module, iface);
        assert_eq!(arena.qualified_name(iface), "dom::Node");
        assert_eq!(arena.qualified_module_name(iface), "dom");
    }

    #[test]
    fn test_prefixed_name_applies_module_prefix() {
        let mut arena = NodeArena::new();
        let root = arena.root();
        let module =
            arena.alloc(Node::new("dom", NodeKind::Module(ModuleData::default())).with_children());
        arena.add_child(root, module);
        arena.module_mut(module).unwrap().prefix = "::org::w3c".to_string();
        let iface = arena.alloc(
            Node::new("Node", NodeKind::Interface(InterfaceData::default())).with_children(),
        );
        arena.add_child(module, iface);
        assert_eq!(arena.prefixed_name(iface, "::"), "org::w3c::dom::Node");
    }
}
