//! Forward-declaration analysis
//!
//! For a compilation unit, every interface name used in a signature
//! must be preceded by a full definition, a forward declaration, or an
//! import of the defining header. [`collect_for_interface`] computes
//! the per-output-file partition the emitters consume; [`splice`]
//! applies the tree rewrite: a referenced-but-undeclared interface
//! gains a leaf forward declaration at the front of its lexical
//! parent, and a typedef used before its definition is duplicated
//! instead, since a typedef has no legal forward-declared form.

use ridl_ast::{FileId, MemberData, Node, NodeArena, NodeId, NodeKind};
use ridl_sema::error::{loc_of, SemaError};
use ridl_sema::{adjust, resolve, SemaOptions};

/// References of one output file, partitioned by how they must be
/// satisfied.
#[derive(Debug, Default)]
pub struct ForwardInfo {
    /// Interfaces that only ever appear as forward declarations;
    /// re-declared locally.
    pub forwards: Vec<NodeId>,
    /// Typedef members that must be visible before first use.
    pub typedefs: Vec<NodeId>,
    /// Fully defined interfaces referenced from signatures; satisfied
    /// by importing their own headers. Qualified names, sorted.
    pub imports: Vec<String>,
    /// The defined interfaces behind `imports`, in first-use order.
    pub referenced: Vec<NodeId>,
}

struct Collector<'a> {
    arena: &'a NodeArena,
    opts: &'a SemaOptions,
    target: NodeId,
    seen: Vec<NodeId>,
    info: ForwardInfo,
}

/// Compute the declaration preamble for the output file of one
/// interface: which referenced interfaces need an import and which
/// need a local forward declaration.
pub fn collect_for_interface(
    arena: &NodeArena,
    opts: &SemaOptions,
    interface: NodeId,
) -> Result<ForwardInfo, SemaError> {
    let mut collector = Collector {
        arena,
        opts,
        target: interface,
        seen: vec![interface],
        info: ForwardInfo::default(),
    };
    collector.interface(interface)?;
    collector.info.imports.sort();
    collector.info.imports.dedup();
    Ok(collector.info)
}

impl Collector<'_> {
    fn interface(&mut self, id: NodeId) -> Result<(), SemaError> {
        let data = self.arena.interface(id).expect("interface node");
        let outer = self.arena.node(id).parent.unwrap_or_else(|| self.arena.root());
        for &base_ref in &data.extends {
            self.reference(outer, base_ref)?;
        }
        for owner in adjust::collect_supplementals(self.arena, id) {
            for &member in self.arena.children(owner) {
                self.member(owner, member)?;
            }
        }
        if let Some(ctor) = data.constructor {
            for &member in self.arena.children(ctor) {
                self.member(ctor, member)?;
            }
        }
        Ok(())
    }

    fn member(&mut self, owner: NodeId, member: NodeId) -> Result<(), SemaError> {
        match &self.arena.node(member).kind {
            NodeKind::Attribute(data) => {
                self.reference(owner, data.spec)?;
                for &raises in data.get_raises.iter().chain(&data.set_raises) {
                    self.reference(owner, raises)?;
                }
            }
            NodeKind::Op(data) => {
                self.reference(owner, data.spec)?;
                for &param in self.arena.children(member) {
                    if let Some(p) = self.arena.param(param) {
                        self.reference(owner, p.spec)?;
                    }
                }
                for &raises in &data.raises {
                    self.reference(owner, raises)?;
                }
            }
            NodeKind::Const(data) => {
                self.reference(owner, data.spec)?;
            }
            NodeKind::Member(MemberData {
                spec: Some(spec),
                is_typedef: true,
            }) => {
                self.reference(owner, *spec)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Walk one type reference, chasing container elements and typedef
    /// targets.
    fn reference(&mut self, scope: NodeId, id: NodeId) -> Result<(), SemaError> {
        match &self.arena.node(id).kind {
            NodeKind::Sequence(data) => return self.reference(scope, data.spec),
            NodeKind::Array(data) => return self.reference(scope, data.spec),
            NodeKind::Type | NodeKind::NativeType | NodeKind::Literal => return Ok(()),
            _ => {}
        }
        if let Some(typedef) = resolve::as_typedef(self.arena, scope, id) {
            if !self.seen.contains(&typedef) {
                self.seen.push(typedef);
                self.info.typedefs.push(typedef);
            }
            let spec = self
                .arena
                .member(typedef)
                .and_then(|m| m.spec)
                .ok_or_else(|| SemaError::Unresolved {
                    name: self.arena.name(id).to_string(),
                    loc: loc_of(self.arena, id),
                })?;
            let inner = self
                .arena
                .node(typedef)
                .parent
                .unwrap_or_else(|| self.arena.root());
            return self.reference(inner, spec);
        }
        if !matches!(self.arena.node(id).kind, NodeKind::ScopedName) {
            return Ok(());
        }
        let resolved =
            resolve::search_scoped(self.arena, scope, id).ok_or_else(|| SemaError::Unresolved {
                name: self.arena.name(id).to_string(),
                loc: loc_of(self.arena, id),
            })?;
        match &self.arena.node(resolved).kind {
            NodeKind::Interface(_) | NodeKind::Exception(_) => {
                if resolved == self.target
                    || self.seen.contains(&resolved)
                    || self.arena.is_base_object(resolved, &self.opts.base_object)
                {
                    return Ok(());
                }
                self.seen.push(resolved);
                if self.arena.is_leaf(resolved) {
                    self.info.forwards.push(resolved);
                } else {
                    self.info
                        .imports
                        .push(self.arena.prefixed_name(resolved, &self.opts.default_prefix));
                    self.info.referenced.push(resolved);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Apply the tree rewrite for one compilation unit: walk its
/// interfaces and typedefs in file order and front-splice whatever a
/// later reference needs declared earlier.
pub fn splice(arena: &mut NodeArena, opts: &SemaOptions, source: FileId) -> Result<(), SemaError> {
    let mut declared: Vec<NodeId> = Vec::new();
    let mut pending: Vec<NodeId> = Vec::new();
    walk_unit(arena, opts, arena.root(), source, &mut declared, &mut pending)?;
    for &node in pending.iter().rev() {
        let parent = arena.node(node).parent.unwrap_or_else(|| arena.root());
        let is_typedef = matches!(
            &arena.node(node).kind,
            NodeKind::Member(member) if member.is_typedef
        );
        if is_typedef {
            let copy = Node {
                name: arena.node(node).name.clone(),
                attr: arena.node(node).attr,
                parent: None,
                children: None,
                rank: 1,
                source,
                span: arena.node(node).span,
                doc: String::new(),
                ext_attrs: Vec::new(),
                kind: arena.node(node).kind.clone(),
            };
            let copy = arena.alloc(copy);
            arena.add_child_front(parent, copy);
        } else {
            if arena
                .node(node)
                .attr
                .intersects(ridl_ast::Attr::SUPPLEMENTAL)
            {
                continue;
            }
            let mut forward = Node::new(
                arena.node(node).name.clone(),
                NodeKind::Interface(Default::default()),
            );
            forward.rank = 1;
            forward.source = source;
            let forward = arena.alloc(forward);
            arena.add_child_front(parent, forward);
        }
    }
    Ok(())
}

fn walk_unit(
    arena: &NodeArena,
    opts: &SemaOptions,
    scope: NodeId,
    source: FileId,
    declared: &mut Vec<NodeId>,
    pending: &mut Vec<NodeId>,
) -> Result<(), SemaError> {
    for &child in arena.children(scope) {
        match &arena.node(child).kind {
            NodeKind::Module(_) => {
                walk_unit(arena, opts, child, source, declared, pending)?;
            }
            NodeKind::Interface(_) => {
                if arena.node(child).source != source {
                    continue;
                }
                declared.push(child);
                if arena.is_leaf(child) {
                    continue;
                }
                let info = collect_for_interface(arena, opts, child)?;
                for needed in info
                    .forwards
                    .into_iter()
                    .chain(info.typedefs)
                    .chain(info.referenced)
                {
                    if !declared.contains(&needed) && !pending.contains(&needed) {
                        pending.push(needed);
                        declared.push(needed);
                    }
                }
            }
            NodeKind::Member(member) if member.is_typedef => {
                if arena.node(child).source == source {
                    declared.push(child);
                }
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridl_ast::{Decl, Document, Span, TypeExpr};
    use ridl_sema::Diagnostics;

    fn compile(definitions: Vec<Decl>) -> NodeArena {
        let doc = Document {
            source: "test.idl".to_string(),
            text: None,
            definitions,
        };
        let mut arena = NodeArena::new();
        doc.lower(&mut arena, 0, 1).unwrap();
        let mut diags = Diagnostics::new();
        ridl_sema::run_passes(&mut arena, &SemaOptions::default(), &mut diags).unwrap();
        arena
    }

    fn attribute_of(name: &str, ty: &str) -> Decl {
        Decl::Attribute {
            name: name.to_string(),
            ty: TypeExpr::Named {
                name: ty.to_string(),
                nullable: false,
            },
            readonly: true,
            stringifier: false,
            get_raises: vec![],
            set_raises: vec![],
            ext_attrs: vec![],
            span: Span::default(),
            doc: String::new(),
        }
    }

    #[test]
    fn test_defined_reference_becomes_import() {
        let arena = compile(vec![
            Decl::Interface {
                name: "Node".to_string(),
                forward: false,
                extends: vec![],
                ext_attrs: vec![],
                members: vec![],
                span: Span::default(),
                doc: String::new(),
            },
            Decl::Interface {
                name: "Document".to_string(),
                forward: false,
                extends: vec![],
                ext_attrs: vec![],
                members: vec![attribute_of("root", "Node")],
                span: Span::default(),
                doc: String::new(),
            },
        ]);
        let document = arena.search_child(arena.root(), "Document").unwrap();
        let info =
            collect_for_interface(&arena, &SemaOptions::default(), document).unwrap();
        assert_eq!(info.imports, vec!["Node".to_string()]);
        assert!(info.forwards.is_empty());
    }

    #[test]
    fn test_forward_only_reference_is_forward_declared() {
        let arena = compile(vec![
            Decl::Interface {
                name: "External".to_string(),
                forward: true,
                extends: vec![],
                ext_attrs: vec![],
                members: vec![],
                span: Span::default(),
                doc: String::new(),
            },
            Decl::Interface {
                name: "Holder".to_string(),
                forward: false,
                extends: vec![],
                ext_attrs: vec![],
                members: vec![attribute_of("external", "External")],
                span: Span::default(),
                doc: String::new(),
            },
        ]);
        let holder = arena.search_child(arena.root(), "Holder").unwrap();
        let info = collect_for_interface(&arena, &SemaOptions::default(), holder).unwrap();
        assert_eq!(info.forwards.len(), 1);
        assert_eq!(arena.name(info.forwards[0]), "External");
        assert!(info.imports.is_empty());
    }

    #[test]
    fn test_typedef_reference_is_duplicated_not_forwarded() {
        let mut arena = compile(vec![
            Decl::Interface {
                name: "User".to_string(),
                forward: false,
                extends: vec![],
                ext_attrs: vec![],
                members: vec![Decl::Attribute {
                    name: "value".to_string(),
                    ty: TypeExpr::Named {
                        name: "Alias".to_string(),
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
                span: Span::default(),
                doc: String::new(),
            },
            Decl::Typedef {
                name: "Alias".to_string(),
                ty: TypeExpr::Builtin {
                    name: "long".to_string(),
                    nullable: false,
                },
                span: Span::default(),
                doc: String::new(),
            },
        ]);
        let before = arena.children(arena.root()).len();
        splice(&mut arena, &SemaOptions::default(), 0).unwrap();
        let children = arena.children(arena.root());
        assert_eq!(children.len(), before + 1);
        // The duplicate is spliced at the front and stays a typedef.
        let first = children[0];
        assert_eq!(arena.name(first), "Alias");
        assert!(arena.member(first).is_some_and(|m| m.is_typedef));
    }

    #[test]
    fn test_every_signature_name_is_satisfied() {
        // Forward-declaration sufficiency: every referenced interface
        // is either imported or forward-declared.
        let arena = compile(vec![
            Decl::Interface {
                name: "External".to_string(),
                forward: true,
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
                members: vec![],
                span: Span::default(),
                doc: String::new(),
            },
            Decl::Interface {
                name: "Mixed".to_string(),
                forward: false,
                extends: vec![],
                ext_attrs: vec![],
                members: vec![
                    attribute_of("a", "Node"),
                    attribute_of("b", "External"),
                    attribute_of("c", "Node"),
                ],
                span: Span::default(),
                doc: String::new(),
            },
        ]);
        let mixed = arena.search_child(arena.root(), "Mixed").unwrap();
        let info = collect_for_interface(&arena, &SemaOptions::default(), mixed).unwrap();
        let satisfied: Vec<String> = info
            .imports
            .iter()
            .cloned()
            .chain(info.forwards.iter().map(|&f| arena.name(f).to_string()))
            .collect();
        assert!(satisfied.contains(&"Node".to_string()));
        assert!(satisfied.contains(&"External".to_string()));
        assert_eq!(info.imports.len(), 1);
    }
}
