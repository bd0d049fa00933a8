//! Extended-attribute processing
//!
//! One top-down walk converting the textual extended attributes the
//! front-end carried over into flag bits and structural rewrites. Must
//! run before the adjuster: constructor synthesis and supplemental name
//! mangling change what the adjuster counts.

use ridl_ast::doc::{self, ExtAttr, Param};
use ridl_ast::{Attr, InterfaceData, Node, NodeArena, NodeId, NodeKind, OpData};

use crate::diagnostic::Diagnostics;
use crate::error::{loc_of, SemaError};
use crate::SemaOptions;

/// Interface-level attributes that are tolerated but obsolete.
const DEPRECATED_ON_INTERFACE: [&str; 4] = [
    "NoIndexingOperations",
    "ImplementedOn",
    "Callable",
    "Stringifies",
];

/// Member-level attributes that are tolerated but obsolete. The index
/// and name specials among them were pre-encoded as structural bits by
/// the front-end, so they carry no information here.
const DEPRECATED_ON_MEMBER: [&str; 10] = [
    "Null",
    "Undefined",
    "IndexGetter",
    "IndexSetter",
    "IndexCreator",
    "IndexDeleter",
    "NameGetter",
    "NameSetter",
    "NameCreator",
    "NameDeleter",
];

pub fn process(
    arena: &mut NodeArena,
    opts: &SemaOptions,
    diags: &mut Diagnostics,
) -> Result<(), SemaError> {
    let root = arena.root();
    let mut processor = Processor {
        arena,
        opts,
        diags,
        supplemental_counter: 0,
    };
    processor.visit(root)
}

struct Processor<'a> {
    arena: &'a mut NodeArena,
    opts: &'a SemaOptions,
    diags: &'a mut Diagnostics,
    supplemental_counter: u32,
}

impl Processor<'_> {
    fn visit(&mut self, id: NodeId) -> Result<(), SemaError> {
        let ext = self.arena.node(id).ext_attrs.clone();
        match &self.arena.node(id).kind {
            NodeKind::Module(_) => self.process_module(id, &ext),
            NodeKind::Interface(_) => self.process_interface(id, &ext)?,
            NodeKind::Attribute(_) => self.process_attribute(id, &ext),
            NodeKind::Op(_) | NodeKind::Param(_) => self.process_member(id, &ext),
            _ => {}
        }
        let children = self.arena.children(id).to_vec();
        for child in children {
            self.visit(child)?;
        }
        Ok(())
    }

    fn deprecated(&mut self, id: NodeId, name: &str) {
        self.diags.warning(
            loc_of(self.arena, id),
            format!("deprecated extended attribute `{name}` ignored"),
        );
    }

    fn unknown(&mut self, id: NodeId, name: &str) {
        self.diags.warning(
            loc_of(self.arena, id),
            format!("unknown extended attribute `{name}` ignored"),
        );
    }

    fn process_module(&mut self, id: NodeId, ext: &[ExtAttr]) {
        for attr in ext {
            match attr.name.as_str() {
                "Prefix" => {
                    if let Some(value) = &attr.value {
                        if let Some(module) = self.arena.module_mut(id) {
                            module.prefix = value.clone();
                        }
                    }
                }
                "ExceptionConsts" => {}
                name => self.unknown(id, name),
            }
        }
    }

    fn process_interface(&mut self, id: NodeId, ext: &[ExtAttr]) -> Result<(), SemaError> {
        for attr in ext {
            match attr.name.as_str() {
                "Callback" => {
                    let bits = match attr.value.as_deref() {
                        None => Attr::CALLBACK,
                        Some("FunctionOnly") => Attr::CALLBACK_FUNCTION_ONLY,
                        Some("PropertyOnly") => Attr::CALLBACK_PROPERTY_ONLY,
                        Some(other) => {
                            self.unknown(id, &format!("Callback={other}"));
                            continue;
                        }
                    };
                    self.arena.node_mut(id).attr.insert(bits);
                }
                "NoInterfaceObject" => {
                    self.arena.node_mut(id).attr.insert(Attr::NO_INTERFACE_OBJECT);
                }
                "PrototypeRoot" => {
                    self.arena.node_mut(id).attr.insert(Attr::PROTOTYPE_ROOT);
                }
                "Supplemental" => {
                    self.arena.node_mut(id).attr.insert(Attr::SUPPLEMENTAL);
                }
                "Constructor" | "NamedConstructor" => {
                    self.add_constructor(id, &attr.params)?;
                }
                name if DEPRECATED_ON_INTERFACE.contains(&name) => self.deprecated(id, name),
                name => self.unknown(id, name),
            }
        }
        // Supplemental blocks share the base name of the interface they
        // extend; a disambiguator suffix keeps them distinct entries.
        let node = self.arena.node(id);
        if node.attr.intersects(Attr::SUPPLEMENTAL)
            && !node.attr.intersects(Attr::NO_INTERFACE_OBJECT)
        {
            self.supplemental_counter += 1;
            let mangled = format!("{}-{}", node.name, self.supplemental_counter);
            self.arena.node_mut(id).name = mangled;
        }
        Ok(())
    }

    /// First `[Constructor]` synthesizes the pseudo-interface; every
    /// occurrence appends one `createInstance` overload to it.
    fn add_constructor(&mut self, interface: NodeId, params: &[Param]) -> Result<(), SemaError> {
        let (file, rank, span) = {
            let node = self.arena.node(interface);
            (node.source, node.rank, node.span)
        };
        let constructor = match self.arena.interface(interface).and_then(|d| d.constructor) {
            Some(existing) => existing,
            None => {
                let mut node =
                    Node::new("Constructor", NodeKind::Interface(InterfaceData::default()))
                        .with_children();
                node.attr.insert(Attr::CONSTRUCTOR);
                node.source = file;
                node.rank = rank;
                node.span = span;
                let ctor = self.arena.alloc(node);
                self.arena.node_mut(ctor).parent = Some(interface);
                let mut base = Node::new(
                    format!("::{}", self.opts.base_object.trim_start_matches("::")),
                    NodeKind::ScopedName,
                );
                base.source = file;
                base.rank = rank;
                let base = self.arena.alloc(base);
                self.arena.node_mut(base).parent = Some(ctor);
                if let Some(data) = self.arena.interface_mut(ctor) {
                    data.extends = vec![base];
                    data.constructor = None;
                }
                if let Some(data) = self.arena.interface_mut(interface) {
                    data.constructor = Some(ctor);
                }
                ctor
            }
        };

        let mut ret = Node::new(
            self.arena.node(interface).name.clone(),
            NodeKind::ScopedName,
        );
        ret.source = file;
        ret.rank = rank;
        let ret = self.arena.alloc(ret);
        let mut op = Node::new(
            "createInstance",
            NodeKind::Op(OpData {
                spec: ret,
                raises: Vec::new(),
                param_count: 0,
                method_count: 1,
                param_counts: Vec::new(),
            }),
        )
        .with_children();
        op.source = file;
        op.rank = rank;
        op.span = span;
        let op = self.arena.alloc(op);
        self.arena.add_child(constructor, op);
        self.arena.node_mut(ret).parent = Some(op);
        for param in params {
            doc::lower_param(self.arena, op, param, file, rank);
        }
        Ok(())
    }

    fn process_attribute(&mut self, id: NodeId, ext: &[ExtAttr]) {
        for attr in ext {
            match attr.name.as_str() {
                "Replaceable" => {
                    self.arena.node_mut(id).attr.insert(Attr::REPLACEABLE);
                }
                "PutForwards" => match &attr.value {
                    Some(target) => {
                        if let Some(data) = self.arena.attribute_mut(id) {
                            data.put_forwards = Some(target.clone());
                        }
                    }
                    None => self.unknown(id, "PutForwards"),
                },
                "TreatNullAs" | "TreatUndefinedAs" => self.treat_as(id, attr),
                name if DEPRECATED_ON_MEMBER.contains(&name) => self.deprecated(id, name),
                name => self.unknown(id, name),
            }
        }
    }

    fn process_member(&mut self, id: NodeId, ext: &[ExtAttr]) {
        for attr in ext {
            match attr.name.as_str() {
                "TreatNullAs" | "TreatUndefinedAs" => self.treat_as(id, attr),
                "AllowAny" => {
                    self.arena.node_mut(id).attr.insert(Attr::ALLOW_ANY);
                }
                "Optional" => {
                    self.arena.node_mut(id).attr.insert(Attr::OPTIONAL);
                }
                name if DEPRECATED_ON_MEMBER.contains(&name) => self.deprecated(id, name),
                name => self.unknown(id, name),
            }
        }
    }

    fn treat_as(&mut self, id: NodeId, attr: &ExtAttr) {
        let bits = match (attr.name.as_str(), attr.value.as_deref()) {
            ("TreatNullAs", Some("EmptyString")) => Attr::NULL_IS_EMPTY,
            ("TreatUndefinedAs", Some("EmptyString")) => Attr::UNDEFINED_IS_EMPTY,
            ("TreatUndefinedAs", Some("Null")) => Attr::UNDEFINED_IS_NULL,
            _ => {
                self.unknown(id, &attr.name);
                return;
            }
        };
        self.arena.node_mut(id).attr.insert(bits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridl_ast::{Decl, Document, Span, TypeExpr};

    fn interface_with(ext_attrs: Vec<ExtAttr>) -> ridl_ast::NodeArena {
        let doc = Document {
            source: "test.idl".to_string(),
            text: None,
            definitions: vec![Decl::Interface {
                name: "Widget".to_string(),
                forward: false,
                extends: vec![],
                ext_attrs,
                members: vec![],
                span: Span::default(),
                doc: String::new(),
            }],
        };
        let mut arena = ridl_ast::NodeArena::new();
        doc.lower(&mut arena, 0, 1).unwrap();
        arena
    }

    fn ext(name: &str) -> ExtAttr {
        ExtAttr {
            name: name.to_string(),
            value: None,
            params: vec![],
        }
    }

    #[test]
    fn test_constructor_synthesis() {
        let mut arena = interface_with(vec![
            ext("Constructor"),
            ExtAttr {
                name: "Constructor".to_string(),
                value: None,
                params: vec![Param {
                    name: "size".to_string(),
                    ty: TypeExpr::Builtin {
                        name: "long".to_string(),
                        nullable: false,
                    },
                    optional: false,
                    variadic: false,
                    ext_attrs: vec![],
                }],
            },
        ]);
        let mut diags = Diagnostics::new();
        process(&mut arena, &SemaOptions::default(), &mut diags).unwrap();

        let widget = arena.search_child(arena.root(), "Widget").unwrap();
        let ctor = arena.interface(widget).unwrap().constructor.unwrap();
        assert_eq!(arena.name(ctor), "Constructor");
        assert!(arena.node(ctor).attr.intersects(Attr::CONSTRUCTOR));
        let overloads = arena.children(ctor);
        assert_eq!(overloads.len(), 2);
        assert!(overloads
            .iter()
            .all(|&op| arena.name(op) == "createInstance"));
        assert_eq!(arena.op(overloads[0]).unwrap().param_count, 0);
        assert_eq!(arena.op(overloads[1]).unwrap().param_count, 1);
    }

    #[test]
    fn test_supplemental_name_mangling() {
        let mut arena = interface_with(vec![ext("Supplemental")]);
        let mut diags = Diagnostics::new();
        process(&mut arena, &SemaOptions::default(), &mut diags).unwrap();
        let mangled = arena.search_child(arena.root(), "Widget-1").unwrap();
        assert!(arena.node(mangled).attr.intersects(Attr::SUPPLEMENTAL));
    }

    #[test]
    fn test_deprecated_attribute_warns_and_continues() {
        let mut arena = interface_with(vec![ext("Callable"), ext("NoInterfaceObject")]);
        let mut diags = Diagnostics::new();
        process(&mut arena, &SemaOptions::default(), &mut diags).unwrap();
        assert_eq!(diags.warnings().len(), 1);
        let widget = arena.search_child(arena.root(), "Widget").unwrap();
        assert!(arena
            .node(widget)
            .attr
            .intersects(Attr::NO_INTERFACE_OBJECT));
    }
}
