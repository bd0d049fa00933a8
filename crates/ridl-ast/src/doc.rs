//! Serialized AST document format
//!
//! The parser front-end is an external collaborator; it hands the
//! compiler one `Document` per IDL source file. The document is a plain
//! serde tree, so any front-end (or a test) can produce it, and
//! [`Document::lower`] turns it into arena nodes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::node::{
    ArrayData, Attr, AttributeData, ConstData, ExceptionData, ImplementsData, InterfaceData,
    MemberData, ModuleData, Node, NodeArena, NodeId, NodeKind, OpData, ParamData, SequenceData,
};
use crate::{FileId, Span};

/// One parsed IDL source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Path of the IDL file this document was parsed from.
    pub source: String,
    /// Original source text, when the front-end embeds it for
    /// diagnostics rendering.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub definitions: Vec<Decl>,
}

/// A declaration as serialized by the front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decl {
    Module {
        name: String,
        #[serde(default)]
        ext_attrs: Vec<ExtAttr>,
        #[serde(default)]
        body: Vec<Decl>,
        #[serde(default)]
        span: Span,
        #[serde(default)]
        doc: String,
    },
    Interface {
        name: String,
        /// Forward declaration: no member list is ever allocated.
        #[serde(default)]
        forward: bool,
        #[serde(default)]
        extends: Vec<String>,
        #[serde(default)]
        ext_attrs: Vec<ExtAttr>,
        #[serde(default)]
        members: Vec<Decl>,
        #[serde(default)]
        span: Span,
        #[serde(default)]
        doc: String,
    },
    Exception {
        name: String,
        #[serde(default)]
        members: Vec<Decl>,
        #[serde(default)]
        span: Span,
        #[serde(default)]
        doc: String,
    },
    Implements {
        target: String,
        mixin: String,
        #[serde(default)]
        span: Span,
    },
    Typedef {
        name: String,
        ty: TypeExpr,
        #[serde(default)]
        span: Span,
        #[serde(default)]
        doc: String,
    },
    /// Exception field.
    Field {
        name: String,
        ty: TypeExpr,
        #[serde(default)]
        span: Span,
        #[serde(default)]
        doc: String,
    },
    Attribute {
        name: String,
        ty: TypeExpr,
        #[serde(default)]
        readonly: bool,
        #[serde(default)]
        stringifier: bool,
        #[serde(default)]
        get_raises: Vec<String>,
        #[serde(default)]
        set_raises: Vec<String>,
        #[serde(default)]
        ext_attrs: Vec<ExtAttr>,
        #[serde(default)]
        span: Span,
        #[serde(default)]
        doc: String,
    },
    Const {
        name: String,
        ty: TypeExpr,
        value: Expr,
        #[serde(default)]
        span: Span,
        #[serde(default)]
        doc: String,
    },
    Operation {
        /// Empty for the unnamed indexed-property operation.
        #[serde(default)]
        name: String,
        return_ty: TypeExpr,
        #[serde(default)]
        params: Vec<Param>,
        #[serde(default)]
        raises: Vec<String>,
        #[serde(default)]
        specials: Vec<Special>,
        #[serde(default)]
        ext_attrs: Vec<ExtAttr>,
        #[serde(default)]
        span: Span,
        #[serde(default)]
        doc: String,
    },
}

/// Special-operation qualifiers, pre-encoded by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Special {
    IndexGetter,
    IndexSetter,
    IndexCreator,
    IndexDeleter,
    Caller,
    Stringifier,
    Omittable,
    Static,
}

impl Special {
    fn attr(self) -> Attr {
        match self {
            Special::IndexGetter => Attr::INDEX_GETTER,
            Special::IndexSetter => Attr::INDEX_SETTER,
            Special::IndexCreator => Attr::INDEX_CREATOR,
            Special::IndexDeleter => Attr::INDEX_DELETER,
            Special::Caller => Attr::CALLER,
            Special::Stringifier => Attr::STRINGIFIER,
            Special::Omittable => Attr::OMITTABLE,
            Special::Static => Attr::STATIC,
        }
    }
}

/// A type expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeExpr {
    /// Builtin primitive named by its IDL spelling ("long",
    /// "unsigned short", "string", "any", ...).
    Builtin {
        name: String,
        #[serde(default)]
        nullable: bool,
    },
    /// Scoped-name reference to an interface, exception, or typedef.
    Named {
        name: String,
        #[serde(default)]
        nullable: bool,
    },
    Sequence {
        element: Box<TypeExpr>,
        #[serde(default)]
        max: Option<Expr>,
        #[serde(default)]
        nullable: bool,
    },
    Array {
        element: Box<TypeExpr>,
        #[serde(default)]
        max: Option<Expr>,
    },
    Native {
        name: String,
    },
}

/// A constant expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    Literal {
        text: String,
    },
    Ref {
        name: String,
    },
    Unary {
        op: String,
        expr: Box<Expr>,
    },
    Binary {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

/// An operation or constructor parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeExpr,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub variadic: bool,
    #[serde(default)]
    pub ext_attrs: Vec<ExtAttr>,
}

/// A textual extended attribute: `[Name]`, `[Name=Value]`, or
/// `[Name(params)]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtAttr {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub params: Vec<Param>,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LowerError {
    #[error("constants are only valid inside an interface, exception, or module")]
    MisplacedConst,
    #[error("`{0}` is not a member declaration")]
    BadMember(String),
}

impl Document {
    /// Lower every definition into `arena` under the root scope.
    ///
    /// `rank` is the include depth of this document: 1 for the unit
    /// being compiled, deeper for includes.
    pub fn lower(&self, arena: &mut NodeArena, file: FileId, rank: u32) -> Result<(), LowerError> {
        let root = arena.root();
        for decl in &self.definitions {
            lower_decl(arena, root, decl, file, rank)?;
        }
        Ok(())
    }
}

fn base_node(
    name: &str,
    kind: NodeKind,
    file: FileId,
    rank: u32,
    span: Span,
    doc: &str,
    ext_attrs: &[ExtAttr],
) -> Node {
    let mut node = Node::new(name, kind);
    node.source = file;
    node.rank = rank;
    node.span = span;
    node.doc = doc.to_string();
    node.ext_attrs = ext_attrs.to_vec();
    node
}

fn lower_decl(
    arena: &mut NodeArena,
    parent: NodeId,
    decl: &Decl,
    file: FileId,
    rank: u32,
) -> Result<NodeId, LowerError> {
    match decl {
        Decl::Module {
            name,
            ext_attrs,
            body,
            span,
            doc,
        } => {
            // Namespaces are open; a module picks up new members from
            // every unit, so it always counts as rank 1.
            let id = match arena.search_child(parent, name) {
                Some(existing) if arena.module(existing).is_some() => existing,
                _ => {
                    let node = base_node(
                        name,
                        NodeKind::Module(ModuleData::default()),
                        file,
                        1,
                        *span,
                        doc,
                        ext_attrs,
                    )
                    .with_children();
                    let id = arena.alloc(node);
                    arena.add_child(parent, id);
                    id
                }
            };
            for member in body {
                lower_decl(arena, id, member, file, rank)?;
            }
            Ok(id)
        }
        Decl::Interface {
            name,
            forward,
            extends,
            ext_attrs,
            members,
            span,
            doc,
        } => {
            let mut node = base_node(
                name,
                NodeKind::Interface(InterfaceData::default()),
                file,
                rank,
                *span,
                doc,
                ext_attrs,
            );
            if !forward {
                node = node.with_children();
            }
            let id = arena.alloc(node);
            arena.add_child(parent, id);
            let extend_ids: Vec<NodeId> = extends
                .iter()
                .map(|base| {
                    let scoped = arena.alloc(base_node(
                        base,
                        NodeKind::ScopedName,
                        file,
                        rank,
                        *span,
                        "",
                        &[],
                    ));
                    arena.node_mut(scoped).parent = Some(id);
                    scoped
                })
                .collect();
            if let Some(data) = arena.interface_mut(id) {
                data.extends = extend_ids;
            }
            for member in members {
                lower_decl(arena, id, member, file, rank)?;
            }
            Ok(id)
        }
        Decl::Exception {
            name,
            members,
            span,
            doc,
        } => {
            let node = base_node(
                name,
                NodeKind::Exception(ExceptionData::default()),
                file,
                rank,
                *span,
                doc,
                &[],
            )
            .with_children();
            let id = arena.alloc(node);
            arena.add_child(parent, id);
            for member in members {
                lower_decl(arena, id, member, file, rank)?;
            }
            Ok(id)
        }
        Decl::Implements { target, mixin, span } => {
            let first = arena.alloc(base_node(target, NodeKind::ScopedName, file, rank, *span, "", &[]));
            let second = arena.alloc(base_node(mixin, NodeKind::ScopedName, file, rank, *span, "", &[]));
            let id = arena.alloc(base_node(
                "",
                NodeKind::Implements(ImplementsData { first, second }),
                file,
                rank,
                *span,
                "",
                &[],
            ));
            arena.add_child(parent, id);
            arena.node_mut(first).parent = Some(id);
            arena.node_mut(second).parent = Some(id);
            Ok(id)
        }
        Decl::Typedef { name, ty, span, doc } => {
            let spec = lower_type(arena, ty, file, rank);
            let id = arena.alloc(base_node(
                name,
                NodeKind::Member(MemberData {
                    spec: Some(spec),
                    is_typedef: true,
                }),
                file,
                rank,
                *span,
                doc,
                &[],
            ));
            arena.add_child(parent, id);
            arena.node_mut(spec).parent = Some(id);
            Ok(id)
        }
        Decl::Field { name, ty, span, doc } => {
            let spec = lower_type(arena, ty, file, rank);
            let id = arena.alloc(base_node(
                name,
                NodeKind::Member(MemberData {
                    spec: Some(spec),
                    is_typedef: false,
                }),
                file,
                rank,
                *span,
                doc,
                &[],
            ));
            arena.add_child(parent, id);
            arena.node_mut(spec).parent = Some(id);
            Ok(id)
        }
        Decl::Attribute {
            name,
            ty,
            readonly,
            stringifier,
            get_raises,
            set_raises,
            ext_attrs,
            span,
            doc,
        } => {
            let spec = lower_type(arena, ty, file, rank);
            let get_raises = lower_scoped_names(arena, get_raises, file, rank, *span);
            let set_raises = lower_scoped_names(arena, set_raises, file, rank, *span);
            let mut node = base_node(
                name,
                NodeKind::Attribute(AttributeData {
                    spec,
                    readonly: *readonly,
                    get_raises,
                    set_raises,
                    put_forwards: None,
                }),
                file,
                rank,
                *span,
                doc,
                ext_attrs,
            );
            if *stringifier {
                node.attr.insert(Attr::STRINGIFIER);
            }
            let id = arena.alloc(node);
            arena.add_child(parent, id);
            arena.node_mut(spec).parent = Some(id);
            Ok(id)
        }
        Decl::Const {
            name,
            ty,
            value,
            span,
            doc,
        } => {
            if !matches!(
                arena.node(parent).kind,
                NodeKind::Interface(_) | NodeKind::Exception(_) | NodeKind::Module(_)
            ) {
                return Err(LowerError::MisplacedConst);
            }
            let spec = lower_type(arena, ty, file, rank);
            let expr = lower_expr(arena, value, file, rank);
            let id = arena.alloc(base_node(
                name,
                NodeKind::Const(ConstData { spec, expr }),
                file,
                rank,
                *span,
                doc,
                &[],
            ));
            arena.add_child(parent, id);
            arena.node_mut(spec).parent = Some(id);
            arena.node_mut(expr).parent = Some(id);
            Ok(id)
        }
        Decl::Operation {
            name,
            return_ty,
            params,
            raises,
            specials,
            ext_attrs,
            span,
            doc,
        } => {
            let spec = lower_type(arena, return_ty, file, rank);
            let raises = lower_scoped_names(arena, raises, file, rank, *span);
            let mut node = base_node(
                name,
                NodeKind::Op(OpData {
                    spec,
                    raises,
                    param_count: 0,
                    method_count: 1,
                    param_counts: Vec::new(),
                }),
                file,
                rank,
                *span,
                doc,
                ext_attrs,
            )
            .with_children();
            if name.is_empty() {
                node.attr.insert(Attr::UNNAMED_PROPERTY);
            }
            for special in specials {
                node.attr.insert(special.attr());
            }
            let id = arena.alloc(node);
            arena.add_child(parent, id);
            arena.node_mut(spec).parent = Some(id);
            for param in params {
                lower_param(arena, id, param, file, rank);
            }
            Ok(id)
        }
    }
}

/// Lower one parameter under an operation node.
pub fn lower_param(
    arena: &mut NodeArena,
    op: NodeId,
    param: &Param,
    file: FileId,
    rank: u32,
) -> NodeId {
    let spec = lower_type(arena, &param.ty, file, rank);
    let mut node = base_node(
        &param.name,
        NodeKind::Param(ParamData { spec }),
        file,
        rank,
        Span::default(),
        "",
        &param.ext_attrs,
    );
    if param.optional {
        node.attr.insert(Attr::OPTIONAL);
    }
    if param.variadic {
        node.attr.insert(Attr::VARIADIC);
    }
    let id = arena.alloc(node);
    arena.add_child(op, id);
    arena.node_mut(spec).parent = Some(id);
    id
}

/// Lower a type expression to a (parentless) type node.
pub fn lower_type(arena: &mut NodeArena, ty: &TypeExpr, file: FileId, rank: u32) -> NodeId {
    match ty {
        TypeExpr::Builtin { name, nullable } => {
            let mut node = base_node(name, NodeKind::Type, file, rank, Span::default(), "", &[]);
            if *nullable {
                node.attr.insert(Attr::NULLABLE);
            }
            arena.alloc(node)
        }
        TypeExpr::Named { name, nullable } => {
            let mut node =
                base_node(name, NodeKind::ScopedName, file, rank, Span::default(), "", &[]);
            if *nullable {
                node.attr.insert(Attr::NULLABLE);
            }
            arena.alloc(node)
        }
        TypeExpr::Sequence {
            element,
            max,
            nullable,
        } => {
            let spec = lower_type(arena, element, file, rank);
            let max = max.as_ref().map(|expr| lower_expr(arena, expr, file, rank));
            let mut node = base_node(
                "sequence",
                NodeKind::Sequence(SequenceData { spec, max }),
                file,
                rank,
                Span::default(),
                "",
                &[],
            );
            if *nullable {
                node.attr.insert(Attr::NULLABLE);
            }
            let id = arena.alloc(node);
            arena.node_mut(spec).parent = Some(id);
            id
        }
        TypeExpr::Array { element, max } => {
            let spec = lower_type(arena, element, file, rank);
            let max = max.as_ref().map(|expr| lower_expr(arena, expr, file, rank));
            let id = arena.alloc(base_node(
                "array",
                NodeKind::Array(ArrayData { spec, max }),
                file,
                rank,
                Span::default(),
                "",
                &[],
            ));
            arena.node_mut(spec).parent = Some(id);
            id
        }
        TypeExpr::Native { name } => {
            arena.alloc(base_node(name, NodeKind::NativeType, file, rank, Span::default(), "", &[]))
        }
    }
}

/// Lower a constant expression to a (parentless) expression node.
pub fn lower_expr(arena: &mut NodeArena, expr: &Expr, file: FileId, rank: u32) -> NodeId {
    match expr {
        Expr::Literal { text } => {
            arena.alloc(base_node(text, NodeKind::Literal, file, rank, Span::default(), "", &[]))
        }
        Expr::Ref { name } => {
            arena.alloc(base_node(name, NodeKind::ScopedName, file, rank, Span::default(), "", &[]))
        }
        Expr::Unary { op, expr } => {
            let operand = lower_expr(arena, expr, file, rank);
            let id = arena.alloc(
                base_node(op, NodeKind::UnaryExpr, file, rank, Span::default(), "", &[])
                    .with_children(),
            );
            arena.add_child(id, operand);
            id
        }
        Expr::Binary { op, left, right } => {
            let left = lower_expr(arena, left, file, rank);
            let right = lower_expr(arena, right, file, rank);
            let id = arena.alloc(
                base_node(op, NodeKind::BinaryExpr, file, rank, Span::default(), "", &[])
                    .with_children(),
            );
            arena.add_child(id, left);
            arena.add_child(id, right);
            id
        }
    }
}

fn lower_scoped_names(
    arena: &mut NodeArena,
    names: &[String],
    file: FileId,
    rank: u32,
    span: Span,
) -> Vec<NodeId> {
    names
        .iter()
        .map(|name| arena.alloc(base_node(name, NodeKind::ScopedName, file, rank, span, "", &[])))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin(name: &str) -> TypeExpr {
        TypeExpr::Builtin {
            name: name.to_string(),
            nullable: false,
        }
    }

    #[test]
    fn test_lower_interface_with_members() {
        let doc = Document {
            source: "test.idl".to_string(),
            text: None,
            definitions: vec![Decl::Interface {
                name: "Foo".to_string(),
                forward: false,
                extends: vec![],
                ext_attrs: vec![],
                members: vec![Decl::Attribute {
                    name: "bar".to_string(),
                    ty: builtin("long"),
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
            }],
        };
        let mut arena = NodeArena::new();
        doc.lower(&mut arena, 0, 1).unwrap();
        let foo = arena.search_child(arena.root(), "Foo").unwrap();
        assert_eq!(arena.interface(foo).unwrap().method_count, 1);
        assert_eq!(arena.children(foo).len(), 1);
    }

    #[test]
    fn test_lower_reopens_module() {
        let module = |body: Vec<Decl>| Decl::Module {
            name: "dom".to_string(),
            ext_attrs: vec![],
            body,
            span: Span::default(),
            doc: String::new(),
        };
        let iface = |name: &str| Decl::Interface {
            name: name.to_string(),
            forward: false,
            extends: vec![],
            ext_attrs: vec![],
            members: vec![],
            span: Span::default(),
            doc: String::new(),
        };
        let doc = Document {
            source: "test.idl".to_string(),
            text: None,
            definitions: vec![module(vec![iface("A")]), module(vec![iface("B")])],
        };
        let mut arena = NodeArena::new();
        doc.lower(&mut arena, 0, 1).unwrap();
        let dom = arena.search_child(arena.root(), "dom").unwrap();
        assert_eq!(arena.children(dom).len(), 2);
        assert_eq!(arena.module(dom).unwrap().interface_count, 2);
    }

    #[test]
    fn test_document_round_trips_through_json() {
        let doc = Document {
            source: "test.idl".to_string(),
            text: None,
            definitions: vec![Decl::Operation {
                name: "item".to_string(),
                return_ty: TypeExpr::Named {
                    name: "Node".to_string(),
                    nullable: true,
                },
                params: vec![Param {
                    name: "index".to_string(),
                    ty: builtin("unsigned long"),
                    optional: false,
                    variadic: false,
                    ext_attrs: vec![],
                }],
                raises: vec![],
                specials: vec![Special::IndexGetter],
                ext_attrs: vec![],
                span: Span::default(),
                doc: String::new(),
            }],
        };
        let json = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back.source, "test.idl");
        assert_eq!(back.definitions.len(), 1);
    }
}
