//! AST node model for the ridl interface compiler
//!
//! The tree handed over by the front-end is stored in a [`NodeArena`]:
//! every node lives at a stable [`NodeId`] index, parent/child links are
//! ids, and the later passes keep their per-node results in side tables
//! keyed by id instead of mutating the nodes themselves.
//!
//! [`doc`] defines the serialized `Document` hand-off format produced by
//! an external parser front-end and lowers it into an arena.

pub mod doc;
pub mod node;

pub use doc::{Decl, Document, Expr, ExtAttr, Param, Special, TypeExpr};
pub use node::{
    ArrayData, Attr, AttributeData, ConstData, ExceptionData, ImplementsData, InterfaceData,
    MemberData, ModuleData, Node, NodeArena, NodeId, NodeKind, OpData, ParamData, SequenceData,
};

use serde::{Deserialize, Serialize};

/// Identifier of a source file, assigned by the diagnostics file store.
pub type FileId = usize;

/// Source location of a node, carried over from the front-end.
///
/// Byte offsets address the original IDL text (when the front-end embeds
/// it in the document); line/column pairs are 1-indexed and drive the
/// `path:line.col-line.col` diagnostic rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    #[serde(default)]
    pub start: u32,
    #[serde(default)]
    pub end: u32,
    #[serde(default)]
    pub first_line: u32,
    #[serde(default)]
    pub first_column: u32,
    #[serde(default)]
    pub last_line: u32,
    #[serde(default)]
    pub last_column: u32,
}

impl Span {
    pub fn new(start: u32, end: u32, line: u32, column: u32) -> Self {
        Span {
            start,
            end,
            first_line: line,
            first_column: column,
            last_line: line,
            last_column: column,
        }
    }
}
