//! Semantic errors
//!
//! Every variant is fatal: an unresolved reference or malformed
//! declaration invalidates the counts, hashes, and meta strings every
//! later pass depends on, so compilation stops at the first one.

use ridl_ast::{FileId, NodeArena, NodeId, Span};
use thiserror::Error;

/// Source position of the offending node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub file: FileId,
    pub span: Span,
}

/// Build a [`Location`] from a node's provenance.
pub fn loc_of(arena: &NodeArena, id: NodeId) -> Location {
    let node = arena.node(id);
    Location {
        file: node.source,
        span: node.span,
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SemaError {
    #[error("could not resolve `{name}`")]
    Unresolved { name: String, loc: Location },

    #[error("`{name}` is not an interface")]
    NotAnInterface { name: String, loc: Location },

    #[error("`{name}` does not name an exception")]
    NotAnException { name: String, loc: Location },

    #[error("invalid constant type `{ty}`")]
    BadConstType { ty: String, loc: Location },

    #[error("malformed literal `{text}`")]
    BadLiteral { text: String, loc: Location },

    #[error("operator `{op}` is not valid in a constant expression")]
    BadOperator { op: String, loc: Location },

    #[error("`{name}` declares more than one base interface")]
    MultipleInheritance { name: String, loc: Location },

    #[error("unsupported type name `{name}`")]
    UnsupportedType { name: String, loc: Location },
}

impl SemaError {
    pub fn location(&self) -> Location {
        match self {
            SemaError::Unresolved { loc, .. }
            | SemaError::NotAnInterface { loc, .. }
            | SemaError::NotAnException { loc, .. }
            | SemaError::BadConstType { loc, .. }
            | SemaError::BadLiteral { loc, .. }
            | SemaError::BadOperator { loc, .. }
            | SemaError::MultipleInheritance { loc, .. }
            | SemaError::UnsupportedType { loc, .. } => *loc,
        }
    }
}
