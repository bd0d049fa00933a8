//! Semantic passes for the ridl interface compiler
//!
//! Two mutating passes run over the freshly lowered tree, in order:
//! the extended-attribute processor ([`attributes`]) and the
//! method-count / interface-count adjuster ([`adjust`]). After both have
//! completed the tree is frozen; the resolver ([`resolve`]) and the
//! constant evaluator ([`eval`]) are read-only services the emitters
//! call on demand.

pub mod adjust;
pub mod attributes;
pub mod diagnostic;
pub mod error;
pub mod eval;
pub mod resolve;

pub use diagnostic::{Diagnostics, Warning};
pub use error::{Location, SemaError};

use ridl_ast::{InterfaceData, Node, NodeArena, NodeKind};

/// Compilation-wide options shared by the passes and the emitters.
#[derive(Debug, Clone)]
pub struct SemaOptions {
    /// Qualified name of the universal base object interface.
    pub base_object: String,
    /// Default namespace prefix prepended to generated names.
    pub default_prefix: String,
    /// Fold non-supplemental mixins into the dispatch surface too.
    pub import_implements: bool,
}

impl Default for SemaOptions {
    fn default() -> Self {
        SemaOptions {
            base_object: "Object".to_string(),
            default_prefix: "::".to_string(),
            import_implements: false,
        }
    }
}

/// Run both mutating passes; the tree is read-only afterwards.
pub fn run_passes(
    arena: &mut NodeArena,
    opts: &SemaOptions,
    diags: &mut Diagnostics,
) -> Result<(), SemaError> {
    ensure_base_object(arena, opts);
    attributes::process(arena, opts, diags)?;
    adjust::run(arena, opts)
}

/// Make sure the universal base object resolves even when no document
/// declares it; the injected forward declaration ranks as imported so it
/// is never emitted.
fn ensure_base_object(arena: &mut NodeArena, opts: &SemaOptions) {
    let root = arena.root();
    if resolve::resolve(arena, root, &opts.base_object).is_some() {
        return;
    }
    let mut scope = root;
    let segments: Vec<&str> = opts
        .base_object
        .trim_start_matches("::")
        .split("::")
        .collect();
    let (modules, leaf) = segments.split_at(segments.len() - 1);
    for module in modules {
        scope = match arena.search_child(scope, module) {
            Some(existing) => existing,
            None => {
                let mut node =
                    Node::new(*module, NodeKind::Module(Default::default())).with_children();
                node.rank = 2;
                let id = arena.alloc(node);
                arena.add_child(scope, id);
                id
            }
        };
    }
    let mut node = Node::new(leaf[0], NodeKind::Interface(InterfaceData::default()));
    node.rank = 2;
    let id = arena.alloc(node);
    arena.add_child(scope, id);
}
