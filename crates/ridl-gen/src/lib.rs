//! Emission back-ends for the ridl interface compiler
//!
//! Every back-end is a pure function of the frozen tree, the meta
//! tables, and an explicit [`EmitConfig`]; back-ends can run in any
//! order. One artifact is produced per standalone interface (rank 1,
//! fully defined, not supplemental), with a synthesized constructor
//! emitted as a standalone declaration of its own.

pub mod bridge;
pub mod cxx;
pub mod formatter;
pub mod forward;
pub mod header;
pub mod java;
pub mod messenger;

use std::path::PathBuf;

use ridl_ast::{Attr, NodeArena, NodeId, NodeKind};
use ridl_meta::MetaTables;
use ridl_sema::error::SemaError;
use ridl_sema::SemaOptions;

pub use formatter::Formatter;

/// Per-run emission configuration; no global state.
#[derive(Debug, Clone)]
pub struct EmitConfig {
    /// C++ type used for the IDL `string` type.
    pub string_type: String,
    /// Concrete class name substituted for the universal base object.
    pub object_type: String,
    /// Qualified IDL name of the universal base object.
    pub base_object: String,
    /// Default namespace prefix for generated names.
    pub default_prefix: String,
    /// Emit `throw(...)` specifications for raises lists.
    pub use_exceptions: bool,
    /// Indent unit for generated sources.
    pub indent: String,
}

impl Default for EmitConfig {
    fn default() -> Self {
        EmitConfig {
            string_type: "std::string".to_string(),
            object_type: "Object".to_string(),
            base_object: "Object".to_string(),
            default_prefix: "::".to_string(),
            use_exceptions: true,
            indent: "    ".to_string(),
        }
    }
}

/// One generated output file.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub contents: String,
}

/// Output families selectable per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// C++ pure-interface headers.
    Header,
    /// C++ messenger proxy + dispatch headers.
    Messenger,
    /// C++ static-dispatch bridge templates.
    Bridge,
    /// Java interfaces.
    Java,
}

/// Map a scoped name onto an output path: `::`-segments become
/// directories.
pub fn output_path(scoped: &str, suffix: &str) -> PathBuf {
    let mut path = PathBuf::new();
    for segment in scoped.trim_start_matches("::").split("::") {
        path.push(segment);
    }
    path.set_extension(suffix);
    path
}

/// The output path of one interface's artifact, base object
/// substituted at file-naming time.
pub fn interface_path(
    arena: &NodeArena,
    cfg: &EmitConfig,
    interface: NodeId,
    suffix: &str,
) -> PathBuf {
    let name = artifact_name(arena, cfg, interface);
    output_path(&name, suffix)
}

pub(crate) fn artifact_name(arena: &NodeArena, cfg: &EmitConfig, interface: NodeId) -> String {
    if arena.is_constructor_interface(interface) {
        let owner = arena.node(interface).parent.expect("constructor owner");
        let mut name = arena.prefixed_name(owner, &cfg.default_prefix);
        if name == cfg.base_object {
            name = cfg.object_type.clone();
        }
        return format!("{}_{}", name, arena.name(interface));
    }
    let name = arena.prefixed_name(interface, &cfg.default_prefix);
    if name == cfg.base_object {
        cfg.object_type.clone()
    } else {
        name
    }
}

/// Members of an interface's dispatch surface in declaration order,
/// supplemental contributors spliced inline: `(owner, member)` pairs.
pub fn dispatch_members(arena: &NodeArena, interface: NodeId) -> Vec<(NodeId, NodeId)> {
    let mut out = Vec::new();
    for owner in ridl_sema::adjust::collect_supplementals(arena, interface) {
        for &member in arena.children(owner) {
            match &arena.node(member).kind {
                NodeKind::Attribute(_) | NodeKind::Op(_) | NodeKind::Const(_) => {
                    out.push((owner, member))
                }
                _ => {}
            }
        }
    }
    out
}

/// Namespace chain of an artifact: every segment of its scoped name
/// but the last.
pub fn namespace_chain(arena: &NodeArena, cfg: &EmitConfig, interface: NodeId) -> Vec<String> {
    let name = artifact_name(arena, cfg, interface);
    let mut segments: Vec<String> = name
        .trim_start_matches("::")
        .split("::")
        .map(str::to_string)
        .collect();
    segments.pop();
    segments
}

/// Standalone interfaces in deterministic tree order: rank 1, fully
/// defined, not supplemental.
pub fn standalone_interfaces(arena: &NodeArena) -> Vec<NodeId> {
    let mut out = Vec::new();
    fn walk(arena: &NodeArena, scope: NodeId, out: &mut Vec<NodeId>) {
        for &child in arena.children(scope) {
            match &arena.node(child).kind {
                NodeKind::Module(_) => walk(arena, child, out),
                NodeKind::Interface(_) => {
                    let node = arena.node(child);
                    if node.rank == 1
                        && !node.is_leaf()
                        && !node.attr.intersects(Attr::SUPPLEMENTAL)
                        && !node.attr.intersects(Attr::IMPLEMENTED_ON)
                    {
                        out.push(child);
                    }
                }
                _ => {}
            }
        }
    }
    walk(arena, arena.root(), &mut out);
    out
}

/// Standalone exception declarations in tree order.
pub fn standalone_exceptions(arena: &NodeArena) -> Vec<NodeId> {
    let mut out = Vec::new();
    fn walk(arena: &NodeArena, scope: NodeId, out: &mut Vec<NodeId>) {
        for &child in arena.children(scope) {
            match &arena.node(child).kind {
                NodeKind::Module(_) => walk(arena, child, out),
                NodeKind::Exception(_) => {
                    if arena.node(child).rank == 1 {
                        out.push(child);
                    }
                }
                _ => {}
            }
        }
    }
    walk(arena, arena.root(), &mut out);
    out
}

/// Run the selected back-ends over every standalone interface.
pub fn emit_all(
    arena: &NodeArena,
    opts: &SemaOptions,
    tables: &MetaTables,
    cfg: &EmitConfig,
    backends: &[Backend],
) -> Result<Vec<Artifact>, SemaError> {
    let mut artifacts = Vec::new();
    for interface in standalone_interfaces(arena) {
        let mut targets = vec![interface];
        if let Some(ctor) = arena.interface(interface).and_then(|d| d.constructor) {
            targets.push(ctor);
        }
        for target in targets {
            for backend in backends {
                match backend {
                    Backend::Header => {
                        artifacts.push(header::emit(arena, opts, tables, cfg, target)?);
                    }
                    Backend::Messenger => {
                        artifacts.push(messenger::emit(arena, opts, tables, cfg, target)?);
                    }
                    Backend::Bridge => {
                        if !arena.is_constructor_interface(target) {
                            artifacts.push(bridge::emit(arena, opts, tables, cfg, target)?);
                        }
                    }
                    Backend::Java => {
                        artifacts.push(java::emit(arena, opts, tables, cfg, target)?);
                    }
                }
            }
        }
    }
    for exception in standalone_exceptions(arena) {
        for backend in backends {
            match backend {
                Backend::Header => {
                    artifacts.push(header::emit_exception(arena, cfg, exception)?);
                }
                Backend::Java => {
                    artifacts.push(java::emit(arena, opts, tables, cfg, exception)?);
                }
                _ => {}
            }
        }
    }
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_maps_scopes_to_directories() {
        assert_eq!(
            output_path("org::w3c::dom::Node", "h"),
            PathBuf::from("org/w3c/dom/Node.h")
        );
        assert_eq!(output_path("::Foo", "java"), PathBuf::from("Foo.java"));
    }
}
