//! Method-count / interface-count adjustment
//!
//! Runs after the extended-attribute processor. `Implements` links are
//! resolved first, then operation overload expansion, then the
//! supplemental fold, then the inheritance chains and memoized
//! interface counts. Consumers must not read `method_count`,
//! `super_list`, or `interface_count` before this pass completes.

use ridl_ast::{Attr, NodeArena, NodeId, NodeKind};
use rustc_hash::FxHashMap;

use crate::error::{loc_of, SemaError};
use crate::{resolve, SemaOptions};

pub fn run(arena: &mut NodeArena, opts: &SemaOptions) -> Result<(), SemaError> {
    resolve_implements(arena, opts)?;
    adjust_operations(arena);
    adjust_attributes(arena);
    fold_supplementals(arena);
    populate_super_lists(arena)?;
    memoize_interface_counts(arena, opts);
    Ok(())
}

/// Every interface reachable from the tree in declaration order,
/// constructor pseudo-interfaces included.
fn all_interfaces(arena: &NodeArena) -> Vec<NodeId> {
    fn walk(arena: &NodeArena, id: NodeId, out: &mut Vec<NodeId>) {
        if let NodeKind::Interface(data) = &arena.node(id).kind {
            out.push(id);
            if let Some(ctor) = data.constructor {
                walk(arena, ctor, out);
            }
        }
        for &child in arena.children(id) {
            walk(arena, child, out);
        }
    }
    let mut out = Vec::new();
    walk(arena, arena.root(), &mut out);
    out
}

/// Operation or `Implements` nodes in declaration order; link
/// resolution and list building must stay deterministic.
fn all_of_kind(arena: &NodeArena, want_op: bool) -> Vec<NodeId> {
    fn walk(arena: &NodeArena, id: NodeId, want_op: bool, out: &mut Vec<NodeId>) {
        match &arena.node(id).kind {
            NodeKind::Op(_) if want_op => out.push(id),
            NodeKind::Implements(_) if !want_op => out.push(id),
            NodeKind::Interface(data) => {
                if let Some(ctor) = data.constructor {
                    walk(arena, ctor, want_op, out);
                }
            }
            _ => {}
        }
        for &child in arena.children(id) {
            walk(arena, child, want_op, out);
        }
    }
    let mut out = Vec::new();
    walk(arena, arena.root(), want_op, &mut out);
    out
}

/// Resolve `A implements B` cross-links.
///
/// A non-supplemental mixin lands on the externally visible
/// `implement_list`; a supplemental one (or any mixin when the caller
/// asked for supplemental import) folds into the dispatch surface via
/// `supplemental_list` and is marked as implemented-on so it is never
/// emitted standalone.
fn resolve_implements(arena: &mut NodeArena, opts: &SemaOptions) -> Result<(), SemaError> {
    for link in all_of_kind(arena, false) {
        let (first, second) = match &arena.node(link).kind {
            NodeKind::Implements(data) => (data.first, data.second),
            _ => unreachable!(),
        };
        let scope = arena.node(link).parent.unwrap_or_else(|| arena.root());
        let target = lookup_interface(arena, scope, first)?;
        let mixin = lookup_interface(arena, scope, second)?;
        let supplemental = arena.node(mixin).attr.intersects(Attr::SUPPLEMENTAL);
        if supplemental || opts.import_implements {
            arena
                .interface_mut(target)
                .expect("interface node")
                .supplemental_list
                .push(mixin);
            arena.node_mut(mixin).attr.insert(Attr::IMPLEMENTED_ON);
        } else {
            arena
                .interface_mut(target)
                .expect("interface node")
                .implement_list
                .push(mixin);
        }
    }
    Ok(())
}

fn lookup_interface(
    arena: &NodeArena,
    scope: NodeId,
    scoped: NodeId,
) -> Result<NodeId, SemaError> {
    let name = arena.name(scoped).to_string();
    let resolved = resolve::search_scoped(arena, scope, scoped).ok_or(SemaError::Unresolved {
        name: name.clone(),
        loc: loc_of(arena, scoped),
    })?;
    if arena.interface(resolved).is_none() {
        return Err(SemaError::NotAnInterface {
            name,
            loc: loc_of(arena, scoped),
        });
    }
    Ok(resolved)
}

/// Expand trailing optional parameters into overload stages.
///
/// K optional parameters produce K+1 stages; stage i supplies the first
/// i optionals and records its fixed parameter count. The owning
/// interface already counted the operation once, so only the extra
/// stages are added.
fn adjust_operations(arena: &mut NodeArena) {
    for op in all_of_kind(arena, true) {
        let params = arena.children(op).to_vec();
        let optionals = params
            .iter()
            .filter(|&&p| arena.node(p).attr.intersects(Attr::OPTIONAL))
            .count() as u32;
        if optionals == 0 {
            continue;
        }
        let stages = optionals + 1;
        let mut counts = Vec::with_capacity(stages as usize);
        for stage in 0..stages {
            let mut seen_optionals = 0;
            let mut count = 0u32;
            for &param in &params {
                if arena.node(param).attr.intersects(Attr::OPTIONAL) {
                    seen_optionals += 1;
                    if stage < seen_optionals {
                        break;
                    }
                }
                count += 1;
            }
            counts.push(count);
        }
        {
            let data = arena.op_mut(op).expect("operation node");
            data.method_count = stages;
            data.param_counts = counts;
        }
        if let Some(owner) = arena.node(op).parent {
            if let Some(interface) = arena.interface_mut(owner) {
                interface.method_count += stages - 1;
            }
        }
    }
}

/// A readonly attribute was counted once when it was added, but
/// `[PutForwards]` and `[Replaceable]` still synthesize a setter; those
/// flags land after the add, so the second slot is granted here.
fn adjust_attributes(arena: &mut NodeArena) {
    let mut fixups = Vec::new();
    let mut stack = vec![arena.root()];
    while let Some(id) = stack.pop() {
        if let NodeKind::Attribute(data) = &arena.node(id).kind {
            let forwarding = data.put_forwards.is_some()
                || arena.node(id).attr.intersects(Attr::REPLACEABLE);
            if data.readonly && forwarding {
                if let Some(owner) = arena.node(id).parent {
                    fixups.push(owner);
                }
            }
        }
        if let Some(ctor) = arena.interface(id).and_then(|d| d.constructor) {
            stack.push(ctor);
        }
        stack.extend(arena.children(id).iter().copied());
    }
    for owner in fixups {
        if let Some(interface) = arena.interface_mut(owner) {
            interface.method_count += 1;
        }
    }
}

/// Fold each supplemental contributor's adjusted method count into the
/// interface it extends.
fn fold_supplementals(arena: &mut NodeArena) {
    let interfaces = all_interfaces(arena);
    let mut additions: FxHashMap<NodeId, u32> = FxHashMap::default();
    for &id in &interfaces {
        let mut extra = 0;
        for supplemental in collect_supplementals(arena, id).into_iter().skip(1) {
            extra += arena
                .interface(supplemental)
                .map(|d| d.method_count)
                .unwrap_or(0);
        }
        if extra != 0 {
            additions.insert(id, extra);
        }
    }
    for (id, extra) in additions {
        arena.interface_mut(id).expect("interface node").method_count += extra;
    }
}

/// Resolve the base chain of every interface. Single inheritance is
/// enforced here even though the model carries a list.
fn populate_super_lists(arena: &mut NodeArena) -> Result<(), SemaError> {
    for id in all_interfaces(arena) {
        let extends = arena
            .interface(id)
            .map(|d| d.extends.clone())
            .unwrap_or_default();
        if extends.len() > 1 {
            return Err(SemaError::MultipleInheritance {
                name: arena.name(id).to_string(),
                loc: loc_of(arena, id),
            });
        }
        let mut chain = Vec::new();
        let mut cur = id;
        loop {
            let Some(&base_ref) = arena
                .interface(cur)
                .and_then(|d| d.extends.first())
            else {
                break;
            };
            let scope = arena.node(cur).parent.unwrap_or_else(|| arena.root());
            let base = lookup_interface(arena, scope, base_ref)?;
            if chain.contains(&base) || base == id {
                break;
            }
            chain.push(base);
            cur = base;
        }
        arena.interface_mut(id).expect("interface node").super_list = chain;
    }
    Ok(())
}

fn memoize_interface_counts(arena: &mut NodeArena, opts: &SemaOptions) {
    for id in all_interfaces(arena) {
        interface_count(arena, opts, id);
    }
}

/// Total number of interface slots an instance of `id` implements:
/// itself, its base chain (reached through the direct base, whose own
/// count telescopes the rest), and every mixin's slots. Memoized.
pub fn interface_count(arena: &mut NodeArena, opts: &SemaOptions, id: NodeId) -> u32 {
    if let Some(cached) = arena.interface(id).and_then(|d| d.interface_count) {
        return cached;
    }
    let (direct_super, implement_list) = {
        let data = arena.interface(id).expect("interface node");
        (data.super_list.first().copied(), data.implement_list.clone())
    };
    let mut count = 1;
    if let Some(base) = direct_super {
        if !arena.is_base_object(base, &opts.base_object) {
            count += interface_count(arena, opts, base);
        }
    }
    for mixin in implement_list {
        count += interface_count(arena, opts, mixin);
    }
    if let Some(data) = arena.interface_mut(id) {
        data.interface_count = Some(count);
    }
    count
}

/// The deterministic front-to-back interface ordering used when
/// assigning numeric interface indices: self first, then the base chain
/// nearest-first, then each mixin's own list in declaration order.
/// Supplementals and the base object never occupy a slot.
pub fn interface_list(arena: &NodeArena, opts: &SemaOptions, id: NodeId) -> Vec<NodeId> {
    let mut out = vec![id];
    if let Some(data) = arena.interface(id) {
        for &base in &data.super_list {
            if arena.is_base_object(base, &opts.base_object) {
                continue;
            }
            if arena.node(base).attr.intersects(Attr::SUPPLEMENTAL) {
                continue;
            }
            out.push(base);
        }
        for &mixin in &data.implement_list {
            out.extend(interface_list(arena, opts, mixin));
        }
    }
    out
}

/// The interface itself followed by every supplemental contributor, in
/// declaration order, recursively.
pub fn collect_supplementals(arena: &NodeArena, id: NodeId) -> Vec<NodeId> {
    fn walk(arena: &NodeArena, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        if let Some(data) = arena.interface(id) {
            for &supplemental in &data.supplemental_list {
                walk(arena, supplemental, out);
            }
        }
    }
    let mut out = Vec::new();
    walk(arena, id, &mut out);
    out
}

/// Every mixin visible on `id`, recursively, in declaration order.
pub fn collect_mixins(arena: &NodeArena, id: NodeId) -> Vec<NodeId> {
    fn walk(arena: &NodeArena, id: NodeId, out: &mut Vec<NodeId>) {
        if let Some(data) = arena.interface(id) {
            for &mixin in &data.implement_list {
                out.push(mixin);
                walk(arena, mixin, out);
            }
        }
    }
    let mut out = Vec::new();
    walk(arena, id, &mut out);
    out
}
