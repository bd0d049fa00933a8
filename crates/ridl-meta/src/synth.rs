//! Meta-string synthesis
//!
//! Walks every rank-1 interface definition and produces its reflection
//! encoding: one fragment per getter, setter, operation overload stage,
//! and constant, plus the assembled interface string that splices
//! supplemental members inline and appends constructor records. All
//! results live in side tables keyed by node id; the tree itself stays
//! untouched.

use rustc_hash::FxHashMap;

use ridl_ast::{Attr, NodeArena, NodeId, NodeKind};
use ridl_sema::adjust::collect_supplementals;
use ridl_sema::error::{loc_of, SemaError};
use ridl_sema::{eval, resolve};

use crate::hash::{one_at_a_time, HashTable};
use crate::tags;

#[derive(Debug, Clone)]
pub struct MetaOptions {
    /// Concrete class name substituted for the universal base object.
    pub object_type: String,
    /// Qualified name of the universal base object interface.
    pub base_object: String,
}

impl Default for MetaOptions {
    fn default() -> Self {
        MetaOptions {
            object_type: "Object".to_string(),
            base_object: "Object".to_string(),
        }
    }
}

/// One `{name -> offset}` record of an interface's symbol table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub name: String,
    /// Byte offset of the member's fragment within the assembled meta
    /// string.
    pub offset: usize,
    /// Method number in dispatch order.
    pub number: u32,
}

/// Synthesis results, keyed by node id.
#[derive(Default, Debug)]
pub struct MetaTables {
    /// Interface header only: `I name X... M...`.
    pub interface_header: FxHashMap<NodeId, String>,
    /// Full interface string: header plus every member fragment.
    pub assembled: FxHashMap<NodeId, String>,
    pub getter: FxHashMap<NodeId, String>,
    pub setter: FxHashMap<NodeId, String>,
    /// One fragment per overload stage.
    pub ops: FxHashMap<NodeId, Vec<String>>,
    pub constants: FxHashMap<NodeId, String>,
    /// Selector hash per dispatch-relevant member.
    pub hashes: FxHashMap<NodeId, u32>,
    /// Dispatch symbols per interface (getters, setters, operations).
    pub symbols: FxHashMap<NodeId, Vec<SymbolEntry>>,
    /// Constant symbols per interface, tracked separately.
    pub constant_symbols: FxHashMap<NodeId, Vec<SymbolEntry>>,
    /// Hash-collision reports, surfaced as warnings by the driver.
    pub collisions: Vec<String>,
}

impl MetaTables {
    pub fn hash_of(&self, id: NodeId) -> u32 {
        self.hashes.get(&id).copied().unwrap_or(0)
    }
}

/// Synthesize meta strings for every rank-1 interface definition.
pub fn synthesize(arena: &NodeArena, opts: &MetaOptions) -> Result<MetaTables, SemaError> {
    let mut synth = Synth {
        arena,
        opts,
        tables: MetaTables::default(),
        hash_table: HashTable::new(),
    };
    synth.walk(arena.root())?;
    Ok(synth.tables)
}

struct Synth<'a> {
    arena: &'a NodeArena,
    opts: &'a MetaOptions,
    tables: MetaTables,
    hash_table: HashTable,
}

/// A member's fragment is computed once per owning interface; a
/// supplemental's member is revisited per host, but the fragment must
/// come out identical. A changed value would mean the two hosts
/// disagree about the wire format.
fn insert_once<V: PartialEq + std::fmt::Debug>(
    map: &mut FxHashMap<NodeId, V>,
    id: NodeId,
    value: V,
) {
    if let Some(previous) = map.get(&id) {
        debug_assert_eq!(previous, &value);
    }
    map.insert(id, value);
}

impl Synth<'_> {
    fn walk(&mut self, scope: NodeId) -> Result<(), SemaError> {
        for &child in self.arena.children(scope) {
            match &self.arena.node(child).kind {
                NodeKind::Module(_) => self.walk(child)?,
                NodeKind::Interface(_) => {
                    let node = self.arena.node(child);
                    if node.rank > 1
                        || node.is_leaf()
                        || node.attr.intersects(Attr::SUPPLEMENTAL)
                        || node.attr.intersects(Attr::IMPLEMENTED_ON)
                    {
                        continue;
                    }
                    self.interface(child)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn interface_name(&self, qualified: String) -> String {
        if qualified == self.opts.base_object {
            self.opts.object_type.clone()
        } else {
            qualified
        }
    }

    fn push_name(&self, out: &mut String, name: &str) {
        out.push_str(&name.len().to_string());
        out.push_str(name);
    }

    fn interface(&mut self, id: NodeId) -> Result<(), SemaError> {
        let mut out = String::new();
        out.push(tags::INTERFACE);
        let own_name = self.interface_name(self.arena.qualified_name(id));
        self.push_name(&mut out, &own_name);

        let data = self.arena.interface(id).expect("interface node");
        let outer = self.arena.node(id).parent.unwrap_or_else(|| self.arena.root());
        for &base_ref in &data.extends {
            let resolved = resolve::search_scoped(self.arena, outer, base_ref).ok_or_else(|| {
                SemaError::Unresolved {
                    name: self.arena.name(base_ref).to_string(),
                    loc: loc_of(self.arena, base_ref),
                }
            })?;
            if self.arena.is_base_object(resolved, &self.opts.base_object) {
                continue;
            }
            out.push(tags::EXTENDS);
            let name = self.interface_name(self.arena.qualified_name(resolved));
            self.push_name(&mut out, &name);
        }
        for &mixin in &data.implement_list {
            out.push(tags::IMPLEMENTS);
            let name = self.interface_name(self.arena.qualified_name(mixin));
            self.push_name(&mut out, &name);
        }
        self.tables.interface_header.insert(id, out.clone());

        let mut symbols = Vec::new();
        let mut constant_symbols = Vec::new();
        let mut number = 0u32;
        for owner in collect_supplementals(self.arena, id) {
            for &member in self.arena.children(owner) {
                self.member(
                    owner,
                    member,
                    &mut out,
                    &mut symbols,
                    &mut constant_symbols,
                    &mut number,
                )?;
            }
        }

        if let Some(ctor) = self.arena.interface(id).and_then(|d| d.constructor) {
            // The constructor is an interface of its own; its records
            // also appear on the owner, retagged as constructors.
            self.interface(ctor)?;
            for &op in self.arena.children(ctor) {
                let fragments = self.tables.ops.get(&op).cloned().unwrap_or_default();
                for fragment in fragments {
                    let offset = out.len();
                    let mut retagged = fragment;
                    retagged.replace_range(0..1, &tags::CONSTRUCTOR.to_string());
                    out.push_str(&retagged);
                    symbols.push(SymbolEntry {
                        name: self.arena.name(op).to_string(),
                        offset,
                        number,
                    });
                    number += 1;
                }
            }
        }

        self.tables.assembled.insert(id, out);
        self.tables.symbols.insert(id, symbols);
        self.tables.constant_symbols.insert(id, constant_symbols);
        Ok(())
    }

    fn member(
        &mut self,
        owner: NodeId,
        member: NodeId,
        out: &mut String,
        symbols: &mut Vec<SymbolEntry>,
        constant_symbols: &mut Vec<SymbolEntry>,
        number: &mut u32,
    ) -> Result<(), SemaError> {
        match &self.arena.node(member).kind {
            NodeKind::Attribute(_) => {
                let name = self.arena.name(member).to_string();
                let getter = self.getter_fragment(owner, member)?;
                self.push_fragment(out, symbols, &name, &getter, number);
                insert_once(&mut self.tables.getter, member, getter);
                if let Some(setter) = self.setter_fragment(owner, member)? {
                    self.push_fragment(out, symbols, &name, &setter, number);
                    insert_once(&mut self.tables.setter, member, setter);
                }
                self.set_hash(member);
            }
            NodeKind::Op(_) => {
                let name = self.arena.name(member).to_string();
                let stages = self.arena.op(member).expect("operation node").method_count;
                let mut fragments = Vec::with_capacity(stages as usize);
                for stage in 0..stages {
                    let fragment = self.op_fragment(owner, member, stage as usize)?;
                    self.push_fragment(out, symbols, &name, &fragment, number);
                    fragments.push(fragment);
                }
                insert_once(&mut self.tables.ops, member, fragments);
                self.set_hash(member);
            }
            NodeKind::Const(_) => {
                let name = self.arena.name(member).to_string();
                let fragment = self.const_fragment(owner, member)?;
                let offset = out.len();
                out.push_str(&fragment);
                constant_symbols.push(SymbolEntry {
                    name,
                    offset,
                    number: constant_symbols.len() as u32,
                });
                insert_once(&mut self.tables.constants, member, fragment);
                self.set_hash(member);
            }
            _ => {}
        }
        Ok(())
    }

    fn push_fragment(
        &self,
        out: &mut String,
        symbols: &mut Vec<SymbolEntry>,
        name: &str,
        fragment: &str,
        number: &mut u32,
    ) {
        let offset = out.len();
        out.push_str(fragment);
        symbols.push(SymbolEntry {
            name: name.to_string(),
            offset,
            number: *number,
        });
        *number += 1;
    }

    fn set_hash(&mut self, member: NodeId) {
        let name = self.arena.name(member);
        let hash = one_at_a_time(name.as_bytes());
        if let Some(existing) = self.hash_table.check(hash, name) {
            self.tables.collisions.push(format!(
                "hash collision: 0x{hash:x} maps both `{existing}` and `{name}`"
            ));
        }
        self.tables.hashes.insert(member, hash);
    }

    fn getter_fragment(&mut self, owner: NodeId, id: NodeId) -> Result<String, SemaError> {
        let mut out = String::new();
        out.push(tags::GETTER);
        if self.arena.node(id).attr.intersects(Attr::STRINGIFIER) {
            out.push(tags::SPECIAL_STRINGIFIER);
        }
        out.push('0');
        let data = self.arena.attribute(id).expect("attribute node");
        if self.arena.node(id).attr.intersects(Attr::REPLACEABLE) {
            out.push(tags::ANY);
        } else {
            self.write_type(&mut out, owner, data.spec)?;
        }
        self.push_name(&mut out, self.arena.name(id));
        let raises = data.get_raises.clone();
        for exception in raises {
            out.push(tags::RAISES);
            self.write_raises(&mut out, owner, exception)?;
        }
        Ok(out)
    }

    fn setter_fragment(&mut self, owner: NodeId, id: NodeId) -> Result<Option<String>, SemaError> {
        let attr = self.arena.node(id).attr;
        let data = self.arena.attribute(id).expect("attribute node");
        let replaceable = attr.intersects(Attr::REPLACEABLE);
        if data.readonly && data.put_forwards.is_none() && !replaceable {
            return Ok(None);
        }
        let mut out = String::new();
        out.push(tags::SETTER);
        out.push('1');
        out.push(tags::VOID);
        self.push_name(&mut out, self.arena.name(id));
        if replaceable {
            out.push(tags::ANY);
        } else if let Some(forwards) = data.put_forwards.clone() {
            let (target, spec) = self.put_forwards_spec(owner, id, &forwards)?;
            self.write_type(&mut out, target, spec)?;
        } else {
            self.write_type(&mut out, owner, data.spec)?;
        }
        let raises = self
            .arena
            .attribute(id)
            .expect("attribute node")
            .set_raises
            .clone();
        for exception in raises {
            out.push(tags::RAISES);
            self.write_raises(&mut out, owner, exception)?;
        }
        Ok(Some(out))
    }

    /// Resolve a `[PutForwards]` target: the attribute's interface type,
    /// then the named attribute on it. The setter takes that attribute's
    /// value type.
    fn put_forwards_spec(
        &self,
        owner: NodeId,
        id: NodeId,
        forwards: &str,
    ) -> Result<(NodeId, NodeId), SemaError> {
        let data = self.arena.attribute(id).expect("attribute node");
        let target = resolve::deref(self.arena, owner, data.spec).ok_or_else(|| {
            SemaError::Unresolved {
                name: self.arena.name(data.spec).to_string(),
                loc: loc_of(self.arena, id),
            }
        })?;
        if self.arena.interface(target).is_none() {
            return Err(SemaError::NotAnInterface {
                name: self.arena.qualified_name(target),
                loc: loc_of(self.arena, id),
            });
        }
        let forwarded = self.arena.search_child(target, forwards).ok_or_else(|| {
            SemaError::Unresolved {
                name: forwards.to_string(),
                loc: loc_of(self.arena, id),
            }
        })?;
        let spec = self
            .arena
            .attribute(forwarded)
            .ok_or_else(|| SemaError::Unresolved {
                name: forwards.to_string(),
                loc: loc_of(self.arena, id),
            })?
            .spec;
        Ok((target, spec))
    }

    fn op_fragment(
        &mut self,
        owner: NodeId,
        id: NodeId,
        stage: usize,
    ) -> Result<String, SemaError> {
        let mut out = String::new();
        out.push(tags::OPERATION);
        let attr = self.arena.node(id).attr;
        if attr.intersects(Attr::OMITTABLE) {
            out.push(tags::SPECIAL_OMITTABLE);
        }
        if attr.intersects(Attr::INDEX_GETTER) {
            out.push(tags::SPECIAL_GETTER);
        }
        if attr.intersects(Attr::INDEX_SETTER) {
            out.push(tags::SPECIAL_SETTER);
        }
        if attr.intersects(Attr::INDEX_CREATOR) {
            out.push(tags::SPECIAL_CREATOR);
        }
        if attr.intersects(Attr::INDEX_DELETER) {
            out.push(tags::SPECIAL_DELETER);
        }
        if attr.intersects(Attr::CALLER) {
            out.push(tags::SPECIAL_CALLER);
        }
        if attr.intersects(Attr::STRINGIFIER) {
            out.push(tags::SPECIAL_STRINGIFIER);
        }

        let count = self.arena.op_param_count(id, stage);
        out.push_str(&count.to_string());

        let data = self.arena.op(id).expect("operation node");
        self.write_type(&mut out, owner, data.spec)?;
        self.push_name(&mut out, self.arena.name(id));

        let mut variadic = false;
        let params = self.arena.children(id).to_vec();
        for &param in params.iter().take(count as usize) {
            if self.arena.node(param).attr.intersects(Attr::VARIADIC) {
                variadic = true;
            }
            let spec = self.arena.param(param).expect("parameter node").spec;
            self.write_type(&mut out, owner, spec)?;
            self.push_name(&mut out, self.arena.name(param));
        }

        let raises = self.arena.op(id).expect("operation node").raises.clone();
        for exception in raises {
            out.push(tags::RAISES);
            self.write_raises(&mut out, owner, exception)?;
        }

        if variadic {
            // The runtime decoder expects the marker right after the
            // operation tag, not at the end.
            out.insert(1, tags::VARIADIC);
        }
        Ok(out)
    }

    fn const_fragment(&mut self, owner: NodeId, id: NodeId) -> Result<String, SemaError> {
        let data = self.arena.constant(id).expect("constant node");
        let spec = data.spec;
        let expr = data.expr;
        let ty = resolve::deref(self.arena, owner, spec).ok_or_else(|| SemaError::Unresolved {
            name: self.arena.name(spec).to_string(),
            loc: loc_of(self.arena, id),
        })?;
        if !matches!(self.arena.node(ty).kind, NodeKind::Type) {
            return Err(SemaError::BadConstType {
                ty: self.arena.name(ty).to_string(),
                loc: loc_of(self.arena, id),
            });
        }
        let mut out = String::new();
        out.push(tags::CONSTANT);
        self.write_type(&mut out, owner, ty)?;
        self.push_name(&mut out, self.arena.name(id));

        let arena = self.arena;
        let value = match arena.name(ty) {
            "boolean" => {
                let v = eval::eval_boolean(arena, owner, expr)?;
                if v { "1".to_string() } else { "0".to_string() }
            }
            "octet" | "unsigned byte" => (eval::eval_integer(arena, owner, expr)? as u8).to_string(),
            "byte" => (eval::eval_integer(arena, owner, expr)? as i8).to_string(),
            "short" => (eval::eval_integer(arena, owner, expr)? as i16).to_string(),
            "unsigned short" => (eval::eval_integer(arena, owner, expr)? as u16).to_string(),
            "long" => (eval::eval_integer(arena, owner, expr)? as i32).to_string(),
            "unsigned long" => (eval::eval_integer(arena, owner, expr)? as u32).to_string(),
            "long long" => eval::eval_integer(arena, owner, expr)?.to_string(),
            "unsigned long long" => (eval::eval_integer(arena, owner, expr)? as u64).to_string(),
            "float" => (eval::eval_float(arena, owner, expr)? as f32).to_string(),
            "double" => eval::eval_float(arena, owner, expr)?.to_string(),
            other => {
                return Err(SemaError::BadConstType {
                    ty: other.to_string(),
                    loc: loc_of(arena, id),
                })
            }
        };
        out.push_str(&value);
        out.push(' ');
        Ok(out)
    }

    fn write_raises(
        &self,
        out: &mut String,
        scope: NodeId,
        exception: NodeId,
    ) -> Result<(), SemaError> {
        let resolved =
            resolve::search_scoped(self.arena, scope, exception).ok_or_else(|| {
                SemaError::Unresolved {
                    name: self.arena.name(exception).to_string(),
                    loc: loc_of(self.arena, exception),
                }
            })?;
        if !matches!(self.arena.node(resolved).kind, NodeKind::Exception(_)) {
            return Err(SemaError::NotAnException {
                name: self.arena.name(exception).to_string(),
                loc: loc_of(self.arena, exception),
            });
        }
        self.push_name(out, &self.arena.qualified_name(resolved));
        Ok(())
    }

    fn write_type(&self, out: &mut String, scope: NodeId, id: NodeId) -> Result<(), SemaError> {
        let node = self.arena.node(id);
        match &node.kind {
            NodeKind::Type => {
                let tag = match node.name.as_str() {
                    "void" => tags::VOID,
                    "boolean" => tags::BOOLEAN,
                    "octet" | "unsigned byte" => tags::OCTET,
                    "byte" => tags::BYTE,
                    "short" => tags::SHORT,
                    "unsigned short" => tags::UNSIGNED_SHORT,
                    "long" => tags::LONG,
                    "unsigned long" => tags::UNSIGNED_LONG,
                    "long long" => tags::LONG_LONG,
                    "unsigned long long" => tags::UNSIGNED_LONG_LONG,
                    "float" => tags::FLOAT,
                    "double" => tags::DOUBLE,
                    "any" => tags::ANY,
                    "string" => tags::STRING,
                    "Date" => tags::DATE,
                    other => {
                        return Err(SemaError::UnsupportedType {
                            name: other.to_string(),
                            loc: loc_of(self.arena, id),
                        })
                    }
                };
                out.push(tag);
                if node.attr.intersects(Attr::NULLABLE) {
                    out.push(tags::NULLABLE);
                }
            }
            NodeKind::NativeType => {
                if node.name == "void_pointer" {
                    out.push(tags::POINTER);
                } else {
                    return Err(SemaError::UnsupportedType {
                        name: node.name.clone(),
                        loc: loc_of(self.arena, id),
                    });
                }
            }
            NodeKind::Sequence(data) => {
                out.push(tags::SEQUENCE);
                if let Some(max) = data.max {
                    let length = eval::eval_integer(self.arena, scope, max)?;
                    out.push_str(&length.to_string());
                }
                self.write_type(out, scope, data.spec)?;
                if node.attr.intersects(Attr::NULLABLE) {
                    out.push(tags::NULLABLE);
                }
            }
            NodeKind::Array(data) => {
                out.push(tags::ARRAY);
                if let Some(max) = data.max {
                    let length = eval::eval_integer(self.arena, scope, max)?;
                    out.push_str(&length.to_string());
                }
                self.write_type(out, scope, data.spec)?;
            }
            NodeKind::ScopedName => {
                let resolved =
                    resolve::search_scoped(self.arena, scope, id).ok_or_else(|| {
                        SemaError::Unresolved {
                            name: node.name.clone(),
                            loc: loc_of(self.arena, id),
                        }
                    })?;
                match &self.arena.node(resolved).kind {
                    NodeKind::Exception(_) => {
                        self.push_name(out, &self.arena.qualified_name(resolved));
                    }
                    NodeKind::Interface(_) => {
                        out.push(tags::OBJECT);
                        let name = self.interface_name(self.arena.qualified_name(resolved));
                        self.push_name(out, &name);
                    }
                    _ => {
                        let inner = self
                            .arena
                            .node(resolved)
                            .parent
                            .unwrap_or_else(|| self.arena.root());
                        match &self.arena.node(resolved).kind {
                            NodeKind::Member(member) if member.is_typedef => {
                                let spec =
                                    member.spec.ok_or_else(|| SemaError::UnsupportedType {
                                        name: node.name.clone(),
                                        loc: loc_of(self.arena, id),
                                    })?;
                                self.write_type(out, inner, spec)?;
                            }
                            _ => self.write_type(out, inner, resolved)?,
                        }
                    }
                }
            }
            _ => {
                return Err(SemaError::UnsupportedType {
                    name: node.name.clone(),
                    loc: loc_of(self.arena, id),
                })
            }
        }
        Ok(())
    }
}
