//! C++ bridge template emission
//!
//! The bridge is the static-dispatch composition: given an `invoke`
//! callback and an argument-tuple type, the generated template
//! implements the whole abstract interface by marshaling into `invoke`
//! with `(interface number, method number)` coordinates, and exposes
//! the reverse shim mapping a method number back onto a direct call.
//! When an interface carries several mixins, a `_Mixin` composite
//! answers capability queries across every contributing interface by
//! sequential fallthrough.

use ridl_ast::{Attr, NodeArena, NodeId, NodeKind};
use ridl_meta::MetaTables;
use ridl_sema::adjust;
use ridl_sema::error::SemaError;
use ridl_sema::{resolve, SemaOptions};

use crate::formatter::Formatter;
use crate::{cxx, Artifact, EmitConfig};

pub fn emit(
    arena: &NodeArena,
    opts: &SemaOptions,
    tables: &MetaTables,
    cfg: &EmitConfig,
    interface: NodeId,
) -> Result<Artifact, SemaError> {
    let _ = tables;
    let scoped = crate::artifact_name(arena, cfg, interface);
    let path = crate::output_path(&format!("{scoped}Bridge"), "h");
    let namespaces = crate::namespace_chain(arena, cfg, interface);
    let class_name = cxx::class_name(arena, interface, cfg);
    let mixins = adjust::collect_mixins(arena, interface);
    let list = adjust::interface_list(arena, opts, interface);

    let mut f = Formatter::new(&cfg.indent);
    f.writeln("// Generated by ridl. Do not edit.");
    f.blank();
    f.writeln(format!(
        "#include <{}>",
        crate::output_path(&scoped, "h").display()
    ));
    // The base chain's bridge templates are spelled out below, so
    // their headers come in here.
    let data = arena.interface(interface).expect("interface node");
    let mut chained: Vec<NodeId> = Vec::new();
    if let Some(&base) = data.super_list.first() {
        if !arena.is_base_object(base, &opts.base_object) {
            chained.push(base);
        }
    }
    chained.extend(mixins.iter().copied());
    for base in chained {
        let name = crate::artifact_name(arena, cfg, base);
        f.writeln(format!(
            "#include <{}>",
            crate::output_path(&format!("{name}Bridge"), "h").display()
        ));
    }
    f.blank();
    for namespace in &namespaces {
        f.writeln(format!("namespace {} {{", cxx::escape(namespace)));
    }
    f.blank();

    if !mixins.is_empty() {
        emit_mixin(arena, cfg, &mut f, interface, &class_name, &mixins, &list);
        f.blank();
    }

    emit_bridge(arena, opts, cfg, &mut f, interface, &class_name, &mixins, &list)?;

    f.blank();
    for namespace in namespaces.iter().rev() {
        f.writeln(format!("}} // namespace {}", cxx::escape(namespace)));
    }

    Ok(Artifact {
        path,
        contents: f.finish(),
    })
}

/// The composite class answering `queryInterface` and call fan-out
/// across every mixin.
fn emit_mixin(
    arena: &NodeArena,
    cfg: &EmitConfig,
    f: &mut Formatter,
    interface: NodeId,
    class_name: &str,
    mixins: &[NodeId],
    list: &[NodeId],
) {
    let _ = interface;
    let mut bases = vec![class_name.to_string()];
    for &mixin in mixins {
        bases.push(cxx::scoped_name(arena, mixin, cfg));
    }
    f.writeln(format!(
        "class {class_name}_Mixin : public {} {{",
        bases
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", public ")
    ));
    f.writeln("public:");
    f.indent();
    f.writeln("virtual void* queryInterface(const char* qualifiedName) {");
    f.indent();
    for base in &bases {
        f.writeln(format!(
            "if (void* object = {base}::queryInterface(qualifiedName)) {{"
        ));
        f.indent();
        f.writeln("return object;");
        f.unindent();
        f.writeln("}");
    }
    f.writeln("return 0;");
    f.unindent();
    f.writeln("}");

    f.writeln(
        "virtual Any call(unsigned interfaceNumber, unsigned selector, unsigned argumentCount, Any* arguments) {",
    );
    f.indent();
    f.writeln("switch (interfaceNumber) {");
    for (number, &entry) in list.iter().enumerate() {
        f.writeln(format!("case {number}:"));
        f.indent();
        f.writeln(format!(
            "return static_cast<{}*>(this)->call(selector, argumentCount, arguments);",
            cxx::scoped_name(arena, entry, cfg)
        ));
        f.unindent();
    }
    f.writeln("default:");
    f.indent();
    f.writeln("return Any();");
    f.unindent();
    f.writeln("}");
    f.unindent();
    f.writeln("}");
    f.unindent();
    f.writeln("};");
}

#[allow(clippy::too_many_arguments)]
fn emit_bridge(
    arena: &NodeArena,
    opts: &SemaOptions,
    cfg: &EmitConfig,
    f: &mut Formatter,
    interface: NodeId,
    class_name: &str,
    mixins: &[NodeId],
    list: &[NodeId],
) -> Result<(), SemaError> {
    let default_base = if mixins.is_empty() {
        class_name.to_string()
    } else {
        format!("{class_name}_Mixin")
    };
    f.writeln(format!(
        "template <class ARGUMENT, Any (*invoke)({}*, unsigned interfaceNumber, unsigned methodNumber, unsigned argumentCount, ARGUMENT* arguments), unsigned I = 0, class B = {default_base}>",
        cfg.object_type
    ));

    // Compose the base chain: the direct super first, then every
    // mixin, each claiming its own run of interface numbers.
    let data = arena.interface(interface).expect("interface node");
    let mut bases: Vec<NodeId> = Vec::new();
    if let Some(&base) = data.super_list.first() {
        if !arena.is_base_object(base, &opts.base_object) {
            bases.push(base);
        }
    }
    bases.extend(mixins.iter().copied());

    let mut offsets = Vec::with_capacity(bases.len());
    let mut next = 1u32;
    for &base in &bases {
        offsets.push(next);
        next += arena
            .interface(base)
            .and_then(|d| d.interface_count)
            .unwrap_or(1);
    }
    let mut inherit = "B".to_string();
    for (&base, &offset) in bases.iter().zip(&offsets).rev() {
        inherit = format!(
            "{}_Bridge<ARGUMENT, invoke, I + {offset}, {inherit} >",
            cxx::scoped_name(arena, base, cfg)
        );
    }
    f.writeln(format!("class {class_name}_Bridge : public {inherit} {{"));
    f.writeln("public:");
    f.indent();

    let mut number = 0u32;
    for (owner, member) in crate::dispatch_members(arena, interface) {
        match &arena.node(member).kind {
            NodeKind::Attribute(_) => {
                emit_attribute_glue(arena, cfg, f, owner, member, &mut number)?
            }
            NodeKind::Op(_) => emit_operation_glue(arena, cfg, f, owner, member, &mut number)?,
            _ => {}
        }
    }

    emit_interface_tables(arena, cfg, f, list);
    emit_call_shim(arena, cfg, f, interface)?;
    f.unindent();
    f.writeln("};");
    Ok(())
}

fn emit_attribute_glue(
    arena: &NodeArena,
    cfg: &EmitConfig,
    f: &mut Formatter,
    owner: NodeId,
    member: NodeId,
    number: &mut u32,
) -> Result<(), SemaError> {
    let data = arena.attribute(member).expect("attribute node");
    let replaceable = arena.node(member).attr.intersects(Attr::REPLACEABLE);
    let cap = cxx::capitalize(arena.name(member));
    let argument = cxx::escape(arena.name(member));

    let getter_ty = if replaceable {
        "Any".to_string()
    } else {
        cxx::cxx_return_type(arena, owner, data.spec, cfg)?
    };
    f.writeln(format!("{getter_ty} get{cap}() {{"));
    f.indent();
    f.writeln(format!("return invoke(this, I, {number}, GETTER_, 0);"));
    f.unindent();
    f.writeln("}");
    *number += 1;

    if data.readonly && data.put_forwards.is_none() && !replaceable {
        return Ok(());
    }
    let setter_ty = if replaceable {
        "Any".to_string()
    } else {
        cxx::cxx_return_type(arena, owner, data.spec, cfg)?
    };
    f.writeln(format!("void set{cap}({setter_ty} {argument}) {{"));
    f.indent();
    f.writeln("ARGUMENT arguments[1];");
    f.writeln(format!("arguments[0] = {argument};"));
    f.writeln(format!("invoke(this, I, {number}, SETTER_, arguments);"));
    f.unindent();
    f.writeln("}");
    *number += 1;
    Ok(())
}

fn emit_operation_glue(
    arena: &NodeArena,
    cfg: &EmitConfig,
    f: &mut Formatter,
    owner: NodeId,
    member: NodeId,
    number: &mut u32,
) -> Result<(), SemaError> {
    let data = arena.op(member).expect("operation node");
    let ret = cxx::cxx_return_type(arena, owner, data.spec, cfg)?;
    let is_void = resolve::is_void(arena, owner, data.spec);
    let name = cxx::escape(arena.name(member));
    let params = arena.children(member).to_vec();
    for stage in 0..data.method_count {
        let count = arena.op_param_count(member, stage as usize) as usize;
        let mut signature = Vec::with_capacity(count);
        for &param in params.iter().take(count) {
            let ty = cxx::cxx_param_type(arena, owner, param, cfg)?;
            signature.push(format!("{ty} {}", cxx::escape(arena.name(param))));
        }
        f.writeln(format!("{ret} {name}({}) {{", signature.join(", ")));
        f.indent();
        if count == 0 {
            if is_void {
                f.writeln(format!("invoke(this, I, {number}, 0, 0);"));
            } else {
                f.writeln(format!("return invoke(this, I, {number}, 0, 0);"));
            }
        } else {
            f.writeln(format!("ARGUMENT arguments[{count}];"));
            for (index, &param) in params.iter().take(count).enumerate() {
                f.writeln(format!(
                    "arguments[{index}] = {};",
                    cxx::escape(arena.name(param))
                ));
            }
            let call = format!("invoke(this, I, {number}, {count}, arguments);");
            if is_void {
                f.writeln(call);
            } else {
                f.writeln(format!("return {call}"));
            }
        }
        f.unindent();
        f.writeln("}");
        *number += 1;
    }
    Ok(())
}

/// The per-interface-number reflection tables: generated header and
/// dispatch constants must agree on this numbering with every other
/// translation unit, which is why the ordering comes from the
/// adjuster's linearization.
fn emit_interface_tables(arena: &NodeArena, cfg: &EmitConfig, f: &mut Formatter, list: &[NodeId]) {
    f.writeln("static const char* getMetaData(unsigned interfaceNumber) {");
    f.indent();
    f.writeln("switch (interfaceNumber) {");
    for (number, &entry) in list.iter().enumerate() {
        f.writeln(format!("case {number}:"));
        f.indent();
        f.writeln(format!(
            "return {}::getMetaData();",
            cxx::scoped_name(arena, entry, cfg)
        ));
        f.unindent();
    }
    f.writeln("default:");
    f.indent();
    f.writeln("return 0;");
    f.unindent();
    f.writeln("}");
    f.unindent();
    f.writeln("}");

    f.writeln("static const Reflect::SymbolData* getSymbolTable(unsigned interfaceNumber) {");
    f.indent();
    f.writeln("switch (interfaceNumber) {");
    for (number, &entry) in list.iter().enumerate() {
        f.writeln(format!("case {number}:"));
        f.indent();
        f.writeln(format!(
            "return {}::getSymbolTable();",
            cxx::scoped_name(arena, entry, cfg)
        ));
        f.unindent();
    }
    f.writeln("default:");
    f.indent();
    f.writeln("return 0;");
    f.unindent();
    f.writeln("}");
    f.unindent();
    f.writeln("}");
}

/// The reverse shim: a method number from the symbol table maps back
/// onto a direct call on the bridged implementation.
fn emit_call_shim(
    arena: &NodeArena,
    cfg: &EmitConfig,
    f: &mut Formatter,
    interface: NodeId,
) -> Result<(), SemaError> {
    f.writeln("Any call(unsigned methodNumber, unsigned argumentCount, Any* arguments) {");
    f.indent();
    f.writeln("switch (methodNumber) {");
    let mut number = 0u32;
    for (owner, member) in crate::dispatch_members(arena, interface) {
        match &arena.node(member).kind {
            NodeKind::Attribute(_) => {
                let data = arena.attribute(member).expect("attribute node");
                let replaceable = arena.node(member).attr.intersects(Attr::REPLACEABLE);
                let cap = cxx::capitalize(arena.name(member));
                f.writeln(format!("case {number}:"));
                f.indent();
                f.writeln(format!("return get{cap}();"));
                f.unindent();
                number += 1;
                if !data.readonly || data.put_forwards.is_some() || replaceable {
                    f.writeln(format!("case {number}:"));
                    f.indent();
                    let value = if replaceable {
                        "arguments[0]".to_string()
                    } else {
                        cxx::any_argument(arena, owner, data.spec, 0, cfg)?
                    };
                    f.writeln(format!("set{cap}({value});"));
                    f.writeln("return Any();");
                    f.unindent();
                    number += 1;
                }
            }
            NodeKind::Op(_) => {
                let data = arena.op(member).expect("operation node");
                let is_void = resolve::is_void(arena, owner, data.spec);
                let name = cxx::escape(arena.name(member));
                let params = arena.children(member).to_vec();
                for stage in 0..data.method_count {
                    let count = arena.op_param_count(member, stage as usize) as usize;
                    f.writeln(format!("case {number}:"));
                    f.indent();
                    let mut rendered = Vec::with_capacity(count);
                    for (index, &param) in params.iter().take(count).enumerate() {
                        let spec = arena.param(param).expect("parameter node").spec;
                        rendered.push(cxx::any_argument(arena, owner, spec, index, cfg)?);
                    }
                    if is_void {
                        f.writeln(format!("{name}({});", rendered.join(", ")));
                        f.writeln("return Any();");
                    } else {
                        f.writeln(format!("return {name}({});", rendered.join(", ")));
                    }
                    f.unindent();
                    number += 1;
                }
            }
            _ => {}
        }
    }
    f.writeln("default:");
    f.indent();
    f.writeln("return Any();");
    f.unindent();
    f.writeln("}");
    f.unindent();
    f.writeln("}");
    Ok(())
}
