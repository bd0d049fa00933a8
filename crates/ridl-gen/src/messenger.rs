//! C++ messenger proxy and dispatch emission
//!
//! The messenger header gives every interface a proxy class whose
//! methods forward through the `message_` trampoline with the member's
//! selector hash, plus the `dispatch` template the implementation side
//! compiles against: a switch over selector hashes, with
//! argument-count and per-argument type guards discriminating
//! overloads in declaration order.

use std::collections::BTreeMap;

use ridl_ast::{Attr, NodeArena, NodeId, NodeKind};
use ridl_meta::MetaTables;
use ridl_sema::error::{loc_of, SemaError};
use ridl_sema::{resolve, SemaOptions};

use crate::formatter::Formatter;
use crate::{cxx, forward, header, Artifact, EmitConfig};

pub fn emit(
    arena: &NodeArena,
    opts: &SemaOptions,
    tables: &MetaTables,
    cfg: &EmitConfig,
    interface: NodeId,
) -> Result<Artifact, SemaError> {
    let path = crate::interface_path(arena, cfg, interface, "h");
    let info = forward::collect_for_interface(arena, opts, interface)?;
    let namespaces = crate::namespace_chain(arena, cfg, interface);
    let class_name = cxx::class_name(arena, interface, cfg);

    let mut f = Formatter::new(&cfg.indent);
    f.writeln("// Generated by ridl. Do not edit.");
    f.blank();
    f.writeln(format!("#include <{}.h>", cfg.object_type));
    for import in &info.imports {
        f.writeln(format!(
            "#include <{}>",
            crate::output_path(import, "h").display()
        ));
    }
    f.blank();
    for namespace in &namespaces {
        f.writeln(format!("namespace {} {{", cxx::escape(namespace)));
    }
    for &fwd in &info.forwards {
        f.writeln(format!("class {};", cxx::escape(arena.name(fwd))));
    }
    f.blank();

    let base = proxy_base(arena, cfg, interface);
    f.writeln(format!("class {class_name} : public {base} {{"));
    f.writeln("public:");
    f.indent();

    for (owner, member) in crate::dispatch_members(arena, interface) {
        match &arena.node(member).kind {
            NodeKind::Attribute(_) => {
                emit_attribute_proxy(arena, tables, cfg, &mut f, owner, member)?
            }
            NodeKind::Op(_) => emit_operation_proxy(arena, tables, cfg, &mut f, owner, member)?,
            NodeKind::Const(_) => {
                // Constants live on the proxy as compile-time values.
                let data = arena.constant(member).expect("constant node");
                let ty = resolve::deref(arena, owner, data.spec).ok_or_else(|| {
                    SemaError::Unresolved {
                        name: arena.name(data.spec).to_string(),
                        loc: loc_of(arena, member),
                    }
                })?;
                let rendered = cxx::cxx_type(arena, owner, ty, cfg)?;
                let value = header::const_value(arena, owner, ty, data.expr)?;
                f.writeln(format!(
                    "static const {rendered} {} = {value};",
                    arena.name(member)
                ));
            }
            _ => {}
        }
    }

    emit_dispatch(arena, opts, tables, cfg, &mut f, interface)?;
    header::emit_reflection(arena, cfg, tables, &mut f, interface);
    f.unindent();
    f.writeln("};");
    f.blank();
    for namespace in namespaces.iter().rev() {
        f.writeln(format!("}} // namespace {}", cxx::escape(namespace)));
    }

    Ok(Artifact {
        path,
        contents: f.finish(),
    })
}

fn proxy_base(arena: &NodeArena, cfg: &EmitConfig, interface: NodeId) -> String {
    let data = arena.interface(interface).expect("interface node");
    match data.super_list.first() {
        Some(&base) => cxx::scoped_name(arena, base, cfg),
        None => cfg.object_type.clone(),
    }
}

fn emit_attribute_proxy(
    arena: &NodeArena,
    tables: &MetaTables,
    cfg: &EmitConfig,
    f: &mut Formatter,
    owner: NodeId,
    member: NodeId,
) -> Result<(), SemaError> {
    let data = arena.attribute(member).expect("attribute node");
    let replaceable = arena.node(member).attr.intersects(Attr::REPLACEABLE);
    let cap = cxx::capitalize(arena.name(member));
    let argument = cxx::escape(arena.name(member));
    let hash = tables.hash_of(member);
    let id = cxx::string_literal(arena.name(member));

    let getter_ty = if replaceable {
        "Any".to_string()
    } else {
        cxx::cxx_return_type(arena, owner, data.spec, cfg)?
    };
    f.writeln(format!("{getter_ty} get{cap}() {{"));
    f.indent();
    f.writeln(format!("return message_({hash:#x}u, {id}, GETTER_, 0);"));
    f.unindent();
    f.writeln("}");

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
    f.writeln(format!("Any argument_({argument});"));
    f.writeln(format!("message_({hash:#x}u, {id}, SETTER_, &argument_);"));
    f.unindent();
    f.writeln("}");
    Ok(())
}

fn emit_operation_proxy(
    arena: &NodeArena,
    tables: &MetaTables,
    cfg: &EmitConfig,
    f: &mut Formatter,
    owner: NodeId,
    member: NodeId,
) -> Result<(), SemaError> {
    let data = arena.op(member).expect("operation node");
    let ret = cxx::cxx_return_type(arena, owner, data.spec, cfg)?;
    let is_void = resolve::is_void(arena, owner, data.spec);
    let name = cxx::escape(arena.name(member));
    let hash = tables.hash_of(member);
    let id = cxx::string_literal(arena.name(member));
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
                f.writeln(format!("message_({hash:#x}u, {id}, 0, 0);"));
            } else {
                f.writeln(format!("return message_({hash:#x}u, {id}, 0, 0);"));
            }
        } else {
            f.writeln(format!("Any arguments_[{count}];"));
            for (index, &param) in params.iter().take(count).enumerate() {
                f.writeln(format!(
                    "arguments_[{index}] = {};",
                    cxx::escape(arena.name(param))
                ));
            }
            let call = format!("message_({hash:#x}u, {id}, {count}, arguments_);");
            if is_void {
                f.writeln(call);
            } else {
                f.writeln(format!("return {call}"));
            }
        }
        f.unindent();
        f.writeln("}");
    }
    Ok(())
}

enum Case {
    Constant(NodeId, NodeId),
    Attribute(NodeId, NodeId),
    Operations(Vec<(NodeId, NodeId)>),
}

fn emit_dispatch(
    arena: &NodeArena,
    opts: &SemaOptions,
    tables: &MetaTables,
    cfg: &EmitConfig,
    f: &mut Formatter,
    interface: NodeId,
) -> Result<(), SemaError> {
    // Group the dispatch surface by selector hash. Operations sharing a
    // hash are legitimate overloads; an unnamed, omittable, or caller
    // operation additionally serves selector zero.
    let mut cases: BTreeMap<u32, Case> = BTreeMap::new();
    let mut stringifier: Option<(NodeId, NodeId)> = None;
    for (owner, member) in crate::dispatch_members(arena, interface) {
        let attr = arena.node(member).attr;
        if stringifier.is_none() && attr.intersects(Attr::STRINGIFIER) {
            stringifier = Some((owner, member));
        }
        let hash = tables.hash_of(member);
        match &arena.node(member).kind {
            NodeKind::Const(_) => {
                cases.insert(hash, Case::Constant(owner, member));
            }
            NodeKind::Attribute(_) => {
                cases.insert(hash, Case::Attribute(owner, member));
            }
            NodeKind::Op(_) => {
                if !attr.intersects(Attr::UNNAMED_PROPERTY) {
                    push_op(&mut cases, hash, owner, member);
                }
                if attr.intersects(Attr::UNNAMED_PROPERTY | Attr::OMITTABLE | Attr::CALLER) {
                    push_op(&mut cases, 0, owner, member);
                }
            }
            _ => {}
        }
    }

    f.blank();
    f.writeln("template <class IMP>");
    f.writeln(
        "static Any dispatch(IMP* self, unsigned selector, const char* id, int argumentCount, Any* arguments) {",
    );
    f.indent();
    if arena.node(interface).attr.intersects(Attr::CALLBACK) {
        f.writeln("if (CALLBACK_ <= argumentCount) {");
        f.indent();
        f.writeln("argumentCount -= CALLBACK_;");
        f.unindent();
        f.writeln("}");
    }
    f.writeln("switch (selector) {");

    let mut done_selector_zero = false;
    for (&hash, case) in &cases {
        f.writeln(format!("case {hash:#x}u:"));
        f.indent();
        match case {
            Case::Constant(_, member) => {
                f.writeln("if (argumentCount == GETTER_)");
                f.indent();
                f.writeln(format!("return {};", arena.name(*member)));
                f.unindent();
                f.writeln("if (argumentCount == HAS_PROPERTY_)");
                f.indent();
                f.writeln("return true;");
                f.unindent();
            }
            Case::Attribute(owner, member) => {
                emit_attribute_case(arena, cfg, f, *owner, *member)?;
            }
            Case::Operations(entries) => {
                let overloaded = entries.len() > 1;
                for &(owner, member) in entries {
                    emit_operation_case(arena, cfg, f, owner, member, overloaded)?;
                }
                f.writeln("if (argumentCount == HAS_OPERATION_)");
                f.indent();
                f.writeln("return true;");
                f.unindent();
            }
        }
        if hash == 0 {
            done_selector_zero = true;
            emit_selector_zero(arena, f, stringifier);
        }
        f.writeln("return Any();");
        f.unindent();
    }
    if !done_selector_zero {
        f.writeln("case 0x0u:");
        f.indent();
        emit_selector_zero(arena, f, stringifier);
        f.writeln("return Any();");
        f.unindent();
    }
    f.writeln("default:");
    f.indent();
    f.writeln("break;");
    f.unindent();
    f.writeln("}");

    let data = arena.interface(interface).expect("interface node");
    match data.super_list.first() {
        Some(&base) if !arena.is_base_object(base, &opts.base_object) => {
            f.writeln(format!(
                "return {}::dispatch(self, selector, id, argumentCount, arguments);",
                cxx::scoped_name(arena, base, cfg)
            ));
        }
        _ => {
            f.writeln("return Any();");
        }
    }
    f.unindent();
    f.writeln("}");
    Ok(())
}

fn push_op(cases: &mut BTreeMap<u32, Case>, hash: u32, owner: NodeId, member: NodeId) {
    match cases.entry(hash).or_insert_with(|| Case::Operations(Vec::new())) {
        Case::Operations(entries) => entries.push((owner, member)),
        _ => {}
    }
}

fn emit_selector_zero(
    arena: &NodeArena,
    f: &mut Formatter,
    stringifier: Option<(NodeId, NodeId)>,
) {
    f.writeln("if (argumentCount == IS_KIND_OF_) {");
    f.indent();
    f.writeln("if (getPrefixedName() == id || !std::strcmp(getPrefixedName(), id)) {");
    f.indent();
    f.writeln("return true;");
    f.unindent();
    f.writeln("}");
    f.writeln("break;");
    f.unindent();
    f.writeln("}");
    if let Some((_, member)) = stringifier {
        f.writeln("if (argumentCount == STRINGIFY_)");
        f.indent();
        if matches!(arena.node(member).kind, NodeKind::Op(_)) {
            f.writeln(format!("return self->{}();", cxx::escape(arena.name(member))));
        } else {
            f.writeln(format!(
                "return self->get{}();",
                cxx::capitalize(arena.name(member))
            ));
        }
        f.unindent();
    }
}

fn emit_attribute_case(
    arena: &NodeArena,
    cfg: &EmitConfig,
    f: &mut Formatter,
    owner: NodeId,
    member: NodeId,
) -> Result<(), SemaError> {
    let data = arena.attribute(member).expect("attribute node");
    let attr = arena.node(member).attr;
    let replaceable = attr.intersects(Attr::REPLACEABLE);
    let cap = cxx::capitalize(arena.name(member));

    if attr.intersects(Attr::STRINGIFIER) {
        f.writeln("if (argumentCount == GETTER_ || argumentCount == 0)");
    } else {
        f.writeln("if (argumentCount == GETTER_)");
    }
    f.indent();
    f.writeln(format!("return self->get{cap}();"));
    f.unindent();

    if !data.readonly || data.put_forwards.is_some() || replaceable {
        let spec = data.spec;
        f.writeln("if (argumentCount == SETTER_) {");
        f.indent();
        let value = if replaceable || resolve::is_any(arena, owner, spec) {
            "arguments[0]".to_string()
        } else if resolve::is_string(arena, owner, spec) {
            "arguments[0].toString()".to_string()
        } else if resolve::is_interface(arena, owner, spec) {
            "arguments[0].toObject()".to_string()
        } else {
            let ty = cxx::cxx_type(arena, owner, spec, cfg)?;
            format!("static_cast<{ty}>(arguments[0])")
        };
        f.writeln(format!("self->set{cap}({value});"));
        f.writeln("return Any();");
        f.unindent();
        f.writeln("}");
    }

    f.writeln("if (argumentCount == HAS_PROPERTY_)");
    f.indent();
    f.writeln("return true;");
    f.unindent();
    Ok(())
}

fn emit_operation_case(
    arena: &NodeArena,
    cfg: &EmitConfig,
    f: &mut Formatter,
    owner: NodeId,
    member: NodeId,
    overloaded: bool,
) -> Result<(), SemaError> {
    let data = arena.op(member).expect("operation node");
    for stage in 0..data.method_count {
        emit_operation_stage(arena, cfg, f, owner, member, stage as usize, overloaded)?;
    }
    Ok(())
}

fn emit_operation_stage(
    arena: &NodeArena,
    cfg: &EmitConfig,
    f: &mut Formatter,
    owner: NodeId,
    member: NodeId,
    stage: usize,
    overloaded: bool,
) -> Result<(), SemaError> {
    let attr = arena.node(member).attr;
    let data = arena.op(member).expect("operation node");
    let params = arena.children(member).to_vec();
    let mut count = arena.op_param_count(member, stage) as usize;
    let variadic = params
        .iter()
        .take(count)
        .any(|&p| arena.node(p).attr.intersects(Attr::VARIADIC));

    // Count guard. Index specials answer their dedicated argument-count
    // codes; a variadic stage accepts anything at or beyond its fixed
    // arity.
    let mut guard = if attr.intersects(Attr::INDEX_MASK) {
        let special = match (
            attr.intersects(Attr::INDEX_GETTER),
            attr.intersects(Attr::INDEX_SETTER),
            attr.intersects(Attr::INDEX_CREATOR),
            attr.intersects(Attr::INDEX_DELETER),
        ) {
            (true, _, _, _) => "SPECIAL_GETTER_",
            (_, true, true, _) => "SPECIAL_SETTER_CREATOR_",
            (_, true, _, _) => "SPECIAL_SETTER_",
            (_, _, true, _) => "SPECIAL_CREATOR_",
            (_, _, _, true) => "SPECIAL_DELETER_",
            _ => "SPECIAL_GETTER_",
        };
        if attr.intersects(Attr::CALLER) {
            if variadic {
                count -= 1;
                format!("({count} <= argumentCount || argumentCount == {special})")
            } else {
                format!("(argumentCount == {count} || argumentCount == {special})")
            }
        } else {
            format!("argumentCount == {special}")
        }
    } else if variadic {
        count -= 1;
        format!("{count} <= argumentCount")
    } else {
        format!("argumentCount == {count}")
    };

    if overloaded {
        for (index, &param) in params.iter().take(count).enumerate() {
            let param_attr = arena.node(param).attr;
            if param_attr.intersects(Attr::ALLOW_ANY) {
                continue;
            }
            let spec = arena.param(param).expect("parameter node").spec;
            let mut check = if resolve::is_interface(arena, owner, spec) {
                if resolve::is_object(arena, owner, spec, &cfg.base_object) {
                    format!("arguments[{index}].isObject()")
                } else {
                    let ty = cxx::cxx_type(arena, owner, spec, cfg)?;
                    format!(
                        "arguments[{index}].isObject() && {ty}::hasInstance(arguments[{index}].toObject())"
                    )
                }
            } else if resolve::is_string(arena, owner, spec) {
                format!("arguments[{index}].isString()")
            } else {
                format!("arguments[{index}].isPrimitive()")
            };
            if param_attr.intersects(Attr::NULLABLE)
                || param_attr.intersects(Attr::NULL_IS_EMPTY)
            {
                check = format!("!arguments[{index}].hasValue() || {check}");
            }
            guard = format!("{guard} &&\n    ({check})");
        }
    }

    f.writeln(format!("if ({guard}) {{"));
    f.indent();
    let is_void = resolve::is_void(arena, owner, data.spec);
    let mut rendered = Vec::with_capacity(count);
    for (index, &param) in params.iter().take(arena.op_param_count(member, stage) as usize).enumerate() {
        let spec = arena.param(param).expect("parameter node").spec;
        let text = if arena.node(param).attr.intersects(Attr::VARIADIC) {
            let ty = cxx::cxx_type(arena, owner, spec, cfg)?;
            format!("Variadic<{ty}>(arguments + {index}, argumentCount - {index})")
        } else if resolve::is_any(arena, owner, spec) {
            format!("arguments[{index}]")
        } else if resolve::is_string(arena, owner, spec) {
            format!("arguments[{index}].toString()")
        } else if resolve::is_interface(arena, owner, spec) {
            if overloaded {
                let ty = cxx::cxx_type(arena, owner, spec, cfg)?;
                format!("interface_cast<{ty}*>(arguments[{index}].toObject())")
            } else {
                format!("arguments[{index}].toObject()")
            }
        } else {
            let ty = cxx::cxx_type(arena, owner, spec, cfg)?;
            format!("static_cast<{ty}>(arguments[{index}])")
        };
        rendered.push(text);
    }
    let call = if arena.node(member).attr.intersects(Attr::UNNAMED_PROPERTY) {
        format!("(*self)({})", rendered.join(", "))
    } else {
        format!(
            "self->{}({})",
            cxx::escape(arena.name(member)),
            rendered.join(", ")
        )
    };
    if is_void {
        f.writeln(format!("{call};"));
        f.writeln("return Any();");
    } else {
        f.writeln(format!("return {call};"));
    }
    f.unindent();
    f.writeln("}");
    Ok(())
}
