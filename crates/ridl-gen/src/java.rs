//! Java interface emission
//!
//! One `.java` file per standalone interface or exception: package
//! from the enclosing module chain, an interface with the overload
//! stages expanded, and exceptions as runtime-exception classes.

use ridl_ast::{Attr, NodeArena, NodeId, NodeKind};
use ridl_meta::MetaTables;
use ridl_sema::error::{loc_of, SemaError};
use ridl_sema::{eval, resolve, SemaOptions};

use crate::formatter::Formatter;
use crate::{Artifact, EmitConfig};

pub fn emit(
    arena: &NodeArena,
    opts: &SemaOptions,
    tables: &MetaTables,
    cfg: &EmitConfig,
    target: NodeId,
) -> Result<Artifact, SemaError> {
    let _ = (opts, tables);
    match &arena.node(target).kind {
        NodeKind::Exception(_) => emit_exception(arena, cfg, target),
        _ => emit_interface(arena, cfg, target),
    }
}

fn simple_name(arena: &NodeArena, cfg: &EmitConfig, id: NodeId) -> String {
    if arena.is_base_object(id, &cfg.base_object) {
        return cfg.object_type.clone();
    }
    if arena.is_constructor_interface(id) {
        let owner = arena.node(id).parent.expect("constructor owner");
        return format!("{}_{}", arena.name(owner), arena.name(id));
    }
    arena.name(id).to_string()
}

fn package(arena: &NodeArena, cfg: &EmitConfig, id: NodeId) -> Vec<String> {
    crate::namespace_chain(arena, cfg, id)
}

fn preamble(arena: &NodeArena, cfg: &EmitConfig, id: NodeId, f: &mut Formatter) {
    f.writeln("// Generated by ridl. Do not edit.");
    f.blank();
    let package = package(arena, cfg, id);
    if !package.is_empty() {
        f.writeln(format!("package {};", package.join(".")));
        f.blank();
    }
}

fn emit_interface(
    arena: &NodeArena,
    cfg: &EmitConfig,
    interface: NodeId,
) -> Result<Artifact, SemaError> {
    let path = crate::interface_path(arena, cfg, interface, "java");
    let mut f = Formatter::new(&cfg.indent);
    preamble(arena, cfg, interface, &mut f);

    if !arena.node(interface).doc.is_empty() {
        f.writeln(&arena.node(interface).doc);
    }
    let mut declaration = format!("public interface {}", simple_name(arena, cfg, interface));
    let data = arena.interface(interface).expect("interface node");
    let mut supers = Vec::new();
    if let Some(&base) = data.super_list.first() {
        if !arena.is_base_object(base, &cfg.base_object) {
            supers.push(simple_name(arena, cfg, base));
        }
    }
    for &mixin in &data.implement_list {
        supers.push(simple_name(arena, cfg, mixin));
    }
    if !supers.is_empty() {
        declaration.push_str(&format!(" extends {}", supers.join(", ")));
    }
    declaration.push_str(" {");
    f.writeln(declaration);
    f.indent();

    for (owner, member) in crate::dispatch_members(arena, interface) {
        match &arena.node(member).kind {
            NodeKind::Const(_) => emit_const(arena, cfg, &mut f, owner, member)?,
            NodeKind::Attribute(_) => emit_attribute(arena, cfg, &mut f, owner, member)?,
            NodeKind::Op(_) => emit_operation(arena, cfg, &mut f, owner, member)?,
            _ => {}
        }
    }

    f.unindent();
    f.writeln("}");
    Ok(Artifact {
        path,
        contents: f.finish(),
    })
}

fn emit_exception(
    arena: &NodeArena,
    cfg: &EmitConfig,
    exception: NodeId,
) -> Result<Artifact, SemaError> {
    let path = crate::interface_path(arena, cfg, exception, "java");
    let mut f = Formatter::new(&cfg.indent);
    preamble(arena, cfg, exception, &mut f);
    f.writeln(format!(
        "public class {} extends RuntimeException {{",
        arena.name(exception)
    ));
    f.indent();
    for &member in arena.children(exception) {
        match &arena.node(member).kind {
            NodeKind::Const(_) => emit_const(arena, cfg, &mut f, exception, member)?,
            NodeKind::Member(data) if !data.is_typedef => {
                let spec = data.spec.ok_or_else(|| SemaError::UnsupportedType {
                    name: arena.name(member).to_string(),
                    loc: loc_of(arena, member),
                })?;
                let ty = java_type(arena, cfg, exception, spec)?;
                f.writeln(format!("public {ty} {};", arena.name(member)));
            }
            _ => {}
        }
    }
    f.unindent();
    f.writeln("}");
    Ok(Artifact {
        path,
        contents: f.finish(),
    })
}

fn emit_const(
    arena: &NodeArena,
    cfg: &EmitConfig,
    f: &mut Formatter,
    owner: NodeId,
    member: NodeId,
) -> Result<(), SemaError> {
    let data = arena.constant(member).expect("constant node");
    let ty = resolve::deref(arena, owner, data.spec).ok_or_else(|| SemaError::Unresolved {
        name: arena.name(data.spec).to_string(),
        loc: loc_of(arena, member),
    })?;
    let rendered = java_type(arena, cfg, owner, ty)?;
    let value = match arena.name(ty) {
        "boolean" => eval::eval_boolean(arena, owner, data.expr)?.to_string(),
        "float" => format!("{}f", eval::eval_float(arena, owner, data.expr)? as f32),
        "double" => eval::eval_float(arena, owner, data.expr)?.to_string(),
        "long long" | "unsigned long long" => {
            format!("{}L", eval::eval_integer(arena, owner, data.expr)?)
        }
        _ => eval::eval_integer(arena, owner, data.expr)?.to_string(),
    };
    f.writeln(format!(
        "public static final {rendered} {} = {value};",
        arena.name(member)
    ));
    Ok(())
}

fn emit_attribute(
    arena: &NodeArena,
    cfg: &EmitConfig,
    f: &mut Formatter,
    owner: NodeId,
    member: NodeId,
) -> Result<(), SemaError> {
    let data = arena.attribute(member).expect("attribute node");
    let replaceable = arena.node(member).attr.intersects(Attr::REPLACEABLE);
    let cap = capitalize(arena.name(member));
    let getter_ty = if replaceable {
        "Object".to_string()
    } else {
        java_type(arena, cfg, owner, data.spec)?
    };
    f.writeln(format!("public {getter_ty} get{cap}();"));
    if data.readonly && data.put_forwards.is_none() && !replaceable {
        return Ok(());
    }
    let setter_ty = if replaceable {
        "Object".to_string()
    } else {
        java_type(arena, cfg, owner, data.spec)?
    };
    f.writeln(format!(
        "public void set{cap}({setter_ty} {});",
        arena.name(member)
    ));
    Ok(())
}

fn emit_operation(
    arena: &NodeArena,
    cfg: &EmitConfig,
    f: &mut Formatter,
    owner: NodeId,
    member: NodeId,
) -> Result<(), SemaError> {
    let data = arena.op(member).expect("operation node");
    let ret = java_type(arena, cfg, owner, data.spec)?;
    let throws = throws_clause(arena, owner, &data.raises)?;
    let params = arena.children(member).to_vec();
    for stage in 0..data.method_count {
        let count = arena.op_param_count(member, stage as usize) as usize;
        let mut rendered = Vec::with_capacity(count);
        for &param in params.iter().take(count) {
            let spec = arena.param(param).expect("parameter node").spec;
            let mut ty = java_type(arena, cfg, owner, spec)?;
            if arena.node(param).attr.intersects(Attr::VARIADIC) {
                ty.push_str("...");
            }
            rendered.push(format!("{ty} {}", arena.name(param)));
        }
        f.writeln(format!(
            "public {ret} {}({}){throws};",
            arena.name(member),
            rendered.join(", ")
        ));
    }
    Ok(())
}

fn throws_clause(
    arena: &NodeArena,
    scope: NodeId,
    raises: &[NodeId],
) -> Result<String, SemaError> {
    if raises.is_empty() {
        return Ok(String::new());
    }
    let mut names = Vec::new();
    for &exception in raises {
        let resolved =
            resolve::search_scoped(arena, scope, exception).ok_or_else(|| {
                SemaError::Unresolved {
                    name: arena.name(exception).to_string(),
                    loc: loc_of(arena, exception),
                }
            })?;
        names.push(arena.name(resolved).to_string());
    }
    Ok(format!(" throws {}", names.join(", ")))
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn java_type(
    arena: &NodeArena,
    cfg: &EmitConfig,
    scope: NodeId,
    id: NodeId,
) -> Result<String, SemaError> {
    let node = arena.node(id);
    let nullable = node.attr.intersects(Attr::NULLABLE);
    match &node.kind {
        NodeKind::Type => {
            let rendered = match node.name.as_str() {
                "void" => "void",
                "boolean" => {
                    if nullable {
                        "Boolean"
                    } else {
                        "boolean"
                    }
                }
                "octet" | "byte" | "unsigned byte" => {
                    if nullable {
                        "Byte"
                    } else {
                        "byte"
                    }
                }
                "short" | "unsigned short" => {
                    if nullable {
                        "Short"
                    } else {
                        "short"
                    }
                }
                "long" | "unsigned long" => {
                    if nullable {
                        "Integer"
                    } else {
                        "int"
                    }
                }
                "long long" | "unsigned long long" | "Date" => {
                    if nullable {
                        "Long"
                    } else {
                        "long"
                    }
                }
                "float" => {
                    if nullable {
                        "Float"
                    } else {
                        "float"
                    }
                }
                "double" => {
                    if nullable {
                        "Double"
                    } else {
                        "double"
                    }
                }
                "string" => "String",
                "any" => "Object",
                other => {
                    return Err(SemaError::UnsupportedType {
                        name: other.to_string(),
                        loc: loc_of(arena, id),
                    })
                }
            };
            Ok(rendered.to_string())
        }
        NodeKind::Sequence(data) => {
            let element = java_type(arena, cfg, scope, data.spec)?;
            Ok(format!("{element}[]"))
        }
        NodeKind::Array(data) => {
            let element = java_type(arena, cfg, scope, data.spec)?;
            Ok(format!("{element}[]"))
        }
        NodeKind::ScopedName => {
            let resolved = resolve::search_scoped(arena, scope, id).ok_or_else(|| {
                SemaError::Unresolved {
                    name: node.name.clone(),
                    loc: loc_of(arena, id),
                }
            })?;
            match &arena.node(resolved).kind {
                NodeKind::Interface(_) | NodeKind::Exception(_) => {
                    Ok(simple_name(arena, cfg, resolved))
                }
                NodeKind::Member(member) if member.is_typedef => {
                    let spec = member.spec.ok_or_else(|| SemaError::UnsupportedType {
                        name: node.name.clone(),
                        loc: loc_of(arena, id),
                    })?;
                    let inner = arena.node(resolved).parent.unwrap_or_else(|| arena.root());
                    java_type(arena, cfg, inner, spec)
                }
                _ => {
                    let inner = arena.node(resolved).parent.unwrap_or_else(|| arena.root());
                    java_type(arena, cfg, inner, resolved)
                }
            }
        }
        _ => Err(SemaError::UnsupportedType {
            name: node.name.clone(),
            loc: loc_of(arena, id),
        }),
    }
}
