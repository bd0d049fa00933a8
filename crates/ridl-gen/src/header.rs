//! C++ pure-interface header emission
//!
//! One header per standalone interface: include preamble computed by
//! the forward-declaration collector, namespace nesting from the
//! scoped name, a pure-virtual class with supplemental members spliced
//! inline, constants, and the embedded reflection block (meta string,
//! symbol table, `hasInstance`).

use std::path::Path;

use ridl_ast::{Attr, NodeArena, NodeId, NodeKind};
use ridl_meta::MetaTables;
use ridl_sema::error::{loc_of, SemaError};
use ridl_sema::{eval, resolve, SemaOptions};

use crate::formatter::Formatter;
use crate::{cxx, forward, Artifact, EmitConfig};

pub fn emit(
    arena: &NodeArena,
    opts: &SemaOptions,
    tables: &MetaTables,
    cfg: &EmitConfig,
    interface: NodeId,
) -> Result<Artifact, SemaError> {
    let path = crate::interface_path(arena, cfg, interface, "h");
    let guard = guard_name(&path);
    let info = forward::collect_for_interface(arena, opts, interface)?;
    let namespaces = crate::namespace_chain(arena, cfg, interface);
    let class_name = cxx::class_name(arena, interface, cfg);

    let mut f = Formatter::new(&cfg.indent);
    f.writeln("// Generated by ridl. Do not edit.");
    f.blank();
    f.writeln(format!("#ifndef {guard}"));
    f.writeln(format!("#define {guard}"));
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
    if !namespaces.is_empty() {
        f.blank();
    }
    for &fwd in &info.forwards {
        f.writeln(format!("class {};", cxx::escape(arena.name(fwd))));
    }
    for &typedef in &info.typedefs {
        emit_typedef(arena, cfg, &mut f, typedef)?;
    }
    if !info.forwards.is_empty() || !info.typedefs.is_empty() {
        f.blank();
    }

    let base = base_class(arena, cfg, interface)?;
    f.writeln(format!("class {class_name} : public {base} {{"));
    f.writeln("public:");
    f.indent();
    f.writeln(format!("virtual ~{class_name}() {{}}"));
    f.blank();

    for (owner, member) in crate::dispatch_members(arena, interface) {
        match &arena.node(member).kind {
            NodeKind::Const(_) => emit_const(arena, cfg, &mut f, owner, member)?,
            NodeKind::Attribute(_) => emit_attribute(arena, cfg, &mut f, owner, member)?,
            NodeKind::Op(_) => emit_operation(arena, cfg, &mut f, owner, member)?,
            _ => {}
        }
    }

    emit_reflection(arena, cfg, tables, &mut f, interface);
    f.unindent();
    f.writeln("};");
    if !namespaces.is_empty() {
        f.blank();
    }
    for namespace in namespaces.iter().rev() {
        f.writeln(format!("}} // namespace {}", cxx::escape(namespace)));
    }
    f.blank();
    f.writeln(format!("#endif // {guard}"));

    Ok(Artifact {
        path,
        contents: f.finish(),
    })
}

/// Exceptions are plain value classes: constants plus public fields.
pub fn emit_exception(
    arena: &NodeArena,
    cfg: &EmitConfig,
    exception: NodeId,
) -> Result<Artifact, SemaError> {
    let path = crate::interface_path(arena, cfg, exception, "h");
    let guard = guard_name(&path);
    let namespaces = crate::namespace_chain(arena, cfg, exception);
    let name = cxx::escape(arena.name(exception));

    let mut f = Formatter::new(&cfg.indent);
    f.writeln("// Generated by ridl. Do not edit.");
    f.blank();
    f.writeln(format!("#ifndef {guard}"));
    f.writeln(format!("#define {guard}"));
    f.blank();
    for namespace in &namespaces {
        f.writeln(format!("namespace {} {{", cxx::escape(namespace)));
    }
    f.blank();
    f.writeln(format!("struct {name} {{"));
    f.indent();
    for &member in arena.children(exception) {
        match &arena.node(member).kind {
            NodeKind::Const(_) => emit_const(arena, cfg, &mut f, exception, member)?,
            NodeKind::Member(data) if !data.is_typedef => {
                let spec = data.spec.ok_or_else(|| SemaError::UnsupportedType {
                    name: arena.name(member).to_string(),
                    loc: loc_of(arena, member),
                })?;
                let ty = cxx::cxx_type(arena, exception, spec, cfg)?;
                f.writeln(format!("{ty} {};", cxx::escape(arena.name(member))));
            }
            _ => {}
        }
    }
    f.unindent();
    f.writeln("};");
    f.blank();
    for namespace in namespaces.iter().rev() {
        f.writeln(format!("}} // namespace {}", cxx::escape(namespace)));
    }
    f.blank();
    f.writeln(format!("#endif // {guard}"));
    Ok(Artifact {
        path,
        contents: f.finish(),
    })
}

fn guard_name(path: &Path) -> String {
    let mut guard = String::new();
    for c in path.display().to_string().chars() {
        if c.is_ascii_alphanumeric() {
            guard.push(c.to_ascii_uppercase());
        } else {
            guard.push('_');
        }
    }
    guard.push_str("_INCLUDED");
    guard
}

/// The direct base class: the resolved super interface, or the
/// configured object type when there is none.
fn base_class(
    arena: &NodeArena,
    cfg: &EmitConfig,
    interface: NodeId,
) -> Result<String, SemaError> {
    let data = arena.interface(interface).expect("interface node");
    match data.super_list.first() {
        Some(&base) => Ok(cxx::scoped_name(arena, base, cfg)),
        None => Ok(cfg.object_type.clone()),
    }
}

fn emit_typedef(
    arena: &NodeArena,
    cfg: &EmitConfig,
    f: &mut Formatter,
    typedef: NodeId,
) -> Result<(), SemaError> {
    let spec = arena
        .member(typedef)
        .and_then(|m| m.spec)
        .ok_or_else(|| SemaError::UnsupportedType {
            name: arena.name(typedef).to_string(),
            loc: loc_of(arena, typedef),
        })?;
    let scope = arena.node(typedef).parent.unwrap_or_else(|| arena.root());
    let ty = cxx::cxx_type(arena, scope, spec, cfg)?;
    f.writeln(format!("typedef {ty} {};", cxx::escape(arena.name(typedef))));
    Ok(())
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
    let rendered = cxx::cxx_type(arena, owner, ty, cfg)?;
    let value = const_value(arena, owner, ty, data.expr)?;
    f.writeln(format!(
        "static const {rendered} {} = {value};",
        arena.name(member)
    ));
    Ok(())
}

/// Render a constant's folded value in its declared width.
pub fn const_value(
    arena: &NodeArena,
    scope: NodeId,
    ty: NodeId,
    expr: NodeId,
) -> Result<String, SemaError> {
    let value = match arena.name(ty) {
        "boolean" => {
            if eval::eval_boolean(arena, scope, expr)? {
                "true".to_string()
            } else {
                "false".to_string()
            }
        }
        "octet" | "unsigned byte" => (eval::eval_integer(arena, scope, expr)? as u8).to_string(),
        "byte" => (eval::eval_integer(arena, scope, expr)? as i8).to_string(),
        "short" => (eval::eval_integer(arena, scope, expr)? as i16).to_string(),
        "unsigned short" => (eval::eval_integer(arena, scope, expr)? as u16).to_string(),
        "long" => (eval::eval_integer(arena, scope, expr)? as i32).to_string(),
        "unsigned long" => (eval::eval_integer(arena, scope, expr)? as u32).to_string(),
        "long long" => eval::eval_integer(arena, scope, expr)?.to_string(),
        "unsigned long long" => (eval::eval_integer(arena, scope, expr)? as u64).to_string(),
        "float" => format!("{}", eval::eval_float(arena, scope, expr)? as f32),
        "double" => format!("{}", eval::eval_float(arena, scope, expr)?),
        other => {
            return Err(SemaError::BadConstType {
                ty: other.to_string(),
                loc: loc_of(arena, ty),
            })
        }
    };
    Ok(value)
}

fn throw_spec(
    arena: &NodeArena,
    cfg: &EmitConfig,
    scope: NodeId,
    raises: &[NodeId],
) -> Result<String, SemaError> {
    if !cfg.use_exceptions || raises.is_empty() {
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
        names.push(cxx::scoped_name(arena, resolved, cfg));
    }
    Ok(format!(" throw({})", names.join(", ")))
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
    let cap = cxx::capitalize(arena.name(member));
    let argument = cxx::escape(arena.name(member));

    let getter_ty = if replaceable {
        "Any".to_string()
    } else {
        cxx::cxx_return_type(arena, owner, data.spec, cfg)?
    };
    let getter_throw = throw_spec(arena, cfg, owner, &data.get_raises)?;
    f.writeln(format!("virtual {getter_ty} get{cap}(){getter_throw} = 0;"));

    if data.readonly && data.put_forwards.is_none() && !replaceable {
        return Ok(());
    }
    let setter_ty = if replaceable {
        "Any".to_string()
    } else {
        cxx::cxx_return_type(arena, owner, data.spec, cfg)?
    };
    let setter_throw = throw_spec(arena, cfg, owner, &data.set_raises)?;
    f.writeln(format!(
        "virtual void set{cap}({setter_ty} {argument}){setter_throw} = 0;"
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
    let ret = cxx::cxx_return_type(arena, owner, data.spec, cfg)?;
    let throw = throw_spec(arena, cfg, owner, &data.raises)?;
    let name = cxx::escape(arena.name(member));
    let params = arena.children(member).to_vec();
    for stage in 0..data.method_count {
        let count = arena.op_param_count(member, stage as usize) as usize;
        let mut rendered = Vec::with_capacity(count);
        for &param in params.iter().take(count) {
            let ty = cxx::cxx_param_type(arena, owner, param, cfg)?;
            rendered.push(format!("{ty} {}", cxx::escape(arena.name(param))));
        }
        f.writeln(format!(
            "virtual {ret} {name}({}){throw} = 0;",
            rendered.join(", ")
        ));
    }
    Ok(())
}

pub(crate) fn emit_reflection(
    arena: &NodeArena,
    cfg: &EmitConfig,
    tables: &MetaTables,
    f: &mut Formatter,
    interface: NodeId,
) {
    let meta = tables
        .assembled
        .get(&interface)
        .cloned()
        .unwrap_or_default();
    let prefixed = format!("::{}", arena.prefixed_name(interface, &cfg.default_prefix));
    f.blank();
    f.writeln("// Reflection");
    f.writeln("static const char* getPrefixedName() {");
    f.indent();
    f.writeln(format!(
        "static const char* const prefixedName = {};",
        cxx::string_literal(&prefixed)
    ));
    f.writeln("return prefixedName;");
    f.unindent();
    f.writeln("}");
    f.writeln("static const char* getMetaData() {");
    f.indent();
    f.writeln(format!(
        "static const char* const metaData = {};",
        cxx::string_literal(&meta)
    ));
    f.writeln("return metaData;");
    f.unindent();
    f.writeln("}");
    f.writeln("static const Reflect::SymbolData* getSymbolTable() {");
    f.indent();
    f.writeln("static const Reflect::SymbolData symbolTable[] = {");
    f.indent();
    if let Some(symbols) = tables.symbols.get(&interface) {
        for entry in symbols {
            f.writeln(format!(
                "{{ {}, {}, {} }},",
                cxx::string_literal(&entry.name),
                entry.offset,
                entry.number
            ));
        }
    }
    f.writeln("{ 0, 0, 0 }");
    f.unindent();
    f.writeln("};");
    f.writeln("return symbolTable;");
    f.unindent();
    f.writeln("}");
    f.writeln(format!("static bool hasInstance({}* object) {{", cfg.object_type));
    f.indent();
    f.writeln("return object && static_cast<bool>(object->message_(0, getPrefixedName(), IS_KIND_OF_, 0));");
    f.unindent();
    f.writeln("}");
}
