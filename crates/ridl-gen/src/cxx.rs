//! Shared C++ emission helpers: type mapping, identifier escaping, and
//! scoped-name rendering.

use ridl_ast::{Attr, NodeArena, NodeId, NodeKind};
use ridl_sema::error::{loc_of, SemaError};
use ridl_sema::resolve;

use crate::EmitConfig;

/// C++ keywords that collide with legal IDL identifiers.
const KEYWORDS: [&str; 14] = [
    "class", "default", "delete", "export", "friend", "namespace", "new", "operator", "private",
    "protected", "public", "template", "this", "virtual",
];

/// Escape an identifier that would collide with a C++ keyword.
pub fn escape(name: &str) -> String {
    if KEYWORDS.contains(&name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

/// `name` with its first character upper-cased; used for getter/setter
/// method names.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// The unqualified class name of an interface, with the base object
/// replaced by the configured concrete class. A constructor
/// pseudo-interface is named after its owner.
pub fn class_name(arena: &NodeArena, id: NodeId, cfg: &EmitConfig) -> String {
    if arena.is_base_object(id, &cfg.base_object) {
        return cfg.object_type.clone();
    }
    if arena.is_constructor_interface(id) {
        let owner = arena.node(id).parent.expect("constructor owner");
        return format!("{}_{}", escape(arena.name(owner)), arena.name(id));
    }
    escape(arena.name(id))
}

/// Fully scoped C++ name of an interface or exception, using the same
/// prefixed naming the namespace chains are opened with.
pub fn scoped_name(arena: &NodeArena, id: NodeId, cfg: &EmitConfig) -> String {
    if arena.is_base_object(id, &cfg.base_object) {
        return cfg.object_type.clone();
    }
    if arena.is_constructor_interface(id) {
        let owner = arena.node(id).parent.expect("constructor owner");
        return format!(
            "{}_{}",
            scoped_name(arena, owner, cfg),
            arena.name(id)
        );
    }
    arena.prefixed_name(id, &cfg.default_prefix)
}

/// Render a type reference as C++.
pub fn cxx_type(
    arena: &NodeArena,
    scope: NodeId,
    id: NodeId,
    cfg: &EmitConfig,
) -> Result<String, SemaError> {
    let node = arena.node(id);
    match &node.kind {
        NodeKind::Type => {
            let base = match node.name.as_str() {
                "void" => "void".to_string(),
                "boolean" => "bool".to_string(),
                "octet" | "unsigned byte" => "unsigned char".to_string(),
                "byte" => "signed char".to_string(),
                "short" => "short".to_string(),
                "unsigned short" => "unsigned short".to_string(),
                "long" => "int".to_string(),
                "unsigned long" => "unsigned int".to_string(),
                "long long" => "long long".to_string(),
                "unsigned long long" => "unsigned long long".to_string(),
                "float" => "float".to_string(),
                "double" => "double".to_string(),
                "any" => "Any".to_string(),
                "string" => cfg.string_type.clone(),
                "Date" => "unsigned long long".to_string(),
                other => other.to_string(),
            };
            if node.attr.intersects(Attr::NULLABLE) {
                Ok(format!("Nullable<{base}>"))
            } else {
                Ok(base)
            }
        }
        NodeKind::NativeType => {
            if node.name == "void_pointer" {
                Ok("void*".to_string())
            } else {
                Err(SemaError::UnsupportedType {
                    name: node.name.clone(),
                    loc: loc_of(arena, id),
                })
            }
        }
        NodeKind::Sequence(data) => {
            let element = cxx_type(arena, scope, data.spec, cfg)?;
            Ok(format!("Sequence<{element}>"))
        }
        NodeKind::Array(data) => {
            let element = cxx_type(arena, scope, data.spec, cfg)?;
            Ok(format!("ObjectArray<{element}>"))
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
                    Ok(scoped_name(arena, resolved, cfg))
                }
                NodeKind::Member(member) if member.is_typedef => {
                    let spec = member.spec.ok_or_else(|| SemaError::UnsupportedType {
                        name: node.name.clone(),
                        loc: loc_of(arena, id),
                    })?;
                    let inner = arena.node(resolved).parent.unwrap_or_else(|| arena.root());
                    cxx_type(arena, inner, spec, cfg)
                }
                _ => {
                    let inner = arena.node(resolved).parent.unwrap_or_else(|| arena.root());
                    cxx_type(arena, inner, resolved, cfg)
                }
            }
        }
        _ => Err(SemaError::UnsupportedType {
            name: node.name.clone(),
            loc: loc_of(arena, id),
        }),
    }
}

/// Parameter rendering: interface types pass as pointers, variadic
/// parameters as `Variadic<T>`, strings by const reference.
pub fn cxx_param_type(
    arena: &NodeArena,
    scope: NodeId,
    param: NodeId,
    cfg: &EmitConfig,
) -> Result<String, SemaError> {
    let data = arena.param(param).expect("parameter node");
    let base = cxx_type(arena, scope, data.spec, cfg)?;
    let rendered = if resolve::is_interface(arena, scope, data.spec) {
        format!("{base}*")
    } else if resolve::is_string(arena, scope, data.spec) {
        format!("const {base}&")
    } else {
        base
    };
    if arena.node(param).attr.intersects(Attr::VARIADIC) {
        let element = cxx_type(arena, scope, data.spec, cfg)?;
        return Ok(format!("Variadic<{element}>"));
    }
    Ok(rendered)
}

/// Return-type rendering: interface values come back as pointers.
pub fn cxx_return_type(
    arena: &NodeArena,
    scope: NodeId,
    spec: NodeId,
    cfg: &EmitConfig,
) -> Result<String, SemaError> {
    let base = cxx_type(arena, scope, spec, cfg)?;
    if resolve::is_interface(arena, scope, spec) {
        Ok(format!("{base}*"))
    } else {
        Ok(base)
    }
}

/// Render the expression extracting argument `index` from an `Any`
/// array as the given type.
pub fn any_argument(
    arena: &NodeArena,
    scope: NodeId,
    spec: NodeId,
    index: usize,
    cfg: &EmitConfig,
) -> Result<String, SemaError> {
    if resolve::is_any(arena, scope, spec) {
        Ok(format!("arguments[{index}]"))
    } else if resolve::is_string(arena, scope, spec) {
        Ok(format!("arguments[{index}].toString()"))
    } else if resolve::is_interface(arena, scope, spec) {
        Ok(format!("arguments[{index}].toObject()"))
    } else {
        let ty = cxx_type(arena, scope, spec, cfg)?;
        Ok(format!("static_cast<{ty}>(arguments[{index}])"))
    }
}

/// Escape a meta string for embedding in a C++ string literal.
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
