//! Constant expression evaluation
//!
//! Folds the expression tree of a `const` declaration. A literal that
//! the numeric parser cannot fully consume is a fatal diagnostic, not a
//! silently unspecified value.

use ridl_ast::{NodeArena, NodeId, NodeKind};

use crate::error::{loc_of, SemaError};
use crate::resolve;

/// Evaluate an integer-typed constant expression.
pub fn eval_integer(arena: &NodeArena, scope: NodeId, id: NodeId) -> Result<i64, SemaError> {
    match &arena.node(id).kind {
        NodeKind::Literal => parse_integer(arena.name(id)).ok_or_else(|| SemaError::BadLiteral {
            text: arena.name(id).to_string(),
            loc: loc_of(arena, id),
        }),
        NodeKind::ScopedName => {
            let target = resolve_const(arena, scope, id)?;
            let (expr, inner) = target;
            eval_integer(arena, inner, expr)
        }
        NodeKind::UnaryExpr => {
            let value = eval_integer(arena, scope, arena.children(id)[0])?;
            match arena.name(id) {
                "-" => Ok(value.wrapping_neg()),
                "~" => Ok(!value),
                op => Err(SemaError::BadOperator {
                    op: op.to_string(),
                    loc: loc_of(arena, id),
                }),
            }
        }
        NodeKind::BinaryExpr => {
            let left = eval_integer(arena, scope, arena.children(id)[0])?;
            let right = eval_integer(arena, scope, arena.children(id)[1])?;
            let zero_division = || SemaError::BadLiteral {
                text: "division by zero".to_string(),
                loc: loc_of(arena, id),
            };
            match arena.name(id) {
                "|" => Ok(left | right),
                "^" => Ok(left ^ right),
                "&" => Ok(left & right),
                ">>" => Ok(left.wrapping_shr(right as u32)),
                "<<" => Ok(left.wrapping_shl(right as u32)),
                "+" => Ok(left.wrapping_add(right)),
                "-" => Ok(left.wrapping_sub(right)),
                "*" => Ok(left.wrapping_mul(right)),
                "/" => left.checked_div(right).ok_or_else(zero_division),
                "%" => left.checked_rem(right).ok_or_else(zero_division),
                op => Err(SemaError::BadOperator {
                    op: op.to_string(),
                    loc: loc_of(arena, id),
                }),
            }
        }
        _ => Err(SemaError::BadOperator {
            op: arena.name(id).to_string(),
            loc: loc_of(arena, id),
        }),
    }
}

/// Evaluate a floating-point constant expression.
pub fn eval_float(arena: &NodeArena, scope: NodeId, id: NodeId) -> Result<f64, SemaError> {
    match &arena.node(id).kind {
        NodeKind::Literal => {
            let text = arena.name(id);
            text.parse::<f64>().map_err(|_| SemaError::BadLiteral {
                text: text.to_string(),
                loc: loc_of(arena, id),
            })
        }
        NodeKind::ScopedName => {
            let (expr, inner) = resolve_const(arena, scope, id)?;
            eval_float(arena, inner, expr)
        }
        NodeKind::UnaryExpr => {
            let value = eval_float(arena, scope, arena.children(id)[0])?;
            match arena.name(id) {
                "-" => Ok(-value),
                op => Err(SemaError::BadOperator {
                    op: op.to_string(),
                    loc: loc_of(arena, id),
                }),
            }
        }
        NodeKind::BinaryExpr => {
            let left = eval_float(arena, scope, arena.children(id)[0])?;
            let right = eval_float(arena, scope, arena.children(id)[1])?;
            match arena.name(id) {
                "+" => Ok(left + right),
                "-" => Ok(left - right),
                "*" => Ok(left * right),
                "/" => Ok(left / right),
                op => Err(SemaError::BadOperator {
                    op: op.to_string(),
                    loc: loc_of(arena, id),
                }),
            }
        }
        _ => Err(SemaError::BadOperator {
            op: arena.name(id).to_string(),
            loc: loc_of(arena, id),
        }),
    }
}

/// Evaluate a boolean constant expression.
pub fn eval_boolean(arena: &NodeArena, scope: NodeId, id: NodeId) -> Result<bool, SemaError> {
    match &arena.node(id).kind {
        NodeKind::Literal => match arena.name(id) {
            "true" => Ok(true),
            "false" => Ok(false),
            text => Err(SemaError::BadLiteral {
                text: text.to_string(),
                loc: loc_of(arena, id),
            }),
        },
        NodeKind::ScopedName => {
            let (expr, inner) = resolve_const(arena, scope, id)?;
            eval_boolean(arena, inner, expr)
        }
        _ => Err(SemaError::BadOperator {
            op: arena.name(id).to_string(),
            loc: loc_of(arena, id),
        }),
    }
}

/// A scoped name in a constant expression must land on another const
/// declaration; evaluation continues with that declaration's
/// expression in its own scope.
fn resolve_const(
    arena: &NodeArena,
    scope: NodeId,
    id: NodeId,
) -> Result<(NodeId, NodeId), SemaError> {
    let name = arena.name(id).to_string();
    let resolved =
        resolve::search_scoped(arena, scope, id).ok_or_else(|| SemaError::Unresolved {
            name: name.clone(),
            loc: loc_of(arena, id),
        })?;
    match arena.constant(resolved) {
        Some(data) => {
            let inner = arena.node(resolved).parent.unwrap_or_else(|| arena.root());
            Ok((data.expr, inner))
        }
        None => Err(SemaError::Unresolved {
            name,
            loc: loc_of(arena, id),
        }),
    }
}

/// Parse an integer literal the way the IDL grammar spells them:
/// `0x`/`0X` hexadecimal, leading-`0` octal, decimal otherwise. The
/// whole text must be consumed.
fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let (digits, radix) = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        (hex, 16)
    } else if text.len() > 1 && text.starts_with('0') {
        (&text[1..], 8)
    } else {
        (text, 10)
    };
    match i64::from_str_radix(digits, radix) {
        Ok(value) => Some(value),
        // Large unsigned constants still fit the wire format.
        Err(_) => u64::from_str_radix(digits, radix).ok().map(|v| v as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridl_ast::doc::{lower_expr, Expr};

    fn literal(text: &str) -> Expr {
        Expr::Literal {
            text: text.to_string(),
        }
    }

    fn eval(expr: &Expr) -> Result<i64, SemaError> {
        let mut arena = NodeArena::new();
        let id = lower_expr(&mut arena, expr, 0, 1);
        eval_integer(&arena, arena.root(), id)
    }

    #[test]
    fn test_integer_radixes() {
        assert_eq!(eval(&literal("42")).unwrap(), 42);
        assert_eq!(eval(&literal("0x10")).unwrap(), 16);
        assert_eq!(eval(&literal("010")).unwrap(), 8);
    }

    #[test]
    fn test_folding() {
        let expr = Expr::Binary {
            op: "|".to_string(),
            left: Box::new(Expr::Binary {
                op: "<<".to_string(),
                left: Box::new(literal("1")),
                right: Box::new(literal("4")),
            }),
            right: Box::new(literal("3")),
        };
        assert_eq!(eval(&expr).unwrap(), 19);
    }

    #[test]
    fn test_unary() {
        let expr = Expr::Unary {
            op: "-".to_string(),
            expr: Box::new(literal("7")),
        };
        assert_eq!(eval(&expr).unwrap(), -7);
    }

    #[test]
    fn test_malformed_literal_is_fatal() {
        assert!(matches!(
            eval(&literal("12abc")),
            Err(SemaError::BadLiteral { .. })
        ));
        assert!(matches!(
            eval(&literal("")),
            Err(SemaError::BadLiteral { .. })
        ));
    }

    #[test]
    fn test_division_by_zero_is_fatal() {
        let expr = Expr::Binary {
            op: "/".to_string(),
            left: Box::new(literal("1")),
            right: Box::new(literal("0")),
        };
        assert!(eval(&expr).is_err());
    }

    #[test]
    fn test_float_literal() {
        let mut arena = NodeArena::new();
        let id = lower_expr(&mut arena, &literal("2.5"), 0, 1);
        assert_eq!(eval_float(&arena, arena.root(), id).unwrap(), 2.5);
    }

    #[test]
    fn test_boolean_literal() {
        let mut arena = NodeArena::new();
        let id = lower_expr(&mut arena, &literal("true"), 0, 1);
        assert!(eval_boolean(&arena, arena.root(), id).unwrap());
    }
}
