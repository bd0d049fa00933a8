//! Meta-string decoding
//!
//! The consumer-side view of the reflection encoding: a zero-copy
//! cursor over the string produced by [`crate::synth`]. The dispatch
//! runtime reads the same grammar; here it backs the round-trip tests
//! and any tooling that wants to inspect generated metadata.

use crate::tags;

/// Read a decimal run, returning the remaining text and the value.
pub fn skip_digits(info: &str) -> (&str, u32) {
    let end = info
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(info.len());
    let value = info[..end].parse().unwrap_or(0);
    (&info[end..], value)
}

/// Read a length-prefixed name, returning the name and the rest.
pub fn read_name(info: &str) -> (&str, &str) {
    let (rest, length) = skip_digits(info);
    let length = length as usize;
    if length <= rest.len() {
        (&rest[..length], &rest[length..])
    } else {
        (rest, "")
    }
}

/// Skip one type record; `None` when the text is not a type.
pub fn skip_type(info: &str) -> Option<&str> {
    let mut chars = info.chars();
    let tag = chars.next()?;
    let rest = chars.as_str();
    match tag {
        tags::VOID | tags::ANY | tags::POINTER | tags::DATE => Some(rest),
        tags::BOOLEAN
        | tags::BYTE
        | tags::OCTET
        | tags::SHORT
        | tags::UNSIGNED_SHORT
        | tags::LONG
        | tags::UNSIGNED_LONG
        | tags::LONG_LONG
        | tags::UNSIGNED_LONG_LONG
        | tags::FLOAT
        | tags::DOUBLE
        | tags::STRING => Some(skip_nullable(rest)),
        tags::SEQUENCE | tags::ARRAY => {
            let (rest, _) = skip_digits(rest);
            let rest = skip_type(rest)?;
            Some(skip_nullable(rest))
        }
        tags::OBJECT => {
            let (_, rest) = read_name(rest);
            Some(rest)
        }
        _ => None,
    }
}

fn skip_nullable(info: &str) -> &str {
    info.strip_prefix(tags::NULLABLE).unwrap_or(info)
}

fn skip_name(info: &str) -> &str {
    read_name(info).1
}

/// A decoded type record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Type<'a> {
    info: &'a str,
}

impl<'a> Type<'a> {
    pub fn new(info: &'a str) -> Self {
        Type { info }
    }

    pub fn tag(&self) -> char {
        self.info.chars().next().unwrap_or('\0')
    }

    pub fn is_object(&self) -> bool {
        self.tag() == tags::OBJECT
    }

    pub fn is_nullable(&self) -> bool {
        match self.tag() {
            tags::BOOLEAN
            | tags::BYTE
            | tags::OCTET
            | tags::SHORT
            | tags::UNSIGNED_SHORT
            | tags::LONG
            | tags::UNSIGNED_LONG
            | tags::LONG_LONG
            | tags::UNSIGNED_LONG_LONG
            | tags::FLOAT
            | tags::DOUBLE
            | tags::STRING => self.info[1..].starts_with(tags::NULLABLE),
            _ => false,
        }
    }

    /// Qualified interface name of an object type, empty otherwise.
    pub fn qualified_name(&self) -> &'a str {
        if !self.is_object() {
            return "";
        }
        read_name(&self.info[1..]).0
    }
}

/// A decoded operation, getter, setter, or constructor record.
#[derive(Debug, Clone, Copy)]
pub struct Method<'a> {
    info: &'a str,
}

impl<'a> Method<'a> {
    pub fn new(info: &'a str) -> Self {
        Method { info }
    }

    pub fn kind(&self) -> char {
        self.info.chars().next().unwrap_or('\0')
    }

    pub fn is_operation(&self) -> bool {
        self.kind() == tags::OPERATION
    }

    pub fn is_getter(&self) -> bool {
        self.kind() == tags::GETTER
    }

    pub fn is_setter(&self) -> bool {
        self.kind() == tags::SETTER
    }

    pub fn is_constructor(&self) -> bool {
        self.kind() == tags::CONSTRUCTOR
    }

    fn specials(&self) -> &'a str {
        let body = &self.info[1..];
        let end = body
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(body.len());
        &body[..end]
    }

    fn after_specials(&self) -> &'a str {
        let body = &self.info[1..];
        let end = body
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(body.len());
        &body[end..]
    }

    pub fn has_special(&self, special: char) -> bool {
        self.specials().contains(special)
    }

    pub fn is_variadic(&self) -> bool {
        self.has_special(tags::VARIADIC)
    }

    pub fn parameter_count(&self) -> u32 {
        skip_digits(self.after_specials()).1
    }

    pub fn return_type(&self) -> Type<'a> {
        Type::new(skip_digits(self.after_specials()).0)
    }

    pub fn name(&self) -> &'a str {
        let rest = skip_digits(self.after_specials()).0;
        let rest = skip_type(rest).unwrap_or("");
        read_name(rest).0
    }

    /// Decoded `(type, name)` parameter records in declaration order.
    pub fn parameters(&self) -> Vec<(Type<'a>, &'a str)> {
        let count = self.parameter_count();
        let rest = skip_digits(self.after_specials()).0;
        let Some(rest) = skip_type(rest) else {
            return Vec::new();
        };
        let mut rest = skip_name(rest);
        let mut out = Vec::new();
        for _ in 0..count {
            let ty = Type::new(rest);
            let Some(after) = skip_type(rest) else { break };
            let (name, after) = read_name(after);
            out.push((ty, name));
            rest = after;
        }
        out
    }

    /// Qualified names of the raised exceptions.
    pub fn raises(&self) -> Vec<&'a str> {
        let Some(mut rest) = Self::skip_body(self.info) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        while let Some(tail) = rest.strip_prefix(tags::RAISES) {
            let (name, tail) = read_name(tail);
            out.push(name);
            rest = tail;
        }
        out
    }

    fn skip_body(info: &str) -> Option<&str> {
        let method = Method::new(info);
        let count = method.parameter_count();
        let rest = skip_digits(method.after_specials()).0;
        let mut rest = skip_name(skip_type(rest)?);
        for _ in 0..count {
            rest = skip_name(skip_type(rest)?);
        }
        Some(rest)
    }

    /// Skip past this record, raises included.
    pub fn skip(info: &str) -> Option<&str> {
        let mut rest = Self::skip_body(info)?;
        while let Some(tail) = rest.strip_prefix(tags::RAISES) {
            rest = skip_name(tail);
        }
        Some(rest)
    }
}

/// A decoded constant record.
#[derive(Debug, Clone, Copy)]
pub struct Constant<'a> {
    info: &'a str,
}

impl<'a> Constant<'a> {
    pub fn new(info: &'a str) -> Self {
        Constant { info }
    }

    pub fn ty(&self) -> Type<'a> {
        Type::new(&self.info[1..])
    }

    pub fn name(&self) -> &'a str {
        let rest = skip_type(&self.info[1..]).unwrap_or("");
        read_name(rest).0
    }

    /// The recorded value, parseable as a double.
    pub fn value(&self) -> f64 {
        let rest = skip_type(&self.info[1..]).unwrap_or("");
        let rest = skip_name(rest);
        let end = rest.find(' ').unwrap_or(rest.len());
        rest[..end].parse().unwrap_or(0.0)
    }

    pub fn skip(info: &str) -> Option<&str> {
        let space = info.find(' ')?;
        Some(&info[space + 1..])
    }
}

/// A decoded interface record.
#[derive(Debug, Clone)]
pub struct Interface<'a> {
    info: &'a str,
    method_count: u32,
    constant_count: u32,
    constructor_count: u32,
}

impl<'a> Interface<'a> {
    /// Scan the record once to count members; decoding is lazy.
    pub fn parse(info: &'a str) -> Self {
        let mut interface = Interface {
            info,
            method_count: 0,
            constant_count: 0,
            constructor_count: 0,
        };
        let mut rest = skip_name(&info[1..]);
        while let Some(tail) = rest
            .strip_prefix(tags::EXTENDS)
            .or_else(|| rest.strip_prefix(tags::IMPLEMENTS))
        {
            rest = skip_name(tail);
        }
        let mut cursor = rest;
        while !cursor.is_empty() {
            let tag = cursor.chars().next().unwrap_or('\0');
            let next = match tag {
                tags::CONSTANT => {
                    interface.constant_count += 1;
                    Constant::skip(cursor)
                }
                tags::OPERATION | tags::SETTER | tags::GETTER => {
                    interface.method_count += 1;
                    Method::skip(cursor)
                }
                tags::CONSTRUCTOR => {
                    interface.constructor_count += 1;
                    Method::skip(cursor)
                }
                _ => None,
            };
            match next {
                Some(tail) => cursor = tail,
                None => break,
            }
        }
        interface
    }

    pub fn qualified_name(&self) -> &'a str {
        read_name(&self.info[1..]).0
    }

    /// Unqualified trailing segment of the name.
    pub fn name(&self) -> &'a str {
        let qualified = self.qualified_name();
        match qualified.rfind(':') {
            Some(pos) => &qualified[pos + 1..],
            None => qualified,
        }
    }

    pub fn extends(&self) -> Vec<&'a str> {
        self.links(tags::EXTENDS)
    }

    pub fn implements(&self) -> Vec<&'a str> {
        self.links(tags::IMPLEMENTS)
    }

    fn links(&self, wanted: char) -> Vec<&'a str> {
        let mut rest = skip_name(&self.info[1..]);
        let mut out = Vec::new();
        loop {
            let tag = rest.chars().next().unwrap_or('\0');
            if tag != tags::EXTENDS && tag != tags::IMPLEMENTS {
                break;
            }
            let (name, tail) = read_name(&rest[1..]);
            if tag == wanted {
                out.push(name);
            }
            rest = tail;
        }
        out
    }

    pub fn method_count(&self) -> u32 {
        self.method_count
    }

    pub fn constant_count(&self) -> u32 {
        self.constant_count
    }

    pub fn constructor_count(&self) -> u32 {
        self.constructor_count
    }

    /// The n-th getter/setter/operation record.
    pub fn method(&self, n: u32) -> Option<Method<'a>> {
        self.nth(n, &[tags::OPERATION, tags::SETTER, tags::GETTER])
            .map(Method::new)
    }

    /// The n-th constructor record.
    pub fn constructor(&self, n: u32) -> Option<Method<'a>> {
        self.nth(n, &[tags::CONSTRUCTOR]).map(Method::new)
    }

    /// The n-th constant record.
    pub fn constant(&self, n: u32) -> Option<Constant<'a>> {
        self.nth(n, &[tags::CONSTANT]).map(Constant::new)
    }

    fn nth(&self, mut n: u32, wanted: &[char]) -> Option<&'a str> {
        let mut cursor = self.members();
        while !cursor.is_empty() {
            let tag = cursor.chars().next()?;
            if wanted.contains(&tag) {
                if n == 0 {
                    return Some(cursor);
                }
                n -= 1;
            }
            cursor = match tag {
                tags::CONSTANT => Constant::skip(cursor)?,
                tags::OPERATION | tags::SETTER | tags::GETTER | tags::CONSTRUCTOR => {
                    Method::skip(cursor)?
                }
                _ => return None,
            };
        }
        None
    }

    fn members(&self) -> &'a str {
        let mut rest = skip_name(&self.info[1..]);
        while let Some(tail) = rest
            .strip_prefix(tags::EXTENDS)
            .or_else(|| rest.strip_prefix(tags::IMPLEMENTS))
        {
            rest = skip_name(tail);
        }
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_scenario_a() {
        let interface = Interface::parse("I3FooG0l3bar");
        assert_eq!(interface.qualified_name(), "Foo");
        assert_eq!(interface.method_count(), 1);
        let getter = interface.method(0).unwrap();
        assert!(getter.is_getter());
        assert_eq!(getter.name(), "bar");
        assert_eq!(getter.return_type().tag(), crate::tags::LONG);
    }

    #[test]
    fn test_decode_extends_and_implements() {
        let interface = Interface::parse("I3BarX3FooM5Mixin");
        assert_eq!(interface.extends(), vec!["Foo"]);
        assert_eq!(interface.implements(), vec!["Mixin"]);
    }

    #[test]
    fn test_decode_operation_parameters() {
        let interface = Interface::parse("I3FooF2O4Node4swapO4Node1aD1b");
        let op = interface.method(0).unwrap();
        assert_eq!(op.name(), "swap");
        assert_eq!(op.parameter_count(), 2);
        let params = op.parameters();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].0.qualified_name(), "Node");
        assert_eq!(params[0].1, "a");
        assert_eq!(params[1].0.tag(), crate::tags::STRING);
        assert_eq!(params[1].1, "b");
    }

    #[test]
    fn test_decode_setter_shape() {
        // S 1 v name type: one declared parameter, no parameter name.
        let interface = Interface::parse("I3FooS1v3bazD");
        let setter = interface.method(0).unwrap();
        assert!(setter.is_setter());
        assert_eq!(setter.name(), "baz");
        assert_eq!(setter.parameter_count(), 1);
    }

    #[test]
    fn test_decode_variadic_special() {
        let interface = Interface::parse("I3FooFV1v3logD4rest");
        let op = interface.method(0).unwrap();
        assert!(op.is_variadic());
        assert_eq!(op.name(), "log");
    }

    #[test]
    fn test_decode_constant() {
        let interface = Interface::parse("I3FooCt3MAX65535 ");
        assert_eq!(interface.constant_count(), 1);
        let constant = interface.constant(0).unwrap();
        assert_eq!(constant.name(), "MAX");
        assert_eq!(constant.value(), 65535.0);
        assert_eq!(constant.ty().tag(), crate::tags::UNSIGNED_SHORT);
    }

    #[test]
    fn test_decode_raises() {
        let interface = Interface::parse("I3FooF0v4stopR8DOMError");
        let op = interface.method(0).unwrap();
        assert_eq!(op.raises(), vec!["DOMError"]);
    }

    #[test]
    fn test_decode_constructor_records() {
        let meta = "I6WidgetN0O6Widget14createInstanceN1O6Widget14createInstancel4size";
        let interface = Interface::parse(meta);
        assert_eq!(interface.constructor_count(), 2);
        let second = interface.constructor(1).unwrap();
        assert_eq!(second.name(), "createInstance");
        assert_eq!(second.parameter_count(), 1);
        assert_eq!(second.parameters()[0].1, "size");
    }

    #[test]
    fn test_nullable_detection() {
        let ty = Type::new("l?");
        assert!(ty.is_nullable());
        let ty = Type::new("l3bar");
        assert!(!ty.is_nullable());
    }
}
