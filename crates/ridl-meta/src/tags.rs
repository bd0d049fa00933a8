//! Meta-string tag alphabet
//!
//! One character per tag. The grammar:
//!
//! ```text
//! name -> digits identifier        // digits = character count
//!
//! interface ->
//!   I name
//!   extends*
//!   implements*
//!   [ operation, setter, getter, constructor, constant ]*
//!
//! extends -> X name
//! implements -> M name
//! operation -> F special* digits type name (type name)* raises*
//! setter -> S special* 1 v name type raises*
//! getter -> G special* 0 type name raises*
//! constructor -> N digits type name (type name)* raises*
//! constant -> C type name value ' '
//! raises -> R name
//! ```
//!
//! A variadic operation carries `V` immediately after its leading tag;
//! nullable types append `?`.

// Types
pub const VOID: char = 'v';
pub const BOOLEAN: char = 'b';
pub const BYTE: char = 'g';
pub const UNSIGNED_BYTE: char = 'h';
pub const OCTET: char = 'h';
pub const SHORT: char = 's';
pub const UNSIGNED_SHORT: char = 't';
pub const LONG: char = 'l';
pub const UNSIGNED_LONG: char = 'm';
pub const LONG_LONG: char = 'x';
pub const UNSIGNED_LONG_LONG: char = 'y';
pub const FLOAT: char = 'f';
pub const DOUBLE: char = 'd';
pub const STRING: char = 'D';
pub const ANY: char = 'A';
pub const OBJECT: char = 'O';
pub const SEQUENCE: char = 'Q';
pub const DATE: char = 'T';

// Declarations
pub const INTERFACE: char = 'I';
pub const EXTENDS: char = 'X';
pub const IMPLEMENTS: char = 'M';
pub const CONSTANT: char = 'C';
pub const OPERATION: char = 'F';
pub const GETTER: char = 'G';
pub const SETTER: char = 'S';
pub const CONSTRUCTOR: char = 'N';
pub const EXCEPTION: char = 'E';
pub const RAISES: char = 'R';

// Specials
pub const SPECIAL_GETTER: char = 'g';
pub const SPECIAL_SETTER: char = 's';
pub const SPECIAL_CREATOR: char = 'c';
pub const SPECIAL_DELETER: char = 'd';
pub const SPECIAL_CALLER: char = 'f';
pub const SPECIAL_STRINGIFIER: char = 't';
pub const SPECIAL_OMITTABLE: char = 'o';
pub const VARIADIC: char = 'V';

pub const NULLABLE: char = '?';

// Obsolete, still decoded
pub const ARRAY: char = 'Y';
pub const POINTER: char = 'p';

/// True for the first character of a parameter record.
pub fn is_param(tag: char) -> bool {
    matches!(
        tag,
        BOOLEAN
            | BYTE
            | OCTET
            | SHORT
            | UNSIGNED_SHORT
            | LONG
            | UNSIGNED_LONG
            | LONG_LONG
            | UNSIGNED_LONG_LONG
            | FLOAT
            | DOUBLE
            | STRING
            | DATE
            | ANY
            | OBJECT
            | NULLABLE
            | SEQUENCE
            | ARRAY
            | POINTER
    )
}
