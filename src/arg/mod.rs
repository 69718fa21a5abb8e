//! Types and traits for easily getting a message's arguments, or appending a message with arguments.
//!
//! This module encodes D-Bus restrictions into Rust's type system: trying to
//! append anything that D-Bus would not allow results in a compile-time error.
//! A message has `read1`, `read2` etc, and `append1`, `append2` etc, which is
//! your starting point into this module's types.
//!
//! **Append a**:
//!
//! `bool, u8, u16, u32, u64, i16, i32, i64, f64` - the corresponding D-Bus basic type
//!
//! `&str`, `String` - a D-Bus string.
//!
//! `Vec<T>`, `&[T]`, `[T; N] where T: Append` - a D-Bus array.
//!
//! `Variant<T> where T: Append` - a D-Bus variant with a statically known inner type.
//!
//! `Variant<Value>` - a D-Bus variant whose inner type is chosen at runtime.
//!
//! `(T1, T2) where T1: Append, T2: Append` - tuples are D-Bus structs. Implemented up to 10.
//!
//! `HashMap<K, V>`, `BTreeMap<K, V> where K: DictKey, V: Append` - a D-Bus dict.
//!
//! `Path` - a D-Bus object path.
//!
//! `Signature` - a D-Bus signature.
//!
//! **Get a**:
//!
//! `bool, u8, u16, u32, u64, i16, i32, i64, f64` - the corresponding D-Bus basic type
//!
//! `&str`, `String` - a D-Bus string.
//!
//! `Vec<T> where T: Get` - a D-Bus array.
//!
//! `Variant<T> where T: Get` - a D-Bus variant. Use this if you know the inner type.
//!
//! `Variant<Iter>`, `Variant<Value>` - a D-Bus variant whose inner type can be examined at runtime.
//!
//! `(T1, T2) where T1: Get, T2: Get` - tuples are D-Bus structs. Implemented up to 10.
//!
//! `HashMap<K, V>`, `BTreeMap<K, V>` - a D-Bus dict.
//!
//! `Path` - a D-Bus object path.
//!
//! `Signature` - a D-Bus signature.
//!
//! Note the distinction between a single argument and an argument *list*: a
//! tuple appended (or read) as one argument is a D-Bus struct with a
//! parenthesized signature, whereas the [`AppendAll`](trait.AppendAll.html) /
//! [`ReadAll`](trait.ReadAll.html) traits treat a tuple as a flat list of
//! separate arguments, which is how D-Bus method input and output signatures
//! are formed.

mod msgarg;
mod marshal;
mod basic_impl;
mod array_impl;
mod variantstruct_impl;
mod value;

#[macro_use]
mod macros;

pub use self::msgarg::{Arg, FixedArray, Get, DictKey, Append, ArgAll, AppendAll, ReadAll};
pub use self::marshal::{Iter, IterAppend, TypeMismatchError};
pub use self::variantstruct_impl::Variant;
pub use self::value::Value;

/// A dictionary whose values can be of any D-Bus type, as used by e g the
/// standard Properties interface.
pub type PropMap = std::collections::HashMap<String, Variant<Value>>;

/// The type code of a D-Bus message argument.
///
/// The discriminants are the ASCII code points used in D-Bus signatures,
/// except for `Struct` and `DictEntry` which use the reserved code points
/// `r` and `e` (their signatures are spelled with parentheses and braces).
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum ArgType {
    /// Not a valid argument type (e g, the cursor is past the last argument).
    Invalid = 0,
    /// Array
    Array = b'a',
    /// Variant
    Variant = b'v',
    /// Boolean
    Boolean = b'b',
    /// Unix file descriptor
    UnixFd = b'h',
    /// Byte
    Byte = b'y',
    /// Int16
    Int16 = b'n',
    /// UInt16
    UInt16 = b'q',
    /// Int32
    Int32 = b'i',
    /// UInt32
    UInt32 = b'u',
    /// Int64
    Int64 = b'x',
    /// UInt64
    UInt64 = b't',
    /// Double
    Double = b'd',
    /// String
    String = b's',
    /// ObjectPath
    ObjectPath = b'o',
    /// Signature
    Signature = b'g',
    /// Struct
    Struct = b'r',
    /// DictEntry
    DictEntry = b'e',
}

const ALL_ARG_TYPES: [(ArgType, &str); 18] =
    [(ArgType::Variant, "Variant"),
    (ArgType::Array, "Array/Dict"),
    (ArgType::Struct, "Struct"),
    (ArgType::DictEntry, "Dict entry"),
    (ArgType::String, "String"),
    (ArgType::ObjectPath, "Path"),
    (ArgType::Signature, "Signature"),
    (ArgType::UnixFd, "Fd"),
    (ArgType::Boolean, "Boolean"),
    (ArgType::Byte, "Byte"),
    (ArgType::Int16, "Int16"),
    (ArgType::Int32, "Int32"),
    (ArgType::Int64, "Int64"),
    (ArgType::UInt16, "UInt16"),
    (ArgType::UInt32, "UInt32"),
    (ArgType::UInt64, "UInt64"),
    (ArgType::Double, "Double"),
    (ArgType::Invalid, "Nothing")];

impl ArgType {
    /// A str corresponding to the name of a Rust type.
    pub fn as_str(self) -> &'static str {
        ALL_ARG_TYPES.iter().find(|a| a.0 == self).unwrap().1
    }

    /// The ArgType of the signature starting with this character, if any.
    pub (crate) fn from_sig_char(c: u8) -> Option<ArgType> {
        match c {
            b'(' => Some(ArgType::Struct),
            b'{' => Some(ArgType::DictEntry),
            b'a' => Some(ArgType::Array),
            b'v' => Some(ArgType::Variant),
            b'b' => Some(ArgType::Boolean),
            b'h' => Some(ArgType::UnixFd),
            b'y' => Some(ArgType::Byte),
            b'n' => Some(ArgType::Int16),
            b'q' => Some(ArgType::UInt16),
            b'i' => Some(ArgType::Int32),
            b'u' => Some(ArgType::UInt32),
            b'x' => Some(ArgType::Int64),
            b't' => Some(ArgType::UInt64),
            b'd' => Some(ArgType::Double),
            b's' => Some(ArgType::String),
            b'o' => Some(ArgType::ObjectPath),
            b'g' => Some(ArgType::Signature),
            _ => None,
        }
    }
}
