use super::*;
use crate::{Signature, Path};

/// A runtime-typed D-Bus value.
///
/// Most code works with statically typed arguments, but some interfaces
/// (most notably the standard Properties interface) deal in values whose
/// type is only known at runtime. `Value` is a tagged union over the
/// supported D-Bus types; wrapped in [`Variant`](struct.Variant.html) it
/// carries its signature with it.
///
/// Containers store their element signatures explicitly so that empty
/// arrays and dicts keep a well-formed signature.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Unsigned 8 bit integer.
    Byte(u8),
    /// Boolean.
    Bool(bool),
    /// Signed 16 bit integer.
    Int16(i16),
    /// Unsigned 16 bit integer.
    UInt16(u16),
    /// Signed 32 bit integer.
    Int32(i32),
    /// Unsigned 32 bit integer.
    UInt32(u32),
    /// Signed 64 bit integer.
    Int64(i64),
    /// Unsigned 64 bit integer.
    UInt64(u64),
    /// IEEE-754 double precision floating point number.
    Double(f64),
    /// String.
    Str(String),
    /// Object path.
    ObjectPath(Path<'static>),
    /// Type signature.
    Signature(Signature<'static>),
    /// Array of uniformly typed elements; the signature describes one element.
    Array(Signature<'static>, Vec<Value>),
    /// Dictionary; the signatures describe the key and value types.
    Dict(Signature<'static>, Signature<'static>, Vec<(Value, Value)>),
    /// Struct with heterogeneous fields.
    Struct(Vec<Value>),
    /// A nested variant.
    Variant(Box<Value>),
}

impl Value {
    /// The type code of this value.
    pub fn arg_type(&self) -> ArgType {
        match self {
            Value::Byte(_) => ArgType::Byte,
            Value::Bool(_) => ArgType::Boolean,
            Value::Int16(_) => ArgType::Int16,
            Value::UInt16(_) => ArgType::UInt16,
            Value::Int32(_) => ArgType::Int32,
            Value::UInt32(_) => ArgType::UInt32,
            Value::Int64(_) => ArgType::Int64,
            Value::UInt64(_) => ArgType::UInt64,
            Value::Double(_) => ArgType::Double,
            Value::Str(_) => ArgType::String,
            Value::ObjectPath(_) => ArgType::ObjectPath,
            Value::Signature(_) => ArgType::Signature,
            Value::Array(_, _) | Value::Dict(_, _, _) => ArgType::Array,
            Value::Struct(_) => ArgType::Struct,
            Value::Variant(_) => ArgType::Variant,
        }
    }

    /// The D-Bus type signature of this value.
    pub fn signature(&self) -> Signature<'static> {
        match self {
            Value::Array(e, _) => Signature::new(format!("a{}", e)).unwrap(),
            Value::Dict(k, v, _) => Signature::new(format!("a{{{}{}}}", k, v)).unwrap(),
            Value::Struct(fields) => {
                let mut s = String::from("(");
                for f in fields { s.push_str(&f.signature()) }
                s.push_str(")");
                Signature::new(s).unwrap()
            }
            Value::Variant(_) => Signature::from_slice_unchecked("v"),
            Value::Byte(_) => Signature::from_slice_unchecked("y"),
            Value::Bool(_) => Signature::from_slice_unchecked("b"),
            Value::Int16(_) => Signature::from_slice_unchecked("n"),
            Value::UInt16(_) => Signature::from_slice_unchecked("q"),
            Value::Int32(_) => Signature::from_slice_unchecked("i"),
            Value::UInt32(_) => Signature::from_slice_unchecked("u"),
            Value::Int64(_) => Signature::from_slice_unchecked("x"),
            Value::UInt64(_) => Signature::from_slice_unchecked("t"),
            Value::Double(_) => Signature::from_slice_unchecked("d"),
            Value::Str(_) => Signature::from_slice_unchecked("s"),
            Value::ObjectPath(_) => Signature::from_slice_unchecked("o"),
            Value::Signature(_) => Signature::from_slice_unchecked("g"),
        }
    }

    /// Try to read the value as a signed integer.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Byte(b) => Some(b as i64),
            Value::Bool(b) => Some(b as i64),
            Value::Int16(n) => Some(n as i64),
            Value::UInt16(n) => Some(n as i64),
            Value::Int32(n) => Some(n as i64),
            Value::UInt32(n) => Some(n as i64),
            Value::Int64(n) => Some(n),
            _ => None,
        }
    }

    /// Try to read the value as an unsigned integer.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::Byte(b) => Some(b as u64),
            Value::UInt16(n) => Some(n as u64),
            Value::UInt32(n) => Some(n as u64),
            Value::UInt64(n) => Some(n),
            _ => None,
        }
    }

    /// Try to read the value as a floating point number.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Double(d) => Some(d),
            _ => None,
        }
    }

    /// Try to read the value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::ObjectPath(p) => Some(p),
            Value::Signature(s) => Some(s),
            _ => None,
        }
    }
}

macro_rules! value_from_impl {
    ($t: ty, $v: ident) => {
        impl From<$t> for Value {
            fn from(x: $t) -> Value { Value::$v(x.into()) }
        }
    }
}

value_from_impl!(u8, Byte);
value_from_impl!(bool, Bool);
value_from_impl!(i16, Int16);
value_from_impl!(u16, UInt16);
value_from_impl!(i32, Int32);
value_from_impl!(u32, UInt32);
value_from_impl!(i64, Int64);
value_from_impl!(u64, UInt64);
value_from_impl!(f64, Double);
value_from_impl!(String, Str);
value_from_impl!(&str, Str);

impl From<Path<'static>> for Value {
    fn from(p: Path<'static>) -> Value { Value::ObjectPath(p) }
}

impl Append for Value {
    fn append(self, i: &mut IterAppend) {
        match self {
            Value::Byte(b) => b.append(i),
            Value::Bool(b) => b.append(i),
            Value::Int16(n) => n.append(i),
            Value::UInt16(n) => n.append(i),
            Value::Int32(n) => n.append(i),
            Value::UInt32(n) => n.append(i),
            Value::Int64(n) => n.append(i),
            Value::UInt64(n) => n.append(i),
            Value::Double(d) => d.append(i),
            Value::Str(s) => s.append(i),
            Value::ObjectPath(p) => p.append(i),
            Value::Signature(s) => s.append(i),
            Value::Array(esig, elems) => {
                i.append_container(ArgType::Array, Some(&esig), |s| {
                    for el in elems { el.append(s) }
                });
            }
            Value::Dict(ksig, vsig, pairs) => {
                let z = format!("{{{}{}}}", ksig, vsig);
                i.append_container(ArgType::Array, Some(&z), |s| {
                    for (k, v) in pairs {
                        s.append_container(ArgType::DictEntry, None, |ss| {
                            k.append(ss);
                            v.append(ss);
                        });
                    }
                });
            }
            Value::Struct(fields) => {
                i.append_container(ArgType::Struct, None, |s| {
                    for f in fields { f.append(s) }
                });
            }
            Value::Variant(inner) => {
                let sig = inner.signature();
                i.append_container(ArgType::Variant, Some(&sig), |s| inner.append(s));
            }
        }
    }
}

impl<'a> Get<'a> for Value {
    fn get(i: &mut Iter<'a>) -> Option<Self> {
        Some(match i.arg_type() {
            ArgType::Byte => Value::Byte(i.get()?),
            ArgType::Boolean => Value::Bool(i.get()?),
            ArgType::Int16 => Value::Int16(i.get()?),
            ArgType::UInt16 => Value::UInt16(i.get()?),
            ArgType::Int32 => Value::Int32(i.get()?),
            ArgType::UInt32 => Value::UInt32(i.get()?),
            ArgType::Int64 => Value::Int64(i.get()?),
            ArgType::UInt64 => Value::UInt64(i.get()?),
            ArgType::Double => Value::Double(i.get()?),
            ArgType::String => Value::Str(i.get()?),
            ArgType::ObjectPath => Value::ObjectPath(i.get::<Path>()?.into_static()),
            ArgType::Signature => Value::Signature(i.get::<Signature>()?.into_static()),
            ArgType::Array => {
                let sig = i.signature();
                let inner = &sig[1..];
                if inner.as_bytes()[0] == b'{' {
                    let ksig = &inner[1..2];
                    let vsig = &inner[2..inner.len()-1];
                    let mut si = i.recurse(ArgType::Array)?;
                    let mut pairs = vec!();
                    while si.arg_type() == ArgType::DictEntry {
                        let mut entry = si.recurse(ArgType::DictEntry)?;
                        let k = entry.get()?;
                        if !entry.next() { return None };
                        let v = entry.get()?;
                        pairs.push((k, v));
                        if !si.next() { break };
                    }
                    Value::Dict(Signature::new(ksig.to_string()).unwrap(),
                        Signature::new(vsig.to_string()).unwrap(), pairs)
                } else {
                    let mut si = i.recurse(ArgType::Array)?;
                    let mut elems = vec!();
                    while si.arg_type() != ArgType::Invalid {
                        elems.push(si.get()?);
                        if !si.next() { break };
                    }
                    Value::Array(Signature::new(inner.to_string()).unwrap(), elems)
                }
            }
            ArgType::Struct => {
                let mut si = i.recurse(ArgType::Struct)?;
                let mut fields = vec!();
                while si.arg_type() != ArgType::Invalid {
                    fields.push(si.get()?);
                    if !si.next() { break };
                }
                Value::Struct(fields)
            }
            ArgType::Variant => {
                let mut si = i.recurse(ArgType::Variant)?;
                Value::Variant(Box::new(si.get()?))
            }
            _ => return None,
        })
    }
}
