use super::*;
use crate::{Signature, Path};

// Implementations for basic types.

macro_rules! integer_impl {
    ($t: ident, $s: ident, $f: expr) => {

impl Arg for $t {
    const ARG_TYPE: ArgType = ArgType::$s;
    #[inline]
    fn signature() -> Signature<'static> { Signature::from_slice_unchecked($f) }
}

impl Append for $t {
    fn append(self, i: &mut IterAppend) {
        match std::mem::size_of::<$t>() {
            1 => i.put_u8(self as u8),
            2 => i.put_u16(self as u16),
            4 => i.put_u32(self as u32),
            _ => i.put_u64(self as u64),
        }
    }
}

impl<'a> Get<'a> for $t {
    fn get(i: &mut Iter) -> Option<Self> { i.get_basic_u64(ArgType::$s).map(|q| q as $t) }
}

impl DictKey for $t {}
impl FixedArray for $t {}

}} // End of macro_rules

integer_impl!(u8, Byte, "y");
integer_impl!(i16, Int16, "n");
integer_impl!(u16, UInt16, "q");
integer_impl!(i32, Int32, "i");
integer_impl!(u32, UInt32, "u");
integer_impl!(i64, Int64, "x");
integer_impl!(u64, UInt64, "t");

impl Arg for bool {
    const ARG_TYPE: ArgType = ArgType::Boolean;
    fn signature() -> Signature<'static> { Signature::from_slice_unchecked("b") }
}
impl Append for bool {
    fn append(self, i: &mut IterAppend) { i.put_u32(if self { 1 } else { 0 }) }
}
impl DictKey for bool {}
impl<'a> Get<'a> for bool {
    fn get(i: &mut Iter) -> Option<Self> { i.get_basic_u64(ArgType::Boolean).map(|q| q != 0) }
}

impl Arg for f64 {
    const ARG_TYPE: ArgType = ArgType::Double;
    fn signature() -> Signature<'static> { Signature::from_slice_unchecked("d") }
}
impl Append for f64 {
    fn append(self, i: &mut IterAppend) { i.put_f64(self) }
}
impl DictKey for f64 {}
impl<'a> Get<'a> for f64 {
    fn get(i: &mut Iter) -> Option<Self> { i.get_f64() }
}
impl FixedArray for f64 {}

/// Represents a D-Bus string.
impl<'a> Arg for &'a str {
    const ARG_TYPE: ArgType = ArgType::String;
    fn signature() -> Signature<'static> { Signature::from_slice_unchecked("s") }
}

impl<'a> Append for &'a str {
    fn append(self, i: &mut IterAppend) { i.put_str(self) }
}
impl<'a> DictKey for &'a str {}
impl<'a> Get<'a> for &'a str {
    fn get(i: &mut Iter<'a>) -> Option<&'a str> { i.get_str(ArgType::String) }
}

impl Arg for String {
    const ARG_TYPE: ArgType = ArgType::String;
    fn signature() -> Signature<'static> { Signature::from_slice_unchecked("s") }
}
impl Append for String {
    fn append(self, i: &mut IterAppend) { i.put_str(&self) }
}
impl DictKey for String {}
impl<'a> Get<'a> for String {
    fn get(i: &mut Iter<'a>) -> Option<String> { <&str>::get(i).map(String::from) }
}

macro_rules! string_impl {
    ($t: ident, $s: ident, $f: expr) => {

impl<'a> Arg for $t<'a> {
    const ARG_TYPE: ArgType = ArgType::$s;
    fn signature() -> Signature<'static> { Signature::from_slice_unchecked($f) }
}

impl<'a> DictKey for $t<'a> {}

impl<'a> Append for $t<'a> {
    fn append(self, i: &mut IterAppend) {
        match ArgType::$s {
            ArgType::Signature => i.put_sig_str(&self),
            _ => i.put_str(&self),
        }
    }
}

impl<'a> Get<'a> for $t<'a> {
    fn get(i: &mut Iter<'a>) -> Option<$t<'a>> {
        match ArgType::$s {
            ArgType::Signature => i.get_sig_str(),
            _ => i.get_str(ArgType::$s),
        }.and_then(|s| $t::from_slice(s).ok())
    }
}

    }
}

string_impl!(Path, ObjectPath, "o");
string_impl!(Signature, Signature, "g");
