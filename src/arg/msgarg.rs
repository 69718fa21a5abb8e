use crate::Signature;
use super::{Iter, IterAppend, ArgType, TypeMismatchError};

/// Types that can represent a D-Bus message argument implement this trait.
///
/// This is the crate's signature engine: `signature()` is derived
/// structurally for every supported type, and trying to use an unsupported
/// type fails to compile. Types should also implement either Append or Get
/// to be useful.
pub trait Arg {
    /// The corresponding D-Bus argument type code.
    const ARG_TYPE: ArgType;
    /// The corresponding D-Bus type signature for this type.
    fn signature() -> Signature<'static>;
}

/// Types that can be appended to a message as arguments implement this trait.
pub trait Append: Sized {
    /// Performs the append operation.
    fn append(self, i: &mut IterAppend);
}

/// Types that can be retrieved from a message as arguments implement this trait.
pub trait Get<'a>: Sized {
    /// Performs the get operation.
    fn get(i: &mut Iter<'a>) -> Option<Self>;
}

/// If a type implements this trait, it is a fixed-width scalar whose size and
/// alignment are the same as on the wire ("trivial" in D-Bus terms).
///
/// Note: Booleans do not implement this trait because D-Bus booleans are 4 bytes and Rust booleans are 1 byte.
pub trait FixedArray: Arg + 'static + Clone + Copy {}

/// Types that can be used as keys in a dict type implement this trait.
pub trait DictKey: Arg {}

/// Simple lift over reference to value - this makes some iterators more ergonomic to use
impl<'a, T: Arg> Arg for &'a T {
    const ARG_TYPE: ArgType = T::ARG_TYPE;
    fn signature() -> Signature<'static> { T::signature() }
}
impl<'a, T: Append + Clone> Append for &'a T {
    fn append(self, i: &mut IterAppend) { self.clone().append(i) }
}
impl<'a, T: DictKey> DictKey for &'a T {}

impl<T: Arg> Arg for Box<T> {
    const ARG_TYPE: ArgType = T::ARG_TYPE;
    fn signature() -> Signature<'static> { T::signature() }
}
impl<T: Append> Append for Box<T> {
    fn append(self, i: &mut IterAppend) { let q: T = *self; q.append(i) }
}
impl<'a, T: Get<'a>> Get<'a> for Box<T> {
    fn get(i: &mut Iter<'a>) -> Option<Self> { T::get(i).map(Box::new) }
}

/// Types that represent a flat list of arguments (a method's input or output
/// arguments, or a signal's arguments) implement this trait.
///
/// Unlike a tuple used as a single [`Arg`](trait.Arg.html) (which is a D-Bus
/// struct with a parenthesized signature), an argument list is a plain
/// concatenation: `ArgAll::signature` for `(&str, i32)` is `si`, not `(si)`.
pub trait ArgAll {
    /// A tuple of `&'static str` with the same arity, used to name the arguments.
    #[allow(non_camel_case_types)]
    type strs;

    /// Enumerates the argument names together with their signatures.
    fn strs_sig<F: FnMut(&'static str, Signature<'static>)>(a: Self::strs, f: F);

    /// The concatenated signature of all arguments, with no enclosing parentheses.
    fn signature() -> Signature<'static>;
}

/// Types that can be appended to a message as a flat list of arguments.
pub trait AppendAll: Sized {
    /// Performs the append operation.
    fn append(self, i: &mut IterAppend);
}

/// Types that can be read from a message as a flat list of arguments.
pub trait ReadAll: Sized {
    /// Performs the read operation.
    fn read(i: &mut Iter) -> Result<Self, TypeMismatchError>;
}

macro_rules! one_ty { ($t: ident, $out: ty) => ($out) }

macro_rules! argall_impl {
    ( $($n: ident $t: ident,)* ) => {

impl<$($t: Arg),*> ArgAll for ($($t,)*) {
    type strs = ($(one_ty!($t, &'static str),)*);

    #[allow(unused_variables, unused_mut)]
    fn strs_sig<Q: FnMut(&'static str, Signature<'static>)>(a: Self::strs, mut f: Q) {
        let ($($n,)*) = a;
        $( f($n, $t::signature()); )*
    }

    fn signature() -> Signature<'static> {
        #[allow(unused_mut)]
        let mut s = String::new();
        $( s.push_str(&$t::signature()); )*
        Signature::new(s).unwrap()
    }
}

impl<$($t: Arg + Append),*> AppendAll for ($($t,)*) {
    #[allow(unused_variables)]
    fn append(self, i: &mut IterAppend) {
        let ($($n,)*) = self;
        $( i.append($n); )*
    }
}

impl<$($t: Arg + for<'z> Get<'z>),*> ReadAll for ($($t,)*) {
    #[allow(unused_variables, unused_mut)]
    fn read(i: &mut Iter) -> Result<Self, TypeMismatchError> {
        $( let $n = i.read()?; )*
        Ok(($($n,)*))
    }
}

    }
}

argall_impl!();
argall_impl!(a A,);
argall_impl!(a A, b B,);
argall_impl!(a A, b B, c C,);
argall_impl!(a A, b B, c C, d D,);
argall_impl!(a A, b B, c C, d D, e E,);
argall_impl!(a A, b B, c C, d D, e E, f F,);
argall_impl!(a A, b B, c C, d D, e E, f F, g G,);
argall_impl!(a A, b B, c C, d D, e E, f F, g G, h H,);
argall_impl!(a A, b B, c C, d D, e E, f F, g G, h H, i I,);
argall_impl!(a A, b B, c C, d D, e E, f F, g G, h H, i I, j J,);
