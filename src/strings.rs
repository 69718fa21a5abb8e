//! This module contains strings with a specific format, such as a valid
//! Interface name, a valid Error name, etc.
//!
//! The internal representation is `Cow<str>`, so they can borrow from string
//! literals in the common case and still be sent across threads when owned.

use std::{str, fmt, ops, default, hash};
use std::borrow::{Borrow, Cow};

macro_rules! dstring_wrapper {
    ($(#[$comments:meta])* $t: ident, $n: ident) => {

$(#[$comments])*
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct $t<'a>(Cow<'a, str>);

impl<'m> $t<'m> {
    /// Creates a new instance of this struct.
    pub fn new<S: Into<String>>(s: S) -> Result<$t<'m>, String> {
        let c = s.into();
        $t::check_valid(&c).map(|_| $t(Cow::Owned(c)))
    }

    fn check_valid(s: &str) -> Result<(), String> {
        validity::$n(s.as_bytes()).map_err(|_| format!("'{}' is not a valid {}", s, stringify!($t)))
    }

    /// Creates a new instance of this struct, borrowing the given slice.
    pub fn from_slice(s: &'m str) -> Result<$t<'m>, String> {
        $t::check_valid(s).map(|_| $t(Cow::Borrowed(s)))
    }

    /// This function creates a new instance of this struct, without checking.
    /// It's up to you to guarantee that s is valid.
    pub fn from_slice_unchecked(s: &'m str) -> $t<'m> {
        $t(Cow::Borrowed(s))
    }

    /// Makes sure this string does not contain borrows.
    pub fn into_static(self) -> $t<'static> {
        $t(Cow::Owned(self.0.into_owned()))
    }
}

/// #Panics
///
/// If given string is not valid.
impl<'m> From<String> for $t<'m> { fn from(s: String) -> $t<'m> { $t::new(s).unwrap() } }

/// #Panics
///
/// If given string is not valid.
impl<'m> From<&'m String> for $t<'m> { fn from(s: &'m String) -> $t<'m> { $t::from_slice(s).unwrap() } }

/// #Panics
///
/// If given string is not valid.
impl<'m> From<&'m str> for $t<'m> { fn from(s: &'m str) -> $t<'m> { $t::from_slice(s).unwrap() } }

/// #Panics
///
/// If given string is not valid.
impl<'m> From<Cow<'m, str>> for $t<'m> {
    fn from(s: Cow<'m, str>) -> $t<'m> {
        match s {
            Cow::Borrowed(z) => z.into(),
            Cow::Owned(z) => z.into(),
        }
    }
}

impl<'inner, 'm: 'inner> From<&'m $t<'inner>> for $t<'m> {
    fn from(borrow: &'m $t<'inner>) -> $t<'m> {
        $t(Cow::Borrowed(borrow.0.borrow()))
    }
}

impl<'m> ops::Deref for $t<'m> {
    type Target = str;
    fn deref(&self) -> &str { &self.0 }
}

impl<'m> fmt::Display for $t<'m> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        <str as fmt::Display>::fmt(self, f)
    }
}

impl<'m> hash::Hash for $t<'m> {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

}}

dstring_wrapper!(
    /// A wrapper around a string that is guaranteed to be
    /// a valid D-Bus type signature (possibly describing several arguments).
    Signature, is_valid_signature_multi
);

impl Signature<'static> {
    /// Makes a D-Bus signature that corresponds to A.
    pub fn make<A: super::arg::Arg>() -> Signature<'static> { A::signature() }
}

dstring_wrapper!(
    /// A wrapper around a string that is guaranteed to be
    /// a valid D-Bus object path.
    Path, is_valid_object_path
);

// This is needed so one can make arrays of paths easily
impl<'a> default::Default for Path<'a> {
    fn default() -> Path<'a> { Path(Cow::Borrowed("/")) }
}

dstring_wrapper!(
    /// A wrapper around a string that is guaranteed to be
    /// a valid D-Bus member, i e, a signal or method name.
    Member, is_valid_member_name
);

dstring_wrapper!(
    /// A wrapper around a string that is guaranteed to be
    /// a valid D-Bus interface name.
    Interface, is_valid_interface_name
);

dstring_wrapper!(
    /// A wrapper around a string that is guaranteed to be
    /// a valid D-Bus bus name.
    BusName, is_valid_bus_name
);

dstring_wrapper!(
    /// A wrapper around a string that is guaranteed to be
    /// a valid D-Bus error name.
    ErrorName, is_valid_error_name
);

mod validity {
    fn is_az_(b: u8) -> Result<(), ()> {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'_' => Ok(()),
            _ => Err(()),
        }
    }

    fn is_az09_(b: u8) -> Result<(), ()> {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' => Ok(()),
            _ => Err(()),
        }
    }

    fn is_az_hyphen(b: u8) -> Result<(), ()> {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'_' | b'-' => Ok(()),
            _ => Err(()),
        }
    }

    fn is_az09_hyphen(b: u8) -> Result<(), ()> {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' => Ok(()),
            _ => Err(()),
        }
    }

    pub fn is_valid_member_name(s: &[u8]) -> Result<(), ()> {
        if s.len() > 255 { Err(())? }
        let mut x = s.iter();
        let c = *x.next().ok_or(())?;
        is_az_(c)?;
        for c in x { is_az09_(*c)? };
        Ok(())
    }

    pub fn is_valid_error_name(s: &[u8]) -> Result<(), ()> {
        is_valid_interface_name(s)
    }

    pub fn is_valid_interface_name(s: &[u8]) -> Result<(), ()> {
        if s.len() > 255 { Err(())? }
        let mut x = s.iter();
        let mut elements = 1;
        'outer: loop {
            let c = *x.next().ok_or(())?;
            is_az_(c)?;
            while let Some(&c) = x.next() {
                if c == b'.' {
                    elements += 1;
                    continue 'outer;
                }
                is_az09_(c)?;
            }
            return if elements > 1 { Ok(()) } else { Err(()) }
        }
    }

    fn is_valid_unique_conn_name(mut x: std::slice::Iter<u8>) -> Result<(), ()> {
        let mut elements = 1;
        'outer: loop {
            let c = *x.next().ok_or(())?;
            is_az09_hyphen(c)?;
            while let Some(&c) = x.next() {
                if c == b'.' {
                    elements += 1;
                    continue 'outer;
                }
                is_az09_hyphen(c)?;
            }
            return if elements > 1 { Ok(()) } else { Err(()) }
        }
    }

    pub fn is_valid_bus_name(s: &[u8]) -> Result<(), ()> {
        if s.len() > 255 { return Err(()); }
        let mut x = s.iter();
        let mut c_first = *x.next().ok_or(())?;
        if c_first == b':' { return is_valid_unique_conn_name(x); }
        let mut elements = 1;
        'outer: loop {
            is_az_hyphen(c_first)?;
            while let Some(&c) = x.next() {
                if c == b'.' {
                    elements += 1;
                    c_first = *x.next().ok_or(())?;
                    continue 'outer;
                }
                is_az09_hyphen(c)?;
            }
            return if elements > 1 { Ok(()) } else { Err(()) }
        }
    }

    pub fn is_valid_object_path(s: &[u8]) -> Result<(), ()> {
        let mut x = s.iter();
        let c = x.next();
        if c != Some(&b'/') { Err(())? };
        if s.len() == 1 { return Ok(()) };

        'outer: loop {
            let c = *x.next().ok_or(())?;
            is_az09_(c)?;
            while let Some(&c) = x.next() {
                if c == b'/' { continue 'outer; }
                is_az09_(c)?;
            }
            return Ok(());
        }
    }

    const BASIC_TYPES: &[u8] = b"ybnqiuxtdhsog";

    fn sig_multi(s: &[u8], arrs: u8, structs: u8) -> Option<usize> {
        let mut pos = 0;
        while pos < s.len() {
            if s.get(pos) == Some(&b')') { return Some(pos) }
            pos += sig_single(&s[pos..], arrs, structs)?;
        }
        Some(pos)
    }

    fn sig_single(s: &[u8], arrs: u8, structs: u8) -> Option<usize> {
        s.first().and_then(|c| {
            if BASIC_TYPES.iter().any(|x| x == c) { Some(1) }
            else {
                Some(1 + match c {
                    b'v' => 0, // Variant
                    b'a' => { // Array
                        if arrs >= 32 { None? };
                        if s.get(1) == Some(&b'{') { // Dict
                            let c = s.get(2)?;
                            if !BASIC_TYPES.iter().any(|x| x == c) { None? };
                            let pos = 3 + sig_single(&s[3..], arrs+1, structs)?;
                            if s.get(pos)? != &b'}' { None? }
                            pos
                        } else {
                            sig_single(&s[1..], arrs+1, structs)?
                        }
                    },
                    b'(' => {
                        if structs >= 32 { None? };
                        let pos = 1 + sig_multi(&s[1..], arrs, structs+1)?;
                        if pos == 1 || s.get(pos)? != &b')' { None? }
                        pos
                    },
                    _ => None?,
                })
            }
        })
    }

    pub fn is_valid_signature_single(s: &[u8]) -> Result<(), ()> {
        if s.len() > 255 { Err(())? }
        let pos = sig_single(s, 0, 0).ok_or(())?;
        if pos == s.len() { Ok(()) } else { Err(()) }
    }

    pub fn is_valid_signature_multi(s: &[u8]) -> Result<(), ()> {
        if s.len() > 255 { Err(())? }
        let pos = sig_multi(s, 0, 0).ok_or(())?;
        if pos == s.len() { Ok(()) } else { Err(()) }
    }
}

pub (crate) use self::validity::is_valid_signature_single;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn some_path() {
        let p1: Path = "/valid".into();
        assert_eq!(&*p1, "/valid");
        assert!(Path::new("##invalid##").is_err());
        assert!(Path::new("/trailing/").is_err());
    }

    #[test]
    fn reborrow_path() {
        let p1 = Path::from("/valid");
        let p2 = p1.clone();
        {
            let p2_borrow: &Path = &p2;
            let p3 = Path::from(p2_borrow);
            // Check path created from borrow
            assert_eq!(p2, p3);
        }
        // Check path that was previously borrowed
        assert_eq!(p1, p2);
    }

    #[test]
    fn names() {
        assert!(Member::new("He11o").is_ok());
        assert!(Member::new("1Hello").is_err());
        assert!(Interface::new("Hello.W0rld").is_ok());
        assert!(Interface::new("He11o").is_err());
        assert!(BusName::new(":1.54").is_ok());
        assert!(BusName::new("1.54").is_err());
        assert!(ErrorName::new("org.freedesktop.DBus.Error.Failed").is_ok());
    }

    #[test]
    fn signatures() {
        assert!(Signature::new("a{sv}").is_ok());
        assert!(Signature::new("si").is_ok());
        assert!(Signature::new("").is_ok());
        assert!(Signature::new("a{vs}").is_err());
        assert!(Signature::new("(sa{sv}(i)").is_err());
    }

    #[test]
    fn make_sig() {
        assert_eq!(&*Signature::make::<(&str, u8)>(), "(sy)");
    }
}
