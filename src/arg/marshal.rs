// Byte-level marshalling cursors. The body encoding follows the D-Bus wire
// alignment rules, little-endian. Framing (header serialization, endianness
// negotiation) belongs to the connection, not to this crate.

use std::fmt;
use std::convert::TryInto;
use crate::{Message, Signature};
use super::{Arg, Append, Get, ArgType};

pub (crate) fn align_up(pos: usize, align: usize) -> usize {
    (pos + align - 1) & !(align - 1)
}

pub (crate) fn align_of(c: u8) -> usize {
    match c {
        b'y' | b'g' | b'v' => 1,
        b'n' | b'q' => 2,
        b'i' | b'u' | b'b' | b's' | b'o' | b'a' | b'h' => 4,
        b'x' | b't' | b'd' | b'(' | b'{' => 8,
        _ => panic!("Unexpected byte in type signature: {}", c),
    }
}

// Length in bytes of the first single type in sig. Signatures are validated
// on construction, so a malformed one is a caller bug.
pub (crate) fn single_sig_len(sig: &[u8]) -> usize {
    match sig[0] {
        b'a' => 1 + single_sig_len(&sig[1..]),
        b'(' | b'{' => {
            let mut depth = 0;
            for (idx, &c) in sig.iter().enumerate() {
                match c {
                    b'(' | b'{' => depth += 1,
                    b')' | b'}' => {
                        depth -= 1;
                        if depth == 0 { return idx + 1 }
                    }
                    _ => {}
                }
            }
            panic!("Unterminated container in type signature")
        }
        _ => 1,
    }
}

fn read_u8_at(data: &[u8], end: usize, pos: usize) -> Option<u8> {
    if pos + 1 > end { return None };
    data.get(pos).copied()
}

fn read_u16_at(data: &[u8], end: usize, pos: usize) -> Option<u16> {
    if pos + 2 > end { return None };
    data.get(pos..pos+2).map(|x| u16::from_le_bytes(x.try_into().unwrap()))
}

fn read_u32_at(data: &[u8], end: usize, pos: usize) -> Option<u32> {
    if pos + 4 > end { return None };
    data.get(pos..pos+4).map(|x| u32::from_le_bytes(x.try_into().unwrap()))
}

fn read_u64_at(data: &[u8], end: usize, pos: usize) -> Option<u64> {
    if pos + 8 > end { return None };
    data.get(pos..pos+8).map(|x| u64::from_le_bytes(x.try_into().unwrap()))
}

// End offset of the element with the given signature starting at (unaligned) pos.
fn elem_end(data: &[u8], end: usize, pos: usize, sig: &[u8]) -> Option<usize> {
    let pos = align_up(pos, align_of(sig[0]));
    Some(match sig[0] {
        b'y' => pos + 1,
        b'n' | b'q' => pos + 2,
        b'i' | b'u' | b'b' | b'h' => pos + 4,
        b'x' | b't' | b'd' => pos + 8,
        b's' | b'o' => pos + 4 + read_u32_at(data, end, pos)? as usize + 1,
        b'g' => pos + 1 + read_u8_at(data, end, pos)? as usize + 1,
        b'a' => {
            let len = read_u32_at(data, end, pos)? as usize;
            if len > 67108864 { return None };
            align_up(pos + 4, align_of(sig[1])) + len
        }
        b'v' => {
            let siglen = read_u8_at(data, end, pos)? as usize;
            let vsig = data.get(pos + 1..pos + 1 + siglen)?;
            elem_end(data, end, pos + 1 + siglen + 1, vsig)?
        }
        b'(' | b'{' => {
            let mut p = pos;
            let mut inner = &sig[1..sig.len()-1];
            while !inner.is_empty() {
                let l = single_sig_len(inner);
                p = elem_end(data, end, p, &inner[..l])?;
                inner = &inner[l..];
            }
            p
        }
        _ => return None,
    }).filter(|&e| e <= end)
}

/// Error struct to indicate a D-Bus argument type mismatch.
///
/// Might be returned from `iter::read()`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TypeMismatchError {
    pub (crate) expected: ArgType,
    pub (crate) found: ArgType,
    pub (crate) position: u32,
}

impl TypeMismatchError {
    /// The ArgType we were expecting.
    pub fn expected_arg_type(&self) -> ArgType { self.expected }
    /// The ArgType we found instead.
    pub fn found_arg_type(&self) -> ArgType { self.found }
    /// At what argument position the error occurred.
    pub fn pos(&self) -> u32 { self.position }
}

impl std::error::Error for TypeMismatchError {}

impl fmt::Display for TypeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "D-Bus argument type mismatch at position {}: expected {}, found {}",
            self.position, self.expected.as_str(),
            if self.expected == self.found { "same but still different somehow" } else { self.found.as_str() }
        )
    }
}

/// Helper struct for retrieving arguments from a message.
#[derive(Clone, Copy)]
pub struct Iter<'a> {
    data: &'a [u8],
    sig: &'a str,
    pos: usize,
    end: usize,
    sigpos: usize,
    counter: u32,
    // Inside an array the signature describes every element, so it does not
    // advance; the element data does.
    array_elem: bool,
}

impl<'a> Iter<'a> {
    /// Creates a new struct for iterating over the arguments of a message, starting with the first argument.
    pub fn new(m: &'a Message) -> Iter<'a> {
        let (data, sig) = m.read_parts();
        Iter { data, sig, pos: 0, end: data.len(), sigpos: 0, counter: 0, array_elem: false }
    }

    pub (crate) fn from_parts(data: &'a [u8], sig: &'a str) -> Iter<'a> {
        Iter { data, sig, pos: 0, end: data.len(), sigpos: 0, counter: 0, array_elem: false }
    }

    fn has_current(&self) -> bool {
        if self.array_elem { self.pos < self.end } else { self.sigpos < self.sig.len() }
    }

    fn cur_sig(&self) -> Option<&'a str> {
        if !self.has_current() { return None };
        if self.array_elem { return Some(self.sig) };
        let b = &self.sig.as_bytes()[self.sigpos..];
        Some(&self.sig[self.sigpos..self.sigpos + single_sig_len(b)])
    }

    /// Returns the current argument, if T is the argument type. Otherwise returns None.
    pub fn get<T: Get<'a>>(&mut self) -> Option<T> { T::get(self) }

    /// Returns the type signature for the current argument.
    pub fn signature(&self) -> Signature<'static> {
        match self.cur_sig() {
            Some(s) => Signature::new(s.to_string()).unwrap(),
            None => Signature::from_slice_unchecked("").into_static(),
        }
    }

    /// The raw arg_type for the current item.
    ///
    /// Unlike Arg::arg_type, this requires access to self and is not a static method.
    /// You can match this against Arg::arg_type for different types to understand what type the current item is.
    pub fn arg_type(&self) -> ArgType {
        self.cur_sig().and_then(|s| ArgType::from_sig_char(s.as_bytes()[0])).unwrap_or(ArgType::Invalid)
    }

    /// Returns false if there are no more items.
    pub fn next(&mut self) -> bool {
        if let Some(s) = self.cur_sig() {
            match elem_end(self.data, self.end, self.pos, s.as_bytes()) {
                Some(e) => {
                    self.pos = e;
                    if !self.array_elem { self.sigpos += s.len() };
                    self.counter += 1;
                }
                None => {
                    // Truncated data; there is nothing more to read.
                    self.pos = self.end;
                    if !self.array_elem { self.sigpos = self.sig.len() };
                }
            }
        }
        self.has_current()
    }

    /// Wrapper around `get` and `next`. Calls `get`, and then `next` if `get` succeeded.
    ///
    /// Also returns a `Result` rather than an `Option` to work better with `?`.
    pub fn read<T: Arg + Get<'a>>(&mut self) -> Result<T, TypeMismatchError> {
        let r = self.get().ok_or_else(||
             TypeMismatchError { expected: T::ARG_TYPE, found: self.arg_type(), position: self.counter })?;
        self.next();
        Ok(r)
    }

    /// If the current argument is a container of the given type, then a new
    /// iterator over the contents of that container is returned.
    pub fn recurse(&mut self, arg_type: ArgType) -> Option<Iter<'a>> {
        if self.arg_type() != arg_type { return None };
        let s = self.cur_sig()?;
        let sb = s.as_bytes();
        let elem_start = align_up(self.pos, align_of(sb[0]));
        let this_end = elem_end(self.data, self.end, self.pos, sb)?;
        match arg_type {
            ArgType::Struct | ArgType::DictEntry => Some(Iter {
                data: self.data,
                sig: &s[1..s.len()-1],
                pos: elem_start,
                end: this_end,
                sigpos: 0,
                counter: 0,
                array_elem: false,
            }),
            ArgType::Array => {
                let inner = &s[1..];
                let start = align_up(elem_start + 4, align_of(inner.as_bytes()[0]));
                Some(Iter {
                    data: self.data,
                    sig: inner,
                    pos: start,
                    end: this_end,
                    sigpos: 0,
                    counter: 0,
                    array_elem: true,
                })
            }
            ArgType::Variant => {
                let siglen = read_u8_at(self.data, self.end, elem_start)? as usize;
                let vsig = self.data.get(elem_start + 1..elem_start + 1 + siglen)?;
                let vsig = std::str::from_utf8(vsig).ok()?;
                crate::strings::is_valid_signature_single(vsig.as_bytes()).ok()?;
                Some(Iter {
                    data: self.data,
                    sig: vsig,
                    pos: elem_start + 1 + siglen + 1,
                    end: this_end,
                    sigpos: 0,
                    counter: 0,
                    array_elem: false,
                })
            }
            _ => None,
        }
    }

    // Typed accessors for the basic types, used by the Get implementations.

    pub (super) fn get_basic_u64(&self, t: ArgType) -> Option<u64> {
        if self.arg_type() != t { return None };
        let c = t as u8;
        let pos = align_up(self.pos, align_of(c));
        match align_of(c) {
            1 => read_u8_at(self.data, self.end, pos).map(|q| q as u64),
            2 => read_u16_at(self.data, self.end, pos).map(|q| q as u64),
            4 => read_u32_at(self.data, self.end, pos).map(|q| q as u64),
            8 => read_u64_at(self.data, self.end, pos),
            _ => None,
        }
    }

    pub (super) fn get_f64(&self) -> Option<f64> {
        if self.arg_type() != ArgType::Double { return None };
        let pos = align_up(self.pos, 8);
        read_u64_at(self.data, self.end, pos).map(f64::from_bits)
    }

    pub (super) fn get_str(&self, t: ArgType) -> Option<&'a str> {
        if self.arg_type() != t { return None };
        let pos = align_up(self.pos, 4);
        let len = read_u32_at(self.data, self.end, pos)? as usize;
        if pos + 4 + len + 1 > self.end { return None };
        std::str::from_utf8(&self.data[pos + 4..pos + 4 + len]).ok()
    }

    pub (super) fn get_sig_str(&self) -> Option<&'a str> {
        if self.arg_type() != ArgType::Signature { return None };
        let len = read_u8_at(self.data, self.end, self.pos)? as usize;
        if self.pos + 1 + len + 1 > self.end { return None };
        std::str::from_utf8(&self.data[self.pos + 1..self.pos + 1 + len]).ok()
    }
}

impl<'a> fmt::Debug for Iter<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        let mut z = self.clone();
        let mut t = f.debug_tuple("Iter");
        loop {
            t.field(&z.arg_type().as_str());
            if !z.next() { break }
        }
        t.finish()
    }
}

/// Helper struct for appending one or more arguments to a message.
pub struct IterAppend<'a> {
    body: &'a mut Vec<u8>,
    // None while inside a container, where the element signature is implied
    // by the container's own signature.
    sig: Option<&'a mut String>,
}

impl<'a> IterAppend<'a> {
    /// Creates a new IterAppend struct.
    ///
    /// # Panics
    ///
    /// Panics if the message is sealed. Appending is only valid for messages
    /// in build mode.
    pub fn new(m: &'a mut Message) -> IterAppend<'a> {
        assert!(!m.is_sealed(), "cannot append to a sealed message");
        let (body, sig) = m.append_parts();
        IterAppend { body, sig: Some(sig) }
    }

    /// Appends the argument.
    pub fn append<T: Arg + Append>(&mut self, a: T) {
        if let Some(s) = self.sig.as_mut() { s.push_str(&T::signature()) };
        a.append(self)
    }

    fn sub(&mut self) -> IterAppend {
        IterAppend { body: self.body, sig: None }
    }

    // Extends the tracked message signature without writing any data. Needed
    // when a container is written through append_container directly rather
    // than through a typed append.
    pub (crate) fn push_sig(&mut self, s: &str) {
        if let Some(sig) = self.sig.as_mut() { sig.push_str(s) };
    }

    /// Low-level function to append a container.
    ///
    /// The `inner_sig` should be the full signature of one contained element;
    /// it is required for variants and arrays and ignored for structs and
    /// dict entries.
    pub fn append_container<F: FnOnce(&mut IterAppend)>(&mut self, arg_type: ArgType, inner_sig: Option<&str>, f: F) {
        match arg_type {
            ArgType::Struct | ArgType::DictEntry => {
                self.put_pad(8);
                f(&mut self.sub());
            }
            ArgType::Variant => {
                let s = inner_sig.expect("Variants need an inner signature");
                self.put_sig_str(s);
                f(&mut self.sub());
            }
            ArgType::Array => {
                let s = inner_sig.expect("Arrays need an inner signature");
                self.put_pad(4);
                let lenpos = self.body.len();
                self.body.extend_from_slice(&[0, 0, 0, 0]);
                self.put_pad(align_of(s.as_bytes()[0]));
                let start = self.body.len();
                f(&mut self.sub());
                let len = (self.body.len() - start) as u32;
                self.body[lenpos..lenpos + 4].copy_from_slice(&len.to_le_bytes());
            }
            _ => panic!("append_container called with non-container type {:?}", arg_type),
        }
    }

    pub (super) fn put_pad(&mut self, align: usize) {
        while self.body.len() % align != 0 { self.body.push(0) }
    }

    pub (super) fn put_u8(&mut self, v: u8) { self.body.push(v) }

    pub (super) fn put_u16(&mut self, v: u16) {
        self.put_pad(2);
        self.body.extend_from_slice(&v.to_le_bytes());
    }

    pub (super) fn put_u32(&mut self, v: u32) {
        self.put_pad(4);
        self.body.extend_from_slice(&v.to_le_bytes());
    }

    pub (super) fn put_u64(&mut self, v: u64) {
        self.put_pad(8);
        self.body.extend_from_slice(&v.to_le_bytes());
    }

    pub (super) fn put_f64(&mut self, v: f64) {
        self.put_pad(8);
        self.body.extend_from_slice(&v.to_bits().to_le_bytes());
    }

    pub (super) fn put_str(&mut self, s: &str) {
        self.put_u32(s.len() as u32);
        self.body.extend_from_slice(s.as_bytes());
        self.body.push(0);
    }

    pub (super) fn put_sig_str(&mut self, s: &str) {
        debug_assert!(s.len() <= 255);
        self.body.push(s.len() as u8);
        self.body.extend_from_slice(s.as_bytes());
        self.body.push(0);
    }
}
