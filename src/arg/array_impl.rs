use super::*;
use crate::Signature;
use std::collections::{HashMap, BTreeMap};
use std::hash::Hash;

// Arrays, fixed-size arrays and slices all map to the D-Bus array type.
// Unordered and ordered maps both map to a dict (an array of dict entries).

fn array_signature<T: Arg>() -> Signature<'static> {
    Signature::new(format!("a{}", T::signature())).unwrap()
}

fn dict_signature<K: DictKey, V: Arg>() -> Signature<'static> {
    Signature::new(format!("a{{{}{}}}", K::signature(), V::signature())).unwrap()
}

fn append_array<T, I>(i: &mut IterAppend, elems: I)
where T: Arg + Append, I: Iterator<Item=T> {
    let z = T::signature();
    i.append_container(ArgType::Array, Some(&z), |s| {
        for el in elems { el.append(s) }
    });
}

fn append_dict<K, V, I>(i: &mut IterAppend, pairs: I)
where K: DictKey + Append, V: Arg + Append, I: Iterator<Item=(K, V)> {
    let z = format!("{{{}{}}}", K::signature(), V::signature());
    i.append_container(ArgType::Array, Some(&z), |s| {
        for (k, v) in pairs {
            s.append_container(ArgType::DictEntry, None, |ss| {
                k.append(ss);
                v.append(ss);
            });
        }
    });
}

fn get_dict<'a, K, V>(i: &mut Iter<'a>) -> Option<Vec<(K, V)>>
where K: DictKey + Get<'a>, V: Get<'a> {
    let mut si = i.recurse(ArgType::Array)?;
    let mut v = vec!();
    while si.arg_type() == ArgType::DictEntry {
        let mut entry = si.recurse(ArgType::DictEntry)?;
        let k = entry.get()?;
        if !entry.next() { return None };
        let val = entry.get()?;
        v.push((k, val));
        if !si.next() { break };
    }
    Some(v)
}

impl<T: Arg> Arg for Vec<T> {
    const ARG_TYPE: ArgType = ArgType::Array;
    fn signature() -> Signature<'static> { array_signature::<T>() }
}

impl<T: Arg + Append> Append for Vec<T> {
    fn append(self, i: &mut IterAppend) { append_array(i, self.into_iter()) }
}

impl<'a, T: Arg + Get<'a>> Get<'a> for Vec<T> {
    fn get(i: &mut Iter<'a>) -> Option<Self> {
        let mut si = i.recurse(ArgType::Array)?;
        let mut v = vec!();
        while si.arg_type() != ArgType::Invalid {
            v.push(si.get()?);
            if !si.next() { break };
        }
        Some(v)
    }
}

impl<'a, T: Arg> Arg for &'a [T] {
    const ARG_TYPE: ArgType = ArgType::Array;
    fn signature() -> Signature<'static> { array_signature::<T>() }
}

impl<'a, T: Arg + Append + Clone> Append for &'a [T] {
    fn append(self, i: &mut IterAppend) { append_array(i, self.iter().cloned()) }
}

impl<T: Arg, const N: usize> Arg for [T; N] {
    const ARG_TYPE: ArgType = ArgType::Array;
    fn signature() -> Signature<'static> { array_signature::<T>() }
}

impl<T: Arg + Append, const N: usize> Append for [T; N] {
    fn append(self, i: &mut IterAppend) { append_array(i, IntoIterator::into_iter(self)) }
}

impl<K: DictKey, V: Arg, S> Arg for HashMap<K, V, S> {
    const ARG_TYPE: ArgType = ArgType::Array;
    fn signature() -> Signature<'static> { dict_signature::<K, V>() }
}

impl<K: DictKey + Append, V: Arg + Append, S> Append for HashMap<K, V, S> {
    fn append(self, i: &mut IterAppend) { append_dict(i, self.into_iter()) }
}

impl<'a, K, V, S> Get<'a> for HashMap<K, V, S>
where K: DictKey + Get<'a> + Eq + Hash, V: Arg + Get<'a>, S: std::hash::BuildHasher + Default {
    fn get(i: &mut Iter<'a>) -> Option<Self> {
        get_dict(i).map(|v| v.into_iter().collect())
    }
}

impl<K: DictKey, V: Arg> Arg for BTreeMap<K, V> {
    const ARG_TYPE: ArgType = ArgType::Array;
    fn signature() -> Signature<'static> { dict_signature::<K, V>() }
}

impl<K: DictKey + Append, V: Arg + Append> Append for BTreeMap<K, V> {
    fn append(self, i: &mut IterAppend) { append_dict(i, self.into_iter()) }
}

impl<'a, K, V> Get<'a> for BTreeMap<K, V>
where K: DictKey + Get<'a> + Ord, V: Arg + Get<'a> {
    fn get(i: &mut Iter<'a>) -> Option<Self> {
        get_dict(i).map(|v| v.into_iter().collect())
    }
}
