//! Registration of interface members on a server-side object.
//!
//! A v-table is an ordered list of [`VTableItem`](enum.VTableItem.html)s -
//! methods, signal declarations and properties - registered on an
//! [`Object`](struct.Object.html) for one interface. Items are built with the
//! free functions [`register_method`](fn.register_method.html),
//! [`register_signal`](fn.register_signal.html) and
//! [`register_property`](fn.register_property.html); generated adaptor code
//! calls these from its constructor.

use crate::{Error, Message, Slot};
use crate::strings::{Interface, Member, Signature};
use crate::arg::{Arg, Append, Get, AppendAll, ReadAll, ArgAll, Iter, IterAppend, Variant};
use crate::channel::Channel;
use crate::object::Object;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::fmt;

pub (crate) type ReplySender = Arc<dyn Fn(Message) + Send + Sync>;
pub (crate) type MethodHandler = Box<dyn FnMut(&Message, &ReplySender) -> Option<Message> + Send>;
pub (crate) type PropGetHandler = Box<dyn FnMut(&mut IterAppend) -> Result<(), Error> + Send>;
pub (crate) type PropSetHandler = Box<dyn FnMut(&mut Iter) -> Result<(), Error> + Send>;

/// When a property changes, what the object broadcasts about it in the
/// standard `PropertiesChanged` signal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EmitsChangedSignal {
    /// The signal carries the new value. The default.
    True,
    /// The signal only names the property as invalidated; clients re-read it.
    Invalidates,
    /// The property never changes, so no signal is ever emitted for it.
    Const,
    /// Nothing is emitted for this property.
    False,
}

/// How a property can be accessed over the bus, derived from which callables
/// were registered for it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    /// Only a getter was registered.
    Read,
    /// Only a setter was registered.
    Write,
    /// Both a getter and a setter were registered.
    ReadWrite,
}

#[derive(Debug, Default, Copy, Clone)]
pub (crate) struct ItemFlags {
    pub deprecated: bool,
    pub hidden: bool,
}

/// One entry of a v-table: a method implementation, a signal declaration or
/// a property.
pub enum VTableItem {
    /// A method with its handler.
    Method(MethodItem),
    /// A signal declaration.
    Signal(SignalItem),
    /// A property with its access callables.
    Property(PropertyItem),
}

impl fmt::Debug for VTableItem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VTableItem::Method(m) => write!(f, "Method({})", m.name),
            VTableItem::Signal(s) => write!(f, "Signal({})", s.name),
            VTableItem::Property(p) => write!(f, "Property({})", p.name),
        }
    }
}

/// Starts the registration of a method. Finish with
/// [`implemented_as`](struct.MethodItem.html#method.implemented_as) or
/// [`implemented_as_async`](struct.MethodItem.html#method.implemented_as_async).
pub fn register_method<N: Into<Member<'static>>>(name: N) -> MethodItem {
    MethodItem {
        name: name.into(),
        input_names: vec!(),
        output_names: vec!(),
        in_sig: Signature::from_slice_unchecked(""),
        out_sig: Signature::from_slice_unchecked(""),
        flags: Default::default(),
        handler: None,
    }
}

/// Starts the registration of a signal. Finish with
/// [`with_parameters`](struct.SignalItem.html#method.with_parameters).
pub fn register_signal<N: Into<Member<'static>>>(name: N) -> SignalItem {
    SignalItem {
        name: name.into(),
        param_names: vec!(),
        sig: Signature::from_slice_unchecked(""),
        flags: Default::default(),
    }
}

/// Starts the registration of a property. Add a getter and/or a setter, then
/// convert into a [`VTableItem`](enum.VTableItem.html) with `.into()`.
pub fn register_property<N: Into<String>>(name: N) -> PropertyItem {
    PropertyItem {
        name: name.into(),
        getter: None,
        setter: None,
        value_sig: Signature::from_slice_unchecked(""),
        emits: EmitsChangedSignal::True,
        flags: Default::default(),
    }
}

/// A method registration in progress (and, once the handler is attached, the
/// finished v-table entry).
pub struct MethodItem {
    pub (crate) name: Member<'static>,
    pub (crate) input_names: Vec<&'static str>,
    pub (crate) output_names: Vec<&'static str>,
    pub (crate) in_sig: Signature<'static>,
    pub (crate) out_sig: Signature<'static>,
    pub (crate) flags: ItemFlags,
    pub (crate) handler: Option<MethodHandler>,
}

impl MethodItem {
    /// Names the method's input arguments, for introspection purposes.
    pub fn with_input_param_names(mut self, names: &[&'static str]) -> Self {
        self.input_names = names.to_vec();
        self
    }

    /// Names the method's output arguments, for introspection purposes.
    pub fn with_output_param_names(mut self, names: &[&'static str]) -> Self {
        self.output_names = names.to_vec();
        self
    }

    /// Marks the method as deprecated.
    pub fn deprecated(mut self) -> Self {
        self.flags.deprecated = true;
        self
    }

    /// Hides the method from introspection.
    pub fn hidden(mut self) -> Self {
        self.flags.hidden = true;
        self
    }

    /// The method name.
    pub fn name(&self) -> &Member<'static> { &self.name }

    /// The signature of the input arguments, derived from the implementation.
    pub fn input_signature(&self) -> &Signature<'static> { &self.in_sig }

    /// The signature of the output arguments, derived from the implementation.
    pub fn output_signature(&self) -> &Signature<'static> { &self.out_sig }

    /// The declared input argument names.
    pub fn input_param_names(&self) -> &[&'static str] { &self.input_names }

    /// The declared output argument names.
    pub fn output_param_names(&self) -> &[&'static str] { &self.output_names }

    /// Whether the method was marked deprecated.
    pub fn is_deprecated(&self) -> bool { self.flags.deprecated }

    /// Whether the method is hidden from introspection.
    pub fn is_hidden(&self) -> bool { self.flags.hidden }

    /// Attaches the method implementation and finishes the item.
    ///
    /// The input and output signatures are derived from the callable's
    /// argument and result types. The callable runs on the dispatch thread;
    /// its `Ok` value becomes the method reply, its `Err` the error reply.
    pub fn implemented_as<IA, OA, F>(mut self, mut cb: F) -> VTableItem
    where IA: ReadAll + ArgAll, OA: AppendAll + ArgAll,
          F: FnMut(IA) -> Result<OA, Error> + Send + 'static {
        self.in_sig = IA::signature();
        self.out_sig = OA::signature();
        self.handler = Some(Box::new(move |msg: &Message, _: &ReplySender| {
            let r = msg.read_all::<IA>()
                .map_err(|e| Error::invalid_args(&format!("{}", e)))
                .and_then(|ia| cb(ia));
            if msg.get_no_reply() { return None };
            Some(match r {
                Ok(oa) => {
                    let mut m = Message::new_method_return(msg)?;
                    oa.append(&mut IterAppend::new(&mut m));
                    m
                }
                Err(e) => msg.error_reply(&e),
            })
        }));
        VTableItem::Method(self)
    }

    /// Attaches a truly asynchronous method implementation and finishes the
    /// item.
    ///
    /// Instead of returning its results, the callable receives a
    /// [`MethodResult`](struct.MethodResult.html) which it may satisfy later,
    /// from any thread.
    pub fn implemented_as_async<IA, OA, F>(mut self, mut cb: F) -> VTableItem
    where IA: ReadAll + ArgAll, OA: AppendAll + ArgAll + 'static,
          F: FnMut(MethodResult<OA>, IA) + Send + 'static {
        self.in_sig = IA::signature();
        self.out_sig = OA::signature();
        self.handler = Some(Box::new(move |msg: &Message, sender: &ReplySender| {
            match msg.read_all::<IA>() {
                Err(e) => {
                    if msg.get_no_reply() { None }
                    else { Some(msg.error_reply(&Error::invalid_args(&format!("{}", e)))) }
                }
                Ok(ia) => {
                    let reply = if msg.get_no_reply() { None } else { Message::new_method_return(msg) };
                    cb(MethodResult { reply, sender: sender.clone(), _results: PhantomData }, ia);
                    None
                }
            }
        }));
        VTableItem::Method(self)
    }
}

/// A reply slot for an asynchronous server-side method implementation.
///
/// Moved into the handler; satisfy it exactly once with
/// [`return_results`](#method.return_results) or
/// [`return_error`](#method.return_error). If the slot is dropped
/// unsatisfied, the caller gets no reply (and eventually times out).
pub struct MethodResult<OA: AppendAll> {
    reply: Option<Message>,
    sender: ReplySender,
    _results: PhantomData<fn(OA)>,
}

impl<OA: AppendAll> MethodResult<OA> {
    /// Sends the method reply carrying the given results.
    pub fn return_results(mut self, results: OA) {
        if let Some(mut m) = self.reply.take() {
            results.append(&mut IterAppend::new(&mut m));
            (self.sender)(m);
        }
    }

    /// Sends an error reply.
    pub fn return_error(mut self, e: Error) {
        if let Some(m) = self.reply.take() {
            (self.sender)(m.into_error_reply(&e));
        }
    }
}

/// A signal declaration in progress.
pub struct SignalItem {
    pub (crate) name: Member<'static>,
    pub (crate) param_names: Vec<&'static str>,
    pub (crate) sig: Signature<'static>,
    pub (crate) flags: ItemFlags,
}

impl SignalItem {
    /// The signal name.
    pub fn name(&self) -> &Member<'static> { &self.name }

    /// The signature of the signal's arguments.
    pub fn signature(&self) -> &Signature<'static> { &self.sig }

    /// The declared argument names.
    pub fn param_names(&self) -> &[&'static str] { &self.param_names }

    /// Whether the signal was marked deprecated.
    pub fn is_deprecated(&self) -> bool { self.flags.deprecated }

    /// Marks the signal as deprecated.
    pub fn deprecated(mut self) -> Self {
        self.flags.deprecated = true;
        self
    }

    /// Declares the signal's parameter types and names, and finishes the item.
    pub fn with_parameters<A: ArgAll>(mut self, names: A::strs) -> VTableItem {
        self.sig = A::signature();
        A::strs_sig(names, |name, _| self.param_names.push(name));
        VTableItem::Signal(self)
    }
}

/// A property registration in progress. Convert into a
/// [`VTableItem`](enum.VTableItem.html) with `.into()` once the callables are
/// attached.
pub struct PropertyItem {
    pub (crate) name: String,
    pub (crate) getter: Option<PropGetHandler>,
    pub (crate) setter: Option<PropSetHandler>,
    pub (crate) value_sig: Signature<'static>,
    pub (crate) emits: EmitsChangedSignal,
    pub (crate) flags: ItemFlags,
}

impl PropertyItem {
    /// The property name.
    pub fn name(&self) -> &str { &self.name }

    /// The signature of the property's value type.
    pub fn signature(&self) -> &Signature<'static> { &self.value_sig }

    /// What `PropertiesChanged` broadcasts for this property.
    pub fn update_behavior(&self) -> EmitsChangedSignal { self.emits }

    /// Whether the property is hidden from introspection.
    pub fn is_hidden(&self) -> bool { self.flags.hidden }

    /// Attaches the getter callable. Its result type fixes the property type.
    pub fn with_getter<T, F>(mut self, mut f: F) -> Self
    where T: Arg + Append, F: FnMut() -> Result<T, Error> + Send + 'static {
        self.value_sig = T::signature();
        self.getter = Some(Box::new(move |ia| {
            let v = f()?;
            ia.append(Variant(v));
            Ok(())
        }));
        self
    }

    /// Attaches the setter callable. Its argument type fixes the property type.
    pub fn with_setter<T, F>(mut self, mut f: F) -> Self
    where T: Arg + for<'z> Get<'z>, F: FnMut(T) -> Result<(), Error> + Send + 'static {
        self.value_sig = T::signature();
        self.setter = Some(Box::new(move |i| {
            let v: Variant<T> = i.get().ok_or_else(||
                Error::invalid_args("Property value has wrong type"))?;
            f(v.0)
        }));
        self
    }

    /// Selects what `PropertiesChanged` broadcasts for this property.
    pub fn with_update_behavior(mut self, emits: EmitsChangedSignal) -> Self {
        self.emits = emits;
        self
    }

    /// Hides the property from introspection.
    pub fn hidden(mut self) -> Self {
        self.flags.hidden = true;
        self
    }

    pub (crate) fn access(&self) -> Access {
        match (self.getter.is_some(), self.setter.is_some()) {
            (true, false) | (false, false) => Access::Read,
            (false, true) => Access::Write,
            (true, true) => Access::ReadWrite,
        }
    }
}

impl From<PropertyItem> for VTableItem {
    fn from(p: PropertyItem) -> VTableItem { VTableItem::Property(p) }
}

// The stored form of a registered v-table.
pub (crate) struct VTable {
    pub methods: HashMap<Member<'static>, MethodItem>,
    pub signals: HashMap<Member<'static>, SignalItem>,
    pub properties: HashMap<String, PropertyItem>,
}

impl VTable {
    pub fn from_items(items: Vec<VTableItem>) -> Result<VTable, Error> {
        let mut vt = VTable {
            methods: HashMap::new(),
            signals: HashMap::new(),
            properties: HashMap::new(),
        };
        for item in items {
            let dup = match item {
                VTableItem::Method(m) => {
                    if m.handler.is_none() {
                        return Err(Error::invalid_args(&format!("Method {} has no implementation", m.name)));
                    }
                    let name = m.name.clone();
                    vt.methods.insert(m.name.clone(), m).map(|_| name.to_string())
                }
                VTableItem::Signal(s) => {
                    let name = s.name.clone();
                    vt.signals.insert(s.name.clone(), s).map(|_| name.to_string())
                }
                VTableItem::Property(p) => {
                    let name = p.name.clone();
                    vt.properties.insert(p.name.clone(), p).map(|_| name)
                }
            };
            if let Some(name) = dup {
                return Err(Error::invalid_args(&format!("Duplicate v-table entry {}", name)));
            }
        }
        Ok(vt)
    }
}

/// Builder committing a list of v-table items to an object for one
/// interface.
///
/// Returned by [`Object::add_vtable`](struct.Object.html#method.add_vtable);
/// commit with one of the `for_interface` terminals.
#[must_use = "call for_interface() to register the v-table"]
pub struct VTableAdder<'a, C: Channel + Clone + Send + Sync + 'static> {
    object: &'a Object<C>,
    items: Vec<VTableItem>,
}

impl<'a, C: Channel + Clone + Send + Sync + 'static> VTableAdder<'a, C> {
    pub (crate) fn new(object: &'a Object<C>, items: Vec<VTableItem>) -> Self {
        VTableAdder { object, items }
    }

    /// Registers the v-table under the given interface name. The
    /// registration lives as long as the object (a *floating* slot).
    ///
    /// Fails if the object already has a v-table for this interface.
    pub fn for_interface<I: Into<Interface<'static>>>(self, interface: I) -> Result<(), Error> {
        self.object.add_vtable_impl(interface.into(), self.items, false).map(|_| ())
    }

    /// Like [`for_interface`](#method.for_interface), but hands the
    /// registration's lifetime to the caller: when the returned slot is
    /// dropped, the v-table is removed again.
    pub fn for_interface_with_slot<I: Into<Interface<'static>>>(self, interface: I) -> Result<Slot, Error> {
        self.object.add_vtable_impl(interface.into(), self.items, true)
            .map(|s| s.expect("slot requested"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn signatures_derived_from_callables() {
        let item = register_method("Concatenate")
            .with_input_param_names(&["numbers", "separator"])
            .implemented_as(|(numbers, separator): (Vec<i32>, String)| {
                let r: Vec<String> = numbers.iter().map(|n| n.to_string()).collect();
                Ok((r.join(&separator),))
            });
        match item {
            VTableItem::Method(m) => {
                assert_eq!(&*m.in_sig, "ais");
                assert_eq!(&*m.out_sig, "s");
                assert!(m.handler.is_some());
            }
            _ => panic!("not a method"),
        }
    }

    #[test]
    fn signal_item_parameters() {
        let item = register_signal("StateChanged").with_parameters::<(String, u32)>(("state", "ttl"));
        match item {
            VTableItem::Signal(s) => {
                assert_eq!(&*s.sig, "su");
                assert_eq!(s.param_names, vec!["state", "ttl"]);
            }
            _ => panic!("not a signal"),
        }
    }

    #[test]
    fn property_access() {
        let p = register_property("State").with_getter(|| Ok("idle".to_string()));
        assert_eq!(p.access(), Access::Read);
        assert_eq!(&*p.value_sig, "s");
        let p = p.with_setter(|_: String| Ok(()));
        assert_eq!(p.access(), Access::ReadWrite);
    }

    #[test]
    fn duplicate_items_rejected() {
        let items = vec![
            register_signal("S").with_parameters::<()>(()),
            register_signal("S").with_parameters::<(u8,)>(("b",)),
        ];
        assert!(VTable::from_items(items).is_err());
    }
}
