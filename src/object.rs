use crate::{Error, Message, MessageType, Slot};
use crate::strings::{Interface, Member, Path};
use crate::arg::{ArgType, IterAppend};
use crate::channel::{Channel, ObjectCallback};
use crate::vtable::{VTable, VTableItem, VTableAdder, ReplySender, EmitsChangedSignal, Access};
use crate::fluent::SignalEmitter;
use crate::stdintf::org_freedesktop_dbus::PROPERTIES;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct ObjectInner {
    path: Path<'static>,
    vtables: Mutex<HashMap<Interface<'static>, VTable>>,
}

/// A server-side entity exported on an object path.
///
/// An object owns one v-table per interface it implements. Incoming method
/// calls to its path are dispatched on the connection's dispatch thread to
/// the registered handlers, including calls to the standard
/// `org.freedesktop.DBus.Properties` interface, which are answered from the
/// registered property items.
///
/// Dropping the object unregisters the path and all its v-tables.
pub struct Object<C: Channel + Clone + Send + Sync + 'static> {
    inner: Arc<ObjectInner>,
    channel: C,
    slots: Mutex<Vec<Slot>>,
}

impl<C: Channel + Clone + Send + Sync + 'static> Object<C> {
    /// Exports a new object on the given path.
    pub fn new<P: Into<Path<'static>>>(channel: C, path: P) -> Result<Object<C>, Error> {
        let inner = Arc::new(ObjectInner {
            path: path.into(),
            vtables: Mutex::new(HashMap::new()),
        });
        let sender: ReplySender = {
            let c = channel.clone();
            Arc::new(move |m: Message| {
                if let Err(e) = c.send(m) {
                    log::warn!("could not send reply: {}", e);
                }
            })
        };
        let cb: ObjectCallback = {
            let inner = inner.clone();
            let sender = sender.clone();
            Box::new(move |msg| dispatch(&inner, &sender, msg))
        };
        let registration = channel.register_object_path(inner.path.clone(), cb)?;
        Ok(Object { inner, channel, slots: Mutex::new(vec![registration]) })
    }

    /// The path this object lives on.
    pub fn path(&self) -> &Path<'static> { &self.inner.path }

    /// Starts registering a v-table. Commit with
    /// [`for_interface`](vtable/struct.VTableAdder.html#method.for_interface).
    pub fn add_vtable(&self, items: Vec<VTableItem>) -> VTableAdder<C> {
        VTableAdder::new(self, items)
    }

    pub (crate) fn add_vtable_impl(&self, interface: Interface<'static>, items: Vec<VTableItem>,
        return_slot: bool) -> Result<Option<Slot>, Error> {
        let vt = VTable::from_items(items)?;
        {
            let mut g = self.inner.vtables.lock().unwrap();
            if g.contains_key(&interface) {
                return Err(Error::invalid_args(&format!("Interface {} already has a v-table", interface)));
            }
            g.insert(interface.clone(), vt);
        }
        let inner = self.inner.clone();
        let slot = Slot::new(move || { inner.vtables.lock().unwrap().remove(&interface); });
        if return_slot { Ok(Some(slot)) } else {
            self.slots.lock().unwrap().push(slot);
            Ok(None)
        }
    }

    /// Creates an unsealed signal message bound to this object's path.
    pub fn create_signal<I, M>(&self, interface: I, member: M) -> Message
    where I: Into<Interface<'static>>, M: Into<Member<'static>> {
        Message::signal(&self.inner.path, &interface.into(), &member.into())
    }

    /// Starts emitting a signal through the fluent interface. The signal is
    /// sent when the emitter goes out of scope (or on its explicit `emit`),
    /// unless the surrounding scope is unwinding from a panic.
    pub fn emit_signal<M: Into<Member<'static>>>(&self, name: M) -> SignalEmitter<C> {
        SignalEmitter::new(self, name.into())
    }

    /// Publishes a signal message.
    ///
    /// Fails if the message is not a well-formed signal, or if its signature
    /// does not match the declaration in this object's v-table for the
    /// signal's interface and member.
    pub fn emit_signal_message(&self, mut msg: Message) -> Result<(), Error> {
        if msg.msg_type() != MessageType::Signal || !msg.is_valid() {
            return Err(Error::invalid_args("Not a valid signal message"));
        }
        let iface = msg.interface().unwrap().into_static();
        let member = msg.member().unwrap().into_static();
        {
            let g = self.inner.vtables.lock().unwrap();
            let vt = g.get(&iface).ok_or_else(|| Error::unknown_interface(&iface))?;
            let decl = vt.signals.get(&member).ok_or_else(||
                Error::invalid_args(&format!("Signal {} is not declared on {}", member, iface)))?;
            if &*decl.sig != &*msg.signature() {
                return Err(Error::invalid_args(&format!(
                    "Signal {} carries signature {} but is declared as {}", member, msg.signature(), decl.sig)));
            }
        }
        msg.seal();
        self.channel.send(msg).map(|_| ())
    }

    /// Emits the standard `PropertiesChanged` signal for the given properties
    /// of the given interface.
    ///
    /// Properties whose update behavior is `True` are sent with their current
    /// value, `Invalidates` ones are only named; `Const` and `False` ones are
    /// skipped.
    pub fn emit_properties_changed<I: Into<Interface<'static>>>(&self, interface: I, properties: &[&str])
        -> Result<(), Error> {
        let iface = interface.into();
        let mut msg = Message::signal(&self.inner.path,
            &Interface::from_slice_unchecked(PROPERTIES).into_static(),
            &Member::from_slice_unchecked("PropertiesChanged").into_static());
        {
            let mut g = self.inner.vtables.lock().unwrap();
            let vt = g.get_mut(&iface).ok_or_else(|| Error::unknown_interface(&iface))?;
            let mut invalidated: Vec<&str> = vec!();
            let mut ia = IterAppend::new(&mut msg);
            ia.append(&*iface);
            ia.push_sig("a{sv}");
            let mut getter_error = None;
            ia.append_container(ArgType::Array, Some("{sv}"), |s| {
                for &name in properties {
                    let p = match vt.properties.get_mut(name) { Some(p) => p, None => continue };
                    match p.emits {
                        EmitsChangedSignal::True => {
                            if let Some(g) = p.getter.as_mut() {
                                let mut failed = false;
                                s.append_container(ArgType::DictEntry, None, |ss| {
                                    ss.append(name);
                                    if let Err(e) = g(ss) { getter_error = Some(e); failed = true };
                                });
                                if failed { return };
                            }
                        }
                        EmitsChangedSignal::Invalidates => invalidated.push(name),
                        EmitsChangedSignal::Const | EmitsChangedSignal::False => {}
                    }
                }
            });
            if let Some(e) = getter_error { return Err(e) };
            ia.append(invalidated.iter().map(|s| s.to_string()).collect::<Vec<String>>());
        }
        msg.seal();
        self.channel.send(msg).map(|_| ())
    }
}

fn find_interface<'v>(vtables: &'v mut HashMap<Interface<'static>, VTable>,
    iface: Option<&Interface<'static>>, member: &Member<'static>)
    -> Result<&'v mut VTable, Error> {
    match iface {
        Some(i) => vtables.get_mut(i).ok_or_else(|| Error::unknown_interface(i)),
        // D-Bus allows calls without an interface; take the first v-table
        // that has the member.
        None => vtables.values_mut().find(|vt| vt.methods.contains_key(member))
            .ok_or_else(|| Error::unknown_method(member)),
    }
}

fn dispatch(inner: &ObjectInner, sender: &ReplySender, msg: Message) -> Option<Message> {
    if msg.msg_type() != MessageType::MethodCall { return None };
    let member = match msg.member() {
        Some(m) => m.into_static(),
        None => return None,
    };
    let iface = msg.interface().map(|i| i.into_static());
    if iface.as_ref().map(|i| &**i) == Some(PROPERTIES) {
        return dispatch_properties(inner, &msg, &member);
    }

    match dispatch_method(inner, sender, &msg, iface.as_ref(), &member) {
        Ok(reply) => reply,
        Err(e) => if msg.get_no_reply() { None } else { Some(msg.error_reply(&e)) },
    }
}

fn dispatch_method(inner: &ObjectInner, sender: &ReplySender, msg: &Message,
    iface: Option<&Interface<'static>>, member: &Member<'static>)
    -> Result<Option<Message>, Error> {
    // The handler is taken out of the table while it runs, so that it can
    // call back into this object without deadlocking.
    let (key, mut handler) = {
        let mut g = inner.vtables.lock().unwrap();
        let vt = find_interface(&mut g, iface, member)?;
        let desc = vt.methods.get_mut(member).ok_or_else(|| Error::unknown_method(member))?;
        let h = desc.handler.take().ok_or_else(||
            Error::new_failed(&format!("Detected recursive call to {}", member)))?;
        (msg.interface().map(|i| i.into_static()), h)
    };
    let reply = handler(msg, sender);
    let mut g = inner.vtables.lock().unwrap();
    if let Ok(vt) = find_interface(&mut g, key.as_ref(), member) {
        if let Some(desc) = vt.methods.get_mut(member) { desc.handler = Some(handler) };
    }
    Ok(reply)
}

fn dispatch_properties(inner: &ObjectInner, msg: &Message, member: &Member<'static>) -> Option<Message> {
    let r = dispatch_properties_inner(inner, msg, member);
    match r {
        Ok(reply) => if msg.get_no_reply() { None } else { Some(reply) },
        Err(e) => if msg.get_no_reply() { None } else { Some(msg.error_reply(&e)) },
    }
}

// The interface argument arrives as a plain string; resolve it against the
// registered v-tables.
fn interface_key(name: &str) -> Result<Interface<'static>, Error> {
    Interface::new(name).map_err(|_| Error::unknown_interface(name)).map(|i| i.into_static())
}

fn dispatch_properties_inner(inner: &ObjectInner, msg: &Message, member: &Member<'static>)
    -> Result<Message, Error> {
    let mut i = msg.iter_init();
    match &**member {
        "Get" => {
            let iface: String = i.read().map_err(|e| Error::invalid_args(&format!("{}", e)))?;
            let prop: String = i.read().map_err(|e| Error::invalid_args(&format!("{}", e)))?;
            let mut g = inner.vtables.lock().unwrap();
            let vt = g.get_mut(&interface_key(&iface)?).ok_or_else(|| Error::unknown_interface(&iface))?;
            let p = vt.properties.get_mut(&prop).ok_or_else(|| Error::unknown_property(&prop))?;
            let getter = p.getter.as_mut().ok_or_else(||
                Error::access_denied(&format!("Property {} is write-only", prop)))?;
            let mut reply = Message::new_method_return(msg)
                .ok_or_else(|| Error::new_failed("Call cannot be replied to"))?;
            getter(&mut IterAppend::new(&mut reply))?;
            Ok(reply)
        }
        "Set" => {
            let iface: String = i.read().map_err(|e| Error::invalid_args(&format!("{}", e)))?;
            let prop: String = i.read().map_err(|e| Error::invalid_args(&format!("{}", e)))?;
            let mut g = inner.vtables.lock().unwrap();
            let vt = g.get_mut(&interface_key(&iface)?).ok_or_else(|| Error::unknown_interface(&iface))?;
            let p = vt.properties.get_mut(&prop).ok_or_else(|| Error::unknown_property(&prop))?;
            if p.access() == Access::Read {
                return Err(Error::access_denied(&format!("Property {} is read-only", prop)));
            }
            let setter = p.setter.as_mut().unwrap();
            setter(&mut i)?;
            Message::new_method_return(msg).ok_or_else(|| Error::new_failed("Call cannot be replied to"))
        }
        "GetAll" => {
            let iface: String = i.read().map_err(|e| Error::invalid_args(&format!("{}", e)))?;
            let mut g = inner.vtables.lock().unwrap();
            let vt = g.get_mut(&interface_key(&iface)?).ok_or_else(|| Error::unknown_interface(&iface))?;
            let mut reply = Message::new_method_return(msg)
                .ok_or_else(|| Error::new_failed("Call cannot be replied to"))?;
            let mut getter_error = None;
            {
                let mut ia = IterAppend::new(&mut reply);
                ia.push_sig("a{sv}");
                ia.append_container(ArgType::Array, Some("{sv}"), |s| {
                    for (name, p) in vt.properties.iter_mut() {
                        if let Some(g) = p.getter.as_mut() {
                            let mut failed = false;
                            s.append_container(ArgType::DictEntry, None, |ss| {
                                ss.append(&**name);
                                if let Err(e) = g(ss) { getter_error = Some(e); failed = true };
                            });
                            if failed { return };
                        }
                    }
                });
            }
            match getter_error {
                Some(e) => Err(e),
                None => Ok(reply),
            }
        }
        _ => Err(Error::unknown_method(member)),
    }
}
