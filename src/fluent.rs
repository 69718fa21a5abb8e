//! The fluent builders behind `Proxy` and `Object`.
//!
//! Each builder is a short-lived, move-only context that collects the
//! parameters of one operation. `on_interface` must come before any other
//! configuration step. The operation is committed by a terminal step - or,
//! for [`MethodInvoker`](struct.MethodInvoker.html) and
//! [`SignalEmitter`](struct.SignalEmitter.html), by the builder going out of
//! scope, in which case the commit is suppressed while the thread is
//! panicking so that an unrelated failure is not drowned out by a
//! fire-and-forget send. Errors on the scope-exit path are logged, never
//! panicked; use the explicit terminals to observe them.

use crate::{Error, Message, PendingAsyncCall, Slot};
use crate::strings::{Interface, Member};
use crate::arg::{Arg, Append, Get, AppendAll, ReadAll, IterAppend, Variant, Value, PropMap};
use crate::channel::Channel;
use crate::object::Object;
use crate::pending::MethodReply;
use crate::proxy::Proxy;
use crate::stdintf::org_freedesktop_dbus::PROPERTIES;
use std::time::Duration;
use futures_channel::oneshot;

fn properties_interface() -> Interface<'static> {
    Interface::from_slice_unchecked(PROPERTIES)
}

fn failed_future<T>(e: Error) -> MethodReply<T> {
    let (tx, rx) = oneshot::channel();
    let _ = tx.send(Err(e));
    MethodReply::new(rx, None)
}

/// Fluent synchronous method call.
///
/// Created by [`Proxy::call_method`](struct.Proxy.html#method.call_method).
/// With no terminal step, the call is committed fire-and-forget when the
/// invoker goes out of scope (unless the thread is panicking).
pub struct MethodInvoker<'a, C: Channel> {
    proxy: &'a Proxy<C>,
    method_name: Option<Member<'static>>,
    msg: Option<Message>,
    timeout: Option<Duration>,
    committed: bool,
}

impl<'a, C: Channel> MethodInvoker<'a, C> {
    pub (crate) fn new(proxy: &'a Proxy<C>, method_name: Member<'static>) -> Self {
        MethodInvoker { proxy, method_name: Some(method_name), msg: None, timeout: None, committed: false }
    }

    /// Selects the interface the method belongs to. Must be the first
    /// configuration step.
    pub fn on_interface<I: Into<Interface<'static>>>(mut self, interface: I) -> Self {
        let name = self.method_name.take().expect("on_interface() may only be called once");
        self.msg = Some(self.proxy.create_method_call(interface.into(), name));
        self
    }

    /// Overrides the proxy's default timeout for this call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Appends the method's input arguments.
    pub fn with_arguments<A: AppendAll>(mut self, args: A) -> Self {
        let m = self.msg.as_mut().expect("on_interface() must be called before with_arguments()");
        args.append(&mut IterAppend::new(m));
        self
    }

    /// Commits the call, blocks for the reply and deserializes it into R.
    pub fn read_results<R: ReadAll>(mut self) -> Result<R, Error> {
        let msg = self.msg.take().expect("on_interface() must be called before read_results()");
        self.committed = true;
        let reply = self.proxy.call(msg, self.timeout)?;
        Ok(reply.read_all()?)
    }

    /// Commits the call explicitly, discarding any reply payload.
    pub fn send(mut self) -> Result<(), Error> {
        let msg = self.msg.take().expect("on_interface() must be called before send()");
        self.committed = true;
        MethodInvoker::commit(self.proxy, msg, self.timeout)
    }

    /// Marks the call as not expecting a reply and commits it.
    ///
    /// The dispatched message carries the no-reply header flag, no reply
    /// handler is registered, and the caller is never blocked waiting.
    pub fn dont_expect_reply(mut self) -> Result<(), Error> {
        self.msg.as_mut().expect("on_interface() must be called before dont_expect_reply()")
            .set_no_reply(true);
        self.send()
    }

    fn commit(proxy: &Proxy<C>, msg: Message, timeout: Option<Duration>) -> Result<(), Error> {
        if msg.get_no_reply() {
            proxy.connection.send(msg).map(|_| ())
        } else {
            proxy.call(msg, timeout).map(|_| ())
        }
    }
}

impl<'a, C: Channel> Drop for MethodInvoker<'a, C> {
    fn drop(&mut self) {
        if self.committed || std::thread::panicking() { return };
        match self.msg.take() {
            Some(msg) => {
                if let Err(e) = MethodInvoker::commit(self.proxy, msg, self.timeout) {
                    log::warn!("fire-and-forget method call failed: {}", e);
                }
            }
            None => {
                if let Some(name) = self.method_name.take() {
                    log::warn!("method call {} dropped before on_interface() was called", name);
                }
            }
        }
    }
}

/// Fluent asynchronous method call.
///
/// Created by [`Proxy::call_method_async`](struct.Proxy.html#method.call_method_async).
/// Commit with [`upon_reply_invoke`](#method.upon_reply_invoke) or
/// [`get_result_as_future`](#method.get_result_as_future).
pub struct AsyncMethodInvoker<'a, C: Channel> {
    proxy: &'a Proxy<C>,
    method_name: Option<Member<'static>>,
    msg: Option<Message>,
    timeout: Option<Duration>,
}

impl<'a, C: Channel> AsyncMethodInvoker<'a, C> {
    pub (crate) fn new(proxy: &'a Proxy<C>, method_name: Member<'static>) -> Self {
        AsyncMethodInvoker { proxy, method_name: Some(method_name), msg: None, timeout: None }
    }

    /// Selects the interface the method belongs to. Must be the first
    /// configuration step.
    pub fn on_interface<I: Into<Interface<'static>>>(mut self, interface: I) -> Self {
        let name = self.method_name.take().expect("on_interface() may only be called once");
        self.msg = Some(self.proxy.create_method_call(interface.into(), name));
        self
    }

    /// Overrides the proxy's default timeout for this call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Appends the method's input arguments.
    pub fn with_arguments<A: AppendAll>(mut self, args: A) -> Self {
        let m = self.msg.as_mut().expect("on_interface() must be called before with_arguments()");
        args.append(&mut IterAppend::new(m));
        self
    }

    /// Commits the call and registers a typed reply callback.
    ///
    /// On success the reply is deserialized into R and handed to the
    /// callback; a remote error, timeout, or deserialization failure arrives
    /// through the same callback as an `Err`. The callback runs exactly once
    /// on the dispatch thread, unless the call is cancelled first through the
    /// returned handle.
    pub fn upon_reply_invoke<R, F>(mut self, f: F) -> Result<PendingAsyncCall, Error>
    where R: ReadAll + 'static, F: FnOnce(Result<R, Error>) + Send + 'static {
        let msg = self.msg.take().expect("on_interface() must be called before upon_reply_invoke()");
        self.proxy.call_async(msg, self.timeout, move |r| {
            f(r.and_then(|m| Ok(m.read_all::<R>()?)))
        })
    }

    /// Commits the call and returns a future for its results.
    ///
    /// The future resolves to `()` for a method without output arguments,
    /// `(T,)` for one, and `(T1, T2, ...)` for several; remote errors and
    /// deserialization failures resolve it to an `Err`.
    pub fn get_result_as_future<R>(self) -> MethodReply<R>
    where R: ReadAll + Send + 'static {
        let (tx, rx) = oneshot::channel();
        match self.upon_reply_invoke::<R, _>(move |r| { let _ = tx.send(r); }) {
            Ok(call) => MethodReply::new(rx, Some(call)),
            Err(e) => failed_future(e),
        }
    }
}

/// Fluent signal emission, committed on scope exit.
///
/// Created by [`Object::emit_signal`](struct.Object.html#method.emit_signal).
/// The signal is sent when the emitter is dropped - with an empty payload if
/// `with_arguments` was never called - unless the thread is panicking, in
/// which case nothing is emitted. Use [`emit`](#method.emit) to observe
/// failures.
pub struct SignalEmitter<'a, C: Channel + Clone + Send + Sync + 'static> {
    object: &'a Object<C>,
    signal_name: Option<Member<'static>>,
    msg: Option<Message>,
    committed: bool,
}

impl<'a, C: Channel + Clone + Send + Sync + 'static> SignalEmitter<'a, C> {
    pub (crate) fn new(object: &'a Object<C>, signal_name: Member<'static>) -> Self {
        SignalEmitter { object, signal_name: Some(signal_name), msg: None, committed: false }
    }

    /// Selects the interface the signal belongs to. Must be the first
    /// configuration step.
    pub fn on_interface<I: Into<Interface<'static>>>(mut self, interface: I) -> Self {
        let name = self.signal_name.take().expect("on_interface() may only be called once");
        self.msg = Some(self.object.create_signal(interface.into(), name));
        self
    }

    /// Appends the signal's arguments.
    pub fn with_arguments<A: AppendAll>(mut self, args: A) -> Self {
        let m = self.msg.as_mut().expect("on_interface() must be called before with_arguments()");
        args.append(&mut IterAppend::new(m));
        self
    }

    /// Commits the emission explicitly.
    pub fn emit(mut self) -> Result<(), Error> {
        let msg = self.msg.take().expect("on_interface() must be called before emit()");
        self.committed = true;
        self.object.emit_signal_message(msg)
    }
}

impl<'a, C: Channel + Clone + Send + Sync + 'static> Drop for SignalEmitter<'a, C> {
    fn drop(&mut self) {
        if self.committed || std::thread::panicking() { return };
        match self.msg.take() {
            Some(msg) => {
                if let Err(e) = self.object.emit_signal_message(msg) {
                    log::warn!("signal emission failed: {}", e);
                }
            }
            None => {
                if let Some(name) = self.signal_name.take() {
                    log::warn!("signal {} not emitted: on_interface() was never called", name);
                }
            }
        }
    }
}

/// Fluent signal subscription.
///
/// Created by [`Proxy::upon_signal`](struct.Proxy.html#method.upon_signal).
/// The `call*` terminals differ in what happens when an incoming signal fails
/// to deserialize into the handler's argument types: `call` silently drops
/// the signal, `call_with_error` hands the error to the handler.
pub struct SignalSubscriber<'a, C: Channel> {
    proxy: &'a Proxy<C>,
    signal_name: Member<'static>,
    interface: Option<Interface<'static>>,
}

impl<'a, C: Channel> SignalSubscriber<'a, C> {
    pub (crate) fn new(proxy: &'a Proxy<C>, signal_name: Member<'static>) -> Self {
        SignalSubscriber { proxy, signal_name, interface: None }
    }

    /// Selects the interface the signal belongs to. Must be called before a
    /// terminal step.
    pub fn on_interface<I: Into<Interface<'static>>>(mut self, interface: I) -> Self {
        self.interface = Some(interface.into());
        self
    }

    fn parts(&mut self) -> (Interface<'static>, Member<'static>) {
        let i = self.interface.take().expect("on_interface() must be called before subscribing");
        (i, self.signal_name.clone())
    }

    /// Subscribes with a pure handler. Signals that fail to deserialize into
    /// R are dropped. The subscription lives as long as the proxy.
    pub fn call<R, F>(mut self, mut f: F) -> Result<(), Error>
    where R: ReadAll + 'static, F: FnMut(R) + Send + 'static {
        let (i, m) = self.parts();
        self.proxy.register_signal_handler_floating(i, m, move |msg| {
            match msg.read_all::<R>() {
                Ok(r) => f(r),
                Err(e) => log::trace!("dropping signal that did not deserialize: {}", e),
            }
        })
    }

    /// Subscribes with an error-aware handler: deserialization failures are
    /// delivered to the handler instead of dropping the signal.
    pub fn call_with_error<R, F>(mut self, mut f: F) -> Result<(), Error>
    where R: ReadAll + 'static, F: FnMut(Result<R, Error>) + Send + 'static {
        let (i, m) = self.parts();
        self.proxy.register_signal_handler_floating(i, m, move |msg| {
            f(msg.read_all::<R>().map_err(Error::from))
        })
    }

    /// As [`call`](#method.call), but hands the subscription's lifetime to
    /// the caller as a slot.
    pub fn call_with_slot<R, F>(mut self, mut f: F) -> Result<Slot, Error>
    where R: ReadAll + 'static, F: FnMut(R) + Send + 'static {
        let (i, m) = self.parts();
        self.proxy.register_signal_handler(i, m, move |msg| {
            match msg.read_all::<R>() {
                Ok(r) => f(r),
                Err(e) => log::trace!("dropping signal that did not deserialize: {}", e),
            }
        })
    }
}

/// Fluent signal unsubscription.
///
/// Created by [`Proxy::mute_signal`](struct.Proxy.html#method.mute_signal);
/// `on_interface` is the terminal step.
pub struct SignalUnsubscriber<'a, C: Channel> {
    proxy: &'a Proxy<C>,
    signal_name: Member<'static>,
}

impl<'a, C: Channel> SignalUnsubscriber<'a, C> {
    pub (crate) fn new(proxy: &'a Proxy<C>, signal_name: Member<'static>) -> Self {
        SignalUnsubscriber { proxy, signal_name }
    }

    /// Removes the subscription for this signal on the given interface.
    pub fn on_interface<I: Into<Interface<'static>>>(self, interface: I) {
        self.proxy.unregister_signal_handler(interface, self.signal_name.clone());
    }
}

/// Fluent synchronous property read.
///
/// Created by [`Proxy::get_property`](struct.Proxy.html#method.get_property).
pub struct PropertyGetter<'a, C: Channel> {
    proxy: &'a Proxy<C>,
    property: String,
    interface: Option<Interface<'static>>,
}

impl<'a, C: Channel> PropertyGetter<'a, C> {
    pub (crate) fn new(proxy: &'a Proxy<C>, property: String) -> Self {
        PropertyGetter { proxy, property, interface: None }
    }

    /// Selects the interface the property belongs to.
    pub fn on_interface<I: Into<Interface<'static>>>(mut self, interface: I) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// Reads the property, decoding its value into T.
    pub fn get<T>(self) -> Result<T, Error>
    where T: Arg + for<'z> Get<'z> {
        let iface = self.interface.expect("on_interface() must be called before get()");
        let (v,): (Variant<T>,) = self.proxy.method_call(
            properties_interface(), "Get", (&*iface, &*self.property))?;
        Ok(v.0)
    }

    /// Reads the property as a runtime-typed value.
    pub fn get_value(self) -> Result<Variant<Value>, Error> {
        let iface = self.interface.expect("on_interface() must be called before get_value()");
        let (v,): (Variant<Value>,) = self.proxy.method_call(
            properties_interface(), "Get", (&*iface, &*self.property))?;
        Ok(v)
    }
}

/// Fluent asynchronous property read.
///
/// Created by [`Proxy::get_property_async`](struct.Proxy.html#method.get_property_async).
pub struct AsyncPropertyGetter<'a, C: Channel> {
    proxy: &'a Proxy<C>,
    property: String,
    interface: Option<Interface<'static>>,
}

impl<'a, C: Channel> AsyncPropertyGetter<'a, C> {
    pub (crate) fn new(proxy: &'a Proxy<C>, property: String) -> Self {
        AsyncPropertyGetter { proxy, property, interface: None }
    }

    /// Selects the interface the property belongs to.
    pub fn on_interface<I: Into<Interface<'static>>>(mut self, interface: I) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// Commits the read and registers a callback for the value.
    pub fn upon_reply_invoke<F>(self, f: F) -> Result<PendingAsyncCall, Error>
    where F: FnOnce(Result<Variant<Value>, Error>) + Send + 'static {
        let iface = self.interface.clone().expect("on_interface() must be called before upon_reply_invoke()");
        self.proxy.call_method_async("Get")
            .on_interface(properties_interface())
            .with_arguments((&*iface, &*self.property))
            .upon_reply_invoke::<(Variant<Value>,), _>(move |r| f(r.map(|t| t.0)))
    }

    /// Commits the read and returns a future for the value.
    pub fn get_result_as_future(self) -> MethodReply<Variant<Value>> {
        let (tx, rx) = oneshot::channel();
        match self.upon_reply_invoke(move |r| { let _ = tx.send(r); }) {
            Ok(call) => MethodReply::new(rx, Some(call)),
            Err(e) => failed_future(e),
        }
    }
}

/// Fluent synchronous property write.
///
/// Created by [`Proxy::set_property`](struct.Proxy.html#method.set_property).
pub struct PropertySetter<'a, C: Channel> {
    proxy: &'a Proxy<C>,
    property: String,
    interface: Option<Interface<'static>>,
}

impl<'a, C: Channel> PropertySetter<'a, C> {
    pub (crate) fn new(proxy: &'a Proxy<C>, property: String) -> Self {
        PropertySetter { proxy, property, interface: None }
    }

    /// Selects the interface the property belongs to.
    pub fn on_interface<I: Into<Interface<'static>>>(mut self, interface: I) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// Writes the property and blocks until the write is confirmed.
    pub fn to_value<T: Arg + Append>(self, value: T) -> Result<(), Error> {
        let iface = self.interface.expect("on_interface() must be called before to_value()");
        self.proxy.method_call(properties_interface(), "Set", (&*iface, &*self.property, Variant(value)))
    }

    /// Writes the property fire-and-forget: the message carries the no-reply
    /// flag and the caller is never blocked waiting.
    pub fn to_value_no_reply<T: Arg + Append>(self, value: T) -> Result<(), Error> {
        let iface = self.interface.expect("on_interface() must be called before to_value_no_reply()");
        let mut msg = self.proxy.create_method_call(properties_interface(), "Set");
        AppendAll::append((&*iface, &*self.property, Variant(value)), &mut IterAppend::new(&mut msg));
        msg.set_no_reply(true);
        self.proxy.connection.send(msg).map(|_| ())
    }
}

/// Fluent asynchronous property write.
///
/// Created by [`Proxy::set_property_async`](struct.Proxy.html#method.set_property_async).
pub struct AsyncPropertySetter<'a, C: Channel> {
    proxy: &'a Proxy<C>,
    property: String,
    interface: Option<Interface<'static>>,
    msg: Option<Message>,
}

impl<'a, C: Channel> AsyncPropertySetter<'a, C> {
    pub (crate) fn new(proxy: &'a Proxy<C>, property: String) -> Self {
        AsyncPropertySetter { proxy, property, interface: None, msg: None }
    }

    /// Selects the interface the property belongs to.
    pub fn on_interface<I: Into<Interface<'static>>>(mut self, interface: I) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// Sets the value to write.
    pub fn to_value<T: Arg + Append>(mut self, value: T) -> Self {
        let iface = self.interface.clone().expect("on_interface() must be called before to_value()");
        let mut msg = self.proxy.create_method_call(properties_interface(), "Set");
        AppendAll::append((&*iface, &*self.property, Variant(value)), &mut IterAppend::new(&mut msg));
        self.msg = Some(msg);
        self
    }

    /// Commits the write and registers a completion callback.
    pub fn upon_reply_invoke<F>(mut self, f: F) -> Result<PendingAsyncCall, Error>
    where F: FnOnce(Result<(), Error>) + Send + 'static {
        let msg = self.msg.take().expect("to_value() must be called before upon_reply_invoke()");
        self.proxy.call_async(msg, None, move |r| f(r.map(|_| ())))
    }

    /// Commits the write and returns a future for its completion.
    pub fn get_result_as_future(self) -> MethodReply<()> {
        let (tx, rx) = oneshot::channel();
        match self.upon_reply_invoke(move |r| { let _ = tx.send(r); }) {
            Ok(call) => MethodReply::new(rx, Some(call)),
            Err(e) => failed_future(e),
        }
    }
}

/// Fluent synchronous read of all properties of an interface.
///
/// Created by [`Proxy::get_all_properties`](struct.Proxy.html#method.get_all_properties);
/// `on_interface` is the terminal step.
pub struct AllPropertiesGetter<'a, C: Channel> {
    proxy: &'a Proxy<C>,
}

impl<'a, C: Channel> AllPropertiesGetter<'a, C> {
    pub (crate) fn new(proxy: &'a Proxy<C>) -> Self {
        AllPropertiesGetter { proxy }
    }

    /// Reads all readable properties of the given interface.
    pub fn on_interface<I: Into<Interface<'static>>>(self, interface: I) -> Result<PropMap, Error> {
        let i = interface.into();
        let (props,): (PropMap,) = self.proxy.method_call(properties_interface(), "GetAll", (&*i,))?;
        Ok(props)
    }
}

/// Fluent asynchronous read of all properties of an interface.
///
/// Created by [`Proxy::get_all_properties_async`](struct.Proxy.html#method.get_all_properties_async).
pub struct AsyncAllPropertiesGetter<'a, C: Channel> {
    proxy: &'a Proxy<C>,
    interface: Option<Interface<'static>>,
}

impl<'a, C: Channel> AsyncAllPropertiesGetter<'a, C> {
    pub (crate) fn new(proxy: &'a Proxy<C>) -> Self {
        AsyncAllPropertiesGetter { proxy, interface: None }
    }

    /// Selects the interface whose properties to read.
    pub fn on_interface<I: Into<Interface<'static>>>(mut self, interface: I) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// Commits the read and registers a callback for the property map.
    pub fn upon_reply_invoke<F>(self, f: F) -> Result<PendingAsyncCall, Error>
    where F: FnOnce(Result<PropMap, Error>) + Send + 'static {
        let iface = self.interface.clone().expect("on_interface() must be called before upon_reply_invoke()");
        self.proxy.call_method_async("GetAll")
            .on_interface(properties_interface())
            .with_arguments((&*iface,))
            .upon_reply_invoke::<(PropMap,), _>(move |r| f(r.map(|t| t.0)))
    }

    /// Commits the read and returns a future for the property map.
    pub fn get_result_as_future(self) -> MethodReply<PropMap> {
        let (tx, rx) = oneshot::channel();
        match self.upon_reply_invoke(move |r| { let _ = tx.send(r); }) {
            Ok(call) => MethodReply::new(rx, Some(call)),
            Err(e) => failed_future(e),
        }
    }
}
