use crate::{Error, Message, MatchRule, Slot, PendingAsyncCall};
use crate::strings::{BusName, Path, Interface, Member};
use crate::arg::{AppendAll, ReadAll, IterAppend};
use crate::channel::Channel;
use crate::pending::send_pending_call;
use crate::fluent::{MethodInvoker, AsyncMethodInvoker, SignalSubscriber, SignalUnsubscriber,
    PropertyGetter, AsyncPropertyGetter, PropertySetter, AsyncPropertySetter,
    AllPropertiesGetter, AsyncAllPropertiesGetter};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// A client-side handle to a remote object.
///
/// A proxy is the (service name, object path) pair on a connection; calling
/// methods on the proxy calls methods on the remote object. The fluent entry
/// points ([`call_method`](#method.call_method),
/// [`upon_signal`](#method.upon_signal), [`get_property`](#method.get_property)
/// and friends) return short-lived builders that collect the call's
/// parameters and commit on their terminal step.
pub struct Proxy<C> {
    /// Destination, i e what D-Bus service you're communicating with.
    pub destination: BusName<'static>,
    /// Object path on the destination.
    pub path: Path<'static>,
    /// Default timeout for method calls.
    pub timeout: Duration,
    /// Some way to send and/or receive messages.
    pub connection: C,
    signal_slots: Mutex<HashMap<(Interface<'static>, Member<'static>), Slot>>,
}

impl<C> Proxy<C> {
    /// Creates a new proxy struct.
    pub fn new<D, P>(destination: D, path: P, timeout: Duration, connection: C) -> Self
    where D: Into<BusName<'static>>, P: Into<Path<'static>> {
        Proxy {
            destination: destination.into(),
            path: path.into(),
            timeout,
            connection,
            signal_slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<C: Channel> Proxy<C> {
    /// Builds an unsealed method call message targeting this proxy's
    /// destination and path.
    pub fn create_method_call<I, M>(&self, interface: I, method: M) -> Message
    where I: Into<Interface<'static>>, M: Into<Member<'static>> {
        Message::method_call(&self.destination, &self.path, &interface.into(), &method.into())
    }

    /// Sends a method call message and blocks until the reply arrives, the
    /// timeout expires, or an error is returned.
    pub fn call(&self, msg: Message, timeout: Option<Duration>) -> Result<Message, Error> {
        let reply = self.connection.send_with_reply_and_block(msg, timeout.unwrap_or(self.timeout))
            .and_then(|m| m.as_result())?;
        if reply.msg_type() != crate::MessageType::MethodReturn {
            return Err(Error::invalid_reply("Reply message has unexpected type"));
        }
        Ok(reply)
    }

    /// Sends a method call message and registers a handler for its reply.
    ///
    /// The handler is invoked on the dispatch thread, exactly once, with the
    /// reply or an error. The returned handle can cancel the call; after
    /// cancellation the handler is guaranteed not to run.
    pub fn call_async<F>(&self, msg: Message, timeout: Option<Duration>, f: F) -> Result<PendingAsyncCall, Error>
    where F: FnOnce(Result<Message, Error>) + Send + 'static {
        send_pending_call(&self.connection, msg, timeout.unwrap_or(self.timeout), f)
    }

    /// Make a method call using typed input and output arguments, then block
    /// waiting for a reply.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let proxy = Proxy::new("org.freedesktop.DBus", "/", Duration::from_millis(5000), conn);
    /// let (has_owner,): (bool,) = proxy.method_call("org.freedesktop.DBus", "NameHasOwner", ("dummy.name.without.owner",))?;
    /// ```
    pub fn method_call<R, A, I, M>(&self, interface: I, method: M, args: A) -> Result<R, Error>
    where R: ReadAll, A: AppendAll, I: Into<Interface<'static>>, M: Into<Member<'static>> {
        let mut msg = self.create_method_call(interface, method);
        args.append(&mut IterAppend::new(&mut msg));
        let reply = self.call(msg, None)?;
        Ok(reply.read_all()?)
    }

    /// Starts a fluent method call: `proxy.call_method("Foo").on_interface(..)...`.
    ///
    /// Without a terminal step, the call is committed fire-and-forget when
    /// the invoker goes out of scope.
    pub fn call_method<M: Into<Member<'static>>>(&self, method: M) -> MethodInvoker<C> {
        MethodInvoker::new(self, method.into())
    }

    /// Starts a fluent asynchronous method call. Commit with
    /// `upon_reply_invoke` or `get_result_as_future`.
    pub fn call_method_async<M: Into<Member<'static>>>(&self, method: M) -> AsyncMethodInvoker<C> {
        AsyncMethodInvoker::new(self, method.into())
    }

    /// Starts a fluent signal subscription.
    pub fn upon_signal<M: Into<Member<'static>>>(&self, signal: M) -> SignalSubscriber<C> {
        SignalSubscriber::new(self, signal.into())
    }

    /// Starts a fluent signal unsubscription, undoing an
    /// [`upon_signal`](#method.upon_signal) subscription.
    pub fn mute_signal<M: Into<Member<'static>>>(&self, signal: M) -> SignalUnsubscriber<C> {
        SignalUnsubscriber::new(self, signal.into())
    }

    /// Starts a fluent property read.
    pub fn get_property<N: Into<String>>(&self, property: N) -> PropertyGetter<C> {
        PropertyGetter::new(self, property.into())
    }

    /// Starts a fluent asynchronous property read.
    pub fn get_property_async<N: Into<String>>(&self, property: N) -> AsyncPropertyGetter<C> {
        AsyncPropertyGetter::new(self, property.into())
    }

    /// Starts a fluent property write.
    pub fn set_property<N: Into<String>>(&self, property: N) -> PropertySetter<C> {
        PropertySetter::new(self, property.into())
    }

    /// Starts a fluent asynchronous property write.
    pub fn set_property_async<N: Into<String>>(&self, property: N) -> AsyncPropertySetter<C> {
        AsyncPropertySetter::new(self, property.into())
    }

    /// Starts a fluent read of all properties of an interface.
    pub fn get_all_properties(&self) -> AllPropertiesGetter<C> {
        AllPropertiesGetter::new(self)
    }

    /// Starts a fluent asynchronous read of all properties of an interface.
    pub fn get_all_properties_async(&self) -> AsyncAllPropertiesGetter<C> {
        AsyncAllPropertiesGetter::new(self)
    }

    /// Subscribes to a signal of this proxy's destination and path.
    ///
    /// The handler runs on the dispatch thread for every matching signal.
    /// The subscription lives until the returned slot is dropped.
    pub fn register_signal_handler<I, M, F>(&self, interface: I, member: M, handler: F) -> Result<Slot, Error>
    where I: Into<Interface<'static>>, M: Into<Member<'static>>, F: FnMut(Message) + Send + 'static {
        let mut rule = MatchRule::new_signal(interface.into(), member.into()).static_clone();
        rule.sender = Some(self.destination.clone());
        rule.path = Some(self.path.clone());
        self.connection.add_match(rule, Box::new(handler))
    }

    // As register_signal_handler, but the subscription is owned by the proxy
    // and keyed by (interface, member) so it can be unregistered by name.
    pub (crate) fn register_signal_handler_floating<F>(&self, interface: Interface<'static>,
        member: Member<'static>, handler: F) -> Result<(), Error>
    where F: FnMut(Message) + Send + 'static {
        let slot = self.register_signal_handler(interface.clone(), member.clone(), handler)?;
        self.signal_slots.lock().unwrap().insert((interface, member), slot);
        Ok(())
    }

    /// Removes a subscription made through the fluent
    /// [`upon_signal`](#method.upon_signal) interface.
    pub fn unregister_signal_handler<I, M>(&self, interface: I, member: M)
    where I: Into<Interface<'static>>, M: Into<Member<'static>> {
        self.signal_slots.lock().unwrap().remove(&(interface.into(), member.into()));
    }
}
