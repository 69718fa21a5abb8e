//! The contract between this crate and the bus connection.
//!
//! The connection - socket I/O, authentication, serial allocation and the
//! dispatch loop - lives outside this crate. Anything that can send messages,
//! wait for replies and keep registrations implements
//! [`Channel`](trait.Channel.html), and all proxies and objects run on top of
//! it. Incoming replies and signals are delivered on the connection's single
//! dispatch thread; one handler finishing happens-before the next one starts.

use crate::{Error, Message, MatchRule, Slot};
use crate::strings::Path;
use std::time::Duration;
use std::sync::Arc;

/// A handler for the reply to an asynchronous method call.
///
/// Called exactly once with either the reply message or an error (remote
/// error, timeout or disconnection).
pub type ReplyCallback = Box<dyn FnOnce(Result<Message, Error>) + Send + 'static>;

/// A handler for an incoming signal matched by a subscription.
pub type SignalCallback = Box<dyn FnMut(Message) + Send + 'static>;

/// A handler for method calls addressed to a registered object path.
///
/// Returns the reply to send, or None when no reply should be sent now
/// (no-reply calls, or replies sent later through other means).
pub type ObjectCallback = Box<dyn FnMut(Message) -> Option<Message> + Send + 'static>;

/// A connection to the message bus, as seen from this crate.
///
/// The registering operations return a [`Slot`](../struct.Slot.html) owning
/// the registration: the implementation must arrange for the slot's release
/// to deregister, and for a release to be safe at any time (releasing after
/// the registration was consumed is a no-op).
pub trait Channel: Send + Sync {
    /// Sends a message without waiting for any reply. Used for signals and
    /// no-reply method calls. Returns the assigned serial.
    fn send(&self, msg: Message) -> Result<u32, Error>;

    /// Sends a method call and blocks until the reply arrives or the timeout
    /// expires.
    ///
    /// An error reply from the remote side is returned as an `Err`, not as an
    /// `Ok(Message)` of type error.
    fn send_with_reply_and_block(&self, msg: Message, timeout: Duration) -> Result<Message, Error>;

    /// Sends a method call and registers a callback for its reply.
    ///
    /// The callback is invoked on the dispatch thread, exactly once, with the
    /// reply or with a timeout/disconnection error. Releasing the returned
    /// slot before that unregisters the callback, which is then never
    /// invoked.
    fn send_with_reply(&self, msg: Message, reply: ReplyCallback, timeout: Duration) -> Result<Slot, Error>;

    /// Registers a handler for method calls to the given object path.
    fn register_object_path(&self, path: Path<'static>, cb: ObjectCallback) -> Result<Slot, Error>;

    /// Subscribes to messages matching the rule. For rules matching signals
    /// this tells the bus to start sending them our way.
    fn add_match(&self, rule: MatchRule<'static>, cb: SignalCallback) -> Result<Slot, Error>;

    /// Runs a closure on the connection's dispatch thread, serialized with
    /// respect to message handlers.
    fn invoke_in_dispatch_thread(&self, f: Box<dyn FnOnce() + Send>);
}

impl<T: Channel + ?Sized> Channel for Arc<T> {
    fn send(&self, msg: Message) -> Result<u32, Error> { (**self).send(msg) }
    fn send_with_reply_and_block(&self, msg: Message, timeout: Duration) -> Result<Message, Error> {
        (**self).send_with_reply_and_block(msg, timeout)
    }
    fn send_with_reply(&self, msg: Message, reply: ReplyCallback, timeout: Duration) -> Result<Slot, Error> {
        (**self).send_with_reply(msg, reply, timeout)
    }
    fn register_object_path(&self, path: Path<'static>, cb: ObjectCallback) -> Result<Slot, Error> {
        (**self).register_object_path(path, cb)
    }
    fn add_match(&self, rule: MatchRule<'static>, cb: SignalCallback) -> Result<Slot, Error> {
        (**self).add_match(rule, cb)
    }
    fn invoke_in_dispatch_thread(&self, f: Box<dyn FnOnce() + Send>) {
        (**self).invoke_in_dispatch_thread(f)
    }
}

impl<'a, T: Channel + ?Sized> Channel for &'a T {
    fn send(&self, msg: Message) -> Result<u32, Error> { (**self).send(msg) }
    fn send_with_reply_and_block(&self, msg: Message, timeout: Duration) -> Result<Message, Error> {
        (**self).send_with_reply_and_block(msg, timeout)
    }
    fn send_with_reply(&self, msg: Message, reply: ReplyCallback, timeout: Duration) -> Result<Slot, Error> {
        (**self).send_with_reply(msg, reply, timeout)
    }
    fn register_object_path(&self, path: Path<'static>, cb: ObjectCallback) -> Result<Slot, Error> {
        (**self).register_object_path(path, cb)
    }
    fn add_match(&self, rule: MatchRule<'static>, cb: SignalCallback) -> Result<Slot, Error> {
        (**self).add_match(rule, cb)
    }
    fn invoke_in_dispatch_thread(&self, f: Box<dyn FnOnce() + Send>) {
        (**self).invoke_in_dispatch_thread(f)
    }
}

/// The reply to send when a method call matched no registered handler.
///
/// Returns None if the message is not a method call, or does not expect a
/// reply.
pub fn default_reply(msg: &Message) -> Option<Message> {
    if msg.msg_type() != crate::MessageType::MethodCall || msg.get_no_reply() { return None };
    let member = msg.member().map(|m| m.to_string()).unwrap_or_default();
    Some(msg.error_reply(&Error::unknown_method(&member)))
}
