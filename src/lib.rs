//! A typed, fluent high-level API for D-Bus.
//!
//! [D-Bus](http://dbus.freedesktop.org/) is a message bus, and is mainly used in Linux
//! for communication between processes. This crate contains the typed marshalling and
//! dispatch core of a high-level D-Bus binding: it derives D-Bus type signatures from
//! Rust types, builds and reads messages through typed cursors, and offers fluent
//! builders for method calls, signals and properties on both the client (`Proxy`) and
//! the server (`Object`) side.
//!
//! The bus connection itself - socket I/O, authentication and the event loop - is not
//! part of this crate. It is consumed through the [`channel::Channel`](channel/trait.Channel.html)
//! trait, so the same objects and proxies run against libdbus-based, native or in-process
//! connections alike.
//!
//! # Example
//!
//! ```ignore
//! let proxy = Proxy::new("org.freedesktop.DBus", "/", Duration::from_millis(5000), conn);
//! let (names,): (Vec<String>,) = proxy.call_method("ListNames")
//!     .on_interface("org.freedesktop.DBus")
//!     .read_results()?;
//! ```

#![warn(missing_docs)]

mod message;
pub use crate::message::{Message, MessageType};

mod error;
pub use crate::error::{Error, ErrorKind};

mod slot;
pub use crate::slot::Slot;

mod matchrule;
pub use crate::matchrule::MatchRule;

mod strings;
pub use crate::strings::{Signature, Path, Interface, Member, ErrorName, BusName};

pub mod channel;

mod pending;
pub use crate::pending::{PendingAsyncCall, MethodReply};

pub mod arg;

mod vtable;
pub use crate::vtable::{register_method, register_signal, register_property,
    VTableItem, VTableAdder, MethodResult, EmitsChangedSignal, Access};

mod object;
pub use crate::object::Object;

mod proxy;
pub use crate::proxy::Proxy;

mod fluent;
pub use crate::fluent::{MethodInvoker, AsyncMethodInvoker, SignalEmitter,
    SignalSubscriber, SignalUnsubscriber, PropertyGetter, AsyncPropertyGetter,
    PropertySetter, AsyncPropertySetter, AllPropertiesGetter, AsyncAllPropertiesGetter};

pub mod stdintf;
