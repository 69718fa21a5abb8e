use crate::strings::ErrorName;
use crate::arg::TypeMismatchError;
use std::fmt;

pub (crate) const ERR_FAILED: &str = "org.freedesktop.DBus.Error.Failed";
pub (crate) const ERR_TIMEOUT: &str = "org.freedesktop.DBus.Error.Timeout";
pub (crate) const ERR_DISCONNECTED: &str = "org.freedesktop.DBus.Error.Disconnected";
pub (crate) const ERR_INVALID_ARGS: &str = "org.freedesktop.DBus.Error.InvalidArgs";
pub (crate) const ERR_INVALID_REPLY: &str = "org.freedesktop.DBus.Error.InvalidReply";
pub (crate) const ERR_INVALID_SIGNATURE: &str = "org.freedesktop.DBus.Error.InvalidSignature";
pub (crate) const ERR_UNKNOWN_METHOD: &str = "org.freedesktop.DBus.Error.UnknownMethod";
pub (crate) const ERR_UNKNOWN_INTERFACE: &str = "org.freedesktop.DBus.Error.UnknownInterface";
pub (crate) const ERR_UNKNOWN_PROPERTY: &str = "org.freedesktop.DBus.Error.UnknownProperty";
pub (crate) const ERR_ACCESS_DENIED: &str = "org.freedesktop.DBus.Error.AccessDenied";

/// A D-Bus error.
///
/// Errors are identified by a reverse-DNS error name plus a human readable
/// message. Errors received from a remote peer keep the name they arrived
/// with; errors originating in this crate use one of the well-known
/// `org.freedesktop.DBus.Error` names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    name: ErrorName<'static>,
    message: String,
}

/// Classification of an [`Error`](struct.Error.html) by its well-known name.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No reply arrived within the given time.
    Timeout,
    /// The connection to the bus was lost.
    Disconnected,
    /// The arguments passed to a method did not match its signature.
    InvalidArgs,
    /// The reply was not of the expected kind.
    InvalidReply,
    /// A message body could not be deserialized into the requested types.
    DeserializationFailure,
    /// No such method on the interface.
    UnknownMethod,
    /// No such interface on the object.
    UnknownInterface,
    /// No such property on the interface.
    UnknownProperty,
    /// The property is not writable (or the caller is not allowed).
    AccessDenied,
    /// An error name outside the set above, as received from a remote peer.
    Remote,
    /// An internal failure in this crate or the connection.
    Internal,
}

impl Error {
    /// Create a new custom D-Bus error.
    pub fn new_custom<'a, N: Into<ErrorName<'a>>>(name: N, message: &str) -> Error {
        Error { name: name.into().into_static(), message: message.to_string() }
    }

    /// Create a new generic D-Bus error with "org.freedesktop.DBus.Error.Failed" as the error name.
    pub fn new_failed(message: &str) -> Error {
        Error::new_custom(ERR_FAILED, message)
    }

    /// A timed-out call, using the well-known timeout error name.
    pub fn timeout(message: &str) -> Error { Error::new_custom(ERR_TIMEOUT, message) }

    /// A lost connection, using the well-known disconnection error name.
    pub fn disconnected(message: &str) -> Error { Error::new_custom(ERR_DISCONNECTED, message) }

    /// Arguments that did not match a method's signature.
    pub fn invalid_args(message: &str) -> Error { Error::new_custom(ERR_INVALID_ARGS, message) }

    /// A reply of an unexpected kind.
    pub fn invalid_reply(message: &str) -> Error { Error::new_custom(ERR_INVALID_REPLY, message) }

    /// A call to a method that does not exist.
    pub fn unknown_method(member: &str) -> Error {
        Error::new_custom(ERR_UNKNOWN_METHOD, &format!("Unknown method {}", member))
    }

    /// A call to an interface that does not exist.
    pub fn unknown_interface(interface: &str) -> Error {
        Error::new_custom(ERR_UNKNOWN_INTERFACE, &format!("Unknown interface {}", interface))
    }

    /// An access to a property that does not exist.
    pub fn unknown_property(property: &str) -> Error {
        Error::new_custom(ERR_UNKNOWN_PROPERTY, &format!("Unknown property {}", property))
    }

    /// A denied access, e g writing a read-only property.
    pub fn access_denied(message: &str) -> Error { Error::new_custom(ERR_ACCESS_DENIED, message) }

    /// Error name, e g 'org.freedesktop.DBus.Error.Failed'.
    pub fn name(&self) -> &ErrorName<'static> { &self.name }

    /// Custom message, e g 'Could not find a matching object path'.
    pub fn message(&self) -> &str { &self.message }

    /// Classifies the error by its name.
    ///
    /// Errors whose name is not one of the well-known names used by this
    /// crate classify as `Remote`.
    pub fn kind(&self) -> ErrorKind {
        match &**self.name() {
            ERR_TIMEOUT => ErrorKind::Timeout,
            ERR_DISCONNECTED => ErrorKind::Disconnected,
            ERR_INVALID_ARGS => ErrorKind::InvalidArgs,
            ERR_INVALID_REPLY => ErrorKind::InvalidReply,
            ERR_INVALID_SIGNATURE => ErrorKind::DeserializationFailure,
            ERR_UNKNOWN_METHOD => ErrorKind::UnknownMethod,
            ERR_UNKNOWN_INTERFACE => ErrorKind::UnknownInterface,
            ERR_UNKNOWN_PROPERTY => ErrorKind::UnknownProperty,
            ERR_ACCESS_DENIED => ErrorKind::AccessDenied,
            ERR_FAILED => ErrorKind::Internal,
            _ => ErrorKind::Remote,
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl From<TypeMismatchError> for Error {
    fn from(t: TypeMismatchError) -> Error {
        Error::new_custom(ERR_INVALID_SIGNATURE, &format!("{}", t))
    }
}

impl<N: Into<ErrorName<'static>>, M: Into<String>> From<(N, M)> for Error {
    fn from((n, m): (N, M)) -> Error { Error { name: n.into(), message: m.into() } }
}
