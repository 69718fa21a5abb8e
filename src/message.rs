use crate::strings::{BusName, Path, Interface, Member, ErrorName, Signature};
use crate::arg::{Append, Arg, AppendAll, Get, Iter, IterAppend, ReadAll, TypeMismatchError};
use crate::Error;
use std::fmt;

/// The type of a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MessageType {
    /// A method call, sent to an object.
    MethodCall = 1,
    /// A reply to a method call, carrying its output arguments.
    MethodReturn = 2,
    /// An error reply to a method call.
    Error = 3,
    /// A broadcast signal.
    Signal = 4,
}

/// A D-Bus message.
///
/// A message owns its marshalled body and its header fields. It starts out in
/// *build* mode, where typed arguments can be appended in signature order;
/// once [`seal`](#method.seal)ed (which the connection does when the message
/// is handed to it) it is immutable and can only be read. Messages are
/// non-copyable; ownership of the body moves with the message.
pub struct Message {
    msg_type: MessageType,
    path: Option<Path<'static>>,
    interface: Option<Interface<'static>>,
    member: Option<Member<'static>>,
    destination: Option<BusName<'static>>,
    sender: Option<BusName<'static>>,
    error_name: Option<ErrorName<'static>>,
    serial: Option<u32>,
    reply_serial: Option<u32>,
    no_reply: bool,
    sig: String,
    body: Vec<u8>,
    sealed: bool,
}

impl Message {
    fn empty(t: MessageType) -> Message {
        Message {
            msg_type: t,
            path: None, interface: None, member: None,
            destination: None, sender: None, error_name: None,
            serial: None, reply_serial: None,
            no_reply: false,
            sig: String::new(),
            body: vec!(),
            sealed: false,
        }
    }

    /// Creates a new method call message.
    pub fn new_method_call<D, P, I, M>(destination: D, path: P, iface: I, method: M) -> Result<Message, String>
    where D: Into<String>, P: Into<String>, I: Into<String>, M: Into<String> {
        let mut m = Message::empty(MessageType::MethodCall);
        m.destination = Some(BusName::new(destination)?.into_static());
        m.path = Some(Path::new(path)?.into_static());
        m.interface = Some(Interface::new(iface)?.into_static());
        m.member = Some(Member::new(method)?.into_static());
        Ok(m)
    }

    /// Creates a new method call message.
    pub fn method_call(destination: &BusName, path: &Path, iface: &Interface, method: &Member) -> Message {
        let mut m = Message::empty(MessageType::MethodCall);
        m.destination = Some(destination.clone().into_static());
        m.path = Some(path.clone().into_static());
        m.interface = Some(iface.clone().into_static());
        m.member = Some(method.clone().into_static());
        m
    }

    /// Creates a method call message with arguments.
    pub fn call_with_args<'d, 'p, 'i, 'm, A, D, P, I, M>(destination: D, path: P, iface: I, method: M, args: A) -> Message
    where D: Into<BusName<'d>>, P: Into<Path<'p>>, I: Into<Interface<'i>>, M: Into<Member<'m>>, A: AppendAll {
        let mut m = Message::method_call(&destination.into(), &path.into(), &iface.into(), &method.into());
        args.append(&mut IterAppend::new(&mut m));
        m
    }

    /// Creates a new signal message.
    pub fn new_signal<P, I, M>(path: P, iface: I, member: M) -> Result<Message, String>
    where P: Into<String>, I: Into<String>, M: Into<String> {
        let mut m = Message::empty(MessageType::Signal);
        m.path = Some(Path::new(path)?.into_static());
        m.interface = Some(Interface::new(iface)?.into_static());
        m.member = Some(Member::new(member)?.into_static());
        Ok(m)
    }

    /// Creates a new signal message.
    pub fn signal(path: &Path, iface: &Interface, member: &Member) -> Message {
        let mut m = Message::empty(MessageType::Signal);
        m.path = Some(path.clone().into_static());
        m.interface = Some(iface.clone().into_static());
        m.member = Some(member.clone().into_static());
        m
    }

    /// Creates a method reply for this method call.
    ///
    /// Returns None if this message is not a method call, or if it has not
    /// been assigned a serial yet.
    pub fn new_method_return(m: &Message) -> Option<Message> {
        if m.msg_type != MessageType::MethodCall { return None };
        let serial = m.serial?;
        let mut r = Message::empty(MessageType::MethodReturn);
        r.reply_serial = Some(serial);
        r.destination = m.sender.clone();
        Some(r)
    }

    /// Creates a method reply for this method call.
    ///
    /// # Panics
    ///
    /// Panics if this message is not a method call with an assigned serial.
    pub fn method_return(&self) -> Message {
        Message::new_method_return(self).expect("method_return() needs a method call message with a serial")
    }

    /// Creates an error reply for this method call.
    pub fn error(&self, error_name: &ErrorName, error_message: &str) -> Message {
        let mut r = Message::empty(MessageType::Error);
        r.error_name = Some(error_name.clone().into_static());
        r.reply_serial = self.serial;
        r.destination = self.sender.clone();
        IterAppend::new(&mut r).append(error_message);
        r
    }

    /// Creates an error reply for this method call from an [`Error`](struct.Error.html).
    pub fn error_reply(&self, e: &Error) -> Message {
        self.error(e.name(), e.message())
    }

    // Turns a prepared method return into an error reply carrying e.
    pub (crate) fn into_error_reply(mut self, e: &Error) -> Message {
        self.msg_type = MessageType::Error;
        self.error_name = Some(e.name().clone());
        self.sig.clear();
        self.body.clear();
        self.sealed = false;
        IterAppend::new(&mut self).append(e.message());
        self
    }

    /// If this message is an error reply, returns it as an `Err`, otherwise
    /// passes the message through.
    pub fn as_result(self) -> Result<Message, Error> {
        if self.msg_type != MessageType::Error { return Ok(self) };
        let name = self.error_name.clone()
            .unwrap_or_else(|| ErrorName::from_slice_unchecked("org.freedesktop.DBus.Error.Failed").into_static());
        let text: String = self.read1().unwrap_or_default();
        Err(Error::new_custom(name, &text))
    }

    /// Get the MessageType of the Message.
    pub fn msg_type(&self) -> MessageType { self.msg_type }

    /// Gets the path this Message is being sent to.
    pub fn path(&self) -> Option<Path> { self.path.as_ref().map(|p| p.into()) }

    /// Gets the interface this Message is being sent to.
    pub fn interface(&self) -> Option<Interface> { self.interface.as_ref().map(|i| i.into()) }

    /// Gets the interface member being called.
    pub fn member(&self) -> Option<Member> { self.member.as_ref().map(|m| m.into()) }

    /// Gets the destination this Message is being sent to.
    pub fn destination(&self) -> Option<BusName> { self.destination.as_ref().map(|d| d.into()) }

    /// Sets the destination of this Message.
    pub fn set_destination(&mut self, dest: Option<BusName>) {
        self.destination = dest.map(|d| d.into_static());
    }

    /// Gets the unique name of the sender of this Message, if the connection filled it in.
    pub fn sender(&self) -> Option<BusName> { self.sender.as_ref().map(|s| s.into()) }

    /// Sets the sender of this Message. Usually done by the connection on dispatch.
    pub fn set_sender(&mut self, sender: Option<BusName>) {
        self.sender = sender.map(|s| s.into_static());
    }

    /// Gets the error name of this Message, if it is an error reply.
    pub fn error_name(&self) -> Option<ErrorName> { self.error_name.as_ref().map(|e| e.into()) }

    /// The serial of the message, if one has been assigned by a connection.
    pub fn get_serial(&self) -> Option<u32> { self.serial }

    /// Assigns a serial to the message. Done by the connection when the message is sent.
    pub fn set_serial(&mut self, val: u32) { self.serial = Some(val) }

    /// Gets the serial of the message this Message is a reply to, if applicable.
    pub fn get_reply_serial(&self) -> Option<u32> { self.reply_serial }

    /// When set to true on a method call, the remote end is told that no
    /// reply is expected and none will be waited for.
    pub fn set_no_reply(&mut self, v: bool) { self.no_reply = v }

    /// Returns true if the message is marked as not expecting a reply.
    pub fn get_no_reply(&self) -> bool { self.no_reply }

    /// The signature of the message body.
    pub fn signature(&self) -> Signature { Signature::from_slice_unchecked(&self.sig) }

    /// Seals the message. A sealed message is immutable; its arguments can
    /// only be read. Done by the connection when the message is handed to it.
    pub fn seal(&mut self) { self.sealed = true }

    /// Returns true if the message has been sealed.
    pub fn is_sealed(&self) -> bool { self.sealed }

    /// A well-formed message has the headers its type requires.
    pub fn is_valid(&self) -> bool {
        match self.msg_type {
            MessageType::MethodCall => self.path.is_some() && self.member.is_some(),
            MessageType::Signal => self.path.is_some() && self.interface.is_some() && self.member.is_some(),
            MessageType::MethodReturn => self.reply_serial.is_some(),
            MessageType::Error => self.error_name.is_some(),
        }
    }

    pub (crate) fn read_parts(&self) -> (&[u8], &str) { (&self.body, &self.sig) }

    pub (crate) fn append_parts(&mut self) -> (&mut Vec<u8>, &mut String) {
        (&mut self.body, &mut self.sig)
    }

    /// Creates a new iterator over the message arguments, starting with the first argument.
    pub fn iter_init(&self) -> Iter { Iter::new(self) }

    /// Appends one argument to this message.
    ///
    /// Use in builder style: e g `m.method_return().append1(5u64)`.
    pub fn append1<A: Arg + Append>(mut self, a: A) -> Self {
        IterAppend::new(&mut self).append(a);
        self
    }

    /// Appends two arguments to this message.
    ///
    /// Use in builder style: e g `m.method_return().append2(5u64, "hello")`.
    pub fn append2<A1: Arg + Append, A2: Arg + Append>(mut self, a1: A1, a2: A2) -> Self {
        {
            let mut i = IterAppend::new(&mut self);
            i.append(a1);
            i.append(a2);
        }
        self
    }

    /// Appends three arguments to this message.
    pub fn append3<A1: Arg + Append, A2: Arg + Append, A3: Arg + Append>(mut self, a1: A1, a2: A2, a3: A3) -> Self {
        {
            let mut i = IterAppend::new(&mut self);
            i.append(a1);
            i.append(a2);
            i.append(a3);
        }
        self
    }

    /// Appends a flat list of arguments to this message.
    pub fn append_all<A: AppendAll>(&mut self, args: A) {
        args.append(&mut IterAppend::new(self));
    }

    /// Gets the first argument from the message, if that argument is of type G1.
    pub fn read1<'a, G1: Arg + Get<'a>>(&'a self) -> Result<G1, TypeMismatchError> {
        let mut i = Iter::new(self);
        i.read()
    }

    /// Gets the first two arguments from the message, if those arguments are of types G1 and G2.
    pub fn read2<'a, G1: Arg + Get<'a>, G2: Arg + Get<'a>>(&'a self) -> Result<(G1, G2), TypeMismatchError> {
        let mut i = Iter::new(self);
        Ok((i.read()?, i.read()?))
    }

    /// Gets the first three arguments from the message, if those arguments are of types G1, G2 and G3.
    pub fn read3<'a, G1: Arg + Get<'a>, G2: Arg + Get<'a>, G3: Arg + Get<'a>>(&'a self) -> Result<(G1, G2, G3), TypeMismatchError> {
        let mut i = Iter::new(self);
        Ok((i.read()?, i.read()?, i.read()?))
    }

    /// Gets all arguments from the message as a flat argument list.
    pub fn read_all<R: ReadAll>(&self) -> Result<R, TypeMismatchError> {
        R::read(&mut Iter::new(self))
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Message")
            .field("type", &self.msg_type)
            .field("path", &self.path)
            .field("interface", &self.interface)
            .field("member", &self.member)
            .field("destination", &self.destination)
            .field("error_name", &self.error_name)
            .field("serial", &self.serial)
            .field("reply_serial", &self.reply_serial)
            .field("signature", &self.sig)
            .finish()
    }
}
