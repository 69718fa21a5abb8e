//! An in-process loopback channel, standing in for a real bus connection.
//!
//! Method calls are dispatched straight into the registered object handlers
//! on the calling thread (which therefore plays the role of the dispatch
//! thread). Replies to asynchronous calls are queued and delivered on
//! `process()`, so tests can interleave cancellation with delivery;
//! `expire_pending()` stands in for the bus timing out outstanding calls.

#![allow(dead_code)]

use dbus_fluent::channel::{self, Channel, ObjectCallback, ReplyCallback, SignalCallback};
use dbus_fluent::{Error, MatchRule, Message, MessageType, Path, Slot};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct State {
    next_serial: u32,
    next_token: u64,
    objects: HashMap<String, Option<ObjectCallback>>,
    matches: HashMap<u64, (MatchRule<'static>, Option<SignalCallback>)>,
    pending: HashMap<u64, ReplyCallback>,
    serial_to_token: HashMap<u32, u64>,
    sync_waiting: HashMap<u32, Option<Message>>,
    ready: Vec<(u64, Result<Message, Error>)>,
    dispatched_no_reply_flags: Vec<bool>,
}

#[derive(Default)]
pub struct LocalChannel {
    state: Arc<Mutex<State>>,
}

impl LocalChannel {
    pub fn new() -> Arc<LocalChannel> {
        Arc::new(Default::default())
    }

    /// Delivers all queued async replies to their callbacks, in arrival order.
    pub fn process(&self) {
        loop {
            let item = {
                let mut g = self.state.lock().unwrap();
                if g.ready.is_empty() { None } else { Some(g.ready.remove(0)) }
            };
            let (token, r) = match item { Some(x) => x, None => break };
            let cb = self.state.lock().unwrap().pending.remove(&token);
            if let Some(cb) = cb { cb(r) }
        }
    }

    /// Times out every outstanding asynchronous call.
    pub fn expire_pending(&self) {
        let cbs: Vec<ReplyCallback> = {
            let mut g = self.state.lock().unwrap();
            g.ready.clear();
            g.pending.drain().map(|(_, cb)| cb).collect()
        };
        for cb in cbs {
            cb(Err(Error::timeout("Method call timed out")));
        }
    }

    /// Number of reply callbacks still registered.
    pub fn pending_count(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    /// The no-reply flag of the most recently dispatched method call.
    pub fn last_no_reply_flag(&self) -> Option<bool> {
        self.state.lock().unwrap().dispatched_no_reply_flags.last().copied()
    }

    fn alloc_serial(&self, msg: &mut Message) -> u32 {
        let mut g = self.state.lock().unwrap();
        g.next_serial += 1;
        let serial = g.next_serial;
        msg.set_serial(serial);
        serial
    }

    fn dispatch_call(&self, msg: Message) -> Option<Message> {
        self.state.lock().unwrap().dispatched_no_reply_flags.push(msg.get_no_reply());
        let path = msg.path().map(|p| p.to_string());
        let cb = match path.as_ref() {
            Some(p) => self.state.lock().unwrap().objects.get_mut(p).and_then(|e| e.take()),
            None => None,
        };
        match cb {
            Some(mut cb) => {
                let r = cb(msg);
                let mut g = self.state.lock().unwrap();
                if let Some(e) = g.objects.get_mut(path.as_ref().unwrap()) { *e = Some(cb) };
                r
            }
            None => channel::default_reply(&msg),
        }
    }

    fn deliver_signal(&self, msg: Message) {
        let token = {
            let g = self.state.lock().unwrap();
            g.matches.iter().find(|(_, (rule, _))| rule.matches(&msg)).map(|(&t, _)| t)
        };
        let token = match token { Some(t) => t, None => return };
        let cb = self.state.lock().unwrap().matches.get_mut(&token).and_then(|e| e.1.take());
        if let Some(mut cb) = cb {
            cb(msg);
            if let Some(e) = self.state.lock().unwrap().matches.get_mut(&token) { e.1 = Some(cb) };
        }
    }

    // Routes a reply message to whoever is waiting for it.
    fn route_reply(&self, msg: Message) {
        let rs = match msg.get_reply_serial() { Some(rs) => rs, None => return };
        let mut g = self.state.lock().unwrap();
        if let Some(slot) = g.sync_waiting.get_mut(&rs) {
            *slot = Some(msg);
        } else if let Some(token) = g.serial_to_token.remove(&rs) {
            g.ready.push((token, msg.as_result()));
        }
    }
}

impl Channel for LocalChannel {
    fn send(&self, mut msg: Message) -> Result<u32, Error> {
        let serial = self.alloc_serial(&mut msg);
        msg.seal();
        match msg.msg_type() {
            MessageType::Signal => self.deliver_signal(msg),
            MessageType::MethodCall => { self.dispatch_call(msg); }
            MessageType::MethodReturn | MessageType::Error => self.route_reply(msg),
        }
        Ok(serial)
    }

    fn send_with_reply_and_block(&self, mut msg: Message, _timeout: Duration) -> Result<Message, Error> {
        let serial = self.alloc_serial(&mut msg);
        msg.seal();
        self.state.lock().unwrap().sync_waiting.insert(serial, None);
        let direct = self.dispatch_call(msg);
        let deferred = self.state.lock().unwrap().sync_waiting.remove(&serial).flatten();
        match direct.or(deferred) {
            Some(reply) => reply.as_result(),
            None => Err(Error::timeout("Method call timed out")),
        }
    }

    fn send_with_reply(&self, mut msg: Message, reply: ReplyCallback, _timeout: Duration) -> Result<Slot, Error> {
        let serial = self.alloc_serial(&mut msg);
        msg.seal();
        let token = {
            let mut g = self.state.lock().unwrap();
            g.next_token += 1;
            let token = g.next_token;
            g.pending.insert(token, reply);
            g.serial_to_token.insert(serial, token);
            token
        };
        if let Some(r) = self.dispatch_call(msg) {
            let mut g = self.state.lock().unwrap();
            if g.serial_to_token.remove(&serial).is_some() {
                g.ready.push((token, r.as_result()));
            }
        }
        let state = self.state.clone();
        Ok(Slot::new(move || {
            let mut g = state.lock().unwrap();
            g.pending.remove(&token);
            g.ready.retain(|(t, _)| *t != token);
        }))
    }

    fn register_object_path(&self, path: Path<'static>, cb: ObjectCallback) -> Result<Slot, Error> {
        let key = path.to_string();
        {
            let mut g = self.state.lock().unwrap();
            if g.objects.contains_key(&key) {
                return Err(Error::new_custom("org.freedesktop.DBus.Error.ObjectPathInUse",
                    "A handler is already registered for this path"));
            }
            g.objects.insert(key.clone(), Some(cb));
        }
        let state = self.state.clone();
        Ok(Slot::new(move || { state.lock().unwrap().objects.remove(&key); }))
    }

    fn add_match(&self, rule: MatchRule<'static>, cb: SignalCallback) -> Result<Slot, Error> {
        let token = {
            let mut g = self.state.lock().unwrap();
            g.next_token += 1;
            let token = g.next_token;
            g.matches.insert(token, (rule, Some(cb)));
            token
        };
        let state = self.state.clone();
        Ok(Slot::new(move || { state.lock().unwrap().matches.remove(&token); }))
    }

    fn invoke_in_dispatch_thread(&self, f: Box<dyn FnOnce() + Send>) {
        f()
    }
}
