//! Client/server tests over the loopback channel: typed method calls, the
//! fluent builders, signals and properties.

mod common;

use common::LocalChannel;
use dbus_fluent::{Error, ErrorKind, Object, Path, Proxy, EmitsChangedSignal,
    register_method, register_property, register_signal};
use dbus_fluent::stdintf::org_freedesktop_dbus::{PropertiesPropertiesChanged, PROPERTIES, PROPERTIES_CHANGED};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const IFACE: &str = "com.example.Concatenator";
const DEST: &str = "com.example.concatenator";
const OBJ_PATH: &str = "/com/example/concatenator";

fn make_object(channel: &Arc<LocalChannel>) -> (Object<Arc<LocalChannel>>, Arc<AtomicUsize>) {
    let object = Object::new(channel.clone(), Path::from(OBJ_PATH)).unwrap();
    let pings = Arc::new(AtomicUsize::new(0));
    let p2 = pings.clone();
    let state = Arc::new(Mutex::new("idle".to_string()));
    let getter_state = state.clone();
    let setter_state = state;
    object.add_vtable(vec![
        register_method("Concatenate")
            .with_input_param_names(&["numbers", "separator"])
            .with_output_param_names(&["concatenated"])
            .implemented_as(|(numbers, separator): (Vec<i32>, String)| {
                if numbers.is_empty() {
                    return Err(Error::new_custom("com.example.Concatenator.Error.NoNumbers",
                        "No numbers provided"));
                }
                let parts: Vec<String> = numbers.iter().map(|n| n.to_string()).collect();
                Ok((parts.join(&separator),))
            }),
        register_method("Ping").implemented_as(move |_: ()| {
            p2.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
        register_signal("Concatenated").with_parameters::<(String,)>(("concatenated",)),
        register_property("State")
            .with_getter(move || Ok(getter_state.lock().unwrap().clone()))
            .with_setter(move |v: String| { *setter_state.lock().unwrap() = v; Ok(()) })
            .into(),
        register_property("Version")
            .with_getter(|| Ok(3u32))
            .with_update_behavior(EmitsChangedSignal::Const)
            .into(),
    ]).for_interface(IFACE).unwrap();
    (object, pings)
}

fn make_proxy(channel: &Arc<LocalChannel>) -> Proxy<Arc<LocalChannel>> {
    Proxy::new(DEST, OBJ_PATH, Duration::from_millis(500), channel.clone())
}

#[test]
fn typed_method_call() {
    let channel = LocalChannel::new();
    let (_object, _) = make_object(&channel);
    let proxy = make_proxy(&channel);

    let (s,): (String,) = proxy.method_call(IFACE, "Concatenate",
        (vec![1i32, 2, 3], "+".to_string())).unwrap();
    assert_eq!(s, "1+2+3");
}

#[test]
fn fluent_method_call() {
    let channel = LocalChannel::new();
    let (_object, _) = make_object(&channel);
    let proxy = make_proxy(&channel);

    let (s,): (String,) = proxy.call_method("Concatenate")
        .on_interface(IFACE)
        .with_timeout(Duration::from_millis(100))
        .with_arguments((vec![4i32, 5], "-".to_string()))
        .read_results().unwrap();
    assert_eq!(s, "4-5");
}

#[test]
fn remote_errors_come_back_named() {
    let channel = LocalChannel::new();
    let (_object, _) = make_object(&channel);
    let proxy = make_proxy(&channel);

    let e = proxy.call_method("Concatenate")
        .on_interface(IFACE)
        .with_arguments((Vec::<i32>::new(), "+".to_string()))
        .read_results::<(String,)>().unwrap_err();
    assert_eq!(&**e.name(), "com.example.Concatenator.Error.NoNumbers");
    assert_eq!(e.kind(), ErrorKind::Remote);
}

#[test]
fn unknown_method_and_interface() {
    let channel = LocalChannel::new();
    let (_object, _) = make_object(&channel);
    let proxy = make_proxy(&channel);

    let e = proxy.call_method("Nope").on_interface(IFACE).read_results::<()>().unwrap_err();
    assert_eq!(e.kind(), ErrorKind::UnknownMethod);

    let e = proxy.call_method("Concatenate").on_interface("com.example.Other")
        .read_results::<()>().unwrap_err();
    assert_eq!(e.kind(), ErrorKind::UnknownInterface);
}

#[test]
fn wrong_argument_types_are_invalid_args() {
    let channel = LocalChannel::new();
    let (_object, _) = make_object(&channel);
    let proxy = make_proxy(&channel);

    let e = proxy.call_method("Concatenate")
        .on_interface(IFACE)
        .with_arguments(("not a vec", 5u8))
        .read_results::<(String,)>().unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidArgs);
}

#[test]
fn dont_expect_reply_sets_flag_and_registers_no_handler() {
    let channel = LocalChannel::new();
    let (_object, pings) = make_object(&channel);
    let proxy = make_proxy(&channel);

    proxy.call_method("Ping").on_interface(IFACE).dont_expect_reply().unwrap();

    assert_eq!(channel.last_no_reply_flag(), Some(true));
    assert_eq!(channel.pending_count(), 0);
    assert_eq!(pings.load(Ordering::SeqCst), 1);
}

#[test]
fn invoker_commits_on_scope_exit() {
    let channel = LocalChannel::new();
    let (_object, pings) = make_object(&channel);
    let proxy = make_proxy(&channel);

    {
        let _invoker = proxy.call_method("Ping").on_interface(IFACE);
        assert_eq!(pings.load(Ordering::SeqCst), 0);
    }
    assert_eq!(pings.load(Ordering::SeqCst), 1);
}

#[test]
fn invoker_does_not_commit_while_panicking() {
    let channel = LocalChannel::new();
    let (_object, pings) = make_object(&channel);
    let proxy = make_proxy(&channel);

    let r = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _invoker = proxy.call_method("Ping").on_interface(IFACE);
        panic!("something else went wrong");
    }));
    assert!(r.is_err());
    assert_eq!(pings.load(Ordering::SeqCst), 0);
}

#[test]
fn signal_subscription_and_fluent_emission() {
    let channel = LocalChannel::new();
    let (object, _) = make_object(&channel);
    let proxy = make_proxy(&channel);

    let received = Arc::new(Mutex::new(Vec::<String>::new()));
    let r2 = received.clone();
    proxy.upon_signal("Concatenated").on_interface(IFACE).call(move |(s,): (String,)| {
        r2.lock().unwrap().push(s);
    }).unwrap();

    object.emit_signal("Concatenated").on_interface(IFACE)
        .with_arguments(("1+2+3".to_string(),)).emit().unwrap();

    // Scope-exit emission, no terminal call.
    {
        let _e = object.emit_signal("Concatenated").on_interface(IFACE)
            .with_arguments(("4+5".to_string(),));
    }

    assert_eq!(&*received.lock().unwrap(), &["1+2+3".to_string(), "4+5".to_string()]);
}

#[test]
fn signal_emitter_suppressed_by_scope_failure() {
    let channel = LocalChannel::new();
    let (object, _) = make_object(&channel);
    let proxy = make_proxy(&channel);

    let count = Arc::new(AtomicUsize::new(0));
    let c2 = count.clone();
    proxy.upon_signal("Concatenated").on_interface(IFACE).call(move |_: (String,)| {
        c2.fetch_add(1, Ordering::SeqCst);
    }).unwrap();

    let r = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _e = object.emit_signal("Concatenated").on_interface(IFACE)
            .with_arguments(("never sent".to_string(),));
        panic!("failure in the emitting scope");
    }));
    assert!(r.is_err());
    assert_eq!(count.load(Ordering::SeqCst), 0);

    // Without a failure in scope, destruction commits the emission.
    {
        let _e = object.emit_signal("Concatenated").on_interface(IFACE)
            .with_arguments(("sent".to_string(),));
    }
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn undeclared_signals_are_rejected() {
    let channel = LocalChannel::new();
    let (object, _) = make_object(&channel);

    let e = object.emit_signal("Nope").on_interface(IFACE).emit().unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidArgs);

    // Declared name, wrong signature.
    let e = object.emit_signal("Concatenated").on_interface(IFACE)
        .with_arguments((5u32,)).emit().unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidArgs);
}

#[test]
fn pure_handler_drops_garbled_signal_error_handler_sees_it() {
    let channel = LocalChannel::new();
    let (object, _) = make_object(&channel);
    let proxy = make_proxy(&channel);

    let pure_hits = Arc::new(AtomicUsize::new(0));
    let ph = pure_hits.clone();
    proxy.upon_signal("Concatenated").on_interface(IFACE).call(move |_: (i32,)| {
        ph.fetch_add(1, Ordering::SeqCst);
    }).unwrap();

    object.emit_signal("Concatenated").on_interface(IFACE)
        .with_arguments(("text, not an int".to_string(),)).emit().unwrap();
    assert_eq!(pure_hits.load(Ordering::SeqCst), 0);

    proxy.mute_signal("Concatenated").on_interface(IFACE);

    let seen_error = Arc::new(Mutex::new(None));
    let s2 = seen_error.clone();
    proxy.upon_signal("Concatenated").on_interface(IFACE).call_with_error(move |r: Result<(i32,), Error>| {
        *s2.lock().unwrap() = Some(r);
    }).unwrap();

    object.emit_signal("Concatenated").on_interface(IFACE)
        .with_arguments(("still not an int".to_string(),)).emit().unwrap();
    let seen = seen_error.lock().unwrap().take().unwrap();
    assert_eq!(seen.unwrap_err().kind(), ErrorKind::DeserializationFailure);
}

#[test]
fn muted_signal_is_not_delivered() {
    let channel = LocalChannel::new();
    let (object, _) = make_object(&channel);
    let proxy = make_proxy(&channel);

    let count = Arc::new(AtomicUsize::new(0));
    let c2 = count.clone();
    proxy.upon_signal("Concatenated").on_interface(IFACE).call(move |_: (String,)| {
        c2.fetch_add(1, Ordering::SeqCst);
    }).unwrap();
    proxy.mute_signal("Concatenated").on_interface(IFACE);

    object.emit_signal("Concatenated").on_interface(IFACE)
        .with_arguments(("quiet".to_string(),)).emit().unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn subscription_slot_controls_lifetime() {
    let channel = LocalChannel::new();
    let (object, _) = make_object(&channel);
    let proxy = make_proxy(&channel);

    let count = Arc::new(AtomicUsize::new(0));
    let c2 = count.clone();
    let slot = proxy.upon_signal("Concatenated").on_interface(IFACE)
        .call_with_slot(move |_: (String,)| { c2.fetch_add(1, Ordering::SeqCst); }).unwrap();

    object.emit_signal("Concatenated").on_interface(IFACE)
        .with_arguments(("one".to_string(),)).emit().unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);

    slot.release();
    object.emit_signal("Concatenated").on_interface(IFACE)
        .with_arguments(("two".to_string(),)).emit().unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn property_read_write() {
    let channel = LocalChannel::new();
    let (_object, _) = make_object(&channel);
    let proxy = make_proxy(&channel);

    let state: String = proxy.get_property("State").on_interface(IFACE).get().unwrap();
    assert_eq!(state, "idle");

    proxy.set_property("State").on_interface(IFACE).to_value("busy".to_string()).unwrap();
    let state: String = proxy.get_property("State").on_interface(IFACE).get().unwrap();
    assert_eq!(state, "busy");

    let v = proxy.get_property("Version").on_interface(IFACE).get_value().unwrap();
    assert_eq!(v.0.as_u64(), Some(3));
}

#[test]
fn property_errors() {
    let channel = LocalChannel::new();
    let (_object, _) = make_object(&channel);
    let proxy = make_proxy(&channel);

    let e = proxy.set_property("Version").on_interface(IFACE).to_value(9u32).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::AccessDenied);

    let e = proxy.get_property("Nope").on_interface(IFACE).get::<u32>().unwrap_err();
    assert_eq!(e.kind(), ErrorKind::UnknownProperty);

    let e = proxy.get_property("State").on_interface("com.example.Other").get::<u32>().unwrap_err();
    assert_eq!(e.kind(), ErrorKind::UnknownInterface);
}

#[test]
fn property_set_without_reply() {
    let channel = LocalChannel::new();
    let (_object, _) = make_object(&channel);
    let proxy = make_proxy(&channel);

    proxy.set_property("State").on_interface(IFACE).to_value_no_reply("quick".to_string()).unwrap();
    assert_eq!(channel.last_no_reply_flag(), Some(true));

    let state: String = proxy.get_property("State").on_interface(IFACE).get().unwrap();
    assert_eq!(state, "quick");
}

#[test]
fn get_all_properties() {
    let channel = LocalChannel::new();
    let (_object, _) = make_object(&channel);
    let proxy = make_proxy(&channel);

    let props = proxy.get_all_properties().on_interface(IFACE).unwrap();
    assert_eq!(props.len(), 2);
    assert_eq!(props.get("State").unwrap().0.as_str(), Some("idle"));
    assert_eq!(props.get("Version").unwrap().0.as_u64(), Some(3));
}

#[test]
fn properties_changed_signal() {
    let channel = LocalChannel::new();
    let (object, _) = make_object(&channel);
    let proxy = make_proxy(&channel);

    let seen = Arc::new(Mutex::new(None));
    let s2 = seen.clone();
    proxy.upon_signal(PROPERTIES_CHANGED).on_interface(PROPERTIES)
        .call(move |c: PropertiesPropertiesChanged| { *s2.lock().unwrap() = Some(c); }).unwrap();

    object.emit_properties_changed(IFACE, &["State", "Version"]).unwrap();

    let c = seen.lock().unwrap().take().unwrap();
    assert_eq!(c.interface_name, IFACE);
    // State broadcasts its value, the const Version is skipped entirely.
    assert_eq!(c.changed_properties.len(), 1);
    assert_eq!(c.changed_properties.get("State").unwrap().0.as_str(), Some("idle"));
    assert!(c.invalidated_properties.is_empty());
}

#[test]
fn one_vtable_per_interface() {
    let channel = LocalChannel::new();
    let (object, _) = make_object(&channel);

    let e = object.add_vtable(vec![
        register_method("Extra").implemented_as(|_: ()| Ok(())),
    ]).for_interface(IFACE).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidArgs);
}

#[test]
fn vtable_slot_scopes_the_registration() {
    let channel = LocalChannel::new();
    let (object, _) = make_object(&channel);
    let proxy = make_proxy(&channel);

    let slot = object.add_vtable(vec![
        register_method("Probe").implemented_as(|_: ()| Ok((27u8,))),
    ]).for_interface_with_slot("com.example.Extra").unwrap();

    let (v,): (u8,) = proxy.method_call("com.example.Extra", "Probe", ()).unwrap();
    assert_eq!(v, 27);

    slot.release();
    let e = proxy.method_call::<(u8,), _, _, _>("com.example.Extra", "Probe", ()).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::UnknownInterface);
}

#[test]
fn dropping_the_object_unregisters_the_path() {
    let channel = LocalChannel::new();
    let (object, _) = make_object(&channel);
    let proxy = make_proxy(&channel);

    proxy.method_call::<(String,), _, _, _>(IFACE, "Concatenate", (vec![1i32], "+".to_string())).unwrap();
    drop(object);
    let e = proxy.method_call::<(String,), _, _, _>(IFACE, "Concatenate", (vec![1i32], "+".to_string())).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::UnknownMethod);
}
