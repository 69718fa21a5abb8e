//! Asynchronous call tests: reply callbacks, futures, cancellation, timeout
//! and server-side deferred results.

mod common;

use common::LocalChannel;
use dbus_fluent::{Error, ErrorKind, MethodResult, Object, Path, Proxy,
    register_method};
use futures_executor::block_on;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const IFACE: &str = "com.example.Calculator";
const DEST: &str = "com.example.calculator";
const OBJ_PATH: &str = "/com/example/calculator";

fn make_object(channel: &Arc<LocalChannel>) -> Object<Arc<LocalChannel>> {
    let object = Object::new(channel.clone(), Path::from(OBJ_PATH)).unwrap();
    object.add_vtable(vec![
        register_method("Divide").implemented_as(|(a, b): (i32, i32)| {
            if b == 0 {
                return Err(Error::new_custom("com.example.Calculator.Error.DivisionByZero",
                    "Division by zero"));
            }
            Ok((a / b,))
        }),
        register_method("MinMax").implemented_as(|(v,): (Vec<i32>,)| {
            let min = v.iter().min().copied().unwrap_or(0);
            let max = v.iter().max().copied().unwrap_or(0);
            Ok((min, max))
        }),
        register_method("Ping").implemented_as(|_: ()| Ok(())),
        register_method("Double").implemented_as_async(|res: MethodResult<(i32,)>, (x,): (i32,)| {
            res.return_results((x * 2,));
        }),
        register_method("Shout").implemented_as_async(|res: MethodResult<(String,)>, (s,): (String,)| {
            let t = std::thread::spawn(move || { res.return_results((s.to_uppercase(),)); });
            t.join().unwrap();
        }),
        register_method("Never").implemented_as_async(|res: MethodResult<(i32,)>, _: ()| {
            // The result slot is dropped unsatisfied; the caller times out.
            drop(res);
        }),
    ]).for_interface(IFACE).unwrap();
    object
}

fn make_proxy(channel: &Arc<LocalChannel>) -> Proxy<Arc<LocalChannel>> {
    Proxy::new(DEST, OBJ_PATH, Duration::from_millis(500), channel.clone())
}

#[test]
fn reply_callback_runs_exactly_once() {
    let channel = LocalChannel::new();
    let _object = make_object(&channel);
    let proxy = make_proxy(&channel);

    let hits = Arc::new(AtomicUsize::new(0));
    let results = Arc::new(Mutex::new(Vec::new()));
    let (h2, r2) = (hits.clone(), results.clone());

    let call = proxy.call_method_async("Divide")
        .on_interface(IFACE)
        .with_arguments((10i32, 2i32))
        .upon_reply_invoke::<(i32,), _>(move |r| {
            h2.fetch_add(1, Ordering::SeqCst);
            r2.lock().unwrap().push(r);
        }).unwrap();

    // Not delivered until the dispatch loop runs.
    assert!(call.is_pending());
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    channel.process();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(!call.is_pending());
    assert_eq!(results.lock().unwrap().pop().unwrap().unwrap(), (5,));

    // Nothing more to deliver.
    channel.process();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn remote_error_reaches_the_callback() {
    let channel = LocalChannel::new();
    let _object = make_object(&channel);
    let proxy = make_proxy(&channel);

    let seen = Arc::new(Mutex::new(None));
    let s2 = seen.clone();
    proxy.call_method_async("Divide")
        .on_interface(IFACE)
        .with_arguments((1i32, 0i32))
        .upon_reply_invoke::<(i32,), _>(move |r| { *s2.lock().unwrap() = Some(r); }).unwrap();
    channel.process();

    let e = seen.lock().unwrap().take().unwrap().unwrap_err();
    assert_eq!(&**e.name(), "com.example.Calculator.Error.DivisionByZero");
}

#[test]
fn deserialization_failure_is_rerouted_through_the_callback() {
    let channel = LocalChannel::new();
    let _object = make_object(&channel);
    let proxy = make_proxy(&channel);

    let seen = Arc::new(Mutex::new(None));
    let s2 = seen.clone();
    proxy.call_method_async("Divide")
        .on_interface(IFACE)
        .with_arguments((9i32, 3i32))
        .upon_reply_invoke::<(String,), _>(move |r| { *s2.lock().unwrap() = Some(r); }).unwrap();
    channel.process();

    let e = seen.lock().unwrap().take().unwrap().unwrap_err();
    assert_eq!(e.kind(), ErrorKind::DeserializationFailure);
}

#[test]
fn future_with_single_result() {
    let channel = LocalChannel::new();
    let _object = make_object(&channel);
    let proxy = make_proxy(&channel);

    let f = proxy.call_method_async("Divide")
        .on_interface(IFACE)
        .with_arguments((21i32, 3i32))
        .get_result_as_future::<(i32,)>();
    channel.process();
    assert_eq!(block_on(f).unwrap(), (7,));
}

#[test]
fn future_with_multiple_results() {
    let channel = LocalChannel::new();
    let _object = make_object(&channel);
    let proxy = make_proxy(&channel);

    let f = proxy.call_method_async("MinMax")
        .on_interface(IFACE)
        .with_arguments((vec![3i32, 1, 4, 1, 5],))
        .get_result_as_future::<(i32, i32)>();
    channel.process();
    assert_eq!(block_on(f).unwrap(), (1, 5));
}

#[test]
fn future_with_no_result() {
    let channel = LocalChannel::new();
    let _object = make_object(&channel);
    let proxy = make_proxy(&channel);

    let f = proxy.call_method_async("Ping")
        .on_interface(IFACE)
        .get_result_as_future::<()>();
    channel.process();
    block_on(f).unwrap();
}

#[test]
fn future_resolves_to_remote_error() {
    let channel = LocalChannel::new();
    let _object = make_object(&channel);
    let proxy = make_proxy(&channel);

    let f = proxy.call_method_async("Divide")
        .on_interface(IFACE)
        .with_arguments((1i32, 0i32))
        .get_result_as_future::<(i32,)>();
    channel.process();
    let e = block_on(f).unwrap_err();
    assert_eq!(&**e.name(), "com.example.Calculator.Error.DivisionByZero");
}

#[test]
fn cancellation_before_dispatch_suppresses_the_handler() {
    let channel = LocalChannel::new();
    let _object = make_object(&channel);
    let proxy = make_proxy(&channel);

    let hits = Arc::new(AtomicUsize::new(0));
    let h2 = hits.clone();
    let call = proxy.call_method_async("Divide")
        .on_interface(IFACE)
        .with_arguments((10i32, 2i32))
        .upon_reply_invoke::<(i32,), _>(move |_| { h2.fetch_add(1, Ordering::SeqCst); }).unwrap();

    assert!(call.is_pending());
    call.cancel();
    assert!(!call.is_pending());
    assert_eq!(channel.pending_count(), 0);

    channel.process();
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    // Cancelling twice is a no-op.
    call.cancel();
}

#[test]
fn cancellation_after_completion_is_a_no_op() {
    let channel = LocalChannel::new();
    let _object = make_object(&channel);
    let proxy = make_proxy(&channel);

    let hits = Arc::new(AtomicUsize::new(0));
    let h2 = hits.clone();
    let call = proxy.call_method_async("Divide")
        .on_interface(IFACE)
        .with_arguments((10i32, 2i32))
        .upon_reply_invoke::<(i32,), _>(move |_| { h2.fetch_add(1, Ordering::SeqCst); }).unwrap();

    channel.process();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    call.cancel();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(!call.is_pending());
}

#[test]
fn timeout_is_delivered_exactly_once() {
    let channel = LocalChannel::new();
    let _object = make_object(&channel);
    let proxy = make_proxy(&channel);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let s2 = seen.clone();
    proxy.call_method_async("Never")
        .on_interface(IFACE)
        .with_timeout(Duration::from_millis(10))
        .upon_reply_invoke::<(i32,), _>(move |r| { s2.lock().unwrap().push(r); }).unwrap();

    channel.expire_pending();
    channel.process();

    let mut g = seen.lock().unwrap();
    assert_eq!(g.len(), 1);
    assert_eq!(g.pop().unwrap().unwrap_err().kind(), ErrorKind::Timeout);
}

#[test]
fn synchronous_call_times_out_when_the_server_never_replies() {
    let channel = LocalChannel::new();
    let _object = make_object(&channel);
    let proxy = make_proxy(&channel);

    let e = proxy.call_method("Never").on_interface(IFACE).read_results::<(i32,)>().unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Timeout);
}

#[test]
fn deferred_server_results_answer_synchronous_calls() {
    let channel = LocalChannel::new();
    let _object = make_object(&channel);
    let proxy = make_proxy(&channel);

    let (v,): (i32,) = proxy.method_call(IFACE, "Double", (21i32,)).unwrap();
    assert_eq!(v, 42);
}

#[test]
fn deferred_server_results_can_come_from_another_thread() {
    let channel = LocalChannel::new();
    let _object = make_object(&channel);
    let proxy = make_proxy(&channel);

    let (s,): (String,) = proxy.method_call(IFACE, "Shout", ("quiet".to_string(),)).unwrap();
    assert_eq!(s, "QUIET");

    let f = proxy.call_method_async("Shout")
        .on_interface(IFACE)
        .with_arguments(("whisper".to_string(),))
        .get_result_as_future::<(String,)>();
    channel.process();
    assert_eq!(block_on(f).unwrap(), ("WHISPER".to_string(),));
}

#[test]
fn futures_carry_a_cancellation_handle() {
    let channel = LocalChannel::new();
    let _object = make_object(&channel);
    let proxy = make_proxy(&channel);

    let f = proxy.call_method_async("Divide")
        .on_interface(IFACE)
        .with_arguments((10i32, 5i32))
        .get_result_as_future::<(i32,)>();
    f.pending_call().unwrap().cancel();
    channel.process();
    let e = block_on(f).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Disconnected);
}
