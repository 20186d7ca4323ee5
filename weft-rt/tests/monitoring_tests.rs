//! Integration tests for the monitoring infrastructure: event emission
//! across a real runtime run, severity mapping, and history bounds.

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::rc::Rc;

use weft_rt::monitoring::{
    ActorEventKind, EventSeverity, MessageEventKind, Monitor, MonitoringEvent, RuntimeEvent,
};
use weft_rt::{ActorConfig, ErrorCode, InMemoryMonitor, Runtime, RuntimeConfig, Timeout};

fn monitored_runtime() -> (Runtime, Rc<InMemoryMonitor>) {
    let cfg = RuntimeConfig::builder()
        .with_max_actors(8)
        .with_default_stack_size(32 * 1024)
        .with_arena_size(1024 * 1024)
        .build()
        .unwrap();
    let rt = Runtime::new(cfg).unwrap();
    let monitor = Rc::new(InMemoryMonitor::new());
    rt.set_monitor(Rc::clone(&monitor) as Rc<dyn Monitor>);
    (rt, monitor)
}

#[test]
fn test_lifecycle_events_are_recorded() {
    let (rt, monitor) = monitored_runtime();

    let receiver = rt
        .spawn(ActorConfig::new().with_name("sink"), |ctx| {
            ctx.recv(Timeout::Never).unwrap();
            ctx.exit();
        })
        .unwrap();
    rt.spawn(ActorConfig::new(), move |ctx| {
        ctx.notify(receiver, b"one").unwrap();
        ctx.exit();
    })
    .unwrap();
    rt.run();

    let snap = monitor.snapshot();
    assert_eq!(snap.actors_spawned, 2);
    assert_eq!(snap.actors_exited, 2);
    assert_eq!(snap.messages_sent, 1);
    assert_eq!(snap.messages_dropped, 0);

    let events = monitor.events();
    let spawned_names: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            RuntimeEvent::Actor(a) => match a.kind {
                ActorEventKind::Spawned { name, .. } => Some(name),
                _ => None,
            },
            _ => None,
        })
        .collect();
    assert_eq!(spawned_names, vec![Some("sink"), None]);
}

#[test]
fn test_crash_exit_is_error_severity() {
    let (rt, monitor) = monitored_runtime();

    rt.spawn(ActorConfig::new(), |_ctx| {
        // Returns without exit(): a crash, surfaced as an Error event.
    })
    .unwrap();
    rt.run();

    let worst = monitor
        .events()
        .iter()
        .map(MonitoringEvent::severity)
        .max()
        .unwrap();
    assert_eq!(worst, EventSeverity::Error);
}

#[test]
fn test_dropped_sends_are_counted() {
    let cfg = RuntimeConfig::builder()
        .with_max_actors(4)
        .with_default_stack_size(32 * 1024)
        .with_arena_size(512 * 1024)
        .with_msg_buf_count(1)
        .with_mail_entry_count(1)
        .build()
        .unwrap();
    let rt = Runtime::new(cfg).unwrap();
    let monitor = Rc::new(InMemoryMonitor::new());
    rt.set_monitor(Rc::clone(&monitor) as Rc<dyn Monitor>);

    let sink = rt
        .spawn(ActorConfig::new(), |ctx| {
            // Parks forever; killed by the test.
            let _ = ctx.recv_match(
                weft_rt::ActorId::ANY,
                weft_rt::MsgClass::Notify,
                weft_rt::Tag::new(0x7777),
                Timeout::Never,
            );
            ctx.exit();
        })
        .unwrap();
    rt.run_until_blocked();

    rt.notify(sink, b"fits").unwrap();
    let err = rt.notify(sink, b"dropped").unwrap_err();
    assert_eq!(err.code(), ErrorCode::Nomem);
    rt.kill(sink).unwrap();

    let snap = monitor.snapshot();
    assert_eq!(snap.messages_sent, 1);
    assert_eq!(snap.messages_dropped, 1);

    let dropped: Vec<_> = monitor
        .events()
        .iter()
        .filter(|e| {
            matches!(
                e,
                RuntimeEvent::Message(m) if matches!(m.kind, MessageEventKind::Dropped { .. })
            )
        })
        .cloned()
        .collect();
    assert_eq!(dropped.len(), 1);
}

#[test]
fn test_timer_and_bus_events() {
    let (rt, monitor) = monitored_runtime();
    rt.advance_time(0);

    let bus = rt.create_bus(weft_rt::BusConfig::default()).unwrap();
    rt.publish(bus, b"tick").unwrap();

    rt.spawn(ActorConfig::new(), |ctx| {
        ctx.after(std::time::Duration::from_millis(1)).unwrap();
        // Wait for the firing to land.
        let msg = ctx.recv(Timeout::Never).unwrap();
        assert_eq!(msg.class, weft_rt::MsgClass::Timer);
        ctx.exit();
    })
    .unwrap();
    rt.run_until_blocked();
    rt.advance_time(1_000);
    rt.run_until_blocked();

    let snap = monitor.snapshot();
    assert_eq!(snap.timers_fired, 1);
    assert_eq!(snap.bus_published, 1);
    rt.destroy_bus(bus).unwrap();
}

#[test]
fn test_events_serialize_to_json() {
    let (rt, monitor) = monitored_runtime();
    rt.spawn(ActorConfig::new(), |ctx| ctx.exit()).unwrap();
    rt.run();

    for event in monitor.events() {
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.is_empty());
    }
}
