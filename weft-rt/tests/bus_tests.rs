//! Topic bus integration tests: retention, blocking reads, and the
//! bus-over-IPC select ordering.

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::cell::RefCell;
use std::rc::Rc;

use weft_rt::{
    ActorConfig, ActorId, BusConfig, ErrorCode, MsgClass, RecvFilter, Runtime, RuntimeConfig,
    Selected, Source, Tag, Timeout,
};

fn small_runtime() -> Runtime {
    let cfg = RuntimeConfig::builder()
        .with_max_actors(8)
        .with_default_stack_size(32 * 1024)
        .with_arena_size(1024 * 1024)
        .build()
        .unwrap();
    Runtime::new(cfg).unwrap()
}

#[test]
fn test_drop_oldest_with_two_subscribers() {
    let rt = small_runtime();
    let bus = rt
        .create_bus(
            BusConfig::new()
                .with_max_entries(2)
                .with_max_entry_size(16)
                .with_max_subscribers(2),
        )
        .unwrap();
    let logs: [Rc<RefCell<Vec<Vec<u8>>>>; 2] = [Rc::default(), Rc::default()];

    let mut subs = Vec::new();
    for log in &logs {
        let log = Rc::clone(log);
        let id = rt
            .spawn(ActorConfig::new(), move |ctx| {
                ctx.subscribe(bus).unwrap();
                // Blocked here until every publish has happened.
                ctx.recv(Timeout::Never).unwrap();
                let mut buf = [0u8; 16];
                loop {
                    match ctx.bus_read(bus, &mut buf) {
                        Ok(n) => log.borrow_mut().push(buf[..n].to_vec()),
                        Err(err) if err.is_would_block() => break,
                        Err(err) => panic!("unexpected bus error: {err}"),
                    }
                }
                ctx.unsubscribe(bus).unwrap();
                ctx.exit();
            })
            .unwrap();
        subs.push(id);
    }

    // Let both subscribers attach before anything is published.
    rt.run_until_blocked();
    for payload in [b"a".as_slice(), b"b", b"c"] {
        rt.publish(bus, payload).unwrap();
    }
    for id in &subs {
        rt.notify(*id, b"go").unwrap();
    }
    rt.run();

    // Capacity 2 evicted "a" before either subscriber read it.
    for log in &logs {
        assert_eq!(*log.borrow(), vec![b"b".to_vec(), b"c".to_vec()]);
    }
}

#[test]
fn test_blocking_read_wakes_on_publish() {
    let rt = small_runtime();
    let bus = rt.create_bus(BusConfig::default()).unwrap();
    let got: Rc<RefCell<Option<Vec<u8>>>> = Rc::default();

    rt.spawn(ActorConfig::new(), {
        let got = Rc::clone(&got);
        move |ctx| {
            ctx.subscribe(bus).unwrap();
            let mut buf = [0u8; 32];
            let n = ctx.bus_read_wait(bus, &mut buf, Timeout::Never).unwrap();
            *got.borrow_mut() = Some(buf[..n].to_vec());
            ctx.unsubscribe(bus).unwrap();
            ctx.exit();
        }
    })
    .unwrap();

    rt.run_until_blocked();
    assert!(got.borrow().is_none());
    rt.publish(bus, b"wake up").unwrap();
    rt.run();
    assert_eq!(got.borrow().as_deref(), Some(b"wake up".as_slice()));
}

#[test]
fn test_select_prefers_bus_over_ipc() {
    let rt = small_runtime();
    let bus = rt.create_bus(BusConfig::default()).unwrap();
    let order: Rc<RefCell<Vec<String>>> = Rc::default();

    let reader = rt
        .spawn(ActorConfig::new(), {
            let order = Rc::clone(&order);
            move |ctx| {
                ctx.subscribe(bus).unwrap();
                // Wait for the go signal; by then one IPC message and one
                // bus entry are both pending.
                ctx.recv_match(ActorId::ANY, MsgClass::Notify, Tag::new(9), Timeout::Never)
                    .unwrap();
                let sources = [Source::Ipc(RecvFilter::ANY), Source::Bus(bus)];
                for _ in 0..2 {
                    match ctx.select(&sources, Timeout::Poll).unwrap() {
                        Selected::Bus { index, data } => {
                            assert_eq!(index, 1);
                            order
                                .borrow_mut()
                                .push(format!("bus:{}", String::from_utf8_lossy(data)));
                        }
                        Selected::Ipc { index, msg } => {
                            assert_eq!(index, 0);
                            order
                                .borrow_mut()
                                .push(format!("ipc:{}", String::from_utf8_lossy(msg.data)));
                        }
                    }
                }
                ctx.unsubscribe(bus).unwrap();
                ctx.exit();
            }
        })
        .unwrap();

    rt.run_until_blocked();
    rt.send(reader, MsgClass::Notify, Tag::new(1), b"mail").unwrap();
    rt.publish(bus, b"ring").unwrap();
    rt.send(reader, MsgClass::Notify, Tag::new(9), b"go").unwrap();
    rt.run();

    // Bus data outranks the earlier-queued IPC message.
    assert_eq!(*order.borrow(), vec!["bus:ring", "ipc:mail"]);
}

#[test]
fn test_select_bus_source_requires_subscription() {
    let rt = small_runtime();
    let bus = rt.create_bus(BusConfig::default()).unwrap();
    let code: Rc<RefCell<Option<ErrorCode>>> = Rc::default();

    rt.spawn(ActorConfig::new(), {
        let code = Rc::clone(&code);
        move |ctx| {
            let err = ctx
                .select(&[Source::Bus(bus)], Timeout::Poll)
                .unwrap_err();
            *code.borrow_mut() = Some(err.code());
            ctx.exit();
        }
    })
    .unwrap();

    rt.run();
    assert_eq!(*code.borrow(), Some(ErrorCode::Invalid));
}

#[test]
fn test_destroy_guard_and_death_unsubscribes() {
    let rt = small_runtime();
    let bus = rt.create_bus(BusConfig::default()).unwrap();

    let sub = rt
        .spawn(ActorConfig::new(), move |ctx| {
            ctx.subscribe(bus).unwrap();
            ctx.recv(Timeout::Never).unwrap();
            ctx.exit();
        })
        .unwrap();
    rt.run_until_blocked();

    assert_eq!(rt.bus_subscriber_count(bus).unwrap(), 1);
    assert_eq!(
        rt.destroy_bus(bus).unwrap_err().code(),
        ErrorCode::Invalid
    );
    // Death cleans the subscription, unblocking the destroy.
    rt.kill(sub).unwrap();
    assert_eq!(rt.bus_subscriber_count(bus).unwrap(), 0);
    rt.destroy_bus(bus).unwrap();
    assert!(rt.bus_subscriber_count(bus).is_err());
}

#[test]
fn test_age_expiry_with_simulated_clock() {
    let rt = small_runtime();
    rt.advance_time(0); // simulated time: timestamps are deterministic
    let bus = rt
        .create_bus(BusConfig::new().with_max_age_ms(100))
        .unwrap();
    let got: Rc<RefCell<Vec<Vec<u8>>>> = Rc::default();

    let sub = rt
        .spawn(ActorConfig::new(), {
            let got = Rc::clone(&got);
            move |ctx| {
                ctx.subscribe(bus).unwrap();
                ctx.recv(Timeout::Never).unwrap();
                let mut buf = [0u8; 16];
                while let Ok(n) = ctx.bus_read(bus, &mut buf) {
                    got.borrow_mut().push(buf[..n].to_vec());
                }
                ctx.unsubscribe(bus).unwrap();
                ctx.exit();
            }
        })
        .unwrap();
    rt.run_until_blocked();

    rt.publish(bus, b"stale").unwrap();
    rt.advance_time(200_000); // 200 ms
    // This publish expires "stale" before inserting.
    rt.publish(bus, b"fresh").unwrap();
    assert_eq!(rt.bus_entry_count(bus).unwrap(), 1);

    rt.notify(sub, b"go").unwrap();
    rt.run();
    assert_eq!(*got.borrow(), vec![b"fresh".to_vec()]);
}
