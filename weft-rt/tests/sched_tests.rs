//! Scheduler behavior: priority ordering, round-robin fairness, shutdown,
//! heap stacks, and monitoring counters.

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::cell::RefCell;
use std::rc::Rc;

use weft_rt::{
    ActorConfig, ActorState, InMemoryMonitor, Priority, Runtime, RuntimeConfig, Timeout,
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
fn test_higher_priority_runs_first() {
    let rt = small_runtime();
    let order: Rc<RefCell<Vec<&'static str>>> = Rc::default();

    for (name, priority) in [
        ("low", Priority::Low),
        ("critical", Priority::Critical),
        ("normal", Priority::Normal),
        ("high", Priority::High),
    ] {
        let order = Rc::clone(&order);
        rt.spawn(
            ActorConfig::new().with_priority(priority),
            move |ctx| {
                order.borrow_mut().push(name);
                ctx.exit();
            },
        )
        .unwrap();
    }

    rt.run();
    assert_eq!(*order.borrow(), vec!["critical", "high", "normal", "low"]);
}

#[test]
fn test_round_robin_within_priority() {
    let rt = small_runtime();
    let order: Rc<RefCell<Vec<u8>>> = Rc::default();

    for tag in [b'a', b'b', b'c'] {
        let order = Rc::clone(&order);
        rt.spawn(ActorConfig::new(), move |ctx| {
            for _ in 0..3 {
                order.borrow_mut().push(tag);
                ctx.yield_now();
            }
            ctx.exit();
        })
        .unwrap();
    }

    rt.run();
    // Yielding actors interleave one dispatch each per round.
    assert_eq!(
        *order.borrow(),
        vec![b'a', b'b', b'c', b'a', b'b', b'c', b'a', b'b', b'c']
    );
}

#[test]
fn test_shutdown_stops_runnable_actors() {
    let rt = small_runtime();
    let spins: Rc<RefCell<u32>> = Rc::default();

    let spinner = rt
        .spawn(ActorConfig::new(), {
            let spins = Rc::clone(&spins);
            move |ctx| {
                loop {
                    *spins.borrow_mut() += 1;
                    if *spins.borrow() == 3 {
                        ctx.request_shutdown();
                    }
                    ctx.yield_now();
                }
            }
        })
        .unwrap();

    rt.run();
    // The loop was abandoned mid-flight: still alive, still ready.
    assert_eq!(*spins.borrow(), 3);
    assert_eq!(rt.state(spinner), Some(ActorState::Ready));
}

#[test]
fn test_heap_stack_actor_runs_without_arena() {
    let rt = small_runtime();
    let ran: Rc<RefCell<bool>> = Rc::default();

    rt.spawn(
        ActorConfig::new().with_malloc_stack(true),
        {
            let ran = Rc::clone(&ran);
            move |ctx| {
                *ran.borrow_mut() = true;
                ctx.exit();
            }
        },
    )
    .unwrap();

    assert_eq!(rt.arena_in_use(), 0);
    rt.run();
    assert!(*ran.borrow());
    assert_eq!(rt.arena_in_use(), 0);
}

#[test]
fn test_arena_reclaimed_after_death() {
    let rt = small_runtime();

    rt.spawn(ActorConfig::new(), |ctx| ctx.exit()).unwrap();
    rt.spawn(ActorConfig::new(), |ctx| ctx.exit()).unwrap();
    assert!(rt.arena_in_use() >= 2 * 32 * 1024);
    rt.run();
    assert_eq!(rt.arena_in_use(), 0);
}

#[test]
fn test_actor_table_exhaustion() {
    let cfg = RuntimeConfig::builder()
        .with_max_actors(2)
        .with_default_stack_size(32 * 1024)
        .with_arena_size(256 * 1024)
        .build()
        .unwrap();
    let rt = Runtime::new(cfg).unwrap();

    rt.spawn(ActorConfig::new(), |ctx| ctx.exit()).unwrap();
    rt.spawn(ActorConfig::new(), |ctx| ctx.exit()).unwrap();
    let err = rt.spawn(ActorConfig::new(), |ctx| ctx.exit()).unwrap_err();
    assert_eq!(err.code(), weft_rt::ErrorCode::Nomem);

    // Slots are reusable once their actors die.
    rt.run();
    rt.spawn(ActorConfig::new(), |ctx| ctx.exit()).unwrap();
    rt.run();
}

#[test]
fn test_spawn_from_actor_and_sibling_info() {
    let rt = small_runtime();
    let seen: Rc<RefCell<Vec<String>>> = Rc::default();

    rt.spawn(ActorConfig::new().with_name("parent"), {
        let seen = Rc::clone(&seen);
        move |ctx| {
            // A standalone spawn sees exactly itself in the sibling table.
            let sibs = ctx.siblings();
            seen.borrow_mut()
                .push(format!("parent:{}", sibs.len()));
            let child_seen = Rc::clone(&seen);
            let child = ctx
                .spawn(ActorConfig::new().with_name("child"), move |ctx| {
                    let sibs = ctx.siblings();
                    child_seen
                        .borrow_mut()
                        .push(format!("child:{:?}", sibs[0].name));
                    let msg = ctx.recv(Timeout::Never).unwrap();
                    assert_eq!(msg.data, b"hello");
                    ctx.exit();
                })
                .unwrap();
            ctx.notify(child, b"hello").unwrap();
            ctx.exit();
        }
    })
    .unwrap();

    rt.run();
    assert_eq!(
        *seen.borrow(),
        vec!["parent:1".to_string(), "child:Some(\"child\")".to_string()]
    );
}

#[test]
fn test_monitoring_counters() {
    let rt = small_runtime();
    let monitor = Rc::new(InMemoryMonitor::new());
    rt.set_monitor(Rc::clone(&monitor) as Rc<dyn weft_rt::Monitor>);

    let receiver = rt
        .spawn(ActorConfig::new(), |ctx| {
            ctx.recv(Timeout::Never).unwrap();
            ctx.exit();
        })
        .unwrap();
    rt.spawn(ActorConfig::new(), move |ctx| {
        ctx.notify(receiver, b"ping").unwrap();
        ctx.exit();
    })
    .unwrap();
    rt.run();

    let snap = monitor.snapshot();
    assert_eq!(snap.actors_spawned, 2);
    assert_eq!(snap.actors_exited, 2);
    assert_eq!(snap.messages_sent, 1);
}
