//! One producer fanning sensor-style readings out to several consumers
//! over a bounded topic bus, with simulated time driving a periodic timer.
//!
//! Run with:
//!
//! ```bash
//! cargo run --example bus_fanout
//! ```

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use weft_rt::{ActorConfig, BusConfig, MsgClass, Runtime, RuntimeConfig, Tag, Timeout};

const SAMPLES: u32 = 4;
const CONSUMERS: usize = 3;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let rt = Runtime::new(RuntimeConfig::default()).unwrap();
    rt.advance_time(0); // drive the example on simulated time

    let bus = rt
        .create_bus(
            BusConfig::new()
                .with_max_entries(8)
                .with_max_subscribers(CONSUMERS),
        )
        .unwrap();

    for n in 0..CONSUMERS {
        rt.spawn(ActorConfig::new(), move |ctx| {
            ctx.subscribe(bus).unwrap();
            let mut buf = [0u8; 32];
            for _ in 0..SAMPLES {
                let len = ctx.bus_read_wait(bus, &mut buf, Timeout::Never).unwrap();
                println!(
                    "consumer {n}: {}",
                    String::from_utf8_lossy(&buf[..len])
                );
            }
            ctx.unsubscribe(bus).unwrap();
            ctx.exit();
        })
        .unwrap();
    }

    rt.spawn(ActorConfig::new().with_name("producer"), move |ctx| {
        let tick = ctx.every(Duration::from_millis(100)).unwrap();
        let own = ctx.id();
        for sample in 0..SAMPLES {
            ctx.recv_match(own, MsgClass::Timer, Tag::new(tick.raw()), Timeout::Never)
                .unwrap();
            let reading = format!("sample {sample}");
            ctx.publish(bus, reading.as_bytes()).unwrap();
        }
        ctx.cancel_timer(tick).unwrap();
        ctx.exit();
    })
    .unwrap();

    // Let everyone subscribe and arm before the clock starts.
    rt.run_until_blocked();
    // The embedding loop: run actors until everyone blocks, then advance
    // the simulated clock one tick.
    while rt.pool_stats().timers > 0 || rt.bus_subscriber_count(bus).unwrap() > 0 {
        rt.run_until_blocked();
        rt.advance_time(100_000);
    }
    rt.run_until_blocked();
    rt.destroy_bus(bus).unwrap();
    println!("all samples delivered");
}
