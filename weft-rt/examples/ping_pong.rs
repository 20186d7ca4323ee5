//! Two actors exchanging messages until a round limit is reached.
//!
//! Run with:
//!
//! ```bash
//! cargo run --example ping_pong
//! ```

#![allow(clippy::unwrap_used)]

use weft_rt::{ActorConfig, MsgClass, Priority, Runtime, RuntimeConfig, Timeout};

const ROUNDS: u32 = 5;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let rt = Runtime::new(RuntimeConfig::default()).unwrap();

    let pong = rt
        .spawn(
            ActorConfig::new().with_name("pong").with_auto_register(true),
            |ctx| {
                loop {
                    let msg = ctx.recv(Timeout::Never).unwrap();
                    if msg.class == MsgClass::Exit || msg.data == b"done" {
                        break;
                    }
                    let sender = msg.sender;
                    println!("pong <- {}", String::from_utf8_lossy(msg.data));
                    ctx.notify(sender, b"pong").unwrap();
                }
                ctx.exit();
            },
        )
        .unwrap();

    rt.spawn(
        ActorConfig::new()
            .with_name("ping")
            .with_priority(Priority::High),
        move |ctx| {
            for round in 0..ROUNDS {
                let ball = format!("ping #{round}");
                ctx.notify(pong, ball.as_bytes()).unwrap();
                let reply = ctx.recv(Timeout::Never).unwrap();
                println!("ping <- {}", String::from_utf8_lossy(reply.data));
            }
            ctx.notify(pong, b"done").unwrap();
            ctx.exit();
        },
    )
    .unwrap();

    rt.run();
    println!("all actors finished");
}
