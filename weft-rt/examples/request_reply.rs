//! A tiny key-value service actor answering synchronous requests, with a
//! monitor watching it for unexpected death.
//!
//! Run with:
//!
//! ```bash
//! cargo run --example request_reply
//! ```

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;

use weft_rt::{ActorConfig, ActorId, MsgClass, Runtime, RuntimeConfig, Tag, Timeout};

/// Wire format of a store request: `b"G<key>"` or `b"S<key>=<value>"`.
fn store(ctx: &mut weft_rt::Ctx) {
    let mut table: HashMap<Vec<u8>, Vec<u8>> = HashMap::new();
    loop {
        let msg = ctx
            .recv_match(ActorId::ANY, MsgClass::Request, Tag::WILDCARD, Timeout::Never)
            .unwrap();
        let info = msg.info();
        let body = msg.data.to_vec();
        let answer = match body.split_first() {
            Some((b'S', rest)) => {
                let mut halves = rest.splitn(2, |&b| b == b'=');
                let key = halves.next().unwrap_or_default().to_vec();
                let value = halves.next().unwrap_or_default().to_vec();
                table.insert(key, value);
                b"ok".to_vec()
            }
            Some((b'G', key)) => table.get(key).cloned().unwrap_or_else(|| b"?".to_vec()),
            _ => b"bad request".to_vec(),
        };
        ctx.reply(&info, &answer).unwrap();
        if body == b"Gshutdown" {
            break;
        }
    }
    ctx.exit();
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let rt = Runtime::new(RuntimeConfig::default()).unwrap();
    let server = rt
        .spawn(
            ActorConfig::new().with_name("store").with_auto_register(true),
            store,
        )
        .unwrap();

    rt.spawn(ActorConfig::new().with_name("client"), move |ctx| {
        let reply = ctx
            .request(server, b"Scolor=teal", Timeout::Never)
            .unwrap();
        println!("set -> {}", String::from_utf8_lossy(reply.data));

        let reply = ctx.request(server, b"Gcolor", Timeout::Never).unwrap();
        println!("get color -> {}", String::from_utf8_lossy(reply.data));

        let reply = ctx.request(server, b"Gmissing", Timeout::Never).unwrap();
        println!("get missing -> {}", String::from_utf8_lossy(reply.data));

        // The server answers this one and then leaves; once it is gone a
        // further request fails outright.
        let reply = ctx.request(server, b"Gshutdown", Timeout::Never).unwrap();
        println!("shutdown -> {}", String::from_utf8_lossy(reply.data));
        let err = ctx
            .request(server, b"Gcolor", Timeout::ms(100))
            .unwrap_err();
        println!("after shutdown -> {err}");
        ctx.exit();
    })
    .unwrap();

    rt.run();
}
