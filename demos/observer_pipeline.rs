//! Source -> Print -> Increment -> Print, pushed by the source.
//!
//! Run with: cargo run --example observer_pipeline --features example

use anyhow::Result;
use observe_it::{push, EngineBuilder, Listener, Printer};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let source = push::Source::new([0, 1, 2]).with_label("ints");

    let peek = Listener::tap("peek", Printer::new("Peek"));
    let increment = Listener::new("increment", |n: &i32| n + 1);
    let last = Listener::tap("final", Printer::new("Final value is"));

    source.register_listener(&peek)?;
    peek.register_listener(&increment)?;
    increment.register_listener(&last)?;

    // observers are push-based, so the source drives everything
    EngineBuilder::new()
        .add_source_owned("ints", source)
        .build()
        .run()
}
