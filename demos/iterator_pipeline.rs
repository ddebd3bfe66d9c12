//! Source -> Print -> Increment, consumed by a loop.
//!
//! Run with: cargo run --example iterator_pipeline --features example

use anyhow::Result;
use observe_it::{pull, Printer, Producer, Sink};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let source = pull::Source::new([0, 1, 2]).with_label("ints");
    let mut pipeline = source
        .peek(Printer::new("Peek"))
        .map(|n: i32| n + 1)
        .with_label("increment");

    // iterators are pull-based, so nothing happens until this loop asks
    let last = Printer::new("Final value");
    while pipeline.has_next() {
        let value = pipeline.next_item()?;
        last.send(&value);
    }

    Ok(())
}
