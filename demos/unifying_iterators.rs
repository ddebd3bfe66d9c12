//! Two sources, each with its own print stage, merged by summing:
//!
//! ```text
//! ints   -> Peek
//!                \
//!                 sum -> Final value
//!                /
//! others -> Value is
//! ```
//!
//! Run with: cargo run --example unifying_iterators --features example

use anyhow::Result;
use observe_it::{pull, EngineBuilder, Merge, Printer, Producer};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let ints = pull::Source::new([0, 1, 2])
        .with_label("ints")
        .peek(Printer::new("Peek"));
    let others = pull::Source::new([3, 4, 5])
        .with_label("others")
        .peek(Printer::new("Value is"));

    let sum = Merge::new(|items: Vec<i32>| items.iter().sum::<i32>())
        .with_upstream(ints)
        .with_upstream(others)
        .with_label("sum");

    EngineBuilder::new()
        .add_pull("union", sum, Printer::new("Final value"))
        .build()
        .run()
}
