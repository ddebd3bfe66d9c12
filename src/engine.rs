use crate::pull::Producer;
use crate::push;
use crate::sink::Sink;
use anyhow::{Context, Result};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info};

pub trait EngineSource: 'static {
    fn run(&self) -> Result<()>;
}

impl<T: 'static> EngineSource for push::Source<T> {
    fn run(&self) -> Result<()> {
        self.drive()?;
        Ok(())
    }
}

/// Consumes a pull pipeline to completion, handing each final value to a
/// sink.
pub struct PullDriver<P: Producer> {
    producer: RefCell<P>,
    sink: Box<dyn Sink<P::Item>>,
}

impl<P: Producer> PullDriver<P> {
    pub fn new<S>(producer: P, sink: S) -> Self
    where
        S: Sink<P::Item> + 'static,
    {
        Self {
            producer: RefCell::new(producer),
            sink: Box::new(sink),
        }
    }
}

impl<P> EngineSource for PullDriver<P>
where
    P: Producer + 'static,
{
    fn run(&self) -> Result<()> {
        let mut producer = self.producer.borrow_mut();
        let mut consumed = 0usize;
        while producer.has_next() {
            let item = producer.next_item()?;
            self.sink.send(&item);
            consumed += 1;
        }
        debug!(stage = producer.label(), consumed, "pull pipeline drained");
        Ok(())
    }
}

pub struct EngineBuilder {
    sources: Vec<(String, Rc<dyn EngineSource>)>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn add_source<S>(mut self, label: impl Into<String>, source: Rc<S>) -> Self
    where
        S: EngineSource,
    {
        self.sources
            .push((label.into(), source as Rc<dyn EngineSource>));
        self
    }

    pub fn add_source_owned<S>(self, label: impl Into<String>, source: S) -> Self
    where
        S: EngineSource,
    {
        self.add_source(label, Rc::new(source))
    }

    pub fn add_pull<P, S>(self, label: impl Into<String>, producer: P, sink: S) -> Self
    where
        P: Producer + 'static,
        S: Sink<P::Item> + 'static,
    {
        self.add_source_owned(label, PullDriver::new(producer, sink))
    }

    pub fn build(self) -> Engine {
        Engine {
            sources: self.sources,
        }
    }
}

/// Runs each registered pipeline to completion, in registration order.
pub struct Engine {
    sources: Vec<(String, Rc<dyn EngineSource>)>,
}

impl Engine {
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|(label, _)| label.as_str())
    }

    pub fn run(self) -> Result<()> {
        if self.sources.is_empty() {
            info!("No sources registered; nothing to run.");
            return Ok(());
        }

        for (label, source) in &self.sources {
            debug!(%label, "running source");
            source
                .run()
                .with_context(|| format!("{label} source error"))?;
        }

        info!(sources = self.sources.len(), "All sources completed.");
        Ok(())
    }
}
