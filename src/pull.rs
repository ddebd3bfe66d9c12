//! Pull-based stages. Nothing runs until a consumer asks for the next item;
//! each request travels up the chain and the result travels back down.

use crate::error::{PipelineError, Result};
use crate::sink::Sink;
use tracing::trace;

type Payload<T, U> = Box<dyn FnMut(T) -> anyhow::Result<U>>;

pub trait Producer {
    type Item;

    fn label(&self) -> &str;

    /// True while another item can be produced. Never has side effects.
    fn has_next(&self) -> bool;

    /// Produces the next item. Callers must check [`Producer::has_next`]
    /// first; asking an exhausted producer yields
    /// [`PipelineError::ExhaustedSequence`].
    fn next_item(&mut self) -> Result<Self::Item>;

    fn map<U, F>(self, mut f: F) -> Transform<Self, U>
    where
        Self: Sized,
        F: FnMut(Self::Item) -> U + 'static,
    {
        Transform::new(self, move |item| Ok(f(item)))
    }

    fn try_map<U, F>(self, f: F) -> Transform<Self, U>
    where
        Self: Sized,
        F: FnMut(Self::Item) -> anyhow::Result<U> + 'static,
    {
        Transform::new(self, f)
    }

    /// Identity stage that hands every item to `sink` on its way through.
    fn peek<S>(self, sink: S) -> Transform<Self, Self::Item>
    where
        Self: Sized,
        S: Sink<Self::Item> + 'static,
    {
        self.map(move |item| {
            sink.send(&item);
            item
        })
        .with_label("peek")
    }

    fn boxed(self) -> Box<dyn Producer<Item = Self::Item>>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }

    fn pull(self) -> Pull<Self>
    where
        Self: Sized,
    {
        Pull {
            inner: self,
            failed: false,
        }
    }

    /// Consumes every remaining item, stopping at the first error.
    fn drain(&mut self) -> Result<Vec<Self::Item>> {
        let mut items = Vec::new();
        while self.has_next() {
            items.push(self.next_item()?);
        }
        Ok(items)
    }
}

impl<P> Producer for Box<P>
where
    P: Producer + ?Sized,
{
    type Item = P::Item;

    fn label(&self) -> &str {
        (**self).label()
    }

    fn has_next(&self) -> bool {
        (**self).has_next()
    }

    fn next_item(&mut self) -> Result<Self::Item> {
        (**self).next_item()
    }
}

/// A fixed sequence walked by a cursor.
pub struct Source<T> {
    label: String,
    items: Vec<T>,
    cursor: usize,
}

impl<T> Source<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            label: "source".to_string(),
            items: items.into_iter().collect(),
            cursor: 0,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.items.len() - self.cursor
    }
}

impl<T: Clone> Producer for Source<T> {
    type Item = T;

    fn label(&self) -> &str {
        &self.label
    }

    fn has_next(&self) -> bool {
        self.cursor < self.items.len()
    }

    fn next_item(&mut self) -> Result<T> {
        let index = self.cursor;
        let item = self
            .items
            .get(index)
            .cloned()
            .ok_or_else(|| PipelineError::exhausted(&self.label, index))?;
        self.cursor += 1;
        trace!(stage = %self.label, index, "source");
        Ok(item)
    }
}

/// Applies a function to each upstream item at the moment it is pulled.
pub struct Transform<P: Producer, U> {
    label: String,
    upstream: P,
    payload: Payload<P::Item, U>,
    produced: usize,
}

impl<P: Producer, U> Transform<P, U> {
    pub fn new<F>(upstream: P, payload: F) -> Self
    where
        F: FnMut(P::Item) -> anyhow::Result<U> + 'static,
    {
        Self {
            label: "transform".to_string(),
            upstream,
            payload: Box::new(payload),
            produced: 0,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn upstream(&self) -> &P {
        &self.upstream
    }

    pub fn produced(&self) -> usize {
        self.produced
    }
}

impl<P: Producer, U> Producer for Transform<P, U> {
    type Item = U;

    fn label(&self) -> &str {
        &self.label
    }

    fn has_next(&self) -> bool {
        self.upstream.has_next()
    }

    fn next_item(&mut self) -> Result<U> {
        let item = self.upstream.next_item()?;
        let index = self.produced;
        self.produced += 1;
        trace!(stage = %self.label, index, "transform");
        (self.payload)(item).map_err(|err| PipelineError::transform(&self.label, index, err))
    }
}

/// Advances several producers in lockstep and combines one item from each.
pub struct Merge<T, R> {
    label: String,
    upstreams: Vec<Box<dyn Producer<Item = T>>>,
    combiner: Payload<Vec<T>, R>,
    produced: usize,
}

impl<T: 'static, R> Merge<T, R> {
    pub fn new<F>(mut combiner: F) -> Self
    where
        F: FnMut(Vec<T>) -> R + 'static,
    {
        Self::try_new(move |items| Ok(combiner(items)))
    }

    pub fn try_new<F>(combiner: F) -> Self
    where
        F: FnMut(Vec<T>) -> anyhow::Result<R> + 'static,
    {
        Self {
            label: "merge".to_string(),
            upstreams: Vec::new(),
            combiner: Box::new(combiner),
            produced: 0,
        }
    }

    pub fn from_upstreams<F>(upstreams: Vec<Box<dyn Producer<Item = T>>>, combiner: F) -> Self
    where
        F: FnMut(Vec<T>) -> R + 'static,
    {
        let mut merge = Self::new(combiner);
        merge.upstreams = upstreams;
        merge
    }

    pub fn with_upstream<P>(mut self, upstream: P) -> Self
    where
        P: Producer<Item = T> + 'static,
    {
        self.upstreams.push(Box::new(upstream));
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn upstream_count(&self) -> usize {
        self.upstreams.len()
    }
}

impl<T, R> Producer for Merge<T, R> {
    type Item = R;

    fn label(&self) -> &str {
        &self.label
    }

    fn has_next(&self) -> bool {
        !self.upstreams.is_empty() && self.upstreams.iter().all(|upstream| upstream.has_next())
    }

    fn next_item(&mut self) -> Result<R> {
        let index = self.produced;
        if !self.has_next() {
            if let Some(exhausted) = self.upstreams.iter().find(|upstream| !upstream.has_next()) {
                trace!(stage = %self.label, upstream = %exhausted.label(), "merge exhausted");
            }
            return Err(PipelineError::exhausted(&self.label, index));
        }

        let items = self
            .upstreams
            .iter_mut()
            .map(|upstream| upstream.next_item())
            .collect::<Result<Vec<T>>>()?;
        self.produced += 1;
        trace!(stage = %self.label, index, width = items.len(), "merge");
        (self.combiner)(items).map_err(|err| PipelineError::transform(&self.label, index, err))
    }
}

/// Iterator over a producer's remaining items. Stops after the first error.
pub struct Pull<P> {
    inner: P,
    failed: bool,
}

impl<P> Pull<P> {
    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: Producer> Iterator for Pull<P> {
    type Item = Result<P::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || !self.inner.has_next() {
            return None;
        }
        let item = self.inner.next_item();
        self.failed = item.is_err();
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::Recorder;
    use anyhow::bail;

    #[test]
    fn source_walks_its_items_once() {
        let mut source = Source::new(["a", "b"]);
        assert_eq!(source.remaining(), 2);
        assert_eq!(source.next_item().unwrap(), "a");
        assert_eq!(source.position(), 1);
        assert_eq!(source.next_item().unwrap(), "b");
        assert!(!source.has_next());
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn exhausted_source_reports_label_and_index() {
        let mut source = Source::new([1]).with_label("ints");
        source.next_item().unwrap();
        let err = source.next_item().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ExhaustedSequence { ref stage, index: 1 } if stage == "ints"
        ));
    }

    #[test]
    fn empty_source_has_nothing() {
        let mut source = Source::<u8>::new([]);
        assert!(source.is_empty());
        assert!(!source.has_next());
        assert_eq!(source.drain().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn transform_runs_only_when_pulled() {
        let seen = Recorder::<i32>::new();
        let mut stage = Source::new([1, 2, 3]).peek(seen.clone());
        assert!(seen.is_empty());
        assert!(stage.has_next());
        assert!(seen.is_empty());

        stage.next_item().unwrap();
        assert_eq!(seen.values(), vec![1]);
        assert_eq!(stage.produced(), 1);
    }

    #[test]
    fn transform_may_change_item_type() {
        let mut stage = Source::new([1, 22]).map(|n: i32| n.to_string());
        assert_eq!(stage.drain().unwrap(), vec!["1", "22"]);
    }

    #[test]
    fn failing_transform_names_stage_and_item() {
        let mut stage = Source::new([1, 2, 3])
            .try_map(|n: i32| {
                if n == 2 {
                    bail!("two is not allowed");
                }
                Ok(n)
            })
            .with_label("picky");

        let err = stage.drain().unwrap_err();
        assert_eq!(err.stage(), "picky");
        assert_eq!(err.index(), Some(1));
        assert!(stage.has_next());
    }

    #[test]
    fn transform_propagates_upstream_exhaustion() {
        let mut stage = Source::new(Vec::<i32>::new()).with_label("empty").map(|n| n + 1);
        let err = stage.next_item().unwrap_err();
        assert_eq!(err.stage(), "empty");
    }

    #[test]
    fn merge_without_upstreams_is_empty() {
        let mut merge = Merge::new(|items: Vec<i32>| items.len());
        assert_eq!(merge.upstream_count(), 0);
        assert!(!merge.has_next());
        assert!(matches!(
            merge.next_item(),
            Err(PipelineError::ExhaustedSequence { index: 0, .. })
        ));
    }

    #[test]
    fn merge_preserves_upstream_order() {
        let mut merge = Merge::new(|items: Vec<&str>| items.concat())
            .with_upstream(Source::new(["a", "b"]))
            .with_upstream(Source::new(["1", "2"]))
            .with_upstream(Source::new(["x", "y"]));
        assert_eq!(merge.drain().unwrap(), vec!["a1x", "b2y"]);
    }

    #[test]
    fn merge_does_not_pull_when_any_upstream_is_done() {
        let mut merge = Merge::new(|items: Vec<i32>| items.iter().sum::<i32>())
            .with_upstream(Source::new([1, 2]))
            .with_upstream(Source::new([10]))
            .with_label("sum");
        assert_eq!(merge.next_item().unwrap(), 11);
        let err = merge.next_item().unwrap_err();
        assert_eq!(err.stage(), "sum");
        assert_eq!(err.index(), Some(1));
    }

    #[test]
    fn failing_combiner_reports_merge_index() {
        let mut merge = Merge::try_new(|items: Vec<i32>| {
            if items.contains(&0) {
                bail!("zero");
            }
            Ok(items.len())
        })
        .with_upstream(Source::new([1, 0]));
        assert_eq!(merge.next_item().unwrap(), 1);
        let err = merge.next_item().unwrap_err();
        assert_eq!(err.stage(), "merge");
        assert_eq!(err.index(), Some(1));
    }

    #[test]
    fn pull_stops_after_first_error() {
        let results: Vec<_> = Source::new([1, 2, 3])
            .try_map(|n: i32| if n == 2 { bail!("boom") } else { Ok(n) })
            .pull()
            .collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn boxed_producers_compose() {
        let boxed = Source::new([1, 2]).boxed();
        let mut doubled = boxed.map(|n| n * 2);
        assert_eq!(doubled.drain().unwrap(), vec![2, 4]);
        assert_eq!(doubled.upstream().label(), "source");
    }
}
