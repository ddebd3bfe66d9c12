use std::cell::RefCell;
use std::fmt::{Debug, Display};
use std::rc::Rc;

/// Side effect applied to an item as it passes a stage.
pub trait Sink<T: ?Sized> {
    fn send(&self, value: &T);
}

impl<T: ?Sized, F> Sink<T> for F
where
    F: Fn(&T),
{
    fn send(&self, value: &T) {
        self(value)
    }
}

/// Writes `"{prefix}: {value}"` lines to stdout.
#[derive(Clone, Debug)]
pub struct Printer {
    prefix: String,
}

impl Printer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl<T: Display + ?Sized> Sink<T> for Printer {
    fn send(&self, value: &T) {
        tracing::trace!(prefix = %self.prefix, %value, "print");
        println!("{}: {}", self.prefix, value);
    }
}

/// Captures every value it is sent. Clones share the same buffer.
pub struct Recorder<T> {
    values: Rc<RefCell<Vec<T>>>,
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Recorder<T> {
    pub fn new() -> Self {
        Self {
            values: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.values.borrow_mut().clear();
    }

    pub fn values(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.values.borrow().clone()
    }
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Recorder {
            values: self.values.clone(),
        }
    }
}

impl<T: Clone> Sink<T> for Recorder<T> {
    fn send(&self, value: &T) {
        self.values.borrow_mut().push(value.clone());
    }
}

/// Ordered log shared by many stages, one `"{stage}:{value}"` entry per
/// item seen.
#[derive(Clone, Default)]
pub struct Journal {
    entries: Rc<RefCell<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, stage: &str, value: &dyn Debug) {
        self.entries
            .borrow_mut()
            .push(format!("{stage}:{value:?}"));
    }

    /// A sink that writes into this journal under `stage`.
    pub fn stage<T: Debug + 'static>(&self, stage: &str) -> impl Sink<T> + 'static {
        let journal = self.clone();
        let stage = stage.to_string();
        move |value: &T| journal.record(&stage, value)
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_clones_share_values() {
        let recorder = Recorder::<i32>::new();
        let handle = recorder.clone();
        recorder.send(&1);
        handle.send(&2);
        assert_eq!(recorder.values(), vec![1, 2]);
        handle.clear();
        assert!(recorder.is_empty());
    }

    #[test]
    fn closures_are_sinks() {
        let seen = RefCell::new(Vec::new());
        let sink = |value: &i32| seen.borrow_mut().push(*value * 10);
        sink.send(&3);
        assert_eq!(*seen.borrow(), vec![30]);
    }

    #[test]
    fn journal_keeps_stage_order() {
        let journal = Journal::new();
        let first = journal.stage::<i32>("a");
        let second = journal.stage::<i32>("b");
        first.send(&0);
        second.send(&0);
        first.send(&1);
        assert_eq!(journal.entries(), vec!["a:0", "b:0", "a:1"]);
    }

    #[test]
    fn printer_accepts_display_values() {
        let printer = Printer::new("Peek");
        printer.send(&7);
        printer.send("text");
        assert_eq!(printer.prefix(), "Peek");
    }
}
