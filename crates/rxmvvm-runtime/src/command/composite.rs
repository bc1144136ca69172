#![forbid(unsafe_code)]

//! Composite commands: one execution fans out to every child.
//!
//! Each admitted composite execution gets a [`CompositeRun`] record that
//! owns the per-child subscriptions. Before any child is dispatched the run
//! subscribes to each child's first error and to its progress; then the
//! children are executed in declaration order. When the last child's
//! `execute` stream terminates the run releases everything it holds and
//! settles the composite:
//!
//! - the first child error, if any child failed;
//! - otherwise the first result of every child, in declaration order.
//!
//! A child's progress is counted only between its dispatch and its
//! termination; other children count as `0.0` until they report.

use std::sync::{Arc, Mutex};

use rxmvvm_core::sync::lock;
use rxmvvm_core::{Notification, Observable, ReactiveError, Subscription, Value};

use super::Command;
use super::execution::{CompositeLaunch, Settlement};
use super::progress::ProgressContext;

/// The children of a composite command.
pub(crate) struct CompositeChildren<T, C> {
    children: Vec<Command<T, C>>,
}

impl<T: Value, C: Value> CompositeChildren<T, C> {
    /// Fails with [`ReactiveError::IllegalArgument`] when `children` is empty.
    pub(crate) fn new(children: Vec<Command<T, C>>) -> Result<Self, ReactiveError> {
        if children.is_empty() {
            return Err(ReactiveError::illegal_argument(
                "a composite command needs at least one child",
            ));
        }
        Ok(Self { children })
    }

    /// Whether any child needs input.
    pub(crate) fn requires_input(&self) -> bool {
        self.children.iter().any(Command::requires_input)
    }

    /// `true` while every child can execute.
    pub(crate) fn gate(&self) -> Observable<bool> {
        let gates = self.children.iter().map(Command::can_execute).collect();
        Observable::combine_latest(gates).map(|open: Vec<bool>| open.iter().all(|g| *g))
    }
}

impl<T: Value, C: Value> CompositeLaunch<T, Vec<C>> for CompositeChildren<T, C> {
    fn launch(&self, input: Option<T>, progress: ProgressContext, settlement: Settlement<Vec<C>>) {
        let count = self.children.len();
        let run = Arc::new(CompositeRun {
            slots: Mutex::new(RunSlots {
                results: vec![None; count],
                done: vec![false; count],
                running: vec![false; count],
                progress: vec![0.0; count],
                first_error: None,
                finished: false,
            }),
            progress,
            settlement,
            subscriptions: Mutex::new(Some(Vec::with_capacity(count * 3))),
        });

        for (index, child) in self.children.iter().enumerate() {
            let errors = Arc::clone(&run);
            run.hold(child.error().take(1).subscribe(move |error| {
                errors.child_error(error);
            }));
            let ticks = Arc::clone(&run);
            run.hold(child.progress().subscribe(move |value| {
                ticks.child_progress(index, value);
            }));
        }

        for (index, child) in self.children.iter().enumerate() {
            lock(&run.slots).running[index] = true;
            let execution = match &input {
                Some(value) => child.execute_with(value.clone()),
                None => child.execute(),
            };
            let events = Arc::clone(&run);
            run.hold(execution.observe(move |notification| match notification {
                Notification::Next(value) => events.child_result(index, value),
                Notification::Error(error) => {
                    events.child_error(error);
                    events.child_done(index);
                }
                Notification::Complete => events.child_done(index),
            }));
        }
    }
}

// ---------------------------------------------------------------------------
// CompositeRun
// ---------------------------------------------------------------------------

struct RunSlots<C> {
    results: Vec<Option<C>>,
    done: Vec<bool>,
    running: Vec<bool>,
    progress: Vec<f32>,
    first_error: Option<ReactiveError>,
    finished: bool,
}

struct CompositeRun<C> {
    slots: Mutex<RunSlots<C>>,
    progress: ProgressContext,
    settlement: Settlement<Vec<C>>,
    /// `None` once the run has finished.
    subscriptions: Mutex<Option<Vec<Subscription>>>,
}

impl<C: Value> CompositeRun<C> {
    fn hold(&self, subscription: Subscription) {
        let mut held = lock(&self.subscriptions);
        match held.as_mut() {
            Some(subscriptions) => subscriptions.push(subscription),
            None => {
                drop(held);
                drop(subscription);
            }
        }
    }

    fn child_result(&self, index: usize, value: C) {
        let mut slots = lock(&self.slots);
        if slots.results[index].is_none() {
            slots.results[index] = Some(value);
        }
    }

    fn child_error(&self, error: ReactiveError) {
        let mut slots = lock(&self.slots);
        if slots.first_error.is_none() {
            slots.first_error = Some(error);
        }
    }

    fn child_progress(&self, index: usize, value: f32) {
        let mean = {
            let mut slots = lock(&self.slots);
            if !slots.running[index] {
                return;
            }
            slots.progress[index] = value;
            slots.progress.iter().sum::<f32>() / slots.progress.len() as f32
        };
        self.progress.set(mean);
    }

    fn child_done(&self, index: usize) {
        let outcome = {
            let mut slots = lock(&self.slots);
            slots.done[index] = true;
            slots.running[index] = false;
            if slots.finished || !slots.done.iter().all(|done| *done) {
                return;
            }
            slots.finished = true;
            match slots.first_error.take() {
                Some(error) => Err(error),
                None => slots
                    .results
                    .iter_mut()
                    .map(Option::take)
                    .collect::<Option<Vec<C>>>()
                    .ok_or(ReactiveError::NoResult),
            }
        };
        let held = lock(&self.subscriptions).take();
        drop(held);
        self.settlement.settle(outcome);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
