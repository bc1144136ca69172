#![forbid(unsafe_code)]

//! Property-based checks of publication order, command state and progress.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use rxmvvm_harness::TestObserver;
use rxmvvm_harness::strategies::{
    CommandOp, WriteOp, arb_command_script, arb_progress_script, arb_write_script,
};
use rxmvvm_runtime::{
    ErrorKind, GateGuard, Observable, ProgressContext, Property, ReactiveError, ReactiveFactory,
    ReactiveProperty, Subject,
};

// ---------------------------------------------------------------------------
// Property model
// ---------------------------------------------------------------------------

/// Reference model of what a gated property publishes.
#[derive(Default)]
struct PropertyModel {
    value: Option<i32>,
    suppressed: usize,
    delayed: usize,
    pending: Option<i32>,
    published: Vec<i32>,
}

impl PropertyModel {
    fn set(&mut self, v: i32) {
        self.value = Some(v);
        if self.suppressed > 0 {
            return;
        }
        if self.delayed > 0 {
            self.pending = Some(v);
        } else {
            self.published.push(v);
        }
    }

    fn undelay(&mut self) {
        self.delayed -= 1;
        if self.delayed == 0 {
            if let Some(v) = self.pending.take() {
                self.published.push(v);
            }
        }
    }
}

fn is_subsequence(needle: &[i32], haystack: &[i32]) -> bool {
    let mut rest = haystack.iter();
    needle.iter().all(|n| rest.any(|h| h == n))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn observers_see_the_modelled_publication_order(script in arb_write_script()) {
        let property: Property<i32> = Property::new();
        let mut model = PropertyModel::default();
        let mut suppress_tokens: Vec<GateGuard> = Vec::new();
        let mut delay_tokens: Vec<GateGuard> = Vec::new();
        // (observer, replayed value, index into model.published at attach time)
        let mut observers = Vec::new();

        for op in script {
            match op {
                WriteOp::Set(v) => {
                    property.set_value(v).unwrap();
                    model.set(v);
                }
                WriteOp::Suppress => {
                    suppress_tokens.push(property.suppress());
                    model.suppressed += 1;
                }
                WriteOp::Unsuppress => {
                    if suppress_tokens.pop().is_some() {
                        model.suppressed -= 1;
                    }
                }
                WriteOp::Delay => {
                    delay_tokens.push(property.delay());
                    model.delayed += 1;
                }
                WriteOp::Undelay => {
                    if delay_tokens.pop().is_some() {
                        model.undelay();
                    }
                }
                WriteOp::Subscribe => {
                    let observer = TestObserver::new(&property.as_observable());
                    observers.push((observer, model.value, model.published.len()));
                }
            }
            prop_assert_eq!(property.has_value(), property.value().is_some());
            prop_assert_eq!(property.value(), model.value);
            prop_assert_eq!(property.is_suppressed(), model.suppressed > 0);
            prop_assert_eq!(property.is_delayed(), model.delayed > 0);
        }

        for (observer, replayed, from) in &observers {
            let mut expected: Vec<i32> = replayed.iter().copied().collect();
            expected.extend_from_slice(&model.published[*from..]);
            let seen = observer.values();
            prop_assert_eq!(&seen, &expected);
            let tail = &seen[usize::from(replayed.is_some())..];
            prop_assert!(is_subsequence(tail, &model.published));
        }
    }

    #[test]
    fn release_order_of_tokens_does_not_matter(values in prop::collection::vec(any::<i32>(), 1..8)) {
        let property = Property::with_value(0);
        let observer = TestObserver::new(&property.as_observable());
        let outer = property.delay();
        let inner = property.delay();
        for v in &values {
            property.set_value(*v).unwrap();
        }
        drop(outer);
        prop_assert_eq!(observer.values(), vec![0]);
        drop(inner);
        prop_assert_eq!(observer.values(), vec![0, *values.last().unwrap()]);
    }
}

// ---------------------------------------------------------------------------
// Command model
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn command_state_follows_gate_and_execution(script in arb_command_script()) {
        let factory = ReactiveFactory::new();
        let gate = Subject::replaying(true);
        let pending: Arc<Mutex<VecDeque<Subject<u32>>>> = Arc::default();
        let command = {
            let pending = Arc::clone(&pending);
            factory
                .command()
                .can_execute(gate.as_observable())
                .from_observable(move || -> Observable<u32> {
                    let source = Subject::new();
                    pending.lock().unwrap().push_back(source.clone());
                    source.as_observable()
                })
        };
        let can_execute = TestObserver::new(&command.can_execute());
        let counts = TestObserver::new(&command.execution_count());
        let results = TestObserver::new(&command.result());
        let errors = TestObserver::new(&command.error());

        let mut gate_open = true;
        let mut executing = false;
        let mut settled = 0u64;
        let mut rejected = 0usize;
        let mut executions = Vec::new();

        for op in script {
            match op {
                CommandOp::Gate(open) => {
                    gate.next(open);
                    gate_open = open;
                }
                CommandOp::Execute => {
                    executions.push(TestObserver::new(&command.execute()));
                    if gate_open && !executing {
                        executing = true;
                    } else {
                        rejected += 1;
                    }
                }
                CommandOp::Succeed | CommandOp::Fail => {
                    let next = pending.lock().unwrap().pop_front();
                    if let Some(source) = next {
                        if op == CommandOp::Succeed {
                            source.next(7);
                        } else {
                            source.error(ReactiveError::message("boom"));
                        }
                        executing = false;
                        settled += 1;
                    }
                }
            }
            prop_assert_eq!(command.can_execute_now(), gate_open && !executing);
            prop_assert_eq!(can_execute.last_value(), Some(gate_open && !executing));
            prop_assert_eq!(command.is_executing_now(), executing);
            prop_assert_eq!(command.execution_count_now(), settled);
        }

        let expected_counts: Vec<u64> = (0..=settled).collect();
        prop_assert_eq!(counts.values(), expected_counts);

        let error_kinds: Vec<ErrorKind> = errors.values().iter().map(ReactiveError::kind).collect();
        let rejections = error_kinds
            .iter()
            .filter(|k| **k == ErrorKind::CannotExecuteCommand)
            .count();
        prop_assert_eq!(rejections, rejected);
        let outcomes = results.value_count() + error_kinds.len() - rejections;
        prop_assert_eq!(outcomes as u64, settled);
    }

    #[test]
    fn progress_is_monotonic_and_ends_at_one(script in arb_progress_script()) {
        let factory = ReactiveFactory::new();
        let reports = script.clone();
        let command = factory.command().progress_from_action(move |progress: &ProgressContext| {
            for value in &reports {
                progress.set(*value);
            }
        });
        let observer = TestObserver::new(&command.progress());
        let _run = TestObserver::new(&command.execute());

        let seen = observer.values();
        prop_assert!(seen.iter().all(|v| (0.0..=1.0).contains(v)));
        prop_assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(seen.last().copied(), Some(1.0));
    }

    #[test]
    fn standalone_progress_accumulates(deltas in prop::collection::vec(-0.25f32..0.5, 0..16)) {
        let progress = ProgressContext::new();
        let observer = TestObserver::new(&progress.as_observable());
        for delta in &deltas {
            progress.add(*delta);
        }
        let seen = observer.values();
        prop_assert_eq!(seen.first().copied(), Some(0.0));
        prop_assert!(seen.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(progress.get() <= 1.0);
        prop_assert_eq!(seen.last().copied(), Some(progress.get()));
    }
}
