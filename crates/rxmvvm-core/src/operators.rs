#![forbid(unsafe_code)]

//! Stream operators.
//!
//! Only the operators the reactive core composes its primitives from live
//! here; every operator subscribes upstream once per downstream subscriber.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::observable::{Notification, Observable, Sink, Value};
use crate::subject::Subject;
use crate::subscription::Subscription;
use crate::sync::lock;

impl<T: Value> Observable<T> {
    /// Transform every value with `map`.
    pub fn map<U: Value>(&self, map: impl Fn(T) -> U + Send + Sync + 'static) -> Observable<U> {
        let source = self.clone();
        let map = Arc::new(map);
        Observable::create(move |sink: Sink<U>| {
            let map = Arc::clone(&map);
            source.observe(move |notification| match notification {
                Notification::Next(value) => sink.next(map(value)),
                Notification::Error(error) => sink.error(error),
                Notification::Complete => sink.complete(),
            })
        })
    }

    /// Forward only values accepted by `predicate`.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Observable<T> {
        let source = self.clone();
        let predicate = Arc::new(predicate);
        Observable::create(move |sink: Sink<T>| {
            let predicate = Arc::clone(&predicate);
            source.observe(move |notification| match notification {
                Notification::Next(value) => {
                    if predicate(&value) {
                        sink.next(value);
                    }
                }
                other => sink.notify(other),
            })
        })
    }

    /// Forward the first `count` values, then complete.
    pub fn take(&self, count: usize) -> Observable<T> {
        let source = self.clone();
        Observable::create(move |sink: Sink<T>| {
            if count == 0 {
                sink.complete();
                return Subscription::empty();
            }
            let remaining = AtomicUsize::new(count);
            source.observe(move |notification| match notification {
                Notification::Next(value) => {
                    let claimed = remaining
                        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| {
                            left.checked_sub(1)
                        });
                    if let Ok(left) = claimed {
                        sink.next(value);
                        if left == 1 {
                            sink.complete();
                        }
                    }
                }
                other => sink.notify(other),
            })
        })
    }

    /// Drop the first `count` values.
    pub fn skip(&self, count: usize) -> Observable<T> {
        let source = self.clone();
        Observable::create(move |sink: Sink<T>| {
            let skipped = AtomicUsize::new(0);
            source.observe(move |notification| match notification {
                Notification::Next(value) => {
                    let passed = skipped
                        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                            (n < count).then_some(n + 1)
                        })
                        .is_err();
                    if passed {
                        sink.next(value);
                    }
                }
                other => sink.notify(other),
            })
        })
    }

    /// Emit `value` before anything from upstream.
    pub fn start_with(&self, value: T) -> Observable<T> {
        let source = self.clone();
        Observable::create(move |sink: Sink<T>| {
            sink.next(value.clone());
            source.subscribe_sink(sink)
        })
    }

    /// Interleave several streams. Completes once all of them complete.
    pub fn merge(sources: Vec<Observable<T>>) -> Observable<T> {
        Observable::create(move |sink: Sink<T>| {
            if sources.is_empty() {
                sink.complete();
                return Subscription::empty();
            }
            let active = Arc::new(AtomicUsize::new(sources.len()));
            let parts = sources
                .iter()
                .map(|source| {
                    let sink = sink.clone();
                    let active = Arc::clone(&active);
                    source.observe(move |notification| match notification {
                        Notification::Next(value) => sink.next(value),
                        Notification::Error(error) => sink.error(error),
                        Notification::Complete => {
                            if active.fetch_sub(1, Ordering::AcqRel) == 1 {
                                sink.complete();
                            }
                        }
                    })
                })
                .collect();
            Subscription::all(parts)
        })
    }

    /// Emit the latest value of every source whenever any of them emits,
    /// once all of them have emitted at least once.
    ///
    /// Snapshots are queued under the combine lock and delivered through a
    /// relay [`Subject`], so sources emitting on different threads cannot
    /// reorder them: the last snapshot delivered is the latest state.
    pub fn combine_latest(sources: Vec<Observable<T>>) -> Observable<Vec<T>> {
        Observable::create(move |sink: Sink<Vec<T>>| {
            if sources.is_empty() {
                sink.complete();
                return Subscription::empty();
            }
            let relay = Subject::new();
            let delivery = relay.attach(sink, None);
            let state = Arc::new(Mutex::new(CombineState {
                latest: vec![None; sources.len()],
                completed: 0,
            }));
            let mut parts: Vec<Subscription> = sources
                .iter()
                .enumerate()
                .map(|(index, source)| {
                    let relay = relay.clone();
                    let state = Arc::clone(&state);
                    source.observe(move |notification| {
                        {
                            let mut state = lock(&state);
                            match notification {
                                Notification::Next(value) => {
                                    state.latest[index] = Some(value);
                                    if let Some(values) = state.snapshot() {
                                        relay.enqueue(Notification::Next(values));
                                    }
                                }
                                Notification::Error(error) => {
                                    relay.enqueue(Notification::Error(error));
                                }
                                Notification::Complete => {
                                    state.completed += 1;
                                    if state.latest[index].is_none()
                                        || state.completed == state.latest.len()
                                    {
                                        relay.enqueue(Notification::Complete);
                                    }
                                }
                            }
                        }
                        relay.drain();
                    })
                })
                .collect();
            parts.push(delivery);
            Subscription::all(parts)
        })
    }

    /// [`combine_latest`](Self::combine_latest) for two streams of different types.
    pub fn combine_latest2<U: Value, V: Value>(
        first: &Observable<T>,
        second: &Observable<U>,
        combine: impl Fn(&T, &U) -> V + Send + Sync + 'static,
    ) -> Observable<V> {
        let left = first.map(Either::Left);
        let right = second.map(Either::Right);
        let combine = Arc::new(combine);
        Observable::combine_latest(vec![left, right])
            .map(move |pair| match pair.as_slice() {
                [Either::Left(a), Either::Right(b)] => Some(combine(a, b)),
                _ => None,
            })
            .flatten_some()
    }
}

impl<T: Value> Observable<Option<T>> {
    /// Unwrap `Some` values and drop `None`.
    pub fn flatten_some(&self) -> Observable<T> {
        let source = self.clone();
        Observable::create(move |sink: Sink<T>| {
            source.observe(move |notification| match notification {
                Notification::Next(Some(value)) => sink.next(value),
                Notification::Next(None) => {}
                Notification::Error(error) => sink.error(error),
                Notification::Complete => sink.complete(),
            })
        })
    }
}

impl<T: Value + PartialEq> Observable<T> {
    /// Suppress values equal to the previously forwarded one.
    pub fn distinct_until_changed(&self) -> Observable<T> {
        let source = self.clone();
        Observable::create(move |sink: Sink<T>| {
            let last: Mutex<Option<T>> = Mutex::new(None);
            source.observe(move |notification| match notification {
                Notification::Next(value) => {
                    let changed = {
                        let mut last = lock(&last);
                        if last.as_ref() == Some(&value) {
                            false
                        } else {
                            *last = Some(value.clone());
                            true
                        }
                    };
                    if changed {
                        sink.next(value);
                    }
                }
                other => sink.notify(other),
            })
        })
    }
}

struct CombineState<T> {
    latest: Vec<Option<T>>,
    completed: usize,
}

impl<T: Clone> CombineState<T> {
    fn snapshot(&self) -> Option<Vec<T>> {
        self.latest.iter().cloned().collect()
    }
}

#[derive(Clone)]
enum Either<A, B> {
    Left(A),
    Right(B),
}
