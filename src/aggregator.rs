//! Concurrent fan-out / fan-in of independent fetch operations.
//!
//! An [`Aggregator`] holds an ordered list of tasks. Each task is a key, an
//! async operation that yields either a fragment or a [`FetchError`], and a
//! fallback that turns that error into a replacement fragment.
//!
//! [`Aggregator::run`] spawns every operation on the tokio runtime, waits for
//! all of them, and returns a [`ResultStore`] whose iteration order is the
//! registration order, whatever order the operations finished in.
//!
//! # Failure isolation
//!
//! A failing (or panicking) operation only degrades its own section. The
//! aggregator never retries and never times anything out; per-request timeouts
//! belong to the operations' HTTP client.

use crate::error::{AggregatorError, FetchError};
use futures::future::{BoxFuture, FutureExt, join_all};
use std::collections::HashMap;
use std::future::Future;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

type Operation = Box<dyn FnOnce() -> BoxFuture<'static, Result<String, FetchError>> + Send>;
type Fallback = Box<dyn FnOnce(&FetchError) -> String + Send>;

struct Task {
    key: String,
    operation: Operation,
    fallback: Fallback,
}

/// Outcome of one task, as stored under its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    /// The operation produced its fragment.
    Fetched { fragment: String },
    /// The operation failed; `fragment` is the fallback rendered in its place.
    Failed { reason: String, fragment: String },
}

impl Section {
    /// The fragment to render, whether fetched or fallback.
    pub fn fragment(&self) -> &str {
        match self {
            Section::Fetched { fragment } | Section::Failed { fragment, .. } => fragment,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Section::Failed { .. })
    }
}

/// Key → section mapping for one run, iterated in registration order.
#[derive(Debug, Default)]
pub struct ResultStore {
    order: Vec<String>,
    sections: HashMap<String, Section>,
}

impl ResultStore {
    fn insert(&mut self, key: String, section: Section) {
        debug_assert!(!self.sections.contains_key(&key), "key written twice");
        self.order.push(key.clone());
        self.sections.insert(key, section);
    }

    pub fn get(&self, key: &str) -> Option<&Section> {
        self.sections.get(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Sections in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.order
            .iter()
            .filter_map(|key| self.sections.get(key).map(|s| (key.as_str(), s)))
    }

    /// Keys whose operation failed, in registration order.
    pub fn failed_keys(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, section)| section.is_failed())
            .map(|(key, _)| key)
            .collect()
    }

    /// Concatenate every fragment in registration order.
    pub fn concat(&self, separator: &str) -> String {
        itertools::join(self.iter().map(|(_, s)| s.fragment()), separator)
    }
}

/// Ordered set of independent fetch tasks.
#[derive(Default)]
pub struct Aggregator {
    tasks: Vec<Task>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task under `key`.
    ///
    /// `operation` is invoked exactly once by [`Aggregator::run`]. If it
    /// returns an error (or panics), `fallback` builds the fragment stored in
    /// its place.
    ///
    /// # Errors
    ///
    /// [`AggregatorError::DuplicateKey`] if `key` is already registered.
    pub fn task<Op, Fut, Fb>(
        &mut self,
        key: impl Into<String>,
        operation: Op,
        fallback: Fb,
    ) -> Result<&mut Self, AggregatorError>
    where
        Op: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<String, FetchError>> + Send + 'static,
        Fb: FnOnce(&FetchError) -> String + Send + 'static,
    {
        let key = key.into();
        if self.tasks.iter().any(|t| t.key == key) {
            return Err(AggregatorError::DuplicateKey(key));
        }
        self.tasks.push(Task {
            key,
            operation: Box::new(move || operation().boxed()),
            fallback: Box::new(fallback),
        });
        Ok(self)
    }

    /// Registered keys, in render order.
    pub fn keys(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.key.as_str()).collect()
    }

    /// Run every task concurrently and block until all have finished.
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(level = "info", skip_all, fields(tasks = self.tasks.len()))]
    pub async fn run(self) -> ResultStore {
        let t0 = Instant::now();
        let mut pending = Vec::with_capacity(self.tasks.len());
        let mut handles = Vec::with_capacity(self.tasks.len());

        for task in self.tasks {
            debug!(key = %task.key, "Spawning task");
            handles.push(tokio::spawn((task.operation)()));
            pending.push((task.key, task.fallback));
        }

        // join_all yields in spawn order, so the store is built in key order
        let outcomes = join_all(handles).await;

        let mut store = ResultStore::default();
        for ((key, fallback), outcome) in pending.into_iter().zip(outcomes) {
            let section = match outcome {
                Ok(Ok(fragment)) => {
                    debug!(%key, bytes = fragment.len(), "Task succeeded");
                    Section::Fetched { fragment }
                }
                Ok(Err(e)) => {
                    warn!(%key, error = %e, "Task failed; using fallback");
                    Section::Failed {
                        reason: e.to_string(),
                        fragment: fallback(&e),
                    }
                }
                Err(join_err) => {
                    error!(%key, error = %join_err, "Task aborted; using fallback");
                    let e = FetchError::Aborted(join_err.to_string());
                    Section::Failed {
                        reason: e.to_string(),
                        fragment: fallback(&e),
                    }
                }
            };
            store.insert(key, section);
        }

        let elapsed = t0.elapsed();
        info!(
            sections = store.len(),
            failed = store.failed_keys().len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "All tasks joined"
        );
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    fn fallback_for(key: &'static str) -> impl FnOnce(&FetchError) -> String + Send + 'static {
        move |_| format!("[{key} unavailable]")
    }

    #[tokio::test]
    async fn test_end_to_end_concatenation_in_key_order() {
        let mut agg = Aggregator::new();
        agg.task("x", || async { Ok("A".to_string()) }, fallback_for("x"))
            .unwrap()
            .task(
                "y",
                || async { Err(FetchError::parse("boom")) },
                fallback_for("y"),
            )
            .unwrap()
            .task("z", || async { Ok("C".to_string()) }, fallback_for("z"))
            .unwrap();

        let store = agg.run().await;
        assert_eq!(store.concat(""), "A[y unavailable]C");
    }

    #[tokio::test]
    async fn test_waits_for_every_task() {
        let finished = Arc::new(AtomicUsize::new(0));
        let mut agg = Aggregator::new();
        for i in 0..8u64 {
            let finished = Arc::clone(&finished);
            agg.task(
                format!("t{i}"),
                move || async move {
                    sleep(Duration::from_millis(5 * (8 - i))).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    Ok(format!("{i}"))
                },
                |_| String::new(),
            )
            .unwrap();
        }

        let store = agg.run().await;
        assert_eq!(finished.load(Ordering::SeqCst), 8);
        assert_eq!(store.len(), 8);
        assert!(store.failed_keys().is_empty());
    }

    #[tokio::test]
    async fn test_render_order_ignores_completion_order() {
        let completed = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut agg = Aggregator::new();
        // earlier keys sleep longer, so they complete last
        for (i, key) in ["a", "b", "c", "d"].into_iter().enumerate() {
            let completed = Arc::clone(&completed);
            let delay = Duration::from_millis(60 - 15 * i as u64);
            agg.task(
                key,
                move || async move {
                    sleep(delay).await;
                    completed.lock().unwrap().push(key);
                    Ok(key.to_uppercase())
                },
                |_| String::new(),
            )
            .unwrap();
        }

        let store = agg.run().await;
        assert_eq!(*completed.lock().unwrap(), vec!["d", "c", "b", "a"]);
        assert_eq!(store.concat(","), "A,B,C,D");
        let keys: Vec<&str> = store.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_failure_only_affects_its_own_key() {
        let mut agg = Aggregator::new();
        agg.task("ok1", || async { Ok("one".to_string()) }, fallback_for("ok1"))
            .unwrap()
            .task(
                "bad",
                || async {
                    Err(FetchError::Status {
                        url: "https://example.com".into(),
                        status: 500,
                    })
                },
                |e| format!("failed: {e}"),
            )
            .unwrap()
            .task("ok2", || async { Ok("two".to_string()) }, fallback_for("ok2"))
            .unwrap();

        let store = agg.run().await;
        assert_eq!(
            store.get("ok1"),
            Some(&Section::Fetched {
                fragment: "one".into()
            })
        );
        assert_eq!(
            store.get("ok2"),
            Some(&Section::Fetched {
                fragment: "two".into()
            })
        );
        let bad = store.get("bad").unwrap();
        assert!(bad.is_failed());
        assert_eq!(bad.fragment(), "failed: https://example.com returned HTTP 500");
        assert_eq!(store.failed_keys(), vec!["bad"]);
    }

    #[tokio::test]
    async fn test_panicking_task_degrades_to_fallback() {
        let mut agg = Aggregator::new();
        agg.task(
            "boom",
            || async {
                if true {
                    panic!("scraper exploded");
                }
                Ok(String::new())
            },
            |e| match e {
                FetchError::Aborted(_) => "aborted".to_string(),
                _ => "other".to_string(),
            },
        )
        .unwrap()
        .task("fine", || async { Ok("fine".to_string()) }, fallback_for("fine"))
        .unwrap();

        let store = agg.run().await;
        assert_eq!(store.get("boom").unwrap().fragment(), "aborted");
        assert_eq!(store.get("fine").unwrap().fragment(), "fine");
    }

    #[test]
    fn test_duplicate_key_is_rejected() {
        let mut agg = Aggregator::new();
        agg.task("hn", || async { Ok(String::new()) }, |_| String::new())
            .unwrap();
        let err = agg
            .task("hn", || async { Ok(String::new()) }, |_| String::new())
            .err()
            .unwrap();
        assert!(matches!(err, AggregatorError::DuplicateKey(k) if k == "hn"));
        assert_eq!(agg.keys(), vec!["hn"]);
    }

    #[tokio::test]
    async fn test_empty_aggregator_yields_empty_store() {
        let store = Aggregator::new().run().await;
        assert!(store.is_empty());
        assert_eq!(store.concat("<hr>"), "");
    }
}
