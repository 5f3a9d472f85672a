// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation message coalescing.
//!
//! Users often split one thought across several rapid messages. Firing the
//! classification pipeline once per fragment would classify half-sentences,
//! so fragments accumulate in a window per conversation key and the
//! downstream handler fires exactly once after a quiet period, with the
//! fragments joined by newlines.
//!
//! The window map is an owned component, not ambient state: one
//! `DebounceManager` owns all windows, their timers, and the downstream
//! handler. Keys are fully independent; mutations to a single key are
//! serialized by the map lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use leadloop_core::{LeadloopError, ReplyContext};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Downstream consumer of a coalesced reply.
#[async_trait]
pub trait ReplyHandler: Send + Sync + 'static {
    async fn handle(&self, context: ReplyContext) -> Result<(), LeadloopError>;
}

/// A pending coalescing window for one conversation key.
struct Window {
    /// Fragments in arrival order.
    fragments: Vec<String>,
    /// The latest context; replaced wholesale so the freshest metadata wins.
    context: ReplyContext,
    /// Timer task that will flush this window unless superseded first.
    timer: JoinHandle<()>,
}

/// Coalesces rapid inbound fragments per conversation key.
pub struct DebounceManager {
    quiet: Duration,
    handler: Arc<dyn ReplyHandler>,
    windows: Mutex<HashMap<String, Window>>,
}

impl DebounceManager {
    pub fn new(quiet: Duration, handler: Arc<dyn ReplyHandler>) -> Arc<Self> {
        Arc::new(Self {
            quiet,
            handler,
            windows: Mutex::new(HashMap::new()),
        })
    }

    /// Record a fragment for `key` and (re)start its quiet-period timer.
    ///
    /// If a window already exists, its pending timer is cancelled before
    /// the new one starts; cancellation is mandatory, a stale timer must
    /// never fire. The stored context is replaced by `latest_context`.
    pub async fn add_fragment(
        self: &Arc<Self>,
        key: &str,
        fragment: String,
        latest_context: ReplyContext,
    ) {
        let mut windows = self.windows.lock().await;
        match windows.get_mut(key) {
            Some(window) => {
                window.timer.abort();
                window.fragments.push(fragment);
                window.context = latest_context;
                window.timer = self.spawn_timer(key.to_string());
                debug!(key, fragments = window.fragments.len(), "debounce window extended");
            }
            None => {
                let timer = self.spawn_timer(key.to_string());
                windows.insert(
                    key.to_string(),
                    Window {
                        fragments: vec![fragment],
                        context: latest_context,
                        timer,
                    },
                );
                debug!(key, quiet = ?self.quiet, "debounce window opened");
            }
        }
    }

    /// Number of conversations currently buffering.
    pub async fn pending_windows(&self) -> usize {
        self.windows.lock().await.len()
    }

    fn spawn_timer(self: &Arc<Self>, key: String) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(manager.quiet).await;
            manager.flush(&key).await;
        })
    }

    /// Take the window out and invoke the handler exactly once.
    ///
    /// The window is removed before the handler runs: once flushing has
    /// begun, a new fragment for the same key opens a fresh window instead
    /// of touching this one. A handler error is logged only; the buffer is
    /// already gone, so there is no retry.
    async fn flush(&self, key: &str) {
        let window = self.windows.lock().await.remove(key);
        let Some(window) = window else {
            return;
        };

        let mut context = window.context;
        context.message = window.fragments.join("\n");
        debug!(key, fragments = window.fragments.len(), "debounce window fired");

        if let Err(e) = self.handler.handle(context).await {
            error!(key, error = %e, "reply handler failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, Duration};

    struct RecordingHandler {
        calls: Mutex<Vec<ReplyContext>>,
    }

    impl RecordingHandler {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
            })
        }

        async fn calls(&self) -> Vec<ReplyContext> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl ReplyHandler for RecordingHandler {
        async fn handle(&self, context: ReplyContext) -> Result<(), LeadloopError> {
            self.calls.lock().await.push(context);
            Ok(())
        }
    }

    fn context(instance: &str) -> ReplyContext {
        ReplyContext {
            lead_id: 1,
            number_id: 1,
            remote_number: "5532991749187".into(),
            message: String::new(),
            history: Vec::new(),
            instance_id: instance.into(),
            profile_name: None,
        }
    }

    const QUIET: Duration = Duration::from_secs(10);

    #[tokio::test(start_paused = true)]
    async fn fragments_within_window_fire_once_joined() {
        let handler = RecordingHandler::new();
        let debouncer = DebounceManager::new(QUIET, handler.clone());

        debouncer.add_fragment("jid-1", "Hello".into(), context("inst-1")).await;
        tokio::task::yield_now().await;
        advance(Duration::from_secs(5)).await;
        debouncer.add_fragment("jid-1", "there".into(), context("inst-1")).await;
        tokio::task::yield_now().await;
        advance(QUIET + Duration::from_millis(10)).await;
        tokio::task::yield_now().await;

        let calls = handler.calls().await;
        assert_eq!(calls.len(), 1, "exactly one downstream invocation");
        assert_eq!(calls[0].message, "Hello\nthere");
        assert_eq!(debouncer.pending_windows().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fragments_apart_fire_separately() {
        let handler = RecordingHandler::new();
        let debouncer = DebounceManager::new(QUIET, handler.clone());

        debouncer.add_fragment("jid-1", "Hello".into(), context("inst-1")).await;
        tokio::task::yield_now().await;
        advance(QUIET + Duration::from_millis(10)).await;
        tokio::task::yield_now().await;

        debouncer.add_fragment("jid-1", "there".into(), context("inst-1")).await;
        tokio::task::yield_now().await;
        advance(QUIET + Duration::from_millis(10)).await;
        tokio::task::yield_now().await;

        let calls = handler.calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].message, "Hello");
        assert_eq!(calls[1].message, "there");
    }

    #[tokio::test(start_paused = true)]
    async fn freshest_context_wins() {
        let handler = RecordingHandler::new();
        let debouncer = DebounceManager::new(QUIET, handler.clone());

        debouncer.add_fragment("jid-1", "a".into(), context("inst-old")).await;
        tokio::task::yield_now().await;
        advance(Duration::from_secs(3)).await;
        debouncer.add_fragment("jid-1", "b".into(), context("inst-new")).await;
        tokio::task::yield_now().await;
        advance(QUIET + Duration::from_millis(10)).await;
        tokio::task::yield_now().await;

        let calls = handler.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].instance_id, "inst-new");
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent() {
        let handler = RecordingHandler::new();
        let debouncer = DebounceManager::new(QUIET, handler.clone());

        debouncer.add_fragment("jid-1", "from one".into(), context("inst-1")).await;
        tokio::task::yield_now().await;
        advance(Duration::from_secs(6)).await;
        debouncer.add_fragment("jid-2", "from two".into(), context("inst-1")).await;
        tokio::task::yield_now().await;
        assert_eq!(debouncer.pending_windows().await, 2);

        // jid-1's window expires first; jid-2's keeps running.
        advance(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert_eq!(handler.calls().await.len(), 1);
        assert_eq!(handler.calls().await[0].message, "from one");

        advance(QUIET).await;
        tokio::task::yield_now().await;
        assert_eq!(handler.calls().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_resets_on_each_fragment() {
        let handler = RecordingHandler::new();
        let debouncer = DebounceManager::new(QUIET, handler.clone());

        // Keep poking just before expiry; the window must not fire.
        debouncer.add_fragment("jid-1", "1".into(), context("inst-1")).await;
        tokio::task::yield_now().await;
        for i in 2..=4 {
            advance(Duration::from_secs(9)).await;
            debouncer.add_fragment("jid-1", i.to_string(), context("inst-1")).await;
            tokio::task::yield_now().await;
        }
        assert!(handler.calls().await.is_empty(), "stale timers must not fire");

        advance(QUIET + Duration::from_millis(10)).await;
        tokio::task::yield_now().await;
        let calls = handler.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].message, "1\n2\n3\n4");
    }

    struct FailingHandler;

    #[async_trait]
    impl ReplyHandler for FailingHandler {
        async fn handle(&self, _context: ReplyContext) -> Result<(), LeadloopError> {
            Err(LeadloopError::Internal("boom".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn handler_failure_discards_the_buffer() {
        let debouncer = DebounceManager::new(QUIET, Arc::new(FailingHandler));

        debouncer.add_fragment("jid-1", "x".into(), context("inst-1")).await;
        tokio::task::yield_now().await;
        advance(QUIET + Duration::from_millis(10)).await;
        tokio::task::yield_now().await;

        // No retry: the window is gone and a new fragment starts fresh.
        assert_eq!(debouncer.pending_windows().await, 0);
    }
}
