//! Hot, cached settings values
//!
//! A [`SharedSetting`] runs at most one upstream `get` subscription and fans
//! its values out to any number of subscribers through a `watch` channel.
//! When that upstream runs is decided by [`SharingPolicy`].

use crate::contract::SettingsError;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Stream of typed values produced by `SettingsStore::get`
pub type SettingStream<T> = BoxStream<'static, Result<T, SettingsError>>;

type Source<T> = Box<dyn Fn() -> SettingStream<T> + Send + Sync>;

/// When the upstream subscription of a [`SharedSetting`] runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharingPolicy {
    /// Start immediately, run until the last handle is dropped
    Eager,
    /// Start on the first subscriber, then never stop
    Lazy,
    /// Run while at least one subscriber exists; after the last one leaves,
    /// keep running for `grace` before stopping
    WhileSubscribed { grace: Duration },
}

impl SharingPolicy {
    /// `WhileSubscribed` with no grace period
    pub fn while_subscribed() -> Self {
        Self::WhileSubscribed {
            grace: Duration::ZERO,
        }
    }
}

#[derive(Default)]
struct Control {
    subscribers: usize,
    upstream: Option<CancellationToken>,
    /// Bumped on every subscribe so a stale grace timer can tell it lost
    epoch: u64,
    /// Bumped on every upstream start so a finished run only clears itself
    run: u64,
}

struct Lifecycle {
    key: String,
    policy: SharingPolicy,
    control: Mutex<Control>,
}

impl Lifecycle {
    fn stop(&self, control: &mut Control) {
        if let Some(token) = control.upstream.take() {
            tracing::debug!(key = %self.key, "stopping shared setting upstream");
            token.cancel();
        }
    }

    fn release(self: &Arc<Self>) {
        let mut control = self.control.lock();
        control.subscribers = control.subscribers.saturating_sub(1);
        if control.subscribers > 0 {
            return;
        }

        let SharingPolicy::WhileSubscribed { grace } = self.policy else {
            return;
        };

        if grace.is_zero() {
            self.stop(&mut control);
            return;
        }

        let epoch = control.epoch;
        let lifecycle = Arc::downgrade(self);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(grace).await;
                    if let Some(lifecycle) = lifecycle.upgrade() {
                        let mut control = lifecycle.control.lock();
                        if control.subscribers == 0 && control.epoch == epoch {
                            lifecycle.stop(&mut control);
                        }
                    }
                });
            }
            // No runtime to host the timer
            Err(_) => self.stop(&mut control),
        }
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        let control = self.control.get_mut();
        if let Some(token) = control.upstream.take() {
            token.cancel();
        }
    }
}

struct Shared<T> {
    state: Arc<watch::Sender<T>>,
    source: Source<T>,
    lifecycle: Arc<Lifecycle>,
}

impl<T: Send + Sync + 'static> Shared<T> {
    fn start(&self, control: &mut Control) {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let mut upstream = (self.source)();
        let state = Arc::clone(&self.state);
        let key = self.lifecycle.key.clone();
        let lifecycle = Arc::downgrade(&self.lifecycle);
        control.run += 1;
        let run = control.run;

        tracing::debug!(key = %key, "starting shared setting upstream");
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    item = upstream.next() => match item {
                        Some(Ok(value)) => {
                            state.send_replace(value);
                        }
                        Some(Err(e)) => {
                            tracing::warn!(key = %key, error = %e, "shared setting read failed, keeping last value");
                        }
                        None => {
                            tracing::warn!(key = %key, "shared setting upstream ended, restarting on next subscribe");
                            if let Some(lifecycle) = lifecycle.upgrade() {
                                let mut control = lifecycle.control.lock();
                                if control.run == run {
                                    control.upstream = None;
                                }
                            }
                            break;
                        }
                    },
                }
            }
        });

        control.upstream = Some(token);
    }
}

/// Continuously updated cached value of one key.
///
/// Cloning is cheap; all clones share the same upstream and cache.
pub struct SharedSetting<T> {
    inner: Arc<Shared<T>>,
}

impl<T> Clone for SharedSetting<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> SharedSetting<T> {
    /// Must be called within a Tokio runtime when `policy` is `Eager`
    pub(crate) fn new<F>(key: impl Into<String>, policy: SharingPolicy, initial: T, source: F) -> Self
    where
        F: Fn() -> SettingStream<T> + Send + Sync + 'static,
    {
        let (state, _) = watch::channel(initial);
        let shared = Shared {
            state: Arc::new(state),
            source: Box::new(source),
            lifecycle: Arc::new(Lifecycle {
                key: key.into(),
                policy,
                control: Mutex::new(Control::default()),
            }),
        };

        if policy == SharingPolicy::Eager {
            let mut control = shared.lifecycle.control.lock();
            shared.start(&mut control);
        }

        Self {
            inner: Arc::new(shared),
        }
    }

    /// Latest cached value
    pub fn value(&self) -> T {
        self.inner.state.borrow().clone()
    }

    pub fn policy(&self) -> SharingPolicy {
        self.inner.lifecycle.policy
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lifecycle.control.lock().subscribers
    }

    /// Whether the upstream subscription is currently running
    pub fn is_active(&self) -> bool {
        self.inner.lifecycle.control.lock().upstream.is_some()
    }

    /// Register a subscriber, starting the upstream if it is not running.
    ///
    /// Must be called within a Tokio runtime.
    pub fn subscribe(&self) -> Subscription<T> {
        let lifecycle = Arc::clone(&self.inner.lifecycle);
        {
            let mut control = lifecycle.control.lock();
            control.subscribers += 1;
            control.epoch += 1;
            if control.upstream.is_none() {
                self.inner.start(&mut control);
            }
        }

        Subscription {
            rx: self.inner.state.subscribe(),
            lifecycle,
        }
    }
}

/// One observer of a [`SharedSetting`]; dropping it unsubscribes
pub struct Subscription<T> {
    rx: watch::Receiver<T>,
    lifecycle: Arc<Lifecycle>,
}

impl<T: Clone + Send + Sync + 'static> Subscription<T> {
    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Wait for the next value. `None` once the setting can no longer change.
    pub async fn changed(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Values after the current one, as a stream that keeps this subscription alive
    pub fn into_stream(self) -> BoxStream<'static, T> {
        stream::unfold(self, |mut subscription| async move {
            let value = subscription.changed().await?;
            Some((value, subscription))
        })
        .boxed()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.lifecycle.release();
    }
}
