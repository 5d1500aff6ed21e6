//! Ordered write queue
//!
//! Every mutation of one store goes through a single unbounded channel
//! drained by one worker task, so writes apply in submission order.

use super::backend::{PreferencesBackend, Transform};
use crate::contract::SettingsError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};

struct WriteJob {
    /// Key name (or batch description) for logging
    label: String,
    transform: Transform,
    reply: oneshot::Sender<Result<(), SettingsError>>,
}

pub(crate) struct WriteQueue {
    tx: mpsc::UnboundedSender<WriteJob>,
}

impl WriteQueue {
    /// Spawn the worker on the current Tokio runtime.
    ///
    /// The worker exits once the queue is dropped and pending jobs are drained.
    pub(crate) fn spawn(backend: Arc<dyn PreferencesBackend>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(backend, rx));
        Self { tx }
    }

    pub(crate) fn submit(&self, label: impl Into<String>, transform: Transform) -> PendingWrite {
        let (reply, rx) = oneshot::channel();
        let job = WriteJob {
            label: label.into(),
            transform,
            reply,
        };

        if let Err(mpsc::error::SendError(job)) = self.tx.send(job) {
            tracing::warn!(key = %job.label, "settings write queue is closed, dropping write");
        }

        PendingWrite { rx }
    }
}

async fn run_worker(
    backend: Arc<dyn PreferencesBackend>,
    mut rx: mpsc::UnboundedReceiver<WriteJob>,
) {
    while let Some(job) = rx.recv().await {
        tracing::debug!(key = %job.label, "applying settings write");

        let result = backend
            .mutate(job.transform)
            .await
            .map(|_| ())
            .map_err(SettingsError::from);

        // Nobody is awaiting the outcome: the log is the only place it surfaces
        if let Err(Err(e)) = job.reply.send(result) {
            tracing::error!(key = %job.label, error = %e, "settings write failed");
        }
    }

    tracing::debug!("settings write queue closed");
}

/// Outcome of a queued write.
///
/// The write is already queued when this is returned; awaiting it only waits
/// for the result. Dropping it turns the write into fire-and-forget, in which
/// case a failure is logged.
#[derive(Debug)]
pub struct PendingWrite {
    rx: oneshot::Receiver<Result<(), SettingsError>>,
}

impl Future for PendingWrite {
    type Output = Result<(), SettingsError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|outcome| match outcome {
            Ok(result) => result,
            Err(_) => Err(SettingsError::QueueClosed),
        })
    }
}
