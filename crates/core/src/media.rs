//! Media playback capabilities.
//!
//! Rendering lives outside this crate. The presentation only needs two things
//! from a renderer: start a clip (or an audio buffer) from position zero, and
//! get told exactly once when it ends. Every `play` call therefore hands back
//! a `MediaCompletion`, a single-fire future the presentation awaits as a
//! suspension point.

use crate::phase::Clip;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::oneshot;

/// Fires the completion of one playback. Consumed on use, so it can fire once.
#[derive(Debug)]
pub struct CompletionSender(oneshot::Sender<()>);

impl CompletionSender {
    pub fn complete(self) {
        // The receiving side may already be gone after a stop; nothing to do then.
        let _ = self.0.send(());
    }
}

#[derive(Debug)]
enum Completion {
    Ready,
    Never,
    Pending(oneshot::Receiver<()>),
}

/// Single-fire notification that a playback has ended.
#[derive(Debug)]
pub struct MediaCompletion {
    inner: Completion,
}

impl MediaCompletion {
    /// A completion the caller fires through the returned sender.
    pub fn channel() -> (CompletionSender, Self) {
        let (tx, rx) = oneshot::channel();
        (
            CompletionSender(tx),
            Self {
                inner: Completion::Pending(rx),
            },
        )
    }

    /// Already ended. Used when playback could not start at all.
    pub fn ready() -> Self {
        Self {
            inner: Completion::Ready,
        }
    }

    /// Looping clips never end on their own.
    pub fn never() -> Self {
        Self {
            inner: Completion::Never,
        }
    }

    /// Resolves once the playback has ended.
    ///
    /// A player that drops its sender without firing counts as ended, so a
    /// vanished renderer cannot park the presentation forever.
    pub async fn ended(self) {
        match self.inner {
            Completion::Ready => {}
            Completion::Never => std::future::pending::<()>().await,
            Completion::Pending(rx) => {
                if rx.await.is_err() {
                    tracing::warn!("Media player dropped a completion without firing it; treating playback as ended.");
                }
            }
        }
    }
}

/// Renders video clips (slide narration, reactions, idle loops).
#[async_trait]
pub trait VideoPlayer: Send + Sync {
    /// Replaces whatever is on screen with `clip`, starting from zero.
    async fn play(&self, clip: &Clip) -> Result<MediaCompletion>;

    /// Stops the current clip immediately.
    fn stop(&self);
}

/// Plays decoded answer audio. Only one buffer is ever playing at a time.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, audio: Vec<u8>) -> Result<MediaCompletion>;

    /// Stops and releases the current audio immediately.
    fn stop(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_completion_fires_once_sent() {
        let (tx, completion) = MediaCompletion::channel();
        tx.complete();
        tokio::time::timeout(Duration::from_secs(1), completion.ended())
            .await
            .expect("completion should resolve after complete()");
    }

    #[tokio::test]
    async fn test_dropped_sender_counts_as_ended() {
        let (tx, completion) = MediaCompletion::channel();
        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), completion.ended())
            .await
            .expect("a dropped sender must not stall the waiter");
    }

    #[tokio::test]
    async fn test_looping_completion_never_resolves() {
        let result =
            tokio::time::timeout(Duration::from_millis(50), MediaCompletion::never().ended()).await;
        assert!(result.is_err(), "looping playback must not complete");
    }

    #[tokio::test]
    async fn test_ready_completion_resolves_immediately() {
        tokio::time::timeout(Duration::from_millis(50), MediaCompletion::ready().ended())
            .await
            .expect("ready completion resolves without a sender");
    }
}
