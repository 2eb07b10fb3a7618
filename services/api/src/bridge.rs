//! Media players backed by the connected renderer.
//!
//! The browser does the actual rendering. Every non-looping playback gets a
//! numeric id; the renderer echoes it back in `media_ended` and the bridge
//! fires the matching completion, at most once.

use crate::protocol::ServerMessage;
use anyhow::Result;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use lecture_core::media::{AudioPlayer, CompletionSender, MediaCompletion, VideoPlayer};
use lecture_core::phase::Clip;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

pub const OUTBOUND_CAPACITY: usize = 64;

pub struct MediaBridge {
    outbound: broadcast::Sender<ServerMessage>,
    next_id: AtomicU64,
    waiting: Mutex<HashMap<u64, CompletionSender>>,
    // Current video and audio instructions, replayed to renderers that
    // connect later or fall behind.
    now_showing: Mutex<Option<ServerMessage>>,
    now_playing: Mutex<Option<ServerMessage>>,
    // Bumped on every connection; only the newest renderer owns the lesson.
    renderer: AtomicU64,
}

impl MediaBridge {
    pub fn new(capacity: usize) -> Arc<Self> {
        let (outbound, _) = broadcast::channel(capacity);
        Arc::new(Self {
            outbound,
            next_id: AtomicU64::new(1),
            waiting: Mutex::new(HashMap::new()),
            now_showing: Mutex::new(None),
            now_playing: Mutex::new(None),
            renderer: AtomicU64::new(0),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.outbound.subscribe()
    }

    /// The media instructions still in effect: current clip, then current
    /// answer audio.
    pub fn replay(&self) -> Vec<ServerMessage> {
        let video = lock(&self.now_showing).clone();
        let audio = lock(&self.now_playing).clone();
        video.into_iter().chain(audio).collect()
    }

    /// Registers a new renderer connection, superseding any earlier one.
    pub fn connect_renderer(&self) -> u64 {
        self.renderer.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current_renderer(&self, generation: u64) -> bool {
        self.renderer.load(Ordering::SeqCst) == generation
    }

    /// Called when the renderer reports a playback as finished.
    pub fn media_ended(&self, playback_id: u64) {
        match lock(&self.waiting).remove(&playback_id) {
            Some(sender) => sender.complete(),
            None => tracing::debug!(
                "Ignoring media_ended for unknown or already finished playback {}.",
                playback_id
            ),
        }
    }

    fn allocate(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn register(&self, playback_id: u64) -> MediaCompletion {
        let (sender, completion) = MediaCompletion::channel();
        lock(&self.waiting).insert(playback_id, sender);
        completion
    }

    fn cancel(&self, playback_id: u64) {
        lock(&self.waiting).remove(&playback_id);
    }

    /// Returns `false` when no renderer is connected.
    fn send(&self, msg: ServerMessage) -> bool {
        self.outbound.send(msg).is_ok()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // A panic while holding one of these locks leaves plain data behind; keep using it.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct RendererVideo {
    bridge: Arc<MediaBridge>,
    current: Mutex<Option<u64>>,
}

impl RendererVideo {
    pub fn new(bridge: Arc<MediaBridge>) -> Self {
        Self {
            bridge,
            current: Mutex::new(None),
        }
    }
}

#[async_trait]
impl VideoPlayer for RendererVideo {
    async fn play(&self, clip: &Clip) -> Result<MediaCompletion> {
        let playback_id = self.bridge.allocate();
        if let Some(previous) = lock(&self.current).replace(playback_id) {
            self.bridge.cancel(previous);
        }

        let msg = ServerMessage::PlayVideo {
            playback_id,
            clip: clip.clone(),
        };
        *lock(&self.bridge.now_showing) = Some(msg.clone());

        if clip.looping {
            if !self.bridge.send(msg) {
                tracing::debug!("No renderer connected for loop {}.", clip.src);
            }
            return Ok(MediaCompletion::never());
        }

        let completion = self.bridge.register(playback_id);
        if !self.bridge.send(msg) {
            self.bridge.cancel(playback_id);
            anyhow::bail!("no renderer connected to play {}", clip.src);
        }
        Ok(completion)
    }

    fn stop(&self) {
        if let Some(previous) = lock(&self.current).take() {
            self.bridge.cancel(previous);
        }
        *lock(&self.bridge.now_showing) = None;
        self.bridge.send(ServerMessage::StopVideo);
    }
}

pub struct RendererAudio {
    bridge: Arc<MediaBridge>,
    current: Mutex<Option<u64>>,
}

impl RendererAudio {
    pub fn new(bridge: Arc<MediaBridge>) -> Self {
        Self {
            bridge,
            current: Mutex::new(None),
        }
    }
}

#[async_trait]
impl AudioPlayer for RendererAudio {
    async fn play(&self, audio: Vec<u8>) -> Result<MediaCompletion> {
        let playback_id = self.bridge.allocate();
        let completion = self.bridge.register(playback_id);
        *lock(&self.current) = Some(playback_id);

        let msg = ServerMessage::PlayAudio {
            playback_id,
            audio_base64: STANDARD.encode(&audio),
        };
        *lock(&self.bridge.now_playing) = Some(msg.clone());
        if !self.bridge.send(msg) {
            self.bridge.cancel(playback_id);
            *lock(&self.bridge.now_playing) = None;
            anyhow::bail!("no renderer connected to play answer audio");
        }
        Ok(completion)
    }

    fn stop(&self) {
        *lock(&self.bridge.now_playing) = None;
        if let Some(previous) = lock(&self.current).take() {
            self.bridge.cancel(previous);
            self.bridge.send(ServerMessage::StopAudio);
        }
    }
}
