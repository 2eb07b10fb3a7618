//! Defines the WebSocket message protocol between the renderer (browser) and the lecture server.

use lecture_core::{PresentationSnapshot, SlideView};
use lecture_core::phase::Clip;
use serde::{Deserialize, Serialize};

/// Messages sent from the renderer to the server.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// The "Start Lesson" button.
    Start,
    /// The "Stop Lesson" button.
    Stop,
    /// A chat message from the audience.
    Question { text: String },
    /// A non-looping clip or an answer audio finished playing.
    MediaEnded { playback_id: u64 },
}

/// Messages sent from the server to the renderer.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Replace the current video with this clip, starting from zero.
    PlayVideo {
        playback_id: u64,
        #[serde(flatten)]
        clip: Clip,
    },
    StopVideo,
    /// Play an answer (base64 encoded mp3) and report `media_ended` when done.
    PlayAudio {
        playback_id: u64,
        audio_base64: String,
    },
    StopAudio,
    /// The slide image and transcript shown behind the clip.
    ShowSlide(SlideView),
    /// A chat line from the lecturer.
    Say { text: String },
    /// Pushes the presentation state after every transition.
    State(PresentationSnapshot),
}
