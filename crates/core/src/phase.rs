use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Initial,
    SlideVideo,
    ReactionVideo,
    WaitingAudio,
    PlayingAudio,
    Finished,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Finished)
    }
}

/// One video playback request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clip {
    pub src: String,
    pub muted: bool,
    pub looping: bool,
}

impl Clip {
    /// A clip that plays once with sound and reports completion.
    pub fn once(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            muted: false,
            looping: false,
        }
    }

    /// A muted background loop. Never reports completion.
    pub fn background_loop(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            muted: true,
            looping: true,
        }
    }
}

/// The slide currently on screen behind the clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideView {
    pub slide_index: usize,
    /// URL of the slide image.
    pub image: String,
    /// Narration transcript shown under the image.
    pub text: String,
}

/// Read-only view of the machine, published after every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationSnapshot {
    pub phase: Phase,
    pub slide_index: usize,
    pub slide_count: usize,
    pub queued_questions: usize,
    pub started: bool,
}

impl PresentationSnapshot {
    pub fn new(slide_count: usize) -> Self {
        Self {
            phase: Phase::Initial,
            slide_index: 0,
            slide_count,
            queued_questions: 0,
            started: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_serializes_kebab_case() {
        let json = serde_json::to_string(&Phase::ReactionVideo).unwrap();
        assert_eq!(json, "\"reaction-video\"");

        let phase: Phase = serde_json::from_str("\"waiting-audio\"").unwrap();
        assert_eq!(phase, Phase::WaitingAudio);
    }

    #[test]
    fn test_only_finished_is_terminal() {
        assert!(Phase::Finished.is_terminal());
        assert!(!Phase::PlayingAudio.is_terminal());
        assert!(!Phase::Initial.is_terminal());
    }
}
