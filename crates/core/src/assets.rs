//! Slide assets and the fixed auxiliary clips.
//!
//! Every slide lives in its own numbered directory under the deck root:
//! `{i}/slide_{i}.txt` (narration transcript), `{i}/{i}.jpg` (slide image)
//! and `{i}/{clip_prefix}_{i}.mp4` (narrated clip). Paths handed to the
//! renderer are URLs relative to wherever the deck is served from; only the
//! transcripts are read from disk here.

use crate::phase::{Clip, SlideView};
use std::path::{Path, PathBuf};

pub const DEFAULT_CLIP_PREFIX: &str = "einstein";

/// The non-slide clips the presentation switches between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryClips {
    /// Shown before the lesson starts.
    pub idle_loop: String,
    /// Shown while an answer is being spoken.
    pub talking_loop: String,
    /// Shown while the answer service is working.
    pub no_sound_filler: String,
    /// Short clips played before answering, one picked at random.
    pub reactions: Vec<String>,
}

impl Default for AuxiliaryClips {
    fn default() -> Self {
        Self {
            idle_loop: "/einsten-basic.mp4".to_string(),
            talking_loop: "/einsten-basic.mp4".to_string(),
            no_sound_filler: "/einsten-no-sound.mp4".to_string(),
            reactions: vec![
                "/reactions/hmm.mp4".to_string(),
                "/reactions/good-question.mp4".to_string(),
                "/reactions/interesting.mp4".to_string(),
            ],
        }
    }
}

/// URLs of one slide's assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlidePaths {
    pub transcript: String,
    pub image: String,
    pub video: String,
}

#[derive(Debug, Clone)]
pub struct SlideDeck {
    root: PathBuf,
    slide_count: usize,
    clip_prefix: String,
    pub aux: AuxiliaryClips,
}

impl SlideDeck {
    pub fn new(root: impl Into<PathBuf>, slide_count: usize) -> Self {
        Self {
            root: root.into(),
            slide_count,
            clip_prefix: DEFAULT_CLIP_PREFIX.to_string(),
            aux: AuxiliaryClips::default(),
        }
    }

    pub fn with_clip_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.clip_prefix = prefix.into();
        self
    }

    pub fn with_aux_clips(mut self, aux: AuxiliaryClips) -> Self {
        self.aux = aux;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn slide_count(&self) -> usize {
        self.slide_count
    }

    pub fn slide_paths(&self, idx: usize) -> SlidePaths {
        SlidePaths {
            transcript: format!("/{idx}/slide_{idx}.txt"),
            image: format!("/{idx}/{idx}.jpg"),
            video: format!("/{idx}/{}_{idx}.mp4", self.clip_prefix),
        }
    }

    /// What the renderer shows for slide `idx`, given its transcript.
    pub fn slide_view(&self, idx: usize, text: &str) -> SlideView {
        SlideView {
            slide_index: idx,
            image: self.slide_paths(idx).image,
            text: text.to_string(),
        }
    }

    pub fn slide_clip(&self, idx: usize) -> Clip {
        Clip::once(self.slide_paths(idx).video)
    }

    /// Reads every transcript once. A slide whose transcript cannot be read
    /// gets an empty string; the lesson goes on without it.
    pub async fn load_transcripts(&self) -> Vec<String> {
        let mut transcripts = Vec::with_capacity(self.slide_count);
        for idx in 0..self.slide_count {
            let path = self
                .root
                .join(idx.to_string())
                .join(format!("slide_{idx}.txt"));
            match tokio::fs::read_to_string(&path).await {
                Ok(text) => transcripts.push(text),
                Err(e) => {
                    tracing::warn!(
                        "Failed to load transcript {}: {}. Using an empty transcript.",
                        path.display(),
                        e
                    );
                    transcripts.push(String::new());
                }
            }
        }
        transcripts
    }
}
