use crate::phase::Clip;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Picks the reaction clip played before each answer.
pub struct ReactionPicker {
    clips: Vec<String>,
    fallback: String,
    rng: StdRng,
}

impl ReactionPicker {
    pub fn new(clips: Vec<String>, fallback: String) -> Self {
        Self::with_rng(clips, fallback, StdRng::from_entropy())
    }

    /// Deterministic picker for reproducible sessions and tests.
    pub fn seeded(clips: Vec<String>, fallback: String, seed: u64) -> Self {
        Self::with_rng(clips, fallback, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(clips: Vec<String>, fallback: String, rng: StdRng) -> Self {
        Self {
            clips,
            fallback,
            rng,
        }
    }

    /// Uniformly random reaction; the fallback clip when none are configured.
    pub fn pick(&mut self) -> Clip {
        let src = self
            .clips
            .choose(&mut self.rng)
            .unwrap_or(&self.fallback)
            .clone();
        Clip::once(src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clips() -> Vec<String> {
        vec!["a.mp4".into(), "b.mp4".into(), "c.mp4".into()]
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut first = ReactionPicker::seeded(clips(), "f.mp4".into(), 7);
        let mut second = ReactionPicker::seeded(clips(), "f.mp4".into(), 7);

        for _ in 0..10 {
            assert_eq!(first.pick(), second.pick());
        }
    }

    #[test]
    fn test_picks_only_configured_clips() {
        let mut picker = ReactionPicker::seeded(clips(), "f.mp4".into(), 42);
        for _ in 0..50 {
            let clip = picker.pick();
            assert!(clips().contains(&clip.src));
            assert!(!clip.looping);
        }
    }

    #[test]
    fn test_empty_reactions_use_fallback() {
        let mut picker = ReactionPicker::seeded(vec![], "f.mp4".into(), 1);
        assert_eq!(picker.pick().src, "f.mp4");
    }
}
