pub mod assets;
pub mod context;
pub mod media;
pub mod phase;
pub mod presentation;
pub mod qna;
pub mod question_queue;
pub mod reaction;

/// Represents inputs that the outer runtime feeds into the presentation.
///
/// This enum is the only way to drive a running `Presentation`; the runtime
/// never touches the machine's state directly.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Explicit start-lesson control signal.
    Start,
    /// Stop-lesson control signal. Terminal and idempotent.
    Stop,
    /// Free text submitted from the chat input.
    Submit(String),
}

pub use phase::{Phase, PresentationSnapshot, SlideView};
pub use presentation::{Presentation, PresentationHandle};
