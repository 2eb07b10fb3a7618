/// The prompt every lecture context starts with.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an Albert Einstein, a physicist who developed the theory of relativity. You are teaching a class about the relativity theory. Answer the questions from the students in a friendly and informative manner in english. You've prepared a lesson with slides to help explain the concepts. Below are the slides you showed and questions from the students with your answers.";

/// What the lecturer says to the audience before the lesson starts.
pub const DEFAULT_GREETING: &str =
    "The topic of today's lesson is the relativity theory. Are you ready to start?";

/// Append-only conversational memory sent with every question.
#[derive(Debug, Clone)]
pub struct LessonContext {
    fragments: Vec<String>,
}

impl LessonContext {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            fragments: vec![system_prompt.into()],
        }
    }

    /// Records a finished slide. `slide_index` is zero-based, the rendered number is not.
    pub fn push_slide(&mut self, slide_index: usize, transcript: &str) {
        self.fragments
            .push(format!("Slide_{}: \"{}\"", slide_index + 1, transcript));
    }

    pub fn push_answer(&mut self, question: &str, answer: &str) {
        self.fragments.push(format!("Q: {question}\nA: {answer}"));
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn render(&self) -> String {
        self.fragments.join("\n")
    }
}

impl Default for LessonContext {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_renders_fragments_in_order() {
        let mut context = LessonContext::new("prompt");
        context.push_slide(0, "Light is fast.");
        context.push_answer("How fast?", "Very.");

        assert_eq!(
            context.render(),
            "prompt\nSlide_1: \"Light is fast.\"\nQ: How fast?\nA: Very."
        );
        assert_eq!(context.len(), 3);
    }

    #[test]
    fn test_empty_transcript_still_recorded() {
        let mut context = LessonContext::new("prompt");
        context.push_slide(4, "");
        assert!(context.render().ends_with("Slide_5: \"\""));
    }
}
