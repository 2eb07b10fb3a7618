use crate::{
    Input,
    assets::SlideDeck,
    context::LessonContext,
    media::{AudioPlayer, MediaCompletion, VideoPlayer},
    phase::{Clip, Phase, PresentationSnapshot, SlideView},
    qna::{Answer, QnaClient, QnaError},
    question_queue::QuestionQueue,
    reaction::ReactionPicker,
};
use anyhow::{Context, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Capacity of the input channel feeding a spawned presentation.
pub const INPUT_CAPACITY: usize = 64;

/// What a suspended step resumes with.
#[derive(Debug)]
pub enum Wake {
    SlideEnded,
    ReactionEnded,
    Answered(Result<Answer, QnaError>),
    AudioEnded { answer: String },
}

// The single suspension point the machine is currently parked on. Owning it
// here (instead of spawning) is what lets `stop` cancel it by dropping it.
type PendingWake = Pin<Box<dyn Future<Output = Wake> + Send>>;

/// The lecture state machine.
///
/// One instance drives one session: it plays slide clips in order, and after
/// each slide drains the audience question queue one question at a time
/// (reaction clip, answer service call, answer audio) before moving on.
/// All waits are expressed as a single pending `Wake` future, so the machine
/// never runs two cycles at once and never plays two answers at once.
pub struct Presentation {
    phase: Phase,
    slide_index: usize,
    started: bool,
    transcripts: Vec<String>,
    context: LessonContext,
    queue: QuestionQueue,
    deck: SlideDeck,
    reactions: ReactionPicker,
    video: Arc<dyn VideoPlayer>,
    audio: Arc<dyn AudioPlayer>,
    qna: Arc<dyn QnaClient>,
    pending: Option<PendingWake>,
    snapshot_tx: watch::Sender<PresentationSnapshot>,
    slide_tx: watch::Sender<Option<SlideView>>,
}

impl Presentation {
    pub fn new(
        deck: SlideDeck,
        transcripts: Vec<String>,
        video: Arc<dyn VideoPlayer>,
        audio: Arc<dyn AudioPlayer>,
        qna: Arc<dyn QnaClient>,
    ) -> Self {
        let reactions = ReactionPicker::new(
            deck.aux.reactions.clone(),
            deck.aux.no_sound_filler.clone(),
        );
        let (snapshot_tx, _) = watch::channel(PresentationSnapshot::new(deck.slide_count()));
        // Slide 0 is on screen behind the idle loop before the lesson starts.
        let first_slide = (deck.slide_count() > 0)
            .then(|| deck.slide_view(0, transcripts.first().map(String::as_str).unwrap_or("")));
        let (slide_tx, _) = watch::channel(first_slide);
        Self {
            phase: Phase::Initial,
            slide_index: 0,
            started: false,
            transcripts,
            context: LessonContext::default(),
            queue: QuestionQueue::new(),
            deck,
            reactions,
            video,
            audio,
            qna,
            pending: None,
            snapshot_tx,
            slide_tx,
        }
    }

    pub fn with_context(mut self, context: LessonContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_reactions(mut self, reactions: ReactionPicker) -> Self {
        self.reactions = reactions;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn slide_index(&self) -> usize {
        self.slide_index
    }

    pub fn context(&self) -> &LessonContext {
        &self.context
    }

    pub fn queued_questions(&self) -> usize {
        self.queue.len()
    }

    pub fn snapshot(&self) -> PresentationSnapshot {
        PresentationSnapshot {
            phase: self.phase,
            slide_index: self.slide_index,
            slide_count: self.deck.slide_count(),
            queued_questions: self.queue.len(),
            started: self.started,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PresentationSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Follows the slide shown behind the clips; `None` for an empty deck.
    pub fn subscribe_slides(&self) -> watch::Receiver<Option<SlideView>> {
        self.slide_tx.subscribe()
    }

    /// Moves the machine onto its own task and returns a handle for feeding it.
    pub fn spawn(self) -> (PresentationHandle, JoinHandle<LessonContext>) {
        let (inputs_tx, inputs_rx) = mpsc::channel(INPUT_CAPACITY);
        let handle = PresentationHandle {
            inputs: inputs_tx,
            snapshots: self.subscribe(),
            slides: self.subscribe_slides(),
        };
        let task = tokio::spawn(self.run(inputs_rx));
        (handle, task)
    }

    /// Runs until the input channel closes and hands back what the lesson
    /// accumulated.
    ///
    /// Inputs are handled as soon as they arrive, even while a clip, an
    /// answer request or answer audio is in progress.
    pub async fn run(mut self, mut inputs: mpsc::Receiver<Input>) -> LessonContext {
        self.open().await;

        loop {
            tokio::select! {
                biased;
                input = inputs.recv() => match input {
                    Some(input) => self.handle_input(input).await,
                    None => {
                        tracing::info!("Input channel closed, shutting the presentation down.");
                        self.stop();
                        break;
                    }
                },
                wake = wait_pending(&mut self.pending) => {
                    self.pending = None;
                    self.resume(wake).await;
                }
            }
        }
        self.context
    }

    /// Shows the idle loop while waiting for the lesson to start.
    pub async fn open(&mut self) {
        let clip = Clip::background_loop(self.deck.aux.idle_loop.as_str());
        // Loops never complete, so the completion is not worth keeping.
        let _ = show(self.video.as_ref(), &clip).await;
        self.publish();
    }

    pub async fn handle_input(&mut self, input: Input) {
        match input {
            Input::Start => self.start().await,
            Input::Stop => self.stop(),
            Input::Submit(text) => self.submit(text).await,
        }
    }

    /// Waits for the current suspension point and applies it.
    /// Returns `false` when the machine is not waiting on anything.
    pub async fn step(&mut self) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        let wake = pending.await;
        self.resume(wake).await;
        true
    }

    pub async fn resume(&mut self, wake: Wake) {
        if self.phase.is_terminal() {
            tracing::debug!("Ignoring {:?} after the lesson finished.", wake);
            return;
        }
        match wake {
            Wake::SlideEnded => self.on_slide_ended().await,
            Wake::ReactionEnded => self.on_reaction_ended().await,
            Wake::Answered(result) => self.on_answered(result).await,
            Wake::AudioEnded { answer } => self.on_audio_ended(answer).await,
        }
    }

    async fn start(&mut self) {
        if self.started || self.phase.is_terminal() {
            tracing::debug!("Start ignored in phase {:?}.", self.phase);
            return;
        }
        self.started = true;
        tracing::info!("Lesson started with {} slides.", self.deck.slide_count());

        if self.deck.slide_count() == 0 {
            self.finish();
            return;
        }
        self.play_slide().await;
    }

    /// Stops everything immediately. Nothing that was in flight can touch the
    /// machine afterwards because the pending wake is dropped here.
    pub fn stop(&mut self) {
        if self.phase.is_terminal() && self.pending.is_none() && self.queue.is_empty() {
            tracing::debug!("Stop requested but the lesson is already finished.");
            return;
        }
        tracing::info!(
            "Stopping lesson at slide {} ({} queued questions discarded).",
            self.slide_index,
            self.queue.len()
        );
        self.queue.reset();
        self.finish();
    }

    async fn submit(&mut self, text: String) {
        if !self.started {
            if text.trim().eq_ignore_ascii_case("yes") {
                self.start().await;
            } else {
                tracing::debug!("Ignoring input before the lesson started: {:?}", text);
            }
            return;
        }
        if self.phase.is_terminal() {
            tracing::debug!("Ignoring input after the lesson finished: {:?}", text);
            return;
        }
        let question = text.trim();
        if question.is_empty() {
            return;
        }

        self.queue.enqueue(question.to_string());
        tracing::info!(
            "Queued question {:?} ({} pending).",
            question,
            self.queue.len()
        );

        // During a slide clip the question waits for the clip to end.
        if self.phase != Phase::SlideVideo && !self.queue.is_draining() {
            self.begin_drain().await;
        }
        self.publish();
    }

    async fn play_slide(&mut self) {
        self.phase = Phase::SlideVideo;
        tracing::info!(
            "Playing slide {}/{}.",
            self.slide_index + 1,
            self.deck.slide_count()
        );
        let view = self.deck.slide_view(self.slide_index, self.transcript());
        self.slide_tx.send_if_modified(|current| {
            let changed = current.as_ref() != Some(&view);
            *current = Some(view);
            changed
        });

        let clip = self.deck.slide_clip(self.slide_index);
        let completion = show(self.video.as_ref(), &clip).await;
        self.pending = Some(Box::pin(async move {
            completion.ended().await;
            Wake::SlideEnded
        }));
        self.publish();
    }

    async fn on_slide_ended(&mut self) {
        let transcript = self.transcript().to_owned();
        self.context.push_slide(self.slide_index, &transcript);

        if self.queue.is_empty() {
            self.advance_or_finish().await;
        } else {
            self.begin_drain().await;
        }
    }

    async fn begin_drain(&mut self) {
        if self.queue.begin_drain() {
            self.next_question().await;
        }
    }

    /// One iteration of the drain loop: react to the head question, or leave
    /// the loop when the queue is empty.
    async fn next_question(&mut self) {
        if !self.queue.is_draining() {
            return;
        }
        let Some(question) = self.queue.peek().map(str::to_owned) else {
            self.queue.finish_drain();
            self.advance_or_finish().await;
            return;
        };

        tracing::info!("Reacting to question {:?}.", question);
        self.phase = Phase::ReactionVideo;
        let clip = self.reactions.pick();
        let completion = show(self.video.as_ref(), &clip).await;
        self.pending = Some(Box::pin(async move {
            completion.ended().await;
            Wake::ReactionEnded
        }));
        self.publish();
    }

    async fn on_reaction_ended(&mut self) {
        let Some(question) = self.queue.peek().map(str::to_owned) else {
            self.next_question().await;
            return;
        };

        self.phase = Phase::WaitingAudio;
        let filler = Clip::background_loop(self.deck.aux.no_sound_filler.as_str());
        let _ = show(self.video.as_ref(), &filler).await;

        let qna = Arc::clone(&self.qna);
        let context = self.context.render();
        self.pending = Some(Box::pin(async move {
            Wake::Answered(qna.ask(&context, &question).await)
        }));
        self.publish();
    }

    async fn on_answered(&mut self, result: Result<Answer, QnaError>) {
        let answer = match result {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(
                    "Answer service failed for {:?}: {}. Skipping the question.",
                    self.queue.peek().unwrap_or_default(),
                    e
                );
                self.queue.pop();
                self.next_question().await;
                return;
            }
        };

        tracing::info!(
            "Answer received ({} bytes of audio): {:?}",
            answer.audio.len(),
            answer.text
        );
        self.phase = Phase::PlayingAudio;
        let talking = Clip::background_loop(self.deck.aux.talking_loop.as_str());
        let _ = show(self.video.as_ref(), &talking).await;

        // Release the previous audio before creating the next one.
        self.audio.stop();
        let completion = match self.audio.play(answer.audio).await {
            Ok(completion) => completion,
            Err(e) => {
                tracing::error!("Failed to play answer audio: {:#}. Treating it as finished.", e);
                MediaCompletion::ready()
            }
        };
        let text = answer.text;
        self.pending = Some(Box::pin(async move {
            completion.ended().await;
            Wake::AudioEnded { answer: text }
        }));
        self.publish();
    }

    async fn on_audio_ended(&mut self, answer: String) {
        self.audio.stop();
        if let Some(question) = self.queue.pop() {
            self.context.push_answer(&question, &answer);
        }
        self.next_question().await;
    }

    async fn advance_or_finish(&mut self) {
        if self.slide_index + 1 < self.deck.slide_count() {
            self.slide_index += 1;
            self.play_slide().await;
        } else {
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.phase = Phase::Finished;
        self.pending = None;
        self.audio.stop();
        self.video.stop();
        tracing::info!("Lesson finished after slide {}.", self.slide_index + 1);
        self.publish();
    }

    fn transcript(&self) -> &str {
        self.transcripts
            .get(self.slide_index)
            .map(String::as_str)
            .unwrap_or("")
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

/// Starts `clip`. A clip that fails to start counts as already finished.
async fn show(video: &dyn VideoPlayer, clip: &Clip) -> MediaCompletion {
    match video.play(clip).await {
        Ok(completion) => completion,
        Err(e) => {
            tracing::error!("Failed to play {}: {:#}. Treating it as finished.", clip.src, e);
            MediaCompletion::ready()
        }
    }
}

async fn wait_pending(pending: &mut Option<PendingWake>) -> Wake {
    match pending {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

/// Cloneable front door to a spawned `Presentation`.
#[derive(Clone)]
pub struct PresentationHandle {
    inputs: mpsc::Sender<Input>,
    snapshots: watch::Receiver<PresentationSnapshot>,
    slides: watch::Receiver<Option<SlideView>>,
}

impl PresentationHandle {
    pub async fn send(&self, input: Input) -> Result<()> {
        self.inputs
            .send(input)
            .await
            .context("Presentation task is no longer running")
    }

    pub fn snapshot(&self) -> PresentationSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PresentationSnapshot> {
        self.snapshots.clone()
    }

    pub fn subscribe_slides(&self) -> watch::Receiver<Option<SlideView>> {
        self.slides.clone()
    }
}
