use anyhow::{Context, Result};
use clap::Parser;
use lecture_api::bridge::{MediaBridge, OUTBOUND_CAPACITY, RendererAudio, RendererVideo};
use lecture_api::config::Config;
use lecture_api::server::{AppState, router};
use lecture_core::Presentation;
use lecture_core::assets::SlideDeck;
use lecture_core::context::LessonContext;
use lecture_core::qna::SpeechClient;
use lecture_core::reaction::ReactionPicker;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
struct Cli {
    /// Directory holding the numbered slide folders (overrides ASSETS_DIR)
    #[arg(long)]
    assets_dir: Option<PathBuf>,
    /// Number of slides in the deck (overrides SLIDE_COUNT)
    #[arg(long)]
    slides: Option<usize>,
    /// Address to listen on (overrides BIND_ADDRESS)
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let cli = Cli::parse();
    let mut config = Config::from_env().context("Failed to load application configuration")?;
    if let Some(assets_dir) = cli.assets_dir {
        config.assets_dir = assets_dir;
    }
    if let Some(slides) = cli.slides {
        config.slide_count = slides;
    }
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!("Configuration loaded successfully. Starting lecture service...");

    // --- 3. Load Slide Deck ---
    let deck = SlideDeck::new(&config.assets_dir, config.slide_count)
        .with_clip_prefix(config.clip_prefix.clone())
        .with_aux_clips(config.aux_clips.clone());
    let transcripts = deck.load_transcripts().await;
    let loaded = transcripts.iter().filter(|t| !t.is_empty()).count();
    tracing::info!(
        "Loaded {}/{} slide transcripts from {}.",
        loaded,
        deck.slide_count(),
        deck.root().display()
    );

    // --- 4. Initialize Collaborators ---
    let qna = SpeechClient::new(&config.qna_base_url, config.qna_timeout)
        .context("Failed to build answer service client")?;
    tracing::info!("Answer service endpoint: {}", qna.endpoint());

    let bridge = MediaBridge::new(OUTBOUND_CAPACITY);
    let reactions = match config.reaction_seed {
        Some(seed) => ReactionPicker::seeded(
            deck.aux.reactions.clone(),
            deck.aux.no_sound_filler.clone(),
            seed,
        ),
        None => ReactionPicker::new(
            deck.aux.reactions.clone(),
            deck.aux.no_sound_filler.clone(),
        ),
    };

    // --- 5. Start the Presentation ---
    let presentation = Presentation::new(
        deck,
        transcripts,
        Arc::new(RendererVideo::new(bridge.clone())),
        Arc::new(RendererAudio::new(bridge.clone())),
        Arc::new(qna),
    )
    .with_context(LessonContext::new(config.system_prompt.clone()))
    .with_reactions(reactions);
    let (handle, presentation_task) = presentation.spawn();

    // --- 6. Serve ---
    let state = AppState {
        handle,
        bridge,
        greeting: config.greeting.clone(),
    };
    let app = router(state, &config.assets_dir);
    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    tracing::info!("Lecture server listening on {}", config.bind_address);

    axum::serve(listener, app).await?;

    presentation_task.abort();
    Ok(())
}
