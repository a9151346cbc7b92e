mod console;

use anyhow::{Context, Result};
use chatter::integration::{Session, SessionBuilder, SessionConfig, SessionHost, UserIdentity};
use console::{ConsoleSynthesizer, LoopbackAssistant};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatter=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => SessionConfig::default(),
    };

    info!("Starting Chatter console");

    let assistant = Arc::new(LoopbackAssistant::new());
    let mut host = SessionHost::new(move |_: &UserIdentity| {
        SessionBuilder::new(assistant.clone())
            .with_config(config.clone())
            .with_synthesizer(ConsoleSynthesizer)
            .build()
    });

    let user = std::env::var("USER").unwrap_or_else(|_| "local".to_string());
    let session = host.sign_in(UserIdentity::new(user.clone(), user)).await?;

    println!("Type a message, or /voice, /mic, /history, /quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        session.poll_events();

        match line.trim() {
            "/quit" => break,
            "/voice" => {
                let on = session.toggle_voice_output();
                println!("Voice responses {}", if on { "enabled" } else { "disabled" });
            }
            "/mic" => match session.toggle_voice_input() {
                Ok(state) => println!("Voice input: {:?}", state),
                Err(e) => println!("! {}", e.user_message()),
            },
            "/history" => print_turns(&session),
            "" => {}
            text => match session.submit(text).await {
                Ok(turn) => println!("assistant: {}", turn.response),
                Err(e) => println!("! {}", e.user_message()),
            },
        }

        session.poll_events();
    }

    host.sign_out();
    Ok(())
}

fn print_turns(session: &Session) {
    for turn in session.snapshot() {
        let marker = if session.is_spoken(&turn.id) { " (spoken)" } else { "" };
        println!(
            "[{}] you: {}\n        assistant: {}{}",
            turn.created_at.format("%H:%M"),
            turn.query,
            turn.response,
            marker
        );
    }
}
