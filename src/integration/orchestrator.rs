//! Session orchestrator
//!
//! Connects the turn store, the remote chat service and both speech
//! controllers: input/voice -> optimistic turn -> remote round trip ->
//! commit or rollback -> spoken response.

use crate::integration::config::SessionConfig;
use crate::remote::ChatBackend;
use crate::speech::capture::{CaptureState, CaptureUpdate, SpeechRecognizer, VoiceCapture};
use crate::speech::playback::{
    PlaybackState, PlaybackUpdate, SpeakOutcome, SpeechSynthesizer, VoicePlayback,
};
use crate::turns::{Turn, TurnId, TurnStore};
use crate::{ChatterError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
struct SessionFlags {
    sending: bool,
    history_loading: bool,
    history_loaded: bool,
    error: Option<ChatterError>,
    draft: String,
}

/// Read-only view of the session for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub loading: bool,
    pub history_loaded: bool,
    pub error: Option<String>,
    pub draft: String,
    pub capture: CaptureState,
    pub playback: PlaybackState,
    pub voice_output_enabled: bool,
}

/// One signed-in conversation.
///
/// All methods take `&self`; locks are never held across an `.await`, so a
/// session can be shared behind an `Arc` between the UI loop and tasks
/// driving sends.
pub struct Session {
    config: SessionConfig,
    store: TurnStore,
    backend: Arc<dyn ChatBackend>,
    flags: Mutex<SessionFlags>,
    capture: Mutex<VoiceCapture>,
    playback: Mutex<VoicePlayback>,
}

impl Session {
    /// Create a session with the given configuration and collaborators
    pub fn new(
        config: SessionConfig,
        backend: Arc<dyn ChatBackend>,
        recognizer: Option<Box<dyn SpeechRecognizer>>,
        synthesizer: Option<Box<dyn SpeechSynthesizer>>,
    ) -> Result<Self> {
        config.validate()?;

        let recognizer = recognizer.filter(|_| config.enable_voice_input);
        let synthesizer = synthesizer.filter(|_| config.enable_voice_output);

        let capture = VoiceCapture::new(config.capture.clone(), recognizer);
        let playback = VoicePlayback::new(config.playback.clone(), synthesizer);

        Ok(Self {
            store: TurnStore::with_prefix(config.temp_id_prefix.clone()),
            config,
            backend,
            flags: Mutex::new(SessionFlags::default()),
            capture: Mutex::new(capture),
            playback: Mutex::new(playback),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Fetch earlier turns. Allowed once per session, even if it fails.
    ///
    /// With voice output on, the latest complete turn is read out once the
    /// history lands, unless it was spoken before.
    pub async fn load_history(&self) -> Result<()> {
        {
            let mut flags = self.flags.lock();
            if flags.history_loaded || flags.history_loading {
                return Err(ChatterError::Conflict(
                    "chat history was already requested".to_string(),
                ));
            }
            if flags.sending {
                return Err(ChatterError::Conflict(
                    "cannot load history while a message is being sent".to_string(),
                ));
            }
            flags.history_loading = true;
            flags.error = None;
        }

        let guard = HistoryGuard { session: self };
        info!("Loading chat history");

        let result = match self.backend.get_history().await {
            Ok(page) => self.store.replace_all(page.into_turns()),
            Err(e) => Err(e),
        };
        drop(guard);

        match &result {
            Ok(()) => {
                if let Some(latest) = self.store.latest_complete() {
                    self.speak_turn(&latest);
                }
            }
            Err(e) => {
                warn!("Failed to load chat history: {}", e);
                self.flags.lock().error = Some(e.clone());
            }
        }
        result
    }

    /// Send `text` as a new turn
    pub async fn submit(&self, text: &str) -> Result<Turn> {
        self.send(text, false).await
    }

    /// Send the current draft, clearing it once the turn is accepted
    pub async fn submit_draft(&self) -> Result<Turn> {
        let draft = self.flags.lock().draft.clone();
        self.send(&draft, true).await
    }

    async fn send(&self, text: &str, from_draft: bool) -> Result<Turn> {
        let query = text.trim();
        if query.is_empty() {
            return Err(ChatterError::EmptyInput);
        }

        let turn = {
            let mut flags = self.flags.lock();
            if flags.sending {
                return Err(ChatterError::Conflict(
                    "a message is already being sent".to_string(),
                ));
            }
            if flags.history_loading {
                return Err(ChatterError::Conflict(
                    "chat history is still loading".to_string(),
                ));
            }

            let turn = self.store.append_optimistic(query)?;
            flags.sending = true;
            flags.error = None;
            if from_draft {
                flags.draft.clear();
            }
            turn
        };

        let mut guard = SendGuard {
            session: self,
            rollback: Some(turn.id.clone()),
        };
        debug!("Sending turn {}", turn.id);

        match self.backend.send_message(query).await {
            Ok(reply) => {
                let committed =
                    self.store
                        .commit(&turn.id, reply.response, TurnId::from(reply.chat_id));
                guard.disarm();
                drop(guard);

                let committed = committed.map_err(|e| {
                    error!("Could not commit turn {}: {}", turn.id, e);
                    e
                })?;

                info!("Turn {} completed", committed.id);
                if committed.is_complete() {
                    self.speak_turn(&committed);
                }
                Ok(committed)
            }
            Err(e) => {
                drop(guard);
                warn!("Failed to send message: {}", e);
                self.flags.lock().error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Start listening, or ask the recognizer to finish if already listening.
    ///
    /// Starting is refused while a send or history load is outstanding.
    pub fn toggle_voice_input(&self) -> Result<CaptureState> {
        let result = {
            let mut capture = self.capture.lock();
            if capture.is_listening() {
                capture.stop();
                return Ok(capture.state());
            }
            if self.is_loading() {
                return Err(ChatterError::Conflict(
                    "voice input is unavailable while a request is in flight".to_string(),
                ));
            }
            self.flags.lock().error = None;
            capture.start().map(|()| capture.state())
        };

        if let Err(e) = &result {
            warn!("Could not start voice input: {}", e);
            self.flags.lock().error = Some(e.clone());
        }
        result
    }

    /// Flip the spoken-response policy. Returns whether responses are now spoken.
    ///
    /// Enabling re-arms a denied synthesizer and reads out the latest
    /// complete turn if it has not been spoken yet.
    pub fn toggle_voice_output(&self) -> bool {
        self.flags.lock().error = None;

        let latest = self.store.latest_complete();
        let mut playback = self.playback.lock();

        if playback.is_enabled() {
            playback.set_enabled(false);
            return false;
        }

        playback.rearm();
        playback.set_enabled(true);

        if let Some(turn) = latest {
            match playback.speak(&turn.id, &turn.response) {
                Ok(outcome) => debug!("Speak on enable for turn {}: {:?}", turn.id, outcome),
                Err(e) => warn!("Could not speak turn {}: {}", turn.id, e),
            }
        }
        playback.is_enabled()
    }

    /// Apply pending platform callbacks from both speech controllers
    pub fn poll_events(&self) {
        let capture_updates = self.capture.lock().poll_events();
        for update in capture_updates {
            match update {
                CaptureUpdate::Transcript(text) => {
                    self.flags.lock().draft = text;
                }
                CaptureUpdate::Ended { transcript } => {
                    debug!("Voice input finished: {} chars", transcript.len());
                }
                CaptureUpdate::Failed(e) => {
                    self.flags.lock().error = Some(e);
                }
            }
        }

        let playback_updates = self.playback.lock().poll_events();
        for update in playback_updates {
            match update {
                PlaybackUpdate::Finished(turn_id) => {
                    debug!("Turn {} was spoken", turn_id);
                }
                PlaybackUpdate::PermissionDenied => {
                    info!("Voice responses turned off after permission denial");
                }
                PlaybackUpdate::Failed(e) => {
                    warn!("Voice playback failed: {}", e);
                }
            }
        }
    }

    /// Cancel platform work and drop every turn; used when the session ends
    pub fn shutdown(&self) {
        self.capture.lock().abort();
        self.playback.lock().shutdown();
        self.store.clear();
        info!("Session shut down");
    }

    fn speak_turn(&self, turn: &Turn) {
        let mut playback = self.playback.lock();
        if !playback.is_enabled() {
            return;
        }
        match playback.speak(&turn.id, &turn.response) {
            Ok(SpeakOutcome::Denied) => {
                info!("Voice responses turned off after permission denial");
            }
            Ok(outcome) => debug!("Speak turn {}: {:?}", turn.id, outcome),
            Err(e) => warn!("Could not speak turn {}: {}", turn.id, e),
        }
    }

    /// Sorted copy of the turn log
    pub fn snapshot(&self) -> Vec<Turn> {
        self.store.snapshot()
    }

    pub fn status(&self) -> SessionStatus {
        let (loading, history_loaded, error, draft) = {
            let flags = self.flags.lock();
            (
                flags.sending || flags.history_loading,
                flags.history_loaded,
                flags.error.as_ref().map(ChatterError::user_message),
                flags.draft.clone(),
            )
        };
        let capture = self.capture.lock().state();
        let (playback, voice_output_enabled) = {
            let playback = self.playback.lock();
            (playback.state(), playback.is_enabled())
        };

        SessionStatus {
            loading,
            history_loaded,
            error,
            draft,
            capture,
            playback,
            voice_output_enabled,
        }
    }

    pub fn is_loading(&self) -> bool {
        let flags = self.flags.lock();
        flags.sending || flags.history_loading
    }

    pub fn history_loaded(&self) -> bool {
        self.flags.lock().history_loaded
    }

    pub fn error(&self) -> Option<ChatterError> {
        self.flags.lock().error.clone()
    }

    pub fn clear_error(&self) {
        self.flags.lock().error = None;
    }

    pub fn draft(&self) -> String {
        self.flags.lock().draft.clone()
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        self.flags.lock().draft = text.into();
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture.lock().state()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback.lock().state()
    }

    pub fn voice_output_enabled(&self) -> bool {
        self.playback.lock().is_enabled()
    }

    /// Turn whose response is being read aloud
    pub fn speaking_turn(&self) -> Option<TurnId> {
        self.playback.lock().active_turn().cloned()
    }

    pub fn is_spoken(&self, turn_id: &TurnId) -> bool {
        self.playback.lock().is_spoken(turn_id)
    }
}

/// Releases the busy flag of a send; rolls back the optimistic turn unless disarmed
struct SendGuard<'a> {
    session: &'a Session,
    rollback: Option<TurnId>,
}

impl SendGuard<'_> {
    fn disarm(&mut self) {
        self.rollback = None;
    }
}

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        if let Some(temp_id) = self.rollback.take() {
            if self.session.store.rollback(&temp_id) {
                debug!("Removed optimistic turn {}", temp_id);
            }
        }
        self.session.flags.lock().sending = false;
    }
}

/// Marks history as loaded whatever the fetch outcome
struct HistoryGuard<'a> {
    session: &'a Session,
}

impl Drop for HistoryGuard<'_> {
    fn drop(&mut self) {
        let mut flags = self.session.flags.lock();
        flags.history_loading = false;
        flags.history_loaded = true;
    }
}

/// Builder for creating a session
pub struct SessionBuilder {
    config: SessionConfig,
    backend: Arc<dyn ChatBackend>,
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    synthesizer: Option<Box<dyn SpeechSynthesizer>>,
}

impl SessionBuilder {
    /// Create a new builder with default configuration
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            config: SessionConfig::default(),
            backend,
            recognizer: None,
            synthesizer: None,
        }
    }

    /// Set the complete configuration
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach the platform speech recognizer
    pub fn with_recognizer(mut self, recognizer: impl SpeechRecognizer + 'static) -> Self {
        self.recognizer = Some(Box::new(recognizer));
        self
    }

    /// Attach the platform speech synthesizer
    pub fn with_synthesizer(mut self, synthesizer: impl SpeechSynthesizer + 'static) -> Self {
        self.synthesizer = Some(Box::new(synthesizer));
        self
    }

    /// Build the session
    pub fn build(self) -> Result<Session> {
        Session::new(self.config, self.backend, self.recognizer, self.synthesizer)
    }
}
