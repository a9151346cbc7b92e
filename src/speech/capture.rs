//! Voice capture controller
//!
//! Wraps an optional platform speech-to-text capability as a two-state
//! machine. Transcripts arrive through [`CaptureEvent`]s that carry the
//! cumulative text of the current utterance.

use crate::utils::EventChannel;
use crate::{ChatterError, Result};
use crossbeam_channel::Sender;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Configuration for speech recognition
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// BCP-47 language tag handed to the recognizer
    pub language: String,

    /// Whether the recognizer should report interim (non-final) results
    pub interim_results: bool,

    /// Whether the recognizer keeps listening after an utterance ends
    pub continuous: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            interim_results: true,
            continuous: false,
        }
    }
}

impl CaptureConfig {
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

/// Parameters for one capture cycle
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureRequest {
    /// Tag that every event of this cycle must carry
    pub utterance: Uuid,
    pub language: String,
    pub interim_results: bool,
    pub continuous: bool,
}

/// Callback from the platform recognizer
#[derive(Clone, Debug, PartialEq)]
pub enum CaptureEvent {
    /// Best-effort transcript so far; supersedes earlier ones
    Transcript { utterance: Uuid, text: String },

    /// The platform finished the utterance (naturally or after `stop`)
    Ended { utterance: Uuid },

    /// The platform reported an error; capture is over
    Error { utterance: Uuid, message: String },
}

impl CaptureEvent {
    fn utterance(&self) -> Uuid {
        match self {
            CaptureEvent::Transcript { utterance, .. }
            | CaptureEvent::Ended { utterance }
            | CaptureEvent::Error { utterance, .. } => *utterance,
        }
    }
}

/// Platform speech-to-text capability.
///
/// Implementations report back through `events`; they should not block the
/// caller.
pub trait SpeechRecognizer: Send {
    /// Begin capturing one utterance
    fn start(&mut self, request: CaptureRequest, events: Sender<CaptureEvent>) -> Result<()>;

    /// Ask the platform to finalize the current utterance
    fn stop(&mut self);

    /// Drop the current utterance without waiting for a final result
    fn abort(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Listening,
}

/// What a processed event means for the session
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureUpdate {
    Transcript(String),
    Ended { transcript: String },
    Failed(ChatterError),
}

pub struct VoiceCapture {
    config: CaptureConfig,
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    state: CaptureState,
    active: Option<Uuid>,
    stop_requested: bool,
    transcript: String,
    events: EventChannel<CaptureEvent>,
}

impl VoiceCapture {
    pub fn new(config: CaptureConfig, recognizer: Option<Box<dyn SpeechRecognizer>>) -> Self {
        if recognizer.is_none() {
            info!("No speech recognizer available; voice input disabled");
        }

        Self {
            config,
            recognizer,
            state: CaptureState::Idle,
            active: None,
            stop_requested: false,
            transcript: String::new(),
            events: EventChannel::default(),
        }
    }

    /// Controller for a platform without speech recognition
    pub fn unsupported() -> Self {
        Self::new(CaptureConfig::default(), None)
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == CaptureState::Listening
    }

    pub fn is_supported(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Latest transcript of the current (or last) utterance
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn start(&mut self) -> Result<()> {
        let recognizer = self.recognizer.as_mut().ok_or_else(|| {
            ChatterError::Unsupported("speech recognition is not available".to_string())
        })?;

        if self.state == CaptureState::Listening {
            return Err(ChatterError::AlreadyActive);
        }

        // Anything still queued belongs to an earlier cycle
        self.events.clear();

        let utterance = Uuid::new_v4();
        let request = CaptureRequest {
            utterance,
            language: self.config.language.clone(),
            interim_results: self.config.interim_results,
            continuous: self.config.continuous,
        };

        recognizer.start(request, self.events.sender())?;

        self.state = CaptureState::Listening;
        self.active = Some(utterance);
        self.stop_requested = false;
        self.transcript.clear();

        info!("Voice capture started ({})", utterance);
        Ok(())
    }

    /// Request finalization. Stays `Listening` until the platform confirms.
    ///
    /// A second stop before that confirmation gives up on the platform and
    /// returns to `Idle` at once.
    pub fn stop(&mut self) {
        if self.state == CaptureState::Idle {
            return;
        }
        if self.stop_requested {
            warn!("Speech recognizer did not confirm stop; forcing idle");
            self.abort();
            return;
        }

        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.stop();
        }
        self.stop_requested = true;
        debug!("Voice capture stop requested");
    }

    /// Tear down immediately; used when the session ends
    pub fn abort(&mut self) {
        if self.state == CaptureState::Listening {
            if let Some(recognizer) = self.recognizer.as_mut() {
                recognizer.abort();
            }
            info!("Voice capture aborted");
        }
        self.reset();
        self.events.clear();
    }

    /// Apply all queued platform events, in order
    pub fn poll_events(&mut self) -> Vec<CaptureUpdate> {
        self.events
            .drain()
            .into_iter()
            .filter_map(|event| self.handle_event(event))
            .collect()
    }

    pub fn handle_event(&mut self, event: CaptureEvent) -> Option<CaptureUpdate> {
        if self.active != Some(event.utterance()) {
            debug!("Ignoring capture event for stale utterance {}", event.utterance());
            return None;
        }

        match event {
            CaptureEvent::Transcript { text, .. } => {
                self.transcript = text.clone();
                Some(CaptureUpdate::Transcript(text))
            }
            CaptureEvent::Ended { .. } => {
                info!("Voice capture ended");
                self.reset();
                Some(CaptureUpdate::Ended {
                    transcript: self.transcript.clone(),
                })
            }
            CaptureEvent::Error { message, .. } => {
                warn!("Speech recognition error: {}", message);
                self.reset();
                Some(CaptureUpdate::Failed(ChatterError::Capture(message)))
            }
        }
    }

    fn reset(&mut self) {
        self.state = CaptureState::Idle;
        self.active = None;
        self.stop_requested = false;
    }
}

impl Drop for VoiceCapture {
    fn drop(&mut self) {
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct Calls {
        starts: Vec<CaptureRequest>,
        stops: usize,
        aborts: usize,
        events: Option<Sender<CaptureEvent>>,
    }

    #[derive(Clone, Default)]
    struct FakeRecognizer {
        calls: Arc<Mutex<Calls>>,
        refuse: bool,
    }

    impl SpeechRecognizer for FakeRecognizer {
        fn start(&mut self, request: CaptureRequest, events: Sender<CaptureEvent>) -> Result<()> {
            if self.refuse {
                return Err(ChatterError::Capture("microphone busy".into()));
            }
            let mut calls = self.calls.lock();
            calls.starts.push(request);
            calls.events = Some(events);
            Ok(())
        }

        fn stop(&mut self) {
            self.calls.lock().stops += 1;
        }

        fn abort(&mut self) {
            self.calls.lock().aborts += 1;
        }
    }

    fn emit(fake: &FakeRecognizer, event: CaptureEvent) {
        let calls = fake.calls.lock();
        calls.events.as_ref().unwrap().send(event).unwrap();
    }

    fn started(fake: &FakeRecognizer) -> Uuid {
        fake.calls.lock().starts.last().unwrap().utterance
    }

    #[test]
    fn test_start_without_capability() {
        let mut capture = VoiceCapture::unsupported();
        let err = capture.start().unwrap_err();
        assert!(matches!(err, ChatterError::Unsupported(_)));
        assert_eq!(capture.state(), CaptureState::Idle);
    }

    #[test]
    fn test_start_twice_is_already_active() {
        let fake = FakeRecognizer::default();
        let mut capture = VoiceCapture::new(CaptureConfig::default(), Some(Box::new(fake)));
        capture.start().unwrap();
        assert_eq!(capture.start().unwrap_err(), ChatterError::AlreadyActive);
        assert!(capture.is_listening());
    }

    #[test]
    fn test_request_carries_config() {
        let fake = FakeRecognizer::default();
        let config = CaptureConfig::default().with_language("de-DE");
        let mut capture = VoiceCapture::new(config, Some(Box::new(fake.clone())));
        capture.start().unwrap();

        let calls = fake.calls.lock();
        assert_eq!(calls.starts[0].language, "de-DE");
        assert!(calls.starts[0].interim_results);
        assert!(!calls.starts[0].continuous);
    }

    #[test]
    fn test_refused_start_stays_idle() {
        let fake = FakeRecognizer {
            refuse: true,
            ..Default::default()
        };
        let mut capture = VoiceCapture::new(CaptureConfig::default(), Some(Box::new(fake)));
        assert!(matches!(capture.start(), Err(ChatterError::Capture(_))));
        assert_eq!(capture.state(), CaptureState::Idle);
    }

    #[test]
    fn test_cumulative_transcripts_then_end() {
        let fake = FakeRecognizer::default();
        let mut capture = VoiceCapture::new(CaptureConfig::default(), Some(Box::new(fake.clone())));
        capture.start().unwrap();
        let id = started(&fake);

        emit(&fake, CaptureEvent::Transcript { utterance: id, text: "what".into() });
        emit(&fake, CaptureEvent::Transcript { utterance: id, text: "what time".into() });
        emit(&fake, CaptureEvent::Ended { utterance: id });

        let updates = capture.poll_events();
        assert_eq!(
            updates,
            vec![
                CaptureUpdate::Transcript("what".into()),
                CaptureUpdate::Transcript("what time".into()),
                CaptureUpdate::Ended { transcript: "what time".into() },
            ]
        );
        assert_eq!(capture.state(), CaptureState::Idle);
    }

    #[test]
    fn test_stop_waits_for_platform() {
        let fake = FakeRecognizer::default();
        let mut capture = VoiceCapture::new(CaptureConfig::default(), Some(Box::new(fake.clone())));
        capture.start().unwrap();
        let id = started(&fake);

        capture.stop();
        assert!(capture.is_listening());
        assert_eq!(fake.calls.lock().stops, 1);

        emit(&fake, CaptureEvent::Ended { utterance: id });
        capture.poll_events();
        assert_eq!(capture.state(), CaptureState::Idle);
    }

    #[test]
    fn test_second_stop_without_confirmation_forces_idle() {
        let fake = FakeRecognizer::default();
        let mut capture = VoiceCapture::new(CaptureConfig::default(), Some(Box::new(fake.clone())));
        capture.start().unwrap();
        let id = started(&fake);

        capture.stop();
        capture.stop();
        assert_eq!(capture.state(), CaptureState::Idle);
        assert_eq!(fake.calls.lock().stops, 1);
        assert_eq!(fake.calls.lock().aborts, 1);

        // A confirmation arriving afterwards belongs to the abandoned cycle
        emit(&fake, CaptureEvent::Ended { utterance: id });
        assert!(capture.poll_events().is_empty());

        capture.start().unwrap();
        assert!(capture.is_listening());
    }

    #[test]
    fn test_long_utterance_still_delivers_end() {
        let fake = FakeRecognizer::default();
        let mut capture = VoiceCapture::new(CaptureConfig::default(), Some(Box::new(fake.clone())));
        capture.start().unwrap();
        let id = started(&fake);

        {
            let calls = fake.calls.lock();
            let events = calls.events.as_ref().unwrap();
            for i in 0..200 {
                events
                    .try_send(CaptureEvent::Transcript { utterance: id, text: format!("word {}", i) })
                    .unwrap();
            }
            events.try_send(CaptureEvent::Ended { utterance: id }).unwrap();
        }

        let updates = capture.poll_events();
        assert_eq!(updates.len(), 201);
        assert_eq!(
            updates.last(),
            Some(&CaptureUpdate::Ended { transcript: "word 199".into() })
        );
        assert_eq!(capture.state(), CaptureState::Idle);
        assert!(capture.start().is_ok());
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let fake = FakeRecognizer::default();
        let mut capture = VoiceCapture::new(CaptureConfig::default(), Some(Box::new(fake.clone())));
        capture.stop();
        assert_eq!(fake.calls.lock().stops, 0);
        assert_eq!(capture.state(), CaptureState::Idle);
    }

    #[test]
    fn test_platform_error_returns_to_idle() {
        let fake = FakeRecognizer::default();
        let mut capture = VoiceCapture::new(CaptureConfig::default(), Some(Box::new(fake.clone())));
        capture.start().unwrap();
        let id = started(&fake);

        emit(&fake, CaptureEvent::Error { utterance: id, message: "no-speech".into() });
        let updates = capture.poll_events();

        assert_eq!(
            updates,
            vec![CaptureUpdate::Failed(ChatterError::Capture("no-speech".into()))]
        );
        assert_eq!(capture.state(), CaptureState::Idle);
    }

    #[test]
    fn test_events_from_previous_cycle_are_ignored() {
        let fake = FakeRecognizer::default();
        let mut capture = VoiceCapture::new(CaptureConfig::default(), Some(Box::new(fake.clone())));
        capture.start().unwrap();
        let first = started(&fake);
        emit(&fake, CaptureEvent::Ended { utterance: first });
        capture.poll_events();

        capture.start().unwrap();
        let second = started(&fake);
        assert_ne!(first, second);

        let late = capture.handle_event(CaptureEvent::Transcript {
            utterance: first,
            text: "old".into(),
        });
        assert!(late.is_none());
        assert!(capture.is_listening());
        assert_eq!(capture.transcript(), "");
    }

    #[test]
    fn test_abort_resets_state() {
        let fake = FakeRecognizer::default();
        let mut capture = VoiceCapture::new(CaptureConfig::default(), Some(Box::new(fake.clone())));
        capture.start().unwrap();
        capture.abort();

        assert_eq!(capture.state(), CaptureState::Idle);
        assert_eq!(fake.calls.lock().aborts, 1);
    }
}
