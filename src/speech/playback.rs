//! Voice playback controller
//!
//! Speaks assistant responses through an optional platform text-to-speech
//! capability. A newer request always preempts the current one, and a turn is
//! recorded as spoken only after the platform reports a full, successful read.

use crate::turns::TurnId;
use crate::utils::EventChannel;
use crate::{ChatterError, Result};
use crossbeam_channel::Sender;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Configuration for spoken responses
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Whether responses are read aloud when a session starts
    pub enabled: bool,

    /// BCP-47 language tag of the voice
    pub language: String,

    /// Speech rate (1.0 = normal)
    pub rate: f32,

    /// Voice pitch (1.0 = normal)
    pub pitch: f32,

    /// Output volume (0.0 to 1.0)
    pub volume: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            language: "en-US".to_string(),
            rate: 0.9,
            pitch: 1.0,
            volume: 0.8,
        }
    }
}

impl PlaybackConfig {
    pub fn muted(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }
}

/// One request to the synthesizer
#[derive(Clone, Debug, PartialEq)]
pub struct Utterance {
    /// Tag that every event about this utterance must carry
    pub id: Uuid,
    pub turn_id: TurnId,
    pub text: String,
    pub language: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

/// Why the platform could not finish an utterance
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SynthesisFailure {
    /// The platform refused to speak (e.g. no user gesture yet)
    NotAllowed,
    /// The utterance was cut short by a cancel
    Interrupted,
    Other(String),
}

/// Callback from the platform synthesizer
#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackEvent {
    Started { utterance: Uuid },
    Finished { utterance: Uuid },
    Failed { utterance: Uuid, failure: SynthesisFailure },
}

impl PlaybackEvent {
    fn utterance(&self) -> Uuid {
        match self {
            PlaybackEvent::Started { utterance }
            | PlaybackEvent::Finished { utterance }
            | PlaybackEvent::Failed { utterance, .. } => *utterance,
        }
    }
}

/// Platform text-to-speech capability
pub trait SpeechSynthesizer: Send {
    /// Queue `utterance` for speaking; completion is reported through `events`
    fn speak(
        &mut self,
        utterance: Utterance,
        events: Sender<PlaybackEvent>,
    ) -> std::result::Result<(), SynthesisFailure>;

    /// Stop whatever is being spoken
    fn cancel(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Speaking,
    /// Sticky until [`VoicePlayback::rearm`]
    PermissionDenied,
}

/// Result of a [`VoicePlayback::speak`] request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakOutcome {
    Started,
    /// The same turn is already being spoken
    InProgress,
    AlreadySpoken,
    Disabled,
    Denied,
    Unavailable,
}

/// What a processed event means for the session
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackUpdate {
    Finished(TurnId),
    PermissionDenied,
    Failed(ChatterError),
}

#[derive(Debug, Clone)]
struct ActiveUtterance {
    id: Uuid,
    turn_id: TurnId,
}

pub struct VoicePlayback {
    config: PlaybackConfig,
    synthesizer: Option<Box<dyn SpeechSynthesizer>>,
    state: PlaybackState,
    enabled: bool,
    current: Option<ActiveUtterance>,
    spoken: HashSet<TurnId>,
    events: EventChannel<PlaybackEvent>,
}

impl VoicePlayback {
    pub fn new(config: PlaybackConfig, synthesizer: Option<Box<dyn SpeechSynthesizer>>) -> Self {
        if synthesizer.is_none() {
            info!("No speech synthesizer available; responses are text only");
        }

        Self {
            enabled: config.enabled,
            config,
            synthesizer,
            state: PlaybackState::Idle,
            current: None,
            spoken: HashSet::new(),
            events: EventChannel::default(),
        }
    }

    /// Controller for a platform without speech synthesis
    pub fn unavailable() -> Self {
        Self::new(PlaybackConfig::default(), None)
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_available(&self) -> bool {
        self.synthesizer.is_some()
    }

    /// Turn currently being spoken
    pub fn active_turn(&self) -> Option<&TurnId> {
        self.current.as_ref().map(|c| &c.turn_id)
    }

    pub fn is_spoken(&self, turn_id: &TurnId) -> bool {
        self.spoken.contains(turn_id)
    }

    pub fn spoken_count(&self) -> usize {
        self.spoken.len()
    }

    /// Speak `text` for `turn_id`, preempting anything in flight
    pub fn speak(&mut self, turn_id: &TurnId, text: &str) -> Result<SpeakOutcome> {
        if self.synthesizer.is_none() {
            return Ok(SpeakOutcome::Unavailable);
        }
        if self.state == PlaybackState::PermissionDenied {
            return Ok(SpeakOutcome::Denied);
        }
        if !self.enabled {
            return Ok(SpeakOutcome::Disabled);
        }
        if self.spoken.contains(turn_id) {
            return Ok(SpeakOutcome::AlreadySpoken);
        }
        if self.active_turn() == Some(turn_id) {
            return Ok(SpeakOutcome::InProgress);
        }

        if let Some(previous) = self.current.take() {
            debug!("Preempting speech for turn {}", previous.turn_id);
            self.interrupt();
        }

        let utterance = Utterance {
            id: Uuid::new_v4(),
            turn_id: turn_id.clone(),
            text: text.to_string(),
            language: self.config.language.clone(),
            rate: self.config.rate,
            pitch: self.config.pitch,
            volume: self.config.volume,
        };
        let id = utterance.id;
        let events = self.events.sender();

        let Some(synthesizer) = self.synthesizer.as_mut() else {
            return Ok(SpeakOutcome::Unavailable);
        };

        match synthesizer.speak(utterance, events) {
            Ok(()) => {
                self.state = PlaybackState::Speaking;
                self.current = Some(ActiveUtterance {
                    id,
                    turn_id: turn_id.clone(),
                });
                info!("Speaking response for turn {}", turn_id);
                Ok(SpeakOutcome::Started)
            }
            Err(SynthesisFailure::NotAllowed) => {
                self.deny();
                Ok(SpeakOutcome::Denied)
            }
            Err(failure) => {
                self.state = PlaybackState::Idle;
                warn!("Speech synthesis failed to start: {:?}", failure);
                Err(ChatterError::Playback(format!("{:?}", failure)))
            }
        }
    }

    /// Stop speaking. The interrupted turn stays eligible for a later attempt.
    pub fn cancel(&mut self) {
        if self.state != PlaybackState::Speaking {
            return;
        }
        if let Some(current) = self.current.take() {
            debug!("Cancelled speech for turn {}", current.turn_id);
        }
        self.interrupt();
    }

    /// Turn the caller's playback policy on or off
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.cancel();
        }
        self.enabled = enabled;
        info!(
            "Voice responses {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    /// Leave `PermissionDenied` so the next `speak` may try again
    pub fn rearm(&mut self) {
        if self.state == PlaybackState::PermissionDenied {
            self.state = PlaybackState::Idle;
            info!("Voice playback re-armed after permission denial");
        }
    }

    /// Cancel everything and drop queued callbacks; used when the session ends
    pub fn shutdown(&mut self) {
        self.cancel();
        self.events.clear();
    }

    /// Apply all queued platform events, in order
    pub fn poll_events(&mut self) -> Vec<PlaybackUpdate> {
        self.events
            .drain()
            .into_iter()
            .filter_map(|event| self.handle_event(event))
            .collect()
    }

    pub fn handle_event(&mut self, event: PlaybackEvent) -> Option<PlaybackUpdate> {
        let current = match &self.current {
            Some(current) if current.id == event.utterance() => current.clone(),
            _ => {
                debug!("Ignoring playback event for stale utterance {}", event.utterance());
                return None;
            }
        };

        match event {
            PlaybackEvent::Started { .. } => {
                debug!("Speech started for turn {}", current.turn_id);
                None
            }
            PlaybackEvent::Finished { .. } => {
                debug!("Speech finished for turn {}", current.turn_id);
                self.spoken.insert(current.turn_id.clone());
                self.current = None;
                self.state = PlaybackState::Idle;
                Some(PlaybackUpdate::Finished(current.turn_id))
            }
            PlaybackEvent::Failed { failure, .. } => match failure {
                SynthesisFailure::NotAllowed => {
                    self.deny();
                    Some(PlaybackUpdate::PermissionDenied)
                }
                SynthesisFailure::Interrupted => {
                    self.current = None;
                    self.state = PlaybackState::Idle;
                    None
                }
                SynthesisFailure::Other(message) => {
                    warn!("Speech synthesis error: {}", message);
                    self.current = None;
                    self.state = PlaybackState::Idle;
                    Some(PlaybackUpdate::Failed(ChatterError::Playback(message)))
                }
            },
        }
    }

    fn interrupt(&mut self) {
        if let Some(synthesizer) = self.synthesizer.as_mut() {
            synthesizer.cancel();
        }
        self.state = PlaybackState::Idle;
    }

    fn deny(&mut self) {
        warn!("Speech synthesis not allowed by the platform; switching to text-only responses");
        self.current = None;
        self.state = PlaybackState::PermissionDenied;
        self.enabled = false;
    }

    #[cfg(test)]
    pub(crate) fn reset_spoken(&mut self) {
        self.spoken.clear();
    }
}

impl Drop for VoicePlayback {
    fn drop(&mut self) {
        self.shutdown();
    }
}
