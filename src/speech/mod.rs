//! Speech controllers for voice input and spoken responses
//!
//! This module provides:
//! - Voice capture: speech-to-text feeding the input draft
//! - Voice playback: text-to-speech with preemption and spoken-turn tracking

pub mod capture;
pub mod playback;

// Re-export commonly used types
pub use capture::{
    CaptureConfig, CaptureEvent, CaptureRequest, CaptureState, CaptureUpdate, SpeechRecognizer,
    VoiceCapture,
};
pub use playback::{
    PlaybackConfig, PlaybackEvent, PlaybackState, PlaybackUpdate, SpeakOutcome,
    SpeechSynthesizer, SynthesisFailure, Utterance, VoicePlayback,
};
