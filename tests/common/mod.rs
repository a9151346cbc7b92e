//! Scripted collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chatter::integration::{Session, SessionBuilder, SessionConfig};
use chatter::remote::{ChatBackend, ChatReply, HistoryEntry, HistoryPage};
use chatter::speech::{
    CaptureEvent, CaptureRequest, PlaybackEvent, SpeechRecognizer, SpeechSynthesizer,
    SynthesisFailure, Utterance,
};
use chatter::{ChatterError, Result};
use chrono::{DateTime, TimeZone, Utc};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn entry(id: &str, query: &str, response: &str, created_at: DateTime<Utc>) -> HistoryEntry {
    HistoryEntry {
        id: id.to_string(),
        query: query.to_string(),
        response: response.to_string(),
        created_at,
    }
}

/// Chat backend answering from a script, optionally held until released
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<ChatReply>>>,
    history: Mutex<Option<Result<HistoryPage>>>,
    sent: Mutex<Vec<String>>,
    history_calls: Mutex<usize>,
    send_gate: Option<Notify>,
    history_gate: Option<Notify>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends wait for [`ScriptedBackend::release_send`]
    pub fn gated_sends() -> Self {
        Self {
            send_gate: Some(Notify::new()),
            ..Default::default()
        }
    }

    /// History fetches wait for [`ScriptedBackend::release_history`]
    pub fn gated_history() -> Self {
        Self {
            history_gate: Some(Notify::new()),
            ..Default::default()
        }
    }

    pub fn reply(self, response: &str, chat_id: &str) -> Self {
        self.replies
            .lock()
            .push_back(Ok(ChatReply::new(response, chat_id)));
        self
    }

    pub fn reject(self, error: ChatterError) -> Self {
        self.replies.lock().push_back(Err(error));
        self
    }

    pub fn history(self, chats: Vec<HistoryEntry>) -> Self {
        *self.history.lock() = Some(Ok(HistoryPage::new(chats)));
        self
    }

    pub fn history_error(self, error: ChatterError) -> Self {
        *self.history.lock() = Some(Err(error));
        self
    }

    pub fn release_send(&self) {
        if let Some(gate) = &self.send_gate {
            gate.notify_one();
        }
    }

    pub fn release_history(&self) {
        if let Some(gate) = &self.history_gate {
            gate.notify_one();
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn history_calls(&self) -> usize {
        *self.history_calls.lock()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn send_message(&self, text: &str) -> Result<ChatReply> {
        self.sent.lock().push(text.to_string());
        if let Some(gate) = &self.send_gate {
            gate.notified().await;
        }
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ChatterError::Network("no scripted reply".into())))
    }

    async fn get_history(&self) -> Result<HistoryPage> {
        *self.history_calls.lock() += 1;
        if let Some(gate) = &self.history_gate {
            gate.notified().await;
        }
        self.history
            .lock()
            .take()
            .unwrap_or_else(|| Ok(HistoryPage::default()))
    }
}

#[derive(Default)]
pub struct RecognizerLog {
    pub starts: Vec<CaptureRequest>,
    pub stops: usize,
    pub aborts: usize,
    events: Option<Sender<CaptureEvent>>,
}

/// Recognizer whose callbacks are driven by the test
#[derive(Clone, Default)]
pub struct MockRecognizer {
    pub log: Arc<Mutex<RecognizerLog>>,
}

impl MockRecognizer {
    fn emit(&self, make: impl FnOnce(uuid::Uuid) -> CaptureEvent) {
        let log = self.log.lock();
        let utterance = log.starts.last().expect("recognizer was started").utterance;
        log.events
            .as_ref()
            .expect("recognizer was started")
            .send(make(utterance))
            .unwrap();
    }

    pub fn transcript(&self, text: &str) {
        let text = text.to_string();
        self.emit(|utterance| CaptureEvent::Transcript { utterance, text });
    }

    pub fn end(&self) {
        self.emit(|utterance| CaptureEvent::Ended { utterance });
    }

    pub fn fail(&self, message: &str) {
        let message = message.to_string();
        self.emit(|utterance| CaptureEvent::Error { utterance, message });
    }
}

impl SpeechRecognizer for MockRecognizer {
    fn start(&mut self, request: CaptureRequest, events: Sender<CaptureEvent>) -> Result<()> {
        let mut log = self.log.lock();
        log.starts.push(request);
        log.events = Some(events);
        Ok(())
    }

    fn stop(&mut self) {
        self.log.lock().stops += 1;
    }

    fn abort(&mut self) {
        self.log.lock().aborts += 1;
    }
}

#[derive(Default)]
pub struct SynthesizerLog {
    pub utterances: Vec<Utterance>,
    pub cancels: usize,
    events: Option<Sender<PlaybackEvent>>,
}

/// Synthesizer that never finishes on its own
#[derive(Clone, Default)]
pub struct MockSynthesizer {
    pub log: Arc<Mutex<SynthesizerLog>>,
}

impl MockSynthesizer {
    pub fn spoken_texts(&self) -> Vec<String> {
        self.log
            .lock()
            .utterances
            .iter()
            .map(|u| u.text.clone())
            .collect()
    }

    pub fn last(&self) -> Utterance {
        self.log.lock().utterances.last().cloned().expect("nothing spoken")
    }

    pub fn cancels(&self) -> usize {
        self.log.lock().cancels
    }

    pub fn emit(&self, event: PlaybackEvent) {
        let log = self.log.lock();
        log.events.as_ref().expect("nothing spoken").send(event).unwrap();
    }

    pub fn finish(&self, utterance: &Utterance) {
        self.emit(PlaybackEvent::Finished {
            utterance: utterance.id,
        });
    }

    pub fn finish_last(&self) {
        let last = self.last();
        self.finish(&last);
    }

    pub fn deny_last(&self) {
        let last = self.last();
        self.emit(PlaybackEvent::Failed {
            utterance: last.id,
            failure: SynthesisFailure::NotAllowed,
        });
    }
}

impl SpeechSynthesizer for MockSynthesizer {
    fn speak(
        &mut self,
        utterance: Utterance,
        events: Sender<PlaybackEvent>,
    ) -> std::result::Result<(), SynthesisFailure> {
        let mut log = self.log.lock();
        log.utterances.push(utterance);
        log.events = Some(events);
        Ok(())
    }

    fn cancel(&mut self) {
        self.log.lock().cancels += 1;
    }
}

/// A session wired to the given backend and fresh voice mocks
pub struct Harness {
    pub session: Arc<Session>,
    pub backend: Arc<ScriptedBackend>,
    pub recognizer: MockRecognizer,
    pub synthesizer: MockSynthesizer,
}

impl Harness {
    pub fn new(backend: ScriptedBackend) -> Self {
        Self::with_config(backend, SessionConfig::default())
    }

    pub fn with_config(backend: ScriptedBackend, config: SessionConfig) -> Self {
        let backend = Arc::new(backend);
        let recognizer = MockRecognizer::default();
        let synthesizer = MockSynthesizer::default();

        let session = SessionBuilder::new(backend.clone())
            .with_config(config)
            .with_recognizer(recognizer.clone())
            .with_synthesizer(synthesizer.clone())
            .build()
            .unwrap();

        Self {
            session: Arc::new(session),
            backend,
            recognizer,
            synthesizer,
        }
    }
}
