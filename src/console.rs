//! In-process collaborators for the console binary

use async_trait::async_trait;
use chatter::remote::{ChatBackend, ChatReply, HistoryEntry, HistoryPage};
use chatter::speech::{PlaybackEvent, SpeechSynthesizer, SynthesisFailure, Utterance};
use chatter::Result;
use chrono::Utc;
use crossbeam_channel::Sender;
use parking_lot::Mutex;

/// Answers every message locally and remembers the exchange
pub struct LoopbackAssistant {
    chats: Mutex<Vec<HistoryEntry>>,
}

impl LoopbackAssistant {
    pub fn new() -> Self {
        Self {
            chats: Mutex::new(Vec::new()),
        }
    }
}

impl Default for LoopbackAssistant {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatBackend for LoopbackAssistant {
    async fn send_message(&self, text: &str) -> Result<ChatReply> {
        let mut chats = self.chats.lock();
        let entry = HistoryEntry {
            id: format!("local-{}", chats.len() + 1),
            query: text.to_string(),
            response: format!("You said: {}", text),
            created_at: Utc::now(),
        };
        let reply = ChatReply::new(entry.response.clone(), entry.id.clone());
        chats.push(entry);
        Ok(reply)
    }

    async fn get_history(&self) -> Result<HistoryPage> {
        Ok(HistoryPage::new(self.chats.lock().clone()))
    }
}

/// Prints utterances instead of speaking them
pub struct ConsoleSynthesizer;

impl SpeechSynthesizer for ConsoleSynthesizer {
    fn speak(
        &mut self,
        utterance: Utterance,
        events: Sender<PlaybackEvent>,
    ) -> std::result::Result<(), SynthesisFailure> {
        println!("(speaking at {:.1}x) {}", utterance.rate, utterance.text);
        let _ = events.try_send(PlaybackEvent::Started {
            utterance: utterance.id,
        });
        let _ = events.try_send(PlaybackEvent::Finished {
            utterance: utterance.id,
        });
        Ok(())
    }

    fn cancel(&mut self) {}
}
