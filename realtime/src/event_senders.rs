use crossbeam_channel::{Sender, TrySendError};

use polysampler_core::pool::NoteEvent;

/// Sends note events to the audio thread of a `RealtimeSampler`.
///
/// Cheap to clone, and can be moved to any thread.
#[derive(Debug, Clone)]
pub struct RealtimeEventSender {
    sender: Sender<NoteEvent>,
}

impl RealtimeEventSender {
    pub(crate) fn new(sender: Sender<NoteEvent>) -> Self {
        Self { sender }
    }

    /// Queues an event for the next audio block. Returns false if the event
    /// was dropped because the queue is full or the sampler was closed.
    pub fn send_event(&self, event: NoteEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                log::warn!("Event queue is full, dropping {:?}", event);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Decodes a raw MIDI message and queues it. Messages the sampler
    /// doesn't handle are ignored.
    pub fn send_midi(&self, message: &[u8]) -> bool {
        match NoteEvent::from_midi(message) {
            Some(event) => self.send_event(event),
            None => false,
        }
    }
}
