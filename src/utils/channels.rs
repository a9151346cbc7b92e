use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

/// Paired sender/receiver for callbacks coming back from a platform capability.
///
/// The owning controller hands clones of `tx` to the platform and drains `rx`
/// from its own thread. Platform callbacks must never block or lose a
/// terminal event, so controllers use [`EventChannel::unbounded`].
pub struct EventChannel<T> {
    pub tx: Sender<T>,
    pub rx: Receiver<T>,
}

impl<T> EventChannel<T> {
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx }
    }

    pub fn unbounded() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<T> {
        self.tx.clone()
    }

    /// Take every event currently queued, without blocking
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }

    /// Discard queued events
    pub fn clear(&self) {
        while self.rx.try_recv().is_ok() {}
    }
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}
