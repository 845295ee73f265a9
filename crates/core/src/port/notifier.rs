// Queue change notification port
//
// The mutation service signals here after a commit. Implementations must not
// block the caller; the fan-out layer re-reads state on its own task.

/// Receives "provider state changed, re-read" signals
pub trait QueueNotifier: Send + Sync {
    fn queue_changed(&self, provider_id: &str);
}

/// Notifier that drops every signal
pub struct NoopNotifier;

impl QueueNotifier for NoopNotifier {
    fn queue_changed(&self, _provider_id: &str) {}
}

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Records every signal for assertions
    #[derive(Default)]
    pub struct RecordingNotifier {
        events: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        pub fn count_for(&self, provider_id: &str) -> usize {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|id| id.as_str() == provider_id)
                .count()
        }
    }

    impl QueueNotifier for RecordingNotifier {
        fn queue_changed(&self, provider_id: &str) {
            self.events.lock().unwrap().push(provider_id.to_string());
        }
    }
}
