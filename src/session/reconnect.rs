use std::time::Duration;

use super::state::ChannelState;

/// Decides whether a dropped channel is re-opened.
///
/// At most one retry is in flight at a time; repeated drop notifications
/// while a retry is pending are debounced. Session state is re-checked when
/// the delay elapses, not when the drop was observed, because a stop may
/// land inside the wait. There is no retry cap.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    delay: Duration,
    pending: bool,
}

impl ReconnectPolicy {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: false,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Ask for a retry after an unexpected drop. Returns true when a retry
    /// timer should be armed now.
    pub fn request(&mut self, is_recording: bool, is_stopping: bool) -> bool {
        if self.pending || !is_recording || is_stopping {
            return false;
        }
        self.pending = true;
        true
    }

    /// The armed delay elapsed. Returns true when the channel should
    /// actually be re-opened, judged against the state as it is now.
    pub fn fire(&mut self, is_recording: bool, is_stopping: bool, channel: ChannelState) -> bool {
        self.pending = false;
        is_recording && !is_stopping && channel == ChannelState::Disconnected
    }

    /// Forget any pending retry (a stop landed first).
    pub fn cancel(&mut self) {
        self.pending = false;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_are_debounced() {
        let mut policy = ReconnectPolicy::new(Duration::from_millis(600));
        assert!(policy.request(true, false));
        assert!(!policy.request(true, false));
        assert!(policy.fire(true, false, ChannelState::Disconnected));
        assert!(policy.request(true, false));
    }

    #[test]
    fn no_retry_unless_recording() {
        let mut policy = ReconnectPolicy::new(Duration::from_millis(600));
        assert!(!policy.request(false, false));
        assert!(!policy.request(true, true));
    }

    #[test]
    fn fire_rechecks_state() {
        let mut policy = ReconnectPolicy::new(Duration::from_millis(600));
        assert!(policy.request(true, false));
        // A stop arrived while the timer was armed.
        assert!(!policy.fire(false, true, ChannelState::Disconnected));
        assert!(!policy.is_pending());
    }

    #[test]
    fn fire_requires_disconnected_channel() {
        let mut policy = ReconnectPolicy::new(Duration::from_millis(600));
        assert!(policy.request(true, false));
        assert!(!policy.fire(true, false, ChannelState::Open));
    }
}
