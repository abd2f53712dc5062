use std::time::{Duration, Instant};

/// One-shot timer that ignores triggers while it is already running
///
/// Any number of `trigger` calls before the deadline result in a single
/// `fire`.
#[derive(Debug, Clone)]
pub struct Debounce {
    interval: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Start the timer unless it is active; returns true if it was started
    pub fn trigger(&mut self, now: Instant) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        self.deadline = Some(now + self.interval);
        true
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the timeout if it has expired
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(100);

    #[test]
    fn test_triggers_within_window_collapse() {
        let start = Instant::now();
        let mut timer = Debounce::new(INTERVAL);

        assert!(timer.trigger(start));
        assert!(!timer.trigger(start + Duration::from_millis(30)));
        assert!(!timer.trigger(start + Duration::from_millis(90)));
        assert_eq!(timer.deadline(), Some(start + INTERVAL));

        assert!(!timer.fire(start + Duration::from_millis(99)));
        assert!(timer.fire(start + INTERVAL));
        assert!(!timer.fire(start + Duration::from_millis(200)));
        assert_eq!(timer.deadline(), None);
    }

    #[test]
    fn test_trigger_after_fire_restarts() {
        let start = Instant::now();
        let mut timer = Debounce::new(INTERVAL);
        timer.trigger(start);
        timer.fire(start + INTERVAL);

        assert!(timer.trigger(start + Duration::from_millis(150)));
        assert_eq!(timer.deadline(), Some(start + Duration::from_millis(250)));
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut timer = Debounce::new(INTERVAL);
        timer.trigger(start);
        timer.cancel();
        assert!(!timer.fire(start + INTERVAL));
    }
}
