use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

/// Sequence number attached to one in-flight preview request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameTicket(u64);

impl FrameTicket {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Issues monotonically increasing tickets and rejects stale responses.
///
/// Decodes may finish out of order; only the response for the newest issued
/// ticket is allowed to reach the display.
///
/// # Example
/// ```
/// use engine::FrameSequencer;
///
/// let sequencer = FrameSequencer::default();
/// let first = sequencer.issue();
/// let second = sequencer.issue();
///
/// assert_eq!(sequencer.accept(first, "old frame"), None);
/// assert_eq!(sequencer.accept(second, "new frame"), Some("new frame"));
/// ```
#[derive(Debug, Default)]
pub struct FrameSequencer {
    latest: AtomicU64,
}

impl FrameSequencer {
    pub fn issue(&self) -> FrameTicket {
        FrameTicket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_latest(&self, ticket: FrameTicket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }

    /// Returns `value` when `ticket` is still the newest one issued.
    pub fn accept<T>(&self, ticket: FrameTicket, value: T) -> Option<T> {
        if self.is_latest(ticket) {
            return Some(value);
        }
        debug!(
            ticket = ticket.0,
            latest = self.latest.load(Ordering::Acquire),
            "dropping stale preview response"
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::FrameSequencer;

    #[test]
    fn tickets_increase_monotonically() {
        let sequencer = FrameSequencer::default();
        let tickets: Vec<_> = (0..5).map(|_| sequencer.issue()).collect();
        assert!(tickets.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(sequencer.is_latest(tickets[4]));
        assert!(!sequencer.is_latest(tickets[3]));
    }

    #[test]
    fn tickets_issued_from_many_threads_are_unique() {
        let sequencer = Arc::new(FrameSequencer::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let sequencer = Arc::clone(&sequencer);
                std::thread::spawn(move || {
                    (0..100).map(|_| sequencer.issue().get()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|handle| handle.join().expect("thread should finish"))
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 400);
        assert_eq!(all.last().copied(), Some(400));
    }
}
