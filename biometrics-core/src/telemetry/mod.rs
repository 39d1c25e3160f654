//! Performance counters and error-event telemetry for the biometric flows.
//!
//! Counters come in two kinds: plain event counts and elapsed brackets
//! opened with [`PerfCounter::begin`] and closed with [`PerfCounter::end`]
//! or [`PerfCounter::cancel`]. Error events carry the failing operation and
//! the collaborator's compact status code and are retained in a bounded
//! ring for later inspection over a diagnostics channel.

use core::time::Duration;

use heapless::{HistoryBuf, OldestOrdered};

/// Trait implemented by monotonic instant wrappers used for timing.
pub trait BioInstant: Copy {
    /// Returns the saturating duration from `earlier` to `self`.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

/// Source of monotonic instants for elapsed brackets and deadlines.
pub trait Clock {
    /// Monotonic timestamp type.
    type Instant: BioInstant;

    /// Returns the current instant.
    fn now(&mut self) -> Self::Instant;
}

/// Kind of measurement a counter tracks.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PerfKind {
    /// Plain occurrence count.
    Count,
    /// Elapsed-time bracket; completed brackets also bump the count.
    Elapsed,
}

/// One tracked counter.
#[derive(Copy, Clone, Debug)]
pub struct PerfCounter<I> {
    kind: PerfKind,
    count: u32,
    elapsed: Duration,
    started_at: Option<I>,
}

impl<I: BioInstant> PerfCounter<I> {
    #[must_use]
    pub const fn new(kind: PerfKind) -> Self {
        Self {
            kind,
            count: 0,
            elapsed: Duration::ZERO,
            started_at: None,
        }
    }

    /// Returns the counter kind.
    #[must_use]
    pub const fn kind(&self) -> PerfKind {
        self.kind
    }

    /// Records one occurrence.
    pub fn count(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    /// Returns the occurrence count.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.count
    }

    /// Returns the accumulated elapsed time across completed brackets.
    #[must_use]
    pub const fn total_elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Opens an elapsed bracket. A bracket already in flight is restarted.
    pub fn begin(&mut self, now: I) {
        self.started_at = Some(now);
    }

    /// Closes the bracket, accumulating its duration. No-op when no bracket
    /// is in flight, so a cancelled bracket cannot be double-counted.
    pub fn end(&mut self, now: I) {
        if let Some(started) = self.started_at.take() {
            self.elapsed += now.saturating_duration_since(started);
            self.count = self.count.saturating_add(1);
        }
    }

    /// Abandons the in-flight bracket without accumulating. Idempotent.
    pub fn cancel(&mut self) {
        self.started_at = None;
    }

    /// Resets the counter to its initial state.
    pub fn reset(&mut self) {
        self.count = 0;
        self.elapsed = Duration::ZERO;
        self.started_at = None;
    }
}

/// Operations that can be tagged on an error event.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BioOp {
    FingerWait,
    Capture,
    Extract,
    EnrollStart,
    EnrollStep,
    EnrollFinish,
    Identify,
    IdentifyRelease,
    TemplateDelete,
    Storage,
    ImageAlloc,
}

/// Discrete error event tagged with the failing operation's status code.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ErrorEvent {
    pub op: BioOp,
    pub code: u16,
}

impl ErrorEvent {
    #[must_use]
    pub const fn new(op: BioOp, code: u16) -> Self {
        Self { op, code }
    }
}

/// Number of error events retained in memory.
pub const ERROR_EVENT_CAPACITY: usize = 32;

/// Process-wide counter bundle for the biometric flows.
///
/// One instance lives for the device uptime, owned by the session.
pub struct BioMetrics<I: BioInstant> {
    /// Enrollment invocations.
    pub enroll: PerfCounter<I>,
    /// Authentication duration bracket.
    pub auth: PerfCounter<I>,
    /// Capture duration bracket.
    pub capture: PerfCounter<I>,
    /// Error occurrences across all flows.
    pub errors: PerfCounter<I>,
    /// Accepted enrollment samples, reset per enrollment.
    pub enroll_pass: PerfCounter<I>,
    /// Rejected enrollment samples, reset per enrollment.
    pub enroll_fail: PerfCounter<I>,
    events: HistoryBuf<ErrorEvent, ERROR_EVENT_CAPACITY>,
}

impl<I: BioInstant> BioMetrics<I> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            enroll: PerfCounter::new(PerfKind::Count),
            auth: PerfCounter::new(PerfKind::Elapsed),
            capture: PerfCounter::new(PerfKind::Elapsed),
            errors: PerfCounter::new(PerfKind::Count),
            enroll_pass: PerfCounter::new(PerfKind::Count),
            enroll_fail: PerfCounter::new(PerfKind::Count),
            events: HistoryBuf::new(),
        }
    }

    /// Records a discrete error event.
    pub fn record_error(&mut self, op: BioOp, code: u16) {
        self.events.write(ErrorEvent::new(op, code));
    }

    /// Returns the most recent error event, if any.
    #[must_use]
    pub fn latest_error(&self) -> Option<&ErrorEvent> {
        self.events.recent()
    }

    /// Iterates recorded error events in chronological order.
    pub fn errors_oldest_first(&self) -> OldestOrdered<'_, ErrorEvent> {
        self.events.oldest_ordered()
    }

    /// Number of retained error events.
    #[must_use]
    pub fn error_event_count(&self) -> usize {
        self.events.len()
    }
}

impl<I: BioInstant> Default for BioMetrics<I> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
    struct MicrosInstant(u64);

    impl BioInstant for MicrosInstant {
        fn saturating_duration_since(&self, earlier: Self) -> Duration {
            Duration::from_micros(self.0.saturating_sub(earlier.0))
        }
    }

    #[test]
    fn elapsed_bracket_accumulates_and_counts() {
        let mut counter = PerfCounter::new(PerfKind::Elapsed);
        counter.begin(MicrosInstant(100));
        counter.end(MicrosInstant(350));

        assert_eq!(counter.value(), 1);
        assert_eq!(counter.total_elapsed(), Duration::from_micros(250));

        counter.begin(MicrosInstant(1_000));
        counter.end(MicrosInstant(1_100));
        assert_eq!(counter.value(), 2);
        assert_eq!(counter.total_elapsed(), Duration::from_micros(350));
    }

    #[test]
    fn cancelled_bracket_is_not_counted() {
        let mut counter = PerfCounter::<MicrosInstant>::new(PerfKind::Elapsed);
        counter.begin(MicrosInstant(10));
        counter.cancel();
        counter.cancel();
        counter.end(MicrosInstant(500));

        assert_eq!(counter.value(), 0);
        assert_eq!(counter.total_elapsed(), Duration::ZERO);
    }

    #[test]
    fn end_without_begin_is_a_no_op() {
        let mut counter = PerfCounter::<MicrosInstant>::new(PerfKind::Elapsed);
        counter.end(MicrosInstant(42));
        assert_eq!(counter.value(), 0);
    }

    #[test]
    fn reset_clears_counts_and_brackets() {
        let mut counter = PerfCounter::new(PerfKind::Count);
        counter.count();
        counter.count();
        counter.begin(MicrosInstant(5));
        counter.reset();

        assert_eq!(counter.value(), 0);
        assert_eq!(counter.total_elapsed(), Duration::ZERO);
        counter.end(MicrosInstant(10));
        assert_eq!(counter.value(), 0);
    }

    #[test]
    fn error_ring_retains_events_in_order() {
        let mut metrics = BioMetrics::<MicrosInstant>::new();
        metrics.record_error(BioOp::Capture, 0x0002);
        metrics.record_error(BioOp::Storage, 0x0102);

        assert_eq!(metrics.error_event_count(), 2);
        assert_eq!(
            metrics.latest_error(),
            Some(&ErrorEvent::new(BioOp::Storage, 0x0102))
        );

        let mut events = metrics.errors_oldest_first();
        assert_eq!(events.next(), Some(&ErrorEvent::new(BioOp::Capture, 0x0002)));
        assert_eq!(events.next(), Some(&ErrorEvent::new(BioOp::Storage, 0x0102)));
        assert_eq!(events.next(), None);
    }
}
