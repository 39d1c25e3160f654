//! Fire-and-forget user feedback cues.
//!
//! Cues map to LED animations rendered by a separate subsystem. Sends must
//! never block a biometric workflow and delivery failures are not surfaced;
//! the cue stream is purely cosmetic and carries no part of the trust
//! decision.

/// Named animation cues understood by the feedback subsystem.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FeedbackCue {
    /// Enrollment is in progress.
    Enrollment,
    /// The last enrollment sample was accepted.
    SampleGood,
    /// The last enrollment sample was rejected.
    SampleBad,
    /// Enrollment finished successfully.
    EnrollmentComplete,
    /// Capture or identification failed for the presented finger.
    FingerprintBad,
    /// Authentication succeeded.
    Unlocked,
    /// Device idle state.
    Rest,
}

/// Messages accepted by the feedback channel.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FeedbackMessage {
    /// Plays `cue` once; `immediate` preempts whatever is running.
    Start { cue: FeedbackCue, immediate: bool },
    /// Changes the animation shown whenever nothing else is playing.
    SetRest { cue: FeedbackCue },
    /// Stops the currently playing animation.
    Stop,
}

impl FeedbackMessage {
    /// Builds an immediate one-shot cue, the common case for sample and
    /// unlock feedback.
    #[must_use]
    pub const fn start(cue: FeedbackCue) -> Self {
        FeedbackMessage::Start {
            cue,
            immediate: true,
        }
    }
}

/// One-way sink for feedback messages.
pub trait FeedbackSink {
    /// Sends a message without blocking. Implementations drop the message
    /// when the transport is saturated.
    fn send(&mut self, message: FeedbackMessage);
}

/// Feedback sink that discards every message.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopFeedbackSink;

impl NoopFeedbackSink {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl FeedbackSink for NoopFeedbackSink {
    fn send(&mut self, _message: FeedbackMessage) {}
}
