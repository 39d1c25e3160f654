#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! LED feedback plumbing between the biometric worker and the LED task.
//!
//! Cues are cosmetic, so the sink never blocks the worker: messages are
//! dropped outright when the queue is saturated. [`LedState`] folds the
//! message stream into the animation the LED should currently render and
//! is kept free of hardware so it can be exercised on the host.

use biometrics_core::feedback::{FeedbackCue, FeedbackMessage, FeedbackSink};
#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};

/// Depth of the cue queue between the worker and the LED task.
pub const FEEDBACK_QUEUE_DEPTH: usize = 8;

#[cfg(target_os = "none")]
type FeedbackMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
type FeedbackMutex = NoopRawMutex;

pub type FeedbackQueue = Channel<FeedbackMutex, FeedbackMessage, FEEDBACK_QUEUE_DEPTH>;
pub type FeedbackSender<'a> = Sender<'a, FeedbackMutex, FeedbackMessage, FEEDBACK_QUEUE_DEPTH>;
pub type FeedbackReceiver<'a> = Receiver<'a, FeedbackMutex, FeedbackMessage, FEEDBACK_QUEUE_DEPTH>;

/// Feedback sink backed by the LED task's channel.
pub struct ChannelFeedbackSink {
    sender: FeedbackSender<'static>,
}

impl ChannelFeedbackSink {
    pub fn new(sender: FeedbackSender<'static>) -> Self {
        Self { sender }
    }
}

impl FeedbackSink for ChannelFeedbackSink {
    fn send(&mut self, message: FeedbackMessage) {
        // A full queue means the LED task is behind on cosmetic work; the
        // biometric flow must not wait for it.
        let _ = self.sender.try_send(message);
    }
}

/// Animation selection derived from the cue stream.
///
/// A one-shot animation plays on top of the rest animation; `Stop` or the
/// animation running to completion falls back to the rest cue.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LedState {
    rest: FeedbackCue,
    active: Option<FeedbackCue>,
}

impl LedState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rest: FeedbackCue::Rest,
            active: None,
        }
    }

    /// Folds one message into the state.
    pub fn apply(&mut self, message: FeedbackMessage) {
        match message {
            FeedbackMessage::Start { cue, immediate } => {
                if immediate || self.active.is_none() {
                    self.active = Some(cue);
                }
            }
            FeedbackMessage::SetRest { cue } => self.rest = cue,
            FeedbackMessage::Stop => self.active = None,
        }
    }

    /// Marks the in-flight one-shot animation as finished.
    pub fn finish_active(&mut self) {
        self.active = None;
    }

    /// Cue the LED should currently render.
    #[must_use]
    pub fn current(&self) -> FeedbackCue {
        self.active.unwrap_or(self.rest)
    }
}

impl Default for LedState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturated_queue_drops_cues_without_blocking() {
        // The sink wants a `'static` sender; a leaked channel stands in for
        // the firmware image's static queue on the host.
        let queue: &'static FeedbackQueue = Box::leak(Box::new(Channel::new()));

        let mut sink = ChannelFeedbackSink::new(queue.sender());
        for _ in 0..=FEEDBACK_QUEUE_DEPTH {
            sink.send(FeedbackMessage::start(FeedbackCue::SampleGood));
        }

        let mut delivered = 0;
        while queue.receiver().try_receive().is_ok() {
            delivered += 1;
        }
        assert_eq!(delivered, FEEDBACK_QUEUE_DEPTH);
    }

    #[test]
    fn one_shot_animations_overlay_the_rest_cue() {
        let mut state = LedState::new();
        assert_eq!(state.current(), FeedbackCue::Rest);

        state.apply(FeedbackMessage::SetRest {
            cue: FeedbackCue::Enrollment,
        });
        assert_eq!(state.current(), FeedbackCue::Enrollment);

        state.apply(FeedbackMessage::start(FeedbackCue::SampleGood));
        assert_eq!(state.current(), FeedbackCue::SampleGood);

        state.finish_active();
        assert_eq!(state.current(), FeedbackCue::Enrollment);
    }

    #[test]
    fn stop_reverts_to_the_rest_cue() {
        let mut state = LedState::new();
        state.apply(FeedbackMessage::start(FeedbackCue::Unlocked));
        state.apply(FeedbackMessage::Stop);
        assert_eq!(state.current(), FeedbackCue::Rest);
    }

    #[test]
    fn deferred_start_does_not_preempt_a_running_animation() {
        let mut state = LedState::new();
        state.apply(FeedbackMessage::start(FeedbackCue::Unlocked));
        state.apply(FeedbackMessage::Start {
            cue: FeedbackCue::SampleBad,
            immediate: false,
        });
        assert_eq!(state.current(), FeedbackCue::Unlocked);
    }
}
