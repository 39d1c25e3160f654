use biometrics_core::feedback::FeedbackCue;

use crate::feedback::{FeedbackReceiver, LedState};

#[embassy_executor::task]
pub async fn run(messages: FeedbackReceiver<'static>) -> ! {
    let mut state = LedState::new();
    loop {
        let message = messages.receive().await;
        state.apply(message);
        // The RGB driver is not bound yet; mirror the cue to the log so
        // bring-up can follow the animation stream.
        defmt::info!("led: {}", cue_label(state.current()));
    }
}

fn cue_label(cue: FeedbackCue) -> &'static str {
    match cue {
        FeedbackCue::Enrollment => "enrollment",
        FeedbackCue::SampleGood => "sample-good",
        FeedbackCue::SampleBad => "sample-bad",
        FeedbackCue::EnrollmentComplete => "enrollment-complete",
        FeedbackCue::FingerprintBad => "fingerprint-bad",
        FeedbackCue::Unlocked => "unlocked",
        FeedbackCue::Rest => "rest",
    }
}
