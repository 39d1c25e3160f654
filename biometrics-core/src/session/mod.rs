//! Enrollment and authentication control flow.
//!
//! [`BioSession`] owns the collaborating capability objects plus the single
//! in-flight working template, and serializes every biometric operation. The
//! trust decision path deliberately evaluates its conditions redundantly
//! (see [`BioSession::match_decision`]): a glitch that flips one branch
//! outcome must not be able to force a false accept.

use core::hint::black_box;
use core::time::Duration;

use crate::config::BioConfig;
use crate::feedback::{FeedbackCue, FeedbackMessage, FeedbackSink};
use crate::sensor::{FingerStatus, SensorAdapter, SensorError};
use crate::storage::{StoreError, TemplateId, TemplateStore};
use crate::telemetry::{BioInstant, BioMetrics, BioOp, Clock};

/// Timeout value that disables the deadline on a finger wait.
pub const UNBOUNDED_WAIT: Duration = Duration::MAX;

/// Tagged trust verdict.
///
/// The discriminants are non-trivial bit patterns so a single flipped bit
/// cannot turn one value into the other, and `Trusted` is only ever produced
/// from a dedicated guarded branch.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Verdict {
    Trusted = 0x5AC3_3CA5,
    Untrusted = 0xA53C_C35A,
}

impl Verdict {
    /// Returns `true` only for the `Trusted` tag.
    #[must_use]
    pub const fn is_trusted(self) -> bool {
        matches!(self, Verdict::Trusted)
    }
}

/// Failures reported by the finger-presence waiter.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WaitError {
    /// The requested status did not appear within the timeout.
    TimedOut,
    /// The sensor failed while being queried; it has been deep-slept.
    Sensor(SensorError),
}

/// Per-enrollment sample accounting returned to the caller.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct EnrollStats {
    pub pass_count: u32,
    pub fail_count: u32,
}

/// Outcome of one identification attempt.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct IdentifyResult {
    pub matched: bool,
    pub template_id: TemplateId,
}

impl IdentifyResult {
    /// The initial value: no match, invalid slot.
    #[must_use]
    pub const fn no_match() -> Self {
        Self {
            matched: false,
            template_id: TemplateId::INVALID,
        }
    }
}

impl Default for IdentifyResult {
    fn default() -> Self {
        Self::no_match()
    }
}

/// Authentication outputs, reset to no-match before any work begins.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AuthOutcome {
    pub is_match: Verdict,
    pub template_id: TemplateId,
}

impl AuthOutcome {
    /// The initial value: untrusted, invalid slot.
    #[must_use]
    pub const fn no_match() -> Self {
        Self {
            is_match: Verdict::Untrusted,
            template_id: TemplateId::INVALID,
        }
    }
}

impl Default for AuthOutcome {
    fn default() -> Self {
        Self::no_match()
    }
}

/// Internal enrollment failure classification.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum EnrollError {
    StartFailed,
    TooManyBadImages,
    WaitFailed,
    TriesExhausted,
    FinishFailed,
    NullTemplate,
    SaveFailed,
}

impl EnrollError {
    /// Hard failures additionally bump the error counter, matching the
    /// taxonomy for non-recoverable algorithm errors.
    const fn is_hard(self) -> bool {
        matches!(
            self,
            EnrollError::StartFailed | EnrollError::FinishFailed | EnrollError::NullTemplate
        )
    }

    /// Whether the algorithm's enrollment context is still open and must be
    /// torn down before returning.
    const fn context_open(self) -> bool {
        matches!(
            self,
            EnrollError::TooManyBadImages | EnrollError::WaitFailed | EnrollError::TriesExhausted
        )
    }
}

/// Phases of the repeated capture/process cycle inside an enrollment.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum EnrollCycle {
    Capture,
    SampleProcess,
}

/// Serialized biometric operation context.
///
/// One session lives on the dedicated biometric worker; concurrent
/// operations are not supported and must be serialized by the caller.
pub struct BioSession<A, S, F, C>
where
    A: SensorAdapter,
    S: TemplateStore<Template = A::Template>,
    F: FeedbackSink,
    C: Clock,
{
    config: BioConfig,
    adapter: A,
    store: S,
    feedback: F,
    clock: C,
    metrics: BioMetrics<C::Instant>,
    working_template: Option<A::Template>,
    working_template_id: TemplateId,
}

impl<A, S, F, C> BioSession<A, S, F, C>
where
    A: SensorAdapter,
    S: TemplateStore<Template = A::Template>,
    F: FeedbackSink,
    C: Clock,
{
    /// Creates a session from externally supplied configuration and
    /// collaborators. Constructed once at startup, never mid-operation.
    pub fn new(config: BioConfig, adapter: A, store: S, feedback: F, clock: C) -> Self {
        Self {
            config,
            adapter,
            store,
            feedback,
            clock,
            metrics: BioMetrics::new(),
            working_template: None,
            working_template_id: TemplateId::INVALID,
        }
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &BioConfig {
        &self.config
    }

    /// Returns the accumulated telemetry.
    pub fn metrics(&self) -> &BioMetrics<C::Instant> {
        &self.metrics
    }

    /// Mutable access to the telemetry, e.g. for periodic reporting.
    pub fn metrics_mut(&mut self) -> &mut BioMetrics<C::Instant> {
        &mut self.metrics
    }

    /// Accesses the sensor adapter.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Mutably accesses the sensor adapter.
    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    /// Accesses the template store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutably accesses the template store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Slot of the template currently held in working memory, if any.
    pub fn working_template_id(&self) -> TemplateId {
        self.working_template_id
    }

    /// Blocks until the sensor reports `target`, or the wait fails.
    ///
    /// Success leaves any open capture telemetry bracket untouched; both
    /// failure paths cancel it and count an error. A sensor query failure is
    /// fatal to this wait call and leaves the sensor in its lowest-power
    /// state.
    pub fn wait_for_finger_status(
        &mut self,
        target: FingerStatus,
        timeout: Duration,
    ) -> Result<(), WaitError> {
        // Presence is the only edge with a hardware interrupt; waiting for
        // finger-up falls back to busy polling despite the power cost.
        let interrupt_driven = target == FingerStatus::Present;
        let started = self.clock.now();

        loop {
            if let Err(err) = self.adapter.sensor_sleep(self.config.sensor_poll_period) {
                return Err(self.wait_failed(err));
            }

            let elapsed = self.clock.now().saturating_duration_since(started);
            let remaining = timeout.saturating_sub(elapsed);
            self.adapter.wait_for_event(remaining, interrupt_driven);

            match self.adapter.finger_status() {
                Ok(status) if status == target => break,
                Ok(_) => {
                    let waited = self.clock.now().saturating_duration_since(started);
                    if waited >= timeout {
                        self.metrics.capture.cancel();
                        self.metrics.errors.count();
                        return Err(WaitError::TimedOut);
                    }
                }
                Err(err) => return Err(self.wait_failed(err)),
            }
        }

        Ok(())
    }

    /// Waits for a finger to arrive on the sensor.
    pub fn wait_for_finger_down(&mut self, timeout: Duration) -> Result<(), WaitError> {
        self.wait_for_finger_status(FingerStatus::Present, timeout)
    }

    /// Waits for the finger to be lifted off the sensor.
    pub fn wait_for_finger_up(&mut self, timeout: Duration) -> Result<(), WaitError> {
        self.wait_for_finger_status(FingerStatus::NotPresent, timeout)
    }

    fn wait_failed(&mut self, err: SensorError) -> WaitError {
        self.metrics.capture.cancel();
        self.metrics.errors.count();
        self.metrics.record_error(BioOp::FingerWait, err.to_raw());
        self.adapter.deep_sleep();
        WaitError::Sensor(err)
    }

    /// Attempts one clean capture within `max_tries` attempts.
    ///
    /// A failed capture consumes one try and continues without waiting for
    /// finger-up first; partial prints are common and usually clear up on
    /// the next frame. The capture telemetry bracket commits only on a clean
    /// capture; all failure paths cancel it, so a run with no good frame
    /// accumulates nothing.
    pub fn capture_image(&mut self, image: &mut A::Image, max_tries: u32) -> bool {
        let started = self.clock.now();
        self.metrics.capture.begin(started);

        let mut last_error = None;
        let mut tries = 0;
        while tries < max_tries {
            if self
                .wait_for_finger_down(self.config.finger_detect_timeout)
                .is_err()
            {
                // The waiter already cancelled the bracket and counted it.
                return false;
            }

            match self.adapter.capture(image) {
                Ok(()) => {
                    let now = self.clock.now();
                    self.metrics.capture.end(now);
                    return true;
                }
                Err(err) => {
                    last_error = Some(err);
                    tries += 1;
                }
            }
        }

        if let Some(err) = last_error {
            self.metrics.record_error(BioOp::Capture, err.to_raw());
        }
        self.metrics.capture.cancel();
        self.metrics.errors.count();
        false
    }

    /// Captures one sample and extracts its features into the adapter's
    /// internal probe template.
    fn capture_and_extract(&mut self, image: &mut A::Image) -> bool {
        if !self.capture_image(image, self.config.capture_tries) {
            return false;
        }

        match self.adapter.extract(image) {
            Ok(()) => true,
            Err(err) => {
                self.metrics.record_error(BioOp::Extract, err.to_raw());
                false
            }
        }
    }

    /// Enrolls a new finger into `id`, reporting sample accounting through
    /// `stats`. Returns `false` on any failure; no partial template is left
    /// behind.
    pub fn enroll(&mut self, id: TemplateId, stats: &mut EnrollStats) -> bool {
        self.metrics.enroll.count();
        self.metrics.enroll_pass.reset();
        self.metrics.enroll_fail.reset();

        // Reject bad slots before any sensor interaction.
        if !self.config.slot_is_valid(id) {
            self.metrics.errors.count();
            self.fail_feedback();
            return false;
        }

        self.feedback.send(FeedbackMessage::SetRest {
            cue: FeedbackCue::Enrollment,
        });

        let Some(mut image) = self.adapter.image_new() else {
            self.metrics.errors.count();
            self.metrics.record_error(BioOp::ImageAlloc, 0);
            self.fail_feedback();
            return false;
        };

        let outcome = self.enroll_flow(id, &mut image);
        self.adapter.image_delete(image);

        match outcome {
            Ok(()) => {
                stats.pass_count = self.metrics.enroll_pass.value();
                stats.fail_count = self.metrics.enroll_fail.value();
                true
            }
            Err(error) => {
                if error.is_hard() {
                    self.metrics.errors.count();
                }
                if error.context_open() {
                    self.abort_enroll_context();
                }
                self.fail_feedback();
                false
            }
        }
    }

    fn enroll_flow(&mut self, id: TemplateId, image: &mut A::Image) -> Result<(), EnrollError> {
        if let Err(err) = self.adapter.enroll_start() {
            self.metrics.record_error(BioOp::EnrollStart, err.to_raw());
            return Err(EnrollError::StartFailed);
        }

        self.run_sample_cycles(image)?;

        self.feedback
            .send(FeedbackMessage::start(FeedbackCue::EnrollmentComplete));

        let template = match self.adapter.enroll_finish() {
            Ok(template) => template,
            Err(err) => {
                self.metrics.record_error(BioOp::EnrollFinish, err.to_raw());
                return Err(EnrollError::FinishFailed);
            }
        };

        // The library may report success with nothing to persist.
        let Some(template) = template else {
            return Err(EnrollError::NullTemplate);
        };

        let saved = self.store.save(id, &template);
        if let Err(err) = self.adapter.template_delete(template) {
            self.metrics.record_error(BioOp::TemplateDelete, err.to_raw());
        }

        match saved {
            Ok(()) => Ok(()),
            Err(err) => {
                self.metrics.record_error(BioOp::Storage, err.to_raw());
                Err(EnrollError::SaveFailed)
            }
        }
    }

    /// Runs the `{CAPTURE -> SAMPLE_PROCESS}*` cycle until the algorithm has
    /// accepted enough samples or a budget is exhausted.
    fn run_sample_cycles(&mut self, image: &mut A::Image) -> Result<(), EnrollError> {
        let mut tries = 0;
        let mut cycles = 0;
        // Accepted and rejected samples do not consume the outer try budget,
        // so a separate cap keeps the loop finite.
        let cycle_cap = self
            .config
            .enroll_tries
            .saturating_mul(self.config.required_samples.max(1));
        let mut previous_remaining = self.config.required_samples;
        let mut phase = EnrollCycle::Capture;

        loop {
            match phase {
                EnrollCycle::Capture => {
                    if tries >= self.config.enroll_tries || cycles >= cycle_cap {
                        return Err(EnrollError::TriesExhausted);
                    }
                    cycles += 1;

                    if self.capture_image(image, self.config.capture_tries) {
                        phase = EnrollCycle::SampleProcess;
                    } else {
                        // One bad capture round consumes outer budget only.
                        tries += 1;
                    }
                }
                EnrollCycle::SampleProcess => match self.adapter.enroll_step(image) {
                    Err(err) => {
                        self.metrics.record_error(BioOp::EnrollStep, err.to_raw());
                        if err == SensorError::TooManyBadImages {
                            return Err(EnrollError::TooManyBadImages);
                        }
                        tries += 1;
                        phase = EnrollCycle::Capture;
                    }
                    Ok(0) => {
                        self.metrics.enroll_pass.count();
                        return Ok(());
                    }
                    Ok(remaining) => {
                        if remaining < previous_remaining {
                            self.metrics.enroll_pass.count();
                            self.feedback
                                .send(FeedbackMessage::start(FeedbackCue::SampleGood));
                        } else {
                            self.metrics.enroll_fail.count();
                            self.feedback
                                .send(FeedbackMessage::start(FeedbackCue::SampleBad));
                        }
                        previous_remaining = remaining;

                        // Each sample requires a fresh finger placement.
                        let timeout = self.config.finger_up_timeout.unwrap_or(UNBOUNDED_WAIT);
                        if self.wait_for_finger_up(timeout).is_err() {
                            return Err(EnrollError::WaitFailed);
                        }
                        phase = EnrollCycle::Capture;
                    }
                },
            }
        }
    }

    fn abort_enroll_context(&mut self) {
        // Tear down the half-built enrollment context; failures here cannot
        // change the already-decided outcome.
        if let Ok(Some(template)) = self.adapter.enroll_finish() {
            let _ = self.adapter.template_delete(template);
        }
    }

    fn fail_feedback(&mut self) {
        self.feedback.send(FeedbackMessage::SetRest {
            cue: FeedbackCue::Rest,
        });
        self.feedback.send(FeedbackMessage::Stop);
    }

    /// Matches the captured probe against every stored template, ascending
    /// slot order, stopping at the first trusted match.
    pub fn identify_against_all(
        &mut self,
        result: &mut IdentifyResult,
        update_hint: &mut bool,
    ) -> Verdict {
        for slot in 0..=self.config.template_slot_max {
            let id = TemplateId::new(slot);
            match self.store.retrieve(id) {
                Ok(template) => {
                    // Drop any candidate left over from an aborted check.
                    self.release_working_template();
                    self.working_template = Some(template);
                    self.working_template_id = id;
                }
                // An empty slot is expected on a partially enrolled device.
                Err(StoreError::MissingSlot) => continue,
                Err(err @ StoreError::Corrupted) => {
                    self.metrics.record_error(BioOp::Storage, err.to_raw());
                    return Verdict::Untrusted;
                }
            }

            if self.match_decision(result, update_hint).is_trusted() {
                result.template_id = id;
                return Verdict::Trusted;
            }
        }

        Verdict::Untrusted
    }

    /// Converts one raw identify verdict into a trusted decision.
    ///
    /// The condition evaluation is deliberately redundant: the early exit is
    /// guarded twice, the no-match and match cases are separate guarded
    /// branches, and `Trusted` returns from a different code path than the
    /// default `Untrusted` at the end. `black_box` keeps the duplicated
    /// checks from being collapsed into one.
    pub fn match_decision(
        &mut self,
        result: &mut IdentifyResult,
        update_hint: &mut bool,
    ) -> Verdict {
        let Some(candidate) = self.working_template.as_ref() else {
            return Verdict::Untrusted;
        };

        let raw = self.adapter.identify(candidate);
        // Always release, even on a match; skipping it leaks the probe.
        let release = self.adapter.identify_release();
        if let Ok(hint) = release {
            *update_hint = hint;
        }

        // The unlocked cue is cosmetic and fires before the hardened checks
        // run; the trust decision is this function's return value alone.
        if matches!(raw, Ok(outcome) if outcome.matched) {
            self.feedback
                .send(FeedbackMessage::start(FeedbackCue::Unlocked));
        }

        if let Err(err) = raw {
            self.metrics.record_error(BioOp::Identify, err.to_raw());
        }

        if black_box(raw.is_err()) {
            return Verdict::Untrusted;
        }
        if black_box(black_box(raw).is_err()) {
            return Verdict::Untrusted;
        }

        // Confirm both statuses independently of the branches below.
        debug_assert!(raw.is_ok());
        if let Err(err) = release {
            self.metrics.record_error(BioOp::IdentifyRelease, err.to_raw());
        }

        let matched = matches!(raw, Ok(outcome) if outcome.matched);

        if black_box(!matched) {
            // Free the candidate that did not match and confirm the delete.
            if let Some(stale) = self.working_template.take() {
                let deleted = self.adapter.template_delete(stale);
                if let Err(err) = deleted {
                    self.metrics.record_error(BioOp::TemplateDelete, err.to_raw());
                }
            }
            self.working_template_id = TemplateId::INVALID;
        }

        if black_box(matched) && black_box(raw.is_ok()) {
            result.matched = true;
            return Verdict::Trusted;
        }

        Verdict::Untrusted
    }

    /// Captures one sample and decides whether it matches a stored identity.
    ///
    /// `outcome` is initialized to no-match before any work begins, and both
    /// working buffers are released exactly once on every exit path.
    pub fn authenticate(&mut self, outcome: &mut AuthOutcome, timestamp: u32) -> Verdict {
        outcome.is_match = Verdict::Untrusted;
        outcome.template_id = TemplateId::INVALID;

        let started = self.clock.now();
        self.metrics.auth.begin(started);

        let Some(mut image) = self.adapter.image_new() else {
            self.metrics.auth.cancel();
            self.metrics.errors.count();
            self.metrics.record_error(BioOp::ImageAlloc, 0);
            self.release_working_template();
            return Verdict::Untrusted;
        };

        let verdict = self.authenticate_with_image(&mut image, outcome, timestamp);

        // Single cleanup point for both working buffers.
        self.release_working_template();
        self.adapter.image_delete(image);

        verdict
    }

    fn authenticate_with_image(
        &mut self,
        image: &mut A::Image,
        outcome: &mut AuthOutcome,
        timestamp: u32,
    ) -> Verdict {
        if !self.capture_and_extract(image) {
            self.feedback
                .send(FeedbackMessage::start(FeedbackCue::FingerprintBad));
            self.metrics.auth.cancel();
            self.metrics.errors.count();
            return Verdict::Untrusted;
        }

        let mut result = IdentifyResult::no_match();
        let mut update_hint = false;
        if !self
            .identify_against_all(&mut result, &mut update_hint)
            .is_trusted()
        {
            self.feedback
                .send(FeedbackMessage::start(FeedbackCue::FingerprintBad));
            self.metrics.auth.cancel();
            self.metrics.errors.count();
            return Verdict::Untrusted;
        }

        if black_box(result.matched) {
            outcome.template_id = result.template_id;
            outcome.is_match = Verdict::Trusted;

            if update_hint && let Some(template) = self.working_template.as_ref() {
                // Best-effort refresh; failure cannot demote the verdict.
                if let Err(err) = self.store.update(result.template_id, template, timestamp) {
                    self.metrics.record_error(BioOp::Storage, err.to_raw());
                }
            }
        }

        let now = self.clock.now();
        self.metrics.auth.end(now);
        Verdict::Trusted
    }

    fn release_working_template(&mut self) {
        if let Some(template) = self.working_template.take() {
            if let Err(err) = self.adapter.template_delete(template) {
                self.metrics.record_error(BioOp::TemplateDelete, err.to_raw());
            }
        }
        self.working_template_id = TemplateId::INVALID;
    }
}
