#![allow(dead_code)]

//! Scripted fakes backing the host-side workflow tests.
//!
//! The fake sensor pops per-operation scripts and falls back to permissive
//! defaults, so each test only scripts the calls it cares about. Time is a
//! shared microsecond counter advanced by the sensor nap calls, which keeps
//! timeout behavior fully deterministic.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use core::time::Duration;

use biometrics_core::config::BioConfig;
use biometrics_core::feedback::{FeedbackMessage, FeedbackSink};
use biometrics_core::sensor::{FingerStatus, IdentifyOutcome, SensorAdapter, SensorError};
use biometrics_core::session::BioSession;
use biometrics_core::storage::RamTemplateStore;
use biometrics_core::telemetry::{BioInstant, Clock};

pub const TEST_SLOTS: usize = 3;

/// Template payload handed out by [`FakeSensor::enroll_finish`] by default.
pub const FAKE_TEMPLATE: u32 = 0xBEE5;

pub type FakeTemplate = u32;
pub type TestStore = RamTemplateStore<FakeTemplate, TEST_SLOTS>;
pub type TestSession = BioSession<FakeSensor, TestStore, RecordingFeedback, TestClock>;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TestInstant(u64);

impl BioInstant for TestInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}

#[derive(Clone, Default)]
pub struct TestClock {
    time: Rc<Cell<u64>>,
}

impl Clock for TestClock {
    type Instant = TestInstant;

    fn now(&mut self) -> TestInstant {
        TestInstant(self.time.get())
    }
}

/// Queued responses for the fake sensor, consumed front to back.
#[derive(Default)]
pub struct SensorScript {
    pub finger: VecDeque<Result<FingerStatus, SensorError>>,
    /// Used once `finger` runs dry. `None` alternates present/not-present,
    /// which lets finger-down and finger-up waits both complete in one poll.
    pub finger_default: Option<FingerStatus>,
    pub capture: VecDeque<Result<(), SensorError>>,
    pub extract: VecDeque<Result<(), SensorError>>,
    pub enroll_start: VecDeque<Result<(), SensorError>>,
    pub enroll_step: VecDeque<Result<u32, SensorError>>,
    pub enroll_finish: VecDeque<Result<Option<FakeTemplate>, SensorError>>,
    pub identify: VecDeque<Result<IdentifyOutcome, SensorError>>,
    pub identify_release: VecDeque<Result<bool, SensorError>>,
}

/// Scripted stand-in for the vendor sensor library.
pub struct FakeSensor {
    time: Rc<Cell<u64>>,
    pub script: SensorScript,
    finger_down: bool,
    /// Remaining successful image allocations; `None` is unlimited.
    pub image_budget: Option<u32>,
    pub images_created: u32,
    pub images_deleted: u32,
    pub templates_deleted: u32,
    pub deep_sleeps: u32,
    pub capture_calls: u32,
    pub extract_calls: u32,
    pub enroll_start_calls: u32,
    pub enroll_step_calls: u32,
    pub enroll_finish_calls: u32,
    pub identify_calls: u32,
    pub release_calls: u32,
    pub finger_queries: u32,
}

impl FakeSensor {
    pub fn new(time: Rc<Cell<u64>>, script: SensorScript) -> Self {
        Self {
            time,
            script,
            finger_down: false,
            image_budget: None,
            images_created: 0,
            images_deleted: 0,
            templates_deleted: 0,
            deep_sleeps: 0,
            capture_calls: 0,
            extract_calls: 0,
            enroll_start_calls: 0,
            enroll_finish_calls: 0,
            enroll_step_calls: 0,
            identify_calls: 0,
            release_calls: 0,
            finger_queries: 0,
        }
    }
}

impl SensorAdapter for FakeSensor {
    type Image = u32;
    type Template = FakeTemplate;

    fn image_new(&mut self) -> Option<Self::Image> {
        if let Some(budget) = self.image_budget.as_mut() {
            if *budget == 0 {
                return None;
            }
            *budget -= 1;
        }
        self.images_created += 1;
        Some(self.images_created)
    }

    fn image_delete(&mut self, _image: Self::Image) {
        self.images_deleted += 1;
    }

    fn capture(&mut self, _image: &mut Self::Image) -> Result<(), SensorError> {
        self.capture_calls += 1;
        self.script.capture.pop_front().unwrap_or(Ok(()))
    }

    fn extract(&mut self, _image: &Self::Image) -> Result<(), SensorError> {
        self.extract_calls += 1;
        self.script.extract.pop_front().unwrap_or(Ok(()))
    }

    fn enroll_start(&mut self) -> Result<(), SensorError> {
        self.enroll_start_calls += 1;
        self.script.enroll_start.pop_front().unwrap_or(Ok(()))
    }

    fn enroll_step(&mut self, _image: &Self::Image) -> Result<u32, SensorError> {
        self.enroll_step_calls += 1;
        self.script.enroll_step.pop_front().unwrap_or(Ok(0))
    }

    fn enroll_finish(&mut self) -> Result<Option<Self::Template>, SensorError> {
        self.enroll_finish_calls += 1;
        self.script
            .enroll_finish
            .pop_front()
            .unwrap_or(Ok(Some(FAKE_TEMPLATE)))
    }

    fn identify(&mut self, _candidate: &Self::Template) -> Result<IdentifyOutcome, SensorError> {
        self.identify_calls += 1;
        self.script
            .identify
            .pop_front()
            .unwrap_or(Ok(IdentifyOutcome::no_match()))
    }

    fn identify_release(&mut self) -> Result<bool, SensorError> {
        self.release_calls += 1;
        self.script.identify_release.pop_front().unwrap_or(Ok(false))
    }

    fn template_delete(&mut self, _template: Self::Template) -> Result<(), SensorError> {
        self.templates_deleted += 1;
        Ok(())
    }

    fn finger_status(&mut self) -> Result<FingerStatus, SensorError> {
        self.finger_queries += 1;
        if let Some(scripted) = self.script.finger.pop_front() {
            return scripted;
        }
        if let Some(default) = self.script.finger_default {
            return Ok(default);
        }
        self.finger_down = !self.finger_down;
        Ok(if self.finger_down {
            FingerStatus::Present
        } else {
            FingerStatus::NotPresent
        })
    }

    fn sensor_sleep(&mut self, poll_period: Duration) -> Result<(), SensorError> {
        let micros = u64::try_from(poll_period.as_micros()).unwrap_or(u64::MAX);
        self.time.set(self.time.get().saturating_add(micros));
        Ok(())
    }

    fn wait_for_event(&mut self, _timeout: Duration, _interrupt_driven: bool) {}

    fn deep_sleep(&mut self) {
        self.deep_sleeps += 1;
    }
}

/// Feedback sink that appends every message to a shared log.
pub struct RecordingFeedback {
    pub messages: Rc<RefCell<Vec<FeedbackMessage>>>,
}

impl FeedbackSink for RecordingFeedback {
    fn send(&mut self, message: FeedbackMessage) {
        self.messages.borrow_mut().push(message);
    }
}

/// A session wired to scripted fakes plus handles to their shared state.
pub struct Rig {
    pub session: TestSession,
    pub feedback: Rc<RefCell<Vec<FeedbackMessage>>>,
    pub time: Rc<Cell<u64>>,
}

impl Rig {
    /// Count of feedback messages equal to `wanted`.
    pub fn cue_count(&self, wanted: &FeedbackMessage) -> usize {
        self.feedback
            .borrow()
            .iter()
            .filter(|message| *message == wanted)
            .count()
    }
}

/// Configuration with tight timeouts so timeout tests stay fast.
pub fn test_config() -> BioConfig {
    BioConfig {
        sensor_poll_period: Duration::from_millis(4),
        finger_detect_timeout: Duration::from_millis(100),
        ..BioConfig::default()
    }
    .with_finger_up_timeout(Duration::from_millis(200))
}

pub fn rig_with(config: BioConfig, script: SensorScript) -> Rig {
    let time = Rc::new(Cell::new(0));
    let feedback = Rc::new(RefCell::new(Vec::new()));
    let sensor = FakeSensor::new(Rc::clone(&time), script);
    let session = BioSession::new(
        config,
        sensor,
        TestStore::new(),
        RecordingFeedback {
            messages: Rc::clone(&feedback),
        },
        TestClock {
            time: Rc::clone(&time),
        },
    );

    Rig {
        session,
        feedback,
        time,
    }
}

pub fn rig(script: SensorScript) -> Rig {
    rig_with(test_config(), script)
}
