//! Tuning parameters consumed by the biometric session.
//!
//! The original firmware kept these in a process-wide mutable bundle; here
//! they are an explicit configuration object constructed once at startup and
//! handed to [`BioSession`](crate::session::BioSession). Nothing in the core
//! mutates them mid-operation.

use core::time::Duration;

use crate::storage::TemplateId;

/// Interval the sensor naps between presence polls.
pub const DEFAULT_SENSOR_POLL_PERIOD: Duration = Duration::from_millis(4);
/// How long a capture waits for a finger before giving up.
pub const DEFAULT_FINGER_DETECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Attempts allowed for one clean image capture.
pub const DEFAULT_CAPTURE_TRIES: u32 = 4;
/// Outer retry budget for one enrollment.
pub const DEFAULT_ENROLL_TRIES: u32 = 4;
/// Accepted samples required to finish an enrollment.
pub const DEFAULT_REQUIRED_SAMPLES: u32 = 4;
/// Highest valid template slot index (inclusive).
pub const DEFAULT_TEMPLATE_SLOT_MAX: u8 = 2;

/// Externally supplied tuning constants for the biometric workflows.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BioConfig {
    /// Sensor nap interval between finger-presence polls.
    pub sensor_poll_period: Duration,
    /// Bound on each wait for a finger to arrive on the sensor.
    pub finger_detect_timeout: Duration,
    /// Bound on the between-sample finger-up wait during enrollment.
    /// `None` waits indefinitely, which is the production behavior; dev and
    /// test builds set a finite bound so a stuck rig cannot hang forever.
    pub finger_up_timeout: Option<Duration>,
    /// Attempts allowed per [`capture_image`](crate::session::BioSession::capture_image) call.
    pub capture_tries: u32,
    /// Outer retry budget for one enrollment run.
    pub enroll_tries: u32,
    /// Accepted samples the algorithm needs before enrollment can finish.
    pub required_samples: u32,
    /// Highest valid template slot index, inclusive.
    pub template_slot_max: u8,
}

impl BioConfig {
    /// Returns `true` when `id` addresses a valid template slot.
    #[must_use]
    pub fn slot_is_valid(&self, id: TemplateId) -> bool {
        id.as_u8() <= self.template_slot_max
    }

    /// Number of template slots covered by the valid range.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        usize::from(self.template_slot_max) + 1
    }

    /// Configuration variant for dev/test builds with a bounded finger-up
    /// wait, keeping enrollment from blocking forever on a stuck sensor.
    #[must_use]
    pub const fn with_finger_up_timeout(mut self, timeout: Duration) -> Self {
        self.finger_up_timeout = Some(timeout);
        self
    }
}

impl Default for BioConfig {
    fn default() -> Self {
        Self {
            sensor_poll_period: DEFAULT_SENSOR_POLL_PERIOD,
            finger_detect_timeout: DEFAULT_FINGER_DETECT_TIMEOUT,
            finger_up_timeout: None,
            capture_tries: DEFAULT_CAPTURE_TRIES,
            enroll_tries: DEFAULT_ENROLL_TRIES,
            required_samples: DEFAULT_REQUIRED_SAMPLES,
            template_slot_max: DEFAULT_TEMPLATE_SLOT_MAX,
        }
    }
}
