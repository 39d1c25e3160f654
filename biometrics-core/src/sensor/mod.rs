//! Capability traits over the fingerprint sensor and matching library.
//!
//! The vendor library owns the hardware sensor, the working image buffers,
//! and an internal probe template populated by [`SensorAdapter::extract`].
//! The session layer only ever talks to it through this trait so the
//! enrollment and authentication flows can be exercised against fakes.

use core::time::Duration;

/// Result of querying the sensor for finger presence.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FingerStatus {
    Present,
    NotPresent,
}

/// Status codes surfaced by the sensor and matching primitives.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SensorError {
    /// Catch-all failure reported by the matching library.
    General,
    /// The captured image was unusable (typically a partial print).
    BadImage,
    /// Enrollment has seen too many unusable samples and must abort.
    TooManyBadImages,
    /// Sensor transport or power failure.
    Hardware,
    /// Vendor status code with no dedicated variant.
    Other(u16),
}

impl SensorError {
    const GENERAL_CODE: u16 = 0x0001;
    const BAD_IMAGE_CODE: u16 = 0x0002;
    const TOO_MANY_BAD_IMAGES_CODE: u16 = 0x0003;
    const HARDWARE_CODE: u16 = 0x0004;

    /// Encodes the error into a compact code for telemetry tagging.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            SensorError::General => Self::GENERAL_CODE,
            SensorError::BadImage => Self::BAD_IMAGE_CODE,
            SensorError::TooManyBadImages => Self::TOO_MANY_BAD_IMAGES_CODE,
            SensorError::Hardware => Self::HARDWARE_CODE,
            SensorError::Other(code) => code,
        }
    }

    /// Decodes a compact code, falling back to [`SensorError::Other`].
    #[must_use]
    pub const fn from_raw(code: u16) -> Self {
        match code {
            Self::GENERAL_CODE => SensorError::General,
            Self::BAD_IMAGE_CODE => SensorError::BadImage,
            Self::TOO_MANY_BAD_IMAGES_CODE => SensorError::TooManyBadImages,
            Self::HARDWARE_CODE => SensorError::Hardware,
            other => SensorError::Other(other),
        }
    }
}

/// Raw verdict reported by one identify call.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct IdentifyOutcome {
    /// Whether the probe template matched the supplied candidate.
    pub matched: bool,
}

impl IdentifyOutcome {
    #[must_use]
    pub const fn no_match() -> Self {
        Self { matched: false }
    }

    #[must_use]
    pub const fn matched() -> Self {
        Self { matched: true }
    }
}

/// Abstraction over the sensor hardware and matching primitives.
pub trait SensorAdapter {
    /// Working image buffer owned by the adapter while in flight.
    type Image;
    /// Opaque biometric template blob.
    type Template;

    /// Allocates a working image buffer, or `None` when memory is exhausted.
    fn image_new(&mut self) -> Option<Self::Image>;

    /// Returns a working image buffer to the adapter.
    fn image_delete(&mut self, image: Self::Image);

    /// Captures one frame into `image`. The sensor drops into deep sleep
    /// once the call completes, clean or not.
    fn capture(&mut self, image: &mut Self::Image) -> Result<(), SensorError>;

    /// Extracts features from `image` into the adapter's internal probe
    /// template, consumed by subsequent [`identify`](Self::identify) calls.
    fn extract(&mut self, image: &Self::Image) -> Result<(), SensorError>;

    /// Initializes a fresh enrollment context.
    fn enroll_start(&mut self) -> Result<(), SensorError>;

    /// Feeds one sample into the enrollment context; returns the number of
    /// accepted samples still required.
    fn enroll_step(&mut self, image: &Self::Image) -> Result<u32, SensorError>;

    /// Finalizes the enrollment context into a template. The library may
    /// legitimately report success with no template.
    fn enroll_finish(&mut self) -> Result<Option<Self::Template>, SensorError>;

    /// Matches the internal probe template against one candidate.
    fn identify(&mut self, candidate: &Self::Template) -> Result<IdentifyOutcome, SensorError>;

    /// Releases identify resources. Returns whether the matched candidate
    /// should be refreshed with the newly captured sample.
    fn identify_release(&mut self) -> Result<bool, SensorError>;

    /// Returns a template's backing storage to the adapter.
    fn template_delete(&mut self, template: Self::Template) -> Result<(), SensorError>;

    /// Queries the sensor for finger presence.
    fn finger_status(&mut self) -> Result<FingerStatus, SensorError>;

    /// Arms presence detection and naps the sensor for one poll period.
    fn sensor_sleep(&mut self, poll_period: Duration) -> Result<(), SensorError>;

    /// Blocks until the presence interrupt fires or `timeout` elapses.
    /// `interrupt_driven` is false when polling for finger-up; the hardware
    /// interrupt only fires while a finger is on the sensor.
    fn wait_for_event(&mut self, timeout: Duration, interrupt_driven: bool);

    /// Puts the sensor into its lowest-power state.
    fn deep_sleep(&mut self);
}

/// Sensor adapter that performs no hardware interaction.
///
/// Used at wiring points before a vendor-backed adapter is bound, the same
/// way a disconnected sensor behaves: no finger ever arrives and every
/// capture fails.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopSensorAdapter;

impl NoopSensorAdapter {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SensorAdapter for NoopSensorAdapter {
    type Image = ();
    type Template = ();

    fn image_new(&mut self) -> Option<Self::Image> {
        Some(())
    }

    fn image_delete(&mut self, (): Self::Image) {}

    fn capture(&mut self, _image: &mut Self::Image) -> Result<(), SensorError> {
        Err(SensorError::Hardware)
    }

    fn extract(&mut self, _image: &Self::Image) -> Result<(), SensorError> {
        Err(SensorError::Hardware)
    }

    fn enroll_start(&mut self) -> Result<(), SensorError> {
        Err(SensorError::Hardware)
    }

    fn enroll_step(&mut self, _image: &Self::Image) -> Result<u32, SensorError> {
        Err(SensorError::Hardware)
    }

    fn enroll_finish(&mut self) -> Result<Option<Self::Template>, SensorError> {
        Err(SensorError::Hardware)
    }

    fn identify(&mut self, _candidate: &Self::Template) -> Result<IdentifyOutcome, SensorError> {
        Err(SensorError::Hardware)
    }

    fn identify_release(&mut self) -> Result<bool, SensorError> {
        Err(SensorError::Hardware)
    }

    fn template_delete(&mut self, (): Self::Template) -> Result<(), SensorError> {
        Ok(())
    }

    fn finger_status(&mut self) -> Result<FingerStatus, SensorError> {
        Ok(FingerStatus::NotPresent)
    }

    fn sensor_sleep(&mut self, _poll_period: Duration) -> Result<(), SensorError> {
        Ok(())
    }

    fn wait_for_event(&mut self, _timeout: Duration, _interrupt_driven: bool) {}

    fn deep_sleep(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_error_codes_round_trip() {
        let fixtures = [
            (SensorError::General, 0x0001),
            (SensorError::BadImage, 0x0002),
            (SensorError::TooManyBadImages, 0x0003),
            (SensorError::Hardware, 0x0004),
            (SensorError::Other(0x00A5), 0x00A5),
        ];

        for (error, code) in fixtures {
            assert_eq!(error.to_raw(), code);
            assert_eq!(SensorError::from_raw(code), error);
        }
    }

    #[test]
    fn noop_adapter_reports_no_finger_and_failing_captures() {
        let mut adapter = NoopSensorAdapter::new();
        assert_eq!(adapter.finger_status(), Ok(FingerStatus::NotPresent));

        let mut image = adapter.image_new().expect("noop image");
        assert_eq!(adapter.capture(&mut image), Err(SensorError::Hardware));
        adapter.image_delete(image);
    }
}
