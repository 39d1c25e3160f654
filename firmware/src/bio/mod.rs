#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Biometric control surface bridging firmware tasks with `biometrics-core`.
//!
//! The worker task owns the session and consumes commands from a bounded
//! channel, so at most one biometric operation is ever in flight.

use core::time::Duration;

use biometrics_core::session::{AuthOutcome, EnrollStats};
use biometrics_core::storage::TemplateId;
use biometrics_core::telemetry::{BioInstant, Clock};
#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_time::Instant;

/// Depth of the command queue shared between producers and the worker.
pub const COMMAND_QUEUE_DEPTH: usize = 4;

#[cfg(target_os = "none")]
type BioMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
type BioMutex = NoopRawMutex;

/// Monotonic instant backed by the Embassy time driver.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FirmwareInstant(Instant);

impl FirmwareInstant {
    /// Captures the current instant.
    pub fn now() -> Self {
        Self(Instant::now())
    }

    /// Unwraps the underlying Embassy instant.
    pub fn into_embassy(self) -> Instant {
        self.0
    }
}

impl From<Instant> for FirmwareInstant {
    fn from(instant: Instant) -> Self {
        Self(instant)
    }
}

impl BioInstant for FirmwareInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_micros(self.0.saturating_duration_since(earlier.0).as_micros())
    }
}

/// Clock handing Embassy instants to the portable session.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Instant = FirmwareInstant;

    fn now(&mut self) -> FirmwareInstant {
        FirmwareInstant::now()
    }
}

/// Commands accepted by the biometric worker task.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BioCommand {
    /// Enroll a new finger into `slot`.
    Enroll { slot: TemplateId },
    /// Capture one sample and match it against every stored template.
    /// `timestamp` tags a template refresh, should the matcher request one.
    Authenticate { timestamp: u32 },
}

/// Command stamped with the instant it was queued, so the worker can
/// report how long requests sit behind the operation in flight.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BioRequest {
    pub command: BioCommand,
    pub requested_at: FirmwareInstant,
}

impl BioRequest {
    /// Stamps `command` with the current instant.
    pub fn new(command: BioCommand) -> Self {
        Self {
            command,
            requested_at: FirmwareInstant::now(),
        }
    }
}

/// Replies emitted by the worker, one per command.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BioResponse {
    Enrolled { slot: TemplateId, stats: EnrollStats },
    EnrollFailed { slot: TemplateId },
    Authenticated { outcome: AuthOutcome },
    AuthenticateFailed,
}

impl BioResponse {
    /// Short name for the reply path logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            BioResponse::Enrolled { .. } => "enrolled",
            BioResponse::EnrollFailed { .. } => "enroll failed",
            BioResponse::Authenticated { .. } => "authenticated",
            BioResponse::AuthenticateFailed => "authenticate failed",
        }
    }
}

/// Queue carrying commands to the biometric worker.
pub type BioCommandQueue = Channel<BioMutex, BioRequest, COMMAND_QUEUE_DEPTH>;
pub type BioCommandSender<'a> = Sender<'a, BioMutex, BioRequest, COMMAND_QUEUE_DEPTH>;
pub type BioCommandReceiver<'a> = Receiver<'a, BioMutex, BioRequest, COMMAND_QUEUE_DEPTH>;

/// Queue carrying worker replies back to the requester.
pub type BioResponseQueue = Channel<BioMutex, BioResponse, COMMAND_QUEUE_DEPTH>;
pub type BioResponseSender<'a> = Sender<'a, BioMutex, BioResponse, COMMAND_QUEUE_DEPTH>;
pub type BioResponseReceiver<'a> = Receiver<'a, BioMutex, BioResponse, COMMAND_QUEUE_DEPTH>;
