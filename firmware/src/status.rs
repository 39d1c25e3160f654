#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! Lightweight atomics track what the biometric worker is doing so a
//! diagnostics surface can build a [`StatusSnapshot`] without touching
//! shared mutable state directly.

use biometrics_core::storage::TemplateId;
use portable_atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

/// Whether a biometric operation is currently in flight.
static BIO_BUSY: AtomicBool = AtomicBool::new(false);
/// Bitmask of template slots known to hold an enrollment.
static ENROLLED_MASK: AtomicU8 = AtomicU8::new(0);
/// Slot (+1) of the last trusted authentication; 0 == none since boot.
static LAST_AUTH_SLOT: AtomicU8 = AtomicU8::new(0);
/// Failed operations since boot.
static FAILED_OPS: AtomicU32 = AtomicU32::new(0);

/// Point-in-time view of the worker state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusSnapshot {
    pub busy: bool,
    pub enrolled_mask: u8,
    pub last_auth_slot: Option<TemplateId>,
    pub failed_ops: u32,
}

/// Marks the worker busy or idle.
pub fn set_busy(busy: bool) {
    BIO_BUSY.store(busy, Ordering::Relaxed);
}

/// Records a completed enrollment at `slot`.
pub fn record_enrolled(slot: TemplateId) {
    if slot.as_u8() < 8 {
        ENROLLED_MASK.fetch_or(1 << slot.as_u8(), Ordering::Relaxed);
    }
}

/// Records the slot of a trusted authentication.
pub fn record_auth_success(slot: TemplateId) {
    LAST_AUTH_SLOT.store(slot.as_u8().wrapping_add(1), Ordering::Relaxed);
}

/// Counts one failed enrollment or authentication.
pub fn record_failure() {
    FAILED_OPS.fetch_add(1, Ordering::Relaxed);
}

/// Builds a [`StatusSnapshot`] from the stored state.
pub fn snapshot() -> StatusSnapshot {
    let last = LAST_AUTH_SLOT.load(Ordering::Relaxed);
    StatusSnapshot {
        busy: BIO_BUSY.load(Ordering::Relaxed),
        enrolled_mask: ENROLLED_MASK.load(Ordering::Relaxed),
        last_auth_slot: if last == 0 {
            None
        } else {
            Some(TemplateId::new(last - 1))
        },
        failed_ops: FAILED_OPS.load(Ordering::Relaxed),
    }
}
