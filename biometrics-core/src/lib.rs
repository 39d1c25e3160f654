#![no_std]

// Portable control logic for fingerprint enrollment and authentication.
//
// This crate stays independent of any particular MCU or vendor matching
// library by expressing the sensor, template storage, feedback, and timing
// collaborators as narrow traits. The firmware crate binds them to real
// hardware; host tests bind them to scripted fakes.

pub mod config;
pub mod feedback;
pub mod sensor;
pub mod session;
pub mod storage;
pub mod telemetry;
