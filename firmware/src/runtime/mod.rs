use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_sync::channel::Channel;

use biometrics_core::config::BioConfig;
use biometrics_core::sensor::NoopSensorAdapter;
use biometrics_core::session::BioSession;
use biometrics_core::storage::RamTemplateStore;

use crate::bio::{self, SystemClock};
use crate::feedback::{self, ChannelFeedbackSink};

mod bio_task;
mod led_task;
mod link_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) static COMMAND_QUEUE: bio::BioCommandQueue = Channel::new();
/// Worker replies, drained by the link task.
pub(super) static RESPONSE_QUEUE: bio::BioResponseQueue = Channel::new();
pub(super) static FEEDBACK_QUEUE: feedback::FeedbackQueue = Channel::new();

/// Template slots held in RAM until the flash-backed store is wired in.
const RAM_SLOTS: usize = 3;

/// Session wiring used by the worker task. The no-op adapter stands in for
/// the vendor matching library until its bindings land.
pub(super) type FirmwareSession = BioSession<
    NoopSensorAdapter,
    RamTemplateStore<(), RAM_SLOTS>,
    ChannelFeedbackSink,
    SystemClock,
>;

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let _peripherals = hal::init(config);

    let session = FirmwareSession::new(
        BioConfig::default(),
        NoopSensorAdapter::new(),
        RamTemplateStore::new(),
        ChannelFeedbackSink::new(FEEDBACK_QUEUE.sender()),
        SystemClock,
    );

    spawner
        .spawn(bio_task::run(
            session,
            COMMAND_QUEUE.receiver(),
            RESPONSE_QUEUE.sender(),
        ))
        .expect("failed to spawn biometric worker task");

    spawner
        .spawn(led_task::run(FEEDBACK_QUEUE.receiver()))
        .expect("failed to spawn LED task");

    spawner
        .spawn(link_task::run(RESPONSE_QUEUE.receiver()))
        .expect("failed to spawn link task");

    core::future::pending::<()>().await;
}
