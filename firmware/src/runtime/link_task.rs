use crate::bio::BioResponseReceiver;
use crate::status;

/// Drains worker replies so the worker never blocks on a full reply queue.
///
/// This task holds the receiver end of the reply channel; the host command
/// link will take over both ends when it lands. Until then each reply is
/// logged along with a status snapshot.
#[embassy_executor::task]
pub async fn run(responses: BioResponseReceiver<'static>) -> ! {
    loop {
        let response = responses.receive().await;
        let status = status::snapshot();
        defmt::info!(
            "link: {} (enrolled=0x{:02x} failures={})",
            response.label(),
            status.enrolled_mask,
            status.failed_ops
        );
    }
}
