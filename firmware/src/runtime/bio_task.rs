use biometrics_core::session::{AuthOutcome, EnrollStats};
use biometrics_core::telemetry::BioInstant;

use crate::bio::{BioCommand, BioCommandReceiver, BioResponse, BioResponseSender, FirmwareInstant};
use crate::runtime::FirmwareSession;
use crate::status;

#[embassy_executor::task]
pub async fn run(
    mut session: FirmwareSession,
    commands: BioCommandReceiver<'static>,
    responses: BioResponseSender<'static>,
) -> ! {
    loop {
        let request = commands.receive().await;
        status::set_busy(true);

        let queued = FirmwareInstant::now().saturating_duration_since(request.requested_at);
        defmt::debug!(
            "bio: command after {}us in queue",
            u64::try_from(queued.as_micros()).unwrap_or(u64::MAX)
        );

        let response = match request.command {
            BioCommand::Enroll { slot } => {
                defmt::info!("bio: enroll slot={}", slot.as_u8());
                let mut stats = EnrollStats::default();
                if session.enroll(slot, &mut stats) {
                    status::record_enrolled(slot);
                    defmt::info!(
                        "bio: enrolled slot={} pass={} fail={}",
                        slot.as_u8(),
                        stats.pass_count,
                        stats.fail_count
                    );
                    BioResponse::Enrolled { slot, stats }
                } else {
                    status::record_failure();
                    defmt::warn!("bio: enroll failed slot={}", slot.as_u8());
                    BioResponse::EnrollFailed { slot }
                }
            }
            BioCommand::Authenticate { timestamp } => {
                defmt::info!("bio: authenticate");
                let mut outcome = AuthOutcome::no_match();
                if session.authenticate(&mut outcome, timestamp).is_trusted() {
                    status::record_auth_success(outcome.template_id);
                    defmt::info!("bio: matched slot={}", outcome.template_id.as_u8());
                    BioResponse::Authenticated { outcome }
                } else {
                    status::record_failure();
                    defmt::warn!("bio: no match");
                    BioResponse::AuthenticateFailed
                }
            }
        };

        status::set_busy(false);
        responses.send(response).await;
    }
}
