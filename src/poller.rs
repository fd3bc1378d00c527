use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use crate::api::NovaClient;
use crate::envelope::ExternalStatus;
use crate::tui::AppEvent;

/// Map a status fetch outcome to what the sidebar shows. A failed fetch
/// reads as everything offline rather than stale or blank.
pub fn status_or_offline(result: anyhow::Result<ExternalStatus>) -> ExternalStatus {
    result.unwrap_or_else(|_| ExternalStatus::all_offline())
}

/// Periodic external-service status refresh. Fetches once immediately, then
/// on the configured interval, posting each reading into the app event
/// channel. Runs until the channel closes.
pub fn spawn(client: NovaClient, interval_secs: u64, tx: UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            let status = status_or_offline(client.external_status().await);
            if tx.send(AppEvent::Status(status)).is_err() {
                break;
            }
        }
    });
}

/// One-shot refresh outside the regular interval (after API key changes).
pub fn refresh_once(client: NovaClient, tx: UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let status = status_or_offline(client.external_status().await);
        let _ = tx.send(AppEvent::Status(status));
    });
}
