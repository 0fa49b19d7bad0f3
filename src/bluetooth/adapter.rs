/// Bluetooth adapter bring-up and background discovery
use futures_util::StreamExt;
use log::{error, info, trace, warn};
use tokio::task::JoinHandle;

use crate::error::PainterError;

/// Open a BlueZ session and power on its default adapter
///
/// The session is returned alongside the adapter and must be kept alive for
/// as long as the adapter is used.
pub async fn open_default_adapter() -> Result<(bluer::Session, bluer::Adapter), PainterError> {
    // Initialize Bluetooth session
    let session = match bluer::Session::new().await {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to create Bluetooth session: {}", e);
            return Err(e.into());
        }
    };

    let adapter = match session.default_adapter().await {
        Ok(adapter) => adapter,
        Err(e) => {
            error!("Failed to get default Bluetooth adapter: {}", e);
            return Err(e.into());
        }
    };

    // Ensure Bluetooth adapter is powered on
    if !adapter.is_powered().await? {
        info!("Powering on adapter {}", adapter.name());
        adapter.set_powered(true).await?;
    }

    Ok((session, adapter))
}

/// Run discovery in the background so BlueZ keeps refreshing the RSSI of nearby devices
///
/// Every advertisement is reported, not only the first one per device.
/// Aborting the returned task ends discovery.
pub async fn keep_rssi_fresh(adapter: &bluer::Adapter) -> Result<JoinHandle<()>, PainterError> {
    let filter = bluer::DiscoveryFilter {
        transport: bluer::DiscoveryTransport::Auto,
        duplicate_data: true,
        ..Default::default()
    };

    // Apply the discovery filter (warn if it fails, but continue)
    if let Err(e) = adapter.set_discovery_filter(filter).await {
        warn!("Failed to set discovery filter: {}", e);
    }

    let events = adapter.discover_devices_with_changes().await?;
    Ok(tokio::spawn(async move {
        futures_util::pin_mut!(events);
        while let Some(event) = events.next().await {
            trace!("Discovery event: {:?}", event);
        }
    }))
}
