/// Paired device listing and selection
use log::{debug, info};

use crate::error::PainterError;
use crate::models::PairedDevice;

/// All devices bonded with the adapter, sorted by name then address
pub async fn list_paired_devices(
    adapter: &bluer::Adapter,
) -> Result<Vec<PairedDevice>, PainterError> {
    let mut paired = Vec::new();

    for addr in adapter.device_addresses().await? {
        let device = match adapter.device(addr) {
            Ok(device) => device,
            Err(_) => continue,
        };

        match device.is_paired().await {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                debug!("Failed to query pairing state of {}: {}", addr, e);
                continue;
            }
        }

        paired.push(PairedDevice {
            address: addr.to_string().to_uppercase(),
            name: device.name().await.unwrap_or_default(),
        });
    }

    paired.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.address.cmp(&b.address)));
    Ok(paired)
}

/// Pick the device to paint from the paired list
///
/// `query` matches a device name exactly or a MAC address case-insensitively.
/// Without a query the paired devices are logged so the user can choose one.
///
/// # Arguments
/// * `devices` - Paired devices as returned by `list_paired_devices`
/// * `query` - Name or MAC address from `PAINTER_DEVICE`, if set
///
/// # Returns
/// The matching device, or an error naming why none could be chosen
pub fn select_device<'a>(
    devices: &'a [PairedDevice],
    query: Option<&str>,
) -> Result<&'a PairedDevice, PainterError> {
    if devices.is_empty() {
        return Err(PainterError::NoPairedDevices);
    }

    let query = match query {
        Some(query) => query,
        None => {
            info!("Paired devices:");
            for device in devices {
                info!("  {}", device);
            }
            return Err(PainterError::DeviceNotSelected);
        }
    };

    devices
        .iter()
        .find(|d| d.name.as_deref() == Some(query))
        .or_else(|| devices.iter().find(|d| d.address.eq_ignore_ascii_case(query)))
        .ok_or_else(|| PainterError::DeviceNotFound(query.to_string()))
}
