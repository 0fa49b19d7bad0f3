/// Connection to the painted peripheral and its RSSI reads
use futures_util::StreamExt;
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::bluetooth::adapter::keep_rssi_fresh;
use crate::error::PainterError;
use crate::models::{PairedDevice, SignalSample};
use crate::sampler::{ReadFuture, SignalSource};

/// An open link to one peripheral
///
/// Reads fail fast once the handle is closed, either explicitly or because
/// the peripheral dropped the connection.
pub struct ConnectionHandle {
    device: bluer::Device,
    address: String,
    open: Arc<AtomicBool>,
    discovery: JoinHandle<()>,
}

impl ConnectionHandle {
    /// Connect to `target` unless BlueZ already holds a connection to it
    ///
    /// # Arguments
    /// * `adapter` - Powered adapter the device is paired with
    /// * `target` - Device chosen by `select_device`
    ///
    /// # Returns
    /// An open handle with background discovery running, or the BlueZ error
    pub async fn open(
        adapter: &bluer::Adapter,
        target: &PairedDevice,
    ) -> Result<Self, PainterError> {
        let address: bluer::Address = target.address.parse().map_err(|e| {
            PainterError::Config(format!("Invalid device address {}: {}", target.address, e))
        })?;
        let device = adapter.device(address)?;

        if device.is_connected().await? {
            debug!("{} is already connected", target);
        } else {
            info!("Connecting to {}", target);
            device.connect().await?;
        }

        let discovery = keep_rssi_fresh(adapter).await?;

        Ok(ConnectionHandle {
            device,
            address: target.address.clone(),
            open: Arc::new(AtomicBool::new(true)),
            discovery,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            debug!("Closing connection handle for {}", self.address);
        }
        self.discovery.abort();
    }

    /// Resolve once the peripheral reports it is no longer connected, then close the handle
    pub async fn wait_for_disconnect(&self) -> Result<(), PainterError> {
        let events = self.device.events().await?;
        futures_util::pin_mut!(events);

        // The link may have dropped before we subscribed
        if !self.device.is_connected().await? {
            self.close();
            return Ok(());
        }

        while let Some(event) = events.next().await {
            if let bluer::DeviceEvent::PropertyChanged(bluer::DeviceProperty::Connected(false)) =
                event
            {
                break;
            }
        }

        self.close();
        Ok(())
    }
}

impl SignalSource for ConnectionHandle {
    fn read_signal_strength(&self) -> ReadFuture {
        let device = self.device.clone();
        let open = self.open.clone();

        Box::pin(async move {
            if !open.load(Ordering::Acquire) {
                return Err(PainterError::ReadIssue("connection closed".into()));
            }

            match device.rssi().await {
                Ok(Some(rssi)) => Ok(SignalSample(rssi)),
                Ok(None) => Err(PainterError::ReadIssue("no RSSI reported yet".into())),
                Err(e) => Err(PainterError::ReadIssue(e.to_string())),
            }
        })
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.close();
    }
}
