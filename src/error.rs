/// Error type shared by the painter's modules
use thiserror::Error;

/// Everything that can go wrong while painting.
///
/// Only `Bluetooth`, `Config` and the device selection variants ever reach
/// `main`. `InvalidRange`, `BoundOutOfRange` and `ReadIssue` are recovered
/// where they occur.
#[derive(Debug, Error)]
pub enum PainterError {
    /// Near and far bounds coincide, so the mapping would divide by zero
    #[error("Invalid signal range: near and far bound are both {0}")]
    InvalidRange(i32),

    #[error("Signal bound {0} is outside 0..=127 dBm")]
    BoundOutOfRange(i32),

    /// A read could not be issued against the connection handle
    #[error("Signal read could not be issued: {0}")]
    ReadIssue(String),

    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] bluer::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No paired Bluetooth devices. Pair a device with bluetoothctl and try again")]
    NoPairedDevices,

    #[error("No paired device matches '{0}'")]
    DeviceNotFound(String),

    #[error("No device selected. Set PAINTER_DEVICE to one of the paired devices")]
    DeviceNotSelected,

    #[error("Could not connect to {address} after {attempts} attempts")]
    ConnectFailed { address: String, attempts: u32 },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
