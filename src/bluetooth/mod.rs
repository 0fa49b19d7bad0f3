pub mod adapter;
pub mod connection;
pub mod devices;

pub use adapter::open_default_adapter;
pub use connection::ConnectionHandle;
pub use devices::{list_paired_devices, select_device};
