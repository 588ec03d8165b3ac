pub mod backends;
pub mod context;
pub mod device;
pub mod error;
pub mod info;

pub use context::HidContext;
pub use device::HidDevice;
pub use error::{HidError, HidResult};
pub use info::{BusType, DeviceInfo};
