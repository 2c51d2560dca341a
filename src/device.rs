//! Device selection logic.

use bpaf::Bpaf;
use ct0045r::{Ct0045r, SessionConfig, INFO as CT0045R_INFO};
use wctablet_core::{DeviceError, DeviceInfo, SerialDevice, Timer};

/// Supported device types
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Bpaf)]
#[bpaf(fallback(DeviceKind::Ct0045r), group_help("Device selection:"))]
pub enum DeviceKind {
    /// Wacom PenPartner CT-0045R (default)
    #[default]
    Ct0045r,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.info().cli_name)
    }
}

impl DeviceKind {
    pub fn info(&self) -> &'static DeviceInfo {
        match self {
            DeviceKind::Ct0045r => &CT0045R_INFO,
        }
    }

    /// Power up the selected device, driven by `timer`
    pub fn open<T: Timer + 'static>(
        &self,
        config: SessionConfig,
        timer: T,
    ) -> Result<Box<dyn SerialDevice>, DeviceError> {
        match self {
            DeviceKind::Ct0045r => Ok(Box::new(Ct0045r::open(config, timer)?)),
        }
    }
}
