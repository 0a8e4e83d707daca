//! Enum wrapper for device channel dispatch.
//!
//! [`DeviceChannel`] uses return-position `impl Future`, so it cannot be
//! used as a trait object. [`AnyDeviceChannel`] gives the sensor manager a
//! single concrete type that covers both real and mock channels.
//!
//! # Examples
//!
//! ```
//! use sensord_hardware::devices::AnyDeviceChannel;
//! use sensord_hardware::mock::MockChannel;
//!
//! let (channel, _handle) = MockChannel::new("/sys/class/hwmon/hwmon0/in1_input");
//! let any_channel = AnyDeviceChannel::Mock(channel);
//! ```

use std::path::Path;

use crate::Result;
use crate::mock::MockChannel;
use crate::sysfs::SysfsChannel;
use crate::traits::DeviceChannel;

#[derive(Debug)]
#[non_exhaustive]
pub enum AnyDeviceChannel {
    /// hwmon attribute file.
    Sysfs(SysfsChannel),

    /// Scripted channel for development and testing.
    Mock(MockChannel),
}

impl From<SysfsChannel> for AnyDeviceChannel {
    fn from(channel: SysfsChannel) -> Self {
        Self::Sysfs(channel)
    }
}

impl From<MockChannel> for AnyDeviceChannel {
    fn from(channel: MockChannel) -> Self {
        Self::Mock(channel)
    }
}

impl DeviceChannel for AnyDeviceChannel {
    fn path(&self) -> &Path {
        match self {
            Self::Sysfs(channel) => channel.path(),
            Self::Mock(channel) => channel.path(),
        }
    }

    async fn open(&mut self) -> Result<()> {
        match self {
            Self::Sysfs(channel) => channel.open().await,
            Self::Mock(channel) => channel.open().await,
        }
    }

    async fn read_record(&mut self) -> Result<String> {
        match self {
            Self::Sysfs(channel) => channel.read_record().await,
            Self::Mock(channel) => channel.read_record().await,
        }
    }

    fn close(&mut self) {
        match self {
            Self::Sysfs(channel) => channel.close(),
            Self::Mock(channel) => channel.close(),
        }
    }

    fn invalidate(&mut self) {
        match self {
            Self::Sysfs(channel) => channel.invalidate(),
            Self::Mock(channel) => channel.invalidate(),
        }
    }

    fn is_open(&self) -> bool {
        match self {
            Self::Sysfs(channel) => channel.is_open(),
            Self::Mock(channel) => channel.is_open(),
        }
    }
}
