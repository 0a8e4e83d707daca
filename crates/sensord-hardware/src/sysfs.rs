//! Device channel backed by a sysfs/hwmon attribute file.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::trace;

use crate::error::{HardwareError, Result};
use crate::traits::DeviceChannel;

#[derive(Debug)]
enum Handle {
    Open(BufReader<File>),
    Closed,
    Invalidated,
}

/// Channel reading a raw hwmon value file such as `in1_input`.
///
/// hwmon attributes report their value once per open, so the sampling
/// loop closes and reopens the file before every read.
///
/// # Examples
///
/// ```no_run
/// use sensord_hardware::{DeviceChannel, SysfsChannel};
///
/// # async fn example() -> sensord_hardware::Result<()> {
/// let mut channel = SysfsChannel::open_path("/sys/class/hwmon/hwmon1/in1_input").await;
/// let record = channel.read_record().await?;
/// println!("raw: {}", record.trim());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SysfsChannel {
    path: PathBuf,
    handle: Handle,
}

impl SysfsChannel {
    /// Create a closed channel for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            handle: Handle::Closed,
        }
    }

    /// Create a channel and try to open it right away.
    ///
    /// A failed open is not an error here: the channel stays closed and the
    /// first read reports the fault like any later cycle would.
    pub async fn open_path(path: impl Into<PathBuf>) -> Self {
        let mut channel = Self::new(path);
        if let Err(e) = channel.open().await {
            trace!(path = %channel.path.display(), error = %e, "Initial open failed");
        }
        channel
    }

    fn device(&self) -> String {
        self.path.display().to_string()
    }
}

impl DeviceChannel for SysfsChannel {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&mut self) -> Result<()> {
        if matches!(self.handle, Handle::Invalidated) {
            return Err(HardwareError::invalidated(self.device()));
        }
        self.handle = Handle::Closed;
        let file = File::open(&self.path).await?;
        self.handle = Handle::Open(BufReader::new(file));
        Ok(())
    }

    async fn read_record(&mut self) -> Result<String> {
        let device = self.device();
        match &mut self.handle {
            Handle::Invalidated => Err(HardwareError::invalidated(device)),
            Handle::Closed => Err(HardwareError::disconnected(device)),
            Handle::Open(reader) => {
                let mut line = String::new();
                reader.read_line(&mut line).await?;
                Ok(line)
            }
        }
    }

    fn close(&mut self) {
        if matches!(self.handle, Handle::Open(_)) {
            self.handle = Handle::Closed;
        }
    }

    fn invalidate(&mut self) {
        self.handle = Handle::Invalidated;
    }

    fn is_open(&self) -> bool {
        matches!(self.handle, Handle::Open(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn value_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[tokio::test]
    async fn test_reads_one_record() {
        let file = value_file("45000\n12\n");
        let mut channel = SysfsChannel::open_path(file.path()).await;

        assert!(channel.is_open());
        assert_eq!(channel.read_record().await.unwrap(), "45000\n");
    }

    #[tokio::test]
    async fn test_reopen_sees_new_contents() {
        let file = value_file("1000\n");
        let mut channel = SysfsChannel::open_path(file.path()).await;
        assert_eq!(channel.read_record().await.unwrap(), "1000\n");

        std::fs::write(file.path(), "2000\n").unwrap();
        channel.close();
        channel.open().await.unwrap();

        assert_eq!(channel.read_record().await.unwrap(), "2000\n");
    }

    #[tokio::test]
    async fn test_missing_file_stays_closed() {
        let dir = tempfile::tempdir().unwrap();
        let mut channel = SysfsChannel::open_path(dir.path().join("in9_input")).await;

        assert!(!channel.is_open());
        let err = channel.read_record().await.unwrap_err();
        assert!(matches!(err, HardwareError::Disconnected { .. }));
    }

    #[tokio::test]
    async fn test_failed_reopen_drops_old_handle() {
        let file = value_file("1000\n");
        let path = file.path().to_path_buf();
        let mut channel = SysfsChannel::open_path(&path).await;

        drop(file);
        channel.close();
        assert!(channel.open().await.is_err());
        assert!(!channel.is_open());
    }

    #[tokio::test]
    async fn test_invalidate_is_terminal() {
        let file = value_file("1000\n");
        let mut channel = SysfsChannel::open_path(file.path()).await;

        channel.invalidate();
        assert!(!channel.is_open());
        assert!(channel.read_record().await.unwrap_err().is_invalidated());
        assert!(channel.open().await.unwrap_err().is_invalidated());
    }
}
