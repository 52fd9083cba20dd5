use alloc::sync::Arc;
use core::sync::atomic::AtomicU64;
use core::sync::atomic::AtomicUsize;
use core::sync::atomic::Ordering::Relaxed;

use kernel_led::Actuator;
use log::info;
use spin::{Mutex, MutexGuard};

use crate::{ConfigError, DataChannel, DeviceConfig, Session, SessionId};

/// The registered character device.
///
/// There is exactly one [`DataChannel`] per device, and every [`Session`]
/// opened on it reads and writes that same channel. The channel lock is the
/// outermost lock; actuation happens while it is held.
pub struct CharDevice {
    config: DeviceConfig,
    channel: Mutex<DataChannel>,
    open_sessions: AtomicUsize,
    next_session: AtomicU64,
}

impl CharDevice {
    /// Creates a device whose writes only land in memory.
    ///
    /// # Errors
    /// Returns an error if `config` is invalid.
    pub fn new(config: DeviceConfig) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;
        let channel = DataChannel::new(config.capacity);
        Ok(Self::register(config, channel))
    }

    /// Creates a device that forwards the first byte of the buffer to
    /// `actuator`.
    ///
    /// # Errors
    /// Returns an error if `config` is invalid.
    pub fn with_actuator(
        config: DeviceConfig,
        actuator: Arc<dyn Actuator>,
    ) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;
        let channel = DataChannel::with_actuator(config.capacity, actuator);
        Ok(Self::register(config, channel))
    }

    fn register(config: DeviceConfig, channel: DataChannel) -> Arc<Self> {
        info!(
            "registered {} ({}), minors {}..{}, {} byte buffer{}",
            config.name,
            config.class,
            config.minor_base,
            config.minor_base.saturating_add(config.minor_count),
            config.capacity,
            if channel.has_actuator() { ", led attached" } else { "" }
        );
        Arc::new(Self {
            config,
            channel: Mutex::new(channel),
            open_sessions: AtomicUsize::new(0),
            next_session: AtomicU64::new(0),
        })
    }

    /// Opens a new session positioned at the start of the buffer.
    #[must_use]
    pub fn open(self: &Arc<Self>) -> Session {
        let id = SessionId::new(self.next_session.fetch_add(1, Relaxed));
        let open = self.open_sessions.fetch_add(1, Relaxed) + 1;
        info!("{} opened session {id} ({open} open)", self.config.name);
        Session::new(id, self.clone())
    }

    pub(crate) fn session_closed(&self, id: SessionId) {
        let open = self.open_sessions.fetch_sub(1, Relaxed) - 1;
        info!("{} closed session {id} ({open} open)", self.config.name);
    }

    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    #[must_use]
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Relaxed)
    }

    /// Locks the shared channel.
    pub fn channel(&self) -> MutexGuard<'_, DataChannel> {
        self.channel.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_release_counts() {
        let device = CharDevice::new(DeviceConfig::default()).unwrap();
        assert_eq!(0, device.open_sessions());

        let first = device.open();
        let second = device.open();
        assert_eq!(2, device.open_sessions());
        assert_ne!(first.id(), second.id());

        first.release();
        assert_eq!(1, device.open_sessions());
        drop(second);
        assert_eq!(0, device.open_sessions());
    }

    #[test]
    fn test_invalid_config() {
        let config = DeviceConfig {
            capacity: 0,
            ..Default::default()
        };
        assert_eq!(Some(ConfigError::ZeroCapacity), CharDevice::new(config).err());
    }
}
