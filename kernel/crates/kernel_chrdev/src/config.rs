use alloc::string::String;

use kernel_led::PinConfig;

use crate::ConfigError;

pub const DEVICE_NAME: &str = "chrdev-led";
pub const CLASS_NAME: &str = "chrdev-led-class";
pub const DEFAULT_CAPACITY: usize = 1024;

/// Everything that is fixed when the device is registered.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeviceConfig {
    pub name: String,
    pub class: String,
    pub minor_base: u32,
    pub minor_count: u32,
    pub capacity: usize,
    pub pin: PinConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: String::from(DEVICE_NAME),
            class: String::from(CLASS_NAME),
            minor_base: 0,
            minor_count: 1,
            capacity: DEFAULT_CAPACITY,
            pin: PinConfig::default(),
        }
    }
}

impl DeviceConfig {
    /// # Errors
    /// Returns an error if the buffer would be empty or too large to report
    /// through the control interface, or if no minor numbers are reserved.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if i32::try_from(self.capacity).is_err() {
            return Err(ConfigError::CapacityTooLarge(self.capacity));
        }
        if self.minor_count == 0 {
            return Err(ConfigError::NoMinors);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = DeviceConfig::default();
        assert_eq!(Ok(()), config.validate());
        assert_eq!(1024, config.capacity);
        assert_eq!("chrdev-led", config.name);
    }

    #[test]
    fn test_invalid_configs() {
        let config = DeviceConfig {
            capacity: 0,
            ..Default::default()
        };
        assert_eq!(Err(ConfigError::ZeroCapacity), config.validate());

        let config = DeviceConfig {
            capacity: i32::MAX as usize + 1,
            ..Default::default()
        };
        assert_eq!(
            Err(ConfigError::CapacityTooLarge(i32::MAX as usize + 1)),
            config.validate()
        );

        let config = DeviceConfig {
            minor_count: 0,
            ..Default::default()
        };
        assert_eq!(Err(ConfigError::NoMinors), config.validate());
    }
}
