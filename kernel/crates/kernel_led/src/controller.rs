use alloc::sync::Arc;

use kernel_mmio::{Field, IoMapper, RegisterAddressTable, RegisterRole, RegisterSet};
use log::{debug, error, info};
use spin::Mutex;

use crate::{Actuator, ActuatorError, Level};

const PINS_PER_PORT: u8 = 16;

const MODE_GENERAL_OUTPUT: u32 = 0b01;
const OUTPUT_PUSH_PULL: u32 = 0b0;
const SPEED_HIGH: u32 = 0b10;
const PULL_UP: u32 = 0b01;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PinConfig {
    /// Pin number inside the GPIO port, `0..16`.
    pub pin: u8,
    /// Bit in the clock enable register that gates the GPIO port.
    pub clock_bit: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            pin: 0,
            clock_bit: 8,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ActuatorState {
    Uninitialized,
    Configured,
    Active(Level),
}

/// Drives one GPIO pin wired to an LED.
///
/// Every register sequence, from the configuration in
/// [`initialize`](Self::initialize) to a single [`set_level`](Self::set_level),
/// runs with the controller's lock held, so read-modify-write cycles from
/// different callers never interleave.
///
/// # Wiring
/// The LED is **active low**: it lights up when the line is pulled low.
/// [`Level::On`] therefore writes the *reset* half of the bit set/reset
/// register (bit `16 + pin`) and [`Level::Off`] writes the *set* half
/// (bit `pin`). Swapping the two would invert the LED.
pub struct ActuatorController {
    pin: u8,
    clock_bit: u8,
    inner: Mutex<Inner>,
}

struct Inner {
    state: ActuatorState,
    registers: Option<RegisterSet>,
}

impl ActuatorController {
    /// # Errors
    /// Returns an error if the pin or the clock bit do not fit the port.
    pub fn new(config: PinConfig) -> Result<Self, ActuatorError> {
        if config.pin >= PINS_PER_PORT {
            return Err(ActuatorError::InvalidPin(config.pin));
        }
        if config.clock_bit >= 32 {
            return Err(ActuatorError::InvalidClockBit(config.clock_bit));
        }
        Ok(Self {
            pin: config.pin,
            clock_bit: config.clock_bit,
            inner: Mutex::new(Inner {
                state: ActuatorState::Uninitialized,
                registers: None,
            }),
        })
    }

    #[must_use]
    pub fn state(&self) -> ActuatorState {
        self.inner.lock().state
    }

    /// Maps all registers and configures the pin as a high speed push-pull
    /// output with pull-up, then switches the LED off.
    ///
    /// Nothing is written unless every register could be mapped first.
    ///
    /// # Errors
    /// Returns [`ActuatorError::HardwareUnavailable`] if a register is missing
    /// from `table` or cannot be mapped, and
    /// [`ActuatorError::AlreadyInitialized`] on a second call.
    pub fn initialize(
        &self,
        table: &RegisterAddressTable,
        mapper: &Arc<dyn IoMapper>,
    ) -> Result<(), ActuatorError> {
        let mut guard = self.inner.lock();
        if guard.registers.is_some() {
            return Err(ActuatorError::AlreadyInitialized);
        }

        let registers = RegisterSet::map(table, mapper).inspect_err(|e| {
            error!("led: cannot map registers: {e}");
        })?;
        self.configure(&registers);

        guard.registers = Some(registers);
        guard.state = ActuatorState::Configured;
        info!("led: pin {} configured", self.pin);
        Ok(())
    }

    // Order matters, the port ignores writes until its clock runs.
    fn configure(&self, registers: &RegisterSet) {
        let pair = Field::new(self.pin * 2, 2);

        registers
            .get(RegisterRole::ClockEnable)
            .modify(Field::bit(self.clock_bit), 1);
        registers
            .get(RegisterRole::Mode)
            .modify(pair, MODE_GENERAL_OUTPUT);
        registers
            .get(RegisterRole::OutputType)
            .modify(Field::bit(self.pin), OUTPUT_PUSH_PULL);
        registers.get(RegisterRole::Speed).modify(pair, SPEED_HIGH);
        registers.get(RegisterRole::Pull).modify(pair, PULL_UP);
        self.drive(registers, Level::Off);
    }

    fn drive(&self, registers: &RegisterSet, level: Level) {
        // active low, see the type level docs
        let bit = match level {
            Level::On => Field::bit(16 + self.pin),
            Level::Off => Field::bit(self.pin),
        };
        // write-1-to-act, zero bits are ignored by the hardware, so this is
        // the one register that is written without read-modify-write
        registers.get(RegisterRole::BitSetReset).write(bit.mask());
    }

    /// # Errors
    /// Returns [`ActuatorError::NotInitialized`] if the registers are not
    /// mapped.
    pub fn set_level(&self, level: Level) -> Result<(), ActuatorError> {
        let mut guard = self.inner.lock();
        let registers = guard
            .registers
            .as_ref()
            .ok_or(ActuatorError::NotInitialized)?;
        self.drive(registers, level);
        guard.state = ActuatorState::Active(level);
        debug!("led: {level}");
        Ok(())
    }

    /// Releases every register mapping.
    ///
    /// # Errors
    /// Returns [`ActuatorError::NotInitialized`] if there is nothing to
    /// release, including a second call after a successful one.
    pub fn deinitialize(&self) -> Result<(), ActuatorError> {
        let mut guard = self.inner.lock();
        let registers = guard
            .registers
            .take()
            .ok_or(ActuatorError::NotInitialized)?;
        drop(registers);
        guard.state = ActuatorState::Uninitialized;
        info!("led: pin {} released", self.pin);
        Ok(())
    }
}

impl Actuator for ActuatorController {
    fn actuate(&self, level: Level) -> Result<(), ActuatorError> {
        self.set_level(level)
    }
}
