use std::sync::Arc;

use kernel_abi::{EFAULT, ENODEV, Errno, SEEK_SET};
use kernel_chrdev::ptr::{UserSlice, UserSliceMut};
use kernel_chrdev::{CharDevice, DeviceConfig, fops};
use kernel_led::{ActuatorController, ActuatorError, ActuatorState, Level, PinConfig};
use kernel_mmio::sim::SimulatedBank;
use kernel_mmio::{IoMapper, RegisterAddressTable, RegisterRole};

struct Board {
    bank: Arc<SimulatedBank>,
    table: RegisterAddressTable,
    led: Arc<ActuatorController>,
    device: Arc<CharDevice>,
}

impl Board {
    fn new(pin: u8) -> Self {
        let table = RegisterAddressTable::stm32mp157_gpioi();
        let bank = Arc::new(SimulatedBank::for_table(&table));
        let mapper: Arc<dyn IoMapper> = bank.clone();

        let config = DeviceConfig {
            pin: PinConfig {
                pin,
                ..Default::default()
            },
            ..Default::default()
        };
        let led = Arc::new(ActuatorController::new(config.pin).unwrap());
        led.initialize(&table, &mapper).unwrap();
        let device = CharDevice::with_actuator(config, led.clone()).unwrap();

        Self {
            bank,
            table,
            led,
            device,
        }
    }

    fn bsrr(&self) -> u32 {
        let addr = self.table.get(RegisterRole::BitSetReset).unwrap();
        self.bank.peek(addr).unwrap()
    }
}

#[test]
fn test_first_byte_switches_led() {
    let board = Board::new(0);
    assert_eq!(ActuatorState::Configured, board.led.state());
    assert_eq!(1, board.bsrr(), "initialized off");

    let mut session = fops::open(&board.device);
    assert_eq!(1, fops::write(&mut session, &[1u8][..]));
    assert_eq!(ActuatorState::Active(Level::On), board.led.state());
    assert_eq!(1 << 16, board.bsrr());

    assert_eq!(0, fops::llseek(&mut session, 0, SEEK_SET));
    assert_eq!(1, fops::write(&mut session, &[0u8][..]));
    assert_eq!(ActuatorState::Active(Level::Off), board.led.state());
    assert_eq!(1, board.bsrr());
    fops::release(session);

    let mut second = fops::open(&board.device);
    assert_eq!(1, fops::write(&mut second, &[1u8][..]));
    assert_eq!(ActuatorState::Active(Level::On), board.led.state());
    assert_eq!(1 << 16, board.bsrr(), "on after off must not keep the set bit");
    fops::release(second);
}

#[test]
fn test_other_pin_levels_are_exact() {
    let board = Board::new(9);
    assert_eq!(1 << 9, board.bsrr());

    let mut session = board.device.open();
    for (byte, expected) in [(1u8, 1 << 25), (0, 1 << 9), (1, 1 << 25)] {
        session.seek(0, kernel_chrdev::Whence::Start).unwrap();
        assert_eq!(Ok(1), session.write(&[byte][..]));
        assert_eq!(expected, board.bsrr());
    }
}

#[test]
fn test_unknown_byte_is_stored_only() {
    let board = Board::new(3);
    let mut session = board.device.open();
    session.write(&[1u8][..]).unwrap();
    assert_eq!(1 << (16 + 3), board.bsrr());

    session.seek(0, kernel_chrdev::Whence::Start).unwrap();
    assert_eq!(Ok(1), session.write(&[7u8][..]));
    assert_eq!(ActuatorState::Active(Level::On), board.led.state());
    assert_eq!(1 << (16 + 3), board.bsrr());
    assert_eq!([7], board.device.channel().contents());
}

#[test]
fn test_writes_past_first_byte_do_not_actuate() {
    let board = Board::new(5);
    assert_eq!(1 << 5, board.bsrr());

    let mut session = board.device.open();
    session.seek(1, kernel_chrdev::Whence::Start).unwrap();
    session.write(&[1u8, 1, 1][..]).unwrap();
    assert_eq!(ActuatorState::Configured, board.led.state());
    assert_eq!(1 << 5, board.bsrr());
}

#[test]
fn test_actuator_failure_does_not_fail_write() {
    let board = Board::new(0);
    board.led.deinitialize().unwrap();
    assert_eq!(0, board.bank.live_mappings());
    assert_eq!(Err(ActuatorError::NotInitialized), board.led.deinitialize());

    let mut session = board.device.open();
    assert_eq!(Ok(1), session.write(&[1u8][..]));
    assert_eq!(ActuatorState::Uninitialized, board.led.state());
}

#[test]
fn test_missing_register_means_no_device() {
    let mut table = RegisterAddressTable::stm32mp157_gpioi();
    let bank = Arc::new(SimulatedBank::for_table(&table));
    let mapper: Arc<dyn IoMapper> = bank.clone();
    table.remove(RegisterRole::Speed);

    let led = ActuatorController::new(PinConfig::default()).unwrap();
    let err = led.initialize(&table, &mapper).unwrap_err();
    assert_eq!(ENODEV, Errno::from(err));
    assert_eq!(0, bank.map_count());
}

#[test]
fn test_user_pointers_through_entry_points() {
    let board = Board::new(0);
    let mut session = fops::open(&board.device);

    let data = b"\x01hello".to_vec();
    let src = unsafe { UserSlice::try_from_usize(data.as_ptr().expose_provenance(), data.len()) }
        .unwrap();
    assert_eq!(6, fops::write(&mut session, &src));
    assert_eq!(ActuatorState::Active(Level::On), board.led.state());

    let mut out = vec![0u8; 16];
    fops::llseek(&mut session, 0, SEEK_SET);
    {
        let mut dst = unsafe {
            UserSliceMut::try_from_usize(out.as_mut_ptr().expose_provenance(), out.len())
        }
        .unwrap();
        assert_eq!(6, fops::read(&mut session, &mut dst));
    }
    assert_eq!(b"\x01hello", &out[..6]);

    let fault = unsafe { UserSlice::try_from_usize(usize::MAX - 2, 8) }
        .err()
        .unwrap();
    assert_eq!(EFAULT, Errno::from(fault));
}
