use std::io::{BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use kernel_abi::{Errno, SEEK_SET, errno_name};
use kernel_chrdev::{
    CLEAR_BUF, CharDevice, ConfigError, DEFAULT_CAPACITY, DUMP_BUF, DeviceConfig, GET_BUF_SIZE,
    GET_DATA_LEN, Session, UPDATE_DATA_LEN, fops,
};
use kernel_led::{ActuatorController, ActuatorError, PinConfig};
use kernel_mmio::sim::SimulatedBank;
use kernel_mmio::{IoMapper, RegisterAddressTable};
use log::{error, info};
use thiserror::Error;

use crate::command::{Command, HELP};

mod command;
mod logger;

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about,
    long_about = "Drives the LED character device over a simulated register bank."
)]
struct Args {
    #[arg(long, default_value_t = DEFAULT_CAPACITY, help = "Size of the device buffer in bytes")]
    capacity: usize,
    #[arg(long, default_value_t = 0, help = "GPIO pin the LED is wired to")]
    pin: u8,
    #[arg(long, help = "Register the device without an LED")]
    memory_only: bool,
    #[arg(
        short,
        long,
        help = "Print more information that may be helpful for debugging"
    )]
    verbose: bool,
}

#[derive(Debug, Error)]
enum SetupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("cannot bring up the led: {0}")]
    Led(#[from] ActuatorError),
}

struct Led {
    bank: Arc<SimulatedBank>,
    table: RegisterAddressTable,
    controller: Arc<ActuatorController>,
}

impl Led {
    fn attach(pin: PinConfig) -> Result<Self, ActuatorError> {
        let table = RegisterAddressTable::stm32mp157_gpioi();
        let bank = Arc::new(SimulatedBank::for_table(&table));
        let mapper: Arc<dyn IoMapper> = bank.clone();

        let controller = Arc::new(ActuatorController::new(pin)?);
        controller.initialize(&table, &mapper)?;
        Ok(Self {
            bank,
            table,
            controller,
        })
    }

    fn print(&self) {
        println!("led: {:?}", self.controller.state());
        for (role, addr) in self.table.iter() {
            if let Some(value) = self.bank.peek(addr) {
                println!("  {role:<16} {addr} = {value:#010x}");
            }
        }
    }
}

fn setup(args: &Args) -> Result<(Arc<CharDevice>, Option<Led>), SetupError> {
    let config = DeviceConfig {
        capacity: args.capacity,
        pin: PinConfig {
            pin: args.pin,
            ..Default::default()
        },
        ..Default::default()
    };
    config.validate()?;

    if args.memory_only {
        return Ok((CharDevice::new(config)?, None));
    }

    let led = Led::attach(config.pin)?;
    let device = CharDevice::with_actuator(config, led.controller.clone())?;
    Ok((device, Some(led)))
}

fn report(what: &str, ret: i64) {
    if ret < 0 {
        let errno = i32::try_from(-ret).unwrap_or(i32::MAX);
        println!("{what} failed: {} ({errno})", errno_name(errno));
    } else {
        println!("{what}: {ret}");
    }
}

fn ioctl_value(session: &mut Session, what: &str, cmd: u32, arg: i32) {
    let mut bytes = arg.to_ne_bytes();
    let ret = fops::unlocked_ioctl(session, cmd, &mut bytes[..]);
    if ret < 0 {
        report(what, ret as i64);
    } else {
        println!("{what}: {}", i32::from_ne_bytes(bytes));
    }
}

fn execute(session: &mut Session, led: Option<&Led>, command: Command) {
    match command {
        Command::Write(byte) => report("written", fops::write(session, &[byte][..]) as i64),
        Command::Read(n) => {
            let mut buf = vec![0u8; n];
            let ret = fops::read(session, &mut buf[..]);
            report("read", ret as i64);
            if let Ok(n) = usize::try_from(ret) {
                for (i, byte) in buf[..n].iter().enumerate() {
                    println!("  buf[{i}] = {byte}");
                }
            }
        }
        Command::Seek(pos) => report("position", fops::llseek(session, pos, SEEK_SET)),
        Command::Clear => {
            let ret = fops::unlocked_ioctl(session, CLEAR_BUF, &mut [0u8; 0][..]);
            report("clear", ret as i64);
        }
        Command::BufSize => ioctl_value(session, "buffer size", GET_BUF_SIZE, 0),
        Command::DataLen => ioctl_value(session, "data length", GET_DATA_LEN, 0),
        Command::UpdateLen(len) => ioctl_value(session, "update", UPDATE_DATA_LEN, len),
        Command::Print => {
            let ret = fops::unlocked_ioctl(session, DUMP_BUF, &mut [0u8; 0][..]);
            report("dump", ret as i64);
        }
        Command::Led => match led {
            Some(led) => led.print(),
            None => println!("no led attached"),
        },
        Command::Help => println!("{HELP}"),
        Command::Exit => {}
    }
}

fn run(device: &Arc<CharDevice>, led: Option<&Led>) -> std::io::Result<()> {
    let mut session = fops::open(device);
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    loop {
        print!("{}> ", device.config().name);
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<Command>() {
            Ok(Command::Exit) => break,
            Ok(command) => execute(&mut session, led, command),
            Err(e) => println!("{e}"),
        }
    }

    fops::release(session);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    logger::init(args.verbose);

    let (device, led) = match setup(&args) {
        Ok(v) => v,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(u8::try_from(Errno::from(e).raw()).unwrap_or(1));
        }
    };
    info!("type `help` for a list of commands");

    let result = run(&device, led.as_ref());

    if let Some(led) = led {
        if let Err(e) = led.controller.deinitialize() {
            error!("{e}");
        }
        info!(
            "{} register mappings still live",
            led.bank.live_mappings()
        );
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

impl From<SetupError> for Errno {
    fn from(e: SetupError) -> Self {
        match e {
            SetupError::Config(e) => e.into(),
            SetupError::Led(e) => e.into(),
        }
    }
}
