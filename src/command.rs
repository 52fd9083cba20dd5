use std::str::FromStr;

use thiserror::Error;

pub const HELP: &str = "\
commands:
  w <byte>        write one byte at the current position (1 = led on, 0 = led off)
  r <n>           read up to n bytes from the current position
  l <pos>         seek to an absolute position
  c               clear the buffer
  buf_size        print the buffer capacity
  data_len        print the number of valid bytes
  update_len <n>  force the number of valid bytes
  p               dump the buffer to the log
  led             print the led state
  help            print this text
  exit            close the device and quit";

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Command {
    Write(u8),
    Read(usize),
    Seek(i64),
    Clear,
    BufSize,
    DataLen,
    UpdateLen(i32),
    Print,
    Led,
    Help,
    Exit,
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ParseError {
    #[error("no command given")]
    Empty,
    #[error("unknown command `{0}`, try `help`")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("`{0}` takes no argument")]
    UnexpectedArgument(&'static str),
    #[error("`{arg}` is not a valid argument for `{command}`")]
    InvalidArgument { command: &'static str, arg: String },
}

fn argument<T: FromStr>(command: &'static str, arg: Option<&str>) -> Result<T, ParseError> {
    let arg = arg.ok_or(ParseError::MissingArgument(command))?;
    arg.parse().map_err(|_| ParseError::InvalidArgument {
        command,
        arg: arg.to_string(),
    })
}

fn bare(command: &'static str, value: Command, arg: Option<&str>) -> Result<Command, ParseError> {
    match arg {
        None => Ok(value),
        Some(_) => Err(ParseError::UnexpectedArgument(command)),
    }
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or(ParseError::Empty)?;
        let arg = words.next();
        if words.next().is_some() {
            return Err(ParseError::InvalidArgument {
                command: "line",
                arg: line.trim().to_string(),
            });
        }

        match name {
            "w" => argument("w", arg).map(Command::Write),
            "r" => argument("r", arg).map(Command::Read),
            "l" => argument("l", arg).map(Command::Seek),
            "update_len" => argument("update_len", arg).map(Command::UpdateLen),
            "c" => bare("c", Command::Clear, arg),
            "buf_size" => bare("buf_size", Command::BufSize, arg),
            "data_len" => bare("data_len", Command::DataLen, arg),
            "p" => bare("p", Command::Print, arg),
            "led" => bare("led", Command::Led, arg),
            "help" => bare("help", Command::Help, arg),
            "exit" | "quit" => bare("exit", Command::Exit, arg),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }
}
