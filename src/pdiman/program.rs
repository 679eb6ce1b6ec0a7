use std::path::PathBuf;

use clap::{Args, Parser};
use pdiman::{
    Profile, Programmer,
    error::PdiResult,
    profiles::DEFAULT_FUSES,
    interface::{DeviceInterfaceType, SerialportParams},
    protocols::pdi::FuseWrite,
};

#[derive(Args, Debug, Clone)]
pub(crate) struct ConnectionOptions {
    /// Serial port the programmer is attached to
    #[clap(short, long)]
    serial: String,

    /// Baud rate
    #[clap(short, long)]
    baudrate: Option<u32>,

    /// Programmer firmware profile
    #[clap(long, value_enum, default_value_t = Profile::Default)]
    profile: Profile,

    /// Override the profile's flash frame size in bytes
    #[clap(long)]
    chunk_size: Option<usize>,
}

impl ConnectionOptions {
    fn open(self) -> PdiResult<Programmer> {
        let mut config = self.profile.session_config();
        if let Some(chunk_size) = self.chunk_size {
            config.max_chunk_size = chunk_size;
        }

        let interface = DeviceInterfaceType::Serial(SerialportParams {
            port: self.serial,
            baud: self.baudrate,
        });
        Programmer::with_config(interface, config)
    }
}

#[derive(Parser, Debug, Clone)]
pub(crate) struct ProgramOptions {
    #[clap(flatten)]
    connection: ConnectionOptions,

    /// Raw binary firmware image
    #[clap(short, long)]
    firmware: PathBuf,

    /// Flash address of the first image byte
    #[clap(short, long, value_parser = parse_u32, default_value = "0")]
    address: u32,

    /// Fuse to write after flashing, as ADDRESS=VALUE (repeatable)
    #[clap(long = "fuse", value_parser = parse_fuse)]
    fuses: Vec<FuseWrite>,

    /// Also write fuses 1, 2, 4 and 5 as 0xFF, before any --fuse values
    #[clap(long, default_value_t = false)]
    default_fuses: bool,

    /// Don't draw a progress bar
    #[clap(long, default_value_t = false)]
    no_progress: bool,
}

#[derive(Parser, Debug, Clone)]
pub(crate) struct EraseOptions {
    #[clap(flatten)]
    connection: ConnectionOptions,
}

#[derive(Parser, Debug, Clone)]
pub(crate) struct FuseOptions {
    #[clap(flatten)]
    connection: ConnectionOptions,

    /// Fuse to write, as ADDRESS=VALUE (repeatable)
    #[clap(long = "fuse", value_parser = parse_fuse, required = true)]
    fuses: Vec<FuseWrite>,
}

fn parse_number(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid number '{}': {}", s, e))
}

fn parse_u32(s: &str) -> Result<u32, String> {
    u32::try_from(parse_number(s)?).map_err(|_| format!("'{}' does not fit in 32 bits", s))
}

fn parse_u8(s: &str) -> Result<u8, String> {
    u8::try_from(parse_number(s)?).map_err(|_| format!("'{}' does not fit in a byte", s))
}

fn parse_fuse(s: &str) -> Result<FuseWrite, String> {
    let (address, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ADDRESS=VALUE, got '{}'", s))?;

    Ok(FuseWrite {
        address: parse_u8(address)?,
        value: parse_u8(value)?,
    })
}

/// Fuses in the order they are written; explicit values come last so they win
fn fuses_to_write(explicit: &[FuseWrite], default_fuses: bool) -> Vec<FuseWrite> {
    let mut fuses = Vec::new();
    if default_fuses {
        fuses.extend_from_slice(&DEFAULT_FUSES);
    }
    fuses.extend_from_slice(explicit);
    fuses
}

pub(crate) fn handle_programming(opts: ProgramOptions) -> PdiResult<()> {
    let fuses = fuses_to_write(&opts.fuses, opts.default_fuses);
    let mut programmer = opts.connection.open()?;

    programmer.progress_bar(!opts.no_progress);
    programmer.base_address(opts.address);
    programmer.program_binary_file(&opts.firmware, &fuses)?;

    Ok(())
}

pub(crate) fn handle_erase(opts: EraseOptions) -> PdiResult<()> {
    opts.connection.open()?.erase()
}

pub(crate) fn handle_fuses(opts: FuseOptions) -> PdiResult<()> {
    opts.connection.open()?.write_fuses(&opts.fuses)
}
