use std::{fs::File, io::Read, path::Path};

use error::{PdiError, PdiResult};
use interface::{DeviceInterface, DeviceInterfaceType, SerialPortDevice};
use protocols::pdi::{FuseWrite, Session, SessionConfig};
use tracing::info;

pub use profiles::Profile;

pub(crate) mod constants;
pub mod error;
pub mod interface;
pub mod profiles;
pub mod progress;
pub mod protocols;
pub(crate) mod util;

/// One programming run against a pdiprog device. Each flow (`program`,
/// `erase`, `write_fuses`) ends by closing the session, so a `Programmer`
/// is good for a single flow.
pub struct Programmer {
    session: Session<Box<dyn DeviceInterface>>,
    base_address: u32,
    progress_bar_enable: bool,
}

impl Programmer {
    /// Open the programmer behind `interface` using the given profile
    pub fn new(interface: DeviceInterfaceType, profile: Profile) -> PdiResult<Self> {
        Self::with_config(interface, profile.session_config())
    }

    pub fn with_config(interface: DeviceInterfaceType, config: SessionConfig) -> PdiResult<Self> {
        // Reject a bad configuration before touching the port
        config.validate()?;

        let device: Box<dyn DeviceInterface> = match interface {
            DeviceInterfaceType::Serial(params) => Box::new(SerialPortDevice::new(
                params.port,
                params.baud.unwrap_or(constants::DEFAULT_BAUD_RATE),
            )?),
        };

        Self::from_interface(device, config)
    }

    /// Drive an already opened interface
    pub fn from_interface(
        device: Box<dyn DeviceInterface>,
        config: SessionConfig,
    ) -> PdiResult<Self> {
        Ok(Programmer {
            session: Session::new(device, config)?,
            base_address: 0,
            progress_bar_enable: false,
        })
    }

    pub fn progress_bar(&mut self, enable: bool) {
        self.progress_bar_enable = enable;
    }

    /// Flash address the first byte of the image is written to
    pub fn base_address(&mut self, address: u32) {
        self.base_address = address;
    }

    /// Erase the chip, write the image and the given fuses, then close.
    pub fn program(&mut self, firmware: &[u8], fuses: &[FuseWrite]) -> PdiResult<()> {
        let base_address = self.base_address;
        let progress_bar_enable = self.progress_bar_enable;

        self.session.run(|session| {
            session.synchronize()?;
            session.erase_chip()?;

            if progress_bar_enable {
                let mut pb = util::create_progress_bar(firmware.len() as u64, "Writing flash");
                let written = session.write_flash_with_progress(base_address, firmware, &mut pb);
                if written.is_err() {
                    pb.abandon();
                }
                written?;
            } else {
                session.write_flash(base_address, firmware)?;
            }

            for fuse in fuses {
                session.write_fuse(fuse.address, fuse.value)?;
            }
            Ok(())
        })?;

        info!("Programmed {} bytes", firmware.len());
        Ok(())
    }

    /// Program a raw binary image read from `file_path`
    pub fn program_binary_file(
        &mut self,
        file_path: impl AsRef<Path>,
        fuses: &[FuseWrite],
    ) -> PdiResult<()> {
        let file_path = file_path.as_ref();
        let mut file = File::open(file_path).map_err(|e| {
            PdiError::FirmwareError(format!("Failed to open {}: {}", file_path.display(), e))
        })?;
        let mut bin = Vec::new();
        file.read_to_end(&mut bin).map_err(|e| {
            PdiError::FirmwareError(format!("Could not read {}: {}", file_path.display(), e))
        })?;

        self.program(&bin, fuses)
    }

    /// Erase the chip and close
    pub fn erase(&mut self) -> PdiResult<()> {
        self.session.run(|session| {
            session.synchronize()?;
            session.erase_chip()
        })
    }

    /// Write fuses only and close
    pub fn write_fuses(&mut self, fuses: &[FuseWrite]) -> PdiResult<()> {
        self.session.run(|session| {
            session.synchronize()?;
            for fuse in fuses {
                session.write_fuse(fuse.address, fuse.value)?;
            }
            Ok(())
        })
    }
}
