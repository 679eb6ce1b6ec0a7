use tracing::{info, trace};

use super::DeviceInterface;
use crate::constants::RESPONSE_TIMEOUT_MS;

use crate::error::{PdiError, PdiResult};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, StopBits};
use std::io::{Read, Write};
use std::time::Duration;

pub type ComPort = String;
pub type BaudRate = u32;

/// Serial port device_interface layer
pub struct SerialPortDevice {
    serial_port: Box<dyn serialport::SerialPort>,
}

impl SerialPortDevice {
    pub fn new(port: ComPort, baud: BaudRate) -> PdiResult<SerialPortDevice> {
        let serial_port = serialport::new(&port, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(RESPONSE_TIMEOUT_MS))
            .dtr_on_open(false)
            .open()
            .map_err(|e| PdiError::Link(format!("Failed to open {}: {:?}", port, e)))?;

        info!("Opened serial port {} at {} baud", port, baud);
        Ok(SerialPortDevice { serial_port })
    }
}

impl DeviceInterface for SerialPortDevice {
    fn send_byte(&mut self, byte: u8) -> PdiResult<()> {
        self.send(&[byte])
    }

    fn send(&mut self, bytes: &[u8]) -> PdiResult<()> {
        self.serial_port
            .write_all(bytes)
            .map_err(|e| PdiError::Link(format!("{:?}", e)))?;
        self.serial_port
            .flush()
            .map_err(|e| PdiError::Link(format!("{:?}", e)))?;
        trace!("Sent bytes {:02X?}", bytes);
        Ok(())
    }

    fn recv_byte(&mut self) -> PdiResult<u8> {
        let mut buffer = [0u8; 1];

        match self.serial_port.read(&mut buffer) {
            Ok(1) => {
                trace!("Received byte {:02X}", buffer[0]);
                Ok(buffer[0])
            }
            // Zero-length read means the deadline passed without data
            Ok(_) => Err(PdiError::Timeout),
            Err(e) => Err(e.into()),
        }
    }

    fn drain(&mut self) -> PdiResult<()> {
        self.serial_port.clear(ClearBuffer::Input).map_err(|e| {
            PdiError::Link(format!("Failed to discard receive buffer, {}", e))
        })?;

        Ok(())
    }

    fn deadline(&self) -> Duration {
        self.serial_port.timeout()
    }

    fn set_deadline(&mut self, deadline: Duration) -> PdiResult<()> {
        self.serial_port
            .set_timeout(deadline)
            .map_err(|e| PdiError::Link(format!("Failed to set timeout {:?}: {}", deadline, e)))
    }
}
