use crate::constants::MAX_FRAME_PAYLOAD;
use crate::error::{PdiError, PdiResult};

/// Fixed acknowledgement the device answers a `Sync` request with
pub const SYNC_ACK: u8 = 0xA6;

/// Response byte meaning the request was carried out
pub const RESPONSE_OK: u8 = 0x00;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Sync = 0x59,
    EraseChip = 0x01,
    WriteFlash = 0x02,
    WriteFuse = 0x03,
    Close = 0xFF,
}

impl Command {
    pub fn opcode(self) -> u8 {
        self as u8
    }
}

/// One request with its arguments, ready to be framed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    Sync,
    EraseChip,
    WriteFlash { address: u32, data: &'a [u8] },
    WriteFuse { address: u8, value: u8 },
    Close,
}

impl Request<'_> {
    pub fn command(&self) -> Command {
        match self {
            Request::Sync => Command::Sync,
            Request::EraseChip => Command::EraseChip,
            Request::WriteFlash { .. } => Command::WriteFlash,
            Request::WriteFuse { .. } => Command::WriteFuse,
            Request::Close => Command::Close,
        }
    }

    /// Wire bytes for this request: opcode followed by its arguments, multi-byte
    /// fields little-endian.
    pub fn encode(&self) -> PdiResult<Vec<u8>> {
        let opcode = self.command().opcode();

        match *self {
            Request::WriteFlash { address, data } => {
                if data.len() > MAX_FRAME_PAYLOAD {
                    return Err(PdiError::ConfigurationError(format!(
                        "Chunk of {} bytes does not fit in a single frame (max {})",
                        data.len(),
                        MAX_FRAME_PAYLOAD
                    )));
                }

                let mut frame = Vec::with_capacity(7 + data.len());
                frame.push(opcode);
                frame.extend_from_slice(&address.to_le_bytes());
                frame.extend_from_slice(&(data.len() as u16).to_le_bytes());
                frame.extend_from_slice(data);
                Ok(frame)
            }
            Request::WriteFuse { address, value } => Ok(vec![opcode, address, value]),
            Request::Sync | Request::EraseChip | Request::Close => Ok(vec![opcode]),
        }
    }
}

/// Interpret the single byte a programming request is answered with
pub fn decode_response(response: u8) -> PdiResult<()> {
    if response == RESPONSE_OK {
        Ok(())
    } else {
        Err(PdiError::Protocol { code: response })
    }
}
