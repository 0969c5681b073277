//! Type-safe command builders
//!
//! Every outbound command is built from named fields (report id, register
//! address, length) rather than concatenated hex strings. Multi-byte fields are
//! big-endian on the wire.

use zerocopy::byteorder::big_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::protocol::{self, cmd, led, register, reporting};

// =============================================================================
// Core Trait
// =============================================================================

/// A command that can be serialized to control-channel bytes
pub trait BoardCommand {
    /// Output report id (e.g., 0x11 for LIGHT)
    const CMD: u8;

    /// Serialize to bytes (excluding header and report id)
    fn to_data(&self) -> Vec<u8>;

    /// Build the command with a report-id placeholder in front
    fn build(&self) -> Vec<u8> {
        protocol::build_command(Self::CMD, &self.to_data())
    }
}

// =============================================================================
// LED
// =============================================================================

/// LIGHT (0x11) - power button LED
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetLight {
    pub on: bool,
}

impl BoardCommand for SetLight {
    const CMD: u8 = cmd::LIGHT;

    fn to_data(&self) -> Vec<u8> {
        vec![if self.on { led::ON } else { led::OFF }]
    }
}

// =============================================================================
// Reporting Mode
// =============================================================================

/// REPORTING (0x12) - 2-byte payload: flags, input report id
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct SetReportMode {
    flags: u8,
    report_id: u8,
}

impl SetReportMode {
    pub fn new(continuous: bool, report_id: u8) -> Self {
        Self {
            flags: if continuous { reporting::CONTINUOUS } else { 0 },
            report_id,
        }
    }

    pub fn report_id(&self) -> u8 {
        self.report_id
    }

    pub fn is_continuous(&self) -> bool {
        self.flags & reporting::CONTINUOUS != 0
    }
}

impl BoardCommand for SetReportMode {
    const CMD: u8 = cmd::REPORTING;

    fn to_data(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

// =============================================================================
// Register Access
// =============================================================================

/// WRITE_REGISTER (0x16) header - 4-byte address, 1-byte length
#[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
struct WriteRegisterHeader {
    address: U32,
    size: u8,
}

/// WRITE_REGISTER (0x16) - header followed by up to 16 data bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRegister {
    pub address: u32,
    pub data: Vec<u8>,
}

impl WriteRegister {
    pub fn new(address: u32, data: &[u8]) -> Self {
        let len = data.len().min(protocol::MAX_READ_CHUNK);
        Self {
            address,
            data: data[..len].to_vec(),
        }
    }
}

impl BoardCommand for WriteRegister {
    const CMD: u8 = cmd::WRITE_REGISTER;

    fn to_data(&self) -> Vec<u8> {
        let header = WriteRegisterHeader {
            address: U32::new(self.address),
            size: self.data.len() as u8,
        };
        let mut data = header.as_bytes().to_vec();
        data.extend_from_slice(&self.data);
        data
    }
}

/// READ_REGISTER (0x17) - 6-byte payload: 4-byte address, 2-byte length
#[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct ReadRegister {
    address: U32,
    size: U16,
}

impl ReadRegister {
    pub fn new(address: u32, size: u16) -> Self {
        Self {
            address: U32::new(address),
            size: U16::new(size),
        }
    }

    pub fn address(&self) -> u32 {
        self.address.get()
    }

    pub fn size(&self) -> u16 {
        self.size.get()
    }
}

impl BoardCommand for ReadRegister {
    const CMD: u8 = cmd::READ_REGISTER;

    fn to_data(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

// =============================================================================
// Status
// =============================================================================

/// REQUEST_STATUS (0x15) - 1-byte payload (rumble bit, always off)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestStatus;

impl BoardCommand for RequestStatus {
    const CMD: u8 = cmd::REQUEST_STATUS;

    fn to_data(&self) -> Vec<u8> {
        vec![0x00]
    }
}

// =============================================================================
// Canned commands used by the connection handshake
// =============================================================================

/// Enable extension polling: zero-length write to the extension init register
pub fn register_extension() -> WriteRegister {
    WriteRegister::new(register::EXTENSION_ENABLE, &[])
}

/// Read the 24-byte factory calibration block
pub fn request_calibration() -> ReadRegister {
    ReadRegister::new(register::CALIBRATION, register::CALIBRATION_LEN)
}

/// Continuous reporting of core buttons + 8 extension bytes
pub fn set_report_type() -> SetReportMode {
    SetReportMode::new(true, protocol::input::EXTENSION_8BYTES)
}

pub fn set_light(on: bool) -> SetLight {
    SetLight { on }
}

pub fn request_status() -> RequestStatus {
    RequestStatus
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_extension_bytes() {
        assert_eq!(
            register_extension().build(),
            vec![0x00, 0x16, 0x04, 0xA4, 0x00, 0x40, 0x00]
        );
    }

    #[test]
    fn test_request_calibration_bytes() {
        let req = request_calibration();
        assert_eq!(req.address(), 0x04A4_0024);
        assert_eq!(req.size(), 24);
        assert_eq!(
            req.build(),
            vec![0x00, 0x17, 0x04, 0xA4, 0x00, 0x24, 0x00, 0x18]
        );
    }

    #[test]
    fn test_set_report_type_bytes() {
        let mode = set_report_type();
        assert!(mode.is_continuous());
        assert_eq!(mode.build(), vec![0x00, 0x12, 0x04, 0x32]);
        assert_eq!(
            SetReportMode::new(false, 0x32).build(),
            vec![0x00, 0x12, 0x00, 0x32]
        );
    }

    #[test]
    fn test_set_light_bytes() {
        assert_eq!(set_light(true).build(), vec![0x00, 0x11, 0x10]);
        assert_eq!(set_light(false).build(), vec![0x00, 0x11, 0x00]);
    }

    #[test]
    fn test_request_status_bytes() {
        assert_eq!(request_status().build(), vec![0x00, 0x15, 0x00]);
    }

    #[test]
    fn test_write_register_with_data() {
        let write = WriteRegister::new(0x04A4_00F0, &[0x55]);
        assert_eq!(
            write.build(),
            vec![0x00, 0x16, 0x04, 0xA4, 0x00, 0xF0, 0x01, 0x55]
        );

        // Payload is capped at one 16-byte chunk
        let long = WriteRegister::new(0x04A4_0000, &[0xAB; 20]);
        assert_eq!(long.data.len(), 16);
        assert_eq!(long.to_data()[4], 16);
    }

    #[test]
    fn test_framed_on_the_wire() {
        let framed = protocol::frame_output(&request_calibration().build());
        assert_eq!(framed[0], protocol::header::OUTPUT_REPORT);
        assert_eq!(&framed[1..], &[0x17, 0x04, 0xA4, 0x00, 0x24, 0x00, 0x18]);
    }
}
