//! Input report decoding
//!
//! Every frame on the receive channel starts with `[0xA1] [report id]`
//! followed by the two core button bytes. What comes after depends on the
//! report id:
//!
//! - 0x20 STATUS:    `[flags] [00] [00] [battery]`
//! - 0x21 READ_DATA: `[size<<4 | error] [offset hi] [offset lo] [data × 16]`
//! - 0x22 ACK:       `[acknowledged report id] [error code]`
//! - 0x32 EXT 8:     `[TR hi] [TR lo] [BR hi] [BR lo] [TL hi] [TL lo] [BL hi] [BL lo]`

use thiserror::Error;
use zerocopy::byteorder::big_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::protocol::{header, input, MAX_READ_CHUNK};

/// Malformed inbound frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Report too short: expected {expected} bytes, got {got}")]
    TooShort { expected: usize, got: usize },

    #[error("Unexpected transaction header 0x{0:02X}")]
    BadHeader(u8),
}

/// Status report - sent on request and whenever an extension is plugged or unplugged
///
/// Receiving one silently resets the board's reporting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub buttons: u16,
    /// Bit 1: extension connected, bit 4: LED on
    pub flags: u8,
    /// Raw battery level, 0x00-0xFF
    pub battery: u8,
}

impl StatusReport {
    pub fn extension_connected(&self) -> bool {
        self.flags & 0x02 != 0
    }

    pub fn led_on(&self) -> bool {
        self.flags & 0x10 != 0
    }
}

/// Register read response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadDataReport {
    pub buttons: u16,
    /// Declared payload length: size nibble + 1, at most 16
    pub size: usize,
    /// Error nibble, 0 on success
    pub error: u8,
    /// Low 16 bits of the address this chunk was read from
    pub offset: u16,
    /// Payload, exactly `size` bytes
    pub data: Vec<u8>,
}

/// Output report acknowledgment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckReport {
    pub buttons: u16,
    pub report: u8,
    pub error: u8,
}

/// The four raw load-cell readings, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSensors {
    pub top_right: u16,
    pub bottom_right: u16,
    pub top_left: u16,
    pub bottom_left: u16,
}

/// Core buttons + 8 extension bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionReport {
    pub buttons: u16,
    pub sensors: RawSensors,
}

/// Wire layout of the extension payload (10 bytes after the report id)
#[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
struct ExtensionPayload {
    buttons: U16,
    top_right: U16,
    bottom_right: U16,
    top_left: U16,
    bottom_left: U16,
}

/// A decoded input report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Status(StatusReport),
    ReadData(ReadDataReport),
    Ack(AckReport),
    Extension(ExtensionReport),
    /// Any other report id; treated like an acknowledgment
    Other { report_id: u8 },
}

impl Report {
    pub fn report_id(&self) -> u8 {
        match self {
            Report::Status(_) => input::STATUS,
            Report::ReadData(_) => input::READ_DATA,
            Report::Ack(_) => input::ACK,
            Report::Extension(_) => input::EXTENSION_8BYTES,
            Report::Other { report_id } => *report_id,
        }
    }
}

fn require(frame: &[u8], expected: usize) -> Result<(), ParseError> {
    if frame.len() < expected {
        return Err(ParseError::TooShort {
            expected,
            got: frame.len(),
        });
    }
    Ok(())
}

fn buttons(frame: &[u8]) -> u16 {
    u16::from_be_bytes([frame[2], frame[3]])
}

/// Parse one frame read from the receive channel
pub fn parse_report(frame: &[u8]) -> Result<Report, ParseError> {
    require(frame, 2)?;
    if frame[0] != header::INPUT_REPORT {
        return Err(ParseError::BadHeader(frame[0]));
    }

    match frame[1] {
        input::STATUS => {
            require(frame, 8)?;
            Ok(Report::Status(StatusReport {
                buttons: buttons(frame),
                flags: frame[4],
                battery: frame[7],
            }))
        }
        input::READ_DATA => {
            require(frame, 7)?;
            let size = ((frame[4] >> 4) as usize + 1).min(MAX_READ_CHUNK);
            // The declared payload must be present in full
            require(frame, 7 + size)?;
            Ok(Report::ReadData(ReadDataReport {
                buttons: buttons(frame),
                size,
                error: frame[4] & 0x0F,
                offset: u16::from_be_bytes([frame[5], frame[6]]),
                data: frame[7..7 + size].to_vec(),
            }))
        }
        input::ACK => {
            require(frame, 6)?;
            Ok(Report::Ack(AckReport {
                buttons: buttons(frame),
                report: frame[4],
                error: frame[5],
            }))
        }
        input::EXTENSION_8BYTES => {
            require(frame, 12)?;
            let payload =
                ExtensionPayload::read_from_bytes(&frame[2..12]).map_err(|_| ParseError::TooShort {
                    expected: 12,
                    got: frame.len(),
                })?;
            Ok(Report::Extension(ExtensionReport {
                buttons: payload.buttons.get(),
                sensors: RawSensors {
                    top_right: payload.top_right.get(),
                    bottom_right: payload.bottom_right.get(),
                    top_left: payload.top_left.get(),
                    bottom_left: payload.bottom_left.get(),
                },
            }))
        }
        report_id => Ok(Report::Other { report_id }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::REPORT_SIZE;

    fn frame(bytes: &[u8]) -> Vec<u8> {
        let mut f = bytes.to_vec();
        f.resize(REPORT_SIZE, 0);
        f
    }

    #[test]
    fn test_parse_extension() {
        let f = frame(&[
            0xA1, 0x32, 0x00, 0x08, 0x12, 0x34, 0x00, 0x10, 0xFF, 0xFF, 0x08, 0x00,
        ]);
        match parse_report(&f).unwrap() {
            Report::Extension(ext) => {
                assert_eq!(ext.buttons, 0x0008);
                assert_eq!(ext.sensors.top_right, 0x1234);
                assert_eq!(ext.sensors.bottom_right, 0x0010);
                assert_eq!(ext.sensors.top_left, 0xFFFF);
                assert_eq!(ext.sensors.bottom_left, 0x0800);
            }
            other => panic!("Expected Extension, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_read_data_full_chunk() {
        let mut bytes = vec![0xA1, 0x21, 0x00, 0x00, 0xF0, 0x00, 0x24];
        bytes.extend(1..=16u8);
        match parse_report(&frame(&bytes)).unwrap() {
            Report::ReadData(read) => {
                assert_eq!(read.size, 16);
                assert_eq!(read.error, 0);
                assert_eq!(read.offset, 0x0024);
                assert_eq!(read.data, (1..=16u8).collect::<Vec<_>>());
            }
            other => panic!("Expected ReadData, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_read_data_short_chunk() {
        // size nibble 7 → 8 bytes
        let bytes = [
            0xA1, 0x21, 0x00, 0x00, 0x70, 0x00, 0x34, 1, 2, 3, 4, 5, 6, 7, 8, 9, 9,
        ];
        match parse_report(&frame(&bytes)).unwrap() {
            Report::ReadData(read) => {
                assert_eq!(read.size, 8);
                assert_eq!(read.data, vec![1, 2, 3, 4, 5, 6, 7, 8]);
            }
            other => panic!("Expected ReadData, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_read_data_rejects_missing_payload() {
        // Declares 16 bytes but the frame only carries 4
        let bytes = [0xA1, 0x21, 0x00, 0x00, 0xF0, 0x00, 0x24, 0x13, 0x88, 0x13, 0xEC];
        assert_eq!(
            parse_report(&bytes),
            Err(ParseError::TooShort {
                expected: 23,
                got: 11
            })
        );
    }

    #[test]
    fn test_parse_read_data_exact_length() {
        // 4 declared bytes, no padding
        let bytes = [0xA1, 0x21, 0x00, 0x00, 0x30, 0x00, 0x34, 0x13, 0x88, 0x13, 0xEC];
        match parse_report(&bytes).unwrap() {
            Report::ReadData(read) => {
                assert_eq!(read.size, 4);
                assert_eq!(read.data, vec![0x13, 0x88, 0x13, 0xEC]);
            }
            other => panic!("Expected ReadData, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_status() {
        let f = frame(&[0xA1, 0x20, 0x00, 0x00, 0x12, 0x00, 0x00, 0xC0]);
        match parse_report(&f).unwrap() {
            Report::Status(status) => {
                assert_eq!(status.battery, 0xC0);
                assert!(status.extension_connected());
                assert!(status.led_on());
            }
            other => panic!("Expected Status, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_ack_and_other() {
        let ack = parse_report(&frame(&[0xA1, 0x22, 0x00, 0x00, 0x16, 0x00])).unwrap();
        assert_eq!(
            ack,
            Report::Ack(AckReport {
                buttons: 0,
                report: 0x16,
                error: 0
            })
        );
        let other = parse_report(&frame(&[0xA1, 0x3D])).unwrap();
        assert_eq!(other, Report::Other { report_id: 0x3D });
        assert_eq!(other.report_id(), 0x3D);
    }

    #[test]
    fn test_rejects_short_and_foreign_frames() {
        assert_eq!(
            parse_report(&[0xA1]),
            Err(ParseError::TooShort {
                expected: 2,
                got: 1
            })
        );
        assert_eq!(
            parse_report(&[0xA1, 0x32, 0x00, 0x00, 0x01]),
            Err(ParseError::TooShort {
                expected: 12,
                got: 5
            })
        );
        assert_eq!(
            parse_report(&frame(&[0x52, 0x32])),
            Err(ParseError::BadHeader(0x52))
        );
    }
}
