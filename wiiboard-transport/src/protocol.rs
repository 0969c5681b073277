//! Protocol constants and utilities for Wii Balance Board communication
//!
//! Frame layout on both channels:
//!
//! - Outbound: `[0x52] [cmd] [data...]` on the control channel
//! - Inbound:  `[0xA1] [report id] [buttons hi] [buttons lo] [payload...]`

/// L2CAP protocol service multiplexers
pub mod psm {
    /// HID control channel (outbound commands)
    pub const CONTROL: u16 = 0x11;
    /// HID interrupt channel (inbound reports)
    pub const RECEIVE: u16 = 0x13;
}

/// Transaction header bytes
pub mod header {
    /// DATA | Output report, prefixes every outbound command
    pub const OUTPUT_REPORT: u8 = 0x52;
    /// DATA | Input report, prefixes every inbound report
    pub const INPUT_REPORT: u8 = 0xA1;
}

/// Output report ids (host → board)
pub mod cmd {
    pub const LIGHT: u8 = 0x11;
    pub const REPORTING: u8 = 0x12;
    pub const REQUEST_STATUS: u8 = 0x15;
    pub const WRITE_REGISTER: u8 = 0x16;
    pub const READ_REGISTER: u8 = 0x17;

    /// Get human-readable name for command byte
    pub fn name(cmd: u8) -> &'static str {
        match cmd {
            LIGHT => "LIGHT",
            REPORTING => "REPORTING",
            REQUEST_STATUS => "REQUEST_STATUS",
            WRITE_REGISTER => "WRITE_REGISTER",
            READ_REGISTER => "READ_REGISTER",
            _ => "UNKNOWN",
        }
    }
}

/// Input report ids (board → host)
pub mod input {
    /// Status: buttons, flags, battery
    pub const STATUS: u8 = 0x20;
    /// Register read response
    pub const READ_DATA: u8 = 0x21;
    /// Acknowledgment of an output report
    pub const ACK: u8 = 0x22;
    /// Core buttons + 8 extension bytes
    pub const EXTENSION_8BYTES: u8 = 0x32;

    /// Get human-readable name for input report id
    pub fn name(id: u8) -> &'static str {
        match id {
            STATUS => "STATUS",
            READ_DATA => "READ_DATA",
            ACK => "ACK",
            EXTENSION_8BYTES => "EXTENSION_8BYTES",
            _ => "UNKNOWN",
        }
    }
}

/// Register addresses (the top byte 0x04 selects the control register space)
pub mod register {
    /// Extension controller init register
    pub const EXTENSION_ENABLE: u32 = 0x04A4_0040;
    /// Start of the factory calibration block
    pub const CALIBRATION: u32 = 0x04A4_0024;
    /// Calibration block size: 3 reference loads × 4 sensors × 2 bytes
    pub const CALIBRATION_LEN: u16 = 24;
}

/// Reporting mode flags
pub mod reporting {
    /// Report continuously instead of only on change
    pub const CONTINUOUS: u8 = 0x04;
}

/// Power button LED payload values
pub mod led {
    pub const ON: u8 = 0x10;
    pub const OFF: u8 = 0x00;
}

/// Size of one inbound frame read from the receive channel
pub const REPORT_SIZE: usize = 25;

/// Largest payload of a single read-data report
pub const MAX_READ_CHUNK: usize = 16;

/// Core button field value while the power button is held
pub const BUTTON_DOWN_MASK: u16 = 0x0008;

/// Name the board advertises during inquiry
pub const DEVICE_NAME: &str = "Nintendo RVL-WBC-01";

/// Build a command buffer with a report-id placeholder
///
/// Format: `[0x00] [cmd] [data...]`. The placeholder is rewritten by
/// [`frame_output`] right before the bytes hit the control channel.
pub fn build_command(cmd: u8, data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(data.len() + 2);
    buf.push(0);
    buf.push(cmd);
    buf.extend_from_slice(data);
    buf
}

/// Rewrite the header byte of a command to the output-report prefix
pub fn frame_output(command: &[u8]) -> Vec<u8> {
    let mut frame = command.to_vec();
    match frame.first_mut() {
        Some(first) => *first = header::OUTPUT_REPORT,
        None => frame.push(header::OUTPUT_REPORT),
    }
    frame
}
