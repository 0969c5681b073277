//! Load-cell calibration
//!
//! The board stores a 24-byte factory calibration block: for each of the
//! three reference loads (0, 17 and 34 kg) the raw ADC reading of each of the
//! four sensors, big-endian. It arrives as two register-read chunks, a full
//! 16-byte one (0 kg and 17 kg rows) followed by an 8-byte one (34 kg row).
//!
//! Weights are interpolated linearly between neighbouring reference readings
//! and extrapolated past the 34 kg row without a clamp.

use serde::Serialize;
use tracing::{debug, warn};
use wiiboard_transport::protocol::MAX_READ_CHUNK;

use crate::event::SensorPosition;

/// Initial value for every cell; with all three rows equal the column has no
/// usable segment and weighs nothing
pub const SENTINEL: u16 = 10_000;

/// Reference load per calibration row, in kilograms
pub const REFERENCE_KG: [f64; 3] = [0.0, 17.0, 34.0];

/// Kilograms between two neighbouring reference rows
const STEP_KG: f64 = 17.0;

/// 3 × 4 raw readings: rows are reference loads, columns are sensor positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalibrationMatrix {
    rows: [[u16; 4]; 3],
}

impl Default for CalibrationMatrix {
    fn default() -> Self {
        Self {
            rows: [[SENTINEL; 4]; 3],
        }
    }
}

impl CalibrationMatrix {
    pub fn new(rows: [[u16; 4]; 3]) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[[u16; 4]; 3] {
        &self.rows
    }

    /// Raw reading of `position` at reference row `row` (0 = 0 kg, 1 = 17 kg, 2 = 34 kg)
    pub fn get(&self, row: usize, position: SensorPosition) -> u16 {
        self.rows[row][position.column()]
    }
}

/// What a calibration chunk contributed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationProgress {
    /// 0 kg and 17 kg rows written
    Partial,
    /// 34 kg row written
    Complete,
    /// Chunk did not match either layout
    Ignored,
}

/// Holds and interprets the calibration matrix
#[derive(Debug, Clone, Default)]
pub struct CalibrationStore {
    matrix: CalibrationMatrix,
    complete: bool,
}

impl CalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_matrix(matrix: CalibrationMatrix) -> Self {
        Self {
            matrix,
            complete: true,
        }
    }

    pub fn matrix(&self) -> &CalibrationMatrix {
        &self.matrix
    }

    /// True once the 34 kg row has been written
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Store one register-read chunk of the calibration block
    ///
    /// - 16 bytes: eight big-endian values, row 0 then row 1, columns in sensor order
    /// - under 16 bytes: up to four big-endian values for row 2; columns
    ///   the chunk does not reach keep their previous value
    pub fn parse(&mut self, payload: &[u8]) -> CalibrationProgress {
        if payload.len() == MAX_READ_CHUNK {
            let mut values = payload
                .chunks_exact(2)
                .map(|b| u16::from_be_bytes([b[0], b[1]]));
            for row in self.matrix.rows.iter_mut().take(2) {
                for cell in row.iter_mut() {
                    if let Some(v) = values.next() {
                        *cell = v;
                    }
                }
            }
            debug!("Calibration rows 0/17 kg: {:?}", &self.matrix.rows[..2]);
            CalibrationProgress::Partial
        } else if !payload.is_empty() && payload.len() < MAX_READ_CHUNK {
            for (cell, b) in self.matrix.rows[2].iter_mut().zip(payload.chunks_exact(2)) {
                *cell = u16::from_be_bytes([b[0], b[1]]);
            }
            self.complete = true;
            debug!("Calibration row 34 kg: {:?}", self.matrix.rows[2]);
            CalibrationProgress::Complete
        } else {
            warn!(
                "Ignoring calibration chunk of {} bytes: {:02X?}",
                payload.len(),
                payload
            );
            CalibrationProgress::Ignored
        }
    }

    /// Convert a raw reading to kilograms
    ///
    /// Piecewise linear through (cal0, 0 kg), (cal1, 17 kg), (cal2, 34 kg);
    /// zero below cal0, exactly 17 at cal1, unbounded above. A column whose
    /// 17 kg reading does not exceed its 0 kg reading (all sentinels) weighs nothing.
    pub fn calc_mass(&self, raw: u16, position: SensorPosition) -> f64 {
        let raw = f64::from(raw);
        let c0 = f64::from(self.matrix.get(0, position));
        let c1 = f64::from(self.matrix.get(1, position));
        let c2 = f64::from(self.matrix.get(2, position));

        if raw < c0 || c1 <= c0 {
            0.0
        } else if raw < c1 {
            STEP_KG * (raw - c0) / (c1 - c0)
        } else if raw > c1 && c2 > c1 {
            REFERENCE_KG[1] + STEP_KG * (raw - c1) / (c2 - c1)
        } else {
            // raw == c1, or a degenerate upper segment
            REFERENCE_KG[1]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CalibrationMatrix {
        CalibrationMatrix::new([
            [1000, 1100, 1200, 1300],
            [3000, 3100, 3200, 3300],
            [5000, 5100, 5200, 5300],
        ])
    }

    fn chunks(matrix: &CalibrationMatrix) -> (Vec<u8>, Vec<u8>) {
        let rows = matrix.rows();
        let first = rows[..2]
            .iter()
            .flatten()
            .flat_map(|v| v.to_be_bytes())
            .collect();
        let second = rows[2].iter().flat_map(|v| v.to_be_bytes()).collect();
        (first, second)
    }

    #[test]
    fn test_uncalibrated_weighs_nothing() {
        let store = CalibrationStore::new();
        assert!(!store.is_complete());
        for pos in SensorPosition::ALL {
            assert_eq!(store.calc_mass(0, pos), 0.0);
            assert_eq!(store.calc_mass(9_999, pos), 0.0);
            assert_eq!(store.calc_mass(SENTINEL, pos), 0.0);
            assert_eq!(store.calc_mass(u16::MAX, pos), 0.0);
        }
    }

    #[test]
    fn test_chunks_rebuild_matrix() {
        let matrix = sample();
        let (first, second) = chunks(&matrix);
        assert_eq!(first.len(), 16);
        assert_eq!(second.len(), 8);

        let mut store = CalibrationStore::new();
        assert_eq!(store.parse(&first), CalibrationProgress::Partial);
        assert!(!store.is_complete());
        assert_eq!(store.parse(&second), CalibrationProgress::Complete);
        assert!(store.is_complete());
        assert_eq!(store.matrix(), &matrix);
    }

    #[test]
    fn test_column_order() {
        let mut store = CalibrationStore::new();
        let (first, second) = chunks(&sample());
        store.parse(&first);
        store.parse(&second);
        let m = store.matrix();
        assert_eq!(m.get(0, SensorPosition::TopRight), 1000);
        assert_eq!(m.get(0, SensorPosition::BottomRight), 1100);
        assert_eq!(m.get(1, SensorPosition::TopLeft), 3200);
        assert_eq!(m.get(2, SensorPosition::BottomLeft), 5300);
    }

    #[test]
    fn test_malformed_chunks_ignored() {
        let mut store = CalibrationStore::new();
        assert_eq!(store.parse(&[]), CalibrationProgress::Ignored);
        assert_eq!(store.parse(&[0u8; 18]), CalibrationProgress::Ignored);
        assert_eq!(store.matrix(), &CalibrationMatrix::default());
        assert!(!store.is_complete());
    }

    #[test]
    fn test_short_last_chunk_fills_leading_columns() {
        let mut store = CalibrationStore::new();
        assert_eq!(
            store.parse(&[0x13, 0x88, 0x13, 0xEC]),
            CalibrationProgress::Complete
        );
        assert_eq!(store.matrix().rows()[2], [5000, 5100, SENTINEL, SENTINEL]);
        assert!(store.is_complete());
    }

    #[test]
    fn test_zero_at_and_below_reference() {
        let store = CalibrationStore::from_matrix(sample());
        for pos in SensorPosition::ALL {
            let c0 = store.matrix().get(0, pos);
            assert_eq!(store.calc_mass(c0, pos), 0.0);
            assert_eq!(store.calc_mass(c0 - 1, pos), 0.0);
            assert_eq!(store.calc_mass(0, pos), 0.0);
        }
    }

    #[test]
    fn test_exactly_17_at_middle_reference() {
        let store = CalibrationStore::from_matrix(sample());
        for pos in SensorPosition::ALL {
            let c1 = store.matrix().get(1, pos);
            assert_eq!(store.calc_mass(c1, pos), 17.0);
        }
    }

    #[test]
    fn test_interpolation_and_extrapolation() {
        let store = CalibrationStore::from_matrix(sample());
        let pos = SensorPosition::TopRight;
        assert!((store.calc_mass(2000, pos) - 8.5).abs() < 1e-9);
        assert!((store.calc_mass(4000, pos) - 25.5).abs() < 1e-9);
        assert!((store.calc_mass(5000, pos) - 34.0).abs() < 1e-9);
        // No clamp past the heaviest reference
        assert!((store.calc_mass(7000, pos) - 51.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_decreasing() {
        let store = CalibrationStore::from_matrix(sample());
        for pos in SensorPosition::ALL {
            let mut prev = f64::MIN;
            for raw in (0..=8000u16).step_by(7) {
                let kg = store.calc_mass(raw, pos);
                assert!(kg >= prev, "{pos:?}: {raw} gave {kg} < {prev}");
                prev = kg;
            }
        }
    }

    #[test]
    fn test_degenerate_upper_segment() {
        let store = CalibrationStore::from_matrix(CalibrationMatrix::new([
            [1000; 4], [3000; 4], [3000; 4],
        ]));
        assert_eq!(store.calc_mass(4000, SensorPosition::TopLeft), 17.0);
    }

    #[test]
    fn test_reference_equal_to_sentinel_is_a_real_value() {
        let store = CalibrationStore::from_matrix(CalibrationMatrix::new([
            [SENTINEL; 4], [12_000; 4], [14_000; 4],
        ]));
        let pos = SensorPosition::BottomRight;
        assert_eq!(store.calc_mass(SENTINEL, pos), 0.0);
        assert!((store.calc_mass(11_000, pos) - 8.5).abs() < 1e-9);
        assert_eq!(store.calc_mass(12_000, pos), 17.0);
    }

    #[test]
    fn test_degenerate_lower_segment_weighs_nothing() {
        let store = CalibrationStore::from_matrix(CalibrationMatrix::new([
            [2000; 4], [2000; 4], [4000; 4],
        ]));
        assert_eq!(store.calc_mass(2000, SensorPosition::TopRight), 0.0);
        assert_eq!(store.calc_mass(3000, SensorPosition::TopRight), 0.0);
    }
}
