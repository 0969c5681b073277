//! Weight events decoded from extension reports

use serde::Serialize;
use tracing::debug;
use wiiboard_transport::protocol::BUTTON_DOWN_MASK;
use wiiboard_transport::ExtensionReport;

use crate::calibration::CalibrationStore;

/// Load-cell position; the discriminant is the calibration column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SensorPosition {
    TopRight = 0,
    BottomRight = 1,
    TopLeft = 2,
    BottomLeft = 3,
}

impl SensorPosition {
    /// All positions in wire order
    pub const ALL: [SensorPosition; 4] = [
        SensorPosition::TopRight,
        SensorPosition::BottomRight,
        SensorPosition::TopLeft,
        SensorPosition::BottomLeft,
    ];

    pub fn column(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            SensorPosition::TopRight => "top right",
            SensorPosition::BottomRight => "bottom right",
            SensorPosition::TopLeft => "top left",
            SensorPosition::BottomLeft => "bottom left",
        }
    }
}

/// One calibrated sample from the board
///
/// `total_weight` is always the sum of the four corners; events are built
/// once per extension report and never modified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoardEvent {
    top_left: f64,
    top_right: f64,
    bottom_left: f64,
    bottom_right: f64,
    button_pressed: bool,
    button_released: bool,
    total_weight: f64,
}

impl BoardEvent {
    pub fn new(
        top_left: f64,
        top_right: f64,
        bottom_left: f64,
        bottom_right: f64,
        button_pressed: bool,
        button_released: bool,
    ) -> Self {
        Self {
            top_left,
            top_right,
            bottom_left,
            bottom_right,
            button_pressed,
            button_released,
            total_weight: top_left + top_right + bottom_left + bottom_right,
        }
    }

    pub fn top_left(&self) -> f64 {
        self.top_left
    }

    pub fn top_right(&self) -> f64 {
        self.top_right
    }

    pub fn bottom_left(&self) -> f64 {
        self.bottom_left
    }

    pub fn bottom_right(&self) -> f64 {
        self.bottom_right
    }

    /// Weight on one corner, in kilograms
    pub fn weight(&self, position: SensorPosition) -> f64 {
        match position {
            SensorPosition::TopRight => self.top_right,
            SensorPosition::BottomRight => self.bottom_right,
            SensorPosition::TopLeft => self.top_left,
            SensorPosition::BottomLeft => self.bottom_left,
        }
    }

    /// Power button went down since the previous event
    pub fn button_pressed(&self) -> bool {
        self.button_pressed
    }

    /// Power button came up since the previous event
    pub fn button_released(&self) -> bool {
        self.button_released
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }
}

/// Turns extension reports into events, tracking the button edge between them
#[derive(Debug, Default)]
pub struct EventDecoder {
    button_down: bool,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_button_down(&self) -> bool {
        self.button_down
    }

    pub fn decode(&mut self, report: &ExtensionReport, calibration: &CalibrationStore) -> BoardEvent {
        let down = report.buttons == BUTTON_DOWN_MASK;
        let pressed = down && !self.button_down;
        let released = !down && self.button_down;
        if pressed {
            debug!("Button pressed");
        } else if released {
            debug!("Button released");
        }
        self.button_down = down;

        let raw = &report.sensors;
        BoardEvent::new(
            calibration.calc_mass(raw.top_left, SensorPosition::TopLeft),
            calibration.calc_mass(raw.top_right, SensorPosition::TopRight),
            calibration.calc_mass(raw.bottom_left, SensorPosition::BottomLeft),
            calibration.calc_mass(raw.bottom_right, SensorPosition::BottomRight),
            pressed,
            released,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationMatrix;
    use wiiboard_transport::RawSensors;

    fn report(buttons: u16, sensors: RawSensors) -> ExtensionReport {
        ExtensionReport { buttons, sensors }
    }

    fn store() -> CalibrationStore {
        CalibrationStore::from_matrix(CalibrationMatrix::new([
            [1000, 1100, 1200, 1300],
            [3000, 3100, 3200, 3300],
            [5000, 5100, 5200, 5300],
        ]))
    }

    #[test]
    fn test_button_edges() {
        let cal = store();
        let mut decoder = EventDecoder::new();
        let sensors = RawSensors::default();

        let first = decoder.decode(&report(BUTTON_DOWN_MASK, sensors), &cal);
        assert!(first.button_pressed());
        assert!(!first.button_released());

        let held = decoder.decode(&report(BUTTON_DOWN_MASK, sensors), &cal);
        assert!(!held.button_pressed());
        assert!(!held.button_released());

        let up = decoder.decode(&report(0, sensors), &cal);
        assert!(!up.button_pressed());
        assert!(up.button_released());

        let idle = decoder.decode(&report(0, sensors), &cal);
        assert!(!idle.button_pressed());
        assert!(!idle.button_released());
    }

    #[test]
    fn test_other_button_bits_are_not_a_press() {
        let mut decoder = EventDecoder::new();
        let event = decoder.decode(&report(0x0009, RawSensors::default()), &store());
        assert!(!event.button_pressed());
        assert!(!decoder.is_button_down());
    }

    #[test]
    fn test_weights_follow_sensor_columns() {
        let mut decoder = EventDecoder::new();
        let event = decoder.decode(
            &report(
                0,
                RawSensors {
                    top_right: 3000,
                    bottom_right: 1100,
                    top_left: 5200,
                    bottom_left: 1300,
                },
            ),
            &store(),
        );
        assert_eq!(event.top_right(), 17.0);
        assert_eq!(event.bottom_right(), 0.0);
        assert!((event.top_left() - 34.0).abs() < 1e-9);
        assert_eq!(event.bottom_left(), 0.0);
        assert!((event.total_weight() - 51.0).abs() < 1e-9);
        assert_eq!(event.weight(SensorPosition::TopRight), 17.0);
    }

    #[test]
    fn test_total_is_sum() {
        let event = BoardEvent::new(1.5, 2.0, 3.25, 0.25, false, false);
        assert_eq!(event.total_weight(), 7.0);
    }

    #[test]
    fn test_serializes_all_fields() {
        let json = serde_json::to_value(BoardEvent::new(1.0, 2.0, 3.0, 4.0, true, false)).unwrap();
        assert_eq!(json["total_weight"], 10.0);
        assert_eq!(json["button_pressed"], true);
        assert_eq!(json["top_left"], 1.0);
    }
}
