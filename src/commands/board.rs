//! Commands that hold a live board session.
//!
//! These run on a blocking thread: the driver API is synchronous and the
//! board's own receive loop does the reading.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::sleep;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use tracing::{debug, info, warn};
use wiiboard::{BalanceBoard, BoardConfig, BoardEvent, CalibrationMatrix, SensorPosition};

use super::{setup_interrupt_handler, CommandResult};

/// How often the event channel is polled
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The board answers the calibration read within a few hundred milliseconds
const CALIBRATION_TIMEOUT: Duration = Duration::from_secs(5);

const STATUS_TIMEOUT: Duration = Duration::from_secs(2);

/// Options for `watch`
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
    pub json: bool,
    pub light: bool,
    pub count: Option<usize>,
}

fn open(address: &str, config: BoardConfig) -> anyhow::Result<BalanceBoard> {
    let board = BalanceBoard::with_config(config);
    board
        .connect(address)
        .with_context(|| format!("Failed to connect to {address}"))?;
    Ok(board)
}

fn wait_for_calibration(board: &BalanceBoard, running: &AtomicBool) -> CommandResult {
    let deadline = Instant::now() + CALIBRATION_TIMEOUT;
    while !board.is_calibrated() {
        if !running.load(Ordering::SeqCst) {
            bail!("Interrupted before calibration finished");
        }
        if !board.is_connected() {
            bail!("Board disconnected during calibration");
        }
        if Instant::now() >= deadline {
            bail!("Timed out waiting for calibration data");
        }
        sleep(POLL_INTERVAL);
    }
    debug!("Calibration: {:?}", board.calibration().rows());
    Ok(())
}

/// One line per event for the terminal
pub fn format_event(event: &BoardEvent) -> String {
    let mut line = format!(
        "TL {:6.2}  TR {:6.2}  BL {:6.2}  BR {:6.2}  total {:6.2} kg",
        event.top_left(),
        event.top_right(),
        event.bottom_left(),
        event.bottom_right(),
        event.total_weight()
    );
    if event.button_pressed() {
        line.push_str("  [button pressed]");
    } else if event.button_released() {
        line.push_str("  [button released]");
    }
    line
}

/// Stream events until Ctrl-C, a disconnect, or `count` events.
pub fn watch(address: &str, config: BoardConfig, options: WatchOptions) -> CommandResult {
    let running = setup_interrupt_handler();
    let board = open(address, config)?;
    wait_for_calibration(&board, &running)?;

    if options.light {
        board.set_light(true)?;
    }
    if !options.json {
        println!("Streaming events from {address} (Ctrl-C to stop)");
    }

    let mut printed = 0usize;
    'outer: while running.load(Ordering::SeqCst) && board.is_connected() {
        let events = board.events().drain();
        if events.is_empty() {
            sleep(POLL_INTERVAL);
            continue;
        }
        // Oldest first on screen
        for event in events.iter().rev() {
            if options.json {
                println!("{}", serde_json::to_string(event)?);
            } else {
                println!("{}", format_event(event));
            }
            printed += 1;
            if options.count.is_some_and(|limit| printed >= limit) {
                break 'outer;
            }
        }
    }

    if !board.is_connected() {
        warn!("Board disconnected");
    }
    if options.light && board.is_connected() {
        if let Err(e) = board.set_light(false) {
            debug!("Could not switch the LED off: {}", e);
        }
    }
    board.disconnect();
    info!("Printed {} events", printed);
    Ok(())
}

/// Switch the power button LED.
pub fn light(address: &str, config: BoardConfig, on: bool) -> CommandResult {
    let board = open(address, config)?;
    board.set_light(on)?;
    println!("LED {}", if on { "on" } else { "off" });
    board.disconnect();
    Ok(())
}

fn print_matrix(matrix: &CalibrationMatrix) {
    println!("{:>14} {:>8} {:>8} {:>8}", "", "0 kg", "17 kg", "34 kg");
    for position in SensorPosition::ALL {
        let values: Vec<String> = (0..3)
            .map(|row| {
                let value = matrix.get(row, position);
                format!("{value:>8}")
            })
            .collect();
        println!("{:>14} {}", position.name(), values.join(" "));
    }
}

/// Connect, wait for the calibration block and print it.
pub fn calibration(address: &str, config: BoardConfig, json: bool) -> CommandResult {
    let running = setup_interrupt_handler();
    let board = open(address, config)?;
    let result = wait_for_calibration(&board, &running);
    let matrix = board.calibration();
    board.disconnect();
    result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&matrix)?);
    } else {
        print_matrix(&matrix);
    }
    Ok(())
}

/// Request a status report and print the battery byte.
pub fn battery(address: &str, config: BoardConfig) -> CommandResult {
    let board = open(address, config)?;
    board.request_status()?;

    let deadline = Instant::now() + STATUS_TIMEOUT;
    let level = loop {
        if let Some(level) = board.battery() {
            break Some(level);
        }
        if Instant::now() >= deadline || !board.is_connected() {
            break None;
        }
        sleep(POLL_INTERVAL);
    };
    board.disconnect();

    match level {
        Some(level) => println!("Battery: 0x{level:02X} ({level}/255)"),
        None => bail!("No status report received"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_event() {
        let event = BoardEvent::new(1.0, 2.5, 3.0, 4.25, false, false);
        assert_eq!(
            format_event(&event),
            "TL   1.00  TR   2.50  BL   3.00  BR   4.25  total  10.75 kg"
        );
    }

    #[test]
    fn test_format_button_edges() {
        let pressed = BoardEvent::new(0.0, 0.0, 0.0, 0.0, true, false);
        assert!(format_event(&pressed).ends_with("[button pressed]"));
        let released = BoardEvent::new(0.0, 0.0, 0.0, 0.0, false, true);
        assert!(format_event(&released).ends_with("[button released]"));
    }
}
