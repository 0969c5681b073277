//! Connection management and the receive loop
//!
//! A [`BalanceBoard`] owns the two device sockets and a single background
//! thread that reads reports from the receive channel. Everything the board
//! sends (calibration, status, sensor data) is handled on that thread; the
//! consumer only pops events and issues commands.
//!
//! # State machine
//!
//! ```text
//! Disconnected --connect--> Connected --disconnect--> Disconnecting --(loop exits)--> Disconnected
//!                           Connected --(socket error / hang-up)------------------> Disconnected
//! ```
//!
//! The receive loop runs while the state is `Connected`. `disconnect` flips the
//! state, closes both sockets out of band to wake the blocked read, and waits
//! until the loop has observed the change.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, trace, warn};
use wiiboard_transport::command::{self, BoardCommand};
use wiiboard_transport::protocol::{self, MAX_READ_CHUNK, REPORT_SIZE};
use wiiboard_transport::{
    parse_report, BdAddr, BoxedChannel, Connector, ReadDataReport, Report, TransportError,
};

use crate::calibration::{CalibrationMatrix, CalibrationStore};
use crate::channel::EventChannel;
use crate::config::BoardConfig;
use crate::error::BoardError;
use crate::event::{BoardEvent, EventDecoder};

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Disconnecting,
}

struct Sockets {
    control: BoxedChannel,
    receive: BoxedChannel,
}

/// State shared between the consumer and the receive thread
struct Shared {
    state: Mutex<ConnectionState>,
    state_changed: Condvar,
    sockets: Mutex<Option<Sockets>>,
    address: Mutex<Option<BdAddr>>,
    calibration: RwLock<CalibrationStore>,
    calibration_pending: AtomicBool,
    events: EventChannel,
    latest: Mutex<Option<BoardEvent>>,
    battery: Mutex<Option<u8>>,
    led: AtomicBool,
}

impl Shared {
    fn new(config: &BoardConfig) -> Self {
        Self {
            state: Mutex::new(ConnectionState::Disconnected),
            state_changed: Condvar::new(),
            sockets: Mutex::new(None),
            address: Mutex::new(None),
            calibration: RwLock::new(CalibrationStore::new()),
            calibration_pending: AtomicBool::new(false),
            events: EventChannel::new(config.event_capacity),
            latest: Mutex::new(None),
            battery: Mutex::new(None),
            led: AtomicBool::new(false),
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn set_state(&self, next: ConnectionState) {
        let mut state = self.state.lock();
        if *state != next {
            debug!("Connection state {:?} -> {:?}", *state, next);
            *state = next;
        }
        self.state_changed.notify_all();
    }

    /// Write a command to the control socket; returns false when not connected
    fn send_raw(&self, command: &[u8]) -> Result<bool, TransportError> {
        if self.state() != ConnectionState::Connected {
            debug!("Not connected, dropping command {:02X?}", command);
            return Ok(false);
        }
        let control = match self.sockets.lock().as_ref() {
            Some(sockets) => Arc::clone(&sockets.control),
            None => return Ok(false),
        };
        let frame = protocol::frame_output(command);
        debug!(
            "Sending {}: {:02X?}",
            protocol::cmd::name(frame.get(1).copied().unwrap_or(0)),
            frame
        );
        control.send(&frame)?;
        Ok(true)
    }

    /// Close both sockets if still held; close errors are ignored
    fn close_sockets(&self) {
        let Some(sockets) = self.sockets.lock().take() else {
            return;
        };
        for (name, channel) in [("receive", sockets.receive), ("control", sockets.control)] {
            if let Err(e) = channel.close() {
                debug!("Ignoring {} socket close error: {}", name, e);
            }
        }
    }

    fn handle_frame(&self, frame: &[u8], decoder: &mut EventDecoder) {
        let report = match parse_report(frame) {
            Ok(report) => report,
            Err(e) => {
                warn!("Ignoring malformed report ({}): {:02X?}", e, frame);
                return;
            }
        };

        match report {
            Report::Status(status) => {
                debug!(
                    "Status report: battery 0x{:02X}, flags 0x{:02X}",
                    status.battery, status.flags
                );
                *self.battery.lock() = Some(status.battery);
                // A status report resets the active reporting mode
                if let Err(e) = self.send_raw(&command::set_report_type().build()) {
                    warn!("Failed to restore report mode: {}", e);
                }
            }
            Report::ReadData(read) => self.handle_read_data(&read),
            Report::Extension(ext) => {
                let event = decoder.decode(&ext, &self.calibration.read());
                *self.latest.lock() = Some(event);
                if let Err(full) = self.events.push(event) {
                    trace!("Dropping event: {}", full);
                }
            }
            Report::Ack(ack) => {
                debug!(
                    "ACK for {} (error 0x{:02X})",
                    protocol::cmd::name(ack.report),
                    ack.error
                );
            }
            Report::Other { report_id } => {
                debug!("Ignoring report 0x{:02X}", report_id);
            }
        }
    }

    fn handle_read_data(&self, read: &ReadDataReport) {
        if !self.calibration_pending.load(Ordering::Acquire) {
            debug!("Ignoring unsolicited read data at 0x{:04X}", read.offset);
            return;
        }
        if read.error != 0 {
            warn!(
                "Calibration read at 0x{:04X} failed with error 0x{:X}",
                read.offset, read.error
            );
            return;
        }

        info!("Calibration input received");
        self.calibration.write().parse(&read.data);
        if read.size < MAX_READ_CHUNK {
            self.calibration_pending.store(false, Ordering::Release);
            info!("Ready for input, please stand on the board");
        }
    }
}

/// Body of the receive thread
fn run_receive_loop(shared: Arc<Shared>, receive: BoxedChannel) {
    debug!("Receive loop started");
    let mut decoder = EventDecoder::new();
    let mut buf = [0u8; REPORT_SIZE];

    while shared.state() == ConnectionState::Connected {
        match receive.recv(&mut buf) {
            Ok(0) => {
                if shared.state() == ConnectionState::Connected {
                    info!("Balance board closed the connection");
                }
                break;
            }
            Ok(len) => {
                trace!("Received {} bytes: {:02X?}", len, &buf[..len]);
                shared.handle_frame(&buf[..len], &mut decoder);
            }
            Err(e) => {
                if shared.state() == ConnectionState::Connected {
                    if e.is_disconnect() {
                        info!("Balance board connection lost: {}", e);
                    } else {
                        warn!("Receive failed: {}", e);
                    }
                }
                break;
            }
        }
    }

    shared.close_sockets();
    shared.calibration_pending.store(false, Ordering::Release);
    *shared.address.lock() = None;
    shared.set_state(ConnectionState::Disconnected);
    debug!("Receive loop exiting");
}

/// Driver for one Wii Balance Board
///
/// All methods take `&self`; share it across threads with an `Arc`.
pub struct BalanceBoard {
    connector: Arc<dyn Connector>,
    config: BoardConfig,
    shared: Arc<Shared>,
    /// Serializes connect/disconnect
    session: Mutex<()>,
    receiver: Mutex<Option<JoinHandle<()>>>,
}

#[cfg(target_os = "linux")]
impl Default for BalanceBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl BalanceBoard {
    /// Board driver over L2CAP sockets with default settings
    #[cfg(target_os = "linux")]
    pub fn new() -> Self {
        Self::with_config(BoardConfig::default())
    }

    #[cfg(target_os = "linux")]
    pub fn with_config(config: BoardConfig) -> Self {
        Self::with_connector(Arc::new(wiiboard_transport::L2capConnector), config)
    }

    /// Board driver over any channel backend
    pub fn with_connector(connector: Arc<dyn Connector>, config: BoardConfig) -> Self {
        let shared = Arc::new(Shared::new(&config));
        Self {
            connector,
            config,
            shared,
            session: Mutex::new(()),
            receiver: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    // === Connection ===

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Address of the live session
    pub fn address(&self) -> Option<BdAddr> {
        *self.shared.address.lock()
    }

    /// Connect to the board at `address` (`XX:XX:XX:XX:XX:XX`)
    pub fn connect(&self, address: &str) -> Result<(), BoardError> {
        let trimmed = address.trim();
        let address: BdAddr = trimmed
            .parse()
            .map_err(|_| BoardError::InvalidAddress(trimmed.to_string()))?;
        self.connect_to(address)
    }

    /// Open both sockets, run the calibration handshake and start the receive loop
    ///
    /// On socket failure the state stays `Disconnected`; nothing is retried.
    pub fn connect_to(&self, address: BdAddr) -> Result<(), BoardError> {
        let _session = self.session.lock();
        if self.shared.state() != ConnectionState::Disconnected {
            let current = self.address().unwrap_or(address);
            return Err(BoardError::AlreadyConnected(current));
        }
        self.reap_receiver();

        info!("Connecting to balance board at {}", address);
        let receive = self
            .connector
            .open(&address, self.config.receive_psm)
            .map_err(|source| BoardError::Connection { address, source })?;
        let control = match self.connector.open(&address, self.config.control_psm) {
            Ok(control) => control,
            Err(source) => {
                if let Err(e) = receive.close() {
                    debug!("Ignoring receive socket close error: {}", e);
                }
                return Err(BoardError::Connection { address, source });
            }
        };

        *self.shared.sockets.lock() = Some(Sockets {
            control,
            receive: Arc::clone(&receive),
        });
        *self.shared.address.lock() = Some(address);
        *self.shared.calibration.write() = CalibrationStore::new();
        *self.shared.latest.lock() = None;
        *self.shared.battery.lock() = None;
        self.shared.events.clear();
        self.shared.set_state(ConnectionState::Connected);
        info!("Connected to balance board at {}", address);

        if let Err(e) = self.handshake() {
            warn!("Handshake with {} failed: {}", address, e);
            self.abort_session();
            return Err(e);
        }

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("wiiboard-receive".into())
            .spawn(move || run_receive_loop(shared, receive));
        match spawned {
            Ok(handle) => {
                *self.receiver.lock() = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.abort_session();
                Err(BoardError::Io(e))
            }
        }
    }

    fn handshake(&self) -> Result<(), BoardError> {
        self.calibrate()?;
        self.send(&command::register_extension())?;
        self.set_report_type()
    }

    fn abort_session(&self) {
        self.shared.close_sockets();
        self.shared.calibration_pending.store(false, Ordering::Release);
        self.shared.set_state(ConnectionState::Disconnected);
        *self.shared.address.lock() = None;
    }

    /// Stop the session, blocking until the receive loop has exited
    ///
    /// When already disconnected this only makes sure the sockets are closed.
    pub fn disconnect(&self) {
        let _session = self.session.lock();
        let was_connected = {
            let mut state = self.shared.state.lock();
            if *state == ConnectionState::Connected {
                *state = ConnectionState::Disconnecting;
                self.shared.state_changed.notify_all();
                true
            } else {
                false
            }
        };

        // Closing out of band wakes the receive loop from its blocking read
        self.shared.close_sockets();
        if was_connected {
            info!("Disconnecting balance board");
            self.wait_for_receiver();
        }
        self.reap_receiver();
        *self.shared.address.lock() = None;
        info!("Balance board disconnected");
    }

    fn wait_for_receiver(&self) {
        let poll = self.config.disconnect_poll_interval();
        let mut state = self.shared.state.lock();
        while *state == ConnectionState::Disconnecting {
            let timed_out = self.shared.state_changed.wait_for(&mut state, poll).timed_out();
            if timed_out && *state == ConnectionState::Disconnecting && self.receiver_finished() {
                warn!("Receive loop ended without resetting the connection state");
                *state = ConnectionState::Disconnected;
            }
        }
    }

    fn receiver_finished(&self) -> bool {
        self.receiver
            .lock()
            .as_ref()
            .map_or(true, JoinHandle::is_finished)
    }

    fn reap_receiver(&self) {
        if let Some(handle) = self.receiver.lock().take() {
            if handle.join().is_err() {
                warn!("Receive loop panicked");
            }
        }
    }

    #[cfg(feature = "discovery")]
    /// Scan for a balance board and return the first match
    pub async fn discover(
        config: &wiiboard_transport::DiscoveryConfig,
    ) -> Result<Option<BdAddr>, BoardError> {
        let discovery = wiiboard_transport::BluezDiscovery::new(config.clone());
        Ok(discovery.find_board().await?)
    }

    // === Commands ===

    /// Send a typed command; a no-op unless connected
    pub fn send<C: BoardCommand>(&self, command: &C) -> Result<(), BoardError> {
        self.send_raw(&command.build())
    }

    /// Send raw command bytes; the first byte is replaced by the output-report header
    pub fn send_raw(&self, command: &[u8]) -> Result<(), BoardError> {
        self.shared.send_raw(command)?;
        Ok(())
    }

    fn ensure_connected(&self) -> Result<(), BoardError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(BoardError::NotConnected)
        }
    }

    /// Request the calibration block; the receive loop fills it in
    pub fn calibrate(&self) -> Result<(), BoardError> {
        self.ensure_connected()?;
        info!("Requesting calibration");
        self.shared.calibration_pending.store(true, Ordering::Release);
        self.send(&command::request_calibration())
    }

    /// Ask for continuous extension reports
    pub fn set_report_type(&self) -> Result<(), BoardError> {
        self.send(&command::set_report_type())
    }

    /// Switch the power button LED
    pub fn set_light(&self, on: bool) -> Result<(), BoardError> {
        self.ensure_connected()?;
        if self.shared.send_raw(&command::set_light(on).build())? {
            self.shared.led.store(on, Ordering::Release);
        }
        Ok(())
    }

    /// Last LED state sent to the board
    pub fn led(&self) -> bool {
        self.shared.led.load(Ordering::Acquire)
    }

    /// Ask the board for a status report (battery level)
    pub fn request_status(&self) -> Result<(), BoardError> {
        self.ensure_connected()?;
        self.send(&command::request_status())
    }

    /// Raw battery byte from the latest status report
    pub fn battery(&self) -> Option<u8> {
        *self.shared.battery.lock()
    }

    // === Events ===

    /// Pop the most recent buffered event
    pub fn get_event(&self) -> Option<BoardEvent> {
        self.shared.events.pop()
    }

    /// Last decoded event, whether or not it was buffered or consumed
    pub fn latest_event(&self) -> Option<BoardEvent> {
        *self.shared.latest.lock()
    }

    pub fn pending_events(&self) -> usize {
        self.shared.events.len()
    }

    pub fn events(&self) -> &EventChannel {
        &self.shared.events
    }

    // === Calibration ===

    pub fn calibration(&self) -> CalibrationMatrix {
        *self.shared.calibration.read().matrix()
    }

    /// True once all three reference rows have arrived
    pub fn is_calibrated(&self) -> bool {
        self.shared.calibration.read().is_complete()
    }

    /// True while a calibration request is outstanding
    pub fn is_calibrating(&self) -> bool {
        self.shared.calibration_pending.load(Ordering::Acquire)
    }
}

impl Drop for BalanceBoard {
    fn drop(&mut self) {
        if self.state() != ConnectionState::Disconnected {
            debug!("BalanceBoard dropped while connected, disconnecting");
            self.disconnect();
        }
    }
}
