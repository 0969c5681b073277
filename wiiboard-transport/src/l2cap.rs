//! Raw L2CAP sockets (Linux / BlueZ kernel stack)
//!
//! The board is a classic BR/EDR HID device, so it is reached with plain
//! `SOCK_SEQPACKET` L2CAP sockets: one per PSM. Each `recv` returns exactly
//! one HID frame.
//!
//! Closing is split in two: [`Channel::close`] issues `shutdown(SHUT_RDWR)`,
//! which wakes a `recv` blocked on another thread, while the descriptor itself
//! is released on drop, after every thread holding the socket has let go.

use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::address::BdAddr;
use crate::error::TransportError;
use crate::{BoxedChannel, Channel, Connector};

/// `BTPROTO_L2CAP` from `<bluetooth/bluetooth.h>` (not exported by libc)
const BTPROTO_L2CAP: libc::c_int = 0;

/// `BDADDR_BREDR` address type
const BDADDR_BREDR: u8 = 0x00;

/// `struct sockaddr_l2` from `<bluetooth/l2cap.h>`
#[repr(C)]
struct SockaddrL2 {
    l2_family: libc::sa_family_t,
    l2_psm: u16,
    l2_bdaddr: [u8; 6],
    l2_cid: u16,
    l2_bdaddr_type: u8,
}

/// Opens [`L2capSocket`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct L2capConnector;

impl Connector for L2capConnector {
    fn open(&self, address: &BdAddr, psm: u16) -> Result<BoxedChannel, TransportError> {
        let socket = L2capSocket::connect(address, psm)?;
        Ok(Arc::new(socket))
    }
}

/// A connected L2CAP sequenced-packet socket
#[derive(Debug)]
pub struct L2capSocket {
    fd: OwnedFd,
    address: BdAddr,
    psm: u16,
    closed: AtomicBool,
}

impl L2capSocket {
    /// Open a socket and connect it to `address` on `psm` (blocking)
    pub fn connect(address: &BdAddr, psm: u16) -> Result<Self, TransportError> {
        let connect_err = |source: io::Error| TransportError::Connect {
            address: *address,
            psm,
            source,
        };

        // SAFETY: plain socket(2) call; the result is checked before use.
        let raw = unsafe {
            libc::socket(
                libc::AF_BLUETOOTH,
                libc::SOCK_SEQPACKET | libc::SOCK_CLOEXEC,
                BTPROTO_L2CAP,
            )
        };
        if raw < 0 {
            return Err(connect_err(io::Error::last_os_error()));
        }
        // SAFETY: `raw` is a freshly created descriptor owned by nobody else.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let addr = SockaddrL2 {
            l2_family: libc::AF_BLUETOOTH as libc::sa_family_t,
            l2_psm: psm.to_le(),
            l2_bdaddr: address.to_le_bytes(),
            l2_cid: 0,
            l2_bdaddr_type: BDADDR_BREDR,
        };

        debug!("L2CAP connecting to {} PSM 0x{:02X}", address, psm);
        // SAFETY: `addr` is a valid sockaddr_l2 and the length matches its size.
        let rc = unsafe {
            libc::connect(
                fd.as_raw_fd(),
                &addr as *const SockaddrL2 as *const libc::sockaddr,
                mem::size_of::<SockaddrL2>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            return Err(connect_err(io::Error::last_os_error()));
        }

        Ok(Self {
            fd,
            address: *address,
            psm,
            closed: AtomicBool::new(false),
        })
    }

    pub fn address(&self) -> &BdAddr {
        &self.address
    }

    pub fn psm(&self) -> u16 {
        self.psm
    }
}

impl Channel for L2capSocket {
    fn send(&self, data: &[u8]) -> Result<usize, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        // SAFETY: the pointer/length pair describes the borrowed slice.
        let n = unsafe {
            libc::send(
                self.fd.as_raw_fd(),
                data.as_ptr() as *const libc::c_void,
                data.len(),
                libc::MSG_NOSIGNAL,
            )
        };
        if n < 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(n as usize)
    }

    fn recv(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        loop {
            if self.closed.load(Ordering::Acquire) {
                return Ok(0);
            }
            // SAFETY: the pointer/length pair describes the borrowed buffer.
            let n = unsafe {
                libc::recv(
                    self.fd.as_raw_fd(),
                    buf.as_mut_ptr() as *mut libc::c_void,
                    buf.len(),
                    0,
                )
            };
            if n >= 0 {
                return Ok(n as usize);
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err.into());
            }
        }
    }

    fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        debug!("L2CAP closing {} PSM 0x{:02X}", self.address, self.psm);
        // SAFETY: shutdown(2) on a descriptor we own; it stays open until drop.
        let rc = unsafe { libc::shutdown(self.fd.as_raw_fd(), libc::SHUT_RDWR) };
        if rc < 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(())
    }
}
