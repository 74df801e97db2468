//! Raw HCI socket backend.
//!
//! Scans for BLE advertisements over a raw Linux HCI socket, without the
//! BlueZ daemon. Requires CAP_NET_RAW and CAP_NET_ADMIN capabilities or
//! root. Every manufacturer-specific AD structure in a received advertising
//! report is forwarded to the aggregation core together with the sender
//! address and RSSI.

use super::{ADVERTISEMENT_CHANNEL_BUFFER_SIZE, ScanError};
use crate::advertisement::Advertisement;
use crate::mac_address::MacAddress;
use libc::{AF_BLUETOOTH, SOCK_CLOEXEC, SOCK_RAW, c_int, c_void, sockaddr, socklen_t};
use log::debug;
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use tokio::io::unix::AsyncFd;
use tokio::sync::mpsc;

// HCI protocol constants
const BTPROTO_HCI: c_int = 1;
const HCI_FILTER: c_int = 2;

// HCI packet types and events
const HCI_EVENT_PKT: u8 = 0x04;
const EVT_LE_META_EVENT: u8 = 0x3E;
const EVT_LE_ADVERTISING_REPORT: u8 = 0x02;

// HCI commands
const OGF_LE_CTL: u16 = 0x08;
const OCF_LE_SET_SCAN_PARAMETERS: u16 = 0x000B;
const OCF_LE_SET_SCAN_ENABLE: u16 = 0x000C;

const LE_SCAN_PASSIVE: u8 = 0x00;
const LE_PUBLIC_ADDRESS: u8 = 0x00;
const FILTER_POLICY_ACCEPT_ALL: u8 = 0x00;

const AD_TYPE_MANUFACTURER_DATA: u8 = 0xFF;

/// RSSI value controllers use for "not available".
const RSSI_UNAVAILABLE: i16 = 127;

/// HCI socket address structure
#[repr(C)]
struct SockaddrHci {
    hci_family: u16,
    hci_dev: u16,
    hci_channel: u16,
}

/// HCI filter structure for raw sockets
#[repr(C)]
struct HciFilter {
    type_mask: u32,
    event_mask: [u32; 2],
    opcode: u16,
}

impl HciFilter {
    fn le_meta_events() -> Self {
        let mut filter = Self {
            type_mask: 0,
            event_mask: [0, 0],
            opcode: 0,
        };
        filter.type_mask |= 1 << u32::from(HCI_EVENT_PKT);
        let bit = EVT_LE_META_EVENT as usize;
        filter.event_mask[bit / 32] |= 1 << (bit % 32);
        filter
    }
}

/// Build an HCI command packet for the given opcode and parameters.
fn hci_command_packet(ogf: u16, ocf: u16, params: &[u8]) -> Vec<u8> {
    let opcode = (ogf << 10) | ocf;
    let mut packet = Vec::with_capacity(4 + params.len());
    packet.push(0x01); // HCI command packet type
    packet.push((opcode & 0xFF) as u8);
    packet.push((opcode >> 8) as u8);
    packet.push(params.len() as u8);
    packet.extend_from_slice(params);
    packet
}

/// Open a raw HCI socket bound to the given device.
///
/// Uses libc directly since nix has no BTPROTO_HCI support. SOCK_NONBLOCK
/// is required for AsyncFd.
fn open_hci_socket(dev_id: u16) -> Result<OwnedFd, ScanError> {
    let fd = unsafe {
        libc::socket(
            AF_BLUETOOTH,
            SOCK_RAW | SOCK_CLOEXEC | libc::SOCK_NONBLOCK,
            BTPROTO_HCI,
        )
    };
    if fd < 0 {
        return Err(socket_error("create HCI socket"));
    }
    let fd = unsafe { OwnedFd::from_raw_fd(fd) };

    let addr = SockaddrHci {
        hci_family: AF_BLUETOOTH as u16,
        hci_dev: dev_id,
        hci_channel: 0, // HCI_CHANNEL_RAW
    };
    let ret = unsafe {
        libc::bind(
            fd.as_raw_fd(),
            &addr as *const SockaddrHci as *const sockaddr,
            mem::size_of::<SockaddrHci>() as socklen_t,
        )
    };
    if ret < 0 {
        return Err(socket_error("bind HCI socket"));
    }

    Ok(fd)
}

fn socket_error(what: &str) -> ScanError {
    ScanError::Bluetooth(format!("Failed to {what}: {}", io::Error::last_os_error()))
}

/// Restrict the socket to LE meta events.
fn set_hci_filter(fd: &OwnedFd) -> Result<(), ScanError> {
    let filter = HciFilter::le_meta_events();
    let ret = unsafe {
        libc::setsockopt(
            fd.as_raw_fd(),
            0, // SOL_HCI
            HCI_FILTER,
            &filter as *const HciFilter as *const c_void,
            mem::size_of::<HciFilter>() as socklen_t,
        )
    };
    if ret < 0 {
        return Err(socket_error("set HCI filter"));
    }
    Ok(())
}

fn send_hci_command(fd: &OwnedFd, packet: &[u8]) -> Result<(), ScanError> {
    let ret = unsafe {
        libc::write(
            fd.as_raw_fd(),
            packet.as_ptr() as *const c_void,
            packet.len(),
        )
    };
    if ret < 0 {
        return Err(socket_error("send HCI command"));
    }
    Ok(())
}

/// Enable passive LE scanning: 10ms interval and window, all advertisers,
/// duplicates not filtered (every frame feeds the sample windows).
fn configure_le_scan(fd: &OwnedFd) -> Result<(), ScanError> {
    let mut params = Vec::with_capacity(7);
    params.push(LE_SCAN_PASSIVE);
    params.extend_from_slice(&0x0010u16.to_le_bytes()); // interval, 0.625ms units
    params.extend_from_slice(&0x0010u16.to_le_bytes()); // window, 0.625ms units
    params.push(LE_PUBLIC_ADDRESS);
    params.push(FILTER_POLICY_ACCEPT_ALL);
    send_hci_command(
        fd,
        &hci_command_packet(OGF_LE_CTL, OCF_LE_SET_SCAN_PARAMETERS, &params),
    )?;

    let enable = [0x01, 0x00]; // enable, don't filter duplicates
    send_hci_command(
        fd,
        &hci_command_packet(OGF_LE_CTL, OCF_LE_SET_SCAN_ENABLE, &enable),
    )
}

/// Parse an LE advertising report event into zero or more advertisement
/// frames, one per manufacturer-specific AD structure.
fn parse_advertising_report(packet: &[u8]) -> Vec<Advertisement> {
    let mut frames = Vec::new();

    // HCI header: packet type, event code, parameter length, subevent code.
    if packet.len() < 12 {
        return frames;
    }
    let report = &packet[4..];

    // Only the first report in the event is used; controllers deliver one
    // report per event during passive scans.
    if report.len() < 10 || report[0] == 0 {
        return frames;
    }

    // Address arrives little-endian on the wire.
    let mut addr = [0u8; 6];
    addr.copy_from_slice(&report[3..9]);
    addr.reverse();
    let mac = MacAddress(addr);

    let data_len = report[9] as usize;
    if report.len() < 10 + data_len {
        return frames;
    }
    let ad_data = &report[10..10 + data_len];
    let rssi = report
        .get(10 + data_len)
        .map(|&b| i16::from(b as i8))
        .filter(|&r| r != RSSI_UNAVAILABLE);

    // Walk the AD structures; forward every manufacturer-specific payload
    // and let the decoder classify them.
    let mut offset = 0;
    while offset + 2 <= ad_data.len() {
        let len = ad_data[offset] as usize;
        if len == 0 || offset + 1 + len > ad_data.len() {
            break;
        }
        if ad_data[offset + 1] == AD_TYPE_MANUFACTURER_DATA && len >= 3 {
            frames.push(Advertisement {
                mac,
                rssi,
                data: ad_data[offset + 2..offset + 1 + len].to_vec(),
            });
        }
        offset += 1 + len;
    }

    frames
}

/// Start scanning over a raw HCI socket on hci0.
///
/// Opens one socket for advertising events and one for scan commands,
/// enables passive scanning, and forwards manufacturer payloads through the
/// returned channel until the socket dies.
pub async fn start_scan() -> Result<mpsc::Receiver<Advertisement>, ScanError> {
    let fd = open_hci_socket(0)?;
    set_hci_filter(&fd)?;

    // Commands go over a separate socket so the event socket's filter
    // never swallows command completions.
    let cmd_fd = open_hci_socket(0)?;
    configure_le_scan(&cmd_fd)?;

    let (tx, rx) = mpsc::channel(ADVERTISEMENT_CHANNEL_BUFFER_SIZE);

    let async_fd = AsyncFd::new(fd)
        .map_err(|e| ScanError::Bluetooth(format!("Failed to create async fd: {e}")))?;

    tokio::spawn(async move {
        let _cmd_fd = cmd_fd; // keep the scan enabled
        let mut buf = [0u8; 258]; // max HCI event size

        'outer: loop {
            let mut guard = match async_fd.readable().await {
                Ok(guard) => guard,
                Err(e) => {
                    debug!("HCI socket no longer readable: {e}");
                    break;
                }
            };

            // Drain all available packets before waiting again.
            loop {
                let n = match guard.try_io(|inner| {
                    let ret = unsafe {
                        libc::read(
                            inner.as_raw_fd(),
                            buf.as_mut_ptr() as *mut c_void,
                            buf.len(),
                        )
                    };
                    if ret < 0 {
                        Err(io::Error::last_os_error())
                    } else {
                        Ok(ret as usize)
                    }
                }) {
                    Ok(Ok(n)) if n > 0 => n,
                    Ok(Ok(_)) => break 'outer, // EOF
                    Ok(Err(_)) => break 'outer, // read error
                    Err(_) => break,            // WouldBlock, no more data
                };

                if n >= 4
                    && buf[0] == HCI_EVENT_PKT
                    && buf[1] == EVT_LE_META_EVENT
                    && buf[3] == EVT_LE_ADVERTISING_REPORT
                {
                    for frame in parse_advertising_report(&buf[..n]) {
                        if tx.send(frame).await.is_err() {
                            break 'outer; // receiver gone
                        }
                    }
                }
            }
        }
    });

    Ok(rx)
}
