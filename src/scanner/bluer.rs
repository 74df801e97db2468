//! BlueZ D-Bus backend.
//!
//! Talks to the bluetoothd daemon through the `bluer` crate and registers a
//! passive monitor with one pattern per Govee company identifier. Matched
//! devices have their manufacturer data forwarded raw; decoding happens in
//! the aggregation core.

use super::{
    ADVERTISEMENT_CHANNEL_BUFFER_SIZE, GOVEE_COMPANY_ID_BYTES, MANUFACTURER_DATA_TYPE, ScanError,
};
use crate::advertisement::Advertisement;
use crate::mac_address::MacAddress;
use bluer::monitor::{Monitor, MonitorEvent, Pattern};
use bluer::{Adapter, Address, Session};
use futures::StreamExt;
use log::debug;
use tokio::sync::mpsc;

impl From<bluer::Error> for ScanError {
    fn from(err: bluer::Error) -> Self {
        ScanError::Bluetooth(err.to_string())
    }
}

/// Start a passive scan via BlueZ and return the frame stream.
///
/// The returned channel stays open for as long as the monitor delivers
/// events; it closes if the D-Bus session dies, which the run loop treats
/// as a restartable condition.
pub async fn start_scan() -> Result<mpsc::Receiver<Advertisement>, ScanError> {
    let session = Session::new().await?;
    let adapter = session.default_adapter().await?;
    adapter.set_powered(true).await?;

    let (tx, rx) = mpsc::channel(ADVERTISEMENT_CHANNEL_BUFFER_SIZE);

    let patterns = GOVEE_COMPANY_ID_BYTES
        .iter()
        .map(|id| Pattern {
            data_type: MANUFACTURER_DATA_TYPE,
            start_position: 0,
            content: id.to_vec(),
        })
        .collect();

    let monitor_manager = adapter.monitor().await?;
    let mut monitor_handle = monitor_manager
        .register(Monitor {
            patterns: Some(patterns),
            ..Default::default()
        })
        .await?;

    // Spawn a task that owns all Bluetooth state and runs the event loop
    tokio::spawn(async move {
        let _session = session;
        let _monitor_manager = monitor_manager;

        while let Some(event) = monitor_handle.next().await {
            if let MonitorEvent::DeviceFound(device_id) = event {
                let address = device_id.device;
                if let Err(e) = forward_device(&adapter, address, &tx).await {
                    debug!("failed to read advertisement from {address}: {e}");
                }
            }
        }
    });

    Ok(rx)
}

/// Read manufacturer data from a discovered device and forward each entry,
/// company identifier re-attached, so the decoder sees the payload exactly
/// as broadcast.
async fn forward_device(
    adapter: &Adapter,
    address: Address,
    tx: &mpsc::Sender<Advertisement>,
) -> Result<(), ScanError> {
    let device = adapter.device(address)?;
    let mac: MacAddress = address.into();

    let Some(manufacturer_data) = device.manufacturer_data().await? else {
        return Ok(());
    };
    let rssi = device.rssi().await?;

    for (company_id, data) in manufacturer_data {
        let mut payload = Vec::with_capacity(2 + data.len());
        payload.extend_from_slice(&company_id.to_le_bytes());
        payload.extend_from_slice(&data);
        let _ = tx
            .send(Advertisement {
                mac,
                rssi,
                data: payload,
            })
            .await;
    }

    Ok(())
}
