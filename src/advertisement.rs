//! Decoder for Govee manufacturer-specific advertisement payloads.
//!
//! Govee shipped several incompatible frame layouts across hardware
//! revisions of the same thermometer line. Each known layout is identified
//! by a fixed payload length plus a prefix signature; candidates are tried
//! in a fixed priority order and the first match wins. Anything else on the
//! channel — foreign vendors, truncated frames — decodes to `None` rather
//! than an error, since unrelated BLE traffic is expected on a shared radio.

use crate::mac_address::MacAddress;
use std::fmt;

/// Raw advertisement delivered by a scanner backend.
///
/// `data` is the manufacturer-specific AD payload including the two
/// little-endian company identifier bytes, exactly as broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct Advertisement {
    pub mac: MacAddress,
    /// Received signal strength, when the backend reports it.
    pub rssi: Option<i16>,
    pub data: Vec<u8>,
}

/// Known hardware revisions of the thermometer line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    /// H5072/H5075: 24-bit packed measurement word, sign flag in the MSB.
    H5075,
    /// H5101/H5102: same packing as the H5075 behind a different prefix.
    H5102,
    /// H5074/H5051: little-endian centi-degree fields.
    H5074,
    /// H5179: little-endian centi-degree fields with a longer preamble.
    H5179,
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Model::H5075 => "Govee H5072/H5075",
            Model::H5102 => "Govee H5101/H5102",
            Model::H5074 => "Govee H5074/H5051",
            Model::H5179 => "Govee H5179",
        };
        f.write_str(name)
    }
}

/// A single decoded measurement frame. Produced once per valid frame and
/// never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub mac: MacAddress,
    pub model: Model,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent (0-100).
    pub humidity: f64,
    /// Battery charge in percent (0-100).
    pub battery: u8,
    /// Raw measurement word, kept as a frame identifier for diagnostics.
    pub frame_id: u32,
    pub rssi: Option<i16>,
}

struct Layout {
    model: Model,
    len: usize,
    signature: &'static [u8],
}

/// Known layouts in decode priority order. Revisions sharing a signature
/// prefix (H5075 and H5074) are separated by their fixed payload length.
const LAYOUTS: [Layout; 4] = [
    Layout {
        model: Model::H5075,
        len: 8,
        signature: &[0x88, 0xEC, 0x00],
    },
    Layout {
        model: Model::H5102,
        len: 8,
        signature: &[0x01, 0x00, 0x01, 0x01],
    },
    Layout {
        model: Model::H5074,
        len: 9,
        signature: &[0x88, 0xEC, 0x00],
    },
    Layout {
        model: Model::H5179,
        len: 11,
        signature: &[0x01, 0x88, 0xEC, 0x00, 0x01, 0x01],
    },
];

/// Match a manufacturer payload against the known layouts, first hit wins.
pub fn classify(data: &[u8]) -> Option<Model> {
    LAYOUTS
        .iter()
        .find(|layout| data.len() == layout.len && data.starts_with(layout.signature))
        .map(|layout| layout.model)
}

/// Decode one manufacturer payload into a [`Reading`].
///
/// Pure function: safe to feed arbitrary byte sequences. Returns `None` for
/// anything that is not a well-formed frame of a known layout.
pub fn decode(adv: &Advertisement) -> Option<Reading> {
    let model = classify(&adv.data)?;
    let (temperature, humidity, battery, frame_id) = match model {
        Model::H5075 => decode_packed(&adv.data[3..6], adv.data[6]),
        Model::H5102 => decode_packed(&adv.data[4..7], adv.data[7]),
        Model::H5074 => decode_centi(&adv.data[3..7], adv.data[7]),
        Model::H5179 => decode_centi(&adv.data[6..10], adv.data[10]),
    };
    Some(Reading {
        mac: adv.mac,
        model,
        temperature,
        humidity,
        battery,
        frame_id,
        rssi: adv.rssi,
    })
}

/// H5072/H5075 measurement word: 24-bit big-endian, MSB flags a negative
/// temperature. The magnitude packs `temp_tenths * 1000 + humidity_tenths`.
fn decode_packed(word: &[u8], battery: u8) -> (f64, f64, u8, u32) {
    let raw = u32::from(word[0]) << 16 | u32::from(word[1]) << 8 | u32::from(word[2]);
    let magnitude = raw & 0x7F_FFFF;
    let mut temperature = (magnitude / 1000) as f64 / 10.0;
    if raw & 0x80_0000 != 0 {
        temperature = -temperature;
    }
    let humidity = (magnitude % 1000) as f64 / 10.0;
    (temperature, humidity, battery, raw)
}

/// H5074/H5179 fields: signed centi-degrees and unsigned centi-percent,
/// both little-endian.
fn decode_centi(fields: &[u8], battery: u8) -> (f64, f64, u8, u32) {
    let temp = i16::from_le_bytes([fields[0], fields[1]]);
    let hum = u16::from_le_bytes([fields[2], fields[3]]);
    let frame_id = u32::from(temp as u16) << 16 | u32::from(hum);
    (
        f64::from(temp) / 100.0,
        f64::from(hum) / 100.0,
        battery,
        frame_id,
    )
}
