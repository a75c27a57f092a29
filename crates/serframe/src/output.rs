use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serframe_frame::Frame;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput {
    source: u8,
    target: u8,
    msg_type: u8,
    length: usize,
    payload_hex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload_text: Option<String>,
    crc: String,
    broadcast: bool,
    timestamp: String,
}

#[derive(Serialize)]
struct EncodedOutput {
    frame_hex: String,
    size: usize,
    payload_length: usize,
    crc: String,
}

/// Print a received frame.
///
/// `Raw` writes the payload bytes only.
pub fn print_frame(frame: &Frame, broadcast: bool, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                source: frame.source,
                target: frame.target,
                msg_type: frame.msg_type,
                length: frame.payload.len(),
                payload_hex: to_hex(frame.payload.as_ref()),
                payload_text: printable_text(frame.payload.as_ref()),
                crc: format!("0x{:04X}", frame.crc),
                broadcast,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SOURCE", "TARGET", "TYPE", "LEN", "CRC", "PAYLOAD"])
                .add_row(vec![
                    format!("0x{:02X}", frame.source),
                    target_label(frame.target, broadcast),
                    format!("0x{:02X}", frame.msg_type),
                    frame.payload.len().to_string(),
                    format!("0x{:04X}", frame.crc),
                    payload_preview(frame.payload.as_ref()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "src=0x{:02X} tgt={} type=0x{:02X} len={} crc=0x{:04X} payload={}",
                frame.source,
                target_label(frame.target, broadcast),
                frame.msg_type,
                frame.payload.len(),
                frame.crc,
                payload_preview(frame.payload.as_ref())
            );
        }
        OutputFormat::Raw => {
            print_raw(frame.payload.as_ref());
        }
    }
}

/// Print an encoded wire frame.
///
/// `Raw` writes the frame bytes, suitable for piping to a port.
pub fn print_encoded(wire: &[u8], frame: &Frame, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = EncodedOutput {
                frame_hex: to_hex(wire),
                size: wire.len(),
                payload_length: frame.payload.len(),
                crc: format!("0x{:04X}", frame.crc),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SIZE", "CRC", "FRAME"])
                .add_row(vec![
                    wire.len().to_string(),
                    format!("0x{:04X}", frame.crc),
                    to_spaced_hex(wire),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", to_spaced_hex(wire)),
        OutputFormat::Raw => print_raw(wire),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn to_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02X}")).collect()
}

pub fn to_spaced_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn target_label(target: u8, broadcast: bool) -> String {
    if broadcast {
        format!("0x{target:02X} (broadcast)")
    } else {
        format!("0x{target:02X}")
    }
}

fn printable_text(payload: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(payload).ok()?;
    if text.is_empty() || text.chars().any(|c| c.is_control() && !c.is_whitespace()) {
        return None;
    }
    Some(text.to_string())
}

fn payload_preview(payload: &[u8]) -> String {
    if payload.is_empty() {
        return "<empty>".to_string();
    }
    printable_text(payload).unwrap_or_else(|| to_spaced_hex(payload))
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_helpers() {
        assert_eq!(to_hex(&[0xAA, 0x05, 0xFF]), "AA05FF");
        assert_eq!(to_spaced_hex(&[0xAA, 0x05]), "AA 05");
        assert_eq!(to_hex(&[]), "");
    }

    #[test]
    fn preview_prefers_text() {
        assert_eq!(payload_preview(b"hello"), "hello");
        assert_eq!(payload_preview(&[0x00, 0x01]), "00 01");
        assert_eq!(payload_preview(b""), "<empty>");
    }

    #[test]
    fn broadcast_target_is_labelled() {
        assert_eq!(target_label(0xFF, true), "0xFF (broadcast)");
        assert_eq!(target_label(0x10, false), "0x10");
    }
}
