use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::exit::{io_error, CliError, CliResult, DATA_INVALID};

/// Parse a byte given as decimal (`16`) or hex (`0x10`).
pub fn parse_u8(input: &str) -> Result<u8, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => input.parse::<u8>(),
    };
    parsed.map_err(|_| format!("expected a byte value (0-255 or 0x00-0xFF), got '{input}'"))
}

/// Parse a byte written in hex, with or without a `0x` prefix.
pub fn parse_hex_u8(input: &str) -> Result<u8, String> {
    let input = input.trim();
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    u8::from_str_radix(digits, 16).map_err(|_| format!("invalid hex byte '{input}'"))
}

/// Parse a byte string such as `AA55FF`, `aa 55 ff`, `0xAA,0x55` or `AA:55`.
pub fn parse_hex_bytes(input: &str) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    for token in input
        .split(|c: char| c.is_whitespace() || c == ',' || c == ':')
        .filter(|t| !t.is_empty())
    {
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        if digits.len() == 1 {
            out.push(parse_hex_u8(digits)?);
            continue;
        }
        if digits.len() % 2 != 0 || !digits.is_ascii() {
            return Err(format!("hex token '{token}' has an odd number of digits"));
        }
        for pair in digits.as_bytes().chunks(2) {
            // Pairs of ASCII bytes are valid UTF-8.
            let pair = std::str::from_utf8(pair).map_err(|err| err.to_string())?;
            out.push(parse_hex_u8(pair)?);
        }
    }
    Ok(out)
}

/// Protocol tester configuration file.
///
/// Every section is optional; values present in the file override the
/// corresponding command-line flags. Bytes are hex strings.
///
/// ```json
/// {
///   "tester_config": { "target_address": "0x10", "my_address": "0x01" },
///   "message_config": { "message_type": "0x20", "message_payload": ["0x01", "0x02"] },
///   "serial_config": { "port": "/dev/ttyUSB0", "baud": 115200 },
///   "expected_rsp_config": { "message_type": "0x21", "message_payload": ["0x00"] }
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct TesterConfigFile {
    pub tester_config: Option<TesterSection>,
    pub message_config: Option<MessageSection>,
    pub serial_config: Option<SerialSection>,
    pub expected_rsp_config: Option<MessageSection>,
}

#[derive(Debug, Deserialize)]
pub struct TesterSection {
    pub target_address: String,
    pub my_address: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageSection {
    pub message_type: String,
    #[serde(default)]
    pub message_payload: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SerialSection {
    pub port: Option<PathBuf>,
    pub baud: Option<u32>,
}

/// A request and the response it should produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPlan {
    pub port: Option<PathBuf>,
    pub baud: u32,
    pub target: Option<u8>,
    pub my_address: Option<u8>,
    pub msg_type: Option<u8>,
    pub payload: Vec<u8>,
    pub response_type: Option<u8>,
    pub response_payload: Vec<u8>,
}

impl TesterConfigFile {
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
        Self::parse(&text).map_err(|err| {
            CliError::new(DATA_INVALID, format!("invalid config {}: {err}", path.display()))
        })
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|err| err.to_string())
    }

    /// Apply file values on top of `plan`.
    pub fn apply(&self, plan: &mut TestPlan) -> Result<(), String> {
        if let Some(tester) = &self.tester_config {
            plan.target = Some(parse_hex_u8(&tester.target_address)?);
            plan.my_address = Some(parse_hex_u8(&tester.my_address)?);
        }
        if let Some(message) = &self.message_config {
            plan.msg_type = Some(parse_hex_u8(&message.message_type)?);
            plan.payload = parse_hex_list(&message.message_payload)?;
        }
        if let Some(serial) = &self.serial_config {
            if let Some(port) = &serial.port {
                plan.port = Some(port.clone());
            }
            if let Some(baud) = serial.baud {
                plan.baud = baud;
            }
        }
        if let Some(expected) = &self.expected_rsp_config {
            plan.response_type = Some(parse_hex_u8(&expected.message_type)?);
            plan.response_payload = parse_hex_list(&expected.message_payload)?;
        }
        Ok(())
    }
}

fn parse_hex_list(values: &[String]) -> Result<Vec<u8>, String> {
    values.iter().map(|v| parse_hex_u8(v)).collect()
}
