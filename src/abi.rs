//! Interface-description input: parses the contract ABI document, computes
//! function selectors and event topics, and encodes/decodes call payloads.
//!
//! Only the slice of the ABI encoding the ERC20 surface needs is covered
//! here: static `address`/`uint256` words, dynamic strings in return
//! position, and event logs with indexed and non-indexed parameters.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use num_bigint::BigUint;
use serde::Deserialize;
use sha3::{Digest, Keccak256};

use crate::error::HarnessError;

/// A 20-byte account or contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw)
            .map_err(|e| HarnessError::MalformedResponse(format!("bad address {s}: {e}")))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| HarnessError::MalformedResponse(format!("address {s} is not 20 bytes")))?;
        Ok(Address(bytes))
    }
}

/// One parameter of a function or event, as declared in the ABI document.
#[derive(Debug, Clone, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub indexed: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct AbiEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<AbiParam>,
    #[serde(default)]
    outputs: Vec<AbiParam>,
}

/// A declared callable operation.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub inputs: Vec<AbiParam>,
    pub outputs: Vec<AbiParam>,
    pub selector: [u8; 4],
}

/// A declared event, with its precomputed topic hash.
#[derive(Debug, Clone)]
pub struct EventAbi {
    pub name: String,
    pub inputs: Vec<AbiParam>,
    pub topic: [u8; 32],
}

/// The subject's declared call surface. Loaded once at startup, read-only
/// thereafter.
#[derive(Debug, Clone)]
pub struct Abi {
    functions: Vec<Function>,
    events: Vec<EventAbi>,
}

impl Abi {
    pub fn from_json(text: &str) -> Result<Self> {
        let entries: Vec<AbiEntry> =
            serde_json::from_str(text).context("Failed to parse ABI JSON")?;

        let mut functions = Vec::new();
        let mut events = Vec::new();
        for entry in entries {
            match entry.kind.as_str() {
                "function" => {
                    let sig = signature(&entry.name, &entry.inputs);
                    let mut selector = [0u8; 4];
                    selector.copy_from_slice(&keccak256(sig.as_bytes())[..4]);
                    functions.push(Function {
                        name: entry.name,
                        inputs: entry.inputs,
                        outputs: entry.outputs,
                        selector,
                    });
                }
                "event" => {
                    let sig = signature(&entry.name, &entry.inputs);
                    events.push(EventAbi {
                        name: entry.name,
                        inputs: entry.inputs,
                        topic: keccak256(sig.as_bytes()),
                    });
                }
                // constructor/fallback carry no selector; nothing to index
                _ => {}
            }
        }

        Ok(Self { functions, events })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read ABI file {}", path.display()))?;
        Self::from_json(&text)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn event(&self, name: &str) -> Option<&EventAbi> {
        self.events.iter().find(|e| e.name == name)
    }

    /// Decode raw logs into name/field/value form. Logs whose leading topic
    /// matches no declared event are skipped rather than treated as errors;
    /// the comparator sees only what the interface declares.
    pub fn decode_events(&self, logs: &[RawLog]) -> Vec<DecodedEvent> {
        logs.iter()
            .filter_map(|log| self.decode_event(log))
            .collect()
    }

    fn decode_event(&self, log: &RawLog) -> Option<DecodedEvent> {
        let topic0 = log.topics.first()?;
        let event = self.events.iter().find(|e| &e.topic == topic0)?;

        let mut fields = Vec::with_capacity(event.inputs.len());
        let mut topic_idx = 1;
        let mut data_offset = 0;
        for input in &event.inputs {
            let word: [u8; 32] = if input.indexed {
                let w = *log.topics.get(topic_idx)?;
                topic_idx += 1;
                w
            } else {
                let end = data_offset + 32;
                let w = log.data.get(data_offset..end)?.try_into().ok()?;
                data_offset = end;
                w
            };
            fields.push((input.name.clone(), render_word(&input.kind, &word)));
        }
        Some(DecodedEvent {
            name: event.name.clone(),
            fields,
        })
    }
}

/// A structured notification emitted by the subject, decoded against the ABI.
/// Field values are normalized strings: lowercase `0x` hex for addresses,
/// decimal for integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    pub name: String,
    pub fields: Vec<(String, String)>,
}

impl DecodedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// An undecoded event log as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<[u8; 32]>,
    pub data: Vec<u8>,
}

/// An argument to a declared operation.
#[derive(Debug, Clone)]
pub enum Token {
    Address(Address),
    Uint(BigUint),
}

impl Token {
    fn word(&self) -> [u8; 32] {
        match self {
            Token::Address(a) => word_from_address(a),
            Token::Uint(v) => word_from_uint(v),
        }
    }
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// 4-byte selector of a canonical signature like `transfer(address,uint256)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let mut out = [0u8; 4];
    out.copy_from_slice(&keccak256(signature.as_bytes())[..4]);
    out
}

fn signature(name: &str, inputs: &[AbiParam]) -> String {
    let args: Vec<&str> = inputs.iter().map(|p| p.kind.as_str()).collect();
    format!("{}({})", name, args.join(","))
}

/// Encode a call to `func`: selector followed by one 32-byte word per
/// argument. Arity mismatches are caller bugs, surfaced as call failures.
pub fn encode_call(func: &Function, args: &[Token]) -> Result<Vec<u8>, HarnessError> {
    if args.len() != func.inputs.len() {
        return Err(HarnessError::CallFailed(format!(
            "{} takes {} argument(s), got {}",
            func.name,
            func.inputs.len(),
            args.len()
        )));
    }
    let mut data = func.selector.to_vec();
    for arg in args {
        data.extend_from_slice(&arg.word());
    }
    Ok(data)
}

/// Left-pad a uint into a fixed-width 32-byte big-endian word.
pub fn word_from_uint(v: &BigUint) -> [u8; 32] {
    let bytes = v.to_bytes_be();
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    word
}

/// Left-pad an address into a 32-byte word.
pub fn word_from_address(a: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&a.0);
    word
}

/// Decode a single uint256 return word.
pub fn decode_uint(data: &[u8]) -> Result<BigUint, HarnessError> {
    if data.len() != 32 {
        return Err(HarnessError::MalformedResponse(format!(
            "expected a 32-byte word, got {} bytes",
            data.len()
        )));
    }
    Ok(BigUint::from_bytes_be(data))
}

/// Decode a dynamic string return: offset word, length word, then the bytes.
pub fn decode_string(data: &[u8]) -> Result<String, HarnessError> {
    let offset = usize_word(data, 0)?;
    let len = usize_word(data, offset)?;
    let start = offset + 32;
    let bytes = data.get(start..start + len).ok_or_else(|| {
        HarnessError::MalformedResponse("string payload shorter than its declared length".into())
    })?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| HarnessError::MalformedResponse(format!("string is not valid UTF-8: {e}")))
}

fn usize_word(data: &[u8], at: usize) -> Result<usize, HarnessError> {
    let word = data.get(at..at + 32).ok_or_else(|| {
        HarnessError::MalformedResponse(format!("return payload truncated at offset {at}"))
    })?;
    // The high bytes of any sane offset/length are zero.
    if word[..24].iter().any(|b| *b != 0) {
        return Err(HarnessError::MalformedResponse(
            "oversized word in return payload".into(),
        ));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(buf) as usize)
}

fn render_word(kind: &str, word: &[u8; 32]) -> String {
    if kind == "address" {
        let mut a = [0u8; 20];
        a.copy_from_slice(&word[12..]);
        Address(a).to_string()
    } else if kind.starts_with("uint") || kind.starts_with("int") {
        BigUint::from_bytes_be(word).to_string()
    } else if kind == "bool" {
        let set = word.iter().any(|b| *b != 0);
        (if set { "true" } else { "false" }).to_string()
    } else {
        format!("0x{}", hex::encode(word))
    }
}

/// Read the bytecode payload: a hex blob, optionally `0x`-prefixed, with
/// surrounding whitespace tolerated. Handed verbatim to the deployment call.
pub fn load_bytecode(path: &Path) -> Result<Vec<u8>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read bytecode file {}", path.display()))?;
    let trimmed = text.trim();
    let raw = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(raw).with_context(|| format!("Invalid hex in bytecode file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ERC20_ABI: &str = r#"[
        {"type":"function","name":"totalSupply","inputs":[],"outputs":[{"name":"","type":"uint256"}]},
        {"type":"function","name":"balanceOf","inputs":[{"name":"_owner","type":"address"}],"outputs":[{"name":"","type":"uint256"}]},
        {"type":"function","name":"transfer","inputs":[{"name":"_to","type":"address"},{"name":"_value","type":"uint256"}],"outputs":[{"name":"","type":"bool"}]},
        {"type":"event","name":"Transfer","inputs":[{"name":"_from","type":"address","indexed":true},{"name":"_to","type":"address","indexed":true},{"name":"_value","type":"uint256","indexed":false}]}
    ]"#;

    #[test]
    fn test_known_selectors() {
        assert_eq!(selector("totalSupply()"), [0x18, 0x16, 0x0d, 0xdd]);
        assert_eq!(selector("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(selector("approve(address,uint256)"), [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(
            selector("transferFrom(address,address,uint256)"),
            [0x23, 0xb8, 0x72, 0xdd]
        );
        assert_eq!(selector("allowance(address,address)"), [0xdd, 0x62, 0xed, 0x3e]);
    }

    #[test]
    fn test_abi_parsing_assigns_selectors() {
        let abi = Abi::from_json(ERC20_ABI).unwrap();
        let transfer = abi.function("transfer").unwrap();
        assert_eq!(transfer.selector, [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(transfer.inputs.len(), 2);
        assert!(abi.function("mint").is_none());

        let transfer_event = abi.event("Transfer").unwrap();
        assert_eq!(
            hex::encode(transfer_event.topic),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn test_encode_call() {
        let abi = Abi::from_json(ERC20_ABI).unwrap();
        let to: Address = "0xffcf8fdee72ac11b5c542428b35eef5769c409f0".parse().unwrap();
        let data = encode_call(
            abi.function("transfer").unwrap(),
            &[Token::Address(to), Token::Uint(BigUint::from(1u8))],
        )
        .unwrap();
        assert_eq!(data.len(), 4 + 32 + 32);
        assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..36], &to.0);
        assert_eq!(data[67], 1);

        // Arity mismatch is a call failure, not a panic
        let err = encode_call(abi.function("transfer").unwrap(), &[Token::Uint(BigUint::from(1u8))]);
        assert!(err.is_err());
    }

    #[test]
    fn test_decode_uint_word() {
        let word = word_from_uint(&BigUint::from(100u8));
        assert_eq!(decode_uint(&word).unwrap(), BigUint::from(100u8));
        assert!(decode_uint(&word[1..]).is_err());
    }

    #[test]
    fn test_decode_string_round() {
        // offset 0x20, length 3, "LLL" padded to a word
        let mut data = word_from_uint(&BigUint::from(32u8)).to_vec();
        data.extend_from_slice(&word_from_uint(&BigUint::from(3u8)));
        let mut tail = [0u8; 32];
        tail[..3].copy_from_slice(b"LLL");
        data.extend_from_slice(&tail);
        assert_eq!(decode_string(&data).unwrap(), "LLL");

        assert!(decode_string(&data[..40]).is_err());
    }

    #[test]
    fn test_decode_transfer_event() {
        let abi = Abi::from_json(ERC20_ABI).unwrap();
        let from: Address = "0x90f8bf6a479f320ead074411a4b0e7944ea8c9c1".parse().unwrap();
        let to: Address = "0xffcf8fdee72ac11b5c542428b35eef5769c409f0".parse().unwrap();
        let log = RawLog {
            address: Address([0u8; 20]),
            topics: vec![
                abi.event("Transfer").unwrap().topic,
                word_from_address(&from),
                word_from_address(&to),
            ],
            data: word_from_uint(&BigUint::from(42u8)).to_vec(),
        };
        let events = abi.decode_events(&[log]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Transfer");
        assert_eq!(events[0].field("_from"), Some(from.to_string().as_str()));
        assert_eq!(events[0].field("_value"), Some("42"));
    }

    #[test]
    fn test_undeclared_topic_is_skipped() {
        let abi = Abi::from_json(ERC20_ABI).unwrap();
        let log = RawLog {
            address: Address([0u8; 20]),
            topics: vec![[0xab; 32]],
            data: vec![],
        };
        assert!(abi.decode_events(&[log]).is_empty());
    }

    #[test]
    fn test_load_from_files() {
        use std::io::Write;

        let mut abi_file = tempfile::NamedTempFile::new().unwrap();
        abi_file.write_all(ERC20_ABI.as_bytes()).unwrap();
        let abi = Abi::load(abi_file.path()).unwrap();
        assert!(abi.function("transfer").is_some());

        let mut evm_file = tempfile::NamedTempFile::new().unwrap();
        evm_file.write_all(b"0x606060\n").unwrap();
        assert_eq!(load_bytecode(evm_file.path()).unwrap(), vec![0x60, 0x60, 0x60]);

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        bad.write_all(b"not hex").unwrap();
        assert!(load_bytecode(bad.path()).is_err());
    }

    #[test]
    fn test_address_parsing() {
        let a: Address = "0x90f8bf6a479f320ead074411a4b0e7944ea8c9c1".parse().unwrap();
        assert_eq!(a.to_string(), "0x90f8bf6a479f320ead074411a4b0e7944ea8c9c1");
        assert!("0x1234".parse::<Address>().is_err());
        assert!("not hex".parse::<Address>().is_err());
    }
}
