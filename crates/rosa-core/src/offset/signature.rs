use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Byte pattern locating a function entry or a RIP-relative data reference.
///
/// With `instr_len == 0` the match itself (plus `addend`) is the result,
/// which is how function entries are described. Otherwise the match contains
/// an instruction at `instr_offset` whose 32-bit displacement at
/// `disp_offset` is resolved against the next instruction pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSignature {
    pub pattern: String,
    #[serde(default)]
    pub instr_offset: usize,
    #[serde(default)]
    pub disp_offset: usize,
    #[serde(default)]
    pub instr_len: usize,
    #[serde(default)]
    pub addend: i64,
}

impl CodeSignature {
    pub fn entry(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            instr_offset: 0,
            disp_offset: 0,
            instr_len: 0,
            addend: 0,
        }
    }

    pub fn pattern_bytes(&self) -> Result<Vec<Option<u8>>> {
        parse_pattern(&self.pattern)
    }

    fn is_rip_relative(&self) -> bool {
        self.instr_len > 0
    }
}

pub fn parse_pattern(pattern: &str) -> Result<Vec<Option<u8>>> {
    let mut bytes = Vec::new();
    for token in pattern.split_whitespace() {
        if token == "??" || token == "?" {
            bytes.push(None);
            continue;
        }

        let value = u8::from_str_radix(token, 16).map_err(|e| {
            Error::InvalidLayout(format!("Invalid signature token '{}': {}", token, e))
        })?;
        bytes.push(Some(value));
    }

    if bytes.is_empty() {
        return Err(Error::InvalidLayout("Signature pattern is empty".to_string()));
    }
    if bytes.iter().all(Option::is_none) {
        return Err(Error::InvalidLayout(
            "Signature pattern has no fixed bytes".to_string(),
        ));
    }

    Ok(bytes)
}

pub fn format_pattern(bytes: &[Option<u8>]) -> String {
    bytes
        .iter()
        .map(|b| match b {
            Some(value) => format!("{:02X}", value),
            None => "??".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Signature search over a code buffer that starts at `base`
pub struct Scanner<'a> {
    base: usize,
    code: &'a [u8],
}

impl<'a> Scanner<'a> {
    pub fn new(base: usize, code: &'a [u8]) -> Self {
        Self { base, code }
    }

    /// Offsets into the buffer of every match of `pattern`
    pub fn find_all(&self, pattern: &[Option<u8>]) -> Vec<usize> {
        let Some((anchor_pos, anchor)) = pattern
            .iter()
            .enumerate()
            .find_map(|(i, b)| b.map(|b| (i, b)))
        else {
            return Vec::new();
        };
        if pattern.len() > self.code.len() {
            return Vec::new();
        }
        let last_start = self.code.len() - pattern.len();

        memchr::memchr_iter(anchor, self.code)
            .filter_map(|hit| hit.checked_sub(anchor_pos))
            .filter(|&start| start <= last_start && self.matches_at(start, pattern))
            .collect()
    }

    fn matches_at(&self, start: usize, pattern: &[Option<u8>]) -> bool {
        self.code[start..start + pattern.len()]
            .iter()
            .zip(pattern)
            .all(|(byte, expected)| expected.is_none_or(|e| e == *byte))
    }

    /// Absolute address a signature resolves to, using its first match
    pub fn resolve(&self, signature: &CodeSignature) -> Result<Option<usize>> {
        let pattern = signature.pattern_bytes()?;
        let Some(&start) = self.find_all(&pattern).first() else {
            return Ok(None);
        };

        let mut target = self.base + start;
        if signature.is_rip_relative() {
            let disp_pos = start + signature.instr_offset + signature.disp_offset;
            let Some(disp_bytes) = self.code.get(disp_pos..disp_pos + 4) else {
                return Ok(None);
            };
            let disp = i32::from_le_bytes([disp_bytes[0], disp_bytes[1], disp_bytes[2], disp_bytes[3]]);
            let next_ip = self.base + start + signature.instr_offset + signature.instr_len;
            target = next_ip.wrapping_add_signed(disp as isize);
        }

        Ok(Some(target.wrapping_add_signed(signature.addend as isize)))
    }
}
