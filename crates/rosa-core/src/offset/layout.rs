//! Host layout description
//!
//! Describes where the static arrays, their live counters and the host
//! functions sit inside one build of the host executable. Each location is an
//! image-relative offset or a code signature that is scanned for at startup.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::signature::{CodeSignature, Scanner};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    Offset { offset: usize },
    Signature { signature: CodeSignature },
}

impl Location {
    /// Absolute address of this location in an image loaded at `base`
    pub fn resolve(&self, base: usize, scanner: &Scanner<'_>) -> Result<Option<usize>> {
        match self {
            Location::Offset { offset } => Ok(Some(base + offset)),
            Location::Signature { signature } => scanner.resolve(signature),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostLayout {
    /// Host build the layout was written for
    pub version: String,
    /// Array base locations keyed by category name (`items`, `humans`, ...)
    #[serde(default)]
    pub arrays: BTreeMap<String, Location>,
    /// Live-count locations of densely filled arrays, keyed like `arrays`
    #[serde(default)]
    pub counters: BTreeMap<String, Location>,
    /// Function entry locations keyed by host symbol name
    #[serde(default)]
    pub functions: BTreeMap<String, Location>,
}

/// Absolute addresses obtained from a [`HostLayout`]
#[derive(Debug, Clone, Default)]
pub struct ResolvedLayout {
    pub arrays: BTreeMap<String, usize>,
    pub counters: BTreeMap<String, usize>,
    pub functions: BTreeMap<String, usize>,
    /// Entries that could not be resolved, as `section.name`
    pub unresolved: Vec<String>,
}

impl ResolvedLayout {
    pub fn array(&self, name: &str) -> Option<usize> {
        self.arrays.get(name).copied()
    }

    pub fn counter(&self, name: &str) -> Option<usize> {
        self.counters.get(name).copied()
    }

    pub fn function(&self, name: &str) -> Option<usize> {
        self.functions.get(name).copied()
    }
}

impl HostLayout {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Resolve every entry; failures are logged once here and then left out
    pub fn resolve(&self, base: usize, scanner: &Scanner<'_>) -> ResolvedLayout {
        let mut resolved = ResolvedLayout::default();
        for (section, entries, out) in [
            ("arrays", &self.arrays, &mut resolved.arrays),
            ("counters", &self.counters, &mut resolved.counters),
            ("functions", &self.functions, &mut resolved.functions),
        ] {
            for (name, location) in entries {
                match location.resolve(base, scanner) {
                    Ok(Some(address)) => {
                        debug!("{}.{} resolved to {:#x}", section, name, address);
                        out.insert(name.clone(), address);
                    }
                    Ok(None) => {
                        warn!("{}.{} not found in host image", section, name);
                        resolved.unresolved.push(format!("{section}.{name}"));
                    }
                    Err(e) => {
                        warn!("{}.{} has an invalid location: {}", section, name, e);
                        resolved.unresolved.push(format!("{section}.{name}"));
                    }
                }
            }
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: &str = r#"{
        "version": "38",
        "arrays": {
            "items": { "offset": 4096 },
            "humans": {
                "signature": {
                    "pattern": "48 8D 0D ?? ?? ?? ??",
                    "disp_offset": 3,
                    "instr_len": 7
                }
            }
        },
        "counters": { "bullets": { "offset": 64 } },
        "functions": {
            "createitem": { "signature": { "pattern": "55 48 89 E5" } },
            "deleteitem": { "signature": { "pattern": "DE AD BE EF" } }
        }
    }"#;

    fn code() -> Vec<u8> {
        let mut code = vec![0x90, 0x55, 0x48, 0x89, 0xE5, 0xC3];
        code.extend_from_slice(&[0x48, 0x8D, 0x0D]);
        code.extend_from_slice(&0x20i32.to_le_bytes());
        code
    }

    #[test]
    fn test_parse_mixed_locations() {
        let layout = HostLayout::parse(LAYOUT).unwrap();
        assert_eq!(layout.version, "38");
        assert_eq!(layout.arrays["items"], Location::Offset { offset: 4096 });
        assert!(matches!(layout.arrays["humans"], Location::Signature { .. }));
    }

    #[test]
    fn test_resolve_offsets_and_signatures() {
        let layout = HostLayout::parse(LAYOUT).unwrap();
        let code = code();
        let resolved = layout.resolve(0x10000, &Scanner::new(0x10000, &code));

        assert_eq!(resolved.array("items"), Some(0x11000));
        assert_eq!(resolved.array("humans"), Some(0x10000 + 6 + 7 + 0x20));
        assert_eq!(resolved.counter("bullets"), Some(0x10040));
        assert_eq!(resolved.function("createitem"), Some(0x10001));
        assert_eq!(resolved.function("deleteitem"), None);
        assert_eq!(resolved.unresolved, vec!["functions.deleteitem".to_string()]);
    }

    #[test]
    fn test_invalid_pattern_is_unresolved_not_fatal() {
        let mut layout = HostLayout::default();
        layout.functions.insert(
            "logic".to_string(),
            Location::Signature {
                signature: CodeSignature::entry("XX"),
            },
        );
        let resolved = layout.resolve(0, &Scanner::new(0, &[]));
        assert!(resolved.functions.is_empty());
        assert_eq!(resolved.unresolved.len(), 1);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        let layout = HostLayout::parse(LAYOUT).unwrap();
        layout.save(&path).unwrap();

        let loaded = HostLayout::load(&path).unwrap();
        assert_eq!(loaded.functions, layout.functions);
    }
}
