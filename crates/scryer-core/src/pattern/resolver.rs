//! Static address resolution: pattern hits to absolute addresses.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::memory::ReadMemory;
use crate::pattern::{PatternScanner, PatternSet};

/// Named absolute addresses, stable for one process instance.
///
/// Rebuilt in full on every attach and cleared on detach; readers only
/// ever observe it empty or fully populated.
#[derive(Debug, Default)]
pub struct StaticAddressTable {
    entries: BTreeMap<String, u64>,
}

impl StaticAddressTable {
    /// Look up a resolved address.
    ///
    /// A missing name is an explicit error so callers can tell "never
    /// resolved" from a genuine zero.
    pub fn get(&self, name: &str) -> Result<u64> {
        self.entries
            .get(name)
            .copied()
            .ok_or_else(|| Error::AddressNotResolved(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry. Called on detach; stale addresses from a dead
    /// process instance must never leak forward.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(name, addr)| (name.as_str(), *addr))
    }

    #[cfg(test)]
    pub(crate) fn from_entries(entries: impl IntoIterator<Item = (String, u64)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }
}

/// Scan the module image and decode every hit into an absolute address.
///
/// Each hit embeds a 4-byte relative value:
/// `address = base + hit + relative + addend`. The returned table replaces
/// the previous one wholesale; callers swap it in one assignment.
pub fn resolve_static_addresses<R: ReadMemory + ?Sized>(
    reader: &R,
    set: &PatternSet,
) -> Result<StaticAddressTable> {
    let base = reader.base_address();
    let hits = PatternScanner::new(set).find(reader, base, reader.module_size())?;
    let mut entries = BTreeMap::new();

    for (name, hit) in hits {
        let relative = match reader.read_i32(base + hit) {
            Ok(value) => value,
            Err(e) => {
                warn!("Cannot decode relative value for '{}': {}", name, e);
                continue;
            }
        };
        let addend = set.entry(&name).map(|pattern| pattern.addend).unwrap_or(0);
        let address = (base + hit)
            .wrapping_add_signed(relative as i64)
            .wrapping_add_signed(addend);
        debug!("  {}: {:#x}", name, address);
        entries.insert(name, address);
    }

    Ok(StaticAddressTable { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockMemoryBuilder;
    use crate::pattern::StaticPattern;

    #[test]
    fn test_resolution_math() {
        // Pattern hit lands at module-relative 0x100 after its offset, the
        // relative value there is 0x20, fixed delta 0x04:
        // resolved = base + 0x100 + 0x20 + 0x04.
        let base = 0x40_0000u64;
        let reader = MockMemoryBuilder::new(base)
            .pad_to(0x200)
            .write_bytes(base + 0xFE, &[0xAA, 0xBB])
            .write_i32(base + 0x100, 0x20)
            .build();
        let set = PatternSet {
            patterns: vec![StaticPattern {
                name: "probe".to_string(),
                pattern: "AA BB".to_string(),
                offset: 2,
                addend: 0x04,
            }],
        };

        let table = resolve_static_addresses(&reader, &set).unwrap();
        assert_eq!(table.get("probe").unwrap(), base + 0x100 + 0x20 + 0x04);
    }

    #[test]
    fn test_negative_relative_value_points_backward() {
        let base = 0x1000u64;
        let reader = MockMemoryBuilder::new(base)
            .pad_to(0x100)
            .write_bytes(base + 0x80, &[0xCC, 0xDD])
            .write_i32(base + 0x82, -0x30)
            .build();
        let set = PatternSet {
            patterns: vec![StaticPattern {
                name: "probe".to_string(),
                pattern: "CC DD".to_string(),
                offset: 2,
                addend: 4,
            }],
        };

        let table = resolve_static_addresses(&reader, &set).unwrap();
        assert_eq!(table.get("probe").unwrap(), base + 0x82 - 0x30 + 4);
    }

    #[test]
    fn test_missing_name_is_explicit_error() {
        let table = StaticAddressTable::default();
        let err = table.get("never").unwrap_err();
        assert!(matches!(err, Error::AddressNotResolved(name) if name == "never"));
    }

    #[test]
    fn test_unmatched_pattern_missing_from_table() {
        let base = 0x1000u64;
        let reader = MockMemoryBuilder::new(base).pad_to(0x100).build();
        let set = PatternSet {
            patterns: vec![StaticPattern {
                name: "absent".to_string(),
                pattern: "01 02 03".to_string(),
                offset: 0,
                addend: 0,
            }],
        };

        let table = resolve_static_addresses(&reader, &set).unwrap();
        assert!(table.is_empty());
        assert!(table.get("absent").is_err());
    }

    #[test]
    fn test_clear_empties_table() {
        let mut table =
            StaticAddressTable::from_entries([("a".to_string(), 1u64), ("b".to_string(), 2u64)]);
        assert_eq!(table.len(), 2);
        table.clear();
        assert!(table.is_empty());
        assert!(table.get("a").is_err());
    }

    #[test]
    fn test_undecodable_hit_is_skipped() {
        // The relative slot is unreadable: the entry is dropped, not
        // published as garbage.
        let base = 0x1000u64;
        let reader = MockMemoryBuilder::new(base)
            .pad_to(0x100)
            .write_bytes(base + 0x80, &[0xAB, 0xCD])
            .build();
        let set = PatternSet {
            patterns: vec![StaticPattern {
                name: "probe".to_string(),
                pattern: "AB CD".to_string(),
                // Pushes the relative slot past the readable image.
                offset: 0x100,
                addend: 0,
            }],
        };

        let table = resolve_static_addresses(&reader, &set).unwrap();
        assert!(table.get("probe").is_err());
    }
}
