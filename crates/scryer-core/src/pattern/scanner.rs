//! Wildcard pattern scanning over the target's main module image.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::Result;
use crate::memory::ReadMemory;
use crate::pattern::PatternSet;

/// Upper bound on the copied module window. Target modules fit well under
/// this; anything larger is code we have no patterns for anyway.
const SCAN_LIMIT: usize = 64 * 1024 * 1024;
const SCAN_CHUNK_SIZE: usize = 64 * 1024;

/// Scans a copied module image for the configured pattern library.
///
/// This runs once per attach, so a naive forward scan per pattern is
/// deliberate; module sizes are bounded.
pub struct PatternScanner<'a> {
    set: &'a PatternSet,
}

impl<'a> PatternScanner<'a> {
    pub fn new(set: &'a PatternSet) -> Self {
        Self { set }
    }

    /// Find every pattern in the module image at `base`.
    ///
    /// Returns module-relative hit offsets, already adjusted by each
    /// pattern's `offset`. Patterns without a match are omitted, at most
    /// one entry per name.
    pub fn find<R: ReadMemory + ?Sized>(
        &self,
        reader: &R,
        base: u64,
        size: u64,
    ) -> Result<BTreeMap<String, u64>> {
        let buffer = copy_image(reader, base, size)?;
        let mut hits = BTreeMap::new();

        for pattern in &self.set.patterns {
            let bytes = pattern.pattern_bytes()?;
            match scan(&buffer, &bytes) {
                Some(position) => {
                    let hit = (position as i64).wrapping_add(pattern.offset) as u64;
                    debug!("  {}: match at {:#x} -> hit {:#x}", pattern.name, position, hit);
                    hits.insert(pattern.name.clone(), hit);
                }
                None => warn!("Pattern '{}' not found in module image", pattern.name),
            }
        }

        Ok(hits)
    }
}

/// Copy the module image once, in chunks.
///
/// The first chunk must be readable; a failure further in truncates the
/// window instead of aborting, since images commonly end in unreadable
/// guard regions.
fn copy_image<R: ReadMemory + ?Sized>(reader: &R, base: u64, size: u64) -> Result<Vec<u8>> {
    let total = (size as usize).min(SCAN_LIMIT);
    let mut buffer = Vec::with_capacity(total);

    while buffer.len() < total {
        let read_size = (total - buffer.len()).min(SCAN_CHUNK_SIZE);
        let address = base + buffer.len() as u64;

        match reader.read_bytes(address, read_size) {
            Ok(chunk) => buffer.extend_from_slice(&chunk),
            Err(e) => {
                if buffer.is_empty() {
                    return Err(e);
                }
                debug!(
                    "Image copy stopped at {:#x} ({:#x} of {:#x} bytes): {}",
                    address,
                    buffer.len(),
                    total,
                    e
                );
                break;
            }
        }
    }

    Ok(buffer)
}

/// Single forward pass honoring wildcards; first match wins.
fn scan(buffer: &[u8], pattern: &[Option<u8>]) -> Option<usize> {
    if pattern.is_empty() || buffer.len() < pattern.len() {
        return None;
    }

    let last_start = buffer.len() - pattern.len();
    match pattern[0] {
        // Concrete leading byte: let memchr skip the gaps.
        Some(first) => memchr::memchr_iter(first, &buffer[..=last_start])
            .find(|&position| matches_at(buffer, position, pattern)),
        None => (0..=last_start).find(|&position| matches_at(buffer, position, pattern)),
    }
}

fn matches_at(buffer: &[u8], position: usize, pattern: &[Option<u8>]) -> bool {
    pattern
        .iter()
        .zip(&buffer[position..])
        .all(|(expected, actual)| expected.is_none_or(|byte| byte == *actual))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockMemoryBuilder;
    use crate::pattern::{PatternSet, StaticPattern};

    fn set_of(patterns: Vec<StaticPattern>) -> PatternSet {
        PatternSet { patterns }
    }

    fn named(name: &str, pattern: &str, offset: i64) -> StaticPattern {
        StaticPattern {
            name: name.to_string(),
            pattern: pattern.to_string(),
            offset,
            addend: 0,
        }
    }

    #[test]
    fn test_find_with_wildcards() {
        let reader = MockMemoryBuilder::new(0x40_0000)
            .pad_to(0x200)
            .write_bytes(0x40_0100, &[0xAA, 0xBB, 0x11, 0xCC])
            .build();
        let set = set_of(vec![named("probe", "AA BB ?? CC", 0)]);

        let hits = PatternScanner::new(&set)
            .find(&reader, 0x40_0000, 0x200)
            .unwrap();
        assert_eq!(hits.get("probe"), Some(&0x100));
    }

    #[test]
    fn test_first_match_wins_and_offset_applies() {
        let reader = MockMemoryBuilder::new(0x40_0000)
            .pad_to(0x300)
            .write_bytes(0x40_0080, &[0xDE, 0xAD])
            .write_bytes(0x40_0200, &[0xDE, 0xAD])
            .build();
        let set = set_of(vec![named("probe", "DE AD", 3)]);

        let hits = PatternScanner::new(&set)
            .find(&reader, 0x40_0000, 0x300)
            .unwrap();
        assert_eq!(hits.get("probe"), Some(&0x83));
    }

    #[test]
    fn test_missing_pattern_is_omitted() {
        let reader = MockMemoryBuilder::new(0x40_0000).pad_to(0x100).build();
        let set = set_of(vec![
            named("absent", "01 02 03 04", 0),
            named("zeroes", "00 00", 0),
        ]);

        let hits = PatternScanner::new(&set)
            .find(&reader, 0x40_0000, 0x100)
            .unwrap();
        assert!(!hits.contains_key("absent"));
        assert_eq!(hits.get("zeroes"), Some(&0));
    }

    #[test]
    fn test_hits_stay_inside_buffer_before_offset() {
        // Pattern at the very end of the image still matches and the raw
        // position is < size.
        let size = 0x40usize;
        let reader = MockMemoryBuilder::new(0x1000)
            .pad_to(size)
            .write_bytes(0x1000 + size as u64 - 2, &[0xFE, 0xFF])
            .build();
        let set = set_of(vec![named("tail", "FE FF", 0)]);

        let hits = PatternScanner::new(&set)
            .find(&reader, 0x1000, size as u64)
            .unwrap();
        let hit = *hits.get("tail").unwrap();
        assert!(hit < size as u64);
        assert_eq!(hit, size as u64 - 2);
    }

    #[test]
    fn test_leading_wildcard_scans_linearly() {
        let reader = MockMemoryBuilder::new(0x1000)
            .pad_to(0x20)
            .write_bytes(0x1005, &[0x77, 0x88])
            .build();
        let set = set_of(vec![named("probe", "?? 88", 0)]);

        let hits = PatternScanner::new(&set).find(&reader, 0x1000, 0x20).unwrap();
        assert_eq!(hits.get("probe"), Some(&0x5));
    }

    #[test]
    fn test_truncated_image_still_scans_prefix() {
        // The second chunk is unreadable; the pattern sits inside the
        // readable prefix and must still be found.
        let image_size = SCAN_CHUNK_SIZE as u64 + 0x8000;
        let reader = MockMemoryBuilder::new(0x1000)
            .pad_to(image_size as usize)
            .write_bytes(0x1040, &[0xAB, 0xCD])
            .fail_range(0x1000 + SCAN_CHUNK_SIZE as u64, 0x8000)
            .build();
        let set = set_of(vec![named("probe", "AB CD", 0)]);

        let hits = PatternScanner::new(&set)
            .find(&reader, 0x1000, image_size)
            .unwrap();
        assert_eq!(hits.get("probe"), Some(&0x40));
    }

    #[test]
    fn test_unreadable_image_is_an_error() {
        let reader = MockMemoryBuilder::new(0x1000).build();
        let set = set_of(vec![named("probe", "AB CD", 0)]);
        assert!(PatternScanner::new(&set).find(&reader, 0x1000, 0x100).is_err());
    }
}
