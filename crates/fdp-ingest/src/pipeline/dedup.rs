//! Duplicate filtering
//!
//! The filter is seeded with every natural key already persisted, then
//! accumulates the keys accepted during the run, so a re-ingested file and a
//! repeated row inside one run are both caught before batching. Nothing here
//! survives the run; the next run starts from a fresh key fetch.

use std::collections::HashSet;

// Key parts are joined with a unit separator so composite keys cannot
// collide with values that contain the display delimiter.
const KEY_SEPARATOR: char = '\u{1f}';

/// Identity of one entity for duplicate detection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey(String);

impl NaturalKey {
    pub fn single(part: impl Into<String>) -> Self {
        Self(part.into())
    }

    pub fn compound(parts: &[&str]) -> Self {
        Self(parts.join(&KEY_SEPARATOR.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, part) in self.0.split(KEY_SEPARATOR).enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            f.write_str(part)?;
        }
        Ok(())
    }
}

/// Tracks which keys this run has already seen
#[derive(Debug)]
pub struct DuplicateFilter {
    seen: HashSet<NaturalKey>,
    preloaded: usize,
}

impl DuplicateFilter {
    /// Seed from the keys the store already holds
    pub fn new(existing: HashSet<NaturalKey>) -> Self {
        let preloaded = existing.len();
        Self {
            seen: existing,
            preloaded,
        }
    }

    pub fn empty() -> Self {
        Self::new(HashSet::new())
    }

    /// Admit a key on first sight; subsequent sightings are duplicates
    pub fn admit(&mut self, key: &NaturalKey) -> bool {
        self.seen.insert(key.clone())
    }

    /// How many keys the store contributed at run start
    pub fn preloaded(&self) -> usize {
        self.preloaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preloaded_keys_are_duplicates() {
        let existing: HashSet<_> = [NaturalKey::single("V-100"), NaturalKey::single("V-200")]
            .into_iter()
            .collect();
        let mut filter = DuplicateFilter::new(existing);

        assert_eq!(filter.preloaded(), 2);
        assert!(!filter.admit(&NaturalKey::single("V-100")));
        assert!(filter.admit(&NaturalKey::single("V-300")));
    }

    #[test]
    fn test_repeated_key_within_run() {
        let mut filter = DuplicateFilter::empty();
        let key = NaturalKey::compound(&["T-12", "oil change", "2025-04-01"]);

        assert!(filter.admit(&key));
        assert!(!filter.admit(&key));
        assert!(!filter.admit(&NaturalKey::compound(&["T-12", "oil change", "2025-04-01"])));
    }

    #[test]
    fn test_compound_parts_do_not_collide_with_delimiter() {
        let with_pipe = NaturalKey::compound(&["T|12", "wash"]);
        let other = NaturalKey::compound(&["T", "12|wash"]);
        assert_ne!(with_pipe, other);
    }

    #[test]
    fn test_display_uses_readable_delimiter() {
        let key = NaturalKey::compound(&["T-12", "oil change", "2025-04-01"]);
        assert_eq!(key.to_string(), "T-12|oil change|2025-04-01");
    }
}
