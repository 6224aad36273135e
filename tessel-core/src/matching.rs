//! Hash tables used to resolve wire names to fields and enum constants.
//!
//! Each table is a sorted array of hashes plus a parallel array of indices.
//! Lookup is a binary search over the hashes followed by one indirection.
//! Tables are built once per descriptor and published through a `OnceLock`,
//! so every thread observes the same immutable snapshot.

use alloc::vec::Vec;

use crate::FieldDescriptor;
use crate::FieldFlags;
use crate::hash::{fnv1a_64, fnv1a_64_smart};

/// Marks a hash shared by two different targets; such a hash never matches.
const AMBIGUOUS: u32 = u32::MAX;

/// Sorted hash → index table.
#[derive(Debug, Clone, Default)]
pub struct HashIndex {
    hashes: Vec<u64>,
    mapping: Vec<u32>,
}

impl HashIndex {
    /// Build from `(hash, index)` pairs. The same pair may appear more than once.
    pub fn build(entries: impl IntoIterator<Item = (u64, usize)>) -> Self {
        let mut entries: Vec<(u64, u32)> = entries
            .into_iter()
            .map(|(hash, index)| (hash, index as u32))
            .collect();
        entries.sort_unstable();

        let mut hashes: Vec<u64> = Vec::with_capacity(entries.len());
        let mut mapping: Vec<u32> = Vec::with_capacity(entries.len());
        for (hash, index) in entries {
            if let (Some(&last), Some(slot)) = (hashes.last(), mapping.last_mut())
                && last == hash
            {
                if *slot != index {
                    *slot = AMBIGUOUS;
                }
                continue;
            }
            hashes.push(hash);
            mapping.push(index);
        }

        Self { hashes, mapping }
    }

    /// Index registered for `hash`, if exactly one target produced it.
    pub fn get(&self, hash: u64) -> Option<usize> {
        let pos = self.hashes.binary_search(&hash).ok()?;
        match self.mapping[pos] {
            AMBIGUOUS => None,
            index => Some(index as usize),
        }
    }

    /// Number of distinct hashes.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

/// The two field tables of a record type.
#[derive(Debug, Clone, Default)]
pub struct MatchTables {
    exact: HashIndex,
    smart: HashIndex,
}

impl MatchTables {
    /// Build both tables from fields in declaration order.
    pub fn build(fields: &[FieldDescriptor]) -> Self {
        let exact = HashIndex::build(fields.iter().flat_map(|field| {
            core::iter::once((field.hash(), field.index())).chain(
                field
                    .aliases()
                    .iter()
                    .map(|alias| (fnv1a_64(alias), field.index())),
            )
        }));

        let smart = HashIndex::build(
            fields
                .iter()
                .filter(|field| !field.has(FieldFlags::NO_SMART_MATCH))
                .flat_map(|field| {
                    core::iter::once((field.smart_hash(), field.index())).chain(
                        field
                            .aliases()
                            .iter()
                            .map(|alias| (fnv1a_64_smart(alias), field.index())),
                    )
                }),
        );

        Self { exact, smart }
    }

    /// Field whose name or alias hashes exactly like `key`.
    pub fn exact(&self, key: &str) -> Option<usize> {
        self.exact.get(fnv1a_64(key))
    }

    /// Case and separator tolerant lookup.
    ///
    /// A miss is retried without a leading `is`; that second form only resolves to
    /// boolean fields (`isActive` → `active`).
    pub fn smart(&self, key: &str, fields: &[FieldDescriptor]) -> Option<usize> {
        if let Some(index) = self.smart.get(fnv1a_64_smart(key)) {
            return Some(index);
        }
        let stripped = key.strip_prefix("is")?;
        if stripped.is_empty() {
            return None;
        }
        let index = self.smart.get(fnv1a_64_smart(stripped))?;
        fields[index].ty().is_boolean().then_some(index)
    }

    /// The exact table.
    pub fn exact_index(&self) -> &HashIndex {
        &self.exact
    }

    /// The smart table.
    pub fn smart_index(&self) -> &HashIndex {
        &self.smart
    }
}
