use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use rgb::RGB8;

use crate::color::{pack, unpack};

/// One distinct color and how many pixels carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistEntry {
    pub color: RGB8,
    pub count: u64,
}

/// Exact color histogram, ordered by packed (r, g, b) key.
///
/// Every strategy works over distinct colors rather than raw pixels: identical
/// pixels always land in the same cluster, so a weighted distinct color stands
/// in for all of them.
pub fn build_histogram(pixels: &[RGB8]) -> Vec<HistEntry> {
    let mut buckets: BTreeMap<u32, u64> = BTreeMap::new();
    for &p in pixels {
        *buckets.entry(pack(p)).or_insert(0) += 1;
    }
    buckets
        .into_iter()
        .map(|(key, count)| HistEntry {
            color: unpack(key),
            count,
        })
        .collect()
}
