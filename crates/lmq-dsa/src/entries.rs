use alloc::vec::Vec;
use core::fmt;

use crate::bitarr::BitAddress;

/// Trailing bytes so the widest word load at the last entry stays in bounds.
pub const WORD_PADDING: usize = 8;

/// A flat array of fixed-width bit-packed entries.
///
/// This is the storage a trie level keeps for its nodes: entry `i` starts at
/// bit `i * entry_bits`, so consecutive entries share bytes and nothing is
/// aligned. The buffer is zero-initialized and padded for word access.
#[derive(Clone)]
pub struct PackedEntries {
    bytes: Vec<u8>,
    entry_bits: u8,
    count: usize,
}

impl fmt::Debug for PackedEntries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackedEntries")
            .field("count", &self.count)
            .field("entry_bits", &self.entry_bits)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl PackedEntries {
    pub fn new(count: usize, entry_bits: u8) -> Self {
        let total_bits = count * entry_bits as usize;
        let bytes = vec![0u8; total_bits.div_ceil(8) + WORD_PADDING];
        Self {
            bytes,
            entry_bits,
            count,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn entry_bits(&self) -> u8 {
        self.entry_bits
    }

    /// Read address of entry `idx`.
    #[inline(always)]
    pub fn address(&self, idx: usize) -> BitAddress<&[u8]> {
        assert!(idx < self.count);
        BitAddress::new(&self.bytes[..], idx * self.entry_bits as usize)
    }

    /// Write address of entry `idx`.
    #[inline(always)]
    pub fn address_mut(&mut self, idx: usize) -> BitAddress<&mut [u8]> {
        assert!(idx < self.count);
        let offset = idx * self.entry_bits as usize;
        BitAddress::new(&mut self.bytes[..], offset)
    }

    /// The backing bytes, padding included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
