//! # Bit-packed fields
//!
//! Reads and writes fixed-width integers and floats at arbitrary bit offsets
//! inside a byte buffer. Every access loads one machine word starting at byte
//! `offset / 8` and shifts the field into place, so a field plus its
//! in-byte offset must fit the loaded word: at most 57 bits for the 64-bit
//! accessors, 25 bits for the 32-bit ones.
//!
//! Writes OR into the destination word and never clear it first. Each field
//! must be written exactly once into a zero-initialized region.
//!
//! The word is loaded in host byte order, so packed buffers are not portable
//! between little- and big-endian hosts.

/// Widest field the 64-bit accessors support.
pub const WIDE_MAX_BITS: u8 = 57;

/// Widest field the 32-bit accessors support.
pub const NARROW_MAX_BITS: u8 = 25;

const SIGN_BIT: u32 = 0x8000_0000;

/// Location of a bit-packed field: the buffer holding it and its bit offset.
///
/// The buffer is borrowed, never owned. Callers are responsible for placing
/// fields so that the word loaded at `offset / 8` lies inside `base`;
/// violating that panics on the slice index.
#[derive(Debug, Clone, Copy)]
pub struct BitAddress<B> {
    pub base: B,
    pub offset: usize,
}

impl<B> BitAddress<B> {
    #[inline(always)]
    pub fn new(base: B, offset: usize) -> Self {
        Self { base, offset }
    }

    /// Address of the field `bits` further along the same buffer.
    #[inline(always)]
    #[must_use]
    pub fn advance(self, bits: usize) -> Self {
        Self {
            base: self.base,
            offset: self.offset + bits,
        }
    }

    #[inline(always)]
    fn byte(&self) -> usize {
        self.offset >> 3
    }

    #[inline(always)]
    fn bit(&self) -> u8 {
        (self.offset & 7) as u8
    }
}

/// Shift that moves a `length`-bit field at in-byte offset `bit` to the low
/// end of a `word_bits`-wide word loaded in host byte order.
///
/// Reads and writes both go through this one function, so a field written at
/// an address is always read back from the same bits.
#[inline(always)]
pub const fn field_shift(bit: u8, length: u8, word_bits: u8) -> u32 {
    if cfg!(target_endian = "little") {
        bit as u32
    } else {
        (word_bits - length - bit) as u32
    }
}

/// Bit offsets of the high- and low-order parts of a combined field stored
/// with one wide write, relative to the combined field's own address.
///
/// Lets the parts be read back separately with narrow loads.
#[inline(always)]
pub const fn split_offsets(high_bits: u8, low_bits: u8) -> (usize, usize) {
    if cfg!(target_endian = "little") {
        (low_bits as usize, 0)
    } else {
        (0, high_bits as usize)
    }
}

#[inline(always)]
fn load_u64(buf: &[u8], at: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&buf[at..at + 8]);
    u64::from_ne_bytes(word)
}

#[inline(always)]
fn store_u64(buf: &mut [u8], at: usize, value: u64) {
    buf[at..at + 8].copy_from_slice(&value.to_ne_bytes());
}

#[inline(always)]
fn load_u32(buf: &[u8], at: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&buf[at..at + 4]);
    u32::from_ne_bytes(word)
}

#[inline(always)]
fn store_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_ne_bytes());
}

impl<B: AsRef<[u8]>> BitAddress<B> {
    /// Reads a field of up to 57 bits through a 64-bit load.
    #[inline(always)]
    pub fn read_wide(&self, length: u8, mask: u64) -> u64 {
        debug_assert!(length <= WIDE_MAX_BITS);
        let word = load_u64(self.base.as_ref(), self.byte());
        (word >> field_shift(self.bit(), length, 64)) & mask
    }

    /// Reads a field of up to 25 bits through a 32-bit load.
    #[inline(always)]
    pub fn read_narrow(&self, length: u8, mask: u32) -> u32 {
        debug_assert!(length <= NARROW_MAX_BITS);
        let word = load_u32(self.base.as_ref(), self.byte());
        (word >> field_shift(self.bit(), length, 32)) & mask
    }

    /// Reads a full 32-bit float.
    #[inline(always)]
    pub fn read_float(&self) -> f32 {
        let word = load_u64(self.base.as_ref(), self.byte());
        f32::from_bits((word >> field_shift(self.bit(), 32, 64)) as u32)
    }

    /// Reads a 31-bit float whose sign was dropped on write; the result is
    /// always negative.
    #[inline(always)]
    pub fn read_neg_float(&self) -> f32 {
        let word = load_u64(self.base.as_ref(), self.byte());
        // The 32nd bit belongs to the next field; the sign overwrites it.
        let bits = (word >> field_shift(self.bit(), 31, 64)) as u32;
        f32::from_bits(bits | SIGN_BIT)
    }
}

impl<B: AsMut<[u8]>> BitAddress<B> {
    /// ORs a field of up to 57 bits into place through a 64-bit word.
    #[inline(always)]
    pub fn write_wide(&mut self, length: u8, value: u64) {
        debug_assert!(length <= WIDE_MAX_BITS);
        debug_assert!(value >> length == 0, "value wider than field");
        let (at, shift) = (self.byte(), field_shift(self.bit(), length, 64));
        let buf = self.base.as_mut();
        let word = load_u64(buf, at) | (value << shift);
        store_u64(buf, at, word);
    }

    /// ORs a field of up to 25 bits into place through a 32-bit word.
    #[inline(always)]
    pub fn write_narrow(&mut self, length: u8, value: u32) {
        debug_assert!(length <= NARROW_MAX_BITS);
        debug_assert!(value >> length == 0, "value wider than field");
        let (at, shift) = (self.byte(), field_shift(self.bit(), length, 32));
        let buf = self.base.as_mut();
        let word = load_u32(buf, at) | (value << shift);
        store_u32(buf, at, word);
    }

    #[inline(always)]
    pub fn write_float(&mut self, value: f32) {
        self.write_wide(32, u64::from(value.to_bits()));
    }

    /// Stores the low 31 bits of a non-positive float.
    #[inline(always)]
    pub fn write_neg_float(&mut self, value: f32) {
        debug_assert!(!(value > 0.0), "positive value {value} in a negative-float field");
        self.write_wide(31, u64::from(value.to_bits() & !SIGN_BIT));
    }

    /// A short-lived address over the same buffer and offset.
    #[inline(always)]
    pub fn reborrow(&mut self) -> BitAddress<&mut [u8]> {
        BitAddress::new(self.base.as_mut(), self.offset)
    }
}

/// Field width and the mask that extracts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitMask {
    pub bits: u8,
    pub mask: u32,
}

impl BitMask {
    /// Smallest field able to hold every integer in `[0, max_value]`.
    pub fn from_max(max_value: u32) -> Self {
        Self::from_bits(required_bits(max_value))
    }

    pub fn from_bits(bits: u8) -> Self {
        debug_assert!(bits <= 32);
        Self {
            bits,
            mask: ((1u64 << bits) - 1) as u32,
        }
    }

    /// The same mask widened for the 64-bit accessors.
    #[inline(always)]
    pub fn wide(self) -> u64 {
        u64::from(self.mask)
    }
}

/// Minimum number of bits representing every integer in `[0, max_value]`.
#[inline]
pub fn required_bits(max_value: u32) -> u8 {
    (u32::BITS - max_value.leading_zeros()) as u8
}


#[cfg(kani)]
mod proofs {
    use super::*;

    #[kani::proof]
    fn prove_narrow_field_round_trips() {
        let bit: u8 = kani::any();
        let width: u8 = kani::any();
        let raw: u32 = kani::any();
        kani::assume(bit < 8);
        kani::assume(width >= 1 && width <= NARROW_MAX_BITS);

        let mask = BitMask::from_bits(width).mask;
        let mut buf = [0u8; 4];
        BitAddress::new(&mut buf[..], bit as usize).write_narrow(width, raw & mask);
        assert_eq!(BitAddress::new(&buf[..], bit as usize).read_narrow(width, mask), raw & mask);
    }

    #[kani::proof]
    fn prove_shift_keeps_field_inside_word() {
        let bit: u8 = kani::any();
        let width: u8 = kani::any();
        kani::assume(bit < 8);
        kani::assume(width >= 1 && width <= WIDE_MAX_BITS);
        assert!(field_shift(bit, width, 64) + width as u32 <= 64);
    }
}
