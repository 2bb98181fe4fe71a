//! # Quantizer
//!
//! Owns the codebooks for every quantized n-gram order and packs
//! (probability, backoff) pairs into trie entries.
//!
//! Orders `2..max_order` ("middle" orders) store a probability and a
//! backoff; the longest order stores only a probability. Unigrams are never
//! quantized. All codebooks live back to back in one [`FloatSlab`]:
//! `[prob(2) backoff(2)] .. [prob(N-1) backoff(N-1)] [prob(N)]`.
//!
//! Persisted form: a 4-byte host-order scheme tag followed by the raw slab
//! bytes. The slab length is implied by the scheme and the model order.

use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};
use lmq_core::{
    longest_entry_bits, middle_entry_bits, quant_floats, LmqError, QuantScheme, Result,
    NEG_FLOAT_BITS,
};
use lmq_dsa::{split_offsets, BitAddress, BitMask, FloatSlab};

use crate::bins::{train_bins, BinSpan, Bins};

/// Probability and backoff of one raw n-gram, as read from the model source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NgramWeights {
    pub prob: f32,
    pub backoff: f32,
}

/// Codebooks of one middle order.
#[derive(Debug, Clone, Copy)]
struct MiddleTables {
    prob: BinSpan,
    backoff: BinSpan,
}

pub struct Quantizer {
    scheme: QuantScheme,
    max_order: usize,
    slab: FloatSlab,
    middle: Vec<MiddleTables>,
    longest: BinSpan,
    prob: BitMask,
    backoff: BitMask,
    /// Per quantized order (`2..=max_order`), whether its tables are trained.
    trained: Vec<bool>,
}

static_assertions::assert_impl_all!(Quantizer: Send, Sync);

impl std::fmt::Debug for Quantizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Quantizer")
            .field("scheme", &self.scheme)
            .field("max_order", &self.max_order)
            .field("slab", &self.slab)
            .field("trained", &self.trained)
            .finish()
    }
}

impl Quantizer {
    /// Allocates zeroed codebooks for a model of order `max_order`.
    ///
    /// A quantizing scheme needs at least bigrams. Raw storage accepts any
    /// order and allocates nothing.
    pub fn new(scheme: QuantScheme, max_order: usize) -> Result<Self> {
        if scheme.is_quantized() && max_order < 2 {
            return Err(LmqError::InvalidOrder {
                scheme,
                order: max_order,
            });
        }

        let floats = quant_floats(scheme, max_order);
        let mut slab = FloatSlab::zeroed(floats);
        let prob = BitMask::from_bits(scheme.prob_bits());
        let backoff = BitMask::from_bits(scheme.backoff_bits());

        let (middle, longest, trained) = if scheme.is_quantized() {
            let mut start = 0;
            let mut middle = Vec::with_capacity(max_order - 2);
            for _ in 2..max_order {
                let p = BinSpan::new(prob.bits, start);
                let b = BinSpan::new(backoff.bits, p.end());
                start = b.end();
                middle.push(MiddleTables { prob: p, backoff: b });
            }
            let longest = BinSpan::new(prob.bits, start);
            debug_assert_eq!(longest.end(), floats);
            (middle, longest, vec![false; max_order - 1])
        } else {
            slab.seal();
            (Vec::new(), BinSpan::EMPTY, Vec::new())
        };

        tracing::debug!(
            ?scheme,
            max_order,
            bytes = slab.byte_len(),
            "quantizer allocated"
        );

        Ok(Self {
            scheme,
            max_order,
            slab,
            middle,
            longest,
            prob,
            backoff,
            trained,
        })
    }

    #[inline]
    pub fn scheme(&self) -> QuantScheme {
        self.scheme
    }

    #[inline]
    pub fn max_order(&self) -> usize {
        self.max_order
    }

    /// Whether codebooks must be trained before entries are written.
    #[inline]
    pub fn needs_training(&self) -> bool {
        self.scheme.is_quantized()
    }

    /// True once every quantized order has its codebooks. The slab is
    /// read-only from then on.
    #[inline]
    pub fn is_trained(&self) -> bool {
        self.slab.is_sealed()
    }

    /// Bits one middle-order entry occupies in a trie node.
    #[inline]
    pub fn middle_entry_bits(&self) -> u8 {
        middle_entry_bits(self.scheme)
    }

    /// Bits one longest-order entry occupies in a trie node.
    #[inline]
    pub fn longest_entry_bits(&self) -> u8 {
        longest_entry_bits(self.scheme)
    }

    /// Raw codebook bytes, exactly as persisted after the tag.
    pub fn blob_bytes(&self) -> &[u8] {
        self.slab.as_bytes()
    }

    /// Probability and backoff codebooks of a middle order.
    ///
    /// ## Panics
    /// Panics if `order` is not in `2..max_order` for a quantizing scheme.
    pub fn middle_bins(&self, order: usize) -> (Bins<'_>, Bins<'_>) {
        let tables = self.middle_tables(order);
        let slab = self.slab.as_floats();
        (tables.prob.bins(slab), tables.backoff.bins(slab))
    }

    /// Probability codebook of the longest order.
    pub fn longest_bins(&self) -> Bins<'_> {
        self.longest.bins(self.slab.as_floats())
    }

    #[inline(always)]
    fn middle_tables(&self, order: usize) -> MiddleTables {
        self.middle[order - 2]
    }

    fn check_trainable(&self, order: usize, middle: bool) -> Result<()> {
        let in_range = if middle {
            order >= 2 && order < self.max_order
        } else {
            order == self.max_order
        };
        if !in_range {
            return Err(LmqError::OrderOutOfRange {
                order,
                max_order: self.max_order,
            });
        }
        if self.slab.is_sealed() {
            return Err(LmqError::AlreadyTrained { order });
        }
        Ok(())
    }

    fn mark_trained(&mut self, order: usize) {
        self.trained[order - 2] = true;
        if self.trained.iter().all(|&t| t) {
            self.slab.seal();
            tracing::info!(max_order = self.max_order, "quantizer trained");
        }
    }

    /// Trains the probability and backoff codebooks of a middle order.
    ///
    /// Both sample sets are sorted in place. A raw-storage quantizer has
    /// nothing to train and ignores the call.
    pub fn train(&mut self, order: usize, probs: &mut [f32], backoffs: &mut [f32]) -> Result<()> {
        if !self.needs_training() {
            tracing::debug!(order, "raw storage: nothing to train");
            return Ok(());
        }
        self.check_trainable(order, true)?;
        if probs.is_empty() {
            tracing::warn!(order, "training codebooks from no samples");
        }

        let tables = self.middle_tables(order);
        let slab = self.slab.as_floats_mut();
        train_bins(probs, tables.prob.centers_mut(slab));
        train_bins(backoffs, tables.backoff.centers_mut(slab));
        tracing::info!(order, samples = probs.len(), "trained middle codebooks");

        self.mark_trained(order);
        Ok(())
    }

    /// Trains the probability codebook of the longest order.
    pub fn train_longest(&mut self, probs: &mut [f32]) -> Result<()> {
        if !self.needs_training() {
            tracing::debug!("raw storage: nothing to train");
            return Ok(());
        }
        let order = self.max_order;
        self.check_trainable(order, false)?;
        if probs.is_empty() {
            tracing::warn!(order, "training codebooks from no samples");
        }

        let longest = self.longest;
        train_bins(probs, longest.centers_mut(self.slab.as_floats_mut()));
        tracing::info!(order, samples = probs.len(), "trained longest codebook");

        self.mark_trained(order);
        Ok(())
    }

    /// [`Quantizer::train`] from raw n-gram records.
    pub fn train_ngrams(&mut self, order: usize, ngrams: &[NgramWeights]) -> Result<()> {
        let mut probs: Vec<f32> = ngrams.iter().map(|w| w.prob).collect();
        let mut backoffs: Vec<f32> = ngrams.iter().map(|w| w.backoff).collect();
        self.train(order, &mut probs, &mut backoffs)
    }

    /// [`Quantizer::train_longest`] from raw n-gram records; backoffs are ignored.
    pub fn train_longest_ngrams(&mut self, ngrams: &[NgramWeights]) -> Result<()> {
        let mut probs: Vec<f32> = ngrams.iter().map(|w| w.prob).collect();
        self.train_longest(&mut probs)
    }

    /// Packs a middle-order entry at `addr`, which must be zeroed.
    ///
    /// ## Panics
    /// Panics if `order` has no middle tables under a quantizing scheme.
    #[inline]
    pub fn write_middle<B: AsMut<[u8]>>(
        &self,
        mut addr: BitAddress<B>,
        order: usize,
        prob: f32,
        backoff: f32,
    ) {
        match self.scheme {
            QuantScheme::NoQuantization => {
                addr.write_neg_float(prob);
                addr.advance(NEG_FLOAT_BITS as usize).write_float(backoff);
            }
            QuantScheme::Quant16 => {
                let tables = self.middle_tables(order);
                let slab = self.slab.as_floats();
                let p = u64::from(tables.prob.bins(slab).encode(prob));
                let b = u64::from(tables.backoff.bins(slab).encode(backoff));
                addr.write_wide(self.prob.bits + self.backoff.bits, (p << self.backoff.bits) | b);
            }
        }
    }

    /// Packs a longest-order entry at `addr`, which must be zeroed.
    #[inline]
    pub fn write_longest<B: AsMut<[u8]>>(&self, mut addr: BitAddress<B>, prob: f32) {
        match self.scheme {
            QuantScheme::NoQuantization => addr.write_neg_float(prob),
            QuantScheme::Quant16 => {
                let code = self.longest_bins().encode(prob);
                addr.write_narrow(self.prob.bits, code);
            }
        }
    }

    #[inline]
    pub fn read_backoff_middle<B: AsRef<[u8]>>(&self, addr: BitAddress<B>, order: usize) -> f32 {
        match self.scheme {
            QuantScheme::NoQuantization => addr.advance(NEG_FLOAT_BITS as usize).read_float(),
            QuantScheme::Quant16 => {
                let (_, low) = split_offsets(self.prob.bits, self.backoff.bits);
                let code = addr.advance(low).read_narrow(self.backoff.bits, self.backoff.mask);
                let tables = self.middle_tables(order);
                tables.backoff.bins(self.slab.as_floats()).decode(code)
            }
        }
    }

    #[inline]
    pub fn read_prob_middle<B: AsRef<[u8]>>(&self, addr: BitAddress<B>, order: usize) -> f32 {
        match self.scheme {
            QuantScheme::NoQuantization => addr.read_neg_float(),
            QuantScheme::Quant16 => {
                let (high, _) = split_offsets(self.prob.bits, self.backoff.bits);
                let code = addr.advance(high).read_narrow(self.prob.bits, self.prob.mask);
                let tables = self.middle_tables(order);
                tables.prob.bins(self.slab.as_floats()).decode(code)
            }
        }
    }

    #[inline]
    pub fn read_prob_longest<B: AsRef<[u8]>>(&self, addr: BitAddress<B>) -> f32 {
        match self.scheme {
            QuantScheme::NoQuantization => addr.read_neg_float(),
            QuantScheme::Quant16 => {
                let code = addr.read_narrow(self.prob.bits, self.prob.mask);
                self.longest_bins().decode(code)
            }
        }
    }

    /// Writes the tag and codebooks.
    pub fn serialize<W: Write>(&self, mut w: W) -> Result<()> {
        w.write_all(&self.scheme.tag().to_ne_bytes())?;
        w.write_all(self.slab.as_bytes())?;
        tracing::info!(
            scheme = ?self.scheme,
            bytes = self.slab.byte_len(),
            "quantizer written"
        );
        Ok(())
    }

    /// The persisted form as one buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4 + self.slab.byte_len());
        buf.put_slice(&self.scheme.tag().to_ne_bytes());
        buf.put_slice(self.slab.as_bytes());
        buf.freeze()
    }

    /// Reads a quantizer written by [`Quantizer::serialize`] for a model of
    /// order `max_order`. The result is trained and read-only.
    ///
    /// An unknown tag is rejected here, so no later read can meet one.
    pub fn deserialize<R: Read>(mut r: R, max_order: usize) -> Result<Self> {
        let mut tag = [0u8; 4];
        r.read_exact(&mut tag)?;
        let scheme = QuantScheme::try_from(i32::from_ne_bytes(tag))?;

        let mut quant = Self::new(scheme, max_order)?;
        if quant.needs_training() {
            r.read_exact(quant.slab.as_bytes_mut())?;
            quant.trained.fill(true);
            quant.slab.seal();
        }
        tracing::info!(?scheme, max_order, "quantizer loaded");
        Ok(quant)
    }
}
