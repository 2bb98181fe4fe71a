//! # Codebooks
//!
//! A codebook is a sorted table of `2^bits` representative values. Encoding
//! maps a value to the index of its nearest center; decoding is a lookup.

/// Where one codebook lives inside the quantizer's slab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinSpan {
    start: usize,
    len: usize,
}

impl BinSpan {
    /// A span with no centers, used when the scheme stores raw floats.
    pub const EMPTY: BinSpan = BinSpan { start: 0, len: 0 };

    /// `2^bits` centers starting at float index `start`.
    pub fn new(bits: u8, start: usize) -> Self {
        Self {
            start,
            len: 1usize << bits,
        }
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the last float index of the span.
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Read view of this codebook inside `slab`.
    #[inline(always)]
    pub fn bins<'a>(&self, slab: &'a [f32]) -> Bins<'a> {
        Bins::new(&slab[self.start..self.end()])
    }

    #[inline]
    pub fn centers_mut<'a>(&self, slab: &'a mut [f32]) -> &'a mut [f32] {
        &mut slab[self.start..self.end()]
    }
}

/// Borrowed, non-decreasing codebook centers.
#[derive(Debug, Clone, Copy)]
pub struct Bins<'a> {
    centers: &'a [f32],
}

impl<'a> Bins<'a> {
    #[inline(always)]
    pub fn new(centers: &'a [f32]) -> Self {
        Self { centers }
    }

    #[inline]
    pub fn centers(&self) -> &'a [f32] {
        self.centers
    }

    /// Index of the center nearest to `value`.
    ///
    /// Values below the first center map to 0 and values above the last to
    /// the last index. Between two centers the lower one wins only when it is
    /// strictly closer, so an exact tie goes to the higher index. Persisted
    /// models depend on this tie-break; do not change it.
    #[inline]
    pub fn encode(&self, value: f32) -> u32 {
        let above = self.centers.partition_point(|&c| c < value);
        if above == 0 {
            return 0;
        }
        if above == self.centers.len() {
            return (self.centers.len() - 1) as u32;
        }
        let below = above - 1;
        let prefer_below = value - self.centers[below] < self.centers[above] - value;
        (above - usize::from(prefer_below)) as u32
    }

    #[inline(always)]
    pub fn decode(&self, idx: u32) -> f32 {
        self.centers[idx as usize]
    }
}

/// Fills `centers` from `samples` with equal-population runs.
///
/// The sorted samples are cut into `centers.len()` contiguous runs, run `i`
/// covering `[n*i/B, n*(i+1)/B)`, and each center is the mean of its run.
/// An empty run repeats the previous center (negative infinity for the
/// first), so centers come out non-decreasing. `samples` is left sorted.
pub fn train_bins(samples: &mut [f32], centers: &mut [f32]) {
    samples.sort_unstable_by(f32::total_cmp);

    let n = samples.len() as u64;
    let bins = centers.len() as u64;
    let mut start = 0usize;
    for i in 0..centers.len() {
        let finish = (n * (i as u64 + 1) / bins) as usize;
        centers[i] = if finish == start {
            if i == 0 {
                f32::NEG_INFINITY
            } else {
                centers[i - 1]
            }
        } else {
            let run = &samples[start..finish];
            let sum: f32 = run.iter().sum();
            // Accumulated rounding must not push the mean outside its run.
            (sum / run.len() as f32).max(run[0]).min(run[run.len() - 1])
        };
        start = finish;
    }
}
