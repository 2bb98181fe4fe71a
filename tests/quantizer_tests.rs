//! # Quantizer Tests: Packed Trie Entries
//!
//! Trains codebooks, packs entries into a trie-level buffer and reads them
//! back through the same addresses the trie layer would hand out.

use lmq_codec::{NgramWeights, Quantizer, QuantizerBuilder};
use lmq_core::{LmqError, QuantScheme};
use lmq_dsa::{BitAddress, PackedEntries};
use std::time::Instant;

fn nearest(centers: &[f32], v: f32) -> f32 {
    let mut best = centers[0];
    for &c in centers {
        if (c - v).abs() < (best - v).abs() {
            best = c;
        }
    }
    best
}

fn trained_trigram() -> Quantizer {
    let mut quant = QuantizerBuilder::new()
        .scheme(QuantScheme::Quant16)
        .max_order(3)
        .build()
        .unwrap();
    quant
        .train(2, &mut [-0.1, -0.5, -1.0, -2.0], &mut [-0.05, -0.2])
        .unwrap();
    quant.train_longest(&mut [-0.25, -0.75, -3.0]).unwrap();
    quant
}

/// Trains order 3 on a handful of samples and checks that a packed middle
/// entry decodes to the nearest trained center on every read.
#[test]
fn test_quant16_trigram_end_to_end() {
    let t = Instant::now();

    let quant = trained_trigram();
    assert!(quant.is_trained());

    let mut entries = PackedEntries::new(4, quant.middle_entry_bits());
    let values = [(-0.1, -0.05), (-0.5, -0.2), (-1.0, -0.05), (-2.0, -0.2)];
    for (i, &(p, b)) in values.iter().enumerate() {
        quant.write_middle(entries.address_mut(i), 2, p, b);
    }

    let (prob_bins, backoff_bins) = quant.middle_bins(2);
    for (i, &(p, b)) in values.iter().enumerate() {
        let prob = quant.read_prob_middle(entries.address(i), 2);
        let backoff = quant.read_backoff_middle(entries.address(i), 2);
        assert_eq!(prob, nearest(prob_bins.centers(), p));
        assert_eq!(backoff, nearest(backoff_bins.centers(), b));
        // Every sample is its own center here.
        assert_eq!((prob, backoff), (p, b));

        // Reads never disturb the entry.
        for _ in 0..3 {
            assert_eq!(quant.read_prob_middle(entries.address(i), 2), prob);
            assert_eq!(quant.read_backoff_middle(entries.address(i), 2), backoff);
        }
    }

    let overhead = t.elapsed();
    println!("test_quant16_trigram_end_to_end: Testing Overhead = {:?}", overhead);
}

/// Values that were not training samples decode to their nearest center.
#[test]
fn test_unseen_values_decode_to_nearest_center() {
    let quant = trained_trigram();
    let mut entries = PackedEntries::new(3, quant.longest_entry_bits());
    let probes = [-0.4, -1.9, -10.0];
    for (i, &p) in probes.iter().enumerate() {
        quant.write_longest(entries.address_mut(i), p);
    }
    let centers = quant.longest_bins().centers();
    for (i, &p) in probes.iter().enumerate() {
        assert_eq!(quant.read_prob_longest(entries.address(i)), nearest(centers, p));
    }
    assert_eq!(quant.read_prob_longest(entries.address(2)), -3.0);
}

/// Middle and longest entries interleaved in one buffer do not bleed into
/// each other.
#[test]
fn test_mixed_entry_widths_share_a_buffer() {
    let quant = trained_trigram();
    let middle_bits = quant.middle_entry_bits() as usize;
    let longest_bits = quant.longest_entry_bits() as usize;
    let stride = middle_bits + longest_bits;

    let mut buf = vec![0u8; (stride * 16).div_ceil(8) + 8];
    for i in 0..16 {
        let base = i * stride + 3;
        quant.write_middle(BitAddress::new(&mut buf[..], base), 2, -0.5, -0.2);
        quant.write_longest(BitAddress::new(&mut buf[..], base + middle_bits), -0.75);
    }
    for i in 0..16 {
        let base = i * stride + 3;
        assert_eq!(quant.read_prob_middle(BitAddress::new(&buf[..], base), 2), -0.5);
        assert_eq!(quant.read_backoff_middle(BitAddress::new(&buf[..], base), 2), -0.2);
        assert_eq!(
            quant.read_prob_longest(BitAddress::new(&buf[..], base + middle_bits)),
            -0.75
        );
    }
}

/// Raw storage keeps full precision and needs no training.
#[test]
fn test_raw_storage_entries_exact() {
    let quant = Quantizer::new(QuantScheme::NoQuantization, 4).unwrap();
    assert!(!quant.needs_training());
    assert_eq!(quant.middle_entry_bits(), 63);
    assert_eq!(quant.longest_entry_bits(), 31);

    let probs = [-0.0f32, -1e-30, -0.123_456_78, -42.5, f32::NEG_INFINITY];
    let mut entries = PackedEntries::new(probs.len(), quant.middle_entry_bits());
    for (i, &p) in probs.iter().enumerate() {
        quant.write_middle(entries.address_mut(i), 3, p, p * -0.5);
    }
    for (i, &p) in probs.iter().enumerate() {
        assert_eq!(quant.read_prob_middle(entries.address(i), 3).to_bits(), p.to_bits());
        assert_eq!(quant.read_backoff_middle(entries.address(i), 3), p * -0.5);
    }
}

/// A four-gram model trains every middle order independently.
#[test]
fn test_fourgram_orders_are_independent() {
    let mut quant = Quantizer::new(QuantScheme::Quant16, 4).unwrap();
    let bigrams: Vec<NgramWeights> = (1..=50)
        .map(|i| NgramWeights { prob: -(i as f32) * 0.1, backoff: -(i as f32) * 0.01 })
        .collect();
    let trigrams: Vec<NgramWeights> = (1..=50)
        .map(|i| NgramWeights { prob: -(i as f32) * 0.2, backoff: -(i as f32) * 0.02 })
        .collect();
    quant.train_ngrams(2, &bigrams).unwrap();
    quant.train_ngrams(3, &trigrams).unwrap();
    assert!(!quant.is_trained());
    quant.train_longest_ngrams(&trigrams).unwrap();
    assert!(quant.is_trained());

    let mut buf = vec![0u8; 16];
    quant.write_middle(BitAddress::new(&mut buf[..], 0), 2, -0.3, -0.03);
    quant.write_middle(BitAddress::new(&mut buf[..], 32), 3, -0.3, -0.03);

    let bigram_prob = quant.read_prob_middle(BitAddress::new(&buf[..], 0), 2);
    let trigram_prob = quant.read_prob_middle(BitAddress::new(&buf[..], 32), 3);
    assert!((bigram_prob - -0.3).abs() < 1e-6, "{bigram_prob}");
    // Trigram centers are multiples of 0.2.
    assert!((trigram_prob - -0.2).abs() < 1e-6 || (trigram_prob - -0.4).abs() < 1e-6);
}

#[test]
fn test_training_after_seal_is_rejected() {
    let mut quant = trained_trigram();
    let err = quant.train(2, &mut [-1.0], &mut [-1.0]).unwrap_err();
    assert!(matches!(err, LmqError::AlreadyTrained { order: 2 }));
    assert_eq!(err.category(), "already_trained");
}
