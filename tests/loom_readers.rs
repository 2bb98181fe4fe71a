//! # Loom Model: Shared Readers
//!
//! Explores interleavings of two threads decoding from one trained
//! quantizer. Run with `cargo test --features loom_test --test loom_readers`.

use lmq_codec::Quantizer;
use lmq_core::QuantScheme;
use lmq_dsa::PackedEntries;
use loom::sync::Arc;
use loom::thread;

#[test]
fn test_loom_concurrent_decode() {
    loom::model(|| {
        let mut quant = Quantizer::new(QuantScheme::Quant16, 2).unwrap();
        quant.train_longest(&mut [-0.5, -1.5, -2.5]).unwrap();

        let mut entries = PackedEntries::new(3, quant.longest_entry_bits());
        for (i, p) in [-0.5, -1.5, -2.5].into_iter().enumerate() {
            quant.write_longest(entries.address_mut(i), p);
        }

        let shared = Arc::new((quant, entries));
        let other = shared.clone();
        let reader = thread::spawn(move || {
            let (q, e) = &*other;
            (0..3).map(|i| q.read_prob_longest(e.address(i))).collect::<Vec<_>>()
        });

        let (q, e) = &*shared;
        let mine: Vec<f32> = (0..3).map(|i| q.read_prob_longest(e.address(i))).collect();
        let theirs = reader.join().unwrap();
        assert_eq!(mine, vec![-0.5, -1.5, -2.5]);
        assert_eq!(mine, theirs);
    });
}
