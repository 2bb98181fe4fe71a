use lmq_codec::{NgramWeights, Quantizer, QuantizerBuilder};
use lmq_core::QuantConfig;
use lmq_dsa::PackedEntries;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = QuantConfig::from_toml_str("scheme = \"quant16\"\nmax_order = 3")?;
    let mut quant = QuantizerBuilder::new().with_config(config).build()?;

    let bigrams: Vec<NgramWeights> = (1..=2000)
        .map(|i| NgramWeights {
            prob: -(i as f32).ln() / 2.0,
            backoff: -((i % 97) as f32) / 50.0,
        })
        .collect();
    let trigrams: Vec<NgramWeights> = (1..=5000)
        .map(|i| NgramWeights { prob: -(i as f32).sqrt() / 10.0, backoff: 0.0 })
        .collect();

    quant.train_ngrams(2, &bigrams)?;
    quant.train_longest_ngrams(&trigrams)?;

    let mut level = PackedEntries::new(bigrams.len(), quant.middle_entry_bits());
    for (i, w) in bigrams.iter().enumerate() {
        quant.write_middle(level.address_mut(i), 2, w.prob, w.backoff);
    }

    let mut worst = 0.0f32;
    for (i, w) in bigrams.iter().enumerate() {
        let p = quant.read_prob_middle(level.address(i), 2);
        worst = worst.max((p - w.prob).abs());
    }
    tracing::info!(
        entries = level.len(),
        bytes = level.as_bytes().len(),
        max_prob_error = worst,
        "bigram level packed"
    );

    let bytes = quant.to_bytes();
    let reloaded = Quantizer::deserialize(&bytes[..], 3)?;
    let p0 = reloaded.read_prob_middle(level.address(0), 2);
    tracing::info!(persisted = bytes.len(), first_prob = p0, "quantizer reloaded");

    Ok(())
}
