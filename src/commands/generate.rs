//! Generate testdata command implementation.
//!
//! Writes a synthetic recording: evenly spaced records, cycle values that
//! step through 1..=8, and one noisy sine per signal.

use anyhow::{bail, Context};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sigscope::record::{encode_into, Sample, CYCLE_MAX, CYCLE_MIN, RECORD_SIZE, SIGNAL_COUNT};
use sigscope::format_memory_size;
use std::f64::consts::TAU;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info};

/// Shape of one generated signal.
#[derive(Debug, Clone, Copy)]
struct SignalShape {
    level: f64,
    amplitude: f64,
    period_records: f64,
    noise: f64,
}

impl SignalShape {
    fn random(rng: &mut impl Rng) -> Self {
        Self {
            level: rng.gen_range(-50.0..50.0),
            amplitude: rng.gen_range(1.0..25.0),
            period_records: rng.gen_range(60.0..1800.0),
            noise: rng.gen_range(0.0..2.0),
        }
    }

    fn value(&self, i: usize, rng: &mut impl Rng) -> f64 {
        let wave = (TAU * i as f64 / self.period_records).sin();
        self.level + self.amplitude * wave + rng.gen_range(-1.0..=1.0) * self.noise
    }
}

/// Writes `records` synthetic records to `writer`.
pub fn write_recording<W: Write>(
    writer: &mut W,
    records: usize,
    step_ms: u64,
    cycle_length: usize,
    rng: &mut impl Rng,
) -> anyhow::Result<()> {
    if step_ms == 0 {
        bail!("step must be at least 1 ms");
    }
    if cycle_length == 0 {
        bail!("cycle length must be at least 1 record");
    }
    if u32::try_from(records).is_err() {
        bail!("at most {} records fit the index field", u32::MAX);
    }

    let shapes: Vec<SignalShape> = (0..SIGNAL_COUNT).map(|_| SignalShape::random(rng)).collect();
    let cycles = usize::from(CYCLE_MAX - CYCLE_MIN + 1);
    let mut buf = [0u8; RECORD_SIZE];

    for i in 0..records {
        let mut sample = Sample {
            index: i as u32,
            timestamp: (i as u64)
                .checked_mul(step_ms)
                .context("timestamp overflows u64")?,
            cycle_value: CYCLE_MIN + ((i / cycle_length) % cycles) as u8,
            ..Sample::default()
        };
        for (value, shape) in sample.signal_values.iter_mut().zip(&shapes) {
            *value = shape.value(i, rng);
        }
        encode_into(&sample, &mut buf);
        writer.write_all(&buf)?;
    }
    writer.flush()?;
    Ok(())
}

/// Generates a synthetic recording file.
pub fn command_generate_testdata(
    output: PathBuf,
    records: usize,
    step_ms: u64,
    cycle_length: usize,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    debug!(
        "Generating {} records, {} ms apart, cycle length {}",
        records, step_ms, cycle_length
    );

    let file = File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    write_recording(&mut writer, records, step_ms, cycle_length, &mut rng)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let size = (records * RECORD_SIZE) as u64;
    info!("Wrote {} records to {}", records, output.display());
    println!(
        "✅ Generated recording: {} records ({}) in {}",
        records,
        format_memory_size(size),
        output.display()
    );

    Ok(())
}
