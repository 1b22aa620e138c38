use std::error::Error;
use std::f64::consts::PI;
use std::fs::File;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::info;
use rand::Rng;

use crate::buffer::SharedSampleBuffer;

// Simulated acquisition stream: a theta-band oscillation over slower
// background components plus noise. Frequencies in Hz.
const THETA_FREQ: f64 = 7.5;
const BACKGROUND_I_FREQ: f64 = 0.5;
const BACKGROUND_II_FREQ: f64 = 1.5;
const THETA_AMPLITUDE: f64 = 40.0;
const BACKGROUND_AMPLITUDE: f64 = 12.0;
const NOISE_AMPLITUDE: f64 = 4.0;

/// Push a synthetic oscillation into the shared buffer at the sample
/// period, forever.
pub fn spawn_simulated_producer(buffer: SharedSampleBuffer, fs: f64) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut rng = rand::thread_rng();
        let period = Duration::from_secs_f64(1.0 / fs);
        let mut t = 0.0f64;

        loop {
            let noise = rng.gen_range(-NOISE_AMPLITUDE..NOISE_AMPLITUDE);
            let sample = THETA_AMPLITUDE * (2.0 * PI * THETA_FREQ * t).sin()
                + BACKGROUND_AMPLITUDE * (2.0 * PI * BACKGROUND_I_FREQ * t).sin()
                + BACKGROUND_AMPLITUDE / 2.0 * (2.0 * PI * BACKGROUND_II_FREQ * t).sin()
                + noise;
            buffer.push(sample);

            thread::sleep(period);
            t += 1.0 / fs;
        }
    })
}

/// Replay a recorded single-channel signal into the shared buffer at the
/// sample period. Stops at the end of the recording.
pub fn spawn_csv_producer(
    buffer: SharedSampleBuffer,
    fs: f64,
    samples: Vec<f64>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let period = Duration::from_secs_f64(1.0 / fs);
        for sample in samples {
            buffer.push(sample);
            thread::sleep(period);
        }
        info!("csv replay finished");
    })
}

/// Read the first column of a headerless CSV recording.
pub fn read_signal_from_csv(path: &str) -> Result<Vec<f64>, Box<dyn Error>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(File::open(path)?);

    let mut samples = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(field) = record.get(0) {
            samples.push(field.trim().parse()?);
        }
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn csv_reader_parses_a_single_column() {
        let dir = std::env::temp_dir();
        let path = dir.join("phase_locked_stim_signal_test.csv");
        {
            let mut file = File::create(&path).expect("create temp csv");
            writeln!(file, "0.5\n-1.25\n3.0").expect("write temp csv");
        }
        let samples =
            read_signal_from_csv(path.to_str().expect("utf-8 path")).expect("read csv");
        assert_eq!(samples, vec![0.5, -1.25, 3.0]);
        let _ = std::fs::remove_file(&path);
    }
}
