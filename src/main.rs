use std::error::Error;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use colored::Colorize;
use log::info;

use phase_locked_stim::buffer::SharedSampleBuffer;
use phase_locked_stim::config::{self, SignalSource};
use phase_locked_stim::processing;
use phase_locked_stim::stream;
use phase_locked_stim::transport::ConsoleTransport;
use phase_locked_stim::utils;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let Some(config_path) = args.get(1) else {
        eprintln!("usage: main <params.yaml>");
        std::process::exit(1);
    };

    if let Err(err) = run(config_path) {
        eprintln!("{} {err}", "fatal:".red().bold());
        std::process::exit(1);
    }
}

fn run(config_path: &str) -> Result<(), Box<dyn Error>> {
    utils::log::init(true, Some("phase-locked-stim.log".to_string()))?;

    let config = config::load_config(config_path)?;
    let fs = config.acquisition.fs;
    let buffer = SharedSampleBuffer::with_capacity(config.acquisition.buffer_size);

    let producer = match &config.acquisition.source {
        SignalSource::Simulated => {
            info!("streaming simulated signal at {fs} Hz");
            stream::spawn_simulated_producer(buffer.clone(), fs)
        }
        SignalSource::Csv { path } => {
            let samples = stream::read_signal_from_csv(path)?;
            info!("replaying {} samples from {path}", samples.len());
            stream::spawn_csv_producer(buffer.clone(), fs, samples)
        }
    };

    // fill the buffer before any detector starts polling
    while buffer.len() < buffer.capacity() {
        thread::sleep(Duration::from_millis(10));
    }
    info!("data buffer filled ({} samples)", buffer.capacity());

    let transport = Arc::new(ConsoleTransport);
    let handles = processing::spawn_detectors(&config, &buffer, transport)?;
    println!(
        "{}",
        format!("{} detector(s) running", handles.len()).green()
    );

    // detectors run until the process is terminated; the producer only
    // returns when a recording is exhausted
    let _ = producer.join();
    Ok(())
}
