//! convreverb - Convolution Reverb CLI

use clap::Parser;
use std::process;
use convreverb::processing::ReverbProcessor;
use convreverb::{init_logging, Args, Config, Result};

fn main() {
    let args = Args::parse();

    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    if args.verbose {
        println!("{}", convreverb::get_library_info());
        println!();
    }

    let config = Config::from_args_and_config(args)?;
    let processor = ReverbProcessor::new(config.clone())?;

    println!("=== Convolution Reverb ===");
    println!("Input: {}", config.input_path.display());
    println!("IR: {}", config.ir_path.display());
    println!("Output: {}", config.output_path.display());
    println!("Speed: {}", config.speed_factor());
    println!("==========================\n");

    if config.verbose() {
        processor.print_status();
    }

    let result = processor.process()?;
    let metrics = &result.performance_metrics;

    println!("=== Processing Complete ===");
    println!("Time: {:.2}s", metrics.processing_time_seconds);
    println!("RTF: {:.3}", metrics.real_time_factor);
    println!("Duration: {:.2}s -> {:.2}s", metrics.input_duration_seconds, metrics.output_duration_seconds);
    if config.verbose() {
        println!("Sample rate: {} Hz", metrics.sample_rate);
        println!("IR length: {} samples", metrics.ir_frames);
        println!("Source peak: {:.4}", metrics.source_peak);
    }
    println!("Saved: {}", result.output_path.display());

    Ok(())
}
