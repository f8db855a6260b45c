//! bitvote-train - Train a binary associative network on a text
//!
//! # Usage
//!
//! ```bash
//! # Graph variant with defaults
//! bitvote-train "Hello I am Alex"
//!
//! # Two-layer recurrent cycle, fixed seed, 500 epochs
//! bitvote-train --recurrent --seed 7 --epochs 500 "Hello I am Alex"
//!
//! # Settings from a JSON file
//! bitvote-train --config train.json "Hello I am Alex"
//! ```
//!
//! # Exit Codes
//!
//! - 0: Training finished
//! - 1: Training failed
//! - 2: Invalid arguments or IO error

use std::process::ExitCode;

use anyhow::{bail, Context};
use bitvote::{build_learner, TrainConfig, Variant};

struct Options {
    config: TrainConfig,
    verbose: bool,
    text: String,
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let options = match parse_args(args.get(1..).unwrap_or_default()) {
        Ok(Some(options)) => options,
        Ok(None) => {
            print_help();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("Error: {:#}\n", e);
            print_help();
            return ExitCode::from(2);
        }
    };

    match train(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: &[String]) -> anyhow::Result<Option<Options>> {
    let mut config_path = None;
    let mut epochs = None;
    let mut seed = None;
    let mut recurrent = false;
    let mut feed_input = false;
    let mut verbose = false;
    let mut text = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "-v" | "--verbose" => verbose = true,
            "-r" | "--recurrent" => recurrent = true,
            "-i" | "--feed-input" => feed_input = true,
            "-c" | "--config" => config_path = Some(value(&mut iter, arg)?.to_string()),
            "-e" | "--epochs" => {
                epochs = Some(value(&mut iter, arg)?.parse::<usize>().context("invalid --epochs")?)
            }
            "-s" | "--seed" => {
                seed = Some(value(&mut iter, arg)?.parse::<u64>().context("invalid --seed")?)
            }
            _ if arg.starts_with('-') => bail!("unknown option: {}", arg),
            _ if text.is_none() => text = Some(arg.clone()),
            _ => bail!("unexpected argument: {}", arg),
        }
    }

    let Some(text) = text else {
        bail!("no training text given");
    };
    if text.is_empty() {
        bail!("training text is empty");
    }

    let mut config = match config_path {
        Some(path) => TrainConfig::load(&path).with_context(|| format!("loading {}", path))?,
        None if recurrent => TrainConfig::recurrent(),
        None => TrainConfig::graph(),
    };
    if recurrent {
        config.variant = Variant::Recurrent;
    }
    config.feed_input |= feed_input;
    if let Some(epochs) = epochs {
        config.epochs = epochs;
    }
    if seed.is_some() {
        config.seed = seed;
    }
    config.validate()?;

    Ok(Some(Options {
        config,
        verbose,
        text,
    }))
}

fn value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> anyhow::Result<&'a str> {
    iter.next()
        .map(String::as_str)
        .with_context(|| format!("{} needs a value", flag))
}

fn train(options: &Options) -> anyhow::Result<()> {
    let config = &options.config;
    let text = options.text.as_bytes();
    let mut learner = build_learner(config)?;

    if options.verbose {
        eprintln!(
            "{:?} variant, {} state words, {} epochs",
            config.variant, config.state_words, config.epochs
        );
    }

    for epoch in 1..=config.epochs {
        let report = learner.train_epoch(text)?;
        let last = epoch == config.epochs;
        let due = config.report_every > 0 && epoch % config.report_every == 0;
        if last || due {
            if options.verbose {
                println!(
                    "{:>6} {:>3}/{} {}",
                    epoch,
                    report.matches,
                    text.len(),
                    report.predicted_text()
                );
            } else {
                println!("{}", report.predicted_text());
            }
        }
    }
    Ok(())
}

fn print_help() {
    eprintln!("bitvote-train - Train a binary associative network on a text");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    bitvote-train [OPTIONS] <TEXT>");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -c, --config <FILE>   Load settings from a JSON file");
    eprintln!("    -e, --epochs <N>      Passes over the text");
    eprintln!("    -s, --seed <SEED>     Seed the generator for a reproducible run");
    eprintln!("    -r, --recurrent       Use the two-layer recurrent cycle");
    eprintln!("    -i, --feed-input      Feed the previous symbol as input (graph variant)");
    eprintln!("    -v, --verbose         Show epoch numbers and match counts");
    eprintln!("    -h, --help            Print this help message");
    eprintln!();
    eprintln!("EXIT CODES:");
    eprintln!("    0    Training finished");
    eprintln!("    1    Training failed");
    eprintln!("    2    Invalid arguments or IO error");
}
