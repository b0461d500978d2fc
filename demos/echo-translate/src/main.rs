//! echo-translate: word-for-word translation of a text file through a
//! translator pool.
//!
//! The "model" is a dictionary stored in `<model-dir>/model.bin`, one
//! tab-separated `source<TAB>target` pair per line. Unknown words are copied
//! through and cost one point of score each.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use translator_pool::{
    ComputeType, DecodeError, Decoder, Device, Hypothesis, MODEL_FILE, ReplicaSpec, Tokens,
    TranslationOptions, TranslationResult, Translator, TranslatorConfig,
};

#[derive(Parser)]
#[command(name = "echo-translate", about = "Translate a text file with a dictionary model")]
struct Args {
    /// Directory holding the dictionary model
    #[arg(short = 'm', long)]
    model: PathBuf,

    /// Input file, one tokenized sentence per line
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Output file
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// Number of model replicas
    #[arg(long, default_value_t = 2)]
    inter_threads: usize,

    /// Maximum examples per decode call, 0 for unbounded
    #[arg(long, default_value_t = 16)]
    max_batch_size: usize,

    /// Lines read per chunk, 0 to follow --max-batch-size
    #[arg(long, default_value_t = 0)]
    read_batch_size: usize,

    /// Prefix each line with its score
    #[arg(long)]
    with_scores: bool,

    /// Suppress all logging
    #[arg(long)]
    log_disable: bool,
}

fn init_logging(disable: bool) {
    if disable {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Word-for-word dictionary lookup.
struct DictionaryDecoder {
    entries: HashMap<String, String>,
}

impl Decoder for DictionaryDecoder {
    fn decode(
        &mut self,
        source: &[Tokens],
        target_prefix: &[Tokens],
        _options: &TranslationOptions,
    ) -> Result<Vec<TranslationResult>, DecodeError> {
        let results = source
            .iter()
            .enumerate()
            .map(|(i, tokens)| {
                let mut output = target_prefix.get(i).cloned().unwrap_or_default();
                let mut misses = 0;
                for token in tokens {
                    match self.entries.get(token) {
                        Some(word) => output.push(word.clone()),
                        None => {
                            misses += 1;
                            output.push(token.clone());
                        }
                    }
                }
                TranslationResult::new(vec![Hypothesis::new(output, -(misses as f32))])
            })
            .collect();
        Ok(results)
    }
}

fn load_dictionary(spec: &ReplicaSpec) -> anyhow::Result<DictionaryDecoder> {
    let path = spec.model_path.join(MODEL_FILE);
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let entries = text
        .lines()
        .filter_map(|line| line.split_once('\t'))
        .map(|(source, target)| (source.to_string(), target.to_string()))
        .collect::<HashMap<_, _>>();
    info!(replica = spec.index, entries = entries.len(), "dictionary loaded");
    Ok(DictionaryDecoder { entries })
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = TranslatorConfig::new(&args.model)
        .with_device(Device::Cpu, 0)
        .with_compute_type(ComputeType::Default)
        .with_threads(args.inter_threads, 1);
    let translator = Translator::new(load_dictionary, config)?;

    let options = TranslationOptions::default().with_max_batch_size(args.max_batch_size);
    let tokens = translator.translate_file(
        &args.input,
        &args.output,
        args.read_batch_size,
        &options,
        args.with_scores,
    )?;

    info!(tokens, output = %args.output.display(), "translation finished");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_disable);
    run(args)
}
