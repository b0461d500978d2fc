//! # Streaming File Translation
//!
//! Translates an unbounded line stream with bounded memory.
//!
//! Input is read in chunks of `read_batch_size` lines. Each chunk is
//! submitted to the pool as soon as it is read, and up to
//! [`MAX_IN_FLIGHT_CHUNKS`] chunks may be decoding at once. Chunks are written
//! back strictly in the order they were read, so output line `i` always
//! belongs to input line `i`.
//!
//! ```text
//! Idle -> Reading <-> (submit) -> Draining -> Done
//! ```
//!
//! Every submitted chunk is awaited and written before a call reports
//! success, and the output is flushed on every exit path.

use std::fmt;
use std::path::Path;

use futures::StreamExt;
use futures::stream::FuturesOrdered;
use tokio::fs::File;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter, Lines,
};
use tracing::{debug, info, warn};

use crate::batch::{Batch, Tokens, detokenize, tokenize};
use crate::error::{Result, TranslationError};
use crate::options::TranslationOptions;
use crate::pool::{PendingTranslation, TranslationBatcher};
use crate::result::TranslationResult;

/// Upper bound on chunks submitted but not yet written
pub const MAX_IN_FLIGHT_CHUNKS: usize = 4;

/// Read chunk used when neither `read_batch_size` nor `max_batch_size` is set
pub const DEFAULT_READ_BATCH_SIZE: usize = 32;

/// Separator between score and tokens when scores are written
pub const SCORE_SEPARATOR: &str = " ||| ";

/// Progress of one stream consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    /// Input remains; chunks are read and submitted while decoding proceeds
    Reading,
    /// Input is exhausted; waiting on the chunks still in flight
    Draining,
    Done,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamState::Idle => "idle",
            StreamState::Reading => "reading",
            StreamState::Draining => "draining",
            StreamState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Counters of a finished stream consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamStats {
    pub num_lines: usize,
    pub num_chunks: usize,
    /// Tokens in the written (best) hypotheses
    pub num_tokens: usize,
}

/// Chunk size actually used for reading: `read_batch_size`, or
/// `max_batch_size` when it is 0, or [`DEFAULT_READ_BATCH_SIZE`] when both are.
pub fn effective_read_batch_size(read_batch_size: usize, max_batch_size: usize) -> usize {
    match (read_batch_size, max_batch_size) {
        (0, 0) => DEFAULT_READ_BATCH_SIZE,
        (0, max) => max,
        (read, _) => read,
    }
}

/// Formats the best hypothesis of `result` as one output line, without the
/// trailing newline.
pub fn format_line(result: &TranslationResult, with_scores: bool) -> String {
    match result.best() {
        Some(best) if with_scores => {
            format!("{}{}{}", best.score, SCORE_SEPARATOR, detokenize(&best.tokens))
        }
        Some(best) => detokenize(&best.tokens),
        None => String::new(),
    }
}

/// Translates every line of `input` and writes one line per input line to
/// `output`, in input order.
///
/// # Errors
///
/// - [`TranslationError::InvalidArgument`] for invalid options, before any input is read
/// - [`TranslationError::Io`] when reading fails: chunks read before the
///   failure are still translated and written, then the error is returned
/// - [`TranslationError::Decode`] when a chunk fails: lines before that chunk
///   are written, nothing after it is
///
/// The output is flushed in every case.
pub async fn consume_stream<T, R, W>(
    translator: &T,
    input: R,
    output: W,
    read_batch_size: usize,
    options: &TranslationOptions,
    with_scores: bool,
) -> Result<StreamStats>
where
    T: TranslationBatcher + ?Sized,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    options.validate()?;
    let chunk_size = effective_read_batch_size(read_batch_size, options.max_batch_size);

    let mut lines = input.lines();
    let mut writer = BufWriter::new(output);
    let mut stats = StreamStats::default();

    let outcome = pump(
        translator,
        &mut lines,
        &mut writer,
        chunk_size,
        options,
        with_scores,
        &mut stats,
    )
    .await;
    let flushed = writer.flush().await;

    outcome?;
    flushed?;
    debug!(state = %StreamState::Done, lines = stats.num_lines, "stream consumed");
    Ok(stats)
}

async fn pump<T, R, W>(
    translator: &T,
    lines: &mut Lines<R>,
    writer: &mut BufWriter<W>,
    chunk_size: usize,
    options: &TranslationOptions,
    with_scores: bool,
    stats: &mut StreamStats,
) -> Result<()>
where
    T: TranslationBatcher + ?Sized,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut state = StreamState::Idle;
    let mut in_flight: FuturesOrdered<PendingTranslation> = FuturesOrdered::new();
    let mut read_error: Option<std::io::Error> = None;

    loop {
        if state != StreamState::Draining {
            state = StreamState::Reading;
        }

        while state == StreamState::Reading && in_flight.len() < MAX_IN_FLIGHT_CHUNKS {
            let (chunk, error) = read_chunk(lines, chunk_size).await;
            if let Some(e) = error {
                warn!(
                    error = %e,
                    lines = stats.num_lines + chunk.len(),
                    "input read failed, draining"
                );
                read_error = Some(e);
                state = StreamState::Draining;
            } else if chunk.len() < chunk_size {
                state = StreamState::Draining;
            }
            if chunk.is_empty() {
                break;
            }

            stats.num_lines += chunk.len();
            stats.num_chunks += 1;
            debug!(chunk = stats.num_chunks, size = chunk.len(), "submitting chunk");
            let pending = translator.submit(Batch::new(chunk), options.clone()).await?;
            in_flight.push_back(pending);
        }

        match in_flight.next().await {
            Some(results) => {
                for result in results?.iter() {
                    let line = format_line(result, with_scores);
                    writer.write_all(line.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                    stats.num_tokens += result.num_output_tokens();
                }
            }
            None if state == StreamState::Draining => break,
            None => {}
        }
    }

    match read_error {
        Some(e) => Err(TranslationError::Io(e)),
        None => Ok(()),
    }
}

/// Reads up to `chunk_size` lines. On a read failure the lines read so far
/// are returned along with the error.
async fn read_chunk<R>(
    lines: &mut Lines<R>,
    chunk_size: usize,
) -> (Vec<Tokens>, Option<std::io::Error>)
where
    R: AsyncBufRead + Unpin,
{
    let mut chunk = Vec::with_capacity(chunk_size);
    while chunk.len() < chunk_size {
        match lines.next_line().await {
            Ok(Some(line)) => chunk.push(tokenize(&line)),
            Ok(None) => break,
            Err(e) => return (chunk, Some(e)),
        }
    }
    (chunk, None)
}

/// Translates the text file at `input_path` into `output_path`, one line per
/// line, and returns the number of output tokens.
///
/// See [`consume_stream`] for ordering and failure behaviour.
pub async fn consume_text_file<T>(
    translator: &T,
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    read_batch_size: usize,
    options: &TranslationOptions,
    with_scores: bool,
) -> Result<usize>
where
    T: TranslationBatcher + ?Sized,
{
    // an existing output file is left alone when the request is rejected
    options.validate()?;
    let input_path = input_path.as_ref();
    let output_path = output_path.as_ref();
    let input = BufReader::new(File::open(input_path).await?);
    let output = File::create(output_path).await?;

    let stats =
        consume_stream(translator, input, output, read_batch_size, options, with_scores).await?;
    info!(
        input = %input_path.display(),
        output = %output_path.display(),
        lines = stats.num_lines,
        chunks = stats.num_chunks,
        tokens = stats.num_tokens,
        "file translated"
    );
    Ok(stats.num_tokens)
}
