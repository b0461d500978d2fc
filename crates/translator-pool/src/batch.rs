//! Request batches and their size-bounded partitions.

use crate::error::{Result, TranslationError};

/// An ordered sequence of tokens
pub type Tokens = Vec<String>;

/// What to do with an absent (`None`) entry in host-provided input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsentPolicy {
    /// Absent entries are an error
    Reject,
    /// Absent entries become empty token lists
    Empty,
}

/// Converts host-style input, where both the list and its entries may be
/// absent, into plain token lists.
///
/// An absent list yields an empty vector. Absent entries are handled per
/// `policy`.
pub fn collect_entries(
    entries: Option<Vec<Option<Tokens>>>,
    policy: AbsentPolicy,
) -> Result<Vec<Tokens>> {
    let Some(entries) = entries else {
        return Ok(vec![]);
    };
    entries
        .into_iter()
        .map(|entry| match (entry, policy) {
            (Some(tokens), _) => Ok(tokens),
            (None, AbsentPolicy::Empty) => Ok(vec![]),
            (None, AbsentPolicy::Reject) => {
                Err(TranslationError::invalid("Invalid None value in input list"))
            }
        })
        .collect()
}

/// Whitespace tokenization used for text streams.
pub fn tokenize(line: &str) -> Tokens {
    line.split_whitespace().map(String::from).collect()
}

pub fn detokenize(tokens: &[String]) -> String {
    tokens.join(" ")
}

/// # Batch
///
/// The examples of one submission, with optional per-example target prefixes.
///
/// `target_prefix` is either empty (no prefixes at all) or exactly as long as
/// `source`; an empty entry means that example has no prefix.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Batch {
    source: Vec<Tokens>,
    target_prefix: Vec<Tokens>,
}

impl Batch {
    pub fn new(source: Vec<Tokens>) -> Self {
        Self {
            source,
            target_prefix: vec![],
        }
    }

    /// Pairs each source example with a target prefix.
    ///
    /// # Errors
    ///
    /// [`TranslationError::InvalidArgument`] if the lists differ in length.
    pub fn with_target_prefix(source: Vec<Tokens>, target_prefix: Vec<Tokens>) -> Result<Self> {
        if !target_prefix.is_empty() && target_prefix.len() != source.len() {
            return Err(TranslationError::invalid(format!(
                "target_prefix has {} entries but source has {}",
                target_prefix.len(),
                source.len()
            )));
        }
        Ok(Self {
            source,
            target_prefix,
        })
    }

    /// Builds a batch from host-style input: absent source entries are
    /// rejected, absent prefix entries mean "no prefix".
    pub fn from_entries(
        source: Option<Vec<Option<Tokens>>>,
        target_prefix: Option<Vec<Option<Tokens>>>,
    ) -> Result<Self> {
        let source = collect_entries(source, AbsentPolicy::Reject)?;
        let target_prefix = collect_entries(target_prefix, AbsentPolicy::Empty)?;
        Self::with_target_prefix(source, target_prefix)
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn source(&self) -> &[Tokens] {
        &self.source
    }

    pub fn target_prefix(&self) -> &[Tokens] {
        &self.target_prefix
    }

    pub fn has_target_prefix(&self) -> bool {
        !self.target_prefix.is_empty()
    }

    /// Partitions the batch into contiguous sub-batches of at most
    /// `max_batch_size` examples, preserving example order.
    ///
    /// A `max_batch_size` of 0 yields a single sub-batch holding everything.
    pub fn split(self, max_batch_size: usize) -> Vec<SubBatch> {
        let total = self.source.len();
        if total == 0 {
            return vec![];
        }
        let step = if max_batch_size == 0 { total } else { max_batch_size };
        let with_prefix = self.has_target_prefix();

        let mut sources = self.source.into_iter();
        let mut prefixes = self.target_prefix.into_iter();
        let mut sub_batches = Vec::with_capacity(total.div_ceil(step));
        let mut offset = 0;

        while offset < total {
            let size = step.min(total - offset);
            let source: Vec<Tokens> = sources.by_ref().take(size).collect();
            let target_prefix: Vec<Tokens> = if with_prefix {
                prefixes.by_ref().take(size).collect()
            } else {
                vec![]
            };
            sub_batches.push(SubBatch {
                offset,
                source,
                target_prefix,
            });
            offset += size;
        }
        sub_batches
    }
}

/// A contiguous slice of a [`Batch`], tagged with the index of its first
/// example in the original batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SubBatch {
    pub offset: usize,
    pub source: Vec<Tokens>,
    pub target_prefix: Vec<Tokens>,
}

impl SubBatch {
    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}
