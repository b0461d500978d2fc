use std::future::Future;
use std::path::Path;

use tokio::runtime::{Builder, Runtime};

use crate::batch::{Batch, Tokens};
use crate::config::TranslatorConfig;
use crate::error::{ModelLoadError, Result};
use crate::model::{ModelLoader, contains_model};
use crate::options::TranslationOptions;
use crate::pool::{TranslationBatcher, TranslatorPool};
use crate::result::TranslationResult;
use crate::stream::consume_text_file;

/// # Translator
///
/// Blocking front end to a [`TranslatorPool`] for callers that are not
/// async, such as language bindings.
///
/// The translator owns the runtime its workers run on. Each call submits the
/// work and then parks the calling thread until the pool has produced every
/// result; the caller holds nothing the workers need while it waits.
///
/// # Panics
///
/// The blocking methods panic when called from inside an async runtime. Async
/// callers should use [`Translator::pool`] and await instead.
pub struct Translator {
    // dropped before the runtime so workers are told to stop first
    pool: TranslatorPool,
    runtime: Runtime,
}

impl Translator {
    /// Loads `config.inter_threads` replicas of the model at
    /// `config.model_path` through `loader`.
    ///
    /// # Errors
    ///
    /// - [`ModelLoadError::NotFound`] if the path holds no model
    /// - [`ModelLoadError::InvalidConfig`] for unusable thread counts
    /// - [`ModelLoadError::Replica`] if any replica fails to load; nothing is
    ///   left running in that case
    pub fn new<L>(loader: L, config: TranslatorConfig) -> std::result::Result<Self, ModelLoadError>
    where
        L: ModelLoader,
    {
        config.validate()?;
        if !contains_model(&config.model_path) {
            return Err(ModelLoadError::NotFound {
                path: config.model_path.clone(),
            });
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(config.inter_threads)
            .thread_name("translator-pool")
            .enable_all()
            .build()
            .map_err(|e| ModelLoadError::Runtime(e.to_string()))?;

        let pool = {
            let _guard = runtime.enter();
            TranslatorPool::new(&loader, &config)?
        };

        Ok(Self { pool, runtime })
    }

    /// The underlying pool, for async callers.
    pub fn pool(&self) -> &TranslatorPool {
        &self.pool
    }

    /// Translates a batch given in host form.
    ///
    /// An absent or empty `source` yields an empty result list. Absent source
    /// entries are rejected; absent prefix entries mean "no prefix".
    ///
    /// # Errors
    ///
    /// [`TranslationError::InvalidArgument`](crate::TranslationError::InvalidArgument)
    /// for absent source entries, mismatched prefix length or invalid
    /// options; [`TranslationError::Decode`](crate::TranslationError::Decode)
    /// if any sub-batch fails.
    pub fn translate_batch(
        &self,
        source: Option<Vec<Option<Tokens>>>,
        target_prefix: Option<Vec<Option<Tokens>>>,
        options: TranslationOptions,
    ) -> Result<Vec<TranslationResult>> {
        if source.as_ref().is_none_or(|entries| entries.is_empty()) {
            return Ok(vec![]);
        }
        let batch = Batch::from_entries(source, target_prefix)?;
        self.wait(self.pool.translate(batch, options))
    }

    /// Translates `input_path` line by line into `output_path` and returns
    /// the number of output tokens.
    ///
    /// `read_batch_size` of 0 reads `options.max_batch_size` lines at a time.
    pub fn translate_file(
        &self,
        input_path: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
        read_batch_size: usize,
        options: &TranslationOptions,
        with_scores: bool,
    ) -> Result<usize> {
        self.wait(consume_text_file(
            &self.pool,
            input_path,
            output_path,
            read_batch_size,
            options,
            with_scores,
        ))
    }

    fn wait<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
