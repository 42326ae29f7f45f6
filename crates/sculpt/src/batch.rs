//! Applies a [`Profile`] to every eligible file under a directory.
//!
//! Files are processed one at a time in a fixed order. The first failure stops
//! the batch; files already rewritten stay rewritten.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::engine::{ConversationEngine, EngineError, GenerationRequest};
use crate::profile::Profile;
use crate::tools::filesystem::{read_file, walk_files, write_file};
use crate::utils::strip_code_fence;

/// Final answer expected from the model for each file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CodeOutput {
    /// The complete rewritten file
    pub code: String,
}

/// One file found by the walk
#[derive(Debug, Clone, PartialEq)]
pub struct FileTask {
    pub path: PathBuf,
    pub base_path: PathBuf,
    pub eligible: bool,
    /// Filled when the file is read for processing
    pub original: Option<String>,
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to walk directory {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("failed to read file {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to render prompt for {}: {source}", path.display())]
    Render { path: PathBuf, source: tera::Error },

    #[error("failed to generate code for {}: {source}", path.display())]
    Engine { path: PathBuf, source: EngineError },

    #[error("failed to write file {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("cancelled while processing {}", path.display())]
    Cancelled { path: PathBuf },
}

impl BatchError {
    /// The file (or directory, for walk errors) the failure is about
    pub fn path(&self) -> &Path {
        match self {
            BatchError::Walk { path, .. }
            | BatchError::Read { path, .. }
            | BatchError::Render { path, .. }
            | BatchError::Engine { path, .. }
            | BatchError::Write { path, .. }
            | BatchError::Cancelled { path } => path,
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchResult {
    /// Files rewritten on disk, in processing order
    pub modified: Vec<PathBuf>,
    /// The failure that stopped the batch, if any
    pub error: Option<BatchError>,
}

impl BatchResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// What to write back for a model's answer, if anything.
///
/// Nothing is written when the answer is empty or, once code fences and
/// surrounding whitespace are removed, identical to the original. The text
/// written back carries no fence markers and no surrounding whitespace.
pub fn rewrite_candidate(original: &str, candidate: &str) -> Option<String> {
    if candidate.is_empty() || candidate == original {
        return None;
    }

    let cleaned = strip_code_fence(candidate);
    if cleaned.is_empty() || cleaned == original.trim() {
        return None;
    }
    Some(cleaned)
}

pub struct BatchOrchestrator {
    engine: ConversationEngine,
    profile: Profile,
}

impl BatchOrchestrator {
    pub fn new(engine: ConversationEngine, profile: Profile) -> Self {
        Self { engine, profile }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Every regular file under `root` in walk order, flagged by eligibility
    pub fn plan(&self, root: &Path) -> Result<Vec<FileTask>, BatchError> {
        let files = walk_files(root).map_err(|source| BatchError::Walk {
            path: source
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
            source,
        })?;

        Ok(files
            .into_iter()
            .map(|path| FileTask {
                eligible: self.profile.is_eligible(&path),
                path,
                base_path: root.to_path_buf(),
                original: None,
            })
            .collect())
    }

    pub async fn run(&self, root: &Path, cancel: &CancellationToken) -> BatchResult {
        let span = tracing::info_span!("batch", profile = %self.profile.name, root = %root.display());
        self.run_inner(root, cancel).instrument(span).await
    }

    async fn run_inner(&self, root: &Path, cancel: &CancellationToken) -> BatchResult {
        let mut result = BatchResult::default();

        let tasks = match self.plan(root) {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!(error = %e, "walk failed");
                result.error = Some(e);
                return result;
            }
        };

        for mut task in tasks.into_iter().filter(|task| task.eligible) {
            if cancel.is_cancelled() {
                result.error = Some(BatchError::Cancelled { path: task.path });
                break;
            }

            match self.process(&mut task, cancel).await {
                Ok(true) => result.modified.push(task.path),
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(error = %e, "batch stopped");
                    result.error = Some(e);
                    break;
                }
            }
        }

        tracing::info!(
            modified = result.modified.len(),
            failed = result.error.is_some(),
            "batch finished"
        );
        result
    }

    /// Returns whether the file was rewritten
    async fn process(&self, task: &mut FileTask, cancel: &CancellationToken) -> Result<bool, BatchError> {
        let path = task.path.clone();
        tracing::info!(file = %path.display(), "processing");

        let content = read_file(&path).map_err(|source| BatchError::Read {
            path: path.clone(),
            source,
        })?;
        let original: &str = task.original.insert(content);

        let messages = self
            .profile
            .render(&path, &task.base_path, original)
            .map_err(|source| BatchError::Render {
                path: path.clone(),
                source,
            })?;

        let request = GenerationRequest::new(self.profile.model.clone(), messages)
            .with_tools(self.profile.tools.iter().cloned())
            .with_max_turns(self.profile.max_turns)
            .with_temperature(self.profile.temperature);

        let output = self
            .engine
            .run::<CodeOutput>(request, cancel)
            .await
            .map_err(|source| match source {
                EngineError::Cancelled => BatchError::Cancelled { path: path.clone() },
                source => BatchError::Engine {
                    path: path.clone(),
                    source,
                },
            })?;

        let Some(code) = rewrite_candidate(original, &output.value.code) else {
            tracing::info!(file = %path.display(), "unchanged, skipping write");
            return Ok(false);
        };

        write_file(&path, &code).map_err(|source| BatchError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::info!(file = %path.display(), turns = output.turns, "rewritten");
        Ok(true)
    }
}
