//! Filesystem collaborator: one bounded operation per function, plus the
//! capabilities that expose them to the model.
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::catalog::{CapabilityKind, ToolContext, TypedCapability};
use crate::errors::{AgentError, AgentResult};

pub fn read_file(path: &Path) -> io::Result<String> {
    fs::read_to_string(path)
}

/// Overwrite `path`, creating missing parent directories
pub fn write_file(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

/// Entry names of a directory, sorted, with directories suffixed by `/`
pub fn list_dir(path: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() {
            name.push('/');
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

/// Every regular file under `root` in pre-order, siblings sorted by file name
pub fn walk_files(root: &Path) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

pub fn create_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// Recursively delete a directory. Refuses the root, the current directory and
/// anything that is not a directory.
pub fn delete_dir(path: &Path) -> io::Result<()> {
    let raw = path.as_os_str();
    if raw.is_empty() || raw == "." || raw == "/" {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "cannot delete root or current directory",
        ));
    }
    if !fs::metadata(path)?.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "path is not a directory",
        ));
    }
    fs::remove_dir_all(path)
}

fn execution_error(action: &str, e: impl std::fmt::Display) -> AgentError {
    AgentError::ExecutionError(format!("failed to {action}: {e}"))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PathInput {
    pub path: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WriteFileInput {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EmptyInput {}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ContentOutput {
    pub content: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SuccessOutput {
    pub success: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct FilesOutput {
    pub files: Vec<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct PathOutput {
    pub path: String,
}

pub struct ReadFile;

#[async_trait]
impl TypedCapability for ReadFile {
    type Input = PathInput;
    type Output = ContentOutput;
    const NAME: &'static str = "ReadFile";

    fn description(&self) -> &str {
        "Reads the content of a file at the specified path."
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Filesystem
    }

    async fn run(&self, _ctx: &ToolContext, input: PathInput) -> AgentResult<ContentOutput> {
        let content =
            read_file(Path::new(&input.path)).map_err(|e| execution_error("read file", e))?;
        Ok(ContentOutput { content })
    }
}

pub struct WriteFile;

#[async_trait]
impl TypedCapability for WriteFile {
    type Input = WriteFileInput;
    type Output = SuccessOutput;
    const NAME: &'static str = "WriteFile";

    fn description(&self) -> &str {
        "Writes content to a file at the specified path. Overwrites existing content."
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Filesystem
    }

    async fn run(&self, _ctx: &ToolContext, input: WriteFileInput) -> AgentResult<SuccessOutput> {
        write_file(Path::new(&input.path), &input.content)
            .map_err(|e| execution_error("write file", e))?;
        Ok(SuccessOutput { success: true })
    }
}

pub struct ListFiles;

#[async_trait]
impl TypedCapability for ListFiles {
    type Input = PathInput;
    type Output = FilesOutput;
    const NAME: &'static str = "ListFiles";

    fn description(&self) -> &str {
        "Lists files and directories in the specified path."
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Filesystem
    }

    async fn run(&self, _ctx: &ToolContext, input: PathInput) -> AgentResult<FilesOutput> {
        let files =
            list_dir(Path::new(&input.path)).map_err(|e| execution_error("read directory", e))?;
        Ok(FilesOutput { files })
    }
}

pub struct WalkDirectory;

#[async_trait]
impl TypedCapability for WalkDirectory {
    type Input = PathInput;
    type Output = FilesOutput;
    const NAME: &'static str = "WalkDirectory";

    fn description(&self) -> &str {
        "Recursively lists all files in the specified directory."
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Filesystem
    }

    async fn run(&self, _ctx: &ToolContext, input: PathInput) -> AgentResult<FilesOutput> {
        let files = walk_files(Path::new(&input.path))
            .map_err(|e| execution_error("walk directory", e))?
            .into_iter()
            .map(|path| path.to_string_lossy().into_owned())
            .collect();
        Ok(FilesOutput { files })
    }
}

pub struct CreateDirectory;

#[async_trait]
impl TypedCapability for CreateDirectory {
    type Input = PathInput;
    type Output = SuccessOutput;
    const NAME: &'static str = "CreateDirectory";

    fn description(&self) -> &str {
        "Creates a new directory at the specified path."
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Filesystem
    }

    async fn run(&self, _ctx: &ToolContext, input: PathInput) -> AgentResult<SuccessOutput> {
        create_dir(Path::new(&input.path)).map_err(|e| execution_error("create directory", e))?;
        Ok(SuccessOutput { success: true })
    }
}

pub struct DeleteDirectory;

#[async_trait]
impl TypedCapability for DeleteDirectory {
    type Input = PathInput;
    type Output = SuccessOutput;
    const NAME: &'static str = "DeleteDirectory";

    fn description(&self) -> &str {
        "Deletes the directory at the specified path. Use with caution."
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Filesystem
    }

    async fn run(&self, _ctx: &ToolContext, input: PathInput) -> AgentResult<SuccessOutput> {
        delete_dir(Path::new(&input.path)).map_err(|e| execution_error("delete directory", e))?;
        Ok(SuccessOutput { success: true })
    }
}

pub struct GetCurrentDirectory;

#[async_trait]
impl TypedCapability for GetCurrentDirectory {
    type Input = EmptyInput;
    type Output = PathOutput;
    const NAME: &'static str = "GetCurrentDirectory";

    fn description(&self) -> &str {
        "Gets the current working directory."
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Filesystem
    }

    async fn run(&self, _ctx: &ToolContext, _input: EmptyInput) -> AgentResult<PathOutput> {
        let dir = std::env::current_dir()
            .map_err(|e| execution_error("get current directory", e))?;
        Ok(PathOutput {
            path: dir.to_string_lossy().into_owned(),
        })
    }
}
