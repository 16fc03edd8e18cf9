//! Input discovery and parsing.
//!
//! Files are parsed by extension into JSON values. A YAML stream with
//! several documents becomes an array so the engine checks each document.

use anyhow::{bail, Context, Result};
use conftest_engine::InputDocument;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Path that reads a YAML or JSON document from stdin.
pub const STDIN: &str = "-";

const EXTENSIONS: &[&str] = &["json", "yaml", "yml", "toml"];

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Expand directories into the supported files they contain.
///
/// Files named explicitly are kept as given, in order. Directory contents
/// are sorted by name, and files whose path matches `ignore` are skipped.
/// Finding no file at all is an error.
#[tracing::instrument(skip(paths, ignore), fields(paths = paths.len()))]
pub fn collect_files(paths: &[PathBuf], ignore: Option<&Regex>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.as_os_str() == STDIN || !path.is_dir() {
            files.push(path.clone());
            continue;
        }

        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.with_context(|| format!("failed to walk {}", path.display()))?;
            if !entry.file_type().is_file() || !has_supported_extension(entry.path()) {
                continue;
            }
            if ignore.is_some_and(|pattern| pattern.is_match(&entry.path().to_string_lossy())) {
                tracing::trace!(file = %entry.path().display(), "Ignoring file");
                continue;
            }
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        bail!("no files found in {}", display_paths(paths));
    }

    tracing::debug!(files = files.len(), "Collected input files");
    Ok(files)
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read and parse every input file.
pub fn load_documents(paths: &[PathBuf], ignore: Option<&Regex>) -> Result<Vec<InputDocument>> {
    collect_files(paths, ignore)?
        .iter()
        .map(|path| load_document(path))
        .collect()
}

fn load_document(path: &Path) -> Result<InputDocument> {
    if path.as_os_str() == STDIN {
        let mut contents = String::new();
        std::io::stdin()
            .read_to_string(&mut contents)
            .context("failed to read stdin")?;
        let value = parse_yaml(&contents).context("failed to parse stdin")?;
        return Ok(InputDocument::new(STDIN, value));
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value = parse_document(path, &contents)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(InputDocument::new(path.display().to_string(), value))
}

/// Parse file contents according to the file's extension.
pub fn parse_document(path: &Path, contents: &str) -> Result<Value> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "json" => Ok(serde_json::from_str(contents)?),
        "yaml" | "yml" => parse_yaml(contents),
        "toml" => Ok(toml::from_str(contents)?),
        _ => bail!("unsupported file type: {}", path.display()),
    }
}

/// Parse a YAML stream. Several documents become an array, empty documents
/// are dropped.
fn parse_yaml(contents: &str) -> Result<Value> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(contents) {
        let value = Value::deserialize(document)?;
        if !value.is_null() {
            documents.push(value);
        }
    }

    Ok(match documents.len() {
        0 => Value::Null,
        1 => documents.swap_remove(0),
        _ => Value::Array(documents),
    })
}
