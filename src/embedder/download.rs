//! Model file download from HuggingFace.
//!
//! Fetches the ONNX export and `tokenizer.json` of all-mpnet-base-v2 into a
//! local directory. Construction never downloads; this runs only when asked.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::config::{MODEL_FILE, TOKENIZER_FILE};

/// Base URL for HuggingFace model files.
const HF_BASE: &str = "https://huggingface.co/sentence-transformers/all-mpnet-base-v2/resolve/main";

/// Files required by the embedder, with their relative URL paths.
const MODEL_FILES: &[(&str, &str)] = &[
    (MODEL_FILE, "onnx/model.onnx"),
    (TOKENIZER_FILE, "tokenizer.json"),
];

/// Return the default model directory path.
#[must_use]
pub fn default_model_dir() -> PathBuf {
    PathBuf::from("models/all-mpnet-base-v2")
}

/// Check whether all required model files exist in `model_dir`.
#[must_use]
pub fn all_files_present(model_dir: &Path) -> bool {
    MODEL_FILES
        .iter()
        .all(|(name, _)| model_dir.join(name).is_file())
}

/// Download any missing model files into `model_dir`, creating it if needed.
pub fn download_model_files(model_dir: &Path) -> Result<()> {
    info!("Checking model files in {}", model_dir.display());

    fs::create_dir_all(model_dir)
        .with_context(|| format!("failed to create models directory: {}", model_dir.display()))?;

    if all_files_present(model_dir) {
        info!("All model files found, skipping download");
        return Ok(());
    }

    info!("Downloading model files from HuggingFace (~440MB, one-time)");

    for &(filename, url_path) in MODEL_FILES {
        let dest = model_dir.join(filename);
        if dest.is_file() {
            info!("File already exists: {filename}");
            continue;
        }

        let url = format!("{HF_BASE}/{url_path}");
        info!("Downloading {filename}...");
        download_file(&dest, &url).with_context(|| format!("failed to download {filename}"))?;
        info!("Downloaded {filename}");
    }

    info!("Model download complete");
    Ok(())
}

/// Stream one file to disk with a progress bar.
///
/// Data lands in a `.part` file first so an interrupted download never
/// looks complete.
fn download_file(dest: &Path, url: &str) -> Result<()> {
    let mut resp =
        reqwest::blocking::get(url).with_context(|| format!("HTTP request failed: {url}"))?;

    if !resp.status().is_success() {
        anyhow::bail!("bad status: {} for {url}", resp.status());
    }

    let pb = match resp.content_length() {
        Some(total) if total > 0 => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  {bar:40.cyan/blue} {percent}% ({bytes}/{total_bytes}) {msg}")
                    .context("invalid progress template")?
                    .progress_chars("█▓░"),
            );
            pb
        }
        _ => ProgressBar::new_spinner(),
    };

    let part = dest.with_extension("part");
    let file = fs::File::create(&part)
        .with_context(|| format!("failed to create file: {}", part.display()))?;

    let mut writer = pb.wrap_write(file);
    resp.copy_to(&mut writer)
        .context("failed to read response body")?;
    pb.finish_and_clear();

    fs::rename(&part, dest)
        .with_context(|| format!("failed to move {} into place", part.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_files_present_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!all_files_present(dir.path()));
    }

    #[test]
    fn test_all_files_present_complete() {
        let dir = tempfile::tempdir().unwrap();
        for &(name, _) in MODEL_FILES {
            fs::write(dir.path().join(name), "dummy").unwrap();
        }
        assert!(all_files_present(dir.path()));
    }

    #[test]
    fn test_all_files_present_partial() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(TOKENIZER_FILE), "dummy").unwrap();
        assert!(!all_files_present(dir.path()));
    }

    #[test]
    fn test_download_skips_when_present() {
        let dir = tempfile::tempdir().unwrap();
        for &(name, _) in MODEL_FILES {
            fs::write(dir.path().join(name), "dummy").unwrap();
        }
        // No network access needed: every file is already there.
        download_model_files(dir.path()).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join(MODEL_FILE)).unwrap(), "dummy");
    }

    #[test]
    fn test_default_model_dir() {
        let dir = default_model_dir();
        assert!(dir.to_str().unwrap().contains("all-mpnet-base-v2"));
    }
}
