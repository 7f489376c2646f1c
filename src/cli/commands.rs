//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::config::MasteringConfig;
use crate::dsp::{build_chain, Chain, Tier};
use crate::engine::decode_audio;
use crate::mastering::{analyze, Mastering, MasteringReport, VolumeAnalysis};

/// Extensions picked up by `batch`
pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "ogg", "m4a", "aac", "aif", "aiff"];

const PREVIEW_SUFFIX: &str = "_preview";
const MASTERED_SUFFIX: &str = "_mastered";
const REPORT_SUFFIX: &str = "_report";

/// Report written next to the mastered files
#[derive(Debug, Serialize)]
pub struct DeliveryReport {
    pub job_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub input: PathBuf,
    pub preview_path: PathBuf,
    pub preview_sha256: String,
    pub full_path: PathBuf,
    pub full_sha256: String,
    pub full_length: usize,
    pub mastering: MasteringReport,
}

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub mastered: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Load a config file, or the defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<MasteringConfig> {
    match path {
        Some(path) => MasteringConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(MasteringConfig::default()),
    }
}

/// Master a single file, writing preview, full render and report.
pub fn master_file(
    mastering: &Mastering,
    input: &Path,
    tier: Tier,
    out_dir: Option<&Path>,
) -> Result<DeliveryReport> {
    info!("Mastering {} ({})", input.display(), tier);

    let bytes = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let hint = extension_of(input);

    let mut progress = |percent: u8| debug!(percent, "progress");
    let result = mastering
        .process(&bytes, hint.as_deref(), tier, &mut progress)
        .with_context(|| format!("Failed to master {}", input.display()))?;

    let out_dir = match out_dir {
        Some(dir) => dir.to_path_buf(),
        None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    if !out_dir.as_os_str().is_empty() {
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    }

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("track");
    let preview_path = out_dir.join(format!("{}{}.wav", stem, PREVIEW_SUFFIX));
    let full_path = out_dir.join(format!("{}{}.wav", stem, MASTERED_SUFFIX));
    let report_path = out_dir.join(format!("{}{}.json", stem, REPORT_SUFFIX));

    fs::write(&preview_path, &result.preview)
        .with_context(|| format!("Failed to write {}", preview_path.display()))?;
    fs::write(&full_path, &result.full)
        .with_context(|| format!("Failed to write {}", full_path.display()))?;

    let report = DeliveryReport {
        job_id: result.report.job_id,
        created_at: Utc::now(),
        input: input.to_path_buf(),
        preview_sha256: sha256_hex(&result.preview),
        preview_path,
        full_sha256: sha256_hex(&result.full),
        full_path,
        full_length: result.full_length,
        mastering: result.report,
    };
    fs::write(&report_path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;

    if report.mastering.degraded {
        warn!("{}: processing degraded, delivered unenhanced audio", input.display());
    }
    println!(
        "Mastered {} -> {} ({} pass{}, make-up gain {:.2})",
        input.display(),
        report.full_path.display(),
        report.mastering.passes,
        if report.mastering.passes == 1 { "" } else { "es" },
        report.mastering.applied_makeup_gain
    );

    Ok(report)
}

fn is_batch_candidate(path: &Path) -> bool {
    let Some(ext) = extension_of(path) else {
        return false;
    };
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        && !stem.ends_with(PREVIEW_SUFFIX)
        && !stem.ends_with(MASTERED_SUFFIX)
}

/// Master every supported file under `dir`; failures are collected, not fatal.
pub fn batch(
    mastering: &Mastering,
    dir: &Path,
    tier: Tier,
    out_dir: Option<&Path>,
) -> Result<BatchSummary> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let mut inputs: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_batch_candidate(path))
        .collect();
    inputs.sort();

    info!("Batch mastering {} files from {}", inputs.len(), dir.display());

    let mut summary = BatchSummary::default();
    for input in inputs {
        match master_file(mastering, &input, tier, out_dir) {
            Ok(_) => summary.mastered.push(input),
            Err(e) => {
                warn!("Skipping {}: {:#}", input.display(), e);
                summary.failed.push((input, format!("{:#}", e)));
            }
        }
    }

    println!(
        "Batch complete: {} mastered, {} failed",
        summary.mastered.len(),
        summary.failed.len()
    );
    for (path, reason) in &summary.failed {
        println!("  FAILED {}: {}", path.display(), reason);
    }

    Ok(summary)
}

fn decode_file(path: &Path) -> Result<crate::engine::SampleBuffer> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    decode_audio(&bytes, extension_of(path).as_deref())
        .with_context(|| format!("Failed to decode {}", path.display()))
}

/// Compare loudness of two files and print the analysis as JSON.
pub fn analyze_files(original: &Path, processed: &Path) -> Result<VolumeAnalysis> {
    let original_buffer = decode_file(original)?;
    let processed_buffer = decode_file(processed)?;

    let analysis = analyze(&original_buffer, &processed_buffer);
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(analysis)
}

/// Print the chain a tier token resolves to as JSON.
pub fn print_chain(tier_token: &str) -> Result<Chain> {
    let chain = build_chain(Tier::parse_lossy(tier_token));
    println!("{}", serde_json::to_string_pretty(&chain)?);
    Ok(chain)
}
