//! Conversion pipeline: sniff, decode, assemble, write.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use dym_common::Diagnostics;
use dym_parser::{decode, sniff_source, ByteSource, FileFormat};
use grid_processor::{assemble_decoded, ZarrMetadata, ZarrWriter};
use serde::Serialize;
use tracing::{debug, info, info_span};

use crate::config::ConvertConfig;

/// Outcome of a conversion, printed as JSON by the CLI.
#[derive(Debug, Serialize)]
pub struct ConversionReport {
    pub input: String,
    pub format: FileFormat,
    /// Output directory; absent for sniff-only runs.
    pub output: Option<String>,
    pub zarr: Option<ZarrMetadata>,
    pub bytes_written: u64,
    pub diagnostics: Diagnostics,
}

/// Run one conversion.
pub fn run(config: &ConvertConfig) -> Result<ConversionReport> {
    let span = info_span!("convert", source = %config.input.display());
    let _guard = span.enter();

    let mut diag = Diagnostics::new();
    let source = ByteSource::from_path(&config.input);

    if config.sniff_only {
        let format = sniff_source(&source, &mut diag);
        info!(format = %format, "Detected format");
        return Ok(ConversionReport {
            input: source.name(),
            format,
            output: None,
            zarr: None,
            bytes_written: 0,
            diagnostics: diag,
        });
    }

    check_output(&config.output, config.overwrite)?;

    let decoded = decode(&source, &config.decode, &mut diag).context("Failed to decode input")?;
    let grid = assemble_decoded(decoded, &config.assemble).context("Failed to assemble grid")?;
    debug!(shape = ?grid.array.shape(), name = %grid.array.name, "Assembled grid");

    // Staged beside the output. The previous output is removed only after
    // the new one is complete.
    let staging = staging_dir(&config.output)?;
    let writer = ZarrWriter::new(config.zarr.clone());
    let result = writer
        .write_to_path(staging.path(), &grid)
        .with_context(|| format!("Failed to write {}", config.output.display()))?;
    replace_output(staging, &config.output)?;

    info!(
        output = %config.output.display(),
        bytes = result.bytes_written,
        warnings = diag.len(),
        "Conversion complete"
    );

    Ok(ConversionReport {
        input: source.name(),
        format: FileFormat::Dym2,
        output: Some(config.output.display().to_string()),
        zarr: Some(result.metadata),
        bytes_written: result.bytes_written,
        diagnostics: diag,
    })
}

/// Refuse to write over an existing output unless asked to replace it.
fn check_output(output: &Path, overwrite: bool) -> Result<()> {
    if output.exists() && !overwrite {
        bail!(
            "Output {} already exists (use --overwrite to replace it)",
            output.display()
        );
    }
    Ok(())
}

/// Temporary directory beside `output`, removed on drop.
fn staging_dir(output: &Path) -> Result<tempfile::TempDir> {
    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create {}", parent.display()))?;
    tempfile::Builder::new()
        .prefix(".dymconvert-")
        .tempdir_in(parent)
        .with_context(|| format!("Failed to create a staging directory in {}", parent.display()))
}

/// Swap the finished staging directory in for `output`.
fn replace_output(staging: tempfile::TempDir, output: &Path) -> Result<()> {
    if output.is_dir() {
        fs::remove_dir_all(output)
    } else if output.exists() {
        fs::remove_file(output)
    } else {
        Ok(())
    }
    .with_context(|| format!("Failed to remove {}", output.display()))?;

    let staged = staging.keep();
    fs::rename(&staged, output).with_context(|| {
        format!("Failed to move {} to {}", staged.display(), output.display())
    })?;
    debug!(output = %output.display(), "Moved staged output into place");
    Ok(())
}
