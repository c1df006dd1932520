use anyhow::{Context, Result, anyhow};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    #[default]
    Csv,
    Parquet,
}

impl TableFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TableFormat::Csv => "csv",
            TableFormat::Parquet => "parquet",
        }
    }
}

/// Writes a flattened table to a flat file, replacing any previous file at the path.
pub struct TableWriter {
    format: TableFormat,
}

impl TableWriter {
    pub fn new(format: TableFormat) -> Self {
        TableWriter { format }
    }

    /// Writes next to the destination first and renames into place, so a failed
    /// write leaves the previous file (or nothing) rather than a partial table.
    pub fn write(&self, df: &mut DataFrame, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
        }

        let staging = staging_path(path);
        let result = self.write_file(df, &staging);
        if let Err(e) = result {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }

        fs::rename(&staging, path)
            .with_context(|| format!("Failed to move table into place at {}", path.display()))?;

        info!(
            "Saved {} rows x {} columns to {} ({})",
            df.height(),
            df.width(),
            path.display(),
            self.format.extension()
        );
        Ok(path.to_path_buf())
    }

    fn write_file(&self, df: &mut DataFrame, path: &Path) -> Result<()> {
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;

        match self.format {
            TableFormat::Csv => {
                CsvWriter::new(&mut file)
                    .include_header(true)
                    .finish(df)
                    .map_err(|e| anyhow!("Failed to write CSV to {}: {}", path.display(), e))?;
            }
            TableFormat::Parquet => {
                ParquetWriter::new(&mut file)
                    .finish(df)
                    .map_err(|e| anyhow!("Failed to write Parquet to {}: {}", path.display(), e))?;
            }
        }

        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}
