use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::processor::{
    AggregationSettings, DEFAULT_CANDIDATE_KEYS, DEFECT_KEYWORDS, FieldCandidates, InputFormat,
    RETURN_KEYWORDS,
};
use crate::storage::TableFormat;

pub const CONFIG_ENV_VAR: &str = "TICKET_INSIGHTS_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "configs/analyzer.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub input: InputSection,
    pub extractor: ExtractorSection,
    pub fields: FieldCandidates,
    pub classifier: ClassifierSection,
    pub text: TextSection,
    pub aggregation: AggregationSettings,
    pub memo: MemoSection,
    pub report: ReportSection,
    pub reference: ReferenceSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSection {
    pub path: Option<PathBuf>,
    pub format: InputFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorSection {
    pub candidate_keys: Vec<String>,
}

impl Default for ExtractorSection {
    fn default() -> Self {
        ExtractorSection {
            candidate_keys: DEFAULT_CANDIDATE_KEYS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSection {
    pub return_keywords: Vec<String>,
    pub defect_keywords: Vec<String>,
}

impl Default for ClassifierSection {
    fn default() -> Self {
        ClassifierSection {
            return_keywords: RETURN_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            defect_keywords: DEFECT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSection {
    pub extra_stop_words: Vec<String>,
}

/// Entry limits for the session caches; the least recently used entry goes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoSection {
    pub datasets: usize,
    pub aggregates: usize,
}

impl Default for MemoSection {
    fn default() -> Self {
        MemoSection {
            datasets: 4,
            aggregates: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyColumn {
    pub column: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    pub output_path: PathBuf,
    pub output_format: TableFormat,
    pub date_column: String,
    pub key_columns: Vec<KeyColumn>,
}

impl Default for ReportSection {
    fn default() -> Self {
        let key = |column: &str, title: &str| KeyColumn {
            column: column.to_string(),
            title: title.to_string(),
        };

        ReportSection {
            output_path: PathBuf::from("tickets_flattened.csv"),
            output_format: TableFormat::Csv,
            date_column: "created_at".to_string(),
            key_columns: vec![
                key("status", "Status"),
                key("via.channel", "Channel"),
                key("priority", "Priority"),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceSection {
    pub products_path: Option<PathBuf>,
}

impl Default for ReferenceSection {
    fn default() -> Self {
        ReferenceSection {
            products_path: Some(PathBuf::from("configs/products.toml")),
        }
    }
}

impl AnalyzerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read analyzer config file: {}", path.display()))?;

        let config: AnalyzerConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse analyzer config file: {}", path.display()))?;

        Ok(config)
    }

    /// An explicit path must exist. Otherwise `TICKET_INSIGHTS_CONFIG`, then
    /// `configs/analyzer.toml` if present, then built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            info!("Using config from {}={}", CONFIG_ENV_VAR, path);
            return Self::from_file(&path);
        }

        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            info!("Using config file {}", default_path.display());
            return Self::from_file(default_path);
        }

        info!("No config file found, using built-in defaults");
        Ok(AnalyzerConfig::default())
    }
}
