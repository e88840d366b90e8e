//! Application configuration.
//!
//! Loaded from a TOML file and layered with `SPREADWATCH__*` environment
//! overrides (e.g. `SPREADWATCH__API__TOKEN`).

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use spreadwatch_sort::{FieldKind, RankTable, SortCycle, SortSchema};

use crate::error::{AppError, AppResult};

/// Backend REST API access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL, e.g. "https://api.example.com/v1".
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token sent with every request.
    #[serde(default)]
    pub token: Option<String>,
    /// Request timeout (ms). Default: 10,000.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Price dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Endpoint returning one object per instrument with its quotes.
    #[serde(default = "default_dashboard_endpoint")]
    pub endpoint: String,
    /// Refresh interval (ms). Default: 5,000.
    #[serde(default = "default_dashboard_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_dashboard_endpoint() -> String {
    "/prices".to_string()
}

fn default_dashboard_interval_ms() -> u64 {
    5_000
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_dashboard_endpoint(),
            poll_interval_ms: default_dashboard_interval_ms(),
        }
    }
}

impl DashboardConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Display and sort kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Numeric,
    Percentage,
    Timestamp,
    /// Ordered by the column's `ranks` list, lowest first.
    Rank,
    /// `false` sorts before `true`.
    Boolean,
}

/// One sortable column of an admin table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub field: String,
    /// Header label or label key. Defaults to the field name.
    #[serde(default)]
    pub label: Option<String>,
    pub kind: ColumnKind,
    /// Rank order for `rank` columns, lowest first.
    #[serde(default)]
    pub ranks: Vec<String>,
}

impl ColumnConfig {
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.field)
    }

    pub fn field_kind(&self) -> FieldKind {
        match self.kind {
            ColumnKind::Text => FieldKind::Text,
            ColumnKind::Numeric => FieldKind::Numeric,
            ColumnKind::Percentage => FieldKind::Percentage,
            ColumnKind::Timestamp => FieldKind::Timestamp,
            ColumnKind::Rank => FieldKind::Rank(RankTable::new(&self.ranks)),
            ColumnKind::Boolean => FieldKind::boolean(),
        }
    }
}

/// One admin list (users, exchanges, symbols, monitoring feed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    pub name: String,
    pub endpoint: String,
    /// Field identifying a row for keys and mutations.
    #[serde(default = "default_id_field")]
    pub id_field: String,
    /// Refresh interval (ms). Default: 30,000.
    #[serde(default = "default_table_interval_ms")]
    pub poll_interval_ms: u64,
    /// Header-click cycle; required so it is never guessed.
    pub sort_cycle: SortCycle,
    pub columns: Vec<ColumnConfig>,
    /// Ask before delete/toggle. Default: true.
    #[serde(default = "default_true")]
    pub confirm_mutations: bool,
}

fn default_id_field() -> String {
    "id".to_string()
}

fn default_table_interval_ms() -> u64 {
    30_000
}

impl TableConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn sort_schema(&self) -> SortSchema {
        self.columns
            .iter()
            .fold(SortSchema::new(), |schema, column| {
                schema.field(column.field.as_str(), column.field_kind())
            })
    }

    pub fn column(&self, field: &str) -> Option<&ColumnConfig> {
        self.columns.iter().find(|c| c.field == field)
    }
}

#[derive(Deserialize)]
struct LabelSection {
    #[serde(default)]
    labels: HashMap<String, String>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub tables: Vec<TableConfig>,
    /// Label key -> display text.
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl AppConfig {
    /// Load `path` and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;

        let mut config: Self = config::Config::builder()
            .add_source(config::File::from_str(&content, config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix("SPREADWATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        // The config crate lowercases map keys; label keys are case-sensitive.
        let file_labels = toml::from_str::<LabelSection>(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?
            .labels;
        for (key, value) in file_labels {
            let value = config.labels.remove(&key.to_lowercase()).unwrap_or(value);
            config.labels.insert(key, value);
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse TOML without environment overrides.
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(AppError::Config("api.base_url must not be empty".into()));
        }
        if self.dashboard.enabled && self.dashboard.poll_interval_ms == 0 {
            return Err(AppError::Config(
                "dashboard.poll_interval_ms must be greater than zero".into(),
            ));
        }

        let mut names = HashSet::new();
        for table in &self.tables {
            if !names.insert(table.name.as_str()) {
                return Err(AppError::Config(format!("Duplicate table: {}", table.name)));
            }
            if table.poll_interval_ms == 0 {
                return Err(AppError::Config(format!(
                    "tables.{}.poll_interval_ms must be greater than zero",
                    table.name
                )));
            }

            let mut fields = HashSet::new();
            for column in &table.columns {
                if !fields.insert(column.field.as_str()) {
                    return Err(AppError::Config(format!(
                        "Duplicate column {} in table {}",
                        column.field, table.name
                    )));
                }
                if column.kind == ColumnKind::Rank && column.ranks.is_empty() {
                    return Err(AppError::Config(format!(
                        "Rank column {} in table {} needs a ranks list",
                        column.field, table.name
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn table(&self, name: &str) -> Option<&TableConfig> {
        self.tables.iter().find(|t| t.name == name)
    }
}
