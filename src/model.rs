use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// Raw snapshot records
// ============================================================================

/// One dependency alert as persisted by the fetch layer.
///
/// Timestamps stay as strings here; they are parsed (and validated) when the
/// alert is reduced.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAlert {
    pub number: u64,
    pub state: String,
    pub created_at: String,
    pub updated_at: String,
    pub dependency: RawDependency,
    pub security_advisory: RawAdvisory,
    pub security_vulnerability: RawVulnerability,
    /// Only present on alerts from the organisation-wide feed.
    #[serde(default)]
    pub repository: Option<RawAlertRepository>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDependency {
    pub package: RawPackage,
    /// `null` upstream when the manifest does not declare a scope. The key
    /// itself is required.
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPackage {
    pub name: String,
    pub ecosystem: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAdvisory {
    pub ghsa_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawVulnerability {
    pub severity: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAlertRepository {
    pub full_name: String,
    pub url: String,
}

/// One repository record from the per-repository snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRepository {
    pub full_name: String,
    pub archived: bool,
    pub disabled: bool,
    pub private: bool,
    pub url: String,
    pub languages: RawLanguages,
    pub dependabot_enabled: bool,
    /// Kept as loose values so each alert can be validated on its own.
    #[serde(default)]
    pub dependabot_alerts: Option<Vec<serde_json::Value>>,
}

/// Language usage as stored upstream.
///
/// The languages endpoint returns `{name: bytes}`, but snapshots produced by
/// a paginated fetch flatten it to a list of names.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawLanguages {
    Weighted(serde_json::Map<String, serde_json::Value>),
    Names(Vec<String>),
}

// ============================================================================
// Reduced records
// ============================================================================

/// Normalized alert detached from the upstream shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReducedAlert {
    pub number: u64,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub package: String,
    pub ecosystem: String,
    pub scope: Option<String>,
    pub ghsa_id: String,
    pub severity: String,
    pub repository_url: String,
    pub repository_full_name: String,
}

impl ReducedAlert {
    pub fn bucket(&self) -> StateBucket {
        StateBucket::classify(&self.state)
    }

    pub fn severity_level(&self) -> Option<Severity> {
        Severity::parse(&self.severity)
    }

    pub fn is_open(&self) -> bool {
        self.state == "open"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Language {
    pub name: String,
    /// Byte count (or whatever number upstream recorded). `None` when only
    /// names were recorded or the value is not numeric.
    pub weight: Option<f64>,
}

/// Normalized repository with its reduced alerts.
///
/// `dependabot_alerts` is always empty when `dependabot_enabled` is false.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReducedRepository {
    pub full_name: String,
    pub archived: bool,
    pub disabled: bool,
    pub private: bool,
    pub url: String,
    pub languages: Vec<Language>,
    pub dependabot_enabled: bool,
    pub dependabot_alerts: Vec<ReducedAlert>,
}

impl ReducedRepository {
    pub fn has_open_alerts(&self) -> bool {
        self.dependabot_alerts.iter().any(ReducedAlert::is_open)
    }
}

// ============================================================================
// Classification
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    /// Matches the upstream lowercase names exactly.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Three-letter tag used in report column names.
    pub fn column_tag(self) -> &'static str {
        match self {
            Severity::Critical => "cri",
            Severity::High => "hig",
            Severity::Medium => "med",
            Severity::Low => "low",
        }
    }
}

/// Three-way partition of alert states used by the overview reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBucket {
    Open,
    Dismissed,
    Fixed,
}

impl StateBucket {
    /// Column order of the overview reports.
    pub const ALL: [StateBucket; 3] = [StateBucket::Open, StateBucket::Dismissed, StateBucket::Fixed];

    /// Anything that is not literally `open` or `fixed` lands in `Dismissed`,
    /// including state values this crate does not know about.
    pub fn classify(state: &str) -> Self {
        match state {
            "open" => StateBucket::Open,
            "fixed" => StateBucket::Fixed,
            _ => StateBucket::Dismissed,
        }
    }

    /// True when `state` is one of the three values the upstream API documents.
    pub fn is_known(state: &str) -> bool {
        matches!(state, "open" | "fixed" | "dismissed")
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StateBucket::Open => "open",
            StateBucket::Dismissed => "dismissed",
            StateBucket::Fixed => "fixed",
        }
    }
}

// ============================================================================
// Keyed collections
// ============================================================================

/// Reduced repositories by repository identifier (`owner/name`), in
/// document order.
pub type ReposByKey = IndexMap<String, ReducedRepository>;

/// Reduced organisation alerts grouped by `repository.full_name`, in
/// first-seen order.
pub type OrgAlertsByRepo = IndexMap<String, Vec<ReducedAlert>>;
