use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info = 0,
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl Severity {
    /// Priority rank used by the planner, higher is more urgent.
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    /// Unknown labels rank like `info` rather than failing the load.
    pub fn parse(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            _ => Severity::Info,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::High => write!(f, "HIGH"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::Low => write!(f, "LOW"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}

/// Line range inside one file, 1-based and inclusive, as reported upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub path: String,
    pub line_start: usize,
    pub line_end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub finding_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub message: String,
    pub location: Location,
    pub confidence: f64,
    pub snippet: Option<String>,
    pub rule_id: Option<String>,
    pub metadata: Map<String, Value>,
}

impl Finding {
    /// Rule id used for taxonomy lookup. Findings without one get an id
    /// derived from their type so they are still planned (and flagged).
    pub fn resolved_rule_id(&self) -> String {
        match &self.rule_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!("{}_UNKNOWN", self.kind.to_uppercase()),
        }
    }

    /// Confidence scaled to an integer percentage for ordering.
    pub fn confidence_score(&self) -> i64 {
        (self.confidence * 100.0).round() as i64
    }
}

/// Aggregated finding group from the upstream engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub signal_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub risk_level: String,
    pub urgency: String,
    pub evidence: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: String,
    pub signal_logic_version: String,
    pub engine_version: String,
    pub tool_version: String,
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub schema_version: String,
    pub run: RunMetadata,
    pub findings: Vec<Finding>,
    pub signals: Vec<Signal>,
    pub summary: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(kind: &str, rule_id: Option<&str>) -> Finding {
        Finding {
            finding_id: "f-1".to_string(),
            kind: kind.to_string(),
            severity: Severity::Medium,
            message: String::new(),
            location: Location {
                path: "a.py".to_string(),
                line_start: 1,
                line_end: 1,
            },
            confidence: 0.5,
            snippet: None,
            rule_id: rule_id.map(str::to_string),
            metadata: Map::new(),
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Low > Severity::Info);
        assert_eq!(Severity::Critical.rank(), 4);
        assert_eq!(Severity::Info.rank(), 0);
    }

    #[test]
    fn test_severity_parse_falls_back_to_info() {
        assert_eq!(Severity::parse("HIGH"), Severity::High);
        assert_eq!(Severity::parse("medium"), Severity::Medium);
        assert_eq!(Severity::parse("severe"), Severity::Info);
    }

    #[test]
    fn test_resolved_rule_id_prefers_explicit_id() {
        let f = finding("global_state", Some("GST_MUTABLE_DEFAULT_001"));
        assert_eq!(f.resolved_rule_id(), "GST_MUTABLE_DEFAULT_001");
    }

    #[test]
    fn test_resolved_rule_id_synthesized_from_type() {
        let f = finding("dead_code", None);
        assert_eq!(f.resolved_rule_id(), "DEAD_CODE_UNKNOWN");
    }

    #[test]
    fn test_confidence_score_rounds() {
        let mut f = finding("x", None);
        f.confidence = 0.956;
        assert_eq!(f.confidence_score(), 96);
        f.confidence = 0.904;
        assert_eq!(f.confidence_score(), 90);
    }
}
