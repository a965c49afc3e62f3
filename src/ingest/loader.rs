//! Tolerant loader for `run_result_v1` documents.
//!
//! Only the schema marker is validated. Every other field falls back to a
//! default when missing or of the wrong type, so downstream code only has
//! to cope with empty collections.

use serde_json::{Map, Value};

use super::model::{Finding, Location, RunMetadata, RunResult, Severity, Signal};

pub const RUN_RESULT_SCHEMA: &str = "run_result_v1";

fn str_field(obj: &Map<String, Value>, key: &str, default: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn line_field(obj: &Map<String, Value>, key: &str) -> usize {
    obj.get(key).and_then(Value::as_u64).unwrap_or(0) as usize
}

fn object_field(obj: &Map<String, Value>, key: &str) -> Map<String, Value> {
    obj.get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn array_field<'a>(obj: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    obj.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn parse_location(obj: &Map<String, Value>) -> Location {
    Location {
        path: str_field(obj, "path", ""),
        line_start: line_field(obj, "line_start"),
        line_end: line_field(obj, "line_end"),
    }
}

fn parse_finding(value: &Value) -> Finding {
    let empty = Map::new();
    let obj = value.as_object().unwrap_or(&empty);
    let metadata = object_field(obj, "metadata");

    // Older producers only carry the rule id inside metadata.
    let rule_id = obj
        .get("rule_id")
        .and_then(Value::as_str)
        .or_else(|| metadata.get("rule_id").and_then(Value::as_str))
        .map(str::to_string);

    Finding {
        finding_id: str_field(obj, "finding_id", ""),
        kind: str_field(obj, "type", ""),
        severity: Severity::parse(&str_field(obj, "severity", "info")),
        message: str_field(obj, "message", ""),
        location: parse_location(&object_field(obj, "location")),
        confidence: obj.get("confidence").and_then(Value::as_f64).unwrap_or(0.0),
        snippet: obj.get("snippet").and_then(Value::as_str).map(str::to_string),
        rule_id,
        metadata,
    }
}

fn parse_signal(value: &Value) -> Signal {
    let empty = Map::new();
    let obj = value.as_object().unwrap_or(&empty);
    Signal {
        signal_id: str_field(obj, "signal_id", ""),
        kind: str_field(obj, "type", ""),
        risk_level: str_field(obj, "risk_level", "green"),
        urgency: str_field(obj, "urgency", "optional"),
        evidence: object_field(obj, "evidence"),
    }
}

fn parse_run_metadata(obj: &Map<String, Value>) -> RunMetadata {
    RunMetadata {
        run_id: str_field(obj, "run_id", ""),
        signal_logic_version: str_field(obj, "signal_logic_version", ""),
        engine_version: str_field(obj, "engine_version", ""),
        tool_version: str_field(obj, "tool_version", ""),
    }
}

/// Parse a run result document.
///
/// Returns `None` when the document is not tagged `run_result_v1`.
pub fn load_run_result(document: &Value) -> Option<RunResult> {
    let root = document.as_object()?;
    let schema_version = root.get("schema_version").and_then(Value::as_str)?;
    if schema_version != RUN_RESULT_SCHEMA {
        return None;
    }

    Some(RunResult {
        schema_version: schema_version.to_string(),
        run: parse_run_metadata(&object_field(root, "run")),
        findings: array_field(root, "findings_raw")
            .iter()
            .map(parse_finding)
            .collect(),
        signals: array_field(root, "signals_snapshot")
            .iter()
            .map(parse_signal)
            .collect(),
        summary: object_field(root, "summary"),
    })
}
