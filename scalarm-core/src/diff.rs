//! Differential update encoding
//!
//! Produces the `parameters` payload of a record update: a JSON object
//! literal containing only the fields whose value changed since the last
//! sync. A field absent from the payload means "unchanged".

use crate::domain::record::SimulationManagerRecord;

/// Reads one tracked field from a record
pub type FieldAccessor = fn(&SimulationManagerRecord) -> &str;

/// Fields pushed back to the service, in payload order
pub const TRACKED_FIELDS: [(&str, FieldAccessor); 9] = [
    ("state", |r| r.state.as_str()),
    ("resource_status", |r| r.resource_status.as_str()),
    ("cmd_to_execute", |r| r.cmd_to_execute.as_str()),
    ("cmd_to_execute_code", |r| r.cmd_to_execute_code.as_str()),
    ("error_log", |r| r.error_log.as_str()),
    ("job_id", |r| r.job_id.as_str()),
    ("pid", |r| r.pid.as_str()),
    ("vm_id", |r| r.vm_id.as_str()),
    ("res_id", |r| r.res_id.as_str()),
];

/// Substitutions applied to every emitted value, in order
const ESCAPES: [(char, &str); 5] = [
    ('\n', "\\n"),
    ('\r', "\\r"),
    ('\t', "\\t"),
    ('\'', "\\'"),
    ('"', "\\\""),
];

/// Escapes a value for embedding in the update payload
///
/// Only newline, carriage return, tab, single and double quotes are
/// rewritten. Backslashes and all other characters pass through untouched.
pub fn escape(input: &str) -> String {
    ESCAPES
        .iter()
        .fold(input.to_string(), |acc, (from, to)| acc.replace(*from, to))
}

/// Names of the tracked fields that differ between the two snapshots
pub fn changed_fields(
    current: &SimulationManagerRecord,
    old: &SimulationManagerRecord,
) -> Vec<&'static str> {
    TRACKED_FIELDS
        .iter()
        .filter(|(_, get)| get(current) != get(old))
        .map(|(name, _)| *name)
        .collect()
}

/// Encodes the changed fields of `current` relative to `old`
///
/// Returns `{}` when nothing changed.
pub fn encode_update(current: &SimulationManagerRecord, old: &SimulationManagerRecord) -> String {
    let entries: Vec<String> = TRACKED_FIELDS
        .iter()
        .filter(|(_, get)| get(current) != get(old))
        .map(|(name, get)| format!("\"{}\":\"{}\"", name, escape(get(current))))
        .collect();

    format!("{{{}}}", entries.join(","))
}
