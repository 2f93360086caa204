//! Coverage keyword to policy topic mapping.

/// Fixed keyword table. Keywords not listed are treated as topic keys.
const COVERAGE_TOPICS: &[(&str, &str)] = &[
    ("auto", "auto_coverage_limits"),
    ("homeowners", "homeowners_coverage"),
    ("commercial", "commercial_liability"),
    ("liability", "commercial_liability"),
    ("claims", "claims_process"),
];

/// Resolve a coverage keyword to a canonical policy topic.
///
/// Input is trimmed and lowercased before lookup.
pub fn resolve_topic(coverage_type: &str) -> String {
    let keyword = coverage_type.trim().to_lowercase();
    COVERAGE_TOPICS
        .iter()
        .find(|(k, _)| *k == keyword)
        .map(|(_, topic)| (*topic).to_string())
        .unwrap_or(keyword)
}
