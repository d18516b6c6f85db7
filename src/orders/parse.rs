use std::collections::HashSet;

/// Split free-form input on commas and whitespace (spaces, tabs, newlines),
/// drop empty pieces and repeated identifiers. First occurrence wins, so the
/// result keeps input order. Identifiers are case-sensitive and otherwise
/// unvalidated.
pub fn parse_order_ids(raw_input: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw_input
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(*id))
        .map(str::to_owned)
        .collect()
}
