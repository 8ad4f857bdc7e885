//! Query text shaping for log lines.

pub const DEFAULT_LOG_QUERY_CHARS: usize = 200;

/// Collapses whitespace and truncates `sql` to at most `max_chars` characters
/// so untrusted query text cannot flood or split log lines.
pub fn query_for_log(sql: &str, max_chars: usize) -> String {
    let collapsed = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut truncated: String = collapsed.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}
