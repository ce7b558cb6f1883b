//! Line scanners for the loosely structured markdown the dashboards are built from.
//!
//! Two shapes are recognised:
//!
//! - field lines, `- **Label:** value`
//! - list items, `- text` / `* text` (and `1. text` for ordered lists)
//!
//! Only the first contiguous list block of a document is ever summarised.

/// Split a `- **Label:** value` line into `(label, value)`, both trimmed.
pub fn parse_field_line(line: &str) -> Option<(&str, &str)> {
    let rest = line
        .trim_start()
        .strip_prefix('-')?
        .trim_start()
        .strip_prefix("**")?;
    let end = rest.find(":**")?;
    let label = &rest[..end];
    if label.trim().is_empty() || label.contains('*') {
        return None;
    }
    Some((label.trim(), rest[end + 3..].trim()))
}

/// Value of the first `- **Label:** value` line whose label matches case-insensitively.
///
/// The value is trimmed and loses one trailing period. Lines with an empty value are skipped.
pub fn extract_field(text: &str, label: &str) -> Option<String> {
    text.lines()
        .filter_map(parse_field_line)
        .find(|(l, v)| l.eq_ignore_ascii_case(label) && !v.is_empty())
        .map(|(_, v)| v.strip_suffix('.').unwrap_or(v).trim_end().to_string())
}

/// Every field line in document order, labels lowercased, values kept verbatim.
pub fn fields(text: &str) -> impl Iterator<Item = (String, &str)> {
    text.lines()
        .filter_map(parse_field_line)
        .map(|(l, v)| (l.to_lowercase(), v))
}

/// Content of an unordered list item (`- ` or `* ` after optional indentation).
pub fn list_item(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let rest = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('*'))?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim_start())
}

/// Content of an ordered list item (`1. ` after optional indentation).
pub fn ordered_item(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let digits = trimmed.len() - trimmed.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let rest = trimmed[digits..].strip_prefix('.')?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim_start())
}

/// The first contiguous list block: from the first list-item line up to (not including) the
/// next blank line. Non-item lines inside the block (continuations) are kept.
pub fn extract_list_block(text: &str) -> Vec<&str> {
    text.lines()
        .skip_while(|line| list_item(line).is_none())
        .take_while(|line| !line.trim().is_empty())
        .collect()
}
