//! Minimal markdown → HTML renderer for standalone doc pages.
//!
//! Supports the subset the project docs use: `#`–`###` headings, unordered and ordered lists,
//! fenced code blocks, pipe tables, and inline code/links. Everything else is a paragraph.

use crate::fields::{list_item, ordered_item};
use regex::Regex;
use std::sync::OnceLock;

static CODE_RE: OnceLock<Regex> = OnceLock::new();
static LINK_RE: OnceLock<Regex> = OnceLock::new();
static TABLE_SEP_RE: OnceLock<Regex> = OnceLock::new();
static HEADING_RE: OnceLock<Regex> = OnceLock::new();

pub(crate) fn code_re() -> &'static Regex {
    CODE_RE.get_or_init(|| Regex::new(r"`([^`]+)`").unwrap())
}

pub(crate) fn link_re() -> &'static Regex {
    LINK_RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap())
}

fn table_sep_re() -> &'static Regex {
    TABLE_SEP_RE.get_or_init(|| {
        Regex::new(r"^\s*\|?\s*:?-+:?\s*(\|\s*:?-+:?\s*)+\|?\s*$").unwrap()
    })
}

fn heading_re() -> &'static Regex {
    HEADING_RE.get_or_init(|| Regex::new(r"^(#{1,3})\s+(.*)$").unwrap())
}

/// Escape `&`, `<`, `>`, `"` and `'` for use in HTML text and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Inline spans for doc pages: escape, then code spans, then links. No bold.
pub fn render_inline(text: &str) -> String {
    let escaped = escape_html(text);
    let coded = code_re().replace_all(&escaped, "<code>$1</code>");
    link_re()
        .replace_all(&coded, r#"<a href="$2">$1</a>"#)
        .into_owned()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

struct Renderer {
    out: Vec<String>,
    list: Option<ListKind>,
}

impl Renderer {
    fn close_list(&mut self) {
        if let Some(kind) = self.list.take() {
            self.out.push(format!("</{}>", kind.tag()));
        }
    }

    fn list_item(&mut self, kind: ListKind, content: &str) {
        if self.list != Some(kind) {
            self.close_list();
            self.out.push(format!("<{}>", kind.tag()));
            self.list = Some(kind);
        }
        self.out.push(format!("<li>{}</li>", render_inline(content)));
    }
}

fn split_table_row(line: &str) -> Vec<&str> {
    let trimmed = line.trim().trim_matches('|');
    trimmed.split('|').map(str::trim).collect()
}

/// Render a markdown document to an HTML fragment, one output line per block element.
pub fn render(markdown: &str) -> String {
    let normalized = markdown.replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();
    let mut r = Renderer {
        out: Vec::new(),
        list: None,
    };
    let mut in_code = false;
    let mut idx = 0;

    while idx < lines.len() {
        let line = lines[idx];

        if line.trim().starts_with("```") {
            if in_code {
                r.out.push("</code></pre>".to_string());
                in_code = false;
            } else {
                r.close_list();
                r.out.push("<pre><code>".to_string());
                in_code = true;
            }
            idx += 1;
            continue;
        }

        if in_code {
            r.out.push(escape_html(line));
            idx += 1;
            continue;
        }

        if let Some(caps) = heading_re().captures(line) {
            r.close_list();
            let level = caps[1].len();
            r.out
                .push(format!("<h{level}>{}</h{level}>", render_inline(&caps[2])));
            idx += 1;
            continue;
        }

        if line.contains('|')
            && lines
                .get(idx + 1)
                .is_some_and(|next| table_sep_re().is_match(next))
        {
            r.close_list();
            r.out.push("<table><thead><tr>".to_string());
            for cell in split_table_row(line) {
                r.out.push(format!("<th>{}</th>", render_inline(cell)));
            }
            r.out.push("</tr></thead><tbody>".to_string());
            idx += 2;
            while idx < lines.len() && lines[idx].contains('|') {
                r.out.push("<tr>".to_string());
                for cell in split_table_row(lines[idx]) {
                    r.out.push(format!("<td>{}</td>", render_inline(cell)));
                }
                r.out.push("</tr>".to_string());
                idx += 1;
            }
            r.out.push("</tbody></table>".to_string());
            continue;
        }

        if let Some(content) = list_item(line) {
            r.list_item(ListKind::Unordered, content);
        } else if let Some(content) = ordered_item(line) {
            r.list_item(ListKind::Ordered, content);
        } else if line.trim().is_empty() {
            r.close_list();
        } else {
            r.close_list();
            r.out.push(format!("<p>{}</p>", render_inline(line.trim())));
        }
        idx += 1;
    }

    r.close_list();
    if in_code {
        r.out.push("</code></pre>".to_string());
    }
    r.out.join("\n")
}

/// Text of the first `# ` heading, or `default` when the document has none.
pub fn extract_title(markdown: &str, default: &str) -> String {
    markdown
        .lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .unwrap_or_else(|| default.to_string())
}
