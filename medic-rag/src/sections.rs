//! Section extraction for markdown and structured first-aid manuals.
//!
//! Two layouts are understood:
//!
//! - **Markdown**: one [`Section`] per heading line (`#` … `######`), plus an
//!   implicit `Introduction` section for any text before the first heading.
//! - **Structured manual** (`rt_manual`): records separated by a long line of
//!   `=` characters. Each record starts with an `ID: Title` line and may hold
//!   upper-case `LABEL:` lines that open subsections.
//!
//! ```text
//! ================================================================================
//! RT-04: Arrêt cardiaque
//! CATEGORIE: Urgences vitales
//! SIGNES:
//! La victime ne répond pas et ne respire pas.
//! CONDUITE À TENIR: Alerter, masser, défibriller.
//! ================================================================================
//! ```

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::document::{DocumentFormat, Section, SectionKind};

/// Minimum run of `=` that makes a record separator line.
pub const RT_SEPARATOR_MIN_LEN: usize = 40;

/// Title of the implicit section holding text before the first markdown heading.
pub const LEADING_SECTION_TITLE: &str = "Introduction";

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})(?:[ \t]+(.*?))?[ \t#]*$").expect("valid regex"));

static RT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*RT[-_ ]?\d+\s*:").expect("valid regex"));

static LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\p{Lu}[\p{Lu}\d '’/()\-]*\p{Lu})\s*:\s*(.*)$").expect("valid regex")
});

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").expect("valid regex"));

static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Collapse runs of spaces, collapse three or more newlines to two, and trim.
pub fn normalize_whitespace(content: &str) -> String {
    let unix = content.replace("\r\n", "\n").replace('\r', "\n");
    let spaced = SPACES.replace_all(&unix, " ");
    let lines: Vec<&str> = spaced.split('\n').map(str::trim_end).collect();
    let joined = lines.join("\n");
    BLANK_RUNS.replace_all(&joined, "\n\n").trim().to_string()
}

fn is_separator_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= RT_SEPARATOR_MIN_LEN && trimmed.bytes().all(|b| b == b'=')
}

/// Pick the layout of `content`: `rt_manual` when it holds both a record
/// separator line and an `RT-nn:` marker, markdown otherwise.
pub fn detect_format(content: &str) -> DocumentFormat {
    let has_separator = content.lines().any(is_separator_line);
    if has_separator && RT_MARKER.is_match(content) {
        DocumentFormat::RtManual
    } else {
        DocumentFormat::Markdown
    }
}

/// Split `content` into ordered sections according to `format`.
pub fn extract_sections(content: &str, format: DocumentFormat) -> Vec<Section> {
    match format {
        DocumentFormat::Markdown => extract_markdown_sections(content),
        DocumentFormat::RtManual => extract_manual_sections(content),
    }
}

/// Parse markdown into heading sections.
///
/// Text before the first heading becomes an `Introduction` section at level 0,
/// omitted when blank. Heading sections are kept even when their body is
/// empty; callers decide whether to skip them.
pub fn extract_markdown_sections(content: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut headers: Vec<String> = Vec::new();
    let mut title = LEADING_SECTION_TITLE.to_string();
    let mut level = 0u8;
    let mut header_path = String::new();
    let mut body: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in content.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        let heading = if in_fence { None } else { HEADING.captures(line) };
        let Some(caps) = heading else {
            body.push(line);
            continue;
        };

        push_markdown_section(&mut sections, &title, level, &header_path, &body);
        body.clear();

        let depth = caps.get(1).map_or(1, |m| m.as_str().len());
        title = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();
        level = depth as u8;
        headers.truncate(depth.saturating_sub(1));
        headers.push(title.clone());
        header_path = headers
            .iter()
            .filter(|h| !h.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" > ");
    }
    push_markdown_section(&mut sections, &title, level, &header_path, &body);

    debug!(sections = sections.len(), "extracted markdown sections");
    sections
}

fn push_markdown_section(
    sections: &mut Vec<Section>,
    title: &str,
    level: u8,
    header_path: &str,
    body: &[&str],
) {
    let content = body.join("\n").trim().to_string();
    if level == 0 && content.is_empty() {
        return;
    }
    sections.push(Section {
        title: title.to_string(),
        content,
        kind: SectionKind::Heading { level, header_path: header_path.to_string() },
    });
}

/// Parse a structured manual into one section per record.
///
/// Records without a parseable `ID: Title` line are logged and skipped.
pub fn extract_manual_sections(content: &str) -> Vec<Section> {
    let mut records: Vec<Vec<&str>> = vec![Vec::new()];
    for line in content.lines() {
        if is_separator_line(line) {
            records.push(Vec::new());
        } else if let Some(current) = records.last_mut() {
            current.push(line);
        }
    }

    let mut sections = Vec::new();
    let mut position = 0i64;
    for lines in records {
        if lines.iter().all(|l| l.trim().is_empty()) {
            continue;
        }
        position += 1;
        match parse_manual_record(&lines, position) {
            Some(section) => sections.push(section),
            None => {
                let head = lines.iter().find(|l| !l.trim().is_empty()).copied().unwrap_or("");
                warn!(record = position, head, "skipping unparseable manual record");
            }
        }
    }

    debug!(sections = sections.len(), "extracted manual sections");
    sections
}

fn parse_manual_record(lines: &[&str], position: i64) -> Option<Section> {
    let start = lines.iter().position(|l| !l.trim().is_empty())?;
    let (id, title) = lines[start].split_once(':')?;
    let id = id.trim();
    let title = title.trim();
    if id.is_empty() || id.contains(char::is_whitespace) || title.is_empty() {
        return None;
    }

    let ordinal = DIGITS
        .find(id)
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(position);

    let body = &lines[start + 1..];
    let mut category = None;
    let mut subsections: BTreeMap<String, String> = BTreeMap::new();
    let mut open_label: Option<String> = None;
    let mut content_lines: Vec<&str> = Vec::new();

    for &line in body {
        if let Some(caps) = LABEL.captures(line) {
            let label = caps[1].trim().to_string();
            let rest = caps[2].trim();
            if is_category_label(&label) {
                if !rest.is_empty() {
                    category = Some(rest.to_string());
                }
                open_label = None;
                continue;
            }
            append_subsection(&mut subsections, &label, rest);
            open_label = Some(label);
        } else if let Some(label) = &open_label {
            append_subsection(&mut subsections, label, line.trim());
        }
        content_lines.push(line);
    }

    Some(Section {
        title: title.to_string(),
        content: content_lines.join("\n").trim().to_string(),
        kind: SectionKind::ManualEntry { id: id.to_string(), ordinal, category, subsections },
    })
}

fn is_category_label(label: &str) -> bool {
    matches!(label, "CATEGORIE" | "CATÉGORIE" | "CATEGORY")
}

fn append_subsection(subsections: &mut BTreeMap<String, String>, label: &str, text: &str) {
    let entry = subsections.entry(label.to_string()).or_default();
    if text.is_empty() {
        return;
    }
    if !entry.is_empty() {
        entry.push('\n');
    }
    entry.push_str(text);
}
