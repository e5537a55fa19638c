//! Cleanup of raw OCR output before it lands in markdown.
//!
//! Scanned court documents come back from OCR with page numbers, stray
//! symbols, and hard-wrapped lines. Evidence scans get the aggressive
//! treatment; briefs keep their numbered headings.

use once_cell::sync::Lazy;
use regex::Regex;

static PAGE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s\-]*\d+[\s\-]*$").unwrap());
static NUMERIC_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d\s\-\.]+$").unwrap());
static SYMBOL_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\w\s가-힣]+$").unwrap());
static HANGUL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[가-힣]").unwrap());
static HANGUL_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[가-힣]").unwrap());
static EVIDENCE_BULLETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[\*\-•◦‣▪▫□■◆◇○●]+\s*").unwrap());
static GENERAL_BULLETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[\*•◦‣▪▫□■◆◇○●]+\s*").unwrap());
static TRAILING_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\-,:;]+$").unwrap());
static EVIDENCE_SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.?!,;:]\s*$").unwrap());
static GENERAL_SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.?!]\s*$").unwrap());
static HEADING_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[\.\)\s]").unwrap());
static GENERAL_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d+[\.\s]").unwrap());
static MULTISPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Clean one page of OCR text. `evidence` selects the evidence-scan
/// treatment: shorter lines are dropped and paragraphs are separated by
/// blank lines.
pub fn tidy_ocr_text(text: &str, evidence: bool) -> String {
    if text.is_empty() {
        return String::new();
    }

    let min_len = if evidence { 5 } else { 3 };
    let mut lines: Vec<String> = Vec::new();

    for raw in text.split('\n') {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if PAGE_NUMBER.is_match(line) || NUMERIC_ONLY.is_match(line) || SYMBOL_ONLY.is_match(line)
        {
            continue;
        }
        if line.chars().count() < min_len && !HANGUL.is_match(line) {
            continue;
        }

        let line = if evidence {
            EVIDENCE_BULLETS.replace(line, "").to_string()
        } else if GENERAL_HEADING.is_match(line) {
            // numbered headings keep their markers
            line.to_string()
        } else {
            GENERAL_BULLETS.replace(line, "").to_string()
        };
        let line = TRAILING_PUNCT.replace(&line, "").to_string();

        lines.push(line);
    }

    join_wrapped_lines(&mut lines, evidence);

    let cleaned: Vec<String> = lines
        .iter()
        .map(|l| MULTISPACE.replace_all(l, " ").trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    if evidence {
        cleaned.join("\n\n")
    } else {
        cleaned.join("\n")
    }
}

/// Merge lines that OCR hard-wrapped mid-sentence.
fn join_wrapped_lines(lines: &mut Vec<String>, evidence: bool) {
    let mut i = 0;
    while i + 1 < lines.len() {
        let current = &lines[i];
        let next = &lines[i + 1];

        if current.is_empty() || next.is_empty() {
            i += 1;
            continue;
        }

        let join = if evidence {
            !EVIDENCE_SENTENCE_END.is_match(current)
                && (HANGUL_START.is_match(next) || !HEADING_START.is_match(next))
        } else if GENERAL_HEADING.is_match(next) {
            false
        } else {
            !GENERAL_SENTENCE_END.is_match(current) && !HEADING_START.is_match(next)
        };

        if join {
            let next = lines.remove(i + 1);
            lines[i] = format!("{} {}", lines[i], next);
        } else {
            i += 1;
        }
    }
}
