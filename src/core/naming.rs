//! Filename standardization rules for downloaded court files.
//!
//! Downloaded files arrive as `사건번호_날짜_문서종류_...`; the first pass
//! rewrites them per document category (`2024.01.15.자_판결문_...`), the
//! second pass classifies them under a numbered prefix (`9_판결_...`).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::yaml_config::FileNamingRules;
use crate::domain::model::{
    BASIC_INFO_PREFIX, EVIDENCE_PREFIX, JUDGMENT_PREFIX, KNOWN_PREFIXES, SUBMISSION_PREFIX,
};
use crate::utils::error::{CasefilesError, Result};

static BASE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+[가-힣]+\d+)_(\d{4}\.\d{2}\.\d{2})_([^_]+)_?(.*)").unwrap());
static FILE_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_(\d{4}\.\d{2}\.\d{2})_").unwrap());
static EVIDENCE_NO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(갑|을)(\d+)(?:-(\d+))?").unwrap());
static EVIDENCE_DESC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:갑|을)\d+(?:-\d+)?_([^_]+)").unwrap());
static EVIDENCE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:갑|을)\d+(?:-\d+)?").unwrap());
static PAREN_CONTENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^()]+)\)").unwrap());
static NON_NAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s가-힣()]").unwrap());
static INQUIRY_ORG: Lazy<Regex> = Lazy::new(|| Regex::new(r"_기타_([^_]+)_").unwrap());
static TRANSCRIPT_SUBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"녹취서요지\(([^)]+)\)").unwrap());
static HEARING_ROUND: Lazy<Regex> = Lazy::new(|| Regex::new(r"변론조서 \((\d+)회\)").unwrap());
static APPLICATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([가-힣]+신청서)(?:\(([^)]+)\))?").unwrap());
static WITNESS_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"증인신청서\(([^)]+)\)").unwrap());
static JUDGE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"판사_([^_]+)").unwrap());
static NUMBERED_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+_[^_]+_)").unwrap());
static DANGLING_PAREN_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\)\([^()]+").unwrap());

struct CompiledPattern {
    raw: String,
    regex: Regex,
}

struct PrefixRule {
    prefix: String,
    patterns: Vec<CompiledPattern>,
}

/// Compiled naming rule set. Rules iterate in prefix order, so the
/// lowest-numbered prefix wins when several tables match.
pub struct Renamer {
    rules: Vec<PrefixRule>,
}

impl Renamer {
    pub fn new(rules: &FileNamingRules) -> Result<Self> {
        let mut compiled = Vec::new();
        for (prefix, patterns) in &rules.prefix_patterns {
            let mut entry = PrefixRule {
                prefix: prefix.clone(),
                patterns: Vec::new(),
            };
            for raw in patterns {
                let regex = Regex::new(&format!("(?i){}", raw)).map_err(|e| {
                    CasefilesError::InvalidConfigValueError {
                        field: format!("file_naming_rules.prefix_patterns.{}", prefix),
                        value: raw.clone(),
                        reason: e.to_string(),
                    }
                })?;
                entry.patterns.push(CompiledPattern {
                    raw: raw.clone(),
                    regex,
                });
            }
            compiled.push(entry);
        }
        Ok(Self { rules: compiled })
    }

    fn patterns_for(&self, prefix: &str) -> &[CompiledPattern] {
        self.rules
            .iter()
            .find(|r| r.prefix == prefix)
            .map(|r| r.patterns.as_slice())
            .unwrap_or(&[])
    }

    /// First-pass rename: rewrite a downloaded filename into the standard
    /// per-category form. Returns `None` when the name does not match the
    /// download pattern or no category rewrite applies.
    pub fn standardize(&self, filename: &str) -> Option<String> {
        if !BASE_NAME.is_match(filename) {
            return None;
        }

        let new_name = if self.is_evidence(filename) {
            rename_evidence(filename)
        } else if self.is_fact_inquiry(filename) {
            rename_fact_inquiry(filename)
        } else if self.is_witness_record(filename) {
            rename_witness_record(filename)
        } else if self.is_transcript(filename) {
            rename_transcript(filename)
        } else if self.is_witness_questions(filename) {
            rename_witness_questions(filename)
        } else if self.is_appeal_brief(filename) {
            rename_appeal_brief(filename)
        } else if self.is_judgment(filename) {
            rename_judgment(filename)
        } else if filename.contains("판결선고조서") {
            rename_judgment_declaration(filename)
        } else if self.is_court_document(filename) {
            rename_court_document(filename)
        } else {
            None
        };

        new_name.filter(|n| n != filename)
    }

    fn is_evidence(&self, filename: &str) -> bool {
        self.patterns_for(EVIDENCE_PREFIX).iter().any(|p| {
            (p.raw.starts_with('갑') || p.raw.starts_with('을')) && p.regex.is_match(filename)
        })
    }

    fn is_fact_inquiry(&self, filename: &str) -> bool {
        let patterns = self.patterns_for(EVIDENCE_PREFIX);
        (filename.contains("사실조회 회신") || filename.contains("사실조회회신"))
            && patterns
                .iter()
                .any(|p| p.raw.contains("사실조회 회신") || p.raw.contains("사실조회회신"))
    }

    fn is_witness_record(&self, filename: &str) -> bool {
        filename.contains("증인신문조서")
            && self
                .patterns_for(EVIDENCE_PREFIX)
                .iter()
                .any(|p| p.raw.contains("증인신문조서"))
    }

    fn is_transcript(&self, filename: &str) -> bool {
        filename.contains("녹취서")
            && self
                .patterns_for(EVIDENCE_PREFIX)
                .iter()
                .any(|p| p.raw.contains("녹취서"))
    }

    fn is_witness_questions(&self, filename: &str) -> bool {
        (filename.contains("증인 신문사항") || filename.contains("신문사항"))
            && self
                .patterns_for(EVIDENCE_PREFIX)
                .iter()
                .any(|p| p.raw.contains("신문사항"))
    }

    fn is_appeal_brief(&self, filename: &str) -> bool {
        filename.contains("항소이유서")
            && self
                .patterns_for(SUBMISSION_PREFIX)
                .iter()
                .any(|p| p.raw.contains("항소이유서"))
    }

    fn is_judgment(&self, filename: &str) -> bool {
        filename.contains("판결문")
            && self
                .patterns_for(JUDGMENT_PREFIX)
                .iter()
                .any(|p| p.raw.contains("판결문"))
    }

    fn is_court_document(&self, filename: &str) -> bool {
        let matches_submission = self
            .patterns_for(SUBMISSION_PREFIX)
            .iter()
            .any(|p| filename.contains(p.raw.as_str()))
            && !filename.contains("첨부")
            && !filename.contains("서증");
        matches_submission || filename.contains("판결선고조서")
    }

    /// Second-pass rename: classify under a numbered prefix. Files already
    /// carrying a known prefix are re-classified from the bare name.
    pub fn apply_prefix(&self, filename: &str) -> String {
        // strip any prefix this pass could have produced, including the
        // fallback prefix when the rule tables omit it
        let mut bare = filename.to_string();
        if let Some((prefix, rest)) = split_numbered_prefix(filename) {
            if KNOWN_PREFIXES.contains(&prefix) || self.rules.iter().any(|r| r.prefix == prefix) {
                bare = rest.to_string();
            }
        }

        let (stem, _) = split_ext(&bare);

        // Fixed-priority categories come before the configured tables.
        if stem.contains("판결선고조서") {
            return format!("{}{}", SUBMISSION_PREFIX, bare);
        }
        if stem.contains("판결문") {
            return format!("{}{}", JUDGMENT_PREFIX, bare);
        }
        if stem.contains("항소이유서") {
            return format!("{}{}", SUBMISSION_PREFIX, bare);
        }
        if stem.contains("사실조회 회신") || stem.contains("사실조회회신") {
            return format!("{}{}", EVIDENCE_PREFIX, bare);
        }

        for rule in &self.rules {
            for pattern in &rule.patterns {
                if pattern.regex.is_match(stem) {
                    return format!("{}{}", rule.prefix, bare);
                }
            }
        }

        format!("{}{}", BASIC_INFO_PREFIX, bare)
    }
}

/// `name.ext` -> (`name`, `.ext`)
fn split_ext(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => filename.split_at(idx),
        _ => (filename, ""),
    }
}

fn file_date(filename: &str) -> Option<&str> {
    FILE_DATE
        .captures(filename)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

pub fn has_numbered_prefix(filename: &str) -> bool {
    NUMBERED_PREFIX.is_match(filename)
}

/// `9_판결_foo.pdf` -> (`9_판결_`, `foo.pdf`)
pub fn split_numbered_prefix(filename: &str) -> Option<(&str, &str)> {
    let m = NUMBERED_PREFIX.find(filename)?;
    Some((m.as_str(), &filename[m.end()..]))
}

fn rename_evidence(filename: &str) -> Option<String> {
    let caps = EVIDENCE_NO.captures(filename)?;
    let number = match caps.get(3) {
        Some(sub) => format!("({}{}-{})", &caps[1], &caps[2], sub.as_str()),
        None => format!("({}{})", &caps[1], &caps[2]),
    };

    let (stem, ext) = split_ext(filename);

    // description: text after the 갑/을 number, then a parenthesized hint,
    // then the first non-party underscore segment
    let mut desc = EVIDENCE_DESC
        .captures(stem)
        .map(|c| c[1].to_string())
        .unwrap_or_default();

    if desc.is_empty() {
        for caps in PAREN_CONTENT.captures_iter(stem) {
            let inner = &caps[1];
            if !EVIDENCE_REF.is_match(inner) && !inner.starts_with("녹음파일") {
                desc = inner.to_string();
                break;
            }
        }
    }

    if desc.is_empty() {
        for part in stem.split('_') {
            if !EVIDENCE_REF.is_match(part) && !matches!(part, "서증" | "원고" | "피고" | "대리인")
            {
                desc = part.to_string();
                break;
            }
        }
    }

    if desc.is_empty() {
        return Some(format!("{}{}", number, ext));
    }

    let cleaned = NON_NAME_CHARS.replace_all(&desc, "");
    let joined = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    let collapsed = collapse_adjacent_repeat(&joined);
    let deduped = dedup_underscore_words(&collapsed);

    Some(format!("{}_{}{}", number, deduped, ext))
}

fn rename_fact_inquiry(filename: &str) -> Option<String> {
    let date = file_date(filename)?;
    let (_, ext) = split_ext(filename);

    let mut name = format!("{}.자_사실조회회신서_기타", date);
    if let Some(caps) = INQUIRY_ORG.captures(split_ext(filename).0) {
        name.push('_');
        name.push_str(&caps[1]);
    }
    name.push_str(ext);
    Some(name)
}

fn rename_witness_record(filename: &str) -> Option<String> {
    let date = file_date(filename)?;
    let (_, ext) = split_ext(filename);

    if filename.contains("법정녹음") || ext.eq_ignore_ascii_case(".mp3") {
        Some(format!("{}.자_증인신문조서_법정녹음{}", date, ext))
    } else {
        Some(format!("{}.자_증인신문조서{}", date, ext))
    }
}

fn rename_transcript(filename: &str) -> Option<String> {
    let date = file_date(filename)?;
    let (stem, ext) = split_ext(filename);

    let subject = if let Some(caps) = TRANSCRIPT_SUBJECT.captures(stem) {
        format!("(증인{})", &caps[1])
    } else if let Some(caps) = PAREN_CONTENT.captures(stem) {
        format!("({})", &caps[1])
    } else {
        String::new()
    };

    Some(format!("{}.자_녹취서요지{}{}", date, subject, ext))
}

fn rename_witness_questions(filename: &str) -> Option<String> {
    let date = file_date(filename)?;
    let (stem, ext) = split_ext(filename);

    let witness = WITNESS_NAME
        .captures(stem)
        .map(|c| format!("({})", &c[1]))
        .unwrap_or_default();

    let mut name = format!("{}.자_증인신문사항{}", date, witness);
    if let Some(party) = party_of(filename) {
        name.push('_');
        name.push_str(party);
    }
    name.push_str(ext);
    Some(name)
}

fn rename_appeal_brief(filename: &str) -> Option<String> {
    let date = file_date(filename)?;
    let (_, ext) = split_ext(filename);

    let mut name = format!("{}.자_항소이유서", date);
    if let Some(party) = party_of(filename) {
        name.push('_');
        name.push_str(party);
    }
    name.push_str(ext);
    Some(name)
}

fn rename_judgment(filename: &str) -> Option<String> {
    let date = file_date(filename)?;
    let (stem, ext) = split_ext(filename);

    let mut name = format!("{}.자_판결문", date);
    if stem.contains("판사") {
        match JUDGE_NAME.captures(stem) {
            Some(caps) => name.push_str(&format!("_판사_{}", &caps[1])),
            None => name.push_str("_판사"),
        }
    }
    name.push_str(ext);
    Some(name)
}

fn rename_judgment_declaration(filename: &str) -> Option<String> {
    let date = file_date(filename)?;
    let (_, ext) = split_ext(filename);
    Some(format!("{}.자_판결선고조서{}", date, ext))
}

fn rename_court_document(filename: &str) -> Option<String> {
    if filename.contains("첨부") || filename.contains("서증") {
        return None;
    }
    let date = file_date(filename)?;
    let (stem, ext) = split_ext(filename);

    const DOC_TYPES: &[&str] = &[
        "항소장",
        "소장",
        "답변서",
        "준비서면",
        "신청서",
        "변론조서",
        "기일변경신청서",
    ];

    // 항소장 outranks 소장, which it contains as a substring
    let mut doc_type = if stem.contains("항소장") {
        "항소장".to_string()
    } else {
        DOC_TYPES
            .iter()
            .find(|dt| stem.contains(*dt))
            .map(|dt| dt.to_string())
            .unwrap_or_default()
    };

    let mut additional = String::new();
    if stem.contains("변론조서") {
        if let Some(caps) = HEARING_ROUND.captures(stem) {
            additional = format!("({}회)", &caps[1]);
        }
    }

    if stem.contains("신청서") {
        if stem.contains("청구취지변경") {
            doc_type = "청구취지변경 신청서".to_string();
        } else if stem.contains("청구원인변경") {
            doc_type = "청구원인변경 신청서".to_string();
        } else if let Some(caps) = APPLICATION.captures(stem) {
            doc_type = caps[1].to_string();
            if let Some(detail) = caps.get(2) {
                additional = format!("({})", detail.as_str());
            }
        }
    }

    let mut name = format!("{}.자_{}{}", date, doc_type, additional);
    if let Some(party) = party_of(filename) {
        name.push('_');
        name.push_str(party);
    }
    name.push_str(ext);
    Some(name)
}

fn party_of(filename: &str) -> Option<&'static str> {
    if filename.contains("원고") {
        Some("원고")
    } else if filename.contains("피고") {
        Some("피고")
    } else {
        None
    }
}

/// Strip phrases the download portal doubles up, e.g.
/// `입출금거래내역조회)(입출금거래내역조회` and repeated underscore words.
pub fn remove_duplicate_phrases(filename: &str) -> String {
    let (stem, ext) = split_ext(filename);

    let mut name = collapse_adjacent_repeat(stem);
    while let Some(m) = DANGLING_PAREN_RUN.find(&name) {
        let range = m.range();
        name.replace_range(range, "");
    }
    let name = dedup_underscore_words(&name);

    format!("{}{}", name, ext)
}

/// Collapse `X)(X` where the phrase before the `)(` repeats after it.
fn collapse_adjacent_repeat(name: &str) -> String {
    let mut out = name.to_string();
    let mut search_from = 0;
    while let Some(rel) = out[search_from..].find(")(") {
        let idx = search_from + rel;
        let before = &out[..idx];
        let after = &out[idx + 2..];

        let mut repeat_len = None;
        for (start, _) in before.char_indices() {
            let phrase = &before[start..];
            if after.starts_with(phrase) {
                repeat_len = Some(phrase.len());
                break;
            }
        }

        match repeat_len {
            Some(len) => {
                out.replace_range(idx..idx + 2 + len, "");
                search_from = 0;
            }
            None => search_from = idx + 2,
        }
    }
    out
}

fn dedup_underscore_words(name: &str) -> String {
    let mut unique: Vec<&str> = Vec::new();
    for word in name.split('_') {
        if !unique.contains(&word) {
            unique.push(word);
        }
    }
    unique.join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn rules() -> FileNamingRules {
        let mut prefix_patterns = BTreeMap::new();
        prefix_patterns.insert(
            EVIDENCE_PREFIX.to_string(),
            vec![
                "갑\\d+".to_string(),
                "을\\d+".to_string(),
                "사실조회회신".to_string(),
                "증인신문조서".to_string(),
                "녹취서".to_string(),
                "신문사항".to_string(),
            ],
        );
        prefix_patterns.insert(
            SUBMISSION_PREFIX.to_string(),
            vec![
                "소장".to_string(),
                "답변서".to_string(),
                "준비서면".to_string(),
                "항소이유서".to_string(),
                "변론조서".to_string(),
            ],
        );
        prefix_patterns.insert(JUDGMENT_PREFIX.to_string(), vec!["판결문".to_string()]);
        FileNamingRules { prefix_patterns }
    }

    fn renamer() -> Renamer {
        Renamer::new(&rules()).unwrap()
    }

    #[test]
    fn evidence_file_gets_numbered_form() {
        let r = renamer();
        assert_eq!(
            r.standardize("2023가단5243_2023.05.01_서증_갑1_등기사항전부증명서.pdf"),
            Some("(갑1)_등기사항전부증명서.pdf".to_string())
        );
        assert_eq!(
            r.standardize("2023가단5243_2023.05.01_서증_갑8-1_거래내역.pdf"),
            Some("(갑8-1)_거래내역.pdf".to_string())
        );
    }

    #[test]
    fn judgment_file_renamed_by_date() {
        let r = renamer();
        assert_eq!(
            r.standardize("2023가단5243_2024.01.15_판결문_판사_홍길동.pdf"),
            Some("2024.01.15.자_판결문_판사_홍길동.pdf".to_string())
        );
    }

    #[test]
    fn court_document_keeps_party() {
        let r = renamer();
        assert_eq!(
            r.standardize("2023가단5243_2023.10.13_답변서_피고.pdf"),
            Some("2023.10.13.자_답변서_피고.pdf".to_string())
        );
    }

    #[test]
    fn witness_record_with_recording() {
        let r = renamer();
        assert_eq!(
            r.standardize("2023가단5243_2023.09.01_증인신문조서_법정녹음.mp3"),
            Some("2023.09.01.자_증인신문조서_법정녹음.mp3".to_string())
        );
    }

    #[test]
    fn fact_inquiry_includes_organization() {
        let r = renamer();
        assert_eq!(
            r.standardize("2023가단5243_2023.08.20_사실조회회신_기타_국민은행_회신.pdf"),
            Some("2023.08.20.자_사실조회회신서_기타_국민은행.pdf".to_string())
        );
    }

    #[test]
    fn unparsed_filename_is_left_alone() {
        let r = renamer();
        assert_eq!(r.standardize("메모.txt"), None);
        assert_eq!(r.standardize("random_file.pdf"), None);
    }

    #[test]
    fn prefix_applied_from_rule_tables() {
        let r = renamer();
        assert_eq!(
            r.apply_prefix("2023.10.13.자_답변서_피고.pdf"),
            "8_제출서면_2023.10.13.자_답변서_피고.pdf"
        );
        assert_eq!(
            r.apply_prefix("(갑1)_등기사항전부증명서.pdf"),
            "7_제출증거_(갑1)_등기사항전부증명서.pdf"
        );
    }

    #[test]
    fn judgment_prefix_overrides_tables() {
        let r = renamer();
        assert_eq!(
            r.apply_prefix("2024.01.15.자_판결문_판사_홍길동.pdf"),
            "9_판결_2024.01.15.자_판결문_판사_홍길동.pdf"
        );
        assert_eq!(
            r.apply_prefix("2024.01.15.자_판결선고조서.pdf"),
            "8_제출서면_2024.01.15.자_판결선고조서.pdf"
        );
    }

    #[test]
    fn unmatched_name_falls_back_to_basic_info() {
        let r = renamer();
        assert_eq!(r.apply_prefix("위임장.pdf"), "1_기본정보_위임장.pdf");
    }

    #[test]
    fn existing_prefix_is_reclassified() {
        let r = renamer();
        assert_eq!(
            r.apply_prefix("1_기본정보_2024.01.15.자_판결문.pdf"),
            "9_판결_2024.01.15.자_판결문.pdf"
        );
    }

    // the fallback prefix is stripped even when no rule table defines it
    #[test]
    fn fallback_prefix_round_trips() {
        let r = renamer();
        assert_eq!(
            r.apply_prefix("1_기본정보_위임장.pdf"),
            "1_기본정보_위임장.pdf"
        );
    }

    #[test]
    fn duplicate_phrases_are_collapsed() {
        assert_eq!(
            remove_duplicate_phrases("입출금거래내역조회)(입출금거래내역조회.pdf"),
            "입출금거래내역조회.pdf"
        );
        assert_eq!(
            remove_duplicate_phrases("7_제출증거_내역_내역.pdf"),
            "7_제출증거_내역.pdf"
        );
    }

    #[test]
    fn numbered_prefix_split() {
        assert!(has_numbered_prefix("9_판결_foo.pdf"));
        assert!(!has_numbered_prefix("foo.pdf"));
        assert_eq!(
            split_numbered_prefix("9_판결_foo.pdf"),
            Some(("9_판결_", "foo.pdf"))
        );
    }
}
