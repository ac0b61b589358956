//! Reference extraction and normalization for assistant replies.
//!
//! An assistant reply arrives as freeform text (optionally ending in a
//! "References:" block) plus a structured evidence array. This module turns
//! that into a deduplicated, sequentially numbered reference list wired to
//! inline `[n]` citation markers:
//!
//! - `scan_citations`: collect distinct inline citation numbers
//! - `parse_reference_block` / `remove_references_section`: trailing block
//! - `evidence_references`: fallback list derived from the evidence array
//! - `assemble_references`: pick one source and renumber
//! - `split_paragraphs` / `strip_markdown`: display-text normalization
//!
//! Everything here is pure and total: malformed input yields empty or
//! default structures, never an error.

use crate::models::{CitationParts, DisplayReference, EvidenceItem, ParsedReference};
use regex::Regex;

#[cfg(test)]
#[path = "references_test.rs"]
mod references_test;

/// Sentinel URL for references that have nothing to link to.
pub const NO_LINK: &str = "#";

// ============================================================================
// Citation Scanning
// ============================================================================

/// Collect the distinct citation numbers referenced by `[n]` markers in
/// `text`, in order of first appearance. The text itself is left untouched;
/// markers stay inline and the renderer appends superscript links.
pub fn scan_citations(text: &str) -> Vec<String> {
    let marker = Regex::new(r"\[(\d+)\]").unwrap();
    let mut citations: Vec<String> = Vec::new();
    for caps in marker.captures_iter(text) {
        let number = caps[1].to_string();
        if !citations.contains(&number) {
            citations.push(number);
        }
    }
    citations
}

// ============================================================================
// Reference Block Parsing
// ============================================================================

/// Find the trailing "References:" section, if any. Case-insensitive,
/// anchored to the end of the text.
fn reference_block(text: &str) -> Option<String> {
    let block = Regex::new(r"(?is)references?:\s*\n(.+)$").unwrap();
    block
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse the trailing "References:" block of a reply into numbered entries.
/// Lines must look like `[n] citation text`; anything else is skipped.
/// No block, or a block with no parsable lines, yields an empty list.
pub fn parse_reference_block(text: &str) -> Vec<ParsedReference> {
    let section = match reference_block(text) {
        Some(s) => s,
        None => return Vec::new(),
    };

    let entry = Regex::new(r"^\[(\d+)\]\s*(.+)$").unwrap();
    let mut references = Vec::new();

    for line in section.lines() {
        if let Some(caps) = entry.captures(line) {
            let number: u32 = match caps[1].parse() {
                Ok(n) => n,
                Err(_) => continue,
            };
            let citation = caps[2].trim().to_string();
            let parts = HeuristicDecomposer.decompose(&citation);
            references.push(ParsedReference {
                number,
                citation,
                parts,
            });
        }
    }

    references
}

/// Strip the trailing "References:" block from a reply so it isn't rendered
/// twice (the assembled list replaces it).
pub fn remove_references_section(text: &str) -> String {
    let block = Regex::new(r"(?is)\n*references?:\s*\n.+$").unwrap();
    block.replace(text, "").trim().to_string()
}

// ============================================================================
// Citation Decomposition
// ============================================================================

/// Splits a freeform citation string into structured sub-fields. Callers go
/// through this trait so the pattern heuristic below can be swapped for a
/// real bibliographic parser without touching the pipeline.
pub trait DecomposeCitation {
    fn decompose(&self, citation: &str) -> CitationParts;
}

/// Pattern-based decomposition: URL by `http(s)://` token, year by
/// 19xx/20xx token, authors/title/journal by sentence-boundary splitting.
/// Best effort only; atypical citation styles will misfire and that is
/// accepted behavior.
pub struct HeuristicDecomposer;

impl DecomposeCitation for HeuristicDecomposer {
    fn decompose(&self, citation: &str) -> CitationParts {
        let mut parts = CitationParts::default();

        // URL: first http(s):// token, minus trailing punctuation
        let url = Regex::new(r"https?://\S+").unwrap();
        let mut rest = citation.to_string();
        if let Some(m) = url.find(citation) {
            let link = m
                .as_str()
                .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ')'))
                .to_string();
            parts.url = Some(link);
            rest = format!("{}{}", &citation[..m.start()], &citation[m.end()..]);
        }

        // Year: first four-digit 19xx/20xx token, removed from the text so
        // it doesn't pollute the title/journal segments
        let year = Regex::new(r"\b((?:19|20)\d{2})\b").unwrap();
        if let Some(m) = year.find(&rest) {
            parts.year = Some(m.as_str().to_string());
            rest = format!("{}{}", &rest[..m.start()], &rest[m.end()..]);
        }

        // Authors / title / journal from sentence segments
        let segments = split_citation_segments(&rest);
        let mut fields = [
            &mut parts.authors,
            &mut parts.title,
            &mut parts.journal,
        ]
        .into_iter();
        for segment in segments {
            match fields.next() {
                Some(field) => *field = Some(segment),
                None => break,
            }
        }
        drop(fields);

        parts
    }
}

/// Split a citation on ". " boundaries where the next character is
/// uppercase, dropping segments that are only a year or punctuation.
fn split_citation_segments(text: &str) -> Vec<String> {
    let boundary = Regex::new(r"\.\s+[A-Z]").unwrap();
    let year_only = Regex::new(r"^(?:19|20)\d{2}$").unwrap();

    let mut raw = Vec::new();
    let mut start = 0;
    for m in boundary.find_iter(text) {
        raw.push(&text[start..m.start()]);
        // keep the uppercase letter, drop the period
        start = m.start() + 1;
    }
    raw.push(&text[start..]);

    raw.into_iter()
        .map(|s| {
            s.trim_matches(|c: char| c.is_whitespace() || c == '.' || c == ',')
                .to_string()
        })
        .filter(|s| !s.is_empty() && !year_only.is_match(s))
        .collect()
}

// ============================================================================
// Evidence Mapping
// ============================================================================

/// Convert the backend's evidence array into display references. Each
/// evidence item contributes one entry per source reference, or a single
/// entry summarizing the item itself when it has none. Numbering is a
/// running counter across the whole array.
pub fn evidence_references(evidence: &[EvidenceItem]) -> Vec<DisplayReference> {
    let mut refs = Vec::new();
    let mut number = 1usize;

    for item in evidence {
        if !item.references.is_empty() {
            for source in &item.references {
                let title = if source.title.is_empty() {
                    source.url.clone()
                } else {
                    source.title.clone()
                };
                let url = if source.url.is_empty() {
                    NO_LINK.to_string()
                } else {
                    source.url.clone()
                };
                refs.push(DisplayReference {
                    number,
                    title,
                    url,
                    excerpt: source.excerpt.clone(),
                    authors: source.authors.clone(),
                    journal: source.journal.clone(),
                    year: source.year.clone(),
                    citation: source.citation.clone(),
                    unverified: source.unverified.unwrap_or(false),
                });
                number += 1;
            }
        } else {
            let title = item
                .title
                .clone()
                .filter(|t| !t.is_empty())
                .or_else(|| {
                    if item.drug_name.is_empty() {
                        None
                    } else {
                        Some(item.drug_name.clone())
                    }
                })
                .unwrap_or_else(|| "Evidence".to_string());
            let excerpt = if item.summary.is_empty() {
                None
            } else {
                Some(item.summary.clone())
            };
            refs.push(DisplayReference {
                number,
                title,
                url: NO_LINK.to_string(),
                excerpt,
                authors: None,
                journal: None,
                year: None,
                citation: None,
                unverified: false,
            });
            number += 1;
        }
    }

    refs
}

// ============================================================================
// Reference List Assembly
// ============================================================================

/// Choose the reference list to render. Text-derived references win
/// outright when present; evidence-derived references are the fallback.
/// The two are never merged. Display numbers are reassigned sequentially
/// from 1 regardless of the numbering in the source.
pub fn assemble_references(
    parsed: &[ParsedReference],
    evidence: &[EvidenceItem],
) -> Vec<DisplayReference> {
    if parsed.is_empty() {
        return evidence_references(evidence);
    }

    parsed
        .iter()
        .enumerate()
        .map(|(i, reference)| DisplayReference {
            number: i + 1,
            title: reference
                .parts
                .title
                .clone()
                .unwrap_or_else(|| reference.citation.clone()),
            url: reference
                .parts
                .url
                .clone()
                .unwrap_or_else(|| NO_LINK.to_string()),
            excerpt: None,
            authors: reference.parts.authors.clone(),
            journal: reference.parts.journal.clone(),
            year: reference.parts.year.clone(),
            citation: Some(reference.citation.clone()),
            unverified: false,
        })
        .collect()
}

// ============================================================================
// Paragraph Normalization
// ============================================================================

/// Split text into paragraphs at blank lines, collapsing intra-paragraph
/// line breaks to spaces. Blank paragraphs are dropped. Idempotent.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let blank_lines = Regex::new(r"\n{2,}").unwrap();
    blank_lines
        .split(text)
        .map(|p| p.replace('\n', " ").trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Cosmetic markdown removal for the clean-text rendering mode: heading
/// markers, `[text](url)` links, emphasis characters, and runs of spaces.
/// Malformed markdown passes through best-effort; nothing is validated.
pub fn strip_markdown(text: &str) -> String {
    // [ \t] only: \s would swallow the blank lines that delimit paragraphs
    let headings = Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]*").unwrap();
    let stripped = headings.replace_all(text, "");

    let links = Regex::new(r"\[([^\]]*)\]\(([^)]*)\)").unwrap();
    let stripped = links.replace_all(&stripped, "$1");

    let stripped = stripped
        .replace('*', "")
        .replace('_', "")
        .replace('`', "");

    let spaces = Regex::new(r"[ \t]{2,}").unwrap();
    spaces.replace_all(&stripped, " ").trim().to_string()
}
