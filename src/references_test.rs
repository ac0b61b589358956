//! Tests for the reference extraction pipeline.
//!
//! All inputs are inline strings shaped like real assistant replies, so the
//! tests are deterministic and need no backend.

use super::*;
use crate::models::{EvidenceItem, SourceReference};

// ============================================================================
// Helpers
// ============================================================================

fn evidence_item(drug: &str, summary: &str, refs: Vec<SourceReference>) -> EvidenceItem {
    EvidenceItem {
        id: 1,
        drug_name: drug.to_string(),
        title: None,
        summary: summary.to_string(),
        evidence_quality: None,
        references: refs,
    }
}

fn source_ref(title: &str, url: &str) -> SourceReference {
    SourceReference {
        id: 1,
        title: title.to_string(),
        url: url.to_string(),
        ..Default::default()
    }
}

// ============================================================================
// Citation Scanning
// ============================================================================

#[test]
fn test_scan_citations_first_appearance_order() {
    let citations = scan_citations("See [2] and [1] and [2] again");
    assert_eq!(citations, vec!["2".to_string(), "1".to_string()]);
}

#[test]
fn test_scan_citations_no_markers() {
    assert!(scan_citations("No citations here.").is_empty());
    assert!(scan_citations("").is_empty());
}

#[test]
fn test_scan_citations_ignores_non_numeric_brackets() {
    let citations = scan_citations("See [note] and [3] but not [a1]");
    assert_eq!(citations, vec!["3".to_string()]);
}

#[test]
fn test_scan_citations_multi_digit() {
    let citations = scan_citations("Large lists happen [10] [2] [10]");
    assert_eq!(citations, vec!["10".to_string(), "2".to_string()]);
}

// ============================================================================
// Reference Block Parsing
// ============================================================================

#[test]
fn test_parse_reference_block_basic() {
    let text = "Body text [1].\n\nReferences:\n[1] First source.\n[2] Second source.";
    let refs = parse_reference_block(text);
    assert_eq!(refs.len(), 2);
    assert_eq!(refs[0].number, 1);
    assert_eq!(refs[0].citation, "First source.");
    assert_eq!(refs[1].number, 2);
    assert_eq!(refs[1].citation, "Second source.");
}

#[test]
fn test_parse_reference_block_absent() {
    assert!(parse_reference_block("Just a plain answer.").is_empty());
}

#[test]
fn test_parse_reference_block_case_insensitive() {
    let text = "Answer.\n\nreferences:\n[1] Lowercase heading still counts.";
    assert_eq!(parse_reference_block(text).len(), 1);

    let text = "Answer.\n\nReference:\n[1] Singular heading too.";
    assert_eq!(parse_reference_block(text).len(), 1);
}

#[test]
fn test_parse_reference_block_skips_malformed_lines() {
    let text = "Answer.\n\nReferences:\n[1] Good entry.\nnot a reference line\n[2] Another good one.";
    let refs = parse_reference_block(text);
    assert_eq!(refs.len(), 2);
    assert_eq!(refs[1].number, 2);
}

#[test]
fn test_remove_references_section() {
    let text = "Drug X is safe [1].\n\nReferences:\n[1] foo\n[2] bar";
    assert_eq!(remove_references_section(text), "Drug X is safe [1].");
}

#[test]
fn test_remove_references_section_noop_without_block() {
    let text = "No references in this answer.";
    assert_eq!(remove_references_section(text), text);
}

#[test]
fn test_reference_block_round_trip() {
    // Body + detected block reconstruct the original modulo whitespace.
    let body = "Drug X is safe [1].";
    let block = "References:\n[1] foo\n[2] bar";
    let text = format!("{}\n\n{}", body, block);

    assert_eq!(remove_references_section(&text), body);
    let refs = parse_reference_block(&text);
    assert_eq!(refs.len(), 2);
    assert_eq!(refs[0].citation, "foo");
    assert_eq!(refs[1].citation, "bar");
}

// ============================================================================
// Citation Decomposition
// ============================================================================

#[test]
fn test_decompose_extracts_url_and_year() {
    let parts =
        HeuristicDecomposer.decompose("Smith et al. Journal Y. 2020. http://example.com/a");
    assert_eq!(parts.url.as_deref(), Some("http://example.com/a"));
    assert_eq!(parts.year.as_deref(), Some("2020"));
    assert_eq!(parts.authors.as_deref(), Some("Smith et al"));
}

#[test]
fn test_decompose_https_and_trailing_punctuation() {
    let parts = HeuristicDecomposer.decompose("FDA Drug Label. 2024. https://fda.gov/label.");
    assert_eq!(parts.url.as_deref(), Some("https://fda.gov/label"));
    assert_eq!(parts.year.as_deref(), Some("2024"));
}

#[test]
fn test_decompose_author_title_journal_split() {
    let parts = HeuristicDecomposer
        .decompose("Jones K, Lee P. Hepatotoxicity of acetaminophen. Clinical Toxicology. 2019.");
    assert_eq!(parts.authors.as_deref(), Some("Jones K, Lee P"));
    assert_eq!(parts.title.as_deref(), Some("Hepatotoxicity of acetaminophen"));
    assert_eq!(parts.journal.as_deref(), Some("Clinical Toxicology"));
    assert_eq!(parts.year.as_deref(), Some("2019"));
    assert!(parts.url.is_none());
}

#[test]
fn test_decompose_plain_text_is_total() {
    // No structure at all: nothing extracted, nothing panics.
    let parts = HeuristicDecomposer.decompose("an unstructured scrap of text");
    assert!(parts.url.is_none());
    assert!(parts.year.is_none());
    assert!(parts.title.is_none());
}

// ============================================================================
// Evidence Mapping
// ============================================================================

#[test]
fn test_evidence_without_sources_summarizes_item() {
    let evidence = vec![evidence_item("Aspirin", "Inhibits platelet aggregation.", vec![])];
    let refs = evidence_references(&evidence);
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].number, 1);
    assert_eq!(refs[0].title, "Aspirin");
    assert_eq!(refs[0].url, NO_LINK);
    assert_eq!(refs[0].excerpt.as_deref(), Some("Inhibits platelet aggregation."));
}

#[test]
fn test_evidence_with_sources_one_entry_each() {
    let evidence = vec![evidence_item(
        "Warfarin",
        "summary",
        vec![source_ref("A", "http://x"), source_ref("B", "http://y")],
    )];
    let refs = evidence_references(&evidence);
    assert_eq!(refs.len(), 2);
    assert_eq!(refs[0].number, 1);
    assert_eq!(refs[0].title, "A");
    assert_eq!(refs[0].url, "http://x");
    assert_eq!(refs[1].number, 2);
    assert_eq!(refs[1].title, "B");
}

#[test]
fn test_evidence_title_falls_back_to_url() {
    let evidence = vec![evidence_item(
        "Ibuprofen",
        "summary",
        vec![source_ref("", "http://pubmed.gov/123")],
    )];
    let refs = evidence_references(&evidence);
    assert_eq!(refs[0].title, "http://pubmed.gov/123");
}

#[test]
fn test_evidence_fallback_title_chain() {
    // No title, no drug name: literal "Evidence"
    let evidence = vec![evidence_item("", "orphan summary", vec![])];
    let refs = evidence_references(&evidence);
    assert_eq!(refs[0].title, "Evidence");
    assert_eq!(refs[0].url, NO_LINK);
}

#[test]
fn test_evidence_unverified_flag_carries_through() {
    let mut source = source_ref("Case report", "http://z");
    source.unverified = Some(true);
    let evidence = vec![evidence_item("Phenytoin", "summary", vec![source])];
    let refs = evidence_references(&evidence);
    assert!(refs[0].unverified);
}

#[test]
fn test_evidence_running_counter_across_items() {
    let evidence = vec![
        evidence_item("DrugA", "a", vec![source_ref("A1", "http://a1")]),
        evidence_item("DrugB", "b", vec![]),
        evidence_item(
            "DrugC",
            "c",
            vec![source_ref("C1", "http://c1"), source_ref("C2", "http://c2")],
        ),
    ];
    let refs = evidence_references(&evidence);
    let numbers: Vec<usize> = refs.iter().map(|r| r.number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
    assert_eq!(refs[1].title, "DrugB");
    assert_eq!(refs[3].title, "C2");
}

// ============================================================================
// Reference List Assembly
// ============================================================================

#[test]
fn test_assemble_text_references_win_over_evidence() {
    let text = "Answer [1].\n\nReferences:\n[1] Text-derived source.";
    let parsed = parse_reference_block(text);
    let evidence = vec![evidence_item("Aspirin", "evidence summary", vec![])];

    let refs = assemble_references(&parsed, &evidence);
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].citation.as_deref(), Some("Text-derived source."));
    // Evidence-derived entries must not leak in.
    assert!(refs.iter().all(|r| r.title != "Aspirin"));
}

#[test]
fn test_assemble_falls_back_to_evidence() {
    let evidence = vec![evidence_item("Aspirin", "evidence summary", vec![])];
    let refs = assemble_references(&[], &evidence);
    assert_eq!(refs, evidence_references(&evidence));
}

#[test]
fn test_assemble_renumbers_sequentially() {
    // Original numbering [3], [7] is discarded in favor of 1..k.
    let text = "Answer.\n\nReferences:\n[3] Third source.\n[7] Seventh source.";
    let parsed = parse_reference_block(text);
    let refs = assemble_references(&parsed, &[]);
    assert_eq!(refs.len(), 2);
    assert_eq!(refs[0].number, 1);
    assert_eq!(refs[1].number, 2);
}

#[test]
fn test_assemble_empty_everything() {
    assert!(assemble_references(&[], &[]).is_empty());
}

// ============================================================================
// Paragraph Normalization
// ============================================================================

#[test]
fn test_split_paragraphs_basic() {
    let paragraphs = split_paragraphs("First line\ncontinues here.\n\nSecond paragraph.");
    assert_eq!(
        paragraphs,
        vec![
            "First line continues here.".to_string(),
            "Second paragraph.".to_string()
        ]
    );
}

#[test]
fn test_split_paragraphs_drops_blanks() {
    let paragraphs = split_paragraphs("One.\n\n\n\n   \n\nTwo.");
    assert_eq!(paragraphs, vec!["One.".to_string(), "Two.".to_string()]);
}

#[test]
fn test_split_paragraphs_idempotent() {
    let first = split_paragraphs("Alpha\nbeta.\n\nGamma.");
    let rejoined = first.join("\n\n");
    assert_eq!(split_paragraphs(&rejoined), first);
}

#[test]
fn test_strip_markdown_headings_links_emphasis() {
    let text = "## Heading\nSee [the label](https://fda.gov) for *bold* and _italic_ and `code`.";
    let clean = strip_markdown(text);
    assert!(!clean.contains('#'));
    assert!(clean.contains("the label"));
    assert!(!clean.contains("https://fda.gov"));
    assert!(!clean.contains('*'));
    assert!(!clean.contains('`'));
}

#[test]
fn test_strip_markdown_idempotent() {
    let once = strip_markdown("# Title\nSome **emphasis** here.");
    assert_eq!(strip_markdown(&once), once);
}

#[test]
fn test_strip_markdown_preserves_citation_markers() {
    let clean = strip_markdown("Dose-dependent toxicity [1] is documented.");
    assert!(clean.contains("[1]"));
}

// ============================================================================
// End-to-End Scenario
// ============================================================================

#[test]
fn test_end_to_end_reply_pipeline() {
    let content =
        "Drug X is safe [1].\n\nReferences:\n[1] Smith et al. Journal Y. 2020. http://example.com/a";

    let body = remove_references_section(content);
    let paragraphs = split_paragraphs(&body);
    assert_eq!(paragraphs, vec!["Drug X is safe [1].".to_string()]);

    let citations = scan_citations(&paragraphs[0]);
    assert_eq!(citations, vec!["1".to_string()]);

    let parsed = parse_reference_block(content);
    assert_eq!(parsed.len(), 1);
    assert_eq!(
        parsed[0].citation,
        "Smith et al. Journal Y. 2020. http://example.com/a"
    );

    let refs = assemble_references(&parsed, &[]);
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].number, 1);
    assert_eq!(refs[0].url, "http://example.com/a");
    assert_eq!(refs[0].year.as_deref(), Some("2020"));
    assert_eq!(
        refs[0].citation.as_deref(),
        Some("Smith et al. Journal Y. 2020. http://example.com/a")
    );
}

#[test]
fn test_dangling_citation_marker_is_tolerated() {
    // Marker [2] has no matching reference; the pipeline neither validates
    // nor repairs, it just renders what it has.
    let content = "Unsupported claim [2].";
    let citations = scan_citations(content);
    assert_eq!(citations, vec!["2".to_string()]);
    assert!(assemble_references(&parse_reference_block(content), &[]).is_empty());
}
