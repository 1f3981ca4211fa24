/// Evidence extraction.
///
/// Finds candidate phrases in page text and returns short, sentence-shaped
/// context snippets. Phrases are searched in priority order, case-insensitively,
/// with any whitespace run in a phrase matching any whitespace run in the text.
///
/// Every snippet is non-empty, at most `MAX_SNIPPET_CHARS` chars, and (after
/// stripping a leading/trailing `…`) a verbatim substring of the searched text
/// once whitespace is collapsed.
use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use tracing::warn;

pub const MAX_SNIPPET_CHARS: usize = 220;
pub const DEFAULT_MAX_SNIPPETS: usize = 3;

const ELLIPSIS: char = '…';
/// Context kept on each side of a hit when no sentence boundary is in reach.
const FALLBACK_CONTEXT_CHARS: usize = 80;
/// How far to look for a sentence boundary before giving up.
const SENTENCE_SCAN_CHARS: usize = 400;
const MAX_HITS_PER_PHRASE: usize = 50;

/// Extract up to `limit` snippets for `phrases`.
///
/// `raw_text` is searched so original casing survives; `normalized_text` is
/// only used when the raw text is empty.
pub fn extract_evidence<S: AsRef<str>>(
    normalized_text: &str,
    raw_text: &str,
    phrases: &[S],
    limit: usize,
) -> Vec<String> {
    extract_evidence_where(normalized_text, raw_text, phrases, limit, |_, _| true)
}

/// Same as `extract_evidence`, skipping hits for which `keep(source, offset)`
/// is false.
pub fn extract_evidence_where<S, F>(
    normalized_text: &str,
    raw_text: &str,
    phrases: &[S],
    limit: usize,
    keep: F,
) -> Vec<String>
where
    S: AsRef<str>,
    F: Fn(&str, usize) -> bool,
{
    let source = if raw_text.trim().is_empty() {
        normalized_text
    } else {
        raw_text
    };

    let mut snippets: Vec<String> = Vec::new();
    if limit == 0 || source.trim().is_empty() {
        return snippets;
    }

    let mut seen: HashSet<String> = HashSet::new();
    for phrase in phrases {
        let Some(pattern) = phrase_pattern(phrase.as_ref()) else {
            continue;
        };
        for hit in pattern.find_iter(source).take(MAX_HITS_PER_PHRASE) {
            if !keep(source, hit.start()) {
                continue;
            }
            let snippet = snippet_around(source, hit.start(), hit.end());
            if snippet.is_empty() {
                continue;
            }
            if seen.insert(snippet.to_lowercase()) {
                snippets.push(snippet);
                if snippets.len() >= limit {
                    return snippets;
                }
            }
        }
    }

    snippets
}

/// Collapse whitespace runs to single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn phrase_pattern(phrase: &str) -> Option<Regex> {
    let words: Vec<String> = phrase.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return None;
    }
    RegexBuilder::new(&words.join(r"\s+"))
        .case_insensitive(true)
        .build()
        .inspect_err(|e| warn!(phrase, error = %e, "evidence phrase did not compile"))
        .ok()
}

/// A `.` only ends a sentence when followed by whitespace or end of text, so
/// prices and abbreviations like "19.99" or "e.g" stay inside one sentence.
fn is_boundary(c: char, next: Option<char>) -> bool {
    match c {
        '!' | '?' | '\n' | '\r' => true,
        '.' => next.map_or(true, char::is_whitespace),
        _ => false,
    }
}

/// Byte offset where the sentence containing `pos` starts, and whether the
/// window was cut short of a real boundary.
fn sentence_start(text: &str, pos: usize) -> (usize, bool) {
    let mut next = text[pos..].chars().next();
    for (scanned, (idx, c)) in text[..pos].char_indices().rev().enumerate() {
        if scanned >= SENTENCE_SCAN_CHARS {
            return (back_chars(text, pos, FALLBACK_CONTEXT_CHARS), true);
        }
        if is_boundary(c, next) {
            return (idx + c.len_utf8(), false);
        }
        next = Some(c);
    }
    (0, false)
}

/// Byte offset just past the sentence containing `pos` (punctuation included).
fn sentence_end(text: &str, pos: usize) -> (usize, bool) {
    let mut chars = text[pos..].char_indices().peekable();
    let mut scanned = 0;
    while let Some((offset, c)) = chars.next() {
        if scanned >= SENTENCE_SCAN_CHARS {
            return (forward_chars(text, pos, FALLBACK_CONTEXT_CHARS), true);
        }
        let next = chars.peek().map(|&(_, n)| n);
        if is_boundary(c, next) {
            return (pos + offset + c.len_utf8(), false);
        }
        scanned += 1;
    }
    (text.len(), false)
}

fn back_chars(text: &str, pos: usize, n: usize) -> usize {
    if n == 0 {
        return pos;
    }
    text[..pos]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map_or(0, |(idx, _)| idx)
}

fn forward_chars(text: &str, pos: usize, n: usize) -> usize {
    text[pos..]
        .char_indices()
        .nth(n)
        .map_or(text.len(), |(offset, _)| pos + offset)
}

fn snippet_around(text: &str, start: usize, end: usize) -> String {
    let (lo, lo_cut) = sentence_start(text, start);
    let (hi, hi_cut) = sentence_end(text, end);

    let snippet = render(text, lo, hi, lo_cut, hi_cut, start, end);
    if snippet.chars().count() <= MAX_SNIPPET_CHARS {
        return snippet;
    }

    let body_budget = MAX_SNIPPET_CHARS - 2;
    let hit_chars = text[start..end].chars().count();
    if hit_chars >= body_budget {
        let hit = collapse_whitespace(&text[start..end]);
        let mut clipped: String = hit.chars().take(MAX_SNIPPET_CHARS - 1).collect();
        clipped.push(ELLIPSIS);
        return clipped;
    }

    // Narrow the sentence to a window centred on the hit.
    let remaining = body_budget - hit_chars;
    let avail_left = text[lo..start].chars().count();
    let avail_right = text[end..hi].chars().count();
    let mut left = remaining / 2;
    let mut right = remaining - left;
    if avail_left < left {
        right += left - avail_left;
        left = avail_left;
    } else if avail_right < right {
        left += right - avail_right;
        right = avail_right;
    }
    let left = left.min(avail_left);
    let right = right.min(avail_right);

    let new_lo = back_chars(text, start, left);
    let new_hi = forward_chars(text, end, right).min(hi);
    render(
        text,
        new_lo,
        new_hi,
        lo_cut || new_lo > lo,
        hi_cut || new_hi < hi,
        start,
        end,
    )
}

/// Render `text[lo..hi]` as a snippet. Cut edges are moved to the nearest
/// word boundary outside the hit and marked with an ellipsis.
fn render(
    text: &str,
    mut lo: usize,
    mut hi: usize,
    lo_cut: bool,
    hi_cut: bool,
    start: usize,
    end: usize,
) -> String {
    if lo_cut && lo > 0 {
        let starts_mid_word = text[..lo]
            .chars()
            .next_back()
            .is_some_and(|c| !c.is_whitespace());
        if starts_mid_word {
            if let Some(ws) = text[lo..start].find(char::is_whitespace) {
                lo += ws;
            }
        }
    }
    if hi_cut && hi < text.len() {
        let ends_mid_word = text[hi..].chars().next().is_some_and(|c| !c.is_whitespace());
        if ends_mid_word {
            if let Some(ws) = text[end..hi].rfind(char::is_whitespace) {
                hi = end + ws;
            }
        }
    }

    let body = collapse_whitespace(&text[lo..hi]);
    if body.is_empty() {
        return body;
    }

    let mut snippet = String::with_capacity(body.len() + 8);
    if lo_cut {
        snippet.push(ELLIPSIS);
    }
    snippet.push_str(&body);
    if hi_cut {
        snippet.push(ELLIPSIS);
    }
    snippet
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_verbatim(raw: &str, snippet: &str) {
        assert!(!snippet.is_empty());
        assert!(
            snippet.chars().count() <= MAX_SNIPPET_CHARS,
            "snippet too long: {} chars",
            snippet.chars().count()
        );
        let core = snippet.trim_matches(ELLIPSIS);
        assert!(
            collapse_whitespace(raw).contains(core),
            "not a substring of the raw text: {snippet:?}"
        );
    }

    #[test]
    fn expands_to_sentence_and_keeps_casing() {
        let raw = "Welcome to our store. All bookings are NON-REFUNDABLE once confirmed. Enjoy!";
        let snippets = extract_evidence("", raw, &["non-refundable"], 3);
        assert_eq!(snippets, vec!["All bookings are NON-REFUNDABLE once confirmed."]);
    }

    #[test]
    fn decimal_points_do_not_split_sentences() {
        let raw = "Your total is $19.99 and is final sale. Thanks.";
        let snippets = extract_evidence("", raw, &["final sale"], 3);
        assert_eq!(snippets, vec!["Your total is $19.99 and is final sale."]);
    }

    #[test]
    fn newline_is_a_boundary() {
        let raw = "Header line\nNo refunds after 24 hours\nFooter";
        let snippets = extract_evidence("", raw, &["no refunds"], 3);
        assert_eq!(snippets, vec!["No refunds after 24 hours"]);
    }

    #[test]
    fn phrase_whitespace_matches_any_run() {
        let raw = "Disputes go to binding \t  arbitration in Delaware.";
        let snippets = extract_evidence("", raw, &["binding arbitration"], 3);
        assert_eq!(snippets, vec!["Disputes go to binding arbitration in Delaware."]);
    }

    #[test]
    fn truncates_long_sentences_around_the_hit() {
        let filler = "lorem ipsum dolor sit amet ".repeat(8);
        let raw = format!("{filler}there is a mandatory resort fee per night {filler}.");
        assert!(raw.chars().count() > MAX_SNIPPET_CHARS);
        let snippets = extract_evidence("", &raw, &["resort fee"], 3);
        assert_eq!(snippets.len(), 1);
        let snippet = &snippets[0];
        assert!(snippet.starts_with(ELLIPSIS));
        assert!(snippet.ends_with(ELLIPSIS));
        assert!(snippet.contains("mandatory resort fee per night"));
        assert_verbatim(&raw, snippet);
        // word-boundary safe: no partial words at the cut edges
        let core = snippet.trim_matches(ELLIPSIS);
        for word in [core.split(' ').next().unwrap(), core.split(' ').last().unwrap()] {
            assert!(
                ["lorem", "ipsum", "dolor", "sit", "amet"].contains(&word),
                "cut mid-word: {word:?}"
            );
        }
    }

    #[test]
    fn falls_back_to_fixed_window_without_boundaries() {
        let filler = "x".repeat(600);
        let raw = format!("{filler} auto-renews monthly {filler}");
        let snippets = extract_evidence("", &raw, &["auto-renews"], 3);
        assert_eq!(snippets.len(), 1);
        assert!(snippets[0].contains("auto-renews monthly"));
        assert_verbatim(&raw, &snippets[0]);
    }

    #[test]
    fn deduplicates_case_insensitively_and_respects_limit() {
        let raw = "No refunds. NO REFUNDS. No refunds! Final sale. All sales are final.";
        let snippets = extract_evidence("", raw, &["no refunds", "final sale", "sales are final"], 2);
        assert_eq!(snippets, vec!["No refunds.", "No refunds!"]);

        let snippets = extract_evidence("", raw, &["no refunds", "final sale"], 10);
        assert_eq!(snippets, vec!["No refunds.", "No refunds!", "Final sale."]);
    }

    #[test]
    fn phrases_are_searched_in_priority_order() {
        let raw = "Cleaning fee applies. A resort fee is due at check-in.";
        let snippets = extract_evidence("", raw, &["resort fee", "cleaning fee"], 3);
        assert_eq!(
            snippets,
            vec!["A resort fee is due at check-in.", "Cleaning fee applies."]
        );
    }

    #[test]
    fn falls_back_to_normalized_text_when_raw_is_empty() {
        let snippets = extract_evidence("all sales are final.", "", &["sales are final"], 3);
        assert_eq!(snippets, vec!["all sales are final."]);
    }

    #[test]
    fn empty_inputs_yield_nothing() {
        assert!(extract_evidence("", "", &["anything"], 3).is_empty());
        assert!(extract_evidence("", "Some text.", &["", "   "], 3).is_empty());
        assert!(extract_evidence("", "Some text.", &["missing"], 3).is_empty());
        assert!(extract_evidence("", "Some text.", &["some"], 0).is_empty());
    }

    #[test]
    fn multibyte_text_is_handled() {
        let raw = "Prix en € — les réservations sont non remboursables… Merci ! Ünïcödé ist großartig.";
        let snippets = extract_evidence("", raw, &["non remboursables"], 3);
        assert_eq!(snippets.len(), 1);
        assert_verbatim(raw, &snippets[0]);
    }

    #[test]
    fn filtered_hits_are_not_quoted() {
        let raw = "Fees: none. Later on, a resort fee applies.";
        let first = raw.find("Later").unwrap();
        let snippets = extract_evidence_where("", raw, &["fee"], 3, |_, pos| pos > first);
        assert_eq!(snippets, vec!["Later on, a resort fee applies."]);
    }
}
