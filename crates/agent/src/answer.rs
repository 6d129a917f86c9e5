//! Answer post-processing.
//!
//! Generated answers are asked to end with a `Sources:` block and a
//! `Confidence: <0-1>` line. This module pulls those fields back out of the
//! prose. It is a best-effort decoder: a missing marker leaves the field
//! empty, and a malformed number is ignored.

use std::sync::LazyLock;

use regex_lite::Regex;

/// A confidence marker and its numeric value, e.g. `Confidence: 0.85.`
static CONFIDENCE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\(?(?:Confidence|Уверенность):[ \t]*\(?([0-9]+(?:\.[0-9]+)?)\)?[.,;]?").ok()
});

/// The start of a confidence line, whatever follows the marker.
static CONFIDENCE_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\(?(?:Confidence|Уверенность):").ok());

/// The marker introducing the sources block.
static SOURCES: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?:Sources|Источники):").ok());

/// An answer split into its body and structured metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAnswer {
    pub answer_text: String,
    pub sources: Vec<String>,
    pub confidence: Option<f32>,
}

/// Split raw generated text into body, sources and confidence.
pub fn parse_answer(raw: &str) -> ParsedAnswer {
    let (text, confidence) = extract_confidence(raw);

    let marker = SOURCES
        .as_ref()
        .and_then(|re| re.find_iter(&text).last())
        .map(|m| m.range());

    let (body, sources) = match marker {
        Some(range) => {
            let sources = text[range.end..]
                .lines()
                .map(clean_source_line)
                .filter(|line| !line.is_empty() && !is_confidence_line(line))
                .map(str::to_string)
                .collect();
            (&text[..range.start], sources)
        }
        None => (text.as_str(), Vec::new()),
    };

    ParsedAnswer {
        answer_text: body.trim().to_string(),
        sources,
        confidence,
    }
}

/// Remove the last confidence marker and its value when the value lies in
/// `[0, 1]`, returning the remaining text.
fn extract_confidence(raw: &str) -> (String, Option<f32>) {
    let Some(caps) = CONFIDENCE
        .as_ref()
        .and_then(|re| re.captures_iter(raw).last())
    else {
        return (raw.to_string(), None);
    };

    let value = caps
        .get(1)
        .and_then(|m| m.as_str().parse::<f32>().ok())
        .filter(|v| (0.0..=1.0).contains(v));

    match (value, caps.get(0)) {
        (Some(value), Some(whole)) => {
            let mut text = String::with_capacity(raw.len());
            text.push_str(&raw[..whole.start()]);
            text.push_str(&raw[whole.end()..]);
            (text, Some(value))
        }
        _ => (raw.to_string(), None),
    }
}

fn is_confidence_line(line: &str) -> bool {
    CONFIDENCE_LINE.as_ref().is_some_and(|re| re.is_match(line))
}

fn clean_source_line(line: &str) -> &str {
    let line = line.trim();
    ["- ", "* ", "• "]
        .iter()
        .find_map(|bullet| line.strip_prefix(bullet))
        .unwrap_or(line)
        .trim()
}
