//! Heuristic gate deciding whether text looks like a renderable component.
//!
//! This is not a parser. It only keeps obvious non-components (stylesheets,
//! markdown, plain data) from costing a sandbox cycle, and it accepts false
//! positives and negatives on unusual input.

use regex::Regex;
use std::sync::LazyLock;

static RUNTIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bReact\b").expect("Invalid runtime regex"));

static HOOK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\buse(?:State|Effect|LayoutEffect|Reducer|Ref|Memo|Callback|Context)\b",
    )
    .expect("Invalid hook regex")
});

static DEFAULT_EXPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bexport\s+default\b").expect("Invalid default export regex"));

static CAPITALIZED_FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bfunction\s+[A-Z][a-zA-Z]*\s*\(").expect("Invalid function regex")
});

static CAPITALIZED_CONST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bconst\s+[A-Z][a-zA-Z]*\s*=").expect("Invalid const regex")
});

/// Returns `true` when the text carries any component signal.
pub fn is_component(source: &str) -> bool {
    RUNTIME_RE.is_match(source)
        || HOOK_RE.is_match(source)
        || DEFAULT_EXPORT_RE.is_match(source)
        || CAPITALIZED_FUNCTION_RE.is_match(source)
        || CAPITALIZED_CONST_RE.is_match(source)
}
