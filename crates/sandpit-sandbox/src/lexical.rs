//! Regex-based source transformer.
//!
//! Known soundness gap: every rule here is a fixed lexical pattern, not a
//! grammar. Colons inside string literals, nested generics, multi-line import
//! lists, union types and interfaces with nested object types can be over- or
//! under-stripped. Anything left broken surfaces later as a runtime error
//! inside the sandbox. [`crate::SyntaxTransformer`] is the sound alternative.

use regex::Regex;
use std::sync::LazyLock;

use crate::traits::SourceTransformer;

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"import\s+.*?from\s+['"][^'"]*['"];?\s*"#).expect("Invalid import regex")
});

static SIDE_EFFECT_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Match: import './styles.css';
    Regex::new(r#"(?m)^[ \t]*import\s+['"][^'"]*['"];?\s*"#)
        .expect("Invalid side effect import regex")
});

static TRAILING_DEFAULT_EXPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)export\s+default\s+\w+;?\s*$").expect("Invalid default export regex")
});

static REEXPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Match: export { Card, Header };
    Regex::new(r"(?m)^[ \t]*export\s*\{[^}]*\}[^;\n]*;?[ \t]*\n?").expect("Invalid re-export regex")
});

static EXPORT_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bexport\s+(?:default\s+)?(async|function|class|const|let|var)\b")
        .expect("Invalid export keyword regex")
});

static INTERFACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:export\s+)?interface\s+\w+(?:<[^>]*>)?\s*(?:extends\s+[^{]+)?\{[^}]*\}\s*")
        .expect("Invalid interface regex")
});

static TYPE_ALIAS_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Match: type Size = 'sm' | 'md'; or type Props = { ... };
    Regex::new(r"(?m)^[ \t]*(?:export\s+)?type\s+\w+(?:<[^>]*>)?\s*=\s*(?:\{[^}]*\}|[^;\n]*);?[ \t]*\n?")
        .expect("Invalid type alias regex")
});

static FC_ANNOTATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":\s*React\.(?:FC|FunctionComponent)(?:<[^>]*>)?")
        .expect("Invalid component annotation regex")
});

static COMPONENT_GENERIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Match: function List<T>( -> function List(
    Regex::new(r"(function\s+[A-Z]\w*)\s*<[^>()]*>").expect("Invalid generic regex")
});

static ANNOTATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\??:\s*(?:(?:string|number|boolean|any|unknown|void|never|object)\b|React\.[A-Za-z]+(?:<[^>]*>)?|[A-Z]\w*Props\b)(?:\[\])?",
    )
    .expect("Invalid annotation regex")
});

/// Transformer that strips module and type syntax with fixed patterns.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalTransformer;

impl LexicalTransformer {
    /// Create a new lexical transformer.
    pub fn new() -> Self {
        Self
    }
}

impl SourceTransformer for LexicalTransformer {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn transform(&self, source: &str) -> String {
        let text = IMPORT_RE.replace_all(source, "");
        let text = SIDE_EFFECT_IMPORT_RE.replace_all(&text, "");
        let text = TRAILING_DEFAULT_EXPORT_RE.replace_all(&text, "");
        let text = REEXPORT_RE.replace_all(&text, "");
        let text = EXPORT_KEYWORD_RE.replace_all(&text, "$1");
        let text = INTERFACE_RE.replace_all(&text, "");
        let text = TYPE_ALIAS_RE.replace_all(&text, "");
        let text = FC_ANNOTATION_RE.replace_all(&text, "");
        let text = COMPONENT_GENERIC_RE.replace_all(&text, "$1");
        let text = ANNOTATION_RE.replace_all(&text, "");

        text.trim().to_string()
    }
}
