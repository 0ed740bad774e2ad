//! Component name resolution.

use regex::Regex;
use std::sync::LazyLock;

/// Name used when neither the source nor the filename yields one.
pub const FALLBACK_IDENTITY: &str = "Component";

static DEFAULT_EXPORT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bexport\s+default\s+(?:function\s+|class\s+)?([A-Z][a-zA-Z0-9]*)")
        .expect("Invalid default export name regex")
});

static CONST_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Match: const Card = ... or export const Card: React.FC<Props> = ...
    Regex::new(r"(?m)^(?:export\s+)?const\s+([A-Z][a-zA-Z0-9]*)\s*(?::[^=\n]*)?=")
        .expect("Invalid const name regex")
});

static FUNCTION_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:export\s+)?function\s+([A-Z][a-zA-Z0-9]*)\s*[(<]")
        .expect("Invalid function name regex")
});

/// Resolve the display name of a component.
///
/// Rules are tried in priority order and the first rule that matches anywhere
/// in the text wins, so an explicit default export beats any capitalized
/// declaration that happens to come earlier.
pub fn extract_identity(source: &str, filename: &str) -> String {
    [&DEFAULT_EXPORT_NAME_RE, &CONST_NAME_RE, &FUNCTION_NAME_RE]
        .into_iter()
        .find_map(|re| re.captures(source).and_then(|c| c.get(1)))
        .map(|m| m.as_str().to_string())
        .or_else(|| identity_from_filename(filename))
        .unwrap_or_else(|| FALLBACK_IDENTITY.to_string())
}

/// Final path component up to its first dot.
fn identity_from_filename(filename: &str) -> Option<String> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let stem = base.split('.').next().unwrap_or("").trim();

    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_export_wins_over_earlier_declarations() {
        let source = r#"
const Helper = () => <span />;
function Inner() { return null; }

const Accordion = ({ items }) => <div>{items.length}</div>;

export default Accordion;
        "#;

        assert_eq!(extract_identity(source, "x.jsx"), "Accordion");
    }

    #[test]
    fn default_export_function_declaration() {
        let source = "const Theme = {};\nexport default function ProfileCard() { return null }";
        assert_eq!(extract_identity(source, "x.jsx"), "ProfileCard");
    }

    #[test]
    fn const_wins_over_function() {
        let source = "function Row() {}\nconst Table = () => null;";
        assert_eq!(extract_identity(source, "x.jsx"), "Table");
    }

    #[test]
    fn annotated_const_is_recognised() {
        let source = "export const Card: React.FC<CardProps> = ({ title }) => null;";
        assert_eq!(extract_identity(source, "x.tsx"), "Card");
    }

    #[test]
    fn indented_declarations_are_not_top_level() {
        let source = "function modal() {\n  const Body = () => null;\n}";
        assert_eq!(extract_identity(source, "Modal.jsx"), "Modal");
    }

    #[test]
    fn generic_function_declaration() {
        let source = "function List<T>(props: ListProps<T>) { return null }";
        assert_eq!(extract_identity(source, "x.tsx"), "List");
    }

    #[test]
    fn falls_back_to_filename() {
        assert_eq!(extract_identity("<div />", "SearchInput.tsx"), "SearchInput");
        assert_eq!(
            extract_identity("<div />", "task_1/Button.stories.js"),
            "Button"
        );
    }

    #[test]
    fn falls_back_to_literal() {
        assert_eq!(extract_identity("<div />", ""), FALLBACK_IDENTITY);
        assert_eq!(extract_identity("<div />", ".jsx"), FALLBACK_IDENTITY);
        assert_eq!(extract_identity("<div />", "dir/"), FALLBACK_IDENTITY);
    }
}
