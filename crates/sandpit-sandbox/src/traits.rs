//! Shared types and the transformer seam.

use serde::{Deserialize, Serialize};

/// Source text handed over by the file-selection side, immutable per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceArtifact {
    /// Raw component source
    pub text: String,

    /// File name (or relative path) the text was read from
    pub filename: String,
}

impl SourceArtifact {
    /// Create a new artifact.
    pub fn new(text: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            filename: filename.into(),
        }
    }
}

/// Which transformer a pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformStrategy {
    /// Regex-based stripping
    Lexical,
    /// Syntax-tree based stripping with lexical fallback
    #[default]
    Syntax,
}

impl TransformStrategy {
    /// Build the transformer for this strategy.
    pub fn transformer(self) -> Box<dyn SourceTransformer> {
        match self {
            Self::Lexical => Box::new(crate::LexicalTransformer::new()),
            Self::Syntax => Box::new(crate::SyntaxTransformer::new()),
        }
    }
}

/// Strips module and type syntax so a snippet runs as a plain browser script.
///
/// Implementations must be pure: the same input always yields the same output.
pub trait SourceTransformer: Send + Sync {
    /// Transformer identifier (e.g., "lexical", "syntax")
    fn name(&self) -> &'static str;

    /// Transform component source into runnable script text.
    fn transform(&self, source: &str) -> String;
}
