//! Classify, name, transform and wrap one source artifact.

use crate::classify::is_component;
use crate::document::{DocumentBuilder, DocumentError, SandboxDocument};
use crate::identity::extract_identity;
use crate::traits::{SourceArtifact, SourceTransformer, TransformStrategy};

/// Everything derived from one artifact, ready to load into a boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedSandbox {
    /// Resolved component name
    pub identity: String,

    /// Source after module and type syntax removal
    pub transformed: String,

    /// The document to load
    pub document: SandboxDocument,
}

/// Errors that stop a preview before anything is executed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Not a valid React component")]
    Unsupported,

    #[error(transparent)]
    Build(#[from] DocumentError),
}

/// The synchronous half of a preview cycle.
pub struct SandboxPipeline {
    transformer: Box<dyn SourceTransformer>,
    builder: DocumentBuilder,
}

impl SandboxPipeline {
    /// Create a pipeline using the given transform strategy.
    pub fn new(strategy: TransformStrategy, builder: DocumentBuilder) -> Self {
        Self::with_transformer(strategy.transformer(), builder)
    }

    /// Create a pipeline around a custom transformer.
    pub fn with_transformer(
        transformer: Box<dyn SourceTransformer>,
        builder: DocumentBuilder,
    ) -> Self {
        Self {
            transformer,
            builder,
        }
    }

    /// Name of the transformer in use.
    pub fn transformer_name(&self) -> &'static str {
        self.transformer.name()
    }

    /// Run the pipeline. Classification always happens before any transform.
    pub fn prepare(&self, artifact: &SourceArtifact) -> Result<PreparedSandbox, PipelineError> {
        if !is_component(&artifact.text) {
            return Err(PipelineError::Unsupported);
        }

        let identity = extract_identity(&artifact.text, &artifact.filename);
        let transformed = self.transformer.transform(&artifact.text);
        let document = self.builder.build(&transformed, &identity)?;

        Ok(PreparedSandbox {
            identity,
            transformed,
            document,
        })
    }
}

impl Default for SandboxPipeline {
    fn default() -> Self {
        Self::new(TransformStrategy::default(), DocumentBuilder::default())
    }
}
