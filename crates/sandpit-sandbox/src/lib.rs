//! Turn component source text into self-contained sandbox documents.
//!
//! This crate holds the pure half of the preview pipeline: deciding whether a
//! blob of text is a renderable component, naming it, stripping the module and
//! type syntax a bare browser script cannot run, and wrapping the result in an
//! HTML document that mounts it with a fixed set of demo props.

pub mod classify;
pub mod document;
pub mod identity;
pub mod lexical;
pub mod pipeline;
pub mod props;
pub mod source;
pub mod syntax;
pub mod traits;

pub use classify::is_component;
pub use document::{
    minify_css, DocumentBuilder, DocumentError, RuntimeAssets, SandboxDocument, REMEDIATION_HINTS,
};
pub use identity::extract_identity;
pub use lexical::LexicalTransformer;
pub use pipeline::{PipelineError, PreparedSandbox, SandboxPipeline};
pub use props::{DemoItem, DemoProps};
pub use source::{SourceDirectory, SourceEntry, SourceError};
pub use syntax::SyntaxTransformer;
pub use traits::{SourceArtifact, SourceTransformer, TransformStrategy};
