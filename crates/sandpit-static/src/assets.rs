//! Gallery stylesheet and script.

use sandpit_sandbox::minify_css;

/// Asset pipeline utilities.
pub struct AssetPipeline;

impl AssetPipeline {
    /// The gallery stylesheet, minified on request.
    pub fn generate_css(minify: bool) -> String {
        if !minify {
            return GALLERY_CSS.to_string();
        }

        minify_css(GALLERY_CSS).unwrap_or_else(|e| {
            tracing::warn!("Failed to minify gallery CSS: {}", e);
            GALLERY_CSS.to_string()
        })
    }

    /// The gallery script that badges each embedded sandbox with its outcome.
    pub fn generate_js() -> String {
        GALLERY_JS.to_string()
    }
}

const GALLERY_CSS: &str = r#":root {
  --border: #e5e7eb;
  --muted: #6b7280;
  --success: #047857;
  --danger: #dc2626;
}

* {
  box-sizing: border-box;
}

body {
  margin: 0;
  font-family: system-ui, -apple-system, sans-serif;
  background: #f8fafc;
  color: #111827;
}

.gallery-header {
  padding: 1.5rem 2rem;
  border-bottom: 1px solid var(--border);
  background: white;
}

.gallery-header h1 {
  margin: 0 0 0.25rem;
  font-size: 1.5rem;
}

.gallery-header p {
  margin: 0;
  color: var(--muted);
}

.gallery {
  display: grid;
  grid-template-columns: repeat(auto-fill, minmax(420px, 1fr));
  gap: 1.5rem;
  padding: 2rem;
}

.card {
  background: white;
  border: 1px solid var(--border);
  border-radius: 0.5rem;
  overflow: hidden;
}

.card > header {
  display: flex;
  align-items: center;
  gap: 0.5rem;
  padding: 0.75rem 1rem;
  border-bottom: 1px solid var(--border);
  font-size: 0.875rem;
}

.card .path {
  font-family: monospace;
  flex: 1;
}

.card .identity {
  font-weight: 600;
}

.card .badge:empty {
  display: none;
}

.card[data-outcome="success"] .badge {
  color: var(--success);
}

.card[data-outcome="error"] .badge {
  color: var(--danger);
}

.card iframe {
  display: block;
  width: 100%;
  height: 320px;
  border: 0;
}

.card .muted,
.card .error {
  margin: 0;
  padding: 1rem;
}

.card .muted {
  color: var(--muted);
}

.card .error {
  color: var(--danger);
  white-space: pre-wrap;
}
"#;

const GALLERY_JS: &str = r#"(function () {
  'use strict';

  window.addEventListener('message', function (event) {
    var data = event.data;
    if (!data || typeof data !== 'object') return;

    document.querySelectorAll('.card iframe').forEach(function (frame) {
      if (frame.contentWindow !== event.source) return;

      var card = frame.closest('.card');
      var badge = card.querySelector('.badge');

      if (data.type === 'sandbox-success') {
        card.dataset.outcome = 'success';
        badge.textContent = 'Rendered';
      } else if (data.type === 'sandbox-error') {
        card.dataset.outcome = 'error';
        badge.textContent = 'Error';
        badge.title = String(data.error);
      }
    });
  });
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_css() {
        let css = AssetPipeline::generate_css(false);
        assert!(css.contains(".gallery"));
        assert!(css.contains("--danger"));
    }

    #[test]
    fn minifies_css() {
        let css = AssetPipeline::generate_css(true);
        assert!(css.contains(".gallery{"));
        assert!(!css.contains("\n  "));
    }

    #[test]
    fn script_handles_both_outcomes() {
        let js = AssetPipeline::generate_js();
        assert!(js.contains("'sandbox-success'"));
        assert!(js.contains("'sandbox-error'"));
    }
}
