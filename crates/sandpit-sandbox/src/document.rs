//! Sandbox document generation.

use minijinja::{context, AutoEscape, Environment};
use serde::{Deserialize, Serialize};

use crate::props::DemoProps;

/// Static hints shown under a relayed execution error.
pub const REMEDIATION_HINTS: &[&str] = &[
    "Component may use unsupported imports",
    "Type-only syntax may not have been stripped",
    "Component may require specific props",
];

/// Script and style URLs loaded by every sandbox document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeAssets {
    /// UI runtime (UMD build exposing `React`)
    pub react: String,

    /// DOM renderer (UMD build exposing `ReactDOM`)
    pub react_dom: String,

    /// In-browser script transpiler
    pub babel: String,

    /// Styling engine
    pub tailwind: String,
}

impl Default for RuntimeAssets {
    fn default() -> Self {
        Self {
            react: "https://unpkg.com/react@18/umd/react.development.js".to_string(),
            react_dom: "https://unpkg.com/react-dom@18/umd/react-dom.development.js".to_string(),
            babel: "https://unpkg.com/@babel/standalone/babel.min.js".to_string(),
            tailwind: "https://cdn.tailwindcss.com".to_string(),
        }
    }
}

/// A complete, self-contained sandbox page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxDocument {
    /// Component the document mounts
    pub identity: String,

    /// Full HTML text
    pub html: String,
}

impl SandboxDocument {
    /// The document text.
    pub fn as_str(&self) -> &str {
        &self.html
    }
}

/// Errors that can occur while building a document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Failed to render sandbox document: {0}")]
    Render(String),
}

/// Renders sandbox documents from transformed source.
///
/// Output depends only on the transformed source, the identity and the
/// builder's own settings, so equal inputs give byte-identical documents.
pub struct DocumentBuilder {
    env: Environment<'static>,
    assets: RuntimeAssets,
    minify: bool,
}

impl DocumentBuilder {
    /// Create a builder loading the given runtime assets.
    pub fn new(assets: RuntimeAssets) -> Self {
        let mut env = Environment::new();
        // Values land in script and JSX contexts and are encoded for those
        env.set_auto_escape_callback(|_| AutoEscape::None);

        env.add_template("sandbox.html", SANDBOX_TEMPLATE)
            .expect("Failed to add sandbox template");

        Self {
            env,
            assets,
            minify: false,
        }
    }

    /// Minify the embedded stylesheet.
    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    /// Runtime assets referenced by built documents.
    pub fn assets(&self) -> &RuntimeAssets {
        &self.assets
    }

    /// Build the document mounting `identity` from `source`.
    pub fn build(&self, source: &str, identity: &str) -> Result<SandboxDocument, DocumentError> {
        let styles = if self.minify {
            minify_css(SANDBOX_CSS).unwrap_or_else(|_| SANDBOX_CSS.to_string())
        } else {
            SANDBOX_CSS.to_string()
        };

        let props = DemoProps::default();
        let tmpl = self
            .env
            .get_template("sandbox.html")
            .map_err(|e| DocumentError::Render(e.to_string()))?;

        let html = tmpl
            .render(context! {
                identity => identity,
                assets => &self.assets,
                styles => styles,
                source => escape_script_close(source),
                demo_props => props.to_js_object(),
                child_markup => props.child_markup,
                hints => REMEDIATION_HINTS,
            })
            .map_err(|e| DocumentError::Render(e.to_string()))?;

        Ok(SandboxDocument {
            identity: identity.to_string(),
            html,
        })
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new(RuntimeAssets::default())
    }
}

/// Minify CSS using lightningcss.
pub fn minify_css(css: &str) -> Result<String, String> {
    use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

    let stylesheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| format!("CSS parse error: {}", e))?;

    let minified = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..Default::default()
        })
        .map_err(|e| format!("CSS minify error: {}", e))?;

    Ok(minified.code)
}

/// Keep `</script` in the source from ending the script block early.
fn escape_script_close(source: &str) -> String {
    source.replace("</script", "<\\/script")
}

const SANDBOX_CSS: &str = r#"body {
  margin: 0;
  padding: 20px;
  font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
  background: #f8fafc;
}

.sandbox-container {
  background: white;
  border-radius: 8px;
  padding: 20px;
  box-shadow: 0 1px 3px rgba(0, 0, 0, 0.1);
  min-height: 200px;
}

.sandbox-loading {
  color: #6b7280;
  margin-bottom: 10px;
}

.preview-header {
  color: #6b7280;
  font-size: 12px;
  margin-bottom: 16px;
  border-bottom: 1px solid #e5e7eb;
  padding-bottom: 8px;
  font-weight: 500;
}

.preview-frame {
  padding: 16px;
  border: 1px dashed #d1d5db;
  border-radius: 8px;
  background: #f9fafb;
}

.error {
  color: #dc2626;
  background: #fef2f2;
  border: 1px solid #fecaca;
  padding: 12px;
  border-radius: 6px;
  margin: 10px 0;
  font-family: monospace;
  white-space: pre-wrap;
}
"#;

const SANDBOX_TEMPLATE: &str = r##"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <title>Component Sandbox</title>
  <script src="{{ assets.react }}"></script>
  <script src="{{ assets.react_dom }}"></script>
  <script src="{{ assets.tailwind }}"></script>
  <script src="{{ assets.babel }}"></script>
  <style>
{{ styles|safe }}
  </style>
  <script>
    (function () {
      var execution = new URLSearchParams(window.location.search).get('execution');
      var hints = {{ hints|tojson }};
      var settled = false;

      function notify(message) {
        if (settled) return;
        settled = true;
        if (execution !== null) message.execution = Number(execution);
        window.parent.postMessage(message, '*');
      }

      function fail(message) {
        var root = document.getElementById('root');
        if (root) {
          var block = document.createElement('div');
          block.className = 'error';
          block.textContent = 'Component Execution Error:\n' + message +
            '\n\nCommon Issues:\n' + hints.map(function (h) { return '• ' + h; }).join('\n');
          var container = document.createElement('div');
          container.className = 'sandbox-container';
          container.appendChild(block);
          root.replaceChildren(container);
        }
        notify({ type: 'sandbox-error', error: message });
      }

      window.addEventListener('error', function (event) {
        var error = event.error;
        fail(String(error && error.message !== undefined ? error.message : event.message));
      });

      window.__sandpit = { notify: notify, fail: fail };
    })();
  </script>
</head>
<body>
  <div id="root">
    <div class="sandbox-container">
      <div class="sandbox-loading">Loading component...</div>
    </div>
  </div>

  <script type="text/babel">
    const { useState, useEffect, useLayoutEffect, useRef, useCallback, useMemo, useReducer, useContext } = React;

    try {
{{ source|safe }}

      const demoProps = {{ demo_props|safe }};

      const SandboxHarness = () => (
        <div className="sandbox-container">
          <div className="preview-header">Live Preview: {{ identity }}</div>
          <div className="preview-frame">
            <{{ identity|safe }} {...demoProps}>
              {{ child_markup|safe }}
            </{{ identity|safe }}>
          </div>
        </div>
      );

      // Legacy render is synchronous, so render errors reach the catch below
      ReactDOM.render(<SandboxHarness />, document.getElementById('root'));
      window.__sandpit.notify({ type: 'sandbox-success' });
    } catch (error) {
      console.error('Sandbox execution error:', error);
      window.__sandpit.fail(String(error && error.message !== undefined ? error.message : error));
    }
  </script>
</body>
</html>
"##;
