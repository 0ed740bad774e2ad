//! Template engine for the gallery page.

use minijinja::{context, Environment};

use crate::exporter::ExportEntry;

/// Context for rendering the gallery.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Context {
    /// Page title
    pub title: String,
    /// All files considered by the export
    pub entries: Vec<ExportEntry>,
    /// Number of exported components
    pub exported: usize,
}

/// Template engine using minijinja.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create a new template engine with default templates.
    pub fn new() -> Self {
        let mut env = Environment::new();

        env.add_template("base.html", BASE_TEMPLATE)
            .expect("Failed to add base template");

        env.add_template("index.html", INDEX_TEMPLATE)
            .expect("Failed to add index template");

        Self { env }
    }

    /// Render a page using the specified template.
    pub fn render_page(
        &self,
        template: &str,
        context: &Context,
    ) -> Result<String, minijinja::Error> {
        let tmpl = self.env.get_template(template)?;

        tmpl.render(context! {
            title => &context.title,
            entries => &context.entries,
            exported => context.exported,
            skipped => context.entries.len() - context.exported,
        })
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

const BASE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{{ title }}</title>
  <link rel="stylesheet" href="assets/main.css">
</head>
<body>
  {% block content %}{% endblock %}
  <script src="assets/main.js"></script>
</body>
</html>"##;

const INDEX_TEMPLATE: &str = r##"{% extends "base.html" %}

{% block content %}
<header class="gallery-header">
  <h1>{{ title }}</h1>
  <p>{{ exported }} components, {{ skipped }} other files</p>
</header>
<main class="gallery">
{% for entry in entries %}
  <section class="card" data-status="{{ entry.status }}">
    <header>
      <span class="path">{{ entry.path }}</span>
      {% if entry.identity %}<span class="identity">{{ entry.identity }}</span>{% endif %}
      <span class="badge"></span>
    </header>
    {% if entry.output %}
    <iframe src="{{ entry.output }}" sandbox="allow-scripts" loading="lazy" title="{{ entry.identity }}"></iframe>
    {% elif entry.status == "failed" %}
    <pre class="error">{{ entry.message }}</pre>
    {% else %}
    <p class="muted">Not a React component</p>
    {% endif %}
  </section>
{% endfor %}
</main>
{% endblock %}"##;
