//! Initialize sandpit in a project.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Run the init command.
pub async fn run(config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing sandpit...");

    if !config_path.exists() || yes {
        fs::write(config_path, DEFAULT_CONFIG)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        tracing::info!("Created {}", config_path.display());
    } else {
        tracing::warn!(
            "{} already exists. Use --yes to overwrite.",
            config_path.display()
        );
    }

    let example_dir = Path::new("generated").join("example");
    fs::create_dir_all(&example_dir).context("Failed to create generated directory")?;

    let counter_path = example_dir.join("Counter.jsx");
    if !counter_path.exists() || yes {
        fs::write(&counter_path, EXAMPLE_COMPONENT).context("Failed to write Counter.jsx")?;
        tracing::info!("Created {}", counter_path.display());
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'sandpit dev' to start the preview server.");

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Sandpit Configuration

[source]
# Directory holding generated component sources
dir = "generated"

[server]
host = "127.0.0.1"
port = 7777
open = true

[sandbox]
# "syntax" parses sources before stripping types; "lexical" uses patterns only
transform = "syntax"

# Release sandbox documents a fixed time after loading instead of when the
# component reports back
# release_delay_ms = 1000

# Minify the sandbox stylesheet
minify = false

[runtime]
react = "https://unpkg.com/react@18/umd/react.development.js"
react_dom = "https://unpkg.com/react-dom@18/umd/react-dom.development.js"
babel = "https://unpkg.com/@babel/standalone/babel.min.js"
tailwind = "https://cdn.tailwindcss.com"

[export]
output = "dist"
title = "Component Sandboxes"
minify = true
"#;

const EXAMPLE_COMPONENT: &str = r#"import React, { useState } from 'react';

const Counter = ({ title }) => {
  const [count, setCount] = useState(0);

  return (
    <div className="p-4 rounded border">
      <h2 className="font-bold mb-2">{title}</h2>
      <button
        className="px-3 py-1 rounded bg-blue-600 text-white"
        onClick={() => setCount(count + 1)}
      >
        Clicked {count} times
      </button>
    </div>
  );
};

export default Counter;
"#;
