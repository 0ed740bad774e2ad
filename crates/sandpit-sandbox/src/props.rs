//! The fixed demo props every previewed component is rendered with.
//!
//! Real call sites are unknown, so the harness spreads one generic bag of
//! props that covers the common widget shapes (cards, accordions, buttons).
//! Components with an incompatible contract throw during render and the error
//! is relayed like any other runtime failure.

use serde_json::Value;

/// One accordion-style entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoItem {
    pub title: &'static str,
    pub content: &'static str,
}

/// Generic props spread onto the previewed component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoProps {
    /// For card-like components
    pub title: &'static str,

    /// Plain text children prop
    pub children: &'static str,

    /// For accordion/list components
    pub items: &'static [DemoItem],

    /// JavaScript expression used as the click handler
    pub on_click: &'static str,

    /// Generic class name
    pub class_name: &'static str,

    /// Literal JSX placed between the component's tags
    pub child_markup: &'static str,
}

/// The one prop set used for every preview.
pub const DEMO_PROPS: DemoProps = DemoProps {
    title: "Demo Card",
    children: "This is a sample card component with some content to demonstrate how it looks and behaves.",
    items: &[
        DemoItem {
            title: "Section 1",
            content: "This is the content for the first section.",
        },
        DemoItem {
            title: "Section 2",
            content: "This is the content for the second section.",
        },
        DemoItem {
            title: "Section 3",
            content: "This is the content for the third section.",
        },
    ],
    on_click: "() => console.log('[sandpit] demo onClick fired')",
    class_name: "demo-component",
    child_markup: "<p>Demo content for the component</p>",
};

impl Default for DemoProps {
    fn default() -> Self {
        DEMO_PROPS
    }
}

impl DemoProps {
    /// Render the props as a JavaScript object literal.
    ///
    /// Strings go through JSON encoding so quotes and newlines stay literal.
    pub fn to_js_object(&self) -> String {
        let items = self
            .items
            .iter()
            .map(|item| {
                format!(
                    "{{ title: {}, content: {} }}",
                    js_string(item.title),
                    js_string(item.content)
                )
            })
            .collect::<Vec<_>>()
            .join(",\n    ");

        format!(
            "{{\n  title: {},\n  children: {},\n  items: [\n    {}\n  ],\n  onClick: {},\n  className: {}\n}}",
            js_string(self.title),
            js_string(self.children),
            items,
            self.on_click,
            js_string(self.class_name),
        )
    }
}

fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}
