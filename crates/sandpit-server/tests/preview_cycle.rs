//! End-to-end preview cycles against a recording boundary.
//!
//! The boundary plays the browser: it looks the loaded handle up in the
//! store, answers with whatever the "sandbox" would post, and records every
//! call so the lifecycle can be checked.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use sandpit_sandbox::{SandboxPipeline, SourceArtifact};
use sandpit_server::{
    Boundary, ExecutionHandle, ExecutionId, HandleLookup, HandleStore, PreviewController,
    PreviewState, ReleasePolicy, ReleaseTimer,
};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Loaded(ExecutionId),
    Cleared,
}

#[derive(Clone, Default)]
struct RecordingBoundary {
    store: HandleStore,
    events: Arc<Mutex<Vec<Event>>>,
    documents: Arc<Mutex<Vec<String>>>,
}

impl RecordingBoundary {
    fn new(store: HandleStore) -> Self {
        Self {
            store,
            ..Default::default()
        }
    }

    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn last_document(&self) -> String {
        self.documents.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl Boundary for RecordingBoundary {
    fn load(&mut self, execution: ExecutionId, handle: &ExecutionHandle) {
        match self.store.lookup(&handle.id()) {
            HandleLookup::Live(html) => self.documents.lock().unwrap().push(html.to_string()),
            other => panic!("Loaded a handle that is not live: {:?}", other),
        }
        self.events.lock().unwrap().push(Event::Loaded(execution));
    }

    fn clear(&mut self) {
        self.events.lock().unwrap().push(Event::Cleared);
    }
}

#[derive(Clone, Default)]
struct ManualTimer {
    scheduled: Arc<Mutex<Vec<ExecutionId>>>,
}

impl ReleaseTimer for ManualTimer {
    fn schedule(&mut self, execution: ExecutionId, _delay: Duration) {
        self.scheduled.lock().unwrap().push(execution);
    }

    fn cancel(&mut self, execution: ExecutionId) {
        self.scheduled.lock().unwrap().retain(|e| *e != execution);
    }
}

const CARD: &str = r#"import React, { useState } from 'react';

interface CardProps {
  title: string;
  onClick: () => void;
}

export default function Card({ title, onClick }: CardProps) {
  const [open, setOpen] = useState<boolean>(false);
  const toggle = () => {
    setOpen(!open);
    onClick();
  };
  return <button onClick={toggle}>{title}</button>;
}
"#;

// `config` is not among the demo props, so rendering throws
const BROKEN: &str = r#"const Broken = ({ config }) => (
  <ul>{config.sections.map((s) => <li key={s}>{s}</li>)}</ul>
);
export default Broken;
"#;

const BROKEN_MESSAGE: &str = "Cannot read properties of undefined (reading 'sections')";

fn setup() -> (PreviewController, RecordingBoundary, HandleStore) {
    let store = HandleStore::new();
    let boundary = RecordingBoundary::new(store.clone());
    let controller = PreviewController::new(
        SandboxPipeline::default(),
        store.clone(),
        Box::new(boundary.clone()),
    );
    (controller, boundary, store)
}

fn success(execution: u64) -> Value {
    json!({ "type": "sandbox-success", "execution": execution })
}

#[test]
fn success_path() {
    let (mut controller, boundary, store) = setup();
    let mut observed = vec![controller.state().clone()];

    controller.select(Some(SourceArtifact::new(CARD, "task_1/Card.tsx")));
    observed.push(controller.state().clone());

    let document = boundary.last_document();
    assert!(document.contains("function Card({ title, onClick }) {"));
    assert!(document.contains("useState(false)"));
    assert!(document.contains("onClick: () => console.log("));
    assert!(!document.contains("interface CardProps"));
    assert!(document.contains("<Card {...demoProps}>"));

    controller.on_message(&success(1));
    observed.push(controller.state().clone());

    assert_eq!(observed[0], PreviewState::Idle);
    assert_eq!(
        observed[1],
        PreviewState::Executing {
            execution: ExecutionId::new(1)
        }
    );
    assert!(matches!(observed[2], PreviewState::Success { .. }));
    assert!(controller.view().hints.is_empty());

    assert_eq!(store.stats().created, 1);
    assert_eq!(store.stats().released, 1);
    assert_eq!(boundary.events(), vec![Event::Loaded(ExecutionId::new(1))]);
}

#[test]
fn error_path_relays_message_verbatim() {
    let (mut controller, boundary, store) = setup();
    controller.select(Some(SourceArtifact::new(BROKEN, "Broken.jsx")));
    assert!(boundary.last_document().contains("config.sections.map"));

    controller.on_message(&json!({
        "type": "sandbox-error",
        "error": BROKEN_MESSAGE
    }));

    match controller.state() {
        PreviewState::Error { message, execution, .. } => {
            assert_eq!(message, BROKEN_MESSAGE);
            assert_eq!(*execution, Some(ExecutionId::new(1)));
        }
        other => panic!("Expected Error state, got {:?}", other),
    }
    assert_eq!(store.stats().live, 0);
}

#[test]
fn stylesheet_is_unsupported_without_execution() {
    let (mut controller, boundary, store) = setup();
    controller.select(Some(SourceArtifact::new(
        ".card { color: red; }\n",
        "task_1/card.css",
    )));

    assert_eq!(controller.state(), &PreviewState::Unsupported);
    assert_eq!(store.stats().created, 0);
    assert!(!boundary
        .events()
        .iter()
        .any(|e| matches!(e, Event::Loaded(_))));

    assert!(!controller.on_message(&success(1)));
    assert_eq!(controller.state(), &PreviewState::Unsupported);
}

#[test]
fn stale_messages_are_ignored() {
    let (mut controller, _, _) = setup();
    controller.select(Some(SourceArtifact::new(CARD, "Card.tsx")));
    controller.select(Some(SourceArtifact::new(BROKEN, "Broken.jsx")));

    assert!(!controller.on_message(&success(1)));
    assert_eq!(
        controller.state(),
        &PreviewState::Executing {
            execution: ExecutionId::new(2)
        }
    );

    assert!(controller.on_message(&json!({
        "type": "sandbox-error",
        "error": "boom",
        "execution": 2
    })));
    assert!(matches!(controller.state(), PreviewState::Error { .. }));
}

#[test]
fn one_creation_and_one_release_per_cycle_on_outcome() {
    let (mut controller, _, store) = setup();
    let artifact = SourceArtifact::new(CARD, "Card.tsx");

    controller.select(Some(artifact.clone()));
    controller.on_message(&success(1));
    controller.refresh();
    controller.refresh();
    controller.on_message(&success(3));
    controller.select(Some(artifact));
    controller.teardown();

    let stats = store.stats();
    assert_eq!(stats.created, 4);
    assert_eq!(stats.released, 4);
    assert_eq!(stats.live, 0);
}

#[test]
fn one_creation_and_one_release_per_cycle_with_fixed_delay() {
    let (controller, _, store) = setup();
    let timer = ManualTimer::default();
    let mut controller = controller.with_release_policy(
        ReleasePolicy::FixedDelay(Duration::from_millis(1000)),
        Box::new(timer.clone()),
    );
    let artifact = SourceArtifact::new(CARD, "Card.tsx");

    // Timer fires before the outcome arrives
    controller.select(Some(artifact.clone()));
    controller.release_due(ExecutionId::new(1));
    controller.on_message(&success(1));

    // Replaced before the timer fires, then the stale timer fires anyway
    controller.refresh();
    controller.refresh();
    controller.release_due(ExecutionId::new(2));

    // Torn down with a timer pending
    controller.teardown();
    controller.release_due(ExecutionId::new(3));

    let stats = store.stats();
    assert_eq!(stats.created, 3);
    assert_eq!(stats.released, 3);
    assert_eq!(stats.live, 0);
    assert!(timer.scheduled.lock().unwrap().is_empty());
}

#[test]
fn clearing_selection_returns_to_idle() {
    let (mut controller, boundary, store) = setup();
    controller.select(Some(SourceArtifact::new(CARD, "Card.tsx")));
    controller.select(None);

    assert_eq!(controller.state(), &PreviewState::Idle);
    assert_eq!(boundary.events().last(), Some(&Event::Cleared));
    assert_eq!(store.stats().live, 0);

    controller.refresh();
    assert_eq!(controller.state(), &PreviewState::Idle);
    assert_eq!(store.stats().created, 1);
}
