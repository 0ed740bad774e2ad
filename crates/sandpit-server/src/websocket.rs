//! WebSocket link between the dev server and host pages.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::bridge::ExecutionId;
use crate::controller::StatusView;

/// Messages sent to host pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostMessage {
    /// Current preview status
    Status { status: StatusView },

    /// Replace the boundary with a fresh one loading `url`
    Mount { execution: ExecutionId, url: String },

    /// Remove the boundary
    Unmount,

    /// Files were added or removed under the source directory
    FilesChanged,

    /// Connection established
    Connected,
}

/// Messages received from host pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEvent {
    /// Select a file by relative path; `None` clears the selection
    Select {
        #[serde(default)]
        path: Option<String>,
    },

    /// Re-run the current selection
    Refresh,

    /// A message the boundary posted to the host window
    Bridge { message: Value },
}

#[derive(Debug, Default)]
struct Latest {
    status: Option<HostMessage>,
    mount: Option<HostMessage>,
}

/// Hub broadcasting host messages to every connected page.
///
/// The latest status and mount are kept so pages that connect mid-cycle
/// can catch up.
#[derive(Debug, Clone)]
pub struct StatusHub {
    sender: broadcast::Sender<HostMessage>,
    latest: Arc<Mutex<Latest>>,
}

impl StatusHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self {
            sender,
            latest: Arc::default(),
        }
    }

    /// Send a message to all connected pages.
    pub fn send(&self, msg: HostMessage) {
        {
            let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
            match &msg {
                HostMessage::Status { .. } => latest.status = Some(msg.clone()),
                HostMessage::Mount { .. } => latest.mount = Some(msg.clone()),
                HostMessage::Unmount => latest.mount = None,
                HostMessage::FilesChanged | HostMessage::Connected => {}
            }
        }

        // No receivers is fine
        let _ = self.sender.send(msg);
    }

    /// Stop replaying the mount of `execution` to pages that connect later.
    pub fn forget_mount(&self, execution: ExecutionId) {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(&latest.mount, Some(HostMessage::Mount { execution: e, .. }) if *e == execution) {
            latest.mount = None;
        }
    }

    pub fn publish_status(&self, status: StatusView) {
        self.send(HostMessage::Status { status });
    }

    /// Messages that bring a newly connected page up to date.
    pub fn snapshot(&self) -> Vec<HostMessage> {
        let latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        latest
            .status
            .iter()
            .chain(latest.mount.iter())
            .cloned()
            .collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for StatusHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate the host page script.
///
/// The script owns the boundary element: every mount discards the old
/// iframe and creates a new one, and every object posted to the host window
/// is forwarded to the server untouched.
pub fn host_client_script(bridge_path: &str) -> String {
    format!(
        r#"
(function() {{
  'use strict';

  const wsUrl = (location.protocol === 'https:' ? 'wss://' : 'ws://') + location.host + '{}';
  const frameHost = document.getElementById('sandpit-frame');
  const statusEl = document.getElementById('sandpit-status');
  const fileList = document.getElementById('sandpit-files');
  const refreshBtn = document.getElementById('sandpit-refresh');
  let ws = null;
  let frame = null;
  let selected = null;
  let reconnectAttempts = 0;
  const maxReconnectAttempts = 10;

  function send(msg) {{
    if (ws && ws.readyState === WebSocket.OPEN) {{
      ws.send(JSON.stringify(msg));
    }}
  }}

  function mount(url) {{
    unmount();
    frame = document.createElement('iframe');
    frame.setAttribute('sandbox', 'allow-scripts');
    frame.setAttribute('title', 'Component sandbox');
    frame.className = 'sandpit-frame';
    frame.src = url;
    frameHost.appendChild(frame);
  }}

  function unmount() {{
    if (frame) {{
      frame.remove();
      frame = null;
    }}
  }}

  function line(text, className) {{
    const el = document.createElement('div');
    if (className) el.className = className;
    el.textContent = text;
    return el;
  }}

  function renderStatus(status) {{
    const nodes = [];
    refreshBtn.disabled = status.state === 'idle';

    switch (status.state) {{
      case 'idle':
        nodes.push(line('Select a React component to preview', 'muted'));
        break;
      case 'unsupported':
        nodes.push(line('This file is not a React component', 'warn'));
        nodes.push(line('Only .jsx and .tsx files with React components can be previewed', 'muted'));
        break;
      case 'executing':
        nodes.push(line('Executing ' + (status.identity || 'component') + '...', 'busy'));
        break;
      case 'success':
        nodes.push(line('Rendered ' + (status.identity || 'component'), 'ok'));
        break;
      case 'error':
        nodes.push(line('Execution Error', 'error-title'));
        nodes.push(line(status.message, 'error'));
        if (status.hints && status.hints.length) {{
          nodes.push(line('Common Issues:', 'muted'));
          status.hints.forEach(function(hint) {{ nodes.push(line('• ' + hint, 'muted')); }});
        }}
        break;
    }}

    if (status.filename) nodes.unshift(line(status.filename, 'filename'));
    statusEl.replaceChildren.apply(statusEl, nodes);
  }}

  function loadFiles() {{
    fetch('/api/files')
      .then(function(res) {{ return res.ok ? res.json() : []; }})
      .then(function(files) {{
        fileList.replaceChildren.apply(fileList, files.map(function(file) {{
          const item = document.createElement('li');
          const button = document.createElement('button');
          button.textContent = file.path;
          if (file.path === selected) button.className = 'selected';
          button.onclick = function() {{
            selected = file.path;
            send({{ kind: 'select', path: file.path }});
            loadFiles();
          }};
          item.appendChild(button);
          return item;
        }}));
      }})
      .catch(function(e) {{ console.error('[sandpit] Failed to list files:', e); }});
  }}

  window.addEventListener('message', function(event) {{
    if (!frame || event.source !== frame.contentWindow) return;
    if (event.data && typeof event.data === 'object') {{
      send({{ kind: 'bridge', message: event.data }});
    }}
  }});

  refreshBtn.onclick = function() {{ send({{ kind: 'refresh' }}); }};

  function connect() {{
    ws = new WebSocket(wsUrl);

    ws.onopen = function() {{
      console.log('[sandpit] Connected');
      reconnectAttempts = 0;
    }};

    ws.onmessage = function(event) {{
      const msg = JSON.parse(event.data);

      switch (msg.kind) {{
        case 'status':
          renderStatus(msg.status);
          break;
        case 'mount':
          mount(msg.url);
          break;
        case 'unmount':
          unmount();
          break;
        case 'files_changed':
          loadFiles();
          break;
        case 'connected':
          console.log('[sandpit] Server acknowledged connection');
          break;
      }}
    }};

    ws.onclose = function() {{
      console.log('[sandpit] Disconnected');
      if (reconnectAttempts < maxReconnectAttempts) {{
        reconnectAttempts++;
        setTimeout(connect, 1000 * reconnectAttempts);
      }}
    }};

    ws.onerror = function(e) {{
      console.error('[sandpit] WebSocket error:', e);
    }};
  }}

  loadFiles();
  connect();
}})();
"#,
        bridge_path
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::PreviewState;
    use serde_json::json;

    fn idle() -> StatusView {
        StatusView {
            state: PreviewState::Idle,
            filename: None,
            identity: None,
            hints: Vec::new(),
        }
    }

    #[test]
    fn hub_broadcasts_messages() {
        let hub = StatusHub::new();
        let mut rx = hub.subscribe();

        hub.send(HostMessage::Unmount);

        match rx.try_recv() {
            Ok(HostMessage::Unmount) => {}
            _ => panic!("Expected Unmount message"),
        }
    }

    #[test]
    fn snapshot_tracks_latest_status_and_mount() {
        let hub = StatusHub::new();
        assert!(hub.snapshot().is_empty());

        hub.publish_status(idle());
        hub.send(HostMessage::Mount {
            execution: ExecutionId::new(1),
            url: "/sandbox/a?execution=1".to_string(),
        });
        hub.send(HostMessage::Mount {
            execution: ExecutionId::new(2),
            url: "/sandbox/b?execution=2".to_string(),
        });

        let snapshot = hub.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0], HostMessage::Status { status: idle() });
        assert!(matches!(
            &snapshot[1],
            HostMessage::Mount { execution, .. } if *execution == ExecutionId::new(2)
        ));

        hub.send(HostMessage::Unmount);
        assert_eq!(hub.snapshot().len(), 1);
    }

    #[test]
    fn serializes_messages() {
        let msg = HostMessage::Mount {
            execution: ExecutionId::new(4),
            url: "/sandbox/x?execution=4".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "kind": "mount", "execution": 4, "url": "/sandbox/x?execution=4" })
        );
        assert_eq!(
            serde_json::to_value(HostMessage::Status { status: idle() }).unwrap(),
            json!({ "kind": "status", "status": { "state": "idle", "filename": null, "identity": null } })
        );
    }

    #[test]
    fn parses_host_events() {
        let select: HostEvent = serde_json::from_str(r#"{"kind":"select","path":"a/B.jsx"}"#).unwrap();
        assert_eq!(
            select,
            HostEvent::Select {
                path: Some("a/B.jsx".to_string())
            }
        );

        let bridge: HostEvent =
            serde_json::from_str(r#"{"kind":"bridge","message":{"type":"sandbox-success"}}"#).unwrap();
        assert_eq!(
            bridge,
            HostEvent::Bridge {
                message: json!({ "type": "sandbox-success" })
            }
        );

        assert!(serde_json::from_str::<HostEvent>(r#"{"kind":"reload"}"#).is_err());
    }

    #[test]
    fn script_targets_bridge_path() {
        let script = host_client_script("/__bridge");
        assert!(script.contains("location.host + '/__bridge'"));
        assert!(script.contains("frame.setAttribute('sandbox', 'allow-scripts');"));
        assert!(!script.contains("allow-same-origin"));
    }

    #[test]
    fn script_only_forwards_messages_from_the_boundary() {
        let script = host_client_script("/__bridge");
        assert!(script.contains("event.source !== frame.contentWindow"));
    }

    #[test]
    fn script_keeps_refresh_available_while_executing() {
        let script = host_client_script("/__bridge");
        assert!(script.contains("refreshBtn.disabled = status.state === 'idle';"));
        assert!(!script.contains("status.state === 'executing';"));
    }
}
