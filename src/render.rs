use crate::protocol::{Part, Role, Turn};
use crate::session::SessionEvent;
use serde_json::Value;

pub type MarkdownRenderer = fn(&str) -> String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    UserText,
    ModelText,
    ToolCall,
    ToolResult,
    Error,
}

/// View-independent rendering of one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNode {
    pub kind: NodeKind,
    pub label: Option<String>,
    pub body: String,
    /// Markdown output for model text; `None` for plain blocks.
    pub html: Option<String>,
    pub collapsible: bool,
    pub open: bool,
    /// Set while the node mirrors an in-flight streaming reply.
    pub pending: bool,
}

impl RenderedNode {
    fn plain(kind: NodeKind, body: String) -> Self {
        Self {
            kind,
            label: None,
            body,
            html: None,
            collapsible: false,
            open: true,
            pending: false,
        }
    }

    fn collapsible(kind: NodeKind, label: String, body: String, open: bool) -> Self {
        Self {
            kind,
            label: Some(label),
            body,
            html: None,
            collapsible: true,
            open,
            pending: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::plain(NodeKind::Error, message.into())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    markdown: MarkdownRenderer,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            markdown: markdown::to_html,
        }
    }
}

impl Renderer {
    pub fn with_markdown(markdown: MarkdownRenderer) -> Self {
        Self { markdown }
    }

    /// One node per turn. Parallel tool calls or results in a single turn
    /// are folded into that turn's node.
    pub fn render_turn(&self, turn: &Turn) -> RenderedNode {
        let mut text = String::new();
        let mut calls = Vec::new();
        let mut results = Vec::new();
        for part in &turn.parts {
            match part {
                Part::Text(fragment) => text.push_str(fragment),
                Part::ToolCall { name, args } => calls.push((
                    name.as_str(),
                    serde_json::to_string_pretty(args).unwrap_or_else(|_| format!("{args:?}")),
                )),
                Part::ToolResult { name, result } => {
                    results.push((name.as_str(), raw_result(result)));
                }
            }
        }

        if !calls.is_empty() {
            let node = fold_tools(NodeKind::ToolCall, "Tool call", &calls, false);
            return with_leading_text(node, &text);
        }
        if !results.is_empty() {
            let node = fold_tools(NodeKind::ToolResult, "Tool result", &results, true);
            return with_leading_text(node, &text);
        }

        match turn.role {
            Role::Model => self.model_text(&text),
            _ => RenderedNode::plain(NodeKind::UserText, text),
        }
    }

    fn model_text(&self, text: &str) -> RenderedNode {
        let mut node = RenderedNode::plain(NodeKind::ModelText, text.to_string());
        node.html = Some((self.markdown)(text));
        node
    }
}

/// Render with the default markdown renderer.
pub fn render_turn(turn: &Turn) -> RenderedNode {
    Renderer::default().render_turn(turn)
}

// A single entry keeps its bare body; several are listed under their names.
fn fold_tools(
    kind: NodeKind,
    noun: &str,
    entries: &[(&str, String)],
    open: bool,
) -> RenderedNode {
    let names: Vec<&str> = entries.iter().map(|(name, _)| *name).collect();
    let (label, body) = match entries {
        [(name, body)] => (format!("{noun}: {name}"), body.clone()),
        _ => (
            format!("{noun}s: {}", names.join(", ")),
            entries
                .iter()
                .map(|(name, body)| format!("{name}:\n{body}"))
                .collect::<Vec<_>>()
                .join("\n\n"),
        ),
    };
    RenderedNode::collapsible(kind, label, body, open)
}

fn with_leading_text(mut node: RenderedNode, text: &str) -> RenderedNode {
    if !text.is_empty() {
        node.body = format!("{text}\n\n{}", node.body);
    }
    node
}

fn raw_result(result: &Value) -> String {
    match result {
        Value::String(text) => text.clone(),
        Value::Object(map) if map.len() == 1 => match map.get("result") {
            Some(Value::String(text)) => text.clone(),
            _ => result.to_string(),
        },
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptChange {
    Appended(usize),
    Updated(usize),
    Rebuilt,
    Unchanged,
}

/// Rendered nodes mirroring the conversation, driven by session events.
#[derive(Debug, Default)]
pub struct Transcript {
    renderer: Renderer,
    nodes: Vec<RenderedNode>,
    streaming: Option<usize>,
}

impl Transcript {
    pub fn new(renderer: Renderer) -> Self {
        Self {
            renderer,
            nodes: Vec::new(),
            streaming: None,
        }
    }

    pub fn nodes(&self) -> &[RenderedNode] {
        &self.nodes
    }

    pub fn streaming_node(&self) -> Option<&RenderedNode> {
        self.streaming.and_then(|index| self.nodes.get(index))
    }

    /// Clear and rebuild every node from `turns`.
    pub fn rebuild(&mut self, turns: &[Turn]) {
        self.nodes = turns.iter().map(|turn| self.renderer.render_turn(turn)).collect();
        self.streaming = None;
    }

    pub fn apply(&mut self, event: &SessionEvent) -> TranscriptChange {
        match event {
            SessionEvent::TurnAppended(turn) => self.push(self.renderer.render_turn(turn)),
            SessionEvent::HistoryReplaced(turns) => {
                self.rebuild(turns);
                TranscriptChange::Rebuilt
            }
            SessionEvent::StreamStarted => {
                let mut node = self.renderer.render_turn(&Turn::model(""));
                node.pending = true;
                let change = self.push(node);
                self.streaming = Some(self.nodes.len() - 1);
                change
            }
            SessionEvent::StreamUpdated(text) => {
                let mut node = self.renderer.render_turn(&Turn::model(text.as_str()));
                node.pending = true;
                self.replace_streaming(node, false)
            }
            SessionEvent::StreamCommitted(turn) => {
                let node = self.renderer.render_turn(turn);
                self.replace_streaming(node, true)
            }
            SessionEvent::StreamFailed(message) => {
                self.replace_streaming(RenderedNode::error(message.as_str()), true)
            }
            SessionEvent::Error(message) => self.push(RenderedNode::error(message.as_str())),
            SessionEvent::StateChanged(_) | SessionEvent::Warning(_) => TranscriptChange::Unchanged,
        }
    }

    fn push(&mut self, node: RenderedNode) -> TranscriptChange {
        self.nodes.push(node);
        TranscriptChange::Appended(self.nodes.len() - 1)
    }

    fn replace_streaming(&mut self, node: RenderedNode, settle: bool) -> TranscriptChange {
        let Some(index) = self.streaming else {
            return if settle {
                self.push(node)
            } else {
                TranscriptChange::Unchanged
            };
        };
        self.nodes[index] = node;
        if settle {
            self.streaming = None;
        }
        TranscriptChange::Updated(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn echo(text: &str) -> String {
        format!("<md>{text}</md>")
    }

    #[test]
    fn dispatches_on_role_and_part() {
        let renderer = Renderer::with_markdown(echo);
        let mut args = Map::new();
        args.insert("path".to_string(), json!("src"));

        let user = renderer.render_turn(&Turn::user("**hi**"));
        assert_eq!(user.kind, NodeKind::UserText);
        assert_eq!(user.body, "**hi**");
        assert_eq!(user.html, None);

        let model = renderer.render_turn(&Turn::model("**hi**"));
        assert_eq!(model.kind, NodeKind::ModelText);
        assert_eq!(model.html.as_deref(), Some("<md>**hi**</md>"));

        let call = renderer.render_turn(&Turn::tool_call("list_files", args));
        assert_eq!(call.kind, NodeKind::ToolCall);
        assert_eq!(call.label.as_deref(), Some("Tool call: list_files"));
        assert_eq!(call.body, "{\n  \"path\": \"src\"\n}");
        assert!(call.collapsible);
        assert!(!call.open);

        let result =
            renderer.render_turn(&Turn::tool_result("list_files", json!({"result": "a\nb"})));
        assert_eq!(result.kind, NodeKind::ToolResult);
        assert_eq!(result.label.as_deref(), Some("Tool result: list_files"));
        assert_eq!(result.body, "a\nb");
        assert!(result.collapsible);
        assert!(result.open);
    }

    #[test]
    fn default_renderer_produces_html() {
        let node = render_turn(&Turn::model("*hello*"));
        let html = node.html.expect("model text is rendered");
        assert!(html.contains("<em>hello</em>"), "{html}");
    }

    #[test]
    fn replaced_history_renders_one_node_per_turn_in_order() {
        let turns = vec![
            Turn::user("read the readme"),
            Turn::tool_call("read_file", Map::new()),
            Turn::tool_result("read_file", json!("# Title")),
            Turn::model("It has a title."),
        ];
        let mut transcript = Transcript::new(Renderer::with_markdown(echo));
        transcript.apply(&SessionEvent::TurnAppended(Turn::user("old")));

        let change = transcript.apply(&SessionEvent::HistoryReplaced(turns.clone()));

        assert_eq!(change, TranscriptChange::Rebuilt);
        let kinds: Vec<_> = transcript.nodes().iter().map(|node| node.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::UserText,
                NodeKind::ToolCall,
                NodeKind::ToolResult,
                NodeKind::ModelText
            ]
        );
        assert_eq!(transcript.nodes()[0].body, "read the readme");
        assert_eq!(transcript.nodes()[3].body, "It has a title.");
    }

    #[test]
    fn parallel_tool_parts_fold_into_their_turn_node() {
        let mut read_args = Map::new();
        read_args.insert("path".to_string(), json!("a.txt"));
        let calls = Turn {
            role: Role::Model,
            parts: vec![
                Part::ToolCall {
                    name: "read_file".to_string(),
                    args: read_args,
                },
                Part::ToolCall {
                    name: "list_files".to_string(),
                    args: Map::new(),
                },
            ],
        };
        let results = Turn {
            role: Role::Tool,
            parts: vec![
                Part::ToolResult {
                    name: "read_file".to_string(),
                    result: json!({"result": "A"}),
                },
                Part::ToolResult {
                    name: "list_files".to_string(),
                    result: json!({"result": "a.txt\nb.txt"}),
                },
            ],
        };
        let mut transcript = Transcript::new(Renderer::with_markdown(echo));

        transcript.apply(&SessionEvent::HistoryReplaced(vec![
            Turn::user("look around"),
            calls,
            results,
        ]));

        let nodes = transcript.nodes();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1].kind, NodeKind::ToolCall);
        assert_eq!(
            nodes[1].label.as_deref(),
            Some("Tool calls: read_file, list_files")
        );
        assert_eq!(
            nodes[1].body,
            "read_file:\n{\n  \"path\": \"a.txt\"\n}\n\nlist_files:\n{}"
        );
        assert!(!nodes[1].open);
        assert_eq!(nodes[2].kind, NodeKind::ToolResult);
        assert_eq!(
            nodes[2].label.as_deref(),
            Some("Tool results: read_file, list_files")
        );
        assert_eq!(nodes[2].body, "read_file:\nA\n\nlist_files:\na.txt\nb.txt");
        assert!(nodes[2].open);
    }

    #[test]
    fn model_text_parts_are_joined() {
        let turn = Turn {
            role: Role::Model,
            parts: vec![Part::Text("Hello, ".to_string()), Part::Text("world".to_string())],
        };

        let node = Renderer::with_markdown(echo).render_turn(&turn);

        assert_eq!(node.kind, NodeKind::ModelText);
        assert_eq!(node.body, "Hello, world");
    }

    #[test]
    fn streaming_reply_updates_a_single_node() {
        let mut transcript = Transcript::new(Renderer::with_markdown(echo));
        transcript.apply(&SessionEvent::TurnAppended(Turn::user("hello")));

        assert_eq!(transcript.apply(&SessionEvent::StreamStarted), TranscriptChange::Appended(1));
        assert_eq!(
            transcript.apply(&SessionEvent::StreamUpdated("Hi".to_string())),
            TranscriptChange::Updated(1)
        );
        assert_eq!(
            transcript.streaming_node().map(|node| node.body.as_str()),
            Some("Hi")
        );
        transcript.apply(&SessionEvent::StreamUpdated("Hi there".to_string()));
        transcript.apply(&SessionEvent::StreamCommitted(Turn::model("Hi there")));

        assert_eq!(transcript.nodes().len(), 2);
        assert_eq!(transcript.nodes()[1].body, "Hi there");
        assert!(!transcript.nodes()[1].pending);
        assert!(transcript.streaming_node().is_none());
    }

    #[test]
    fn stream_failure_replaces_the_pending_node() {
        let mut transcript = Transcript::new(Renderer::with_markdown(echo));
        transcript.apply(&SessionEvent::StreamStarted);
        transcript.apply(&SessionEvent::StreamUpdated("partial".to_string()));
        transcript.apply(&SessionEvent::StreamFailed("Error: connection reset".to_string()));

        assert_eq!(transcript.nodes().len(), 1);
        assert_eq!(transcript.nodes()[0].kind, NodeKind::Error);
        assert_eq!(transcript.nodes()[0].body, "Error: connection reset");
    }
}
