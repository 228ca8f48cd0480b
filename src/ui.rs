use crate::agent::{AgentEvent, AgentStatus};
use crate::api::DocumentKind;
use crate::commands::{HELP_TEXT, SlashCommand, parse_slash_command};
use crate::error::ClientError;
use crate::render::{NodeKind, RenderedNode, Transcript, TranscriptChange};
use crate::session::{SessionEvent, SessionState};
use crate::workspace::{Workspace, WorkspaceEvents};
use crossterm::cursor::MoveTo;
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, size};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Widget, Wrap};
use ratatui::{Frame, Terminal, TerminalOptions, Viewport};
use std::future::Future;
use std::io;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;

type TuiTerminal = Terminal<CrosstermBackend<io::Stdout>>;
type TuiResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const PREVIEW_HEIGHT: u16 = 6;
const STATUS_HEIGHT: u16 = 1;
const INPUT_HEIGHT: u16 = 5;

// Restores terminal settings even if the loop exits early.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Self {
        Self
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = io::stdout().flush();
    }
}

#[derive(Debug, Clone)]
struct LineSpec {
    text: String,
    style: Style,
}

impl LineSpec {
    fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

fn header_and_body(header: String, body: &str, color: Color) -> Vec<LineSpec> {
    let header_style = Style::default().fg(color).add_modifier(Modifier::BOLD);
    let body_style = Style::default().fg(color);
    let mut lines = vec![LineSpec::new(header, header_style)];
    for line in body.lines() {
        lines.push(LineSpec::new(format!("  {}", line), body_style));
    }
    lines
}

fn node_lines(node: &RenderedNode) -> Vec<LineSpec> {
    let label = node.label.clone().unwrap_or_default();
    match node.kind {
        NodeKind::UserText => header_and_body("You:".to_string(), &node.body, Color::Blue),
        NodeKind::ModelText => header_and_body("Model:".to_string(), &node.body, Color::Yellow),
        NodeKind::ToolCall | NodeKind::ToolResult => {
            let color = if node.kind == NodeKind::ToolCall {
                Color::Green
            } else {
                Color::Cyan
            };
            let body = truncate(&node.body, 300, "...\n[output truncated]");
            if node.open {
                header_and_body(format!("▾ {}", label), &body, color)
            } else {
                // Closed blocks still show their arguments, dimmed.
                let mut lines = vec![LineSpec::new(
                    format!("▸ {}", label),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                )];
                let dimmed = Style::default().fg(Color::DarkGray);
                lines.extend(body.lines().map(|line| LineSpec::new(format!("  {}", line), dimmed)));
                lines
            }
        }
        NodeKind::Error => vec![LineSpec::new(
            node.body.clone(),
            Style::default().fg(Color::Red),
        )],
    }
}

fn info_lines(message: &str, color: Color) -> Vec<LineSpec> {
    let style = Style::default().fg(color).add_modifier(Modifier::ITALIC);
    message
        .lines()
        .enumerate()
        .map(|(index, line)| {
            let prefix = if index == 0 { "ℹ " } else { "  " };
            LineSpec::new(format!("{}{}", prefix, line), style)
        })
        .collect()
}

fn truncate(value: &str, max: usize, suffix: &str) -> String {
    match value.char_indices().nth(max) {
        Some((end, _)) => format!("{}{}", &value[..end], suffix),
        None => value.to_string(),
    }
}

fn rendered_height(lines: &[LineSpec], width: u16) -> u16 {
    let width = width.max(1) as usize;
    let mut total = 0usize;
    for line in lines {
        let len = line.text.chars().count().max(1);
        total += len.div_ceil(width);
    }
    total as u16
}

/// How much of the transcript has been inserted into scrollback.
#[derive(Debug, Default)]
struct Scrollback {
    printed: usize,
}

impl Scrollback {
    /// Record a transcript change. Returns true when already printed nodes
    /// were invalidated and the history must be reprinted.
    fn observe(&mut self, change: TranscriptChange) -> bool {
        if change != TranscriptChange::Rebuilt {
            return false;
        }
        let reprint = self.printed > 0;
        self.printed = 0;
        reprint
    }

    /// Settled nodes not printed yet; stops at the streaming node.
    fn unprinted<'a>(&self, nodes: &'a [RenderedNode]) -> &'a [RenderedNode] {
        let rest = nodes.get(self.printed..).unwrap_or_default();
        let settled = rest.iter().take_while(|node| !node.pending).count();
        &rest[..settled]
    }

    fn advance(&mut self, count: usize) {
        self.printed += count;
    }
}

/// Results of background tasks started from the keyboard.
#[derive(Debug)]
enum UiNotice {
    Info(String),
    Warning(String),
    Indexing(String),
}

struct InputBuffer {
    lines: Vec<String>,
    cursor_x: usize,
    cursor_y: usize,
}

impl InputBuffer {
    fn new() -> Self {
        Self {
            lines: vec![String::new()],
            cursor_x: 0,
            cursor_y: 0,
        }
    }

    fn clear(&mut self) {
        self.lines = vec![String::new()];
        self.cursor_x = 0;
        self.cursor_y = 0;
    }

    fn byte_index(line: &str, cursor: usize) -> usize {
        line.char_indices()
            .nth(cursor)
            .map(|(index, _)| index)
            .unwrap_or(line.len())
    }

    fn line_len(&self, y: usize) -> usize {
        self.lines[y].chars().count()
    }

    fn insert_char(&mut self, c: char) {
        let line = &mut self.lines[self.cursor_y];
        let index = Self::byte_index(line, self.cursor_x);
        line.insert(index, c);
        self.cursor_x += 1;
    }

    fn delete_char(&mut self) {
        if self.cursor_x > 0 {
            let line = &mut self.lines[self.cursor_y];
            let index = Self::byte_index(line, self.cursor_x - 1);
            line.remove(index);
            self.cursor_x -= 1;
        } else if self.cursor_y > 0 {
            let removed = self.lines.remove(self.cursor_y);
            self.cursor_y -= 1;
            self.cursor_x = self.line_len(self.cursor_y);
            self.lines[self.cursor_y].push_str(&removed);
        }
    }

    fn new_line(&mut self) {
        let line = &self.lines[self.cursor_y];
        let remaining: String = line.chars().skip(self.cursor_x).collect();
        self.lines[self.cursor_y] = line.chars().take(self.cursor_x).collect();
        self.lines.insert(self.cursor_y + 1, remaining);
        self.cursor_y += 1;
        self.cursor_x = 0;
    }

    fn move_left(&mut self) {
        if self.cursor_x > 0 {
            self.cursor_x -= 1;
        } else if self.cursor_y > 0 {
            self.cursor_y -= 1;
            self.cursor_x = self.line_len(self.cursor_y);
        }
    }

    fn move_right(&mut self) {
        if self.cursor_x < self.line_len(self.cursor_y) {
            self.cursor_x += 1;
        } else if self.cursor_y < self.lines.len() - 1 {
            self.cursor_y += 1;
            self.cursor_x = 0;
        }
    }

    fn move_up(&mut self) {
        if self.cursor_y > 0 {
            self.cursor_y -= 1;
            self.cursor_x = self.cursor_x.min(self.line_len(self.cursor_y));
        }
    }

    fn move_down(&mut self) {
        if self.cursor_y < self.lines.len() - 1 {
            self.cursor_y += 1;
            self.cursor_x = self.cursor_x.min(self.line_len(self.cursor_y));
        }
    }

    fn to_string(&self) -> String {
        self.lines.join("\n")
    }

    fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.is_empty())
    }

    fn render(&self) -> Text<'static> {
        if self.is_empty() {
            return Text::from(Span::styled(
                "Type a message, or /help for commands...",
                Style::default().fg(Color::DarkGray),
            ));
        }
        Text::from(
            self.lines
                .iter()
                .map(|l| Line::from(l.clone()))
                .collect::<Vec<_>>(),
        )
    }
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

pub struct App {
    workspace: Workspace,
    events: WorkspaceEvents,
    transcript: Transcript,
    scrollback: Scrollback,
    input: InputBuffer,
    notices: mpsc::UnboundedSender<UiNotice>,
    notice_receiver: mpsc::UnboundedReceiver<UiNotice>,
    session_state: SessionState,
    agent_status: AgentStatus,
    agent_progress: Option<String>,
    index_status: Option<String>,
    model: Option<String>,
    startup_messages: Vec<String>,
    should_quit: bool,
}

impl App {
    pub fn new(workspace: Workspace, events: WorkspaceEvents, model: Option<String>) -> Self {
        let (notices, notice_receiver) = mpsc::unbounded_channel();

        Self {
            workspace,
            events,
            transcript: Transcript::default(),
            scrollback: Scrollback::default(),
            input: InputBuffer::new(),
            notices,
            notice_receiver,
            session_state: SessionState::Idle,
            agent_status: AgentStatus::Idle,
            agent_progress: None,
            index_status: None,
            model,
            startup_messages: Vec::new(),
            should_quit: false,
        }
    }

    pub fn with_startup_messages(mut self, messages: Vec<String>) -> Self {
        self.startup_messages = messages;
        self
    }

    /// Stop polling before the runtime goes away.
    pub async fn teardown(&self) {
        self.workspace.agent.teardown().await;
    }

    fn status_text(&self) -> String {
        let mut parts = vec![format!(
            "model: {}",
            self.model.as_deref().unwrap_or("none")
        )];
        match self.session_state {
            SessionState::Idle => {}
            SessionState::AwaitingReply => parts.push("Thinking...".to_string()),
            SessionState::Streaming => parts.push("Streaming...".to_string()),
        }
        if self.agent_status == AgentStatus::Running {
            let progress = self.agent_progress.as_deref().unwrap_or("starting");
            parts.push(format!("agent: {}", progress));
        }
        if let Some(index) = &self.index_status {
            parts.push(index.clone());
        }
        parts.join(" | ")
    }

    fn draw(&mut self, f: &mut Frame) {
        let [preview_area, status_area, input_area] = Layout::vertical([
            Constraint::Length(PREVIEW_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
            Constraint::Length(INPUT_HEIGHT),
        ])
        .areas(f.area());

        if let Some(node) = self.transcript.streaming_node() {
            let lines: Vec<&str> = node.body.lines().collect();
            let visible = PREVIEW_HEIGHT as usize - 1;
            let start = lines.len().saturating_sub(visible);
            let mut text = vec![Line::from(Span::styled(
                "Model:",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ))];
            text.extend(lines[start..].iter().map(|line| {
                Line::from(Span::styled(
                    format!("  {}", line),
                    Style::default().fg(Color::Yellow),
                ))
            }));
            f.render_widget(Paragraph::new(text), preview_area);
        }

        f.render_widget(
            Paragraph::new(Span::styled(
                self.status_text(),
                Style::default().fg(Color::DarkGray),
            )),
            status_area,
        );

        let input_paragraph = Paragraph::new(self.input.render())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Input (Enter to send, Shift+Enter for newline, Esc to quit) ")
                    .border_style(Style::default().fg(Color::DarkGray)),
            )
            .wrap(Wrap { trim: false });

        f.render_widget(input_paragraph, input_area);

        let cursor_x = (self.input.cursor_x + 1) as u16;
        let cursor_y = self.input.cursor_y as u16;
        let x = (input_area.x + cursor_x).min(input_area.x + input_area.width - 2);
        let y = (input_area.y + 1 + cursor_y).min(input_area.y + input_area.height - 2);
        f.set_cursor_position((x, y));
    }

    fn insert_lines(&self, terminal: &mut TuiTerminal, lines: Vec<LineSpec>) -> TuiResult<()> {
        let width = terminal.size()?.width;
        let height = rendered_height(&lines, width).saturating_add(1);
        let mut text = Text::from(
            lines
                .into_iter()
                .map(|spec| Line::from(Span::styled(spec.text, spec.style)))
                .collect::<Vec<_>>(),
        );
        text.extend(Text::raw("\n"));
        // Insert above the inline viewport so the log stays in scrollback.
        terminal.insert_before(height, |buf| {
            let paragraph = Paragraph::new(text).wrap(Wrap { trim: false });
            paragraph.render(buf.area, buf);
        })?;
        Ok(())
    }

    fn info(&self, terminal: &mut TuiTerminal, message: &str) -> TuiResult<()> {
        self.insert_lines(terminal, info_lines(message, Color::Gray))
    }

    fn warn(&self, terminal: &mut TuiTerminal, message: &str) -> TuiResult<()> {
        self.insert_lines(terminal, info_lines(message, Color::Magenta))
    }

    // Scrollback is append-only: print settled nodes not printed yet, and
    // reprint everything after a divider when the server rewrote history.
    fn flush_transcript(
        &mut self,
        terminal: &mut TuiTerminal,
        change: TranscriptChange,
    ) -> TuiResult<()> {
        if self.scrollback.observe(change) {
            self.insert_lines(
                terminal,
                vec![LineSpec::new(
                    "── conversation history replaced by the server ──",
                    Style::default().fg(Color::DarkGray),
                )],
            )?;
        }

        let lines: Vec<Vec<LineSpec>> = self
            .scrollback
            .unprinted(self.transcript.nodes())
            .iter()
            .map(node_lines)
            .collect();
        self.scrollback.advance(lines.len());
        for node in lines {
            self.insert_lines(terminal, node)?;
        }
        Ok(())
    }

    fn handle_session_event(
        &mut self,
        terminal: &mut TuiTerminal,
        event: SessionEvent,
    ) -> TuiResult<()> {
        match &event {
            SessionEvent::StateChanged(state) => self.session_state = *state,
            SessionEvent::Warning(message) => self.warn(terminal, message)?,
            _ => {}
        }
        let change = self.transcript.apply(&event);
        self.flush_transcript(terminal, change)
    }

    fn handle_agent_event(
        &mut self,
        terminal: &mut TuiTerminal,
        event: AgentEvent,
    ) -> TuiResult<()> {
        match event {
            AgentEvent::StatusChanged(status) => {
                self.agent_status = status;
                if status == AgentStatus::Idle {
                    self.agent_progress = None;
                }
            }
            AgentEvent::Progress(text) => self.agent_progress = Some(text),
            AgentEvent::DocumentsRefreshed => {}
            AgentEvent::ConfirmationRequested(prompt) => self.info(
                terminal,
                &format!("Agent asks: {}\nAnswer with /approve or /deny.", prompt),
            )?,
            AgentEvent::Completed => self.info(terminal, "Agent run complete.")?,
            AgentEvent::Stopped => self.info(terminal, "Agent stopped.")?,
            AgentEvent::PollFailed(err) => {
                self.agent_progress = Some(format!("poll failed: {}", err))
            }
            AgentEvent::Warning(message) => self.warn(terminal, &message)?,
        }
        Ok(())
    }

    fn handle_notice(&mut self, terminal: &mut TuiTerminal, notice: UiNotice) -> TuiResult<()> {
        match notice {
            UiNotice::Info(message) => self.info(terminal, &message),
            UiNotice::Warning(message) => self.warn(terminal, &message),
            UiNotice::Indexing(status) => {
                self.index_status = Some(status);
                Ok(())
            }
        }
    }

    fn spawn_reporting<F>(&self, task: F)
    where
        F: Future<Output = Result<Option<String>, String>> + Send + 'static,
    {
        let notices = self.notices.clone();
        tokio::spawn(async move {
            let notice = match task.await {
                Ok(Some(message)) => UiNotice::Info(message),
                Ok(None) => return,
                Err(message) => UiNotice::Warning(message),
            };
            let _ = notices.send(notice);
        });
    }

    fn submit(&mut self, terminal: &mut TuiTerminal) -> TuiResult<()> {
        let text = self.input.to_string();
        if text.trim().is_empty() {
            return Ok(());
        }

        if let Some(command) = parse_slash_command(&text) {
            self.input.clear();
            return self.run_command(terminal, command);
        }

        if self.session_state != SessionState::Idle {
            return self.warn(terminal, "A reply is still in flight.");
        }

        self.input.clear();
        let session = self.workspace.session.clone();
        tokio::spawn(async move {
            // Rejections arrive as session warnings.
            let _ = session.send(&text).await;
        });
        Ok(())
    }

    fn run_command(&mut self, terminal: &mut TuiTerminal, command: SlashCommand) -> TuiResult<()> {
        match command {
            SlashCommand::Help => self.info(terminal, HELP_TEXT)?,
            SlashCommand::Fix(description) => {
                let session = self.workspace.session.clone();
                tokio::spawn(async move {
                    let _ = session.fix_error(&description).await;
                });
            }
            SlashCommand::Agent(goal) => {
                let Some(model) = self.model.clone() else {
                    return self.warn(terminal, "Select a model first with /model <name>.");
                };
                let agent = self.workspace.agent.clone();
                self.spawn_reporting(async move {
                    agent
                        .start(&goal, &model)
                        .await
                        .map(|()| Some(format!("Agent started: {}", goal)))
                        .or_else(client_failure)
                });
            }
            SlashCommand::Stop => {
                let agent = self.workspace.agent.clone();
                self.spawn_reporting(async move {
                    agent.stop().await.map(|()| None).or_else(client_failure)
                });
            }
            SlashCommand::Index => {
                self.index_status = Some("Indexing...".to_string());
                let session = self.workspace.session.clone();
                let notices = self.notices.clone();
                tokio::spawn(async move {
                    let status = match session.index_codebase().await {
                        Ok(true) => "Indexing complete!",
                        _ => "Indexing failed.",
                    };
                    let _ = notices.send(UiNotice::Indexing(status.to_string()));
                });
            }
            SlashCommand::Model(None) => {
                let listing = if self.workspace.models.is_empty() {
                    "No models loaded.".to_string()
                } else {
                    self.workspace
                        .models
                        .iter()
                        .map(|model| {
                            let marker = if Some(model) == self.model.as_ref() { "*" } else { " " };
                            format!("{} {}", marker, model)
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                };
                self.info(terminal, &listing)?;
            }
            SlashCommand::Model(Some(name)) => {
                self.model = Some(name.clone());
                let session = self.workspace.session.clone();
                self.spawn_reporting(async move {
                    session.set_model(name.clone()).await;
                    Ok(Some(format!("Model set to {}", name)))
                });
            }
            SlashCommand::Plan(content) => {
                self.document(terminal, DocumentKind::MainPlan, content)?
            }
            SlashCommand::Scratchpad(content) => {
                self.document(terminal, DocumentKind::Scratchpad, content)?
            }
            SlashCommand::Sync => {
                let documents = self.workspace.documents.clone();
                self.spawn_reporting(async move {
                    documents
                        .push_all()
                        .await
                        .map(|()| Some("Scratchpad and plan pushed.".to_string()))
                        .map_err(|err| format!("Sync failed: {}", err))
                });
            }
            SlashCommand::Approve => self.answer_confirmation("approve"),
            SlashCommand::Deny => self.answer_confirmation("deny"),
            SlashCommand::AutoApprove => {
                let agent = self.workspace.agent.clone();
                self.spawn_reporting(async move {
                    agent
                        .toggle_auto_approve()
                        .await
                        .map(|enabled| {
                            Some(format!("Auto-approve {}.", if enabled { "on" } else { "off" }))
                        })
                        .or_else(client_failure)
                });
            }
            SlashCommand::Quit => self.should_quit = true,
            SlashCommand::Unknown(command) => {
                self.warn(terminal, &format!("Unknown command {}. {}", command, HELP_TEXT))?
            }
        }
        Ok(())
    }

    fn answer_confirmation(&self, answer: &'static str) {
        let agent = self.workspace.agent.clone();
        self.spawn_reporting(async move {
            agent
                .respond_to_confirmation(answer)
                .await
                .map(|()| Some(format!("Sent {}.", answer)))
                .or_else(client_failure)
        });
    }

    // Showing reads the cache; replacing is an edit followed by a blur.
    fn document(
        &mut self,
        terminal: &mut TuiTerminal,
        kind: DocumentKind,
        content: Option<String>,
    ) -> TuiResult<()> {
        let Some(content) = content else {
            let document = self.workspace.documents.get(kind);
            let body = if document.content.is_empty() {
                "(empty)".to_string()
            } else {
                document.content
            };
            return self.insert_lines(
                terminal,
                header_and_body(format!("{}:", kind.label()), &body, Color::Magenta),
            );
        };

        let documents = self.workspace.documents.clone();
        self.spawn_reporting(async move {
            let saved = match documents.edit(kind, content).await {
                Ok(()) => documents.blur(kind).await,
                Err(err) => Err(err),
            };
            saved
                .map(|()| Some(format!("{} updated.", kind.label())))
                .map_err(|err| format!("Could not save {}: {}", kind.label(), err))
        });
        Ok(())
    }

    fn handle_events(&mut self, terminal: &mut TuiTerminal) -> TuiResult<bool> {
        for message in std::mem::take(&mut self.startup_messages) {
            self.warn(terminal, &message)?;
        }
        while let Ok(event) = self.events.session.try_recv() {
            self.handle_session_event(terminal, event)?;
        }
        while let Ok(event) = self.events.agent.try_recv() {
            self.handle_agent_event(terminal, event)?;
        }
        while let Ok(notice) = self.notice_receiver.try_recv() {
            self.handle_notice(terminal, notice)?;
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
                {
                    self.should_quit = true;
                    return Ok(false);
                }

                match key.code {
                    KeyCode::Esc => {
                        self.should_quit = true;
                        return Ok(false);
                    }
                    KeyCode::Enter => {
                        if key.modifiers.contains(KeyModifiers::SHIFT) {
                            self.input.new_line();
                        } else {
                            self.submit(terminal)?;
                        }
                    }
                    KeyCode::Char(c) => {
                        self.input.insert_char(c);
                    }
                    KeyCode::Backspace => {
                        self.input.delete_char();
                    }
                    KeyCode::Left => {
                        self.input.move_left();
                    }
                    KeyCode::Right => {
                        self.input.move_right();
                    }
                    KeyCode::Up => {
                        self.input.move_up();
                    }
                    KeyCode::Down => {
                        self.input.move_down();
                    }
                    KeyCode::Home => {
                        self.input.cursor_x = 0;
                    }
                    KeyCode::End => {
                        self.input.cursor_x = self.input.line_len(self.input.cursor_y);
                    }
                    _ => {}
                }
            }
        }

        Ok(!self.should_quit)
    }
}

// Validation failures were already surfaced by the controller.
fn client_failure(err: ClientError) -> Result<Option<String>, String> {
    match err {
        ClientError::Validation(_) => Ok(None),
        ClientError::Transport(err) => Err(format!("Error: {}", err)),
    }
}

pub fn run_tui(app: &mut App) -> TuiResult<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    let (_, rows) = size()?;
    if rows > 0 {
        // Push existing screen content into scrollback without clearing it.
        for _ in 0..rows {
            writeln!(stdout)?;
        }
        stdout.flush()?;
    }
    execute!(stdout, MoveTo(0, 0))?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::with_options(
        backend,
        TerminalOptions {
            viewport: Viewport::Inline(PREVIEW_HEIGHT + STATUS_HEIGHT + INPUT_HEIGHT),
        },
    )?;

    let _guard = TerminalGuard::new();

    terminal.draw(|f| app.draw(f))?;

    while !app.should_quit {
        if !app.handle_events(&mut terminal)? {
            break;
        }

        terminal.draw(|f| app.draw(f))?;

        std::thread::sleep(Duration::from_millis(10));
    }

    disable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.flush()?;

    Ok(())
}
