use clap::Parser;
use pilot::agent::AgentEvent;
use pilot::api::DocumentKind;
use pilot::config::{Cli, Command, Config};
use pilot::logging;
use pilot::protocol::Role;
use pilot::render::render_turn;
use pilot::session::SessionEvent;
use pilot::ui::{self, App};
use pilot::workspace::Workspace;
use std::io::Write;
use tracing::info;

type MainResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> MainResult {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => chat(&cli.config).await,
        Command::Models => {
            logging::init_stderr()?;
            models(&cli.config).await
        }
        Command::Index => {
            logging::init_stderr()?;
            index(&cli.config).await
        }
        Command::Ask { message } => {
            logging::init_stderr()?;
            ask(&cli.config, &message.join(" ")).await
        }
        Command::Agent { goal } => {
            logging::init_stderr()?;
            agent(&cli.config, &goal.join(" ")).await
        }
    }
}

async fn chat(config: &Config) -> MainResult {
    let log_path = config
        .log_file
        .clone()
        .unwrap_or_else(logging::default_log_path);
    logging::init_file(&log_path)?;
    info!(base_url = %config.base_url, "starting interactive session");

    let (mut workspace, events) = Workspace::connect(config)?;
    let failures = workspace.bootstrap().await;
    let model = workspace.session.model().await;

    let mut app = App::new(workspace, events, model).with_startup_messages(failures);
    let result = tokio::task::block_in_place(|| ui::run_tui(&mut app));
    app.teardown().await;
    result
}

async fn models(config: &Config) -> MainResult {
    let (workspace, _events) = Workspace::connect(config)?;
    for model in workspace.session.load_models().await? {
        println!("{model}");
    }
    Ok(())
}

async fn index(config: &Config) -> MainResult {
    let (workspace, _events) = Workspace::connect(config)?;
    println!("Indexing...");
    match workspace.session.index_codebase().await {
        Ok(true) => println!("Indexing complete!"),
        Ok(false) => println!("Indexing failed."),
        Err(err) => {
            println!("Indexing failed.");
            return Err(err.into());
        }
    }
    Ok(())
}

async fn ask(config: &Config, message: &str) -> MainResult {
    let (workspace, mut events) = Workspace::connect(config)?;
    if config.model.is_none() {
        workspace.session.load_models().await?;
    }

    let printer = tokio::spawn(async move {
        let mut printed = 0;
        let mut failed = false;
        let mut stdout = std::io::stdout();
        while let Some(event) = events.session.recv().await {
            match event {
                SessionEvent::StreamUpdated(text) => {
                    if let Some(delta) = text.get(printed..) {
                        let _ = write!(stdout, "{delta}");
                        let _ = stdout.flush();
                    }
                    printed = text.len();
                }
                SessionEvent::StreamCommitted(_) => {
                    let _ = writeln!(stdout);
                }
                SessionEvent::TurnAppended(turn) if turn.role != Role::User => {
                    let _ = writeln!(stdout, "{}", render_turn(&turn).body);
                }
                SessionEvent::HistoryReplaced(turns) => {
                    if let Some(turn) = turns.last() {
                        let _ = writeln!(stdout, "{}", render_turn(turn).body);
                    }
                }
                SessionEvent::StreamFailed(message)
                | SessionEvent::Error(message)
                | SessionEvent::Warning(message) => {
                    eprintln!("{message}");
                    failed = true;
                }
                _ => {}
            }
        }
        failed
    });

    let sent = workspace.session.send(message).await;
    drop(workspace);
    let failed = printer.await?;

    sent?;
    if failed {
        return Err("request failed".into());
    }
    Ok(())
}

async fn agent(config: &Config, goal: &str) -> MainResult {
    let (mut workspace, mut events) = Workspace::connect(config)?;
    let model = match config.model.clone() {
        Some(model) => model,
        None => {
            workspace.models = workspace.session.load_models().await?;
            workspace.models.first().cloned().ok_or("the backend lists no models")?
        }
    };

    workspace.agent.start(goal, &model).await?;
    eprintln!("Agent started. Press Ctrl-C to stop it.");

    let mut last_progress = None;
    loop {
        tokio::select! {
            event = events.agent.recv() => match event {
                Some(AgentEvent::Progress(text)) => {
                    if last_progress.as_ref() != Some(&text) {
                        eprintln!("status: {text}");
                        last_progress = Some(text);
                    }
                }
                Some(AgentEvent::ConfirmationRequested(prompt)) => {
                    eprintln!("agent asks: {prompt} (answer from the interactive client)");
                }
                Some(AgentEvent::PollFailed(err)) => eprintln!("poll failed: {err}"),
                Some(AgentEvent::Completed) | Some(AgentEvent::Stopped) | None => break,
                Some(_) => {}
            },
            _ = tokio::signal::ctrl_c() => {
                eprintln!("Stopping agent...");
                if let Err(err) = workspace.agent.stop().await {
                    eprintln!("stop request failed: {err}");
                }
                break;
            }
        }
    }

    for kind in [DocumentKind::MainPlan, DocumentKind::Scratchpad] {
        let document = workspace.documents.get(kind);
        println!("== {} ==\n{}\n", kind.label(), document.content);
    }
    Ok(())
}
