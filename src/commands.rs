#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Fix(String),
    Agent(String),
    Stop,
    Index,
    Model(Option<String>),
    Plan(Option<String>),
    Scratchpad(Option<String>),
    Sync,
    Approve,
    Deny,
    AutoApprove,
    Quit,
    Unknown(String),
}

pub const HELP_TEXT: &str = "Commands: /fix <error>, /agent <goal>, /stop, /index, /model [name], \
/plan [text], /scratchpad [text], /sync, /approve, /deny, /auto, /help, /quit";

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (command, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (trimmed, ""),
    };
    let argument = (!rest.is_empty()).then(|| rest.to_string());

    let parsed = match command {
        "/help" => SlashCommand::Help,
        "/fix" => SlashCommand::Fix(rest.to_string()),
        "/agent" => SlashCommand::Agent(rest.to_string()),
        "/stop" => SlashCommand::Stop,
        "/index" => SlashCommand::Index,
        "/model" => SlashCommand::Model(argument),
        "/plan" => SlashCommand::Plan(argument),
        "/scratchpad" => SlashCommand::Scratchpad(argument),
        "/sync" => SlashCommand::Sync,
        "/approve" => SlashCommand::Approve,
        "/deny" => SlashCommand::Deny,
        "/auto" => SlashCommand::AutoApprove,
        "/quit" | "/exit" => SlashCommand::Quit,
        _ => SlashCommand::Unknown(command.to_string()),
    };

    Some(parsed)
}
