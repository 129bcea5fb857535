#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Mode(Option<String>),
    Edit(String),
    Create(String),
    Delete(String),
    Pending,
    Revert,
    History,
    Context,
    Clear,
    Quit,
    /// A known command given without its required argument; holds the usage line.
    Usage(&'static str),
    Unknown(String),
}

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (command, argument) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, Some(rest.trim()).filter(|rest| !rest.is_empty())),
        None => (trimmed, None),
    };
    let argument = argument.map(str::to_string);

    let parsed = match command {
        "/help" => SlashCommand::Help,
        "/mode" => SlashCommand::Mode(argument),
        "/edit" => argument.map_or(SlashCommand::Usage("/edit <path>"), SlashCommand::Edit),
        "/create" => argument.map_or(SlashCommand::Usage("/create <path>"), SlashCommand::Create),
        "/delete" => argument.map_or(SlashCommand::Usage("/delete <path>"), SlashCommand::Delete),
        "/pending" => SlashCommand::Pending,
        "/revert" => SlashCommand::Revert,
        "/history" => SlashCommand::History,
        "/context" => SlashCommand::Context,
        "/clear" => SlashCommand::Clear,
        "/quit" | "/exit" => SlashCommand::Quit,
        _ => SlashCommand::Unknown(command.to_string()),
    };

    Some(parsed)
}
