use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, MINT_COMMAND, MINT_FIELDS, NO_ARG_COMMANDS, RAW_ARG_COMMANDS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub prompt: Option<String>,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            prompt: None,
            command_args: BTreeMap::new(),
        }
    }

    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.command_args.get(key).and_then(Value::as_str)
    }
}

fn find_spec(command: &str, specs: &[CommandSpec]) -> Option<CommandSpec> {
    specs.iter().find(|spec| spec.command == command).copied()
}

/// Split `/cmd rest` into a lowercased command name and its trimmed argument.
fn split_command(line: &str) -> Option<(String, &str)> {
    let tail = line.strip_prefix('/')?;
    let end = tail
        .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
        .unwrap_or(tail.len());
    if end == 0 {
        return None;
    }
    Some((tail[..end].to_ascii_lowercase(), tail[end..].trim()))
}

fn mint_intent(arg: &str, raw: &str) -> Intent {
    if arg.is_empty() {
        return Intent::new("mint", raw);
    }
    let fields = match shell_words::split(arg) {
        Ok(parts) if parts.len() == MINT_FIELDS.len() => parts,
        _ => return Intent::new("mint_usage", raw),
    };
    let mut intent = Intent::new("mint", raw);
    for (key, value) in MINT_FIELDS.iter().zip(fields) {
        intent.command_args.insert((*key).to_string(), Value::String(value));
    }
    intent
}

/// Parse one line of chat input.
///
/// Lines starting with `/` are commands; anything else is a prompt to
/// generate from.
pub fn parse_intent(text: &str) -> Intent {
    let line = text.trim();
    if line.is_empty() {
        return Intent::new("noop", text);
    }

    let Some((command, arg)) = split_command(line) else {
        let mut intent = Intent::new("generate", text);
        intent.prompt = Some(line.to_string());
        return intent;
    };

    if command == MINT_COMMAND {
        return mint_intent(arg, text);
    }
    if let Some(spec) = find_spec(&command, NO_ARG_COMMANDS) {
        return Intent::new(spec.action, text);
    }
    let (action, key, command_args) = match find_spec(&command, RAW_ARG_COMMANDS) {
        Some(spec) => (spec.action, spec.arg_key, Vec::new()),
        None => ("unknown", "arg", vec![("command", command)]),
    };
    let mut intent = Intent::new(action, text);
    intent
        .command_args
        .insert(key.to_string(), Value::String(arg.to_string()));
    for (key, value) in command_args {
        intent.command_args.insert(key.to_string(), Value::String(value));
    }
    intent
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::parse_intent;

    #[test]
    fn blank_line_is_noop() {
        assert_eq!(parse_intent("   ").action, "noop");
        assert_eq!(parse_intent("").action, "noop");
    }

    #[test]
    fn plain_text_is_a_prompt() {
        let intent = parse_intent("  a red sunset over the sea \n");
        assert_eq!(intent.action, "generate");
        assert_eq!(intent.prompt.as_deref(), Some("a red sunset over the sea"));
    }

    #[test]
    fn parse_form_field_commands() {
        let name = parse_intent("/name  Sunset Study ");
        assert_eq!(name.action, "set_name");
        assert_eq!(name.command_args["name"], json!("Sunset Study"));

        let description = parse_intent("/description A red sunset, oil style");
        assert_eq!(description.action, "set_description");
        assert_eq!(description.arg_str("description"), Some("A red sunset, oil style"));

        let address = parse_intent("/ADDRESS 0x627306090abaB3A6e1400e9345bC60c78a8BEf57");
        assert_eq!(address.action, "set_address");
        assert_eq!(
            address.command_args["address"],
            json!("0x627306090abaB3A6e1400e9345bC60c78a8BEf57")
        );
    }

    #[test]
    fn parse_mint_without_args_uses_session_form() {
        let intent = parse_intent("/mint");
        assert_eq!(intent.action, "mint");
        assert!(intent.command_args.is_empty());
    }

    #[test]
    fn parse_mint_quoted_args() {
        let intent = parse_intent(
            "/mint \"Sunset Study\" \"A red sunset\" 0x627306090abaB3A6e1400e9345bC60c78a8BEf57",
        );
        assert_eq!(intent.action, "mint");
        assert_eq!(intent.command_args["name"], json!("Sunset Study"));
        assert_eq!(intent.command_args["description"], json!("A red sunset"));
        assert_eq!(
            intent.command_args["address"],
            json!("0x627306090abaB3A6e1400e9345bC60c78a8BEf57")
        );
    }

    #[test]
    fn parse_mint_wrong_arity_asks_for_usage() {
        assert_eq!(parse_intent("/mint only-a-name").action, "mint_usage");
        assert_eq!(parse_intent("/mint a b c d").action, "mint_usage");
        assert_eq!(
            parse_intent("/mint \"Sunset A red sunset 0x627306090abaB3A6e1400e9345bC60c78a8BEf57").action,
            "mint_usage"
        );
    }

    #[test]
    fn parse_no_arg_commands() {
        assert_eq!(parse_intent("/reset").action, "reset");
        assert_eq!(parse_intent("/restart").action, "restart");
        assert_eq!(parse_intent("/status").action, "status");
        assert_eq!(parse_intent("/help").action, "help");
        assert_eq!(parse_intent("/quit").action, "quit");
        assert_eq!(parse_intent("/exit").action, "quit");
    }

    #[test]
    fn parse_gateway_command() {
        let intent = parse_intent("/gateway ipfs://bafy/image.png");
        assert_eq!(intent.action, "gateway");
        assert_eq!(intent.command_args["uri"], json!("ipfs://bafy/image.png"));
    }

    #[test]
    fn parse_unknown_command() {
        let intent = parse_intent("/magic foo bar");
        assert_eq!(intent.action, "unknown");
        assert_eq!(intent.command_args["command"], json!("magic"));
        assert_eq!(intent.command_args["arg"], json!("foo bar"));
    }

    #[test]
    fn lone_slash_is_a_prompt() {
        let intent = parse_intent("/ what is this");
        assert_eq!(intent.action, "generate");
        assert_eq!(intent.prompt.as_deref(), Some("/ what is this"));
    }
}
