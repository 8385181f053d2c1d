/// A tool invocation parsed from an `Action:` field, resolved once into a
/// closed set so dispatch never matches on free-form strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolAction {
    Lookup { terms: String },
    Exchange { from: String, to: String },
    Unrecognized { verb: String, args: Vec<String> },
}

/// Parses `verb: arg1 arg2 ...`. A field without a verb separator is not
/// an action at all and the caller answers the completion directly.
pub fn parse_action(field: &str) -> Option<ToolAction> {
    let (verb, rest) = field.split_once(':')?;
    let verb = verb.trim().to_lowercase();
    if verb.is_empty() {
        return None;
    }

    let args: Vec<String> = rest
        .split_whitespace()
        .map(|arg| arg.trim_matches(|ch: char| ch == '.' || ch == ',').to_string())
        .filter(|arg| !arg.is_empty())
        .collect();

    let action = match verb.as_str() {
        "lookup" => ToolAction::Lookup {
            terms: args.join(" "),
        },
        "exchange" => match args.as_slice() {
            [from, to, ..] => ToolAction::Exchange {
                from: from.to_uppercase(),
                to: to.to_uppercase(),
            },
            _ => ToolAction::Unrecognized { verb, args },
        },
        _ => ToolAction::Unrecognized { verb, args },
    };

    Some(action)
}
