/// Characters that force an argument to be wrapped in double quotes.
const NEEDS_QUOTING: &[char] = &[
    '"', '\'', '`', '$', '&', '|', ';', '<', '>', '(', ')', '*', '?', '[', ']', '#', '~', '!', '^',
];

/// Escapes a single command-line argument so it survives argument parsing
/// as exactly one token.
///
/// An empty input collapses to an empty string, so an absent value
/// contributes nothing to the command line instead of failing.
pub fn escape_argument(arg: &str) -> String {
    if arg.is_empty() {
        return String::new();
    }

    let needs_quoting = arg
        .chars()
        .any(|c| c.is_whitespace() || NEEDS_QUOTING.contains(&c));

    if !needs_quoting {
        return arg.to_string();
    }

    let mut escaped = String::with_capacity(arg.len() + 2);
    escaped.push('"');
    for c in arg.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            _ => escaped.push(c),
        }
    }
    escaped.push('"');
    escaped
}

/// Splits a command line into argument tokens.
///
/// Double quotes group whitespace into a single token; inside quotes a
/// backslash escapes `"` and `\`. The inverse of [`escape_argument`].
pub fn tokenize(command_line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;
    let mut chars = command_line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => in_quotes = false,
                '\\' => match chars.peek() {
                    Some('"') | Some('\\') => {
                        current.push(chars.next().unwrap_or('\\'));
                    }
                    _ => current.push('\\'),
                },
                _ => current.push(c),
            }
        } else if c == '"' {
            in_quotes = true;
            in_token = true;
        } else if c.is_whitespace() {
            if in_token {
                tokens.push(std::mem::take(&mut current));
                in_token = false;
            }
        } else {
            current.push(c);
            in_token = true;
        }
    }

    if in_token {
        tokens.push(current);
    }

    tokens
}
