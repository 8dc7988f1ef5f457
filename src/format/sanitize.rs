//! Markup stripping for log content and group names

/// Strip ANSI/OSC/APC escape sequences and residual control characters.
///
/// Newlines and tabs survive when the escape stripper keeps them. The output
/// contains no escape introducer and no control character other than `\n`
/// and `\t`, so applying the function again returns its input unchanged.
pub fn sanitize(input: &str) -> String {
    if !needs_sanitizing(input) {
        return input.to_string();
    }

    let stripped = strip_ansi_escapes::strip_str(input);
    stripped
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

fn needs_sanitizing(input: &str) -> bool {
    input.chars().any(|c| c.is_control() && c != '\n' && c != '\t')
}
