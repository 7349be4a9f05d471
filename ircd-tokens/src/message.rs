/// A single tokenized line of client input.
///
/// `raw_command` is kept as received (not upper-cased) so the caller can
/// produce an accurate "Unknown command" reply; `params` holds the
/// positional parameters in order, with the final trailing parameter (if
/// any) already stripped of its leading `:`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message<'a> {
    pub raw_command: &'a str,
    pub params: Vec<&'a str>,
}

impl<'a> Message<'a> {
    /// Tokenizes one line of client input.
    ///
    /// `line` must already have its trailing CR (if any) and LF stripped.
    /// ASCII space (`0x20`) is the only token separator; runs of spaces
    /// collapse, and leading spaces before the command are ignored. A
    /// token that is not the command and starts with `:` ends tokenization
    /// early: everything from the byte after the `:` to the end of the
    /// line (spaces included) becomes the last parameter.
    ///
    /// Returns `None` for an empty or all-whitespace line.
    pub fn parse(line: &'a str) -> Option<Message<'a>> {
        let mut rest = line.trim_start_matches(' ');
        if rest.is_empty() {
            return None;
        }

        let (raw_command, after_command) = split_token(rest);
        if raw_command.is_empty() {
            return None;
        }
        rest = after_command;

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing);
                break;
            }
            let (token, after) = split_token(rest);
            params.push(token);
            rest = after;
        }

        Some(Message { raw_command, params })
    }
}

/// Splits off the first space-delimited token, returning it and the rest of
/// the line (the separating spaces are consumed, not included in either half).
fn split_token(s: &str) -> (&str, &str) {
    match s.find(' ') {
        Some(i) => (&s[..i], &s[i + 1..]),
        None => (s, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_blank_lines() {
        assert_eq!(Message::parse(""), None);
        assert_eq!(Message::parse("   "), None);
    }

    #[test]
    fn parses_command_with_no_params() {
        let msg = Message::parse("QUIT").unwrap();
        assert_eq!(msg.raw_command, "QUIT");
        assert!(msg.params.is_empty());
    }

    #[test]
    fn parses_middle_params_and_a_trailing_param() {
        let msg = Message::parse("PRIVMSG #room :hi there friend").unwrap();
        assert_eq!(msg.raw_command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#room", "hi there friend"]);
    }

    #[test]
    fn trailing_param_may_be_empty() {
        let msg = Message::parse("TOPIC #room :").unwrap();
        assert_eq!(msg.params, vec!["#room", ""]);
    }

    #[test]
    fn trailing_marker_on_the_command_itself_is_not_special() {
        // Only a non-first token starting with ':' triggers trailing mode.
        let msg = Message::parse(":NICK").unwrap();
        assert_eq!(msg.raw_command, ":NICK");
        assert!(msg.params.is_empty());
    }

    #[test]
    fn collapses_runs_of_spaces_between_tokens() {
        let msg = Message::parse("JOIN   #room").unwrap();
        assert_eq!(msg.raw_command, "JOIN");
        assert_eq!(msg.params, vec!["#room"]);
    }

    #[test]
    fn a_param_without_colon_cannot_contain_spaces() {
        let msg = Message::parse("MODE #room +o alice").unwrap();
        assert_eq!(msg.params, vec!["#room", "+o", "alice"]);
    }
}
