//! Per-connection state.

use std::collections::HashSet;

use ircd_tokens::ReplyBuffer;
use ircd_unicase::UniCase;
use mio::Token;

/// A TCP peer that has completed `accept`.
///
/// `token` is the identity the reactor and the registry both key on: mio's
/// analogue of the original file descriptor. Everything else mirrors the
/// reference client record field for field.
pub struct Client {
    pub token: Token,
    pub hostname: String,
    pub nickname: Option<String>,
    pub username: Option<String>,
    pub realname: Option<String>,

    pub authenticated: bool,
    pub registered: bool,
    pub marked_for_removal: bool,

    pub input: Vec<u8>,
    pub rb: ReplyBuffer,

    pub joined_channels: HashSet<UniCase<String>>,
}

impl Client {
    pub fn new(token: Token, hostname: String) -> Client {
        Client {
            token,
            hostname,
            nickname: None,
            username: None,
            realname: None,
            authenticated: false,
            registered: false,
            marked_for_removal: false,
            input: Vec::new(),
            rb: ReplyBuffer::new(),
            joined_channels: HashSet::new(),
        }
    }

    /// `nick!user@host`, degrading gracefully before registration the way
    /// the reference client's prefix getter does.
    pub fn prefix(&self) -> String {
        let mut prefix = self.nickname.clone().unwrap_or_default();
        if let Some(username) = &self.username {
            prefix.push('!');
            prefix.push_str(username);
        }
        prefix.push('@');
        prefix.push_str(&self.hostname);
        prefix
    }

    pub fn has_data_to_send(&self) -> bool {
        !self.rb.is_empty()
    }
}

/// First character must be a letter or one of the RFC 2812 special
/// characters; remaining characters may additionally be digits or `-`.
/// Length must be 1..=`max_len`.
pub fn is_valid_nickname(nick: &str, max_len: usize) -> bool {
    if nick.is_empty() || nick.len() > max_len {
        return false;
    }
    let mut chars = nick.chars();
    let first = chars.next().unwrap();
    if !(first.is_ascii_alphabetic() || is_nick_special(first)) {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || is_nick_special(c) || c == '-')
}

fn is_nick_special(c: char) -> bool {
    matches!(c, '[' | ']' | '\\' | '`' | '_' | '^' | '{' | '|' | '}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_degrades_gracefully_before_registration() {
        let client = Client::new(Token(0), "127.0.0.1".to_owned());
        assert_eq!(client.prefix(), "@127.0.0.1");
    }

    #[test]
    fn prefix_is_complete_once_nick_and_user_are_set() {
        let mut client = Client::new(Token(0), "127.0.0.1".to_owned());
        client.nickname = Some("alice".to_owned());
        client.username = Some("alice".to_owned());
        assert_eq!(client.prefix(), "alice!alice@127.0.0.1");
    }

    #[test]
    fn nickname_length_boundary() {
        assert!(is_valid_nickname("123456789", 9));
        assert!(!is_valid_nickname("1234567890", 9));
    }

    #[test]
    fn nickname_must_start_with_a_letter_or_special_char() {
        assert!(is_valid_nickname("[bot]", 9));
        assert!(!is_valid_nickname("9bot", 9));
        assert!(!is_valid_nickname("-bot", 9));
    }

    #[test]
    fn nickname_rejects_empty() {
        assert!(!is_valid_nickname("", 9));
    }
}
