//! Channel records.

use std::collections::HashSet;

use mio::Token;

/// Per-channel state: membership, operator and invite sets, topic, key and
/// mode flags.
///
/// Members are kept in an ordered `Vec` rather than a `HashSet` because join
/// order is observable (it's the order NAMES lists them in); operators and
/// the invite list don't need that ordering, so they're plain sets.
#[derive(Default)]
pub struct Channel {
    pub topic: String,
    pub topic_set_by: String,
    pub key: String,

    pub members: Vec<Token>,
    pub operators: HashSet<Token>,
    pub invite_list: HashSet<Token>,

    pub invite_only: bool,
    pub topic_restricted: bool,
    pub user_limit: usize,
}

impl Channel {
    pub fn new() -> Channel {
        Channel { topic_restricted: true, ..Channel::default() }
    }

    pub fn has_key(&self) -> bool {
        !self.key.is_empty()
    }

    pub fn has_user_limit(&self) -> bool {
        self.user_limit > 0
    }

    pub fn is_member(&self, token: Token) -> bool {
        self.members.contains(&token)
    }

    pub fn is_operator(&self, token: Token) -> bool {
        self.operators.contains(&token)
    }

    pub fn is_invited(&self, token: Token) -> bool {
        self.invite_list.contains(&token)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Adds `token` as a member if it isn't one already. The very first
    /// member of a freshly created channel is also made its sole operator.
    pub fn add_member(&mut self, token: Token) {
        if !self.is_member(token) {
            let is_first = self.members.is_empty();
            self.members.push(token);
            if is_first {
                self.operators.insert(token);
            }
            self.invite_list.remove(&token);
        }
    }

    /// Removes `token` from membership, operator and invite sets alike.
    pub fn remove_member(&mut self, token: Token) {
        self.members.retain(|m| *m != token);
        self.operators.remove(&token);
        self.invite_list.remove(&token);
    }

    pub fn add_operator(&mut self, token: Token) {
        if self.is_member(token) {
            self.operators.insert(token);
        }
    }

    pub fn remove_operator(&mut self, token: Token) {
        self.operators.remove(&token);
    }

    pub fn invite(&mut self, token: Token) {
        self.invite_list.insert(token);
    }

    /// `+ikotl`-order mode string for `MODE #chan` with no mode string
    /// argument. The key's value is never revealed.
    pub fn mode_string(&self) -> String {
        let mut modes = String::from("+");
        let mut params = String::new();
        if self.invite_only {
            modes.push('i');
        }
        if self.topic_restricted {
            modes.push('t');
        }
        if self.has_key() {
            modes.push('k');
        }
        if self.has_user_limit() {
            modes.push('l');
            params.push(' ');
            params.push_str(&self.user_limit.to_string());
        }
        if modes == "+" {
            return modes;
        }
        modes.push_str(&params);
        modes
    }
}

/// Must begin with `#` or `&`; length 1..=`max_len`; no space, comma or
/// colon anywhere in the name.
pub fn is_valid_channel_name(name: &str, max_len: usize) -> bool {
    if name.is_empty() || name.len() > max_len {
        return false;
    }
    if !name.starts_with('#') && !name.starts_with('&') {
        return false;
    }
    !name.contains(|c| c == ' ' || c == ',' || c == ':')
}
