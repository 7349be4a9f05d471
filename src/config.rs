//! Ambient, non-launcher-supplied configuration.
//!
//! The external launcher supplies exactly `(port, password)` (see
//! `main.rs`); everything else a real deployment of this server would want
//! to tune lives here, with defaults matching the reference behavior.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_name: String,
    pub motd: String,
    pub nickname_len: usize,
    pub channel_name_len: usize,
    pub listen_backlog: u32,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            server_name: "ircserv".to_owned(),
            motd: "*Happy Christmas* and welcome to our little IRC server!".to_owned(),
            nickname_len: 9,
            channel_name_len: 50,
            listen_backlog: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_server() {
        let cfg = Config::default();
        assert_eq!(cfg.server_name, "ircserv");
        assert_eq!(cfg.nickname_len, 9);
        assert_eq!(cfg.channel_name_len, 50);
        assert_eq!(cfg.listen_backlog, 10);
    }

    #[test]
    fn deserializes_from_partial_yaml_with_defaults_filled_in() {
        let cfg: Config = serde_yaml::from_str("server_name: chattown\n").unwrap();
        assert_eq!(cfg.server_name, "chattown");
        assert_eq!(cfg.nickname_len, 9);
    }
}
