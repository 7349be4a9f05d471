//! Canned multi-line replies: the welcome block sent on registration and
//! the message of the day.

use ircd_tokens::{rpl, ReplyBuffer};

use crate::config::Config;

/// Queues 001-004, the welcome block sent exactly once per client, right
/// before [`motd`].
pub fn welcome(rb: &mut ReplyBuffer, config: &Config, prefix: &str) {
    rb.reply(rpl::WELCOME)
        .trailing_param(&format!("Welcome to the Internet Relay Network {}", prefix));
    rb.reply(rpl::YOURHOST)
        .trailing_param(&format!("Your host is {}, running the latest version", config.server_name));
    rb.reply(rpl::CREATED).trailing_param("This server was created today");
    rb.reply(rpl::MYINFO).trailing_param(&format!("{} o itkol", config.server_name));
}

/// Queues 375/372/376, the message-of-the-day block.
pub fn motd(rb: &mut ReplyBuffer, config: &Config) {
    rb.reply(rpl::MOTDSTART)
        .trailing_param(&format!("{} Message of the Day -", config.server_name));
    rb.reply(rpl::MOTD).trailing_param(&config.motd);
    rb.reply(rpl::ENDOFMOTD).trailing_param("End of /MOTD command");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_then_motd_matches_the_full_registration_scenario() {
        let config = Config::default();
        let mut rb = ReplyBuffer::new();
        rb.set_nick("alice");
        welcome(&mut rb, &config, "alice!alice@host");
        motd(&mut rb, &config);

        let mut lines = rb.as_str().split("\r\n").filter(|l| !l.is_empty());
        assert_eq!(
            lines.next().unwrap(),
            "001 alice :Welcome to the Internet Relay Network alice!alice@host"
        );
        assert_eq!(lines.next().unwrap(), "002 alice :Your host is ircserv, running the latest version");
        assert_eq!(lines.next().unwrap(), "003 alice :This server was created today");
        assert_eq!(lines.next().unwrap(), "004 alice :ircserv o itkol");
        assert_eq!(lines.next().unwrap(), "375 alice :ircserv Message of the Day -");
        assert_eq!(
            lines.next().unwrap(),
            "372 alice :*Happy Christmas* and welcome to our little IRC server!"
        );
        assert_eq!(lines.next().unwrap(), "376 alice :End of /MOTD command");
        assert!(lines.next().is_none());
    }
}
