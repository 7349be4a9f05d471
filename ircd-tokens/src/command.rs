use std::str::FromStr;

/// The fixed set of client commands this server understands.
///
/// Anything else parses as a bare [`Message`](crate::Message) whose
/// `raw_command` the caller can still inspect (e.g. to reply 421 Unknown
/// command), but only these have a typed handler in the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Pass,
    Nick,
    User,
    Ping,
    Pong,
    Join,
    Part,
    Privmsg,
    Topic,
    Kick,
    Invite,
    Mode,
    Quit,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Pass => "PASS",
            Command::Nick => "NICK",
            Command::User => "USER",
            Command::Ping => "PING",
            Command::Pong => "PONG",
            Command::Join => "JOIN",
            Command::Part => "PART",
            Command::Privmsg => "PRIVMSG",
            Command::Topic => "TOPIC",
            Command::Kick => "KICK",
            Command::Invite => "INVITE",
            Command::Mode => "MODE",
            Command::Quit => "QUIT",
        }
    }
}

impl FromStr for Command {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Command names are case-insensitive on the wire (RFC 2812 §2.3.1)
        // but every client in practice sends upper case; fold anyway.
        match s.to_ascii_uppercase().as_str() {
            "PASS" => Ok(Command::Pass),
            "NICK" => Ok(Command::Nick),
            "USER" => Ok(Command::User),
            "PING" => Ok(Command::Ping),
            "PONG" => Ok(Command::Pong),
            "JOIN" => Ok(Command::Join),
            "PART" => Ok(Command::Part),
            "PRIVMSG" => Ok(Command::Privmsg),
            "TOPIC" => Ok(Command::Topic),
            "KICK" => Ok(Command::Kick),
            "INVITE" => Ok(Command::Invite),
            "MODE" => Ok(Command::Mode),
            "QUIT" => Ok(Command::Quit),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("privmsg".parse::<Command>(), Ok(Command::Privmsg));
        assert_eq!("PrIvMsG".parse::<Command>(), Ok(Command::Privmsg));
    }

    #[test]
    fn as_str_round_trips_through_from_str() {
        for cmd in [
            Command::Pass,
            Command::Nick,
            Command::User,
            Command::Ping,
            Command::Pong,
            Command::Join,
            Command::Part,
            Command::Privmsg,
            Command::Topic,
            Command::Kick,
            Command::Invite,
            Command::Mode,
            Command::Quit,
        ] {
            assert_eq!(cmd.as_str().parse(), Ok(cmd));
        }
    }

    #[test]
    fn rejects_unknown_commands() {
        assert_eq!("XYZZY".parse::<Command>(), Err(()));
    }
}
