//! IRC message tokenization, the fixed command table, numeric reply codes
//! and reply-line builders.
//!
//! This crate knows nothing about sockets, clients or channels: it only
//! turns bytes into structured commands and structured replies back into
//! bytes. The reactor and the registry (in the `ircd` crate) are the only
//! callers.

pub use buffers::{Buffer, LineBuilder, ReplyBuffer};
pub use command::Command;
pub use message::Message;
pub use rpl::Reply;

mod buffers;
mod command;
mod message;
pub mod rpl;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_then_reassemble_round_trips_a_single_trailing_token() {
        let msg = Message::parse("PRIVMSG #room :hi there friend").unwrap();
        assert_eq!(msg.raw_command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#room", "hi there friend"]);

        let mut out = String::from(msg.raw_command);
        for (i, p) in msg.params.iter().enumerate() {
            out.push(' ');
            if i + 1 == msg.params.len() && p.contains(' ') {
                out.push(':');
            }
            out.push_str(p);
        }
        assert_eq!(out, "PRIVMSG #room :hi there friend");
    }
}
