use crate::command::Command;
use crate::rpl::Reply;

/// Growable buffer of fully-formed IRC lines, each terminated by `\r\n`.
///
/// `Buffer` never allocates one line at a time; callers start a line with
/// [`Buffer::message`] or [`Buffer::numeric`], append parameters to the
/// returned [`LineBuilder`], and the CRLF terminator is appended
/// automatically when the builder is dropped.
#[derive(Debug, Default)]
pub struct Buffer {
    data: String,
}

impl Buffer {
    pub fn new() -> Buffer {
        Buffer { data: String::new() }
    }

    /// Starts a client-sourced line: `:<prefix> <COMMAND>`.
    ///
    /// `prefix` is usually `nick!user@host`; pass an empty string to omit
    /// the leading `:prefix ` entirely (used for raw PING/PONG framing).
    pub fn message(&mut self, prefix: &str, command: Command) -> LineBuilder<'_> {
        if !prefix.is_empty() {
            self.data.push(':');
            self.data.push_str(prefix);
            self.data.push(' ');
        }
        self.data.push_str(command.as_str());
        LineBuilder { buf: self }
    }

    /// Starts a server-sourced numeric line: `<nnn> <target> …`.
    ///
    /// Numerics carry no server prefix; `target` is the nickname the
    /// numeric is addressed to (or `"*"` before one has been assigned).
    pub fn numeric(&mut self, code: Reply, target: &str) -> LineBuilder<'_> {
        self.data.push_str(&format!("{:03}", code));
        self.data.push(' ');
        self.data.push_str(target);
        LineBuilder { buf: self }
    }

    /// Appends an arbitrary line verbatim, terminated by CRLF, with no
    /// prefix and no command word. Used for the handful of lines that
    /// don't fit the numeric or client-sourced shapes, such as the
    /// goodbye line sent to a client right before it is disconnected.
    pub fn raw_line(&mut self, line: &str) {
        self.data.push_str(line);
        self.data.push_str("\r\n");
    }

    /// Puts bytes the reactor failed to fully write back at the front of
    /// the buffer, ahead of anything queued since.
    pub fn prepend(&mut self, s: &str) {
        self.data.insert_str(0, s);
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns the accumulated bytes and empties the buffer.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.data)
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }
}

/// A single in-progress line borrowed from a [`Buffer`].
///
/// Appends a trailing CRLF when dropped, so every line started via
/// [`Buffer::message`] or [`Buffer::numeric`] is terminated exactly once,
/// regardless of how many parameters were chained onto it.
pub struct LineBuilder<'a> {
    buf: &'a mut Buffer,
}

impl<'a> LineBuilder<'a> {
    /// Appends a middle parameter, preceded by a single space.
    ///
    /// Callers are responsible for only passing parameters that cannot
    /// contain a space or start with `:`; use [`trailing_param`](Self::trailing_param)
    /// for anything that might.
    pub fn param(self, p: &str) -> Self {
        self.buf.data.push(' ');
        self.buf.data.push_str(p);
        self
    }

    /// Appends the final parameter, preceded by `" :"`, allowing spaces.
    pub fn trailing_param(self, p: &str) -> Self {
        self.buf.data.push_str(" :");
        self.buf.data.push_str(p);
        self
    }
}

impl<'a> Drop for LineBuilder<'a> {
    fn drop(&mut self) {
        self.buf.data.push_str("\r\n");
    }
}

/// A [`Buffer`] paired with the client's current display nickname, so
/// numeric replies can be built with just a code.
///
/// This is the handle command handlers hold: one per client, reused across
/// every command it processes, drained by the reactor once its socket
/// becomes writable.
#[derive(Debug)]
pub struct ReplyBuffer {
    buf: Buffer,
    nick: String,
}

impl ReplyBuffer {
    pub fn new() -> ReplyBuffer {
        ReplyBuffer { buf: Buffer::new(), nick: String::from("*") }
    }

    /// Updates the nickname future numerics are addressed to (called after
    /// a successful NICK).
    pub fn set_nick(&mut self, nick: &str) {
        self.nick.clear();
        self.nick.push_str(nick);
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Starts a numeric reply addressed to this buffer's current nickname.
    pub fn reply(&mut self, code: Reply) -> LineBuilder<'_> {
        let target = self.nick.clone();
        self.buf.numeric(code, &target)
    }

    /// Starts a client-sourced line with the given prefix, e.g.
    /// `nick!user@host`.
    pub fn message(&mut self, prefix: &str, command: Command) -> LineBuilder<'_> {
        self.buf.message(prefix, command)
    }

    pub fn raw_line(&mut self, line: &str) {
        self.buf.raw_line(line);
    }

    pub fn prepend(&mut self, s: &str) {
        self.buf.prepend(s);
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn take(&mut self) -> String {
        self.buf.take()
    }

    pub fn as_str(&self) -> &str {
        self.buf.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_line_has_crlf_and_three_digit_code() {
        let mut buf = Buffer::new();
        buf.numeric(crate::rpl::WELCOME, "alice")
            .trailing_param("Welcome to the Internet Relay Network alice!alice@host");
        assert_eq!(buf.as_str(), "001 alice :Welcome to the Internet Relay Network alice!alice@host\r\n");
    }

    #[test]
    fn message_line_chains_middle_and_trailing_params() {
        let mut buf = Buffer::new();
        buf.message("alice!alice@host", Command::Privmsg)
            .param("#room")
            .trailing_param("hi there friend");
        assert_eq!(buf.as_str(), ":alice!alice@host PRIVMSG #room :hi there friend\r\n");
    }

    #[test]
    fn message_with_empty_prefix_omits_leading_colon() {
        let mut buf = Buffer::new();
        buf.message("", Command::Ping).param("ircd");
        assert_eq!(buf.as_str(), "PING ircd\r\n");
    }

    #[test]
    fn reply_buffer_tracks_nick_across_calls() {
        let mut rb = ReplyBuffer::new();
        rb.reply(crate::rpl::NONICKNAMEGIVEN).trailing_param("No nickname given");
        rb.set_nick("alice");
        rb.reply(crate::rpl::CHANNELMODEIS).param("#room").param("+nt");
        assert_eq!(rb.as_str(), "431 * :No nickname given\r\n324 alice #room +nt\r\n");
    }

    #[test]
    fn take_drains_and_resets_the_buffer() {
        let mut buf = Buffer::new();
        buf.message("", Command::Quit);
        assert!(!buf.is_empty());
        let taken = buf.take();
        assert_eq!(taken, "QUIT\r\n");
        assert!(buf.is_empty());
    }
}
