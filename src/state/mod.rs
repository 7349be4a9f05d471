//! The name-space registry and command dispatcher.
//!
//! `State` owns every client and channel and is the only thing allowed to
//! mutate them: clients and channels hold no references to each other,
//! only `mio::Token`s and case-folded names that are resolved back through
//! this registry on every access (see DESIGN.md on non-owning
//! back-references).

use ircd_tokens::{rpl, Command, Message};
use ircd_unicase::UniCase;
use mio::Token;
use std::collections::HashMap;

use crate::channel::{is_valid_channel_name, Channel};
use crate::client::{is_valid_nickname, Client};
use crate::config::Config;
use crate::lines;

#[cfg(test)]
pub mod test;

pub struct State {
    config: Config,
    password: String,
    clients: HashMap<Token, Client>,
    channels: HashMap<UniCase<String>, Channel>,
    nicks: HashMap<UniCase<String>, Token>,
}

impl State {
    pub fn new(config: Config, password: String) -> State {
        State { config, password, clients: HashMap::new(), channels: HashMap::new(), nicks: HashMap::new() }
    }

    pub fn add_client(&mut self, token: Token, hostname: String) {
        self.clients.insert(token, Client::new(token, hostname));
    }

    /// True once the client's socket can be torn down: its goodbye line (if
    /// any) has already been queued by whichever handler marked it.
    pub fn is_marked_for_removal(&self, token: Token) -> bool {
        self.clients.get(&token).map_or(true, |c| c.marked_for_removal)
    }

    pub fn has_data_to_send(&self, token: Token) -> bool {
        self.clients.get(&token).map_or(false, Client::has_data_to_send)
    }

    pub fn take_output(&mut self, token: Token) -> String {
        self.clients.get_mut(&token).map_or_else(String::new, |c| c.rb.take())
    }

    /// Puts back the suffix of a previous [`State::take_output`] the
    /// reactor wasn't able to hand to the kernel in one send.
    pub fn requeue_output(&mut self, token: Token, unsent: &str) {
        if let Some(client) = self.clients.get_mut(&token) {
            client.rb.prepend(unsent);
        }
    }

    /// Appends freshly read bytes to a client's input buffer and dispatches
    /// every complete line found in it, leaving a trailing partial line
    /// queued for the next call.
    pub fn feed(&mut self, token: Token, data: &[u8]) {
        if let Some(client) = self.clients.get_mut(&token) {
            client.input.extend_from_slice(data);
        }
        loop {
            let line = {
                let Some(client) = self.clients.get_mut(&token) else { return };
                let Some(pos) = client.input.iter().position(|&b| b == b'\n') else { return };
                let mut raw: Vec<u8> = client.input.drain(..=pos).collect();
                raw.pop();
                if raw.last() == Some(&b'\r') {
                    raw.pop();
                }
                raw
            };
            match std::str::from_utf8(&line) {
                Ok(s) if !s.is_empty() => self.handle_line(token, s),
                _ => {}
            }
        }
    }

    /// Drops a client's record entirely. Callers must have already run
    /// whatever quit/disconnect cascade applies; this only frees memory
    /// and releases its nickname back to the pool.
    pub fn drop_client(&mut self, token: Token) {
        let nick = self.clients.get(&token).and_then(|c| c.nickname.clone());
        if let Some(nick) = nick {
            self.nicks.remove(<&UniCase<str>>::from(nick.as_str()));
        }
        self.clients.remove(&token);
        self.cleanup_empty_channels();
    }

    /// Handles a client socket reporting EOF or a permanent error: same
    /// cascade as QUIT, fixed reason, no goodbye line (there's nothing left
    /// to flush to), and the record is dropped immediately.
    pub fn disconnect(&mut self, token: Token) {
        self.quit_cascade(token, "Client disconnected", false);
        self.drop_client(token);
    }

    pub fn handle_line(&mut self, token: Token, line: &str) {
        let msg = match Message::parse(line) {
            Some(msg) => msg,
            None => return,
        };

        match msg.raw_command.parse::<Command>() {
            Ok(Command::Pass) => self.handle_pass(token, &msg),
            Ok(Command::Nick) => self.handle_nick(token, &msg),
            Ok(Command::User) => self.handle_user(token, &msg),
            Ok(Command::Join) => self.handle_join(token, &msg),
            Ok(Command::Part) => self.handle_part(token, &msg),
            Ok(Command::Privmsg) => self.handle_privmsg(token, &msg),
            Ok(Command::Topic) => self.handle_topic(token, &msg),
            Ok(Command::Kick) => self.handle_kick(token, &msg),
            Ok(Command::Invite) => self.handle_invite(token, &msg),
            Ok(Command::Mode) => self.handle_mode(token, &msg),
            Ok(Command::Quit) => self.handle_quit(token, &msg),
            Ok(Command::Ping) => self.handle_ping(token, &msg),
            Ok(Command::Pong) => {}
            Err(()) if msg.raw_command.eq_ignore_ascii_case("CAP") => {}
            Err(()) => {
                let registered = self.clients.get(&token).map_or(false, |c| c.registered);
                if registered {
                    let cmd = msg.raw_command.to_owned();
                    if let Some(client) = self.clients.get_mut(&token) {
                        client.rb.reply(rpl::UNKNOWNCOMMAND).param(&cmd).trailing_param("Unknown command");
                    }
                }
            }
        }
    }

    fn is_registered(&self, token: Token) -> bool {
        self.clients.get(&token).map_or(false, |c| c.registered)
    }

    // -- registration -------------------------------------------------

    fn handle_pass(&mut self, token: Token, msg: &Message<'_>) {
        let Some(client) = self.clients.get_mut(&token) else { return };
        if client.registered {
            client.rb.reply(rpl::ALREADYREGISTERED).trailing_param("You may not reregister");
            return;
        }
        let Some(pwd) = msg.params.first() else {
            client.rb.reply(rpl::NEEDMOREPARAMS).param("PASS").trailing_param("Not enough parameters");
            return;
        };
        if *pwd == self.password {
            client.authenticated = true;
        } else {
            client.rb.reply(rpl::PASSWDMISMATCH).trailing_param("Password incorrect");
        }
        self.try_complete_registration(token);
    }

    fn handle_nick(&mut self, token: Token, msg: &Message<'_>) {
        let Some(&new_nick) = msg.params.first() else {
            if let Some(client) = self.clients.get_mut(&token) {
                client.rb.reply(rpl::NONICKNAMEGIVEN).trailing_param("No nickname given");
            }
            return;
        };

        if !is_valid_nickname(new_nick, self.config.nickname_len) {
            if let Some(client) = self.clients.get_mut(&token) {
                client.rb.reply(rpl::ERRONEUSNICKNAME).param(new_nick).trailing_param("Erroneous nickname");
            }
            return;
        }

        if let Some(&holder) = self.nicks.get(<&UniCase<str>>::from(new_nick)) {
            if holder != token {
                if let Some(client) = self.clients.get_mut(&token) {
                    client
                        .rb
                        .reply(rpl::NICKNAMEINUSE)
                        .param("*")
                        .param(new_nick)
                        .trailing_param("Nickname is already in use");
                }
                return;
            }
        }

        let old_nick = self.clients.get(&token).and_then(|c| c.nickname.clone());
        if let Some(old) = &old_nick {
            self.nicks.remove(<&UniCase<str>>::from(old.as_str()));
        }
        self.nicks.insert(UniCase::new(new_nick.to_owned()), token);

        let registered = self.is_registered(token);
        if registered {
            let announce_as = old_nick.clone().unwrap_or_else(|| new_nick.to_owned());
            let line = format!(":{} NICK :{}", announce_as, new_nick);
            if let Some(client) = self.clients.get_mut(&token) {
                client.rb.raw_line(&line);
            }
            let channels: Vec<UniCase<String>> =
                self.clients.get(&token).map(|c| c.joined_channels.iter().cloned().collect()).unwrap_or_default();
            for chan in channels {
                self.broadcast_channel(&chan, &line, Some(token));
            }
        }

        if let Some(client) = self.clients.get_mut(&token) {
            client.nickname = Some(new_nick.to_owned());
            client.rb.set_nick(new_nick);
        }

        self.try_complete_registration(token);
    }

    fn handle_user(&mut self, token: Token, msg: &Message<'_>) {
        let Some(client) = self.clients.get_mut(&token) else { return };
        if client.registered {
            client.rb.reply(rpl::ALREADYREGISTERED).trailing_param("You may not reregister");
            return;
        }
        if msg.params.len() < 4 {
            client.rb.reply(rpl::NEEDMOREPARAMS).param("USER").trailing_param("Not enough parameters");
            return;
        }
        client.username = Some(msg.params[0].to_owned());
        client.realname = Some(msg.params[3].to_owned());
        self.try_complete_registration(token);
    }

    fn try_complete_registration(&mut self, token: Token) {
        let Some(client) = self.clients.get_mut(&token) else { return };
        if !client.authenticated || client.registered {
            return;
        }
        if client.nickname.is_none() || client.username.is_none() {
            return;
        }
        client.registered = true;
        let prefix = client.prefix();
        lines::welcome(&mut client.rb, &self.config, &prefix);
        lines::motd(&mut client.rb, &self.config);
    }

    /// Gate used by every command but PASS/NICK/USER/CAP/QUIT/PING, which
    /// are allowed through before registration completes.
    fn require_registered(&mut self, token: Token) -> bool {
        match self.clients.get_mut(&token) {
            Some(client) if client.registered => true,
            Some(client) => {
                client.rb.reply(rpl::NOTREGISTERED).trailing_param("You have not registered");
                false
            }
            None => false,
        }
    }

    // -- channel operations --------------------------------------------

    fn handle_join(&mut self, token: Token, msg: &Message<'_>) {
        if !self.require_registered(token) {
            return;
        }
        let Some(&chan_list) = msg.params.first() else {
            self.reply(token, |rb| {
                rb.reply(rpl::NEEDMOREPARAMS).param("JOIN").trailing_param("Not enough parameters");
            });
            return;
        };
        let key_list = msg.params.get(1).copied().unwrap_or("");
        let names: Vec<&str> = chan_list.split(',').filter(|s| !s.is_empty()).collect();
        let keys: Vec<&str> = key_list.split(',').collect();

        for (i, &name) in names.iter().enumerate() {
            let key = keys.get(i).copied().unwrap_or("");
            self.join_one(token, name, key);
        }
    }

    fn join_one(&mut self, token: Token, name: &str, key: &str) {
        if !is_valid_channel_name(name, self.config.channel_name_len) {
            self.reply(token, |rb| {
                rb.reply(rpl::NOSUCHCHANNEL).param(name).trailing_param("No such channel");
            });
            return;
        }

        let exists = self.channels.contains_key(<&UniCase<str>>::from(name));
        if !exists {
            let mut chan = Channel::new();
            chan.add_member(token);
            self.channels.insert(UniCase::new(name.to_owned()), chan);
        } else {
            let chan = self.channels.get(<&UniCase<str>>::from(name)).unwrap();
            if chan.is_member(token) {
                return;
            }
            if chan.invite_only && !chan.is_invited(token) {
                self.reply(token, |rb| {
                    rb.reply(rpl::INVITEONLYCHAN).param(name).trailing_param("Cannot join channel (+i)");
                });
                return;
            }
            if chan.has_user_limit() && chan.members.len() >= chan.user_limit {
                self.reply(token, |rb| {
                    rb.reply(rpl::CHANNELISFULL).param(name).trailing_param("Cannot join channel (+l)");
                });
                return;
            }
            if chan.has_key() && key != chan.key {
                self.reply(token, |rb| {
                    rb.reply(rpl::BADCHANNELKEY).param(name).trailing_param("Cannot join channel (+k)");
                });
                return;
            }
            self.channels.get_mut(<&UniCase<str>>::from(name)).unwrap().add_member(token);
        }

        if let Some(client) = self.clients.get_mut(&token) {
            client.joined_channels.insert(UniCase::new(name.to_owned()));
        }

        let canonical = self.canonical_channel_name(name);
        let prefix = self.clients.get(&token).map(Client::prefix).unwrap_or_default();
        let join_line = format!(":{} JOIN {}", prefix, canonical);
        self.broadcast_channel_including(name, &join_line);

        let chan = self.channels.get(<&UniCase<str>>::from(name)).unwrap();
        let topic = chan.topic.clone();
        let names_line = self.names_reply(name);

        self.reply(token, |rb| {
            if !topic.is_empty() {
                rb.reply(rpl::TOPIC).param(&canonical).trailing_param(&topic);
            }
            rb.reply(rpl::NAMREPLY).param("=").param(&canonical).trailing_param(&names_line);
            rb.reply(rpl::ENDOFNAMES).param(&canonical).trailing_param("End of /NAMES list");
        });
    }

    fn handle_part(&mut self, token: Token, msg: &Message<'_>) {
        if !self.require_registered(token) {
            return;
        }
        let Some(&chan_list) = msg.params.first() else {
            self.reply(token, |rb| {
                rb.reply(rpl::NEEDMOREPARAMS).param("PART").trailing_param("Not enough parameters");
            });
            return;
        };
        let default_reason = self.clients.get(&token).and_then(|c| c.nickname.clone()).unwrap_or_default();
        let reason = msg.params.get(1).map(|s| s.to_string()).unwrap_or(default_reason);

        for name in chan_list.split(',').filter(|s| !s.is_empty()) {
            let Some(chan) = self.channels.get(<&UniCase<str>>::from(name)) else {
                self.reply(token, |rb| {
                    rb.reply(rpl::NOSUCHCHANNEL).param(name).trailing_param("No such channel");
                });
                continue;
            };
            if !chan.is_member(token) {
                self.reply(token, |rb| {
                    rb.reply(rpl::NOTONCHANNEL).param(name).trailing_param("You're not on that channel");
                });
                continue;
            }
            let prefix = self.clients.get(&token).map(Client::prefix).unwrap_or_default();
            let canonical = self.canonical_channel_name(name);
            let part_line = format!(":{} PART {} :{}", prefix, canonical, reason);
            self.broadcast_channel_including(name, &part_line);

            if let Some(chan) = self.channels.get_mut(<&UniCase<str>>::from(name)) {
                chan.remove_member(token);
            }
            if let Some(client) = self.clients.get_mut(&token) {
                client.joined_channels.remove(<&UniCase<str>>::from(name));
            }
        }
        self.cleanup_empty_channels();
    }

    fn handle_privmsg(&mut self, token: Token, msg: &Message<'_>) {
        if !self.require_registered(token) {
            return;
        }
        let Some(&target) = msg.params.first() else {
            self.reply(token, |rb| {
                rb.reply(rpl::NORECIPIENT).trailing_param("No recipient given (PRIVMSG)");
            });
            return;
        };
        let Some(&text) = msg.params.get(1) else {
            self.reply(token, |rb| {
                rb.reply(rpl::NOTEXTTOSEND).trailing_param("No text to send");
            });
            return;
        };

        let prefix = self.clients.get(&token).map(Client::prefix).unwrap_or_default();

        if target.starts_with('#') || target.starts_with('&') {
            let Some(chan) = self.channels.get(<&UniCase<str>>::from(target)) else {
                self.reply(token, |rb| {
                    rb.reply(rpl::NOSUCHCHANNEL).param(target).trailing_param("No such channel");
                });
                return;
            };
            if !chan.is_member(token) {
                self.reply(token, |rb| {
                    rb.reply(rpl::CANNOTSENDTOCHAN).param(target).trailing_param("Cannot send to channel");
                });
                return;
            }
            let canonical = self.canonical_channel_name(target);
            let line = format!(":{} PRIVMSG {} :{}", prefix, canonical, text);
            self.broadcast_channel(target, &line, Some(token));
        } else {
            let Some(&dest) = self.nicks.get(<&UniCase<str>>::from(target)) else {
                self.reply(token, |rb| {
                    rb.reply(rpl::NOSUCHNICK).param(target).trailing_param("No such nick/channel");
                });
                return;
            };
            let dest_nick = self.clients.get(&dest).and_then(|c| c.nickname.clone()).unwrap_or_default();
            let line = format!(":{} PRIVMSG {} :{}", prefix, dest_nick, text);
            if let Some(client) = self.clients.get_mut(&dest) {
                client.rb.raw_line(&line);
            }
        }
    }

    fn handle_topic(&mut self, token: Token, msg: &Message<'_>) {
        if !self.require_registered(token) {
            return;
        }
        let Some(&name) = msg.params.first() else {
            self.reply(token, |rb| {
                rb.reply(rpl::NEEDMOREPARAMS).param("TOPIC").trailing_param("Not enough parameters");
            });
            return;
        };
        let Some(chan) = self.channels.get(<&UniCase<str>>::from(name)) else {
            self.reply(token, |rb| {
                rb.reply(rpl::NOSUCHCHANNEL).param(name).trailing_param("No such channel");
            });
            return;
        };
        if !chan.is_member(token) {
            self.reply(token, |rb| {
                rb.reply(rpl::NOTONCHANNEL).param(name).trailing_param("You're not on that channel");
            });
            return;
        }

        let canonical = self.canonical_channel_name(name);

        if msg.params.len() < 2 {
            let chan = self.channels.get(<&UniCase<str>>::from(name)).unwrap();
            let topic = chan.topic.clone();
            self.reply(token, |rb| {
                if topic.is_empty() {
                    rb.reply(rpl::NOTOPIC).param(&canonical).trailing_param("No topic is set");
                } else {
                    rb.reply(rpl::TOPIC).param(&canonical).trailing_param(&topic);
                }
            });
            return;
        }

        let chan = self.channels.get(<&UniCase<str>>::from(name)).unwrap();
        if chan.topic_restricted && !chan.is_operator(token) {
            self.reply(token, |rb| {
                rb.reply(rpl::CHANOPRIVSNEEDED).param(name).trailing_param("You're not channel operator");
            });
            return;
        }

        let new_topic = msg.params[1].to_owned();
        let setter = self.clients.get(&token).and_then(|c| c.nickname.clone()).unwrap_or_default();
        if let Some(chan) = self.channels.get_mut(<&UniCase<str>>::from(name)) {
            chan.topic = new_topic.clone();
            chan.topic_set_by = setter;
        }
        let prefix = self.clients.get(&token).map(Client::prefix).unwrap_or_default();
        let line = format!(":{} TOPIC {} :{}", prefix, canonical, new_topic);
        self.broadcast_channel_including(name, &line);
    }

    fn handle_kick(&mut self, token: Token, msg: &Message<'_>) {
        if !self.require_registered(token) {
            return;
        }
        if msg.params.len() < 2 {
            self.reply(token, |rb| {
                rb.reply(rpl::NEEDMOREPARAMS).param("KICK").trailing_param("Not enough parameters");
            });
            return;
        }
        let name = msg.params[0];
        let target_nick = msg.params[1];
        let default_reason = self.clients.get(&token).and_then(|c| c.nickname.clone()).unwrap_or_default();
        let reason = msg.params.get(2).map(|s| s.to_string()).unwrap_or(default_reason);

        let Some(chan) = self.channels.get(<&UniCase<str>>::from(name)) else {
            self.reply(token, |rb| {
                rb.reply(rpl::NOSUCHCHANNEL).param(name).trailing_param("No such channel");
            });
            return;
        };
        if !chan.is_member(token) {
            self.reply(token, |rb| {
                rb.reply(rpl::NOTONCHANNEL).param(name).trailing_param("You're not on that channel");
            });
            return;
        }
        if !chan.is_operator(token) {
            self.reply(token, |rb| {
                rb.reply(rpl::CHANOPRIVSNEEDED).param(name).trailing_param("You're not channel operator");
            });
            return;
        }

        let target = self.nicks.get(<&UniCase<str>>::from(target_nick)).copied();
        let target_is_member = target.map_or(false, |t| chan.is_member(t));
        if !target_is_member {
            self.reply(token, |rb| {
                rb.reply(rpl::USERNOTINCHANNEL)
                    .param(target_nick)
                    .param(name)
                    .trailing_param("They aren't on that channel");
            });
            return;
        }
        let target = target.unwrap();

        let prefix = self.clients.get(&token).map(Client::prefix).unwrap_or_default();
        let canonical = self.canonical_channel_name(name);
        let line = format!(":{} KICK {} {} :{}", prefix, canonical, target_nick, reason);
        self.broadcast_channel_including(name, &line);

        if let Some(chan) = self.channels.get_mut(<&UniCase<str>>::from(name)) {
            chan.remove_member(target);
        }
        if let Some(client) = self.clients.get_mut(&target) {
            client.joined_channels.remove(<&UniCase<str>>::from(name));
        }
        self.cleanup_empty_channels();
    }

    fn handle_invite(&mut self, token: Token, msg: &Message<'_>) {
        if !self.require_registered(token) {
            return;
        }
        if msg.params.len() < 2 {
            self.reply(token, |rb| {
                rb.reply(rpl::NEEDMOREPARAMS).param("INVITE").trailing_param("Not enough parameters");
            });
            return;
        }
        let target_nick = msg.params[0];
        let name = msg.params[1];

        let Some(chan) = self.channels.get(<&UniCase<str>>::from(name)) else {
            self.reply(token, |rb| {
                rb.reply(rpl::NOSUCHCHANNEL).param(name).trailing_param("No such channel");
            });
            return;
        };
        if !chan.is_member(token) {
            self.reply(token, |rb| {
                rb.reply(rpl::NOTONCHANNEL).param(name).trailing_param("You're not on that channel");
            });
            return;
        }
        if chan.invite_only && !chan.is_operator(token) {
            self.reply(token, |rb| {
                rb.reply(rpl::CHANOPRIVSNEEDED).param(name).trailing_param("You're not channel operator");
            });
            return;
        }

        let Some(&target) = self.nicks.get(<&UniCase<str>>::from(target_nick)) else {
            self.reply(token, |rb| {
                rb.reply(rpl::NOSUCHNICK).param(target_nick).trailing_param("No such nick/channel");
            });
            return;
        };
        let chan = self.channels.get(<&UniCase<str>>::from(name)).unwrap();
        if chan.is_member(target) {
            self.reply(token, |rb| {
                rb.reply(rpl::USERONCHANNEL).param(target_nick).param(name).trailing_param("is already on channel");
            });
            return;
        }

        if let Some(chan) = self.channels.get_mut(<&UniCase<str>>::from(name)) {
            chan.invite(target);
        }
        let canonical = self.canonical_channel_name(name);
        self.reply(token, |rb| {
            rb.reply(rpl::INVITING).param(target_nick).param(&canonical);
        });
        let prefix = self.clients.get(&token).map(Client::prefix).unwrap_or_default();
        let line = format!(":{} INVITE {} :{}", prefix, target_nick, canonical);
        if let Some(client) = self.clients.get_mut(&target) {
            client.rb.raw_line(&line);
        }
    }

    fn handle_mode(&mut self, token: Token, msg: &Message<'_>) {
        if !self.require_registered(token) {
            return;
        }
        let Some(&target) = msg.params.first() else {
            self.reply(token, |rb| {
                rb.reply(rpl::NEEDMOREPARAMS).param("MODE").trailing_param("Not enough parameters");
            });
            return;
        };

        if !target.starts_with('#') && !target.starts_with('&') {
            self.reply(token, |rb| {
                rb.reply(rpl::USERSDONTMATCH).trailing_param("Cannot change mode for other users");
            });
            return;
        }

        let Some(chan) = self.channels.get(<&UniCase<str>>::from(target)) else {
            self.reply(token, |rb| {
                rb.reply(rpl::NOSUCHCHANNEL).param(target).trailing_param("No such channel");
            });
            return;
        };

        if msg.params.len() < 2 {
            let canonical = self.canonical_channel_name(target);
            let modes = chan.mode_string();
            self.reply(token, |rb| {
                rb.reply(rpl::CHANNELMODEIS).param(&canonical).param(&modes);
            });
            return;
        }

        if !chan.is_member(token) {
            self.reply(token, |rb| {
                rb.reply(rpl::NOTONCHANNEL).param(target).trailing_param("You're not on that channel");
            });
            return;
        }
        if !chan.is_operator(token) {
            self.reply(token, |rb| {
                rb.reply(rpl::CHANOPRIVSNEEDED).param(target).trailing_param("You're not channel operator");
            });
            return;
        }

        self.apply_channel_modes(token, target, msg.params[1], &msg.params[2..]);
    }

    fn apply_channel_modes(&mut self, token: Token, chan_name: &str, mode_str: &str, params: &[&str]) {
        let mut applied = String::new();
        let mut applied_params = String::new();
        let mut run_sign: Option<bool> = None;
        let mut param_index = 0usize;

        for (adding, letter) in crate::modes::Scan::new(mode_str) {
            let chan = match self.channels.get_mut(<&UniCase<str>>::from(chan_name)) {
                Some(c) => c,
                None => return,
            };
            match letter {
                'i' => {
                    chan.invite_only = adding;
                    push_sign(&mut applied, &mut run_sign, adding);
                    applied.push('i');
                }
                't' => {
                    chan.topic_restricted = adding;
                    push_sign(&mut applied, &mut run_sign, adding);
                    applied.push('t');
                }
                'k' => {
                    if adding {
                        if let Some(&key) = params.get(param_index) {
                            chan.key = key.to_owned();
                            push_sign(&mut applied, &mut run_sign, adding);
                            applied.push('k');
                            applied_params.push(' ');
                            applied_params.push_str(key);
                            param_index += 1;
                        }
                    } else {
                        chan.key.clear();
                        push_sign(&mut applied, &mut run_sign, adding);
                        applied.push('k');
                    }
                }
                'o' => {
                    if let Some(&nick) = params.get(param_index) {
                        let resolved = self.nicks.get(<&UniCase<str>>::from(nick)).copied();
                        let chan = self.channels.get_mut(<&UniCase<str>>::from(chan_name)).unwrap();
                        if let Some(resolved) = resolved {
                            if chan.is_member(resolved) {
                                if adding {
                                    chan.add_operator(resolved);
                                } else {
                                    chan.remove_operator(resolved);
                                }
                                push_sign(&mut applied, &mut run_sign, adding);
                                applied.push('o');
                                applied_params.push(' ');
                                applied_params.push_str(nick);
                            }
                        }
                        param_index += 1;
                    }
                }
                'l' => {
                    if adding {
                        if let Some(&n) = params.get(param_index) {
                            if let Ok(limit) = n.parse::<usize>() {
                                if limit > 0 {
                                    chan.user_limit = limit;
                                    push_sign(&mut applied, &mut run_sign, adding);
                                    applied.push('l');
                                    applied_params.push(' ');
                                    applied_params.push_str(n);
                                }
                            }
                            param_index += 1;
                        }
                    } else {
                        chan.user_limit = 0;
                        push_sign(&mut applied, &mut run_sign, adding);
                        applied.push('l');
                    }
                }
                other => {
                    self.reply(token, |rb| {
                        rb.reply(rpl::UNKNOWNMODE)
                            .param(&other.to_string())
                            .trailing_param("is unknown mode char to me");
                    });
                }
            }
        }

        if applied.is_empty() || applied == "+" || applied == "-" {
            return;
        }
        let prefix = self.clients.get(&token).map(Client::prefix).unwrap_or_default();
        let canonical = self.canonical_channel_name(chan_name);
        let line = format!(":{} MODE {} {}{}", prefix, canonical, applied, applied_params);
        self.broadcast_channel_including(chan_name, &line);
    }

    fn handle_quit(&mut self, token: Token, msg: &Message<'_>) {
        let reason = msg.params.first().copied().unwrap_or("Client Quit").to_owned();
        self.quit_cascade(token, &reason, true);
        self.cleanup_empty_channels();
    }

    fn handle_ping(&mut self, token: Token, msg: &Message<'_>) {
        let server_name = self.config.server_name.clone();
        let token_param = msg.params.first().copied().unwrap_or("");
        self.reply(token, |rb| {
            rb.message("", Command::Pong).param(&server_name).trailing_param(token_param);
        });
    }

    // -- shared plumbing -------------------------------------------------

    /// Broadcasts to every channel the client is in, excluding the client
    /// itself, then queues its goodbye line and marks it for removal.
    /// `deferred` is true for an explicit QUIT (the socket stays open until
    /// the reactor flushes the goodbye line) and false for a disconnect
    /// cascade driven by I/O error (no goodbye line is queued).
    fn quit_cascade(&mut self, token: Token, reason: &str, deferred: bool) {
        let prefix = self.clients.get(&token).map(Client::prefix).unwrap_or_default();
        let hostname = self.clients.get(&token).map(|c| c.hostname.clone()).unwrap_or_default();
        let channels: Vec<UniCase<String>> =
            self.clients.get(&token).map(|c| c.joined_channels.iter().cloned().collect()).unwrap_or_default();

        let line = format!(":{} QUIT :{}", prefix, reason);
        for chan in &channels {
            self.broadcast_channel(chan.as_str(), &line, Some(token));
            if let Some(c) = self.channels.get_mut(chan) {
                c.remove_member(token);
            }
        }
        if let Some(client) = self.clients.get_mut(&token) {
            client.joined_channels.clear();
            if deferred {
                client.rb.raw_line(&format!("Quitting session: {} ({})", hostname, reason));
                client.marked_for_removal = true;
            }
        }
    }

    /// The casing the channel was first created with, regardless of what
    /// casing the caller used to look it up (invariant 5).
    fn canonical_channel_name(&self, name: &str) -> String {
        self.channels
            .get_key_value(<&UniCase<str>>::from(name))
            .map(|(k, _)| k.as_str().to_owned())
            .unwrap_or_else(|| name.to_owned())
    }

    fn broadcast_channel(&mut self, name: &str, line: &str, exclude: Option<Token>) {
        let Some(chan) = self.channels.get(<&UniCase<str>>::from(name)) else { return };
        let members = chan.members.clone();
        for member in members {
            if Some(member) == exclude {
                continue;
            }
            if let Some(client) = self.clients.get_mut(&member) {
                client.rb.raw_line(line);
            }
        }
    }

    fn broadcast_channel_including(&mut self, name: &str, line: &str) {
        self.broadcast_channel(name, line, None);
    }

    fn reply(&mut self, token: Token, f: impl FnOnce(&mut ircd_tokens::ReplyBuffer)) {
        if let Some(client) = self.clients.get_mut(&token) {
            f(&mut client.rb);
        }
    }

    fn cleanup_empty_channels(&mut self) {
        self.channels.retain(|_, chan| !chan.is_empty());
    }

    /// Space-separated member list for the NAMES reply, operators prefixed
    /// with `@`, in join order.
    fn names_reply(&self, name: &str) -> String {
        let Some(chan) = self.channels.get(<&UniCase<str>>::from(name)) else { return String::new() };
        let mut out = String::new();
        for (i, &member) in chan.members.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            if chan.is_operator(member) {
                out.push('@');
            }
            if let Some(nick) = self.clients.get(&member).and_then(|c| c.nickname.as_deref()) {
                out.push_str(nick);
            }
        }
        out
    }
}

/// Appends a `+`/`-` sign to the echoed mode string only when the
/// direction changes, so a run of same-direction letters shares one sign.
fn push_sign(applied: &mut String, run_sign: &mut Option<bool>, adding: bool) {
    if *run_sign != Some(adding) {
        applied.push(if adding { '+' } else { '-' });
        *run_sign = Some(adding);
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    fn state() -> State {
        State::new(Config::default(), "letmein".to_owned())
    }

    #[test]
    fn unknown_command_before_registration_is_silently_ignored() {
        let mut st = state();
        st.add_client(Token(1), "127.0.0.1".to_owned());
        st.handle_line(Token(1), "FROB");
        assert_eq!(st.take_output(Token(1)), "");
    }
}
