//! A synchronous harness driving [`State`] through synthetic command
//! sequences, asserting on the queued output buffers.

use mio::Token;

use super::State;
use crate::config::Config;

fn simple_state() -> State {
    State::new(Config::default(), "letmein".to_owned())
}

/// Adds a client and drives it through a full registration handshake.
fn add_registered_client(st: &mut State, token: Token, nick: &str) {
    st.add_client(token, "host".to_owned());
    handle(st, token, "PASS letmein");
    handle(st, token, &format!("NICK {}", nick));
    handle(st, token, &format!("USER {} 0 * :{} Realname", nick, nick));
    st.take_output(token);
}

fn handle(st: &mut State, token: Token, line: &str) {
    st.handle_line(token, line);
}

fn collect(st: &mut State, token: Token) -> Vec<String> {
    st.take_output(token).split("\r\n").filter(|l| !l.is_empty()).map(str::to_owned).collect()
}

#[test]
fn full_registration_emits_the_welcome_and_motd_block_in_order() {
    let mut st = simple_state();
    let alice = Token(1);
    st.add_client(alice, "host".to_owned());
    handle(&mut st, alice, "PASS letmein");
    handle(&mut st, alice, "NICK alice");
    handle(&mut st, alice, "USER alice 0 * :Alice A");

    let lines = collect(&mut st, alice);
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[0], "001 alice :Welcome to the Internet Relay Network alice!alice@host");
    assert_eq!(lines[1], "002 alice :Your host is ircserv, running the latest version");
    assert_eq!(lines[2], "003 alice :This server was created today");
    assert_eq!(lines[3], "004 alice :ircserv o itkol");
    assert_eq!(lines[4], "375 alice :ircserv Message of the Day -");
    assert_eq!(lines[5], "372 alice :*Happy Christmas* and welcome to our little IRC server!");
    assert_eq!(lines[6], "376 alice :End of /MOTD command");
}

#[test]
fn wrong_password_replies_464_and_never_registers() {
    let mut st = simple_state();
    let alice = Token(1);
    st.add_client(alice, "host".to_owned());
    handle(&mut st, alice, "PASS wrong");
    handle(&mut st, alice, "NICK alice");
    handle(&mut st, alice, "USER alice 0 * :Alice A");
    let lines = collect(&mut st, alice);
    assert_eq!(lines, vec!["464 * :Password incorrect"]);
}

#[test]
fn duplicate_nickname_is_rejected_case_insensitively() {
    let mut st = simple_state();
    add_registered_client(&mut st, Token(1), "alice");

    let bob = Token(2);
    st.add_client(bob, "host".to_owned());
    handle(&mut st, bob, "PASS letmein");
    handle(&mut st, bob, "NICK ALICE");
    let lines = collect(&mut st, bob);
    assert_eq!(lines, vec!["433 * ALICE :Nickname is already in use"]);
}

#[test]
fn invite_only_channel_blocks_join_until_invited() {
    let mut st = simple_state();
    add_registered_client(&mut st, Token(1), "alice");
    add_registered_client(&mut st, Token(2), "bob");
    let alice = Token(1);
    let bob = Token(2);

    handle(&mut st, alice, "JOIN #secret");
    st.take_output(alice);
    handle(&mut st, alice, "MODE #secret +i");
    st.take_output(alice);

    handle(&mut st, bob, "JOIN #secret");
    assert_eq!(collect(&mut st, bob), vec!["473 #secret :Cannot join channel (+i)"]);

    handle(&mut st, alice, "INVITE bob #secret");
    assert_eq!(collect(&mut st, alice), vec!["341 alice bob #secret"]);
    assert_eq!(collect(&mut st, bob), vec![":alice!alice@host INVITE bob :#secret"]);

    handle(&mut st, bob, "JOIN #secret");
    let bob_lines = collect(&mut st, bob);
    assert!(bob_lines.iter().any(|l| l == ":bob!bob@host JOIN #secret"));
    let alice_lines = collect(&mut st, alice);
    assert!(alice_lines.iter().any(|l| l == ":bob!bob@host JOIN #secret"));
}

#[test]
fn channel_privmsg_reaches_other_members_but_not_the_sender() {
    let mut st = simple_state();
    add_registered_client(&mut st, Token(1), "alice");
    add_registered_client(&mut st, Token(2), "bob");
    let alice = Token(1);
    let bob = Token(2);

    handle(&mut st, alice, "JOIN #room");
    st.take_output(alice);
    handle(&mut st, bob, "JOIN #room");
    st.take_output(alice);
    st.take_output(bob);

    handle(&mut st, alice, "PRIVMSG #room :hi");
    assert_eq!(collect(&mut st, bob), vec![":alice!alice@host PRIVMSG #room :hi"]);
    assert_eq!(collect(&mut st, alice), Vec::<String>::new());
}

#[test]
fn mode_application_echoes_a_single_run_for_same_direction_letters() {
    let mut st = simple_state();
    add_registered_client(&mut st, Token(1), "alice");
    let alice = Token(1);
    handle(&mut st, alice, "JOIN #room");
    st.take_output(alice);

    handle(&mut st, alice, "MODE #room +tk secret");
    assert_eq!(collect(&mut st, alice), vec![":alice!alice@host MODE #room +tk secret"]);
}

#[test]
fn quit_cascades_to_channel_members_and_garbage_collects_an_emptied_channel() {
    let mut st = simple_state();
    add_registered_client(&mut st, Token(1), "alice");
    add_registered_client(&mut st, Token(2), "bob");
    let alice = Token(1);
    let bob = Token(2);

    handle(&mut st, alice, "JOIN #room");
    st.take_output(alice);
    handle(&mut st, bob, "JOIN #room");
    st.take_output(alice);
    st.take_output(bob);

    handle(&mut st, alice, "QUIT :bye");
    assert_eq!(collect(&mut st, bob), vec![":alice!alice@host QUIT :bye"]);
    let alice_lines = collect(&mut st, alice);
    assert_eq!(alice_lines.len(), 1);
    assert!(st.is_marked_for_removal(alice));

    st.drop_client(alice);
    handle(&mut st, bob, "QUIT :also bye");
    st.drop_client(bob);
}

#[test]
fn kick_requires_operator_status() {
    let mut st = simple_state();
    add_registered_client(&mut st, Token(1), "alice");
    add_registered_client(&mut st, Token(2), "bob");
    let alice = Token(1);
    let bob = Token(2);

    handle(&mut st, alice, "JOIN #room");
    st.take_output(alice);
    handle(&mut st, bob, "JOIN #room");
    st.take_output(alice);
    st.take_output(bob);

    handle(&mut st, bob, "KICK #room alice");
    assert_eq!(collect(&mut st, bob), vec!["482 #room :You're not channel operator"]);

    handle(&mut st, alice, "KICK #room bob :get out");
    assert_eq!(collect(&mut st, bob), vec![":alice!alice@host KICK #room bob :get out"]);
}

#[test]
fn commands_before_registration_are_rejected_with_451() {
    let mut st = simple_state();
    let alice = Token(1);
    st.add_client(alice, "host".to_owned());
    handle(&mut st, alice, "JOIN #room");
    assert_eq!(collect(&mut st, alice), vec!["451 * :You have not registered"]);
}

#[test]
fn ping_is_answered_with_pong_and_the_same_token() {
    let mut st = simple_state();
    add_registered_client(&mut st, Token(1), "alice");
    let alice = Token(1);
    handle(&mut st, alice, "PING abc123");
    assert_eq!(collect(&mut st, alice), vec!["PONG ircserv :abc123"]);
}
