//! Numeric reply codes.
//!
//! Every numeric the server ever emits is listed here, named after its
//! conventional `RPL_`/`ERR_` identifier. The wire representation of a
//! numeric is its three-digit decimal form, zero-padded (see
//! [`Buffer::numeric`](crate::Buffer::numeric)).

pub type Reply = u16;

pub const WELCOME: Reply = 1;
pub const YOURHOST: Reply = 2;
pub const CREATED: Reply = 3;
pub const MYINFO: Reply = 4;

pub const AWAY: Reply = 301;
pub const INVITING: Reply = 341;

pub const TOPIC: Reply = 332;
pub const NOTOPIC: Reply = 331;
pub const NAMREPLY: Reply = 353;
pub const ENDOFNAMES: Reply = 366;
pub const CHANNELMODEIS: Reply = 324;

pub const MOTD: Reply = 372;
pub const MOTDSTART: Reply = 375;
pub const ENDOFMOTD: Reply = 376;

pub const NOSUCHNICK: Reply = 401;
pub const NOSUCHCHANNEL: Reply = 403;
pub const CANNOTSENDTOCHAN: Reply = 404;
pub const NORECIPIENT: Reply = 411;
pub const NOTEXTTOSEND: Reply = 412;
pub const UNKNOWNCOMMAND: Reply = 421;
pub const NONICKNAMEGIVEN: Reply = 431;
pub const ERRONEUSNICKNAME: Reply = 432;
pub const NICKNAMEINUSE: Reply = 433;
pub const USERNOTINCHANNEL: Reply = 441;
pub const NOTONCHANNEL: Reply = 442;
pub const USERONCHANNEL: Reply = 443;
pub const NOTREGISTERED: Reply = 451;
pub const NEEDMOREPARAMS: Reply = 461;
pub const ALREADYREGISTERED: Reply = 462;
pub const PASSWDMISMATCH: Reply = 464;
pub const CHANNELISFULL: Reply = 471;
pub const UNKNOWNMODE: Reply = 472;
pub const INVITEONLYCHAN: Reply = 473;
pub const BADCHANNELKEY: Reply = 475;
pub const CHANOPRIVSNEEDED: Reply = 482;
pub const USERSDONTMATCH: Reply = 502;
