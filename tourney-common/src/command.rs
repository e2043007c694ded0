// Copyright (C) 2026 StarHuntingGames
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::fmt;

use crate::{ChatId, SlotNumber, UserId};

pub const REGISTER_USAGE: &str = "Format: /register TEAM_NAME @captain";
pub const RESERVE_USAGE: &str = "Format: /reserve TEAM_NAME @captain";
pub const GRANT_ACCESS_USAGE: &str = "Format: /grantaccess USER_ID";
pub const APPROVE_CHAT_USAGE: &str = "Format: /approvechat CHAT_ID";
pub const SET_CAP_CHAT_USAGE: &str = "Format: /setcapchat CHAT";
pub const BROADCAST_USAGE: &str = "Format: /broadcast TEXT";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("{0}")]
    Usage(&'static str),
    #[error("unknown action token {0:?}")]
    UnknownAction(String),
}

impl ParseError {
    /// Usage errors for admin-only commands must not be shown to other users.
    pub fn requires_admin(&self) -> bool {
        match self {
            ParseError::Usage(usage) => *usage != REGISTER_USAGE,
            ParseError::UnknownAction(_) => false,
        }
    }
}

/// Button payloads attached to registration announcements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionToken {
    Confirm(SlotNumber),
    Cancel(SlotNumber),
}

impl ActionToken {
    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn parse(data: &str) -> Result<Self, ParseError> {
        let unknown = || ParseError::UnknownAction(data.to_string());
        let (action, slot) = data.trim().split_once(':').ok_or_else(unknown)?;
        let slot: SlotNumber = slot.parse().map_err(|_| unknown())?;
        match action {
            "confirm" => Ok(ActionToken::Confirm(slot)),
            "cancel" => Ok(ActionToken::Cancel(slot)),
            _ => Err(unknown()),
        }
    }
}

impl fmt::Display for ActionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionToken::Confirm(slot) => write!(f, "confirm:{slot}"),
            ActionToken::Cancel(slot) => write!(f, "cancel:{slot}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register {
        team_name: String,
        captain_handle: String,
    },
    Confirm {
        slot: SlotNumber,
    },
    Cancel {
        slot: SlotNumber,
    },
    ListSlots,
    AddReserve {
        team_name: String,
        captain_handle: String,
    },
    ListReserve,
    DumpRegistrations,
    ResetQuota,
    GrantAccess {
        user_id: UserId,
    },
    EnableAutocheck,
    ApproveRoom {
        chat_id: ChatId,
    },
    SetAnnounceTarget {
        destination: String,
    },
    Broadcast {
        text: String,
    },
    SubmitProof {
        text: String,
    },
}

impl Command {
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Command::AddReserve { .. }
                | Command::ListReserve
                | Command::DumpRegistrations
                | Command::ResetQuota
                | Command::GrantAccess { .. }
                | Command::ApproveRoom { .. }
                | Command::SetAnnounceTarget { .. }
                | Command::Broadcast { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Register { .. } => "register",
            Command::Confirm { .. } => "confirm",
            Command::Cancel { .. } => "cancel",
            Command::ListSlots => "list-slots",
            Command::AddReserve { .. } => "add-reserve",
            Command::ListReserve => "list-reserve",
            Command::DumpRegistrations => "dump-registrations",
            Command::ResetQuota => "reset-quota",
            Command::GrantAccess { .. } => "grant-access",
            Command::EnableAutocheck => "enable-autocheck",
            Command::ApproveRoom { .. } => "approve-room",
            Command::SetAnnounceTarget { .. } => "set-announce-target",
            Command::Broadcast { .. } => "broadcast",
            Command::SubmitProof { .. } => "submit-proof",
        }
    }

    /// `Ok(None)` means the text is not addressed to the bot.
    pub fn parse_message(text: &str) -> Result<Option<Self>, ParseError> {
        let trimmed = text.trim();
        let Some(body) = trimmed.strip_prefix('/') else {
            if trimmed.contains("http") {
                return Ok(Some(Command::SubmitProof {
                    text: trimmed.to_string(),
                }));
            }
            return Ok(None);
        };

        let (head, args) = split_first_word(body);
        // Group chats address commands as /name@botname.
        let name = head.split('@').next().unwrap_or(head);

        let command = match name {
            "register" => {
                let (team_name, captain_handle) = team_and_captain(args, REGISTER_USAGE)?;
                Command::Register {
                    team_name,
                    captain_handle,
                }
            }
            "teamlist" => Command::ListSlots,
            "reserve" => {
                let (team_name, captain_handle) = team_and_captain(args, RESERVE_USAGE)?;
                Command::AddReserve {
                    team_name,
                    captain_handle,
                }
            }
            "reservelist" => Command::ListReserve,
            "reglist" => Command::DumpRegistrations,
            "resetlimit" => Command::ResetQuota,
            "grantaccess" => Command::GrantAccess {
                user_id: single_number(args, GRANT_ACCESS_USAGE)?,
            },
            "autocheck" => Command::EnableAutocheck,
            "approvechat" => Command::ApproveRoom {
                chat_id: single_number(args, APPROVE_CHAT_USAGE)?,
            },
            "setcapchat" => Command::SetAnnounceTarget {
                destination: single_word(args, SET_CAP_CHAT_USAGE)?.to_string(),
            },
            "broadcast" => {
                if args.is_empty() {
                    return Err(ParseError::Usage(BROADCAST_USAGE));
                }
                Command::Broadcast {
                    text: args.to_string(),
                }
            }
            _ => return Ok(None),
        };

        Ok(Some(command))
    }

    pub fn parse_callback(data: &str) -> Result<Self, ParseError> {
        Ok(match ActionToken::parse(data)? {
            ActionToken::Confirm(slot) => Command::Confirm { slot },
            ActionToken::Cancel(slot) => Command::Cancel { slot },
        })
    }
}

fn split_first_word(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (text, ""),
    }
}

fn team_and_captain(args: &str, usage: &'static str) -> Result<(String, String), ParseError> {
    let (team_name, captain_handle) = split_first_word(args);
    if team_name.is_empty() || captain_handle.is_empty() {
        return Err(ParseError::Usage(usage));
    }
    Ok((team_name.to_string(), captain_handle.to_string()))
}

fn single_word<'a>(args: &'a str, usage: &'static str) -> Result<&'a str, ParseError> {
    let (word, rest) = split_first_word(args);
    if word.is_empty() || !rest.is_empty() {
        return Err(ParseError::Usage(usage));
    }
    Ok(word)
}

fn single_number(args: &str, usage: &'static str) -> Result<i64, ParseError> {
    single_word(args, usage)?
        .parse()
        .map_err(|_| ParseError::Usage(usage))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Command {
        Command::parse_message(text).unwrap().unwrap()
    }

    #[test]
    fn register_takes_team_and_rest_of_line_as_captain() {
        assert_eq!(
            parse("/register Wolves @alpha and friends"),
            Command::Register {
                team_name: "Wolves".to_string(),
                captain_handle: "@alpha and friends".to_string(),
            }
        );
    }

    #[test]
    fn register_without_captain_is_usage_error() {
        assert_eq!(
            Command::parse_message("/register Wolves"),
            Err(ParseError::Usage(REGISTER_USAGE))
        );
        assert_eq!(
            Command::parse_message("/reserve"),
            Err(ParseError::Usage(RESERVE_USAGE))
        );
    }

    #[test]
    fn only_register_usage_is_public() {
        assert!(!ParseError::Usage(REGISTER_USAGE).requires_admin());
        assert!(ParseError::Usage(RESERVE_USAGE).requires_admin());
        assert!(ParseError::Usage(BROADCAST_USAGE).requires_admin());
    }

    #[test]
    fn bot_mention_suffix_is_stripped() {
        assert_eq!(parse("/teamlist@tourney_bot"), Command::ListSlots);
    }

    #[test]
    fn numeric_arguments_are_validated() {
        assert_eq!(
            parse("/approvechat -100123"),
            Command::ApproveRoom { chat_id: -100123 }
        );
        assert_eq!(
            Command::parse_message("/approvechat abc"),
            Err(ParseError::Usage(APPROVE_CHAT_USAGE))
        );
        assert_eq!(parse("/grantaccess 77"), Command::GrantAccess { user_id: 77 });
    }

    #[test]
    fn setcapchat_needs_exactly_one_destination() {
        assert_eq!(
            parse("/setcapchat @captains"),
            Command::SetAnnounceTarget {
                destination: "@captains".to_string()
            }
        );
        assert_eq!(
            Command::parse_message("/setcapchat a b"),
            Err(ParseError::Usage(SET_CAP_CHAT_USAGE))
        );
    }

    #[test]
    fn broadcast_keeps_text_body() {
        assert_eq!(
            parse("/broadcast hello\nsecond line"),
            Command::Broadcast {
                text: "hello\nsecond line".to_string()
            }
        );
    }

    #[test]
    fn plain_text_with_links_is_proof_submission() {
        assert!(matches!(
            parse("my proofs https://t.me/@a https://youtube.com/@b"),
            Command::SubmitProof { .. }
        ));
        assert_eq!(Command::parse_message("just chatting"), Ok(None));
        assert_eq!(Command::parse_message("/unknown thing"), Ok(None));
    }

    #[test]
    fn admin_commands_are_flagged() {
        assert!(parse("/resetlimit").requires_admin());
        assert!(parse("/reservelist").requires_admin());
        assert!(!parse("/teamlist").requires_admin());
        assert!(!parse("/autocheck").requires_admin());
    }

    #[test]
    fn callback_tokens_round_trip_through_parse() {
        let token = ActionToken::Cancel(12);
        assert_eq!(token.encode(), "cancel:12");
        assert_eq!(
            Command::parse_callback(&token.encode()),
            Ok(Command::Cancel { slot: 12 })
        );
        assert_eq!(
            Command::parse_callback("confirm:7"),
            Ok(Command::Confirm { slot: 7 })
        );
    }

    #[test]
    fn malformed_callbacks_are_rejected() {
        for data in ["confirm:", "confirm:abc", "delete:5", "confirm_5"] {
            assert!(matches!(
                Command::parse_callback(data),
                Err(ParseError::UnknownAction(_))
            ));
        }
    }
}
