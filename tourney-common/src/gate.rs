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

use std::collections::BTreeSet;

use crate::ChatId;

/// Chat rooms where proof auto-checking is switched on.
#[derive(Debug, Clone, Default)]
pub struct EventGate {
    enabled: BTreeSet<ChatId>,
}

impl EventGate {
    /// Returns `false` if the room was already enabled.
    pub fn enable(&mut self, chat_id: ChatId) -> bool {
        self.enabled.insert(chat_id)
    }

    pub fn is_enabled(&self, chat_id: ChatId) -> bool {
        self.enabled.contains(&chat_id)
    }
}
