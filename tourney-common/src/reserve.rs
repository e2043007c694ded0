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

use std::collections::VecDeque;

use crate::{ReserveEntry, ReserveListing};

/// FIFO waitlist of teams waiting for a vacated slot.
#[derive(Debug, Clone, Default)]
pub struct ReserveQueue {
    entries: VecDeque<ReserveEntry>,
}

impl ReserveQueue {
    /// Appends to the tail and returns the 1-based position.
    pub fn add(&mut self, team_name: impl Into<String>, captain_handle: impl Into<String>) -> usize {
        self.entries.push_back(ReserveEntry {
            team_name: team_name.into(),
            captain_handle: captain_handle.into(),
        });
        self.entries.len()
    }

    /// Removes and returns the earliest-added entry.
    pub fn pop_next(&mut self) -> Option<ReserveEntry> {
        self.entries.pop_front()
    }

    pub fn list(&self) -> Vec<ReserveListing> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| ReserveListing {
                position: index + 1,
                team_name: entry.team_name.clone(),
                captain_handle: entry.captain_handle.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
