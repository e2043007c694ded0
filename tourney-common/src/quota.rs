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

use crate::UserId;

/// Tracks who has spent their single free registration.
///
/// The administrator and users granted access are exempt from the cap. A
/// reset clears consumed quota only; grants survive it.
#[derive(Debug, Clone)]
pub struct QuotaTracker {
    admin_id: UserId,
    used: BTreeSet<UserId>,
    granted: BTreeSet<UserId>,
}

impl QuotaTracker {
    pub fn new(admin_id: UserId) -> Self {
        Self {
            admin_id,
            used: BTreeSet::new(),
            granted: BTreeSet::new(),
        }
    }

    pub fn has_used_free_slot(&self, user_id: UserId) -> bool {
        self.used.contains(&user_id)
    }

    pub fn mark_used(&mut self, user_id: UserId) {
        self.used.insert(user_id);
    }

    pub fn is_exempt(&self, user_id: UserId) -> bool {
        user_id == self.admin_id || self.granted.contains(&user_id)
    }

    /// True when the user may not take another free slot.
    pub fn is_exhausted(&self, user_id: UserId) -> bool {
        self.has_used_free_slot(user_id) && !self.is_exempt(user_id)
    }

    /// Returns `false` if the user already had access.
    pub fn grant(&mut self, user_id: UserId) -> bool {
        self.granted.insert(user_id)
    }

    /// Returns how many records were dropped.
    pub fn reset_all(&mut self) -> usize {
        let cleared = self.used.len();
        self.used.clear();
        cleared
    }

    /// Users known to the bot, in id order. Used as the broadcast audience.
    pub fn known_users(&self) -> Vec<UserId> {
        self.used.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: UserId = 1;

    #[test]
    fn marked_user_is_exhausted_until_reset() {
        let mut quota = QuotaTracker::new(ADMIN);
        assert!(!quota.is_exhausted(10));

        quota.mark_used(10);
        assert!(quota.has_used_free_slot(10));
        assert!(quota.is_exhausted(10));

        assert_eq!(quota.reset_all(), 1);
        assert!(!quota.has_used_free_slot(10));
        assert!(!quota.is_exhausted(10));
    }

    #[test]
    fn admin_is_never_exhausted() {
        let mut quota = QuotaTracker::new(ADMIN);
        quota.mark_used(ADMIN);
        assert!(quota.has_used_free_slot(ADMIN));
        assert!(!quota.is_exhausted(ADMIN));
    }

    #[test]
    fn grants_survive_reset() {
        let mut quota = QuotaTracker::new(ADMIN);
        assert!(quota.grant(20));
        assert!(!quota.grant(20));
        quota.mark_used(20);
        assert!(!quota.is_exhausted(20));

        quota.reset_all();
        quota.mark_used(20);
        assert!(quota.is_exempt(20));
        assert!(!quota.is_exhausted(20));
    }

    #[test]
    fn known_users_are_sorted_and_unique() {
        let mut quota = QuotaTracker::new(ADMIN);
        quota.mark_used(30);
        quota.mark_used(10);
        quota.mark_used(30);
        assert_eq!(quota.known_users(), vec![10, 30]);
    }
}
