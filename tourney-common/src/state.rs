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

use crate::{
    ChatId, EventGate, QuotaTracker, Registration, RegistryError, ReserveListing, ReserveQueue,
    SlotEvent, SlotNumber, SlotRegistry, SlotSummary, UserId, registry::ConfirmOutcome,
};

#[derive(Debug, Clone)]
pub struct RegisterOutcome {
    pub registration: Registration,
    pub announcement: Option<SlotEvent>,
}

#[derive(Debug, Clone)]
pub struct CancelOutcome {
    pub cancelled: Registration,
    pub promoted: Option<Registration>,
    /// Set only when a reserve team took the freed slot.
    pub announcement: Option<SlotEvent>,
}

/// Every piece of mutable tournament state, owned in one place.
///
/// Callers wrap this in a single lock; each method is one atomic unit with
/// respect to that lock and never performs I/O.
#[derive(Debug, Clone)]
pub struct TournamentState {
    admin_id: UserId,
    pub registry: SlotRegistry,
    pub reserve: ReserveQueue,
    pub quota: QuotaTracker,
    pub gate: EventGate,
    announce_target: Option<String>,
}

impl TournamentState {
    pub fn new(admin_id: UserId) -> Self {
        Self {
            admin_id,
            registry: SlotRegistry::default(),
            reserve: ReserveQueue::default(),
            quota: QuotaTracker::new(admin_id),
            gate: EventGate::default(),
            announce_target: None,
        }
    }

    pub fn admin_id(&self) -> UserId {
        self.admin_id
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        user_id == self.admin_id
    }

    pub fn announce_target(&self) -> Option<&str> {
        self.announce_target.as_deref()
    }

    pub fn set_announce_target(&mut self, destination: impl Into<String>) {
        self.announce_target = Some(destination.into());
    }

    pub fn register(
        &mut self,
        team_name: impl Into<String>,
        captain_handle: impl Into<String>,
        captain_id: UserId,
    ) -> Result<RegisterOutcome, RegistryError> {
        if self.quota.is_exhausted(captain_id) {
            return Err(RegistryError::QuotaExceeded(captain_id));
        }

        let slot = self.registry.next_free_slot();
        let registration = self.registry.insert_pending(
            slot,
            team_name.into(),
            captain_handle.into(),
            Some(captain_id),
        );
        self.quota.mark_used(captain_id);

        let announcement = self
            .announce_target
            .as_deref()
            .map(|destination| SlotEvent::registered(destination, &registration));

        Ok(RegisterOutcome {
            registration,
            announcement,
        })
    }

    pub fn confirm(
        &mut self,
        slot: SlotNumber,
        requester: UserId,
    ) -> Result<ConfirmOutcome, RegistryError> {
        self.registry.confirm(slot, requester)
    }

    /// Removes the registration and immediately hands the slot to the head of
    /// the reserve queue, if any.
    pub fn cancel(
        &mut self,
        slot: SlotNumber,
        requester: UserId,
    ) -> Result<CancelOutcome, RegistryError> {
        let cancelled = self.registry.remove_by_captain(slot, requester)?;
        let promoted = self.promote_reserve_into(slot);
        let announcement = match (&promoted, self.announce_target.as_deref()) {
            (Some(registration), Some(destination)) => {
                Some(SlotEvent::reserve_promoted(destination, registration))
            }
            _ => None,
        };

        Ok(CancelOutcome {
            cancelled,
            promoted,
            announcement,
        })
    }

    /// Promoted teams are not checked against the free-registration quota.
    pub fn promote_reserve_into(&mut self, slot: SlotNumber) -> Option<Registration> {
        if self.registry.lookup(slot).is_some() {
            return None;
        }
        let entry = self.reserve.pop_next()?;
        Some(
            self.registry
                .insert_pending(slot, entry.team_name, entry.captain_handle, None),
        )
    }

    pub fn add_reserve(
        &mut self,
        team_name: impl Into<String>,
        captain_handle: impl Into<String>,
    ) -> usize {
        self.reserve.add(team_name, captain_handle)
    }

    pub fn list_slots(&self) -> Vec<SlotSummary> {
        self.registry.list()
    }

    pub fn lookup(&self, slot: SlotNumber) -> Option<&Registration> {
        self.registry.lookup(slot)
    }

    pub fn list_reserve(&self) -> Vec<ReserveListing> {
        self.reserve.list()
    }

    pub fn reset_quota(&mut self) -> usize {
        self.quota.reset_all()
    }

    pub fn grant_access(&mut self, user_id: UserId) -> bool {
        self.quota.grant(user_id)
    }

    pub fn enable_room(&mut self, chat_id: ChatId) -> bool {
        self.gate.enable(chat_id)
    }

    pub fn is_room_enabled(&self, chat_id: ChatId) -> bool {
        self.gate.is_enabled(chat_id)
    }

    pub fn broadcast_recipients(&self) -> Vec<UserId> {
        self.quota.known_users()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::{SlotEventType, SlotStatus};

    const ADMIN: UserId = 1;

    fn state() -> TournamentState {
        TournamentState::new(ADMIN)
    }

    #[test]
    fn distinct_users_get_unique_consecutive_slots() {
        let mut state = state();
        let slots: Vec<SlotNumber> = (100..110)
            .map(|user| {
                state
                    .register(format!("team-{user}"), format!("@u{user}"), user)
                    .unwrap()
                    .registration
                    .slot
            })
            .collect();

        assert_eq!(slots, (5..15).collect::<Vec<_>>());
        let unique: HashSet<_> = slots.iter().collect();
        assert_eq!(unique.len(), slots.len());
    }

    #[test]
    fn second_registration_is_refused_until_reset() {
        let mut state = state();
        state.register("Wolves", "@w", 50).unwrap();

        let err = state.register("Wolves II", "@w", 50).unwrap_err();
        assert_eq!(err, RegistryError::QuotaExceeded(50));
        assert_eq!(state.registry.len(), 1);

        state.reset_quota();
        assert_eq!(state.register("Wolves II", "@w", 50).unwrap().registration.slot, 6);
    }

    #[test]
    fn admin_registers_without_limit() {
        let mut state = state();
        for _ in 0..3 {
            state.register("House", "@admin", ADMIN).unwrap();
        }
        assert_eq!(state.registry.len(), 3);
    }

    #[test]
    fn granted_user_bypasses_quota() {
        let mut state = state();
        state.register("Paid", "@p", 70).unwrap();
        assert!(state.grant_access(70));
        assert!(state.register("Paid II", "@p", 70).is_ok());
    }

    #[test]
    fn registration_announcement_requires_target() {
        let mut state = state();
        let silent = state.register("Quiet", "@q", 10).unwrap();
        assert!(silent.announcement.is_none());

        state.set_announce_target("@caps");
        let loud = state.register("Loud", "@l", 11).unwrap();
        let event = loud.announcement.unwrap();
        assert_eq!(event.event_type, SlotEventType::Registered);
        assert_eq!(event.slot, 6);
        assert_eq!(event.actions, vec!["confirm:6", "cancel:6"]);
    }

    #[test]
    fn cancel_promotes_reserve_head_into_freed_slot() {
        let mut state = state();
        state.set_announce_target("@caps");
        state.register("Alpha", "@a", 10).unwrap();
        state.register("Bravo", "@b", 11).unwrap();
        state.add_reserve("Reserve One", "@r1");
        state.add_reserve("Reserve Two", "@r2");

        let outcome = state.cancel(5, 10).unwrap();
        assert_eq!(outcome.cancelled.team_name, "Alpha");

        let promoted = outcome.promoted.unwrap();
        assert_eq!(promoted.slot, 5);
        assert_eq!(promoted.team_name, "Reserve One");
        assert_eq!(promoted.status, SlotStatus::Pending);
        assert_eq!(promoted.captain_id, None);
        assert_eq!(state.reserve.len(), 1);
        assert_eq!(state.lookup(5).unwrap().team_name, "Reserve One");

        let event = outcome.announcement.unwrap();
        assert_eq!(event.event_type, SlotEventType::ReservePromoted);
        assert_eq!(event.team_name, "Reserve One");
    }

    #[test]
    fn cancel_with_empty_reserve_leaves_slot_vacant_and_silent() {
        let mut state = state();
        state.set_announce_target("@caps");
        state.register("Alpha", "@a", 10).unwrap();

        let outcome = state.cancel(5, 10).unwrap();
        assert!(outcome.promoted.is_none());
        assert!(outcome.announcement.is_none());
        assert!(state.lookup(5).is_none());
    }

    #[test]
    fn cancel_by_non_captain_keeps_registration() {
        let mut state = state();
        state.register("Alpha", "@a", 10).unwrap();
        state.add_reserve("Reserve", "@r");

        assert_eq!(state.cancel(5, 11).unwrap_err(), RegistryError::NotCaptain(5));
        assert_eq!(state.lookup(5).unwrap().team_name, "Alpha");
        assert_eq!(state.reserve.len(), 1);
    }

    #[test]
    fn promotion_ignores_quota_and_does_not_mark_it() {
        let mut state = state();
        state.register("Alpha", "@a", 10).unwrap();
        state.add_reserve("Reserve", "@r");
        state.cancel(5, 10).unwrap();

        assert_eq!(state.broadcast_recipients(), vec![10]);
    }

    #[test]
    fn promote_into_occupied_slot_keeps_queue() {
        let mut state = state();
        state.register("Alpha", "@a", 10).unwrap();
        state.add_reserve("Reserve", "@r");

        assert!(state.promote_reserve_into(5).is_none());
        assert_eq!(state.reserve.len(), 1);
    }
}
