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

use std::collections::BTreeMap;

use chrono::Utc;

use crate::{FIRST_SLOT_NUMBER, Registration, SlotNumber, SlotStatus, SlotSummary, UserId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("free registration already used by {0}")]
    QuotaExceeded(UserId),
    #[error("slot {0} is not registered")]
    NotFound(SlotNumber),
    #[error("requester is not the captain of slot {0}")]
    NotCaptain(SlotNumber),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmOutcome {
    pub registration: Registration,
    /// `false` when the slot was already confirmed.
    pub newly_confirmed: bool,
}

/// Slot number to registration, one record per slot.
#[derive(Debug, Clone)]
pub struct SlotRegistry {
    first_slot: SlotNumber,
    slots: BTreeMap<SlotNumber, Registration>,
}

impl Default for SlotRegistry {
    fn default() -> Self {
        Self::new(FIRST_SLOT_NUMBER)
    }
}

impl SlotRegistry {
    pub fn new(first_slot: SlotNumber) -> Self {
        Self {
            first_slot: first_slot.max(1),
            slots: BTreeMap::new(),
        }
    }

    /// First integer at or above the configured minimum with no registration.
    pub fn next_free_slot(&self) -> SlotNumber {
        let mut slot = self.first_slot;
        while self.slots.contains_key(&slot) {
            slot += 1;
        }
        slot
    }

    /// Places a pending registration into `slot`, which must be vacant.
    pub(crate) fn insert_pending(
        &mut self,
        slot: SlotNumber,
        team_name: String,
        captain_handle: String,
        captain_id: Option<UserId>,
    ) -> Registration {
        debug_assert!(!self.slots.contains_key(&slot), "slot {slot} already taken");
        let registration = Registration {
            slot,
            team_name,
            captain_handle,
            captain_id,
            status: SlotStatus::Pending,
            registered_at: Utc::now(),
        };
        self.slots.insert(slot, registration.clone());
        registration
    }

    pub fn confirm(
        &mut self,
        slot: SlotNumber,
        requester: UserId,
    ) -> Result<ConfirmOutcome, RegistryError> {
        let registration = self.captain_slot_mut(slot, requester)?;
        let newly_confirmed = registration.status != SlotStatus::Confirmed;
        registration.status = SlotStatus::Confirmed;
        Ok(ConfirmOutcome {
            registration: registration.clone(),
            newly_confirmed,
        })
    }

    /// Deletes the slot's registration if `requester` is its captain.
    pub(crate) fn remove_by_captain(
        &mut self,
        slot: SlotNumber,
        requester: UserId,
    ) -> Result<Registration, RegistryError> {
        self.captain_slot_mut(slot, requester)?;
        self.slots.remove(&slot).ok_or(RegistryError::NotFound(slot))
    }

    pub fn lookup(&self, slot: SlotNumber) -> Option<&Registration> {
        self.slots.get(&slot)
    }

    pub fn list(&self) -> Vec<SlotSummary> {
        self.slots
            .values()
            .map(|registration| SlotSummary {
                slot: registration.slot,
                team_name: registration.team_name.clone(),
                status: registration.status,
            })
            .collect()
    }

    /// Full records in slot order.
    pub fn registrations(&self) -> Vec<Registration> {
        self.slots.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn captain_slot_mut(
        &mut self,
        slot: SlotNumber,
        requester: UserId,
    ) -> Result<&mut Registration, RegistryError> {
        let registration = self
            .slots
            .get_mut(&slot)
            .ok_or(RegistryError::NotFound(slot))?;
        if !registration.is_captain(requester) {
            return Err(RegistryError::NotCaptain(slot));
        }
        Ok(registration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(registry: &mut SlotRegistry, captain: UserId) -> SlotNumber {
        let slot = registry.next_free_slot();
        registry.insert_pending(
            slot,
            format!("team-{captain}"),
            format!("@cap{captain}"),
            Some(captain),
        );
        slot
    }

    #[test]
    fn next_free_slot_starts_at_minimum_and_fills_gaps() {
        let mut registry = SlotRegistry::default();
        assert_eq!(registry.next_free_slot(), 5);

        assert_eq!(insert(&mut registry, 1), 5);
        assert_eq!(insert(&mut registry, 2), 6);
        assert_eq!(insert(&mut registry, 3), 7);

        registry.remove_by_captain(6, 2).unwrap();
        assert_eq!(registry.next_free_slot(), 6);
    }

    #[test]
    fn confirm_by_captain_is_idempotent() {
        let mut registry = SlotRegistry::default();
        let slot = insert(&mut registry, 9);

        let first = registry.confirm(slot, 9).unwrap();
        assert!(first.newly_confirmed);
        assert_eq!(first.registration.status, SlotStatus::Confirmed);

        let second = registry.confirm(slot, 9).unwrap();
        assert!(!second.newly_confirmed);
        assert_eq!(registry.lookup(slot).unwrap().status, SlotStatus::Confirmed);
    }

    #[test]
    fn confirm_by_stranger_leaves_status_untouched() {
        let mut registry = SlotRegistry::default();
        let slot = insert(&mut registry, 9);

        assert_eq!(
            registry.confirm(slot, 10),
            Err(RegistryError::NotCaptain(slot))
        );
        assert_eq!(registry.lookup(slot).unwrap().status, SlotStatus::Pending);
    }

    #[test]
    fn missing_slot_is_not_found() {
        let mut registry = SlotRegistry::default();
        assert_eq!(registry.confirm(12, 1), Err(RegistryError::NotFound(12)));
        assert_eq!(
            registry.remove_by_captain(12, 1),
            Err(RegistryError::NotFound(12))
        );
    }

    #[test]
    fn slot_without_captain_identity_rejects_everyone() {
        let mut registry = SlotRegistry::default();
        registry.insert_pending(5, "Reserve".to_string(), "@r".to_string(), None);

        assert_eq!(registry.confirm(5, 0), Err(RegistryError::NotCaptain(5)));
        assert_eq!(
            registry.remove_by_captain(5, 0),
            Err(RegistryError::NotCaptain(5))
        );
    }

    #[test]
    fn list_is_ordered_by_slot() {
        let mut registry = SlotRegistry::new(5);
        registry.insert_pending(9, "Late".to_string(), "@l".to_string(), Some(3));
        registry.insert_pending(5, "Early".to_string(), "@e".to_string(), Some(1));
        registry.insert_pending(7, "Mid".to_string(), "@m".to_string(), Some(2));

        let slots: Vec<SlotNumber> = registry.list().iter().map(|s| s.slot).collect();
        assert_eq!(slots, vec![5, 7, 9]);
    }
}
