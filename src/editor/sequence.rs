//! Ordered activity list with position-based transitions.
//!
//! Each transition consumes the sequence and returns the next one, so a
//! failed edit leaves the caller holding nothing half-applied. Positions are
//! always dense (0..len) after a transition.

use uuid::Uuid;

use crate::error::ProtocolError;
use crate::models::*;
use crate::validation::{validate_activity, validate_draft};

#[derive(Debug, Clone, PartialEq)]
pub struct ActivitySequence {
    activities: Vec<ActivityDefinition>,
}

impl ActivitySequence {
    /// Sorts by stored position and renumbers.
    pub fn new(mut activities: Vec<ActivityDefinition>) -> Self {
        activities.sort_by_key(|a| a.position);
        let mut sequence = Self { activities };
        sequence.renumber();
        sequence
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn get(&self, id: &Uuid) -> Option<&ActivityDefinition> {
        self.activities.iter().find(|a| a.id == *id)
    }

    pub fn as_slice(&self) -> &[ActivityDefinition] {
        &self.activities
    }

    pub fn into_vec(self) -> Vec<ActivityDefinition> {
        self.activities
    }

    /// Moves the activity at `from` so it ends up at index `to`.
    pub fn reorder(mut self, from: usize, to: usize) -> Result<Self, ProtocolError> {
        let len = self.activities.len();
        if from >= len || to >= len {
            return Err(ProtocolError::Validation(format!(
                "cannot move position {from} to {to} in a sequence of {len}"
            )));
        }
        let moved = self.activities.remove(from);
        self.activities.insert(to, moved);
        self.renumber();
        Ok(self)
    }

    /// Applies `patch` to one activity. The flag is true when its rule changed.
    pub fn update(
        mut self,
        id: &Uuid,
        patch: &ActivityPatch,
    ) -> Result<(Self, bool), ProtocolError> {
        let index = self.index_of(id)?;
        let mut patched = self.activities[index].clone();
        let rule_changed = patch.apply_to(&mut patched);
        validate_activity(&patched)?;
        self.activities[index] = patched;
        Ok((self, rule_changed))
    }

    /// Takes one activity out; the rest close up behind it.
    pub fn remove(mut self, id: &Uuid) -> Result<(Self, ActivityDefinition), ProtocolError> {
        let index = self.index_of(id)?;
        let removed = self.activities.remove(index);
        self.renumber();
        Ok((self, removed))
    }

    /// Appends a new activity under `id`.
    pub fn add(mut self, id: Uuid, draft: ActivityDraft) -> Result<Self, ProtocolError> {
        validate_draft(&draft)?;
        if self.get(&id).is_some() {
            return Err(ProtocolError::Validation(format!("activity {id} already exists")));
        }
        let position = self.activities.len() as u32;
        self.activities.push(draft.into_definition(id, position));
        Ok(self)
    }

    fn index_of(&self, id: &Uuid) -> Result<usize, ProtocolError> {
        self.activities
            .iter()
            .position(|a| a.id == *id)
            .ok_or_else(|| ProtocolError::not_found("activity", id))
    }

    fn renumber(&mut self) {
        for (i, activity) in self.activities.iter_mut().enumerate() {
            activity.position = i as u32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::FrequencyRule;
    use std::collections::BTreeSet;

    fn activity(n: u128, position: u32) -> ActivityDefinition {
        ActivityDraft::new(ActivityCategory::Exercise, "Mobility", FrequencyRule::Daily)
            .into_definition(Uuid::from_u128(n), position)
    }

    fn ids(sequence: &ActivitySequence) -> Vec<u128> {
        sequence.as_slice().iter().map(|a| a.id.as_u128()).collect()
    }

    fn positions(sequence: &ActivitySequence) -> Vec<u32> {
        sequence.as_slice().iter().map(|a| a.position).collect()
    }

    #[test]
    fn new_sorts_and_closes_gaps() {
        let sequence = ActivitySequence::new(vec![activity(3, 9), activity(1, 2), activity(2, 5)]);
        assert_eq!(ids(&sequence), vec![1, 2, 3]);
        assert_eq!(positions(&sequence), vec![0, 1, 2]);
    }

    #[test]
    fn reorder_splices_forward_and_back() {
        let base = ActivitySequence::new(vec![
            activity(1, 0),
            activity(2, 1),
            activity(3, 2),
            activity(4, 3),
        ]);

        let forward = base.clone().reorder(0, 2).unwrap();
        assert_eq!(ids(&forward), vec![2, 3, 1, 4]);
        assert_eq!(positions(&forward), vec![0, 1, 2, 3]);

        let back = base.clone().reorder(3, 0).unwrap();
        assert_eq!(ids(&back), vec![4, 1, 2, 3]);

        let same = base.clone().reorder(1, 1).unwrap();
        assert_eq!(same, base);
    }

    #[test]
    fn reorder_out_of_range_is_rejected() {
        let base = ActivitySequence::new(vec![activity(1, 0), activity(2, 1)]);
        assert!(matches!(base.clone().reorder(0, 2), Err(ProtocolError::Validation(_))));
        assert!(base.reorder(5, 0).is_err());
    }

    #[test]
    fn update_reports_rule_changes_only() {
        let base = ActivitySequence::new(vec![activity(1, 0)]);
        let id = Uuid::from_u128(1);

        let patch = ActivityPatch {
            description: Some("Slow reps".into()),
            ..ActivityPatch::default()
        };
        let (updated, rule_changed) = base.clone().update(&id, &patch).unwrap();
        assert!(!rule_changed);
        assert_eq!(updated.get(&id).unwrap().description, "Slow reps");

        let weekly = ActivityPatch::frequency(FrequencyRule::Weekly);
        let (_, rule_changed) = base.clone().update(&id, &weekly).unwrap();
        assert!(rule_changed);

        let daily = ActivityPatch::frequency(FrequencyRule::Daily);
        let (_, rule_changed) = base.update(&id, &daily).unwrap();
        assert!(!rule_changed);
    }

    #[test]
    fn invalid_patch_is_rejected() {
        let base = ActivitySequence::new(vec![activity(1, 0)]);
        let bad = ActivityPatch::frequency(FrequencyRule::ManualDates {
            start_month: 13,
            days_of_month: BTreeSet::from([1]),
        });
        let err = base.update(&Uuid::from_u128(1), &bad).unwrap_err();
        assert!(matches!(err, ProtocolError::Validation(_)));
    }

    #[test]
    fn remove_and_add_keep_positions_dense() {
        let base = ActivitySequence::new(vec![activity(1, 0), activity(2, 1), activity(3, 2)]);
        let (removed, gone) = base.remove(&Uuid::from_u128(2)).unwrap();
        assert_eq!(gone.id, Uuid::from_u128(2));
        assert_eq!(ids(&removed), vec![1, 3]);
        assert_eq!(positions(&removed), vec![0, 1]);

        let draft =
            ActivityDraft::new(ActivityCategory::Diet, "Hydration", FrequencyRule::TwiceDaily);
        let added = removed.add(Uuid::from_u128(9), draft).unwrap();
        assert_eq!(ids(&added), vec![1, 3, 9]);
        assert_eq!(positions(&added), vec![0, 1, 2]);
    }

    #[test]
    fn unknown_activity_is_not_found() {
        let base = ActivitySequence::new(vec![activity(1, 0)]);
        let err = base.remove(&Uuid::from_u128(42)).unwrap_err();
        assert!(matches!(err, ProtocolError::NotFound { .. }));
    }
}
