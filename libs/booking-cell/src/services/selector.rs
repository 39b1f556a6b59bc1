use serde::Serialize;

use crate::models::TimeSlot;

/// Result of clicking a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SelectionOutcome {
    Selected,
    Deselected,
    Unavailable,
    CapacityReached { max: usize },
}

/// Ordered, capped set of chosen slots.
#[derive(Debug, Clone)]
pub struct SlotSelector {
    max_selections: usize,
    selected: Vec<TimeSlot>,
}

impl SlotSelector {
    pub fn new(max_selections: usize) -> Self {
        Self {
            max_selections: max_selections.max(1),
            selected: Vec::new(),
        }
    }

    pub fn toggle(&mut self, slot: &TimeSlot) -> SelectionOutcome {
        if !slot.is_available {
            return SelectionOutcome::Unavailable;
        }

        if let Some(pos) = self.selected.iter().position(|s| s.id == slot.id) {
            self.selected.remove(pos);
            return SelectionOutcome::Deselected;
        }

        if self.selected.len() >= self.max_selections {
            return SelectionOutcome::CapacityReached { max: self.max_selections };
        }

        self.selected.push(slot.clone());
        SelectionOutcome::Selected
    }

    pub fn selected(&self) -> &[TimeSlot] {
        &self.selected
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.selected.iter().map(|s| s.id.clone()).collect()
    }

    pub fn max_selections(&self) -> usize {
        self.max_selections
    }

    pub fn remaining(&self) -> usize {
        self.max_selections - self.selected.len()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}
