//! Tri-state sort controller.
//!
//! Header clicks move a view through `Unsorted`, `Ascending(field)` and
//! `Descending(field)`. Clicking a different field always restarts at
//! ascending. What follows descending depends on the view's [`SortCycle`]:
//! back to unsorted (three-way) or back to ascending (two-way).
//!
//! Projection never mutates the input and uses a stable sort, so records
//! with equal keys keep their input order in both directions.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use spreadwatch_core::{FieldId, ListRecord};

use crate::comparator::{compare, SortDirection};
use crate::error::{SortError, SortResult};
use crate::schema::SortSchema;

/// Header-click cycle length, declared per view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortCycle {
    /// Ascending -> Descending -> Ascending.
    TwoWay,
    /// Ascending -> Descending -> Unsorted.
    ThreeWay,
}

/// Current sort of a view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SortState {
    #[default]
    Unsorted,
    Ascending(FieldId),
    Descending(FieldId),
}

impl SortState {
    /// Active field, if any.
    pub fn field(&self) -> Option<&FieldId> {
        match self {
            Self::Unsorted => None,
            Self::Ascending(f) | Self::Descending(f) => Some(f),
        }
    }

    /// Active direction, if any.
    pub fn direction(&self) -> Option<SortDirection> {
        match self {
            Self::Unsorted => None,
            Self::Ascending(_) => Some(SortDirection::Ascending),
            Self::Descending(_) => Some(SortDirection::Descending),
        }
    }

    /// Direction applied to `field`, for header indicators.
    pub fn direction_for(&self, field: &FieldId) -> Option<SortDirection> {
        if self.field() == Some(field) {
            self.direction()
        } else {
            None
        }
    }

    /// State after the header for `field` is clicked.
    pub fn next(&self, field: &FieldId, cycle: SortCycle) -> SortState {
        match self {
            Self::Ascending(current) if current == field => Self::Descending(field.clone()),
            Self::Descending(current) if current == field => match cycle {
                SortCycle::ThreeWay => Self::Unsorted,
                SortCycle::TwoWay => Self::Ascending(field.clone()),
            },
            _ => Self::Ascending(field.clone()),
        }
    }
}

/// Per-view sort state machine.
#[derive(Debug, Clone)]
pub struct SortController {
    schema: SortSchema,
    cycle: SortCycle,
    state: SortState,
}

impl SortController {
    /// Create an unsorted controller.
    pub fn new(schema: SortSchema, cycle: SortCycle) -> Self {
        Self {
            schema,
            cycle,
            state: SortState::Unsorted,
        }
    }

    pub fn state(&self) -> &SortState {
        &self.state
    }

    pub fn cycle(&self) -> SortCycle {
        self.cycle
    }

    pub fn schema(&self) -> &SortSchema {
        &self.schema
    }

    /// Handle a header click.
    ///
    /// Clicking a field the view never declared is a programming error:
    /// debug builds panic, release builds leave the state unchanged and
    /// return [`SortError::UndeclaredField`].
    pub fn toggle(&mut self, field: impl Into<FieldId>) -> SortResult<&SortState> {
        let field = field.into();
        let declared = self.schema.contains(&field);
        debug_assert!(declared, "undeclared sort field: {field}");
        if !declared {
            warn!(field = %field, "Sort requested on undeclared field");
            return Err(SortError::UndeclaredField(field.to_string()));
        }

        self.state = self.state.next(&field, self.cycle);
        debug!(field = %field, state = ?self.state, "Sort state changed");
        Ok(&self.state)
    }

    /// Return to the original input order.
    pub fn reset(&mut self) {
        self.state = SortState::Unsorted;
    }

    /// Sorted view of `items`; input order when unsorted.
    pub fn project<'a>(&self, items: &'a [ListRecord]) -> Vec<&'a ListRecord> {
        self.project_by(items, as_record)
    }

    /// Sorted view of any item type that carries a [`ListRecord`].
    pub fn project_by<'a, T, F>(&self, items: &'a [T], record: F) -> Vec<&'a T>
    where
        F: Fn(&T) -> &ListRecord,
    {
        let mut projected: Vec<&T> = items.iter().collect();

        let (field, direction) = match (self.state.field(), self.state.direction()) {
            (Some(field), Some(direction)) => (field, direction),
            _ => return projected,
        };
        // toggle() only accepts declared fields
        let Some(kind) = self.schema.kind_of(field) else {
            return projected;
        };

        projected.sort_by(|a, b| compare(record(*a), record(*b), field, kind, direction));
        projected
    }
}

fn as_record(record: &ListRecord) -> &ListRecord {
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::{FieldKind, RankTable};
    use serde_json::json;

    fn users() -> Vec<ListRecord> {
        [
            json!({"id": 1, "email": "carol@x.io", "plan": "pro", "createdAt": "2024-03-01T00:00:00Z", "age": 30}),
            json!({"id": 2, "email": "alice@x.io", "plan": "free", "createdAt": "2024-01-01T00:00:00Z", "age": 25}),
            json!({"id": 3, "email": "bob@x.io", "plan": "enterprise", "createdAt": "2024-02-01T00:00:00Z", "age": 30}),
            json!({"id": 4, "email": null, "plan": "free", "createdAt": "2024-04-01T00:00:00Z", "age": 25}),
        ]
        .into_iter()
        .map(|v| ListRecord::from_value(v).unwrap())
        .collect()
    }

    fn schema() -> SortSchema {
        SortSchema::new()
            .field("email", FieldKind::Text)
            .field("createdAt", FieldKind::Timestamp)
            .field("age", FieldKind::Numeric)
            .field("plan", FieldKind::Rank(RankTable::new(["free", "pro", "enterprise"])))
    }

    fn ids(rows: &[&ListRecord]) -> Vec<i64> {
        rows.iter()
            .map(|r| r.number("id").unwrap() as i64)
            .collect()
    }

    #[test]
    fn test_three_way_cycle_returns_to_input_order() {
        let items = users();
        let mut controller = SortController::new(schema(), SortCycle::ThreeWay);

        controller.toggle("createdAt").unwrap();
        assert_eq!(ids(&controller.project(&items)), vec![2, 3, 1, 4]);

        controller.toggle("createdAt").unwrap();
        assert_eq!(ids(&controller.project(&items)), vec![4, 1, 3, 2]);

        controller.toggle("createdAt").unwrap();
        assert_eq!(controller.state(), &SortState::Unsorted);
        assert_eq!(ids(&controller.project(&items)), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_two_way_cycle_never_unsorts() {
        let mut controller = SortController::new(schema(), SortCycle::TwoWay);
        let field = FieldId::from("email");

        assert_eq!(controller.toggle("email").unwrap(), &SortState::Ascending(field.clone()));
        assert_eq!(controller.toggle("email").unwrap(), &SortState::Descending(field.clone()));
        assert_eq!(controller.toggle("email").unwrap(), &SortState::Ascending(field));
    }

    #[test]
    fn test_other_field_resets_to_ascending() {
        let mut controller = SortController::new(schema(), SortCycle::ThreeWay);
        controller.toggle("email").unwrap();
        controller.toggle("email").unwrap();

        let state = controller.toggle("age").unwrap();
        assert_eq!(state, &SortState::Ascending("age".into()));
    }

    #[test]
    fn test_unsorted_projection_equals_input() {
        let items = users();
        let controller = SortController::new(schema(), SortCycle::ThreeWay);
        let projected = controller.project(&items);

        assert_eq!(projected.len(), items.len());
        for (p, i) in projected.iter().zip(items.iter()) {
            assert!(std::ptr::eq(*p, i));
        }
    }

    #[test]
    fn test_stable_ties_in_both_directions() {
        let items = users();
        let mut controller = SortController::new(schema(), SortCycle::ThreeWay);

        // ages: 1->30, 2->25, 3->30, 4->25
        controller.toggle("age").unwrap();
        assert_eq!(ids(&controller.project(&items)), vec![2, 4, 1, 3]);

        controller.toggle("age").unwrap();
        // Equal keys keep input order, so this is not a mirror of the ascending result.
        assert_eq!(ids(&controller.project(&items)), vec![1, 3, 2, 4]);
    }

    #[test]
    fn test_descending_reverses_distinct_keys() {
        let items = users();
        let mut controller = SortController::new(schema(), SortCycle::TwoWay);

        controller.toggle("plan").unwrap();
        let asc = ids(&controller.project(&items));
        controller.toggle("plan").unwrap();
        let desc = ids(&controller.project(&items));

        assert_eq!(asc, vec![2, 4, 1, 3]);
        assert_eq!(desc, vec![3, 1, 2, 4]);
    }

    #[test]
    fn test_text_absent_stays_last() {
        let items = users();
        let mut controller = SortController::new(schema(), SortCycle::ThreeWay);

        controller.toggle("email").unwrap();
        assert_eq!(ids(&controller.project(&items)), vec![2, 3, 1, 4]);
        controller.toggle("email").unwrap();
        assert_eq!(ids(&controller.project(&items)), vec![1, 3, 2, 4]);
    }

    #[test]
    fn test_projection_is_idempotent_and_non_mutating() {
        let items = users();
        let before = items.clone();
        let mut controller = SortController::new(schema(), SortCycle::ThreeWay);
        controller.toggle("email").unwrap();

        let first = ids(&controller.project(&items));
        let second = ids(&controller.project(&items));
        assert_eq!(first, second);
        assert_eq!(items, before);
    }

    #[test]
    fn test_project_by_wrapped_items() {
        let items: Vec<(usize, ListRecord)> = users().into_iter().enumerate().collect();
        let mut controller = SortController::new(schema(), SortCycle::ThreeWay);
        controller.toggle("createdAt").unwrap();

        let order: Vec<usize> = controller
            .project_by(&items, |(_, record)| record)
            .into_iter()
            .map(|(idx, _)| *idx)
            .collect();
        assert_eq!(order, vec![1, 2, 0, 3]);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "undeclared sort field"))]
    fn test_toggle_undeclared_field() {
        let mut controller = SortController::new(schema(), SortCycle::ThreeWay);
        let result = controller.toggle("password");
        assert_eq!(result, Err(SortError::UndeclaredField("password".to_string())));
        assert_eq!(controller.state(), &SortState::Unsorted);
    }
}
