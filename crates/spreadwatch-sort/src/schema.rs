//! Sortable field declarations for one view.

use spreadwatch_core::FieldId;

use crate::comparator::FieldKind;

/// Ordered set of sortable fields and their kinds.
///
/// Declaring a field twice replaces the earlier kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSchema {
    fields: Vec<(FieldId, FieldKind)>,
}

impl SortSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style declaration.
    pub fn field(mut self, id: impl Into<FieldId>, kind: FieldKind) -> Self {
        self.declare(id, kind);
        self
    }

    /// Declare or redeclare a field.
    pub fn declare(&mut self, id: impl Into<FieldId>, kind: FieldKind) {
        let id = id.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == id) {
            Some(slot) => slot.1 = kind,
            None => self.fields.push((id, kind)),
        }
    }

    /// Declared kind of a field.
    pub fn kind_of(&self, id: &FieldId) -> Option<&FieldKind> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, kind)| kind)
    }

    pub fn contains(&self, id: &FieldId) -> bool {
        self.kind_of(id).is_some()
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldId, &FieldKind)> {
        self.fields.iter().map(|(id, kind)| (id, kind))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redeclare_replaces_kind() {
        let schema = SortSchema::new()
            .field("email", FieldKind::Text)
            .field("createdAt", FieldKind::Timestamp)
            .field("email", FieldKind::Numeric);

        assert_eq!(schema.len(), 2);
        assert_eq!(schema.kind_of(&"email".into()), Some(&FieldKind::Numeric));
        let names: Vec<&str> = schema.fields().map(|(id, _)| id.as_str()).collect();
        assert_eq!(names, vec!["email", "createdAt"]);
        assert!(!schema.contains(&"plan".into()));
    }
}
