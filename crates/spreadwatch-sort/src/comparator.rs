//! Comparator registry.
//!
//! Maps a field, its declared kind and a sort direction to an ordering of
//! two records. Comparators are pure: sorting an unchanged list twice gives
//! the same result.
//!
//! Absent-value placement per kind:
//! - `Text`: absent values sort last in both directions
//! - `Numeric` / `Percentage`: absent or NaN is `-inf` (first ascending)
//! - `Timestamp`: absent or unparseable is the earliest instant
//! - `Rank`: values missing from the table rank below every listed value

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use spreadwatch_core::{FieldId, ListRecord};

/// Sort direction for an active column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Orient an ascending ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// Explicit ordinal lookup for rank fields (plan tiers, role flags).
///
/// Lookup is case-insensitive on the value's text form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankTable {
    ranks: HashMap<String, i64>,
}

impl RankTable {
    /// Build a table from values listed lowest rank first.
    pub fn new<I, S>(ordered: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ranks = ordered
            .into_iter()
            .enumerate()
            .map(|(rank, value)| (value.as_ref().to_lowercase(), rank as i64))
            .collect();
        Self { ranks }
    }

    /// `false < true`.
    pub fn boolean() -> Self {
        Self::new(["false", "true"])
    }

    /// Rank of a raw value, if listed.
    pub fn rank_of(&self, value: &Value) -> Option<i64> {
        let key = match value {
            Value::String(s) => s.to_lowercase(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        self.ranks.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

/// Declared value kind of a sortable field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Case-insensitive lexicographic.
    Text,
    /// Numeric, numeric strings accepted.
    Numeric,
    /// Numeric, also accepting strings with a trailing `%`.
    Percentage,
    /// Parsed epoch milliseconds.
    Timestamp,
    /// Caller-supplied ordinal table.
    Rank(RankTable),
}

impl FieldKind {
    /// Boolean flags compared as `false < true`.
    pub fn boolean() -> Self {
        Self::Rank(RankTable::boolean())
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Numeric => "numeric",
            Self::Percentage => "percentage",
            Self::Timestamp => "timestamp",
            Self::Rank(_) => "rank",
        }
    }
}

/// Compare two records on `field` for the given direction.
pub fn compare(
    a: &ListRecord,
    b: &ListRecord,
    field: &FieldId,
    kind: &FieldKind,
    direction: SortDirection,
) -> Ordering {
    let field = field.as_str();
    match kind {
        FieldKind::Text => compare_text(a, b, field, direction),
        FieldKind::Numeric => direction.apply(cmp_f64(numeric_key(a, field), numeric_key(b, field))),
        FieldKind::Percentage => direction.apply(cmp_f64(
            percentage_key(a, field),
            percentage_key(b, field),
        )),
        FieldKind::Timestamp => {
            direction.apply(a.timestamp_ms(field).cmp(&b.timestamp_ms(field)))
        }
        FieldKind::Rank(table) => {
            let ra = a.get(field).and_then(|v| table.rank_of(v));
            let rb = b.get(field).and_then(|v| table.rank_of(v));
            direction.apply(ra.cmp(&rb))
        }
    }
}

fn compare_text(a: &ListRecord, b: &ListRecord, field: &str, direction: SortDirection) -> Ordering {
    match (a.text(field), b.text(field)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => direction.apply(x.to_lowercase().cmp(&y.to_lowercase())),
    }
}

fn numeric_key(record: &ListRecord, field: &str) -> f64 {
    sanitize(record.number(field))
}

fn percentage_key(record: &ListRecord, field: &str) -> f64 {
    let raw = match record.get(field) {
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        Some(_) => record.number(field),
        None => None,
    };
    sanitize(raw)
}

fn sanitize(value: Option<f64>) -> f64 {
    match value {
        Some(v) if !v.is_nan() => v,
        _ => f64::NEG_INFINITY,
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(value: Value) -> ListRecord {
        ListRecord::from_value(value).unwrap()
    }

    fn field(name: &str) -> FieldId {
        FieldId::from(name)
    }

    #[test]
    fn test_text_is_case_insensitive() {
        let a = rec(json!({"name": "alice"}));
        let b = rec(json!({"name": "Bob"}));
        let up = rec(json!({"name": "ALICE"}));
        let asc = SortDirection::Ascending;

        assert_eq!(compare(&a, &b, &field("name"), &FieldKind::Text, asc), Ordering::Less);
        assert_eq!(compare(&a, &up, &field("name"), &FieldKind::Text, asc), Ordering::Equal);
    }

    #[test]
    fn test_text_absent_sorts_last_both_directions() {
        let present = rec(json!({"name": "zed"}));
        let absent = rec(json!({"name": null}));

        for direction in [SortDirection::Ascending, SortDirection::Descending] {
            assert_eq!(
                compare(&absent, &present, &field("name"), &FieldKind::Text, direction),
                Ordering::Greater
            );
            assert_eq!(
                compare(&present, &absent, &field("name"), &FieldKind::Text, direction),
                Ordering::Less
            );
        }
    }

    #[test]
    fn test_numeric_nan_and_absent_are_negative_infinity() {
        let low = rec(json!({"price": -1_000_000}));
        let nan = rec(json!({"price": "NaN"}));
        let missing = rec(json!({}));
        let asc = SortDirection::Ascending;

        assert_eq!(compare(&nan, &low, &field("price"), &FieldKind::Numeric, asc), Ordering::Less);
        assert_eq!(
            compare(&missing, &low, &field("price"), &FieldKind::Numeric, asc),
            Ordering::Less
        );
        assert_eq!(
            compare(&nan, &missing, &field("price"), &FieldKind::Numeric, asc),
            Ordering::Equal
        );
        assert_eq!(
            compare(&nan, &low, &field("price"), &FieldKind::Numeric, SortDirection::Descending),
            Ordering::Greater
        );
    }

    #[test]
    fn test_percentage_accepts_suffix() {
        let a = rec(json!({"spread": "1.5%"}));
        let b = rec(json!({"spread": 0.75}));
        let c = rec(json!({"spread": "12 %"}));
        let asc = SortDirection::Ascending;

        assert_eq!(compare(&b, &a, &field("spread"), &FieldKind::Percentage, asc), Ordering::Less);
        assert_eq!(compare(&a, &c, &field("spread"), &FieldKind::Percentage, asc), Ordering::Less);
    }

    #[test]
    fn test_timestamp_uses_parsed_instant() {
        // Lexicographic order would put "2024-01-02T00:00:00+05:00" after the other.
        let earlier = rec(json!({"createdAt": "2024-01-02T00:00:00+05:00"}));
        let later = rec(json!({"createdAt": "2024-01-01T20:00:00Z"}));
        let garbage = rec(json!({"createdAt": "soon"}));
        let asc = SortDirection::Ascending;

        assert_eq!(
            compare(&earlier, &later, &field("createdAt"), &FieldKind::Timestamp, asc),
            Ordering::Less
        );
        assert_eq!(
            compare(&garbage, &earlier, &field("createdAt"), &FieldKind::Timestamp, asc),
            Ordering::Less
        );
    }

    #[test]
    fn test_rank_uses_table_not_raw_value() {
        let plans = FieldKind::Rank(RankTable::new(["free", "pro", "enterprise"]));
        let free = rec(json!({"plan": "Free"}));
        let enterprise = rec(json!({"plan": "enterprise"}));
        let unknown = rec(json!({"plan": "legacy"}));
        let asc = SortDirection::Ascending;

        // "enterprise" < "free" alphabetically, but outranks it.
        assert_eq!(compare(&free, &enterprise, &field("plan"), &plans, asc), Ordering::Less);
        assert_eq!(compare(&unknown, &free, &field("plan"), &plans, asc), Ordering::Less);
    }

    #[test]
    fn test_boolean_rank() {
        let admin = rec(json!({"isAdmin": true}));
        let user = rec(json!({"isAdmin": false}));
        assert_eq!(
            compare(&user, &admin, &field("isAdmin"), &FieldKind::boolean(), SortDirection::Ascending),
            Ordering::Less
        );
        assert_eq!(
            compare(&user, &admin, &field("isAdmin"), &FieldKind::boolean(), SortDirection::Descending),
            Ordering::Greater
        );
    }
}
