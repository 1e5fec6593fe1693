use crate::domain::field::CanonicalField;
use regex::Regex;
use std::sync::LazyLock;

/// How the numbers captured by an iteration pattern turn into a priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexShape {
    /// `{prefix}_{n}`: priority `n`.
    Single,
    /// `{prefix}{group}_{n}`: priority `group * 10 + n`.
    Grouped,
}

struct IterationPattern {
    regex: Regex,
    target: CanonicalField,
    shape: IndexShape,
}

/// Numbered column conventions, matched against folded header keys. Spaces
/// and underscores are interchangeable as separators.
const PATTERN_TABLE: &[(&str, CanonicalField, IndexShape)] = &[
    (r"^date[ _]appel[ _](\d+)$", CanonicalField::CallDate, IndexShape::Single),
    (r"^statut[ _]appel[ _](\d+)$", CanonicalField::CallStatus, IndexShape::Single),
    (r"^commentaires?[ _]appel[ _](\d+)$", CanonicalField::CallComment, IndexShape::Single),
    (r"^date[ _]r(\d+)[ _](\d+)$", CanonicalField::AppointmentDate, IndexShape::Grouped),
    (r"^type[ _]r(\d+)[ _](\d+)$", CanonicalField::AppointmentType, IndexShape::Grouped),
    (r"^statut[ _]r(\d+)[ _](\d+)$", CanonicalField::AppointmentStatus, IndexShape::Grouped),
    (r"^commentaires?[ _]r(\d+)[ _](\d+)$", CanonicalField::AppointmentComment, IndexShape::Grouped),
];

static PATTERNS: LazyLock<Vec<IterationPattern>> = LazyLock::new(|| {
    PATTERN_TABLE
        .iter()
        .map(|(pattern, target, shape)| IterationPattern {
            regex: Regex::new(pattern).expect("valid iteration pattern"),
            target: *target,
            shape: *shape,
        })
        .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationMatch {
    pub target: CanonicalField,
    pub shape: IndexShape,
    pub group: Option<u32>,
    pub index: u32,
    pub priority: u32,
}

impl IterationMatch {
    /// Call slot this column feeds when slot-aware merging is on.
    pub fn call_slot(&self) -> Option<u8> {
        let is_call = matches!(
            self.target,
            CanonicalField::CallDate | CanonicalField::CallStatus | CanonicalField::CallComment
        );
        if is_call && (1..=crate::domain::calls::CALL_SLOTS as u32).contains(&self.index) {
            u8::try_from(self.index).ok()
        } else {
            None
        }
    }
}

/// Matches a folded header key against the iteration table, first hit wins.
pub fn match_iteration(key: &str) -> Option<IterationMatch> {
    PATTERNS.iter().find_map(|pattern| {
        let caps = pattern.regex.captures(key)?;
        match pattern.shape {
            IndexShape::Single => {
                let index: u32 = caps[1].parse().ok()?;
                Some(IterationMatch {
                    target: pattern.target,
                    shape: pattern.shape,
                    group: None,
                    index,
                    priority: index,
                })
            }
            IndexShape::Grouped => {
                let group: u32 = caps[1].parse().ok()?;
                let index: u32 = caps[2].parse().ok()?;
                let priority = group.checked_mul(10)?.checked_add(index)?;
                Some(IterationMatch {
                    target: pattern.target,
                    shape: pattern.shape,
                    group: Some(group),
                    index,
                    priority,
                })
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{match_iteration, IndexShape};
    use crate::domain::field::CanonicalField;

    #[test]
    fn single_index_columns_use_their_number() {
        let hit = match_iteration("statut_appel_3").unwrap();
        assert_eq!(hit.target, CanonicalField::CallStatus);
        assert_eq!(hit.shape, IndexShape::Single);
        assert_eq!(hit.priority, 3);
        assert_eq!(hit.call_slot(), Some(3));
    }

    #[test]
    fn grouped_columns_weight_the_group() {
        let hit = match_iteration("date_r2_1").unwrap();
        assert_eq!(hit.target, CanonicalField::AppointmentDate);
        assert_eq!(hit.group, Some(2));
        assert_eq!(hit.priority, 21);
        assert_eq!(hit.call_slot(), None);

        assert_eq!(
            match_iteration("commentaires_r1_4").unwrap().target,
            CanonicalField::AppointmentComment
        );
    }

    #[test]
    fn spaced_spellings_match() {
        let hit = match_iteration("commentaire appel 2").unwrap();
        assert_eq!(hit.target, CanonicalField::CallComment);
        assert_eq!(hit.priority, 2);
    }

    #[test]
    fn slots_beyond_capacity_are_not_call_slots() {
        let hit = match_iteration("date_appel_5").unwrap();
        assert_eq!(hit.priority, 5);
        assert_eq!(hit.call_slot(), None);
    }

    #[test]
    fn unrelated_columns_do_not_match() {
        for key in ["date_appel", "appel_1", "date_r1", "notes_2", "date_appel_x"] {
            assert!(match_iteration(key).is_none(), "key {key:?}");
        }
        assert!(match_iteration("date_r99999999999_1").is_none());
    }
}
