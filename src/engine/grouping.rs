use std::collections::{BTreeMap, HashMap};

use crate::model::Student;

/// Order in which subject groups are handed to the assigner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GroupOrder {
    /// Subject codes ascending (byte order).
    #[default]
    SubjectAscending,
    /// Order in which each subject code first appears in the roster.
    FirstAppearance,
}

/// Students sitting one subject, in roster order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectGroup<'a> {
    pub subject_code: &'a str,
    pub students: Vec<&'a Student>,
}

/// Partition the roster by raw subject code. Intra-group order is roster order.
pub fn group_by_subject(roster: &[Student], order: GroupOrder) -> Vec<SubjectGroup<'_>> {
    match order {
        GroupOrder::SubjectAscending => {
            let mut groups: BTreeMap<&str, Vec<&Student>> = BTreeMap::new();
            for s in roster {
                groups.entry(s.subject_code.as_str()).or_default().push(s);
            }
            groups
                .into_iter()
                .map(|(subject_code, students)| SubjectGroup { subject_code, students })
                .collect()
        }
        GroupOrder::FirstAppearance => {
            let mut index: HashMap<&str, usize> = HashMap::new();
            let mut groups: Vec<SubjectGroup<'_>> = Vec::new();
            for s in roster {
                let code = s.subject_code.as_str();
                let slot = *index.entry(code).or_insert_with(|| {
                    groups.push(SubjectGroup { subject_code: code, students: Vec::new() });
                    groups.len() - 1
                });
                groups[slot].students.push(s);
            }
            groups
        }
    }
}
