//! Family graph logic that does not touch the database: edge validation,
//! parent/child resolution and forest assembly.

pub mod error;
pub mod render;
pub mod tree;
pub mod validator;

use serde::Serialize;

pub use error::FamilyError;

pub type Person = crate::entity::people::Model;
pub type Relationship = crate::entity::relationships::Model;

/// A person together with their resolved parents and children.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PersonWithRelationships {
    #[serde(flatten)]
    pub person: Person,
    pub parents: Vec<Person>,
    pub children: Vec<Person>,
}

impl PersonWithRelationships {
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{TimeZone, Utc};

    use super::{Person, Relationship};

    pub(crate) fn person(id: i32, name: &str) -> Person {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Person {
            id,
            full_name: name.to_string(),
            birth_date: None,
            death_date: None,
            photo_url: None,
            created_at: at,
            updated_at: at,
        }
    }

    pub(crate) fn edge(id: i32, parent_id: i32, child_id: i32) -> Relationship {
        Relationship {
            id,
            parent_id,
            child_id,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }
}
