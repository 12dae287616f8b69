use axum::http::StatusCode;
use sea_orm::DbErr;
use thiserror::Error;

/// Every failure a family operation can report back to its caller.
///
/// The `Display` text is what the HTTP layer returns verbatim.
#[derive(Debug, Error)]
pub enum FamilyError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("person {0} not found")]
    PersonNotFound(i32),

    #[error("parent {0} not found")]
    ParentNotFound(i32),

    #[error("child {0} not found")]
    ChildNotFound(i32),

    #[error("person {0} cannot be their own parent")]
    SelfRelationship(i32),

    #[error("person {parent_id} is already recorded as a parent of {child_id}")]
    DuplicateRelationship { parent_id: i32, child_id: i32 },

    #[error("person {parent_id} cannot be a parent of {child_id}: that would create a cycle")]
    CircularRelationship { parent_id: i32, child_id: i32 },

    #[error("persistence failure: {0}")]
    Persistence(#[from] DbErr),
}

pub type Result<T, E = FamilyError> = std::result::Result<T, E>;

impl FamilyError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PersonNotFound(_) | Self::ParentNotFound(_) | Self::ChildNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::SelfRelationship(_)
            | Self::DuplicateRelationship { .. }
            | Self::CircularRelationship { .. } => StatusCode::CONFLICT,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_violations_are_conflicts() {
        assert_eq!(FamilyError::SelfRelationship(1).status(), StatusCode::CONFLICT);
        assert_eq!(
            FamilyError::CircularRelationship {
                parent_id: 1,
                child_id: 2
            }
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(FamilyError::ChildNotFound(9).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            FamilyError::Persistence(DbErr::Custom("disk full".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn messages_name_the_people_involved() {
        let err = FamilyError::DuplicateRelationship {
            parent_id: 3,
            child_id: 7,
        };
        assert_eq!(
            err.to_string(),
            "person 3 is already recorded as a parent of 7"
        );
    }
}
