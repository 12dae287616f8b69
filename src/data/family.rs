use chrono::{Duration, Utc};
use log::{debug, info};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel, QueryOrder, Set,
    SqlErr, TransactionTrait,
};

use crate::data::dbconnector::SQLConnector;
use crate::entity::{helpers, people, relationships};
use crate::family::error::{FamilyError, Result};
use crate::family::tree::{self, TreeNode};
use crate::family::validator::{CyclePolicy, validate_relationship};
use crate::family::{Person, PersonWithRelationships, Relationship};
use crate::server::types::{CreatePersonRequest, DeleteResponse, UpdatePersonRequest};

impl SQLConnector {
    pub async fn create_person(&self, payload: &CreatePersonRequest) -> Result<Person> {
        insert_person(self.db()?, payload).await
    }

    pub async fn list_people(&self) -> Result<Vec<Person>> {
        Ok(people::Entity::find()
            .order_by_asc(people::Column::Id)
            .all(self.db()?)
            .await?)
    }

    pub async fn get_person(&self, id: i32) -> Result<Option<PersonWithRelationships>> {
        let txn = self.db()?.begin().await?;
        let Some(person) = people::Entity::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };
        let parents = helpers::parents_of(&txn, id).await?;
        let children = helpers::children_of(&txn, id).await?;
        txn.commit().await?;

        Ok(Some(PersonWithRelationships {
            person,
            parents,
            children,
        }))
    }

    pub async fn update_person(&self, id: i32, payload: &UpdatePersonRequest) -> Result<Person> {
        payload.validate()?;

        let txn = self.db()?.begin().await?;
        let existing = people::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(FamilyError::PersonNotFound(id))?;

        // updated_at has to move forward even if the clock has not.
        let now = Utc::now().max(existing.updated_at + Duration::microseconds(1));

        let mut person = existing.into_active_model();
        if let Some(name) = &payload.full_name {
            person.full_name = Set(name.trim().to_string());
        }
        if let Some(birth_date) = payload.birth_date {
            person.birth_date = Set(birth_date);
        }
        if let Some(death_date) = payload.death_date {
            person.death_date = Set(death_date);
        }
        if let Some(photo_url) = &payload.photo_url {
            person.photo_url = Set(photo_url.clone());
        }
        person.updated_at = Set(now);

        let updated = person.update(&txn).await?;
        txn.commit().await?;

        debug!("Updated person {id}");
        Ok(updated)
    }

    pub async fn delete_person(&self, id: i32) -> Result<DeleteResponse> {
        let txn = self.db()?.begin().await?;
        if people::Entity::find_by_id(id).one(&txn).await?.is_none() {
            return Err(FamilyError::PersonNotFound(id));
        }
        let links = helpers::remove_links_of(&txn, id).await?;
        people::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!("Deleted person {id} and {links} relationships");
        Ok(DeleteResponse { success: true })
    }

    pub async fn list_relationships(&self) -> Result<Vec<Relationship>> {
        Ok(relationships::Entity::find()
            .order_by_asc(relationships::Column::Id)
            .all(self.db()?)
            .await?)
    }

    /// Validate and insert `parent_id -> child_id` against a single snapshot.
    pub async fn create_relationship(&self, parent_id: i32, child_id: i32) -> Result<Relationship> {
        let txn = self.db()?.begin().await?;
        let created = link(&txn, parent_id, child_id, self.cycle_check()).await?;
        txn.commit().await?;
        Ok(created)
    }

    pub async fn delete_relationship(&self, parent_id: i32, child_id: i32) -> Result<DeleteResponse> {
        let removed = helpers::remove_parent_child(self.db()?, parent_id, child_id).await?;
        Ok(DeleteResponse {
            success: removed > 0,
        })
    }

    /// Every person with resolved parents and children, in id order.
    pub async fn get_family_tree(&self) -> Result<Vec<PersonWithRelationships>> {
        let (people, edges) = self.snapshot().await?;
        Ok(tree::annotate(&people, &edges))
    }

    pub async fn get_family_forest(&self) -> Result<Vec<TreeNode>> {
        let (people, edges) = self.snapshot().await?;
        Ok(tree::assemble(&people, &edges))
    }

    async fn snapshot(&self) -> Result<(Vec<Person>, Vec<Relationship>)> {
        let txn = self.db()?.begin().await?;
        let people = people::Entity::find().all(&txn).await?;
        let edges = relationships::Entity::find().all(&txn).await?;
        txn.commit().await?;
        Ok((people, edges))
    }
}

/// Validate `payload` and insert it on `db`, which may be a transaction.
pub(crate) async fn insert_person<C: ConnectionTrait>(
    db: &C,
    payload: &CreatePersonRequest,
) -> Result<Person> {
    payload.validate()?;

    let now = Utc::now();
    let person = people::ActiveModel {
        full_name: Set(payload.full_name.trim().to_string()),
        birth_date: Set(payload.birth_date),
        death_date: Set(payload.death_date),
        photo_url: Set(payload.photo_url.clone()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    debug!("Created person {} ({})", person.id, person.full_name);
    Ok(person)
}

/// Validate and insert an edge using the people and edges visible on `db`.
/// Callers own the transaction.
pub(crate) async fn link<C: ConnectionTrait>(
    db: &C,
    parent_id: i32,
    child_id: i32,
    policy: CyclePolicy,
) -> Result<Relationship> {
    let people = people::Entity::find().all(db).await?;
    let edges = relationships::Entity::find().all(db).await?;
    validate_relationship(parent_id, child_id, &people, &edges, policy)?;

    let created = helpers::add_parent_child(db, parent_id, child_id)
        .await
        .map_err(|e| insert_failure(e, parent_id, child_id))?;

    debug!("Linked parent {parent_id} to child {child_id}");
    Ok(created)
}

/// A unique-index hit means another writer stored the same pair first.
fn insert_failure(err: DbErr, parent_id: i32, child_id: i32) -> FamilyError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => FamilyError::DuplicateRelationship {
            parent_id,
            child_id,
        },
        _ => FamilyError::Persistence(err),
    }
}
