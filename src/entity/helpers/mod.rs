use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entity::{people, relationships};

pub async fn children_of<C: ConnectionTrait>(
    db: &C,
    parent_id: i32,
) -> Result<Vec<people::Model>, DbErr> {
    // First get links to child ids, then fetch people by id to avoid ambiguous SQL when joining
    let links = relationships::Entity::find()
        .filter(relationships::Column::ParentId.eq(parent_id))
        .order_by_asc(relationships::Column::Id)
        .all(db)
        .await?;

    let mut kids = Vec::new();
    for l in links {
        if let Some(m) = people::Entity::find_by_id(l.child_id).one(db).await? {
            kids.push(m);
        }
    }

    Ok(kids)
}

pub async fn parents_of<C: ConnectionTrait>(
    db: &C,
    child_id: i32,
) -> Result<Vec<people::Model>, DbErr> {
    let links = relationships::Entity::find()
        .filter(relationships::Column::ChildId.eq(child_id))
        .order_by_asc(relationships::Column::Id)
        .all(db)
        .await?;

    let mut parents = Vec::new();
    for l in links {
        if let Some(m) = people::Entity::find_by_id(l.parent_id).one(db).await? {
            parents.push(m);
        }
    }

    Ok(parents)
}

/// Insert an already validated parent -> child edge.
pub async fn add_parent_child<C: ConnectionTrait>(
    db: &C,
    parent_id: i32,
    child_id: i32,
) -> Result<relationships::Model, DbErr> {
    let link = relationships::ActiveModel {
        parent_id: Set(parent_id),
        child_id: Set(child_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    link.insert(db).await
}

/// Remove every edge that names `person_id` on either end.
pub async fn remove_links_of<C: ConnectionTrait>(db: &C, person_id: i32) -> Result<u64, DbErr> {
    let result = relationships::Entity::delete_many()
        .filter(
            Condition::any()
                .add(relationships::Column::ParentId.eq(person_id))
                .add(relationships::Column::ChildId.eq(person_id)),
        )
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

pub async fn remove_parent_child<C: ConnectionTrait>(
    db: &C,
    parent_id: i32,
    child_id: i32,
) -> Result<u64, DbErr> {
    let result = relationships::Entity::delete_many()
        .filter(relationships::Column::ParentId.eq(parent_id))
        .filter(relationships::Column::ChildId.eq(child_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
