use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, bail};
use log::{debug, info};
use sea_orm::sea_query::Index;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Schema,
    Statement, TransactionTrait,
};

use crate::data::configuration::Configuration;
use crate::data::family::{insert_person, link};
use crate::entity::{people, relationships};
use crate::family::validator::CyclePolicy;
use crate::server::types::CreatePersonRequest;

const IN_MEMORY: &str = ":memory:";

// A pooled `:memory:` connection that gets recycled takes the database with it.
const IN_MEMORY_KEEPALIVE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 100);

pub(crate) trait KinDBConnection {
    async fn connect(&mut self) -> Result<(), anyhow::Error>;
    async fn check(&self) -> Result<(), anyhow::Error>;
    async fn close(&self) -> Result<(), anyhow::Error>;
    async fn is_initialized(&self) -> Result<bool, anyhow::Error>;
    async fn initialize(&self, config: &Configuration) -> Result<(), anyhow::Error>;
}

/// The family store: one SQLite database plus the validation policy applied
/// to new relationships. Built once at startup and shared by the server.
pub struct SQLConnector {
    path: String,
    cycle_check: CyclePolicy,
    database_connection: Option<DatabaseConnection>,
}

impl SQLConnector {
    pub fn new(path: &str) -> Self {
        SQLConnector {
            path: path.to_string(),
            cycle_check: CyclePolicy::default(),
            database_connection: None,
        }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::new(IN_MEMORY)
    }

    pub fn with_cycle_check(mut self, policy: CyclePolicy) -> Self {
        self.cycle_check = policy;
        self
    }

    pub(crate) fn cycle_check(&self) -> CyclePolicy {
        self.cycle_check
    }

    pub(crate) fn db(&self) -> Result<&DatabaseConnection, DbErr> {
        self.database_connection
            .as_ref()
            .ok_or_else(|| DbErr::Custom(String::from("database is not connected")))
    }

    fn is_in_memory(&self) -> bool {
        self.path.is_empty() || self.path == IN_MEMORY
    }

    fn connect_options(&self) -> anyhow::Result<ConnectOptions> {
        if self.is_in_memory() {
            // Every pooled connection would get its own empty memory database.
            let mut options = ConnectOptions::new("sqlite::memory:");
            options
                .max_connections(1)
                .min_connections(1)
                .max_lifetime(IN_MEMORY_KEEPALIVE)
                .idle_timeout(IN_MEMORY_KEEPALIVE);
            return Ok(options);
        }

        std::fs::create_dir_all(&self.path)
            .with_context(|| format!("failed to create database directory {}", self.path))?;
        Ok(ConnectOptions::new(format!(
            "sqlite://{}/db.sqlite?mode=rwc",
            self.path
        )))
    }

    /// Schema and seed family on `db`, which is the initialization transaction.
    async fn create_and_seed<C: ConnectionTrait>(
        &self,
        db: &C,
        config: &Configuration,
    ) -> anyhow::Result<()> {
        create_schema(db).await.context("failed to create schema")?;

        let mut ids = HashMap::new();
        for (handle, entry) in &config.family {
            let person = insert_person(
                db,
                &CreatePersonRequest {
                    full_name: entry.full_name.clone(),
                    birth_date: entry.birth_date,
                    death_date: entry.death_date,
                    photo_url: entry.photo_url.clone(),
                },
            )
            .await
            .with_context(|| format!("failed to seed family member '{handle}'"))?;
            debug!("Seeded {handle} as person {}", person.id);
            ids.insert(handle.as_str(), person.id);
        }

        for (handle, entry) in &config.family {
            for child in &entry.children {
                link(db, ids[handle.as_str()], ids[child.as_str()], self.cycle_check)
                    .await
                    .with_context(|| format!("failed to link '{handle}' to '{child}'"))?;
            }
        }
        Ok(())
    }
}

async fn create_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut people_table = schema.create_table_from_entity(people::Entity);
    people_table.if_not_exists();
    db.execute(backend.build(&people_table)).await?;

    let mut relationships_table = schema.create_table_from_entity(relationships::Entity);
    relationships_table.if_not_exists();
    db.execute(backend.build(&relationships_table)).await?;

    // One edge per (parent, child) even when two writers race.
    let pair_index = Index::create()
        .name("idx_relationships_parent_child")
        .table(relationships::Entity)
        .col(relationships::Column::ParentId)
        .col(relationships::Column::ChildId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&pair_index)).await?;
    Ok(())
}

/// Every `children` entry must name another seed entry.
fn check_seed_handles(config: &Configuration) -> anyhow::Result<()> {
    for (handle, entry) in &config.family {
        for child in &entry.children {
            if !config.family.contains_key(child) {
                bail!("family member '{handle}' lists unknown child '{child}'");
            }
        }
    }
    Ok(())
}

impl KinDBConnection for SQLConnector {
    async fn connect(&mut self) -> Result<(), anyhow::Error> {
        let db = Database::connect(self.connect_options()?).await?;
        self.database_connection = Some(db);
        Ok(())
    }
    async fn check(&self) -> Result<(), anyhow::Error> {
        if let Some(ref db) = self.database_connection {
            db.ping().await?;
        }
        Ok(())
    }
    async fn close(&self) -> Result<(), anyhow::Error> {
        if let Some(ref db) = self.database_connection {
            let db = db.clone();
            db.close().await?;
        }
        Ok(())
    }
    async fn is_initialized(&self) -> Result<bool, anyhow::Error> {
        let db = self.db()?;
        let row = db
            .query_one(Statement::from_string(
                DbBackend::Sqlite,
                "SELECT COUNT(*) AS tables FROM sqlite_master \
                 WHERE type = 'table' AND name IN ('people', 'relationships')",
            ))
            .await?
            .context("sqlite_master returned no rows")?;
        let tables: i64 = row.try_get("", "tables")?;
        Ok(tables == 2)
    }
    async fn initialize(&self, config: &Configuration) -> Result<(), anyhow::Error> {
        check_seed_handles(config)?;

        // Tables and seed rows land together or not at all, so a failed seed
        // leaves `is_initialized` false for the next start.
        let txn = self.db()?.begin().await?;
        if let Err(err) = self.create_and_seed(&txn, config).await {
            txn.rollback().await?;
            return Err(err);
        }
        txn.commit().await?;

        info!("Schema created, seeded {} family members", config.family.len());
        Ok(())
    }
}
