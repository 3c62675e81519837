// ABOUTME: SeaORM migration module for database schema management
// ABOUTME: Runs the blog schema migration at startup and in tests

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20261019_000001_create_blog_tables::Migration)]
    }
}

pub mod m20261019_000001_create_blog_tables;
