pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20260301_000001_initial_tables;
mod m20260305_000001_conversions;
mod m20260308_000001_click_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_initial_tables::Migration),
            Box::new(m20260305_000001_conversions::Migration),
            Box::new(m20260308_000001_click_indexes::Migration),
        ]
    }
}
