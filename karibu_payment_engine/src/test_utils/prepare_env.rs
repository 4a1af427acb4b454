//! Helpers for setting up a clean database environment in tests.
//!
//! Every test gets its own on-disk SQLite file. In-memory databases do not play well with connection pools
//! (each connection would see its own empty database), so a throwaway file in the system temp directory is
//! used instead.
use log::*;
use rand::Rng;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{sqlite::db::run_migrations, SqliteDatabase};

pub fn prepare_env() {
    let _ = dotenvy::dotenv();
    let _ = env_logger::try_init();
}

pub fn random_db_url() -> String {
    let mut rng = rand::thread_rng();
    let id: u64 = rng.gen();
    let path = std::env::temp_dir().join(format!("karibu_test_{id:016x}.db"));
    format!("sqlite://{}", path.display())
}

/// Creates a fresh database at a random location, runs the migrations, and returns a handle to it.
pub async fn prepare_test_db() -> SqliteDatabase {
    prepare_env();
    let url = random_db_url();
    if !Sqlite::database_exists(&url).await.unwrap_or(false) {
        Sqlite::create_database(&url).await.expect("Error creating test database");
    }
    let db = SqliteDatabase::new_with_url(&url, 25).await.expect("Error connecting to test database");
    run_migrations(db.pool()).await.expect("Error running migrations");
    debug!("🚀️ Test database ready at {url}");
    db
}
