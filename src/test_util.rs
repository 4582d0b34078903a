use tempfile::TempDir;

use crate::config::{Config, DatabaseConfig, Limits};
use crate::db::Database;

/// Fresh migrated sqlite database in a temp directory. Keep the directory
/// alive for as long as the database is in use.
pub async fn test_database() -> (TempDir, Database) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("test.db").display()
    );
    let db = Database::connect(&url).await.expect("connect test db");
    db.migrate().await.expect("migrate test db");
    (dir, db)
}

pub fn test_config() -> Config {
    Config {
        base_url: "http://localhost:3010".into(),
        port: 0,
        database: DatabaseConfig {
            url: "unused".into(),
        },
        limits: Limits {
            max_upload_size: 10 * 1024 * 1024,
        },
    }
}
