// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use std::path::PathBuf;
use storage::ConnectionCache;

/// Creates a fresh database file for the test and applies the schema.
pub async fn setup_database(test_name: &str) -> (ConnectionCache, PathBuf) {
    let db_file = std::env::temp_dir().join(format!("rapid_{test_name}.db"));
    for suffix in ["", "-wal", "-shm"] {
        let mut file = db_file.clone().into_os_string();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }

    let cache = ConnectionCache::new();
    let connection = cache
        .connection(&db_file)
        .await
        .unwrap_or_else(|e| panic!("Failed to open database {}: {e}", db_file.display()));
    storage::run_migrations(connection.pool())
        .await
        .unwrap_or_else(|e| panic!("Failed to apply migrations: {e}"));
    (cache, db_file)
}
