//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the page inventory.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Page inventory, one row per user and URL
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    url TEXT NOT NULL,
    domain TEXT NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    description TEXT,
    last_modified TEXT,
    change_frequency TEXT,
    priority REAL,
    links TEXT NOT NULL DEFAULT '[]',
    used_fallback INTEGER NOT NULL DEFAULT 0,
    sitemap_discovered INTEGER NOT NULL DEFAULT 1,
    sync_status TEXT,
    last_sync TEXT,
    updated_at TEXT NOT NULL,
    UNIQUE(user_id, url)
);

CREATE INDEX IF NOT EXISTS idx_pages_user ON pages(user_id);
CREATE INDEX IF NOT EXISTS idx_pages_domain ON pages(domain);

-- Latest crawl outcome per tracked site
CREATE TABLE IF NOT EXISTS crawl_summaries (
    user_id TEXT NOT NULL,
    domain TEXT NOT NULL,
    page_count INTEGER NOT NULL,
    sitemap_valid INTEGER NOT NULL,
    status TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (user_id, domain)
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
