//! Relational schema for the ledger tables.

use sqlx::PgPool;

const CREATE_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS players (
        player_id VARCHAR(64) NOT NULL PRIMARY KEY,
        balance BIGINT NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tournaments (
        tournament_id BIGINT NOT NULL PRIMARY KEY,
        entry_deposit BIGINT NOT NULL CHECK (entry_deposit > 0),
        active BOOLEAN NOT NULL DEFAULT TRUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tournament_entries (
        tournament_id BIGINT NOT NULL REFERENCES tournaments (tournament_id),
        player_id VARCHAR(64) NOT NULL REFERENCES players (player_id),
        fee BIGINT NOT NULL,
        backers JSONB NOT NULL DEFAULT '[]',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (tournament_id, player_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS tournament_entries_player_id ON tournament_entries (player_id)",
    r#"
    CREATE TABLE IF NOT EXISTS tournament_winners (
        tournament_id BIGINT NOT NULL,
        player_id VARCHAR(64) NOT NULL,
        prize BIGINT NOT NULL,
        backers JSONB NOT NULL DEFAULT '[]',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (tournament_id, player_id),
        FOREIGN KEY (tournament_id, player_id)
            REFERENCES tournament_entries (tournament_id, player_id)
    )
    "#,
];

// Reverse dependency order
const DROP_STATEMENTS: &[&str] = &[
    "DROP TABLE IF EXISTS tournament_winners",
    "DROP TABLE IF EXISTS tournament_entries",
    "DROP TABLE IF EXISTS tournaments",
    "DROP TABLE IF EXISTS players",
];

/// Create any missing ledger tables
pub async fn create_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in CREATE_STATEMENTS {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await
}

/// Drop every ledger table and create the schema again.
///
/// Runs as one transaction, so concurrent workflows either see the old
/// tables or the fresh, empty ones.
pub async fn recreate_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in DROP_STATEMENTS.iter().chain(CREATE_STATEMENTS) {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await
}
