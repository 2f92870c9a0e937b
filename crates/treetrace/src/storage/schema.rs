//! `SQLite` schema definitions for treetrace.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the users table.
pub const CREATE_USERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
)
";

/// SQL statement to create the sessions table.
pub const CREATE_SESSIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
)
";

/// SQL statement to create the family members table.
///
/// Parent and partner references are plain ids; their validity is enforced
/// by the storage layer because it depends on ownership and acyclicity.
pub const CREATE_FAMILY_MEMBERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS family_members (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    surname TEXT NOT NULL DEFAULT '',
    gender TEXT NOT NULL,
    status TEXT NOT NULL,
    birth_date TEXT,
    death_date TEXT,
    father_id TEXT,
    mother_id TEXT,
    partner_id TEXT,
    occupation TEXT,
    country TEXT,
    photo_url TEXT,
    is_public INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the health conditions table.
pub const CREATE_HEALTH_CONDITIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS health_conditions (
    id TEXT PRIMARY KEY,
    family_member_id TEXT NOT NULL REFERENCES family_members(id) ON DELETE CASCADE,
    condition_name TEXT NOT NULL,
    diagnosis_date TEXT,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// Index for listing a user's members.
pub const CREATE_MEMBER_USER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_family_members_user ON family_members(user_id)
";

/// Index for suggestion candidates.
pub const CREATE_MEMBER_PUBLIC_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_family_members_public ON family_members(is_public, surname)
";

/// Index for listing a member's conditions.
pub const CREATE_CONDITION_MEMBER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_health_conditions_member ON health_conditions(family_member_id)
";

/// Index for pruning expired sessions.
pub const CREATE_SESSION_EXPIRY_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_USERS_TABLE,
    CREATE_SESSIONS_TABLE,
    CREATE_FAMILY_MEMBERS_TABLE,
    CREATE_HEALTH_CONDITIONS_TABLE,
    CREATE_MEMBER_USER_INDEX,
    CREATE_MEMBER_PUBLIC_INDEX,
    CREATE_CONDITION_MEMBER_INDEX,
    CREATE_SESSION_EXPIRY_INDEX,
    CREATE_METADATA_TABLE,
];
