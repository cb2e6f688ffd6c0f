pub const SCHEMA: &str = r#"
-- Users are created on first authenticated contact and never deleted
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    token_identifier TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    image_url TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Org memberships: one role per (user, org)
CREATE TABLE IF NOT EXISTS org_memberships (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    org_id TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('admin', 'member')),
    created_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (user_id, org_id)
);

-- Identity tokens are bound to a subject; admin tokens have none
CREATE TABLE IF NOT EXISTS identity_tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- first 8 chars of ID for fast lookup
    is_admin INTEGER NOT NULL DEFAULT 0,
    subject TEXT,
    display_name TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,                   -- NULL = never
    last_used_at TEXT,

    CHECK ((is_admin = 1 AND subject IS NULL) OR (is_admin = 0 AND subject IS NOT NULL))
);

-- Files are either org-scoped or global, never both
CREATE TABLE IF NOT EXISTS files (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    file_type TEXT NOT NULL,
    owner_user_id TEXT NOT NULL REFERENCES users(id),
    org_id TEXT,
    should_delete INTEGER NOT NULL DEFAULT 0,
    is_global INTEGER NOT NULL DEFAULT 0,
    file_key TEXT,
    expires_at TEXT,
    blob_ref TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),

    CHECK (
        (is_global = 0 AND org_id IS NOT NULL AND file_key IS NULL AND expires_at IS NULL)
        OR (is_global = 1 AND org_id IS NULL AND file_key IS NOT NULL AND expires_at IS NOT NULL)
    )
);

-- Favorites: a row means starred; at most one per (user, org, file)
CREATE TABLE IF NOT EXISTS favorites (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    org_id TEXT NOT NULL,
    file_id TEXT NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (user_id, org_id, file_id)
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_memberships_org ON org_memberships(org_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON identity_tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_tokens_subject ON identity_tokens(subject);
CREATE INDEX IF NOT EXISTS idx_files_org ON files(org_id);
CREATE INDEX IF NOT EXISTS idx_files_should_delete ON files(should_delete);
CREATE UNIQUE INDEX IF NOT EXISTS idx_files_key ON files(file_key);
-- A blob belongs to exactly one file; purging a file deletes its blob
CREATE UNIQUE INDEX IF NOT EXISTS idx_files_blob ON files(blob_ref);
CREATE INDEX IF NOT EXISTS idx_files_global_expiry ON files(is_global, expires_at);
CREATE INDEX IF NOT EXISTS idx_favorites_file ON favorites(file_id);
"#;
