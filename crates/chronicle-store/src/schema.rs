//! Document store database schema.
//!
//! Documents live in one table. Two partial expression indexes over event
//! documents serve the `aggregate` and `name` range queries; `time` is
//! compared under the "C" collation so the fixed-width tokens sort bytewise.

/// SQL to create the documents table and its event indexes.
pub const CREATE_DOCUMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id         TEXT PRIMARY KEY,
    rev        TEXT NOT NULL,
    body       JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_documents_event_aggregate
    ON documents ((body -> 'aggregateId'), ((body ->> 'time') COLLATE "C"))
    WHERE body ->> 'type' = 'event';

CREATE INDEX IF NOT EXISTS idx_documents_event_name
    ON documents ((body -> 'name'), ((body ->> 'time') COLLATE "C"))
    WHERE body ->> 'type' = 'event';
"#;

/// Range query over the `(aggregateId, time)` index.
pub(crate) const SELECT_BY_AGGREGATE: &str = r#"
SELECT id, rev, body
FROM documents
WHERE body ->> 'type' = 'event'
  AND body -> 'aggregateId' = $1
  AND (body ->> 'time') COLLATE "C" BETWEEN $2 AND $3
ORDER BY (body ->> 'time') COLLATE "C" ASC
"#;

/// Range query over the `(name, time)` index.
pub(crate) const SELECT_BY_NAME: &str = r#"
SELECT id, rev, body
FROM documents
WHERE body ->> 'type' = 'event'
  AND body -> 'name' = $1
  AND (body ->> 'time') COLLATE "C" BETWEEN $2 AND $3
ORDER BY (body ->> 'time') COLLATE "C" ASC
"#;

/// Insert that leaves an existing document untouched.
pub(crate) const INSERT_DOCUMENT: &str = r"
INSERT INTO documents (id, rev, body)
VALUES ($1, $2, $3)
ON CONFLICT (id) DO NOTHING
";

/// Point lookup by document id.
pub(crate) const SELECT_BY_ID: &str = r"
SELECT id, rev, body
FROM documents
WHERE id = $1
";
