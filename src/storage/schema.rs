//! Database schema definitions

/// SQL to create the proverbs table
pub const CREATE_PROVERBS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS proverbs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL CHECK (length(text) > 0)
)
"#;

/// SQL to create the proverb_tags join table
/// One row per (proverb, tag); the primary key keeps tags distinct per proverb
pub const CREATE_PROVERB_TAGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS proverb_tags (
    proverb_id INTEGER NOT NULL REFERENCES proverbs(id),
    tag TEXT NOT NULL CHECK (length(tag) > 0),
    PRIMARY KEY (proverb_id, tag)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_proverb_tags_tag ON proverb_tags(tag)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_PROVERBS_TABLE, CREATE_PROVERB_TAGS_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
