//! Database schema definitions

/// SQL to create the nodes table
pub const CREATE_NODES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS graph_nodes (
    id TEXT PRIMARY KEY,
    resource_id TEXT,
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    provider TEXT NOT NULL,
    category TEXT NOT NULL,
    properties TEXT NOT NULL DEFAULT '{}'
)
"#;

/// SQL to create the edges table
pub const CREATE_EDGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS graph_edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id TEXT NOT NULL,
    target_id TEXT NOT NULL,
    type TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    confidence REAL NOT NULL DEFAULT 1.0,
    UNIQUE(source_id, target_id, type)
)
"#;

/// Secondary indexes, created after a materialization batch
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_nodes_resource_id ON graph_nodes(resource_id)",
    "CREATE INDEX IF NOT EXISTS idx_nodes_type ON graph_nodes(type)",
    "CREATE INDEX IF NOT EXISTS idx_nodes_provider ON graph_nodes(provider)",
    "CREATE INDEX IF NOT EXISTS idx_nodes_category ON graph_nodes(category)",
    "CREATE INDEX IF NOT EXISTS idx_nodes_name ON graph_nodes(name)",
    "CREATE INDEX IF NOT EXISTS idx_edges_source ON graph_edges(source_id)",
    "CREATE INDEX IF NOT EXISTS idx_edges_target ON graph_edges(target_id)",
    "CREATE INDEX IF NOT EXISTS idx_edges_type ON graph_edges(type)",
];

/// Table creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![CREATE_NODES_TABLE, CREATE_EDGES_TABLE]
}
