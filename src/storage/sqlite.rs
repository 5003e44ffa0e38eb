//! SQLite storage implementation

use std::collections::BTreeMap;
use std::path::Path;
use rusqlite::{Connection, params, OptionalExtension};
use crate::{Result, Error};
use crate::edge::GraphEdge;
use crate::node::{GraphNode, NodeCategory};
use super::{schema, GraphStats, GraphStore};

const NODE_COLUMNS: &str = "id, resource_id, name, type, provider, category, properties";
const EDGE_COLUMNS: &str = "source_id, target_id, type, description, confidence";

/// SQLite-backed storage for the resource graph
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    fn find_node(&self, clause: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Option<GraphNode>> {
        let sql = format!("SELECT {} FROM graph_nodes WHERE {} ORDER BY id LIMIT 1", NODE_COLUMNS, clause);
        self.conn
            .query_row(&sql, params, |row| self.row_to_node(row))
            .optional()
            .map_err(Into::into)
    }

    fn find_edges(&self, column: &str, node_id: &str) -> Result<Vec<GraphEdge>> {
        let sql = format!(
            "SELECT {} FROM graph_edges WHERE {} = ?1 ORDER BY source_id, target_id, type",
            EDGE_COLUMNS, column
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let edges = stmt
            .query_map([node_id], |row| self.row_to_edge(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    fn grouped_counts(&self, sql: &str) -> Result<BTreeMap<String, usize>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            let key: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((key, count as usize))
        })?;
        let mut counts = BTreeMap::new();
        for row in rows {
            let (key, count) = row?;
            counts.insert(key, count);
        }
        Ok(counts)
    }

    /// Helper to convert a row to a GraphNode
    fn row_to_node(&self, row: &rusqlite::Row) -> rusqlite::Result<GraphNode> {
        let category_str: String = row.get(5)?;
        let category: NodeCategory = category_str.parse().map_err(|e: Error| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(GraphNode {
            id: row.get(0)?,
            resource_id: row.get(1)?,
            name: row.get(2)?,
            node_type: row.get(3)?,
            provider: row.get(4)?,
            category,
            properties: row.get(6)?,
        })
    }

    /// Helper to convert a row to a GraphEdge
    fn row_to_edge(&self, row: &rusqlite::Row) -> rusqlite::Result<GraphEdge> {
        Ok(GraphEdge {
            source_id: row.get(0)?,
            target_id: row.get(1)?,
            edge_type: row.get(2)?,
            description: row.get(3)?,
            confidence: row.get(4)?,
        })
    }
}

impl GraphStore for SqliteStore {
    fn clear_graph(&self) -> Result<usize> {
        self.conn.execute("DELETE FROM graph_edges", [])?;
        let removed = self.conn.execute("DELETE FROM graph_nodes", [])?;
        Ok(removed)
    }

    fn upsert_node(&self, node: &GraphNode) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO graph_nodes (id, resource_id, name, type, provider, category, properties)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                resource_id = excluded.resource_id,
                name = excluded.name,
                type = excluded.type,
                provider = excluded.provider,
                category = excluded.category,
                properties = excluded.properties
            "#,
            params![
                node.id,
                node.resource_id,
                node.name,
                node.node_type,
                node.provider,
                node.category.as_str(),
                node.properties,
            ],
        )?;
        Ok(())
    }

    fn upsert_edge(&self, edge: &GraphEdge) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO graph_edges (source_id, target_id, type, description, confidence)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(source_id, target_id, type) DO UPDATE SET
                description = excluded.description,
                confidence = excluded.confidence
            "#,
            params![
                edge.source_id,
                edge.target_id,
                edge.edge_type,
                edge.description,
                edge.confidence,
            ],
        )?;
        Ok(())
    }

    fn create_indexes(&self) -> Result<usize> {
        for stmt in schema::CREATE_INDEXES {
            self.conn.execute(stmt, [])?;
        }
        Ok(schema::CREATE_INDEXES.len())
    }

    fn find_node_by_resource_id(&self, resource_id: &str) -> Result<Option<GraphNode>> {
        self.find_node("resource_id = ?1", params![resource_id])
    }

    fn find_node_by_id(&self, id: &str) -> Result<Option<GraphNode>> {
        self.find_node("id = ?1", params![id])
    }

    fn find_node_by_type_and_name(&self, node_type: &str, name: &str) -> Result<Option<GraphNode>> {
        self.find_node("type = ?1 AND name = ?2", params![node_type, name])
    }

    fn find_node_by_fuzzy_name(&self, fragment: &str) -> Result<Option<GraphNode>> {
        if fragment.is_empty() {
            return Ok(None);
        }
        self.find_node("instr(type, ?1) > 0 OR instr(name, ?1) > 0", params![fragment])
    }

    fn count_nodes(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM graph_nodes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn count_edges(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM graph_edges", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn stats(&self) -> Result<GraphStats> {
        Ok(GraphStats {
            nodes: self.count_nodes()?,
            edges: self.count_edges()?,
            nodes_by_category: self.grouped_counts(
                "SELECT category, COUNT(*) FROM graph_nodes GROUP BY category",
            )?,
            edges_by_type: self.grouped_counts("SELECT type, COUNT(*) FROM graph_edges GROUP BY type")?,
        })
    }

    fn edges_from(&self, node_id: &str) -> Result<Vec<GraphEdge>> {
        self.find_edges("source_id", node_id)
    }

    fn edges_to(&self, node_id: &str) -> Result<Vec<GraphEdge>> {
        self.find_edges("target_id", node_id)
    }
}
