use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: impl ToString) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

/// Two-column table of graph statistics, with per-key breakdown rows indented
pub fn stats_table(stats: &crate::storage::GraphStats) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("Nodes", stats.nodes);
    for (category, count) in &stats.nodes_by_category {
        builder.add_row(&format!("  {}", category), count);
    }
    builder.add_row("Edges", stats.edges);
    for (edge_type, count) in &stats.edges_by_type {
        builder.add_row(&format!("  {}", edge_type), count);
    }
    builder.build()
}
