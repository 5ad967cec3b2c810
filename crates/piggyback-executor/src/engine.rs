//! Execution engine

use crate::physical_plan;
use crate::value::Row;
use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use piggyback_catalog::{CatalogProvider, InMemoryCatalog};
use piggyback_common::{ColumnDescriptor, Result, TableId, ValueKind};
use piggyback_sql::{PlanColumn, PlanNode, SqlPlanner};
use piggyback_stats::{NodeInit, NodeKind, PlanObserver, ScanTarget};
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

/// Rows produced by one execution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
}

pub struct ExecutionEngine {
    catalog: Arc<dyn CatalogProvider>,
}

impl ExecutionEngine {
    pub fn new(catalog: Arc<dyn CatalogProvider>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogProvider> {
        &self.catalog
    }

    /// Load a CSV file with a header row as table `name`.
    pub fn register_csv(&self, name: &str, path: impl AsRef<Path>) -> Result<TableId> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let (schema, _) = arrow::csv::reader::Format::default()
            .with_header(true)
            .infer_schema(&mut file, None)?;
        file.seek(SeekFrom::Start(0))?;

        let schema: SchemaRef = Arc::new(schema);
        let reader = arrow::csv::ReaderBuilder::new(schema.clone())
            .with_header(true)
            .build(file)?;
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;

        let id = self.catalog.create_table(name, schema, batches)?;
        tracing::info!("Registered table {} ({}) from {}", name, id, path.display());
        Ok(id)
    }

    pub fn register_batches(&self, name: &str, schema: SchemaRef, batches: Vec<RecordBatch>) -> Result<TableId> {
        self.catalog.create_table(name, schema, batches)
    }

    pub fn plan(&self, sql: &str) -> Result<PlanNode> {
        SqlPlanner::new(self.catalog.clone()).plan(sql)
    }

    pub fn execute_sql(&self, sql: &str, observer: &mut dyn PlanObserver) -> Result<QueryResult> {
        let plan = self.plan(sql)?;
        tracing::debug!("Plan:\n{}", plan);
        self.execute(&plan, observer)
    }

    /// Run `plan` to completion, reporting to `observer`.
    ///
    /// `on_execution_end` is called exactly once after `on_execution_start`,
    /// whether execution succeeds or fails.
    pub fn execute(&self, plan: &PlanNode, observer: &mut dyn PlanObserver) -> Result<QueryResult> {
        let columns = plan.columns();
        observer.on_execution_start(root_descriptors(&columns));

        let rows = self.run(plan, observer);
        observer.on_execution_end();

        let rows = rows?;
        tracing::debug!("Execution produced {} rows", rows.len());
        Ok(QueryResult {
            columns: columns.into_iter().map(|c| c.name).collect(),
            rows,
        })
    }

    fn run(&self, plan: &PlanNode, observer: &mut dyn PlanObserver) -> Result<Vec<Row>> {
        announce(plan, observer);
        let mut root = physical_plan::build(plan, self.catalog.as_ref())?;

        let mut rows = vec![];
        while let Some(row) = root.next()? {
            observer.on_root_tuple_produced(&row);
            rows.push(row);
        }
        Ok(rows)
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryCatalog::new()))
    }
}

fn root_descriptors(columns: &[PlanColumn]) -> Vec<ColumnDescriptor> {
    columns
        .iter()
        .enumerate()
        .map(|(position, column)| {
            let descriptor = ColumnDescriptor::new(
                position,
                column.name.clone(),
                ValueKind::from_data_type(&column.data_type),
            );
            match column.source {
                Some((table, col)) => descriptor.with_source(table, col),
                None => descriptor,
            }
        })
        .collect()
}

/// Announce `plan` and its descendants, children first.
fn announce(plan: &PlanNode, observer: &mut dyn PlanObserver) {
    for child in plan.children() {
        announce(child, observer);
    }
    match plan {
        PlanNode::Scan {
            table_id,
            columns,
            filters,
            ..
        } => {
            let target = ScanTarget {
                table: *table_id,
                columns,
            };
            observer.on_plan_node_init(&NodeInit::scan(target, filters));
        }
        PlanNode::Join { left, right, .. } => {
            // The outer input's tables keep their facts.
            let outer = left.base_tables();
            let inner: Vec<TableId> = right
                .base_tables()
                .into_iter()
                .filter(|table| !outer.contains(table))
                .collect();
            observer.on_plan_node_init(&NodeInit::other(NodeKind::Join, &inner));
        }
        _ => {
            let kind = match plan {
                PlanNode::Union { .. } => NodeKind::Append,
                PlanNode::Aggregate { group_by, .. } if !group_by.is_empty() => NodeKind::Group,
                PlanNode::Aggregate { .. } => NodeKind::Aggregate,
                PlanNode::Limit { .. } => NodeKind::Limit,
                _ => NodeKind::Other,
            };
            let tables = plan.base_tables();
            observer.on_plan_node_init(&NodeInit::other(kind, &tables));
        }
    }
}
