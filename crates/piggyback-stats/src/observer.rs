//! Executor callouts

use crate::context::StatisticsContext;
use crate::observe::TupleView;
use crate::sink::ReportSink;
use piggyback_common::{ColumnDescriptor, QueryId, StatsConfig, TableId};
use piggyback_sql::{Expr, PlanColumn};

/// Kind of plan node being initialized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Scan,
    Join,
    Append,
    SetOperation,
    Aggregate,
    Group,
    Limit,
    Other,
}

impl NodeKind {
    /// Nodes that change which tuples of the tables beneath them survive
    pub fn invalidates(&self) -> bool {
        !matches!(self, NodeKind::Scan | NodeKind::Other)
    }
}

/// Table read by a scan node
#[derive(Debug, Clone, Copy)]
pub struct ScanTarget<'a> {
    pub table: TableId,
    /// Output columns of the scan, used to resolve filter column references
    pub columns: &'a [PlanColumn],
}

/// One plan node, announced before execution starts
#[derive(Debug, Clone, Copy)]
pub struct NodeInit<'a> {
    pub kind: NodeKind,
    pub scan: Option<ScanTarget<'a>>,
    /// Filter conjuncts evaluated by this node, in source order
    pub filters: &'a [Expr],
    /// Tables whose rows this node introduces: the inner input's tables for a
    /// join, every base table beneath it otherwise
    pub input_tables: &'a [TableId],
}

impl<'a> NodeInit<'a> {
    pub fn scan(target: ScanTarget<'a>, filters: &'a [Expr]) -> Self {
        Self {
            kind: NodeKind::Scan,
            scan: Some(target),
            filters,
            input_tables: &[],
        }
    }

    pub fn other(kind: NodeKind, input_tables: &'a [TableId]) -> Self {
        Self {
            kind,
            scan: None,
            filters: &[],
            input_tables,
        }
    }
}

/// Callouts an executor makes while running one query
pub trait PlanObserver {
    /// The root node was identified; its output columns are the ones profiled.
    fn on_execution_start(&mut self, root_columns: Vec<ColumnDescriptor>);

    /// Called for every plan node before the first tuple, once the node's
    /// children have been announced.
    fn on_plan_node_init(&mut self, node: &NodeInit<'_>);

    fn on_root_tuple_produced(&mut self, tuple: &dyn TupleView);

    /// Called exactly once when execution ends, normally or not.
    fn on_execution_end(&mut self);
}

/// Observer that ignores every callout
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl PlanObserver for NullObserver {
    fn on_execution_start(&mut self, _root_columns: Vec<ColumnDescriptor>) {}

    fn on_plan_node_init(&mut self, _node: &NodeInit<'_>) {}

    fn on_root_tuple_produced(&mut self, _tuple: &dyn TupleView) {}

    fn on_execution_end(&mut self) {}
}

/// Holds at most one live statistics context and delivers its report.
pub struct PiggybackSession {
    config: StatsConfig,
    context: Option<StatisticsContext>,
    sink: Box<dyn ReportSink>,
}

impl PiggybackSession {
    pub fn new(config: StatsConfig, sink: Box<dyn ReportSink>) -> Self {
        Self {
            config,
            context: None,
            sink,
        }
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    /// Start profiling a new execution, discarding any live context.
    pub fn begin(&mut self, root_columns: Vec<ColumnDescriptor>) -> QueryId {
        if let Some(previous) = self.context.take() {
            tracing::debug!("Discarding statistics of {}", previous.query_id());
        }
        let query_id = QueryId::new();
        self.context = Some(StatisticsContext::new(
            query_id,
            self.config.clone(),
            root_columns,
        ));
        query_id
    }

    pub fn context(&self) -> Option<&StatisticsContext> {
        self.context.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.context.is_some()
    }
}

impl PlanObserver for PiggybackSession {
    fn on_execution_start(&mut self, root_columns: Vec<ColumnDescriptor>) {
        self.begin(root_columns);
    }

    fn on_plan_node_init(&mut self, node: &NodeInit<'_>) {
        match self.context.as_mut() {
            Some(context) => context.on_node_init(node),
            None => tracing::warn!("Plan node {:?} initialized outside of an execution", node.kind),
        }
    }

    fn on_root_tuple_produced(&mut self, tuple: &dyn TupleView) {
        if let Some(context) = self.context.as_mut() {
            context.observe_tuple(tuple);
        }
    }

    fn on_execution_end(&mut self) {
        let Some(context) = self.context.take() else {
            return;
        };
        let query_id = context.query_id();
        let Some(report) = context.finish() else {
            return;
        };
        if let Err(e) = self.sink.deliver(report) {
            tracing::error!("Failed to deliver statistics of {}: {}", query_id, e);
        }
    }
}
