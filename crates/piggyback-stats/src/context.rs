//! Per-execution statistics context

use crate::facts::{extract_fact, Fact, FactKind};
use crate::fd::FdGrid;
use crate::ledger::{Ledger, Observation};
use crate::observe::{canonicalize, Slot, TupleView};
use crate::observer::{NodeInit, NodeKind, ScanTarget};
use crate::report::{self, StatisticsReport};
use piggyback_common::{
    ColumnDescriptor, PiggybackError, QueryId, Result, StatsConfig, TableId, ValueKind,
};
use piggyback_containers::hash_str;
use piggyback_sql::resolve_column;

/// State of one profiled execution: the ledger, the FD candidates and the
/// per-tuple value vector.
///
/// Errors never leave the context. Running out of resources abandons it:
/// every later callout does nothing and no report is produced.
pub struct StatisticsContext {
    query_id: QueryId,
    config: StatsConfig,
    descriptors: Vec<ColumnDescriptor>,
    ledger: Ledger,
    fd: Option<FdGrid>,
    prune_pending: bool,
    scanned_tables: Vec<TableId>,
    values: Vec<String>,
    keys: Vec<u64>,
    tracked_values: usize,
    tuples_observed: u64,
    abandoned: bool,
}

impl StatisticsContext {
    pub fn new(query_id: QueryId, config: StatsConfig, root_columns: Vec<ColumnDescriptor>) -> Self {
        let n = root_columns.len();
        tracing::info!("Collecting statistics for {} over {} columns", query_id, n);
        Self {
            query_id,
            config,
            descriptors: root_columns,
            ledger: Ledger::new(n),
            fd: None,
            prune_pending: true,
            scanned_tables: vec![],
            values: vec![String::new(); n],
            keys: vec![0; n],
            tracked_values: 0,
            tuples_observed: 0,
            abandoned: false,
        }
    }

    pub fn query_id(&self) -> QueryId {
        self.query_id
    }

    pub fn descriptors(&self) -> &[ColumnDescriptor] {
        &self.descriptors
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn fd_grid(&self) -> Option<&FdGrid> {
        self.fd.as_ref()
    }

    pub fn tuples_observed(&self) -> u64 {
        self.tuples_observed
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    pub fn on_node_init(&mut self, node: &NodeInit<'_>) {
        if self.abandoned {
            return;
        }
        match node.kind {
            NodeKind::Scan => match node.scan {
                Some(target) => self.init_scan(target, node),
                None => tracing::warn!("Scan node without a target table"),
            },
            kind if kind.invalidates() => self.invalidate_tables(node.input_tables),
            _ => {}
        }
    }

    fn init_scan(&mut self, target: ScanTarget<'_>, node: &NodeInit<'_>) {
        if self.scanned_tables.contains(&target.table) {
            // Tuples of a repeated scan never passed the earlier scan's filter.
            let reset = self.ledger.reset(target.table);
            tracing::debug!("Repeated scan of {} reset {} columns", target.table, reset);
            return;
        }
        self.scanned_tables.push(target.table);

        if node.filters.is_empty() {
            return;
        }

        let reset = self.ledger.reset(target.table);
        tracing::debug!("Filtered scan of {} reset {} columns", target.table, reset);

        if let Some(fact) = extract_fact(node.filters) {
            self.apply_fact(target, &fact);
        }
    }

    fn apply_fact(&mut self, target: ScanTarget<'_>, fact: &Fact) {
        let source = resolve_column(target.columns, &fact.column)
            .ok()
            .and_then(|i| target.columns[i].source);
        let Some((table, column)) = source else {
            tracing::debug!("Filter column '{}' not found in {}", fact.column, target.table);
            return;
        };

        let mut applied = 0;
        for descriptor in self.descriptors.iter().filter(|d| d.is_from(table, column)) {
            match fact.kind {
                FactKind::Equality => {
                    self.ledger.apply_equality_fact(descriptor, fact.constant.clone())
                }
                FactKind::Lower { inclusive } => {
                    self.ledger
                        .apply_range_fact(descriptor, fact.constant.clone(), true, inclusive)
                }
                FactKind::Upper { inclusive } => {
                    self.ledger
                        .apply_range_fact(descriptor, fact.constant.clone(), false, inclusive)
                }
            }
            applied += 1;
        }

        if applied == 0 {
            tracing::debug!("Fact on '{}' matches no result column", fact.column);
        } else {
            tracing::debug!(
                "Derived {:?} {} on '{}' for {} result columns",
                fact.kind,
                fact.constant,
                fact.column,
                applied
            );
        }
    }

    /// Rows of `tables` no longer pass through unchanged: facts about them
    /// turn into distinct-count ceilings.
    fn invalidate_tables(&mut self, tables: &[TableId]) {
        for &table in tables {
            let reset = self.ledger.invalidate(table);
            if reset > 0 {
                tracing::debug!("Invalidated {} ({} columns)", table, reset);
            }
        }
    }

    pub fn observe_tuple(&mut self, tuple: &dyn TupleView) {
        if self.abandoned {
            return;
        }
        if let Err(e) = self.try_observe(tuple) {
            self.abandon(e);
        }
    }

    fn try_observe(&mut self, tuple: &dyn TupleView) -> Result<()> {
        let n = self.descriptors.len();
        if tuple.column_count() == 0 {
            return Ok(());
        }
        if tuple.column_count() != n {
            tracing::warn!(
                "Tuple has {} columns, expected {}",
                tuple.column_count(),
                n
            );
            return Ok(());
        }
        self.tuples_observed += 1;

        let mut distinct_finalized = false;
        for position in 0..n {
            let descriptor = &self.descriptors[position];
            self.ledger.register_column(descriptor);

            let value = &mut self.values[position];
            let slot = canonicalize(descriptor.kind, &tuple.datum(position), value);
            if self.ledger.is_settled(position) {
                continue;
            }
            let observation = match slot {
                Slot::Missing => continue,
                Slot::Int(v) => Observation::Int(v),
                Slot::Canonical => Observation::Canonical(value.as_str()),
            };
            let outcome =
                self.ledger
                    .observe(position, observation, self.config.initial_set_bits)?;
            distinct_finalized |= outcome.distinct_finalized;
            if outcome.inserted {
                self.charge(1)?;
            }
        }

        if self.config.fd_discovery {
            self.update_dependencies(distinct_finalized)?;
        }
        Ok(())
    }

    fn update_dependencies(&mut self, distinct_finalized: bool) -> Result<()> {
        if self.fd.is_none() {
            let excluded: Vec<bool> = self
                .descriptors
                .iter()
                .map(|d| d.kind == ValueKind::Unsupported)
                .collect();
            self.fd = Some(FdGrid::new(
                self.descriptors.len(),
                self.config.initial_map_capacity,
                &excluded,
            )?);
        }
        let Some(grid) = self.fd.as_mut() else {
            return Ok(());
        };

        if self.prune_pending || distinct_finalized {
            let pruned = grid.prune(&self.ledger.final_distinct_counts());
            if pruned > 0 {
                tracing::debug!("Pruned {} FD candidates, {} live", pruned, grid.live_count());
            }
            self.prune_pending = false;
        }

        for (key, value) in self.keys.iter_mut().zip(&self.values) {
            *key = hash_str(value);
        }
        let inserted = grid.update(&self.keys)?;
        self.charge(inserted)
    }

    fn charge(&mut self, entries: usize) -> Result<()> {
        self.tracked_values += entries;
        match self.config.max_tracked_values {
            Some(limit) if self.tracked_values > limit => Err(PiggybackError::ResourceExhausted(
                format!("{} tracked values exceed the limit of {}", self.tracked_values, limit),
            )),
            _ => Ok(()),
        }
    }

    fn abandon(&mut self, err: PiggybackError) {
        tracing::error!("Abandoning statistics for {}: {}", self.query_id, err);
        self.abandoned = true;
        self.fd = None;
        self.ledger.release();
    }

    /// Assemble the report, unless the context was abandoned.
    pub fn finish(self) -> Option<StatisticsReport> {
        if self.abandoned {
            return None;
        }
        let report = report::assemble(
            self.query_id,
            self.tuples_observed,
            &self.ledger,
            self.fd.as_ref(),
            &self.descriptors,
        );
        tracing::info!(
            "Statistics for {}: {} tuples, {} columns, {} functional dependencies",
            self.query_id,
            report.tuples_observed,
            report.columns.len(),
            report.functional_dependencies.len()
        );
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Tracked;
    use crate::observe::Datum;
    use arrow_schema::DataType;
    use piggyback_common::{ColumnId, Scalar};
    use piggyback_sql::{BinaryOperator, Expr, PlanColumn};

    const PEOPLE: TableId = TableId(1);
    const DEPTS: TableId = TableId(2);

    struct Row(Vec<Datum<'static>>);

    impl TupleView for Row {
        fn column_count(&self) -> usize {
            self.0.len()
        }

        fn datum(&self, index: usize) -> Datum<'_> {
            self.0[index].clone()
        }
    }

    fn row(id: i64, dept: &'static str, age: i64) -> Row {
        Row(vec![Datum::Int(id), Datum::Text(dept.into()), Datum::Int(age)])
    }

    fn people_columns() -> Vec<PlanColumn> {
        ["id", "dept", "age"]
            .iter()
            .enumerate()
            .map(|(i, name)| PlanColumn {
                name: name.to_string(),
                qualifier: Some("people".to_string()),
                data_type: if i == 1 { DataType::Utf8 } else { DataType::Int64 },
                source: Some((PEOPLE, ColumnId(i as u32))),
            })
            .collect()
    }

    fn descriptors() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new(0, "id", ValueKind::Integer).with_source(PEOPLE, ColumnId(0)),
            ColumnDescriptor::new(1, "dept", ValueKind::Text).with_source(PEOPLE, ColumnId(1)),
            ColumnDescriptor::new(2, "age", ValueKind::Integer).with_source(PEOPLE, ColumnId(2)),
        ]
    }

    fn context(config: StatsConfig) -> StatisticsContext {
        StatisticsContext::new(QueryId::new(), config, descriptors())
    }

    fn init_scan(ctx: &mut StatisticsContext, filters: &[Expr]) {
        let columns = people_columns();
        ctx.on_node_init(&NodeInit::scan(
            ScanTarget {
                table: PEOPLE,
                columns: &columns,
            },
            filters,
        ));
    }

    #[test]
    fn test_equality_filter_settles_column() {
        let mut ctx = context(StatsConfig::default());
        init_scan(
            &mut ctx,
            &[Expr::binary(Expr::column("age"), BinaryOperator::Eq, Expr::int(30))],
        );
        for id in 0..4 {
            ctx.observe_tuple(&row(id, "sales", 30));
        }

        let age = ctx.ledger().get(2).unwrap();
        assert_eq!(age.distinct, Tracked::Final(1));
        assert_eq!(age.min, Tracked::Final(Scalar::Int(30)));
        assert_eq!(age.observed_len(), 0);
        assert_eq!(ctx.ledger().get(0).unwrap().observed_len(), 4);
    }

    #[test]
    fn test_range_filter_fixes_lower_bound() {
        let mut ctx = context(StatsConfig::default());
        init_scan(
            &mut ctx,
            &[Expr::binary(Expr::column("people.age"), BinaryOperator::Gt, Expr::int(18))],
        );
        for (id, age) in [(1, 44), (2, 19), (3, 61)] {
            ctx.observe_tuple(&row(id, "ops", age));
        }
        let age = ctx.ledger().get(2).unwrap();
        assert_eq!(age.min, Tracked::Final(Scalar::Int(19)));
        assert_eq!(age.max, Tracked::Provisional(Scalar::Int(61)));
    }

    #[test]
    fn test_join_invalidates_inner_tables() {
        let mut descriptors = descriptors();
        descriptors.push(
            ColumnDescriptor::new(3, "floor", ValueKind::Integer).with_source(DEPTS, ColumnId(1)),
        );
        let mut ctx = StatisticsContext::new(QueryId::new(), StatsConfig::default(), descriptors);
        ctx.ledger.apply_equality_fact(&ctx.descriptors[3].clone(), Scalar::Int(2));

        init_scan(
            &mut ctx,
            &[Expr::binary(Expr::column("age"), BinaryOperator::Eq, Expr::int(30))],
        );
        ctx.on_node_init(&NodeInit::other(NodeKind::Join, &[DEPTS]));

        assert!(ctx.ledger().get(2).unwrap().is_settled());
        let floor = ctx.ledger().get(3).unwrap();
        assert!(floor.distinct.is_unknown());
        assert_eq!(floor.distinct_ceiling(), Some(1));

        ctx.observe_tuple(&Row(vec![
            Datum::Int(1),
            Datum::Text("ops".into()),
            Datum::Int(30),
            Datum::Int(2),
        ]));
        let floor = ctx.ledger().get(3).unwrap();
        assert_eq!(floor.distinct, Tracked::Final(1));
        assert_eq!(floor.min, Tracked::Provisional(Scalar::Int(2)));
    }

    #[test]
    fn test_limit_turns_facts_into_ceilings() {
        let mut ctx = context(StatsConfig::default());
        init_scan(
            &mut ctx,
            &[Expr::binary(Expr::column("age"), BinaryOperator::Eq, Expr::int(30))],
        );
        ctx.on_node_init(&NodeInit::other(NodeKind::Limit, &[PEOPLE]));
        let age = ctx.ledger().get(2).unwrap();
        assert!(age.distinct.is_unknown());
        assert_eq!(age.most_frequent, None);

        ctx.observe_tuple(&row(1, "ops", 30));
        let age = ctx.ledger().get(2).unwrap();
        assert_eq!(age.distinct, Tracked::Final(1));
        assert_eq!(age.min, Tracked::Provisional(Scalar::Int(30)));

        // Sort and projection nodes leave facts alone.
        let mut ctx = context(StatsConfig::default());
        init_scan(
            &mut ctx,
            &[Expr::binary(Expr::column("age"), BinaryOperator::Eq, Expr::int(30))],
        );
        ctx.on_node_init(&NodeInit::other(NodeKind::Other, &[PEOPLE]));
        assert!(ctx.ledger().get(2).unwrap().is_settled());
    }

    #[test]
    fn test_repeated_scan_drops_facts() {
        let mut ctx = context(StatsConfig::default());
        init_scan(
            &mut ctx,
            &[Expr::binary(Expr::column("dept"), BinaryOperator::Eq, Expr::string("ops"))],
        );
        assert!(ctx.ledger().get(1).unwrap().is_settled());
        init_scan(&mut ctx, &[]);
        assert!(!ctx.ledger().get(1).unwrap().is_settled());

        // A filtered second scan does not apply its own fact either.
        init_scan(
            &mut ctx,
            &[Expr::binary(Expr::column("age"), BinaryOperator::Eq, Expr::int(30))],
        );
        assert!(ctx.ledger().get(2).unwrap().distinct.is_unknown());
    }

    #[test]
    fn test_filter_without_fact_still_resets() {
        let mut ctx = context(StatsConfig::default());
        ctx.ledger.apply_equality_fact(&ctx.descriptors[2].clone(), Scalar::Int(30));
        assert!(ctx.ledger().get(2).unwrap().is_settled());
        init_scan(
            &mut ctx,
            &[Expr::binary(Expr::column("id"), BinaryOperator::Neq, Expr::int(1))],
        );
        assert!(ctx.ledger().get(2).unwrap().distinct.is_unknown());
    }

    #[test]
    fn test_dependencies_and_pruning() {
        let mut ctx = context(StatsConfig::default());
        init_scan(
            &mut ctx,
            &[Expr::binary(Expr::column("dept"), BinaryOperator::Eq, Expr::string("ops"))],
        );
        for (id, age) in [(1, 30), (2, 30), (3, 41)] {
            ctx.observe_tuple(&row(id, "ops", age));
        }
        let report = ctx.finish().unwrap();
        let pairs: Vec<(usize, usize)> = report
            .functional_dependencies
            .iter()
            .map(|fd| (fd.determinant, fd.dependent))
            .collect();
        // dept is constant, so everything determines it and it determines nothing.
        assert_eq!(pairs, vec![(0, 1), (0, 2), (2, 1)]);
    }

    #[test]
    fn test_fd_discovery_disabled() {
        let mut ctx = context(StatsConfig::default().without_fd_discovery());
        ctx.observe_tuple(&row(1, "ops", 30));
        assert!(ctx.fd_grid().is_none());
        assert!(ctx.finish().unwrap().functional_dependencies.is_empty());
    }

    #[test]
    fn test_resource_limit_abandons_context() {
        let mut ctx = context(StatsConfig::default().with_max_tracked_values(10));
        for id in 0..20 {
            ctx.observe_tuple(&row(id, "ops", id));
        }
        assert!(ctx.is_abandoned());
        ctx.observe_tuple(&row(99, "ops", 1));
        assert!(ctx.finish().is_none());
    }

    #[test]
    fn test_empty_and_mismatched_tuples_are_skipped() {
        let mut ctx = context(StatsConfig::default());
        ctx.observe_tuple(&Row(vec![]));
        ctx.observe_tuple(&Row(vec![Datum::Int(1)]));
        assert_eq!(ctx.tuples_observed(), 0);
        assert_eq!(ctx.ledger().columns().count(), 0);
    }

    #[test]
    fn test_nulls_skip_statistics() {
        let mut ctx = context(StatsConfig::default());
        ctx.observe_tuple(&Row(vec![Datum::Int(1), Datum::Null, Datum::Int(20)]));
        ctx.observe_tuple(&Row(vec![Datum::Int(2), Datum::Null, Datum::Null]));
        let dept = ctx.ledger().get(1).unwrap();
        assert!(dept.distinct.is_unknown());
        let age = ctx.ledger().get(2).unwrap();
        assert_eq!(age.distinct, Tracked::Provisional(1));
        assert_eq!(ctx.tuples_observed(), 2);
    }
}
