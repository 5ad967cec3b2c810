//! SQL to PlanNode planner
//!
//! Supports `SELECT [DISTINCT] items FROM t [alias] [JOIN u ON ...] [, v]
//! [WHERE ...] [GROUP BY cols] [ORDER BY ...] [LIMIT n [OFFSET m]]` and
//! `UNION ALL` of such selects. `COUNT(*)` is the only aggregate.
//!
//! WHERE conjuncts that reference a single scanned table are pushed into that
//! scan's filter list in source order; the rest stay in a Filter node above
//! the joins.

use crate::expr::{BinaryOperator, Expr, Literal, UnaryOperator};
use crate::plan::{resolve_column, PlanColumn, PlanNode, SortKey};
use crate::SqlParser;
use arrow_schema::DataType;
use piggyback_catalog::CatalogProvider;
use piggyback_common::{ColumnId, PiggybackError, Result};
use sqlparser::ast;
use std::sync::Arc;

/// One entry of the SELECT list
enum SelectItem {
    Expr { expr: Expr, name: String },
    CountStar { name: String },
    Wildcard { qualifier: Option<String> },
}

/// SQL Planner
pub struct SqlPlanner {
    catalog: Arc<dyn CatalogProvider>,
}

impl SqlPlanner {
    pub fn new(catalog: Arc<dyn CatalogProvider>) -> Self {
        Self { catalog }
    }

    pub fn plan(&self, sql: &str) -> Result<PlanNode> {
        match SqlParser::parse_statement(sql)? {
            ast::Statement::Query(query) => {
                let plan = self.query_to_plan(&query)?;
                tracing::debug!("Planned query:\n{}", plan);
                Ok(plan)
            }
            _ => Err(PiggybackError::Planner("Only SELECT supported".to_string())),
        }
    }

    fn query_to_plan(&self, query: &ast::Query) -> Result<PlanNode> {
        if query.with.is_some() {
            return Err(PiggybackError::Planner("WITH is not supported".to_string()));
        }
        let mut plan = self.set_expr_to_plan(&query.body)?;

        if let Some(ref order_by) = query.order_by {
            let columns = plan.columns();
            let mut keys = Vec::new();
            for sort in &order_by.exprs {
                let expr = self.convert_expr(&sort.expr)?;
                check_columns(&expr, &columns)?;
                keys.push(SortKey {
                    expr,
                    ascending: sort.asc.unwrap_or(true),
                });
            }
            if !keys.is_empty() {
                plan = PlanNode::Sort {
                    input: Box::new(plan),
                    keys,
                };
            }
        }

        if query.limit.is_some() || query.offset.is_some() {
            let limit = match &query.limit {
                Some(expr) => Some(literal_usize(expr)?),
                None => None,
            };
            let offset = match &query.offset {
                Some(offset) => literal_usize(&offset.value)?,
                None => 0,
            };
            plan = PlanNode::Limit {
                input: Box::new(plan),
                limit,
                offset,
            };
        }

        Ok(plan)
    }

    fn set_expr_to_plan(&self, set_expr: &ast::SetExpr) -> Result<PlanNode> {
        match set_expr {
            ast::SetExpr::Select(select) => self.select_to_plan(select),
            ast::SetExpr::Query(query) => self.query_to_plan(query),
            ast::SetExpr::SetOperation {
                op: ast::SetOperator::Union,
                set_quantifier: ast::SetQuantifier::All,
                left,
                right,
            } => {
                let left = self.set_expr_to_plan(left)?;
                let right = self.set_expr_to_plan(right)?;
                union(left, right)
            }
            ast::SetExpr::SetOperation { .. } => Err(PiggybackError::Planner(
                "Only UNION ALL supported".to_string(),
            )),
            _ => Err(PiggybackError::Planner("Only SELECT supported".to_string())),
        }
    }

    fn select_to_plan(&self, select: &ast::Select) -> Result<PlanNode> {
        if select.having.is_some() {
            return Err(PiggybackError::Planner("HAVING is not supported".to_string()));
        }

        // FROM
        let mut plan: Option<PlanNode> = None;
        for table in &select.from {
            let mut relation = self.table_factor_to_plan(&table.relation)?;
            for join in &table.joins {
                let right = self.table_factor_to_plan(&join.relation)?;
                let on = match &join.join_operator {
                    ast::JoinOperator::Inner(ast::JoinConstraint::On(expr)) => {
                        Some(self.convert_expr(expr)?)
                    }
                    ast::JoinOperator::Inner(ast::JoinConstraint::None) => None,
                    other => {
                        return Err(PiggybackError::Planner(format!(
                            "unsupported join: {:?}",
                            other
                        )))
                    }
                };
                relation = join_plans(relation, right, on)?;
            }
            plan = Some(match plan {
                None => relation,
                Some(left) => join_plans(left, relation, None)?,
            });
        }
        let mut plan = plan.ok_or_else(|| {
            PiggybackError::Planner("SELECT without FROM is not supported".to_string())
        })?;

        // WHERE
        if let Some(ref selection) = select.selection {
            let predicate = self.convert_expr(selection)?;
            let columns = plan.columns();
            let mut residual: Vec<Expr> = vec![];
            for conjunct in predicate.split_conjunction() {
                check_columns(&conjunct, &columns)?;
                let refs = conjunct.get_columns();
                if refs.is_empty() || !push_into_scan(&mut plan, &conjunct, &refs) {
                    residual.push(conjunct);
                }
            }
            if let Some(predicate) = residual.into_iter().reduce(|a, b| a.and(b)) {
                plan = PlanNode::Filter {
                    input: Box::new(plan),
                    predicate,
                };
            }
        }

        let items = select
            .projection
            .iter()
            .map(|item| self.convert_select_item(item))
            .collect::<Result<Vec<_>>>()?;

        let group_by = match &select.group_by {
            ast::GroupByExpr::Expressions(exprs, _) => exprs
                .iter()
                .map(|e| self.convert_expr(e))
                .collect::<Result<Vec<_>>>()?,
            _ => {
                return Err(PiggybackError::Planner(
                    "GROUP BY ALL is not supported".to_string(),
                ))
            }
        };

        let has_count = items
            .iter()
            .any(|item| matches!(item, SelectItem::CountStar { .. }));
        if has_count || !group_by.is_empty() {
            plan = aggregate(plan, group_by, &items)?;
        }

        plan = project(plan, &items)?;

        if select.distinct.is_some() {
            let columns = plan.columns();
            let group_by = columns
                .iter()
                .map(|c| Expr::Column(c.qualified_name()))
                .collect();
            plan = PlanNode::Aggregate {
                input: Box::new(plan),
                group_by,
                count_alias: None,
                columns,
            };
        }

        Ok(plan)
    }

    fn table_factor_to_plan(&self, factor: &ast::TableFactor) -> Result<PlanNode> {
        match factor {
            ast::TableFactor::Table { name, alias, .. } => {
                let table_name = name
                    .0
                    .last()
                    .map(|ident| ident.value.clone())
                    .ok_or_else(|| PiggybackError::Planner("empty table name".to_string()))?;
                let entry = self
                    .catalog
                    .table(&table_name)
                    .ok_or_else(|| PiggybackError::NotFound(format!("table '{}'", table_name)))?;
                let qualifier = alias
                    .as_ref()
                    .map(|a| a.name.value.clone())
                    .unwrap_or_else(|| table_name.clone());
                let columns = entry
                    .schema
                    .fields()
                    .iter()
                    .enumerate()
                    .map(|(i, field)| PlanColumn {
                        name: field.name().clone(),
                        qualifier: Some(qualifier.clone()),
                        data_type: field.data_type().clone(),
                        source: Some((entry.id, ColumnId(i as u32))),
                    })
                    .collect();
                Ok(PlanNode::Scan {
                    table_name,
                    table_id: entry.id,
                    columns,
                    filters: vec![],
                })
            }
            other => Err(PiggybackError::Planner(format!(
                "unsupported relation: {}",
                other
            ))),
        }
    }

    fn convert_select_item(&self, item: &ast::SelectItem) -> Result<SelectItem> {
        let (expr, alias) = match item {
            ast::SelectItem::UnnamedExpr(expr) => (expr, None),
            ast::SelectItem::ExprWithAlias { expr, alias } => (expr, Some(alias.value.clone())),
            ast::SelectItem::Wildcard(_) => return Ok(SelectItem::Wildcard { qualifier: None }),
            ast::SelectItem::QualifiedWildcard(name, _) => {
                return Ok(SelectItem::Wildcard {
                    qualifier: name.0.last().map(|ident| ident.value.clone()),
                })
            }
        };

        if is_count_star(expr) {
            return Ok(SelectItem::CountStar {
                name: alias.unwrap_or_else(|| "count".to_string()),
            });
        }

        let expr = self.convert_expr(expr)?;
        let name = alias.unwrap_or_else(|| match &expr {
            Expr::Column(column) => column
                .rsplit_once('.')
                .map(|(_, name)| name.to_string())
                .unwrap_or_else(|| column.clone()),
            other => other.to_string(),
        });
        Ok(SelectItem::Expr { expr, name })
    }

    fn convert_expr(&self, expr: &ast::Expr) -> Result<Expr> {
        match expr {
            ast::Expr::Identifier(ident) => Ok(Expr::Column(ident.value.clone())),
            ast::Expr::CompoundIdentifier(idents) => Ok(Expr::Column(
                idents
                    .iter()
                    .map(|i| i.value.as_str())
                    .collect::<Vec<_>>()
                    .join("."),
            )),
            ast::Expr::Value(value) => Ok(Expr::Literal(convert_value(value)?)),
            ast::Expr::Nested(inner) => self.convert_expr(inner),
            ast::Expr::BinaryOp { left, op, right } => Ok(Expr::binary(
                self.convert_expr(left)?,
                convert_op(op)?,
                self.convert_expr(right)?,
            )),
            ast::Expr::UnaryOp { op, expr } => match op {
                ast::UnaryOperator::Plus => self.convert_expr(expr),
                ast::UnaryOperator::Minus => match self.convert_expr(expr)? {
                    Expr::Literal(Literal::Int(v)) => v
                        .checked_neg()
                        .map(|v| Expr::Literal(Literal::Int(v)))
                        .ok_or_else(|| PiggybackError::Planner("integer overflow".to_string())),
                    Expr::Literal(Literal::Float(v)) => Ok(Expr::Literal(Literal::Float(-v))),
                    other => Ok(Expr::UnaryOp {
                        op: UnaryOperator::Minus,
                        expr: Box::new(other),
                    }),
                },
                ast::UnaryOperator::Not => Ok(Expr::UnaryOp {
                    op: UnaryOperator::Not,
                    expr: Box::new(self.convert_expr(expr)?),
                }),
                other => Err(PiggybackError::Planner(format!(
                    "unsupported unary operator: {}",
                    other
                ))),
            },
            other => Err(PiggybackError::Planner(format!(
                "unsupported expression: {}",
                other
            ))),
        }
    }
}

fn is_count_star(expr: &ast::Expr) -> bool {
    matches!(expr, ast::Expr::Function(f) if f.to_string().eq_ignore_ascii_case("COUNT(*)"))
}

fn convert_value(value: &ast::Value) -> Result<Literal> {
    match value {
        ast::Value::Number(n, _) => {
            if let Ok(v) = n.parse::<i64>() {
                Ok(Literal::Int(v))
            } else {
                n.parse::<f64>()
                    .map(Literal::Float)
                    .map_err(|e| PiggybackError::Planner(format!("invalid number '{}': {}", n, e)))
            }
        }
        ast::Value::SingleQuotedString(s) => Ok(Literal::String(s.clone())),
        ast::Value::Boolean(b) => Ok(Literal::Boolean(*b)),
        ast::Value::Null => Ok(Literal::Null),
        other => Err(PiggybackError::Planner(format!(
            "unsupported literal: {}",
            other
        ))),
    }
}

fn convert_op(op: &ast::BinaryOperator) -> Result<BinaryOperator> {
    Ok(match op {
        ast::BinaryOperator::Eq => BinaryOperator::Eq,
        ast::BinaryOperator::NotEq => BinaryOperator::Neq,
        ast::BinaryOperator::Lt => BinaryOperator::Lt,
        ast::BinaryOperator::LtEq => BinaryOperator::Lte,
        ast::BinaryOperator::Gt => BinaryOperator::Gt,
        ast::BinaryOperator::GtEq => BinaryOperator::Gte,
        ast::BinaryOperator::And => BinaryOperator::And,
        ast::BinaryOperator::Or => BinaryOperator::Or,
        ast::BinaryOperator::Plus => BinaryOperator::Plus,
        ast::BinaryOperator::Minus => BinaryOperator::Minus,
        ast::BinaryOperator::Multiply => BinaryOperator::Multiply,
        ast::BinaryOperator::Divide => BinaryOperator::Divide,
        ast::BinaryOperator::Modulo => BinaryOperator::Modulo,
        other => {
            return Err(PiggybackError::Planner(format!(
                "unsupported operator: {}",
                other
            )))
        }
    })
}

fn literal_usize(expr: &ast::Expr) -> Result<usize> {
    match expr {
        ast::Expr::Value(ast::Value::Number(n, _)) => n
            .parse()
            .map_err(|_| PiggybackError::Planner(format!("invalid LIMIT/OFFSET value '{}'", n))),
        other => Err(PiggybackError::Planner(format!(
            "LIMIT/OFFSET must be a number, got {}",
            other
        ))),
    }
}

fn check_columns(expr: &Expr, columns: &[PlanColumn]) -> Result<()> {
    for column in expr.get_columns() {
        resolve_column(columns, &column)?;
    }
    Ok(())
}

/// Push `conjunct` into the one scan that owns every column it references.
fn push_into_scan(plan: &mut PlanNode, conjunct: &Expr, refs: &[String]) -> bool {
    match plan {
        PlanNode::Scan {
            columns, filters, ..
        } => {
            if refs.iter().all(|r| resolve_column(columns, r).is_ok()) {
                filters.push(conjunct.clone());
                true
            } else {
                false
            }
        }
        PlanNode::Join { left, right, .. } => {
            push_into_scan(left, conjunct, refs) || push_into_scan(right, conjunct, refs)
        }
        _ => false,
    }
}

fn join_plans(left: PlanNode, right: PlanNode, on: Option<Expr>) -> Result<PlanNode> {
    let mut columns = left.columns();
    columns.extend(right.columns());
    if let Some(ref on) = on {
        check_columns(on, &columns)?;
    }
    Ok(PlanNode::Join {
        left: Box::new(left),
        right: Box::new(right),
        on,
        columns,
    })
}

fn union(left: PlanNode, right: PlanNode) -> Result<PlanNode> {
    let right_columns = right.columns();
    let (mut inputs, left_columns) = match left {
        PlanNode::Union { inputs, columns } => (inputs, columns),
        other => {
            let columns = other.columns();
            (vec![other], columns)
        }
    };
    if left_columns.len() != right_columns.len() {
        return Err(PiggybackError::Planner(format!(
            "UNION inputs have {} and {} columns",
            left_columns.len(),
            right_columns.len()
        )));
    }
    let columns = left_columns
        .iter()
        .zip(&right_columns)
        .map(|(l, r)| PlanColumn {
            name: l.name.clone(),
            qualifier: None,
            data_type: l.data_type.clone(),
            source: if l.source == r.source { l.source } else { None },
        })
        .collect();
    inputs.push(right);
    Ok(PlanNode::Union { inputs, columns })
}

fn aggregate(input: PlanNode, group_by: Vec<Expr>, items: &[SelectItem]) -> Result<PlanNode> {
    let input_columns = input.columns();
    let mut columns = Vec::with_capacity(group_by.len() + 1);
    for expr in &group_by {
        match expr {
            Expr::Column(name) => {
                let index = resolve_column(&input_columns, name)?;
                columns.push(input_columns[index].clone());
            }
            other => {
                return Err(PiggybackError::Planner(format!(
                    "GROUP BY supports plain columns only, got {}",
                    other
                )))
            }
        }
    }

    let count_alias = items.iter().find_map(|item| match item {
        SelectItem::CountStar { name } => Some(name.clone()),
        _ => None,
    });
    if let Some(ref alias) = count_alias {
        columns.push(PlanColumn::new(alias.clone(), DataType::Int64));
    }

    Ok(PlanNode::Aggregate {
        input: Box::new(input),
        group_by,
        count_alias,
        columns,
    })
}

fn project(input: PlanNode, items: &[SelectItem]) -> Result<PlanNode> {
    let input_columns = input.columns();
    let count_column = match &input {
        PlanNode::Aggregate {
            count_alias: Some(alias),
            ..
        } => Some(alias.clone()),
        _ => None,
    };

    let mut exprs = vec![];
    let mut columns = vec![];
    for item in items {
        match item {
            SelectItem::Expr { expr, name } => {
                check_columns(expr, &input_columns)?;
                let mut column = match expr {
                    Expr::Column(reference) => {
                        input_columns[resolve_column(&input_columns, reference)?].clone()
                    }
                    other => PlanColumn::new(name.clone(), expr_type(other, &input_columns)?),
                };
                column.name = name.clone();
                exprs.push(expr.clone());
                columns.push(column);
            }
            SelectItem::CountStar { name } => {
                let count = count_column.clone().ok_or_else(|| {
                    PiggybackError::Planner("COUNT(*) outside of aggregation".to_string())
                })?;
                exprs.push(Expr::Column(count));
                columns.push(PlanColumn::new(name.clone(), DataType::Int64));
            }
            SelectItem::Wildcard { qualifier } => {
                if count_column.is_some() {
                    return Err(PiggybackError::Planner(
                        "wildcard is not allowed with aggregation".to_string(),
                    ));
                }
                let matched: Vec<&PlanColumn> = input_columns
                    .iter()
                    .filter(|c| qualifier.is_none() || c.qualifier == *qualifier)
                    .collect();
                if matched.is_empty() {
                    return Err(PiggybackError::Planner(format!(
                        "wildcard {:?} matches no columns",
                        qualifier
                    )));
                }
                for column in matched {
                    exprs.push(Expr::Column(column.qualified_name()));
                    columns.push(column.clone());
                }
            }
        }
    }

    Ok(PlanNode::Project {
        input: Box::new(input),
        exprs,
        columns,
    })
}

/// Output type of `expr` over `columns`
pub fn expr_type(expr: &Expr, columns: &[PlanColumn]) -> Result<DataType> {
    Ok(match expr {
        Expr::Column(name) => columns[resolve_column(columns, name)?].data_type.clone(),
        Expr::Literal(Literal::Int(_)) => DataType::Int64,
        Expr::Literal(Literal::Float(_)) => DataType::Float64,
        Expr::Literal(Literal::String(_)) => DataType::Utf8,
        Expr::Literal(Literal::Boolean(_)) => DataType::Boolean,
        Expr::Literal(Literal::Null) => DataType::Null,
        Expr::BinaryOp { left, op, right } => {
            if op.is_comparison() || matches!(op, BinaryOperator::And | BinaryOperator::Or) {
                DataType::Boolean
            } else {
                let l = expr_type(left, columns)?;
                let r = expr_type(right, columns)?;
                if l.is_integer() && r.is_integer() {
                    DataType::Int64
                } else {
                    DataType::Float64
                }
            }
        }
        Expr::UnaryOp {
            op: UnaryOperator::Not,
            ..
        } => DataType::Boolean,
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => expr_type(expr, columns)?,
    })
}
