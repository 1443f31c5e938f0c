//! Name resolution over the parsed statement
//!
//! Walks the AST keeping a stack of scopes (one per query block). Each scope binds the
//! relations of its FROM clause under their alias or table name, plus CTEs declared by
//! its WITH clause. Unqualified columns resolve innermost-first so correlated
//! subqueries see their outer blocks.

use super::types::{Literal, TypeCategory};
use super::violation::{ValidationOutcome, Violation};
use crate::schema::{ColumnDescriptor, SchemaDescription, TableDescriptor};
use sqlparser::ast::{
    Assignment, BinaryOperator, Distinct, Expr, Function, FunctionArg, FunctionArgExpr,
    GroupByExpr, Ident, JoinConstraint, JoinOperator, ObjectName, OrderByExpr, Query, Select,
    SelectItem, SetExpr, Statement, TableFactor, TableWithJoins, UnaryOperator, WindowSpec,
    WindowType,
};
use std::collections::BTreeSet;

/// Columns visible through a relation binding.
#[derive(Debug, Clone)]
enum Columns<'s> {
    Table(&'s TableDescriptor),
    Named(Vec<String>),
    /// Unknown column set (wildcard CTEs, table functions, unresolved tables).
    Opaque,
}

#[derive(Debug)]
struct Relation<'s> {
    binding: String,
    columns: Columns<'s>,
}

#[derive(Debug, Default)]
struct Frame<'s> {
    relations: Vec<Relation<'s>>,
    ctes: Vec<(String, Columns<'s>)>,
    output_aliases: Vec<String>,
    aliases_visible: bool,
}

enum Lookup<'s> {
    Typed(&'s ColumnDescriptor),
    Untyped,
    UnknownColumn(Option<String>),
    UnknownQualifier,
}

/// What an expression is known to be, for the compatibility check.
enum Operand<'s> {
    Column {
        label: String,
        column: &'s ColumnDescriptor,
    },
    Literal(Literal),
    Other,
}

pub(crate) struct Walker<'s, 'o> {
    schema: &'s SchemaDescription,
    allowed_tables: Option<&'s BTreeSet<String>>,
    frames: Vec<Frame<'s>>,
    outcome: &'o mut ValidationOutcome,
}

/// `INSERT ... DEFAULT VALUES` has no source query; older AST versions always carry one.
trait InsertSource {
    fn source_query(&self) -> Option<&Query>;
}

impl InsertSource for Box<Query> {
    fn source_query(&self) -> Option<&Query> {
        Some(self)
    }
}

impl InsertSource for Option<Box<Query>> {
    fn source_query(&self) -> Option<&Query> {
        self.as_deref()
    }
}

impl<'s, 'o> Walker<'s, 'o> {
    pub(crate) fn new(
        schema: &'s SchemaDescription,
        allowed_tables: Option<&'s BTreeSet<String>>,
        outcome: &'o mut ValidationOutcome,
    ) -> Self {
        Self {
            schema,
            allowed_tables,
            frames: Vec::new(),
            outcome,
        }
    }

    pub(crate) fn walk_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Query(query) => self.walk_query(query),
            Statement::Insert {
                table_name,
                columns,
                source,
                ..
            } => self.walk_insert(table_name, columns, source.source_query()),
            Statement::Update {
                table,
                assignments,
                from,
                selection,
                ..
            } => self.walk_update(table, assignments, from.as_ref(), selection.as_ref()),
            Statement::Delete {
                from,
                using,
                selection,
                ..
            } => {
                self.frames.push(Frame::default());
                for table in from.iter().chain(using.iter().flatten()) {
                    self.walk_table_with_joins(table);
                }
                if let Some(selection) = selection {
                    self.walk_expr(selection);
                }
                self.frames.pop();
            }
            // Other statement kinds are only subject to the statement-kind check.
            _ => {}
        }
    }

    fn walk_query(&mut self, query: &Query) {
        self.frames.push(Frame::default());

        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                let name = cte.alias.name.value.to_lowercase();
                if with.recursive {
                    self.declare_cte(name.clone(), Columns::Opaque);
                }
                self.walk_query(&cte.query);
                let columns = if cte.alias.columns.is_empty() {
                    output_columns(&cte.query.body)
                } else {
                    Columns::Named(idents_lowercase(&cte.alias.columns))
                };
                self.declare_cte(name, columns);
            }
        }

        match query.body.as_ref() {
            SetExpr::Select(select) => {
                self.walk_select(select);
                self.walk_order_by(&query.order_by);
            }
            // ORDER BY over a set operation can only name the output columns.
            body => {
                self.walk_set_expr(body);
                self.bind(Relation {
                    binding: String::new(),
                    columns: output_columns(body),
                });
                self.walk_order_by(&query.order_by);
            }
        }

        self.frames.pop();
    }

    fn walk_set_expr(&mut self, body: &SetExpr) {
        match body {
            SetExpr::Select(select) => {
                self.frames.push(Frame::default());
                self.walk_select(select);
                self.frames.pop();
            }
            SetExpr::Query(query) => self.walk_query(query),
            SetExpr::SetOperation { left, right, .. } => {
                self.walk_set_expr(left);
                self.walk_set_expr(right);
            }
            SetExpr::Values(values) => {
                for row in &values.rows {
                    for expr in row {
                        self.walk_expr(expr);
                    }
                }
            }
            _ => {}
        }
    }

    /// Binds the FROM clause into the current frame, then checks the clauses in the
    /// order their names become visible.
    fn walk_select(&mut self, select: &Select) {
        for table in &select.from {
            self.walk_table_with_joins(table);
        }

        let aliases = select
            .projection
            .iter()
            .filter_map(|item| match item {
                SelectItem::ExprWithAlias { alias, .. } => Some(alias.value.to_lowercase()),
                _ => None,
            })
            .collect();
        if let Some(frame) = self.frames.last_mut() {
            frame.output_aliases = aliases;
        }

        for item in &select.projection {
            match item {
                SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
                    self.walk_expr(expr);
                }
                SelectItem::QualifiedWildcard(name, _) => {
                    if let Some(qualifier) = name.0.last() {
                        if !self.has_binding(&qualifier.value) {
                            self.outcome.push(Violation::unknown_table(qualifier.value.clone()));
                        }
                    }
                }
                SelectItem::Wildcard(_) => {}
            }
        }

        if let Some(selection) = &select.selection {
            self.walk_expr(selection);
        }
        for window in &select.named_window {
            self.walk_window_spec(&window.1);
        }

        // GROUP BY, HAVING, DISTINCT ON and ORDER BY may name select-list aliases.
        if let Some(frame) = self.frames.last_mut() {
            frame.aliases_visible = true;
        }
        if let Some(Distinct::On(exprs)) = &select.distinct {
            for expr in exprs {
                self.walk_expr(expr);
            }
        }
        if let GroupByExpr::Expressions(exprs) = &select.group_by {
            for expr in exprs {
                self.walk_expr(expr);
            }
        }
        if let Some(having) = &select.having {
            self.walk_expr(having);
        }
        if let Some(qualify) = &select.qualify {
            self.walk_expr(qualify);
        }
    }

    fn walk_order_by(&mut self, order_by: &[OrderByExpr]) {
        for item in order_by {
            self.walk_expr(&item.expr);
        }
    }

    fn walk_window_spec(&mut self, spec: &WindowSpec) {
        for expr in &spec.partition_by {
            self.walk_expr(expr);
        }
        self.walk_order_by(&spec.order_by);
    }

    fn walk_function(&mut self, function: &Function) {
        for arg in &function.args {
            match arg {
                FunctionArg::Unnamed(FunctionArgExpr::Expr(expr))
                | FunctionArg::Named {
                    arg: FunctionArgExpr::Expr(expr),
                    ..
                } => {
                    self.walk_expr(expr);
                }
                _ => {}
            }
        }
        if let Some(filter) = &function.filter {
            self.walk_expr(filter);
        }
        if let Some(WindowType::WindowSpec(spec)) = &function.over {
            self.walk_window_spec(spec);
        }
        self.walk_order_by(&function.order_by);
    }

    fn walk_exprs<'e>(&mut self, exprs: impl IntoIterator<Item = &'e Expr>) {
        for expr in exprs {
            self.walk_expr(expr);
        }
    }

    fn walk_table_with_joins(&mut self, table: &TableWithJoins) {
        self.bind_table_factor(&table.relation);
        for join in &table.joins {
            self.bind_table_factor(&join.relation);
            match join_constraint(&join.join_operator) {
                Some(JoinConstraint::On(expr)) => {
                    self.walk_expr(expr);
                }
                Some(JoinConstraint::Using(columns)) => {
                    for column in columns {
                        self.column_operand(None, &column.value);
                    }
                }
                _ => {}
            }
        }
    }

    fn bind_table_factor(&mut self, factor: &TableFactor) {
        match factor {
            TableFactor::Table { name, alias, .. } => {
                let table_name = object_tail(name);
                let binding = alias
                    .as_ref()
                    .map(|a| a.name.value.to_lowercase())
                    .unwrap_or_else(|| table_name.to_lowercase());

                let cte = if name.0.len() == 1 {
                    self.lookup_cte(&table_name)
                } else {
                    None
                };
                let mut columns = match cte {
                    Some(columns) => columns,
                    None => self.resolve_table(&table_name),
                };
                if let Some(alias) = alias {
                    if !alias.columns.is_empty() {
                        columns = Columns::Named(idents_lowercase(&alias.columns));
                    }
                }
                self.bind(Relation { binding, columns });
            }
            TableFactor::Derived {
                subquery, alias, ..
            } => {
                self.walk_query(subquery);
                let columns = match alias {
                    Some(alias) if !alias.columns.is_empty() => {
                        Columns::Named(idents_lowercase(&alias.columns))
                    }
                    _ => output_columns(&subquery.body),
                };
                let binding = alias
                    .as_ref()
                    .map(|a| a.name.value.to_lowercase())
                    .unwrap_or_default();
                self.bind(Relation { binding, columns });
            }
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => self.walk_table_with_joins(table_with_joins),
            // Table functions, UNNEST and friends: accept whatever they expose.
            _ => self.bind(Relation {
                binding: String::new(),
                columns: Columns::Opaque,
            }),
        }
    }

    fn walk_insert(&mut self, table_name: &ObjectName, columns: &[Ident], source: Option<&Query>) {
        let schema = self.schema;
        let name = object_tail(table_name);
        let table = schema.table(&name);

        match table {
            Some(table) => {
                self.check_allowed(table);
                for column in columns {
                    if table.find_column(&column.value).is_none() {
                        self.outcome.push(Violation::UnknownColumn {
                            column: column.value.clone(),
                            table: Some(table.name.clone()),
                        });
                    }
                }
            }
            None => self.outcome.push(Violation::unknown_table(name)),
        }

        let Some(source) = source else {
            return;
        };
        match (table, source.body.as_ref()) {
            (Some(table), SetExpr::Values(values)) => {
                let targets: Vec<Option<&'s ColumnDescriptor>> = if columns.is_empty() {
                    table.columns.iter().map(Some).collect()
                } else {
                    columns.iter().map(|c| table.find_column(&c.value)).collect()
                };
                for row in &values.rows {
                    for (target, expr) in targets.iter().copied().zip(row) {
                        let value = self.walk_expr(expr);
                        if let Some(column) = target {
                            let target = Operand::Column {
                                label: column.name.clone(),
                                column,
                            };
                            self.check_compatible(&target, &value);
                        }
                    }
                }
            }
            _ => self.walk_query(source),
        }
    }

    fn walk_update(
        &mut self,
        table: &TableWithJoins,
        assignments: &[Assignment],
        from: Option<&TableWithJoins>,
        selection: Option<&Expr>,
    ) {
        self.frames.push(Frame::default());
        self.walk_table_with_joins(table);
        if let Some(from) = from {
            self.walk_table_with_joins(from);
        }

        for assignment in assignments {
            let target = match assignment.id.as_slice() {
                [] => continue,
                [column] => self.column_operand(None, &column.value),
                [.., qualifier, column] => self.column_operand(Some(&qualifier.value), &column.value),
            };
            let value = self.walk_expr(&assignment.value);
            self.check_compatible(&target, &value);
        }

        if let Some(selection) = selection {
            self.walk_expr(selection);
        }
        self.frames.pop();
    }

    fn walk_expr(&mut self, expr: &Expr) -> Operand<'s> {
        match expr {
            Expr::Identifier(ident) => self.column_operand(None, &ident.value),
            Expr::CompoundIdentifier(idents) => match idents.as_slice() {
                [] => Operand::Other,
                [column] => self.column_operand(None, &column.value),
                [.., qualifier, column] => {
                    self.column_operand(Some(&qualifier.value), &column.value)
                }
            },
            Expr::Value(value) => match Literal::from_value(value) {
                Some(literal) => Operand::Literal(literal),
                None => Operand::Other,
            },
            Expr::UnaryOp { op, expr } => match (op, self.walk_expr(expr)) {
                (UnaryOperator::Minus, Operand::Literal(literal)) => {
                    Operand::Literal(literal.negated())
                }
                (UnaryOperator::Plus, Operand::Literal(literal)) => Operand::Literal(literal),
                _ => Operand::Other,
            },
            Expr::Nested(inner) => self.walk_expr(inner),
            Expr::BinaryOp { left, op, right } => {
                let left = self.walk_expr(left);
                let right = self.walk_expr(right);
                if is_comparison(op) {
                    self.check_compatible(&left, &right);
                }
                Operand::Other
            }
            Expr::IsDistinctFrom(left, right) | Expr::IsNotDistinctFrom(left, right) => {
                let left = self.walk_expr(left);
                let right = self.walk_expr(right);
                self.check_compatible(&left, &right);
                Operand::Other
            }
            Expr::InList { expr, list, .. } => {
                let target = self.walk_expr(expr);
                for item in list {
                    let item = self.walk_expr(item);
                    self.check_compatible(&target, &item);
                }
                Operand::Other
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                let target = self.walk_expr(expr);
                for bound in [low, high] {
                    let bound = self.walk_expr(bound);
                    self.check_compatible(&target, &bound);
                }
                Operand::Other
            }
            Expr::InSubquery { expr, subquery, .. } => {
                self.walk_expr(expr);
                self.walk_query(subquery);
                Operand::Other
            }
            Expr::Exists { subquery, .. } => {
                self.walk_query(subquery);
                Operand::Other
            }
            Expr::Subquery(query) => {
                self.walk_query(query);
                Operand::Other
            }
            Expr::Like { expr, pattern, .. }
            | Expr::ILike { expr, pattern, .. }
            | Expr::SimilarTo { expr, pattern, .. } => {
                self.walk_expr(expr);
                self.walk_expr(pattern);
                Operand::Other
            }
            Expr::IsNull(inner)
            | Expr::IsNotNull(inner)
            | Expr::IsTrue(inner)
            | Expr::IsFalse(inner)
            | Expr::IsNotTrue(inner)
            | Expr::IsNotFalse(inner)
            | Expr::IsUnknown(inner)
            | Expr::IsNotUnknown(inner) => {
                self.walk_expr(inner);
                Operand::Other
            }
            Expr::Cast { expr, .. }
            | Expr::TryCast { expr, .. }
            | Expr::Extract { expr, .. }
            | Expr::Collate { expr, .. } => {
                self.walk_expr(expr);
                Operand::Other
            }
            Expr::Case {
                operand,
                conditions,
                results,
                else_result,
            } => {
                let operand = operand.as_ref().map(|o| self.walk_expr(o));
                for condition in conditions {
                    let condition = self.walk_expr(condition);
                    if let Some(operand) = &operand {
                        self.check_compatible(operand, &condition);
                    }
                }
                for result in results.iter().chain(else_result.iter().map(|e| e.as_ref())) {
                    self.walk_expr(result);
                }
                Operand::Other
            }
            Expr::Function(function) => {
                self.walk_function(function);
                Operand::Other
            }
            Expr::AggregateExpressionWithFilter { expr, filter } => {
                self.walk_expr(expr);
                self.walk_expr(filter);
                Operand::Other
            }
            Expr::ArrayAgg(agg) => {
                self.walk_expr(&agg.expr);
                self.walk_order_by(agg.order_by.as_deref().unwrap_or_default());
                Operand::Other
            }
            Expr::ListAgg(agg) => {
                self.walk_expr(&agg.expr);
                self.walk_order_by(&agg.within_group);
                Operand::Other
            }
            Expr::AnyOp { left, right, .. } | Expr::AllOp { left, right, .. } => {
                self.walk_expr(left);
                self.walk_expr(right);
                Operand::Other
            }
            Expr::RLike { expr, pattern, .. } => {
                self.walk_expr(expr);
                self.walk_expr(pattern);
                Operand::Other
            }
            Expr::JsonAccess { left, right, .. } => {
                self.walk_expr(left);
                self.walk_expr(right);
                Operand::Other
            }
            Expr::Position { expr, r#in } => {
                self.walk_expr(expr);
                self.walk_expr(r#in);
                Operand::Other
            }
            Expr::Substring {
                expr,
                substring_from,
                substring_for,
                ..
            } => {
                self.walk_expr(expr);
                let bounds = substring_from.iter().chain(substring_for.iter());
                self.walk_exprs(bounds.map(|e| &**e));
                Operand::Other
            }
            Expr::Trim {
                expr,
                trim_what,
                trim_characters,
                ..
            } => {
                self.walk_expr(expr);
                self.walk_exprs(trim_what.as_deref());
                self.walk_exprs(trim_characters.iter().flatten());
                Operand::Other
            }
            Expr::Overlay {
                expr,
                overlay_what,
                overlay_from,
                overlay_for,
            } => {
                self.walk_expr(expr);
                self.walk_expr(overlay_what);
                self.walk_expr(overlay_from);
                self.walk_exprs(overlay_for.as_deref());
                Operand::Other
            }
            Expr::SafeCast { expr, .. }
            | Expr::Ceil { expr, .. }
            | Expr::Floor { expr, .. }
            | Expr::CompositeAccess { expr, .. }
            | Expr::Named { expr, .. } => {
                self.walk_expr(expr);
                Operand::Other
            }
            Expr::AtTimeZone { timestamp, .. } => {
                self.walk_expr(timestamp);
                Operand::Other
            }
            Expr::Interval(interval) => {
                self.walk_expr(&interval.value);
                Operand::Other
            }
            Expr::MapAccess { column, keys } => {
                self.walk_expr(column);
                self.walk_exprs(keys);
                Operand::Other
            }
            Expr::ArrayIndex { obj, indexes } => {
                self.walk_expr(obj);
                self.walk_exprs(indexes);
                Operand::Other
            }
            Expr::InUnnest {
                expr, array_expr, ..
            } => {
                self.walk_expr(expr);
                self.walk_expr(array_expr);
                Operand::Other
            }
            Expr::ArraySubquery(query) => {
                self.walk_query(query);
                Operand::Other
            }
            Expr::Array(array) => {
                self.walk_exprs(&array.elem);
                Operand::Other
            }
            Expr::Tuple(items) | Expr::Struct { values: items, .. } => {
                self.walk_exprs(items);
                Operand::Other
            }
            Expr::GroupingSets(sets) | Expr::Cube(sets) | Expr::Rollup(sets) => {
                self.walk_exprs(sets.iter().flatten());
                Operand::Other
            }
            _ => Operand::Other,
        }
    }

    fn column_operand(&mut self, qualifier: Option<&str>, column: &str) -> Operand<'s> {
        let lookup = match qualifier {
            None => self.resolve_unqualified(column),
            Some(qualifier) => self.resolve_qualified(qualifier, column),
        };
        match lookup {
            Lookup::Typed(descriptor) => Operand::Column {
                label: match qualifier {
                    Some(q) => format!("{}.{}", q, column),
                    None => column.to_string(),
                },
                column: descriptor,
            },
            Lookup::Untyped => Operand::Other,
            Lookup::UnknownColumn(table) => {
                self.outcome.push(Violation::UnknownColumn {
                    column: column.to_string(),
                    table,
                });
                Operand::Other
            }
            Lookup::UnknownQualifier => {
                self.outcome
                    .push(Violation::unknown_table(qualifier.unwrap_or_default()));
                Operand::Other
            }
        }
    }

    fn resolve_unqualified(&self, column: &str) -> Lookup<'s> {
        for frame in self.frames.iter().rev() {
            let mut untyped = false;
            for relation in &frame.relations {
                match &relation.columns {
                    Columns::Table(table) => {
                        if let Some(descriptor) = (*table).find_column(column) {
                            return Lookup::Typed(descriptor);
                        }
                    }
                    Columns::Named(names) => {
                        untyped |= names.iter().any(|n| n.eq_ignore_ascii_case(column));
                    }
                    Columns::Opaque => untyped = true,
                }
            }
            if untyped {
                return Lookup::Untyped;
            }
            if frame.aliases_visible
                && frame
                    .output_aliases
                    .iter()
                    .any(|a| a.eq_ignore_ascii_case(column))
            {
                return Lookup::Untyped;
            }
        }
        Lookup::UnknownColumn(None)
    }

    fn resolve_qualified(&self, qualifier: &str, column: &str) -> Lookup<'s> {
        for frame in self.frames.iter().rev() {
            let relation = frame
                .relations
                .iter()
                .find(|r| r.binding.eq_ignore_ascii_case(qualifier));
            if let Some(relation) = relation {
                return match &relation.columns {
                    Columns::Table(table) => match (*table).find_column(column) {
                        Some(descriptor) => Lookup::Typed(descriptor),
                        None => Lookup::UnknownColumn(Some(table.name.clone())),
                    },
                    Columns::Named(names) => {
                        if names.iter().any(|n| n.eq_ignore_ascii_case(column)) {
                            Lookup::Untyped
                        } else {
                            Lookup::UnknownColumn(Some(relation.binding.clone()))
                        }
                    }
                    Columns::Opaque => Lookup::Untyped,
                };
            }
        }
        Lookup::UnknownQualifier
    }

    fn check_compatible(&mut self, left: &Operand<'s>, right: &Operand<'s>) {
        match (left, right) {
            (Operand::Column { label, column }, Operand::Literal(literal))
            | (Operand::Literal(literal), Operand::Column { label, column }) => {
                if !TypeCategory::of(&column.declared_type).accepts(literal) {
                    self.outcome.push(Violation::TypeMismatch {
                        column: label.clone(),
                        declared_type: column.declared_type.clone(),
                        other: literal.describe(),
                    });
                }
            }
            (
                Operand::Column {
                    label: left_label,
                    column: left_column,
                },
                Operand::Column {
                    label: right_label,
                    column: right_column,
                },
            ) => {
                let left_category = TypeCategory::of(&left_column.declared_type);
                let right_category = TypeCategory::of(&right_column.declared_type);
                if !left_category.compatible_with(right_category) {
                    self.outcome.push(Violation::TypeMismatch {
                        column: left_label.clone(),
                        declared_type: left_column.declared_type.clone(),
                        other: format!(
                            "column \"{}\" ({})",
                            right_label, right_column.declared_type
                        ),
                    });
                }
            }
            _ => {}
        }
    }

    fn resolve_table(&mut self, table_name: &str) -> Columns<'s> {
        let schema = self.schema;
        match schema.table(table_name) {
            Some(table) => {
                self.check_allowed(table);
                Columns::Table(table)
            }
            None => {
                self.outcome.push(Violation::unknown_table(table_name));
                Columns::Opaque
            }
        }
    }

    fn check_allowed(&mut self, table: &TableDescriptor) {
        if let Some(allowed) = self.allowed_tables {
            if !allowed.contains(&table.name.to_lowercase()) {
                self.outcome.push(Violation::DisallowedTable {
                    table: table.name.clone(),
                });
            }
        }
    }

    fn declare_cte(&mut self, name: String, columns: Columns<'s>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.ctes.retain(|(existing, _)| existing != &name);
            frame.ctes.push((name, columns));
        }
    }

    fn lookup_cte(&self, name: &str) -> Option<Columns<'s>> {
        self.frames.iter().rev().find_map(|frame| {
            frame
                .ctes
                .iter()
                .find(|(cte, _)| cte.eq_ignore_ascii_case(name))
                .map(|(_, columns)| columns.clone())
        })
    }

    fn has_binding(&self, qualifier: &str) -> bool {
        self.frames.iter().rev().any(|frame| {
            frame
                .relations
                .iter()
                .any(|r| r.binding.eq_ignore_ascii_case(qualifier))
        })
    }

    fn bind(&mut self, relation: Relation<'s>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.relations.push(relation);
        }
    }
}

fn join_constraint(operator: &JoinOperator) -> Option<&JoinConstraint> {
    match operator {
        JoinOperator::Inner(constraint)
        | JoinOperator::LeftOuter(constraint)
        | JoinOperator::RightOuter(constraint)
        | JoinOperator::FullOuter(constraint) => Some(constraint),
        _ => None,
    }
}

fn is_comparison(op: &BinaryOperator) -> bool {
    matches!(
        op,
        BinaryOperator::Eq
            | BinaryOperator::NotEq
            | BinaryOperator::Lt
            | BinaryOperator::LtEq
            | BinaryOperator::Gt
            | BinaryOperator::GtEq
    )
}

/// Names produced by a query body, when they can be read off the projection.
fn output_columns(body: &SetExpr) -> Columns<'static> {
    match body {
        SetExpr::Select(select) => {
            let mut names = Vec::new();
            for item in &select.projection {
                match item {
                    SelectItem::ExprWithAlias { alias, .. } => names.push(alias.value.to_lowercase()),
                    SelectItem::UnnamedExpr(Expr::Identifier(ident)) => {
                        names.push(ident.value.to_lowercase())
                    }
                    SelectItem::UnnamedExpr(Expr::CompoundIdentifier(idents)) => {
                        if let Some(last) = idents.last() {
                            names.push(last.value.to_lowercase());
                        }
                    }
                    SelectItem::UnnamedExpr(Expr::Function(function)) => {
                        if let Some(last) = function.name.0.last() {
                            names.push(last.value.to_lowercase());
                        }
                    }
                    SelectItem::UnnamedExpr(_) => {}
                    SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(..) => {
                        return Columns::Opaque
                    }
                }
            }
            Columns::Named(names)
        }
        SetExpr::Query(query) => output_columns(&query.body),
        SetExpr::SetOperation { left, .. } => output_columns(left),
        _ => Columns::Opaque,
    }
}

fn object_tail(name: &ObjectName) -> String {
    name.0
        .last()
        .map(|ident| ident.value.clone())
        .unwrap_or_default()
}

fn idents_lowercase(idents: &[Ident]) -> Vec<String> {
    idents.iter().map(|i| i.value.to_lowercase()).collect()
}
