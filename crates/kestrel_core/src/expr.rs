/*
 * SPDX-FileCopyrightText: 2026 Kestrel Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Composable SQL boolean expressions.
//!
//! Every caller-supplied value travels as a bound parameter; the only
//! inline SQL comes from [`Expr::fragment`] and [`Expr::like_fragment`],
//! which are reserved for internally generated text (bitmask tests,
//! delimiter-anchored match patterns). Rendering walks the tree left to
//! right, so parameter order always matches placeholder order.

use rusqlite::types::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Gt,
    Lt,
    Like,
}

impl CmpOp {
    fn sql(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Gt => ">",
            CmpOp::Lt => "<",
            CmpOp::Like => "LIKE",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    /// `column <op> ?` with one bound value.
    Cmp {
        column: String,
        op: CmpOp,
        value: Value,
    },
    /// `column IN (?, ?, ...)`. Empty value lists render as false.
    InArgs {
        column: String,
        values: Vec<Value>,
    },
    /// `column NOT IN (<subquery>)`.
    NotInSelect {
        column: String,
        select: Box<Select>,
    },
    /// `column LIKE <pattern>` where the pattern is a trusted SQL
    /// fragment, never caller data.
    LikeFragment {
        column: String,
        pattern: String,
    },
    /// Trusted fragment with no bound values.
    Fragment(String),
}

impl Expr {
    pub fn and(mut parts: Vec<Expr>) -> Expr {
        if parts.len() == 1 {
            return parts.remove(0);
        }
        Expr::And(parts)
    }

    pub fn or(mut parts: Vec<Expr>) -> Expr {
        if parts.len() == 1 {
            return parts.remove(0);
        }
        Expr::Or(parts)
    }

    pub fn eq_arg(column: impl Into<String>, value: impl Into<Value>) -> Expr {
        Expr::Cmp {
            column: column.into(),
            op: CmpOp::Eq,
            value: value.into(),
        }
    }

    pub fn gt_arg(column: impl Into<String>, value: impl Into<Value>) -> Expr {
        Expr::Cmp {
            column: column.into(),
            op: CmpOp::Gt,
            value: value.into(),
        }
    }

    pub fn lt_arg(column: impl Into<String>, value: impl Into<Value>) -> Expr {
        Expr::Cmp {
            column: column.into(),
            op: CmpOp::Lt,
            value: value.into(),
        }
    }

    pub fn like_arg(column: impl Into<String>, pattern: impl Into<Value>) -> Expr {
        Expr::Cmp {
            column: column.into(),
            op: CmpOp::Like,
            value: pattern.into(),
        }
    }

    pub fn in_args(column: impl Into<String>, values: Vec<Value>) -> Expr {
        Expr::InArgs {
            column: column.into(),
            values,
        }
    }

    pub fn not_in_select(column: impl Into<String>, select: Select) -> Expr {
        Expr::NotInSelect {
            column: column.into(),
            select: Box::new(select),
        }
    }

    pub fn like_fragment(column: impl Into<String>, pattern: impl Into<String>) -> Expr {
        Expr::LikeFragment {
            column: column.into(),
            pattern: pattern.into(),
        }
    }

    pub fn fragment(sql: impl Into<String>) -> Expr {
        Expr::Fragment(sql.into())
    }

    pub fn render(&self) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut args = Vec::new();
        self.push_sql(&mut sql, &mut args);
        (sql, args)
    }

    fn push_sql(&self, sql: &mut String, args: &mut Vec<Value>) {
        match self {
            Expr::And(parts) => push_joined(parts, " AND ", "1", sql, args),
            Expr::Or(parts) => push_joined(parts, " OR ", "0", sql, args),
            Expr::Cmp { column, op, value } => {
                sql.push_str(column);
                sql.push(' ');
                sql.push_str(op.sql());
                sql.push_str(" ?");
                args.push(value.clone());
            }
            Expr::InArgs { column, values } => {
                if values.is_empty() {
                    sql.push('0');
                    return;
                }
                sql.push_str(column);
                sql.push_str(" IN (");
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(", ");
                    }
                    sql.push('?');
                    args.push(v.clone());
                }
                sql.push(')');
            }
            Expr::NotInSelect { column, select } => {
                sql.push_str(column);
                sql.push_str(" NOT IN (");
                select.push_sql(sql, args);
                sql.push(')');
            }
            Expr::LikeFragment { column, pattern } => {
                sql.push_str(column);
                sql.push_str(" LIKE ");
                sql.push_str(pattern);
            }
            Expr::Fragment(text) => sql.push_str(text),
        }
    }
}

fn push_joined(parts: &[Expr], sep: &str, empty: &str, sql: &mut String, args: &mut Vec<Value>) {
    if parts.is_empty() {
        sql.push_str(empty);
        return;
    }
    sql.push('(');
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            sql.push_str(sep);
        }
        part.push_sql(sql, args);
    }
    sql.push(')');
}

/// SELECT builder used for excluded-id subqueries, ranked retention
/// windows and grouped watermark queries.
#[derive(Debug, Clone, Default)]
pub struct Select {
    columns: Vec<String>,
    from: Vec<String>,
    where_clause: Option<Expr>,
    group_by: Option<String>,
    having: Option<Expr>,
    order_by: Option<String>,
    limit: Option<u64>,
    union: Option<Box<Select>>,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.from.push(table.into());
        self
    }

    pub fn filter(mut self, expr: Expr) -> Self {
        self.where_clause = Some(expr);
        self
    }

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by = Some(column.into());
        self
    }

    pub fn having(mut self, expr: Expr) -> Self {
        self.having = Some(expr);
        self
    }

    /// `fragment` is trusted text such as `"timestamp DESC"`.
    pub fn order_by(mut self, fragment: impl Into<String>) -> Self {
        self.order_by = Some(fragment.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Appends `next` to the end of the UNION chain.
    pub fn union(mut self, next: Select) -> Self {
        self.union = match self.union {
            Some(existing) => Some(Box::new(existing.union(next))),
            None => Some(Box::new(next)),
        };
        self
    }

    pub fn render(&self) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut args = Vec::new();
        self.push_sql(&mut sql, &mut args);
        (sql, args)
    }

    fn push_sql(&self, sql: &mut String, args: &mut Vec<Value>) {
        sql.push_str("SELECT ");
        sql.push_str(&self.columns.join(", "));
        sql.push_str(" FROM ");
        sql.push_str(&self.from.join(", "));
        if let Some(where_clause) = &self.where_clause {
            sql.push_str(" WHERE ");
            where_clause.push_sql(sql, args);
        }
        if let Some(group_by) = &self.group_by {
            sql.push_str(" GROUP BY ");
            sql.push_str(group_by);
        }
        if let Some(having) = &self.having {
            sql.push_str(" HAVING ");
            having.push_sql(sql, args);
        }
        if let Some(order_by) = &self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }
        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ");
            sql.push_str(&limit.to_string());
        }
        if let Some(union) = &self.union {
            sql.push_str(" UNION ");
            union.push_sql(sql, args);
        }
    }
}
