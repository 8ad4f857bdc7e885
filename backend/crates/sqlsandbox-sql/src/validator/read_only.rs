//! Structural read-only check over the parsed AST.

use std::ops::ControlFlow;

use sqlparser::ast::{Query, SetExpr, Statement, Visit, Visitor};

/// Rejects anything in the tree that could write, lock or create.
///
/// The root statement is counted by the first `pre_visit_statement` call, so
/// any further call means a statement is nested inside the query (for example
/// an `INSERT` used as a set-expression inside a CTE).
#[derive(Default)]
struct ReadOnlyVisitor {
    statements_seen: usize,
}

impl Visitor for ReadOnlyVisitor {
    type Break = String;

    fn pre_visit_statement(&mut self, statement: &Statement) -> ControlFlow<Self::Break> {
        self.statements_seen += 1;
        if self.statements_seen > 1 {
            return ControlFlow::Break(format!(
                "Operation not allowed: {}",
                leading_keyword(&statement.to_string())
            ));
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if !query.locks.is_empty() {
            return ControlFlow::Break(
                "Locking clauses (FOR UPDATE / FOR SHARE) are not allowed".to_string(),
            );
        }
        check_set_expr(&query.body)
    }
}

/// Walks the set-expression spine of one query. Nested `Query` nodes are left
/// to the visitor, which reaches them through `pre_visit_query`.
fn check_set_expr(body: &SetExpr) -> ControlFlow<String> {
    match body {
        SetExpr::Select(select) => {
            if select.into.is_some() {
                return ControlFlow::Break("SELECT ... INTO is not allowed".to_string());
            }
            ControlFlow::Continue(())
        },
        SetExpr::Query(_) | SetExpr::Values(_) | SetExpr::Table(_) => ControlFlow::Continue(()),
        SetExpr::SetOperation { left, right, .. } => {
            check_set_expr(left)?;
            check_set_expr(right)
        },
        other => ControlFlow::Break(format!(
            "Operation not allowed: {}",
            leading_keyword(&other.to_string())
        )),
    }
}

fn leading_keyword(rendered: &str) -> String {
    rendered
        .split_whitespace()
        .next()
        .unwrap_or("statement")
        .to_ascii_uppercase()
}

/// Checks one parsed root statement. Returns the rejection reason, if any.
pub(crate) fn check_read_only(statement: &Statement) -> Result<(), String> {
    if !matches!(statement, Statement::Query(_)) {
        return Err("Only SELECT queries are allowed".to_string());
    }

    let mut visitor = ReadOnlyVisitor::default();
    match statement.visit(&mut visitor) {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(reason) => Err(reason),
    }
}
