use chrono::NaiveDate;
use sqlx::{Postgres, QueryBuilder, Result};

use super::Database;
use crate::analysis::DateWindow;
use crate::models::{
    format_invoice_number, Expense, ExpenseCategory, ExpenseInput, ExpenseView, Invoice, InvoiceInput,
    InvoiceStatus, InvoiceView,
};

const EXPENSE_VIEW: &str = r#"
    SELECT e.*, p.name AS project_name, p.project_code
    FROM expenses e
    JOIN projects p ON p.id = e.project_id
    WHERE TRUE
"#;

const INVOICE_VIEW: &str = r#"
    SELECT i.*, p.name AS project_name, p.project_code, p.client_name, m.name AS milestone_name
    FROM invoices i
    JOIN projects p ON p.id = i.project_id
    LEFT JOIN milestones m ON m.id = i.milestone_id
    WHERE TRUE
"#;

#[derive(Debug, Default, Clone, Copy)]
pub struct ExpenseFilter {
    pub project_id: Option<i32>,
    pub category: Option<ExpenseCategory>,
    /// Inclusive on both ends.
    pub window: Option<DateWindow>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct InvoiceFilter {
    pub project_id: Option<i32>,
    pub status: Option<InvoiceStatus>,
    pub milestone_id: Option<i32>,
}

impl Database {
    /// Most recent expense first.
    pub async fn list_expenses(&self, filter: ExpenseFilter) -> Result<Vec<ExpenseView>> {
        let mut qb = QueryBuilder::<Postgres>::new(EXPENSE_VIEW);
        if let Some(id) = filter.project_id {
            qb.push(" AND e.project_id = ").push_bind(id);
        }
        if let Some(category) = filter.category {
            qb.push(" AND e.category = ").push_bind(category.as_str());
        }
        if let Some(w) = filter.window {
            qb.push(" AND e.date >= ").push_bind(w.start);
            qb.push(" AND e.date <= ").push_bind(w.end);
        }
        qb.push(" ORDER BY e.date DESC");

        qb.build_query_as::<ExpenseView>()
            .fetch_all(self.pool())
            .await
    }

    pub async fn create_expense(&self, project_id: i32, input: &ExpenseInput) -> Result<Expense> {
        sqlx::query_as::<_, Expense>(
            r#"
            INSERT INTO expenses (project_id, description, amount, category, date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(project_id)
        .bind(&input.description)
        .bind(input.amount)
        .bind(input.category.as_str())
        .bind(input.date)
        .fetch_one(self.pool())
        .await
    }

    pub async fn update_expense(&self, id: i32, input: &ExpenseInput) -> Result<Option<Expense>> {
        sqlx::query_as::<_, Expense>(
            r#"
            UPDATE expenses
            SET description = $2, amount = $3, category = $4, date = $5, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.description)
        .bind(input.amount)
        .bind(input.category.as_str())
        .bind(input.date)
        .fetch_optional(self.pool())
        .await
    }

    /// Returns `false` when no such expense existed.
    pub async fn delete_expense(&self, id: i32) -> Result<bool> {
        let done = sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Most recently issued first.
    pub async fn list_invoices(&self, filter: InvoiceFilter) -> Result<Vec<InvoiceView>> {
        let mut qb = QueryBuilder::<Postgres>::new(INVOICE_VIEW);
        if let Some(id) = filter.project_id {
            qb.push(" AND i.project_id = ").push_bind(id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND i.status = ").push_bind(status.as_str());
        }
        if let Some(id) = filter.milestone_id {
            qb.push(" AND i.milestone_id = ").push_bind(id);
        }
        qb.push(" ORDER BY i.issue_date DESC");

        qb.build_query_as::<InvoiceView>()
            .fetch_all(self.pool())
            .await
    }

    /// Draws the next invoice number from `invoice_number_seq` and inserts
    /// the invoice in one transaction.
    pub async fn create_invoice(&self, input: &InvoiceInput) -> Result<Invoice> {
        let mut tx = self.pool().begin().await?;

        let seq: i64 = sqlx::query_scalar("SELECT nextval('invoice_number_seq')")
            .fetch_one(&mut *tx)
            .await?;

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (project_id, milestone_id, invoice_number, amount, issue_date, due_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(input.project_id)
        .bind(input.milestone_id)
        .bind(format_invoice_number(seq))
        .bind(input.amount)
        .bind(input.issue_date)
        .bind(input.due_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(invoice)
    }

    /// `paid_date` is only written when given.
    pub async fn set_invoice_status(
        &self,
        id: i32,
        status: InvoiceStatus,
        paid_date: Option<NaiveDate>,
    ) -> Result<Option<Invoice>> {
        sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET status = $2, paid_date = COALESCE($3, paid_date), updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(paid_date)
        .fetch_optional(self.pool())
        .await
    }
}
