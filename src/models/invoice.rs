use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    pub enum InvoiceStatus as "invoice status" {
        Pending => "PENDING",
        Sent => "SENT",
        Paid => "PAID",
        Overdue => "OVERDUE",
        Cancelled => "CANCELLED",
    }
}

impl InvoiceStatus {
    /// Paid and cancelled invoices no longer count as outstanding.
    pub fn is_settled(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: i32,
    pub project_id: i32,
    pub milestone_id: Option<i32>,
    pub invoice_number: String,
    pub amount: f64,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: InvoiceStatus,
    pub paid_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Invoice joined with its project and optional milestone.
#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub invoice: Invoice,
    pub project_name: String,
    pub project_code: String,
    pub client_name: String,
    pub milestone_name: Option<String>,
}

/// Body of `POST /financial/invoices`.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceInput {
    pub project_id: i32,
    pub milestone_id: Option<i32>,
    pub amount: f64,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// Formats the sequence value into an invoice number like `INV-000042`.
pub fn format_invoice_number(seq: i64) -> String {
    format!("INV-{:06}", seq)
}
