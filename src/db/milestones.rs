use chrono::NaiveDate;
use sqlx::{Postgres, QueryBuilder, Result};

use super::Database;
use crate::models::{Milestone, MilestoneInput, MilestoneStatus, MilestoneView};

const MILESTONE_VIEW: &str = r#"
    SELECT m.*,
           p.name AS project_name, p.project_code,
           (SELECT COUNT(*) FROM invoices i WHERE i.milestone_id = m.id) AS invoice_count
    FROM milestones m
    JOIN projects p ON p.id = m.project_id
    WHERE TRUE
"#;

#[derive(Debug, Default, Clone, Copy)]
pub struct MilestoneFilter {
    pub project_id: Option<i32>,
    pub status: Option<MilestoneStatus>,
}

impl Database {
    /// Scheduled date ascending.
    pub async fn list_milestones(&self, filter: MilestoneFilter) -> Result<Vec<MilestoneView>> {
        let mut qb = QueryBuilder::<Postgres>::new(MILESTONE_VIEW);
        if let Some(id) = filter.project_id {
            qb.push(" AND m.project_id = ").push_bind(id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND m.status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY m.scheduled_date ASC");

        qb.build_query_as::<MilestoneView>()
            .fetch_all(self.pool())
            .await
    }

    pub async fn find_milestone(&self, id: i32) -> Result<Option<Milestone>> {
        sqlx::query_as::<_, Milestone>("SELECT * FROM milestones WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
    }

    pub async fn create_milestone(&self, project_id: i32, input: &MilestoneInput) -> Result<Milestone> {
        sqlx::query_as::<_, Milestone>(
            r#"
            INSERT INTO milestones (project_id, name, description, scheduled_date,
                                    is_billing_milestone, billing_amount, billing_percentage)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(project_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.scheduled_date)
        .bind(input.is_billing_milestone)
        .bind(input.billing_amount)
        .bind(input.billing_percentage)
        .fetch_one(self.pool())
        .await
    }

    pub async fn update_milestone(&self, id: i32, input: &MilestoneInput) -> Result<Option<Milestone>> {
        sqlx::query_as::<_, Milestone>(
            r#"
            UPDATE milestones
            SET name = $2, description = $3, scheduled_date = $4, is_billing_milestone = $5,
                billing_amount = $6, billing_percentage = $7, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.scheduled_date)
        .bind(input.is_billing_milestone)
        .bind(input.billing_amount)
        .bind(input.billing_percentage)
        .fetch_optional(self.pool())
        .await
    }

    /// `actual_date` is only written when given.
    pub async fn set_milestone_status(
        &self,
        id: i32,
        status: MilestoneStatus,
        actual_date: Option<NaiveDate>,
    ) -> Result<Option<Milestone>> {
        sqlx::query_as::<_, Milestone>(
            r#"
            UPDATE milestones
            SET status = $2, actual_date = COALESCE($3, actual_date), updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(actual_date)
        .fetch_optional(self.pool())
        .await
    }

    pub async fn count_milestone_invoices(&self, id: i32) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE milestone_id = $1")
            .bind(id)
            .fetch_one(self.pool())
            .await
    }

    /// Returns `false` when no such milestone existed.
    pub async fn delete_milestone(&self, id: i32) -> Result<bool> {
        let done = sqlx::query("DELETE FROM milestones WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(done.rows_affected() > 0)
    }
}
