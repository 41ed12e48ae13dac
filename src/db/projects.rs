use sqlx::Result;

use super::Database;
use crate::analysis::Portfolio;
use crate::models::{
    Expense, Invoice, Milestone, Project, ProjectInput, ProjectStatus, ProjectWithCounts,
    ResourceAllocation,
};

impl Database {
    /// Newest first, each with the number of related rows.
    pub async fn list_projects(&self) -> Result<Vec<ProjectWithCounts>> {
        sqlx::query_as::<_, ProjectWithCounts>(
            r#"
            SELECT p.*,
                   (SELECT COUNT(*) FROM milestones m WHERE m.project_id = p.id) AS milestone_count,
                   (SELECT COUNT(*) FROM resource_allocations a WHERE a.project_id = p.id) AS allocation_count,
                   (SELECT COUNT(*) FROM expenses e WHERE e.project_id = p.id) AS expense_count
            FROM projects p
            ORDER BY p.created_at DESC
            "#,
        )
        .fetch_all(self.pool())
        .await
    }

    pub async fn find_project(&self, id: i32) -> Result<Option<Project>> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
    }

    pub async fn create_project(&self, input: &ProjectInput, created_by: i32) -> Result<Project> {
        sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (name, project_code, description, po_number, po_date, po_amount,
                                  client_name, start_date, end_date, budget, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.project_code)
        .bind(&input.description)
        .bind(&input.po_number)
        .bind(input.po_date)
        .bind(input.po_amount)
        .bind(&input.client_name)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.budget)
        .bind(created_by)
        .fetch_one(self.pool())
        .await
    }

    pub async fn update_project(&self, id: i32, input: &ProjectInput) -> Result<Option<Project>> {
        sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = $2, project_code = $3, description = $4, po_number = $5, po_date = $6,
                po_amount = $7, client_name = $8, start_date = $9, end_date = $10, budget = $11,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.project_code)
        .bind(&input.description)
        .bind(&input.po_number)
        .bind(input.po_date)
        .bind(input.po_amount)
        .bind(&input.client_name)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.budget)
        .fetch_optional(self.pool())
        .await
    }

    pub async fn set_project_status(&self, id: i32, status: ProjectStatus) -> Result<Option<Project>> {
        sqlx::query_as::<_, Project>(
            "UPDATE projects SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(self.pool())
        .await
    }

    /// Load projects and every row that references them. `None` loads the
    /// whole portfolio.
    pub async fn load_portfolio(&self, project_ids: Option<&[i32]>) -> Result<Portfolio> {
        let ids: Option<Vec<i32>> = project_ids.map(<[i32]>::to_vec);

        let projects = sqlx::query_as::<_, Project>(
            "SELECT * FROM projects WHERE ($1::int4[] IS NULL OR id = ANY($1)) ORDER BY created_at DESC",
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        let milestones = sqlx::query_as::<_, Milestone>(
            r#"
            SELECT * FROM milestones
            WHERE ($1::int4[] IS NULL OR project_id = ANY($1))
            ORDER BY scheduled_date ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        let allocations = sqlx::query_as::<_, ResourceAllocation>(
            r#"
            SELECT * FROM resource_allocations
            WHERE ($1::int4[] IS NULL OR project_id = ANY($1))
            ORDER BY start_date DESC
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        let expenses = sqlx::query_as::<_, Expense>(
            r#"
            SELECT * FROM expenses
            WHERE ($1::int4[] IS NULL OR project_id = ANY($1))
            ORDER BY date DESC
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT * FROM invoices
            WHERE ($1::int4[] IS NULL OR project_id = ANY($1))
            ORDER BY issue_date DESC
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        Ok(Portfolio {
            projects,
            milestones,
            allocations,
            expenses,
            invoices,
        })
    }
}
