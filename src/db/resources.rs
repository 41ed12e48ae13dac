use sqlx::{Postgres, QueryBuilder, Result};

use super::Database;
use crate::analysis::allocation::check_capacity;
use crate::error::{ApiError, ApiResult};
use crate::models::{AllocationInput, AllocationView, Resource, ResourceAllocation, ResourceInput};

const ALLOCATION_VIEW: &str = r#"
    SELECT a.*,
           r.name AS resource_name, r.resource_code,
           p.name AS project_name, p.project_code, p.status AS project_status
    FROM resource_allocations a
    JOIN resources r ON r.id = a.resource_id
    JOIN projects p ON p.id = a.project_id
    WHERE TRUE
"#;

/// Optional restrictions for allocation listings.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllocationFilter {
    pub resource_id: Option<i32>,
    pub project_id: Option<i32>,
    pub active_only: bool,
}

impl Database {
    pub async fn list_resources(&self) -> Result<Vec<Resource>> {
        sqlx::query_as::<_, Resource>("SELECT * FROM resources ORDER BY name ASC")
            .fetch_all(self.pool())
            .await
    }

    pub async fn find_resource(&self, id: i32) -> Result<Option<Resource>> {
        sqlx::query_as::<_, Resource>("SELECT * FROM resources WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
    }

    pub async fn create_resource(&self, input: &ResourceInput, created_by: i32) -> Result<Resource> {
        sqlx::query_as::<_, Resource>(
            r#"
            INSERT INTO resources (resource_code, name, email, phone, salary, hourly_rate,
                                   years_of_exp, skills, certifications, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&input.resource_code)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.salary)
        .bind(input.hourly_rate)
        .bind(input.years_of_exp)
        .bind(&input.skills)
        .bind(&input.certifications)
        .bind(created_by)
        .fetch_one(self.pool())
        .await
    }

    pub async fn update_resource(&self, id: i32, input: &ResourceInput) -> Result<Option<Resource>> {
        sqlx::query_as::<_, Resource>(
            r#"
            UPDATE resources
            SET resource_code = $2, name = $3, email = $4, phone = $5, salary = $6,
                hourly_rate = $7, years_of_exp = $8, skills = $9, certifications = $10,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.resource_code)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.salary)
        .bind(input.hourly_rate)
        .bind(input.years_of_exp)
        .bind(&input.skills)
        .bind(&input.certifications)
        .fetch_optional(self.pool())
        .await
    }

    pub async fn activate_resource(&self, id: i32) -> Result<Option<Resource>> {
        sqlx::query_as::<_, Resource>(
            "UPDATE resources SET is_active = TRUE, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
    }

    /// Deactivates the resource and all of its active allocations together.
    pub async fn deactivate_resource(&self, id: i32) -> Result<Option<Resource>> {
        let mut tx = self.pool().begin().await?;

        let resource = sqlx::query_as::<_, Resource>(
            "UPDATE resources SET is_active = FALSE, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if resource.is_some() {
            let released = sqlx::query(
                r#"
                UPDATE resource_allocations
                SET is_active = FALSE, updated_at = now()
                WHERE resource_id = $1 AND is_active
                "#,
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
            tracing::info!(resource = id, allocations = released.rows_affected(), "resource deactivated");
        }

        tx.commit().await?;
        Ok(resource)
    }

    pub async fn list_allocations(&self, filter: AllocationFilter) -> Result<Vec<AllocationView>> {
        let mut qb = QueryBuilder::<Postgres>::new(ALLOCATION_VIEW);
        if let Some(id) = filter.resource_id {
            qb.push(" AND a.resource_id = ").push_bind(id);
        }
        if let Some(id) = filter.project_id {
            qb.push(" AND a.project_id = ").push_bind(id);
        }
        if filter.active_only {
            qb.push(" AND a.is_active");
        }
        qb.push(" ORDER BY a.start_date DESC");

        qb.build_query_as::<AllocationView>()
            .fetch_all(self.pool())
            .await
    }

    /// Book a resource onto a project.
    ///
    /// The resource row stays locked from the capacity check until the insert
    /// commits, so concurrent bookings for one resource are serialized.
    pub async fn allocate(&self, resource_id: i32, input: &AllocationInput) -> ApiResult<ResourceAllocation> {
        let mut tx = self.pool().begin().await?;

        let resource = sqlx::query_as::<_, Resource>("SELECT * FROM resources WHERE id = $1 FOR UPDATE")
            .bind(resource_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::not_found("Resource"))?;

        let project_exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM projects WHERE id = $1)")
            .bind(input.project_id)
            .fetch_one(&mut *tx)
            .await?;
        if !project_exists {
            return Err(ApiError::not_found("Project"));
        }

        if !resource.is_active {
            return Err(ApiError::Validation("Cannot allocate inactive resource".to_string()));
        }

        let existing = sqlx::query_as::<_, ResourceAllocation>(
            r#"
            SELECT * FROM resource_allocations
            WHERE resource_id = $1 AND is_active AND start_date <= $3 AND end_date >= $2
            "#,
        )
        .bind(resource_id)
        .bind(input.start_date)
        .bind(input.end_date)
        .fetch_all(&mut *tx)
        .await?;

        let total = check_capacity(&existing, input.start_date, input.end_date, input.allocation)
            .inspect_err(|e| tracing::warn!(resource = resource_id, "{}", e))?;

        let allocation = sqlx::query_as::<_, ResourceAllocation>(
            r#"
            INSERT INTO resource_allocations (resource_id, project_id, start_date, end_date, allocation, hourly_rate)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(resource_id)
        .bind(input.project_id)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.allocation)
        .bind(input.hourly_rate)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(resource = resource_id, project = input.project_id, total, "resource allocated");
        Ok(allocation)
    }
}
