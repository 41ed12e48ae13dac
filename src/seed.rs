//! Demo data for local development.

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::auth::hash_password;
use crate::db::Database;
use crate::models::{
    AllocationInput, ExpenseCategory, ExpenseInput, InvoiceInput, InvoiceStatus, MilestoneInput, MilestoneStatus,
    ProjectInput, ProjectStatus, ResourceInput, Role,
};

pub const DEMO_PASSWORD: &str = "password";
const DEMO_PROJECT_CODE: &str = "PROJ-2024-001";

fn date(y: i32, m: u32, d: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d).with_context(|| format!("invalid date {y}-{m}-{d}"))
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Creates the demo users, then a sample project with resources,
/// milestones, allocations, expenses and a paid invoice. Users are upserted;
/// the rest is skipped when the sample project already exists.
pub async fn run(db: &Database) -> Result<()> {
    let hash = hash_password(DEMO_PASSWORD)?;
    let admin = db
        .upsert_user("admin@demo.com", "Admin User", &hash, Role::Admin)
        .await?;
    let pm = db
        .upsert_user("pm@demo.com", "Project Manager", &hash, Role::ProjectManager)
        .await?;
    tracing::info!(admin = %admin.email, pm = %pm.email, "demo users ready");

    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM projects WHERE project_code = $1)")
        .bind(DEMO_PROJECT_CODE)
        .fetch_one(db.pool())
        .await?;
    if exists {
        tracing::info!("sample project already present, skipping");
        return Ok(());
    }

    let developer = db
        .create_resource(
            &ResourceInput {
                resource_code: "RES-001".into(),
                name: "John Developer".into(),
                email: "john@company.com".into(),
                phone: Some("+1-555-0101".into()),
                salary: None,
                hourly_rate: Some(75.0),
                years_of_exp: 5,
                skills: strings(&["JavaScript", "React", "Node.js", "TypeScript"]),
                certifications: strings(&["AWS Certified Developer"]),
            },
            admin.id,
        )
        .await?;
    let designer = db
        .create_resource(
            &ResourceInput {
                resource_code: "RES-002".into(),
                name: "Sarah Designer".into(),
                email: "sarah@company.com".into(),
                phone: Some("+1-555-0102".into()),
                salary: None,
                hourly_rate: Some(65.0),
                years_of_exp: 3,
                skills: strings(&["UI/UX Design", "Figma", "Adobe Creative Suite"]),
                certifications: strings(&["Google UX Design Certificate"]),
            },
            admin.id,
        )
        .await?;

    let project = db
        .create_project(
            &ProjectInput {
                name: "E-commerce Platform Development".into(),
                project_code: DEMO_PROJECT_CODE.into(),
                description: Some("Development of a modern e-commerce platform with advanced features".into()),
                po_number: "PO-2024-E001".into(),
                po_date: date(2024, 1, 15)?,
                po_amount: 150_000.0,
                client_name: "TechCorp Inc.".into(),
                start_date: date(2024, 2, 1)?,
                end_date: date(2024, 8, 31)?,
                budget: 105_000.0,
            },
            pm.id,
        )
        .await?;
    db.set_project_status(project.id, ProjectStatus::InProgress).await?;

    let milestones = [
        ("Requirements Analysis Complete", date(2024, 2, 28)?, 15_000.0),
        ("UI/UX Design Phase", date(2024, 4, 15)?, 25_000.0),
        ("Backend Development", date(2024, 6, 30)?, 40_000.0),
    ];
    let mut created = Vec::with_capacity(milestones.len());
    for (name, scheduled_date, amount) in milestones {
        let m = db
            .create_milestone(
                project.id,
                &MilestoneInput {
                    project_id: Some(project.id),
                    name: name.into(),
                    description: None,
                    scheduled_date,
                    is_billing_milestone: true,
                    billing_amount: Some(amount),
                    billing_percentage: None,
                },
            )
            .await?;
        created.push(m);
    }
    db.set_milestone_status(created[0].id, MilestoneStatus::Completed, Some(date(2024, 2, 25)?))
        .await?;
    db.set_milestone_status(created[1].id, MilestoneStatus::InProgress, None)
        .await?;

    db.allocate(
        developer.id,
        &AllocationInput {
            project_id: project.id,
            start_date: date(2024, 2, 1)?,
            end_date: date(2024, 8, 31)?,
            allocation: 80.0,
            hourly_rate: 75.0,
        },
    )
    .await?;
    db.allocate(
        designer.id,
        &AllocationInput {
            project_id: project.id,
            start_date: date(2024, 3, 1)?,
            end_date: date(2024, 5, 31)?,
            allocation: 60.0,
            hourly_rate: 65.0,
        },
    )
    .await?;

    for (description, amount, category, on) in [
        ("AWS Infrastructure Setup", 1500.0, ExpenseCategory::Infrastructure, date(2024, 2, 5)?),
        ("Design Software Licenses", 800.0, ExpenseCategory::License, date(2024, 2, 10)?),
    ] {
        db.create_expense(
            project.id,
            &ExpenseInput {
                project_id: Some(project.id),
                description: description.into(),
                amount,
                category,
                date: on,
            },
        )
        .await?;
    }

    let invoice = db
        .create_invoice(&InvoiceInput {
            project_id: project.id,
            milestone_id: Some(created[0].id),
            amount: 15_000.0,
            issue_date: date(2024, 3, 1)?,
            due_date: date(2024, 3, 31)?,
        })
        .await?;
    db.set_invoice_status(invoice.id, InvoiceStatus::Paid, Some(date(2024, 3, 20)?))
        .await?;

    tracing::info!(project = project.id, "sample project seeded");
    Ok(())
}
