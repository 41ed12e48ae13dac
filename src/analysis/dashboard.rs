//! Portfolio-wide counters for `GET /reports/dashboard`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::ProjectRecords;
use super::schedule::is_overdue;
use crate::models::{Milestone, MilestoneStatus, ProjectStatus, Resource};

const RECENT_LIMIT: usize = 5;

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCounts {
    pub total: usize,
    pub active: usize,
    pub over_budget: usize,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct ResourceCounts {
    pub total: usize,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct MilestoneTotals {
    pub total: usize,
    pub delayed: usize,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMoney {
    pub total_budget: f64,
    pub total_expenses: f64,
    pub total_invoiced: f64,
    pub overdue_invoices: usize,
}

#[derive(Serialize, Debug)]
pub struct Metrics {
    pub projects: ProjectCounts,
    pub resources: ResourceCounts,
    pub milestones: MilestoneTotals,
    pub financial: DashboardMoney,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RecentProject {
    pub id: i32,
    pub name: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RecentMilestone {
    #[serde(flatten)]
    pub milestone: Milestone,
    pub project_name: String,
}

#[derive(Serialize, Debug)]
pub struct RecentActivity {
    pub projects: Vec<RecentProject>,
    pub milestones: Vec<RecentMilestone>,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAlerts {
    pub delayed_milestones: bool,
    pub overdue_invoices: bool,
    pub over_budget_projects: bool,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub metrics: Metrics,
    pub recent_activity: RecentActivity,
    pub alerts: DashboardAlerts,
}

/// Delayed here means marked DELAYED, or not completed and past its date.
/// Cancelled milestones still count once their date has passed.
fn counts_as_delayed(m: &Milestone, today: NaiveDate) -> bool {
    m.status == MilestoneStatus::Delayed
        || (m.status != MilestoneStatus::Completed && m.scheduled_date < today)
}

pub fn dashboard(records: &[ProjectRecords], resources: &[Resource], today: NaiveDate) -> Dashboard {
    let milestones = || records.iter().flat_map(|r| r.milestones.iter().copied());
    let invoices = || records.iter().flat_map(|r| r.invoices.iter().copied());

    let projects = ProjectCounts {
        total: records.len(),
        active: records
            .iter()
            .filter(|r| r.project.status == ProjectStatus::InProgress)
            .count(),
        over_budget: records.iter().filter(|r| r.is_over_budget()).count(),
    };
    let milestone_totals = MilestoneTotals {
        total: milestones().count(),
        delayed: milestones().filter(|m| counts_as_delayed(m, today)).count(),
    };
    let financial = DashboardMoney {
        total_budget: records.iter().map(|r| r.project.budget).sum(),
        total_expenses: records.iter().map(|r| r.total_expenses()).sum(),
        total_invoiced: records.iter().map(|r| r.total_invoiced()).sum(),
        overdue_invoices: invoices().filter(|i| is_overdue(i, today)).count(),
    };

    let mut recent_projects: Vec<RecentProject> = records
        .iter()
        .map(|r| RecentProject {
            id: r.project.id,
            name: r.project.name.clone(),
            status: r.project.status,
            created_at: r.project.created_at,
        })
        .collect();
    recent_projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent_projects.truncate(RECENT_LIMIT);

    let mut recent_milestones: Vec<RecentMilestone> = records
        .iter()
        .flat_map(|r| {
            r.milestones.iter().map(|m| RecentMilestone {
                milestone: (*m).clone(),
                project_name: r.project.name.clone(),
            })
        })
        .collect();
    recent_milestones.sort_by(|a, b| b.milestone.updated_at.cmp(&a.milestone.updated_at));
    recent_milestones.truncate(RECENT_LIMIT);

    let alerts = DashboardAlerts {
        delayed_milestones: milestone_totals.delayed > 0,
        overdue_invoices: financial.overdue_invoices > 0,
        over_budget_projects: projects.over_budget > 0,
    };

    Dashboard {
        metrics: Metrics {
            projects,
            resources: ResourceCounts {
                total: resources.iter().filter(|r| r.is_active).count(),
            },
            milestones: milestone_totals,
            financial,
        },
        recent_activity: RecentActivity {
            projects: recent_projects,
            milestones: recent_milestones,
        },
        alerts,
    }
}
