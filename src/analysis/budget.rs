//! Budget, spend and invoicing aggregates.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::allocation::resource_cost;
use super::{average, percent, within, DateWindow, ProjectRecords};
use crate::models::{ExpenseCategory, InvoiceStatus, MilestoneStatus, ProjectStatus};

/// Spend ratio above which a project is flagged as close to its budget.
pub const BUDGET_WARNING_RATIO: f64 = 0.8;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProjectHeader {
    pub id: i32,
    pub name: String,
    pub status: ProjectStatus,
    pub budget: f64,
    pub po_amount: f64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DashboardFinancials {
    pub budget: f64,
    pub total_expenses: f64,
    pub total_invoiced: f64,
    pub budget_utilization: f64,
    pub remaining_budget: f64,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneCounts {
    pub total: usize,
    pub completed: usize,
    pub delayed: usize,
    pub completion_rate: f64,
}

impl MilestoneCounts {
    pub fn of(records: &ProjectRecords<'_>) -> Self {
        let total = records.milestones.len();
        let completed = records
            .milestones
            .iter()
            .filter(|m| m.status == MilestoneStatus::Completed)
            .count();
        let delayed = records
            .milestones
            .iter()
            .filter(|m| m.status == MilestoneStatus::Delayed)
            .count();

        Self {
            total,
            completed,
            delayed,
            completion_rate: percent(completed as f64, total as f64),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResources {
    pub total: usize,
    pub total_allocation: f64,
    pub average_allocation: f64,
}

/// Response of `GET /projects/:id/dashboard`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDashboard {
    pub project: ProjectHeader,
    pub financial: DashboardFinancials,
    pub milestones: MilestoneCounts,
    pub resources: DashboardResources,
}

pub fn project_dashboard(records: &ProjectRecords<'_>) -> ProjectDashboard {
    let p = records.project;
    let total_expenses = records.total_expenses();
    let total_allocation: f64 = records.allocations.iter().map(|a| a.allocation).sum();

    ProjectDashboard {
        project: ProjectHeader {
            id: p.id,
            name: p.name.clone(),
            status: p.status,
            budget: p.budget,
            po_amount: p.po_amount,
        },
        financial: DashboardFinancials {
            budget: p.budget,
            total_expenses,
            total_invoiced: records.total_invoiced(),
            budget_utilization: percent(total_expenses, p.budget),
            remaining_budget: p.budget - total_expenses,
        },
        milestones: MilestoneCounts::of(records),
        resources: DashboardResources {
            total: records.allocations.len(),
            total_allocation,
            average_allocation: average(total_allocation, records.allocations.len()),
        },
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseBreakdown {
    pub total: f64,
    pub by_category: BTreeMap<ExpenseCategory, f64>,
    pub resource_costs: f64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BudgetPosition {
    pub allocated: f64,
    pub spent: f64,
    pub remaining: f64,
    pub utilization: f64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct InvoicingTotals {
    pub total_invoiced: f64,
    pub total_paid: f64,
    pub outstanding: f64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAlerts {
    pub budget_overrun: bool,
    pub budget_warning: bool,
}

/// Response of `GET /financial/budget/:projectId`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAnalysis {
    pub project: ProjectHeader,
    pub expenses: ExpenseBreakdown,
    pub budget: BudgetPosition,
    pub invoicing: InvoicingTotals,
    pub alerts: BudgetAlerts,
}

fn by_category<'a, I>(expenses: I) -> BTreeMap<ExpenseCategory, f64>
where
    I: IntoIterator<Item = &'a crate::models::Expense>,
{
    let mut totals = BTreeMap::new();
    for e in expenses {
        *totals.entry(e.category).or_insert(0.0) += e.amount;
    }
    totals
}

/// Spend is recorded expenses plus the cost of the project's active
/// allocations.
pub fn budget_analysis(records: &ProjectRecords<'_>) -> BudgetAnalysis {
    let p = records.project;
    let total_expenses = records.total_expenses();
    let resource_costs: f64 = records.active_allocations().map(resource_cost).sum();
    let spent = total_expenses + resource_costs;
    let total_invoiced = records.total_invoiced();
    let total_paid = records.total_paid();

    BudgetAnalysis {
        project: ProjectHeader {
            id: p.id,
            name: p.name.clone(),
            status: p.status,
            budget: p.budget,
            po_amount: p.po_amount,
        },
        expenses: ExpenseBreakdown {
            total: total_expenses,
            by_category: by_category(records.expenses.iter().copied()),
            resource_costs,
        },
        budget: BudgetPosition {
            allocated: p.budget,
            spent,
            remaining: p.budget - spent,
            utilization: percent(spent, p.budget),
        },
        invoicing: InvoicingTotals {
            total_invoiced,
            total_paid,
            outstanding: total_invoiced - total_paid,
        },
        alerts: BudgetAlerts {
            budget_overrun: spent > p.budget,
            budget_warning: p.budget > 0.0 && spent / p.budget > BUDGET_WARNING_RATIO,
        },
    }
}

/// Response of `GET /financial/summary`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    pub total_projects: usize,
    pub total_budget: f64,
    #[serde(rename = "totalPO")]
    pub total_po: f64,
    pub total_expenses: f64,
    pub total_invoiced: f64,
    pub total_paid: f64,
    pub over_budget_projects: usize,
}

/// Totals across every project that is not archived.
pub fn financial_summary(projects: &[ProjectRecords<'_>]) -> FinancialSummary {
    let live: Vec<&ProjectRecords<'_>> = projects
        .iter()
        .filter(|r| r.project.status != ProjectStatus::Archived)
        .collect();

    FinancialSummary {
        total_projects: live.len(),
        total_budget: live.iter().map(|r| r.project.budget).sum(),
        total_po: live.iter().map(|r| r.project.po_amount).sum(),
        total_expenses: live.iter().map(|r| r.total_expenses()).sum(),
        total_invoiced: live.iter().map(|r| r.total_invoiced()).sum(),
        total_paid: live.iter().map(|r| r.total_paid()).sum(),
        over_budget_projects: live.iter().filter(|r| r.is_over_budget()).count(),
    }
}

/// One row of `GET /reports/project-status`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatusRow {
    pub id: i32,
    pub name: String,
    pub project_code: String,
    pub status: ProjectStatus,
    pub client: String,
    pub budget: f64,
    pub total_expenses: f64,
    pub budget_utilization: f64,
    pub milestones: MilestoneCounts,
    pub resources: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

pub fn project_status_report(projects: &[ProjectRecords<'_>]) -> Vec<ProjectStatusRow> {
    projects
        .iter()
        .map(|r| {
            let p = r.project;
            let total_expenses = r.total_expenses();
            ProjectStatusRow {
                id: p.id,
                name: p.name.clone(),
                project_code: p.project_code.clone(),
                status: p.status,
                client: p.client_name.clone(),
                budget: p.budget,
                total_expenses,
                budget_utilization: percent(total_expenses, p.budget),
                milestones: MilestoneCounts::of(r),
                resources: r.active_allocations().count(),
                start_date: p.start_date,
                end_date: p.end_date,
            }
        })
        .collect()
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioOverview {
    pub total_projects: usize,
    pub active_projects: usize,
    pub completed_projects: usize,
    pub total_budget: f64,
    #[serde(rename = "totalPOValue")]
    pub total_po_value: f64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseTotals {
    pub total: f64,
    pub by_category: BTreeMap<ExpenseCategory, f64>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct InvoicingSummary {
    pub total_invoiced: f64,
    pub total_paid: f64,
    pub pending_invoices: usize,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProjectHealth {
    pub on_budget: usize,
    pub over_budget: usize,
}

/// Response of `GET /reports/financial-summary`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummaryReport {
    pub overview: PortfolioOverview,
    pub expenses: ExpenseTotals,
    pub invoicing: InvoicingSummary,
    pub project_health: ProjectHealth,
}

/// Portfolio report over all projects. When `window` is given, only expenses
/// dated inside it and invoices issued inside it are counted; budget health
/// is judged on the windowed expenses.
pub fn financial_summary_report(
    projects: &[ProjectRecords<'_>],
    window: Option<DateWindow>,
) -> FinancialSummaryReport {
    let mut total_expenses = 0.0;
    let mut total_invoiced = 0.0;
    let mut total_paid = 0.0;
    let mut pending_invoices = 0;
    let mut over_budget = 0;
    let mut windowed_expenses = Vec::new();

    for r in projects {
        let expenses: Vec<_> = r
            .expenses
            .iter()
            .copied()
            .filter(|e| within(window, e.date))
            .collect();
        let project_spend: f64 = expenses.iter().map(|e| e.amount).sum();
        if project_spend > r.project.budget {
            over_budget += 1;
        }
        total_expenses += project_spend;
        windowed_expenses.extend(expenses);

        for inv in r.invoices.iter().filter(|i| within(window, i.issue_date)) {
            total_invoiced += inv.amount;
            match inv.status {
                InvoiceStatus::Paid => total_paid += inv.amount,
                InvoiceStatus::Pending => pending_invoices += 1,
                _ => {}
            }
        }
    }

    FinancialSummaryReport {
        overview: PortfolioOverview {
            total_projects: projects.len(),
            active_projects: projects
                .iter()
                .filter(|r| r.project.status == ProjectStatus::InProgress)
                .count(),
            completed_projects: projects
                .iter()
                .filter(|r| r.project.status == ProjectStatus::Completed)
                .count(),
            total_budget: projects.iter().map(|r| r.project.budget).sum(),
            total_po_value: projects.iter().map(|r| r.project.po_amount).sum(),
        },
        expenses: ExpenseTotals {
            total: total_expenses,
            by_category: by_category(windowed_expenses),
        },
        invoicing: InvoicingSummary {
            total_invoiced,
            total_paid,
            pending_invoices,
        },
        project_health: ProjectHealth {
            on_budget: projects.len() - over_budget,
            over_budget,
        },
    }
}
