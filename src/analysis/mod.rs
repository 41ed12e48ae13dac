//! Pure computations behind the allocation rule and every report.
//!
//! Handlers fetch records in bulk and hand slices to these functions, so the
//! arithmetic here never touches the database.

pub mod allocation;
pub mod budget;
pub mod dashboard;
pub mod schedule;

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::models::{Expense, Invoice, InvoiceStatus, Milestone, Project, ResourceAllocation};

/// `part` as a percentage of `whole`; zero when `whole` is not positive.
pub fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

/// Mean of `total` over `count` items; zero for an empty set.
pub fn average(total: f64, count: usize) -> f64 {
    if count > 0 { total / count as f64 } else { 0.0 }
}

/// Inclusive date range used by report filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// A window is only applied when both bounds are given.
    pub fn from_bounds(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<Self> {
        match (start, end) {
            (Some(start), Some(end)) => Some(Self { start, end }),
            _ => None,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        allocation::ranges_overlap(self.start, self.end, start, end)
    }
}

/// `true` when `window` is absent or contains `date`.
pub fn within(window: Option<DateWindow>, date: NaiveDate) -> bool {
    window.is_none_or(|w| w.contains(date))
}

/// Owned rows for a set of projects, as loaded in bulk by the handlers.
#[derive(Debug, Default)]
pub struct Portfolio {
    pub projects: Vec<Project>,
    pub milestones: Vec<Milestone>,
    pub allocations: Vec<ResourceAllocation>,
    pub expenses: Vec<Expense>,
    pub invoices: Vec<Invoice>,
}

impl Portfolio {
    pub fn records(&self) -> Vec<ProjectRecords<'_>> {
        ProjectRecords::group(
            &self.projects,
            &self.milestones,
            &self.allocations,
            &self.expenses,
            &self.invoices,
        )
    }
}

/// A project together with the records that reference it.
#[derive(Debug)]
pub struct ProjectRecords<'a> {
    pub project: &'a Project,
    pub milestones: Vec<&'a Milestone>,
    pub allocations: Vec<&'a ResourceAllocation>,
    pub expenses: Vec<&'a Expense>,
    pub invoices: Vec<&'a Invoice>,
}

impl<'a> ProjectRecords<'a> {
    pub fn new(project: &'a Project) -> Self {
        Self {
            project,
            milestones: Vec::new(),
            allocations: Vec::new(),
            expenses: Vec::new(),
            invoices: Vec::new(),
        }
    }

    /// Attach each record to its project. Records whose project is not in
    /// `projects` are ignored. Output order follows `projects`.
    pub fn group(
        projects: &'a [Project],
        milestones: &'a [Milestone],
        allocations: &'a [ResourceAllocation],
        expenses: &'a [Expense],
        invoices: &'a [Invoice],
    ) -> Vec<Self> {
        let mut grouped: Vec<Self> = projects.iter().map(Self::new).collect();
        let index: HashMap<i32, usize> = projects
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();

        for m in milestones {
            if let Some(&i) = index.get(&m.project_id) {
                grouped[i].milestones.push(m);
            }
        }
        for a in allocations {
            if let Some(&i) = index.get(&a.project_id) {
                grouped[i].allocations.push(a);
            }
        }
        for e in expenses {
            if let Some(&i) = index.get(&e.project_id) {
                grouped[i].expenses.push(e);
            }
        }
        for inv in invoices {
            if let Some(&i) = index.get(&inv.project_id) {
                grouped[i].invoices.push(inv);
            }
        }

        grouped
    }

    pub fn total_expenses(&self) -> f64 {
        self.expenses.iter().map(|e| e.amount).sum()
    }

    pub fn total_invoiced(&self) -> f64 {
        self.invoices.iter().map(|i| i.amount).sum()
    }

    pub fn total_paid(&self) -> f64 {
        self.invoices
            .iter()
            .filter(|i| i.status == InvoiceStatus::Paid)
            .map(|i| i.amount)
            .sum()
    }

    /// Recorded expenses exceed the budget. Allocation costs are not counted.
    pub fn is_over_budget(&self) -> bool {
        self.total_expenses() > self.project.budget
    }

    pub fn active_allocations(&self) -> impl Iterator<Item = &'a ResourceAllocation> + '_ {
        self.allocations.iter().copied().filter(|a| a.is_active)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Record builders shared by the analysis tests.

    use chrono::{NaiveDate, TimeZone, Utc};

    use crate::models::*;

    pub fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn ts() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    pub fn project(id: i32, budget: f64) -> Project {
        Project {
            id,
            project_code: format!("PROJ-{:03}", id),
            name: format!("Project {}", id),
            description: None,
            po_number: format!("PO-{}", id),
            po_date: date("2024-01-01"),
            po_amount: budget * 1.2,
            client_name: "Acme".to_string(),
            start_date: date("2024-01-01"),
            end_date: date("2024-12-31"),
            budget,
            status: ProjectStatus::InProgress,
            created_by: 1,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    pub fn allocation(id: i32, project_id: i32, start: &str, end: &str, pct: f64) -> ResourceAllocation {
        ResourceAllocation {
            id,
            resource_id: 1,
            project_id,
            start_date: date(start),
            end_date: date(end),
            allocation: pct,
            hourly_rate: 50.0,
            is_active: true,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    pub fn expense(id: i32, project_id: i32, amount: f64, category: ExpenseCategory, on: &str) -> Expense {
        Expense {
            id,
            project_id,
            description: format!("expense {}", id),
            amount,
            category,
            date: date(on),
            created_at: ts(),
            updated_at: ts(),
        }
    }

    pub fn invoice(id: i32, project_id: i32, amount: f64, status: InvoiceStatus, due: &str) -> Invoice {
        Invoice {
            id,
            project_id,
            milestone_id: None,
            invoice_number: format_invoice_number(id as i64),
            amount,
            issue_date: date("2024-01-01"),
            due_date: date(due),
            status,
            paid_date: None,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    pub fn milestone(
        id: i32,
        project_id: i32,
        scheduled: &str,
        actual: Option<&str>,
        status: MilestoneStatus,
    ) -> Milestone {
        Milestone {
            id,
            project_id,
            name: format!("Milestone {}", id),
            description: None,
            scheduled_date: date(scheduled),
            actual_date: actual.map(date),
            is_billing_milestone: false,
            billing_amount: None,
            billing_percentage: None,
            status,
            created_at: ts(),
            updated_at: ts(),
        }
    }
}
