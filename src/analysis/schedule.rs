//! Date-driven views: milestone slippage, timelines and overdue invoices.

use chrono::NaiveDate;
use serde::Serialize;

use super::average;
use crate::models::{Invoice, InvoiceView, Milestone, MilestoneStatus, MilestoneView, Project};

fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Completed milestones are judged by their actual date, open ones by
/// whether their scheduled date has passed.
pub fn is_delayed(m: &Milestone, today: NaiveDate) -> bool {
    match m.actual_date {
        Some(actual) => actual > m.scheduled_date,
        None => today > m.scheduled_date && m.status != MilestoneStatus::Completed,
    }
}

/// Milestones explicitly marked DELAYED, or still open past their date.
pub fn is_behind_schedule(m: &Milestone, today: NaiveDate) -> bool {
    match m.status {
        MilestoneStatus::Delayed => true,
        MilestoneStatus::Completed | MilestoneStatus::Cancelled => false,
        _ => m.scheduled_date < today,
    }
}

pub fn is_overdue(inv: &Invoice, today: NaiveDate) -> bool {
    inv.due_date < today && !inv.status.is_settled()
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlippageStatus {
    OnTrack,
    CompletedOnTime,
    CompletedLate,
    Delayed,
}

pub fn slippage(m: &Milestone, today: NaiveDate) -> (SlippageStatus, i64) {
    match (m.status, m.actual_date) {
        (MilestoneStatus::Completed, Some(actual)) => {
            let days = days_between(m.scheduled_date, actual);
            if days > 0 {
                (SlippageStatus::CompletedLate, days)
            } else {
                (SlippageStatus::CompletedOnTime, days)
            }
        }
        (status, _) if status != MilestoneStatus::Completed && today > m.scheduled_date => {
            (SlippageStatus::Delayed, days_between(m.scheduled_date, today))
        }
        _ => (SlippageStatus::OnTrack, 0),
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SlippageRow {
    pub id: i32,
    pub name: String,
    pub project_id: i32,
    pub project_name: String,
    pub project_code: String,
    pub scheduled_date: NaiveDate,
    pub actual_date: Option<NaiveDate>,
    pub status: MilestoneStatus,
    pub slippage_status: SlippageStatus,
    pub slippage_days: i64,
    pub is_billing_milestone: bool,
    pub billing_amount: Option<f64>,
}

/// Response of `GET /reports/milestone-slippage`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SlippageReport {
    pub total_milestones: usize,
    pub slipped_milestones: usize,
    pub average_slippage: f64,
    /// Every milestone, most slipped first.
    pub milestones: Vec<SlippageRow>,
}

pub fn milestone_slippage(milestones: &[MilestoneView], today: NaiveDate) -> SlippageReport {
    let mut rows: Vec<SlippageRow> = milestones
        .iter()
        .map(|v| {
            let m = &v.milestone;
            let (slippage_status, slippage_days) = slippage(m, today);
            SlippageRow {
                id: m.id,
                name: m.name.clone(),
                project_id: m.project_id,
                project_name: v.project_name.clone(),
                project_code: v.project_code.clone(),
                scheduled_date: m.scheduled_date,
                actual_date: m.actual_date,
                status: m.status,
                slippage_status,
                slippage_days,
                is_billing_milestone: m.is_billing_milestone,
                billing_amount: m.billing_amount,
            }
        })
        .collect();
    rows.sort_by(|a, b| b.slippage_days.cmp(&a.slippage_days));

    let slipped: Vec<i64> = rows
        .iter()
        .map(|r| r.slippage_days)
        .filter(|&d| d > 0)
        .collect();

    SlippageReport {
        total_milestones: rows.len(),
        slipped_milestones: slipped.len(),
        average_slippage: average(slipped.iter().sum::<i64>() as f64, slipped.len()),
        milestones: rows,
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TimelineProject {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub id: i32,
    pub name: String,
    pub scheduled_date: NaiveDate,
    pub actual_date: Option<NaiveDate>,
    pub status: MilestoneStatus,
    pub is_billing_milestone: bool,
    pub billing_amount: Option<f64>,
    pub is_delayed: bool,
}

/// Response of `GET /milestones/project/:projectId/timeline`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub project: TimelineProject,
    pub milestones: Vec<TimelineEntry>,
}

pub fn milestone_timeline(project: &Project, milestones: &[Milestone], today: NaiveDate) -> Timeline {
    let mut entries: Vec<TimelineEntry> = milestones
        .iter()
        .filter(|m| m.project_id == project.id)
        .map(|m| TimelineEntry {
            id: m.id,
            name: m.name.clone(),
            scheduled_date: m.scheduled_date,
            actual_date: m.actual_date,
            status: m.status,
            is_billing_milestone: m.is_billing_milestone,
            billing_amount: m.billing_amount,
            is_delayed: is_delayed(m, today),
        })
        .collect();
    entries.sort_by_key(|e| e.scheduled_date);

    Timeline {
        project: TimelineProject {
            name: project.name.clone(),
            start_date: project.start_date,
            end_date: project.end_date,
        },
        milestones: entries,
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DelayedMilestone {
    #[serde(flatten)]
    pub milestone: MilestoneView,
    pub days_delayed: i64,
}

/// Milestones behind schedule, oldest scheduled date first. A milestone
/// marked DELAYED whose date is still ahead reports zero days.
pub fn delayed_milestones(milestones: Vec<MilestoneView>, today: NaiveDate) -> Vec<DelayedMilestone> {
    let mut delayed: Vec<DelayedMilestone> = milestones
        .into_iter()
        .filter(|v| is_behind_schedule(&v.milestone, today))
        .map(|v| {
            let days_delayed = days_between(v.milestone.scheduled_date, today).max(0);
            DelayedMilestone { milestone: v, days_delayed }
        })
        .collect();
    delayed.sort_by_key(|d| d.milestone.milestone.scheduled_date);
    delayed
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OverdueInvoice {
    #[serde(flatten)]
    pub invoice: InvoiceView,
    pub days_overdue: i64,
}

/// Unsettled invoices past their due date, oldest due date first.
pub fn overdue_invoices(invoices: Vec<InvoiceView>, today: NaiveDate) -> Vec<OverdueInvoice> {
    let mut overdue: Vec<OverdueInvoice> = invoices
        .into_iter()
        .filter(|v| is_overdue(&v.invoice, today))
        .map(|v| {
            let days_overdue = days_between(v.invoice.due_date, today);
            OverdueInvoice { invoice: v, days_overdue }
        })
        .collect();
    overdue.sort_by_key(|o| o.invoice.invoice.due_date);
    overdue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::*;
    use crate::models::InvoiceStatus;

    fn mview(m: Milestone) -> MilestoneView {
        MilestoneView {
            milestone: m,
            project_name: "Project 1".into(),
            project_code: "PROJ-001".into(),
            invoice_count: 0,
        }
    }

    fn iview(i: Invoice) -> InvoiceView {
        InvoiceView {
            invoice: i,
            project_name: "Project 1".into(),
            project_code: "PROJ-001".into(),
            client_name: "Acme".into(),
            milestone_name: None,
        }
    }

    #[test]
    fn slippage_classification() {
        let today = date("2024-06-15");

        let late = milestone(1, 1, "2024-03-01", Some("2024-03-11"), MilestoneStatus::Completed);
        assert_eq!(slippage(&late, today), (SlippageStatus::CompletedLate, 10));

        let early = milestone(2, 1, "2024-03-01", Some("2024-02-25"), MilestoneStatus::Completed);
        assert_eq!(slippage(&early, today), (SlippageStatus::CompletedOnTime, -5));

        let overdue = milestone(3, 1, "2024-06-01", None, MilestoneStatus::InProgress);
        assert_eq!(slippage(&overdue, today), (SlippageStatus::Delayed, 14));

        let future = milestone(4, 1, "2024-07-01", None, MilestoneStatus::Planned);
        assert_eq!(slippage(&future, today), (SlippageStatus::OnTrack, 0));

        // Completed without an actual date cannot be measured.
        let unknown = milestone(5, 1, "2024-01-01", None, MilestoneStatus::Completed);
        assert_eq!(slippage(&unknown, today), (SlippageStatus::OnTrack, 0));
    }

    #[test]
    fn slippage_report_averages_only_slipped_milestones() {
        let today = date("2024-06-15");
        let milestones = vec![
            mview(milestone(1, 1, "2024-03-01", Some("2024-03-11"), MilestoneStatus::Completed)),
            mview(milestone(2, 1, "2024-06-01", None, MilestoneStatus::InProgress)),
            mview(milestone(3, 1, "2024-07-01", None, MilestoneStatus::Planned)),
        ];

        let report = milestone_slippage(&milestones, today);

        assert_eq!(report.total_milestones, 3);
        assert_eq!(report.slipped_milestones, 2);
        assert_eq!(report.average_slippage, 12.0);
        assert_eq!(report.milestones[0].id, 2);
        assert_eq!(report.milestones[2].slippage_status, SlippageStatus::OnTrack);
    }

    #[test]
    fn timeline_flags_delays() {
        let today = date("2024-06-15");
        let p = project(1, 1000.0);
        let milestones = vec![
            milestone(2, 1, "2024-08-01", None, MilestoneStatus::Planned),
            milestone(1, 1, "2024-05-01", None, MilestoneStatus::InProgress),
            milestone(3, 1, "2024-04-01", Some("2024-04-01"), MilestoneStatus::Completed),
            milestone(4, 2, "2024-01-01", None, MilestoneStatus::Planned),
        ];

        let t = milestone_timeline(&p, &milestones, today);

        let flags: Vec<(i32, bool)> = t.milestones.iter().map(|e| (e.id, e.is_delayed)).collect();
        assert_eq!(flags, vec![(3, false), (1, true), (2, false)]);
    }

    #[test]
    fn delayed_milestones_include_marked_and_overdue() {
        let today = date("2024-06-15");
        let milestones = vec![
            mview(milestone(1, 1, "2024-06-01", None, MilestoneStatus::Planned)),
            mview(milestone(2, 1, "2024-09-01", None, MilestoneStatus::Delayed)),
            mview(milestone(3, 1, "2024-01-01", None, MilestoneStatus::Cancelled)),
            mview(milestone(4, 1, "2024-01-01", Some("2024-02-01"), MilestoneStatus::Completed)),
        ];

        let delayed = delayed_milestones(milestones, today);

        let ids: Vec<(i32, i64)> = delayed
            .iter()
            .map(|d| (d.milestone.milestone.id, d.days_delayed))
            .collect();
        assert_eq!(ids, vec![(1, 14), (2, 0)]);
    }

    #[test]
    fn overdue_invoices_skip_settled_ones() {
        let today = date("2024-06-15");
        let invoices = vec![
            iview(invoice(1, 1, 100.0, InvoiceStatus::Sent, "2024-06-10")),
            iview(invoice(2, 1, 100.0, InvoiceStatus::Paid, "2024-01-10")),
            iview(invoice(3, 1, 100.0, InvoiceStatus::Pending, "2024-05-15")),
            iview(invoice(4, 1, 100.0, InvoiceStatus::Cancelled, "2024-01-10")),
            iview(invoice(5, 1, 100.0, InvoiceStatus::Pending, "2024-06-15")),
        ];

        let overdue = overdue_invoices(invoices, today);

        let rows: Vec<(i32, i64)> = overdue
            .iter()
            .map(|o| (o.invoice.invoice.id, o.days_overdue))
            .collect();
        assert_eq!(rows, vec![(3, 31), (1, 5)]);
    }
}
