//! Allocation overlap, capacity and cost arithmetic.

use chrono::NaiveDate;
use serde::Serialize;

use super::{average, DateWindow};
use crate::error::ApiError;
use crate::models::{AllocationView, Resource, ResourceAllocation};

/// A resource can never be booked past this percentage at any point in time.
pub const MAX_ALLOCATION: f64 = 100.0;

/// Working hours assumed per allocated day when costing allocations.
pub const HOURS_PER_DAY: f64 = 8.0;

/// Absorbs float noise such as 33.3 + 33.3 + 33.4.
const CAPACITY_EPSILON: f64 = 1e-9;

/// Whether a summed percentage is past what a resource can carry.
pub fn over_capacity(total: f64) -> bool {
    total > MAX_ALLOCATION + CAPACITY_EPSILON
}

/// Inclusive overlap of `[a_start, a_end]` and `[b_start, b_end]`.
pub fn ranges_overlap(a_start: NaiveDate, a_end: NaiveDate, b_start: NaiveDate, b_end: NaiveDate) -> bool {
    a_start <= b_end && a_end >= b_start
}

/// Active allocations that share at least one day with `[start, end]`.
pub fn overlapping<'a>(
    allocations: &'a [ResourceAllocation],
    start: NaiveDate,
    end: NaiveDate,
) -> impl Iterator<Item = &'a ResourceAllocation> {
    allocations
        .iter()
        .filter(move |a| a.is_active && ranges_overlap(a.start_date, a.end_date, start, end))
}

/// Sum of the percentages already committed during `[start, end]`.
pub fn committed_percentage(allocations: &[ResourceAllocation], start: NaiveDate, end: NaiveDate) -> f64 {
    overlapping(allocations, start, end).map(|a| a.allocation).sum()
}

/// Checks that booking `requested` percent during `[start, end]` keeps the
/// resource at or below 100%, and returns the resulting total.
///
/// Every active allocation overlapping the window counts in full, even when
/// two of them do not overlap each other.
pub fn check_capacity(
    existing: &[ResourceAllocation],
    start: NaiveDate,
    end: NaiveDate,
    requested: f64,
) -> Result<f64, ApiError> {
    let total = committed_percentage(existing, start, end) + requested;

    if over_capacity(total) {
        return Err(ApiError::Overallocated {
            total: (total * 100.0).round() / 100.0,
        });
    }

    Ok(total)
}

/// Cost of an allocation over its whole date range.
pub fn resource_cost(allocation: &ResourceAllocation) -> f64 {
    let days = (allocation.end_date - allocation.start_date).num_days().max(0) as f64;
    let hours = days * HOURS_PER_DAY * (allocation.allocation / 100.0);
    hours * allocation.hourly_rate
}

/// Sum of all active allocation percentages, regardless of dates.
pub fn current_utilization<'a, I>(allocations: I) -> f64
where
    I: IntoIterator<Item = &'a ResourceAllocation>,
{
    allocations
        .into_iter()
        .filter(|a| a.is_active)
        .map(|a| a.allocation)
        .sum()
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    pub id: i32,
    pub name: String,
    pub resource_code: String,
}

impl From<&Resource> for ResourceRef {
    fn from(r: &Resource) -> Self {
        Self {
            id: r.id,
            name: r.name.clone(),
            resource_code: r.resource_code.clone(),
        }
    }
}

/// Response of `GET /resources/:id/utilization`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationReport {
    pub resource: ResourceRef,
    pub total_allocations: usize,
    pub total_utilization: f64,
    pub allocations: Vec<AllocationView>,
}

fn in_window(view: &AllocationView, window: Option<DateWindow>) -> bool {
    let a = &view.allocation;
    a.is_active && window.is_none_or(|w| w.overlaps(a.start_date, a.end_date))
}

pub fn utilization_report(
    resource: &Resource,
    allocations: Vec<AllocationView>,
    window: Option<DateWindow>,
) -> UtilizationReport {
    let allocations: Vec<AllocationView> = allocations
        .into_iter()
        .filter(|v| v.allocation.resource_id == resource.id && in_window(v, window))
        .collect();

    UtilizationReport {
        resource: resource.into(),
        total_allocations: allocations.len(),
        total_utilization: current_utilization(allocations.iter().map(|v| &v.allocation)),
        allocations,
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationTotals {
    pub total: f64,
    pub average: f64,
    pub is_overallocated: bool,
}

/// One row of `GET /reports/resource-utilization`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUtilization {
    pub id: i32,
    pub name: String,
    pub resource_code: String,
    pub email: String,
    pub skills: Vec<String>,
    pub utilization: UtilizationTotals,
    pub active_projects: usize,
    pub allocations: Vec<AllocationView>,
}

/// Utilization of every active resource, limited to allocations overlapping
/// `window` when one is given.
pub fn resource_utilization(
    resources: &[Resource],
    allocations: &[AllocationView],
    window: Option<DateWindow>,
) -> Vec<ResourceUtilization> {
    resources
        .iter()
        .filter(|r| r.is_active)
        .map(|r| {
            let mine: Vec<AllocationView> = allocations
                .iter()
                .filter(|v| v.allocation.resource_id == r.id && in_window(v, window))
                .cloned()
                .collect();
            let total: f64 = mine.iter().map(|v| v.allocation.allocation).sum();

            ResourceUtilization {
                id: r.id,
                name: r.name.clone(),
                resource_code: r.resource_code.clone(),
                email: r.email.clone(),
                skills: r.skills.clone(),
                utilization: UtilizationTotals {
                    total,
                    average: average(total, mine.len()),
                    is_overallocated: over_capacity(total),
                },
                active_projects: mine.len(),
                allocations: mine,
            }
        })
        .collect()
}
