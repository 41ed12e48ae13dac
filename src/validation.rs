//! Request payload rules. Each `validate` reports the first broken rule.

use crate::error::ApiError;
use crate::models::{
    AllocationInput, ExpenseInput, InvoiceInput, LoginInput, MilestoneInput, ProjectInput,
    RegisterInput, ResourceInput,
};

pub const MIN_PASSWORD_LEN: usize = 6;

pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

fn invalid(msg: impl Into<String>) -> ApiError {
    ApiError::Validation(msg.into())
}

/// Blank strings count as empty.
fn length(field: &str, value: &str, min: usize, max: usize) -> Result<(), ApiError> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(invalid(format!(
            "{} must be between {} and {} characters",
            field, min, max
        )));
    }
    Ok(())
}

fn max_length(field: &str, value: Option<&str>, max: usize) -> Result<(), ApiError> {
    match value {
        Some(v) if v.chars().count() > max => Err(invalid(format!(
            "{} must be at most {} characters",
            field, max
        ))),
        _ => Ok(()),
    }
}

fn positive(field: &str, value: f64) -> Result<(), ApiError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(format!("{} must be positive", field)));
    }
    Ok(())
}

fn positive_if_set(field: &str, value: Option<f64>) -> Result<(), ApiError> {
    value.map_or(Ok(()), |v| positive(field, v))
}

/// `local@domain.tld` with no whitespace; deliverability is not checked.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty() && !host.starts_with('.'),
        None => false,
    }
}

fn email(value: &str) -> Result<(), ApiError> {
    if !is_valid_email(value) {
        return Err(invalid("Invalid email address"));
    }
    Ok(())
}

impl Validate for ProjectInput {
    fn validate(&self) -> Result<(), ApiError> {
        length("name", &self.name, 1, 200)?;
        length("projectCode", &self.project_code, 1, 50)?;
        max_length("description", self.description.as_deref(), 1000)?;
        length("poNumber", &self.po_number, 1, 100)?;
        positive("poAmount", self.po_amount)?;
        length("clientName", &self.client_name, 1, 200)?;
        positive("budget", self.budget)?;
        if self.end_date <= self.start_date {
            return Err(invalid("End date must be after start date"));
        }
        Ok(())
    }
}

impl Validate for ResourceInput {
    fn validate(&self) -> Result<(), ApiError> {
        length("resourceCode", &self.resource_code, 1, 50)?;
        length("name", &self.name, 1, 200)?;
        email(&self.email)?;
        max_length("phone", self.phone.as_deref(), 20)?;
        positive_if_set("salary", self.salary)?;
        positive_if_set("hourlyRate", self.hourly_rate)?;
        if self.years_of_exp < 0 {
            return Err(invalid("yearsOfExp must not be negative"));
        }
        if self.skills.iter().any(|s| s.trim().is_empty()) {
            return Err(invalid("skills must not contain blank entries"));
        }
        Ok(())
    }
}

impl Validate for AllocationInput {
    fn validate(&self) -> Result<(), ApiError> {
        if !(self.allocation > 0.0 && self.allocation <= 100.0) {
            return Err(invalid("allocation must be greater than 0 and at most 100"));
        }
        positive("hourlyRate", self.hourly_rate)?;
        if self.end_date < self.start_date {
            return Err(invalid("End date must not be before start date"));
        }
        Ok(())
    }
}

impl Validate for MilestoneInput {
    fn validate(&self) -> Result<(), ApiError> {
        length("name", &self.name, 1, 200)?;
        max_length("description", self.description.as_deref(), 1000)?;
        positive_if_set("billingAmount", self.billing_amount)?;
        if self.is_billing_milestone && self.billing_amount.is_none() {
            return Err(invalid("billingAmount is required for billing milestones"));
        }
        if let Some(pct) = self.billing_percentage {
            if !(0.0..=100.0).contains(&pct) {
                return Err(invalid("billingPercentage must be between 0 and 100"));
            }
        }
        Ok(())
    }
}

impl Validate for ExpenseInput {
    fn validate(&self) -> Result<(), ApiError> {
        length("description", &self.description, 1, 500)?;
        positive("amount", self.amount)
    }
}

impl Validate for InvoiceInput {
    fn validate(&self) -> Result<(), ApiError> {
        positive("amount", self.amount)?;
        if self.due_date < self.issue_date {
            return Err(invalid("Due date must not be before issue date"));
        }
        Ok(())
    }
}

impl Validate for RegisterInput {
    fn validate(&self) -> Result<(), ApiError> {
        length("name", &self.name, 1, 200)?;
        email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(invalid(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }
}

impl Validate for LoginInput {
    fn validate(&self) -> Result<(), ApiError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(invalid("Email and password are required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::ExpenseCategory;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn message(err: ApiError) -> String {
        match err {
            ApiError::Validation(msg) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    fn project() -> ProjectInput {
        ProjectInput {
            name: "Website".into(),
            project_code: "PROJ-001".into(),
            description: None,
            po_number: "PO-1".into(),
            po_date: d("2024-01-01"),
            po_amount: 1000.0,
            client_name: "Acme".into(),
            start_date: d("2024-01-01"),
            end_date: d("2024-06-30"),
            budget: 800.0,
        }
    }

    fn resource() -> ResourceInput {
        ResourceInput {
            resource_code: "RES-001".into(),
            name: "Jane".into(),
            email: "jane@example.com".into(),
            phone: None,
            salary: None,
            hourly_rate: Some(50.0),
            years_of_exp: 4,
            skills: vec![],
            certifications: vec![],
        }
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last@sub.example.com"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a@example"));
        assert!(!is_valid_email("a@.com"));
        assert!(!is_valid_email("a b@example.com"));
        assert!(!is_valid_email("a@b@example.com"));
    }

    #[test]
    fn valid_project_passes() {
        assert!(project().validate().is_ok());
    }

    #[test]
    fn project_rules() {
        let mut p = project();
        p.end_date = p.start_date;
        assert_eq!(message(p.validate().unwrap_err()), "End date must be after start date");

        let mut p = project();
        p.name = "   ".into();
        assert!(message(p.validate().unwrap_err()).starts_with("name"));

        let mut p = project();
        p.budget = 0.0;
        assert_eq!(message(p.validate().unwrap_err()), "budget must be positive");

        let mut p = project();
        p.description = Some("x".repeat(1001));
        assert!(p.validate().is_err());
    }

    #[test]
    fn resource_rules() {
        assert!(resource().validate().is_ok());

        let mut r = resource();
        r.email = "jane".into();
        assert_eq!(message(r.validate().unwrap_err()), "Invalid email address");

        let mut r = resource();
        r.years_of_exp = -1;
        assert!(r.validate().is_err());

        let mut r = resource();
        r.salary = Some(-5.0);
        assert_eq!(message(r.validate().unwrap_err()), "salary must be positive");

        let mut r = resource();
        r.phone = Some("0".repeat(21));
        assert!(r.validate().is_err());
    }

    #[test]
    fn allocation_bounds() {
        let ok = AllocationInput {
            project_id: 1,
            start_date: d("2024-01-01"),
            end_date: d("2024-01-01"),
            allocation: 100.0,
            hourly_rate: 40.0,
        };
        assert!(ok.validate().is_ok());

        for pct in [0.0, -10.0, 100.5, f64::NAN] {
            let a = AllocationInput { allocation: pct, ..ok.clone() };
            assert!(a.validate().is_err(), "{pct} accepted");
        }

        let reversed = AllocationInput { end_date: d("2023-12-31"), ..ok.clone() };
        assert!(reversed.validate().is_err());
    }

    #[test]
    fn billing_milestone_needs_amount() {
        let mut m = MilestoneInput {
            project_id: Some(1),
            name: "Go live".into(),
            description: None,
            scheduled_date: d("2024-03-01"),
            is_billing_milestone: true,
            billing_amount: None,
            billing_percentage: Some(30.0),
        };
        assert!(m.validate().is_err());

        m.billing_amount = Some(5000.0);
        assert!(m.validate().is_ok());

        m.billing_percentage = Some(120.0);
        assert!(m.validate().is_err());
    }

    #[test]
    fn expense_and_invoice_rules() {
        let e = ExpenseInput {
            project_id: Some(1),
            description: "Flights".into(),
            amount: 0.0,
            category: ExpenseCategory::Travel,
            date: d("2024-02-01"),
        };
        assert_eq!(message(e.validate().unwrap_err()), "amount must be positive");

        let inv = InvoiceInput {
            project_id: 1,
            milestone_id: None,
            amount: 100.0,
            issue_date: d("2024-02-01"),
            due_date: d("2024-01-31"),
        };
        assert!(inv.validate().is_err());
        let same_day = InvoiceInput { due_date: d("2024-02-01"), ..inv };
        assert!(same_day.validate().is_ok());
    }

    #[test]
    fn register_and_login_rules() {
        let r = RegisterInput {
            email: "pm@example.com".into(),
            password: "12345".into(),
            name: "PM".into(),
            role: None,
        };
        assert!(message(r.validate().unwrap_err()).contains("at least 6"));

        let ok = RegisterInput { password: "123456".into(), ..r };
        assert!(ok.validate().is_ok());

        let login = LoginInput { email: "".into(), password: "x".into() };
        assert!(login.validate().is_err());
    }
}
