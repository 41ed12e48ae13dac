/// Returned when a stored or submitted status string is not a known variant.
#[derive(Debug, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a TEXT-backed enum: serde as SCREAMING_SNAKE_CASE, plus
/// `as_str`, `FromStr`, `TryFrom<String>` (for `#[sqlx(try_from)]`) and,
/// in tests, `ALL`.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident as $kind:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            #[cfg(test)]
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::models::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::models::UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

pub(crate) use text_enum;

mod user;
mod project;
mod resource;
mod allocation;
mod milestone;
mod expense;
mod invoice;

pub use user::{LoginInput, RegisterInput, Role, User};
pub use project::{Project, ProjectInput, ProjectStatus, ProjectWithCounts};
pub use resource::{Resource, ResourceInput};
pub use allocation::{AllocationInput, AllocationView, ResourceAllocation};
pub use milestone::{Milestone, MilestoneInput, MilestoneStatus, MilestoneView};
pub use expense::{Expense, ExpenseCategory, ExpenseInput, ExpenseView};
pub use invoice::{format_invoice_number, Invoice, InvoiceInput, InvoiceStatus, InvoiceView};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_parse_their_wire_names() {
        for status in ProjectStatus::ALL {
            assert_eq!(status.as_str().parse::<ProjectStatus>().unwrap(), *status);
        }
        for status in InvoiceStatus::ALL {
            assert_eq!(status.as_str().parse::<InvoiceStatus>().unwrap(), *status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = "DONE".parse::<MilestoneStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid milestone status: DONE");
    }

    #[test]
    fn serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&ExpenseCategory::ResourceCost).unwrap();
        assert_eq!(json, "\"RESOURCE_COST\"");

        let role: Role = serde_json::from_str("\"FINANCE_MANAGER\"").unwrap();
        assert_eq!(role, Role::FinanceManager);
    }
}
