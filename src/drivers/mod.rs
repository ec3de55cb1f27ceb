pub mod analyzer;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

pub use analyzer::analyze_cost_drivers;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    Airline,
    Date,
    Stops,
    Route,
    Cabin,
}

impl Display for DriverKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::Airline => "airline choice",
            Self::Date => "date choice",
            Self::Stops => "nonstop routing",
            Self::Route => "airport choice",
            Self::Cabin => "cabin class",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostDriver {
    pub leg_id: String,
    pub kind: DriverKind,
    pub amount: f64,
    pub percent: f64,
    pub detail: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostDriverReport {
    pub drivers: Vec<CostDriver>,
    pub selected_total: f64,
    pub cheapest_total: f64,
    pub total_premium: f64,
    pub total_premium_percent: f64,
}

impl CostDriverReport {
    pub fn primary(&self) -> Option<&CostDriver> {
        self.drivers.first()
    }

    /// One-line digest used in reasoning prompts and fallback text.
    pub fn summary_line(&self) -> String {
        if self.drivers.is_empty() {
            return format!(
                "No single cost driver; premium ${:.0} ({:.1}%).",
                self.total_premium, self.total_premium_percent
            );
        }
        let parts = self
            .drivers
            .iter()
            .take(3)
            .map(|d| format!("{} on {} +${:.0} ({:.1}%)", d.kind, d.leg_id, d.amount, d.percent))
            .collect::<Vec<_>>()
            .join("; ");
        format!(
            "Premium ${:.0} ({:.1}%). Drivers: {parts}.",
            self.total_premium, self.total_premium_percent
        )
    }
}
