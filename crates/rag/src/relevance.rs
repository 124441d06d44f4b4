//! Relevance boosts and penalties
//!
//! Additive adjustments applied on top of the weighted search signals.
//! Each rule is evaluated independently, so the sum does not depend on
//! evaluation order.

use chrono::{Months, NaiveDate};
use std::fmt;

use legal_rag_config::BoostConfig;
use legal_rag_core::{Chunk, DocType, SearchFilters};

/// Why an adjustment fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoostReason {
    JurisdictionMatch,
    JurisdictionMismatch,
    Current,
    Recent,
    DepartmentPolicy,
    Stale,
}

impl fmt::Display for BoostReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::JurisdictionMatch => "jurisdiction_match",
            Self::JurisdictionMismatch => "jurisdiction_mismatch",
            Self::Current => "current",
            Self::Recent => "recent",
            Self::DepartmentPolicy => "department_policy",
            Self::Stale => "stale",
        };
        f.write_str(label)
    }
}

/// A fired adjustment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boost {
    pub reason: BoostReason,
    pub amount: f32,
}

/// `date` minus `years` whole years, saturating at the calendar minimum
fn years_before(date: NaiveDate, years: i32) -> NaiveDate {
    let months = Months::new((years.max(0) as u32).saturating_mul(12));
    date.checked_sub_months(months).unwrap_or(NaiveDate::MIN)
}

/// Whether a chunk should be treated as stale at `reference`
///
/// Explicitly non-current chunks are always stale. For doc types where
/// currency matters, a chunk not marked current is stale when its effective
/// date is missing or older than `stale_years`.
pub fn is_stale(chunk: &Chunk, reference: NaiveDate, stale_years: i32) -> bool {
    match chunk.is_current {
        Some(false) => true,
        Some(true) => false,
        None if chunk.doc_type.currency_matters() => match chunk.effective_date {
            None => true,
            Some(date) => date < years_before(reference, stale_years),
        },
        None => false,
    }
}

/// Applies [`BoostConfig`] relative to a fixed reference date
#[derive(Debug, Clone)]
pub struct RelevanceBooster {
    config: BoostConfig,
    reference_date: NaiveDate,
}

impl RelevanceBooster {
    /// Booster evaluated against today's date
    pub fn new(config: BoostConfig) -> Self {
        Self {
            config,
            reference_date: chrono::Local::now().date_naive(),
        }
    }

    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = date;
        self
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    pub fn stale_years(&self) -> i32 {
        self.config.stale_years
    }

    pub fn is_stale(&self, chunk: &Chunk) -> bool {
        is_stale(chunk, self.reference_date, self.config.stale_years)
    }

    fn is_recent(&self, chunk: &Chunk) -> bool {
        chunk
            .effective_date
            .is_some_and(|d| d >= years_before(self.reference_date, self.config.recent_years))
    }

    /// Every adjustment that fires for `chunk` under `filters`
    pub fn evaluate(&self, chunk: &Chunk, filters: &SearchFilters) -> Vec<Boost> {
        let c = &self.config;
        let mut boosts = Vec::new();

        let requested = filters
            .jurisdiction
            .as_deref()
            .unwrap_or(c.home_jurisdiction.as_str());
        if !chunk.jurisdiction.is_empty() && !requested.is_empty() {
            if chunk.jurisdiction.eq_ignore_ascii_case(requested) {
                boosts.push(Boost {
                    reason: BoostReason::JurisdictionMatch,
                    amount: c.jurisdiction_match,
                });
            } else {
                boosts.push(Boost {
                    reason: BoostReason::JurisdictionMismatch,
                    amount: c.jurisdiction_mismatch,
                });
            }
        }

        if chunk.is_current == Some(true) {
            boosts.push(Boost {
                reason: BoostReason::Current,
                amount: c.current,
            });
        } else if chunk.is_current.is_none() && self.is_recent(chunk) {
            boosts.push(Boost {
                reason: BoostReason::Recent,
                amount: c.recent,
            });
        }

        if chunk.doc_type == DocType::Policy {
            let department_hit = match (&filters.department, &chunk.department) {
                (Some(wanted), Some(actual)) => wanted.trim().eq_ignore_ascii_case(actual.trim()),
                _ => false,
            };
            if department_hit {
                boosts.push(Boost {
                    reason: BoostReason::DepartmentPolicy,
                    amount: c.department_policy,
                });
            }
        }

        if self.is_stale(chunk) {
            boosts.push(Boost {
                reason: BoostReason::Stale,
                amount: c.stale,
            });
        }

        boosts
    }

    /// Sum of all fired adjustments
    pub fn adjustment(&self, chunk: &Chunk, filters: &SearchFilters) -> f32 {
        self.evaluate(chunk, filters).iter().map(|b| b.amount).sum()
    }
}
