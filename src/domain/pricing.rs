use crate::domain::order::Amount;
use serde::{Deserialize, Serialize};

/// Cities where on-location photography packages are offered. Package
/// requests outside this list quote zero and are rejected at submission.
pub const PHOTOGRAPHY_SERVICE_AREA: &[&str] =
    &["jakarta", "bandung", "surabaya", "yogyakarta", "bali"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Flat,
    Shaded,
    Rendered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotographyMode {
    /// Full-day package shot on location; only offered inside the service
    /// area.
    Package { region: String },
    Hourly { hours: u32 },
}

/// Per-service configuration the customer assembles in the calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "service", rename_all = "lowercase")]
pub enum ServiceConfig {
    Design { concepts: u32, revisions: u32 },
    Illustration { characters: u32, detail: DetailLevel },
    Photography { mode: PhotographyMode },
    Video { minutes: u32, edited: bool },
    Web { pages: u32, cms: bool },
    App { screens: u32, platforms: u32 },
}

impl ServiceConfig {
    pub fn service_label(&self) -> &'static str {
        match self {
            ServiceConfig::Design { .. } => "design",
            ServiceConfig::Illustration { .. } => "illustration",
            ServiceConfig::Photography { .. } => "photography",
            ServiceConfig::Video { .. } => "video",
            ServiceConfig::Web { .. } => "web",
            ServiceConfig::App { .. } => "app",
        }
    }
}

/// Computes the gross price for a service configuration.
///
/// Pure and deterministic so a stored configuration can be re-quoted later
/// for audit. A zero quote means the configuration is empty or unavailable
/// and must be rejected before an order is created; a configuration whose
/// price overflows the arithmetic quotes zero for the same reason.
pub fn quote(config: &ServiceConfig) -> Amount {
    let units = match config {
        ServiceConfig::Design { concepts, revisions } => {
            if *concepts == 0 {
                Some(0)
            } else {
                sum(rate(*concepts, 150_000), rate(*revisions, 50_000))
            }
        }
        ServiceConfig::Illustration { characters, detail } => {
            let per_character = match detail {
                DetailLevel::Flat => 100_000,
                DetailLevel::Shaded => 175_000,
                DetailLevel::Rendered => 300_000,
            };
            rate(*characters, per_character)
        }
        ServiceConfig::Photography { mode } => match mode {
            PhotographyMode::Package { region } => {
                let region = region.trim().to_lowercase();
                if PHOTOGRAPHY_SERVICE_AREA.contains(&region.as_str()) {
                    Some(2_500_000)
                } else {
                    Some(0)
                }
            }
            PhotographyMode::Hourly { hours } => rate(*hours, 350_000),
        },
        ServiceConfig::Video { minutes, edited } => {
            surcharge(rate(*minutes, 400_000), *edited, 750_000)
        }
        ServiceConfig::Web { pages, cms } => {
            surcharge(rate(*pages, 500_000), *cms, 1_500_000)
        }
        ServiceConfig::App { screens, platforms } => rate(*screens, 750_000)
            .and_then(|per_platform| per_platform.checked_mul(u64::from(*platforms))),
    };
    Amount::from_units(units.unwrap_or(0))
}

fn rate(count: u32, per_unit: u64) -> Option<u64> {
    u64::from(count).checked_mul(per_unit)
}

fn sum(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    a.and_then(|a| b.and_then(|b| a.checked_add(b)))
}

/// Adds a flat surcharge on top of a non-zero base when the option is taken.
fn surcharge(base: Option<u64>, taken: bool, extra: u64) -> Option<u64> {
    match base {
        Some(0) | None => base,
        Some(base) if taken => base.checked_add(extra),
        Some(base) => Some(base),
    }
}
