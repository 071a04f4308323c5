pub mod aggregate;
pub mod calculator;
pub mod pricing;
pub mod retail;
pub mod types;

pub use aggregate::{CostReport, GroupKey, GroupSummary, RankedSubscription, RunParameters};
pub use pricing::resolve_pricing;
pub use types::{
    CapacityPlan, CostBreakdown, JobFailure, LogMetrics, MatchSource, Meter, PricingSnapshot,
    PricingSource, RegionPricing, SubscriptionEstimate, DEFAULT_PRICING_ROW,
};
