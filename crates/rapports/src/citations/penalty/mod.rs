mod aggregate;
mod rates;
mod recidivism;

pub use aggregate::{aggregate, AssessedInfraction, PenaltyAssessment, PenaltyTotals, PointsOutcome};
pub use rates::{
    resolve, PenaltySchedule, PointDeduction, RateValue, ResolvedRate, NOT_APPLICABLE,
};
pub use recidivism::classify;
