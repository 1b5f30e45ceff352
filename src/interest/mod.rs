pub mod penalty;
pub mod preclose;
pub mod terms;

pub use penalty::{PenaltyAccrual, PenaltyAssessment, PenaltyConfig, PenaltyEngine};
pub use preclose::{compute_preclose_amount, PrecloseQuote};
pub use terms::{compute_terms, TermsCalculation, TermsRequest};
