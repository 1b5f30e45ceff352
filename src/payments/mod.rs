pub mod reconciliation;
pub mod signature;

pub use reconciliation::{plan_payment, PaymentOutcome, PaymentPlan, PaymentReconciler};
pub use signature::{HmacPaymentVerifier, PaymentVerifier, PAYMENT_SECRET_ENV};
