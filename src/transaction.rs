use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{LoanId, TransactionId, TransactionType, UserId};

/// payment-gateway correlation fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayReference {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// immutable ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub loan_id: LoanId,
    pub user_id: UserId,
    pub amount: Money,
    pub transaction_type: TransactionType,
    /// absent for disbursements, which never pass through the gateway
    pub gateway: Option<GatewayReference>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn disbursement(loan_id: LoanId, user_id: UserId, amount: Money, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id,
            user_id,
            amount,
            transaction_type: TransactionType::Disbursement,
            gateway: None,
            created_at: now,
        }
    }

    pub fn from_request(request: &TransactionRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id: request.loan_id,
            user_id: request.user_id,
            amount: request.amount,
            transaction_type: request.transaction_type,
            gateway: Some(request.gateway.clone()),
            created_at: now,
        }
    }
}

/// incoming payment as captured by the gateway callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub loan_id: LoanId,
    /// payer
    pub user_id: UserId,
    pub amount: Money,
    pub transaction_type: TransactionType,
    pub gateway: GatewayReference,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_becomes_ledger_entry() {
        let request = TransactionRequest {
            loan_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount: Money::from_major(2_500),
            transaction_type: TransactionType::Repayment,
            gateway: GatewayReference {
                order_id: "order_1".to_string(),
                payment_id: "pay_1".to_string(),
                signature: "abc".to_string(),
            },
        };
        let now = Utc::now();

        let tx = Transaction::from_request(&request, now);
        assert_eq!(tx.loan_id, request.loan_id);
        assert_eq!(tx.amount, request.amount);
        assert_eq!(tx.gateway.as_ref().unwrap().payment_id, "pay_1");
        assert_eq!(tx.created_at, now);
    }

    #[test]
    fn test_disbursement_has_no_gateway_reference() {
        let tx = Transaction::disbursement(Uuid::new_v4(), Uuid::new_v4(), Money::from_major(10_000), Utc::now());
        assert_eq!(tx.transaction_type, TransactionType::Disbursement);
        assert!(tx.gateway.is_none());
        assert!(!tx.transaction_type.is_repayment());
    }
}
