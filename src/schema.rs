//! Table and field names of the external base

/// Remote table names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub loans: String,
    pub test_loans: String,
    pub conditions: String,
    pub responses: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            loans: "Loan Pipeline".to_string(),
            test_loans: "Loan Pipeline Test".to_string(),
            conditions: "Deal Conditions".to_string(),
            responses: "Response Submissions".to_string(),
        }
    }
}

/// Fields of `Deal Conditions` rows.
pub mod condition {
    /// Linked loan ids
    pub const LOANS: &str = "Loan Pipeline";
    /// Formula field mirroring the row id
    pub const RECORD_ID: &str = "Record ID";
}

/// Fields of `Response Submissions` rows.
pub mod response {
    pub const NAME: &str = "Name";
    pub const SORT_ORDER: &str = "Sort Order";
    pub const REVIEW_STATUS: &str = "Review Status";
    pub const RESPONSE_TEXT: &str = "Response Text";
    pub const RESPONSE_TYPE: &str = "Response Type";
    pub const DEAL_STAGE: &str = "⚡️ Deal Stage (from Deal Conditions)";
    /// Linked condition ids
    pub const CONDITIONS: &str = "Deal Conditions";
}

/// Fields written when creating a loan.
pub mod loan {
    pub const DEAL_NAME: &str = "⚡️ Deal Name";
    pub const LOAN_AMOUNT: &str = "⚡️ Loan Amount (Max)";
    pub const PRODUCT_TYPE: &str = "⚡️ Product Type";
}
