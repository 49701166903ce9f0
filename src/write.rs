//! Loan creation: the only write the proxy performs.

use crate::airtable::{ExternalRecord, Fields, RecordSource, RemoteWriteError};
use crate::schema::loan;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tracing::info;

/// Shown to callers when an insert fails, whatever the cause.
pub const CREATE_FAILED_MESSAGE: &str = "Failed to create record in Airtable";

/// Simplified input shape accepted from the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLoan {
    #[serde(rename = "dealName")]
    pub name: String,
    #[serde(rename = "loanAmount")]
    pub amount: Number,
    #[serde(rename = "productType")]
    pub product_type: String,
}

impl NewLoan {
    /// Field map in the external schema's names.
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert(loan::DEAL_NAME.to_string(), Value::String(self.name.clone()));
        fields.insert(loan::LOAN_AMOUNT.to_string(), Value::Number(self.amount.clone()));
        fields.insert(
            loan::PRODUCT_TYPE.to_string(),
            Value::String(self.product_type.clone()),
        );
        fields
    }
}

/// Insert one loan into `table` and return the record the remote echoed.
///
/// Single attempt, no local bookkeeping: the new row shows up in the store
/// only after the next fetch.
pub async fn create_loan<S>(
    source: &S,
    table: &str,
    input: &NewLoan,
) -> Result<ExternalRecord, RemoteWriteError>
where
    S: RecordSource + ?Sized,
{
    let created = source
        .create_records(table, vec![input.to_fields()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| RemoteWriteError::EmptyEcho {
            table: table.to_string(),
        })?;

    info!(table, id = %created.id, "created loan record");
    Ok(created)
}
