use crate::application::Ledger;
use crate::domain::account::{AccountId, Currency};
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Open,
    Transfer,
    Close,
}

/// One raw CSV row: `op, account, amount, counterparty, currency`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct OperationRecord {
    pub op: OperationType,
    pub account: String,
    pub amount: Option<Decimal>,
    pub counterparty: Option<String>,
    pub currency: Option<String>,
}

/// A validated request against the ledger.
#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Open {
        account: AccountId,
        currency: Currency,
        balance: Decimal,
    },
    Transfer {
        from: AccountId,
        amount: Decimal,
        to: AccountId,
    },
    Close {
        account: AccountId,
    },
}

fn parse_id(raw: &str) -> Result<AccountId> {
    raw.parse().map_err(PaymentError::InvalidRecord)
}

impl TryFrom<OperationRecord> for Operation {
    type Error = PaymentError;

    fn try_from(record: OperationRecord) -> Result<Self> {
        let account = parse_id(&record.account)?;
        match record.op {
            OperationType::Open => {
                let currency = match record.currency.as_deref() {
                    Some(raw) => raw.parse().map_err(PaymentError::InvalidRecord)?,
                    None => Currency::default(),
                };
                Ok(Operation::Open {
                    account,
                    currency,
                    balance: record.amount.unwrap_or(Decimal::ZERO),
                })
            }
            OperationType::Transfer => {
                let amount = record.amount.ok_or_else(|| {
                    PaymentError::InvalidRecord("transfer requires an amount".to_string())
                })?;
                let to = record.counterparty.as_deref().ok_or_else(|| {
                    PaymentError::InvalidRecord("transfer requires a counterparty".to_string())
                })?;
                Ok(Operation::Transfer {
                    from: account,
                    amount,
                    to: parse_id(to)?,
                })
            }
            OperationType::Close => Ok(Operation::Close { account }),
        }
    }
}

impl Operation {
    /// Runs the operation against `ledger`.
    pub async fn apply(self, ledger: &Ledger) -> Result<()> {
        match self {
            Operation::Open {
                account,
                currency,
                balance,
            } => {
                ledger.accounts.create(account, currency, balance).await?;
            }
            Operation::Transfer { from, amount, to } => {
                ledger.transfers.transfer(&from, amount, &to).await?;
            }
            Operation::Close { account } => {
                ledger.accounts.delete(&account).await?;
            }
        }
        Ok(())
    }
}

/// Reads ledger operations from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// so trailing empty columns may be omitted.
pub struct OperationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OperationReader<R> {
    /// Creates a new `OperationReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads, deserializes and validates rows.
    pub fn operations(self) -> impl Iterator<Item = Result<Operation>> {
        self.reader
            .into_deserialize::<OperationRecord>()
            .map(|result| result.map_err(PaymentError::from).and_then(Operation::try_from))
    }
}
