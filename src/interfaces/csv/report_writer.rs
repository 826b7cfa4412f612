use crate::domain::account::{Account, AccountId, Balance, Currency};
use crate::domain::payment::{Direction, Payment, PaymentId};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// Output encoding for the end-of-batch report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Debug, Serialize)]
struct AccountRow<'a> {
    id: &'a AccountId,
    balance: Balance,
    currency: Currency,
}

impl<'a> From<&'a Account> for AccountRow<'a> {
    fn from(account: &'a Account) -> Self {
        Self {
            id: &account.id,
            balance: account.balance,
            currency: account.currency,
        }
    }
}

#[derive(Debug, Serialize)]
struct Report<'r, 'a> {
    accounts: &'r [AccountRow<'a>],
    payments: &'r [PaymentRow<'a>],
}

#[derive(Debug, Serialize)]
struct PaymentRow<'a> {
    id: PaymentId,
    account: &'a AccountId,
    direction: Direction,
    amount: Decimal,
    counterparty: &'a AccountId,
}

impl<'a> From<&'a Payment> for PaymentRow<'a> {
    fn from(payment: &'a Payment) -> Self {
        Self {
            id: payment.id,
            account: &payment.account,
            direction: payment.direction,
            amount: payment.amount.value(),
            counterparty: &payment.counterparty,
        }
    }
}

/// Writes account and ledger listings to any `Write` sink.
///
/// Status columns are deliberately absent: only active records reach here.
pub struct ReportWriter<W: Write> {
    sink: W,
    format: OutputFormat,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W, format: OutputFormat) -> Self {
        Self { sink, format }
    }

    /// Writes the end-of-batch report as one document.
    ///
    /// Without `payments` the report is the account listing alone. With them,
    /// CSV output puts the ledger table after a blank line and JSON output
    /// becomes a single `{"accounts": [..], "payments": [..]}` object.
    pub fn write_report(&mut self, accounts: &[Account], payments: Option<&[Payment]>) -> Result<()> {
        let accounts: Vec<AccountRow> = accounts.iter().map(AccountRow::from).collect();
        let payments: Option<Vec<PaymentRow>> =
            payments.map(|entries| entries.iter().map(PaymentRow::from).collect());

        match self.format {
            OutputFormat::Csv => {
                self.write_table(&accounts)?;
                if let Some(payments) = &payments {
                    writeln!(self.sink)?;
                    self.write_table(payments)?;
                }
            }
            OutputFormat::Json => {
                match &payments {
                    Some(payments) => serde_json::to_writer_pretty(
                        &mut self.sink,
                        &Report {
                            accounts: &accounts,
                            payments,
                        },
                    )?,
                    None => serde_json::to_writer_pretty(&mut self.sink, &accounts)?,
                }
                writeln!(self.sink)?;
            }
        }
        self.sink.flush()?;
        Ok(())
    }

    fn write_table<T: Serialize>(&mut self, rows: &[T]) -> Result<()> {
        let mut writer = csv::Writer::from_writer(&mut self.sink);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
