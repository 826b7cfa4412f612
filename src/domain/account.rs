use crate::error::TransferError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// Longest account identifier accepted from the outside.
pub const MAX_ACCOUNT_ID_LEN: usize = 255;

/// Identifier of a wallet account.
///
/// Ordering is lexicographic and is the order in which per-account locks are
/// taken, so it must stay total and stable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Wraps an identifier that has already been validated upstream.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountId {
    type Err = String;

    /// Parses an untrusted identifier: non-empty ASCII alphanumeric, at most
    /// [`MAX_ACCOUNT_ID_LEN`] characters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("account id must not be empty".to_string());
        }
        if s.len() > MAX_ACCOUNT_ID_LEN {
            return Err(format!(
                "account id longer than {} characters",
                MAX_ACCOUNT_ID_LEN
            ));
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(format!("account id {:?} must be alphanumeric", s));
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Currencies an account can be denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            other => Err(format!("unsupported currency: {}", other)),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Usd => f.write_str("USD"),
        }
    }
}

/// Represents a monetary value held by an account.
///
/// This is a wrapper around `rust_decimal::Decimal` so balance arithmetic never
/// touches binary floating point.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(pub Decimal);

/// Represents a strictly positive monetary amount moved by a transfer.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, TransferError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(TransferError::InvalidAmount)
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = TransferError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Balance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Balance {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Balance {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Deleted,
}

/// A wallet account.
///
/// Deleted accounts keep their row in the store but are filtered out of every
/// lookup, so callers never see `status == Deleted`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    pub id: AccountId,
    pub balance: Balance,
    pub currency: Currency,
    #[serde(default)]
    pub status: AccountStatus,
}

impl Account {
    pub fn new(id: AccountId, currency: Currency, balance: Balance) -> Self {
        Self {
            id,
            balance,
            currency,
            status: AccountStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Whether `amount` can leave this account without overdrawing it.
    pub fn can_cover(&self, amount: Amount) -> bool {
        self.balance >= amount.into()
    }

    /// Removes funds. Callers check [`Account::can_cover`] first; the
    /// transfer engine holds the account lock between the two.
    ///
    /// On overflow the account is left unchanged.
    pub fn debit(&mut self, amount: Amount) -> Result<(), TransferError> {
        self.balance = self
            .balance
            .checked_sub(amount.into())
            .ok_or_else(|| TransferError::BalanceOverflow(self.id.clone()))?;
        Ok(())
    }

    /// Adds funds. On overflow the account is left unchanged.
    pub fn credit(&mut self, amount: Amount) -> Result<(), TransferError> {
        self.balance = self
            .balance
            .checked_add(amount.into())
            .ok_or_else(|| TransferError::BalanceOverflow(self.id.clone()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balance_arithmetic() {
        let b1 = Balance::new(dec!(10.0));
        let b2 = Balance::new(dec!(5.0));
        assert_eq!(b1 + b2, Balance::new(dec!(15.0)));
        assert_eq!(b1 - b2, Balance::new(dec!(5.0)));
    }

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(0.01)).is_ok());
        assert_eq!(Amount::new(dec!(0.0)), Err(TransferError::InvalidAmount));
        assert_eq!(Amount::new(dec!(-1.0)), Err(TransferError::InvalidAmount));
    }

    #[test]
    fn test_account_id_parsing() {
        assert_eq!("alice1".parse::<AccountId>(), Ok(AccountId::new("alice1")));
        assert!("".parse::<AccountId>().is_err());
        assert!("bob smith".parse::<AccountId>().is_err());
        assert!("x".repeat(MAX_ACCOUNT_ID_LEN + 1).parse::<AccountId>().is_err());
    }

    #[test]
    fn test_currency_parsing() {
        assert_eq!("usd".parse::<Currency>(), Ok(Currency::Usd));
        assert_eq!("USD".parse::<Currency>(), Ok(Currency::Usd));
        assert!("EUR".parse::<Currency>().is_err());
    }

    #[test]
    fn test_debit_and_credit() {
        let mut account = Account::new(
            AccountId::new("a"),
            Currency::Usd,
            Balance::new(dec!(1000.00)),
        );
        let amount = Amount::new(dec!(55.55)).unwrap();
        assert!(account.can_cover(amount));

        account.debit(amount).unwrap();
        assert_eq!(account.balance, Balance::new(dec!(944.45)));

        account.credit(amount).unwrap();
        assert_eq!(account.balance, Balance::new(dec!(1000.00)));
    }

    #[test]
    fn test_credit_overflow_leaves_balance() {
        let mut account = Account::new(
            AccountId::new("a"),
            Currency::Usd,
            Balance::new(Decimal::MAX),
        );
        let result = account.credit(Amount::new(dec!(1)).unwrap());
        assert_eq!(result, Err(TransferError::BalanceOverflow(AccountId::new("a"))));
        assert_eq!(account.balance, Balance::new(Decimal::MAX));
    }

    #[test]
    fn test_cannot_cover_more_than_balance() {
        let account = Account::new(AccountId::new("a"), Currency::Usd, Balance::new(dec!(1)));
        assert!(account.can_cover(Amount::new(dec!(1)).unwrap()));
        assert!(!account.can_cover(Amount::new(dec!(1.0001)).unwrap()));
    }

    #[test]
    fn test_negative_balance_detection() {
        assert!(Balance::new(dec!(-0.01)).is_negative());
        assert!(!Balance::ZERO.is_negative());
        assert!(!Balance::new(dec!(-0.00)).is_negative());
    }

    #[test]
    fn test_account_json_roundtrip_keeps_status() {
        let mut account = Account::new(AccountId::new("a"), Currency::Usd, Balance::ZERO);
        account.status = AccountStatus::Deleted;
        let json = serde_json::to_string(&account).unwrap();
        assert!(json.contains("\"currency\":\"USD\""));
        assert!(json.contains("\"status\":\"deleted\""));
        let back: Account = serde_json::from_str(&json).unwrap();
        assert_eq!(back, account);
    }
}
