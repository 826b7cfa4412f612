use super::account::{AccountId, Amount};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Globally unique identifier of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(Uuid);

impl PaymentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Whether money leaves or arrives at the entry's owning account.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Incoming => Direction::Outgoing,
            Direction::Outgoing => Direction::Incoming,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Incoming => f.write_str("incoming"),
            Direction::Outgoing => f.write_str("outgoing"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    #[default]
    Active,
    /// Rolled back by a compensating action; never returned by reads.
    Deleted,
}

/// One leg of a transfer.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payment {
    pub id: PaymentId,
    /// Owner of the entry.
    pub account: AccountId,
    pub amount: Amount,
    pub counterparty: AccountId,
    pub direction: Direction,
    #[serde(default)]
    pub status: EntryStatus,
}

impl Payment {
    /// Builds the two legs of a transfer of `amount` from `from` to `to`,
    /// each with a fresh id. The outgoing leg comes first.
    pub fn pair(from: &AccountId, amount: Amount, to: &AccountId) -> [Payment; 2] {
        [
            Payment {
                id: PaymentId::generate(),
                account: from.clone(),
                amount,
                counterparty: to.clone(),
                direction: Direction::Outgoing,
                status: EntryStatus::Active,
            },
            Payment {
                id: PaymentId::generate(),
                account: to.clone(),
                amount,
                counterparty: from.clone(),
                direction: Direction::Incoming,
                status: EntryStatus::Active,
            },
        ]
    }

    pub fn is_active(&self) -> bool {
        self.status == EntryStatus::Active
    }

    /// Whether `other` is the matching opposite leg of the same transfer.
    pub fn mirrors(&self, other: &Payment) -> bool {
        self.amount == other.amount
            && self.direction == other.direction.opposite()
            && self.account == other.counterparty
            && self.counterparty == other.account
    }
}
