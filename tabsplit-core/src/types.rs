//! Domain types for orders, splits, and the processing ledger.
//!
//! Money is always carried as integer minor units ([`Cents`]); decimal strings
//! only appear at the HTTP boundary.

use std::collections::BTreeMap;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Opaque order identifier from the ordering platform (`purchase_id`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Ledger-side identity of a group member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub u64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An amount in minor currency units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cents(pub i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Two-decimal rendering without a currency symbol, e.g. `25.00`.
    pub fn to_decimal_string(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

impl Add for Cents {
    type Output = Cents;

    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl AddAssign for Cents {
    fn add_assign(&mut self, rhs: Cents) {
        self.0 += rhs.0;
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Cents {
        iter.fold(Cents::ZERO, Add::add)
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// One participant of a group order as the ordering platform reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    pub first_name: String,
    pub last_name: String,
    /// What this participant owes for their part of the order.
    pub share: Cents,
}

impl GroupMember {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>, share: Cents) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            share,
        }
    }

    /// `"<first> <last>"`, the form used for alias and ledger lookups.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Group structure of a shared order. The initiator fronted the whole bill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub initiator: GroupMember,
    pub others: Vec<GroupMember>,
}

impl Group {
    /// Sum of every share, including the initiator's.
    pub fn total(&self) -> Cents {
        self.initiator.share + self.others.iter().map(|m| m.share).sum::<Cents>()
    }
}

/// Full detail of one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDetail {
    pub id: OrderId,
    pub venue_name: String,
    pub payment_time: DateTime<Utc>,
    pub total: Cents,
    /// `None` for a solo order.
    pub group: Option<Group>,
}

impl OrderDetail {
    /// The group structure, if this order is worth splitting.
    ///
    /// A group with no other members has nobody to split with and counts as
    /// solo.
    pub fn split_group(&self) -> Option<&Group> {
        self.group.as_ref().filter(|g| !g.others.is_empty())
    }
}

/// One participant's paid/owed amounts for a single expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitLine {
    pub member_id: MemberId,
    /// Canonical ledger name the member resolved to.
    pub name: String,
    pub paid: Cents,
    pub owed: Cents,
}

impl SplitLine {
    pub fn is_payer(&self) -> bool {
        self.paid.is_positive()
    }
}

// ---------------------------------------------------------------------------
// Processing ledger records
// ---------------------------------------------------------------------------

/// Metadata stored for an order that has been handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedRecord {
    pub processed_at: DateTime<Utc>,
    /// Human-readable label, e.g. `"Pizzeria 12/03/2025, 19:42:10"`.
    #[serde(default)]
    pub order_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Cents>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_group_order: Option<bool>,
}

impl ProcessedRecord {
    pub fn new(processed_at: DateTime<Utc>, order_name: impl Into<String>) -> Self {
        Self {
            processed_at,
            order_name: Some(order_name.into()),
            imported_from: None,
            total_amount: None,
            is_group_order: None,
        }
    }
}

/// The whole persisted ledger, keyed by order id.
pub type ProcessedOrders = BTreeMap<OrderId, ProcessedRecord>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
