//! Split computation for group orders.
//!
//! Only one topology is supported: the initiator fronts the entire bill.
//! Every other member gets a line with `paid = 0, owed = share`; the
//! initiator gets `paid = total, owed = own share`. Both columns therefore sum
//! to the group total.

use chrono::{DateTime, Local, TimeZone, Utc};

use tabsplit_core::{AliasTable, Cents, Group, GroupMember, MemberId, SplitLine};

use crate::collab::MemberDirectory;
use crate::error::SyncError;

/// Map one participant to a ledger member: alias table first, then the
/// ledger's own names.
pub fn resolve_member(
    member: &GroupMember,
    aliases: &AliasTable,
    directory: &MemberDirectory,
) -> Result<(MemberId, String), SyncError> {
    let display_name = member.display_name();
    let lookup_name = aliases.resolve(&display_name);
    match directory.get(lookup_name) {
        Some(id) => Ok((*id, lookup_name.to_owned())),
        None => {
            tracing::error!(
                display_name = %display_name,
                lookup_name,
                "no ledger member matches participant"
            );
            Err(SyncError::MissingMapping {
                lookup_name: lookup_name.to_owned(),
                display_name,
                known: directory.keys().cloned().collect(),
            })
        }
    }
}

/// Build the split lines for `group`. Other members come first, the
/// initiator last.
pub fn build_split(
    group: &Group,
    aliases: &AliasTable,
    directory: &MemberDirectory,
) -> Result<Vec<SplitLine>, SyncError> {
    let mut lines = Vec::with_capacity(group.others.len() + 1);
    for member in &group.others {
        let (member_id, name) = resolve_member(member, aliases, directory)?;
        lines.push(SplitLine {
            member_id,
            name,
            paid: Cents::ZERO,
            owed: member.share,
        });
    }

    let (member_id, name) = resolve_member(&group.initiator, aliases, directory)?;
    lines.push(SplitLine {
        member_id,
        name,
        paid: group.total(),
        owed: group.initiator.share,
    });
    Ok(lines)
}

/// Expense description / ledger label: venue plus local payment time.
pub fn order_label(venue_name: &str, payment_time: DateTime<Utc>) -> String {
    order_label_in(venue_name, payment_time, &Local)
}

pub fn order_label_in<Tz>(venue_name: &str, payment_time: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{venue_name} {}",
        payment_time.with_timezone(tz).format("%d/%m/%Y, %H:%M:%S")
    )
}
