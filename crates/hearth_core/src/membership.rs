//! crates/hearth_core/src/membership.rs
//!
//! Cascading edits to house membership. Every change that moves a user in or
//! out of a house goes through here so that `admin_id ∈ member_ids` holds and
//! empty houses disappear in the same transition.

use std::collections::HashSet;

use tracing::debug;

use crate::domain::{Db, Store};
use crate::ids::Env;
use crate::invite::generate_invite_code;

/// What removing a member did to the house.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detached {
    NotMember,
    Remaining { new_admin: Option<String> },
    HouseDeleted,
}

/// Removes `user_id` from `house_id`.
///
/// Admin passes to the first remaining member when the leaver held it. The
/// user's own `house_id` is left to the caller.
pub fn detach_member(db: &mut Db, house_id: &str, user_id: &str) -> Detached {
    let Some(position) = db.houses.iter().position(|h| h.id == house_id) else {
        return Detached::NotMember;
    };
    let house = &mut db.houses[position];
    if !house.has_member(user_id) {
        return Detached::NotMember;
    }
    house.member_ids.retain(|id| id != user_id);

    if house.member_ids.is_empty() {
        debug!(house_id, "last member left, deleting house");
        db.houses.remove(position);
        return Detached::HouseDeleted;
    }

    if house.admin_id == user_id || !house.has_member(&house.admin_id) {
        let heir = house.member_ids[0].clone();
        house.admin_id = heir.clone();
        house.admin_wp_id = db.users.iter().find(|u| u.id == heir).and_then(|u| u.wp_id);
        return Detached::Remaining {
            new_admin: Some(heir),
        };
    }
    Detached::Remaining { new_admin: None }
}

/// Removes every member of `house_id` from all other houses.
pub fn claim_members(db: &mut Db, house_id: &str) {
    let Some(members) = db.house(house_id).map(|h| h.member_ids.clone()) else {
        return;
    };
    let others: Vec<(String, String)> = db
        .houses
        .iter()
        .filter(|h| h.id != house_id)
        .flat_map(|h| {
            h.member_ids
                .iter()
                .filter(|m| members.contains(m))
                .map(|m| (h.id.clone(), m.clone()))
                .collect::<Vec<_>>()
        })
        .collect();
    for (other, member) in others {
        detach_member(db, &other, &member);
    }
}

/// Regenerates invite codes that are empty or clash with an earlier house.
///
/// Houses named in `authoritative` claim their codes first, so a code that
/// just arrived from the remote service wins over a stale local one.
pub fn ensure_unique_invite_codes(db: &mut Db, authoritative: &[String], env: &mut Env<'_>) {
    let mut order: Vec<usize> = (0..db.houses.len())
        .filter(|&i| authoritative.contains(&db.houses[i].id))
        .collect();
    order.extend((0..db.houses.len()).filter(|&i| !authoritative.contains(&db.houses[i].id)));

    let mut seen: HashSet<String> = HashSet::new();
    for index in order {
        let code = db.houses[index].invite_code.trim().to_ascii_uppercase();
        if code.is_empty() || seen.contains(&code) {
            let fresh = generate_invite_code(env, &codes_in_use(db, None));
            debug!(house_id = %db.houses[index].id, "replacing clashing invite code");
            db.houses[index].invite_code = fresh.clone();
            seen.insert(fresh);
        } else {
            seen.insert(code);
        }
    }
}

/// Every invite code in use except the one held by `except`.
pub fn codes_in_use(db: &Db, except: Option<&str>) -> HashSet<String> {
    db.houses
        .iter()
        .filter(|h| Some(h.id.as_str()) != except)
        .map(|h| h.invite_code.to_ascii_uppercase())
        .collect()
}

/// Whether `user_id` leaving would hand the admin role to someone else.
///
/// The reducer performs the hand-off itself; UIs use this to ask the admin to
/// pick a successor before dispatching `LEAVE_HOUSE`.
pub fn admin_must_transfer(store: &Store, user_id: &str) -> bool {
    store
        .house_of(user_id)
        .is_some_and(|h| h.is_admin(user_id) && h.member_ids.len() > 1)
}
