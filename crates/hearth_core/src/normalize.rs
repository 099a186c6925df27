//! crates/hearth_core/src/normalize.rs
//!
//! Turns whatever was persisted (or seeded) into a store that satisfies every
//! invariant the reducer relies on. Nothing here fails: records that cannot be
//! read are dropped and everything else is repaired in place.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::{default_currency, Db, Store, Theme, NOTE_LIMIT};
use crate::ids::Env;
use crate::invite::normalize_code;
use crate::lenient::id_from_value;
use crate::membership::ensure_unique_invite_codes;
use crate::reconcile::normalize_currency;
use crate::schedule::assign_rotation;

/// Decodes a persisted envelope leniently and repairs it.
pub fn normalize_snapshot(raw: Value, env: &mut Env<'_>) -> Store {
    let Value::Object(mut root) = raw else {
        warn!("snapshot is not an object, starting empty");
        return Store::default();
    };
    let mut collections = match root.remove("db") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let db = Db {
        users: records(&mut collections, "users"),
        houses: records(&mut collections, "houses"),
        chores: records(&mut collections, "chores"),
        guests: records(&mut collections, "guests"),
        notes: records(&mut collections, "notes"),
        todo_lists: records(&mut collections, "todoLists"),
        expenses: records(&mut collections, "expenses"),
    };
    let current_user_id = root.get("currentUserId").and_then(id_from_value);
    let theme = root
        .remove("theme")
        .and_then(|v| serde_json::from_value::<Theme>(v).ok())
        .unwrap_or_default();

    let mut store = Store {
        db,
        current_user_id,
        theme,
        ..Store::default()
    };
    repair(&mut store, env);
    store
}

fn records<T: DeserializeOwned>(collections: &mut Map<String, Value>, key: &str) -> Vec<T> {
    match collections.remove(key) {
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value(item) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(collection = key, index, error = %err, "dropping unreadable record");
                    None
                }
            })
            .collect(),
        None | Some(Value::Null) => Vec::new(),
        Some(_) => {
            warn!(collection = key, "collection is not an array, ignoring it");
            Vec::new()
        }
    }
}

/// Restores every store invariant in place.
pub fn repair(store: &mut Store, env: &mut Env<'_>) {
    repair_users(&mut store.db);
    repair_houses(&mut store.db, env);
    repair_chores(&mut store.db);

    let notes = &mut store.db.notes;
    notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    notes.truncate(NOTE_LIMIT);

    store.db.expenses.retain(|expense| {
        let keep = expense.amount.is_finite() && expense.amount > 0.0;
        if !keep {
            warn!(expense_id = %expense.id, amount = expense.amount, "dropping expense with invalid amount");
        }
        keep
    });

    if store.current_user_id.is_some() && store.current_user().is_none() {
        debug!("current user no longer exists, signing out");
        store.current_user_id = None;
    }
    store.view = store.home_view();
    store.toast = None;
}

fn repair_users(db: &mut Db) {
    let mut ids = HashSet::new();
    let mut emails = HashSet::new();
    db.users.retain(|user| {
        let email = user.email.trim().to_ascii_lowercase();
        let fresh = ids.insert(user.id.clone()) && emails.insert(email);
        if !fresh {
            warn!(user_id = %user.id, "dropping user with duplicate id or email");
        }
        fresh
    });
    for user in db.users.iter_mut() {
        let (status, until) = (user.status, user.dnd_until);
        user.set_presence(status, until);
    }
}

fn repair_houses(db: &mut Db, env: &mut Env<'_>) {
    let known: HashSet<String> = db.users.iter().map(|u| u.id.clone()).collect();
    let mut house_ids = HashSet::new();
    db.houses.retain(|h| house_ids.insert(h.id.clone()));

    for house in db.houses.iter_mut() {
        let mut members: Vec<String> = Vec::with_capacity(house.member_ids.len());
        for id in house.member_ids.drain(..) {
            if known.contains(&id) && !members.contains(&id) {
                members.push(id);
            }
        }
        house.member_ids = members;
    }

    // Each user ends up in exactly one house: the one they point at when it
    // lists them, else the first house that lists them.
    for user in db.users.iter_mut() {
        let listing: Vec<&str> = db
            .houses
            .iter()
            .filter(|h| h.has_member(&user.id))
            .map(|h| h.id.as_str())
            .collect();
        let home = user
            .house_id
            .as_deref()
            .filter(|id| listing.contains(id))
            .or_else(|| listing.first().copied())
            .map(str::to_string);
        if home != user.house_id {
            debug!(user_id = %user.id, from = ?user.house_id, to = ?home, "repairing user house");
        }
        for house in db.houses.iter_mut() {
            if Some(&house.id) != home.as_ref() {
                house.member_ids.retain(|id| id != &user.id);
            }
        }
        user.house_id = home;
    }

    db.houses.retain(|house| {
        if house.member_ids.is_empty() {
            warn!(house_id = %house.id, "dropping house without members");
        }
        !house.member_ids.is_empty()
    });

    for house in db.houses.iter_mut() {
        if !house.has_member(&house.admin_id) {
            house.admin_id = house.member_ids[0].clone();
        }
        let admin_wp_id = db
            .users
            .iter()
            .find(|u| u.id == house.admin_id)
            .and_then(|u| u.wp_id);
        house.admin_wp_id = admin_wp_id.or(house.admin_wp_id);
        house.currency = normalize_currency(&house.currency).unwrap_or_else(default_currency);
        house.invite_code = normalize_code(&house.invite_code);
        if house.name.trim().is_empty() {
            house.name = "Home".to_string();
        }
    }
    ensure_unique_invite_codes(db, &[], env);
}

fn repair_chores(db: &mut Db) {
    for chore in db.chores.iter_mut() {
        chore.cadence_days = chore.cadence_days.max(1);
        assign_rotation(chore);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Status, View};
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn normalize(raw: Value) -> Store {
        let mut rng = StdRng::seed_from_u64(7);
        let mut env = Env::new(Utc::now(), &mut rng);
        normalize_snapshot(raw, &mut env)
    }

    #[test]
    fn garbage_yields_an_empty_store() {
        let store = normalize(json!("not a snapshot"));
        assert_eq!(store, Store::default());
        let store = normalize(json!({ "db": { "users": "nope" }, "theme": "dark" }));
        assert!(store.db.users.is_empty());
        assert_eq!(store.theme, Theme::Dark);
        assert_eq!(store.view, View::Auth);
    }

    #[test]
    fn unreadable_records_are_dropped_individually() {
        let store = normalize(json!({ "db": {
            "users": [
                { "id": "a", "name": "A", "email": "a@x.com" },
                { "name": "no id" },
                { "id": "b", "name": "B", "email": "A@X.com" }
            ],
            "notes": [
                { "id": "n1", "houseId": "h", "authorId": "a", "text": "hi", "createdAt": "garbage" }
            ]
        }}));
        assert_eq!(store.db.users.len(), 1);
        assert_eq!(store.db.users[0].id, "a");
        assert!(store.db.notes.is_empty());
    }

    #[test]
    fn membership_is_repaired_from_both_sides() {
        let store = normalize(json!({
            "currentUserId": "a",
            "view": "ONBOARDING",
            "db": {
                "users": [
                    { "id": "a", "name": "A", "email": "a@x.com", "houseId": "h2" },
                    { "id": "b", "name": "B", "email": "b@x.com" },
                    { "id": "c", "name": "C", "email": "c@x.com", "houseId": "gone" }
                ],
                "houses": [
                    { "id": "h1", "name": "One", "inviteCode": "dup22222", "currency": "eur",
                      "memberIds": ["a", "b", "b", "ghost"], "adminId": "ghost" },
                    { "id": "h2", "name": "Two", "inviteCode": "DUP22222",
                      "memberIds": ["a"], "adminId": "a" },
                    { "id": "h3", "name": "Empty", "inviteCode": "", "memberIds": ["ghost"] }
                ]
            }
        }));

        assert_eq!(store.db.houses.len(), 2);
        let h1 = store.db.house("h1").unwrap();
        assert_eq!(h1.member_ids, vec!["b".to_string()]);
        assert_eq!(h1.admin_id, "b");
        assert_eq!(h1.currency, "EUR");
        assert_ne!(h1.invite_code, store.db.house("h2").unwrap().invite_code);

        assert_eq!(store.db.user("a").unwrap().house_id.as_deref(), Some("h2"));
        assert_eq!(store.db.user("b").unwrap().house_id.as_deref(), Some("h1"));
        assert!(store.db.user("c").unwrap().house_id.is_none());
        assert_eq!(store.view, View::Dashboard);
    }

    #[test]
    fn statuses_chores_notes_and_expenses_are_repaired() {
        let notes: Vec<Value> = (0..60)
            .map(|i| json!({ "id": format!("n{i}"), "houseId": "h", "authorId": "a",
                "text": "x", "createdAt": 1_700_000_000_000_i64 + i * 1000 }))
            .collect();
        let store = normalize(json!({
            "currentUserId": "missing",
            "db": {
                "users": [
                    { "id": "a", "name": "A", "email": "a@x.com", "status": "DND" },
                    { "id": "b", "name": "B", "email": "b@x.com", "status": "AWAY",
                      "dndUntil": "2024-01-01T00:00:00Z" }
                ],
                "chores": [
                    { "id": "c1", "houseId": "h", "title": "Bins", "cadenceDays": 0,
                      "startAt": "2024-01-01", "dueAt": "2024-01-01", "rotation": ["a", "b"],
                      "rotationIndex": 5 }
                ],
                "notes": notes,
                "expenses": [
                    { "id": "e1", "houseId": "h", "title": "Milk", "amount": 0.0, "type": "shared",
                      "payerId": "a", "participantIds": [], "createdAt": "2024-01-01" },
                    { "id": "e2", "houseId": "h", "title": "Bread", "amount": 3.5, "type": "shared",
                      "payerId": "a", "participantIds": ["a"], "createdAt": "2024-01-01" }
                ]
            }
        }));

        assert_eq!(store.db.user("a").unwrap().status, Status::Home);
        assert!(store.db.user("b").unwrap().dnd_until.is_none());
        let chore = &store.db.chores[0];
        assert_eq!(chore.cadence_days, 1);
        assert_eq!(chore.rotation_index, 0);
        assert_eq!(chore.assignee_id.as_deref(), Some("a"));
        assert_eq!(store.db.notes.len(), NOTE_LIMIT);
        assert_eq!(store.db.notes[0].id, "n59");
        assert_eq!(store.db.expenses.len(), 1);
        assert!(store.current_user_id.is_none());
        assert_eq!(store.view, View::Auth);
    }
}
