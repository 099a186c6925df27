//! Property tests: membership invariants hold in every reachable state.

use std::collections::HashSet;

use chrono::Utc;
use hearth_core::{reduce, Action, Env, Store};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};

const PEOPLE: u8 = 4;

#[derive(Debug, Clone)]
enum Op {
    Signup(u8),
    Login(u8),
    Logout,
    Create,
    Join(u8),
    Leave(u8),
    Transfer(u8),
    Regenerate,
    Dnd(u8, bool),
    Note,
    Sync(Vec<(u8, Vec<u8>, bool)>),
}

fn op() -> impl Strategy<Value = Op> {
    let remote_house = (0u8..3, prop::collection::vec(0u8..6, 0..4), any::<bool>());
    prop_oneof![
        (0..PEOPLE).prop_map(Op::Signup),
        (0..PEOPLE).prop_map(Op::Login),
        Just(Op::Logout),
        Just(Op::Create),
        any::<u8>().prop_map(Op::Join),
        any::<u8>().prop_map(Op::Leave),
        any::<u8>().prop_map(Op::Transfer),
        Just(Op::Regenerate),
        ((0..PEOPLE), any::<bool>()).prop_map(|(p, until)| Op::Dnd(p, until)),
        Just(Op::Note),
        prop::collection::vec(remote_house, 0..3).prop_map(Op::Sync),
    ]
}

fn email(person: u8) -> String {
    format!("p{person}@x.com")
}

fn nth<T>(items: &[T], n: u8) -> Option<&T> {
    (!items.is_empty()).then(|| &items[n as usize % items.len()])
}

/// Turns an abstract op into a concrete action against the current store.
fn to_action(store: &Store, op: &Op) -> Value {
    let me = store.current_user_id.clone().unwrap_or_default();
    match op {
        Op::Signup(p) => json!({ "type": "SIGNUP",
            "payload": { "name": format!("P{p}"), "email": email(*p) } }),
        Op::Login(p) => json!({ "type": "LOGIN", "payload": { "email": email(*p) } }),
        Op::Logout => json!({ "type": "LOGOUT" }),
        Op::Create => json!({ "type": "CREATE_HOUSE", "payload": { "name": "Home" } }),
        Op::Join(n) => {
            let code = nth(&store.db.houses, *n).map(|h| h.invite_code.clone());
            json!({ "type": "JOIN_HOUSE", "payload": { "inviteCode": code } })
        }
        Op::Leave(n) => {
            let user = nth(&store.db.users, *n).map(|u| u.id.clone()).unwrap_or_default();
            json!({ "type": "LEAVE_HOUSE", "payload": { "userId": user } })
        }
        Op::Transfer(n) => {
            let members = store.house_of(&me).map(|h| h.member_ids.clone()).unwrap_or_default();
            let target = nth(&members, *n).cloned().unwrap_or_default();
            json!({ "type": "TRANSFER_ADMIN", "payload": { "userId": target } })
        }
        Op::Regenerate => json!({ "type": "REGENERATE_INVITE", "payload": {} }),
        Op::Dnd(p, with_until) => {
            let user = store.db.user_by_email(&email(*p)).map(|u| u.id.clone()).unwrap_or_default();
            let until = with_until.then_some("2030-01-01T00:00:00Z");
            json!({ "type": "SET_STATUS", "payload": { "userId": user, "status": "DND", "until": until } })
        }
        Op::Note => json!({ "type": "ADD_NOTE", "payload": { "text": "hi" } }),
        Op::Sync(houses) => {
            let houses: Vec<Value> = houses
                .iter()
                .map(|(slot, members, admin_first)| {
                    let members: Vec<Value> = members
                        .iter()
                        .enumerate()
                        .map(|(i, m)| {
                            let role = if *admin_first && i == 0 { "admin" } else { "member" };
                            // Low numbers also carry an email matching a local signup.
                            if *m < PEOPLE {
                                json!({ "wp_user_id": 100 + *m as i64, "email": email(*m), "role": role })
                            } else {
                                json!({ "wpId": (100 + *m as i64).to_string(), "role": role })
                            }
                        })
                        .collect();
                    json!({ "id": format!("r{slot}"), "inviteCode": format!("SHARED{}", slot % 2),
                        "members": members })
                })
                .collect();
            json!({ "type": "SYNC_REMOTE_HOUSES", "payload": { "houses": houses } })
        }
    }
}

fn check_invariants(store: &Store) -> Result<(), TestCaseError> {
    let mut codes = HashSet::new();
    for house in &store.db.houses {
        prop_assert!(!house.member_ids.is_empty(), "house {} is empty", house.id);
        prop_assert!(house.has_member(&house.admin_id), "admin of {} is not a member", house.id);
        let unique: HashSet<&String> = house.member_ids.iter().collect();
        prop_assert_eq!(unique.len(), house.member_ids.len());
        prop_assert!(codes.insert(house.invite_code.clone()), "invite code reused");
        for member in &house.member_ids {
            let user = store.db.user(member);
            prop_assert!(user.is_some(), "unknown member {}", member);
            prop_assert_eq!(user.and_then(|u| u.house_id.as_deref()), Some(house.id.as_str()));
        }
    }
    let mut emails = HashSet::new();
    for user in &store.db.users {
        prop_assert!(emails.insert(user.email.to_ascii_lowercase()), "duplicate email");
        if let Some(house_id) = &user.house_id {
            let house = store.db.house(house_id);
            prop_assert!(house.is_some_and(|h| h.has_member(&user.id)));
        }
        prop_assert_eq!(user.is_dnd(), user.dnd_until.is_some());
    }
    prop_assert!(store.db.notes.len() <= hearth_core::domain::NOTE_LIMIT);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn membership_invariants_survive_any_action_sequence(
        seed in any::<u64>(),
        ops in prop::collection::vec(op(), 1..40),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let now = Utc::now();
        let mut store = Store::default();
        for op in &ops {
            let action: Action = serde_json::from_value(to_action(&store, op)).unwrap();
            let mut env = Env::new(now, &mut rng);
            store = reduce(&store, action, &mut env);
            check_invariants(&store)?;
        }
    }

    #[test]
    fn replaying_with_the_same_seed_reproduces_the_store(
        seed in any::<u64>(),
        ops in prop::collection::vec(op(), 1..25),
    ) {
        let now = Utc::now();
        let run = || {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut store = Store::default();
            for op in &ops {
                let action: Action = serde_json::from_value(to_action(&store, op)).unwrap();
                store = reduce(&store, action, &mut Env::new(now, &mut rng));
            }
            store
        };
        prop_assert_eq!(run(), run());
    }
}
