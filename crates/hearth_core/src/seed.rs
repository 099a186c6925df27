//! crates/hearth_core/src/seed.rs
//!
//! A small demo household for first runs.

use std::collections::HashSet;

use crate::domain::{
    default_currency, ChecklistItem, Chore, ChoreState, Db, House, Note, Store, User,
};
use crate::ids::{add_days, Env};
use crate::invite::generate_invite_code;
use crate::normalize::repair;
use crate::schedule::assign_rotation;

/// Two housemates sharing one house, a weekly chore and a welcome note.
/// Nobody is signed in.
pub fn demo_store(env: &mut Env<'_>) -> Store {
    let mut alex = User::new(env.new_id(), "Alex".into(), "alex@example.com".into());
    let mut sam = User::new(env.new_id(), "Sam".into(), "sam@example.com".into());
    sam.avatar_color = "#C98B6B".into();
    sam.tagline = "Plants and playlists".into();

    let house_id = env.new_id();
    alex.house_id = Some(house_id.clone());
    sam.house_id = Some(house_id.clone());
    let house = House {
        id: house_id.clone(),
        name: "Maple Street".into(),
        invite_code: generate_invite_code(env, &HashSet::new()),
        currency: default_currency(),
        member_ids: vec![alex.id.clone(), sam.id.clone()],
        admin_id: alex.id.clone(),
        admin_wp_id: None,
    };

    let mut chore = Chore {
        id: env.new_id(),
        house_id: house_id.clone(),
        title: "Take out the bins".into(),
        notes: "Recycling goes out on even weeks.".into(),
        cadence_days: 7,
        start_at: env.now,
        end_at: None,
        rotation: vec![alex.id.clone(), sam.id.clone()],
        rotation_index: 0,
        assignee_id: None,
        due_at: add_days(env.now, 1).unwrap_or(env.now),
        checklist: vec![ChecklistItem {
            id: env.new_id(),
            label: "Rinse the recycling".into(),
            required: true,
            is_done: false,
        }],
        state: ChoreState::Active,
    };
    assign_rotation(&mut chore);

    let note = Note {
        id: env.new_id(),
        house_id,
        author_id: alex.id.clone(),
        text: "Welcome home! Add your chores and guests here.".into(),
        created_at: env.now,
        pinned: true,
    };

    let mut store = Store {
        db: Db {
            users: vec![alex, sam],
            houses: vec![house],
            chores: vec![chore],
            notes: vec![note],
            ..Db::default()
        },
        ..Store::default()
    };
    repair(&mut store, env);
    store
}
