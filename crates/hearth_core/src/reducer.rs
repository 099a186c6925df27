//! crates/hearth_core/src/reducer.rs
//!
//! The single transition function of the store.
//!
//! `reduce` never fails: a handler that refuses an action returns a
//! [`Rejection`], and the caller gets the previous state back with the
//! rejection's message as the toast.

use std::mem;

use tracing::{debug, info};

use crate::action::{Action, ChecklistDraft, Profile};
use crate::domain::{
    ChecklistItem, Chore, ChoreState, Expense, ExpenseKind, Guest, House, Note, Notifications,
    Status, Store, Theme, TodoList, TodoTask, User, View, Visibility, NOTE_LIMIT,
};
use crate::ids::{iso, parse_timestamp, Env};
use crate::invite::{generate_invite_code, normalize_code};
use crate::membership::{
    claim_members, codes_in_use, detach_member, ensure_unique_invite_codes, Detached,
};
use crate::reconcile::{merge_remote_house, normalize_currency, RemoteHouse};
use crate::schedule::{assign_rotation, complete_chore, CompletionBlocked};

//=========================================================================================
// Rejections
//=========================================================================================

/// Why an action left the state unchanged. The message is shown as a toast.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Permission(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
}

impl Rejection {
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Permission(_) => "permission",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
        }
    }
}

impl From<CompletionBlocked> for Rejection {
    fn from(blocked: CompletionBlocked) -> Self {
        match blocked {
            CompletionBlocked::Ended => Self::Conflict(blocked.to_string()),
            CompletionBlocked::NotAssignee => Self::Permission(blocked.to_string()),
        }
    }
}

type Outcome = Result<Store, Rejection>;

fn validation(message: impl Into<String>) -> Rejection {
    Rejection::Validation(message.into())
}

fn not_found(message: impl Into<String>) -> Rejection {
    Rejection::NotFound(message.into())
}

//=========================================================================================
// Entry point
//=========================================================================================

/// Applies `action` to `state`, returning the next state.
pub fn reduce(state: &Store, action: Action, env: &mut Env<'_>) -> Store {
    let kind = action.kind();
    let mut next = state.clone();
    next.toast = None;

    match apply(next, action, env) {
        Ok(store) => store,
        Err(rejection) => {
            debug!(
                action = kind,
                category = rejection.category(),
                reason = %rejection,
                "action rejected"
            );
            let mut unchanged = state.clone();
            unchanged.toast = Some(rejection.to_string());
            unchanged
        }
    }
}

fn apply(s: Store, action: Action, env: &mut Env<'_>) -> Outcome {
    match action {
        Action::Login { email, profile } => login(s, &email, profile),
        Action::Signup {
            name,
            email,
            profile,
        } => signup(s, &name, &email, profile, env),
        Action::Logout => Ok(logout(s)),
        Action::SetTheme { theme } => Ok(set_theme(s, theme)),
        Action::UpdateProfile {
            name,
            tagline,
            avatar_color,
            avatar_preset,
            photo,
            phone,
            paypal,
            venmo,
            notifications,
        } => update_profile(
            s,
            ProfilePatch {
                name,
                tagline,
                avatar_color,
                avatar_preset,
                photo,
                phone,
                paypal,
                venmo,
                notifications,
            },
        ),

        Action::CreateHouse {
            id,
            name,
            invite_code,
            currency,
        } => create_house(s, id, &name, invite_code, currency, env),
        Action::JoinHouse { invite_code, house } => join_house(s, invite_code, house, env),
        Action::SyncRemoteHouses { houses } => Ok(sync_remote_houses(s, &houses, env)),
        Action::LeaveHouse { user_id } => leave_house(s, &user_id),
        Action::TransferAdmin { house_id, user_id } => transfer_admin(s, house_id, &user_id),
        Action::RegenerateInvite { house_id } => regenerate_invite(s, house_id, env),
        Action::RenameHouse { house_id, name } => rename_house(s, house_id, &name),
        Action::SetHouseCurrency { house_id, currency } => set_house_currency(s, house_id, &currency),

        Action::AddChore {
            title,
            notes,
            cadence_days,
            start_at,
            end_at,
            rotation,
            checklist,
        } => add_chore(
            s,
            ChoreDraft {
                title,
                notes,
                cadence_days,
                start_at,
                end_at,
                rotation,
                checklist,
            },
            env,
        ),
        Action::UpdateChore {
            id,
            title,
            notes,
            cadence_days,
            end_at,
            rotation,
            checklist,
        } => update_chore(
            s,
            &id,
            ChorePatch {
                title,
                notes,
                cadence_days,
                end_at,
                rotation,
                checklist,
            },
            env,
        ),
        Action::ToggleChoreItem { chore_id, item_id } => toggle_chore_item(s, &chore_id, &item_id),
        Action::CompleteChore { chore_id, user_id } => complete(s, &chore_id, user_id),
        Action::DeleteChore { id } => delete_chore(s, &id),

        Action::SetStatus {
            user_id,
            status,
            until,
            note,
        } => set_status(s, &user_id, status, until, note),
        Action::CheckDndExpiry => Ok(check_dnd_expiry(s, env)),

        Action::AddGuest {
            name,
            arrives_at,
            note,
            host_id,
        } => add_guest(s, &name, &arrives_at, note, host_id, env),
        Action::RemoveGuest { id } => remove_guest(s, &id),

        Action::AddNote { text, pinned } => add_note(s, &text, pinned, env),
        Action::ToggleNotePin { id } => toggle_note_pin(s, &id),
        Action::DeleteNote { id } => delete_note(s, &id),

        Action::AddTodoList {
            title,
            visibility,
            member_ids,
        } => add_todo_list(s, &title, visibility, member_ids, env),
        Action::UpdateTodoList {
            id,
            title,
            visibility,
            member_ids,
        } => update_todo_list(s, &id, title, visibility, member_ids),
        Action::AddTodoTask { list_id, title } => add_todo_task(s, &list_id, &title, env),
        Action::ToggleTodoTask { list_id, task_id } => toggle_todo_task(s, &list_id, &task_id),
        Action::RemoveTodoTask { list_id, task_id } => remove_todo_task(s, &list_id, &task_id),
        Action::DeleteTodoList { id } => delete_todo_list(s, &id),

        Action::AddExpense {
            title,
            amount,
            category,
            kind,
            payer_id,
            participant_ids,
            note,
        } => add_expense(
            s,
            ExpenseDraft {
                title,
                amount,
                category,
                kind,
                payer_id,
                participant_ids,
                note,
            },
            env,
        ),
        Action::DeleteExpense { id } => delete_expense(s, &id),

        Action::DismissToast => Ok(s),
    }
}

//=========================================================================================
// Shared guards
//=========================================================================================

fn actor_id(s: &Store) -> Result<String, Rejection> {
    s.current_user()
        .map(|u| u.id.clone())
        .ok_or_else(|| Rejection::Permission("Sign in first".into()))
}

/// The current user's id and house id.
fn actor_in_house(s: &Store) -> Result<(String, String), Rejection> {
    let actor = actor_id(s)?;
    let house = s
        .house_of(&actor)
        .map(|h| h.id.clone())
        .ok_or_else(|| validation("Join or create a house first"))?;
    Ok((actor, house))
}

/// Resolves the target house and checks the current user administers it.
fn admin_house(s: &Store, house_id: Option<String>, verb: &str) -> Result<String, Rejection> {
    let actor = actor_id(s)?;
    let house_id = match house_id {
        Some(id) => id,
        None => s
            .house_of(&actor)
            .map(|h| h.id.clone())
            .ok_or_else(|| not_found("You are not in a house"))?,
    };
    let house = s
        .db
        .house(&house_id)
        .ok_or_else(|| not_found("That house no longer exists"))?;
    if !house.is_admin(&actor) {
        return Err(Rejection::Permission(format!("Only the admin can {verb}")));
    }
    Ok(house_id)
}

fn trimmed(raw: &str) -> Option<String> {
    let value = raw.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn route_view(s: &mut Store) {
    s.view = s.home_view();
}

/// Gives `wp_id` to `user_id`, taking it away from any other holder.
fn claim_wp_id(s: &mut Store, user_id: &str, wp_id: i64) {
    for user in s.db.users.iter_mut() {
        if user.id == user_id {
            user.wp_id = Some(wp_id);
        } else if user.wp_id == Some(wp_id) {
            user.wp_id = None;
        }
    }
}

//=========================================================================================
// Session
//=========================================================================================

fn login(mut s: Store, email: &str, profile: Option<Profile>) -> Outcome {
    let user_id = s
        .db
        .user_by_email(email)
        .map(|u| u.id.clone())
        .ok_or_else(|| not_found("No account found for that email"))?;

    if let Some(profile) = profile {
        if let Some(wp_id) = profile.wp_id {
            claim_wp_id(&mut s, &user_id, wp_id);
        }
        if let (Some(name), Some(user)) = (
            profile.name.as_deref().and_then(trimmed),
            s.db.user_mut(&user_id),
        ) {
            user.name = name;
        }
    }

    s.current_user_id = Some(user_id);
    route_view(&mut s);
    let name = s.current_user().map(|u| u.name.clone()).unwrap_or_default();
    s.toast = Some(format!("Welcome back, {name}"));
    Ok(s)
}

fn signup(mut s: Store, name: &str, email: &str, profile: Option<Profile>, env: &mut Env<'_>) -> Outcome {
    let name = trimmed(name).ok_or_else(|| validation("Enter your name"))?;
    let email = trimmed(email).ok_or_else(|| validation("Enter your email"))?;
    if s.db.user_by_email(&email).is_some() {
        return Err(Rejection::Conflict(
            "An account with that email already exists".into(),
        ));
    }

    let user = User::new(env.new_id(), name.clone(), email);
    let user_id = user.id.clone();
    s.db.users.push(user);
    if let Some(wp_id) = profile.and_then(|p| p.wp_id) {
        claim_wp_id(&mut s, &user_id, wp_id);
    }
    s.current_user_id = Some(user_id);
    s.view = View::Onboarding;
    s.toast = Some(format!("Welcome, {name}"));
    Ok(s)
}

fn logout(mut s: Store) -> Store {
    s.current_user_id = None;
    s.view = View::Auth;
    s
}

fn set_theme(mut s: Store, theme: Theme) -> Store {
    s.theme = theme;
    s
}

struct ProfilePatch {
    name: Option<String>,
    tagline: Option<String>,
    avatar_color: Option<String>,
    avatar_preset: Option<String>,
    photo: Option<String>,
    phone: Option<String>,
    paypal: Option<String>,
    venmo: Option<String>,
    notifications: Option<Notifications>,
}

fn update_profile(mut s: Store, patch: ProfilePatch) -> Outcome {
    let actor = actor_id(&s)?;
    let name = match patch.name {
        Some(raw) => Some(trimmed(&raw).ok_or_else(|| validation("Name cannot be empty"))?),
        None => None,
    };
    let user = s
        .db
        .user_mut(&actor)
        .ok_or_else(|| not_found("Unknown user"))?;

    if let Some(name) = name {
        user.name = name;
    }
    let text_fields = [
        (patch.tagline, &mut user.tagline),
        (patch.avatar_color, &mut user.avatar_color),
        (patch.avatar_preset, &mut user.avatar_preset),
        (patch.phone, &mut user.phone),
        (patch.paypal, &mut user.paypal),
        (patch.venmo, &mut user.venmo),
    ];
    for (value, field) in text_fields {
        if let Some(value) = value {
            *field = value.trim().to_string();
        }
    }
    if let Some(photo) = patch.photo {
        user.photo = (!photo.is_empty()).then_some(photo);
    }
    if let Some(notifications) = patch.notifications {
        user.notifications = notifications;
    }
    s.toast = Some("Profile updated".into());
    Ok(s)
}

//=========================================================================================
// Houses
//=========================================================================================

fn create_house(
    mut s: Store,
    id: Option<String>,
    name: &str,
    invite_code: Option<String>,
    currency: Option<String>,
    env: &mut Env<'_>,
) -> Outcome {
    let actor = actor_id(&s)?;
    let name = trimmed(name).ok_or_else(|| validation("Give your house a name"))?;
    let currency = match currency.as_deref().and_then(trimmed) {
        Some(raw) => normalize_currency(&raw)
            .ok_or_else(|| validation("Currency must be a 3-letter code"))?,
        None => crate::domain::default_currency(),
    };
    let house_id = match id.as_deref().and_then(trimmed) {
        Some(id) if s.db.house(&id).is_some() => {
            return Err(Rejection::Conflict("That house already exists".into()));
        }
        Some(id) => id,
        None => env.new_id(),
    };

    let taken = codes_in_use(&s.db, None);
    let invite_code = match invite_code.as_deref().map(normalize_code) {
        Some(code) if !code.is_empty() && !taken.contains(&code) => code,
        _ => generate_invite_code(env, &taken),
    };

    let wp_id = s.db.user(&actor).and_then(|u| u.wp_id);
    s.db.houses.push(House {
        id: house_id.clone(),
        name: name.clone(),
        invite_code,
        currency,
        member_ids: vec![actor.clone()],
        admin_id: actor.clone(),
        admin_wp_id: wp_id,
    });
    claim_members(&mut s.db, &house_id);
    if let Some(user) = s.db.user_mut(&actor) {
        user.house_id = Some(house_id.clone());
    }

    info!(house_id = %house_id, "house created");
    s.view = View::Dashboard;
    s.toast = Some(format!("Created {name}"));
    Ok(s)
}

fn join_house(
    mut s: Store,
    invite_code: Option<String>,
    remote: Option<RemoteHouse>,
    env: &mut Env<'_>,
) -> Outcome {
    let actor = actor_id(&s)?;

    let house_id = match remote.filter(|r| r.house_id().is_some()) {
        Some(remote) => {
            let fallback = remote.house_id().and_then(|id| s.db.house(&id).cloned());
            let users = mem::take(&mut s.db.users);
            let merged = merge_remote_house(&remote, users, fallback.as_ref(), Some(&actor), env);
            s.db.users = merged.users;
            let house = merged
                .house
                .ok_or_else(|| not_found("That house could not be found"))?;
            let id = house.id.clone();
            s.db.upsert_house(house);
            ensure_unique_invite_codes(&mut s.db, &[id.clone()], env);
            id
        }
        None => {
            let code = invite_code
                .as_deref()
                .map(normalize_code)
                .filter(|c| !c.is_empty())
                .ok_or_else(|| validation("Enter an invite code"))?;
            let house = s
                .db
                .house_by_invite(&code)
                .ok_or_else(|| not_found("No house matches that invite code"))?;
            let id = house.id.clone();
            if let Some(house) = s.db.house_mut(&id).filter(|h| !h.has_member(&actor)) {
                house.member_ids.push(actor.clone());
                if !house.has_member(&house.admin_id) {
                    house.admin_id = house.member_ids[0].clone();
                }
            }
            id
        }
    };

    claim_members(&mut s.db, &house_id);
    if let Some(user) = s.db.user_mut(&actor) {
        user.house_id = Some(house_id.clone());
    }
    s.view = View::Dashboard;
    let name = s.db.house(&house_id).map(|h| h.name.clone()).unwrap_or_default();
    s.toast = Some(format!("Joined {name}"));
    Ok(s)
}

/// Remote is authoritative for the membership of every house it returns and,
/// for the current user, of every house they were in locally.
fn sync_remote_houses(mut s: Store, houses: &[RemoteHouse], env: &mut Env<'_>) -> Store {
    let me = s.current_user_id.clone();
    let mut synced: Vec<String> = Vec::new();

    for remote in houses {
        let Some(house_id) = remote.house_id() else {
            debug!("skipping remote house without an id");
            continue;
        };
        let fallback = s.db.house(&house_id).cloned();
        let users = mem::take(&mut s.db.users);
        let merged = merge_remote_house(remote, users, fallback.as_ref(), me.as_deref(), env);
        s.db.users = merged.users;
        match merged.house {
            Some(house) => {
                s.db.upsert_house(house);
                claim_members(&mut s.db, &house_id);
                if !synced.contains(&house_id) {
                    synced.push(house_id);
                }
            }
            None => debug!(house_id = %house_id, "remote house left without members"),
        }
    }
    synced.retain(|id| s.db.house(id).is_some());

    if let Some(me) = me.as_deref() {
        let stale: Vec<String> = s
            .db
            .houses
            .iter()
            .filter(|h| !synced.contains(&h.id) && h.has_member(me))
            .map(|h| h.id.clone())
            .collect();
        for house_id in &stale {
            detach_member(&mut s.db, house_id, me);
        }
        let home = s
            .db
            .houses
            .iter()
            .find(|h| h.has_member(me))
            .map(|h| h.id.clone());
        if let Some(user) = s.db.user_mut(me) {
            user.house_id = home;
        }
        route_view(&mut s);
    }

    ensure_unique_invite_codes(&mut s.db, &synced, env);
    info!(received = houses.len(), synced = synced.len(), "remote houses reconciled");
    s
}

fn leave_house(mut s: Store, user_id: &str) -> Outcome {
    let user = s.db.user(user_id).ok_or_else(|| not_found("Unknown member"))?;
    let house_id = user
        .house_id
        .clone()
        .ok_or_else(|| not_found("Not currently in a house"))?;
    let user_name = user.name.clone();
    let house_name = s
        .db
        .house(&house_id)
        .map(|h| h.name.clone())
        .unwrap_or_default();

    let handoff = match detach_member(&mut s.db, &house_id, user_id) {
        Detached::Remaining {
            new_admin: Some(heir),
        } => s
            .db
            .user(&heir)
            .map(|u| format!(". {} is now the admin", u.name))
            .unwrap_or_default(),
        _ => String::new(),
    };
    if let Some(user) = s.db.user_mut(user_id) {
        user.house_id = None;
        user.set_presence(Status::Home, None);
    }

    if s.current_user_id.as_deref() == Some(user_id) {
        route_view(&mut s);
        s.toast = Some(format!("You left {house_name}{handoff}"));
    } else {
        s.toast = Some(format!("{user_name} left {house_name}{handoff}"));
    }
    Ok(s)
}

fn transfer_admin(mut s: Store, house_id: Option<String>, user_id: &str) -> Outcome {
    let house_id = admin_house(&s, house_id, "transfer the admin role")?;
    let wp_id = s.db.user(user_id).and_then(|u| u.wp_id);
    let name = s.db.user(user_id).map(|u| u.name.clone()).unwrap_or_default();
    let house = s
        .db
        .house_mut(&house_id)
        .ok_or_else(|| not_found("That house no longer exists"))?;
    if !house.has_member(user_id) {
        return Err(not_found("That person is not a member of this house"));
    }
    house.admin_id = user_id.to_string();
    house.admin_wp_id = wp_id;
    s.toast = Some(format!("{name} is now the admin"));
    Ok(s)
}

fn regenerate_invite(mut s: Store, house_id: Option<String>, env: &mut Env<'_>) -> Outcome {
    let house_id = admin_house(&s, house_id, "regenerate the invite code")?;
    // Includes this house's current code so the new one always differs.
    let taken = codes_in_use(&s.db, None);
    let code = generate_invite_code(env, &taken);
    if let Some(house) = s.db.house_mut(&house_id) {
        house.invite_code = code;
    }
    s.toast = Some("New invite code ready".into());
    Ok(s)
}

fn rename_house(mut s: Store, house_id: Option<String>, name: &str) -> Outcome {
    let house_id = admin_house(&s, house_id, "rename the house")?;
    let name = trimmed(name).ok_or_else(|| validation("House name cannot be empty"))?;
    if let Some(house) = s.db.house_mut(&house_id) {
        house.name = name;
    }
    s.toast = Some("House renamed".into());
    Ok(s)
}

fn set_house_currency(mut s: Store, house_id: Option<String>, currency: &str) -> Outcome {
    let house_id = admin_house(&s, house_id, "change the currency")?;
    let currency =
        normalize_currency(currency).ok_or_else(|| validation("Currency must be a 3-letter code"))?;
    s.toast = Some(format!("Currency set to {currency}"));
    if let Some(house) = s.db.house_mut(&house_id) {
        house.currency = currency;
    }
    Ok(s)
}

//=========================================================================================
// Chores
//=========================================================================================

struct ChoreDraft {
    title: String,
    notes: Option<String>,
    cadence_days: u32,
    start_at: Option<String>,
    end_at: Option<String>,
    rotation: Vec<String>,
    checklist: Vec<ChecklistDraft>,
}

struct ChorePatch {
    title: Option<String>,
    notes: Option<String>,
    cadence_days: Option<u32>,
    end_at: Option<String>,
    rotation: Option<Vec<String>>,
    checklist: Option<Vec<ChecklistDraft>>,
}

fn dedupe(ids: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(id) = trimmed(&id) {
            if !out.contains(&id) {
                out.push(id);
            }
        }
    }
    out
}

fn build_checklist(
    drafts: Vec<ChecklistDraft>,
    previous: &[ChecklistItem],
    env: &mut Env<'_>,
) -> Vec<ChecklistItem> {
    drafts
        .into_iter()
        .filter_map(|draft| {
            let label = trimmed(&draft.label)?;
            let existing = draft
                .id
                .as_deref()
                .and_then(|id| previous.iter().find(|item| item.id == id));
            Some(match existing {
                Some(item) => ChecklistItem {
                    label,
                    required: draft.required,
                    ..item.clone()
                },
                None => ChecklistItem {
                    id: env.new_id(),
                    label,
                    required: draft.required,
                    is_done: false,
                },
            })
        })
        .collect()
}

fn add_chore(mut s: Store, draft: ChoreDraft, env: &mut Env<'_>) -> Outcome {
    let (_, house_id) = actor_in_house(&s)?;
    let title = trimmed(&draft.title).ok_or_else(|| validation("Give the chore a title"))?;
    if draft.cadence_days == 0 {
        return Err(validation("Repeat every 1 day or more"));
    }
    let start_at = match draft.start_at.as_deref().and_then(trimmed) {
        Some(raw) => parse_timestamp(&raw).ok_or_else(|| validation("Pick a valid start date"))?,
        None => env.now,
    };
    let end_at = match draft.end_at.as_deref().and_then(trimmed) {
        Some(raw) => Some(parse_timestamp(&raw).ok_or_else(|| validation("Pick a valid end date"))?),
        None => None,
    };
    if end_at.is_some_and(|end| end < start_at) {
        return Err(validation("The end date is before the start date"));
    }

    let mut chore = Chore {
        id: env.new_id(),
        house_id,
        title: title.clone(),
        notes: draft.notes.unwrap_or_default().trim().to_string(),
        cadence_days: draft.cadence_days,
        start_at,
        end_at,
        rotation: dedupe(draft.rotation),
        rotation_index: 0,
        assignee_id: None,
        due_at: start_at,
        checklist: build_checklist(draft.checklist, &[], env),
        state: ChoreState::Active,
    };
    assign_rotation(&mut chore);
    s.db.chores.push(chore);
    s.toast = Some(format!("Added {title}"));
    Ok(s)
}

fn update_chore(mut s: Store, id: &str, patch: ChorePatch, env: &mut Env<'_>) -> Outcome {
    let title = match patch.title {
        Some(raw) => Some(trimmed(&raw).ok_or_else(|| validation("Give the chore a title"))?),
        None => None,
    };
    if patch.cadence_days == Some(0) {
        return Err(validation("Repeat every 1 day or more"));
    }
    let end_at = match patch.end_at.as_deref().map(str::trim) {
        Some("") => Some(None),
        Some(raw) => Some(Some(
            parse_timestamp(raw).ok_or_else(|| validation("Pick a valid end date"))?,
        )),
        None => None,
    };

    let chore = s
        .db
        .chore_mut(id)
        .filter(|c| !c.house_id.is_empty())
        .ok_or_else(|| not_found("That chore no longer exists"))?;
    if let Some(title) = title {
        chore.title = title;
    }
    if let Some(notes) = patch.notes {
        chore.notes = notes.trim().to_string();
    }
    if let Some(cadence) = patch.cadence_days {
        chore.cadence_days = cadence;
    }
    if let Some(end_at) = end_at {
        chore.end_at = end_at;
    }
    if let Some(rotation) = patch.rotation {
        chore.rotation = dedupe(rotation);
        assign_rotation(chore);
    }
    if let Some(drafts) = patch.checklist {
        let previous = mem::take(&mut chore.checklist);
        chore.checklist = build_checklist(drafts, &previous, env);
    }
    s.toast = Some("Chore updated".into());
    Ok(s)
}

fn toggle_chore_item(mut s: Store, chore_id: &str, item_id: &str) -> Outcome {
    let chore = s
        .db
        .chore_mut(chore_id)
        .filter(|c| !c.house_id.is_empty())
        .ok_or_else(|| not_found("That chore no longer exists"))?;
    let item = chore
        .checklist
        .iter_mut()
        .find(|item| item.id == item_id)
        .ok_or_else(|| not_found("That checklist item no longer exists"))?;
    item.is_done = !item.is_done;
    Ok(s)
}

/// Completes the signed-in user's turn. A `user_id` naming anyone else is
/// refused rather than acted on.
fn complete(mut s: Store, chore_id: &str, user_id: Option<String>) -> Outcome {
    let actor = actor_id(&s)?;
    if user_id.is_some_and(|id| id != actor) {
        return Err(Rejection::Permission(
            "You can only complete your own turn".into(),
        ));
    }
    let chore = s
        .db
        .chores
        .iter()
        .find(|c| c.id == chore_id && !c.house_id.is_empty())
        .ok_or_else(|| not_found("That chore no longer exists"))?;
    let done = complete_chore(chore, &actor)?;

    let message = match done.state {
        ChoreState::Ended => format!("{} is finished", done.title),
        ChoreState::Active => {
            let next = done
                .assignee_id
                .as_deref()
                .and_then(|id| s.db.user(id))
                .map(|u| u.name.clone())
                .unwrap_or_else(|| "nobody".into());
            format!("Nice! {} is up next for {}", next, done.title)
        }
    };
    debug!(chore_id, next_due = %iso(done.due_at), state = ?done.state, "chore completed");
    if let Some(slot) = s.db.chore_mut(chore_id) {
        *slot = done;
    }
    s.toast = Some(message);
    Ok(s)
}

fn delete_chore(mut s: Store, id: &str) -> Outcome {
    let before = s.db.chores.len();
    s.db.chores.retain(|c| c.id != id);
    if s.db.chores.len() == before {
        return Err(not_found("That chore no longer exists"));
    }
    s.toast = Some("Chore removed".into());
    Ok(s)
}

//=========================================================================================
// Status
//=========================================================================================

fn set_status(
    mut s: Store,
    user_id: &str,
    status: Status,
    until: Option<String>,
    note: Option<String>,
) -> Outcome {
    let user = s
        .db
        .user_mut(user_id)
        .ok_or_else(|| not_found("Unknown member"))?;
    let until = until.as_deref().and_then(parse_timestamp);
    user.set_presence(status, until);
    if let Some(note) = note {
        user.status_note = note.trim().to_string();
    }
    Ok(s)
}

fn check_dnd_expiry(mut s: Store, env: &Env<'_>) -> Store {
    for user in s.db.users.iter_mut().filter(|u| u.is_dnd()) {
        let expired = user.dnd_until.map_or(true, |until| until <= env.now);
        if expired {
            user.set_presence(Status::Home, None);
        }
    }
    s
}

//=========================================================================================
// Guests
//=========================================================================================

fn add_guest(
    mut s: Store,
    name: &str,
    arrives_at: &str,
    note: Option<String>,
    host_id: Option<String>,
    env: &mut Env<'_>,
) -> Outcome {
    let host_id = match host_id {
        Some(id) => id,
        None => actor_id(&s)?,
    };
    let name = trimmed(name).ok_or_else(|| validation("Who is visiting?"))?;
    let arrives_at = parse_timestamp(arrives_at).ok_or_else(|| validation("Pick a valid arrival time"))?;
    let host = s.db.user(&host_id).ok_or_else(|| not_found("Unknown host"))?;
    let house_id = host
        .house_id
        .clone()
        .ok_or_else(|| validation("Join or create a house first"))?;

    if let (true, Some(until)) = (host.is_dnd(), host.dnd_until) {
        if arrives_at <= until {
            return Err(Rejection::Conflict(format!(
                "{} is on Do Not Disturb until {}",
                host.name,
                until.format("%b %-d, %H:%M")
            )));
        }
    }

    s.db.guests.push(Guest {
        id: env.new_id(),
        house_id,
        name: name.clone(),
        arrives_at,
        note: note.unwrap_or_default().trim().to_string(),
        host_id,
    });
    s.toast = Some(format!("{name} added to the guest list"));
    Ok(s)
}

fn remove_guest(mut s: Store, id: &str) -> Outcome {
    let before = s.db.guests.len();
    s.db.guests.retain(|g| g.id != id);
    if s.db.guests.len() == before {
        return Err(not_found("That guest is no longer listed"));
    }
    Ok(s)
}

//=========================================================================================
// Notes
//=========================================================================================

fn add_note(mut s: Store, text: &str, pinned: Option<bool>, env: &mut Env<'_>) -> Outcome {
    let (author_id, house_id) = actor_in_house(&s)?;
    let text = trimmed(text).ok_or_else(|| validation("Write something first"))?;

    let existing = s
        .db
        .notes
        .iter()
        .position(|n| n.house_id == house_id && n.author_id == author_id);
    let note = match existing {
        Some(position) => {
            let mut note = s.db.notes.remove(position);
            note.text = text;
            note.created_at = env.now;
            if let Some(pinned) = pinned {
                note.pinned = pinned;
            }
            note
        }
        None => Note {
            id: env.new_id(),
            house_id,
            author_id,
            text,
            created_at: env.now,
            pinned: pinned.unwrap_or(false),
        },
    };
    s.db.notes.insert(0, note);
    s.db.notes.truncate(NOTE_LIMIT);
    s.toast = Some("Note posted".into());
    Ok(s)
}

fn toggle_note_pin(mut s: Store, id: &str) -> Outcome {
    let note = s
        .db
        .notes
        .iter_mut()
        .find(|n| n.id == id)
        .ok_or_else(|| not_found("That note no longer exists"))?;
    note.pinned = !note.pinned;
    Ok(s)
}

fn delete_note(mut s: Store, id: &str) -> Outcome {
    let before = s.db.notes.len();
    s.db.notes.retain(|n| n.id != id);
    if s.db.notes.len() == before {
        return Err(not_found("That note no longer exists"));
    }
    Ok(s)
}

//=========================================================================================
// To-do lists
//=========================================================================================

fn list_members(owner: &str, visibility: Visibility, requested: Vec<String>) -> Vec<String> {
    match visibility {
        Visibility::Personal => vec![owner.to_string()],
        Visibility::Shared => {
            let mut ids = vec![owner.to_string()];
            ids.extend(requested);
            dedupe(ids)
        }
    }
}

fn add_todo_list(
    mut s: Store,
    title: &str,
    visibility: Visibility,
    member_ids: Vec<String>,
    env: &mut Env<'_>,
) -> Outcome {
    let owner = actor_id(&s)?;
    let title = trimmed(title).ok_or_else(|| validation("Give the list a title"))?;
    s.db.todo_lists.push(TodoList {
        id: env.new_id(),
        title,
        member_ids: list_members(&owner, visibility, member_ids),
        owner_id: owner,
        visibility,
        tasks: Vec::new(),
    });
    Ok(s)
}

fn update_todo_list(
    mut s: Store,
    id: &str,
    title: Option<String>,
    visibility: Option<Visibility>,
    member_ids: Option<Vec<String>>,
) -> Outcome {
    let title = match title {
        Some(raw) => Some(trimmed(&raw).ok_or_else(|| validation("Give the list a title"))?),
        None => None,
    };
    let list = s
        .db
        .todo_list_mut(id)
        .ok_or_else(|| not_found("That list no longer exists"))?;
    if let Some(title) = title {
        list.title = title;
    }
    if visibility.is_some() || member_ids.is_some() {
        let visibility = visibility.unwrap_or(list.visibility);
        let requested = member_ids.unwrap_or_else(|| list.member_ids.clone());
        list.member_ids = list_members(&list.owner_id, visibility, requested);
        list.visibility = visibility;
    }
    Ok(s)
}

fn add_todo_task(mut s: Store, list_id: &str, title: &str, env: &mut Env<'_>) -> Outcome {
    let title = trimmed(title).ok_or_else(|| validation("Describe the task"))?;
    let task_id = env.new_id();
    let list = s
        .db
        .todo_list_mut(list_id)
        .ok_or_else(|| not_found("That list no longer exists"))?;
    list.tasks.push(TodoTask {
        id: task_id,
        title,
        is_done: false,
    });
    Ok(s)
}

fn toggle_todo_task(mut s: Store, list_id: &str, task_id: &str) -> Outcome {
    let task = s
        .db
        .todo_list_mut(list_id)
        .and_then(|list| list.tasks.iter_mut().find(|t| t.id == task_id))
        .ok_or_else(|| not_found("That task no longer exists"))?;
    task.is_done = !task.is_done;
    Ok(s)
}

fn remove_todo_task(mut s: Store, list_id: &str, task_id: &str) -> Outcome {
    let list = s
        .db
        .todo_list_mut(list_id)
        .ok_or_else(|| not_found("That list no longer exists"))?;
    let before = list.tasks.len();
    list.tasks.retain(|t| t.id != task_id);
    if list.tasks.len() == before {
        return Err(not_found("That task no longer exists"));
    }
    Ok(s)
}

/// Deletes regardless of open tasks; the UI confirms completion first.
fn delete_todo_list(mut s: Store, id: &str) -> Outcome {
    let before = s.db.todo_lists.len();
    s.db.todo_lists.retain(|l| l.id != id);
    if s.db.todo_lists.len() == before {
        return Err(not_found("That list no longer exists"));
    }
    s.toast = Some("List deleted".into());
    Ok(s)
}

//=========================================================================================
// Expenses
//=========================================================================================

struct ExpenseDraft {
    title: String,
    amount: f64,
    category: Option<String>,
    kind: ExpenseKind,
    payer_id: Option<String>,
    participant_ids: Option<Vec<String>>,
    note: Option<String>,
}

fn add_expense(mut s: Store, draft: ExpenseDraft, env: &mut Env<'_>) -> Outcome {
    let (actor, house_id) = actor_in_house(&s)?;
    let title = trimmed(&draft.title).ok_or_else(|| validation("What was it for?"))?;
    if !(draft.amount.is_finite() && draft.amount > 0.0) {
        return Err(validation("Amount must be greater than zero"));
    }
    let payer_id = draft.payer_id.as_deref().and_then(trimmed).unwrap_or(actor);
    let participant_ids = match (draft.participant_ids.map(dedupe), draft.kind) {
        (Some(ids), _) if !ids.is_empty() => ids,
        (_, ExpenseKind::Shared) => s
            .db
            .house(&house_id)
            .map(|h| h.member_ids.clone())
            .unwrap_or_default(),
        (_, ExpenseKind::Personal) => vec![payer_id.clone()],
    };

    s.db.expenses.push(Expense {
        id: env.new_id(),
        house_id,
        title: title.clone(),
        amount: draft.amount,
        category: draft
            .category
            .as_deref()
            .and_then(trimmed)
            .unwrap_or_else(|| "general".into()),
        kind: draft.kind,
        payer_id,
        participant_ids,
        created_at: env.now,
        note: draft.note.unwrap_or_default().trim().to_string(),
    });
    s.toast = Some(format!("Logged {title}"));
    Ok(s)
}

fn delete_expense(mut s: Store, id: &str) -> Outcome {
    let before = s.db.expenses.len();
    s.db.expenses.retain(|e| e.id != id);
    if s.db.expenses.len() == before {
        return Err(not_found("That expense no longer exists"));
    }
    Ok(s)
}
