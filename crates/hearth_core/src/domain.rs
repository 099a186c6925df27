//! crates/hearth_core/src/domain.rs
//!
//! Defines the pure, core data structures of the household store.
//! Entities reference each other only by id; the root [`Store`] owns every
//! collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lenient;

/// Maximum number of notes the store keeps.
pub const NOTE_LIMIT: usize = 50;
pub const DEFAULT_CURRENCY: &str = "USD";

//=========================================================================================
// Users
//=========================================================================================

/// Presence status shown on the household dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    #[default]
    Home,
    Away,
    Out,
    Dnd,
}

impl Status {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "HOME" => Some(Self::Home),
            "AWAY" => Some(Self::Away),
            "OUT" => Some(Self::Out),
            "DND" => Some(Self::Dnd),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notifications {
    #[serde(default = "enabled")]
    pub push: bool,
    #[serde(default)]
    pub email: bool,
}

impl Default for Notifications {
    fn default() -> Self {
        Self {
            push: true,
            email: false,
        }
    }
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub house_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::status")]
    pub status: Status,
    #[serde(default, deserialize_with = "lenient::optional_time")]
    pub dnd_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status_note: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default = "default_avatar_color")]
    pub avatar_color: String,
    #[serde(default)]
    pub avatar_preset: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub notifications: Notifications,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub paypal: String,
    #[serde(default)]
    pub venmo: String,
    #[serde(default, deserialize_with = "lenient::optional_int")]
    pub wp_id: Option<i64>,
}

pub fn default_avatar_color() -> String {
    "#7C9A92".to_string()
}

impl User {
    /// A fresh user with every optional field at its default.
    pub fn new(id: String, name: String, email: String) -> Self {
        Self {
            id,
            name,
            email,
            house_id: None,
            status: Status::Home,
            dnd_until: None,
            status_note: String::new(),
            tagline: String::new(),
            avatar_color: default_avatar_color(),
            avatar_preset: String::new(),
            photo: None,
            notifications: Notifications::default(),
            phone: String::new(),
            paypal: String::new(),
            venmo: String::new(),
            wp_id: None,
        }
    }

    pub fn is_dnd(&self) -> bool {
        self.status == Status::Dnd
    }

    /// Applies a status change, refusing to hold DND without a deadline.
    pub fn set_presence(&mut self, status: Status, until: Option<DateTime<Utc>>) {
        match (status, until) {
            (Status::Dnd, Some(until)) => {
                self.status = Status::Dnd;
                self.dnd_until = Some(until);
            }
            (Status::Dnd, None) => {
                self.status = Status::Home;
                self.dnd_until = None;
            }
            (other, _) => {
                self.status = other;
                self.dnd_until = None;
            }
        }
    }
}

//=========================================================================================
// Houses
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct House {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub invite_code: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub member_ids: Vec<String>,
    #[serde(default)]
    pub admin_id: String,
    #[serde(default, deserialize_with = "lenient::optional_int")]
    pub admin_wp_id: Option<i64>,
}

pub fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl House {
    pub fn has_member(&self, user_id: &str) -> bool {
        self.member_ids.iter().any(|id| id == user_id)
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_id == user_id
    }
}

//=========================================================================================
// Chores
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChoreState {
    #[default]
    Active,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub is_done: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chore {
    pub id: String,
    pub house_id: String,
    pub title: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "one_day")]
    pub cadence_days: u32,
    #[serde(deserialize_with = "lenient::required_time")]
    pub start_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient::optional_time")]
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rotation: Vec<String>,
    #[serde(default)]
    pub rotation_index: usize,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(deserialize_with = "lenient::required_time")]
    pub due_at: DateTime<Utc>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default)]
    pub state: ChoreState,
}

fn one_day() -> u32 {
    1
}

//=========================================================================================
// Guests, notes, to-do lists, expenses
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    pub id: String,
    pub house_id: String,
    pub name: String,
    #[serde(deserialize_with = "lenient::required_time")]
    pub arrives_at: DateTime<Utc>,
    #[serde(default)]
    pub note: String,
    pub host_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub house_id: String,
    pub author_id: String,
    pub text: String,
    #[serde(deserialize_with = "lenient::required_time")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub pinned: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Personal,
    Shared,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub is_done: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoList {
    pub id: String,
    pub title: String,
    pub owner_id: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub member_ids: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<TodoTask>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseKind {
    #[default]
    Shared,
    Personal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub house_id: String,
    pub title: String,
    pub amount: f64,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "type", default)]
    pub kind: ExpenseKind,
    pub payer_id: String,
    #[serde(default)]
    pub participant_ids: Vec<String>,
    #[serde(deserialize_with = "lenient::required_time")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub note: String,
}

//=========================================================================================
// Root state
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum View {
    #[default]
    Auth,
    Onboarding,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Every entity collection the store owns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Db {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub houses: Vec<House>,
    #[serde(default)]
    pub chores: Vec<Chore>,
    #[serde(default)]
    pub guests: Vec<Guest>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub todo_lists: Vec<TodoList>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
}

impl Db {
    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn user_mut(&mut self, id: &str) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        let email = email.trim();
        self.users
            .iter()
            .find(|u| u.email.trim().eq_ignore_ascii_case(email))
    }

    pub fn house(&self, id: &str) -> Option<&House> {
        self.houses.iter().find(|h| h.id == id)
    }

    pub fn house_mut(&mut self, id: &str) -> Option<&mut House> {
        self.houses.iter_mut().find(|h| h.id == id)
    }

    pub fn house_by_invite(&self, code: &str) -> Option<&House> {
        let code = code.trim();
        self.houses
            .iter()
            .find(|h| !code.is_empty() && h.invite_code.eq_ignore_ascii_case(code))
    }

    pub fn chore_mut(&mut self, id: &str) -> Option<&mut Chore> {
        self.chores.iter_mut().find(|c| c.id == id)
    }

    pub fn todo_list_mut(&mut self, id: &str) -> Option<&mut TodoList> {
        self.todo_lists.iter_mut().find(|l| l.id == id)
    }

    /// Replaces the house with the same id, or appends it.
    pub fn upsert_house(&mut self, house: House) {
        match self.houses.iter_mut().find(|h| h.id == house.id) {
            Some(existing) => *existing = house,
            None => self.houses.push(house),
        }
    }
}

/// The full client-side state: collections plus session and UI routing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub db: Db,
    pub current_user_id: Option<String>,
    pub view: View,
    pub theme: Theme,
    #[serde(default)]
    pub toast: Option<String>,
}

impl Store {
    pub fn current_user(&self) -> Option<&User> {
        self.current_user_id
            .as_deref()
            .and_then(|id| self.db.user(id))
    }

    /// The house the given user currently belongs to.
    pub fn house_of(&self, user_id: &str) -> Option<&House> {
        self.db
            .user(user_id)
            .and_then(|u| u.house_id.as_deref())
            .and_then(|id| self.db.house(id))
    }

    /// The screen the current session belongs on.
    pub fn home_view(&self) -> View {
        match self.current_user() {
            None => View::Auth,
            Some(user) if user.house_id.is_some() => View::Dashboard,
            Some(_) => View::Onboarding,
        }
    }

    /// The persisted envelope: the store without its transient toast.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            db: self.db.clone(),
            current_user_id: self.current_user_id.clone(),
            view: self.view,
            theme: self.theme,
        }
    }
}

/// What the persistence collaborator writes and reads back at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub db: Db,
    pub current_user_id: Option<String>,
    pub view: View,
    pub theme: Theme,
}
