//! crates/hearth_core/src/action.rs
//!
//! Every intent the UI can dispatch into the store.
//!
//! On the wire an action is `{ "type": "JOIN_HOUSE", "payload": { ... } }`.

use serde::{Deserialize, Serialize};

use crate::domain::{ExpenseKind, Notifications, Status, Theme, Visibility};
use crate::reconcile::RemoteHouse;

/// Optional identity details supplied by the sign-in collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub wp_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistDraft {
    /// Present when editing an existing item; its done flag is kept.
    #[serde(default)]
    pub id: Option<String>,
    pub label: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    // --- Session ---
    Login {
        email: String,
        #[serde(default)]
        profile: Option<Profile>,
    },
    Signup {
        name: String,
        email: String,
        #[serde(default)]
        profile: Option<Profile>,
    },
    Logout,
    SetTheme {
        theme: Theme,
    },
    #[serde(rename_all = "camelCase")]
    UpdateProfile {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        tagline: Option<String>,
        #[serde(default)]
        avatar_color: Option<String>,
        #[serde(default)]
        avatar_preset: Option<String>,
        #[serde(default)]
        photo: Option<String>,
        #[serde(default)]
        phone: Option<String>,
        #[serde(default)]
        paypal: Option<String>,
        #[serde(default)]
        venmo: Option<String>,
        #[serde(default)]
        notifications: Option<Notifications>,
    },

    // --- Houses ---
    #[serde(rename_all = "camelCase")]
    CreateHouse {
        #[serde(default)]
        id: Option<String>,
        name: String,
        #[serde(default)]
        invite_code: Option<String>,
        #[serde(default)]
        currency: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    JoinHouse {
        #[serde(default)]
        invite_code: Option<String>,
        #[serde(default)]
        house: Option<RemoteHouse>,
    },
    SyncRemoteHouses {
        houses: Vec<RemoteHouse>,
    },
    #[serde(rename_all = "camelCase")]
    LeaveHouse {
        user_id: String,
    },
    #[serde(rename_all = "camelCase")]
    TransferAdmin {
        #[serde(default)]
        house_id: Option<String>,
        user_id: String,
    },
    #[serde(rename_all = "camelCase")]
    RegenerateInvite {
        #[serde(default)]
        house_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    RenameHouse {
        #[serde(default)]
        house_id: Option<String>,
        name: String,
    },
    #[serde(rename_all = "camelCase")]
    SetHouseCurrency {
        #[serde(default)]
        house_id: Option<String>,
        currency: String,
    },

    // --- Chores ---
    #[serde(rename_all = "camelCase")]
    AddChore {
        title: String,
        #[serde(default)]
        notes: Option<String>,
        cadence_days: u32,
        #[serde(default)]
        start_at: Option<String>,
        #[serde(default)]
        end_at: Option<String>,
        #[serde(default)]
        rotation: Vec<String>,
        #[serde(default)]
        checklist: Vec<ChecklistDraft>,
    },
    /// `end_at: Some("")` clears the end date.
    #[serde(rename_all = "camelCase")]
    UpdateChore {
        id: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        notes: Option<String>,
        #[serde(default)]
        cadence_days: Option<u32>,
        #[serde(default)]
        end_at: Option<String>,
        #[serde(default)]
        rotation: Option<Vec<String>>,
        #[serde(default)]
        checklist: Option<Vec<ChecklistDraft>>,
    },
    #[serde(rename_all = "camelCase")]
    ToggleChoreItem {
        chore_id: String,
        item_id: String,
    },
    #[serde(rename_all = "camelCase")]
    CompleteChore {
        chore_id: String,
        #[serde(default)]
        user_id: Option<String>,
    },
    DeleteChore {
        id: String,
    },

    // --- Status ---
    #[serde(rename_all = "camelCase")]
    SetStatus {
        user_id: String,
        status: Status,
        #[serde(default)]
        until: Option<String>,
        #[serde(default)]
        note: Option<String>,
    },
    CheckDndExpiry,

    // --- Guests ---
    #[serde(rename_all = "camelCase")]
    AddGuest {
        name: String,
        arrives_at: String,
        #[serde(default)]
        note: Option<String>,
        #[serde(default)]
        host_id: Option<String>,
    },
    RemoveGuest {
        id: String,
    },

    // --- Notes ---
    AddNote {
        text: String,
        #[serde(default)]
        pinned: Option<bool>,
    },
    ToggleNotePin {
        id: String,
    },
    DeleteNote {
        id: String,
    },

    // --- To-do lists ---
    #[serde(rename_all = "camelCase")]
    AddTodoList {
        title: String,
        #[serde(default)]
        visibility: Visibility,
        #[serde(default)]
        member_ids: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    UpdateTodoList {
        id: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        visibility: Option<Visibility>,
        #[serde(default)]
        member_ids: Option<Vec<String>>,
    },
    #[serde(rename_all = "camelCase")]
    AddTodoTask {
        list_id: String,
        title: String,
    },
    #[serde(rename_all = "camelCase")]
    ToggleTodoTask {
        list_id: String,
        task_id: String,
    },
    #[serde(rename_all = "camelCase")]
    RemoveTodoTask {
        list_id: String,
        task_id: String,
    },
    DeleteTodoList {
        id: String,
    },

    // --- Expenses ---
    #[serde(rename_all = "camelCase")]
    AddExpense {
        title: String,
        amount: f64,
        #[serde(default)]
        category: Option<String>,
        #[serde(rename = "type", default)]
        kind: ExpenseKind,
        #[serde(default)]
        payer_id: Option<String>,
        #[serde(default)]
        participant_ids: Option<Vec<String>>,
        #[serde(default)]
        note: Option<String>,
    },
    DeleteExpense {
        id: String,
    },

    DismissToast,
}

impl Action {
    /// The wire tag, used for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Login { .. } => "LOGIN",
            Self::Signup { .. } => "SIGNUP",
            Self::Logout => "LOGOUT",
            Self::SetTheme { .. } => "SET_THEME",
            Self::UpdateProfile { .. } => "UPDATE_PROFILE",
            Self::CreateHouse { .. } => "CREATE_HOUSE",
            Self::JoinHouse { .. } => "JOIN_HOUSE",
            Self::SyncRemoteHouses { .. } => "SYNC_REMOTE_HOUSES",
            Self::LeaveHouse { .. } => "LEAVE_HOUSE",
            Self::TransferAdmin { .. } => "TRANSFER_ADMIN",
            Self::RegenerateInvite { .. } => "REGENERATE_INVITE",
            Self::RenameHouse { .. } => "RENAME_HOUSE",
            Self::SetHouseCurrency { .. } => "SET_HOUSE_CURRENCY",
            Self::AddChore { .. } => "ADD_CHORE",
            Self::UpdateChore { .. } => "UPDATE_CHORE",
            Self::ToggleChoreItem { .. } => "TOGGLE_CHORE_ITEM",
            Self::CompleteChore { .. } => "COMPLETE_CHORE",
            Self::DeleteChore { .. } => "DELETE_CHORE",
            Self::SetStatus { .. } => "SET_STATUS",
            Self::CheckDndExpiry => "CHECK_DND_EXPIRY",
            Self::AddGuest { .. } => "ADD_GUEST",
            Self::RemoveGuest { .. } => "REMOVE_GUEST",
            Self::AddNote { .. } => "ADD_NOTE",
            Self::ToggleNotePin { .. } => "TOGGLE_NOTE_PIN",
            Self::DeleteNote { .. } => "DELETE_NOTE",
            Self::AddTodoList { .. } => "ADD_TODO_LIST",
            Self::UpdateTodoList { .. } => "UPDATE_TODO_LIST",
            Self::AddTodoTask { .. } => "ADD_TODO_TASK",
            Self::ToggleTodoTask { .. } => "TOGGLE_TODO_TASK",
            Self::RemoveTodoTask { .. } => "REMOVE_TODO_TASK",
            Self::DeleteTodoList { .. } => "DELETE_TODO_LIST",
            Self::AddExpense { .. } => "ADD_EXPENSE",
            Self::DeleteExpense { .. } => "DELETE_EXPENSE",
            Self::DismissToast => "DISMISS_TOAST",
        }
    }
}
