//! crates/hearth_core/src/reconcile.rs
//!
//! Folds one house snapshot from the remote household service into the local
//! users and that single house.
//!
//! The remote payload shape varies between the "housing list" and "single
//! house" responses, so every field is optional and the same datum may arrive
//! under several names. Each such datum is read through an ordered rule list;
//! the first rule that yields a typed value wins.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::domain::{House, Status, User, DEFAULT_CURRENCY};
use crate::ids::Env;
use crate::invite::{generate_invite_code, normalize_code};
use crate::lenient::{id_from_value, int_from_value};

//=========================================================================================
// Remote payload types
//=========================================================================================

/// A member record as the remote service sends it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteMember {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wp_user_id: Option<Value>,
    #[serde(default, rename = "wpId", skip_serializing_if = "Option::is_none")]
    pub wp_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl RemoteMember {
    /// External numeric identity: `wp_user_id`, `wpId`, `user_id`, `id`.
    pub fn external_id(&self) -> Option<i64> {
        [&self.wp_user_id, &self.wp_id, &self.user_id, &self.id]
            .into_iter()
            .find_map(|field| field.as_ref().and_then(int_from_value))
    }

    pub fn email(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(|e| e.trim().to_ascii_lowercase())
            .filter(|e| !e.is_empty())
    }

    /// Display name: `name`, then `display_name`.
    pub fn display_name(&self) -> Option<&str> {
        [&self.name, &self.display_name]
            .into_iter()
            .find_map(|field| field.as_deref().map(str::trim).filter(|n| !n.is_empty()))
    }

    pub fn is_admin(&self) -> bool {
        self.role
            .as_deref()
            .is_some_and(|role| role.trim().eq_ignore_ascii_case("admin"))
    }
}

/// A house record as the remote service sends it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteHouse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
    #[serde(default, rename = "inviteCode", skip_serializing_if = "Option::is_none")]
    pub invite_code_camel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<RemoteMember>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_user_id: Option<Value>,
    #[serde(default, rename = "adminUserId", skip_serializing_if = "Option::is_none")]
    pub admin_user_id_camel: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_wp_id: Option<Value>,
}

impl RemoteHouse {
    pub fn house_id(&self) -> Option<String> {
        self.id.as_ref().and_then(id_from_value)
    }

    pub fn members(&self) -> &[RemoteMember] {
        self.members.as_deref().unwrap_or_default()
    }

    /// Invite code: `invite_code`, then `inviteCode`.
    pub fn invite_code(&self) -> Option<String> {
        [&self.invite_code, &self.invite_code_camel]
            .into_iter()
            .find_map(|field| field.as_deref().map(normalize_code).filter(|c| !c.is_empty()))
    }

    /// Admin external id: `admin_user_id`, `adminUserId`, `admin_wp_id`.
    pub fn admin_external_id(&self) -> Option<i64> {
        [&self.admin_user_id, &self.admin_user_id_camel, &self.admin_wp_id]
            .into_iter()
            .find_map(|field| field.as_ref().and_then(int_from_value))
    }

    fn currency(&self) -> Option<String> {
        self.currency.as_deref().and_then(normalize_currency)
    }

    fn name(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }
}

/// Reads the remote houses out of any of the response envelopes the service
/// uses: a bare array, `{ "houses": [...] }`, `{ "data": [...] }`, or a single
/// house object. Records that do not decode are skipped.
pub fn houses_from_payload(payload: Value) -> Vec<RemoteHouse> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let wrapped = ["houses", "data"].into_iter().find_map(|key| map.remove(key));
            match wrapped {
                Some(Value::Array(items)) => items,
                Some(single @ Value::Object(_)) => vec![single],
                Some(_) => Vec::new(),
                None => vec![Value::Object(map)],
            }
        }
        _ => Vec::new(),
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<RemoteHouse>(item) {
            Ok(house) => Some(house),
            Err(err) => {
                debug!(error = %err, "skipping undecodable remote house");
                None
            }
        })
        .collect()
}

/// Uppercases a currency code, rejecting anything that is not three letters.
pub fn normalize_currency(raw: &str) -> Option<String> {
    let code = raw.trim().to_ascii_uppercase();
    (code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic())).then_some(code)
}

//=========================================================================================
// Merge
//=========================================================================================

/// The result of folding one remote house into local state.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub users: Vec<User>,
    pub house: Option<House>,
}

/// Merges `remote` into `users` and the previously known copy of the house.
///
/// Returns the inputs untouched when the remote record has no id. `house` is
/// `None` only when nobody at all could be placed in it. Other houses are
/// never consulted or changed here.
pub fn merge_remote_house(
    remote: &RemoteHouse,
    mut users: Vec<User>,
    fallback: Option<&House>,
    self_id: Option<&str>,
    env: &mut Env<'_>,
) -> Merged {
    let Some(house_id) = remote.house_id() else {
        return Merged {
            users,
            house: fallback.cloned(),
        };
    };

    // 1. Resolve every remote member to a local user id (index-aligned).
    let resolved: Vec<Option<String>> = remote
        .members()
        .iter()
        .map(|member| resolve_member(member, &mut users, env))
        .collect();

    // 2. Membership: remote list, else what we knew, plus ourselves.
    let mut member_ids: Vec<String> = Vec::new();
    for id in resolved.iter().flatten() {
        if !member_ids.contains(id) {
            member_ids.push(id.clone());
        }
    }
    if member_ids.is_empty() {
        if let Some(previous) = fallback {
            member_ids = previous.member_ids.clone();
        }
    }
    if let Some(me) = self_id {
        if !member_ids.iter().any(|id| id == me) {
            member_ids.push(me.to_string());
        }
    }
    if member_ids.is_empty() {
        debug!(house_id = %house_id, "remote house has no resolvable members");
        return Merged { users, house: None };
    }

    for user in users.iter_mut() {
        if member_ids.contains(&user.id) {
            user.house_id = Some(house_id.clone());
        } else if user.house_id.as_deref() == Some(house_id.as_str()) {
            user.house_id = None;
        }
    }

    // 3. Admin: first rule that names a member wins.
    let is_member = |id: &String| member_ids.contains(id);
    let remote_admin = remote.admin_external_id();
    let admin_id = remote
        .members()
        .iter()
        .zip(&resolved)
        .find_map(|(member, id)| if member.is_admin() { id.clone() } else { None })
        .filter(is_member)
        .or_else(|| {
            remote_admin
                .and_then(|wp| users.iter().find(|u| u.wp_id == Some(wp)))
                .map(|u| u.id.clone())
                .filter(is_member)
        })
        .or_else(|| fallback.map(|h| h.admin_id.clone()).filter(is_member))
        .unwrap_or_else(|| member_ids[0].clone());

    let admin_wp_id = users
        .iter()
        .find(|u| u.id == admin_id)
        .and_then(|u| u.wp_id)
        .or(remote_admin);

    // 4. Descriptive fields: remote, else local, else default.
    let invite_code = remote
        .invite_code()
        .or_else(|| fallback.map(|h| h.invite_code.clone()).filter(|c| !c.is_empty()))
        .unwrap_or_else(|| generate_invite_code(env, &Default::default()));
    let currency = remote
        .currency()
        .or_else(|| fallback.and_then(|h| normalize_currency(&h.currency)))
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    let name = remote
        .name()
        .or_else(|| fallback.map(|h| h.name.clone()).filter(|n| !n.trim().is_empty()))
        .unwrap_or_else(|| "Home".to_string());

    Merged {
        users,
        house: Some(House {
            id: house_id,
            name,
            invite_code,
            currency,
            member_ids,
            admin_id,
            admin_wp_id,
        }),
    }
}

/// Finds (or creates) the local user a remote member refers to.
///
/// External id is tried before email since emails drift between the two
/// systems. Members carrying neither cannot be correlated and are skipped.
fn resolve_member(member: &RemoteMember, users: &mut Vec<User>, env: &mut Env<'_>) -> Option<String> {
    let wp_id = member.external_id();
    let email = member.email();
    if wp_id.is_none() && email.is_none() {
        debug!("skipping remote member without id or email");
        return None;
    }

    // Without an email the member is keyed by its placeholder address, which a
    // user synthesized on an earlier sync may still carry.
    let email = email.or_else(|| wp_id.map(placeholder_email));
    let found = wp_id
        .and_then(|wp| users.iter().position(|u| u.wp_id == Some(wp)))
        .or_else(|| {
            email
                .as_deref()
                .and_then(|e| users.iter().position(|u| u.email.trim().eq_ignore_ascii_case(e)))
        });

    if let Some(index) = found {
        let user = &mut users[index];
        if user.wp_id.is_none() {
            user.wp_id = wp_id;
        }
        if user.name.trim().is_empty() {
            if let Some(name) = member.display_name() {
                user.name = name.to_string();
            }
        }
        return Some(user.id.clone());
    }

    let email = email.unwrap_or_else(|| placeholder_email(wp_id.unwrap_or_default()));
    let name = member
        .display_name()
        .map(str::to_string)
        .unwrap_or_else(|| email.split('@').next().unwrap_or("Housemate").to_string());
    let mut user = User::new(env.new_id(), name, email);
    user.wp_id = wp_id;
    let status = member.status.as_deref().and_then(Status::parse).unwrap_or_default();
    user.set_presence(status, None);
    debug!(user_id = %user.id, wp_id = ?wp_id, "synthesized user for remote member");
    let id = user.id.clone();
    users.push(user);
    Some(id)
}

pub fn placeholder_email(wp_id: i64) -> String {
    format!("wp-{wp_id}@members.invalid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn remote(value: Value) -> RemoteHouse {
        serde_json::from_value(value).unwrap()
    }

    fn local_user(id: &str, email: &str, wp: Option<i64>) -> User {
        let mut user = User::new(id.into(), id.to_uppercase(), email.into());
        user.wp_id = wp;
        user
    }

    fn merge(remote: &RemoteHouse, users: Vec<User>, fallback: Option<&House>, me: Option<&str>) -> Merged {
        let mut rng = StdRng::seed_from_u64(11);
        let mut env = Env::new(Utc::now(), &mut rng);
        merge_remote_house(remote, users, fallback, me, &mut env)
    }

    #[test]
    fn missing_id_returns_inputs_unchanged() {
        let users = vec![local_user("a", "a@x.com", Some(9))];
        let merged = merge(&remote(json!({ "name": "No id" })), users.clone(), None, Some("a"));
        assert_eq!(merged.users, users);
        assert!(merged.house.is_none());
    }

    #[test]
    fn external_id_beats_email() {
        let users = vec![
            local_user("by-wp", "old@x.com", Some(9)),
            local_user("by-email", "a@x.com", None),
        ];
        let r = remote(json!({
            "id": "h1",
            "members": [{ "wp_user_id": 9, "email": "a@x.com", "role": "admin" }]
        }));
        let merged = merge(&r, users, None, None);
        let house = merged.house.unwrap();
        assert_eq!(house.member_ids, vec!["by-wp".to_string()]);
        assert_eq!(house.admin_id, "by-wp");
        assert_eq!(house.admin_wp_id, Some(9));
    }

    #[test]
    fn identity_rules_are_tried_in_order() {
        let member: RemoteMember =
            serde_json::from_value(json!({ "wpId": "x", "user_id": "41", "id": 7 })).unwrap();
        assert_eq!(member.external_id(), Some(41));
        let member: RemoteMember =
            serde_json::from_value(json!({ "display_name": "Bo", "name": " " })).unwrap();
        assert_eq!(member.display_name(), Some("Bo"));
    }

    #[test]
    fn unknown_members_are_synthesized() {
        let r = remote(json!({
            "id": 12,
            "members": [
                { "user_id": "30", "display_name": "Cy", "status": "away" },
                { "email": "Dee@X.com" },
                { "role": "admin" }
            ]
        }));
        let merged = merge(&r, Vec::new(), None, None);
        let house = merged.house.unwrap();
        assert_eq!(house.id, "12");
        assert_eq!(merged.users.len(), 2);
        let cy = &merged.users[0];
        assert_eq!(cy.email, placeholder_email(30));
        assert_eq!(cy.name, "Cy");
        assert_eq!(cy.status, Status::Away);
        assert_eq!(cy.house_id.as_deref(), Some("12"));
        assert_eq!(merged.users[1].email, "dee@x.com");
        assert_eq!(house.admin_id, cy.id);
        assert_eq!(house.currency, "USD");
        assert_eq!(house.invite_code.len(), 8);
    }

    #[test]
    fn placeholder_users_are_matched_again_without_an_email() {
        let users = vec![local_user("cy", &placeholder_email(30), None)];
        let r = remote(json!({ "id": "h1", "members": [{ "user_id": 30 }] }));
        let merged = merge(&r, users, None, None);
        assert_eq!(merged.users.len(), 1);
        assert_eq!(merged.users[0].wp_id, Some(30));
        assert_eq!(merged.house.unwrap().member_ids, vec!["cy".to_string()]);
    }

    #[test]
    fn admin_rules_fall_through_in_order() {
        let users = vec![
            local_user("a", "a@x.com", Some(1)),
            local_user("b", "b@x.com", Some(2)),
            local_user("c", "c@x.com", Some(3)),
        ];
        let members = json!([{ "wp_user_id": 1 }, { "wp_user_id": 2 }, { "wp_user_id": 3 }]);

        let by_field = remote(json!({ "id": "h", "members": members.clone(), "adminUserId": "3" }));
        assert_eq!(merge(&by_field, users.clone(), None, None).house.unwrap().admin_id, "c");

        let fallback = House {
            id: "h".into(),
            name: "Old".into(),
            invite_code: "OLDC2222".into(),
            currency: "eur".into(),
            member_ids: vec!["b".into()],
            admin_id: "b".into(),
            admin_wp_id: Some(2),
        };
        let by_local = remote(json!({ "id": "h", "members": members.clone() }));
        let house = merge(&by_local, users.clone(), Some(&fallback), None).house.unwrap();
        assert_eq!(house.admin_id, "b");
        assert_eq!(house.invite_code, "OLDC2222");
        assert_eq!(house.currency, "EUR");
        assert_eq!(house.name, "Old");

        let by_order = remote(json!({ "id": "h", "members": members, "admin_wp_id": 99 }));
        assert_eq!(merge(&by_order, users, None, None).house.unwrap().admin_id, "a");
    }

    #[test]
    fn first_flagged_admin_wins() {
        let users = vec![local_user("a", "a@x.com", Some(1)), local_user("b", "b@x.com", Some(2))];
        let r = remote(json!({
            "id": "h",
            "members": [{ "wp_user_id": 2, "role": "Admin" }, { "wp_user_id": 1, "role": "admin" }]
        }));
        assert_eq!(merge(&r, users, None, None).house.unwrap().admin_id, "b");
    }

    #[test]
    fn empty_member_list_keeps_local_membership_and_self() {
        let users = vec![local_user("a", "a@x.com", None), local_user("me", "me@x.com", None)];
        let fallback = House {
            id: "h".into(),
            name: "Flat".into(),
            invite_code: "FLAT2345".into(),
            currency: "GBP".into(),
            member_ids: vec!["a".into()],
            admin_id: "a".into(),
            admin_wp_id: None,
        };
        let r = remote(json!({ "id": "h", "members": [], "invite_code": "newc2345", "currency": "usd" }));
        let merged = merge(&r, users, Some(&fallback), Some("me"));
        let house = merged.house.unwrap();
        assert_eq!(house.member_ids, vec!["a".to_string(), "me".to_string()]);
        assert_eq!(house.admin_id, "a");
        assert_eq!(house.invite_code, "NEWC2345");
        assert_eq!(house.currency, "USD");
        assert!(merged.users.iter().all(|u| u.house_id.as_deref() == Some("h")));
    }

    #[test]
    fn members_dropped_remotely_lose_their_house_pointer() {
        let mut gone = local_user("gone", "gone@x.com", Some(5));
        gone.house_id = Some("h".into());
        let users = vec![gone, local_user("a", "a@x.com", Some(1))];
        let r = remote(json!({ "id": "h", "members": [{ "wp_user_id": 1 }] }));
        let merged = merge(&r, users, None, None);
        assert!(merged.users[0].house_id.is_none());
        assert_eq!(merged.users[1].house_id.as_deref(), Some("h"));
    }

    #[test]
    fn payload_envelopes_are_unwrapped() {
        assert_eq!(houses_from_payload(json!([{ "id": 1 }, { "id": 2 }])).len(), 2);
        assert_eq!(houses_from_payload(json!({ "houses": [{ "id": 1 }] })).len(), 1);
        assert_eq!(houses_from_payload(json!({ "data": { "id": 1 } })).len(), 1);
        let single = houses_from_payload(json!({ "id": "h9", "name": "Loft" }));
        assert_eq!(single[0].house_id().as_deref(), Some("h9"));
        assert!(houses_from_payload(json!("nope")).is_empty());
    }

    #[test]
    fn currency_codes_are_validated() {
        assert_eq!(normalize_currency(" eur "), Some("EUR".to_string()));
        assert_eq!(normalize_currency("EURO"), None);
        assert_eq!(normalize_currency("12A"), None);
    }
}
