//! The authenticated user as reported by `GET /auth/me`.

use serde::{Deserialize, Deserializer, Serialize};

/// The currently signed-in user.
///
/// The backend reports `firstname` / `lastname` (and, in older deployments, a
/// single `name`); those are normalized into `first_name` / `last_name` on
/// deserialization. Serialization always uses the normalized field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UserRecord")]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    /// Name used in greetings: first name when known, otherwise the email.
    pub fn display_name(&self) -> &str {
        match self.first_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.email,
        }
    }
}

/// Wire shape of a user record, before normalization.
#[derive(Deserialize)]
struct UserRecord {
    #[serde(deserialize_with = "id_to_string")]
    id: String,
    email: String,
    #[serde(default, alias = "firstname")]
    first_name: Option<String>,
    #[serde(default, alias = "lastname")]
    last_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
            first_name: record.first_name.or(record.name),
            last_name: record.last_name,
        }
    }
}

/// Sign-up request for `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct NewAccount<'a> {
    pub email: &'a str,
    pub password: &'a str,
    #[serde(rename = "firstname")]
    pub first_name: &'a str,
    #[serde(rename = "lastname", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<&'a str>,
}

/// Profile echoed back after registration. It carries no id; the account
/// becomes usable through a normal login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub email: String,
    #[serde(default, alias = "firstname")]
    pub first_name: Option<String>,
    #[serde(default, alias = "lastname")]
    pub last_name: Option<String>,
}

/// Accept ids sent either as strings (UUIDs) or as bare integers.
fn id_to_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "invalid user id: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_backend_field_names() {
        let json = r#"{
            "id": "7f1c0a52-3b8e-4a57-9d1f-2a3b4c5d6e7f",
            "email": "ada@example.com",
            "firstname": "Ada",
            "lastname": "Lovelace"
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.first_name.as_deref(), Some("Ada"));
        assert_eq!(user.last_name.as_deref(), Some("Lovelace"));
        assert_eq!(user.display_name(), "Ada");
    }

    #[test]
    fn test_single_name_field_maps_to_first_name() {
        let json = r#"{"id": 42, "email": "bob@example.com", "name": "Bob"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, "42");
        assert_eq!(user.first_name.as_deref(), Some("Bob"));
        assert!(user.last_name.is_none());
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let json = r#"{"id": "u1", "email": "carol@example.com", "firstname": "  "}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.display_name(), "carol@example.com");
    }

    #[test]
    fn test_serialized_user_reads_back() {
        let user = User {
            id: "u1".to_string(),
            email: "dan@example.com".to_string(),
            first_name: Some("Dan".to_string()),
            last_name: None,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("\"first_name\":\"Dan\""));
        let parsed: User = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, user);
    }

    #[test]
    fn test_new_account_uses_backend_names() {
        let account = NewAccount {
            email: "ada@example.com",
            password: "pw",
            first_name: "Ada",
            last_name: None,
        };
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["firstname"], "Ada");
        assert!(json.get("lastname").is_none());

        let echoed: RegisteredUser = serde_json::from_str(
            r#"{"email":"ada@example.com","firstname":"Ada","lastname":"Lovelace"}"#,
        )
        .unwrap();
        assert_eq!(echoed.last_name.as_deref(), Some("Lovelace"));
    }

    #[test]
    fn test_rejects_object_id() {
        let json = r#"{"id": {"x": 1}, "email": "e@example.com"}"#;
        assert!(serde_json::from_str::<User>(json).is_err());
    }
}
