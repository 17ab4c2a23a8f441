//! Typed records mapped from REST API JSON.
//!
//! The REST API returns attributes with camelCase names which are replaced
//! with snake_case names here.

use crate::error::{SecretServerError, SecretServerResult};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Default format of secret timestamps.
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Secret attributes parsed as timestamps.
pub const TIMESTAMP_KEYS: [&str; 2] = ["last_heart_beat_check", "last_password_change_attempt"];

static CAPITALIZED_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new("(.)([A-Z][a-z]+)").expect("Failed to compile capitalized word regex"));

static LOWER_UPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new("([a-z0-9])([A-Z])").expect("Failed to compile lower-upper regex"));

static FRACTIONAL_SECONDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.[0-9]+$").expect("Failed to compile fractional seconds regex"));

/// Transform a camelCase key to snake_case.
///
/// ```
/// use secret_server::records::to_snake_case;
///
/// assert_eq!(to_snake_case("fileAttachmentId"), "file_attachment_id");
/// assert_eq!(to_snake_case("secretTemplateName"), "secret_template_name");
/// ```
#[must_use]
pub fn to_snake_case(camel_cased: &str) -> String {
    let words = CAPITALIZED_WORD.replace_all(camel_cased, "${1}_${2}");
    LOWER_UPPER.replace_all(&words, "${1}_${2}").to_lowercase()
}

/// Transform every key of `object` to snake_case, renaming `item_value` to
/// `value`. On a key collision the later key wins.
#[must_use]
pub fn snake_case_keys(object: &Map<String, Value>) -> Map<String, Value> {
    object
        .iter()
        .map(|(key, value)| {
            let key = match to_snake_case(key) {
                k if k == "item_value" => "value".to_string(),
                k => k,
            };
            (key, value.clone())
        })
        .collect()
}

/// Parse a timestamp, ignoring a trailing fractional seconds suffix.
///
/// # Errors
///
/// Returns [`SecretServerError::InvalidTimestamp`] if the value does not
/// match `format`.
pub fn parse_timestamp(key: &str, value: &str, format: &str) -> SecretServerResult<NaiveDateTime> {
    let trimmed = FRACTIONAL_SECONDS.replace(value, "");
    NaiveDateTime::parse_from_str(&trimmed, format).map_err(|source| {
        SecretServerError::InvalidTimestamp {
            key: key.to_string(),
            value: value.to_string(),
            source,
        }
    })
}

/// A snake-cased JSON object consumed key by key.
struct Record {
    map: Map<String, Value>,
}

impl Record {
    fn from_json(json: &Value) -> SecretServerResult<Self> {
        let object = json.as_object().ok_or_else(|| SecretServerError::InvalidValue {
            key: "<record>".to_string(),
            message: "expected a JSON object".to_string(),
        })?;
        Ok(Self {
            map: snake_case_keys(object),
        })
    }

    fn required<T: DeserializeOwned>(&mut self, key: &str) -> SecretServerResult<T> {
        let value = self
            .map
            .remove(key)
            .ok_or_else(|| SecretServerError::missing_key(key))?;
        decode(key, value)
    }

    fn optional<T: DeserializeOwned>(&mut self, key: &str) -> SecretServerResult<Option<T>> {
        match self.map.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => decode(key, value).map(Some),
        }
    }

    /// Required key whose value may be null.
    fn timestamp(&mut self, key: &str, format: &str) -> SecretServerResult<Option<NaiveDateTime>> {
        let value = self
            .map
            .remove(key)
            .ok_or_else(|| SecretServerError::missing_key(key))?;
        match value {
            Value::Null => Ok(None),
            Value::String(raw) => parse_timestamp(key, &raw, format).map(Some),
            other => Err(SecretServerError::InvalidValue {
                key: key.to_string(),
                message: format!("expected a timestamp string, got {other}"),
            }),
        }
    }

    fn into_extra(self) -> Map<String, Value> {
        self.map
    }
}

fn decode<T: DeserializeOwned>(key: &str, value: Value) -> SecretServerResult<T> {
    serde_json::from_value(value).map_err(|err| SecretServerError::InvalidValue {
        key: key.to_string(),
        message: err.to_string(),
    })
}

/// A secret field (an entry of the secret's `items`).
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Item id
    pub item_id: i64,
    /// Template field id
    pub field_id: i64,
    /// File attachment id, for file fields holding an attachment
    pub file_attachment_id: Option<i64>,
    /// Field description
    pub field_description: Option<String>,
    /// Display name
    pub field_name: String,
    /// Attachment file name
    pub filename: Option<String>,
    /// Field value; the attachment content for fetched file fields
    pub value: String,
    /// Unique short name of the field
    pub slug: String,
    /// Remaining snake-cased attributes (`is_file`, `is_password`, ...)
    pub extra: Map<String, Value>,
}

impl Field {
    /// Map an item object.
    ///
    /// # Errors
    ///
    /// Returns a mapping error when a required key is missing or malformed.
    pub fn from_json(json: &Value) -> SecretServerResult<Self> {
        let mut record = Record::from_json(json)?;
        Ok(Self {
            item_id: record.required("item_id")?,
            field_id: record.required("field_id")?,
            file_attachment_id: record.optional("file_attachment_id")?,
            field_description: record.optional("field_description")?,
            field_name: record.required("field_name")?,
            filename: record.optional("filename")?,
            value: record.optional("value")?.unwrap_or_default(),
            slug: record.required("slug")?,
            extra: record.into_extra(),
        })
    }

    /// Whether the field is flagged as a password.
    #[must_use]
    pub fn is_password(&self) -> bool {
        self.extra.get("is_password").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Whether the field is a file field.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.extra.get("is_file").and_then(Value::as_bool).unwrap_or(false)
    }
}

/// A secret.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSecret {
    /// Secret id
    pub id: i64,
    /// Containing folder id
    pub folder_id: i64,
    /// Template id
    pub secret_template_id: i64,
    /// Site id
    pub site_id: i64,
    /// Whether the secret is active
    pub active: bool,
    /// Whether the secret is checked out
    pub checked_out: bool,
    /// Whether check out is enabled
    pub check_out_enabled: bool,
    /// Secret name
    pub name: String,
    /// Template name
    pub secret_template_name: String,
    /// Last heartbeat status
    pub last_heart_beat_status: Option<String>,
    /// Last heartbeat check
    pub last_heart_beat_check: Option<NaiveDateTime>,
    /// Last password change attempt
    pub last_password_change_attempt: Option<NaiveDateTime>,
    /// Fields keyed by slug
    pub fields: BTreeMap<String, Field>,
    /// Remaining snake-cased attributes
    pub extra: Map<String, Value>,
}

impl ServerSecret {
    /// Map a secret object using [`DEFAULT_DATETIME_FORMAT`], or the
    /// object's own `datetime_format` key when it has one.
    ///
    /// # Errors
    ///
    /// Returns a mapping error when a required key is missing or malformed,
    /// or a timestamp does not parse.
    pub fn from_json(json: &Value) -> SecretServerResult<Self> {
        let format = json
            .get("datetime_format")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_DATETIME_FORMAT);
        Self::from_json_with_format(json, format)
    }

    /// Map a secret object, parsing timestamps with `datetime_format`.
    ///
    /// # Errors
    ///
    /// As [`Self::from_json`].
    pub fn from_json_with_format(json: &Value, datetime_format: &str) -> SecretServerResult<Self> {
        let mut record = Record::from_json(json)?;
        record.map.remove("datetime_format");

        let items: Vec<Value> = record.required("items")?;
        let fields = items
            .iter()
            .map(|item| Field::from_json(item).map(|field| (field.slug.clone(), field)))
            .collect::<SecretServerResult<BTreeMap<_, _>>>()?;

        Ok(Self {
            id: record.required("id")?,
            folder_id: record.required("folder_id")?,
            secret_template_id: record.required("secret_template_id")?,
            site_id: record.required("site_id")?,
            active: record.required("active")?,
            checked_out: record.required("checked_out")?,
            check_out_enabled: record.required("check_out_enabled")?,
            name: record.required("name")?,
            secret_template_name: record.required("secret_template_name")?,
            last_heart_beat_status: record.optional("last_heart_beat_status")?,
            last_heart_beat_check: record.timestamp(TIMESTAMP_KEYS[0], datetime_format)?,
            last_password_change_attempt: record.timestamp(TIMESTAMP_KEYS[1], datetime_format)?,
            fields,
            extra: record.into_extra(),
        })
    }

    /// The field with `slug`.
    #[must_use]
    pub fn field(&self, slug: &str) -> Option<&Field> {
        self.fields.get(slug)
    }
}

impl TryFrom<&Value> for ServerSecret {
    type Error = SecretServerError;

    fn try_from(json: &Value) -> SecretServerResult<Self> {
        Self::from_json(json)
    }
}

/// A folder.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerFolder {
    /// Folder id
    pub id: i64,
    /// Folder name
    pub folder_name: String,
    /// Full path
    pub folder_path: Option<String>,
    /// Parent folder id
    pub parent_folder_id: Option<i64>,
    /// Folder type id
    pub folder_type_id: Option<i64>,
    /// Secret policy id
    pub secret_policy_id: Option<i64>,
    /// Whether permissions are inherited
    pub inherit_permissions: Option<bool>,
    /// Whether the secret policy is inherited
    pub inherit_secret_policy: Option<bool>,
    /// Remaining snake-cased attributes
    pub extra: Map<String, Value>,
}

impl ServerFolder {
    /// Map a folder object.
    ///
    /// # Errors
    ///
    /// Returns a mapping error when a required key is missing or malformed.
    pub fn from_json(json: &Value) -> SecretServerResult<Self> {
        let mut record = Record::from_json(json)?;
        Ok(Self {
            id: record.required("id")?,
            folder_name: record.required("folder_name")?,
            folder_path: record.optional("folder_path")?,
            parent_folder_id: record.optional("parent_folder_id")?,
            folder_type_id: record.optional("folder_type_id")?,
            secret_policy_id: record.optional("secret_policy_id")?,
            inherit_permissions: record.optional("inherit_permissions")?,
            inherit_secret_policy: record.optional("inherit_secret_policy")?,
            extra: record.into_extra(),
        })
    }
}

impl TryFrom<&Value> for ServerFolder {
    type Error = SecretServerError;

    fn try_from(json: &Value) -> SecretServerResult<Self> {
        Self::from_json(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn secret_json() -> Value {
        json!({
            "id": 42,
            "folderId": 3,
            "secretTemplateId": 6003,
            "siteId": 1,
            "active": true,
            "checkedOut": false,
            "checkOutEnabled": false,
            "name": "Web Login",
            "secretTemplateName": "Web Password",
            "lastHeartBeatStatus": "Success",
            "lastHeartBeatCheck": "2024-03-01T12:30:45.1234567",
            "lastPasswordChangeAttempt": "0001-01-01T00:00:00",
            "isRestricted": false,
            "items": [
                {
                    "itemId": 1, "fieldId": 39, "fileAttachmentId": null,
                    "fieldDescription": "The user name", "fieldName": "Username",
                    "filename": null, "itemValue": "alice", "slug": "username",
                    "isFile": false, "isPassword": false
                },
                {
                    "itemId": 2, "fieldId": 40, "fileAttachmentId": null,
                    "fieldDescription": "The password", "fieldName": "Password",
                    "filename": null, "itemValue": "s3cret", "slug": "password",
                    "isFile": false, "isPassword": true
                }
            ]
        })
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("fileAttachmentId"), "file_attachment_id");
        assert_eq!(to_snake_case("secretTemplateName"), "secret_template_name");
        assert_eq!(to_snake_case("lastHeartBeatCheck"), "last_heart_beat_check");
        assert_eq!(to_snake_case("id"), "id");
        assert_eq!(to_snake_case("HTTPResponse"), "http_response");
        assert_eq!(to_snake_case("item2Value"), "item2_value");
    }

    #[test]
    fn test_item_value_renamed() {
        let object = json!({"itemValue": "x", "slug": "s"});
        let keys = snake_case_keys(object.as_object().unwrap());
        assert_eq!(keys.get("value"), Some(&json!("x")));
        assert!(!keys.contains_key("item_value"));
    }

    #[test]
    fn test_server_secret_mapping() {
        let secret = ServerSecret::from_json(&secret_json()).unwrap();
        assert_eq!(secret.id, 42);
        assert_eq!(secret.secret_template_name, "Web Password");
        assert_eq!(secret.fields.len(), 2);
        assert_eq!(secret.field("username").map(|f| f.value.as_str()), Some("alice"));
        assert!(secret.field("password").is_some_and(Field::is_password));
        assert_eq!(secret.extra.get("is_restricted"), Some(&json!(false)));
        assert_eq!(
            secret.last_heart_beat_check,
            NaiveDate::from_ymd_opt(2024, 3, 1).and_then(|d| d.and_hms_opt(12, 30, 45))
        );
    }

    #[test]
    fn test_custom_datetime_format() {
        let mut json = secret_json();
        json["lastHeartBeatCheck"] = json!("01/03/2024 12:30");
        json["lastPasswordChangeAttempt"] = json!("02/03/2024 08:00");
        let secret = ServerSecret::from_json_with_format(&json, "%d/%m/%Y %H:%M").unwrap();
        assert_eq!(
            secret.last_password_change_attempt,
            NaiveDate::from_ymd_opt(2024, 3, 2).and_then(|d| d.and_hms_opt(8, 0, 0))
        );

        json["datetime_format"] = json!("%d/%m/%Y %H:%M");
        assert!(ServerSecret::from_json(&json).is_ok());
    }

    #[test]
    fn test_null_timestamp() {
        let mut json = secret_json();
        json["lastHeartBeatCheck"] = Value::Null;
        let secret = ServerSecret::from_json(&json).unwrap();
        assert!(secret.last_heart_beat_check.is_none());
    }

    #[test]
    fn test_bad_timestamp() {
        let mut json = secret_json();
        json["lastHeartBeatCheck"] = json!("yesterday");
        let err = ServerSecret::from_json(&json).unwrap_err();
        assert!(matches!(err, SecretServerError::InvalidTimestamp { ref key, .. } if key == "last_heart_beat_check"));
    }

    #[test]
    fn test_missing_key() {
        let mut json = secret_json();
        json.as_object_mut().unwrap().remove("secretTemplateName");
        let err = ServerSecret::from_json(&json).unwrap_err();
        assert!(matches!(err, SecretServerError::MissingKey(ref key) if key == "secret_template_name"));

        let mut json = secret_json();
        json["items"][0].as_object_mut().unwrap().remove("slug");
        let err = ServerSecret::from_json(&json).unwrap_err();
        assert!(matches!(err, SecretServerError::MissingKey(ref key) if key == "slug"));
    }

    #[test]
    fn test_duplicate_slug_last_wins() {
        let mut json = secret_json();
        json["items"][1]["slug"] = json!("username");
        let secret = ServerSecret::from_json(&json).unwrap();
        assert_eq!(secret.fields.len(), 1);
        assert_eq!(secret.field("username").map(|f| f.value.as_str()), Some("s3cret"));
    }

    #[test]
    fn test_null_item_value_is_empty() {
        let field = Field::from_json(&json!({
            "itemId": 5, "fieldId": 7, "fieldName": "Notes", "itemValue": null, "slug": "notes"
        }))
        .unwrap();
        assert_eq!(field.value, "");
        assert!(field.file_attachment_id.is_none());
    }

    #[test]
    fn test_server_folder_mapping() {
        let folder = ServerFolder::from_json(&json!({
            "id": 12,
            "folderName": "Web",
            "folderPath": "\\Shared\\Web",
            "parentFolderId": 3,
            "folderTypeId": 1,
            "secretPolicyId": -1,
            "inheritSecretPolicy": true,
            "inheritPermissions": false,
            "childFolders": null
        }))
        .unwrap();
        assert_eq!(folder.id, 12);
        assert_eq!(folder.folder_path.as_deref(), Some("\\Shared\\Web"));
        assert_eq!(folder.parent_folder_id, Some(3));
        assert_eq!(folder.inherit_permissions, Some(false));
        assert!(folder.extra.contains_key("child_folders"));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(
            ServerFolder::from_json(&json!([1, 2])),
            Err(SecretServerError::InvalidValue { .. })
        ));
    }
}
