//! Sample REST API payloads.

use serde_json::{Value, json};

/// An item (field) of a secret.
#[must_use]
pub fn item_json(item_id: i64, slug: &str, value: &str) -> Value {
    json!({
        "itemId": item_id,
        "fieldId": 100 + item_id,
        "fileAttachmentId": null,
        "fieldDescription": format!("The {slug}"),
        "fieldName": slug,
        "filename": null,
        "itemValue": value,
        "slug": slug,
        "isFile": false,
        "isNotes": false,
        "isPassword": slug == "password",
    })
}

/// A file item whose content lives behind `/fields/{slug}`.
#[must_use]
pub fn file_item_json(item_id: i64, slug: &str, file_attachment_id: i64, filename: &str) -> Value {
    json!({
        "itemId": item_id,
        "fieldId": 100 + item_id,
        "fileAttachmentId": file_attachment_id,
        "fieldDescription": "An attached file",
        "fieldName": slug,
        "filename": filename,
        "itemValue": "*** Not Valid For Display ***",
        "slug": slug,
        "isFile": true,
        "isNotes": false,
        "isPassword": false,
    })
}

/// A secret with the given items.
#[must_use]
pub fn secret_with_items_json(id: i64, items: Vec<Value>) -> Value {
    json!({
        "id": id,
        "name": format!("Secret {id}"),
        "secretTemplateId": 6003,
        "folderId": 4,
        "active": true,
        "checkedOut": false,
        "checkOutEnabled": false,
        "siteId": 1,
        "secretTemplateName": "Web Password",
        "lastHeartBeatStatus": "Success",
        "lastHeartBeatCheck": "2024-03-01T12:30:45.263",
        "lastPasswordChangeAttempt": "0001-01-01T00:00:00",
        "isRestricted": false,
        "isOutOfSync": false,
        "autoChangeEnabled": false,
        "items": items,
    })
}

/// A web login secret with `username`, `password` and `url` fields.
#[must_use]
pub fn secret_json(id: i64) -> Value {
    secret_with_items_json(
        id,
        vec![
            item_json(1, "username", "svc-app"),
            item_json(2, "password", "Pa55w0rd!"),
            item_json(3, "url", "https://app.example.com"),
        ],
    )
}

/// A secret holding one file attachment under `slug`.
#[must_use]
pub fn secret_with_attachment_json(id: i64, slug: &str) -> Value {
    secret_with_items_json(
        id,
        vec![
            item_json(1, "username", "deploy"),
            file_item_json(2, slug, 77, "id_rsa"),
        ],
    )
}

/// A folder.
#[must_use]
pub fn folder_json(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "folderName": name,
        "folderPath": format!("\\Shared\\{name}"),
        "parentFolderId": 1,
        "folderTypeId": 1,
        "secretPolicyId": -1,
        "inheritSecretPolicy": true,
        "inheritPermissions": true,
        "childFolders": null,
    })
}

/// An access grant returned by the token endpoint.
#[must_use]
pub fn access_grant_json(access_token: &str, expires_in: u64) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": expires_in,
        "refresh_token": "refresh-token",
    })
}

/// A paged list of records with the given ids.
#[must_use]
pub fn paged_ids_json(ids: &[i64]) -> Value {
    let records: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
    json!({
        "records": records,
        "total": ids.len(),
        "skip": 0,
        "take": 30,
    })
}

/// The HTML page returned with `200` for some misconfigurations.
pub const HTML_ERROR_PAGE: &str =
    "<!DOCTYPE html><html><head><title>Error</title></head><body>Runtime Error</body></html>";
