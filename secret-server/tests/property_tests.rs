//! Property-based tests for the Secret Server SDK.
//!
//! Tests validate:
//! - camelCase keys map to snake_case
//! - response classification by status code
//! - path normalization
//! - fields keyed by slug
//! - bearer header from a fixed access token

use proptest::prelude::*;
use secret_server::client::normalize_path;
use secret_server::records::to_snake_case;
use reqwest::header::{AUTHORIZATION, HeaderMap};
use secret_server::{AccessTokenAuthorizer, ApiResponse, Authorizer, ErrorKind, ServerSecret, process};
use serde_json::json;
use test_utils::fixtures::{item_json, secret_with_items_json};
use test_utils::*;

proptest! {
    #[test]
    fn prop_camel_case_keys_become_snake_case((camel, snake) in camel_case_key_strategy()) {
        prop_assert_eq!(to_snake_case(&camel), snake);
    }

    #[test]
    fn prop_snake_case_is_stable((_, snake) in camel_case_key_strategy()) {
        prop_assert_eq!(to_snake_case(&snake), snake);
    }

    #[test]
    fn prop_success_passes_through(status in success_status_strategy(), body in ".{0,64}") {
        let response = ApiResponse::new(status, body.as_bytes().to_vec());
        prop_assert_eq!(process(response.clone()).ok(), Some(response));
    }

    #[test]
    fn prop_client_error_uses_message_key(
        status in client_error_status_strategy(),
        message in error_message_strategy(),
    ) {
        let body = json!({ "message": message, "error": "ignored" }).to_string();
        let err = process(ApiResponse::new(status, body)).unwrap_err();

        prop_assert_eq!(err.kind(), ErrorKind::Client);
        prop_assert_eq!(err.message(), Some(message.as_str()));
        prop_assert_eq!(err.status(), Some(status));
    }

    #[test]
    fn prop_client_error_falls_back_to_error_key(
        status in client_error_status_strategy(),
        error in error_message_strategy(),
    ) {
        let body = json!({ "error": error }).to_string();
        let err = process(ApiResponse::new(status, body)).unwrap_err();

        prop_assert_eq!(err.message(), Some(error.as_str()));
    }

    #[test]
    fn prop_other_statuses_are_service_errors(
        status in service_error_status_strategy(),
        body in ".{0,64}",
    ) {
        let err = process(ApiResponse::new(status, body.clone())).unwrap_err();

        prop_assert_eq!(err.kind(), ErrorKind::Service);
        prop_assert_eq!(err.response().map(|r| r.text().into_owned()), Some(body));
    }

    #[test]
    fn prop_normalized_path_keeps_segments((path, segments) in secret_path_strategy()) {
        let normalized = normalize_path(&path);

        prop_assert!(normalized.starts_with('\\'));
        prop_assert!(!normalized.contains('/'));
        prop_assert_eq!(normalized, format!("\\{}", segments.join("\\")));
    }

    #[test]
    fn prop_normalize_path_is_idempotent((path, _) in secret_path_strategy()) {
        let once = normalize_path(&path);
        prop_assert_eq!(normalize_path(&once), once);
    }

    #[test]
    fn prop_fields_are_keyed_by_slug(
        id in secret_id_strategy(),
        slugs in unique_slugs_strategy(8),
    ) {
        let items = slugs
            .iter()
            .zip(1i64..)
            .map(|(slug, item_id)| item_json(item_id, slug, &format!("value of {slug}")))
            .collect();
        let secret = ServerSecret::from_json(&secret_with_items_json(id, items)).unwrap();

        prop_assert_eq!(secret.id, id);
        prop_assert_eq!(secret.fields.len(), slugs.len());
        for slug in &slugs {
            let field = secret.field(slug).unwrap();
            prop_assert_eq!(&field.slug, slug);
            prop_assert_eq!(&field.value, &format!("value of {slug}"));
        }
    }

    #[test]
    fn prop_access_token_becomes_bearer_header(token in access_token_strategy()) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let headers = runtime
            .block_on(AccessTokenAuthorizer::new(token.clone()).headers(HeaderMap::new()))
            .unwrap();

        let expected = format!("Bearer {token}");
        prop_assert_eq!(
            headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()),
            Some(expected.as_str())
        );
        prop_assert!(headers.get(AUTHORIZATION).is_some_and(|value| value.is_sensitive()));
    }
}
