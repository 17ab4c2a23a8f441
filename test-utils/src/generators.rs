//! Shared proptest generators.

use proptest::prelude::*;

/// Generate a camelCase key together with its expected snake_case form.
///
/// Words have at least two letters; single-letter words are ambiguous for
/// the key transform (`xYZ` cannot be split back into `x_y_z`).
pub fn camel_case_key_strategy() -> impl Strategy<Value = (String, String)> {
    prop::collection::vec("[a-z]{2,8}", 1..5).prop_map(|words| {
        let camel: String = words
            .iter()
            .enumerate()
            .map(|(i, word)| if i == 0 { word.clone() } else { capitalize(word) })
            .collect();
        (camel, words.join("_"))
    })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars
        .next()
        .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
        .unwrap_or_default()
}

/// Generate field slugs.
pub fn slug_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{1,20}"
}

/// Generate a list of distinct slugs.
pub fn unique_slugs_strategy(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(slug_strategy(), 0..max).prop_map(|set| set.into_iter().collect())
}

/// Generate secret ids.
pub fn secret_id_strategy() -> impl Strategy<Value = i64> {
    1i64..1_000_000
}

/// Generate secret paths with mixed `/` and `\` separators.
pub fn secret_path_strategy() -> impl Strategy<Value = (String, Vec<String>)> {
    (
        prop::collection::vec("[A-Za-z][A-Za-z0-9 _-]{0,12}", 1..5),
        prop::collection::vec(prop_oneof![Just("/"), Just("\\"), Just("//"), Just("\\/")], 6),
    )
        .prop_map(|(segments, separators)| {
            let mut path = separators[0].to_string();
            for (i, segment) in segments.iter().enumerate() {
                path.push_str(segment);
                path.push_str(separators[(i + 1) % separators.len()]);
            }
            (path, segments)
        })
}

/// Generate successful HTTP status codes.
pub fn success_status_strategy() -> impl Strategy<Value = u16> {
    200u16..300
}

/// Generate client error status codes.
pub fn client_error_status_strategy() -> impl Strategy<Value = u16> {
    400u16..500
}

/// Generate status codes that are neither success nor client errors.
pub fn service_error_status_strategy() -> impl Strategy<Value = u16> {
    prop_oneof![100u16..200, 300u16..400, 500u16..600]
}

/// Generate human readable error messages.
pub fn error_message_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 .,']{0,60}"
}

/// Generate access tokens.
pub fn access_token_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{16,64}"
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_camel_case_key_shape() {
        let mut runner = TestRunner::default();
        for _ in 0..10 {
            let (camel, snake) = camel_case_key_strategy()
                .new_tree(&mut runner)
                .unwrap()
                .current();
            assert!(!camel.contains('_'));
            assert_eq!(camel.to_lowercase(), snake.replace('_', ""));
        }
    }

    #[test]
    fn test_secret_path_has_segments() {
        let mut runner = TestRunner::default();
        for _ in 0..10 {
            let (path, segments) = secret_path_strategy()
                .new_tree(&mut runner)
                .unwrap()
                .current();
            assert!(segments.iter().all(|s| path.contains(s.as_str())));
        }
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("value"), "Value");
        assert_eq!(capitalize(""), "");
    }
}
