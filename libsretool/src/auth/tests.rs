use super::*;

#[test]
fn test_credentials_anonymous() {
    let creds = Credentials::anonymous();
    assert_eq!(creds, Credentials::Anonymous);
    assert_eq!(creds.to_header_value(), None);
}

#[test]
fn test_credentials_basic() {
    let creds = Credentials::basic("robot", "s3cret");
    match &creds {
        Credentials::Basic { username, password } => {
            assert_eq!(username, "robot");
            assert_eq!(password, "s3cret");
        }
        _ => panic!("Expected Basic credentials"),
    }

    let header = creds.to_header_value().unwrap();
    assert_eq!(header, "Basic cm9ib3Q6czNjcmV0");
}

#[test]
fn test_credentials_bearer() {
    let creds = Credentials::bearer("my_token");
    assert_eq!(creds.to_header_value().unwrap(), "Bearer my_token");
}

#[test]
fn test_credential_store_is_keyed_by_registry() {
    let mut store = CredentialStore::new();
    assert!(store.is_empty());

    store.insert("quay.io", Credentials::basic("robot", "pw"));
    assert_eq!(store.get("quay.io"), Some(&Credentials::basic("robot", "pw")));
    assert_eq!(store.get("docker.io"), None);
    assert_eq!(store.get("quay.io:443"), None);

    assert!(store.remove("quay.io").is_some());
    assert!(store.is_empty());
}

#[test]
fn test_auth_challenge_parse_bearer() {
    let header = r#"Bearer realm="https://auth.example.com/token",service="registry.example.com",scope="repository:alpine:pull""#;

    let challenge = AuthChallenge::parse(header).unwrap();
    assert_eq!(challenge.scheme, "Bearer");
    assert!(challenge.is_bearer());
    assert_eq!(challenge.realm, "https://auth.example.com/token");
    assert_eq!(challenge.service, Some("registry.example.com".to_string()));
    assert_eq!(challenge.scope, Some("repository:alpine:pull".to_string()));
}

#[test]
fn test_auth_challenge_parse_scope_with_comma() {
    let header = r#"Bearer realm="https://quay.io/v2/auth",service="quay.io",scope="repository:app-sre/app:pull,push""#;

    let challenge = AuthChallenge::parse(header).unwrap();
    assert_eq!(challenge.service, Some("quay.io".to_string()));
    assert_eq!(
        challenge.scope,
        Some("repository:app-sre/app:pull,push".to_string())
    );
}

#[test]
fn test_auth_challenge_parse_with_spaces_between_params() {
    let header = r#"Bearer realm="https://auth.example.com/token", service="registry""#;

    let challenge = AuthChallenge::parse(header).unwrap();
    assert_eq!(challenge.service, Some("registry".to_string()));
}

#[test]
fn test_auth_challenge_parse_without_service() {
    let header = r#"Bearer realm="https://auth.example.com/token",scope="repository:alpine:pull""#;

    let challenge = AuthChallenge::parse(header).unwrap();
    assert_eq!(challenge.service, None);
    assert_eq!(challenge.scope, Some("repository:alpine:pull".to_string()));
}

#[test]
fn test_auth_challenge_parse_basic() {
    let header = r#"Basic realm="Registry Access""#;

    let challenge = AuthChallenge::parse(header).unwrap();
    assert_eq!(challenge.scheme, "Basic");
    assert!(!challenge.is_bearer());
    assert_eq!(challenge.realm, "Registry Access");
    assert_eq!(challenge.service, None);
    assert_eq!(challenge.scope, None);
}

#[test]
fn test_auth_challenge_parse_missing_realm() {
    let header = r#"Bearer service="registry""#;

    let err = AuthChallenge::parse(header).unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    assert!(err.to_string().contains("realm"));
}

#[test]
fn test_auth_challenge_parse_invalid_format() {
    assert!(AuthChallenge::parse("InvalidHeader").is_err());
}

#[test]
fn test_token_query_includes_present_params_only() {
    let challenge =
        AuthChallenge::parse(r#"Bearer realm="https://auth.example.com/token",scope="repository:a:pull""#)
            .unwrap();
    assert_eq!(challenge.token_query(), vec![("scope", "repository:a:pull")]);
}

#[test]
fn test_token_response_prefers_token_field() {
    let response: TokenResponse =
        serde_json::from_str(r#"{"token":"abc","access_token":"def"}"#).unwrap();
    assert_eq!(response.into_token(), Some("abc".to_string()));

    let response: TokenResponse = serde_json::from_str(r#"{"access_token":"def"}"#).unwrap();
    assert_eq!(response.into_token(), Some("def".to_string()));

    let response: TokenResponse = serde_json::from_str(r#"{}"#).unwrap();
    assert_eq!(response.into_token(), None);
}
