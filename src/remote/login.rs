use async_trait::async_trait;
use http::StatusCode;
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::auth::token::Credential;
use crate::config::service::{LoginConfig, RemoteConfig};
use crate::errors::AuthError;
use crate::remote::Authenticator;

static MESSAGE_FIELD: &str = "message";

/// Login over HTTP: JSON body with the credential, token picked out of the
/// response by candidate field names.
#[derive(Debug, Clone)]
pub struct HttpAuthenticator {
    client: Client,
    url: String,
    config: LoginConfig,
}

impl HttpAuthenticator {
    pub fn new(client: Client, remote: &RemoteConfig) -> Self {
        Self {
            client,
            url: remote.login_url(),
            config: remote.login.clone(),
        }
    }
}

#[async_trait]
impl Authenticator for HttpAuthenticator {
    async fn authenticate(&self, credential: &Credential) -> Result<String, AuthError> {
        let mut body = Map::new();
        body.insert(self.config.username_field.clone(), Value::from(credential.username()));
        body.insert(self.config.secret_field.clone(), Value::from(credential.secret()));

        debug!(url = %self.url, "sending login request");
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        parse_login_response(status, &text, &self.config)
    }
}

/// Classify a login response and extract the token value.
pub fn parse_login_response(status: StatusCode, body: &str, config: &LoginConfig) -> Result<String, AuthError> {
    let json: Option<Value> = serde_json::from_str(body).ok();
    let message = json
        .as_ref()
        .and_then(|v| v.get(MESSAGE_FIELD))
        .and_then(Value::as_str)
        .map(str::to_owned);

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(AuthError::InvalidCredentials(
            message.unwrap_or_else(|| format!("login rejected with {}", status)),
        ));
    }
    if !status.is_success() {
        return Err(AuthError::Network(
            message.unwrap_or_else(|| format!("login failed with {}", status)),
        ));
    }

    let json = json.ok_or_else(|| AuthError::MalformedResponse("body is not JSON".to_string()))?;

    if reports_failure(&json, &config.success_fields) {
        return Err(AuthError::InvalidCredentials(
            message.unwrap_or_else(|| "login reported failure".to_string()),
        ));
    }

    config
        .token_fields
        .iter()
        .find_map(|field| {
            lookup_field(&json, field)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(|token| {
                    debug!(field = %field, "token located in login response");
                    token.to_owned()
                })
        })
        .ok_or_else(|| {
            warn!(candidates = ?config.token_fields, "no token field in login response");
            AuthError::MalformedResponse(format!(
                "none of the token fields {:?} present",
                config.token_fields
            ))
        })
}

/// First success indicator present decides; none present means "no opinion".
fn reports_failure(json: &Value, success_fields: &[String]) -> bool {
    success_fields
        .iter()
        .find_map(|field| lookup_field(json, field))
        .map(|indicator| match indicator {
            Value::Bool(ok) => !ok,
            Value::String(s) => matches!(
                s.to_ascii_lowercase().as_str(),
                "error" | "fail" | "failed" | "failure" | "false"
            ),
            _ => false,
        })
        .unwrap_or(false)
}

/// Dotted path (`data.token`) into a JSON document.
fn lookup_field<'a>(json: &'a Value, field: &str) -> Option<&'a Value> {
    json.pointer(&format!("/{}", field.replace('.', "/")))
        .filter(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> LoginConfig {
        LoginConfig::default()
    }

    fn ok(body: Value) -> Result<String, AuthError> {
        parse_login_response(StatusCode::OK, &body.to_string(), &config())
    }

    #[test]
    fn each_candidate_field_is_accepted() {
        assert_eq!(ok(json!({"success": true, "token": "a"})).unwrap(), "a");
        assert_eq!(ok(json!({"accessToken": "b"})).unwrap(), "b");
        assert_eq!(ok(json!({"access_token": "c"})).unwrap(), "c");
        assert_eq!(ok(json!({"status": "ok", "data": {"token": "d"}})).unwrap(), "d");
        assert_eq!(ok(json!({"data": {"accessToken": "e"}})).unwrap(), "e");
    }

    #[test]
    fn candidate_order_wins_and_blank_values_are_skipped() {
        assert_eq!(ok(json!({"token": "  ", "accessToken": "second"})).unwrap(), "second");
        assert_eq!(ok(json!({"data": {"token": "nested"}, "token": "top"})).unwrap(), "top");
    }

    #[test]
    fn missing_token_is_malformed() {
        assert!(matches!(ok(json!({"success": true, "jwt": "x"})), Err(AuthError::MalformedResponse(_))));
        assert!(matches!(
            parse_login_response(StatusCode::OK, "<html>", &config()),
            Err(AuthError::MalformedResponse(_))
        ));
    }

    #[test]
    fn failure_indicators_reject_credentials() {
        let err = ok(json!({"success": false, "message": "wrong password", "token": "ignored"})).unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials("wrong password".into()));
        assert!(matches!(ok(json!({"status": "error"})), Err(AuthError::InvalidCredentials(_))));
    }

    #[test]
    fn http_status_mapping() {
        let err = parse_login_response(StatusCode::UNAUTHORIZED, r#"{"message":"nope"}"#, &config()).unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials("nope".into()));

        let err = parse_login_response(StatusCode::BAD_GATEWAY, "", &config()).unwrap_err();
        assert!(matches!(err, AuthError::Network(_)));
    }

    #[test]
    fn custom_candidates() {
        let config = LoginConfig {
            token_fields: vec!["result.jwt".into()],
            success_fields: vec!["ok".into()],
            ..LoginConfig::default()
        };
        let body = json!({"ok": true, "success": false, "result": {"jwt": "z"}}).to_string();
        assert_eq!(parse_login_response(StatusCode::OK, &body, &config).unwrap(), "z");
    }
}
