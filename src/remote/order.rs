use async_trait::async_trait;
use http::StatusCode;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::auth::token::Token;
use crate::config::service::RemoteConfig;
use crate::orders::outcome::FetchOutcome;
use crate::orders::record::OrderRecord;
use crate::remote::OrderLookup;

static AUTH_FAILED_MSG: &str = "authentication failed - invalid or expired token";
static NOT_FOUND_MSG: &str = "no data found";

/// `GET {order_url}?{query_param}={id}` with the token in `token_header`.
#[derive(Debug, Clone)]
pub struct HttpOrderClient {
    client: Client,
    url: String,
    query_param: String,
    token_header: String,
}

impl HttpOrderClient {
    pub fn new(client: Client, remote: &RemoteConfig) -> Self {
        Self {
            client,
            url: remote.order_url(),
            query_param: remote.order.query_param.clone(),
            token_header: remote.order.token_header.clone(),
        }
    }
}

#[async_trait]
impl OrderLookup for HttpOrderClient {
    async fn fetch_one(&self, order_id: &str, token: &Token) -> FetchOutcome {
        let response = match self
            .client
            .get(&self.url)
            .query(&[(self.query_param.as_str(), order_id)])
            .header(self.token_header.as_str(), token.value())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return FetchOutcome::network_error(transport_detail(&e)),
        };

        let status = response.status();
        match response.text().await {
            Ok(body) => classify_response(order_id, status, &body),
            Err(e) => FetchOutcome::network_error(transport_detail(&e)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default, deserialize_with = "truthy")]
    success: Option<bool>,
    data: Option<Value>,
    #[serde(default, deserialize_with = "lenient_message")]
    message: Option<String>,
}

// the service is only ever checked for truthiness: 1, "true", "ok" all count
fn truthy<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::Bool(b) => Some(b),
        Value::Number(n) => Some(n.as_f64().is_some_and(|n| n != 0.0)),
        Value::String(s) => Some(!s.is_empty()),
        Value::Array(_) | Value::Object(_) => Some(true),
    })
}

fn lenient_message<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// Map a lookup response to an outcome. 401 is authoritative whatever the
/// body says.
pub fn classify_response(order_id: &str, status: StatusCode, body: &str) -> FetchOutcome {
    if status == StatusCode::UNAUTHORIZED {
        return FetchOutcome::auth_failure(AUTH_FAILED_MSG);
    }

    let envelope = serde_json::from_str::<Envelope>(body).ok();
    let message = envelope
        .as_ref()
        .and_then(|e| e.message.clone())
        .filter(|m| !m.trim().is_empty());

    if status == StatusCode::NOT_FOUND {
        return FetchOutcome::not_found(message.unwrap_or_else(|| NOT_FOUND_MSG.to_string()));
    }
    if !status.is_success() {
        return FetchOutcome::network_error(message.unwrap_or_else(|| format!("lookup failed with {}", status)));
    }

    let envelope = match envelope {
        Some(envelope) => envelope,
        None => return FetchOutcome::network_error("unexpected response shape"),
    };

    match (envelope.success, envelope.data) {
        (Some(true), Some(data)) if data.is_object() => match serde_json::from_value::<OrderRecord>(data) {
            Ok(mut record) => {
                if record.order_id.is_empty() {
                    record.order_id = order_id.to_owned();
                }
                FetchOutcome::success(record)
            }
            Err(e) => {
                debug!(order_id, error = %e, "record did not match the expected shape");
                FetchOutcome::network_error("unexpected record shape")
            }
        },
        (Some(true), Some(Value::Null) | None) | (Some(false), _) => {
            FetchOutcome::not_found(message.unwrap_or_else(|| NOT_FOUND_MSG.to_string()))
        }
        _ => FetchOutcome::network_error("unexpected response shape"),
    }
}

fn transport_detail(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else {
        format!("request failed: {}", e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::outcome::FailureReason;
    use serde_json::json;

    fn classify(status: u16, body: Value) -> FetchOutcome {
        classify_response("42", StatusCode::from_u16(status).unwrap(), &body.to_string())
    }

    #[test]
    fn unauthorized_wins_over_body() {
        let outcome = classify(401, json!({"success": true, "data": {"orderID": "42"}}));
        assert_eq!(outcome.failure_reason(), Some(FailureReason::AuthFailure));
    }

    #[test]
    fn success_with_record() {
        let outcome = classify(200, json!({"success": true, "data": {"cnic": "123", "fullName": "A B"}}));
        let record = outcome.record().unwrap();
        assert_eq!(record.order_id, "42", "missing id falls back to the requested one");
        assert_eq!(record.cnic.as_deref(), Some("123"));
    }

    #[test]
    fn business_failure_is_not_found_with_remote_message() {
        let outcome = classify(200, json!({"success": false, "message": "Order not found"}));
        assert_eq!(outcome, FetchOutcome::not_found("Order not found"));

        let outcome = classify(200, json!({"success": true, "data": null}));
        assert_eq!(outcome, FetchOutcome::not_found(NOT_FOUND_MSG));

        let outcome = classify(404, json!({}));
        assert_eq!(outcome.failure_reason(), Some(FailureReason::NotFound));
    }

    #[test]
    fn success_flag_and_message_are_read_leniently() {
        for flag in [json!(1), json!("true"), json!("yes")] {
            let outcome = classify(200, json!({"success": flag, "message": {"code": 0}, "data": {"orderID": "42"}}));
            assert!(outcome.is_success(), "success flag {} should count", flag);
        }

        let outcome = classify(200, json!({"success": 0, "message": 404}));
        assert_eq!(outcome, FetchOutcome::not_found("404"));

        let outcome = classify(200, json!({"success": "", "message": null}));
        assert_eq!(outcome, FetchOutcome::not_found(NOT_FOUND_MSG));
    }

    #[test]
    fn unexpected_shapes_are_network_errors() {
        assert_eq!(
            classify_response("42", StatusCode::OK, "<html>oops</html>").failure_reason(),
            Some(FailureReason::NetworkError)
        );
        assert_eq!(classify(200, json!({"data": {}})).failure_reason(), Some(FailureReason::NetworkError));
        assert_eq!(
            classify(200, json!({"success": true, "data": [1, 2]})).failure_reason(),
            Some(FailureReason::NetworkError)
        );
        assert_eq!(
            classify(500, json!({"message": "db down"})),
            FetchOutcome::network_error("db down")
        );
    }
}
