use std::fmt;

use serde_json::Value;
use tracing::warn;

use taskdock_domain::CoreError;

use crate::transport::{BasicAuth, HttpMethod, HttpRequest, HttpTransport};

const STATUS_KEYS: [&str; 2] = ["STATUS", "status"];
const OK_SPELLINGS: [&str; 3] = ["OK", "ok", "Ok"];

#[derive(Clone, PartialEq, Eq)]
pub struct RestCredentials {
    token: String,
}

impl RestCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// The remote expects the API key reversed as the Basic-Auth password.
    /// A wire-format convention, not a security measure.
    pub fn reversed(&self) -> String {
        self.token.chars().rev().collect()
    }

    pub fn basic_auth(&self) -> BasicAuth {
        BasicAuth {
            username: self.token.clone(),
            password: self.reversed(),
        }
    }
}

impl fmt::Debug for RestCredentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RestCredentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Joins query pairs in insertion order. Values are passed through verbatim
/// because the remote's convention predates escaping; callers only send
/// URL-safe values.
pub fn query_string(params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return String::new();
    }
    let joined = params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("?{joined}")
}

/// Applies the status-envelope convention: an ok status strips the status
/// key and collapses a single remaining key to its value; a non-ok status
/// raises the whole parsed body; a body without a status key passes through
/// unchanged.
pub fn unwrap_envelope(body: Value) -> Result<Value, CoreError> {
    let Some(map) = body.as_object() else {
        return Ok(body);
    };
    let Some(status_key) = STATUS_KEYS.iter().copied().find(|key| map.contains_key(*key)) else {
        return Ok(body);
    };

    let ok = map
        .get(status_key)
        .and_then(Value::as_str)
        .map(|status| OK_SPELLINGS.contains(&status))
        .unwrap_or(false);
    if !ok {
        return Err(CoreError::Remote(body));
    }

    let mut remaining: serde_json::Map<String, Value> = map
        .iter()
        .filter(|(key, _)| key.as_str() != status_key)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    if remaining.len() == 1 {
        if let Some(key) = remaining.keys().next().cloned() {
            if let Some(value) = remaining.remove(&key) {
                return Ok(value);
            }
        }
    }
    Ok(Value::Object(remaining))
}

/// One remote call: transport or parse failures resolve to `Ok(None)` (the
/// falsy sentinel callers test for), remote-reported failures surface as
/// `CoreError::Remote` with the parsed body.
pub async fn fetch(
    transport: &dyn HttpTransport,
    method: HttpMethod,
    url: &str,
    params: &[(&str, String)],
    body: Option<Value>,
    credentials: Option<&RestCredentials>,
) -> Result<Option<Value>, CoreError> {
    let full_url = format!("{url}{}", query_string(params));
    let request = HttpRequest {
        method,
        url: full_url.clone(),
        body,
        basic_auth: credentials.map(RestCredentials::basic_auth),
    };

    let response = match transport.execute(request).await {
        Ok(response) => response,
        Err(error) => {
            warn!(%error, url = %full_url, "request failed before a response arrived");
            return Ok(None);
        }
    };

    let parsed: Value = match serde_json::from_str(&response.body) {
        Ok(parsed) => parsed,
        Err(error) => {
            warn!(%error, url = %full_url, status = response.status, "response body was not JSON");
            return Ok(None);
        }
    };

    unwrap_envelope(parsed).map(Some)
}

#[cfg(test)]
mod tests {
    use super::{fetch, query_string, unwrap_envelope, RestCredentials};
    use crate::transport::{stub::StubTransport, HttpMethod, HttpResponse};
    use serde_json::json;
    use taskdock_domain::CoreError;

    #[test]
    fn credentials_reverse_the_token_for_the_password() {
        let credentials = RestCredentials::new("abc123");
        assert_eq!(credentials.reversed(), "321cba");
        let auth = credentials.basic_auth();
        assert_eq!(auth.username, "abc123");
        assert_eq!(auth.password, "321cba");
    }

    #[test]
    fn credentials_debug_never_prints_the_token() {
        let rendered = format!("{:?}", RestCredentials::new("secret-token"));
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn query_string_preserves_insertion_order_and_skips_escaping() {
        let params = [
            ("nestSubTasks", "yes".to_owned()),
            ("sort", "duedate".to_owned()),
            ("responsible-party-ids", "12,34".to_owned()),
        ];
        assert_eq!(
            query_string(&params),
            "?nestSubTasks=yes&sort=duedate&responsible-party-ids=12,34"
        );
        assert_eq!(query_string(&[]), "");
    }

    #[test]
    fn envelope_with_a_single_payload_key_unwraps_to_its_value() {
        let unwrapped = unwrap_envelope(json!({"status": "OK", "foo": {"a": 1}}))
            .expect("ok envelope");
        assert_eq!(unwrapped, json!({"a": 1}));
    }

    #[test]
    fn envelope_with_multiple_payload_keys_keeps_an_object() {
        let unwrapped =
            unwrap_envelope(json!({"STATUS": "ok", "a": 1, "b": 2})).expect("ok envelope");
        assert_eq!(unwrapped, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn envelope_with_no_payload_keys_yields_an_empty_object() {
        let unwrapped = unwrap_envelope(json!({"STATUS": "Ok"})).expect("ok envelope");
        assert_eq!(unwrapped, json!({}));
    }

    #[test]
    fn body_without_a_status_key_passes_through_unchanged() {
        let body = json!({"account": {"id": 1}});
        assert_eq!(unwrap_envelope(body.clone()).expect("passthrough"), body);
        let list = json!([1, 2, 3]);
        assert_eq!(unwrap_envelope(list.clone()).expect("passthrough"), list);
    }

    #[test]
    fn failure_envelope_raises_the_full_body() {
        let body = json!({"status": "FAIL", "message": "bad token"});
        let error = unwrap_envelope(body.clone()).unwrap_err();
        assert_eq!(error, CoreError::Remote(body));
        assert_eq!(error.to_string(), "bad token");
    }

    #[tokio::test]
    async fn transport_failure_resolves_to_the_falsy_sentinel() {
        let transport = StubTransport::new();
        transport.push_failure("connection refused");

        let outcome = fetch(&transport, HttpMethod::Get, "https://x.test/a.json", &[], None, None)
            .await
            .expect("sentinel, not error");
        assert_eq!(outcome, None);
    }

    #[tokio::test]
    async fn unparsable_body_resolves_to_the_falsy_sentinel() {
        let transport = StubTransport::new();
        transport.push_response(HttpResponse {
            status: 500,
            body: "<html>gateway timeout</html>".to_owned(),
        });

        let outcome = fetch(&transport, HttpMethod::Get, "https://x.test/a.json", &[], None, None)
            .await
            .expect("sentinel, not error");
        assert_eq!(outcome, None);
    }

    #[tokio::test]
    async fn error_statuses_still_parse_the_envelope() {
        let transport = StubTransport::new();
        transport.push_response(HttpResponse {
            status: 401,
            body: json!({"STATUS": "Error", "MESSAGE": "invalid key"}).to_string(),
        });

        let error = fetch(&transport, HttpMethod::Get, "https://x.test/a.json", &[], None, None)
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "invalid key");
    }

    #[tokio::test]
    async fn fetch_appends_params_and_basic_auth_to_the_request() {
        let transport = StubTransport::new();
        transport.push_json(json!({"STATUS": "OK", "items": []}));
        let credentials = RestCredentials::new("tok");

        fetch(
            &transport,
            HttpMethod::Get,
            "https://x.test/tasks.json",
            &[("sort", "duedate".to_owned())],
            None,
            Some(&credentials),
        )
        .await
        .expect("stubbed fetch");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://x.test/tasks.json?sort=duedate");
        let auth = requests[0].basic_auth.clone().expect("basic auth");
        assert_eq!(auth.username, "tok");
        assert_eq!(auth.password, "kot");
    }
}
