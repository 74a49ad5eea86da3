use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("{}", remote_message(.0))]
    Remote(Value),
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    pub fn remote_body(&self) -> Option<&Value> {
        match self {
            Self::Remote(body) => Some(body),
            Self::Configuration(_) => None,
        }
    }
}

fn remote_message(body: &Value) -> String {
    body.get("MESSAGE")
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::CoreError;
    use serde_json::json;

    #[test]
    fn remote_display_prefers_upper_case_message_key() {
        let error = CoreError::Remote(json!({"MESSAGE": "bad token", "STATUS": "FAIL"}));
        assert_eq!(error.to_string(), "bad token");
    }

    #[test]
    fn remote_display_falls_back_to_lower_case_message_key() {
        let error = CoreError::Remote(json!({"message": "rate limited"}));
        assert_eq!(error.to_string(), "rate limited");
    }

    #[test]
    fn remote_display_without_message_key_prints_the_body() {
        let error = CoreError::Remote(json!({"STATUS": "FAIL"}));
        assert_eq!(error.to_string(), r#"{"STATUS":"FAIL"}"#);
    }

    #[test]
    fn remote_body_is_exposed_for_callers() {
        let body = json!({"STATUS": "FAIL", "code": 401});
        let error = CoreError::Remote(body.clone());
        assert_eq!(error.remote_body(), Some(&body));
        assert_eq!(CoreError::Configuration("x".to_owned()).remote_body(), None);
    }
}
