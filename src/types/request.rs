use super::Credentials;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outbound half of one exchange. Built fresh per invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub cmd: String,
    pub rid: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<Credentials>,
}

impl Request {
    #[must_use]
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            rid: uuid::Uuid::new_v4().to_string(),
            args: Vec::new(),
            payload: None,
            auth: None,
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    #[must_use]
    pub fn with_auth(mut self, auth: Option<Credentials>) -> Self {
        self.auth = auth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::Request;
    use crate::types::Credentials;
    use serde_json::json;

    #[test]
    fn empty_fields_are_left_off_the_wire() {
        let request = Request::new("show");
        let encoded = serde_json::to_value(&request).unwrap_or_default();

        assert_eq!(encoded.get("cmd"), Some(&json!("show")));
        assert!(encoded.get("args").is_none());
        assert!(encoded.get("payload").is_none());
        assert!(encoded.get("auth").is_none());
    }

    #[test]
    fn each_request_gets_its_own_rid() {
        assert_ne!(Request::new("show").rid, Request::new("show").rid);
    }

    #[test]
    fn auth_is_attached_by_the_caller() {
        let request = Request::new("clear")
            .with_args(["1"])
            .with_auth(Some(Credentials::new("alice", "pw")));
        assert_eq!(request.args, vec!["1".to_string()]);
        assert_eq!(request.auth.map(|c| c.username), Some("alice".to_string()));
    }
}
