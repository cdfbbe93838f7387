use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Inbound half of one exchange. Produced by the session, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,
    #[serde(default)]
    pub t: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Box<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<Box<ResponseError>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: String,
    pub msg: String,
}

impl Response {
    pub fn success(rid: Option<String>, msg: impl Into<String>) -> Self {
        Self {
            ok: true,
            rid,
            t: Utc::now().timestamp_millis(),
            ms: None,
            msg: Some(msg.into()),
            d: None,
            err: None,
        }
    }

    pub fn error(rid: Option<String>, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            rid,
            t: Utc::now().timestamp_millis(),
            ms: None,
            msg: None,
            d: None,
            err: Some(Box::new(ResponseError {
                code: code.into(),
                msg: msg.into(),
            })),
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.d = Some(Box::new(data));
        self
    }

    #[must_use]
    pub fn with_ms(mut self, ms: i64) -> Self {
        self.ms = Some(ms);
        self
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.ok
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.msg.as_deref()
    }

    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.d.as_deref()
    }

    #[must_use]
    pub fn error_detail(&self) -> Option<&ResponseError> {
        self.err.as_deref()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(err) = self.error_detail() {
            return write!(f, "[{}] {}", err.code, err.msg);
        }
        match (self.message(), self.data()) {
            (Some(msg), None) => f.write_str(msg),
            (Some(msg), Some(data)) => write!(f, "{msg}\n{}", render_data(data)),
            (None, Some(data)) => f.write_str(&render_data(data)),
            (None, None) => f.write_str(if self.ok { "ok" } else { "failed" }),
        }
    }
}

fn render_data(data: &Value) -> String {
    match data {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}
