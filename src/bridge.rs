use crate::catalog::RemoteOperation;
use crate::validate::ValidatedCall;
use serde_json::{Map, Value};
use std::time::Duration;

/// Failure classification preserved for the synthesizer. The string form is
/// what programmatic consumers see in the response summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    RemoteRejected,
    RemoteUnavailable,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::RemoteRejected => "remoteRejected",
            Self::RemoteUnavailable => "remoteUnavailable",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteResult {
    Success(Value),
    Failure { kind: FailureKind, message: String },
}

impl RemoteResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("backend unreachable: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportReply {
    pub status: u16,
    pub body: Value,
}

/// One outbound invocation per `call`. Implementations must not retry on
/// their own; the bridge owns the retry decision.
pub trait BackendTransport {
    fn call(&self, service_path: &str, body: &Value) -> Result<TransportReply, TransportError>;
}

impl<F> BackendTransport for F
where
    F: Fn(&str, &Value) -> Result<TransportReply, TransportError>,
{
    fn call(&self, service_path: &str, body: &Value) -> Result<TransportReply, TransportError> {
        self(service_path, body)
    }
}

/// ureq transport against the backend's internal API: one JSON POST per call,
/// credential attached via header, bounded timeout (a timeout surfaces as a
/// network failure, never a hung call).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    internal_api_key: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: &str, internal_api_key: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            internal_api_key: internal_api_key.to_string(),
            timeout,
        }
    }

    fn endpoint(&self, service_path: &str) -> String {
        format!("{}/api/internal/{service_path}", self.base_url)
    }
}

impl BackendTransport for HttpTransport {
    fn call(&self, service_path: &str, body: &Value) -> Result<TransportReply, TransportError> {
        let response = ureq::post(&self.endpoint(service_path))
            .timeout(self.timeout)
            .set("X-Internal-API-Key", &self.internal_api_key)
            .set("X-Internal-Call", "true")
            .send_json(body.clone());

        match response {
            Ok(response) => {
                let status = response.status();
                let body = response
                    .into_json::<Value>()
                    .unwrap_or(Value::Null);
                Ok(TransportReply { status, body })
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_json::<Value>().unwrap_or(Value::Null);
                Ok(TransportReply { status, body })
            }
            Err(ureq::Error::Transport(err)) => Err(TransportError::Network(err.to_string())),
        }
    }
}

fn rejection_detail(body: &Value) -> String {
    body.get("errorDetail")
        .or_else(|| body.get("error"))
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("the request was rejected")
        .to_string()
}

/// Uniform adapter from validated calls to normalized remote results.
/// Holds no per-session state; concurrent dispatches are independent.
pub struct ServiceBridge<T: BackendTransport> {
    transport: T,
}

impl<T: BackendTransport> ServiceBridge<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    fn request_body(call: &ValidatedCall) -> Value {
        let mut body: Map<String, Value> = call.parameters.clone();
        body.insert("kitchenId".to_string(), Value::from(call.caller.kitchen_id));
        body.insert("user".to_string(), Value::String(call.caller.user.clone()));
        Value::Object(body)
    }

    fn classify(reply: TransportReply) -> RemoteResult {
        if (500..600).contains(&reply.status) {
            return RemoteResult::failure(
                FailureKind::RemoteUnavailable,
                rejection_detail(&reply.body),
            );
        }
        if (400..500).contains(&reply.status) {
            return RemoteResult::failure(
                FailureKind::RemoteRejected,
                rejection_detail(&reply.body),
            );
        }
        // Some backend operations report rejection in-band with a 2xx status.
        if reply.body.get("error").is_some() || reply.body.get("errorDetail").is_some() {
            return RemoteResult::failure(
                FailureKind::RemoteRejected,
                rejection_detail(&reply.body),
            );
        }
        RemoteResult::Success(reply.body)
    }

    /// Dispatch one validated call. Read-only operations get a single retry
    /// on network failure; mutating operations are attempted exactly once, so
    /// a timed-out add can never double-apply.
    pub fn dispatch(&self, call: &ValidatedCall, operation: &RemoteOperation) -> RemoteResult {
        let body = Self::request_body(call);
        match self.transport.call(&operation.service_path, &body) {
            Ok(reply) => Self::classify(reply),
            Err(TransportError::Network(first)) => {
                if operation.mutating {
                    return RemoteResult::failure(FailureKind::Network, first);
                }
                match self.transport.call(&operation.service_path, &body) {
                    Ok(reply) => Self::classify(reply),
                    Err(TransportError::Network(second)) => {
                        RemoteResult::failure(FailureKind::Network, second)
                    }
                }
            }
        }
    }
}
