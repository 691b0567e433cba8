use crate::bridge::{BackendTransport, HttpTransport, RemoteResult, ServiceBridge};
use crate::catalog::ActionCatalog;
use crate::config::Settings;
use crate::intent::{resolve_intent, HistoryLimits, ResolvedIntent};
use crate::oracle::{ChatCompletionsOracle, IntentOracle};
use crate::respond::{
    render_action_reply, render_fallback, render_internal_failure, render_validation_failure,
    Reply,
};
use crate::session::{SessionKey, SessionLimits, SessionStore, Turn};
use crate::shared::logging::append_engine_log_line;
use crate::validate::{validate_call, CallerIdentity};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Inbound message shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub session: SessionKey,
    #[serde(default)]
    pub context: Option<String>,
}

/// Outbound reply shape: the conversational text plus the programmatic
/// summary. `error` stays null both on success and when no action matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    #[serde(default)]
    pub action_taken: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl From<Reply> for ChatResponse {
    fn from(reply: Reply) -> Self {
        Self {
            response: reply.text,
            action_taken: reply.summary.action_taken,
            success: reply.summary.success,
            error: reply.summary.error,
        }
    }
}

/// The dispatch pipeline: resolve → validate → dispatch → synthesize, with
/// bounded per-session history on both ends. Owns every collaborator; create
/// one at startup and drop it at shutdown.
pub struct DispatchEngine<O: IntentOracle, T: BackendTransport> {
    catalog: ActionCatalog,
    oracle: O,
    bridge: ServiceBridge<T>,
    sessions: SessionStore,
    history_limits: HistoryLimits,
    state_root: Option<PathBuf>,
}

impl DispatchEngine<ChatCompletionsOracle, HttpTransport> {
    /// Default wiring: HTTP oracle and HTTP backend transport per settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let oracle = ChatCompletionsOracle::new(
            &settings.oracle.api_base,
            &settings.oracle.api_key,
            &settings.oracle.model,
            settings.oracle.timeout(),
        );
        let transport = HttpTransport::new(
            &settings.backend.base_url,
            &settings.backend.internal_api_key,
            settings.backend.timeout(),
        );
        let session_limits = SessionLimits {
            max_turns: settings.session.max_turns,
            idle_timeout: Duration::from_secs(settings.session.idle_timeout_seconds),
            max_sessions: settings.session.max_sessions,
        };
        let history_limits = HistoryLimits {
            max_turns: settings.session.history_turns,
            max_chars: settings.session.history_chars,
        };
        Self::new(
            ActionCatalog::builtin(),
            oracle,
            transport,
            session_limits,
            history_limits,
        )
        .with_state_root(settings.state_root.clone())
    }
}

impl<O: IntentOracle, T: BackendTransport> DispatchEngine<O, T> {
    pub fn new(
        catalog: ActionCatalog,
        oracle: O,
        transport: T,
        session_limits: SessionLimits,
        history_limits: HistoryLimits,
    ) -> Self {
        Self {
            catalog,
            oracle,
            bridge: ServiceBridge::new(transport),
            sessions: SessionStore::new(session_limits),
            history_limits,
            state_root: None,
        }
    }

    pub fn with_state_root(mut self, state_root: Option<PathBuf>) -> Self {
        self.state_root = state_root;
        self
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handle one inbound message end to end. Always returns a reply; the
    /// session lock is held for the whole turn so racing requests for the
    /// same key serialize and exactly one turn is appended per message.
    pub fn handle_message(&self, request: &ChatRequest) -> ChatResponse {
        let handle = self.sessions.session(&request.session);
        let mut session = handle.lock();
        let history = session.recent(self.history_limits.max_turns);

        let intent = resolve_intent(
            &self.oracle,
            &request.message,
            &history,
            &self.catalog,
            self.history_limits,
            request.context.as_deref(),
        );
        let (reply, remote) = self.run_intent(&request.session, &intent);

        let outcome = match &remote {
            Some(RemoteResult::Success(_)) => Some(reply.text.clone()),
            Some(RemoteResult::Failure { kind, .. }) => Some(format!("failed ({kind})")),
            None => None,
        };
        session.push(Turn {
            message: request.message.clone(),
            action: intent.action.clone(),
            outcome,
            timestamp: chrono::Utc::now().timestamp(),
        });
        drop(session);

        self.log_turn(request, &reply);
        reply.into()
    }

    fn run_intent(
        &self,
        key: &SessionKey,
        intent: &ResolvedIntent,
    ) -> (Reply, Option<RemoteResult>) {
        let Some(action) = intent.action.as_deref() else {
            return (
                render_fallback(&self.catalog, intent.needs_clarification),
                None,
            );
        };
        // The resolver only emits catalog names; a miss here is a
        // catalog/definition mismatch inside the engine itself.
        let Some(def) = self.catalog.lookup(action) else {
            return (render_internal_failure(Some(action)), None);
        };

        let caller = CallerIdentity {
            kitchen_id: key.kitchen_id,
            user: key.user.clone(),
        };
        let call = match validate_call(def, &intent.raw_parameters, &caller) {
            Ok(call) => call,
            Err(problems) => return (render_validation_failure(action, &problems), None),
        };

        let result = self.bridge.dispatch(&call, &def.operation);
        let reply = render_action_reply(action, &call.parameters, &result);
        (reply, Some(result))
    }

    fn log_turn(&self, request: &ChatRequest, reply: &Reply) {
        let Some(state_root) = &self.state_root else {
            return;
        };
        let line = format!(
            "{} kitchen={} user={} action={} success={} error={}",
            chrono::Utc::now().to_rfc3339(),
            request.session.kitchen_id,
            request.session.user,
            reply.summary.action_taken.as_deref().unwrap_or("none"),
            reply.summary.success,
            reply.summary.error.as_deref().unwrap_or("-"),
        );
        // Best effort; a failed log write must not fail the turn.
        let _ = append_engine_log_line(state_root, &line);
    }
}
