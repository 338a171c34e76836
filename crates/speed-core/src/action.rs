use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use tracing::Instrument;

use crate::envelope::{Parameters, Request, Response};
use crate::error::ActionError;
use crate::store::ArtifactReference;

/// The closed set of operations a request may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    DateRange,
    Day,
    Week,
    LastWeek,
    Month,
    LastMonth,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::DateRange,
        Operation::Day,
        Operation::Week,
        Operation::LastWeek,
        Operation::Month,
        Operation::LastMonth,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DateRange => "date_range",
            Self::Day => "day",
            Self::Week => "week",
            Self::LastWeek => "last_week",
            Self::Month => "month",
            Self::LastMonth => "last_month",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ActionError::UnknownOperation(s.to_string()))
    }
}

/// An asynchronous procedure registered under an [`Operation`].
///
/// Actions receive plain parameters and return plain values; they know
/// nothing about the message transport.
pub trait Action: Send + Sync {
    fn run<'a>(
        &'a self,
        parameters: &'a Parameters,
    ) -> Pin<Box<dyn Future<Output = Result<ArtifactReference, ActionError>> + Send + 'a>>;
}

/// Dispatches requests to registered actions and normalizes every outcome
/// into exactly one [`Response`].
pub struct ActionExecutor {
    actions: BTreeMap<Operation, Arc<dyn Action>>,
    span: tracing::Span,
}

impl Default for ActionExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionExecutor {
    pub fn new() -> Self {
        Self {
            actions: BTreeMap::new(),
            span: tracing::Span::none(),
        }
    }

    /// Attach the span all action futures run inside.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_action(mut self, operation: Operation, action: Arc<dyn Action>) -> Self {
        self.register(operation, action);
        self
    }

    pub fn register(&mut self, operation: Operation, action: Arc<dyn Action>) {
        if self.actions.insert(operation, action).is_some() {
            tracing::warn!(%operation, "Action replaced");
        }
    }

    pub fn operations(&self) -> impl Iterator<Item = Operation> + '_ {
        self.actions.keys().copied()
    }

    /// Run the action registered for `operation`.
    ///
    /// Names outside the closed set and operations with no registered action
    /// both fail with [`ActionError::UnknownOperation`]. A panicking action is
    /// reported as [`ActionError::Execution`].
    pub async fn execute(
        &self,
        operation: &str,
        parameters: &Parameters,
    ) -> Result<ArtifactReference, ActionError> {
        let op: Operation = operation.parse()?;
        let action = self
            .actions
            .get(&op)
            .ok_or_else(|| ActionError::UnknownOperation(operation.to_string()))?;

        tracing::debug!(parent: &self.span, operation = %op, "Executing action");

        match AssertUnwindSafe(action.run(parameters))
            .catch_unwind()
            .instrument(self.span.clone())
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ActionError::Execution(format!("action {op} panicked"))),
        }
    }

    /// Decode a message body, execute it and build the reply envelope.
    pub async fn handle(&self, body: &[u8]) -> Response {
        let outcome = match Request::from_slice(body) {
            Ok(request) => self.execute(&request.operation, &request.parameters).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(reference) => Response::ok(vec![reference]),
            Err(e) => {
                tracing::warn!(parent: &self.span, kind = ?e.kind(), error = %e, "Request failed");
                Response::from_error(&e)
            }
        }
    }
}

/// Stub action that returns a fixed outcome, for testing.
pub struct StubAction {
    outcome: Result<ArtifactReference, String>,
    call_count: AtomicUsize,
}

impl StubAction {
    pub fn returning(reference: &str) -> Self {
        Self {
            outcome: Ok(reference.to_string()),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl Action for StubAction {
    fn run<'a>(
        &'a self,
        _parameters: &'a Parameters,
    ) -> Pin<Box<dyn Future<Output = Result<ArtifactReference, ActionError>> + Send + 'a>> {
        Box::pin(async move {
            self.call_count.fetch_add(1, Ordering::Relaxed);
            self.outcome.clone().map_err(ActionError::Execution)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Status;

    struct PanickingAction;

    impl Action for PanickingAction {
        fn run<'a>(
            &'a self,
            parameters: &'a Parameters,
        ) -> Pin<Box<dyn Future<Output = Result<ArtifactReference, ActionError>> + Send + 'a>>
        {
            Box::pin(async move {
                if parameters.is_empty() {
                    panic!("report exploded");
                }
                Ok(String::new())
            })
        }
    }

    #[test]
    fn operation_names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
        }
        assert!(matches!(
            "bogus".parse::<Operation>(),
            Err(ActionError::UnknownOperation(name)) if name == "bogus"
        ));
    }

    #[tokio::test]
    async fn day_request_returns_reference() {
        let action = Arc::new(StubAction::returning("https://disk/x.xlsx"));
        let executor = ActionExecutor::new().with_action(Operation::Day, action.clone());

        let resp = executor
            .handle(br#"{"operation":"day","parameters":{}}"#)
            .await;

        assert_eq!(resp, Response::ok(vec!["https://disk/x.xlsx".into()]));
        assert_eq!(resp.message, "Успешно");
        assert_eq!(action.call_count(), 1);
    }

    #[tokio::test]
    async fn unknown_operation_becomes_error_response() {
        let executor = ActionExecutor::new()
            .with_action(Operation::Day, Arc::new(StubAction::returning("x")));

        let resp = executor.handle(br#"{"operation":"bogus"}"#).await;

        assert_eq!(resp.status, Status::Error);
        assert_eq!(resp.message, "Неизвестный тип отчёта");
        assert!(resp.result.is_empty());
    }

    #[tokio::test]
    async fn known_but_unregistered_operation_is_unknown() {
        let executor = ActionExecutor::new();
        let err = executor
            .execute("last_month", &Parameters::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::UnknownOperation(_)));
    }

    #[tokio::test]
    async fn action_failure_carries_its_message() {
        let executor = ActionExecutor::new()
            .with_action(Operation::Week, Arc::new(StubAction::failing("report service down")));

        let resp = executor.handle(br#"{"operation":"week"}"#).await;

        assert_eq!(resp, Response::error("report service down"));
    }

    #[tokio::test]
    async fn undecodable_body_becomes_error_response() {
        let executor = ActionExecutor::new();
        let resp = executor.handle(b"\xff\xfe").await;
        assert_eq!(resp.status, Status::Error);
        assert!(resp.message.starts_with("invalid request"));
    }

    #[tokio::test]
    async fn panicking_action_is_contained() {
        let executor =
            ActionExecutor::new().with_action(Operation::Month, Arc::new(PanickingAction));

        let err = executor
            .execute("month", &Parameters::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ActionError::Execution(_)));
    }
}
