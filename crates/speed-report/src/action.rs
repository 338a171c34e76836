use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::NaiveDate;
use speed_core::{
    Action, ActionError, ActionExecutor, ArtifactReference, ArtifactStore, Operation, Parameters,
    param,
};

use crate::source::ReportSource;
use crate::window::ReportWindow;

/// Fetch the report for one operation's window and store it, returning the
/// stored file's public link.
pub struct ReportAction {
    operation: Operation,
    source: Arc<dyn ReportSource>,
    store: Arc<dyn ArtifactStore>,
    today: Option<NaiveDate>,
}

impl ReportAction {
    pub fn new(
        operation: Operation,
        source: Arc<dyn ReportSource>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            operation,
            source,
            store,
            today: None,
        }
    }

    /// Pin "today" instead of reading the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

impl Action for ReportAction {
    fn run<'a>(
        &'a self,
        parameters: &'a Parameters,
    ) -> Pin<Box<dyn Future<Output = Result<ArtifactReference, ActionError>> + Send + 'a>> {
        Box::pin(async move {
            let window = ReportWindow::for_operation(self.operation, parameters, self.today())?;
            let name = match self.operation {
                Operation::DateRange => param(parameters, "name")
                    .map(str::to_string)
                    .unwrap_or_else(|| window.file_name()),
                _ => window.file_name(),
            };

            let bytes = self.source.fetch(&window).await?;
            let reference = self.store.store(&bytes, &name).await?;

            tracing::info!(
                operation = %self.operation,
                file = %name,
                store = self.store.backend_name(),
                "Report stored"
            );
            Ok(reference)
        })
    }
}

/// Register a [`ReportAction`] for every operation.
pub fn register_reports(
    executor: ActionExecutor,
    source: Arc<dyn ReportSource>,
    store: Arc<dyn ArtifactStore>,
) -> ActionExecutor {
    Operation::ALL.into_iter().fold(executor, |executor, op| {
        executor.with_action(
            op,
            Arc::new(ReportAction::new(op, source.clone(), store.clone())),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StubReportSource;
    use crate::window::parse_date;
    use speed_core::{ErrorKind, Status};
    use speed_storage::{CollisionPolicy, DiskStore, MemoryBackend};
    use std::time::Duration;

    fn memory_store(backend: Arc<MemoryBackend>) -> Arc<DiskStore> {
        Arc::new(
            DiskStore::new(backend, "disk:/reports").with_policy(CollisionPolicy {
                attempts: 3,
                backoff: Duration::from_millis(10),
            }),
        )
    }

    #[tokio::test]
    async fn day_report_is_fetched_and_stored() {
        let source = Arc::new(StubReportSource::new(b"xlsx-bytes"));
        let backend = Arc::new(MemoryBackend::new());
        let action = ReportAction::new(Operation::Day, source.clone(), memory_store(backend.clone()))
            .with_today(parse_date("2024-05-16").unwrap());

        let link = action.run(&Parameters::new()).await.unwrap();

        assert_eq!(link, "memory://disk:/reports/report_from 2024-05-16.xlsx");
        assert_eq!(source.requests(), vec![ReportWindow::day(parse_date("2024-05-16").unwrap())]);
        assert!(backend.contains("disk:/reports/report_from 2024-05-16.xlsx"));
    }

    #[tokio::test]
    async fn date_range_honours_custom_name() {
        let source = Arc::new(StubReportSource::new(b"x"));
        let backend = Arc::new(MemoryBackend::new());
        let action = ReportAction::new(Operation::DateRange, source, memory_store(backend));

        let mut params = Parameters::new();
        params.insert("start_date".into(), Some("2024-01-01".into()));
        params.insert("end_date".into(), Some("2024-01-31".into()));
        params.insert("name".into(), Some("january.xlsx".into()));

        let link = action.run(&params).await.unwrap();
        assert_eq!(link, "memory://disk:/reports/january.xlsx");
    }

    #[tokio::test]
    async fn source_failure_is_an_execution_error() {
        let source = Arc::new(StubReportSource::failing("connection reset"));
        let backend = Arc::new(MemoryBackend::new());
        let action = ReportAction::new(Operation::Week, source, memory_store(backend.clone()));

        let err = action.run(&Parameters::new()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ActionExecution);
        assert!(err.to_string().contains("connection reset"));
        assert!(backend.upload_attempts().is_empty());
    }

    #[tokio::test]
    async fn registered_executor_answers_every_operation() {
        let source = Arc::new(StubReportSource::new(b"x"));
        let backend = Arc::new(MemoryBackend::new());
        let executor = register_reports(ActionExecutor::new(), source, memory_store(backend));

        assert_eq!(executor.operations().collect::<Vec<_>>().len(), Operation::ALL.len());

        let resp = executor.handle(br#"{"operation":"last_month"}"#).await;
        assert_eq!(resp.status, Status::Ok);
        assert_eq!(resp.result.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_names_surface_as_error_response() {
        let source = Arc::new(StubReportSource::new(b"x"));
        let backend = Arc::new(
            MemoryBackend::new()
                .with_object("disk:/reports/r.xlsx", b"")
                .with_object("disk:/reports/r(1).xlsx", b"")
                .with_object("disk:/reports/r(2).xlsx", b""),
        );
        let executor = register_reports(ActionExecutor::new(), source, memory_store(backend));

        let resp = executor
            .handle(
                br#"{"operation":"date_range","parameters":{"start_date":"2024-01-01","end_date":"2024-01-02","name":"r.xlsx"}}"#,
            )
            .await;

        assert_eq!(resp.status, Status::Error);
        assert!(resp.message.starts_with("Please rename upload file"));
        assert!(resp.result.is_empty());
    }
}
