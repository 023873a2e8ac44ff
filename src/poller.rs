//! Fixed-interval poller for long-running generation jobs.
//!
//! Video synthesis does not complete synchronously: submitting a job yields
//! an opaque handle that must be re-fetched until the operation reports
//! `done`. The handle may be replaced by each poll response, so every tick
//! polls with the most recently returned handle, never the original. The
//! interval is the waiting protocol for an in-progress job, not error
//! recovery; a hard poll or fetch failure propagates immediately.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::client::{GenerationRequest, GenerationService, OperationHandle};
use crate::errors::PollError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct OperationPoller {
    service: Arc<dyn GenerationService>,
    interval: Duration,
}

impl OperationPoller {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self {
            service,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Drive a job to its terminal result and resolve it into bytes.
    ///
    /// The poller exclusively owns the handle for the duration of the loop.
    /// There is no in-band cancellation: a caller abandoning the future
    /// stops the loop at its next suspension point, and a poll already in
    /// flight is allowed to complete.
    pub async fn poll_to_completion(
        &self,
        handle: OperationHandle,
    ) -> Result<Vec<u8>, PollError> {
        let mut handle = handle;
        let mut ticks = 0u32;
        loop {
            let operation = self.service.poll_operation(&handle).await?;
            ticks += 1;
            if operation.done {
                debug!(ticks, "operation terminal; resolving result");
                let result = operation.result.ok_or(PollError::MissingResult)?;
                return self.service.fetch_resource(&result).await;
            }
            // Poll with whatever the service called the job this time.
            handle = operation.handle;
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Submit a video job and wait for its bytes.
    pub async fn generate_video(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<u8>, PollError> {
        let handle = self.service.start_video_job(request).await?;
        debug!(handle = %handle.0, "video job submitted");
        self.poll_to_completion(handle).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{GenerationOutcome, Operation, ResultRef};
    use crate::errors::GenerationError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Mock service that replays a script of poll responses and records
    /// every handle it was polled with.
    struct ScriptedOperations {
        script: Mutex<VecDeque<Result<Operation, PollError>>>,
        polled_handles: Mutex<Vec<String>>,
        fetches: Mutex<Vec<String>>,
    }

    impl ScriptedOperations {
        fn new(script: Vec<Result<Operation, PollError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                polled_handles: Mutex::new(Vec::new()),
                fetches: Mutex::new(Vec::new()),
            }
        }

        fn poll_count(&self) -> usize {
            self.polled_handles.lock().unwrap().len()
        }

        fn fetch_count(&self) -> usize {
            self.fetches.lock().unwrap().len()
        }
    }

    fn pending(handle: &str) -> Result<Operation, PollError> {
        Ok(Operation {
            handle: OperationHandle(handle.to_string()),
            done: false,
            result: None,
        })
    }

    fn terminal(handle: &str, uri: &str) -> Result<Operation, PollError> {
        Ok(Operation {
            handle: OperationHandle(handle.to_string()),
            done: true,
            result: Some(ResultRef(uri.to_string())),
        })
    }

    #[async_trait]
    impl GenerationService for ScriptedOperations {
        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<GenerationOutcome, GenerationError> {
            unimplemented!("not used by poller tests")
        }

        async fn start_video_job(
            &self,
            _request: &GenerationRequest,
        ) -> Result<OperationHandle, PollError> {
            Ok(OperationHandle("op-1".to_string()))
        }

        async fn poll_operation(&self, handle: &OperationHandle) -> Result<Operation, PollError> {
            self.polled_handles.lock().unwrap().push(handle.0.clone());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("polled past the end of the script"))
        }

        async fn fetch_resource(&self, result: &ResultRef) -> Result<Vec<u8>, PollError> {
            self.fetches.lock().unwrap().push(result.0.clone());
            Ok(b"video-bytes".to_vec())
        }
    }

    fn poller(service: Arc<ScriptedOperations>) -> OperationPoller {
        OperationPoller::new(service).with_interval(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn polls_exactly_until_done_then_fetches_once() {
        let service = Arc::new(ScriptedOperations::new(vec![
            pending("op-1"),
            pending("op-1"),
            terminal("op-1", "https://example.com/v.mp4"),
        ]));
        let bytes = poller(service.clone())
            .poll_to_completion(OperationHandle("op-1".to_string()))
            .await
            .unwrap();

        assert_eq!(bytes, b"video-bytes");
        assert_eq!(service.poll_count(), 3);
        assert_eq!(service.fetch_count(), 1);
    }

    #[tokio::test]
    async fn polls_with_the_most_recently_returned_handle() {
        // The service renames the job on the first poll; the second poll
        // must use the replacement, not the original.
        let service = Arc::new(ScriptedOperations::new(vec![
            pending("op-renamed"),
            terminal("op-renamed", "https://example.com/v.mp4"),
        ]));
        poller(service.clone())
            .poll_to_completion(OperationHandle("op-original".to_string()))
            .await
            .unwrap();

        let handles = service.polled_handles.lock().unwrap().clone();
        assert_eq!(handles, vec!["op-original", "op-renamed"]);
    }

    #[tokio::test]
    async fn poll_failure_propagates_immediately() {
        let service = Arc::new(ScriptedOperations::new(vec![
            pending("op-1"),
            Err(PollError::Service {
                status: 500,
                message: "internal".to_string(),
            }),
        ]));
        let err = poller(service.clone())
            .poll_to_completion(OperationHandle("op-1".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(err, PollError::Service { status: 500, .. }));
        assert_eq!(service.poll_count(), 2);
        assert_eq!(service.fetch_count(), 0);
    }

    #[tokio::test]
    async fn done_without_result_is_an_error() {
        let service = Arc::new(ScriptedOperations::new(vec![Ok(Operation {
            handle: OperationHandle("op-1".to_string()),
            done: true,
            result: None,
        })]));
        let err = poller(service)
            .poll_to_completion(OperationHandle("op-1".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::MissingResult));
    }

    #[tokio::test]
    async fn generate_video_submits_then_polls() {
        let service = Arc::new(ScriptedOperations::new(vec![terminal(
            "op-1",
            "https://example.com/v.mp4",
        )]));
        let request = GenerationRequest::from_prompt("a slow zoom over dunes");
        let bytes = poller(service.clone())
            .generate_video(&request)
            .await
            .unwrap();

        assert_eq!(bytes, b"video-bytes");
        assert_eq!(service.poll_count(), 1);
        let fetches = service.fetches.lock().unwrap().clone();
        assert_eq!(fetches, vec!["https://example.com/v.mp4"]);
    }
}
