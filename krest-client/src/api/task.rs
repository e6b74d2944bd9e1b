//! Managed watch and log-follow tasks with reconnect.
use std::fmt::Debug;

use futures::{
    channel::mpsc::{self, UnboundedSender},
    Future, Stream, StreamExt,
};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::{
    api::{subresource::Log, Api},
    client::retry::RetryStrategy,
    Error, Result,
};
use krest_core::{
    params::ListParams,
    subresource::LogParams,
    watch::WatchEvent,
};

/// A cold handle for a managed watch.
///
/// Nothing runs until [`WatchTask::start`] is called; the task then issues
/// the watch, forwards every decoded event, and reconnects whenever the
/// stream ends (however it ended, a server-side 4xx included) until its
/// [`RetryStrategy`] is exhausted.
pub struct WatchTask<K> {
    api: Api<K>,
    params: ListParams,
    strategy: RetryStrategy,
    cancel: CancellationToken,
}

impl<K> WatchTask<K>
where
    K: Clone + DeserializeOwned + Debug + Send + 'static,
{
    pub(crate) fn new(api: Api<K>, params: ListParams, strategy: RetryStrategy) -> Self {
        Self {
            api,
            params,
            strategy,
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn the watch loop and return its event stream.
    ///
    /// The stream buffers without bound: a consumer that cannot keep up
    /// with the server grows the process's memory. Events across a
    /// reconnect may be replayed or skipped; resume points are the
    /// caller's business via [`ListParams::at`].
    ///
    /// The stream ends without error after [`WatchTask::cancel`], and with
    /// [`Error::RetriesExhausted`] when the retry schedule runs out. A task
    /// cancelled before `start` yields an immediately-finished stream.
    pub fn start(&self) -> impl Stream<Item = Result<WatchEvent<K>>> {
        let (tx, rx) = mpsc::unbounded();
        let api = self.api.clone();
        let params = self.params.clone();
        let strategy = self.strategy.clone();
        let cancel = self.cancel.clone();
        let path = api.resource_url().to_string();
        tokio::spawn(async move {
            run(cancel, strategy, tx, path, move || {
                let api = api.clone();
                let params = params.clone();
                async move { api.watch(&params).await }
            })
            .await;
        });
        rx
    }

    /// Stop the task, ending its stream without an error.
    ///
    /// Idempotent; cancelling twice (or before `start`) is a no-op.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// A cold handle for a managed log follow, reconnecting like [`WatchTask`].
pub struct LogTask<K> {
    api: Api<K>,
    name: String,
    params: LogParams,
    strategy: RetryStrategy,
    cancel: CancellationToken,
}

impl<K> LogTask<K>
where
    K: DeserializeOwned + Log + Send + 'static,
{
    pub(crate) fn new(api: Api<K>, name: String, params: LogParams, strategy: RetryStrategy) -> Self {
        Self {
            api,
            name,
            params,
            strategy,
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn the follow loop and return its line stream.
    ///
    /// Buffering and termination behave exactly as
    /// [`WatchTask::start`]; items are the raw log lines.
    pub fn start(&self) -> impl Stream<Item = Result<String>> {
        let (tx, rx) = mpsc::unbounded();
        let api = self.api.clone();
        let name = self.name.clone();
        let params = self.params.clone();
        let strategy = self.strategy.clone();
        let cancel = self.cancel.clone();
        let path = api.resource_url().to_string();
        tokio::spawn(async move {
            run(cancel, strategy, tx, path, move || {
                let api = api.clone();
                let name = name.clone();
                let params = params.clone();
                async move { api.log_lines(&name, &params).await }
            })
            .await;
        });
        rx
    }

    /// Stop the task, ending its stream without an error.
    ///
    /// Idempotent; cancelling twice (or before `start`) is a no-op.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl<K> Api<K>
where
    K: Clone + DeserializeOwned + Debug + Send + 'static,
{
    /// Create a managed watch bound to this resource collection.
    pub fn watch_task(&self, lp: &ListParams, strategy: RetryStrategy) -> WatchTask<K> {
        WatchTask::new(self.clone(), lp.clone(), strategy)
    }
}

impl<K> Api<K>
where
    K: DeserializeOwned + Log + Send + 'static,
{
    /// Create a managed log follow for one object.
    ///
    /// `follow` is implied and forced on.
    pub fn follow_task(&self, name: &str, lp: &LogParams, strategy: RetryStrategy) -> LogTask<K> {
        let mut params = lp.clone();
        params.follow = true;
        LogTask::new(self.clone(), name.to_string(), params, strategy)
    }
}

// The reconnect loop shared by watch and follow tasks. One connection is
// outstanding at a time; every stream termination consults the schedule.
async fn run<E, C, Fut, S>(
    cancel: CancellationToken,
    strategy: RetryStrategy,
    tx: UnboundedSender<Result<E>>,
    path: String,
    mut connect: C,
) where
    C: FnMut() -> Fut,
    Fut: Future<Output = Result<S>>,
    S: Stream<Item = Result<E>>,
{
    let mut schedule = strategy.schedule();
    loop {
        if cancel.is_cancelled() {
            return;
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            connected = connect() => match connected {
                Ok(stream) => {
                    futures::pin_mut!(stream);
                    loop {
                        tokio::select! {
                            _ = cancel.cancelled() => return,
                            item = stream.next() => match item {
                                Some(Ok(event)) => {
                                    if tx.unbounded_send(Ok(event)).is_err() {
                                        // consumer went away
                                        return;
                                    }
                                }
                                Some(Err(err)) => {
                                    tracing::warn!(%err, "stream failed for {path}");
                                    break;
                                }
                                None => {
                                    tracing::debug!("stream ended for {path}");
                                    break;
                                }
                            }
                        }
                    }
                }
                Err(err) => tracing::warn!(%err, "failed to connect stream for {path}"),
            }
        }

        if cancel.is_cancelled() {
            return;
        }
        match schedule.next() {
            Some(attempt) => {
                tracing::debug!(attempt = attempt.attempt, delay = ?attempt.delay, "reconnecting {path}");
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(attempt.delay) => {}
                }
            }
            None => {
                let _ = tx.unbounded_send(Err(Error::RetriesExhausted {
                    attempts: schedule.attempts(),
                    path,
                }));
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{client::retry::RetryStrategy, Client};
    use krest_core::{ApiResource, DynamicObject, GroupVersionKind};

    use std::time::Duration;

    use futures::pin_mut;
    use http::{Request, Response};
    use hyper::Body;
    use tower_test::mock;

    fn pod_resource() -> ApiResource {
        ApiResource::from_gvk(&GroupVersionKind::gvk("", "v1", "Pod")).namespaced(true)
    }

    fn quick_strategy(max_attempts: u32) -> RetryStrategy {
        RetryStrategy {
            initial_delay: Duration::from_millis(1),
            jitter: 0.0,
            policy: crate::client::retry::RetryPolicy::MaxAttempts(max_attempts),
            backoff: crate::client::retry::Backoff::None,
        }
    }

    #[tokio::test]
    async fn watch_task_reconnects_until_exhausted() {
        let (mock_service, handle) = mock::pair::<Request<Body>, Response<Body>>();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            for rv in ["1", "2"] {
                let (request, send) = handle.next_request().await.expect("service not called");
                assert_eq!(
                    request.uri().to_string(),
                    "/api/v1/namespaces/default/pods?watch=true"
                );
                let line = format!(
                    "{{\"type\":\"ADDED\",\"object\":{{\"apiVersion\":\"v1\",\"kind\":\"Pod\",\"metadata\":{{\"name\":\"a\",\"resourceVersion\":\"{rv}\"}}}}}}\n"
                );
                send.send_response(Response::builder().body(Body::from(line)).unwrap());
            }
        });

        let pods: crate::Api<DynamicObject> =
            crate::Api::default_namespaced_with(Client::new(mock_service, "default"), &pod_resource());
        let task = pods.watch_task(&ListParams::default(), quick_strategy(1));
        let stream = task.start();
        pin_mut!(stream);

        let first = stream.next().await.unwrap().unwrap();
        assert!(matches!(first, WatchEvent::Added(_)));
        // stream ends, one reconnect happens, then the budget is spent
        let second = stream.next().await.unwrap().unwrap();
        assert!(matches!(second, WatchEvent::Added(_)));
        match stream.next().await.unwrap() {
            Err(Error::RetriesExhausted { attempts, path }) => {
                assert_eq!(attempts, 1);
                assert_eq!(path, "/api/v1/namespaces/default/pods");
            }
            other => panic!("unexpected item {other:?}"),
        }
        assert!(stream.next().await.is_none());
        spawned.await.unwrap();
    }

    #[tokio::test]
    async fn watch_task_cancelled_before_start_is_empty() {
        let (mock_service, _handle) = mock::pair::<Request<Body>, Response<Body>>();
        let pods: crate::Api<DynamicObject> =
            crate::Api::default_namespaced_with(Client::new(mock_service, "default"), &pod_resource());
        let task = pods.watch_task(&ListParams::default(), RetryStrategy::default());
        task.cancel();
        task.cancel(); // cancelling twice is a no-op
        let events: Vec<_> = task.start().collect().await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn follow_task_forces_follow_and_streams_lines() {
        let (mock_service, handle) = mock::pair::<Request<Body>, Response<Body>>();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            let (request, send) = handle.next_request().await.expect("service not called");
            assert_eq!(
                request.uri().to_string(),
                "/api/v1/namespaces/default/pods/web/log?follow=true&container=app"
            );
            send.send_response(Response::builder().body(Body::from("one\ntwo\n")).unwrap());
        });

        let pods: crate::Api<DynamicObject> =
            crate::Api::default_namespaced_with(Client::new(mock_service, "default"), &pod_resource());
        let lp = LogParams::default().container("app");
        let task = pods.follow_task("web", &lp, quick_strategy(0));
        let stream = task.start();
        pin_mut!(stream);

        assert_eq!(stream.next().await.unwrap().unwrap(), "one");
        assert_eq!(stream.next().await.unwrap().unwrap(), "two");
        match stream.next().await.unwrap() {
            Err(Error::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 0),
            other => panic!("unexpected item {other:?}"),
        }
        spawned.await.unwrap();
    }
}
