//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// Cancel-on-drop task handles and a resettable timeout task.
//

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use derive_new::new;
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task;
use tokio::time::Instant;
use tracing::error;

/// A handle to a spawned task. Dropping it aborts the task unless
/// [`Task::detach`] was called.
#[derive(Debug)]
pub struct Task<T> {
    join_handle: task::JoinHandle<T>,
    detached: bool,
}

impl<T> Task<T> {
    pub fn spawn<Fut>(future: Fut) -> Task<T>
    where
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        Task {
            join_handle: task::spawn(future),
            detached: false,
        }
    }

    pub fn detach(&mut self) {
        self.detached = true;
    }
}

impl<T> Future for Task<T> {
    type Output = Result<T, task::JoinError>;

    fn poll(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Self::Output> {
        Pin::new(&mut self.join_handle).poll(cx)
    }
}

impl<T> Drop for Task<T> {
    fn drop(&mut self) {
        if !self.detached {
            self.join_handle.abort();
        }
    }
}

#[derive(Debug)]
enum Message {
    Reset(Duration),
}

/// A cancellable, resettable one-shot timer. Used for both the rx-timeout
/// deadline and, re-armed on every firing, the keepalive send interval.
///
/// Dropping the handle cancels the underlying task.
#[derive(Debug)]
pub struct TimeoutTask {
    inner: TimeoutTaskInner,
}

#[derive(Debug, new)]
struct TimeoutTaskInner {
    _task: Task<()>,
    control: UnboundedSender<Message>,
    next: Arc<Mutex<Instant>>,
}

impl TimeoutTask {
    /// Spawns a task that invokes `cb` once, when `timeout` elapses without
    /// an intervening [`reset`](TimeoutTask::reset).
    pub fn new<F, Fut>(timeout: Duration, cb: F) -> TimeoutTask
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (control_tx, mut control_rx) = mpsc::unbounded_channel();

        let next = Arc::new(Mutex::new(Instant::now() + timeout));
        let next_child = next.clone();

        let task = Task::spawn(async move {
            let sleep = tokio::time::sleep(timeout);
            tokio::pin!(sleep);

            loop {
                tokio::select! {
                    _ = &mut sleep => {
                        cb().await;
                        break;
                    }
                    message = control_rx.recv() => {
                        match message {
                            Some(Message::Reset(new_timeout)) => {
                                let next = Instant::now() + new_timeout;
                                sleep.as_mut().reset(next);
                                *next_child.lock().unwrap() = next;
                            }
                            None => break,
                        }
                    }
                }
            }
        });

        TimeoutTask {
            inner: TimeoutTaskInner::new(task, control_tx, next),
        }
    }

    /// Re-arms the deadline, discarding whatever time was already elapsed.
    pub fn reset(&mut self, timeout: Duration) {
        if self.inner.control.send(Message::Reset(timeout)).is_err() {
            error!("failed to reset timeout task, it may have already fired");
        }
    }

    pub fn remaining(&self) -> Duration {
        let next = self.inner.next.lock().unwrap();
        next.saturating_duration_since(Instant::now())
    }
}
