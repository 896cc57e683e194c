use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::error::QueueError;
use crate::jobs::UnitOfWork;

use super::JobQueue;

/// In-process bounded queue for single-process deployments and tests.
pub struct MemoryJobQueue {
    sender: std::sync::Mutex<Option<mpsc::Sender<UnitOfWork>>>,
    receiver: Mutex<mpsc::Receiver<UnitOfWork>>,
}

impl MemoryJobQueue {
    /// Queue holding at most `capacity` units (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender: std::sync::Mutex::new(Some(sender)),
            receiver: Mutex::new(receiver),
        }
    }

    /// Stop accepting work; queued units can still be drained.
    pub fn close(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.sender.lock().map_or(true, |sender| sender.is_none())
    }

    fn sender(&self) -> Result<mpsc::Sender<UnitOfWork>, QueueError> {
        let guard = self
            .sender
            .lock()
            .map_err(|_| QueueError::Backend("memory queue lock poisoned".to_string()))?;
        guard.clone().ok_or(QueueError::Closed)
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, unit: &UnitOfWork) -> Result<(), QueueError> {
        let sender = self.sender()?;
        sender
            .try_send(unit.clone())
            .map_err(|error| match error {
                mpsc::error::TrySendError::Full(_) => {
                    QueueError::Backend("memory queue is full".to_string())
                }
                mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
            })
    }

    async fn dequeue(&self, wait: Duration) -> Result<Option<UnitOfWork>, QueueError> {
        let recv = async {
            let mut receiver = self.receiver.lock().await;
            receiver.recv().await
        };
        match tokio::time::timeout(wait, recv).await {
            Ok(Some(unit)) => Ok(Some(unit)),
            Ok(None) => Err(QueueError::Closed),
            Err(_) => Ok(None),
        }
    }
}
