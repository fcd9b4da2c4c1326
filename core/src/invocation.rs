// larder/src/invocation.rs

//! Caller-supplied bound on one unit of work (an ingestion run or a query).
//!
//! Every store and cache call made on behalf of an invocation goes through
//! [`Invocation::run`], so nothing blocks past the deadline or after the
//! caller cancels.

use crate::error::CatalogError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Invocation {
  deadline: Option<Instant>,
  cancel_rx: watch::Receiver<bool>,
  // Keeps the channel open for invocations nobody can cancel.
  _owned_tx: Option<std::sync::Arc<watch::Sender<bool>>>,
}

/// Trips every clone of the `Invocation` it was created with.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
  pub fn cancel(&self) {
    // send_replace never fails, even if every receiver is gone.
    self.0.send_replace(true);
  }
}

impl Invocation {
  /// No deadline and no way to cancel.
  pub fn unbounded() -> Self {
    let (tx, rx) = watch::channel(false);
    Self {
      deadline: None,
      cancel_rx: rx,
      _owned_tx: Some(std::sync::Arc::new(tx)),
    }
  }

  pub fn with_deadline(deadline: Instant) -> Self {
    Self {
      deadline: Some(deadline),
      ..Self::unbounded()
    }
  }

  pub fn with_timeout(timeout: Duration) -> Self {
    Self::with_deadline(Instant::now() + timeout)
  }

  /// An invocation the caller can abort through the returned handle.
  pub fn cancellable() -> (Self, CancelHandle) {
    let (tx, rx) = watch::channel(false);
    let inv = Self {
      deadline: None,
      cancel_rx: rx,
      _owned_tx: None,
    };
    (inv, CancelHandle(tx))
  }

  /// Adds a deadline to this invocation, keeping the earlier of the two.
  pub fn and_timeout(mut self, timeout: Duration) -> Self {
    let candidate = Instant::now() + timeout;
    self.deadline = Some(match self.deadline {
      Some(existing) if existing < candidate => existing,
      _ => candidate,
    });
    self
  }

  pub fn deadline(&self) -> Option<Instant> {
    self.deadline
  }

  pub fn is_cancelled(&self) -> bool {
    if *self.cancel_rx.borrow() {
      return true;
    }
    matches!(self.deadline, Some(d) if Instant::now() >= d)
  }

  /// Drives `fut` unless the invocation is cancelled or its deadline passes
  /// first. A losing future is dropped without being polled again.
  pub async fn run<F>(&self, fut: F) -> Result<F::Output, CatalogError>
  where
    F: Future,
  {
    if self.is_cancelled() {
      return Err(CatalogError::Cancelled);
    }

    let mut cancel_rx = self.cancel_rx.clone();
    let cancelled = async move {
      let sender_gone = cancel_rx.wait_for(|flag| *flag).await.is_err();
      if sender_gone {
        std::future::pending::<()>().await;
      }
    };
    let expired = async {
      match self.deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
      }
    };

    tokio::select! {
      output = fut => Ok(output),
      _ = cancelled => Err(CatalogError::Cancelled),
      _ = expired => Err(CatalogError::Cancelled),
    }
  }
}

impl Default for Invocation {
  fn default() -> Self {
    Self::unbounded()
  }
}
