//! Dispatch pool: fans out one test case's payloads against one WAF with
//! bounded parallelism, collecting results in input order.

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::errors::AppError;
use crate::models::Payload;
use crate::services::sender::{RequestSender, SendOutcome};

/// Send every payload to `base_url + payload.url` with at most
/// `concurrency` requests in flight, returning one outcome per payload in
/// the same order as the input list.
///
/// Blocks until every payload has completed. Individual failures are
/// isolated by the sender's own retry contract, so one slow or dead
/// payload never aborts the batch.
pub async fn dispatch(
    sender: &RequestSender,
    payloads: &[Payload],
    base_url: &str,
    concurrency: usize,
) -> Result<Vec<SendOutcome>, AppError> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(payloads.len());

    for payload in payloads {
        let sender = sender.clone();
        let semaphore = Arc::clone(&semaphore);
        let url = format!("{base_url}{}", payload.url);
        let payload = payload.clone();

        handles.push(tokio::spawn(async move {
            // The semaphore is never closed, acquisition cannot fail.
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return SendOutcome::no_response(),
            };
            sender
                .send(&payload.method, &url, Some(&payload.headers), Some(&payload.data))
                .await
        }));
    }

    // Joining in spawn order preserves the positional correspondence the
    // recorder relies on.
    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        let outcome = handle
            .await
            .map_err(|e| AppError::Internal(format!("Dispatch worker panicked: {e}")))?;
        outcomes.push(outcome);
    }
    Ok(outcomes)
}
