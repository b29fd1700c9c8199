use std::time::Duration;
use tokio::sync::mpsc::Receiver;

/// Waits for the first item, then keeps accepting until `max_batch`
/// items arrived or `timeout` elapsed since that first item. Returns
/// `None` once the channel is closed and drained.
pub async fn next_batch<T>(rx: &mut Receiver<T>, max_batch: usize, timeout: Duration) -> Option<Vec<T>> {
    let first = rx.recv().await?;

    let mut batch = Vec::with_capacity(max_batch);
    batch.push(first);

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    while batch.len() < max_batch {
        tokio::select! {
            biased;
            _ = &mut deadline => break,
            item = rx.recv() => match item {
                Some(item) => batch.push(item),
                None => break,
            },
        }
    }

    Some(batch)
}
