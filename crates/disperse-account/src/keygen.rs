//! Parallel generation of ephemeral recipient accounts.
//!
//! Keys are independent, so generation fans out over the blocking pool in
//! contiguous chunks and fans back in with `join_all`, which keeps chunk
//! order. The result is indexed 0..n-1 no matter which worker finished first.

use crate::{AccountError, LocalAccount};
use disperse_types::RecipientAccount;
use futures::future::join_all;

/// Generates `count` fresh accounts.
///
/// Every key comes from the operating system's CSPRNG.
///
/// # Arguments
///
/// * `count` - Number of accounts to generate; zero spawns nothing
///
/// # Returns
///
/// Exactly `count` accounts with distinct addresses, in generation order.
///
/// # Errors
///
/// Returns `AccountError::Generation` if any worker fails, for example
/// because the random source is unavailable.
pub async fn generate_accounts(count: usize) -> Result<Vec<RecipientAccount>, AccountError> {
	if count == 0 {
		return Ok(Vec::new());
	}

	let workers = std::thread::available_parallelism()
		.map(|n| n.get())
		.unwrap_or(1)
		.min(count);
	let chunk_size = count.div_ceil(workers);

	tracing::debug!(count, workers, "Generating recipient accounts");

	let tasks = (0..workers).map(|worker| {
		let start = worker * chunk_size;
		let len = chunk_size.min(count.saturating_sub(start));
		tokio::task::spawn_blocking(move || {
			(0..len)
				.map(|_| LocalAccount::random().into_recipient())
				.collect::<Vec<_>>()
		})
	});

	let mut accounts = Vec::with_capacity(count);
	for (worker, result) in join_all(tasks).await.into_iter().enumerate() {
		let chunk = result.map_err(|e| {
			AccountError::Generation(format!("Worker {} failed: {}", worker, e))
		})?;
		accounts.extend(chunk);
	}

	if accounts.len() != count {
		return Err(AccountError::Generation(format!(
			"Expected {} accounts, generated {}",
			count,
			accounts.len()
		)));
	}

	Ok(accounts)
}
