//! Line-based terminal prompts.
//!
//! Stdin is read on the blocking pool so a prompt never stalls the runtime.

use std::fmt::Display;
use std::io::{self, BufRead, Write};

/// Prints `question` and returns the trimmed answer.
///
/// End of input is reported as [`io::ErrorKind::UnexpectedEof`].
pub async fn ask(question: impl Into<String>) -> io::Result<String> {
	let question = question.into();
	tokio::task::spawn_blocking(move || {
		let mut stdout = io::stdout().lock();
		write!(stdout, "{}", question)?;
		stdout.flush()?;

		let mut line = String::new();
		if io::stdin().lock().read_line(&mut line)? == 0 {
			return Err(io::Error::new(
				io::ErrorKind::UnexpectedEof,
				"input closed",
			));
		}
		Ok(line.trim().to_string())
	})
	.await
	.map_err(io::Error::other)?
}

/// Asks a yes/no question. Only `y` or `yes` counts as yes.
pub async fn confirm(question: &str) -> io::Result<bool> {
	let answer = ask(format!("{} (y/n): ", question)).await?;
	Ok(is_yes(&answer))
}

/// Asks until `parse` accepts the answer.
///
/// An empty answer yields `default` when one is given.
pub async fn ask_with<T, E, F>(question: &str, default: Option<T>, parse: F) -> io::Result<T>
where
	T: Clone,
	E: Display,
	F: Fn(&str) -> Result<T, E>,
{
	loop {
		let answer = ask(question).await?;
		if answer.is_empty() {
			if let Some(default) = &default {
				return Ok(default.clone());
			}
		}
		match parse(&answer) {
			Ok(value) => return Ok(value),
			Err(e) => println!("Invalid input: {}", e),
		}
	}
}

fn is_yes(answer: &str) -> bool {
	matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
