//! Label and immutable field checks against policy tables
//!
//! Both validators fail open: an unreadable table or a kind without an entry
//! allows the request, only an actual violation denies it.

mod immutables;
mod labels;

pub use immutables::{check_immutables, validate_immutables};
pub use labels::{check_labels, validate_labels};

/// Outcome of a single check
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
	pub allowed: bool,
	pub message: String,
}

impl Verdict {
	pub fn allow() -> Self {
		Self {
			allowed: true,
			message: String::new(),
		}
	}

	/// Allowed, with a diagnostic about why nothing was checked
	pub fn allow_with(message: impl Into<String>) -> Self {
		Self {
			allowed: true,
			message: message.into(),
		}
	}

	pub fn deny(message: impl Into<String>) -> Self {
		Self {
			allowed: false,
			message: message.into(),
		}
	}
}
