//! Error wrapper that remembers where an error was raised.
//!
//! In debug builds a backtrace is captured the moment an error gets wrapped,
//! which makes store errors that bubble up through the runner a lot easier to
//! place. Release builds carry the bare error.

use std::{
	backtrace::Backtrace,
	error::Error,
	fmt::{self, Debug, Display},
	ops::Deref,
	result::Result as StdResult,
};


pub type Result<T, E> = StdResult<T, Traced<E>>;

pub trait Traceable<E> {
	fn trace(self) -> Traced<E>;
}

pub trait TraceableResult<T, E> {
	fn trace_result(self) -> self::Result<T, E>;
}

pub struct Traced<E> {
	inner: E,
	#[cfg(debug_assertions)]
	backtrace: Backtrace,
}


/// Shorthand for returning a traced error from a function.
pub fn err<T, E>(inner: E) -> Result<T, E> { Err(Traced::new(inner)) }


impl<E> Traceable<E> for E {
	fn trace(self) -> Traced<E> { Traced::new(self) }
}

impl<T, E> TraceableResult<T, E> for StdResult<T, E> {
	fn trace_result(self) -> self::Result<T, E> { self.map_err(Traced::new) }
}

impl<E> Traced<E> {
	pub fn new(inner: E) -> Self {
		Self {
			inner,
			#[cfg(debug_assertions)]
			backtrace: Backtrace::capture(),
		}
	}

	#[cfg(debug_assertions)]
	pub fn backtrace(&self) -> Option<&Backtrace> { Some(&self.backtrace) }

	#[cfg(not(debug_assertions))]
	pub fn backtrace(&self) -> Option<&Backtrace> { None }

	pub fn into_inner(self) -> E { self.inner }

	/// Converts the inner error while keeping the captured backtrace.
	pub fn map<F, O>(self, op: O) -> Traced<F>
	where
		O: FnOnce(E) -> F,
	{
		Traced {
			inner: op(self.inner),
			#[cfg(debug_assertions)]
			backtrace: self.backtrace,
		}
	}
}

impl<E> From<E> for Traced<E> {
	fn from(other: E) -> Self { Self::new(other) }
}

impl<E> Deref for Traced<E> {
	type Target = E;

	fn deref(&self) -> &Self::Target { &self.inner }
}

impl<E> Debug for Traced<E>
where
	E: Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "{:?}", &self.inner)?;
		if let Some(b) = self.backtrace() {
			write!(f, "{}", b)?;
		}
		Ok(())
	}
}

impl<E> Display for Traced<E>
where
	E: Display,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { Display::fmt(&self.inner, f) }
}

impl<E> Error for Traced<E>
where
	E: Error,
{
	fn source(&self) -> Option<&(dyn Error + 'static)> { self.inner.source() }
}
