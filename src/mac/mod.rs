/// Builds an [`crate::err::Error::Unreachable`] with a formatted message, for states the
/// type system should already have ruled out.
#[macro_export]
#[doc(hidden)]
macro_rules! fail {
	($($arg:tt)*) => {
		$crate::err::Error::Unreachable(format!($($arg)*))
	};
}

/// Lazily parses a value from an environment variable, falling back to a
/// default if the variable is unset or fails to parse.
#[macro_export]
macro_rules! lazy_env_parse {
	($key:expr, $t:ty, $default:expr) => {
		once_cell::sync::Lazy::new(|| {
			std::env::var($key)
				.and_then(|s| Ok(s.parse::<$t>().unwrap_or($default)))
				.unwrap_or($default)
		})
	};
}
