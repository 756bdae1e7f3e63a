//! Utilities for logging messages from the library.

use once_cell::sync::Lazy;

#[doc(hidden)]
#[macro_export]
macro_rules! fegraph_log {
    (
        $session:expr,
        $($arg:tt)+
    ) => {
        if $session.log_enabled() {
            println!("{}", format_args!($($arg)+));
        }
    };
}

/// Whether the `FEGRAPH_LOG` environment variable is set.
pub fn log_enabled() -> bool {
    static ENABLED: Lazy<bool> = Lazy::new(|| ::std::env::var_os("FEGRAPH_LOG").is_some());

    *ENABLED
}
