// Logging wrappers gated on the 'logging' feature. When the feature is
// disabled these compile to nothing, so callers never need their own cfg.

macro_rules! debug {
    ($($tt:tt)*) => {
        #[cfg(feature = "logging")]
        {
            log::debug!($($tt)*);
        }
    }
}

macro_rules! trace {
    ($($tt:tt)*) => {
        #[cfg(feature = "logging")]
        {
            log::trace!($($tt)*);
        }
    }
}

macro_rules! warn_log {
    ($($tt:tt)*) => {
        #[cfg(feature = "logging")]
        {
            log::warn!($($tt)*);
        }
    }
}
