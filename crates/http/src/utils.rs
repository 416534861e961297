//! Small helpers shared by the codec and connection code.

/// Returns early with `$error` unless `$predicate` holds.
///
/// Works like `assert!` but for fallible code paths:
///
/// ```ignore
/// ensure!(src.len() <= MAX_HEAD_BYTES, ParseError::too_large_header(src.len(), MAX_HEAD_BYTES));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
