//! HTTP date header value management service.
//!
//! Formatting an RFC 1123 date on every response is wasteful under load, so
//! the formatted value is cached process-wide and refreshed lazily once it is
//! older than the update interval. Readers never block: the value lives in an
//! [`ArcSwap`] and a stale reader simply formats and stores a fresh one.

use arc_swap::ArcSwap;
use bytes::Bytes;
use http::HeaderValue;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cached, periodically refreshed HTTP date string.
#[derive(Debug)]
pub struct DateService {
    current: ArcSwap<CachedDate>,
    update_interval: Duration,
}

#[derive(Debug)]
struct CachedDate {
    formatted_at: Instant,
    value: Bytes,
}

static DATE_SERVICE: Lazy<DateService> = Lazy::new(|| DateService::new_with_update_interval(Duration::from_millis(800)));

impl DateService {
    /// Returns the process-wide instance.
    pub fn global() -> &'static DateService {
        &DATE_SERVICE
    }

    fn new_with_update_interval(update_interval: Duration) -> Self {
        Self { current: ArcSwap::from_pointee(CachedDate::now()), update_interval }
    }

    /// Provides the current HTTP date as a header value.
    pub fn with_http_date<F>(&self, mut f: F)
    where
        F: FnMut(HeaderValue),
    {
        let mut cached = self.current.load_full();
        if cached.formatted_at.elapsed() >= self.update_interval {
            cached = Arc::new(CachedDate::now());
            self.current.store(Arc::clone(&cached));
        }

        // faf_http_date always produces visible ASCII, so this never falls through
        if let Ok(value) = HeaderValue::from_maybe_shared(cached.value.clone()) {
            f(value);
        }
    }
}

impl CachedDate {
    fn now() -> Self {
        let mut buf = faf_http_date::get_date_buff_no_key();
        faf_http_date::get_date_no_key(&mut buf);
        Self { formatted_at: Instant::now(), value: Bytes::from_owner(buf) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_rfc_1123_gmt() {
        let mut date = None;
        DateService::global().with_http_date(|value| date = Some(value));

        let date = date.unwrap();
        let text = date.to_str().unwrap();
        assert_eq!(text.len(), 29);
        assert!(text.ends_with(" GMT"));
        assert_eq!(&text[3..5], ", ");
    }

    #[test]
    fn refreshes_when_stale() {
        let service = DateService::new_with_update_interval(Duration::ZERO);
        let before = service.current.load_full();

        service.with_http_date(|_| {});

        assert!(!Arc::ptr_eq(&before, &service.current.load_full()));
    }
}
