use parking_lot::Mutex;
use url::Url;

use crate::traits::Navigator;

/// [`Navigator`] that keeps the most recent target instead of leaving the page.
///
/// Hosts without a browser (desktop shells, CLIs) read the URL back with
/// [`take`](Self::take) and open it themselves.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    last: Mutex<Option<Url>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last(&self) -> Option<Url> {
        self.last.lock().clone()
    }

    pub fn take(&self) -> Option<Url> {
        self.last.lock().take()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &Url) {
        tracing::debug!(host = ?url.host_str(), path = url.path(), "Navigation requested");
        *self.last.lock() = Some(url.clone());
    }
}
