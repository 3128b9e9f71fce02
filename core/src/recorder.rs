//! Recording of HTTP exchanges into HAR logs.
//!
//! # Design
//! A `RequestRecorder` is shared through `Arc` between the interfaces that
//! feed it and the plugin that resets and saves it around each scenario.
//! Recording is off until `enable` is called, so attaching a recorder to an
//! interface costs nothing when request saving was not requested.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::error::Result;
use crate::har::{self, Creator, Entry, Exchange, Har, Log};

#[derive(Debug)]
pub struct RequestRecorder {
    creator: Creator,
    enabled: AtomicBool,
    entries: Mutex<Vec<Entry>>,
}

impl Default for RequestRecorder {
    fn default() -> Self {
        Self::new(Creator::default())
    }
}

impl RequestRecorder {
    pub fn new(creator: Creator) -> Self {
        Self {
            creator,
            enabled: AtomicBool::new(false),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Store `exchange` as a HAR entry. Does nothing while disabled.
    pub fn record(&self, exchange: &Exchange<'_>) {
        if !self.is_enabled() {
            return;
        }
        let entry = har::format_entry(exchange);
        debug!(method = %entry.request.method, url = %entry.request.url, "recorded exchange");
        self.lock().push(entry);
    }

    /// Snapshot of the entries recorded so far.
    pub fn entries(&self) -> Vec<Entry> {
        self.lock().clone()
    }

    pub fn reset(&self) {
        self.lock().clear();
    }

    /// Current entries wrapped in a complete HAR document.
    pub fn to_har(&self) -> Har {
        Har {
            log: Log::new(self.creator.clone(), self.entries()),
        }
    }

    /// Write the recorded entries to `path` as pretty-printed HAR JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let har = self.to_har();
        let json = serde_json::to_string_pretty(&har)?;
        fs::write(path, json)?;
        debug!(path = %path.display(), entries = har.log.entries.len(), "saved HAR file");
        Ok(())
    }

    // A panic while holding the lock leaves the Vec intact, so keep going.
    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{PreparedRequest, RequestOptions};
    use crate::response::Response;
    use chrono::Utc;
    use reqwest::Method;

    fn record_one(recorder: &RequestRecorder, path: &str) {
        let request =
            PreparedRequest::new("http://localhost", Method::GET, path, RequestOptions::new())
                .unwrap();
        let response = Response::new(200, Vec::new(), "");
        recorder.record(&Exchange {
            request: &request,
            response: &response,
            started_at: Utc::now(),
        });
    }

    #[test]
    fn disabled_recorder_ignores_exchanges() {
        let recorder = RequestRecorder::default();
        assert!(!recorder.is_enabled());
        record_one(&recorder, "/a");
        assert!(recorder.entries().is_empty());
    }

    #[test]
    fn enabled_recorder_keeps_order() {
        let recorder = RequestRecorder::default();
        recorder.enable();
        record_one(&recorder, "/a");
        record_one(&recorder, "/b");
        let urls: Vec<_> = recorder.entries().into_iter().map(|e| e.request.url).collect();
        assert_eq!(urls, ["http://localhost/a", "http://localhost/b"]);
    }

    #[test]
    fn disable_stops_recording_but_keeps_entries() {
        let recorder = RequestRecorder::default();
        recorder.enable();
        record_one(&recorder, "/a");
        recorder.disable();
        record_one(&recorder, "/b");
        assert_eq!(recorder.entries().len(), 1);
    }

    #[test]
    fn reset_clears_entries() {
        let recorder = RequestRecorder::default();
        recorder.enable();
        record_one(&recorder, "/a");
        recorder.reset();
        assert!(recorder.entries().is_empty());
        assert!(recorder.is_enabled());
    }

    #[test]
    fn save_writes_har_document() {
        let recorder = RequestRecorder::new(Creator {
            name: "suite".to_string(),
            version: "1.0".to_string(),
        });
        recorder.enable();
        record_one(&recorder, "/ünïcode");

        let file = tempfile::NamedTempFile::new().unwrap();
        recorder.save(file.path()).unwrap();

        let text = std::fs::read_to_string(file.path()).unwrap();
        assert!(text.contains("ünïcode"), "non-ASCII is written verbatim");
        let har: Har = serde_json::from_str(&text).unwrap();
        assert_eq!(har.log.version, "1.2");
        assert_eq!(har.log.creator.name, "suite");
        assert_eq!(har.log.entries.len(), 1);
    }
}
