//! Test logger that records messages per thread and echoes them through env_logger.

use std::sync::{Mutex, Once, OnceLock};
use std::thread::{self, ThreadId};

use log::{LevelFilter, Log, Metadata, Record};

struct CapturingLogger {
    inner: env_logger::Logger,
    records: Mutex<Vec<(ThreadId, String)>>,
}

impl Log for CapturingLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut records) = self.records.lock() {
            records.push((thread::current().id(), record.args().to_string()));
        }
        self.inner.log(record);
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

fn logger() -> &'static CapturingLogger {
    static LOGGER: OnceLock<CapturingLogger> = OnceLock::new();
    static INIT: Once = Once::new();
    let logger = LOGGER.get_or_init(|| CapturingLogger {
        inner: env_logger::Builder::from_default_env().is_test(true).build(),
        records: Mutex::new(Vec::new()),
    });
    INIT.call_once(|| {
        if log::set_logger(logger).is_ok() {
            log::set_max_level(logger.inner.filter().max(LevelFilter::Info));
        }
    });
    logger
}

pub fn init() {
    logger();
}

/// Messages logged so far by the calling thread.
pub fn messages() -> Vec<String> {
    let id = thread::current().id();
    logger()
        .records
        .lock()
        .map(|records| records.iter().filter(|(t, _)| *t == id).map(|(_, m)| m.clone()).collect())
        .unwrap_or_default()
}
