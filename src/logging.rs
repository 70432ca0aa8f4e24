// src/logging.rs
//
// Logger backends.
//
// On desktop the host forwards plugin stdout to its post window, so the
// default backend prints there. iOS and browser builds use the platform
// console instead.

use log::LevelFilter;

#[cfg(feature = "ios")]
const LOG_SUBSYSTEM: &str = "com.omnicollider.buffer";

/// Install the backend for this build. Only the first call takes effect.
pub fn init(level: LevelFilter) {
    #[cfg(feature = "ios")]
    {
        oslog::OsLogger::new(LOG_SUBSYSTEM)
            .level_filter(level)
            .init()
            .ok();
    }

    #[cfg(all(feature = "web", not(feature = "ios")))]
    {
        console_error_panic_hook::set_once();
        if let Some(level) = level.to_level() {
            console_log::init_with_level(level).ok();
        }
    }

    #[cfg(not(any(feature = "ios", feature = "web")))]
    {
        if log::set_logger(&HOST_CONSOLE).is_ok() {
            log::set_max_level(level);
        }
    }
}

#[cfg(not(any(feature = "ios", feature = "web")))]
static HOST_CONSOLE: console::HostConsole = console::HostConsole;

#[cfg(not(any(feature = "ios", feature = "web")))]
mod console {
    use log::{Level, Log, Metadata, Record};

    /// Prints `LEVEL: Omni: message` lines to stdout.
    pub struct HostConsole;

    pub fn label(level: Level) -> &'static str {
        match level {
            Level::Error => "ERROR",
            Level::Warn => "WARNING",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    impl Log for HostConsole {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= log::max_level()
        }

        fn log(&self, record: &Record) {
            if self.enabled(record.metadata()) {
                println!("{}: Omni: {}", label(record.level()), record.args());
            }
        }

        fn flush(&self) {}
    }
}
