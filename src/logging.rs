use core::fmt::Write;

/// The function used to write log messages to the console. It is provided
/// by the platform when the logger is installed.
pub type Console = fn(&str);

/// The console the logger writes to.
static CONSOLE: spin::Once<Console> = spin::Once::new();

/// A simple logger that writes to the platform console.
struct Logger {}

impl log::Log for Logger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        CONSOLE.is_completed()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let level = match record.level() {
                log::Level::Error => "\x1B[1m\x1b[31m[!]\x1b[0m",
                log::Level::Warn => "\x1B[1m\x1b[33m[-]\x1b[0m",
                log::Level::Info => "\x1B[1m\x1b[32m[*]\x1b[0m",
                log::Level::Debug => "\x1B[1m\x1b[34m[#]\x1b[0m",
                log::Level::Trace => "\x1B[1m\x1b[35m[~]\x1b[0m",
            };
            _ = writeln!(Logger {}, "{} {}", level, record.args());
        }
    }

    fn flush(&self) {}
}

impl core::fmt::Write for Logger {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        write(s);
        Ok(())
    }
}

/// Setup the logging subsystem. All log submitted to the logging subsystem
/// will be ignored until this function is called. Only the first call has
/// an effect.
#[cfg(feature = "logging")]
pub fn setup(console: Console, level: log::LevelFilter) {
    if CONSOLE.is_completed() {
        return;
    }
    CONSOLE.call_once(|| console);
    log::set_max_level(level);
    if log::set_logger(&Logger {}).is_err() {
        // Another logger was installed by the platform, keep it.
        return;
    }
    log::trace!("Logger initialized");
}

/// Write a message to the console. Messages written before [`setup`] was
/// called are dropped.
pub fn write(message: &str) {
    if let Some(console) = CONSOLE.get() {
        console(message);
    }
}
