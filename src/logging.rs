use crate::config::Config;
use std::fs::{self, File, OpenOptions};
use std::panic;
use std::path::Path;
use tracing::error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{fmt, EnvFilter};

const FALLBACK_LEVEL: &str = "info";

// Installs the global subscriber. The board owns the terminal, so nothing is
// logged unless enabled; the guard must live until exit to flush the writer.
pub fn init(config: &Config) -> Option<WorkerGuard> {
    if !config.log_enabled {
        return None;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level_directive(&config.log_level)))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_LEVEL));

    let (writer, guard) = match open_log_file(&config.log_file) {
        Some(file) => tracing_appender::non_blocking(file),
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_level(true)
        .with_target(true)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .compact()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
    Some(guard)
}

// The default hook prints to stderr, which would draw over the board.
pub fn route_panics_to_log() {
    panic::set_hook(Box::new(|info| {
        error!("{info}");
    }));
}

pub fn restore_panic_output() {
    let _ = panic::take_hook();
}

fn level_directive(level: &str) -> &str {
    match level.trim() {
        "" => FALLBACK_LEVEL,
        level => level,
    }
}

fn open_log_file(path: &str) -> Option<File> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    let path = Path::new(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        let _ = fs::create_dir_all(parent);
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}

#[cfg(test)]
mod tests {
    use super::{init, level_directive, open_log_file, restore_panic_output, route_panics_to_log};
    use crate::config::Config;
    use std::fs;
    use std::io::{self, Write};
    use std::panic;
    use std::sync::{Arc, Mutex};
    use std::time::{SystemTime, UNIX_EPOCH};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn blank_level_uses_info() {
        assert_eq!(level_directive(""), "info");
        assert_eq!(level_directive("  "), "info");
        assert_eq!(level_directive(" debug "), "debug");
        assert_eq!(level_directive("fids_tui=trace"), "fids_tui=trace");
    }

    #[test]
    fn disabled_logging_installs_nothing() {
        assert!(init(&Config::default()).is_none());
    }

    #[test]
    fn log_file_parents_are_created() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let dir = std::env::temp_dir().join(format!("fids-tui-log-test-{suffix}"));
        let path = dir.join("nested").join("board.log");
        assert!(open_log_file(&path.to_string_lossy()).is_some());
        assert!(path.exists());
        assert!(open_log_file("").is_none());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn panics_go_to_the_log() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        route_panics_to_log();
        let result = tracing::subscriber::with_default(subscriber, || {
            panic::catch_unwind(|| panic!("fetch worker exploded"))
        });
        restore_panic_output();

        assert!(result.is_err());
        let logged = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("ERROR"));
        assert!(logged.contains("fetch worker exploded"));
    }
}
