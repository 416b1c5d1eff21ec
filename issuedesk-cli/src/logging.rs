use crate::cli::Cli;
use issuedesk::Config;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// A thread-safe writer that flushes every write to the shared log file.
///
/// Multiple subscriber threads may write through clones of the same
/// `FileWriterGuard`; each write holds the lock until the bytes are flushed.
///
/// # Example
///
/// ```no_run
/// use std::fs::File;
/// use std::io::Write;
/// use std::sync::{Arc, Mutex};
/// use issuedesk_cli::logging::FileWriterGuard;
///
/// let file = File::create("issuedesk.log").unwrap();
/// let mut guard = FileWriterGuard::new(Arc::new(Mutex::new(file)));
/// guard.write_all(b"Log message\n").unwrap();
/// ```
#[derive(Clone)]
pub struct FileWriterGuard {
    file: Arc<Mutex<File>>,
}

impl FileWriterGuard {
    /// Wrap a shared file handle
    pub fn new(file: Arc<Mutex<File>>) -> Self {
        Self { file }
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, File>> {
        self.file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))
    }
}

impl io::Write for FileWriterGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self.lock()?;
        let written = file.write(buf)?;
        file.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.flush()
    }
}

/// Filter directive for this invocation
///
/// `--quiet`, `--debug` and `--verbose` win over `RUST_LOG`, which wins over
/// the configured `log_level`.
pub fn filter_directive(cli: &Cli, config: &Config) -> String {
    if cli.quiet {
        "error".to_string()
    } else if cli.debug {
        "debug".to_string()
    } else if cli.verbose {
        "trace".to_string()
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone())
    }
}

/// Install the global subscriber: stderr always, plus `log_file` when given
pub fn init(directive: &str, log_file: Option<&Path>) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|e| {
        eprintln!("Invalid log filter '{directive}': {e}; using 'info'");
        EnvFilter::new("info")
    });

    let file_layer = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                let guard = FileWriterGuard::new(Arc::new(Mutex::new(file)));
                Some(
                    fmt::layer()
                        .with_writer(move || guard.clone())
                        .with_ansi(false),
                )
            }
            Err(e) => {
                eprintln!("Failed to open log file {}: {}", path.display(), e);
                None
            }
        }
    });

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .try_init();
    if let Err(e) = result {
        eprintln!("Failed to install logging: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_writer_appends_to_shared_file() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let file = OpenOptions::new().append(true).open(temp.path()).unwrap();
        let mut first = FileWriterGuard::new(Arc::new(Mutex::new(file)));
        let mut second = first.clone();

        first.write_all(b"one\n").unwrap();
        second.write_all(b"two\n").unwrap();

        let mut contents = String::new();
        File::open(temp.path())
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "one\ntwo\n");
    }

    #[test]
    fn test_flags_override_configured_level() {
        let config = Config::default();
        let cli = Cli::try_parse_from_args(["issuedesk", "--quiet", "settings"]).unwrap();
        assert_eq!(filter_directive(&cli, &config), "error");

        let cli = Cli::try_parse_from_args(["issuedesk", "--debug", "settings"]).unwrap();
        assert_eq!(filter_directive(&cli, &config), "debug");
    }
}
