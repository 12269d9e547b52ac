use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

pub fn default_level(quiet: bool) -> &'static str {
    if quiet {
        "warn"
    } else {
        "debug"
    }
}

pub fn log_file_path(dir: &Path, at: &DateTime<Local>) -> PathBuf {
    dir.join(format!("logs_{}.log", at.format("%Y%m%d_%H%M%S")))
}

/// Initialises `env_logger`. `RUST_LOG` overrides the level chosen by
/// `quiet`; with `log_dir` every line is also appended to a timestamped file
/// in that directory.
pub fn init(quiet: bool, log_dir: Option<&Path>) -> Result<Option<PathBuf>, String> {
    let env = env_logger::Env::default().default_filter_or(default_level(quiet));
    let mut builder = env_logger::Builder::from_env(env);
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} {} - [{}] {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        )
    });

    let log_file = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .map_err(|e| format!("Cannot create log directory {}: {e}", dir.display()))?;
            let path = log_file_path(dir, &Local::now());
            let file = File::create(&path)
                .map_err(|e| format!("Cannot create log file {}: {e}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(Tee::new(io::stderr(), file))));
            Some(path)
        }
        None => None,
    };

    builder
        .try_init()
        .map_err(|e| format!("Logger already initialised: {e}"))?;
    Ok(log_file)
}

/// Writes everything to both sinks.
struct Tee<A, B> {
    primary: A,
    secondary: B,
}

impl<A: Write, B: Write> Tee<A, B> {
    fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.primary.write_all(buf)?;
        self.secondary.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.primary.flush()?;
        self.secondary.flush()
    }
}
