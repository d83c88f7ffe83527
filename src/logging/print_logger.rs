use anyhow::{Context, Result};
use chrono::Local;
use console::style;
use indicatif::{ProgressBar, ProgressBarIter, ProgressStyle};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, PoisonError};

use crate::utils::{ensure_dir_exists, get_home_dir};

/// Process start time, shared by every log file name of this process
static RUN_TIMESTAMP: LazyLock<String> =
    LazyLock::new(|| Local::now().format("%Y%m%d-%H%M%S").to_string());

pub fn run_timestamp() -> &'static str {
    &RUN_TIMESTAMP
}

/// Where log files are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    pub dir: PathBuf,
    pub file_prefix: String,
}

impl LoggerConfig {
    pub const DEFAULT_DIR_NAME: &'static str = "utilp_logs";
    pub const DEFAULT_PREFIX: &'static str = "utilp";

    pub fn new(dir: impl Into<PathBuf>, file_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            file_prefix: file_prefix.into(),
        }
    }

    /// `{dir}/{prefix}_{timestamp}.log`
    pub fn log_file(&self) -> PathBuf {
        self.dir
            .join(format!("{}_{}.log", self.file_prefix, run_timestamp()))
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let home = get_home_dir().unwrap_or_else(std::env::temp_dir);
        Self::new(home.join(Self::DEFAULT_DIR_NAME), Self::DEFAULT_PREFIX)
    }
}

/// Prints to the console and appends to a per-process log file.
///
/// Printing is governed by the verbose flag, file output by the logging
/// flag, and [`debug`](Self::debug) by the debug flag. Every message is
/// also emitted as a `tracing` event.
#[derive(Debug)]
pub struct PrintLogger {
    name: String,
    verbose: bool,
    writelog: bool,
    debug: bool,
    config: LoggerConfig,
    file: Mutex<Option<File>>,
}

impl PrintLogger {
    pub fn new(name: impl Into<String>, verbose: bool, writelog: bool, debug: bool) -> Result<Self> {
        Self::with_config(name, verbose, writelog, debug, LoggerConfig::default())
    }

    pub fn with_config(
        name: impl Into<String>,
        verbose: bool,
        writelog: bool,
        debug: bool,
        config: LoggerConfig,
    ) -> Result<Self> {
        if writelog {
            ensure_dir_exists(&config.dir)?;
        }
        Ok(Self {
            name: name.into(),
            verbose,
            writelog,
            debug,
            config,
            file: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_verbosity(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Turn file output on or off, creating the log directory when needed
    pub fn set_logging(&mut self, writelog: bool) -> Result<()> {
        if writelog {
            ensure_dir_exists(&self.config.dir)?;
        }
        self.writelog = writelog;
        Ok(())
    }

    pub fn is_logging(&self) -> bool {
        self.writelog
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn log_file(&self) -> PathBuf {
        self.config.log_file()
    }

    /// Print `msg` if asked to, or if the logger is verbose
    pub fn print(&self, msg: &str, verbose: Option<bool>) {
        if verbose == Some(true) || self.verbose {
            println!("{msg}");
        }
    }

    /// Append `INFO:{name}:{msg}` to the log file when logging is on
    pub fn log(&self, msg: &str) -> Result<()> {
        tracing::info!(logger = %self.name, "{msg}");
        self.write_line("INFO", msg)
    }

    /// Log `msg` and print it.
    ///
    /// `verbose` overrides the logger's own verbosity for this message.
    pub fn printlog(&self, msg: &str, verbose: Option<bool>, flush: bool) -> Result<()> {
        self.log(msg)?;
        if verbose.unwrap_or(self.verbose) {
            println!("{msg}");
            if flush {
                io::stdout().flush()?;
            }
        }
        Ok(())
    }

    /// Log an error with its cause chain, and show it on stderr when verbose
    pub fn exception(&self, err: &anyhow::Error) -> Result<()> {
        tracing::error!(logger = %self.name, "{err:#}");
        self.write_line("ERROR", &err.to_string())?;
        for cause in err.chain().skip(1) {
            self.write_line("ERROR", &format!("caused by: {cause}"))?;
        }

        if self.verbose {
            eprintln!("{} {}", style("✖").red(), style(err).red());
            for cause in err.chain().skip(1) {
                eprintln!("  {} {}", style("caused by:").dim(), cause);
            }
        }
        Ok(())
    }

    /// [`printlog`](Self::printlog) that only fires in debug mode
    pub fn debug(&self, msg: &str) -> Result<()> {
        if self.debug {
            tracing::debug!(logger = %self.name, "{msg}");
            self.printlog(msg, None, false)?;
        }
        Ok(())
    }

    /// Wrap `iter` in a progress bar that is only drawn when verbose.
    ///
    /// Iteration itself is unchanged either way.
    pub fn progress<I: IntoIterator>(&self, iter: I, message: &str) -> ProgressBarIter<I::IntoIter> {
        let iter = iter.into_iter();
        let bar = if self.verbose {
            let bar = match iter.size_hint() {
                (_, Some(len)) => ProgressBar::new(len as u64).with_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("#>-"),
                ),
                (_, None) => ProgressBar::new_spinner(),
            };
            bar.with_message(message.to_string())
        } else {
            ProgressBar::hidden()
        };
        bar.wrap_iter(iter)
    }

    fn write_line(&self, level: &str, msg: &str) -> Result<()> {
        if !self.writelog {
            return Ok(());
        }

        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            *guard = Some(open_append(&self.log_file())?);
        }
        if let Some(file) = guard.as_mut() {
            writeln!(file, "{level}:{}:{msg}", self.name)?;
        }
        Ok(())
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn logger_in(dir: &TempDir, verbose: bool, writelog: bool, debug: bool) -> PrintLogger {
        let config = LoggerConfig::new(dir.path().join("logs"), "test");
        PrintLogger::with_config("unit", verbose, writelog, debug, config).unwrap()
    }

    #[test]
    fn test_log_file_name_uses_run_timestamp() {
        let config = LoggerConfig::new("/tmp/x", "nightly");
        let name = config.log_file();
        assert_eq!(name.parent().unwrap(), Path::new("/tmp/x"));
        assert_eq!(
            name.file_name().unwrap().to_str().unwrap(),
            format!("nightly_{}.log", run_timestamp())
        );
        assert_eq!(run_timestamp().len(), "20260101-000000".len());
    }

    #[test]
    fn test_log_writes_info_lines() {
        let dir = TempDir::new().unwrap();
        let logger = logger_in(&dir, false, true, false);
        assert!(dir.path().join("logs").is_dir());

        logger.log("first").unwrap();
        logger.printlog("second", Some(false), false).unwrap();

        let content = fs::read_to_string(logger.log_file()).unwrap();
        assert_eq!(content, "INFO:unit:first\nINFO:unit:second\n");
    }

    #[test]
    fn test_nothing_written_when_not_logging() {
        let dir = TempDir::new().unwrap();
        let mut logger = logger_in(&dir, false, false, false);
        logger.log("ignored").unwrap();
        assert!(!dir.path().join("logs").exists());

        logger.set_logging(true).unwrap();
        assert!(logger.is_logging());
        logger.log("kept").unwrap();
        let content = fs::read_to_string(logger.log_file()).unwrap();
        assert_eq!(content, "INFO:unit:kept\n");
    }

    #[test]
    fn test_exception_logs_cause_chain() {
        let dir = TempDir::new().unwrap();
        let logger = logger_in(&dir, false, true, false);
        let err = anyhow::anyhow!("disk full").context("saving results");

        logger.exception(&err).unwrap();

        let content = fs::read_to_string(logger.log_file()).unwrap();
        assert_eq!(
            content,
            "ERROR:unit:saving results\nERROR:unit:caused by: disk full\n"
        );
    }

    #[test]
    fn test_debug_only_in_debug_mode() {
        let dir = TempDir::new().unwrap();
        let quiet = logger_in(&dir, false, true, false);
        quiet.debug("hidden").unwrap();
        assert!(!quiet.log_file().exists());

        let debugging = logger_in(&dir, false, true, true);
        debugging.debug("shown").unwrap();
        let content = fs::read_to_string(debugging.log_file()).unwrap();
        assert_eq!(content, "INFO:unit:shown\n");
    }

    #[test]
    fn test_verbosity_toggle() {
        let dir = TempDir::new().unwrap();
        let mut logger = logger_in(&dir, false, false, false);
        assert!(!logger.is_verbose());
        logger.set_verbosity(true);
        assert!(logger.is_verbose());
        assert_eq!(logger.name(), "unit");
    }

    #[test]
    fn test_progress_keeps_iteration() {
        let dir = TempDir::new().unwrap();
        for verbose in [false, true] {
            let logger = logger_in(&dir, verbose, false, false);
            let doubled: Vec<i32> = logger.progress(1..=3, "items").map(|x| x * 2).collect();
            assert_eq!(doubled, vec![2, 4, 6]);
        }
    }
}
