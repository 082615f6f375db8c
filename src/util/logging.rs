use std::path::Path;

use flexi_logger::{Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming};
use once_cell::sync::OnceCell;

static LOGGER: OnceCell<()> = OnceCell::new();

/// Starts file + stderr logging once per process. The level comes from
/// `RUST_LOG`, defaulting to `info`.
pub fn init(log_dir: &Path) -> anyhow::Result<()> {
    LOGGER.get_or_try_init(|| -> anyhow::Result<()> {
        std::fs::create_dir_all(log_dir)?;
        // The handle must outlive the process for the file writer to keep
        // flushing.
        let handle = Logger::try_with_env_or_str("info")?
            .log_to_file(FileSpec::default().directory(log_dir).basename("narrator"))
            .rotate(
                Criterion::AgeOrSize(Age::Day, 10_000_000),
                Naming::Numbers,
                Cleanup::KeepLogFiles(7),
            )
            .duplicate_to_stderr(Duplicate::Info)
            .start()?;
        std::mem::forget(handle);
        Ok(())
    })?;
    Ok(())
}
