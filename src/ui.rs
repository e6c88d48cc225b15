use crate::errors::{AppError, AppResult};
use indicatif::{ProgressBar, ProgressStyle};

/// Creates a byte progress bar for reading a dump of `total_bytes`.
///
/// When `enabled` is false a hidden bar is returned, so callers can wrap
/// their reader the same way either way.
///
/// # Example
///
/// ```no_run
/// use sedump_pg::ui;
///
/// # fn main() -> Result<(), sedump_pg::errors::AppError> {
/// let file = std::fs::File::open("Posts.xml")?;
/// let pb = ui::create_progress_bar(file.metadata()?.len(), true)?;
/// let reader = std::io::BufReader::new(pb.wrap_read(file));
/// # drop(reader);
/// pb.finish_and_clear();
/// # Ok(())
/// # }
/// ```
pub fn create_progress_bar(total_bytes: u64, enabled: bool) -> AppResult<ProgressBar> {
    if !enabled {
        return Ok(ProgressBar::hidden());
    }

    let pb = ProgressBar::new(total_bytes);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .map_err(|e| AppError::Io(format!("Failed to create progress bar template: {e}")))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}
