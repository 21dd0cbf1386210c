use indicatif::{ProgressBar, ProgressStyle};

/// Initialize env_logger once. Idempotent: subsequent calls are no-ops.
///
/// Only ontkit logs at info by default; RUST_LOG overrides.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("ontkit=info"))
        .format_timestamp_millis()
        .try_init();
}

/// Elapsed time rounded to milliseconds for log lines.
pub fn elapsed(t0: std::time::Instant) -> humantime::FormattedDuration {
    let ms = t0.elapsed().as_millis() as u64;
    humantime::format_duration(std::time::Duration::from_millis(ms))
}

/// File-count progress bar on stderr.
pub fn progress(n: usize) -> ProgressBar {
    let pb = ProgressBar::new(n as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} files")
    {
        pb.set_style(style);
    }
    pb
}
