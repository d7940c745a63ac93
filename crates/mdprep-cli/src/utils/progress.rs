use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::Path;

/// Progress bar over a fixed list of input files, drawn on stderr.
pub struct FileProgress {
    pb: ProgressBar,
}

impl FileProgress {
    pub fn new(total_files: usize) -> Self {
        let pb = ProgressBar::with_draw_target(
            Some(total_files as u64),
            ProgressDrawTarget::stderr(),
        )
        .with_style(Self::bar_style());
        Self { pb }
    }

    /// A bar that never draws, for `--quiet` runs.
    pub fn hidden(total_files: usize) -> Self {
        let pb = ProgressBar::hidden().with_style(Self::bar_style());
        pb.set_length(total_files as u64);
        Self { pb }
    }

    pub fn start(&self, path: &Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.pb.set_message(name);
    }

    pub fn advance(&self) {
        self.pb.inc(1);
    }

    pub fn finish(&self) {
        self.pb.finish_with_message("✓ Done");
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<20} [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_files_until_finished() {
        let progress = FileProgress::hidden(2);
        assert_eq!(progress.pb.length(), Some(2));

        progress.start(Path::new("/data/run1/ss.xpm"));
        assert_eq!(progress.pb.message(), "ss.xpm");
        progress.advance();
        assert_eq!(progress.pb.position(), 1);

        progress.advance();
        progress.finish();
        assert!(progress.pb.is_finished());
        assert_eq!(progress.pb.position(), 2);
        assert_eq!(progress.pb.message(), "✓ Done");
    }

    #[test]
    fn visible_bar_has_requested_length() {
        let progress = FileProgress::new(5);
        assert_eq!(progress.pb.length(), Some(5));
        assert_eq!(progress.pb.position(), 0);
    }
}
