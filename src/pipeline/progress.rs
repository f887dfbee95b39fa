//! Nested progress bars, one per enumeration level.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// One bar per nesting level, outermost first.
pub struct NestedProgress {
    _multi: MultiProgress,
    bars: Vec<ProgressBar>,
}

impl NestedProgress {
    /// Create bars for `levels` (label, length). Hidden when `visible` is false.
    pub fn new(levels: &[(&str, usize)], visible: bool) -> Self {
        let multi = if visible {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let style = ProgressStyle::default_bar()
            .template("{prefix:>10} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");

        let bars = levels
            .iter()
            .map(|(label, len)| {
                let bar = multi.add(ProgressBar::new(*len as u64));
                bar.set_style(style.clone());
                bar.set_prefix(label.to_string());
                bar
            })
            .collect();

        Self {
            _multi: multi,
            bars,
        }
    }

    /// Set the position of level `depth`.
    pub fn set(&self, depth: usize, pos: usize) {
        if let Some(bar) = self.bars.get(depth) {
            bar.set_position(pos as u64);
        }
    }

    /// Percent of level `depth` consumed.
    pub fn percent(&self, depth: usize) -> f64 {
        self.bars
            .get(depth)
            .and_then(|bar| {
                let len = bar.length()?;
                if len == 0 {
                    return Some(100.0);
                }
                Some(bar.position() as f64 / len as f64 * 100.0)
            })
            .unwrap_or(0.0)
    }

    /// Message on the outermost bar.
    pub fn message(&self, msg: String) {
        if let Some(bar) = self.bars.first() {
            bar.set_message(msg);
        }
    }

    pub fn finish(&self, msg: String) {
        for bar in self.bars.iter().skip(1) {
            bar.finish_and_clear();
        }
        if let Some(bar) = self.bars.first() {
            bar.finish_with_message(msg);
        }
    }
}
