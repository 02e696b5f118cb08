use indicatif::{ProgressBar, ProgressStyle};

use docsearch_core::progress::{ProgressEvent, ProgressSink};

/// Renders build progress as a per-document bar on stderr.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let template =
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents {msg}";
        if let Ok(style) = ProgressStyle::default_bar().template(template) {
            bar.set_style(style.progress_chars("#>-"));
        }
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("done");
    }
}

impl ProgressSink for BarProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::DocumentStarted { document_id, .. } => self.bar.set_message(document_id),
            ProgressEvent::DocumentSegmented { .. } => self.bar.inc(1),
            ProgressEvent::IndexRebuilt { mode, chunks } => {
                self.bar.println(format!("built {mode} index over {chunks} items"));
            }
            ProgressEvent::SectionSegmented { .. } => {}
        }
    }
}
