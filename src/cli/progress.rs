use indicatif::{ProgressBar, ProgressStyle};

pub struct FixProgress {
    bar: ProgressBar,
}

impl FixProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            bar.set_style(style);
        }
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }

    pub fn set_file(&self, path: &str) {
        self.bar.set_message(format!("Fixing... [{}]", path));
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
