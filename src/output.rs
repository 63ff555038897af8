// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Plain-text progress and result messages with optional timing.

use std::time::Instant;

/// Handles CLI progress and result messages.
#[derive(Default)]
pub struct Output {
    start_time: Option<Instant>,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Print a progress message.
    pub fn progress(&self, message: &str) {
        println!("{message}");
    }

    /// Print a success message with timing when the timer was started.
    pub fn success(&self, message: &str) {
        match self.start_time {
            Some(t) => println!("{message} ({:.1}s)", t.elapsed().as_secs_f64()),
            None => println!("{message}"),
        }
    }

    /// Print a warning message.
    pub fn warning(&self, message: &str) {
        eprintln!("Warning: {message}");
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        eprintln!("Error: {message}");
    }
}
