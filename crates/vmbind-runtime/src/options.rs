//! Runtime configuration

/// Runtime instance configuration
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Build a thread guard on the thread that creates the runtime
    pub attach_creating_thread: bool,

    /// Invalidate every default-loader class binding when the runtime drops
    pub invalidate_on_teardown: bool,

    /// Name handed to the runtime for threads this crate attaches
    pub thread_name_prefix: Option<String>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            attach_creating_thread: true,
            invalidate_on_teardown: true,
            thread_name_prefix: None,
        }
    }
}

impl RuntimeOptions {
    /// Set the attached-thread name prefix
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = Some(prefix.into());
        self
    }
}
