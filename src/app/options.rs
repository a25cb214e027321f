//! Runtime configuration (spec.md's Design Notes "tunable constants",
//! grounded on the builder-style options the teacher's `App` takes).

const DEFAULT_POOL_CAPACITY: usize = 24;
const DEFAULT_STACK_CAPACITY: usize = 32;
const DEFAULT_MAX_PAR_COUNT: usize = 4;
const DEFAULT_TELEGRAM_BASE_URL: &str = "https://api.telegram.org";
const DEFAULT_READ_BUFFER_CAPACITY: usize = 64;

/// Tunable constants for a [`crate::app::Runtime`] (spec.md §5's
/// `TASK_POOL_CAPACITY`/`MAX_PAR_COUNT`/`MAX_SEQ_COUNT` budgets, §6's fifo
/// read-buffer capacity). The Telegram bot token is never configured here —
/// spec.md §4.4 has `tg-getMe`/`tg-getUpdates` read it off the top of the
/// stack on every call, not from a process-wide setting.
pub struct RuntimeOptions {
    pub pool_capacity: usize,
    pub stack_capacity: usize,
    pub max_par_count: usize,
    pub telegram_base_url: String,
    pub read_buffer_capacity: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            pool_capacity: DEFAULT_POOL_CAPACITY,
            stack_capacity: DEFAULT_STACK_CAPACITY,
            max_par_count: DEFAULT_MAX_PAR_COUNT,
            telegram_base_url: DEFAULT_TELEGRAM_BASE_URL.to_string(),
            read_buffer_capacity: DEFAULT_READ_BUFFER_CAPACITY,
        }
    }
}

impl RuntimeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    pub fn with_stack_capacity(mut self, capacity: usize) -> Self {
        self.stack_capacity = capacity;
        self
    }

    pub fn with_max_par_count(mut self, count: usize) -> Self {
        self.max_par_count = count;
        self
    }

    pub fn with_telegram_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.telegram_base_url = base_url.into();
        self
    }

    pub fn with_read_buffer_capacity(mut self, capacity: usize) -> Self {
        self.read_buffer_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_spec_budgets() {
        let opts = RuntimeOptions::default();
        assert_eq!(opts.pool_capacity, 24);
        assert_eq!(opts.max_par_count, 4);
    }

    #[test]
    fn builder_methods_override_defaults() {
        let opts = RuntimeOptions::new().with_pool_capacity(8).with_read_buffer_capacity(128);
        assert_eq!(opts.pool_capacity, 8);
        assert_eq!(opts.read_buffer_capacity, 128);
    }
}
