use crate::log_debug;

/// Picks default worker counts from the machine's parallelism
pub struct ConcurrencyCalculator;

impl ConcurrencyCalculator {
    /// One less than the CPU count, never below one.
    pub fn default_workers() -> usize {
        let cpu_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);

        let workers = Self::workers_for(cpu_count);
        log_debug!("Default worker count: {} (CPUs: {})", workers, cpu_count);
        workers
    }

    pub fn workers_for(cpu_count: usize) -> usize {
        cpu_count.saturating_sub(1).max(1)
    }
}
