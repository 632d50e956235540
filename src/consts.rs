pub mod run {
    /// Fixed wait before every status query, including the first.
    pub const POLL_INTERVAL_MS: u64 = 2000;

    /// Wall-clock bound on the polling phase of a run. The upstream model
    /// normally finishes in one to two minutes; a stuck job is abandoned here.
    pub const RUN_DEADLINE_SECS: u64 = 600;

    /// Transient status-query failures tolerated before a run is failed.
    pub const MAX_TRANSIENT_POLLS: u32 = 3;

    /// Cap on the exponential backoff between transient retries, in seconds.
    pub const RETRY_BACKOFF_CAP_SECS: u64 = 30;

    /// Capacity of the progress snapshot channel.
    pub const PROGRESS_QUEUE_SIZE: usize = 32;
}
