pub struct Config {
    pub api_base_url: &'static str,
    /// How often the live collections are refetched.
    pub snapshot_interval_ms: u32,
    /// Writes unanswered after this long are rolled back.
    pub dispatch_timeout_ms: u32,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            api_base_url: "/api",
            snapshot_interval_ms: 2_000,
            dispatch_timeout_ms: 10_000,
        }
    }
}

pub const CONFIG: Config = Config::new();
