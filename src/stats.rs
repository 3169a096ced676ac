use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStatistics {
    pub videos_discovered: u64,
    pub videos_checked: u64,
    pub videos_available: u64,
    pub videos_unavailable: u64,
    pub videos_recovered: u64,
    pub videos_failed: u64,
}

impl PassStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print(&self) {
        info!("{}", self);
    }
}

impl fmt::Display for PassStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Checked {} videos ({} newly discovered): {} available, {} unavailable, {} recovered, {} failed",
            self.videos_checked,
            self.videos_discovered,
            self.videos_available,
            self.videos_unavailable,
            self.videos_recovered,
            self.videos_failed,
        )
    }
}
