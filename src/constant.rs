/// paginator navigation inputs, in first/previous/stop/next/last order
pub mod paginator {
    use std::time::Duration;

    pub const EMOJI: [&str; 5] = ["⏪", "◀", "⏹", "▶", "⏩"];
    pub const KEYWORDS: [&str; 5] = ["first", "previous", "stop", "next", "last"];
    pub const HINT: &str = "**First** | **Previous** | **Stop** | **Next** | **Last**";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(40);

    /// Emoji variation selector; clients may append it to palette emoji
    pub const VARIATION_SELECTOR: char = '\u{fe0f}';
}

/// framework defaults
pub mod framework {
    use std::num::NonZeroUsize;

    pub const DEFAULT_PREFIX: &str = "!";
    pub const PREFIX_CACHE_SIZE: NonZeroUsize = NonZeroUsize::new(64).unwrap();
}
