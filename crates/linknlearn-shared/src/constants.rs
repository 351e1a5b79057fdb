/// Application name
pub const APP_NAME: &str = "LinknLearn";

/// Separator joining two user ids into a request or conversation key
pub const ID_SEPARATOR: char = '_';

/// Email domain accepted at sign-up (institutional accounts only)
pub const INSTITUTIONAL_DOMAIN: &str = "anurag.edu.in";

/// Maximum message text length in characters
pub const MAX_MESSAGE_CHARS: usize = 4_096;

/// Maximum uploaded image size in bytes (10 MiB)
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Topic prefix for per-conversation live streams
pub const TOPIC_CHAT: &str = "chat:";

/// Topic prefix for per-user pending-request live streams
pub const TOPIC_REQUESTS: &str = "requests:";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;
