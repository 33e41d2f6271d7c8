//! Defaults applied when the environment does not override them.

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATA_ROOT: &str = "/app/data";
pub const DEFAULT_SAVE_SECONDS: u64 = 60;
pub const DEFAULT_MAX_REQUESTS_PER_MINUTE: u64 = 60;
pub const DEFAULT_MOUNT_PATH: &str = "/content";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024; // 100 MiB
