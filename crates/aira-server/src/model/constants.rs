// Configuration keys and defaults of the Aira node

pub const STANDALONE_MODE_PROPERTY_NAME: &str = "aira.standalone";

pub const REDIS_ADDR_PROPERTY: &str = "redis.addr";
pub const REDIS_PASSWORD_PROPERTY: &str = "redis.password";
pub const REDIS_DB_PROPERTY: &str = "redis.db";
pub const DEFAULT_REDIS_ADDR: &str = "localhost:6379";

pub const CLUSTER_KEY_PROPERTY: &str = "cluster.key";
pub const CLUSTER_LOCK_TIME_PROPERTY: &str = "cluster.lock_time_secs";
pub const CLUSTER_GRACE_PROPERTY: &str = "cluster.grace_secs";

/// Channel on which the elected leader announces itself
pub const CLUSTER_CHANNEL_PROPERTY: &str = "cluster.channel";
pub const DEFAULT_CLUSTER_CHANNEL: &str = "aira:cluster";

pub const LOGS_PATH_PROPERTY: &str = "logs.path";
pub const LOGS_LEVEL_PROPERTY: &str = "logs.level";
pub const LOGS_CONSOLE_PROPERTY: &str = "logs.console";
pub const LOGS_FILE_PROPERTY: &str = "logs.file";

pub const SHUTDOWN_TIMEOUT_PROPERTY: &str = "aira.shutdown_timeout_secs";
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_CONFIG_FILE: &str = "conf/application.yml";
