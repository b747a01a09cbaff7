use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// 多终端冲突处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Sum quantities across all conflicting sessions
    #[default]
    Merge,
    /// Discard other sessions' data
    Overwrite,
    /// Ask the caller which of merge/overwrite/cancel to apply
    Prompt,
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "overwrite" => Ok(Self::Overwrite),
            "prompt" => Ok(Self::Prompt),
            other => Err(format!("unknown conflict policy: {}", other)),
        }
    }
}

/// 编辑器配置 - 终端侧点单编辑引擎的所有配置项
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/ticket-editor | 工作目录 (autosave 数据库) |
/// | STORE_ID | default | 门店 ID |
/// | DEVICE_LABEL | terminal | 设备名称 (冲突提示中显示) |
/// | BACKEND_URL | http://localhost:3000 | 后端地址 |
/// | BACKEND_TOKEN | - | Bearer token |
/// | REQUEST_TIMEOUT_SECS | 30 | 请求超时(秒) |
/// | MAX_SESSION_DURATION_SECS | 14400 | 会话最长时长 |
/// | RECOVERY_WINDOW_SECS | 3600 | autosave 可恢复时长 |
/// | AUTOSAVE_INTERVAL_SECS | 30 | autosave 间隔 |
/// | CONFLICT_POLICY | merge | merge / overwrite / prompt |
/// | AUTO_SELECT_AFTER_ADD | true | 加菜后自动选中 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | - | 日志目录 (不设置则输出到 stdout) |
#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// 工作目录
    pub work_dir: String,
    pub store_id: String,
    pub device_label: String,
    pub backend_url: String,
    pub backend_token: Option<String>,
    pub request_timeout_secs: u64,
    pub max_session_duration_secs: u64,
    pub recovery_window_secs: u64,
    pub autosave_interval_secs: u64,
    pub conflict_policy: ConflictPolicy,
    pub auto_select_after_add: bool,
    pub log_level: String,
    pub log_dir: Option<String>,
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

impl EditorConfig {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let conflict_policy = match std::env::var("CONFLICT_POLICY") {
            Ok(raw) => raw.parse().unwrap_or_else(|e: String| {
                tracing::warn!(error = %e, "Invalid CONFLICT_POLICY, falling back to merge");
                ConflictPolicy::Merge
            }),
            Err(_) => ConflictPolicy::default(),
        };

        Self {
            work_dir: std::env::var("WORK_DIR")
                .unwrap_or_else(|_| "/var/lib/ticket-editor".into()),
            store_id: std::env::var("STORE_ID").unwrap_or_else(|_| "default".into()),
            device_label: std::env::var("DEVICE_LABEL").unwrap_or_else(|_| "terminal".into()),
            backend_url: std::env::var("BACKEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            backend_token: std::env::var("BACKEND_TOKEN").ok().filter(|t| !t.is_empty()),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(30),
            max_session_duration_secs: env_parse("MAX_SESSION_DURATION_SECS").unwrap_or(4 * 3600),
            recovery_window_secs: env_parse("RECOVERY_WINDOW_SECS").unwrap_or(3600),
            autosave_interval_secs: env_parse("AUTOSAVE_INTERVAL_SECS").unwrap_or(30),
            conflict_policy,
            auto_select_after_add: env_parse("AUTO_SELECT_AFTER_ADD").unwrap_or(true),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(
        work_dir: impl Into<String>,
        store_id: impl Into<String>,
        device_label: impl Into<String>,
    ) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.store_id = store_id.into();
        config.device_label = device_label.into();
        config
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    /// Path of the local autosave database
    pub fn autosave_db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("autosave.redb")
    }

    pub fn max_session_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.max_session_duration_secs as i64)
    }

    pub fn recovery_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.recovery_window_secs as i64)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
