use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter};

/// 外部 GeoIP 服务的响应格式
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, EnumIter, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GeoIpFormat {
    /// ipwho.is: `{"success": true, "country": "...", "connection": {"isp": "..."}}`
    #[default]
    IpWhois,
    /// ipapi.co: `{"country_name": "...", "org": "..."}`，出错时 `{"error": true}`
    IpApi,
    /// 常见字段名（country / countryCode / isp / org），兼容 ip-api.com 等
    Generic,
}

impl std::fmt::Display for GeoIpFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl std::str::FromStr for GeoIpFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ipwhois" => Ok(Self::IpWhois),
            "ipapi" => Ok(Self::IpApi),
            "generic" => Ok(Self::Generic),
            _ => Err(format!(
                "Invalid GeoIP format: '{}'. Valid: ipwhois, ipapi, generic",
                s
            )),
        }
    }
}

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 包含：
/// - server: 服务器地址、端口、可信代理、CORS
/// - database: 事件存储连接配置
/// - logging: 日志配置
/// - analytics: 采集与看板配置
/// - auth: 运营者会话配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：LP，分隔符：__
    /// 示例：LP__SERVER__PORT=9999
    pub fn load(path: Option<&str>) -> Self {
        use config::{Config, Environment, File};

        let path = path.unwrap_or("config.toml");

        let builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖，前缀 LP，分隔符 __
            .add_source(
                Environment::with_prefix("LP")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    /// 可信代理（单 IP 或 CIDR），命中时信任 X-Forwarded-For
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
    /// 允许调用 /track 的页面来源，`*` 表示任意来源
    #[serde(default = "default_cors_allowed_origins")]
    pub cors_allowed_origins: Vec<String>,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `memory://` 使用进程内存储
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 单个 GeoIP 服务
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeoIpProviderConfig {
    pub name: String,
    /// 使用 {ip} 作为占位符，例如: https://ipwho.is/{ip}
    pub url: String,
    #[serde(default)]
    pub format: GeoIpFormat,
}

/// 采集与看板配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_enable_geo_lookup")]
    pub enable_geo_lookup: bool,
    /// 每个 GeoIP 服务的单次超时
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_recent_events_limit")]
    pub recent_events_limit: usize,
    /// 按顺序尝试，每个最多一次；只使用前两个（主 + 一个备用）
    #[serde(default = "default_geoip_providers")]
    pub geoip_providers: Vec<GeoIpProviderConfig>,
}

/// 运营者会话配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// 为空时禁用 /admin
    #[serde(default)]
    pub admin_token: String,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_cors_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_database_url() -> String {
    "linkpulse.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_enable_geo_lookup() -> bool {
    true
}

fn default_lookup_timeout_ms() -> u64 {
    3000
}

fn default_geoip_providers() -> Vec<GeoIpProviderConfig> {
    vec![
        GeoIpProviderConfig {
            name: "ipwho.is".to_string(),
            url: "https://ipwho.is/{ip}".to_string(),
            format: GeoIpFormat::IpWhois,
        },
        GeoIpProviderConfig {
            name: "ipapi.co".to_string(),
            url: "https://ipapi.co/{ip}/json/".to_string(),
            format: GeoIpFormat::IpApi,
        },
    ]
}

fn default_refresh_interval_secs() -> u64 {
    5
}

fn default_recent_events_limit() -> usize {
    25
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
            trusted_proxies: Vec::new(),
            cors_allowed_origins: default_cors_allowed_origins(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enable_geo_lookup: default_enable_geo_lookup(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
            refresh_interval_secs: default_refresh_interval_secs(),
            recent_events_limit: default_recent_events_limit(),
            geoip_providers: default_geoip_providers(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_provider_chain_order() {
        let config = AnalyticsConfig::default();
        let names: Vec<&str> = config
            .geoip_providers
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["ipwho.is", "ipapi.co"]);
        assert_eq!(config.lookup_timeout_ms, 3000);
        assert_eq!(config.refresh_interval_secs, 5);
    }

    #[test]
    fn test_sample_config_round_trips_through_toml() {
        let sample = StaticConfig::generate_sample_config();
        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.server.port, 8080);
        assert_eq!(parsed.analytics.geoip_providers.len(), 2);
        assert_eq!(
            parsed.analytics.geoip_providers[1].format,
            GeoIpFormat::IpApi
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: StaticConfig = toml::from_str(
            r#"
            [analytics]
            refresh_interval_secs = 10
            "#,
        )
        .unwrap();
        assert_eq!(parsed.analytics.refresh_interval_secs, 10);
        assert_eq!(parsed.analytics.recent_events_limit, 25);
        assert!(parsed.auth.admin_token.is_empty());
    }

    #[test]
    fn test_geoip_format_from_str() {
        assert_eq!("IPWHOIS".parse::<GeoIpFormat>(), Ok(GeoIpFormat::IpWhois));
        assert_eq!("generic".parse::<GeoIpFormat>(), Ok(GeoIpFormat::Generic));
        assert!("maxmind".parse::<GeoIpFormat>().is_err());
    }
}
