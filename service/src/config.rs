use clap::builder::TypedValueParser as _;
use clap::{ArgAction, Parser};
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;

/// Default path the callback redirects to after a successful login.
pub const DEFAULT_SUCCESS_REDIRECT_PATH: &str = "/success-login";

const MAX_STATE_TTL_SECS: u64 = 24 * 60 * 60;
const MAX_SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Issuer URL of the OpenID Connect provider. Endpoints are discovered from
    /// `<issuer>/.well-known/openid-configuration`.
    #[arg(
        long,
        env,
        default_value = "http://localhost:8080/realms/master"
    )]
    pub issuer_url: String,

    /// Client ID registered at the provider. Also the expected ID token audience.
    #[arg(long, env, default_value = "login-service")]
    pub client_id: String,

    /// Client secret registered at the provider.
    #[arg(long, env, hide_env_values = true)]
    client_secret: Option<String>,

    /// Callback URL registered at the provider.
    #[arg(long, env, default_value = "http://localhost:8081/callback")]
    pub redirect_uri: String,

    /// Scopes requested in the authorization request.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "openid,profile"
    )]
    pub scopes: Vec<String>,

    /// Where the provider sends the user after ending their session.
    #[arg(long, env, default_value = "http://localhost:8081")]
    pub post_logout_redirect_uri: String,

    /// Local path the callback redirects to after a successful login.
    #[arg(long, env, default_value = DEFAULT_SUCCESS_REDIRECT_PATH)]
    pub success_redirect_path: String,

    /// Lifetime in seconds of an issued CSRF state token. At most one day.
    #[arg(long, env, default_value_t = 600, value_parser = clap::value_parser!(u64).range(1..=MAX_STATE_TTL_SECS))]
    pub state_ttl_secs: u64,

    /// Lifetime in seconds of a login session and its cookies. At most one week.
    #[arg(long, env, default_value_t = 3600, value_parser = clap::value_parser!(u64).range(1..=MAX_SESSION_TTL_SECS))]
    pub session_ttl_secs: u64,

    /// Upper bound in seconds for the provider round trips of one callback
    /// (code exchange plus key retrieval).
    #[arg(long, env, default_value_t = 10)]
    pub provider_timeout_secs: u64,

    /// Retries for idempotent provider requests (discovery, key set). The token
    /// endpoint is never retried.
    #[arg(long, env, default_value_t = 2)]
    pub provider_max_retries: u32,

    /// How long in seconds fetched provider signing keys are reused.
    #[arg(long, env, default_value_t = 600)]
    pub jwks_cache_ttl_secs: u64,

    /// Clock skew tolerance in seconds when checking ID token expiry.
    #[arg(long, env, default_value_t = 60)]
    pub clock_skew_leeway_secs: u64,

    /// ID token signing algorithms accepted from the provider.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "RS256"
    )]
    pub signing_algorithms: Vec<String>,

    /// Mark login cookies `Secure`. Only disable for plain-HTTP local development.
    #[arg(long, env, default_value_t = true, action = ArgAction::Set)]
    pub secure_cookies: bool,

    /// Upper bound in seconds for handling one HTTP request. Requests still running
    /// after this are answered with 408.
    #[arg(long, env, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..=600))]
    pub request_timeout_secs: u64,

    /// Seconds between sweeps of expired state tokens and sessions.
    #[arg(long, env, default_value_t = 60)]
    pub purge_interval_secs: u64,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 8081)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn set_client_secret(mut self, client_secret: String) -> Self {
        self.client_secret = Some(client_secret);
        self
    }

    pub fn client_secret(&self) -> Option<String> {
        self.client_secret.clone()
    }

    pub fn interface(&self) -> &str {
        self.interface.as_deref().unwrap_or("127.0.0.1")
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}
