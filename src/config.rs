//! Where the policy and users services live, and how the binaries log.
//!
//! Each URL is taken from the command line if given, else from the environment, else from the
//! local development default.

/// Environment variable naming the users service root.
pub const BASE_SERVICE_URL_ENV: &str = "POLICYFORM_BASE_SERVICE_URL";
/// Environment variable naming the policy service root.
pub const PRODUCT_SERVICE_URL_ENV: &str = "POLICYFORM_PRODUCT_SERVICE_URL";
/// The root both services share in local development.
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8080/api";

/// Command-line options for reaching the services.
#[derive(Clone, Default, Debug, Eq, PartialEq, arrrg_derive::CommandLine)]
pub struct ServiceOptions {
    /// Users service root.
    #[arrrg(optional, "Root URL of the users service (default: $POLICYFORM_BASE_SERVICE_URL).")]
    pub base_service_url: Option<String>,
    #[arrrg(
        optional,
        "Root URL of the policy service (default: $POLICYFORM_PRODUCT_SERVICE_URL)."
    )]
    /// Policy service root.
    pub product_service_url: Option<String>,
}

/// Resolved service locations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServiceConfig {
    base_service_url: String,
    product_service_url: String,
}

impl ServiceConfig {
    /// Use the same root for both services.
    pub fn new(root: impl Into<String>) -> Self {
        let root = trim(root.into());
        Self {
            base_service_url: root.clone(),
            product_service_url: root,
        }
    }

    /// Resolve the configuration from options, then the environment, then the default.
    pub fn resolve(options: &ServiceOptions) -> Self {
        Self::resolve_with(options, |var| std::env::var(var).ok())
    }

    fn resolve_with(options: &ServiceOptions, env: impl Fn(&str) -> Option<String>) -> Self {
        let pick = |opt: &Option<String>, var: &str| {
            opt.clone()
                .or_else(|| env(var))
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string())
        };
        Self {
            base_service_url: trim(pick(&options.base_service_url, BASE_SERVICE_URL_ENV)),
            product_service_url: trim(pick(&options.product_service_url, PRODUCT_SERVICE_URL_ENV)),
        }
    }

    /// The policy service, e.g. `http://localhost:8080/api/policy`.
    pub fn policy_url(&self) -> String {
        format!("{}/policy", self.product_service_url)
    }

    /// The users service, e.g. `http://localhost:8080/api/users`.
    pub fn users_url(&self) -> String {
        format!("{}/users", self.base_service_url)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_URL)
    }
}

fn trim(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Install a stderr tracing subscriber filtered by `RUST_LOG` (default `warn`).
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    // A subscriber may already be installed, e.g. by a test harness.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
