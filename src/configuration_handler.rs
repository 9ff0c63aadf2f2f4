use crate::configuration::Configuration;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Consultancy slot booking service")]
pub struct ConfigurationHandler {
    /// Port the HTTP server listens on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Password expected in the x-admin-password header of admin requests
    #[arg(long, env = "ADMIN_PASSWORD")]
    admin_password: String,

    /// PostgreSQL connection string. Bookings are kept in memory if omitted.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of request body bytes stored in the request log
    #[arg(long, env = "REQUEST_LOG_BODY_LIMIT", default_value_t = 64 * 1024)]
    request_log_body_limit: usize,
}

impl ConfigurationHandler {
    pub fn parse_arguments() -> Self {
        dotenvy::dotenv().ok();
        Self::parse()
    }
}

impl Configuration for ConfigurationHandler {
    fn port(&self) -> u16 {
        self.port
    }

    fn admin_password(&self) -> String {
        self.admin_password.clone()
    }

    fn database_url(&self) -> Option<String> {
        self.database_url.clone()
    }

    fn request_log_body_limit(&self) -> usize {
        self.request_log_body_limit
    }
}
