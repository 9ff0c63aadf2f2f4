use std::{net::SocketAddr, time::Duration};

use crate::{
    configuration::Configuration, configuration_handler::ConfigurationHandler,
    database_interface::DatabaseInterface, http::create_app, local_bookings::LocalBookings,
};
use tokio::time::sleep;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod authentication;
mod backend;
mod booking_coordinator;
mod configuration;
mod configuration_handler;
mod database_interface;
mod error;
mod http;
mod local_bookings;
mod request_log;
mod schema;
#[cfg(test)]
mod testutils;
mod types;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let configuration = ConfigurationHandler::parse_arguments();

    let address = SocketAddr::from(([0, 0, 0, 0], configuration.port()));
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!(%address, "Consultancy booking service listening");

    let app = if let Some(database_url) = configuration.database_url() {
        let backend = loop {
            match DatabaseInterface::new(&database_url) {
                Ok(backend) => {
                    info!("Successfully connected to database");
                    break backend;
                }
                Err(err) => {
                    error!(?err, "Failed to establish database connection. Retry in 1 sec. Omit the database url to run with in-memory bookings.");
                    sleep(Duration::from_secs(1)).await;
                }
            }
        };
        create_app(backend, configuration)
    } else {
        warn!("No database configured. Bookings are kept in memory only.");
        create_app(LocalBookings::default(), configuration)
    };

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}
