pub mod scrape;
pub mod snapshot_builder;
pub mod supervisor_client;
pub mod xmlrpc;

pub use scrape::poll;
pub use supervisor_client::{ConnectivityError, SupervisorClient, UpstreamClient};
