use crate::data::configuration::Configuration;
use crate::data::dbconnector::{KinDBConnection, SQLConnector};
use crate::family::render::render_forest;
use crate::family::tree::TreeNode;
use crate::server;
use clap::Parser;
use log::{debug, info};
use std::path::Path;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Port to serve on; overrides `[server] port` from the configuration.
    #[arg(short, long)]
    port: Option<u16>,
    #[arg(short, long, default_value_t = String::from("configuration.toml"))]
    configuration_path: String,
    /// Print the family tree and exit instead of starting the server.
    #[arg(short, long, default_value_t = false)]
    tree: bool,
}

pub async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    debug!("Configuration path: {}", args.configuration_path);
    let config = if Path::new(&args.configuration_path).exists() {
        Configuration::load(&args.configuration_path)?
    } else {
        info!(
            "No configuration at {}, using defaults",
            args.configuration_path
        );
        Configuration::default()
    };
    debug!("Loaded configuration: {config:?}");

    // Check the database connection
    let mut db_connector =
        SQLConnector::new(&config.database.path).with_cycle_check(config.validation.cycle_check);
    db_connector.connect().await?;
    db_connector.check().await?;
    // Has database been initialised ?
    if db_connector.is_initialized().await? {
        info!("Database is initialized");
    } else {
        info!("Database is not initialized, performing initialization");
        db_connector.initialize(&config).await?;
    }

    if args.tree {
        let forest = db_connector.get_family_forest().await?;
        debug!(
            "Rendering {} trees with {} nodes",
            forest.len(),
            forest.iter().map(TreeNode::size).sum::<usize>()
        );
        print!("{}", render_forest(&forest));
        db_connector.close().await?;
        return Ok(());
    }

    let port = args.port.unwrap_or(config.server.port);
    server::run(db_connector, port).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let args = Args::parse_from(["kinfolk", "--port", "9000", "--tree"]);
        assert_eq!(args.port, Some(9000));
        assert!(args.tree);
        assert_eq!(args.configuration_path, "configuration.toml");

        let args = Args::parse_from(["kinfolk", "-c", "family.toml"]);
        assert_eq!(args.port, None);
        assert!(!args.tree);
        assert_eq!(args.configuration_path, "family.toml");
    }
}
