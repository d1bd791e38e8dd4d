use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use json_graphql_server::generator::SchemaGenerator;
use json_graphql_server::schema::build_schema;
use json_graphql_server::server;
use json_graphql_server::store::{JsonStore, StoreHandle};
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

/// Clap styling
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Arguments to the GraphQL server
#[derive(Debug, clap::Parser)]
#[command(
    styles = STYLES,
    about = "json-graphql-server - serve a full GraphQL API over a plain JSON file",
)]
struct Args {
    /// The path to the JSON file holding the data
    db: PathBuf,

    /// The port to listen on
    #[arg(long, short = 'p', default_value_t = 3000)]
    port: u16,

    /// The IP address to bind to
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    address: IpAddr,

    /// Print the generated type definitions to stdout and exit
    #[arg(long)]
    print_schema: bool,

    /// The log level for the server
    #[arg(long = "log", short = 'l', global = true, default_value_t = Level::INFO)]
    log_level: Level,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(args.log_level.into()))
        .with_ansi(true)
        .with_target(false)
        .init();

    info!("json-graphql-server v{}", std::env!("CARGO_PKG_VERSION"));

    let store = JsonStore::load(&args.db)?;
    let generator = SchemaGenerator::new(&store);

    let type_defs = generator.type_defs()?;
    if args.print_schema {
        println!("{type_defs}");
        return Ok(());
    }
    debug!("Generated type definitions:\n{type_defs}");

    let descriptors = generator.descriptors()?;
    let resolvers = generator.resolvers()?;
    info!(
        collections = descriptors.len(),
        store = %args.db.display(),
        "Generated schema"
    );

    let schema = build_schema(&descriptors, &resolvers, StoreHandle::new(store))?;
    Ok(server::serve(schema, args.address, args.port).await?)
}
