use clap::Parser;
use rlt_flow::testserver::TestServer;

/// Standalone instance of the bundled deterministic test HTTP server.
#[derive(Parser)]
struct Opts {
    /// Port to bind; 0 picks an ephemeral port.
    #[clap(long, default_value = "0")]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let opts = Opts::parse();
    let server = TestServer::bind(("127.0.0.1", opts.port)).await?;
    println!("listening on {}", server.url());
    println!("routes: GET /health, POST /echo, GET|POST /fail, GET|POST /slow?ms=N");

    tokio::signal::ctrl_c().await?;
    Ok(())
}
