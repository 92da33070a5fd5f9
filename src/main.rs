//! Issuer bridge server.

// crates.io
use clap::Parser;
use color_eyre::Result;
use tokio::net::TcpListener;
// self
use vc_issuer_bridge::{config::Cli, obs};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let cli = Cli::parse();

	obs::init_tracing(cli.log_json)?;

	let operation = cli.build_operation()?;
	let listener = TcpListener::bind(cli.listen).await?;

	tracing::info!(
		listen = %listener.local_addr()?,
		cms = %operation.config().cms_url,
		vcs = %operation.config().vcs_url,
		"Issuer bridge listening."
	);

	axum::serve(listener, operation.router()).with_graceful_shutdown(shutdown_signal()).await?;

	tracing::info!("Issuer bridge stopped.");

	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!("Failed to listen for the shutdown signal: {e}.");
	}
}
