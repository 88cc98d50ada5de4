use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	tome_worker::run(tome_worker::Args::parse()).await
}
