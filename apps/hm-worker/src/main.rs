use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = hm_worker::Args::parse();

	hm_worker::run(args).await
}
