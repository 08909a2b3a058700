use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = hare_rank::Args::parse();

	hare_rank::run(args).await
}
