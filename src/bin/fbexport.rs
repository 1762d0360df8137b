use clap::Parser;
use fbexport::{
    cli::{self, Opts},
    export::{self, GraphExporter},
    facebook::Config,
};

type Void = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> Void {
    let opts: Opts = Opts::parse();
    let _ = cli::init_logging(opts.verbose);

    let config = opts.key_file.as_ref().map(Config::from_file).transpose()?;
    let settings = config.as_ref().map(Config::settings).unwrap_or_default();
    let (token, output_dir) = opts.invocation(config.as_ref());

    let exporter = GraphExporter::new(settings, opts.compress);
    let summary = export::dispatch(&exporter, opts.target, &token, &output_dir).await?;

    log::info!("Exported {} to {:?}: {}", opts.target, output_dir, summary);
    log::logger().flush();

    Ok(())
}
