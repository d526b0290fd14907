use super::Parser;

#[derive(Parser, Debug)]
#[command(name = "adboard", about = "Advert board API with a cache-aside record store")]
pub struct Cli {
    /// Settings file; defaults to settings/dev.toml in debug builds, settings/release.toml otherwise.
    #[arg(long)]
    pub settings: Option<String>,
}
