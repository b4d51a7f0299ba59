use super::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Session and token service for unotes")]
pub struct Cli {
    /// Path to a settings file, without extension is fine.
    #[arg(long)]
    pub settings: Option<String>,

    /// Load and validate settings, then exit.
    #[arg(long)]
    pub check: bool,
}
