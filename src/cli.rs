use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Install the Piper TTS engine and voices, then start the Piper server")]
pub struct Args {
    /// Install voices whose name contains this text (e.g. "voice-en-us");
    /// defaults to the configured default voice
    pub filter: Option<String>,

    /// Path to configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Install under this directory instead of the configured root
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Stop after installing; don't run the npm server
    #[arg(long)]
    pub no_server: bool,

    /// Print the install report as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_is_positional_and_optional() {
        let args = Args::parse_from(["piper-bootstrap"]);
        assert!(args.filter.is_none());
        assert!(!args.no_server);

        let args = Args::parse_from([
            "piper-bootstrap",
            "voice-de",
            "--no-server",
            "--root",
            "/opt/tts",
        ]);
        assert_eq!(args.filter.as_deref(), Some("voice-de"));
        assert!(args.no_server);
        assert_eq!(args.root, Some(PathBuf::from("/opt/tts")));
    }
}
