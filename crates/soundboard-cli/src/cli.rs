use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser, Clone)]
#[command(name = "soundboard")]
#[command(version, about = "Headless Libre Soundboard player with silence keep-alive")]
pub struct Cli {
    /// Config file (defaults to the per-user config path)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Replay this WAV file whenever the input stays silent for the timeout
    #[arg(long, value_name = "FILE")]
    pub keep_alive: Option<PathBuf>,

    /// Print the available stereo output pairs
    #[arg(long)]
    pub list_outputs: bool,

    /// WAV files to play once
    #[arg(
        value_name = "FILE",
        required_unless_present_any = ["keep_alive", "list_outputs"]
    )]
    pub files: Vec<PathBuf>,
}

impl Cli {
    /// Whether anything besides listing outputs was requested
    pub fn wants_playback(&self) -> bool {
        !self.files.is_empty() || self.keep_alive.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("soundboard").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_files_and_options() {
        let cli = parse(&["--config", "c.yaml", "a.wav", "--keep-alive", "k.wav", "b.wav"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.yaml")));
        assert_eq!(cli.keep_alive, Some(PathBuf::from("k.wav")));
        assert_eq!(cli.files, vec![PathBuf::from("a.wav"), PathBuf::from("b.wav")]);
        assert!(cli.wants_playback());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        // Nothing to do
        assert!(parse(&[]).is_err());
        assert!(parse(&["--config", "c.yaml"]).is_err());
        assert!(parse(&["--config"]).is_err());
        assert!(parse(&["--bogus", "a.wav"]).is_err());
    }

    #[test]
    fn test_parse_list_outputs_alone() {
        let cli = parse(&["--list-outputs"]).unwrap();
        assert!(cli.list_outputs);
        assert!(cli.files.is_empty());
        assert!(!cli.wants_playback());
    }

    #[test]
    fn test_keep_alive_without_files() {
        let cli = parse(&["--keep-alive", "k.wav"]).unwrap();
        assert!(cli.files.is_empty());
        assert!(cli.wants_playback());
    }
}
