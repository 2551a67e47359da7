use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, PartialEq)]
#[command(name = "qrsign")]
#[command(about = "QrSign - Rotating check-in QR codes in your terminal")]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Seconds between code rotations (overrides config)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// Write logs to this file (overrides config)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Import a template from this image file at launch
    #[arg(long)]
    pub import: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_args() {
        let args = CliArgs::parse_from(["qrsign"]);
        assert_eq!(args.config, None);
        assert_eq!(args.interval, None);
        assert_eq!(args.log_file, None);
        assert_eq!(args.import, None);
    }

    #[test]
    fn test_cli_parse_all_flags() {
        let args = CliArgs::parse_from([
            "qrsign",
            "--config", "/custom/qrsign.toml",
            "--interval", "10",
            "--log-file", "/tmp/qrsign.log",
            "--import", "code.png",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("/custom/qrsign.toml")));
        assert_eq!(args.interval, Some(10));
        assert_eq!(args.log_file, Some(PathBuf::from("/tmp/qrsign.log")));
        assert_eq!(args.import, Some(PathBuf::from("code.png")));
    }

    #[test]
    fn test_cli_rejects_zero_interval() {
        assert!(CliArgs::try_parse_from(["qrsign", "--interval", "0"]).is_err());
    }
}
