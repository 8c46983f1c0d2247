//! CLI argument definitions using clap derive macros.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

/// Upload and download media through a federated messaging home server.
///
/// Uploads print the content identifier (`mxc://server/id`); downloads write
/// the original bytes and report their content type and filename.
#[derive(Parser, Debug)]
#[command(name = "mxmedia")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: $XDG_CONFIG_HOME/mxmedia/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Home server address (bare host names use https)
    #[arg(short = 's', long, global = true)]
    pub homeserver: Option<String>,

    /// Username to log in as
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// Password for --user
    #[arg(short, long, env = "MXMEDIA_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Maximum concurrent requests (1-100)
    #[arg(long, global = true, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub max_in_flight: Option<u8>,

    /// Send the access token with downloads
    #[arg(long, global = true)]
    pub authenticated_downloads: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload a file and print its content identifier
    Upload {
        /// File to upload
        file: PathBuf,

        /// Content type (default: guessed from the file extension)
        #[arg(long)]
        content_type: Option<String>,

        /// Filename to store with the upload (default: the file's name)
        #[arg(long)]
        filename: Option<String>,
    },
    /// Download a media object
    Download {
        /// Content identifier (mxc://server/id), or the server name when MEDIA_ID is given
        target: String,

        /// Media id on the server named by TARGET
        media_id: Option<String>,

        /// Output path (default: the stored filename, or the media id)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Guesses a content type from a file extension.
#[must_use]
pub fn content_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("txt" | "text" | "log") => "text/plain",
        Some("md") => "text/markdown",
        Some("html" | "htm") => "text/html",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("mp3") => "audio/mp3",
        Some("ogg") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_upload_parses_successfully() {
        let args = Args::try_parse_from(["mxmedia", "upload", "notes.txt"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(!args.authenticated_downloads);
        match args.command {
            Command::Upload {
                file,
                content_type,
                filename,
            } => {
                assert_eq!(file, PathBuf::from("notes.txt"));
                assert_eq!(content_type, None);
                assert_eq!(filename, None);
            }
            Command::Download { .. } => panic!("expected upload"),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "mxmedia",
            "upload",
            "a.bin",
            "--user",
            "alice",
            "--password",
            "secret",
            "-s",
            "localhost:8008",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.user.as_deref(), Some("alice"));
        assert_eq!(args.password.as_deref(), Some("secret"));
        assert_eq!(args.homeserver.as_deref(), Some("localhost:8008"));
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_download_with_uri() {
        let args =
            Args::try_parse_from(["mxmedia", "download", "mxc://localhost/abc", "-o", "out.bin"])
                .unwrap();
        match args.command {
            Command::Download {
                target,
                media_id,
                output,
            } => {
                assert_eq!(target, "mxc://localhost/abc");
                assert_eq!(media_id, None);
                assert_eq!(output, Some(PathBuf::from("out.bin")));
            }
            Command::Upload { .. } => panic!("expected download"),
        }
    }

    #[test]
    fn test_cli_download_with_server_and_media_id() {
        let args = Args::try_parse_from(["mxmedia", "download", "localhost", "abc"]).unwrap();
        match args.command {
            Command::Download {
                target, media_id, ..
            } => {
                assert_eq!(target, "localhost");
                assert_eq!(media_id.as_deref(), Some("abc"));
            }
            Command::Upload { .. } => panic!("expected download"),
        }
    }

    #[test]
    fn test_cli_subcommand_required() {
        let err = Args::try_parse_from(["mxmedia"]).unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["mxmedia", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["mxmedia", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_max_in_flight_range() {
        let args =
            Args::try_parse_from(["mxmedia", "--max-in-flight", "100", "upload", "f"]).unwrap();
        assert_eq!(args.max_in_flight, Some(100));

        let err =
            Args::try_parse_from(["mxmedia", "--max-in-flight", "0", "upload", "f"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = Args::try_parse_from(["mxmedia", "--invalid-flag", "upload", "f"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_content_type_for_path() {
        assert_eq!(content_type_for_path(Path::new("doc.txt")), "text/plain");
        assert_eq!(content_type_for_path(Path::new("sound.MP3")), "audio/mp3");
        assert_eq!(content_type_for_path(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(
            content_type_for_path(Path::new("archive")),
            "application/octet-stream"
        );
    }
}
