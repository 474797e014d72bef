//! pagecrypt CLI - Password-protected HTML pages
//!
//! Command-line interface for encrypting HTML pages into self-decrypting
//! documents, and for recovering them again.

use clap::{ArgAction, Parser, Subcommand};
use std::error::Error as _;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use pagecrypt::document::EncryptOptions;
use pagecrypt::error::Result;
use pagecrypt::file_ops;
use pagecrypt::passgen::{self, Alphabet, DEFAULT_ALPHABET, DEFAULT_PASSWORD_LEN};
use pagecrypt::password::{
    ConstantPasswordReader, PasswordReader, ReaderPasswordReader, TerminalPasswordReader,
};
use pagecrypt::provider::{CryptoProvider, SystemCryptoProvider};
use pagecrypt::template::DEFAULT_TEMPLATE;

#[derive(Parser)]
#[command(name = "pagecrypt")]
#[command(version)]
#[command(about = "Password-protect HTML pages.", long_about = None)]
struct Cli {
    /// Read password from stdin instead of from terminal
    #[arg(long, global = true)]
    password_stdin: bool,

    /// Log more detail to stderr (-v for progress, -vv for debugging)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt an HTML page
    #[command(alias = "e")]
    Encrypt {
        /// Path to the HTML file to protect
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the protected HTML page to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Generate a random password of LENGTH characters and print it,
        /// instead of reading one
        #[arg(
            short,
            long,
            value_name = "LENGTH",
            num_args = 0..=1,
            default_missing_value = "80"
        )]
        generate_password: Option<usize>,

        /// Leave the decryptor script out of the page (host pagecrypt.js yourself)
        #[arg(long)]
        no_embed_script: bool,

        /// Leave the stylesheet out of the page (host pagecrypt.css yourself)
        #[arg(long)]
        no_embed_style: bool,

        /// Hex-encoded salt of at least 32 bytes, see generate-salt. Pages
        /// encrypted with the same salt and password share one key, so
        /// recovering it for one page opens them all.
        #[arg(long, value_name = "HEX")]
        salt: Option<String>,

        /// Decrypt template to use instead of the built-in one
        #[arg(long, value_name = "FILE", env = "PAGECRYPT_TEMPLATE")]
        template: Option<PathBuf>,
    },

    /// Decrypt a page produced by encrypt
    #[command(alias = "d")]
    Decrypt {
        /// Path to the protected HTML page
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the original HTML to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Print a random password
    GeneratePassword {
        /// Number of characters
        #[arg(short, long, default_value_t = DEFAULT_PASSWORD_LEN)]
        length: usize,

        /// Characters to choose from
        #[arg(short, long, default_value = DEFAULT_ALPHABET)]
        alphabet: String,
    },

    /// Print a random hex-encoded salt for use with encrypt --salt
    GenerateSalt,

    /// Write the decryptor script and stylesheet as pagecrypt.js and
    /// pagecrypt.css, for pages encrypted with --no-embed-script or
    /// --no-embed-style
    ExportAssets {
        /// Directory to write the assets to
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Decrypt template to take the assets from instead of the built-in one
        #[arg(long, value_name = "FILE", env = "PAGECRYPT_TEMPLATE")]
        template: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let provider: Arc<dyn CryptoProvider> = Arc::new(SystemCryptoProvider::new());

    if let Err(e) = run(cli, provider).await {
        eprintln!("Error: {}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        process::exit(1);
    }
}

async fn run(cli: Cli, provider: Arc<dyn CryptoProvider>) -> Result<()> {
    match cli.command {
        Commands::Encrypt {
            input,
            output,
            generate_password,
            no_embed_script,
            no_embed_style,
            salt,
            template,
        } => {
            let custom_salt = salt.as_deref().map(passgen::parse_salt).transpose()?;
            if custom_salt.is_some() {
                warn!("encrypting with a custom salt; pages sharing it and the password share a key");
            }
            let options = EncryptOptions {
                embed_script: !no_embed_script,
                embed_style: !no_embed_style,
                custom_salt,
            };
            let template = load_template(template.as_deref())?;

            let generated = match generate_password {
                Some(length) => Some(Zeroizing::new(passgen::generate_password(
                    length,
                    &Alphabet::default(),
                )?)),
                None => None,
            };
            let mut reader: Box<dyn PasswordReader> = match &generated {
                Some(password) => Box::new(ConstantPasswordReader::new(password.as_str())),
                None => password_reader(cli.password_stdin, true),
            };

            file_ops::encrypt_file(
                provider,
                &input,
                &output,
                &mut *reader,
                &template,
                &options,
            )
            .await?;

            if let Some(password) = generated {
                println!("{}", password.as_str());
            }
            Ok(())
        }
        Commands::Decrypt { input, output } => {
            let mut reader = password_reader(cli.password_stdin, false);
            file_ops::decrypt_file(provider, &input, &output, &mut *reader).await
        }
        Commands::GeneratePassword { length, alphabet } => {
            let alphabet = Alphabet::new(&alphabet)?;
            let password = Zeroizing::new(passgen::generate_password(length, &alphabet)?);
            println!("{}", password.as_str());
            Ok(())
        }
        Commands::GenerateSalt => {
            println!("{}", hex::encode(passgen::generate_salt()?));
            Ok(())
        }
        Commands::ExportAssets { output, template } => {
            let template = load_template(template.as_deref())?;
            file_ops::export_assets(&template, &output)
        }
    }
}

fn load_template(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => file_ops::read_text(path),
        None => Ok(DEFAULT_TEMPLATE.to_string()),
    }
}

fn password_reader(use_stdin: bool, confirm: bool) -> Box<dyn PasswordReader> {
    if use_stdin {
        Box::new(ReaderPasswordReader::new(Box::new(std::io::stdin())))
    } else {
        Box::new(TerminalPasswordReader::new(confirm))
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
