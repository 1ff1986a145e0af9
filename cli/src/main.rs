use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};
use cryptoconditions_cli::interface::{
    load_tree, parse_hex, parse_hex_array, save_json_data, save_tree,
};
use cryptoconditions_cli::{decode, encode, verify, Form, Inspection, VerifyFlags};
use cryptoconditions_core::json;
use tracing_subscriber::EnvFilter;

const DEFAULT_TREE_PATH: &str = "./condition.json";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Condition { tree } => {
            let tree = load_tree(&tree)?;
            println!("{}", hex::encode(encode(&tree, Form::Condition)?));
            println!("{}", tree.uri()?);
        }
        Commands::Fulfillment { tree, partial } => {
            let tree = load_tree(&tree)?;
            let form = if partial {
                Form::Partial
            } else {
                Form::Fulfillment
            };
            println!("{}", hex::encode(encode(&tree, form)?));
        }
        Commands::Decode {
            encoded,
            form,
            outfile,
        } => {
            let tree = decode(&parse_hex("encoded", &encoded)?, form)?;
            match outfile {
                Some(path) => {
                    save_tree(&path, &tree)?;
                    tracing::info!("Decoded tree written to {:?}", path);
                }
                None => println!("{}", serde_json::to_string_pretty(&json::from_tree(&tree)?)?),
            }
        }
        Commands::SignEd25519 {
            tree: path,
            secret,
            message,
            outfile,
        } => {
            let mut tree = load_tree(&path)?;
            let secret = parse_hex_array::<32>("secret", &secret)?;
            let signed = tree.sign_ed25519(&secret, &parse_hex("message", &message)?);
            save_tree(outfile.as_ref().unwrap_or(&path), &tree)?;
            tracing::info!("Signed {} ed25519 leaves", signed);
        }
        Commands::SignSecp256k1 {
            tree: path,
            secret,
            digest,
            outfile,
        } => {
            let mut tree = load_tree(&path)?;
            let secret = parse_hex_array::<32>("secret", &secret)?;
            let digest = parse_hex_array::<32>("digest", &digest)?;
            let signed = tree.sign_secp256k1_msg32(&secret, &digest)?;
            save_tree(outfile.as_ref().unwrap_or(&path), &tree)?;
            tracing::info!("Signed {} secp256k1 leaves", signed);
        }
        Commands::Verify {
            fulfillment,
            condition,
            message,
            accept_evals,
            hash_message,
        } => {
            verify(
                &parse_hex("fulfillment", &fulfillment)?,
                &parse_hex("condition", &condition)?,
                &parse_hex("message", &message)?,
                VerifyFlags {
                    accept_evals,
                    hash_message,
                },
            )?;
            println!("valid");
        }
        Commands::Inspect { tree, outfile } => {
            let report = Inspection::of(&load_tree(&tree)?)?;
            match outfile {
                Some(path) => save_json_data(&path, &report)?,
                None => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "cc-tool")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the condition of a tree, as hex and as a URI
    Condition {
        #[arg(short, long,
            value_parser,
            default_value = DEFAULT_TREE_PATH,
            value_hint = ValueHint::FilePath)]
        tree: PathBuf,
    },
    /// Print the fulfillment of a tree as hex
    Fulfillment {
        #[arg(short, long,
            value_parser,
            default_value = DEFAULT_TREE_PATH,
            value_hint = ValueHint::FilePath)]
        tree: PathBuf,

        /// Keep unsigned leaves and every threshold branch
        #[arg(long)]
        partial: bool,
    },
    /// Decode hex into a JSON tree
    Decode {
        encoded: String,

        #[arg(short, long, value_enum, default_value_t = Form::Fulfillment)]
        form: Form,

        #[arg(short, long, value_parser, value_hint = ValueHint::FilePath)]
        outfile: Option<PathBuf>,
    },
    /// Sign every ed25519 leaf bound to the secret key
    SignEd25519 {
        #[arg(short, long,
            value_parser,
            default_value = DEFAULT_TREE_PATH,
            value_hint = ValueHint::FilePath)]
        tree: PathBuf,

        /// 32 byte seed, hex
        #[arg(short, long)]
        secret: String,

        /// Message, hex
        #[arg(short, long, default_value = "")]
        message: String,

        /// Defaults to overwriting the input tree
        #[arg(short, long, value_parser, value_hint = ValueHint::FilePath)]
        outfile: Option<PathBuf>,
    },
    /// Sign every secp256k1 leaf bound to the secret key
    SignSecp256k1 {
        #[arg(short, long,
            value_parser,
            default_value = DEFAULT_TREE_PATH,
            value_hint = ValueHint::FilePath)]
        tree: PathBuf,

        /// 32 byte scalar, hex
        #[arg(short, long)]
        secret: String,

        /// 32 byte message digest, hex
        #[arg(short, long)]
        digest: String,

        #[arg(short, long, value_parser, value_hint = ValueHint::FilePath)]
        outfile: Option<PathBuf>,
    },
    /// Check a fulfillment against a condition
    Verify {
        #[arg(short, long)]
        fulfillment: String,

        #[arg(short, long)]
        condition: String,

        #[arg(short, long, default_value = "")]
        message: String,

        /// Accept every eval node
        #[arg(long)]
        accept_evals: bool,

        /// Verify secp256k1 leaves against SHA-256 of the message
        #[arg(long)]
        hash_message: bool,
    },
    /// Print cost, types and fulfillment status of a tree
    Inspect {
        #[arg(short, long,
            value_parser,
            default_value = DEFAULT_TREE_PATH,
            value_hint = ValueHint::FilePath)]
        tree: PathBuf,

        #[arg(short, long, value_parser, value_hint = ValueHint::FilePath)]
        outfile: Option<PathBuf>,
    },
}
