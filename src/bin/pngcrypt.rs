// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! pngcrypt: encrypt and decrypt the contents of PNG files
//!
//! Commands:
//!   keygen  --out key.json           - generate a key pair
//!   encrypt <png> --key key.json     - write <stem>_encrypted.png
//!   decrypt <png> --key key.json     - write <stem>_decrypted.png
//!                                      (CBC when the file carries a seed)
//!   info    <png>                    - list chunks and decoded metadata
//!   strip   <png>                    - drop ancillary chunks

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use pngcrypt::png::chunk::{decode_chunks, encode_chunks};
use pngcrypt::png::metadata;
use pngcrypt::{
    attach_seed, decrypt_chunks, detach_seed, encrypt_chunks, png, Chaining, ChainingSeed, ChunkSelector, ChunkTag,
    Granularity, KeyPair, PrivateKey, PublicKey, TransformConfig,
};

#[derive(Parser, Debug)]
#[command(name = "pngcrypt", version, about = "Encrypt PNG image data with an RSA-style block cipher")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "PNGCRYPT_LOG", default_value = "info", global = true)]
    log: String,

    /// Log format (json, text)
    #[arg(long, env = "PNGCRYPT_LOG_FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a key pair and write it as JSON
    Keygen {
        /// Bit length of each prime (the modulus is about twice this)
        #[arg(long, default_value_t = 512)]
        bits: u64,
        /// Key file with n, e and d
        #[arg(long, short = 'o')]
        out: PathBuf,
        /// Optional second file with only n and e
        #[arg(long)]
        public_out: Option<PathBuf>,
    },

    /// Encrypt a PNG
    Encrypt {
        input: PathBuf,
        #[arg(long, short = 'k')]
        key: PathBuf,
        #[arg(long, default_value = "ecb")]
        mode: Mode,
        /// Encrypt decoded pixels and keep the output viewable
        #[arg(long)]
        pixels: bool,
        /// Encrypt every chunk except IHDR and IEND
        #[arg(long, conflicts_with = "pixels")]
        all_chunks: bool,
        /// Chunk types to encrypt, e.g. `IDAT,tEXt` (default: IDAT)
        #[arg(long, value_delimiter = ',', value_parser = parse_tag, conflicts_with_all = ["pixels", "all_chunks"])]
        tags: Vec<ChunkTag>,
        /// Output path (default: <stem>_encrypted.png)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// Decrypt a PNG produced by `encrypt`
    Decrypt {
        input: PathBuf,
        #[arg(long, short = 'k')]
        key: PathBuf,
        /// Default: CBC if the file carries a seed chunk or --seed is given,
        /// else ECB
        #[arg(long)]
        mode: Option<Mode>,
        #[arg(long)]
        pixels: bool,
        #[arg(long, conflicts_with = "pixels")]
        all_chunks: bool,
        #[arg(long, value_delimiter = ',', value_parser = parse_tag, conflicts_with_all = ["pixels", "all_chunks"])]
        tags: Vec<ChunkTag>,
        /// CBC seed as hex (default: read from the file's seed chunk)
        #[arg(long)]
        seed: Option<String>,
        /// Output path (default: <stem>_decrypted.png)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// List chunks and decoded metadata
    Info { input: PathBuf },

    /// Remove all ancillary chunks
    Strip {
        input: PathBuf,
        /// Output path (default: <stem>_stripped.png)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Ecb,
    Cbc,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

/// On-disk key: hex-encoded integers. `d` is absent in public key files.
#[derive(Serialize, Deserialize)]
struct KeyFile {
    n: String,
    e: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    d: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log, &cli.log_format);

    match cli.command {
        Commands::Keygen { bits, out, public_out } => cmd_keygen(bits, &out, public_out.as_deref()),
        Commands::Encrypt { input, key, mode, pixels, all_chunks, tags, out } => {
            let config = transform_config(pixels, all_chunks, tags);
            let out = out.unwrap_or_else(|| sibling(&input, "encrypted"));
            cmd_encrypt(&input, &key, mode, &config, &out)
        }
        Commands::Decrypt { input, key, mode, pixels, all_chunks, tags, seed, out } => {
            let config = transform_config(pixels, all_chunks, tags);
            let out = out.unwrap_or_else(|| sibling(&input, "decrypted"));
            cmd_decrypt(&input, &key, mode, seed.as_deref(), &config, &out)
        }
        Commands::Info { input } => cmd_info(&input),
        Commands::Strip { input, out } => {
            let out = out.unwrap_or_else(|| sibling(&input, "stripped"));
            cmd_strip(&input, &out)
        }
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn transform_config(pixels: bool, all_chunks: bool, tags: Vec<ChunkTag>) -> TransformConfig {
    let config = TransformConfig::default();
    if pixels {
        config.with_granularity(Granularity::Pixels)
    } else if all_chunks {
        config.with_selector(ChunkSelector::all_but_structural())
    } else if !tags.is_empty() {
        config.with_selector(ChunkSelector::tags(tags))
    } else {
        config
    }
}

fn parse_tag(s: &str) -> std::result::Result<ChunkTag, String> {
    ChunkTag::from_name(s.trim()).ok_or_else(|| format!("`{s}` is not a four-letter chunk type"))
}

// ── Commands ─────────────────────────────────────────────────────────────────

fn cmd_keygen(bits: u64, out: &Path, public_out: Option<&Path>) -> Result<()> {
    let pair = KeyPair::generate(bits).context("generating key pair")?;
    let file = KeyFile {
        n: pair.modulus().to_str_radix(16),
        e: pair.public_exponent().to_str_radix(16),
        d: Some(pair.private_exponent().to_str_radix(16)),
    };
    write_atomic(out, serde_json::to_string_pretty(&file)?.as_bytes())?;

    if let Some(public_out) = public_out {
        let public = KeyFile { d: None, ..file };
        write_atomic(public_out, serde_json::to_string_pretty(&public)?.as_bytes())?;
    }

    info!(bits, modulus_bits = pair.modulus().bits(), out = %out.display(), "key pair written");
    Ok(())
}

fn cmd_encrypt(input: &Path, key: &Path, mode: Mode, config: &TransformConfig, out: &Path) -> Result<()> {
    let public = load_public_key(key)?;
    let chunks = read_chunks(input)?;

    let chaining = match mode {
        Mode::Ecb => Chaining::Ecb,
        Mode::Cbc => {
            let layout = pngcrypt::BlockLayout::for_modulus(&public.modulus)?;
            Chaining::Cbc(ChainingSeed::for_layout(&layout))
        }
    };

    let mut sealed = encrypt_chunks(&chunks, &public, &chaining, config)
        .with_context(|| format!("encrypting {}", input.display()))?;
    if let Chaining::Cbc(seed) = &chaining {
        sealed = attach_seed(&sealed, seed);
    }

    write_atomic(out, &encode_chunks(&sealed))?;
    info!(input = %input.display(), out = %out.display(), ?mode, "encrypted");
    Ok(())
}

fn cmd_decrypt(
    input: &Path,
    key: &Path,
    mode: Option<Mode>,
    seed_hex: Option<&str>,
    config: &TransformConfig,
    out: &Path,
) -> Result<()> {
    let private = load_private_key(key)?;
    let (embedded, chunks) = detach_seed(&read_chunks(input)?);
    let chaining = decrypt_chaining(mode, seed_hex, embedded)?;
    let mode = chaining.mode();

    let opened = decrypt_chunks(&chunks, &private, &chaining, config)
        .with_context(|| format!("decrypting {}", input.display()))?;
    write_atomic(out, &encode_chunks(&opened))?;
    info!(input = %input.display(), out = %out.display(), ?mode, "decrypted");
    Ok(())
}

/// Pick the chaining for decryption. Without `--mode`, a seed from the
/// command line or the file means CBC.
fn decrypt_chaining(mode: Option<Mode>, seed_hex: Option<&str>, embedded: Option<ChainingSeed>) -> Result<Chaining> {
    let mode = mode.unwrap_or(if seed_hex.is_some() || embedded.is_some() { Mode::Cbc } else { Mode::Ecb });
    match mode {
        Mode::Ecb => {
            if embedded.is_some() {
                warn!("file carries a CBC seed chunk but ECB mode was requested");
            }
            Ok(Chaining::Ecb)
        }
        Mode::Cbc => {
            let seed = match seed_hex {
                Some(hex) => ChainingSeed::from_bytes(decode_hex(hex).context("parsing --seed")?),
                None => embedded.ok_or(pngcrypt::CryptError::MissingSeed)?,
            };
            Ok(Chaining::Cbc(seed))
        }
    }
}

fn cmd_info(input: &Path) -> Result<()> {
    let chunks = read_chunks(input)?;
    for (i, chunk) in chunks.iter().enumerate() {
        let crc = if chunk.crc_matches() { "" } else { "  (bad CRC)" };
        println!("{i:4}  {}  {:>10} bytes{crc}", chunk.tag, chunk.len());
    }
    for meta in metadata::describe(&chunks) {
        println!("{meta}");
    }
    Ok(())
}

fn cmd_strip(input: &Path, out: &Path) -> Result<()> {
    let chunks = read_chunks(input)?;
    let kept = png::strip_ancillary(&chunks).with_context(|| format!("stripping {}", input.display()))?;
    info!(removed = chunks.len() - kept.len(), out = %out.display(), "stripped");
    write_atomic(out, &encode_chunks(&kept))
}

// ── Files ────────────────────────────────────────────────────────────────────

fn read_chunks(path: &Path) -> Result<Vec<pngcrypt::Chunk>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    decode_chunks(&bytes).with_context(|| format!("parsing {}", path.display()))
}

/// `dir/photo.png` -> `dir/photo_<suffix>.png`
fn sibling(input: &Path, suffix: &str) -> PathBuf {
    let stem = input.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    input.with_file_name(format!("{stem}_{suffix}.png"))
}

/// Write to a temp file next to `path`, then rename over it.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, data).with_context(|| format!("writing temp: {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path).with_context(|| format!("renaming to {}", path.display()))
}

fn read_key_file(path: &Path) -> Result<KeyFile> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading key: {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing key: {}", path.display()))
}

fn parse_hex_int(field: &str, value: &str) -> Result<BigUint> {
    BigUint::parse_bytes(value.as_bytes(), 16).with_context(|| format!("key field `{field}` is not hex"))
}

fn load_public_key(path: &Path) -> Result<PublicKey> {
    let file = read_key_file(path)?;
    Ok(PublicKey { modulus: parse_hex_int("n", &file.n)?, exponent: parse_hex_int("e", &file.e)? })
}

fn load_private_key(path: &Path) -> Result<PrivateKey> {
    let file = read_key_file(path)?;
    let Some(d) = file.d.as_deref() else {
        bail!("{} is a public key; decryption needs `d`", path.display());
    };
    Ok(PrivateKey::new(parse_hex_int("n", &file.n)?, &parse_hex_int("d", d)?))
}

fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.trim();
    if !s.is_ascii() || s.len() % 2 != 0 {
        bail!("expected an even number of hex digits");
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).with_context(|| format!("bad hex at offset {i}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pngcrypt::CipherMode;

    #[test]
    fn hex_decoding() {
        assert_eq!(decode_hex("00ff10Ab").unwrap(), vec![0x00, 0xFF, 0x10, 0xAB]);
        assert_eq!(decode_hex(" 0a\n").unwrap(), vec![0x0A]);
        assert!(decode_hex("abc").is_err());
        assert!(decode_hex("zz").is_err());
        assert!(decode_hex("\u{e9}a").is_err());
        assert!(decode_hex("").unwrap().is_empty());
    }

    #[test]
    fn sibling_paths() {
        assert_eq!(sibling(Path::new("dir/photo.png"), "encrypted"), PathBuf::from("dir/photo_encrypted.png"));
        assert_eq!(sibling(Path::new("photo"), "stripped"), PathBuf::from("photo_stripped.png"));
    }

    #[test]
    fn atomic_write_replaces_target() {
        let dir = std::env::temp_dir().join(format!("pngcrypt-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.png");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert!(!path.with_extension("tmp").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn embedded_seed_implies_cbc() {
        let seed = ChainingSeed::from_bytes(vec![7; 13]);
        let chaining = decrypt_chaining(None, None, Some(seed.clone())).unwrap();
        assert_eq!(chaining, Chaining::Cbc(seed.clone()));
        assert_eq!(decrypt_chaining(None, None, None).unwrap(), Chaining::Ecb);
        assert_eq!(decrypt_chaining(Some(Mode::Ecb), None, Some(seed)).unwrap(), Chaining::Ecb);
    }

    #[test]
    fn seed_flag_overrides_embedded() {
        let embedded = ChainingSeed::from_bytes(vec![7; 4]);
        let chaining = decrypt_chaining(None, Some("01020304"), Some(embedded)).unwrap();
        assert_eq!(chaining, Chaining::Cbc(ChainingSeed::from_bytes(vec![1, 2, 3, 4])));
        assert!(decrypt_chaining(Some(Mode::Cbc), None, None).is_err());
        assert_eq!(decrypt_chaining(Some(Mode::Cbc), Some("ff"), None).unwrap().mode(), CipherMode::Cbc);
    }

    #[test]
    fn tag_list_selects_chunks() {
        let tags = vec![parse_tag("tEXt").unwrap(), parse_tag("IDAT").unwrap()];
        let config = transform_config(false, false, tags);
        assert!(config.selector.selects(ChunkTag::TEXT));
        assert!(config.selector.selects(ChunkTag::IDAT));
        assert!(!config.selector.selects(ChunkTag::IEND));
        assert!(parse_tag("IDA").is_err());
        assert!(parse_tag("ID1T").is_err());
        assert_eq!(transform_config(false, false, Vec::new()), TransformConfig::default());
    }

    #[test]
    fn cli_parses_tag_list() {
        let cli = Cli::try_parse_from(["pngcrypt", "encrypt", "in.png", "-k", "key.json", "--tags", "IDAT,tEXt"]).unwrap();
        let Commands::Encrypt { tags, mode, .. } = cli.command else { panic!("expected encrypt") };
        assert_eq!(tags, vec![ChunkTag::IDAT, ChunkTag::TEXT]);
        assert!(matches!(mode, Mode::Ecb));
        assert!(Cli::try_parse_from(["pngcrypt", "encrypt", "in.png", "-k", "k", "--tags", "IDAT", "--pixels"]).is_err());
    }
}
