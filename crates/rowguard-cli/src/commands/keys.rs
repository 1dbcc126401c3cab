//! `rowguard keys generate` - create a shared signing secret.

use rowguard_token::SigningSecret;
use std::fs;
use std::path::PathBuf;

/// Generate a new signing secret.
pub fn generate(output: Option<PathBuf>) -> anyhow::Result<()> {
    let secret = SigningSecret::generate_encoded();

    if let Some(path) = output {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &secret)?;

        println!("✔ Generated signing secret: {}", path.display());
        println!();
        println!("⚠️  The issuer and every verifier must share this secret. Never commit it.");
        println!();
        println!("Point the configuration at it:");
        println!("  auth:");
        println!("    secret_file: {}", path.display());
    } else {
        println!("{}", secret);
        println!();
        println!("Use --output <file> to save the secret to a file.");
    }

    Ok(())
}
