//! Keyring-backed `auth` / `deauth` commands.

use std::error::Error;
use std::io::{self, BufRead, Write};

use crate::core::error::ChatError;
use crate::core::keyring::{
    resolve_api_key, CredentialStore, KeyringCredentialStore, API_KEY_ENV,
};

/// The key for this run: keyring first, then `OPENROUTER_API_KEY`.
pub fn api_key_for_cli() -> Result<String, ChatError> {
    resolve_api_key(
        &KeyringCredentialStore::default(),
        std::env::var(API_KEY_ENV).ok(),
    )
}

pub fn run_auth() -> Result<(), Box<dyn Error>> {
    print!("Enter your OpenRouter API key: ");
    io::stdout().flush()?;

    let stdin = io::stdin();
    let key = read_key(stdin.lock())?;
    store_key(&KeyringCredentialStore::default(), &key)?;

    println!("✓ API key stored securely in the system keyring");
    println!();
    println!("✅ Authentication configured successfully!");
    println!("You can now use routechat without setting {API_KEY_ENV}.");
    Ok(())
}

pub fn run_deauth() -> Result<(), Box<dyn Error>> {
    KeyringCredentialStore::default().delete_key()?;
    println!("✅ Removed the stored API key");
    Ok(())
}

pub(crate) fn read_key(mut reader: impl BufRead) -> Result<String, Box<dyn Error>> {
    let mut input = String::new();
    reader.read_line(&mut input)?;
    let key = input.trim();
    if key.is_empty() {
        return Err("API key cannot be empty".into());
    }
    Ok(key.to_string())
}

pub(crate) fn store_key(store: &dyn CredentialStore, key: &str) -> Result<(), Box<dyn Error>> {
    store.save_key(key).map_err(|err| {
        if err.is_recoverable() {
            format!("The system keyring is unavailable ({err}); set {API_KEY_ENV} instead").into()
        } else {
            Box::<dyn Error>::from(err)
        }
    })
}
