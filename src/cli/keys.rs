use clap::Subcommand;
use std::path::{Path, PathBuf};

use crate::account::types::Identity;
use crate::crypto::{KeyFile, KeyPair};
use crate::error::WalletError;

#[derive(Subcommand, Debug, Clone)]
pub enum KeysCommands {
    /// Generate a new signing key
    Generate {
        /// Name of the key file (e.g. "alice")
        #[arg(long)]
        name: String,
    },
    /// Print the identity a key signs for
    Show {
        #[arg(long)]
        name: String,
    },
}

pub fn key_path(keys_dir: &Path, name: &str) -> PathBuf {
    keys_dir.join(format!("{}.json", name))
}

pub fn load_key(keys_dir: &Path, name: &str) -> Result<KeyPair, WalletError> {
    KeyFile::load(&key_path(keys_dir, name))?.keypair()
}

/// Accept either a hex identity or the name of a local key file.
pub fn resolve_identity(keys_dir: &Path, value: &str) -> Result<Identity, WalletError> {
    if let Ok(identity) = value.parse::<Identity>() {
        return Ok(identity);
    }
    let path = key_path(keys_dir, value);
    if path.exists() {
        return Ok(KeyFile::load(&path)?.identity);
    }
    Err(WalletError::Config(format!(
        "'{}' is neither a hex identity nor a key in {}",
        value,
        keys_dir.display()
    )))
}

pub fn handle_keys_command(cmd: KeysCommands, keys_dir: &Path) -> Result<(), WalletError> {
    match cmd {
        KeysCommands::Generate { name } => {
            let path = key_path(keys_dir, &name);
            if path.exists() {
                return Err(WalletError::Storage(format!(
                    "'{}' already exists. Aborting to prevent overwrite.",
                    path.display()
                )));
            }
            std::fs::create_dir_all(keys_dir).map_err(|e| WalletError::Storage(e.to_string()))?;

            let keypair = KeyPair::generate();
            KeyFile::new(&name, &keypair).save(&path)?;
            println!("Key '{}' saved to {}", name, path.display());
            println!("Identity: {}", keypair.identity());
        }
        KeysCommands::Show { name } => {
            let key = KeyFile::load(&key_path(keys_dir, &name))?;
            println!("{}", key.identity);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_identity_by_hex_or_name() {
        let dir = tempfile::tempdir().unwrap();
        handle_keys_command(KeysCommands::Generate { name: "bob".to_string() }, dir.path()).unwrap();
        let bob = load_key(dir.path(), "bob").unwrap().identity();

        assert_eq!(resolve_identity(dir.path(), "bob").unwrap(), bob);
        assert_eq!(resolve_identity(dir.path(), &bob.to_string()).unwrap(), bob);
        assert!(resolve_identity(dir.path(), "carol").is_err());
    }

    #[test]
    fn test_generate_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = KeysCommands::Generate { name: "bob".to_string() };
        handle_keys_command(cmd.clone(), dir.path()).unwrap();
        assert!(handle_keys_command(cmd, dir.path()).is_err());
    }
}
