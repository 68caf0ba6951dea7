use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::debug;

use msgbox_core::crypto::{CryptoError, KeyPair};
use msgbox_core::error::MsgBoxError;
use msgbox_core::keys::KeyFamily;
use msgbox_core::protocol::AccountSigner;

const SIGNING_KEY_FILE: &str = "signing.key";
const BOX_PRIVATE_FILE: &str = "box_private.pem";
const BOX_PUBLIC_FILE: &str = "box_public.pem";

#[derive(Error, Debug)]
pub enum KeyFileError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no signing key stored for account {0}")]
    MissingSigningKey(String),

    #[error("malformed key file {0}")]
    Malformed(PathBuf),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Core(#[from] MsgBoxError),
}

/// Per-account key material under `<data_dir>/keys/<account_id>/`.
///
/// `signing.key` holds the key family on the first line and the hex raw
/// private key on the second. RSA box keys are kept as PKCS#8 / SPKI PEM.
/// ECIES box keys are never written: they are derived from the signing key.
pub struct KeyFiles {
    root: PathBuf,
}

impl KeyFiles {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            root: data_dir.join("keys"),
        }
    }

    fn account_dir(&self, account_id: &str) -> PathBuf {
        self.root.join(account_id)
    }

    pub async fn save_signing_key(
        &self,
        account_id: &str,
        family: KeyFamily,
        private_key: &[u8],
    ) -> Result<PathBuf, KeyFileError> {
        let dir = self.account_dir(account_id);
        create_dir(&dir).await?;
        let path = dir.join(SIGNING_KEY_FILE);
        let contents = format!("{}\n{}\n", family.as_str(), hex::encode(private_key));
        write_private(&path, contents.as_bytes()).await?;
        debug!("Saved signing key for {account_id}");
        Ok(path)
    }

    pub async fn load_signer(&self, account_id: &str) -> Result<AccountSigner, KeyFileError> {
        let path = self.account_dir(account_id).join(SIGNING_KEY_FILE);
        if !path.exists() {
            return Err(KeyFileError::MissingSigningKey(account_id.to_string()));
        }
        let contents = read_to_string(&path).await?;
        let mut lines = contents.lines().map(str::trim).filter(|l| !l.is_empty());
        let (Some(family), Some(key_hex)) = (lines.next(), lines.next()) else {
            return Err(KeyFileError::Malformed(path));
        };
        let family: KeyFamily = family.parse()?;
        let private_key = hex::decode(key_hex).map_err(|_| KeyFileError::Malformed(path.clone()))?;
        Ok(AccountSigner::new(account_id, family, private_key)?)
    }

    /// Persist an RSA box key pair. Returns `false` for ECIES pairs, which
    /// are not stored.
    pub async fn save_box_key(&self, account_id: &str, key_pair: &KeyPair) -> Result<bool, KeyFileError> {
        if !matches!(key_pair, KeyPair::Rsa(_)) {
            return Ok(false);
        }
        let dir = self.account_dir(account_id);
        create_dir(&dir).await?;

        let private_pem = key_pair.rsa_private_pem()?;
        let public_pem = key_pair.public_key().to_published()?;
        write_private(&dir.join(BOX_PRIVATE_FILE), private_pem.as_bytes()).await?;
        let public_path = dir.join(BOX_PUBLIC_FILE);
        fs::write(&public_path, public_pem.as_bytes())
            .await
            .map_err(|source| KeyFileError::Io {
                path: public_path.clone(),
                source,
            })?;
        debug!("Saved RSA box key for {account_id}");
        Ok(true)
    }

    pub async fn load_box_key(&self, account_id: &str) -> Result<Option<KeyPair>, KeyFileError> {
        let path = self.account_dir(account_id).join(BOX_PRIVATE_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let pem = read_to_string(&path).await?;
        Ok(Some(KeyPair::from_rsa_private_pem(&pem)?))
    }
}

async fn create_dir(dir: &Path) -> Result<(), KeyFileError> {
    fs::create_dir_all(dir).await.map_err(|source| KeyFileError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

async fn read_to_string(path: &Path) -> Result<String, KeyFileError> {
    fs::read_to_string(path).await.map_err(|source| KeyFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

async fn write_private(path: &Path, contents: &[u8]) -> Result<(), KeyFileError> {
    let io_err = |source: std::io::Error| KeyFileError::Io {
        path: path.to_path_buf(),
        source,
    };
    fs::write(path, contents).await.map_err(io_err)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(io_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signing_key_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let files = KeyFiles::new(dir.path());
        files
            .save_signing_key("0.0.1001", KeyFamily::EcdsaSecp256k1, &[0x11; 32])
            .await
            .unwrap();

        let signer = files.load_signer("0.0.1001").await.unwrap();
        assert_eq!(signer.account_id, "0.0.1001");
        assert_eq!(signer.family, KeyFamily::EcdsaSecp256k1);
        assert_eq!(signer.private_key(), &[0x11; 32]);
    }

    #[tokio::test]
    async fn test_missing_signing_key() {
        let dir = tempfile::tempdir().unwrap();
        let files = KeyFiles::new(dir.path());
        let err = files.load_signer("0.0.1001").await.unwrap_err();
        assert!(matches!(err, KeyFileError::MissingSigningKey(_)));
    }

    #[tokio::test]
    async fn test_malformed_signing_key() {
        let dir = tempfile::tempdir().unwrap();
        let files = KeyFiles::new(dir.path());
        let account_dir = dir.path().join("keys").join("0.0.1001");
        std::fs::create_dir_all(&account_dir).unwrap();
        std::fs::write(account_dir.join(SIGNING_KEY_FILE), "ED25519\n").unwrap();
        let err = files.load_signer("0.0.1001").await.unwrap_err();
        assert!(matches!(err, KeyFileError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_rsa_box_key_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let files = KeyFiles::new(dir.path());
        let key_pair = KeyPair::generate_rsa_with_bits(1024).unwrap();

        assert!(files.save_box_key("0.0.1001", &key_pair).await.unwrap());
        let public = std::fs::read_to_string(
            dir.path().join("keys").join("0.0.1001").join(BOX_PUBLIC_FILE),
        )
        .unwrap();
        assert!(public.starts_with("-----BEGIN PUBLIC KEY-----"));

        let loaded = files.load_box_key("0.0.1001").await.unwrap().unwrap();
        assert_eq!(loaded.public_key(), key_pair.public_key());
    }

    #[tokio::test]
    async fn test_ecies_box_key_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let files = KeyFiles::new(dir.path());
        let key_pair = KeyPair::ecies_from_signing_key(&[0x11; 32], KeyFamily::EcdsaSecp256k1).unwrap();
        assert!(!files.save_box_key("0.0.1001", &key_pair).await.unwrap());
        assert!(files.load_box_key("0.0.1001").await.unwrap().is_none());
    }
}
