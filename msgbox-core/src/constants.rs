/// Tag used inside an account memo to reference its message box: `[MSGBOX:<logId>]`.
pub const MEMO_TAG: &str = "MSGBOX";

/// Memo attached to every log created for a message box.
pub const BOX_LOG_MEMO: &str = "msgbox:v1";

/// Page size used when walking a log through the query collaborator.
pub const PAGE_SIZE: usize = 100;

/// Largest payload a single log entry can carry before the ledger chunks it.
pub const CHUNK_SIZE: usize = 1024;

/// Constant encrypted and decrypted during setup to prove a key pair matches a box.
pub const KEY_MATCH_PROBE: &str = "msgbox-key-match-probe";

/// RSA modulus size for generated box keys.
pub const RSA_KEY_BITS: usize = 2048;

/// AES-256 key length in bytes.
pub const AES_KEY_LEN: usize = 32;

/// CBC IV and GCM nonce length in bytes (both 128-bit).
pub const IV_LEN: usize = 16;

/// GCM authentication tag length in bytes.
pub const AUTH_TAG_LEN: usize = 16;

/// Raw private key length for both supported signing families.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Raw Ed25519 public key length.
pub const ED25519_PUBLIC_KEY_LEN: usize = 32;

/// SEC1 compressed secp256k1 public key length.
pub const SECP256K1_COMPRESSED_LEN: usize = 33;

/// SEC1 uncompressed secp256k1 public key length.
pub const SECP256K1_UNCOMPRESSED_LEN: usize = 65;

/// Curve name carried in ECIES envelopes.
pub const ECIES_CURVE: &str = "secp256k1";
