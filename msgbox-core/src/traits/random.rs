use crate::error::MsgBoxError;

pub trait SecureRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), MsgBoxError>;

    fn random_bytes(&self, len: usize) -> Result<Vec<u8>, MsgBoxError> {
        let mut buf = vec![0u8; len];
        self.fill_bytes(&mut buf)?;
        Ok(buf)
    }
}

/// SecureRandom backed by the OS CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl SecureRandom for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), MsgBoxError> {
        getrandom::getrandom(dest)
            .map_err(|e| MsgBoxError::Platform(format!("getrandom failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_bytes_len_and_variation() {
        let rng = OsRandom;
        let a = rng.random_bytes(32).unwrap();
        let b = rng.random_bytes(32).unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
