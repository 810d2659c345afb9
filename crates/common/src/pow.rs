use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    sha2::{Digest, Sha256},
};

/// A solved proof-of-work puzzle presented when opening a gated channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOfWork {
    pub payload: String,
    pub counter: u64,
    /// Required number of leading zero bits in the digest.
    pub difficulty: u32,
}

/// Gate for privileged private-channel creation.
#[async_trait]
pub trait PowVerifier: Send + Sync {
    async fn verify(&self, pow: &ProofOfWork) -> bool;
}

/// Checks that `sha256(payload:counter)` carries at least `difficulty`
/// leading zero bits.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256PowVerifier;

#[async_trait]
impl PowVerifier for Sha256PowVerifier {
    async fn verify(&self, pow: &ProofOfWork) -> bool {
        let digest = Sha256::digest(format!("{}:{}", pow.payload, pow.counter));
        leading_zero_bits(&digest) >= pow.difficulty
    }
}

fn leading_zero_bits(digest: &[u8]) -> u32 {
    let mut bits = 0;
    for byte in digest {
        if *byte == 0 {
            bits += 8;
        } else {
            bits += byte.leading_zeros();
            break;
        }
    }
    bits
}
