use rand::{CryptoRng, RngCore};

/// Source of IVs, salts and file keys
///
/// Any cryptographically secure `rand` generator qualifies. Callers pass it
/// explicitly; tests use a seeded `StdRng`.
pub trait SecureRandom: RngCore + CryptoRng {}

impl<T: RngCore + CryptoRng> SecureRandom for T {}
