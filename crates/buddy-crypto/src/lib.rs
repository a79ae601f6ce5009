/// Buddy Crypto Library
///
/// Credential handling for passwords and email-verification codes.
/// Secrets are stored only as (hash, salt, iterations); the plaintext never
/// reaches the database.

pub mod codes;
pub mod credentials;

pub use codes::{VERIFICATION_CODE_LEN, generate_code};
pub use credentials::{CredentialConfig, Credentials, HashedSecret};
