use rand::RngCore;

/// Length of the emailed verification code, in hex characters.
pub const VERIFICATION_CODE_LEN: usize = 32;

/// Generate a random lowercase hex string of exactly `len` characters.
pub fn generate_code(len: usize) -> String {
    let mut bytes = vec![0u8; len.div_ceil(2)];
    rand::rng().fill_bytes(&mut bytes);
    let mut code = hex::encode(bytes);
    code.truncate(len);
    code
}
