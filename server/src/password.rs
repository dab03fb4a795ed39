use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use color_eyre::eyre::{eyre, Result};
use rand::rngs::OsRng;

/// Hashes a password with Argon2id into a PHC string
///
/// Hashing is CPU bound, so it runs on the blocking pool
pub async fn hash_password(password: &str) -> Result<String> {
    let password = password.to_owned();

    let hashed = tokio::task::spawn_blocking(move || -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| eyre!("Failed to hash password: {}", e))
    })
    .await??;

    Ok(hashed)
}

/// Checks a password against a stored PHC hash
///
/// A malformed stored hash is an error, a mismatch is `Ok(false)`
pub async fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let password = password.to_owned();
    let stored_hash = stored_hash.to_owned();

    let matches = tokio::task::spawn_blocking(move || -> Result<bool> {
        let parsed = PasswordHash::new(&stored_hash)
            .map_err(|e| eyre!("Stored password hash is malformed: {}", e))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await??;

    Ok(matches)
}
