use anyhow::anyhow;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hashing is deliberately slow, so it runs off the async workers.
pub async fn hash_password(password: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || {
        Argon2::default()
            .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
            .map(|hash| hash.to_string())
            .map_err(|err| anyhow!("failed to hash password: {err}"))
    })
    .await?
}

pub async fn verify_password(password: String, digest: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&digest).map_err(|err| anyhow!("unreadable password digest: {err}"))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashes_verify_only_the_original_password() {
        let digest = hash_password("password".to_owned()).await.unwrap();
        assert!(digest.starts_with("$argon2"));
        assert!(verify_password("password".to_owned(), digest.clone()).await.unwrap());
        assert!(!verify_password("passw0rd".to_owned(), digest).await.unwrap());
    }

    #[tokio::test]
    async fn garbage_digests_are_errors() {
        assert!(verify_password("password".to_owned(), "plaintext".to_owned()).await.is_err());
    }
}
