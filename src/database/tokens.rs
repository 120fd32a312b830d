use super::{DatabaseService, DbResult};
use crate::auth::OpaqueToken;
use crate::models::User;

impl DatabaseService {
    pub async fn store_refresh_token(&self, user_id: i32, token: &OpaqueToken) -> DbResult<()> {
        let client = self.get_client().await?;
        client
            .execute(
                "INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
                &[&user_id, &token.hash, &token.expires_at],
            )
            .await?;
        Ok(())
    }

    /// Swaps a refresh token for a new one. The old token is deleted whether or not it
    /// was still valid, so each token is redeemable once.
    pub async fn rotate_refresh_token(
        &self,
        old_hash: &str,
        replacement: &OpaqueToken,
    ) -> DbResult<Option<User>> {
        let mut client = self.get_client().await?;
        let tx = client.transaction().await?;

        let redeemed = tx
            .query_opt(
                "DELETE FROM refresh_tokens WHERE token_hash = $1
                 RETURNING user_id, expires_at > NOW()",
                &[&old_hash],
            )
            .await?;

        let user_id: i32 = match redeemed {
            Some(row) if row.get::<_, bool>(1) => row.get(0),
            Some(_) => {
                // Expired: keep the deletion, refuse the exchange.
                tx.commit().await?;
                return Ok(None);
            }
            None => return Ok(None),
        };

        tx.execute(
            "INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
            &[&user_id, &replacement.hash, &replacement.expires_at],
        )
        .await?;
        tx.commit().await?;

        self.get_user_by_id(user_id).await
    }

    /// Returns whether a token was actually removed.
    pub async fn delete_refresh_token(&self, token_hash: &str) -> DbResult<bool> {
        let client = self.get_client().await?;
        let deleted = client
            .execute("DELETE FROM refresh_tokens WHERE token_hash = $1", &[&token_hash])
            .await?;
        Ok(deleted > 0)
    }

    /// Issues a reset token, dropping any the user requested before.
    pub async fn replace_password_reset_token(&self, user_id: i32, token: &OpaqueToken) -> DbResult<()> {
        let mut client = self.get_client().await?;
        let tx = client.transaction().await?;
        tx.execute("DELETE FROM password_reset_tokens WHERE user_id = $1", &[&user_id])
            .await?;
        tx.execute(
            "INSERT INTO password_reset_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
            &[&user_id, &token.hash, &token.expires_at],
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Redeems a reset token: sets the new hash and signs the user out everywhere.
    /// `false` when the token is unknown or expired.
    pub async fn consume_password_reset_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
    ) -> DbResult<bool> {
        let mut client = self.get_client().await?;
        let tx = client.transaction().await?;

        let redeemed = tx
            .query_opt(
                "DELETE FROM password_reset_tokens WHERE token_hash = $1
                 RETURNING user_id, expires_at > NOW()",
                &[&token_hash],
            )
            .await?;

        let user_id: i32 = match redeemed {
            Some(row) if row.get::<_, bool>(1) => row.get(0),
            Some(_) => {
                tx.commit().await?;
                return Ok(false);
            }
            None => return Ok(false),
        };

        tx.execute(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
            &[&user_id, &new_password_hash],
        )
        .await?;
        tx.execute("DELETE FROM refresh_tokens WHERE user_id = $1", &[&user_id])
            .await?;
        tx.commit().await?;

        Ok(true)
    }

    /// Removes expired refresh and reset tokens; returns how many rows went away.
    pub async fn purge_expired_tokens(&self) -> DbResult<u64> {
        let client = self.get_client().await?;
        let refresh = client
            .execute("DELETE FROM refresh_tokens WHERE expires_at <= NOW()", &[])
            .await?;
        let reset = client
            .execute("DELETE FROM password_reset_tokens WHERE expires_at <= NOW()", &[])
            .await?;
        Ok(refresh + reset)
    }
}
