use std::collections::HashMap;

use crate::error::{SyncError, SyncResult};

pub(crate) const SERVICE_NAME: &str = "clario";

fn attributes(server: &str) -> HashMap<&str, &str> {
    let mut attrs = HashMap::new();
    attrs.insert("service", SERVICE_NAME);
    attrs.insert("server", server);
    attrs
}

async fn open() -> SyncResult<oo7::Keyring> {
    oo7::Keyring::new()
        .await
        .map_err(|e| SyncError::Keyring(format!("Failed to connect to keyring: {}", e)))
}

/// Store the document store access token for `server` in the system keyring.
pub async fn store_token(server: &str, token: &str) -> SyncResult<()> {
    let keyring = open().await?;
    keyring
        .create_item(
            &format!("Clario document store ({})", server),
            &attributes(server),
            token.as_bytes(),
            true, // replace existing
        )
        .await
        .map_err(|e| SyncError::Keyring(format!("Failed to store token: {}", e)))?;
    Ok(())
}

/// Load the access token for `server`, if one was stored.
pub async fn load_token(server: &str) -> SyncResult<Option<String>> {
    let keyring = open().await?;
    let items = keyring
        .search_items(&attributes(server))
        .await
        .map_err(|e| SyncError::Keyring(format!("Failed to search keyring: {}", e)))?;

    let Some(item) = items.first() else {
        return Ok(None);
    };
    let secret = item
        .secret()
        .await
        .map_err(|e| SyncError::Keyring(format!("Failed to read secret: {}", e)))?;
    let token = String::from_utf8(secret.to_vec())
        .map_err(|e| SyncError::Keyring(format!("Invalid UTF-8 in secret: {}", e)))?;
    Ok(Some(token).filter(|t| !t.is_empty()))
}

/// Forget the access token for `server`.
pub async fn delete_token(server: &str) -> SyncResult<()> {
    let keyring = open().await?;
    let items = keyring
        .search_items(&attributes(server))
        .await
        .map_err(|e| SyncError::Keyring(format!("Failed to search keyring: {}", e)))?;

    for item in items {
        item.delete()
            .await
            .map_err(|e| SyncError::Keyring(format!("Failed to delete token: {}", e)))?;
    }
    Ok(())
}
