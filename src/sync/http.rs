use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{Map, Value};

use super::{Collection, RemoteStore};
use crate::error::{SyncError, SyncResult};

/// JSON document store spoken to over HTTP.
///
/// `GET`, `PUT`, `PATCH` and `DELETE` on `{base}/{collection}/{id}`. A `PATCH`
/// body maps dotted field paths to their complete new values.
pub struct HttpDocumentStore {
    base_url: String,
    token: Option<String>,
    http: Client,
}

impl HttpDocumentStore {
    pub fn new(base_url: &str, token: Option<String>) -> SyncResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("clario/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, collection: Collection, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection.name(), id)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Body of a field update.
fn patch_body(fields: &[(&str, Value)]) -> Value {
    let map: Map<String, Value> = fields
        .iter()
        .map(|(path, value)| (path.to_string(), value.clone()))
        .collect();
    Value::Object(map)
}

fn transport(action: &str, e: reqwest::Error) -> SyncError {
    SyncError::Transport(format!("{} failed: {}", action, e))
}

/// Turn a non-success response into a `Backend` error carrying its body.
async fn check(resp: Response) -> SyncResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SyncError::Backend {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl RemoteStore for HttpDocumentStore {
    async fn fetch(&self, collection: Collection, id: &str) -> SyncResult<Option<Value>> {
        let resp = self
            .authorized(self.http.get(self.url(collection, id)))
            .send()
            .await
            .map_err(|e| transport("GET", e))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check(resp).await?;
        let document = resp
            .json::<Value>()
            .await
            .map_err(|e| transport("Reading document", e))?;
        Ok(Some(document))
    }

    async fn create(&self, collection: Collection, id: &str, document: &Value) -> SyncResult<()> {
        let resp = self
            .authorized(self.http.put(self.url(collection, id)))
            .json(document)
            .send()
            .await
            .map_err(|e| transport("PUT", e))?;
        check(resp).await?;
        Ok(())
    }

    async fn replace_fields(
        &self,
        collection: Collection,
        id: &str,
        fields: &[(&str, Value)],
    ) -> SyncResult<()> {
        let resp = self
            .authorized(self.http.patch(self.url(collection, id)))
            .json(&patch_body(fields))
            .send()
            .await
            .map_err(|e| transport("PATCH", e))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(SyncError::MissingDocument {
                collection,
                id: id.to_string(),
            });
        }
        check(resp).await?;
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> SyncResult<()> {
        let resp = self
            .authorized(self.http.delete(self.url(collection, id)))
            .send()
            .await
            .map_err(|e| transport("DELETE", e))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(()),
            _ => check(resp).await.map(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_urls() {
        let store = HttpDocumentStore::new("https://docs.example.com/v1/", None).unwrap();
        assert_eq!(store.base_url(), "https://docs.example.com/v1");
        assert_eq!(
            store.url(Collection::UserData, "uid-1"),
            "https://docs.example.com/v1/user_data/uid-1"
        );
        assert_eq!(
            store.url(Collection::LegacyUsers, "uid-1"),
            "https://docs.example.com/v1/users/uid-1"
        );
    }

    #[test]
    fn patch_body_keeps_dotted_paths() {
        let body = patch_body(&[
            ("preferences.language", json!("fr")),
            ("activityLog", json!([])),
        ]);
        assert_eq!(
            body,
            json!({ "preferences.language": "fr", "activityLog": [] })
        );
    }
}
