//! `Client` builder and the typed request helpers.
//!
//! This is the entry point for applications. It ties together all the
//! layers: transport → pipeline → session → router.

use std::sync::Arc;

use postzen_client::{
    HttpAuthEndpoint, RefreshCoordinator, RequestPipeline, error_message,
    json_request,
};
use postzen_protocol::{Codec, JsonCodec};
use postzen_router::{RouteTable, Router, RouterConfig};
use postzen_session::{CredentialStore, MemoryStorage, Storage, StorageKeys};
use postzen_transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{AuthSession, PostzenError};

/// Auth endpoint sharing the client's transport.
pub type ClientAuth<T> = HttpAuthEndpoint<Arc<T>>;

/// Builder for configuring a [`Client`].
///
/// # Example
///
/// ```rust,no_run
/// use postzen::prelude::*;
///
/// # async fn example() -> Result<(), PostzenError> {
/// let client = Client::builder()
///     .base_url("http://localhost:8080/api")
///     .storage(JsonFileStorage::new("session.json"))
///     .build()?;
///
/// let user = client.auth().login("ana@postzen.dev", "secret").await?;
/// let mine = client.get(&format!("/posts/author/{}", user.id)).await?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder<S: Storage = MemoryStorage> {
    base_url: Option<String>,
    storage: S,
    keys: StorageKeys,
    routes: RouteTable,
    router_config: RouterConfig,
}

impl ClientBuilder<MemoryStorage> {
    /// Creates a builder with in-memory storage and the PostZen routes.
    pub fn new() -> Self {
        Self {
            base_url: None,
            storage: MemoryStorage::new(),
            keys: StorageKeys::default(),
            routes: RouteTable::postzen(),
            router_config: RouterConfig::default(),
        }
    }
}

impl Default for ClientBuilder<MemoryStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Storage> ClientBuilder<S> {
    /// Sets the API base URL (`http://localhost:8080/api`).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets where the session is persisted between runs.
    pub fn storage<S2: Storage>(self, storage: S2) -> ClientBuilder<S2> {
        ClientBuilder {
            base_url: self.base_url,
            storage,
            keys: self.keys,
            routes: self.routes,
            router_config: self.router_config,
        }
    }

    pub fn storage_keys(mut self, keys: StorageKeys) -> Self {
        self.keys = keys;
        self
    }

    pub fn routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    pub fn router_config(mut self, config: RouterConfig) -> Self {
        self.router_config = config;
        self
    }

    /// Builds a client that talks HTTP through `reqwest`.
    pub fn build(self) -> Result<Client<S, ReqwestTransport>, PostzenError> {
        let base_url = self
            .base_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| PostzenError::Config("base URL is not set".into()))?;
        let transport = ReqwestTransport::new(base_url);
        Ok(self.build_with_transport(transport))
    }

    /// Builds a client over any transport. The base URL is ignored; the
    /// transport owns addressing.
    pub fn build_with_transport<T: HttpTransport>(self, transport: T) -> Client<S, T> {
        let transport = Arc::new(transport);
        let store = Arc::new(CredentialStore::with_keys(self.storage, self.keys));
        let coordinator = Arc::new(RefreshCoordinator::new(
            Arc::clone(&store),
            HttpAuthEndpoint::new(Arc::clone(&transport)),
        ));

        Client {
            auth: AuthSession::new(Arc::clone(&coordinator)),
            pipeline: RequestPipeline::new(transport, coordinator),
            router: Router::with_config(self.routes, Arc::clone(&store), self.router_config),
            store,
            codec: JsonCodec,
        }
    }
}

/// A PostZen API client with a managed session.
pub struct Client<S: Storage, T: HttpTransport> {
    store: Arc<CredentialStore<S>>,
    auth: AuthSession<S, ClientAuth<T>>,
    pipeline: RequestPipeline<S, ClientAuth<T>, Arc<T>>,
    router: Router<S>,
    codec: JsonCodec,
}

impl Client<MemoryStorage, ReqwestTransport> {
    /// Creates a new builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}

impl<S: Storage, T: HttpTransport> Client<S, T> {
    pub fn auth(&self) -> &AuthSession<S, ClientAuth<T>> {
        &self.auth
    }

    pub fn router(&self) -> &Router<S> {
        &self.router
    }

    pub fn store(&self) -> &Arc<CredentialStore<S>> {
        &self.store
    }

    pub fn pipeline(&self) -> &RequestPipeline<S, ClientAuth<T>, Arc<T>> {
        &self.pipeline
    }

    /// Sends a request through the pipeline. Any status except an
    /// unrecoverable 401 is returned as `Ok`.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, PostzenError> {
        Ok(self.pipeline.send(request).await?)
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, PostzenError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, PostzenError> {
        self.send(ApiRequest::delete(path)).await
    }

    pub async fn post<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, PostzenError> {
        let request = json_request(&self.codec, ApiRequest::post(path), body)?;
        self.send(request).await
    }

    pub async fn put<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, PostzenError> {
        let request = json_request(&self.codec, ApiRequest::put(path), body)?;
        self.send(request).await
    }

    /// `GET` and decode a 2xx JSON body.
    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, PostzenError> {
        let response = self.get(path).await?;
        self.decode(response)
    }

    /// `POST` a JSON body and decode a 2xx JSON reply.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, PostzenError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self.post(path, body).await?;
        self.decode(response)
    }

    /// `PUT` a JSON body and decode a 2xx JSON reply.
    pub async fn put_json<B, R>(&self, path: &str, body: &B) -> Result<R, PostzenError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self.put(path, body).await?;
        self.decode(response)
    }

    fn decode<R: DeserializeOwned>(&self, response: ApiResponse) -> Result<R, PostzenError> {
        if !response.is_success() {
            return Err(PostzenError::Status {
                status: response.status,
                message: error_message(&self.codec, &response),
            });
        }
        Ok(self.codec.decode(&response.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_without_base_url_fails() {
        let result = Client::builder().build();
        assert!(matches!(result, Err(PostzenError::Config(_))));
    }

    #[test]
    fn test_build_with_blank_base_url_fails() {
        let result = Client::builder().base_url("  ").build();
        assert!(matches!(result, Err(PostzenError::Config(_))));
    }

    #[test]
    fn test_build_with_base_url_starts_anonymous() {
        let client = Client::builder()
            .base_url("http://localhost:8080/api")
            .build()
            .expect("should build");
        assert!(!client.auth().is_authenticated());
        assert!(!client.store().is_initialized());
        assert!(client.router().table().get("write").is_some());
    }
}
