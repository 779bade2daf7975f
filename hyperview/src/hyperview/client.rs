//! A Hyperview client speaking HTTP.

use super::{
    split_location, AccessToken, Asset, AssetQuery, BusinessEntity, EntityQuery, Hyperview,
    NewAsset, Page, Sensor,
};
use crate::config::Config;
use anyhow::Error;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use surf::{
    http::{
        headers::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    Body, Url,
};

/// How long to wait for any single request.
const TIMEOUT: Duration = Duration::from_secs(30);

/// A client for the Hyperview REST API.
pub struct Client {
    client: surf::Client,
    instance_url: Url,
    token: AccessToken,
}

impl Client {
    /// Connect to the instance in `config`, authenticating with its client credentials.
    pub async fn connect(config: &Config) -> Result<Self, Error> {
        let client: surf::Client = surf::Config::default()
            .set_timeout(Some(TIMEOUT))
            .try_into()
            .map_err(Error::msg)?;
        let token = authenticate(&client, config).await?;
        Ok(Self {
            client,
            instance_url: config.instance_url.clone(),
            token,
        })
    }

    fn get(&self, path: &[&str]) -> Result<Request<'_>, Error> {
        let url = endpoint(&self.instance_url, path)?;
        Ok(Request::new(&self.client, Method::Get, url, &self.token))
    }

    fn post(&self, path: &[&str]) -> Result<Request<'_>, Error> {
        let url = endpoint(&self.instance_url, path)?;
        Ok(Request::new(&self.client, Method::Post, url, &self.token))
    }
}

#[async_trait]
impl Hyperview for Client {
    async fn list_assets(&self, query: &AssetQuery) -> Result<Page<Asset>, Error> {
        let page: Page<Asset> = self
            .get(&["api", "asset", "assets"])?
            .params(query.params())
            .send("asset list")
            .await?;
        tracing::debug!("asset response metadata: {}", page.metadata);
        Ok(page)
    }

    async fn asset_sensors(&self, asset_id: &str) -> Result<Vec<Sensor>, Error> {
        let mut sensors: Vec<Sensor> = self
            .get(&["api", "asset", "sensors", asset_id])?
            .send("sensor list")
            .await?;
        for sensor in &mut sensors {
            sensor.asset_id = Some(asset_id.to_string());
        }
        Ok(sensors)
    }

    async fn list_business_entities(
        &self,
        query: &EntityQuery,
    ) -> Result<Page<BusinessEntity>, Error> {
        let page: Page<BusinessEntity> = self
            .get(&["api", "asset", "businessEntities", "advancedCollection"])?
            .params(query.params())
            .send("business entity list")
            .await?;
        tracing::debug!("business entity response metadata: {}", page.metadata);
        Ok(page)
    }

    async fn find_parent(
        &self,
        asset_type: &str,
        location_path: &str,
    ) -> Result<Option<String>, Error> {
        let res: SearchResponse = self
            .post(&["api", "asset", "search"])?
            .json(&search_query(asset_type, location_path))?
            .send("search results")
            .await?;
        Ok(res.data.into_iter().next().map(|hit| hit.id))
    }

    async fn create_asset(&self, asset: &NewAsset) -> Result<Value, Error> {
        self.post(&["api", "asset", "assets"])?
            .json(asset)?
            .send("asset creation response")
            .await
    }
}

/// Form body of a client credentials token request.
#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<&'a str>,
}

/// Response from the token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<u64>,
}

/// Obtain an access token using the OAuth2 client credentials grant.
async fn authenticate(client: &surf::Client, config: &Config) -> Result<AccessToken, Error> {
    let url = endpoint(&config.instance_url, &["connect", "token"])?;
    tracing::info!("requesting access token from: {url}");

    let body = Body::from_form(&TokenRequest {
        grant_type: "client_credentials",
        client_id: &config.client_id,
        client_secret: &config.client_secret,
        scope: config.scope.as_deref(),
    })
    .map_err(Error::msg)?;
    let mut res = client
        .post(url.as_str())
        .header(ACCEPT, "application/json")
        .body(body)
        .await
        .map_err(|err| Error::msg(format!("failed to authenticate: {err}")))?;
    if !res.status().is_success() {
        let body = res.body_string().await.unwrap_or_default();
        return Err(Error::msg(format!(
            "failed to authenticate: {url} returned {}: {body}",
            res.status()
        )));
    }

    let token: TokenResponse = res
        .body_json()
        .await
        .map_err(|err| Error::msg(format!("failed to decode token response: {err}")))?;
    let access_token = token
        .access_token
        .ok_or_else(|| Error::msg("token response has no access_token"))?;
    tracing::info!(
        token_type = ?token.token_type,
        expires_in = ?token.expires_in,
        "successfully authenticated"
    );
    tracing::debug!("access token: {access_token}");
    Ok(access_token.into())
}

/// Response from the search endpoint.
#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    id: String,
}

/// Build a search for the asset of type `asset_type` at `location_path`.
///
/// The name of the asset is matched as a phrase (boosting display name matches) and its ancestors
/// are matched as a prefix of the tab-delimited path of the asset.
fn search_query(asset_type: &str, location_path: &str) -> Value {
    let (ancestors, name) = split_location(location_path);
    json!({
        "from": "0",
        "size": "10",
        "selectedFields": ["DisplayName"],
        "searchComplexDataFields": [],
        "query": {
            "bool": {
                "filter": {
                    "bool": {
                        "must": [
                            { "match": { "assetType": asset_type } },
                            { "wildcard": { "tabDelimitedPath": format!("{ancestors}*") } }
                        ]
                    }
                },
                "should": [
                    {
                        "query_string": {
                            "query": format!("\"{name}\""),
                            "fields": ["displayNameLowerCase^5", "*"]
                        }
                    }
                ],
                "minimum_should_match": "1"
            }
        }
    })
}

/// Append percent-encoded path segments to the instance URL.
fn endpoint(instance_url: &Url, path: &[&str]) -> Result<Url, Error> {
    let mut url = instance_url.clone();
    url.path_segments_mut()
        .map_err(|_| Error::msg(format!("invalid instance URL {instance_url}")))?
        .pop_if_empty()
        .extend(path);
    Ok(url)
}

/// An authenticated request to the Hyperview API.
struct Request<'a> {
    client: &'a surf::Client,
    method: Method,
    url: Url,
    bearer: String,
    body: Option<Body>,
}

impl<'a> Request<'a> {
    fn new(client: &'a surf::Client, method: Method, url: Url, token: &AccessToken) -> Self {
        Self {
            client,
            method,
            url,
            bearer: token.bearer(),
            body: None,
        }
    }

    fn params(mut self, params: Vec<(&'static str, String)>) -> Self {
        self.url.query_pairs_mut().extend_pairs(params);
        self
    }

    fn json(mut self, body: &impl Serialize) -> Result<Self, Error> {
        self.body = Some(Body::from_json(body).map_err(Error::msg)?);
        Ok(self)
    }

    async fn send<T: DeserializeOwned>(self, what: &str) -> Result<T, Error> {
        tracing::info!(method = %self.method, url = %self.url, "Hyperview request");
        let mut builder = self
            .client
            .request(self.method, self.url.as_str())
            .header(AUTHORIZATION, self.bearer)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        if let Some(body) = self.body {
            builder = builder.body(body);
        }
        let mut res = builder
            .await
            .map_err(|err| Error::msg(format!("failed to fetch {what}: {err}")))?;
        if !res.status().is_success() {
            let body = res.body_string().await.unwrap_or_default();
            return Err(Error::msg(format!(
                "failed to fetch {what}: {} returned {}: {body}",
                self.url,
                res.status()
            )));
        }
        let body = res.body_string().await.map_err(Error::msg)?;
        tracing::debug!("response from {}: {body}", self.url);
        serde_json::from_str(&body)
            .map_err(|err| Error::msg(format!("failed to decode {what}: {err}")))
    }
}
