//! Facilities for reading and writing data through the Hyperview API.

use anyhow::Error;
use async_trait::async_trait;
use derive_more::From;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

mod client;
#[cfg(any(test, feature = "testing"))]
mod mock;

pub use client::Client;
#[cfg(any(test, feature = "testing"))]
pub use mock::MockClient;

/// A Hyperview client.
#[async_trait]
pub trait Hyperview {
    /// List assets matching `query`.
    async fn list_assets(&self, query: &AssetQuery) -> Result<Page<Asset>, Error>;

    /// List the sensors attached to an asset.
    ///
    /// Every sensor returned has [`asset_id`](Sensor::asset_id) set to `asset_id`.
    async fn asset_sensors(&self, asset_id: &str) -> Result<Vec<Sensor>, Error>;

    /// List business entities.
    async fn list_business_entities(
        &self,
        query: &EntityQuery,
    ) -> Result<Page<BusinessEntity>, Error>;

    /// Find the ID of the asset of type `asset_type` at `location_path`.
    ///
    /// `location_path` is a `/`-separated path whose last component is the display name of the
    /// asset to find, for example `Campus/Building 1/Room 3/Rack 07`.
    async fn find_parent(
        &self,
        asset_type: &str,
        location_path: &str,
    ) -> Result<Option<String>, Error>;

    /// Create a new asset, returning the server's response.
    async fn create_asset(&self, asset: &NewAsset) -> Result<Value, Error>;
}

/// An OAuth2 access token.
#[derive(Clone, Debug, From, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// The value of an `Authorization` header presenting this token.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

/// A page of results from a collection endpoint.
///
/// Collection endpoints respond with
/// ```json
/// {
///     "data": [ ... ],
///     "_metadata": { ... }
/// }
/// ```
/// The metadata (paging and totals) is kept as raw JSON.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(rename = "_metadata", default)]
    pub metadata: Value,
}

/// An asset, as returned by the asset listing endpoint.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent_name: Option<String>,
    #[serde(default)]
    pub asset_type: Option<String>,
}

/// A sensor attached to an asset.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub last_value_update: Option<String>,
    /// The latest reading: a number, string, or boolean depending on the sensor.
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub unit_string: Option<String>,
    /// The asset this sensor was read from.
    ///
    /// This is not part of the API response; clients fill it in.
    #[serde(default)]
    pub asset_id: Option<String>,
}

/// A business entity (an organization owning or operating assets).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BusinessEntity {
    pub id: String,
    pub name: String,
    /// Every other field in the response.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Filtering, paging and sorting for [`Hyperview::list_assets`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetQuery {
    pub asset_type: String,
    pub include_dimensions: bool,
    pub after: u64,
    pub limit: u64,
    pub sort: String,
}

impl Default for AssetQuery {
    /// The first 10 CRAC units, by ID.
    fn default() -> Self {
        Self {
            asset_type: "crac".into(),
            include_dimensions: false,
            after: 0,
            limit: 10,
            sort: "+Id".into(),
        }
    }
}

impl AssetQuery {
    /// The query string parameters for this query.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("assetType", self.asset_type.clone()),
            ("includeDimensions", self.include_dimensions.to_string()),
            ("(after)", self.after.to_string()),
            ("(limit)", self.limit.to_string()),
            ("(sort)", self.sort.clone()),
        ]
    }
}

/// Paging for [`Hyperview::list_business_entities`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityQuery {
    pub skip: u64,
    pub take: u64,
}

impl Default for EntityQuery {
    fn default() -> Self {
        Self { skip: 0, take: 100 }
    }
}

impl EntityQuery {
    /// The query string parameters for this query.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("skip", self.skip.to_string()),
            ("take", self.take.to_string()),
        ]
    }
}

/// The payload for creating an asset.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewAsset {
    pub name: String,
    pub status: u8,
    pub asset_type_id: String,
    pub parent_id: String,
    pub asset_lifecycle_state: String,
    pub product_id: String,
    pub creatable_asset_properties: Vec<AssetProperty>,
    pub location_data: LocationData,
}

/// A typed property attached to a new asset, like a serial number.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AssetProperty {
    #[serde(rename = "type")]
    pub ty: String,
    pub value: String,
}

impl AssetProperty {
    pub fn new(ty: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            value: value.into(),
        }
    }
}

/// Where a new asset is placed.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LocationData {
    pub parent_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rack_side: Option<String>,
    #[serde(rename = "rackULocation", skip_serializing_if = "Option::is_none")]
    pub rack_u_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rack_position: Option<String>,
}

/// Split a location path into the tab-delimited path of its ancestors and its own name.
///
/// This is the form the search index uses: `Campus/Room 3/Rack 07` becomes
/// `("Campus\tRoom 3", "Rack 07")`.
pub fn split_location(location_path: &str) -> (String, String) {
    let mut segments: Vec<&str> = location_path.split('/').collect();
    let name = segments.pop().unwrap_or_default().to_string();
    (segments.join("\t"), name)
}
