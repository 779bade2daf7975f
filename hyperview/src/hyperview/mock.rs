//! An in-memory Hyperview instance.
//!
//! This is useful for testing workflows in isolation from an actual Hyperview instance.

use super::{
    split_location, Asset, AssetQuery, BusinessEntity, EntityQuery, Hyperview, NewAsset, Page,
    Sensor,
};
use anyhow::Error;
use async_std::sync::{Arc, RwLock};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Debug, Default)]
struct Instance {
    assets: Vec<Asset>,
    sensors: HashMap<String, Vec<Sensor>>,
    business_entities: Vec<BusinessEntity>,
    /// Searchable assets, keyed by asset type and full location path.
    locations: HashMap<(String, String), String>,
    created: Vec<NewAsset>,
    failing: Vec<String>,
}

/// A client connected to an in-memory Hyperview instance.
///
/// Clones share the same instance.
#[derive(Clone, Debug, Default)]
pub struct MockClient(Arc<RwLock<Instance>>);

impl MockClient {
    /// Create an empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset.
    pub async fn with_asset(self, asset: Asset) -> Self {
        self.0.write().await.assets.push(asset);
        self
    }

    /// Attach sensors to an asset.
    pub async fn with_sensors(self, asset_id: &str, sensors: Vec<Sensor>) -> Self {
        self.0
            .write()
            .await
            .sensors
            .entry(asset_id.into())
            .or_default()
            .extend(sensors);
        self
    }

    /// Add a business entity.
    pub async fn with_business_entity(self, entity: BusinessEntity) -> Self {
        self.0.write().await.business_entities.push(entity);
        self
    }

    /// Make the asset of type `asset_type` at `location_path` findable by search.
    pub async fn with_location(self, asset_type: &str, location_path: &str, id: &str) -> Self {
        self.0
            .write()
            .await
            .locations
            .insert((asset_type.into(), location_path.into()), id.into());
        self
    }

    /// Reject attempts to create an asset named `name`.
    pub async fn failing_on(self, name: &str) -> Self {
        self.0.write().await.failing.push(name.into());
        self
    }

    /// Assets created through this client, in order.
    pub async fn created(&self) -> Vec<NewAsset> {
        self.0.read().await.created.clone()
    }
}

#[async_trait]
impl Hyperview for MockClient {
    async fn list_assets(&self, query: &AssetQuery) -> Result<Page<Asset>, Error> {
        let instance = self.0.read().await;
        let mut matching = instance
            .assets
            .iter()
            .filter(|asset| {
                asset
                    .asset_type
                    .as_deref()
                    .map(|ty| ty.eq_ignore_ascii_case(&query.asset_type))
                    .unwrap_or(false)
            })
            .cloned()
            .collect::<Vec<_>>();
        match query.sort.as_str() {
            "+Id" => matching.sort_by(|a, b| a.id.cmp(&b.id)),
            "-Id" => matching.sort_by(|a, b| b.id.cmp(&a.id)),
            _ => {}
        }
        let total = matching.len();
        let data = matching
            .into_iter()
            .skip(query.after as usize)
            .take(query.limit as usize)
            .collect();
        Ok(Page {
            data,
            metadata: json!({
                "after": query.after,
                "limit": query.limit,
                "total": total,
            }),
        })
    }

    async fn asset_sensors(&self, asset_id: &str) -> Result<Vec<Sensor>, Error> {
        let instance = self.0.read().await;
        if !instance.assets.iter().any(|asset| asset.id == asset_id)
            && !instance.sensors.contains_key(asset_id)
        {
            return Err(Error::msg(format!("no such asset {asset_id}")));
        }
        Ok(instance
            .sensors
            .get(asset_id)
            .into_iter()
            .flatten()
            .cloned()
            .map(|mut sensor| {
                sensor.asset_id = Some(asset_id.into());
                sensor
            })
            .collect())
    }

    async fn list_business_entities(
        &self,
        query: &EntityQuery,
    ) -> Result<Page<BusinessEntity>, Error> {
        let instance = self.0.read().await;
        Ok(Page {
            data: instance
                .business_entities
                .iter()
                .skip(query.skip as usize)
                .take(query.take as usize)
                .cloned()
                .collect(),
            metadata: json!({
                "skip": query.skip,
                "take": query.take,
                "total": instance.business_entities.len(),
            }),
        })
    }

    async fn find_parent(
        &self,
        asset_type: &str,
        location_path: &str,
    ) -> Result<Option<String>, Error> {
        let (ancestors, name) = split_location(location_path);
        let instance = self.0.read().await;
        Ok(instance
            .locations
            .iter()
            .find(|((ty, path), _)| {
                let (path_ancestors, path_name) = split_location(path);
                ty == asset_type
                    && path_ancestors.starts_with(&ancestors)
                    && path_name.eq_ignore_ascii_case(&name)
            })
            .map(|(_, id)| id.clone()))
    }

    async fn create_asset(&self, asset: &NewAsset) -> Result<Value, Error> {
        let mut instance = self.0.write().await;
        if instance.failing.contains(&asset.name) {
            return Err(Error::msg(format!("cannot create asset {}", asset.name)));
        }
        instance.created.push(asset.clone());
        let mut res = serde_json::to_value(asset)?;
        res["id"] = json!(format!("created-{}", instance.created.len()));
        Ok(res)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn crac(id: &str) -> Asset {
        Asset {
            id: id.into(),
            name: Some(format!("CRAC {id}")),
            parent_name: None,
            asset_type: Some("Crac".into()),
        }
    }

    #[async_std::test]
    async fn test_list_assets_paging() {
        let client = MockClient::new()
            .with_asset(crac("c"))
            .await
            .with_asset(crac("a"))
            .await
            .with_asset(crac("b"))
            .await
            .with_asset(Asset {
                id: "r".into(),
                name: Some("Rack".into()),
                parent_name: None,
                asset_type: Some("Rack".into()),
            })
            .await;

        let page = client
            .list_assets(&AssetQuery {
                after: 1,
                limit: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.data, [crac("b")]);
        assert_eq!(page.metadata["total"], 3);
    }

    #[async_std::test]
    async fn test_find_parent() {
        let client = MockClient::new()
            .with_location("Rack", "Campus/Room 1/Rack 07", "rack-7")
            .await;
        assert_eq!(
            client
                .find_parent("Rack", "Campus/Room 1/Rack 07")
                .await
                .unwrap()
                .as_deref(),
            Some("rack-7")
        );
        assert_eq!(
            client
                .find_parent("Location", "Campus/Room 1/Rack 07")
                .await
                .unwrap(),
            None
        );
    }
}
