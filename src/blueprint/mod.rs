mod policies;
mod systems;
mod tags;

pub use policies::VirtualNetworkPatch;
pub use systems::{GenericSystemLink, GenericSystemRequest, LinkRequest};

use serde::Serialize;
use serde_json::Value;

use crate::cache::LookupCache;
use crate::error::{ClientError, Result};
use crate::models::{BlueprintSummary, SystemInfo};
use crate::payloads::{BatchApply, CablingMapPatch, InterfaceRename, LinkLabels};
use crate::query::{self, Match, Row};
use crate::session::Session;

/// List every blueprint on the controller
pub async fn list_blueprints(session: &Session) -> Result<Vec<BlueprintSummary>> {
    let doc = session.get("/blueprints").await?;
    let items = doc.get("items").cloned().unwrap_or(Value::Array(Vec::new()));
    Ok(serde_json::from_value(items)?)
}

/// One operation inside a batch request
#[derive(Debug, Clone, Serialize)]
pub struct BatchOperation {
    pub path: String,
    pub method: String,
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize)]
struct BatchRequest<'a> {
    operations: &'a [BatchOperation],
}

/// Per-blueprint facade over a [`Session`].
///
/// The system caches (label -> identity, id -> label) live as long as the
/// handle and are never invalidated; systems are assumed not to be renamed
/// or deleted while a handle is in use.
pub struct BlueprintHandle<'s> {
    session: &'s Session,
    id: String,
    label: String,
    systems: LookupCache<String, SystemInfo>,
    labels: LookupCache<String, String>,
}

impl<'s> BlueprintHandle<'s> {
    /// Resolve `label` to a blueprint id; `NotFound` if no blueprint has it
    pub async fn open(session: &'s Session, label: &str) -> Result<Self> {
        let blueprint = list_blueprints(session)
            .await?
            .into_iter()
            .find(|bp| bp.label == label)
            .ok_or_else(|| ClientError::not_found("blueprint", label))?;

        tracing::info!(blueprint = label, id = %blueprint.id, "Opened blueprint");
        Ok(Self::with_id(session, blueprint.id, label))
    }

    /// Handle for an already-known blueprint id
    pub fn with_id(session: &'s Session, id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            session,
            id: id.into(),
            label: label.into(),
            systems: LookupCache::new(),
            labels: LookupCache::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn session(&self) -> &'s Session {
        self.session
    }

    fn path(&self, suffix: &str) -> String {
        format!("/blueprints/{}{}", self.id, suffix)
    }

    /// Raw pattern query; see [`query::run_query`]
    pub async fn query(&self, pattern: &str, multiline: bool) -> Vec<Row> {
        query::run_query(self.session, &self.id, pattern, multiline).await
    }

    /// Built pattern query with every binding present in every row
    pub async fn query_match(&self, pattern: &Match) -> Vec<Row> {
        query::run_match(self.session, &self.id, pattern).await
    }

    /// Discard staged, uncommitted changes
    pub async fn revert(&self) -> Result<()> {
        let resp = self
            .session
            .post(&self.path("/revert"), &serde_json::json!({}), &[])
            .await?;
        if !resp.is_success() {
            tracing::error!(blueprint = %self.label, status = %resp.status, "Revert failed: {}", resp.body);
        } else {
            tracing::info!(blueprint = %self.label, "Reverted staged changes");
        }
        resp.into_write_result().map(|_| ())
    }

    pub async fn patch_cabling_map(&self, patch: &CablingMapPatch) -> Option<Value> {
        self.session
            .patch_throttled(&self.path("/cabling-map"), patch, &[("comment", "cabling-map-update")])
            .await
    }

    /// Rename link endpoints through the cabling map
    pub async fn rename_cabling(&self, renames: &[InterfaceRename]) -> Option<Value> {
        let patch = CablingMapPatch::from_renames(renames);
        if patch.is_empty() {
            return None;
        }
        self.patch_cabling_map(&patch).await
    }

    pub async fn patch_link_labels(&self, labels: &LinkLabels) -> Option<Value> {
        self.session
            .patch_throttled(&self.path("/leaf-server-link-labels"), labels, &[])
            .await
    }

    pub async fn batch_apply(&self, body: &BatchApply) -> Option<Value> {
        self.session
            .patch_throttled(&self.path("/obj-policy-batch-apply"), body, &[("async", "full")])
            .await
    }

    /// Submit several API operations in one request
    pub async fn submit_batch(&self, operations: &[BatchOperation]) -> Result<Option<Value>> {
        let resp = self
            .session
            .post(
                &self.path("/batch"),
                &BatchRequest { operations },
                &[("comment", "batch-api")],
            )
            .await?;
        if !resp.is_success() {
            tracing::error!(blueprint = %self.label, status = %resp.status, "Batch failed: {}", resp.body);
        }
        resp.into_write_result()
    }

    /// DCI remote gateways configured in the blueprint
    pub async fn remote_gateways(&self) -> Result<Vec<Value>> {
        let doc = self.session.get(&self.path("/remote_gateways")).await?;
        Ok(match doc.get("remote_gateways").or_else(|| doc.get("items")) {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Object(map)) => map.values().cloned().collect(),
            _ => Vec::new(),
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Mount a blueprint listing containing `bp1` labelled `dc1`
    pub async fn mount_blueprints(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/blueprints"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"id": "bp0", "label": "lab"},
                    {"id": "bp1", "label": "dc1", "design": "two_stage_l3clos"}
                ]
            })))
            .mount(server)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::mount_blueprints;
    use super::*;
    use crate::session::test_support::logged_in;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_open_resolves_label() {
        let server = MockServer::start().await;
        let session = logged_in(&server).await;
        mount_blueprints(&server).await;

        let bp = BlueprintHandle::open(&session, "dc1").await.unwrap();
        assert_eq!(bp.id(), "bp1");
        assert_eq!(bp.label(), "dc1");
    }

    #[tokio::test]
    async fn test_open_unknown_label() {
        let server = MockServer::start().await;
        let session = logged_in(&server).await;
        mount_blueprints(&server).await;

        let err = BlueprintHandle::open(&session, "dc9").await.err().unwrap();
        assert!(matches!(err, ClientError::NotFound { kind: "blueprint", .. }));
    }

    #[tokio::test]
    async fn test_revert() {
        let server = MockServer::start().await;
        let session = logged_in(&server).await;

        Mock::given(method("POST"))
            .and(path("/api/blueprints/bp1/revert"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let bp = BlueprintHandle::with_id(&session, "bp1", "dc1");
        bp.revert().await.unwrap();
    }

    #[tokio::test]
    async fn test_batch_apply_uses_async_full() {
        let server = MockServer::start().await;
        let session = logged_in(&server).await;

        Mock::given(method("PATCH"))
            .and(path("/api/blueprints/bp1/obj-policy-batch-apply"))
            .and(query_param("async", "full"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({"task_id": "t1"})))
            .expect(1)
            .mount(&server)
            .await;

        let bp = BlueprintHandle::with_id(&session, "bp1", "dc1");
        let result = bp.batch_apply(&BatchApply::new("ct1", ["if1"], true)).await;
        assert_eq!(result, Some(json!({"task_id": "t1"})));
    }

    #[tokio::test]
    async fn test_rename_cabling() {
        let server = MockServer::start().await;
        let session = logged_in(&server).await;

        Mock::given(method("PATCH"))
            .and(path("/api/blueprints/bp1/cabling-map"))
            .and(query_param("comment", "cabling-map-update"))
            .and(body_json(json!({"links": [
                {"id": "l1", "endpoints": [{"interface": {"id": "i1", "if_name": "eth3"}}]}
            ]})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let bp = BlueprintHandle::with_id(&session, "bp1", "dc1");
        let renames = vec![InterfaceRename {
            link_id: "l1".to_string(),
            interface_id: "i1".to_string(),
            if_name: "eth3".to_string(),
        }];
        assert_eq!(bp.rename_cabling(&renames).await, None);
        assert_eq!(bp.rename_cabling(&[]).await, None);
    }

    #[tokio::test]
    async fn test_submit_batch() {
        let server = MockServer::start().await;
        let session = logged_in(&server).await;

        Mock::given(method("POST"))
            .and(path("/api/blueprints/bp1/batch"))
            .and(query_param("comment", "batch-api"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"operations": [{"id": "x"}]})))
            .expect(1)
            .mount(&server)
            .await;

        let bp = BlueprintHandle::with_id(&session, "bp1", "dc1");
        let ops = vec![BatchOperation {
            path: "/api/blueprints/bp1/virtual-networks/vn1".to_string(),
            method: "PATCH".to_string(),
            payload: json!({"label": "vn-renamed"}),
        }];
        let result = bp.submit_batch(&ops).await.unwrap();
        assert_eq!(result.unwrap()["operations"][0]["id"], "x");
    }

    #[tokio::test]
    async fn test_remote_gateways() {
        let server = MockServer::start().await;
        let session = logged_in(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/blueprints/bp1/remote_gateways"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "remote_gateways": [{"id": "rg1", "gw_name": "dc2-gw", "gw_ip": "10.2.0.1", "gw_asn": 65002}]
            })))
            .mount(&server)
            .await;

        let bp = BlueprintHandle::with_id(&session, "bp1", "dc1");
        let gateways = bp.remote_gateways().await.unwrap();
        assert_eq!(gateways.len(), 1);
        assert_eq!(gateways[0]["gw_name"], "dc2-gw");
    }
}
