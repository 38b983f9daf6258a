use std::collections::{BTreeSet, HashMap};

use crate::error::ClientError;
use crate::outcome::Outcome;
use crate::payloads::TaggingDelta;
use crate::query::{is_in, named, node, EdgeKind, Match, NodeKind, Path};

use super::BlueprintHandle;

impl<'s> BlueprintHandle<'s> {
    /// Current tag labels of each node in `node_ids`. Untagged nodes are
    /// absent from the map.
    pub async fn system_tags(&self, node_ids: &[String]) -> HashMap<String, BTreeSet<String>> {
        let mut tags: HashMap<String, BTreeSet<String>> = HashMap::new();
        if node_ids.is_empty() {
            return tags;
        }

        let pattern = Match::new().path(
            Path::start(named("target").attr("id", is_in(node_ids.iter().cloned())))
                .in_(EdgeKind::Tag)
                .node(node(NodeKind::Tag).name("tag")),
        );
        for row in self.query_match(&pattern).await {
            if let (Some(id), Some(label)) = (row.id("target"), row.attr_str("tag", "label")) {
                tags.entry(id.to_string()).or_default().insert(label.to_string());
            }
        }
        tags
    }

    /// Add and remove tags on `nodes`, skipping the write when the nodes
    /// already carry exactly the tags being added and nothing is removed
    pub async fn apply_tags(&self, nodes: &[String], add: &[String], remove: &[String]) -> Outcome {
        let item = nodes.join(",");
        let delta = TaggingDelta::new(nodes.iter().cloned(), add.iter().cloned(), remove.iter().cloned());

        let current = if delta.nodes.is_empty() || (delta.add.is_empty() && delta.remove.is_empty()) {
            HashMap::new()
        } else {
            self.system_tags(&delta.nodes).await
        };
        if delta.is_noop(&current) {
            tracing::debug!(blueprint = %self.label, nodes = %item, "Tags already in place");
            return Outcome::unchanged(item, "tags already in place");
        }

        match self.session.post(&self.path("/tagging"), &delta, &[]).await {
            Ok(resp) if resp.is_success() => {
                tracing::info!(blueprint = %self.label, nodes = %item, add = ?delta.add, remove = ?delta.remove, "Tagged nodes");
                Outcome::applied(item, resp.json())
            }
            Ok(resp) => {
                tracing::error!(blueprint = %self.label, status = %resp.status, "Tagging failed: {}", resp.body);
                Outcome::failed(item, ClientError::Write { status: resp.status, body: resp.body })
            }
            Err(e) => Outcome::failed(item, e),
        }
    }
}
