//! Request bodies sent by each endpoint operation.

use uuid::Uuid;

use crate::client::types::SearchType;
use crate::encoder::{Encode, EncodeValue, Record, RecordField, StringList};

/// Optional arguments for [`crate::client::Cogwit::add`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOptions {
    /// Existing dataset to append to; sent as `""` when absent.
    pub dataset_id: Option<Uuid>,
    /// Node set labels attached to the ingested data.
    pub node_set: Option<Vec<String>>,
}

/// Arguments for [`crate::client::Cogwit::cognify`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CognifyRequest {
    /// Dataset names to process.
    pub datasets: Vec<String>,
    /// Dataset ids to process.
    pub dataset_ids: Vec<Uuid>,
    /// Extract temporal relations while building the graph.
    pub temporal_cognify: bool,
}

impl CognifyRequest {
    /// Process the given dataset ids.
    pub fn for_dataset_ids(dataset_ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            dataset_ids: dataset_ids.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Process the given dataset names.
    pub fn for_datasets<S: Into<String>>(datasets: impl IntoIterator<Item = S>) -> Self {
        Self {
            datasets: datasets.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Toggle temporal extraction.
    pub fn temporal(mut self, enabled: bool) -> Self {
        self.temporal_cognify = enabled;
        self
    }
}

/// Optional arguments for [`crate::client::Cogwit::search`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Ask for one answer aggregated across datasets.
    pub use_combined_context: bool,
    /// Persist the query and answer as an interaction.
    pub save_interaction: bool,
}

/// `/add` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AddPayload {
    pub(crate) text_data: StringList,
    pub(crate) dataset_id: Option<Uuid>,
    pub(crate) dataset_name: String,
    pub(crate) node_set: Option<Vec<String>>,
}

impl Encode for AddPayload {
    fn to_encode_value(&self) -> EncodeValue {
        let dataset_id = self
            .dataset_id
            .map_or_else(|| EncodeValue::from(""), EncodeValue::from);
        Record::new("AddPayload")
            .field("text_data", self.text_data.clone())
            .with(RecordField::new("dataset_id", dataset_id).default_value(""))
            .field("dataset_name", self.dataset_name.as_str())
            .with(
                RecordField::new("node_set", self.node_set.clone())
                    .default_value(EncodeValue::Null),
            )
            .into()
    }
}

impl Encode for CognifyRequest {
    fn to_encode_value(&self) -> EncodeValue {
        Record::new("CognifyPayload")
            .field("datasets", self.datasets.clone())
            .field("dataset_ids", self.dataset_ids.clone())
            .with(RecordField::new("temporal_cognify", self.temporal_cognify).default_value(false))
            .into()
    }
}

/// `/memify` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MemifyPayload {
    pub(crate) dataset_name: String,
}

impl Encode for MemifyPayload {
    fn to_encode_value(&self) -> EncodeValue {
        Record::new("MemifyPayload")
            .field("dataset_name", self.dataset_name.as_str())
            .into()
    }
}

/// `/search` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SearchPayload {
    pub(crate) search_type: SearchType,
    pub(crate) query: String,
    pub(crate) options: SearchOptions,
}

impl Encode for SearchPayload {
    fn to_encode_value(&self) -> EncodeValue {
        Record::new("SearchPayload")
            .field("search_type", self.search_type.to_encode_value())
            .field("query", self.query.as_str())
            .with(
                RecordField::new("use_combined_context", self.options.use_combined_context)
                    .default_value(false),
            )
            .with(
                RecordField::new("save_interaction", self.options.save_interaction)
                    .default_value(false),
            )
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::to_json;
    use serde_json::json;

    #[test]
    fn add_payload_promotes_text_and_blanks_missing_dataset_id() {
        let payload = AddPayload {
            text_data: "Test data".into(),
            dataset_id: None,
            dataset_name: "test_dataset".into(),
            node_set: None,
        };
        assert_eq!(
            to_json(&payload).expect("encodes"),
            json!({
                "text_data": ["Test data"],
                "dataset_id": "",
                "dataset_name": "test_dataset",
                "node_set": null,
            })
        );
    }

    #[test]
    fn add_payload_carries_dataset_id_and_node_set() {
        let id = Uuid::parse_str("12345678-1234-1234-1234-123456789abc").expect("uuid");
        let payload = AddPayload {
            text_data: vec!["a", "b"].into(),
            dataset_id: Some(id),
            dataset_name: "docs".into(),
            node_set: Some(vec!["people".into()]),
        };
        let encoded = to_json(&payload).expect("encodes");
        assert_eq!(encoded["dataset_id"], "12345678-1234-1234-1234-123456789abc");
        assert_eq!(encoded["text_data"], json!(["a", "b"]));
        assert_eq!(encoded["node_set"], json!(["people"]));
    }

    #[test]
    fn cognify_payload_lists_names_and_ids() {
        let id = Uuid::parse_str("11111111-2222-3333-4444-555555555555").expect("uuid");
        let request = CognifyRequest::for_dataset_ids([id]).temporal(true);
        assert_eq!(
            to_json(&request).expect("encodes"),
            json!({
                "datasets": [],
                "dataset_ids": ["11111111-2222-3333-4444-555555555555"],
                "temporal_cognify": true,
            })
        );
    }

    #[test]
    fn search_payload_uses_search_type_value() {
        let payload = SearchPayload {
            search_type: SearchType::RagCompletion,
            query: "What is in data?".into(),
            options: SearchOptions::default(),
        };
        assert_eq!(
            to_json(&payload).expect("encodes"),
            json!({
                "search_type": "RAG_COMPLETION",
                "query": "What is in data?",
                "use_combined_context": false,
                "save_interaction": false,
            })
        );
    }
}
