// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! BigQuery datasets and tables.
//!
//! One plugin covers both kinds, told apart by `kind`. Datasets are patched
//! directly; tables go through the batch. Both share a 35-per-minute write
//! budget, the table-update quota being the tighter of the two.
//!
//! A table listing does not report the table's location, so every table is
//! given its dataset's.

use crate::batch::{BatchSink, HttpVerb, WriteOperation};
use crate::constants::{
    BATCH_SIZE, BIGQUERY_RATE_LIMIT_CALLS, BIGQUERY_RATE_LIMIT_PERIOD, DEFAULT_LABELS_POINTER,
};
use crate::context::Context;
use crate::errors::ProviderError;
use crate::gcp::Service;
use crate::plugins::{PluginCore, PluginDescriptor, ResourcePlugin};
use crate::record::{LabelWriteRequest, LogEvent, ResourceRecord};
use crate::synthesizer::Capability;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info};

const DATASET_KIND: &str = "bigquery#dataset";

fn is_dataset(resource: &ResourceRecord) -> bool {
    resource.str_field("kind") == Some(DATASET_KIND)
}

/// Dataset or table id, without any `project:` qualifier.
fn name(resource: &ResourceRecord) -> Option<String> {
    let id = if is_dataset(resource) {
        resource.str_at("/datasetReference/datasetId")
    } else {
        resource.str_at("/tableReference/tableId")
    }?;
    Some(id.rsplit(':').next().unwrap_or(id).to_string())
}

fn location(resource: &ResourceRecord) -> Option<String> {
    resource.str_field("location").map(str::to_lowercase)
}

const CAPABILITIES: &[Capability] = &[
    Capability {
        attribute: "name",
        extract: name,
    },
    Capability {
        attribute: "location",
        extract: location,
    },
];

fn dataset_path(project_id: &str, dataset_id: &str) -> String {
    format!("/bigquery/v2/projects/{project_id}/datasets/{dataset_id}")
}

fn table_path(project_id: &str, dataset_id: &str, table_id: &str) -> String {
    format!("{}/tables/{table_id}", dataset_path(project_id, dataset_id))
}

/// Which resource a BigQuery insert event created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InsertedResource<'a> {
    Dataset {
        project_id: &'a str,
        dataset_id: &'a str,
    },
    Table {
        project_id: &'a str,
        dataset_id: &'a str,
        table_id: &'a str,
    },
}

/// Read the created dataset or table out of the legacy `serviceData` payload.
pub(crate) fn inserted_resource(event: &LogEvent) -> Option<InsertedResource<'_>> {
    let service_data = event.proto_payload.service_data.as_ref()?;
    let str_at = |pointer: &str| service_data.pointer(pointer).and_then(Value::as_str);

    if let (Some(project_id), Some(dataset_id)) = (
        str_at("/datasetInsertRequest/resource/datasetName/projectId"),
        str_at("/datasetInsertRequest/resource/datasetName/datasetId"),
    ) {
        return Some(InsertedResource::Dataset {
            project_id,
            dataset_id,
        });
    }

    let table = "/tableInsertRequest/resource/tableName";
    Some(InsertedResource::Table {
        project_id: str_at(&format!("{table}/projectId"))?,
        dataset_id: str_at(&format!("{table}/datasetId"))?,
        table_id: str_at(&format!("{table}/tableId"))?,
    })
}

/// BigQuery plugin.
pub struct Bigquery {
    core: PluginCore,
}

impl Bigquery {
    /// Built-in descriptor.
    pub const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
        name: "Bigquery",
        service: Service::Bigquery,
        method_names: &["datasetservice.insert", "tableservice.insert"],
        on_creation: true,
        relabel_on_cron: false,
        zonal: false,
        labels_pointer: DEFAULT_LABELS_POINTER,
        batch_size: Some(BATCH_SIZE),
        rate_limit: Some((BIGQUERY_RATE_LIMIT_CALLS, BIGQUERY_RATE_LIMIT_PERIOD)),
    };

    #[must_use]
    pub fn new(ctx: Arc<Context>) -> Self {
        Self {
            core: PluginCore::new(Self::DESCRIPTOR, ctx),
        }
    }

    #[must_use]
    pub fn with_sink(ctx: Arc<Context>, sink: Arc<dyn BatchSink>) -> Self {
        Self {
            core: PluginCore::with_sink(Self::DESCRIPTOR, ctx, sink),
        }
    }

    async fn list(
        &self,
        path: &str,
        items_key: &str,
    ) -> Result<Vec<ResourceRecord>, ProviderError> {
        let items = self
            .core
            .ctx()
            .gcp
            .list_all(Service::Bigquery, path, items_key, &[])
            .await?;
        Ok(items.into_iter().map(ResourceRecord::new).collect())
    }

    async fn fetch(&self, path: &str) -> Option<ResourceRecord> {
        match self.core.ctx().gcp.get(Service::Bigquery, path).await {
            Ok(value) => Some(ResourceRecord::new(value)),
            Err(e) => {
                info!(path = path, error = %e, "Could not fetch BigQuery resource from event");
                None
            }
        }
    }
}

#[async_trait]
impl ResourcePlugin for Bigquery {
    fn core(&self) -> &PluginCore {
        &self.core
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    async fn enumerate(
        &self,
        project_id: &str,
        _zone: Option<&str>,
    ) -> Result<Vec<ResourceRecord>, ProviderError> {
        let datasets = self
            .list(&format!("/bigquery/v2/projects/{project_id}/datasets"), "datasets")
            .await?;

        let mut resources = Vec::with_capacity(datasets.len());
        for dataset in datasets {
            let Some(dataset_id) = dataset
                .str_at("/datasetReference/datasetId")
                .map(str::to_string)
            else {
                continue;
            };
            let tables_path = format!("{}/tables", dataset_path(project_id, &dataset_id));
            let mut tables = match self.list(&tables_path, "tables").await {
                Ok(tables) => tables,
                Err(e) => {
                    // The dataset itself is still labeled
                    error!(
                        project = project_id,
                        dataset = %dataset_id,
                        error = %e,
                        "Failed to list dataset tables"
                    );
                    resources.push(dataset);
                    continue;
                }
            };
            debug!(
                project = project_id,
                dataset = %dataset_id,
                tables = tables.len(),
                "Listed dataset tables"
            );
            if let Some(location) = dataset.str_field("location") {
                let location = Value::String(location.to_string());
                for table in &mut tables {
                    table.set_field("location", location.clone());
                }
            }
            resources.push(dataset);
            resources.extend(tables);
        }
        Ok(resources)
    }

    async fn resolve_from_event(&self, event: &LogEvent) -> Option<ResourceRecord> {
        match inserted_resource(event) {
            Some(InsertedResource::Dataset {
                project_id,
                dataset_id,
            }) => self.fetch(&dataset_path(project_id, dataset_id)).await,
            Some(InsertedResource::Table {
                project_id,
                dataset_id,
                table_id,
            }) => {
                self.fetch(&table_path(project_id, dataset_id, table_id))
                    .await
            }
            None => {
                info!("BigQuery event carries no dataset or table reference");
                None
            }
        }
    }

    async fn write_labels(
        &self,
        resource: &ResourceRecord,
        request: LabelWriteRequest,
        project_id: &str,
    ) -> Result<(), ProviderError> {
        let body = json!({ "labels": request.labels });
        if is_dataset(resource) {
            let dataset_id = resource
                .str_at("/datasetReference/datasetId")
                .ok_or(ProviderError::MissingField("datasetReference"))?;
            let operation = WriteOperation::new(
                HttpVerb::Patch,
                dataset_path(project_id, dataset_id),
                body,
                dataset_id,
            );
            return self.core.send_now(operation).await;
        }

        let (Some(table_project), Some(dataset_id), Some(table_id)) = (
            resource.str_at("/tableReference/projectId"),
            resource.str_at("/tableReference/datasetId"),
            resource.str_at("/tableReference/tableId"),
        ) else {
            return Err(ProviderError::MissingField("tableReference"));
        };
        let operation = WriteOperation::new(
            HttpVerb::Patch,
            table_path(table_project, dataset_id, table_id),
            body,
            format!("{dataset_id}.{table_id}"),
        );
        self.core.submit(operation).await
    }
}

#[cfg(test)]
#[path = "bigquery_tests.rs"]
mod bigquery_tests;
