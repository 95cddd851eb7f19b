//! Translation between [`Event`]s and storage documents.

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::RepositoryError;
use crate::event::{AggregateId, Attrs, EVENT_DOCUMENT_TYPE, Event, EventTime};
use crate::storage::{Document, ID_FIELD, IndexName, KeyRange, QueryResponse, REV_FIELD};

/// Wire shape of an event document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDocument {
    aggregate_id: AggregateId,
    name: String,
    #[serde(rename = "type")]
    kind: String,
    time: EventTime,
    #[serde(default)]
    attrs: Attrs,
}

/// Encodes `event` into the document persisted by the storage strategy.
///
/// # Errors
///
/// Returns `RepositoryError::MalformedDocument` if serialization fails.
pub fn encode(event: &Event) -> Result<Document, RepositoryError> {
    let document = EventDocument {
        aggregate_id: event.aggregate_id.clone(),
        name: event.name.clone(),
        kind: EVENT_DOCUMENT_TYPE.to_owned(),
        time: event.time,
        attrs: event.attrs.clone(),
    };
    serde_json::to_value(document).map_err(|e| RepositoryError::MalformedDocument(e.to_string()))
}

/// Decodes a single stored document, dropping storage-internal fields.
///
/// # Errors
///
/// Returns `RepositoryError::MalformedDocument` if the document is not an
/// event document.
pub fn decode_document(mut document: Document) -> Result<Event, RepositoryError> {
    if let Some(fields) = document.as_object_mut() {
        fields.remove(ID_FIELD);
        fields.remove(REV_FIELD);
    }
    let decoded: EventDocument = serde_json::from_value(document)
        .map_err(|e| RepositoryError::MalformedDocument(e.to_string()))?;
    if decoded.kind != EVENT_DOCUMENT_TYPE {
        return Err(RepositoryError::MalformedDocument(format!(
            "expected document type {EVENT_DOCUMENT_TYPE:?}, found {:?}",
            decoded.kind
        )));
    }
    Ok(Event {
        aggregate_id: decoded.aggregate_id,
        name: decoded.name,
        time: decoded.time,
        attrs: decoded.attrs,
    })
}

/// Decodes the rows of an index query, preserving their order.
///
/// # Errors
///
/// Returns `RepositoryError::QueryFailed` if the store answered with an error
/// payload, or `RepositoryError::MalformedDocument` if a row does not hold an
/// event document.
pub fn decode(
    response: QueryResponse,
    index: IndexName,
    range: &KeyRange,
) -> Result<Vec<Event>, RepositoryError> {
    match response {
        QueryResponse::Error { error, reason } => {
            let reason = match reason {
                Some(detail) => format!("{error}: {detail}"),
                None => error,
            };
            error!(%index, %range, %reason, "storage returned an error payload");
            Err(RepositoryError::QueryFailed {
                index,
                key: range.prefix.clone(),
                reason,
            })
        }
        QueryResponse::Rows { rows } => rows
            .into_iter()
            .map(|row| decode_document(row.value))
            .collect(),
    }
}
