//! ABOUTME: SurrealDB row shapes and the chrono <-> surrealdb::sql::Datetime serde bridge
//! ABOUTME: Grounded on the teacher's EntityRecord/RelationshipRecord datetime handling

use chrono::{DateTime, Utc};
use grag_core::{Document, Entity, Properties, Relationship, SystemMetadata};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use surrealdb::sql::Datetime;

pub(super) mod datetime_serde {
    use super::{DateTime, Datetime, Deserialize, Deserializer, Serialize, Serializer, Utc};

    pub fn serialize<S>(dt: &Datetime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        dt.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Datetime, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum DatetimeOrString {
            Datetime(Datetime),
            String(String),
        }
        match DatetimeOrString::deserialize(deserializer)? {
            DatetimeOrString::Datetime(dt) => Ok(dt),
            DatetimeOrString::String(s) => {
                let clean = s.trim_start_matches("d'").trim_end_matches('\'');
                let chrono_dt: DateTime<Utc> = clean.parse().map_err(serde::de::Error::custom)?;
                Ok(chrono_dt.into())
            }
        }
    }
}

pub(super) mod optional_datetime {
    use super::{DateTime, Datetime, Deserialize, Deserializer, Serializer, Utc};

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(dt: &Option<Datetime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match dt.as_ref() {
            Some(d) => serializer.serialize_some(d),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Datetime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum DatetimeOrString {
            Datetime(Datetime),
            String(String),
        }
        let opt = Option::<DatetimeOrString>::deserialize(deserializer)?;
        match opt {
            Some(DatetimeOrString::Datetime(dt)) => Ok(Some(dt)),
            Some(DatetimeOrString::String(s)) => {
                let clean = s.trim_start_matches("d'").trim_end_matches('\'');
                let chrono_dt: DateTime<Utc> = clean.parse().map_err(serde::de::Error::custom)?;
                Ok(Some(chrono_dt.into()))
            }
            None => Ok(None),
        }
    }
}

fn to_chrono(dt: &Datetime) -> DateTime<Utc> {
    (**dt).with_timezone(&Utc)
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct DocumentRecord {
    #[serde(skip_serializing)]
    pub id: Option<surrealdb::sql::Thing>,
    pub text: String,
    pub scope_id: String,
    pub context_ids: Vec<String>,
    #[serde(serialize_with = "datetime_serde::serialize", deserialize_with = "datetime_serde::deserialize")]
    pub recorded_at: Datetime,
    #[serde(
        default,
        serialize_with = "optional_datetime::serialize",
        deserialize_with = "optional_datetime::deserialize"
    )]
    pub valid_from: Option<Datetime>,
    #[serde(
        default,
        serialize_with = "optional_datetime::serialize",
        deserialize_with = "optional_datetime::deserialize"
    )]
    pub valid_to: Option<Datetime>,
    pub embedding: Option<Vec<f32>>,
}

impl From<&Document> for DocumentRecord {
    fn from(d: &Document) -> Self {
        Self {
            id: None,
            text: d.text.clone(),
            scope_id: d.metadata.scope_id.clone(),
            context_ids: d.metadata.context_ids.clone(),
            recorded_at: d.metadata.recorded_at.into(),
            valid_from: d.metadata.valid_from.map(Into::into),
            valid_to: d.metadata.valid_to.map(Into::into),
            embedding: d.embedding.clone(),
        }
    }
}

impl From<DocumentRecord> for Document {
    fn from(r: DocumentRecord) -> Self {
        Self {
            id: r.id.map_or_else(|| uuid::Uuid::new_v4().to_string(), |t| t.id.to_string()),
            text: r.text,
            metadata: SystemMetadata {
                scope_id: r.scope_id,
                context_ids: r.context_ids,
                recorded_at: to_chrono(&r.recorded_at),
                valid_from: r.valid_from.as_ref().map(to_chrono),
                valid_to: r.valid_to.as_ref().map(to_chrono),
            },
            embedding: r.embedding,
            similarity: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct EntityRecord {
    #[serde(skip_serializing)]
    pub id: Option<surrealdb::sql::Thing>,
    pub label: String,
    pub properties: Properties,
    pub scope_id: String,
    pub context_ids: Vec<String>,
    #[serde(serialize_with = "datetime_serde::serialize", deserialize_with = "datetime_serde::deserialize")]
    pub recorded_at: Datetime,
    #[serde(
        default,
        serialize_with = "optional_datetime::serialize",
        deserialize_with = "optional_datetime::deserialize"
    )]
    pub valid_from: Option<Datetime>,
    #[serde(
        default,
        serialize_with = "optional_datetime::serialize",
        deserialize_with = "optional_datetime::deserialize"
    )]
    pub valid_to: Option<Datetime>,
    pub embedding: Option<Vec<f32>>,
}

impl From<&Entity> for EntityRecord {
    fn from(e: &Entity) -> Self {
        Self {
            id: None,
            label: e.label.clone(),
            properties: e.properties.clone(),
            scope_id: e.metadata.scope_id.clone(),
            context_ids: e.metadata.context_ids.clone(),
            recorded_at: e.metadata.recorded_at.into(),
            valid_from: e.metadata.valid_from.map(Into::into),
            valid_to: e.metadata.valid_to.map(Into::into),
            embedding: e.embedding.clone(),
        }
    }
}

impl From<EntityRecord> for Entity {
    fn from(r: EntityRecord) -> Self {
        Self {
            id: r.id.map_or_else(|| uuid::Uuid::new_v4().to_string(), |t| t.id.to_string()),
            label: r.label,
            properties: r.properties,
            metadata: SystemMetadata {
                scope_id: r.scope_id,
                context_ids: r.context_ids,
                recorded_at: to_chrono(&r.recorded_at),
                valid_from: r.valid_from.as_ref().map(to_chrono),
                valid_to: r.valid_to.as_ref().map(to_chrono),
            },
            embedding: r.embedding,
            similarity: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct RelationshipRecord {
    #[serde(skip_serializing)]
    pub id: Option<surrealdb::sql::Thing>,
    pub rel_type: String,
    pub from_id: String,
    pub to_id: String,
    pub properties: Properties,
    pub scope_id: String,
    pub context_ids: Vec<String>,
    #[serde(serialize_with = "datetime_serde::serialize", deserialize_with = "datetime_serde::deserialize")]
    pub recorded_at: Datetime,
    #[serde(
        default,
        serialize_with = "optional_datetime::serialize",
        deserialize_with = "optional_datetime::deserialize"
    )]
    pub valid_from: Option<Datetime>,
    #[serde(
        default,
        serialize_with = "optional_datetime::serialize",
        deserialize_with = "optional_datetime::deserialize"
    )]
    pub valid_to: Option<Datetime>,
}

impl From<&Relationship> for RelationshipRecord {
    fn from(r: &Relationship) -> Self {
        Self {
            id: None,
            rel_type: r.rel_type.clone(),
            from_id: r.from.clone(),
            to_id: r.to.clone(),
            properties: r.properties.clone(),
            scope_id: r.metadata.scope_id.clone(),
            context_ids: r.metadata.context_ids.clone(),
            recorded_at: r.metadata.recorded_at.into(),
            valid_from: r.metadata.valid_from.map(Into::into),
            valid_to: r.metadata.valid_to.map(Into::into),
        }
    }
}

impl From<RelationshipRecord> for Relationship {
    fn from(r: RelationshipRecord) -> Self {
        Self {
            id: r.id.map_or_else(|| uuid::Uuid::new_v4().to_string(), |t| t.id.to_string()),
            rel_type: r.rel_type,
            from: r.from_id,
            to: r.to_id,
            properties: r.properties,
            metadata: SystemMetadata {
                scope_id: r.scope_id,
                context_ids: r.context_ids,
                recorded_at: to_chrono(&r.recorded_at),
                valid_from: r.valid_from.as_ref().map(to_chrono),
                valid_to: r.valid_to.as_ref().map(to_chrono),
            },
        }
    }
}
