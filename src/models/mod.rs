use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

/// The single account this deployment serves. Signup is disabled once one
/// record exists.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CharacterImage {
    pub data_uri: String,
    pub size: i64,
}

/// A named, reusable set of reference images used to bias image generation
/// toward a consistent subject.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Character {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub images: Vec<CharacterImage>,
    pub created_at: DateTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One turn of the conversation. History is client-held and sent with every
/// chat request; it is never persisted server-side.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Area,
}

impl Default for ChartKind {
    fn default() -> Self {
        ChartKind::Bar
    }
}

/// Chart description the assistant may attach to a reply.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChartData {
    pub title: String,
    pub data: Vec<serde_json::Map<String, serde_json::Value>>,
    pub categories: Vec<String>,
    pub index: String,
    #[serde(rename = "type", default)]
    pub kind: ChartKind,
}

fn default_style_strength() -> f32 {
    0.5
}

/// Which generation path the user chose, resolved once at the HTTP boundary
/// and dispatched to one flow per variant.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationRequest {
    FromDescription {
        description: String,
    },
    Enhance {
        image: String,
        #[serde(default)]
        prompt: Option<String>,
    },
    WithCharacter {
        prompt: String,
        /// When set, reference images are loaded from the character library.
        #[serde(default)]
        character_id: Option<String>,
        #[serde(default)]
        images: Vec<String>,
    },
    StyleTransfer {
        prompt: String,
        style_image: String,
        #[serde(default = "default_style_strength")]
        strength: f32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_request_dispatches_on_type_tag() {
        let req: GenerationRequest = serde_json::from_str(
            r#"{"type":"from_description","description":"a red bicycle"}"#,
        )
        .unwrap();
        assert!(matches!(req, GenerationRequest::FromDescription { .. }));

        let req: GenerationRequest = serde_json::from_str(
            r#"{"type":"enhance","image":"data:image/png;base64,aGk="}"#,
        )
        .unwrap();
        match req {
            GenerationRequest::Enhance { prompt, .. } => assert!(prompt.is_none()),
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn with_character_accepts_inline_images_or_library_id() {
        let req: GenerationRequest = serde_json::from_str(
            r#"{"type":"with_character","prompt":"at the beach","images":["data:image/png;base64,aGk="]}"#,
        )
        .unwrap();
        match req {
            GenerationRequest::WithCharacter {
                character_id,
                images,
                ..
            } => {
                assert!(character_id.is_none());
                assert_eq!(images.len(), 1);
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn style_transfer_strength_defaults_to_half() {
        let req: GenerationRequest = serde_json::from_str(
            r#"{"type":"style_transfer","prompt":"a city","style_image":"data:image/png;base64,aGk="}"#,
        )
        .unwrap();
        match req {
            GenerationRequest::StyleTransfer { strength, .. } => {
                assert!((strength - 0.5).abs() < f32::EPSILON)
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn unknown_request_type_is_rejected() {
        assert!(serde_json::from_str::<GenerationRequest>(r#"{"type":"upscale"}"#).is_err());
    }

    #[test]
    fn chart_kind_defaults_to_bar() {
        let chart: ChartData = serde_json::from_str(
            r#"{"title":"Sales","data":[{"month":"Jan","total":3}],"categories":["total"],"index":"month"}"#,
        )
        .unwrap();
        assert_eq!(chart.kind, ChartKind::Bar);
    }
}
