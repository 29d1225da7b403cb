//! DTOs for the Vision `images:annotate` request and response.

use serde::{Deserialize, Serialize};

use crate::domain::{Vertex, WordBox};

pub(super) const TEXT_DETECTION_FEATURE: &str = "TEXT_DETECTION";

#[derive(Debug, Serialize)]
pub(super) struct AnnotateRequestDto<'a> {
    pub(super) requests: [AnnotateImageRequestDto<'a>; 1],
}

#[derive(Debug, Serialize)]
pub(super) struct AnnotateImageRequestDto<'a> {
    pub(super) image: ImageDto,
    pub(super) features: [FeatureDto<'a>; 1],
}

#[derive(Debug, Serialize)]
pub(super) struct ImageDto {
    /// Base64-encoded image bytes.
    pub(super) content: String,
}

#[derive(Debug, Serialize)]
pub(super) struct FeatureDto<'a> {
    #[serde(rename = "type")]
    pub(super) feature_type: &'a str,
}

impl AnnotateRequestDto<'_> {
    pub(super) fn text_detection(content: String) -> Self {
        Self {
            requests: [AnnotateImageRequestDto {
                image: ImageDto { content },
                features: [FeatureDto {
                    feature_type: TEXT_DETECTION_FEATURE,
                }],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct AnnotateResponseDto {
    #[serde(default)]
    pub(super) responses: Vec<AnnotateImageResponseDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AnnotateImageResponseDto {
    #[serde(default)]
    pub(super) text_annotations: Vec<EntityAnnotationDto>,
    pub(super) error: Option<StatusDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StatusDto {
    #[serde(default)]
    pub(super) code: i32,
    #[serde(default)]
    pub(super) message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct EntityAnnotationDto {
    #[serde(default)]
    pub(super) description: String,
    pub(super) bounding_poly: Option<BoundingPolyDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BoundingPolyDto {
    #[serde(default)]
    pub(super) vertices: Vec<VertexDto>,
}

/// Vision omits zero coordinates from the payload.
#[derive(Debug, Deserialize)]
pub(super) struct VertexDto {
    #[serde(default)]
    pub(super) x: f64,
    #[serde(default)]
    pub(super) y: f64,
}

/// Outcome of decoding one annotate response.
#[derive(Debug, PartialEq)]
pub(super) enum AnnotateOutcome {
    Annotations(Vec<WordBox>),
    Rejected { code: i32, message: String },
}

impl AnnotateResponseDto {
    pub(super) fn into_outcome(self) -> AnnotateOutcome {
        let Some(first) = self.responses.into_iter().next() else {
            return AnnotateOutcome::Annotations(Vec::new());
        };
        if let Some(status) = first.error {
            return AnnotateOutcome::Rejected {
                code: status.code,
                message: status.message,
            };
        }
        AnnotateOutcome::Annotations(
            first
                .text_annotations
                .into_iter()
                .map(EntityAnnotationDto::into_word_box)
                .collect(),
        )
    }
}

impl EntityAnnotationDto {
    fn into_word_box(self) -> WordBox {
        let vertices = self
            .bounding_poly
            .map(|poly| {
                poly.vertices
                    .into_iter()
                    .map(|vertex| Vertex::new(vertex.x, vertex.y))
                    .collect()
            })
            .unwrap_or_default();
        WordBox::new(self.description, vertices)
    }
}
