// Wire types shared by the vision and directions clients.
pub mod chat;
pub mod directions;
pub mod vision;

//re-export types for easier access
pub use chat::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ContentPart, MessageRole};
pub use directions::{DirectionsRequest, DirectionsResponse, DirectionsStatus, LatLngLiteral, Step, TextValue};
pub use vision::{
    FindObjectRequest, FindObjectResponse, HazardAnalysisRequest, HazardAnalysisResponse,
    SceneDescriptionRequest, SceneDescriptionResponse, ThreatLevel,
};
