use crate::transport::TransportError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("model `{0}` is not registered")]
    NoSuchModel(String),

    #[error("model `{model}` has no field `{field}`")]
    NoSuchField { model: String, field: String },

    #[error("generated document failed to parse: {reason}\n{document}")]
    MalformedQuery { reason: String, document: String },

    #[error("record {id} of model `{model}` is not in the store")]
    MissingRecord { model: String, id: i64 },

    #[error("record payload for model `{model}` carries no numeric id")]
    MissingId { model: String },

    #[error("could not render the document: {0}")]
    Render(#[from] std::fmt::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("could not serialize the request: {0}")]
    Json(#[from] serde_json::Error),
}
