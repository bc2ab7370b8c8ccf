use serde::Serialize;
use serde_with::skip_serializing_none;

/// The `{message, data}` shape every successful response uses.
#[skip_serializing_none]
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub message: &'static str,
    pub data: Option<T>,
    pub meta: Option<ListMeta>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListMeta {
    pub per_page: u32,
    pub total: i64,
}

impl<T> Envelope<T> {
    pub fn with_data(message: &'static str, data: T) -> Self {
        Self {
            message,
            data: Some(data),
            meta: None,
        }
    }

    pub fn listing(message: &'static str, data: T, meta: ListMeta) -> Self {
        Self {
            message,
            data: Some(data),
            meta: Some(meta),
        }
    }
}

impl Envelope<()> {
    pub fn message(message: &'static str) -> Self {
        Self {
            message,
            data: None,
            meta: None,
        }
    }
}
