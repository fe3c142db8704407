use quick_xml::events::attributes::AttrError;
use wasm_bindgen::JsValue;

#[derive(Debug, thiserror::Error)]
pub enum GpxMinError {
    /// The document is not well-formed XML or is not a GPX document.
    #[error("Invalid GPX file format: {0}")]
    MalformedInput(String),

    #[error("Failed to write minimal GPX: {0}")]
    Write(#[from] std::io::Error),
}

impl GpxMinError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedInput(reason.into())
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedInput(_))
    }
}

impl From<quick_xml::Error> for GpxMinError {
    fn from(e: quick_xml::Error) -> Self {
        Self::MalformedInput(e.to_string())
    }
}

impl From<AttrError> for GpxMinError {
    fn from(e: AttrError) -> Self {
        Self::MalformedInput(e.to_string())
    }
}

impl From<GpxMinError> for JsValue {
    fn from(e: GpxMinError) -> Self {
        js_sys::Error::new(&e.to_string()).into()
    }
}

pub type Result<T> = std::result::Result<T, GpxMinError>;
