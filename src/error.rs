use crate::page::PageNumber;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },
    #[error("failed to load document: {0}")]
    DocumentLoad(String),
    #[error("page render failed for page {page}")]
    PageRender {
        page: PageNumber,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl From<std::io::Error> for EngineError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            context: "I/O operation failed".to_string(),
        }
    }
}

impl EngineError {
    pub fn io_with_context(source: std::io::Error, context: impl Into<String>) -> Self {
        Self::Io {
            source,
            context: context.into(),
        }
    }

    pub fn document_load(message: impl Into<String>) -> Self {
        Self::DocumentLoad(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn page_render(
        page: PageNumber,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::PageRender {
            page,
            source: Box::new(source),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Load failures are the only errors that end a session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::DocumentLoad(_) | Self::Io { .. })
    }
}
