use thiserror::Error;

/// The five error kinds an embedder can match against; all other error
/// types the engine wraps (`io::Error`, `fst::Error`) collapse into one of
/// these so callers only ever need to catch `LuceneError`.
#[derive(Error, Debug)]
pub enum LuceneError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("doc id {doc_id} is out of range (max doc {max_doc})")]
    OutOfRange { doc_id: i32, max_doc: i32 },

    #[error("invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("{0}")]
    Runtime(String),

    #[error("generation witness exhausted its retry budget: Index is under processing now")]
    GenerationWitnessExhausted,

    /// Distinct from `Runtime`: a named file does not exist yet (or was
    /// deleted). The generation witness (`spec.md` §4.1) falls back on this
    /// specific kind rather than substring-matching a message (the
    /// REDESIGN FLAG in `spec.md` §9).
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("Syntax error at char position {position}.")]
    QueryParserError { message: String, position: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Fst(#[from] fst::Error),
}

impl LuceneError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        LuceneError::InvalidArgument(msg.into())
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        LuceneError::Runtime(msg.into())
    }

    pub fn invalid_format(msg: impl Into<String>) -> Self {
        LuceneError::InvalidFileFormat(msg.into())
    }

    pub fn query_parser(message: impl Into<String>, position: usize) -> Self {
        LuceneError::QueryParserError {
            message: message.into(),
            position,
        }
    }

    pub fn file_not_found(name: impl Into<String>) -> Self {
        LuceneError::FileNotFound(name.into())
    }

    /// True for the narrow class of errors the generation witness (§4.1)
    /// treats as "file not readable yet" rather than a hard failure.
    pub fn is_not_readable(&self) -> bool {
        matches!(self, LuceneError::FileNotFound(_))
            || matches!(self, LuceneError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

pub type LuceneResult<T> = std::result::Result<T, LuceneError>;
