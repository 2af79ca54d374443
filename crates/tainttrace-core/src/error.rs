use thiserror::Error;

/// Result alias used across every tainttrace crate.
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("failed to parse ASan backtrace: {message}")]
    BacktraceParseError { message: String },

    #[error("malformed source-xml element stream: {message}")]
    XmlError { message: String },

    #[error("external tool invocation failed: {tool}: {message}")]
    ToolError { tool: String, message: String },

    #[error("configuration error: {message}")]
    ConfigError { message: String },

    #[error("graph error: {message}")]
    GraphError { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl AnalysisError {
    pub fn backtrace_parse_error(message: impl Into<String>) -> Self {
        Self::BacktraceParseError {
            message: message.into(),
        }
    }

    pub fn xml_error(message: impl Into<String>) -> Self {
        Self::XmlError {
            message: message.into(),
        }
    }

    pub fn tool_error(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolError {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn graph_error(message: impl Into<String>) -> Self {
        Self::GraphError {
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Whether the caller should treat this as fatal (abort the run) or
    /// log-and-skip the offending function, per the error taxonomy.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::XmlError { .. } | Self::ToolError { .. } | Self::BacktraceParseError { .. }
        )
    }
}
