use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// 管线中可挂起（可超时）的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Spawn,
    Load,
    Settle,
    Convert,
    Print,
    Enumerate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Spawn => "spawn",
            Stage::Load => "load",
            Stage::Settle => "settle",
            Stage::Convert => "convert",
            Stage::Print => "print",
            Stage::Enumerate => "enumerate",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PrintError {
    #[error("Missing input: {0}")]
    MissingInput(&'static str),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("{context}: {source}")]
    Filesystem {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Render timed out during {stage} after {}ms", .after.as_millis())]
    RenderTimeout { stage: Stage, after: Duration },

    #[error("PDF conversion failed: {0}")]
    Conversion(String),

    #[error("Print failed: {0}")]
    Print(String),

    #[error("Save dialog failed: {0}")]
    Dialog(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl PrintError {
    pub fn filesystem(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Filesystem {
            context: context.into(),
            source,
        }
    }

    /// 输入错误在分配任何资源之前就被报告
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::MissingInput(_) | Self::InvalidOptions(_))
    }
}

impl Serialize for PrintError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PrintError>;
