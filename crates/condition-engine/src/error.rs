//! 条件引擎错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConditionError {
    #[error("未知的操作符: {0}")]
    UnknownOperator(String),

    #[error("条件表达式嵌套过深: 超过最大深度 {max_depth} (位置 {path})")]
    ExpressionTooDeep { max_depth: usize, path: String },

    #[error("表单规则结构无效 '{path}': {message}")]
    InvalidExpression { path: String, message: String },

    #[error("表单未找到: {0}")]
    FormNotFound(String),

    #[error("表单定义解析失败: {0}")]
    ParseError(String),

    #[error("文件读取失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ConditionError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownOperator(_) => "UNKNOWN_OPERATOR",
            Self::ExpressionTooDeep { .. } => "EXPRESSION_TOO_DEEP",
            Self::InvalidExpression { .. } => "INVALID_EXPRESSION",
            Self::FormNotFound(_) => "FORM_NOT_FOUND",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::JsonError(_) => "JSON_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ConditionError>;
