use thiserror::Error;

/// Every failure a provider can report. Backend-specific errors are mapped
/// into one of these before leaving the crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CloudError {
    #[error("登录失败: {0}")]
    Auth(String),

    #[error("网络错误: {0}")]
    Network(String),

    #[error("服务端错误: {0}")]
    Backend(String),

    #[error("未找到: {0}")]
    NotFound(String),

    #[error("数据解析失败: {0}")]
    Decode(String),

    #[error("{0}")]
    Unsupported(&'static str),

    #[error("服务不可用: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for CloudError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            CloudError::Decode(e.to_string())
        } else {
            CloudError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for CloudError {
    fn from(e: serde_json::Error) -> Self {
        CloudError::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
