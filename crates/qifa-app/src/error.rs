use thiserror::Error;

use qifa_cloud::CloudError;
use qifa_shared::{ValidationError, Verdict};

/// Everything a store mutation can reject with. The `Display` text is the
/// message shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Rejected by the content filter; kept apart from plain validation.
    #[error("内容包含【{category}】违规词汇")]
    Moderation { category: String, term: String },

    #[error("游客无法发布")]
    GuestReadOnly,

    #[error("请先登录")]
    NotAuthenticated,

    #[error("需要管理员权限")]
    Forbidden,

    /// The author is muted or banned.
    #[error("账号已被限制发言")]
    Restricted,

    #[error("未找到: {0}")]
    NotFound(String),

    #[error("服务不可用: {0}")]
    ProviderUnavailable(String),

    #[error(transparent)]
    Provider(CloudError),

    #[error("AI 正在回复中，请稍候")]
    GenerationInFlight,
}

impl From<CloudError> for AppError {
    fn from(e: CloudError) -> Self {
        match e {
            CloudError::Unavailable(reason) => AppError::ProviderUnavailable(reason),
            other => AppError::Provider(other),
        }
    }
}

impl AppError {
    /// `None` for a clean verdict.
    pub fn from_verdict(verdict: Verdict) -> Option<Self> {
        match verdict {
            Verdict::Clean => None,
            Verdict::Violation { category, term } => Some(AppError::Moderation { category, term }),
        }
    }

    pub fn is_moderation(&self) -> bool {
        matches!(self, AppError::Moderation { .. })
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
