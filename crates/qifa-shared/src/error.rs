use thiserror::Error;

/// Input rejected before any provider call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("标题不能为空")]
    EmptyTitle,

    #[error("内容不能为空")]
    EmptyContent,

    #[error("消息不能为空")]
    EmptyMessage,

    #[error("请输入账号")]
    MissingIdentifier,

    #[error("请输入密码")]
    MissingPassword,

    #[error("密码至少需要 {min} 位")]
    PasswordTooShort { min: usize },

    #[error("资源需要下载链接或上传文件")]
    MissingResourceSource,
}

/// Reject blank input after trimming.
pub fn require_text(value: &str, err: ValidationError) -> Result<&str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(err)
    } else {
        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text() {
        assert_eq!(require_text("  hi ", ValidationError::EmptyTitle), Ok("hi"));
        assert_eq!(
            require_text("   ", ValidationError::EmptyTitle),
            Err(ValidationError::EmptyTitle)
        );
    }
}
