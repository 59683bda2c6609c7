//! 运营者会话
//!
//! 看板只关心"当前是否存在会话"，授权逻辑不在本 crate 内。

use subtle::ConstantTimeEq;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub operator: String,
}

/// 会话协作方
pub trait SessionProvider: Send + Sync {
    /// 根据凭据返回当前会话，无效或缺失时为 None
    fn current_session(&self, credential: Option<&str>) -> Option<Session>;

    fn sign_out(&self, session: &Session);

    /// 是否启用（未启用时管理端点不对外暴露）
    fn is_enabled(&self) -> bool {
        true
    }
}

/// 单一静态令牌，常量时间比较
pub struct StaticTokenSessions {
    token: String,
}

impl StaticTokenSessions {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl SessionProvider for StaticTokenSessions {
    fn current_session(&self, credential: Option<&str>) -> Option<Session> {
        if self.token.is_empty() {
            return None;
        }
        let credential = credential?;
        if bool::from(credential.as_bytes().ct_eq(self.token.as_bytes())) {
            Some(Session {
                operator: "admin".to_string(),
            })
        } else {
            debug!("Rejected operator credential");
            None
        }
    }

    fn sign_out(&self, session: &Session) {
        // 静态令牌无法吊销，只记录
        info!("Operator '{}' signed out", session.operator);
    }

    fn is_enabled(&self) -> bool {
        !self.token.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_token() {
        let sessions = StaticTokenSessions::new("s3cret");
        assert!(sessions.is_enabled());
        assert_eq!(
            sessions.current_session(Some("s3cret")).map(|s| s.operator),
            Some("admin".to_string())
        );
        assert!(sessions.current_session(Some("s3cre")).is_none());
        assert!(sessions.current_session(None).is_none());
    }

    #[test]
    fn test_empty_token_disables_sessions() {
        let sessions = StaticTokenSessions::new("");
        assert!(!sessions.is_enabled());
        assert!(sessions.current_session(Some("")).is_none());
    }
}
