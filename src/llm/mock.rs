//! Scripted Mock LLM 客户端（用于测试，无需 API）
//!
//! 按入队顺序逐条吐出预置回复，便于本地跑通整条规划管线；
//! 脚本耗尽后返回最后一条（或错误，由构造方式决定）。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, Message};

/// Scripted 客户端：每次 complete 弹出一条预置回复
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<ScriptedReply>>,
    /// 脚本耗尽时的行为
    exhausted: ScriptedReply,
}

#[derive(Clone)]
enum ScriptedReply {
    Text(String),
    Error(String),
}

impl ScriptedLlmClient {
    /// 预置一组回复，耗尽后持续返回最后一条
    pub fn new(replies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let queue: VecDeque<ScriptedReply> = replies
            .into_iter()
            .map(|r| ScriptedReply::Text(r.into()))
            .collect();
        let exhausted = queue
            .back()
            .cloned()
            .unwrap_or_else(|| ScriptedReply::Error("script exhausted".to_string()));
        Self {
            replies: Mutex::new(queue),
            exhausted,
        }
    }

    /// 所有调用都返回错误（模拟 LLM 服务不可用）
    pub fn always_failing(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            replies: Mutex::new(VecDeque::new()),
            exhausted: ScriptedReply::Error(detail),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
        let reply = {
            let mut queue = self.replies.lock().unwrap_or_else(|e| e.into_inner());
            queue.pop_front().unwrap_or_else(|| self.exhausted.clone())
        };
        match reply {
            ScriptedReply::Text(t) => Ok(t),
            ScriptedReply::Error(e) => Err(e),
        }
    }
}
