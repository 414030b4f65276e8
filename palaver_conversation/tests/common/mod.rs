//! Scripted chat models for session tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use palaver_config::ModelConfig;
use palaver_core::{ChatModel, ChatRequest, LLMResponse};
use tokio::sync::Notify;

/// Replies with queued answers in order and records every request.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<ChatRequest>>,
    chunk_size: usize,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
        Self::with_chunk_size(replies, 0)
    }

    /// Streaming replies are delivered in pieces of `chunk_size` chars.
    pub fn with_chunk_size(replies: Vec<Result<&str, &str>>, chunk_size: usize) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
            chunk_size,
        })
    }

    pub fn answering(answer: &str) -> Arc<Self> {
        Self::new(vec![Ok(answer)])
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn next_reply(&self, request: &ChatRequest) -> anyhow::Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(answer)) => Ok(answer),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("script exhausted")),
        }
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, request: &ChatRequest) -> anyhow::Result<LLMResponse> {
        self.next_reply(request).map(LLMResponse::text)
    }

    async fn chat_streaming(
        &self,
        request: &ChatRequest,
        on_chunk: &(dyn for<'c> Fn(&'c str) + Send + Sync),
    ) -> anyhow::Result<LLMResponse> {
        let answer = self.next_reply(request)?;
        let chars: Vec<char> = answer.chars().collect();
        for piece in chars.chunks(self.chunk_size.max(1)) {
            on_chunk(&piece.iter().collect::<String>());
        }
        Ok(LLMResponse::text(answer))
    }

    fn model_name(&self) -> &'static str {
        "scripted"
    }
}

/// Blocks inside `chat` until released, to hold a session busy.
pub struct GatedModel {
    pub entered: Notify,
    pub release: Notify,
}

impl GatedModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: Notify::new(),
            release: Notify::new(),
        })
    }
}

#[async_trait]
impl ChatModel for GatedModel {
    async fn chat(&self, _request: &ChatRequest) -> anyhow::Result<LLMResponse> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(LLMResponse::text("done"))
    }

    fn model_name(&self) -> &'static str {
        "gated"
    }
}

pub fn model_configs(value: serde_json::Value) -> Vec<ModelConfig> {
    serde_json::from_value(value).unwrap()
}

/// Text of the last message of a request.
pub fn last_message(request: &ChatRequest) -> String {
    request
        .messages
        .last()
        .map(|m| m.content.clone())
        .unwrap_or_default()
}
