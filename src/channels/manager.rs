//! Channel manager for coordinating conversation surfaces.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream;
use tokio::sync::RwLock;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse, StatusUpdate};
use crate::error::ChannelError;

/// Holds every enabled channel and merges their message streams.
pub struct ChannelManager {
    channels: RwLock<HashMap<String, Arc<dyn Channel>>>,
}

impl ChannelManager {
    /// Create a new channel manager.
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Add a channel to the manager.
    pub async fn add(&self, channel: Arc<dyn Channel>) {
        let name = channel.name().to_string();
        self.channels.write().await.insert(name.clone(), channel);
        tracing::debug!("Added channel: {}", name);
    }

    /// Start all channels and return a merged stream of messages.
    pub async fn start_all(&self) -> Result<MessageStream, ChannelError> {
        let channels = self.channels.read().await;
        let mut streams = Vec::new();

        for (name, channel) in channels.iter() {
            match channel.start().await {
                Ok(stream) => {
                    tracing::info!("Started channel: {}", name);
                    streams.push(stream);
                }
                Err(e) => {
                    tracing::error!("Failed to start channel {}: {}", name, e);
                }
            }
        }

        if streams.is_empty() {
            return Err(ChannelError::StartupFailed {
                name: "all".to_string(),
                reason: "No channels started successfully".to_string(),
            });
        }

        let merged = stream::select_all(streams);
        Ok(Box::pin(merged))
    }

    /// Send a response to the channel the message came from.
    pub async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let channels = self.channels.read().await;
        if let Some(channel) = channels.get(&msg.channel) {
            channel.respond(msg, response).await
        } else {
            Err(ChannelError::SendFailed {
                name: msg.channel.clone(),
                reason: "Channel not found".to_string(),
            })
        }
    }

    /// Send a status update for `msg`. Best-effort.
    pub async fn send_status(&self, msg: &IncomingMessage, status: StatusUpdate) {
        let channels = self.channels.read().await;
        if let Some(channel) = channels.get(&msg.channel) {
            if let Err(e) = channel.send_status(msg, status).await {
                tracing::debug!("Status update on {} failed: {}", msg.channel, e);
            }
        }
    }

    /// Check health of all channels.
    pub async fn health_check_all(&self) -> HashMap<String, Result<(), ChannelError>> {
        let channels = self.channels.read().await;
        let mut results = HashMap::new();

        for (name, channel) in channels.iter() {
            results.insert(name.clone(), channel.health_check().await);
        }

        results
    }

    /// Shutdown all channels.
    pub async fn shutdown_all(&self) {
        let channels = self.channels.read().await;
        for (name, channel) in channels.iter() {
            if let Err(e) = channel.shutdown().await {
                tracing::error!("Error shutting down channel {}: {}", name, e);
            }
        }
    }

    /// Get list of channel names.
    pub async fn channel_names(&self) -> Vec<String> {
        self.channels.read().await.keys().cloned().collect()
    }
}

impl Default for ChannelManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::sync::Mutex;

    struct VecChannel {
        name: String,
        questions: Vec<String>,
        responses: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Channel for VecChannel {
        fn name(&self) -> &str {
            &self.name
        }

        async fn start(&self) -> Result<MessageStream, ChannelError> {
            let msgs: Vec<IncomingMessage> = self
                .questions
                .iter()
                .map(|q| IncomingMessage::new(self.name.clone(), "tester", q.clone()))
                .collect();
            Ok(Box::pin(stream::iter(msgs)))
        }

        async fn respond(
            &self,
            _msg: &IncomingMessage,
            response: OutgoingResponse,
        ) -> Result<(), ChannelError> {
            self.responses.lock().unwrap().push(response.content);
            Ok(())
        }

        async fn health_check(&self) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    fn channel(name: &str, questions: &[&str]) -> Arc<VecChannel> {
        Arc::new(VecChannel {
            name: name.to_string(),
            questions: questions.iter().map(|q| q.to_string()).collect(),
            responses: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_start_all_merges_streams() {
        let manager = ChannelManager::new();
        manager.add(channel("a", &["one", "two"])).await;
        manager.add(channel("b", &["three"])).await;

        let mut stream = manager.start_all().await.unwrap();
        let mut seen = Vec::new();
        while let Some(msg) = stream.next().await {
            seen.push(msg.content);
        }
        seen.sort();
        assert_eq!(seen, vec!["one", "three", "two"]);
    }

    #[tokio::test]
    async fn test_respond_routes_by_channel() {
        let manager = ChannelManager::new();
        let a = channel("a", &[]);
        manager.add(a.clone()).await;

        let msg = IncomingMessage::new("a", "tester", "q");
        manager
            .respond(&msg, OutgoingResponse::text("answer"))
            .await
            .unwrap();
        assert_eq!(*a.responses.lock().unwrap(), vec!["answer".to_string()]);

        let stray = IncomingMessage::new("missing", "tester", "q");
        assert!(
            manager
                .respond(&stray, OutgoingResponse::text("x"))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_start_all_without_channels_fails() {
        let manager = ChannelManager::new();
        assert!(manager.start_all().await.is_err());
    }
}
