//! HTTP client for a real node.
//!
//! Point requests (`/mantle/status`, `/mantle/blocks`) carry a per-request
//! timeout. The block stream (`/mantle/blocks/stream`) is a long-lived NDJSON
//! response and must not be cut by a client-wide timeout, so the client is
//! built without one.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};

use std::time::Duration;

use crate::config::Config;
use crate::models::Block;
use crate::node::wire::{decode_block_line, WireBlock, WireHealth};
use crate::node::{BlockFeed, NodeApi, NodeError};

const ENDPOINT_STATUS: &str = "/mantle/status";
const ENDPOINT_BLOCKS: &str = "/mantle/blocks";
const ENDPOINT_BLOCKS_STREAM: &str = "/mantle/blocks/stream";

pub struct HttpNodeApi {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpNodeApi {
    pub fn new(config: &Config) -> Result<Self, NodeError> {
        let client = Client::builder()
            .build()
            .map_err(|e| NodeError::Transient(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.node_base_url(),
            timeout: config.node_api_timeout,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

fn transient(e: reqwest::Error) -> NodeError {
    NodeError::Transient(e.to_string())
}

fn check_status(response: Response) -> Result<Response, NodeError> {
    match response.status() {
        StatusCode::OK => Ok(response),
        status => Err(NodeError::Transient(format!(
            "Node returned HTTP {}",
            status
        ))),
    }
}

#[async_trait]
impl NodeApi for HttpNodeApi {
    async fn get_health(&self) -> Result<bool, NodeError> {
        let response = self
            .client
            .get(self.url(ENDPOINT_STATUS))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transient)?;
        let health: WireHealth = check_status(response)?
            .json()
            .await
            .map_err(|e| NodeError::Decode(e.to_string()))?;
        Ok(health.is_healthy)
    }

    async fn get_blocks(&self, slot_from: i64, slot_to: i64) -> Result<Vec<Block>, NodeError> {
        let response = self
            .client
            .get(self.url(ENDPOINT_BLOCKS))
            .query(&[("slot_from", slot_from), ("slot_to", slot_to)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transient)?;
        let wire: Vec<WireBlock> = check_status(response)?
            .json()
            .await
            .map_err(|e| NodeError::Decode(e.to_string()))?;
        wire.into_iter().map(WireBlock::into_block).collect()
    }

    async fn subscribe_blocks(&self) -> Result<Box<dyn BlockFeed>, NodeError> {
        let response = self
            .client
            .get(self.url(ENDPOINT_BLOCKS_STREAM))
            .send()
            .await
            .map_err(transient)?;
        let response = check_status(response)?;
        Ok(Box::new(HttpBlockFeed {
            response: Some(response),
            buffer: Vec::new(),
        }))
    }
}

/// Line-buffered reader over the node's NDJSON block stream.
struct HttpBlockFeed {
    response: Option<Response>,
    buffer: Vec<u8>,
}

impl HttpBlockFeed {
    /// Take the next complete line out of the buffer, skipping blank
    /// keep-alive lines.
    fn take_line(&mut self) -> Option<String> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).take(pos).collect();
            let line = String::from_utf8_lossy(&line).trim().to_string();
            if !line.is_empty() {
                return Some(line);
            }
        }
        None
    }
}

#[async_trait]
impl BlockFeed for HttpBlockFeed {
    async fn next_block(&mut self) -> Result<Block, NodeError> {
        loop {
            if let Some(line) = self.take_line() {
                return decode_block_line(&line);
            }
            let response = match self.response.as_mut() {
                Some(response) => response,
                None => return Err(NodeError::Terminated),
            };
            match response.chunk().await {
                Ok(Some(chunk)) => self.buffer.extend_from_slice(&chunk),
                Ok(None) => {
                    // Server closed the stream; flush whatever is buffered.
                    self.response = None;
                    self.buffer.push(b'\n');
                }
                Err(e) => return Err(NodeError::Transient(e.to_string())),
            }
        }
    }

    async fn close(&mut self) {
        // Dropping the response closes the connection.
        self.response = None;
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_line_splits_and_skips_blanks() {
        let mut feed = HttpBlockFeed {
            response: None,
            buffer: b"first\n\nsecond\npartial".to_vec(),
        };
        assert_eq!(feed.take_line().as_deref(), Some("first"));
        assert_eq!(feed.take_line().as_deref(), Some("second"));
        // The trailing partial line stays buffered until more data arrives.
        assert_eq!(feed.take_line(), None);
        assert_eq!(feed.buffer, b"partial");
    }
}
