//! In-memory fakes for the fetcher and classifier seams.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::fetcher::{ContentKind, PageFetcher};
use crate::risk::RiskClassifier;

/// Serves canned bodies keyed by exact URL. Anything unknown is a refusal,
/// as is a body registered under the other content kind.
#[derive(Clone, Default)]
pub struct MapFetcher {
    pages: HashMap<String, (ContentKind, String)>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn html(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), (ContentKind::Html, body.into()));
        self
    }

    pub fn xml(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), (ContentKind::Xml, body.into()));
        self
    }

    /// Every URL requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl PageFetcher for MapFetcher {
    async fn fetch(&self, url: &str, kind: ContentKind) -> Option<String> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some((k, body)) if *k == kind => Some(body.clone()),
            _ => None,
        }
    }
}

/// Returns a fixed reply (or a fixed failure) and records prompts.
#[derive(Clone)]
pub struct CannedClassifier {
    reply: Option<String>,
    stall: bool,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl CannedClassifier {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            stall: false,
            prompts: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            stall: false,
            prompts: Arc::default(),
        }
    }

    /// Records the prompt, then never answers.
    pub fn stalled() -> Self {
        Self {
            reply: None,
            stall: true,
            prompts: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl RiskClassifier for CannedClassifier {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.stall {
            std::future::pending::<()>().await;
        }
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => bail!("classifier unavailable"),
        }
    }
}

/// A policy page comfortably above the word floor, with a few risky clauses.
pub fn policy_page(title: &str, topic: &str) -> String {
    let mut body = String::new();
    for i in 0..6 {
        body.push_str(&format!(
            "<p>Section {i} of our {topic} explains how this service handles your account details and \
             the choices available to you when you use the product every day.</p>"
        ));
    }
    body.push_str(
        "<p>We may share your personal information with third-party advertising partners.</p>\
         <p>We retain your data indefinitely after you close your account.</p>",
    );
    format!("<html><head><title>{title}</title></head><body><main>{body}</main></body></html>")
}
