//! Scripted language model for unit tests.

use std::sync::Mutex;

use futures::future::BoxFuture;

use crate::{error::RetrieverError, llm::LanguageModel};

type VisionCall = (String, Vec<String>);

pub(crate) struct ScriptedModel {
    chat_reply: Option<String>,
    vision_reply: Option<String>,
    chat: Mutex<Vec<(String, String)>>,
    vision: Mutex<Vec<VisionCall>>,
}

impl ScriptedModel {
    pub(crate) fn new(chat: &str, vision: &str) -> Self {
        Self {
            chat_reply: Some(chat.into()),
            vision_reply: Some(vision.into()),
            chat: Mutex::default(),
            vision: Mutex::default(),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            chat_reply: None,
            vision_reply: None,
            chat: Mutex::default(),
            vision: Mutex::default(),
        }
    }

    pub(crate) fn chat_calls(&self) -> Vec<(String, String)> {
        self.chat.lock().unwrap().clone()
    }

    pub(crate) fn vision_calls(&self) -> Vec<VisionCall> {
        self.vision.lock().unwrap().clone()
    }
}

fn reply(r: &Option<String>) -> Result<String, RetrieverError> {
    r.clone()
        .ok_or_else(|| RetrieverError::Config("scripted failure".into()))
}

impl LanguageModel for ScriptedModel {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> BoxFuture<'a, Result<String, RetrieverError>> {
        self.chat.lock().unwrap().push((system.into(), user.into()));
        Box::pin(async move { reply(&self.chat_reply) })
    }

    fn complete_with_images<'a>(
        &'a self,
        prompt: &'a str,
        image_urls: &'a [String],
    ) -> BoxFuture<'a, Result<String, RetrieverError>> {
        self.vision
            .lock()
            .unwrap()
            .push((prompt.into(), image_urls.to_vec()));
        Box::pin(async move { reply(&self.vision_reply) })
    }
}
